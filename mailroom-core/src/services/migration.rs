//! Schema migrations
//!
//! Each database carries an ordered list of embedded SQL files whose first
//! entry creates `sys_migrations`. A file and the row recording it are applied
//! in one transaction, so a failing migration is never marked as done.
//! mailroom.duckdb and logs.duckdb each pass their own list.

use anyhow::{Context, Result};
use duckdb::Connection;

/// Ordered `(file name, sql)` pairs
pub type Migrations = &'static [(&'static str, &'static str)];

/// Outcome of one `run_pending` call
#[derive(Debug, Default)]
pub struct MigrationResult {
    /// Files applied by this call, in order
    pub applied: Vec<String>,
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: Migrations,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection, migrations: Migrations) -> Self {
        Self { conn, migrations }
    }

    /// Apply every migration that isn't recorded yet
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let (_, bootstrap_sql) = self
            .migrations
            .first()
            .context("migration list is empty")?;
        // Idempotent; sys_migrations has to exist before it can be read
        self.conn.execute_batch(bootstrap_sql)?;

        let recorded = self.get_applied()?;
        let mut result = MigrationResult::default();

        for (name, sql) in self.migrations {
            if recorded.iter().any(|r| r == name) {
                result.already_applied += 1;
                continue;
            }
            self.apply(name, sql)
                .with_context(|| format!("migration {} failed", name))?;
            result.applied.push(name.to_string());
        }

        Ok(result)
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        let outcome = self.conn.execute_batch(sql).and_then(|_| {
            self.conn
                .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])
                .map(|_| ())
        });

        match outcome {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e.into())
            }
        }
    }

    /// Recorded migration names, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Migrations in the list that aren't recorded
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let recorded = self.get_applied()?;
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !recorded.contains(name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_migrations::LOG_MIGRATIONS;
    use crate::migrations::MIGRATIONS;

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn, MIGRATIONS);

        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), MIGRATIONS.len());
        assert_eq!(result.already_applied, 0);

        let again = service.run_pending().unwrap();
        assert!(again.applied.is_empty());
        assert_eq!(again.already_applied, MIGRATIONS.len());
    }

    #[test]
    fn test_get_pending_after_bootstrap() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].1).unwrap();
        conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [MIGRATIONS[0].0],
        )
        .unwrap();

        let service = MigrationService::new(&conn, MIGRATIONS);
        assert_eq!(service.get_pending().unwrap().len(), MIGRATIONS.len() - 1);
    }

    #[test]
    fn test_failed_migration_is_not_recorded() {
        static BROKEN: &[(&str, &str)] = &[
            ("000_migrations.sql", include_str!("../migrations/000_migrations.sql")),
            ("001_broken.sql", "CREATE TABLE t (id INTEGER); SELECT * FROM missing_table;"),
        ];
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn, BROKEN);

        assert!(service.run_pending().is_err());
        assert_eq!(service.get_applied().unwrap(), vec!["000_migrations.sql"]);
        assert_eq!(service.get_pending().unwrap(), vec!["001_broken.sql"]);
    }

    #[test]
    fn test_log_migrations_are_independent() {
        let conn = Connection::open_in_memory().unwrap();
        let result = MigrationService::new(&conn, LOG_MIGRATIONS).run_pending().unwrap();
        assert_eq!(result.applied.len(), LOG_MIGRATIONS.len());

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_accounts'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }
}
