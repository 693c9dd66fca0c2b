//! Conversation domain model
//!
//! Conversations are only modelled as far as identity needs them: who owns
//! one and who it was addressed to. Recipients become the owner's friends.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub subject: Option<String>,
    /// Recipient account ids in addressing order, without duplicates
    pub recipient_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a conversation. Duplicate recipients and the owner are dropped.
    pub fn new(owner_id: Uuid, subject: Option<String>, recipients: impl IntoIterator<Item = Uuid>) -> Self {
        let mut recipient_ids = Vec::new();
        for id in recipients {
            if id != owner_id && !recipient_ids.contains(&id) {
                recipient_ids.push(id);
            }
        }
        Self {
            id: Uuid::new_v4(),
            owner_id,
            subject: subject.filter(|s| !s.trim().is_empty()),
            recipient_ids,
            created_at: Utc::now(),
        }
    }
}
