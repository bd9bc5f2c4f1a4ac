// common/src/models/progress.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Locked,
    Active,
    Completed,
}

/// Catalog item a progress record points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ContentRef {
    Quest(Uuid),
    Achievement(Uuid),
}

/// A user's progress on one quest or achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: ContentRef,
    pub status: ProgressStatus,
    /// Always true when `status` is `Locked`
    pub is_locked: bool,
    pub progress: f32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn new(user_id: Uuid, content: ContentRef, status: ProgressStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            content,
            status,
            is_locked: status == ProgressStatus::Locked,
            progress: 0.0,
            started_at: (status == ProgressStatus::Active).then_some(now),
            completed_at: (status == ProgressStatus::Completed).then_some(now),
            created_at: now,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.status != ProgressStatus::Locked || self.is_locked
    }
}
