// common/src/store/mod.rs
//! Persistence seam used by the onboarding coordinator.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AchievementContent, NewUser, ProgressRecord, QuestContent, UserRecord};

pub use memory::MemoryStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_platform_id(&self, platform_id: i64) -> Result<Option<UserRecord>, StoreError>;

    /// Insert `new_user` unless a record with the same platform id exists.
    ///
    /// Must be atomic per platform id. Returns the stored record and whether
    /// this call created it.
    async fn create_if_absent(&self, new_user: NewUser) -> Result<(UserRecord, bool), StoreError>;

    async fn delete_by_platform_id(&self, platform_id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Quests in catalog order
    async fn list_quests(&self, skip: usize, limit: usize) -> Result<Vec<QuestContent>, StoreError>;

    async fn list_available_quests(&self, limit: usize) -> Result<Vec<QuestContent>, StoreError> {
        self.list_quests(0, limit).await
    }

    /// Achievements matching `names`, in the order the names are given
    async fn list_achievements_by_name(
        &self,
        names: &[String],
    ) -> Result<Vec<AchievementContent>, StoreError>;

    /// Store every item or none of them
    async fn assign_batch(&self, user_id: Uuid, items: Vec<ProgressRecord>) -> Result<(), StoreError>;

    async fn list_progress(&self, user_id: Uuid) -> Result<Vec<ProgressRecord>, StoreError>;

    async fn remove_progress(&self, user_id: Uuid) -> Result<usize, StoreError>;
}
