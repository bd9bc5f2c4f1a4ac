// common/src/store/memory.rs
use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ProgressStore, UserStore};
use crate::error::StoreError;
use crate::models::{
    AchievementContent, ContentRef, NewUser, ProgressRecord, QuestContent, UserRecord,
};

/// In-process store backing both users and progress
#[derive(Debug, Default)]
pub struct MemoryStore {
    // Keyed by platform id, which gives create_if_absent its uniqueness
    users: DashMap<i64, UserRecord>,
    progress: DashMap<Uuid, Vec<ProgressRecord>>,
    quests: RwLock<Vec<QuestContent>>,
    achievements: RwLock<Vec<AchievementContent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(quests: Vec<QuestContent>, achievements: Vec<AchievementContent>) -> Self {
        Self {
            quests: RwLock::new(quests),
            achievements: RwLock::new(achievements),
            ..Self::default()
        }
    }

    pub async fn add_quest(&self, quest: QuestContent) {
        self.quests.write().await.push(quest);
    }

    pub async fn add_achievement(&self, achievement: AchievementContent) {
        self.achievements.write().await.push(achievement);
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn progress_count(&self) -> usize {
        self.progress.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_platform_id(&self, platform_id: i64) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(&platform_id).map(|entry| entry.value().clone()))
    }

    async fn create_if_absent(&self, new_user: NewUser) -> Result<(UserRecord, bool), StoreError> {
        match self.users.entry(new_user.platform_id) {
            Entry::Occupied(entry) => {
                tracing::debug!("User {} already present", new_user.platform_id);
                Ok((entry.get().clone(), false))
            }
            Entry::Vacant(entry) => {
                let record = UserRecord::create(new_user);
                entry.insert(record.clone());
                Ok((record, true))
            }
        }
    }

    async fn delete_by_platform_id(&self, platform_id: i64) -> Result<bool, StoreError> {
        Ok(self.users.remove(&platform_id).is_some())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn list_quests(&self, skip: usize, limit: usize) -> Result<Vec<QuestContent>, StoreError> {
        let quests = self.quests.read().await;
        Ok(quests.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn list_achievements_by_name(
        &self,
        names: &[String],
    ) -> Result<Vec<AchievementContent>, StoreError> {
        let achievements = self.achievements.read().await;
        Ok(names
            .iter()
            .filter_map(|name| achievements.iter().find(|a| &a.name == name))
            .cloned()
            .collect())
    }

    async fn assign_batch(&self, user_id: Uuid, items: Vec<ProgressRecord>) -> Result<(), StoreError> {
        let mut entry = self.progress.entry(user_id).or_default();

        // Validate the whole batch before touching the stored list
        let mut seen: HashSet<ContentRef> = entry.iter().map(|record| record.content).collect();
        for item in &items {
            if item.user_id != user_id {
                return Err(StoreError::Conflict(format!(
                    "progress record {} belongs to another user",
                    item.id
                )));
            }
            if !seen.insert(item.content) {
                return Err(StoreError::Conflict(format!(
                    "user {} already has progress for {:?}",
                    user_id, item.content
                )));
            }
        }

        entry.extend(items);
        Ok(())
    }

    async fn list_progress(&self, user_id: Uuid) -> Result<Vec<ProgressRecord>, StoreError> {
        Ok(self
            .progress
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn remove_progress(&self, user_id: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .progress
            .remove(&user_id)
            .map(|(_, records)| records.len())
            .unwrap_or(0))
    }
}
