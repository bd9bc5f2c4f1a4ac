// common/src/onboarding.rs
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::OnboardingConfig;
use crate::error::{OnboardingError, StoreError};
use crate::identity::VerifiedIdentity;
use crate::models::{
    AchievementContent, ContentRef, NewUser, ProgressRecord, ProgressStatus, QuestContent,
    UserRecord, UserRole,
};
use crate::store::{ProgressStore, UserStore};

/// Result of an onboarding attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OnboardingOutcome {
    /// The user was already onboarded; nothing changed
    Existing { user: UserRecord },
    /// Unknown user and no role yet; call again with a role
    PendingRoleSelection { identity: VerifiedIdentity },
    NewlyCreated {
        user: UserRecord,
        quests: Vec<ProgressRecord>,
        achievements: Vec<ProgressRecord>,
    },
}

/// Looks up or creates users and hands out the starter set exactly once.
///
/// Each onboarding runs in its own task while holding a per platform id lock,
/// so a user is only ever observed together with its starter set and a
/// dropped caller cannot stop the work halfway. `UserStore::create_if_absent`
/// keeps creation unique across processes.
#[derive(Clone)]
pub struct OnboardingCoordinator {
    users: Arc<dyn UserStore>,
    progress: Arc<dyn ProgressStore>,
    starter: Arc<OnboardingConfig>,
    in_flight: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl OnboardingCoordinator {
    pub fn new(
        users: Arc<dyn UserStore>,
        progress: Arc<dyn ProgressStore>,
        starter: OnboardingConfig,
    ) -> Self {
        Self {
            users,
            progress,
            starter: Arc::new(starter),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub async fn onboard(
        &self,
        identity: VerifiedIdentity,
        role: Option<UserRole>,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.onboard_exclusive(identity, role).await })
            .await
            .map_err(|e| OnboardingError::Interrupted(e.to_string()))?
    }

    pub async fn find_user(&self, platform_id: i64) -> Result<Option<UserRecord>, OnboardingError> {
        Ok(self.users.find_by_platform_id(platform_id).await?)
    }

    pub async fn progress_for(
        &self,
        platform_id: i64,
    ) -> Result<Option<Vec<ProgressRecord>>, OnboardingError> {
        match self.users.find_by_platform_id(platform_id).await? {
            Some(user) => Ok(Some(self.progress.list_progress(user.id).await?)),
            None => Ok(None),
        }
    }

    /// Delete a user together with all of their progress
    pub async fn remove_user(&self, platform_id: i64) -> Result<bool, OnboardingError> {
        let Some(user) = self.users.find_by_platform_id(platform_id).await? else {
            return Ok(false);
        };

        let removed = self.progress.remove_progress(user.id).await?;
        let deleted = self.users.delete_by_platform_id(platform_id).await?;
        tracing::info!("Deleted user {} and {} progress records", platform_id, removed);

        Ok(deleted)
    }

    async fn onboard_exclusive(
        &self,
        identity: VerifiedIdentity,
        role: Option<UserRole>,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let platform_id = identity.platform_id();
        let lock = self.lock_for(platform_id);
        let outcome = {
            let _guard = lock.lock().await;
            self.lookup_or_create(identity, role).await
        };
        self.release(platform_id, lock);

        outcome
    }

    /// Must run under the platform id lock
    async fn lookup_or_create(
        &self,
        identity: VerifiedIdentity,
        role: Option<UserRole>,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let platform_id = identity.platform_id();

        if let Some(user) = self.users.find_by_platform_id(platform_id).await? {
            tracing::info!("Returning existing user {}", platform_id);
            return Ok(OnboardingOutcome::Existing { user });
        }

        let Some(role) = role else {
            tracing::info!("User {} not found, waiting for role selection", platform_id);
            return Ok(OnboardingOutcome::PendingRoleSelection { identity });
        };

        self.create_with_starter_set(identity, role).await
    }

    async fn create_with_starter_set(
        &self,
        identity: VerifiedIdentity,
        role: UserRole,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let platform_id = identity.platform_id();

        // Fail before creating anything if the catalog cannot cover the set
        let (quests, achievements) = self.starter_content().await?;

        let user = match self
            .users
            .create_if_absent(NewUser::from_identity(&identity, role))
            .await
        {
            Ok((user, true)) => user,
            Ok((user, false)) => {
                tracing::debug!("User {} created concurrently elsewhere", platform_id);
                return Ok(OnboardingOutcome::Existing { user });
            }
            Err(StoreError::Conflict(msg)) => {
                tracing::debug!("Create conflict for user {}: {}, retrying as lookup", platform_id, msg);
                return match self.users.find_by_platform_id(platform_id).await? {
                    Some(user) => Ok(OnboardingOutcome::Existing { user }),
                    None => Err(OnboardingError::PersistenceConflict(msg)),
                };
            }
            Err(e) => return Err(e.into()),
        };

        let quest_records =
            self.starter_records(user.id, quests.iter().map(|q| ContentRef::Quest(q.id)));
        let achievement_records = self.starter_records(
            user.id,
            achievements.iter().map(|a| ContentRef::Achievement(a.id)),
        );

        let batch = quest_records
            .iter()
            .chain(achievement_records.iter())
            .cloned()
            .collect();

        if let Err(e) = self.progress.assign_batch(user.id, batch).await {
            tracing::error!("Starter set assignment failed for user {}: {}", platform_id, e);
            self.roll_back(platform_id).await;
            return Err(e.into());
        }

        tracing::info!(
            "Created user {} with {} quests and {} achievements",
            platform_id,
            quest_records.len(),
            achievement_records.len()
        );

        Ok(OnboardingOutcome::NewlyCreated {
            user,
            quests: quest_records,
            achievements: achievement_records,
        })
    }

    async fn starter_content(
        &self,
    ) -> Result<(Vec<QuestContent>, Vec<AchievementContent>), OnboardingError> {
        let size = self.starter.starter_set_size;

        let mut quests = self.progress.list_available_quests(size).await?;
        if quests.len() < size {
            return Err(OnboardingError::InsufficientContent {
                kind: "quests",
                required: size,
                found: quests.len(),
            });
        }
        quests.truncate(size);

        let mut achievements = self
            .progress
            .list_achievements_by_name(&self.starter.achievement_names)
            .await?;
        // A name listed twice must not hand out the same achievement twice
        let mut seen = HashSet::new();
        achievements.retain(|achievement| seen.insert(achievement.id));
        if achievements.len() < size {
            return Err(OnboardingError::InsufficientContent {
                kind: "achievements",
                required: size,
                found: achievements.len(),
            });
        }
        achievements.truncate(size);

        Ok((quests, achievements))
    }

    /// The first `locked_count` items start locked, the rest active
    fn starter_records(
        &self,
        user_id: Uuid,
        content: impl Iterator<Item = ContentRef>,
    ) -> Vec<ProgressRecord> {
        content
            .enumerate()
            .map(|(index, content)| {
                let status = if index < self.starter.locked_count {
                    ProgressStatus::Locked
                } else {
                    ProgressStatus::Active
                };
                ProgressRecord::new(user_id, content, status)
            })
            .collect()
    }

    async fn roll_back(&self, platform_id: i64) {
        match self.users.delete_by_platform_id(platform_id).await {
            Ok(_) => tracing::warn!("Rolled back user {} after failed assignment", platform_id),
            Err(e) => tracing::error!("Rollback of user {} failed: {}", platform_id, e),
        }
    }

    fn lock_for(&self, platform_id: i64) -> Arc<Mutex<()>> {
        self.in_flight
            .entry(platform_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn release(&self, platform_id: i64, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.in_flight
            .remove_if(&platform_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
