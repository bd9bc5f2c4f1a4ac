// common/src/models/content.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A quest in the content catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestContent {
    pub id: Uuid,
    pub name: String,
    pub image_url: String,
    pub description: String,
    pub award: String,
    pub goal: String,
    pub created_at: DateTime<Utc>,
}

impl QuestContent {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            image_url: String::new(),
            description: description.into(),
            award: String::new(),
            goal: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// An achievement in the content catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementContent {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AchievementContent {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            image_url: None,
            created_at: Utc::now(),
        }
    }
}
