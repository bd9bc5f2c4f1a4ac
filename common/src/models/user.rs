// common/src/models/user.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::VerifiedIdentity;

pub const DEFAULT_LEVEL: i32 = 1;
pub const DEFAULT_POINTS: i32 = 100;
pub const DEFAULT_COINS: i32 = 1000;

/// Role a player picks before their record is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Adventurer,
    Avatar,
    Kingdom,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Adventurer => "adventurer",
            UserRole::Avatar => "avatar",
            UserRole::Kingdom => "kingdom",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adventurer" => Ok(UserRole::Adventurer),
            "avatar" => Ok(UserRole::Avatar),
            "kingdom" => Ok(UserRole::Kingdom),
            other => Err(format!("unknown role `{}`", other)),
        }
    }
}

/// Everything needed to insert a user record
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub platform_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: bool,
    pub allows_write_to_pm: bool,
    pub image_url: String,
    pub user_class: Option<String>,
    pub role: UserRole,
}

impl NewUser {
    pub fn from_identity(identity: &VerifiedIdentity, role: UserRole) -> Self {
        Self {
            platform_id: identity.platform_id(),
            first_name: identity.first_name().to_string(),
            last_name: identity.last_name().map(str::to_string),
            username: identity.username().map(str::to_string),
            language_code: identity.language_code().map(str::to_string),
            is_premium: identity.is_premium(),
            allows_write_to_pm: identity.allows_write_to_pm(),
            image_url: identity.image_url().to_string(),
            user_class: identity.user_class().map(str::to_string),
            role,
        }
    }
}

/// Persistent player record, unique per platform identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Internal identifier
    pub id: Uuid,
    /// Identifier issued by the chat platform
    pub platform_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub user_class: Option<String>,
    pub image_url: String,
    pub level: i32,
    pub points: i32,
    pub coins: i32,
    /// Unset only for records created outside onboarding
    pub role: Option<UserRole>,
    pub language_code: Option<String>,
    pub is_premium: bool,
    pub allows_write_to_pm: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Build a fresh record with progression counters at their defaults
    pub fn create(new_user: NewUser) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform_id: new_user.platform_id,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            username: new_user.username,
            user_class: new_user.user_class,
            image_url: new_user.image_url,
            level: DEFAULT_LEVEL,
            points: DEFAULT_POINTS,
            coins: DEFAULT_COINS,
            role: Some(new_user.role),
            language_code: new_user.language_code,
            is_premium: new_user.is_premium,
            allows_write_to_pm: new_user.allows_write_to_pm,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}
