// common/src/config.rs
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::PathBuf;

use chrono::Duration;
use config::{Config as ConfigFile, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::{AchievementContent, QuestContent};
use crate::verifier::DEFAULT_MAX_AGE_SECS;

pub const DEFAULT_IMAGE_URL: &str = "https://quests-app-bucket.s3.eu-north-1.amazonaws.com/images/02.jpg";

/// Bot token the init-data signing key is derived from. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotToken(String);

impl BotToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotToken(<redacted>)")
    }
}

/// Central configuration, loaded once at startup and immutable afterwards
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_addr: String,
    pub bot_token: BotToken,
    pub log_level: String,
    pub auth: AuthConfig,
    pub identity: IdentityConfig,
    pub onboarding: OnboardingConfig,
    pub profile_defaults: ProfileDefaults,
    pub rate_limit: RateLimitConfig,
    pub catalog: CatalogConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Maximum accepted age of `auth_date`, in seconds
    pub max_age_secs: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub require_profile_fields: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingConfig {
    /// Number of quests, and of achievements, in the starter set
    pub starter_set_size: usize,
    /// How many of those start out locked; the rest start active
    pub locked_count: usize,
    pub achievement_names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDefaults {
    pub image_url: String,
    pub user_class: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    pub paths: Vec<String>,
    /// Key clients by `Forwarded`/`X-Forwarded-For` instead of the peer
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub quests: Vec<QuestSeed>,
    pub achievements: Vec<AchievementSeed>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestSeed {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub award: String,
    pub goal: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementSeed {
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8081".to_string(),
            bot_token: BotToken::default(),
            log_level: "info".to_string(),
            auth: AuthConfig::default(),
            identity: IdentityConfig::default(),
            onboarding: OnboardingConfig::default(),
            profile_defaults: ProfileDefaults::default(),
            rate_limit: RateLimitConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            starter_set_size: 4,
            locked_count: 2,
            achievement_names: vec![
                "First Steps".to_string(),
                "Pathfinder".to_string(),
                "Quest Seeker".to_string(),
                "Legend".to_string(),
            ],
        }
    }
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            image_url: DEFAULT_IMAGE_URL.to_string(),
            user_class: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_secs: 60,
            paths: vec!["/api/users".to_string()],
            trust_forwarded_headers: false,
        }
    }
}

impl AuthConfig {
    /// `max_age_secs` as a duration, if it is positive and representable
    pub fn max_age(&self) -> Option<Duration> {
        Duration::try_seconds(self.max_age_secs).filter(|age| *age > Duration::zero())
    }
}

impl QuestSeed {
    pub fn to_content(&self) -> QuestContent {
        let mut quest = QuestContent::new(&self.name, &self.description);
        quest.image_url = self.image_url.clone();
        quest.award = self.award.clone();
        quest.goal = self.goal.clone();
        quest
    }
}

impl AchievementSeed {
    pub fn to_content(&self) -> AchievementContent {
        let mut achievement = AchievementContent::new(&self.name, &self.description);
        achievement.image_url = self.image_url.clone();
        achievement
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config: Config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // APP__BOT_TOKEN, APP__AUTH__MAX_AGE_SECS, ...
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let mut config = Config::default();

                if let Ok(addr) = env::var("SERVER_ADDR") {
                    config.server_addr = addr;
                }
                if let Ok(token) = env::var("BOT_TOKEN") {
                    config.bot_token = BotToken::new(token);
                }
                if let Ok(level) = env::var("LOG_LEVEL") {
                    config.log_level = level;
                }
                if let Some(max_age) = env::var("AUTH_MAX_AGE_SECS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
                {
                    config.auth.max_age_secs = max_age;
                }

                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.is_empty() {
            return Err(ConfigError::Invalid("bot_token must be set".to_string()));
        }
        if self.auth.max_age().is_none() {
            return Err(ConfigError::Invalid(format!(
                "auth.max_age_secs must be a positive number of seconds, got {}",
                self.auth.max_age_secs
            )));
        }

        let onboarding = &self.onboarding;
        if onboarding.starter_set_size == 0 {
            return Err(ConfigError::Invalid(
                "onboarding.starter_set_size must be positive".to_string(),
            ));
        }
        if onboarding.locked_count > onboarding.starter_set_size {
            return Err(ConfigError::Invalid(format!(
                "onboarding.locked_count ({}) exceeds starter_set_size ({})",
                onboarding.locked_count, onboarding.starter_set_size
            )));
        }
        if onboarding.achievement_names.len() < onboarding.starter_set_size {
            return Err(ConfigError::Invalid(format!(
                "onboarding.achievement_names lists {} names, starter set needs {}",
                onboarding.achievement_names.len(),
                onboarding.starter_set_size
            )));
        }
        let mut names = HashSet::new();
        if let Some(repeated) = onboarding
            .achievement_names
            .iter()
            .find(|name| !names.insert(name.as_str()))
        {
            return Err(ConfigError::Invalid(format!(
                "onboarding.achievement_names lists `{}` more than once",
                repeated
            )));
        }

        Ok(())
    }
}
