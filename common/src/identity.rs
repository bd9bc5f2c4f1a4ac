// common/src/identity.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{IdentityConfig, ProfileDefaults};
use crate::error::MappingError;
use crate::verifier::VerifiedInitData;

/// The `user` object carried inside init data, as sent by the client.
///
/// Every field is optional here; [`IdentityMapper`] decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub id: Option<serde_json::Number>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: Option<bool>,
    pub allows_write_to_pm: Option<bool>,
    pub photo_url: Option<String>,
}

/// A platform user whose init data was signed and fresh, with profile
/// defaults already applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedIdentity {
    platform_id: i64,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
    language_code: Option<String>,
    is_premium: bool,
    allows_write_to_pm: bool,
    image_url: String,
    user_class: Option<String>,
    auth_date: DateTime<Utc>,
}

impl VerifiedIdentity {
    pub fn platform_id(&self) -> i64 {
        self.platform_id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn language_code(&self) -> Option<&str> {
        self.language_code.as_deref()
    }

    pub fn is_premium(&self) -> bool {
        self.is_premium
    }

    pub fn allows_write_to_pm(&self) -> bool {
        self.allows_write_to_pm
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn user_class(&self) -> Option<&str> {
        self.user_class.as_deref()
    }

    pub fn auth_date(&self) -> DateTime<Utc> {
        self.auth_date
    }

    #[cfg(test)]
    pub(crate) fn for_tests(platform_id: i64) -> Self {
        Self {
            platform_id,
            first_name: "Test".to_string(),
            last_name: None,
            username: None,
            language_code: Some("en".to_string()),
            is_premium: false,
            allows_write_to_pm: false,
            image_url: ProfileDefaults::default().image_url,
            user_class: None,
            auth_date: Utc::now(),
        }
    }
}

/// Maps verified claims to [`VerifiedIdentity`] values
#[derive(Debug, Clone, Default)]
pub struct IdentityMapper {
    defaults: ProfileDefaults,
    require_profile_fields: bool,
}

impl IdentityMapper {
    pub fn new(defaults: ProfileDefaults) -> Self {
        Self {
            defaults,
            require_profile_fields: false,
        }
    }

    pub fn from_config(identity: &IdentityConfig, defaults: ProfileDefaults) -> Self {
        Self::new(defaults).require_profile_fields(identity.require_profile_fields)
    }

    /// Also require `first_name` and `language_code` in every claim
    pub fn require_profile_fields(mut self, required: bool) -> Self {
        self.require_profile_fields = required;
        self
    }

    pub fn map(&self, verified: VerifiedInitData) -> Result<VerifiedIdentity, MappingError> {
        let (claim, auth_date) = verified.into_claim();
        let claim = claim.ok_or(MappingError::MissingField("user"))?;

        // Reject rather than truncate ids outside i64
        let platform_id = claim
            .id
            .as_ref()
            .ok_or(MappingError::MissingField("id"))?
            .as_i64()
            .ok_or(MappingError::IdentifierOverflow)?;

        if self.require_profile_fields {
            if claim.first_name.as_deref().map_or(true, str::is_empty) {
                return Err(MappingError::MissingField("first_name"));
            }
            if claim.language_code.is_none() {
                return Err(MappingError::MissingField("language_code"));
            }
        }

        Ok(VerifiedIdentity {
            platform_id,
            first_name: claim.first_name.unwrap_or_default(),
            last_name: claim.last_name,
            username: claim.username,
            language_code: claim.language_code,
            is_premium: claim.is_premium.unwrap_or(false),
            allows_write_to_pm: claim.allows_write_to_pm.unwrap_or(false),
            image_url: claim
                .photo_url
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| self.defaults.image_url.clone()),
            user_class: self.defaults.user_class.clone(),
            auth_date,
        })
    }
}
