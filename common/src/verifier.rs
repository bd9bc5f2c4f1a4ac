// common/src/verifier.rs
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::VerificationError;
use crate::identity::IdentityClaim;
use crate::init_data::{FieldSet, ParsedInitData, AUTH_DATE_FIELD, HASH_FIELD};

type HmacSha256 = Hmac<Sha256>;

/// HMAC key used to turn a bot token into the init-data signing key
pub const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Default freshness window (24 hours)
pub const DEFAULT_MAX_AGE_SECS: i64 = 86400;

fn keyed_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length")
}

/// Derive the signing key: `HMAC-SHA256(key = "WebAppData", message = bot_token)`
pub fn derive_secret_key(bot_token: &str) -> [u8; 32] {
    let mut mac = keyed_mac(WEB_APP_DATA_KEY);
    mac.update(bot_token.as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    key
}

/// Hex HMAC-SHA256 of the data-check string under `secret_key`
pub fn sign_fields(fields: &FieldSet, secret_key: &[u8]) -> String {
    let mut mac = keyed_mac(secret_key);
    mac.update(fields.data_check_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check the signature and then the freshness of `fields`.
///
/// Returns the payload's `auth_date` on success.
pub fn verify_fields(
    fields: &FieldSet,
    secret_key: &[u8],
    now: DateTime<Utc>,
    max_age: Duration,
) -> Result<DateTime<Utc>, VerificationError> {
    let supplied = fields
        .get(HASH_FIELD)
        .ok_or(VerificationError::MissingSignature)?;
    let supplied = hex::decode(supplied).map_err(|_| VerificationError::InvalidSignature)?;

    let mut mac = keyed_mac(secret_key);
    mac.update(fields.data_check_string().as_bytes());
    // verify_slice compares in constant time
    mac.verify_slice(&supplied)
        .map_err(|_| VerificationError::InvalidSignature)?;

    let auth_date = fields
        .get(AUTH_DATE_FIELD)
        .and_then(|value| value.parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .ok_or(VerificationError::MalformedTimestamp)?;

    if now.signed_duration_since(auth_date) > max_age {
        return Err(VerificationError::Expired {
            max_age_secs: max_age.num_seconds(),
        });
    }

    Ok(auth_date)
}

/// Init data that passed signature and freshness checks.
///
/// Only [`InitDataVerifier::verify`] can produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedInitData {
    fields: FieldSet,
    claim: Option<IdentityClaim>,
    auth_date: DateTime<Utc>,
}

impl VerifiedInitData {
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn claim(&self) -> Option<&IdentityClaim> {
        self.claim.as_ref()
    }

    pub fn auth_date(&self) -> DateTime<Utc> {
        self.auth_date
    }

    pub(crate) fn into_claim(self) -> (Option<IdentityClaim>, DateTime<Utc>) {
        (self.claim, self.auth_date)
    }
}

/// Verifies init data against a secret derived once from the bot token
#[derive(Clone)]
pub struct InitDataVerifier {
    secret_key: [u8; 32],
    max_age: Duration,
}

impl fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("secret_key", &"<redacted>")
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl InitDataVerifier {
    pub fn new(bot_token: &str) -> Self {
        Self {
            secret_key: derive_secret_key(bot_token),
            max_age: Duration::seconds(DEFAULT_MAX_AGE_SECS),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn verify(
        &self,
        parsed: ParsedInitData,
        now: DateTime<Utc>,
    ) -> Result<VerifiedInitData, VerificationError> {
        let auth_date = verify_fields(&parsed.fields, &self.secret_key, now, self.max_age)?;

        Ok(VerifiedInitData {
            fields: parsed.fields,
            claim: parsed.claim,
            auth_date,
        })
    }

    /// Sign `fields` in place, replacing any existing hash
    pub fn sign(&self, fields: &mut FieldSet) {
        fields.remove(HASH_FIELD);
        let hash = sign_fields(fields, &self.secret_key);
        fields.insert(HASH_FIELD, hash);
    }
}
