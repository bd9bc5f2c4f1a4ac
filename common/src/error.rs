// common/src/error.rs
use thiserror::Error;

/// Failures while splitting and decoding a raw init-data string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed field: {0}")]
    MalformedField(String),
    #[error("failed to percent-decode field `{0}`")]
    DecodeFailure(String),
    #[error("user field is not a JSON object: {0}")]
    InvalidIdentityJson(String),
}

/// Failures while checking the signature and freshness of a parsed payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("payload carries no hash field")]
    MissingSignature,
    #[error("payload signature does not match")]
    InvalidSignature,
    #[error("auth_date is missing or not a unix timestamp")]
    MalformedTimestamp,
    #[error("payload is older than {max_age_secs}s")]
    Expired { max_age_secs: i64 },
}

/// Failures while turning a verified identity claim into a typed identity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("identity claim is missing `{0}`")]
    MissingField(&'static str),
    #[error("platform identifier does not fit a signed 64-bit integer")]
    IdentifierOverflow,
}

/// Errors surfaced by a persistence backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the onboarding coordinator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OnboardingError {
    #[error("content catalog has {found} {kind}, starter set needs {required}")]
    InsufficientContent {
        kind: &'static str,
        required: usize,
        found: usize,
    },
    #[error("persistence conflict: {0}")]
    PersistenceConflict(String),
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),
    #[error("onboarding task did not finish: {0}")]
    Interrupted(String),
}

impl From<StoreError> for OnboardingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => OnboardingError::PersistenceConflict(msg),
            StoreError::Unavailable(msg) => OnboardingError::PersistenceUnavailable(msg),
        }
    }
}

/// Any rejection of an incoming init-data payload.
///
/// None of these are retried: they mean the request was malformed or forged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
}
