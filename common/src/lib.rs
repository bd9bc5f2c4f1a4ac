pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod init_data;
pub mod models;
pub mod onboarding;
pub mod store;
pub mod utils;
pub mod verifier;

pub use auth::Authenticator;
pub use self::config::*;
pub use error::*;
pub use identity::{IdentityClaim, IdentityMapper, VerifiedIdentity};
pub use init_data::{parse, FieldSet, ParsedInitData};
pub use onboarding::{OnboardingCoordinator, OnboardingOutcome};
pub use utils::*;
pub use verifier::{InitDataVerifier, VerifiedInitData};
