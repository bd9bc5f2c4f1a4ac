// common/src/auth.rs
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::AuthError;
use crate::identity::{IdentityMapper, VerifiedIdentity};
use crate::init_data::parse;
use crate::verifier::InitDataVerifier;

/// Turns a raw init-data string into a [`VerifiedIdentity`]:
/// parse, check signature and freshness, then map the claim.
#[derive(Debug, Clone)]
pub struct Authenticator {
    verifier: InitDataVerifier,
    mapper: IdentityMapper,
}

impl Authenticator {
    pub fn new(verifier: InitDataVerifier, mapper: IdentityMapper) -> Self {
        Self { verifier, mapper }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut verifier = InitDataVerifier::new(config.bot_token.expose());
        match config.auth.max_age() {
            Some(max_age) => verifier = verifier.with_max_age(max_age),
            None => tracing::warn!(
                "Ignoring unusable auth.max_age_secs = {}, keeping {}s",
                config.auth.max_age_secs,
                verifier.max_age().num_seconds()
            ),
        }
        let mapper = IdentityMapper::from_config(&config.identity, config.profile_defaults.clone());
        Self::new(verifier, mapper)
    }

    pub fn verifier(&self) -> &InitDataVerifier {
        &self.verifier
    }

    pub fn authenticate(&self, raw: &str, now: DateTime<Utc>) -> Result<VerifiedIdentity, AuthError> {
        let parsed = parse(raw)?;
        let verified = self.verifier.verify(parsed, now)?;
        Ok(self.mapper.map(verified)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotToken;
    use crate::error::{MappingError, ParseError, VerificationError};

    fn authenticator() -> Authenticator {
        Authenticator::from_config(&Config {
            bot_token: BotToken::new("BOTTOKEN"),
            ..Config::default()
        })
    }

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_500, 0).unwrap()
    }

    #[test]
    fn test_known_payload_maps_to_platform_id() {
        let raw = "auth_date=1700000000&user=%7B%22id%22%3A42%7D\
                   &hash=bf7408c0c27dbe02bcbb4ecf960fa5c5cbca2357f0d09f9f5c59f11f142eb298";
        let identity = authenticator().authenticate(raw, now()).unwrap();
        assert_eq!(identity.platform_id(), 42);
    }

    #[test]
    fn test_out_of_range_max_age_keeps_default() {
        let mut config = Config {
            bot_token: BotToken::new("BOTTOKEN"),
            ..Config::default()
        };
        config.auth.max_age_secs = i64::MAX / 10;
        let auth = Authenticator::from_config(&config);
        assert_eq!(auth.verifier().max_age().num_seconds(), crate::verifier::DEFAULT_MAX_AGE_SECS);

        config.auth.max_age_secs = 60;
        let auth = Authenticator::from_config(&config);
        assert_eq!(auth.verifier().max_age().num_seconds(), 60);
    }

    #[test]
    fn test_each_stage_reports_its_own_error() {
        let auth = authenticator();
        assert!(matches!(
            auth.authenticate("no-delimiter", now()),
            Err(AuthError::Parse(ParseError::MalformedField(_)))
        ));
        assert_eq!(
            auth.authenticate("auth_date=1700000000", now()).unwrap_err(),
            AuthError::Verification(VerificationError::MissingSignature)
        );

        let mut fields = crate::init_data::FieldSet::new();
        fields.insert("auth_date", "1700000000");
        auth.verifier().sign(&mut fields);
        assert_eq!(
            auth.authenticate(&fields.to_raw(), now()).unwrap_err(),
            AuthError::Mapping(MappingError::MissingField("user"))
        );
    }
}
