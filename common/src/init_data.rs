// common/src/init_data.rs
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::identity::IdentityClaim;

pub const HASH_FIELD: &str = "hash";
pub const AUTH_DATE_FIELD: &str = "auth_date";
pub const USER_FIELD: &str = "user";

/// Decoded key/value fields of an init-data payload.
///
/// Keys are unique and kept in byte-wise order, which is the order the
/// data-check string is built in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    fields: BTreeMap<String, String>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a raw `key=value&key=value` string and percent-decode every value
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let mut fields = BTreeMap::new();

        for segment in raw.split('&') {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ParseError::MalformedField(segment.to_string()))?;

            if key.is_empty() {
                return Err(ParseError::MalformedField(segment.to_string()));
            }

            let decoded = percent_decode(key, value)?;
            if fields.insert(key.to_string(), decoded).is_some() {
                return Err(ParseError::MalformedField(format!("duplicate key `{}`", key)));
            }
        }

        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sorted `key=value` lines joined by `\n`, without the hash field.
    /// This is the exact message the platform signs.
    pub fn data_check_string(&self) -> String {
        self.iter()
            .filter(|(key, _)| *key != HASH_FIELD)
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Re-encode the fields into the raw form accepted by [`FieldSet::parse`]
    pub fn to_raw(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// A parsed payload: all fields plus the typed `user` claim, if one was sent.
/// Nothing in here is trusted until it has been through the verifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInitData {
    pub fields: FieldSet,
    pub claim: Option<IdentityClaim>,
}

/// Parse a raw init-data string into its fields and identity claim
pub fn parse(raw: &str) -> Result<ParsedInitData, ParseError> {
    let fields = FieldSet::parse(raw)?;

    let claim = match fields.get(USER_FIELD) {
        Some(user) => Some(parse_claim(user)?),
        None => None,
    };

    Ok(ParsedInitData { fields, claim })
}

fn parse_claim(user: &str) -> Result<IdentityClaim, ParseError> {
    let value: serde_json::Value = serde_json::from_str(user)
        .map_err(|e| ParseError::InvalidIdentityJson(e.to_string()))?;

    if !value.is_object() {
        return Err(ParseError::InvalidIdentityJson("expected an object".to_string()));
    }

    serde_json::from_value(value).map_err(|e| ParseError::InvalidIdentityJson(e.to_string()))
}

fn percent_decode(key: &str, value: &str) -> Result<String, ParseError> {
    // urlencoding passes malformed escapes through untouched, so reject them first
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes
                .get(i + 1..i + 3)
                .map_or(false, |hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !well_formed {
                return Err(ParseError::DecodeFailure(key.to_string()));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    urlencoding::decode(value)
        .map(Cow::into_owned)
        .map_err(|_| ParseError::DecodeFailure(key.to_string()))
}
