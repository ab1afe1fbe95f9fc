//! Startup Configuration - Required Secrets, No Silent Defaults
//!
//! A missing or empty signing key is a fatal startup error. There is no
//! fallback key anywhere in this crate.

use thiserror::Error;

use crate::signing::SigningKey;

pub const SIGNING_KEY_ENV: &str = "DOCUMENT_SIGNING_KEY";
pub const BASE_URL_ENV: &str = "VERIFICATION_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://verify.gov.example";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DOCUMENT_SIGNING_KEY is not set; refusing to start without a signing key")]
    MissingSigningKey,

    #[error("DOCUMENT_SIGNING_KEY is empty; refusing to start without a signing key")]
    EmptySigningKey,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub signing_key: SigningKey,
    pub verification_base_url: String,
}

impl EngineConfig {
    pub fn new(signing_key: SigningKey, verification_base_url: impl Into<String>) -> Self {
        Self {
            signing_key,
            verification_base_url: verification_base_url.into(),
        }
    }

    /// Load from the process environment. Fatal if the signing key is
    /// absent or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let key_material = lookup(SIGNING_KEY_ENV).ok_or(ConfigError::MissingSigningKey)?;
        let signing_key = SigningKey::new(key_material.into_bytes())
            .map_err(|_| ConfigError::EmptySigningKey)?;

        let verification_base_url =
            lookup(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            signing_key,
            verification_base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(map: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| map.get(name).map(|v| v.to_string())
    }

    #[test]
    fn missing_key_is_fatal() {
        let vars = HashMap::new();
        let err = EngineConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSigningKey));
    }

    #[test]
    fn empty_key_is_fatal() {
        let vars = HashMap::from([(SIGNING_KEY_ENV, "")]);
        let err = EngineConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySigningKey));
    }

    #[test]
    fn base_url_defaults_when_unset() {
        let vars = HashMap::from([(SIGNING_KEY_ENV, "configured-key")]);
        let config = EngineConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.verification_base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn base_url_override_is_honored() {
        let vars = HashMap::from([
            (SIGNING_KEY_ENV, "configured-key"),
            (BASE_URL_ENV, "https://verify.dept.example"),
        ]);
        let config = EngineConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.verification_base_url, "https://verify.dept.example");
    }
}
