//! Secret credential wrapper
//!
//! A `Credential` can only be created from a non-empty, well-formed value and
//! never prints its contents.

use crate::{Error, Result};
use std::fmt;

/// Secret value used to authenticate against a model provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Validate and wrap a secret
    ///
    /// Rejects empty values and values containing whitespace or control
    /// characters.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::Configuration("credential must not be empty".to_string()));
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::Configuration(
                "credential contains whitespace or control characters".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Access the raw secret
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_credential() {
        let credential = Credential::new("test-key-123").unwrap();
        assert_eq!(credential.expose(), "test-key-123");
    }

    #[test]
    fn test_empty_credential_rejected() {
        let err = Credential::new("").unwrap_err();
        assert!(err.is_configuration());

        let err = Credential::new("   ").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_malformed_credential_rejected() {
        assert!(Credential::new("abc def").unwrap_err().is_configuration());
        assert!(Credential::new("abc\n").unwrap_err().is_configuration());
    }

    #[test]
    fn test_credential_is_redacted() {
        let credential = Credential::new("super-secret").unwrap();
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.to_string(), "***");
    }
}
