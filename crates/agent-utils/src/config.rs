//! Environment configuration helpers
//!
//! Secrets and endpoints are read from the process environment; nothing in
//! this workspace embeds a credential literal.

use thiserror::Error;

/// Errors raised while reading configuration from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// None of the listed variables is set to a non-empty value
    #[error("environment variable not set: {}", .0.join(" or "))]
    Missing(Vec<String>),
}

/// Read a required environment variable
///
/// Empty values count as missing.
pub fn require_env(name: &str) -> Result<String, ConfigError> {
    first_env(&[name])
}

/// Read the first of several environment variables that is set and non-empty
pub fn first_env(names: &[&str]) -> Result<String, ConfigError> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| ConfigError::Missing(names.iter().map(ToString::to_string).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names; the process environment is shared.

    #[test]
    fn test_require_env_missing() {
        let err = require_env("AGENT_UTILS_TEST_UNSET_VAR").unwrap_err();
        assert_eq!(
            err.to_string(),
            "environment variable not set: AGENT_UTILS_TEST_UNSET_VAR"
        );
    }

    #[test]
    fn test_first_env_prefers_earlier_names() {
        // SAFETY: variables are unique to this test
        unsafe {
            std::env::set_var("AGENT_UTILS_TEST_FIRST_A", "");
            std::env::set_var("AGENT_UTILS_TEST_FIRST_B", "beta");
            std::env::set_var("AGENT_UTILS_TEST_FIRST_C", "gamma");
        }
        let value = first_env(&[
            "AGENT_UTILS_TEST_FIRST_A",
            "AGENT_UTILS_TEST_FIRST_B",
            "AGENT_UTILS_TEST_FIRST_C",
        ])
        .unwrap();
        assert_eq!(value, "beta");
    }
}
