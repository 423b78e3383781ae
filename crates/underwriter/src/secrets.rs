//! Secret resolution for credentials (SAS tokens, API keys).
//!
//! A secret may be given in the config file in one of three ways, checked
//! in this order:
//!
//! 1. **Direct value**: `"sasToken": {"value": "sv=..."}`
//! 2. **File reference**: `"sasToken": {"file": "/run/secrets/sas"}`
//! 3. **Env var reference**: `"sasToken": {"env": "MY_SAS_VAR"}`
//!
//! When none of those is set, the well-known environment variables for the
//! credential are tried in order.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },

    #[error("Secret from {origin} is empty")]
    Empty { origin: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Where to find one secret. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

impl SecretRef {
    pub fn is_configured(&self) -> bool {
        [&self.value, &self.file, &self.env]
            .iter()
            .any(|s| s.as_deref().is_some_and(|s| !s.is_empty()))
    }

    /// Resolves the secret, falling back to the first of `fallback_env`
    /// that is set. Returns `None` if nothing provides a value.
    ///
    /// An explicitly referenced file or env var that cannot be read is an
    /// error rather than a silent fallback.
    pub fn resolve(&self, fallback_env: &[&str]) -> Result<Option<SecretString>> {
        if let Some(value) = self.value.as_deref().filter(|v| !v.is_empty()) {
            return Ok(Some(SecretString::from(value)));
        }

        if let Some(path) = self.file.as_deref().filter(|p| !p.is_empty()) {
            let expanded = expand_home(path);
            let content =
                fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
                    path: expanded.clone(),
                    source: e,
                })?;
            return non_empty(content.trim(), &expanded).map(Some);
        }

        if let Some(name) = self.env.as_deref().filter(|n| !n.is_empty()) {
            return read_env(name)?
                .ok_or_else(|| SecretError::EnvVarNotSet {
                    name: name.to_string(),
                })
                .and_then(|v| non_empty(&v, name))
                .map(Some);
        }

        for name in fallback_env {
            if let Some(value) = read_env(name)? {
                if !value.is_empty() {
                    return Ok(Some(SecretString::from(value)));
                }
            }
        }

        Ok(None)
    }
}

fn non_empty(value: &str, origin: &str) -> Result<SecretString> {
    if value.is_empty() {
        Err(SecretError::Empty {
            origin: origin.to_string(),
        })
    } else {
        Ok(SecretString::from(value))
    }
}

/// Reads and trims an env var; unset is `Ok(None)`.
fn read_env(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
            name: name.to_string(),
        }),
    }
}

/// Expands a leading `~` or `~/` to the user's home directory.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn exposed(secret: Option<SecretString>) -> Option<String> {
        secret.map(|s| s.expose_secret().to_string())
    }

    #[test]
    #[serial]
    fn test_direct_value_takes_priority() {
        std::env::set_var("UW_TEST_SECRET_1", "env_value");
        let secret = SecretRef {
            value: Some("direct_value".to_string()),
            env: Some("UW_TEST_SECRET_1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            exposed(secret.resolve(&[]).unwrap()).as_deref(),
            Some("direct_value")
        );
        std::env::remove_var("UW_TEST_SECRET_1");
    }

    #[test]
    #[serial]
    fn test_file_takes_priority_over_env() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "  file_value  ").unwrap();

        std::env::set_var("UW_TEST_SECRET_2", "env_value");
        let secret = SecretRef {
            file: Some(temp_file.path().to_string_lossy().into_owned()),
            env: Some("UW_TEST_SECRET_2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            exposed(secret.resolve(&[]).unwrap()).as_deref(),
            Some("file_value")
        );
        std::env::remove_var("UW_TEST_SECRET_2");
    }

    #[test]
    #[serial]
    fn test_fallback_env_in_order() {
        std::env::remove_var("UW_TEST_PRIMARY");
        std::env::set_var("UW_TEST_SECONDARY", "second");
        let secret = SecretRef::default();
        assert_eq!(
            exposed(
                secret
                    .resolve(&["UW_TEST_PRIMARY", "UW_TEST_SECONDARY"])
                    .unwrap()
            )
            .as_deref(),
            Some("second")
        );
        std::env::remove_var("UW_TEST_SECONDARY");
    }

    #[test]
    #[serial]
    fn test_nothing_configured_is_none() {
        std::env::remove_var("UW_TEST_UNSET");
        assert!(SecretRef::default()
            .resolve(&["UW_TEST_UNSET"])
            .unwrap()
            .is_none());
        assert!(!SecretRef::default().is_configured());
    }

    #[test]
    #[serial]
    fn test_explicit_env_missing_is_error() {
        std::env::remove_var("UW_TEST_MISSING");
        let secret = SecretRef {
            env: Some("UW_TEST_MISSING".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            secret.resolve(&[]),
            Err(SecretError::EnvVarNotSet { .. })
        ));
    }

    #[test]
    fn test_file_not_found_error() {
        let secret = SecretRef {
            file: Some("/nonexistent/path/to/secret".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            secret.resolve(&[]),
            Err(SecretError::FileReadError { .. })
        ));
    }

    #[test]
    fn test_secret_ref_rejects_unknown_keys() {
        let parsed: std::result::Result<SecretRef, _> =
            serde_json::from_str(r#"{"value": "x", "passwordFile": "/tmp/p"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/absolute/path"), "/absolute/path");
        assert_eq!(expand_home("relative/path"), "relative/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home("~/token"),
                format!("{}/token", home.to_string_lossy())
            );
        }
    }
}
