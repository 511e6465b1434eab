use serde::{Deserialize, Serialize};

/// Immutable description of where updates come from and what is installed.
///
/// The value is owned by the embedding application and passed by reference
/// into every operation; nothing is cached between calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateConfig {
    /// Root address of the artifact host (e.g. `https://releases.example.com/app`).
    pub base_url: String,
    /// Release identifier of the running executable. Higher is newer.
    pub current_version: i64,
    /// Armored public key trusted to sign releases. Fetched from the host when absent.
    #[serde(default)]
    pub trusted_key: Option<String>,
}

impl UpdateConfig {
    /// Create a configuration that fetches the signing key from the host.
    pub fn new(base_url: impl Into<String>, current_version: i64) -> Self {
        Self {
            base_url: base_url.into(),
            current_version,
            trusted_key: None,
        }
    }

    /// Pin the trusted signing key instead of fetching it remotely.
    pub fn with_trusted_key(mut self, armored: impl Into<String>) -> Self {
        self.trusted_key = Some(armored.into());
        self
    }

    /// The embedded key material; only an empty string counts as absent.
    pub fn embedded_key(&self) -> Option<&str> {
        self.trusted_key
            .as_deref()
            .filter(|armored| !armored.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_empty_key_counts_as_absent() {
        let config = UpdateConfig::new("https://example.invalid", 3).with_trusted_key("");
        assert!(config.embedded_key().is_none());

        let config = config.with_trusted_key("  \n");
        assert_eq!(config.embedded_key(), Some("  \n"));

        let config = config.with_trusted_key("-----BEGIN PGP PUBLIC KEY BLOCK-----");
        assert!(config.embedded_key().is_some());
    }

    #[test]
    fn deserializes_without_key() {
        let config: UpdateConfig = serde_json::from_str(
            r#"{ "base_url": "https://example.invalid/app", "current_version": 7 }"#,
        )
        .expect("config parses");
        assert_eq!(config, UpdateConfig::new("https://example.invalid/app", 7));
    }
}
