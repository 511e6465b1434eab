use crate::{
    config::UpdateConfig,
    error::{Result, UpdaterError},
    fetcher::Fetcher,
    path,
};
use pgp::{types::PublicKeyTrait, Deserializable, SignedPublicKey};
use std::io::Cursor;

/// Resource holding the armored release signing key.
pub const SIGNING_KEY_RESOURCE: &str = "signing_key.asc";

/// Public keyring trusted to sign releases.
///
/// Built once per update attempt and never persisted.
#[derive(Debug, Clone)]
pub struct TrustedKey {
    keys: Vec<SignedPublicKey>,
}

impl TrustedKey {
    /// Parse an armored public key block, which may hold several keys.
    ///
    /// Every key's self-signatures must verify.
    pub fn from_armored(armored: &str) -> Result<Self> {
        let (parsed, _headers) = SignedPublicKey::from_armor_many(Cursor::new(armored.as_bytes()))
            .map_err(|err| UpdaterError::KeyUnavailable(format!("unreadable key block: {err}")))?;
        let keys = parsed
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| UpdaterError::KeyUnavailable(format!("unreadable public key: {err}")))?;

        if keys.is_empty() {
            return Err(UpdaterError::KeyUnavailable(
                "key block holds no public keys".into(),
            ));
        }

        for key in &keys {
            key.verify().map_err(|err| {
                UpdaterError::KeyUnavailable(format!(
                    "key {} failed self-verification: {err}",
                    hex::encode(key.key_id())
                ))
            })?;
        }

        Ok(Self { keys })
    }

    /// Keys in the ring, primary keys with their subkeys attached.
    pub fn keys(&self) -> &[SignedPublicKey] {
        &self.keys
    }

    /// Hex-encoded ids of the primary keys.
    pub fn key_ids(&self) -> Vec<String> {
        self.keys
            .iter()
            .map(|key| hex::encode(key.key_id()))
            .collect()
    }
}

/// Obtain the trusted key, preferring the configured key material.
///
/// Without embedded material the key is fetched from the host. Every failure
/// is reported as [`UpdaterError::KeyUnavailable`]; there is no fallback.
pub fn resolve_trusted_key<F: Fetcher>(config: &UpdateConfig, fetcher: &F) -> Result<TrustedKey> {
    if let Some(armored) = config.embedded_key() {
        tracing::debug!("using embedded signing key");
        return TrustedKey::from_armored(armored);
    }

    let url = path::resolve(&config.base_url, &[SIGNING_KEY_RESOURCE])?;
    tracing::debug!(%url, "fetching signing key");
    let body = fetcher
        .fetch(&url)
        .map_err(|err| UpdaterError::KeyUnavailable(err.to_string()))?;
    let armored = std::str::from_utf8(&body)
        .map_err(|_| UpdaterError::KeyUnavailable("signing key is not valid UTF-8".into()))?;

    TrustedKey::from_armored(armored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFetcher, KEYRING, TRUSTED_KEY};

    const BASE: &str = "https://releases.example.invalid/app";

    #[test]
    fn parses_armored_key() {
        let key = TrustedKey::from_armored(TRUSTED_KEY).expect("fixture key parses");
        assert_eq!(key.key_ids(), vec!["4c0d0ca9d5e7cdf6".to_string()]);
    }

    #[test]
    fn parses_multi_key_block() {
        let key = TrustedKey::from_armored(KEYRING).expect("keyring parses");
        assert_eq!(
            key.key_ids(),
            vec!["4c0d0ca9d5e7cdf6".to_string(), "b715e1fad9700d3f".to_string()]
        );
    }

    #[test]
    fn garbage_key_is_unavailable() {
        let err = TrustedKey::from_armored("not a key").unwrap_err();
        assert!(matches!(err, UpdaterError::KeyUnavailable(_)));
    }

    #[test]
    fn embedded_key_skips_network() {
        let config = UpdateConfig::new(BASE, 1).with_trusted_key(TRUSTED_KEY);
        let fetcher = MockFetcher::new();
        resolve_trusted_key(&config, &fetcher).expect("embedded key parses");
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn whitespace_key_is_parsed_not_fetched() {
        let config = UpdateConfig::new(BASE, 1).with_trusted_key(" \n\t");
        let fetcher = MockFetcher::new();

        let err = resolve_trusted_key(&config, &fetcher).unwrap_err();
        assert!(matches!(err, UpdaterError::KeyUnavailable(_)));
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn remote_key_is_fetched_from_host() {
        let config = UpdateConfig::new(BASE, 1);
        let mut fetcher = MockFetcher::new();
        fetcher.insert(
            &format!("{BASE}/signing_key.asc"),
            TRUSTED_KEY.as_bytes().to_vec(),
        );

        let key = resolve_trusted_key(&config, &fetcher).expect("remote key parses");
        assert_eq!(key.keys().len(), 1);
        assert_eq!(fetcher.requests(), vec![format!("{BASE}/signing_key.asc")]);
    }

    #[test]
    fn unreachable_key_host_is_unavailable() {
        let config = UpdateConfig::new(BASE, 1);
        let mut fetcher = MockFetcher::new();
        fetcher.unreachable(&format!("{BASE}/signing_key.asc"));

        let err = resolve_trusted_key(&config, &fetcher).unwrap_err();
        assert!(matches!(err, UpdaterError::KeyUnavailable(_)));
    }
}
