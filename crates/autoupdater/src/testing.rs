//! In-memory artifact host used by unit tests.

use crate::artifact::{Platform, SignedArtifact};
use crate::error::{Result, UpdaterError};
use crate::fetcher::Fetcher;
use crate::keys::TrustedKey;
use crate::verify::{verify, VerifiedPayload};
use bytes::Bytes;
use reqwest::Url;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

pub(crate) const TRUSTED_KEY: &str = include_str!("../tests/fixtures/signing_key.asc");
pub(crate) const KEYRING: &str = include_str!("../tests/fixtures/keyring.asc");
pub(crate) const ROGUE_KEY: &str = include_str!("../tests/fixtures/rogue_key.asc");
pub(crate) const PAYLOAD: &[u8] = include_bytes!("../tests/fixtures/payload.sh");
pub(crate) const SIGNED: &[u8] = include_bytes!("../tests/fixtures/payload.sh.sig");
pub(crate) const SIGNED_PLAIN: &[u8] = include_bytes!("../tests/fixtures/payload.sh.plain.sig");
pub(crate) const SIGNED_ARMORED: &[u8] = include_bytes!("../tests/fixtures/payload.sh.asc");
pub(crate) const SIGNED_BY_ROGUE: &[u8] = include_bytes!("../tests/fixtures/payload.sh.rogue.sig");
pub(crate) const UNSIGNED: &[u8] = include_bytes!("../tests/fixtures/payload.sh.unsigned");

pub(crate) struct MockFetcher {
    entries: HashMap<String, Vec<u8>>,
    unreachable: HashSet<String>,
    requests: RefCell<Vec<String>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            unreachable: HashSet::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn insert(&mut self, url: &str, data: Vec<u8>) {
        self.entries.insert(url.to_string(), data);
    }

    /// Requests to `url` fail as if the connection was refused.
    pub(crate) fn unreachable(&mut self, url: &str) {
        self.unreachable.insert(url.to_string());
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &Url) -> Result<Bytes> {
        self.requests.borrow_mut().push(url.to_string());
        if self.unreachable.contains(url.as_str()) {
            return Err(UpdaterError::Transport {
                url: url.to_string(),
                status: None,
                source: None,
            });
        }
        self.entries
            .get(url.as_str())
            .map(|data| Bytes::from(data.clone()))
            .ok_or_else(|| UpdaterError::status(url.as_str(), 404))
    }
}

/// Payload of the trusted fixture, produced through the real verifier.
pub(crate) fn verified_payload() -> VerifiedPayload {
    let artifact = SignedArtifact::new(5, Platform::from_target("linux", "x86_64"), SIGNED);
    let key = TrustedKey::from_armored(TRUSTED_KEY).expect("fixture key parses");
    verify(&artifact, &key).expect("fixture verifies")
}
