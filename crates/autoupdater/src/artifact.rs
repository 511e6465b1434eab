use crate::{config::UpdateConfig, error::Result, fetcher::Fetcher, path};
use bytes::Bytes;
use std::fmt;

/// Operating system and architecture names used in artifact file names.
///
/// Names follow the release pipeline's convention (`linux`, `darwin`,
/// `amd64`, `arm64`, ...) rather than Rust's target constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system name, e.g. `linux`.
    pub os: String,
    /// CPU architecture name, e.g. `amd64`.
    pub arch: String,
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Self {
        Self::from_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map Rust target names onto release names.
    pub fn from_target(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            "powerpc64" => "ppc64",
            "loongarch64" => "loong64",
            other => other,
        };

        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Signed release payload as downloaded, not yet trusted.
#[derive(Debug, Clone)]
pub struct SignedArtifact {
    version: i64,
    platform: Platform,
    bytes: Bytes,
}

impl SignedArtifact {
    /// Wrap downloaded bytes for the given release coordinates.
    pub fn new(version: i64, platform: Platform, bytes: impl Into<Bytes>) -> Self {
        Self {
            version,
            platform,
            bytes: bytes.into(),
        }
    }

    /// Version the artifact was requested for.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Platform the artifact was requested for.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Raw signed message bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// File name of the signed artifact, `{version}-{os}-{arch}.sig`.
pub fn artifact_file_name(version: i64, platform: &Platform) -> String {
    format!("{version}-{platform}.sig")
}

/// Download the signed artifact for `version` built for the running platform.
pub fn fetch_artifact<F: Fetcher>(
    config: &UpdateConfig,
    fetcher: &F,
    version: i64,
) -> Result<SignedArtifact> {
    fetch_artifact_for(config, fetcher, version, Platform::current())
}

pub(crate) fn fetch_artifact_for<F: Fetcher>(
    config: &UpdateConfig,
    fetcher: &F,
    version: i64,
    platform: Platform,
) -> Result<SignedArtifact> {
    let version_dir = version.to_string();
    let file_name = artifact_file_name(version, &platform);
    let url = path::resolve(&config.base_url, &["versions", &version_dir, &file_name])?;

    tracing::debug!(%url, version, "fetching signed artifact");
    let bytes = fetcher.fetch(&url)?;
    Ok(SignedArtifact::new(version, platform, bytes))
}
