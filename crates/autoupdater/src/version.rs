use crate::{
    config::UpdateConfig,
    error::{Result, UpdaterError},
    fetcher::Fetcher,
    path,
};

/// Resource holding the latest published version.
pub const VERSION_MARKER: &str = "VERSION";

/// Latest version advertised by the artifact host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionInfo {
    /// Release identifier. Higher is newer.
    pub version: i64,
}

impl VersionInfo {
    /// Parse the body of a version marker.
    ///
    /// The body must be exactly a base-10 integer with an optional sign; any
    /// whitespace, including a trailing newline, is rejected.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(body)
            .map_err(|_| UpdaterError::MalformedVersion(String::from_utf8_lossy(body).into_owned()))?;
        text.parse::<i64>()
            .map(|version| VersionInfo { version })
            .map_err(|_| UpdaterError::MalformedVersion(text.to_string()))
    }
}

/// Fetch and parse the version marker from the host.
pub fn fetch_latest_version<F: Fetcher>(config: &UpdateConfig, fetcher: &F) -> Result<VersionInfo> {
    let url = path::resolve(&config.base_url, &[VERSION_MARKER])?;
    let body = fetcher.fetch(&url)?;
    VersionInfo::parse(&body)
}

/// Compare the advertised version against the running one.
///
/// Returns `(true, latest)` only when the host advertises a strictly greater
/// version, and `(false, 0)` otherwise.
pub fn is_update_available<F: Fetcher>(config: &UpdateConfig, fetcher: &F) -> Result<(bool, i64)> {
    let latest = fetch_latest_version(config, fetcher)?;
    if latest.version > config.current_version {
        tracing::debug!(
            current = config.current_version,
            latest = latest.version,
            "update available"
        );
        Ok((true, latest.version))
    } else {
        Ok((false, 0))
    }
}
