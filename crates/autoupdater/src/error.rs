use std::path::PathBuf;

/// Convenient result alias for updater operations.
pub type Result<T> = std::result::Result<T, UpdaterError>;

/// Errors that can occur while checking for or applying an update.
///
/// Every variant is terminal for the current update attempt. Only
/// [`UpdaterError::RelaunchFailed`] is raised after the live executable has
/// been replaced on disk.
#[derive(thiserror::Error, Debug)]
pub enum UpdaterError {
    /// The base location (or a joined address) is not a valid absolute URL.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        /// Address that failed to parse.
        address: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// A request to the artifact host failed or returned a non-200 status.
    #[error("{}", transport_message(.url, .status))]
    Transport {
        /// Address that was requested.
        url: String,
        /// HTTP status when the host answered with something other than 200.
        status: Option<u16>,
        /// Underlying client error, if any.
        #[source]
        source: Option<reqwest::Error>,
    },
    /// The version marker body was not a clean base-10 integer.
    #[error("malformed version marker: {0:?}")]
    MalformedVersion(String),
    /// The trusted signing key could not be obtained or parsed.
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),
    /// The artifact signature could not be validated against the trusted key.
    #[error("update verification failed: {0}")]
    VerificationFailed(String),
    /// A file already occupies the staging path.
    #[error("staging path already exists: {0}")]
    PathConflict(PathBuf),
    /// Staging or swapping the executable failed; the old binary is intact.
    #[error("failed to replace {path}: {source}")]
    ReplaceFailed {
        /// Path that was being written or renamed.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The new executable is on disk but could not be run to completion.
    #[error("relaunch of {path} failed: {reason}")]
    RelaunchFailed {
        /// Executable that was being relaunched.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
}

fn transport_message(url: &str, status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("request to {url} returned HTTP {code}"),
        None => format!("request to {url} failed"),
    }
}

impl UpdaterError {
    /// Helper for failed requests that never produced a response.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        UpdaterError::Transport {
            url: url.into(),
            status: source.status().map(|status| status.as_u16()),
            source: Some(source),
        }
    }

    /// Helper for responses with an unexpected HTTP status.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        UpdaterError::Transport {
            url: url.into(),
            status: Some(status),
            source: None,
        }
    }

    /// HTTP status carried by a transport error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            UpdaterError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the executable on disk may already have been replaced.
    pub fn binary_replaced(&self) -> bool {
        matches!(self, UpdaterError::RelaunchFailed { .. })
    }

    pub(crate) fn replace_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UpdaterError::ReplaceFailed {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn relaunch_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        UpdaterError::RelaunchFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
