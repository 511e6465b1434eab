//! Signed self-update mechanism for standalone executables.
//!
//! This crate lets an executable update itself from a static artifact host.
//! The host publishes a plaintext `VERSION` marker, an armored
//! `signing_key.asc`, and per-release OpenPGP signed payloads under
//! `versions/{version}/{version}-{os}-{arch}.sig`. The updater compares the
//! marker with the running version, downloads and verifies the payload,
//! atomically swaps it over the running executable, and relaunches it with
//! the original arguments and standard streams, exiting with its exit code.
//!
//! ```no_run
//! use autoupdater::{AutoUpdater, UpdateConfig};
//!
//! # fn demo() -> autoupdater::Result<()> {
//! let config = UpdateConfig::new("https://releases.example.com/app", 41);
//! let updater = AutoUpdater::http(config)?;
//!
//! let (available, version) = updater.check_for_update()?;
//! if available {
//!     // Only returns on failure; on success the process exits with the
//!     // relaunched executable's exit code.
//!     updater.perform_update(version)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod config;
mod error;
pub mod fetcher;
pub mod keys;
pub mod path;
pub mod replace;
mod updater;
pub mod verify;
pub mod version;

#[cfg(test)]
mod testing;

use std::convert::Infallible;

pub use artifact::{Platform, SignedArtifact};
pub use config::UpdateConfig;
pub use error::{Result, UpdaterError};
pub use fetcher::{Fetcher, HttpFetcher, HttpFetcherBuilder};
pub use keys::TrustedKey;
pub use replace::{Installation, Replacer, StagedUpdate, SwappedExecutable, STAGING_SUFFIX};
pub use updater::AutoUpdater;
pub use verify::VerifiedPayload;
pub use version::VersionInfo;

/// Check `config`'s host for a newer release over HTTP(S).
///
/// Returns `(true, latest)` when an update is available, `(false, 0)` otherwise.
pub fn check_for_update(config: &UpdateConfig) -> Result<(bool, i64)> {
    AutoUpdater::http(config.clone())?.check_for_update()
}

/// Install `version` from `config`'s host over the running executable and
/// hand the process over to it. Returns only on failure.
pub fn perform_update(config: &UpdateConfig, version: i64) -> Result<Infallible> {
    AutoUpdater::http(config.clone())?.perform_update(version)
}
