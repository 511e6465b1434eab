use crate::{
    artifact::fetch_artifact,
    config::UpdateConfig,
    error::Result,
    fetcher::{Fetcher, HttpFetcher},
    keys::resolve_trusted_key,
    replace::{Installation, Replacer},
    verify::{verify, VerifiedPayload},
    version::is_update_available,
};
use std::convert::Infallible;

/// Updater capable of checking for, verifying and installing signed releases.
pub struct AutoUpdater<F = HttpFetcher> {
    config: UpdateConfig,
    fetcher: F,
}

impl AutoUpdater<HttpFetcher> {
    /// Create an updater that talks to the host over HTTP(S).
    pub fn http(config: UpdateConfig) -> Result<Self> {
        Ok(Self::new(config, HttpFetcher::builder().build()?))
    }
}

impl<F> AutoUpdater<F>
where
    F: Fetcher,
{
    /// Create a new updater with the given configuration and fetcher.
    pub fn new(config: UpdateConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    /// Configuration this updater was built with.
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Determine whether the host advertises a version newer than the
    /// configured current version.
    ///
    /// Returns `(true, latest)` or `(false, 0)`.
    pub fn check_for_update(&self) -> Result<(bool, i64)> {
        is_update_available(&self.config, &self.fetcher)
    }

    /// Resolve the trusted key, download the artifact for `version` and
    /// verify it.
    ///
    /// The key is resolved before the artifact is requested, so a key failure
    /// never triggers an artifact download. Any version may be requested,
    /// including older ones to revert.
    pub fn download_verified(&self, version: i64) -> Result<VerifiedPayload> {
        let key = resolve_trusted_key(&self.config, &self.fetcher)?;
        let artifact = fetch_artifact(&self.config, &self.fetcher, version)?;
        verify(&artifact, &key)
    }

    /// Install `version` over `installation`, relaunch it and return the
    /// relaunched process's exit code.
    ///
    /// The calling process keeps running; see [`AutoUpdater::perform_update`]
    /// for the variant that hands the process over.
    pub fn update_installation(&self, version: i64, installation: &Installation) -> Result<i32> {
        self.install(version, installation, || {})
    }

    /// Replace the running executable with `version` and hand over to it.
    ///
    /// On success this never returns: the current process exits with the new
    /// process's exit code once it finishes. An `Err` means the attempt
    /// stopped; only [`crate::UpdaterError::RelaunchFailed`] implies the binary on
    /// disk already changed.
    pub fn perform_update(&self, version: i64) -> Result<Infallible> {
        self.perform_update_with(version, || {})
    }

    /// Like [`AutoUpdater::perform_update`], running `before_relaunch` after
    /// the swap and before the new executable starts, e.g. to flush logs or
    /// close connections.
    pub fn perform_update_with<H>(&self, version: i64, before_relaunch: H) -> Result<Infallible>
    where
        H: FnOnce(),
    {
        let installation = Installation::current()?;
        let code = self.install(version, &installation, before_relaunch)?;
        tracing::info!(code, "relaunched process finished, exiting");
        std::process::exit(code)
    }

    fn install<H>(&self, version: i64, installation: &Installation, before_relaunch: H) -> Result<i32>
    where
        H: FnOnce(),
    {
        let payload = self.download_verified(version)?;
        tracing::info!(
            version,
            signer = payload.signer(),
            sha256 = %payload.sha256_hex(),
            "installing verified update"
        );

        let swapped = Replacer::new(installation).stage(&payload)?.swap()?;
        before_relaunch();
        swapped.relaunch()
    }
}
