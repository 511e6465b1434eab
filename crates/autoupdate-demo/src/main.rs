use anyhow::{Context, Result};
use autoupdater::{AutoUpdater, UpdateConfig, UpdaterError};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Release identifier stamped at build time, e.g. `AUTOUPDATE_VERSION=42 cargo build`.
const BUILD_VERSION: Option<&str> = option_env!("AUTOUPDATE_VERSION");

/// Armored release signing key embedded at build time. Fetched from the host when unset.
const BUILD_SIGNER: Option<&str> = option_env!("AUTOUPDATE_SIGNER");

/// Command-line arguments for the demo executable
#[derive(Parser, Debug)]
#[command(version, about = "Hello world that keeps itself up to date")]
struct Args {
    /// Root address of the artifact host
    #[arg(
        long,
        env = "AUTOUPDATE_BASE_URL",
        default_value = "https://storage.googleapis.com/autoupdater-artifacts"
    )]
    base_url: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Only report whether an update is available
    #[arg(long)]
    check_only: bool,

    /// Install this release instead of the latest one (lower numbers revert)
    #[arg(long, value_name = "VERSION")]
    version_override: Option<i64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let current_version = build_version();
    let mut config = UpdateConfig::new(args.base_url.clone(), current_version);
    if let Some(signer) = BUILD_SIGNER {
        config = config.with_trusted_key(signer);
    }

    if let Err(err) = self_update(&args, config) {
        error!("Unable to do automatic updates: {err:#}");
        let replaced = err
            .downcast_ref::<UpdaterError>()
            .is_some_and(UpdaterError::binary_replaced);
        if replaced {
            return Err(err.context("executable was replaced but the new version did not run"));
        }
    }

    println!("Hello world! From version: {current_version}");
    Ok(())
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_version() -> i64 {
    let stamped = BUILD_VERSION.unwrap_or("0");
    stamped.parse().unwrap_or_else(|err| {
        error!("Unable to parse version {stamped:?}: {err}");
        0
    })
}

fn self_update(args: &Args, config: UpdateConfig) -> Result<()> {
    let updater = AutoUpdater::http(config).context("building HTTP client")?;
    let current = updater.config().current_version;

    let target = match args.version_override {
        // The relaunched process sees the same flag; stop once it is installed.
        Some(version) if version == current => {
            info!(version, "requested release already running");
            return Ok(());
        }
        Some(version) => version,
        None => {
            let (available, latest) = updater
                .check_for_update()
                .context("checking for updates")?;
            if !available {
                info!(current, "already up to date");
                return Ok(());
            }
            latest
        }
    };

    if args.check_only {
        info!(current, available = target, "update available");
        return Ok(());
    }

    info!(current, target, "Update available, attempting update.");
    match updater.perform_update_with(target, || info!("handing over to the new executable")) {
        Ok(never) => match never {},
        Err(err) => Err(err).with_context(|| format!("updating to version {target}")),
    }
}
