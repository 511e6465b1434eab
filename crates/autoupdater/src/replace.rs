//! On-disk replacement of the running executable and the hand-off to it.
//!
//! The sequence is a small state machine encoded in types:
//! [`Replacer::stage`] writes the verified payload next to the executable,
//! [`StagedUpdate::swap`] renames it over the live path, and
//! [`SwappedExecutable::relaunch`] runs the new binary to completion.
//! Each transition consumes the previous state, so a swap cannot happen
//! without a completed staging write.

use crate::{
    error::{Result, UpdaterError},
    verify::VerifiedPayload,
};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Suffix appended to the executable path to form the staging path.
pub const STAGING_SUFFIX: &str = ".update";

/// An installed executable and the arguments it was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    executable: PathBuf,
    args: Vec<OsString>,
}

impl Installation {
    /// Describe an installation explicitly.
    ///
    /// `args` excludes the program name.
    pub fn new<I, S>(executable: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            executable: executable.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The running process: its executable path and its arguments.
    pub fn current() -> Result<Self> {
        let executable = std::env::current_exe()
            .map_err(|err| UpdaterError::replace_failed("<current executable>", err))?;
        Ok(Self::new(executable, std::env::args_os().skip(1)))
    }

    /// Path of the live executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments forwarded on relaunch.
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Sibling path the payload is written to before the swap.
    pub fn staging_path(&self) -> PathBuf {
        let mut staging = self.executable.clone().into_os_string();
        staging.push(STAGING_SUFFIX);
        PathBuf::from(staging)
    }
}

/// Entry point of the replacement sequence.
pub struct Replacer<'a> {
    installation: &'a Installation,
}

impl<'a> Replacer<'a> {
    /// Prepare to replace `installation`.
    pub fn new(installation: &'a Installation) -> Self {
        Self { installation }
    }

    /// Write `payload` to the staging path with executable permissions.
    ///
    /// An existing file at the staging path is never overwritten or removed;
    /// it yields [`UpdaterError::PathConflict`].
    pub fn stage(self, payload: &VerifiedPayload) -> Result<StagedUpdate<'a>> {
        let executable = self.installation.executable();
        if !executable.is_absolute() {
            return Err(UpdaterError::replace_failed(
                executable,
                io::Error::new(io::ErrorKind::InvalidInput, "executable path must be absolute"),
            ));
        }

        let staging = self.installation.staging_path();
        let mut file = match create_staging_file(&staging) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(UpdaterError::PathConflict(staging));
            }
            Err(err) => return Err(UpdaterError::replace_failed(staging, err)),
        };

        if let Err(err) = write_executable(&mut file, payload.as_bytes()) {
            drop(file);
            // Created by this call.
            let _ = fs::remove_file(&staging);
            return Err(UpdaterError::replace_failed(staging, err));
        }

        tracing::debug!(path = %staging.display(), version = payload.version(), "payload staged");
        Ok(StagedUpdate {
            installation: self.installation,
            staging,
        })
    }
}

/// Verified payload written to the staging path; the live binary is untouched.
pub struct StagedUpdate<'a> {
    installation: &'a Installation,
    staging: PathBuf,
}

impl<'a> StagedUpdate<'a> {
    /// Path holding the staged payload.
    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    /// Atomically rename the staged payload onto the live executable.
    ///
    /// Both paths live in the same directory, so the rename stays on one
    /// filesystem. On failure the old executable is still in place.
    pub fn swap(self) -> Result<SwappedExecutable<'a>> {
        let executable = self.installation.executable();
        if let Err(err) = fs::rename(&self.staging, executable) {
            let _ = fs::remove_file(&self.staging);
            return Err(UpdaterError::replace_failed(executable, err));
        }

        tracing::info!(path = %executable.display(), "executable replaced");
        Ok(SwappedExecutable {
            installation: self.installation,
        })
    }
}

/// The live path now holds the new executable.
pub struct SwappedExecutable<'a> {
    installation: &'a Installation,
}

impl SwappedExecutable<'_> {
    /// Run the new executable with the original arguments and standard
    /// streams, wait for it, and return its exit code.
    ///
    /// Any failure here is [`UpdaterError::RelaunchFailed`]: the binary on
    /// disk has already changed.
    pub fn relaunch(self) -> Result<i32> {
        let executable = self.installation.executable();
        tracing::debug!(path = %executable.display(), "relaunching");

        let status = Command::new(executable)
            .args(self.installation.args())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|err| UpdaterError::relaunch_failed(executable, format!("cannot start: {err}")))?;

        exit_code(&status).ok_or_else(|| {
            UpdaterError::relaunch_failed(executable, format!("no exit code in {status}"))
        })
    }
}

fn create_staging_file(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }
    options.open(path)
}

fn write_executable(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // The creation mode is filtered by the umask.
        file.set_permissions(fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

/// Portable exit code of a finished child.
///
/// On Unix a child terminated by signal `N` reports `128 + N`, as shells do.
#[cfg(unix)]
fn exit_code(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.code().or_else(|| status.signal().map(|signal| 128 + signal))
}

#[cfg(not(unix))]
fn exit_code(status: &ExitStatus) -> Option<i32> {
    status.code()
}
