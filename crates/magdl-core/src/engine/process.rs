//! Process backend - runs aria2c as a child process
//!
//! The child inherits the terminal so aria2c draws its own progress,
//! unless `quiet` is set, in which case its stdout is discarded.
//! Success or failure is decided by the exit code alone.

use crate::engine::{ActiveDownload, Downloader, PollStatus};
use crate::error::MagdlError;
use crate::install::install_guidance;
use async_trait::async_trait;
use magdl_types::{MagnetLink, ProcessSettings, ToolVersion};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Downloader that shells out to an external executable
pub struct ProcessDownloader {
    settings: ProcessSettings,
}

impl ProcessDownloader {
    pub fn new(settings: ProcessSettings) -> Self {
        Self { settings }
    }

    /// Locate the executable on PATH (or accept an explicit path)
    fn locate(&self) -> Result<PathBuf, MagdlError> {
        which::which(&self.settings.binary).map_err(|_| MagdlError::MissingDependency {
            tool: self.settings.binary.clone(),
            guidance: install_guidance(&self.settings.binary),
        })
    }

    async fn check_version(&self, binary: &Path, required: ToolVersion) -> Result<(), MagdlError> {
        let output = Command::new(binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let found = parse_version_output(&stdout);
        debug!("{} reports version {:?}", binary.display(), found);

        match found {
            Some(version) if version >= required => Ok(()),
            Some(version) => Err(MagdlError::IncompatibleVersion {
                tool: self.settings.binary.clone(),
                found: version.to_string(),
                required: required.to_string(),
            }),
            None => Err(MagdlError::IncompatibleVersion {
                tool: self.settings.binary.clone(),
                found: "an unknown version".to_string(),
                required: required.to_string(),
            }),
        }
    }
}

/// Extract the version from `aria2c --version` output.
///
/// The first line reads `aria2 version 1.37.0`.
pub fn parse_version_output(output: &str) -> Option<ToolVersion> {
    let first = output.lines().next()?;
    let (_, rest) = first.split_once("version")?;
    rest.split_whitespace().next()?.parse().ok()
}

/// Build the fixed argument list passed to aria2c
pub fn build_args(settings: &ProcessSettings, magnet: &MagnetLink, destination: &Path) -> Vec<String> {
    let mut args = vec![
        magnet.as_str().to_string(),
        format!("--dir={}", destination.display()),
        format!("--seed-time={}", settings.seed_time),
        format!("--continue={}", settings.continue_partial),
        format!("--max-concurrent-downloads={}", settings.max_concurrent_downloads),
        format!("--max-connection-per-server={}", settings.max_connection_per_server),
        format!("--split={}", settings.split),
        format!("--enable-dht={}", settings.enable_dht),
        format!("--enable-dht6={}", settings.enable_dht6),
        format!("--bt-enable-lpd={}", settings.enable_lpd),
        format!("--bt-max-open-files={}", settings.max_open_files),
    ];

    if !settings.trackers.is_empty() {
        args.push(format!("--bt-tracker={}", settings.trackers.join(",")));
    }
    if settings.quiet {
        args.push("--quiet=true".to_string());
    }

    args
}

#[async_trait]
impl Downloader for ProcessDownloader {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn check_available(&self) -> Result<(), MagdlError> {
        let binary = self.locate()?;
        info!("Using downloader at {}", binary.display());

        match self.settings.min_version {
            Some(required) => self.check_version(&binary, required).await,
            None => Ok(()),
        }
    }

    async fn start(
        &self,
        magnet: &MagnetLink,
        destination: &Path,
    ) -> Result<Box<dyn ActiveDownload>, MagdlError> {
        let binary = self.locate()?;
        let args = build_args(&self.settings, magnet, destination);
        debug!("Spawning {} {:?}", binary.display(), args);

        let mut command = Command::new(&binary);
        command.args(&args).stdin(Stdio::null()).kill_on_drop(true);
        if self.settings.quiet {
            command.stdout(Stdio::null());
        }
        let child = command.spawn()?;

        Ok(Box::new(ChildDownload { child }))
    }
}

/// A running aria2c child
struct ChildDownload {
    child: Child,
}

#[async_trait]
impl ActiveDownload for ChildDownload {
    async fn poll(&mut self) -> Result<PollStatus, MagdlError> {
        match self.child.try_wait()? {
            None => Ok(PollStatus::Running(None)),
            Some(status) if status.success() => Ok(PollStatus::Complete),
            Some(status) => Err(MagdlError::ExitStatus {
                code: status.code(),
            }),
        }
    }

    async fn abort(&mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("Failed to stop downloader process: {}", e);
        }
    }
}
