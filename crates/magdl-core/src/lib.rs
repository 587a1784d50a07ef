//! magdl Core - Download Orchestrator
//!
//! This crate validates a magnet link, prepares the destination directory and
//! hands the transfer to an external downloader, retrying failed attempts a
//! bounded number of times. It never prints; progress and phase changes are
//! broadcast as [`CoreEvent`]s for the caller to render.

pub mod engine;
mod error;
mod install;
mod storage;

#[cfg(test)]
mod test_helpers;

pub use engine::*;
pub use error::*;
pub use install::*;
pub use storage::*;

use chrono::Utc;
use magdl_types::{CoreEvent, DownloadReport, DownloaderKind, MagnetLink, Settings};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The main magdl orchestrator
pub struct Magdl {
    settings: Settings,
    downloader: Arc<dyn Downloader>,
    /// Set once the downloader passed its availability check
    available: OnceCell<()>,
    /// Event broadcaster
    event_tx: broadcast::Sender<CoreEvent>,
    cancel: CancellationToken,
}

impl Magdl {
    /// Create an orchestrator around an explicit downloader
    pub fn new(settings: Settings, downloader: Arc<dyn Downloader>) -> Self {
        let (event_tx, _) = broadcast::channel(1000);

        Self {
            settings,
            downloader,
            available: OnceCell::new(),
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Create an orchestrator with the downloader selected in `settings`
    pub fn from_settings(settings: Settings) -> Self {
        let downloader: Arc<dyn Downloader> = match settings.downloader {
            DownloaderKind::Process => Arc::new(ProcessDownloader::new(settings.process.clone())),
            DownloaderKind::Session => Arc::new(SessionDownloader::new(settings.session.clone())),
        };
        Self::new(settings, downloader)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Subscribe to core events
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_tx.subscribe()
    }

    /// Token that cancels the running download when triggered
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Emit an event
    fn emit(&self, event: CoreEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Verify the downloader can run. The check is performed once.
    pub async fn check_downloader(&self) -> Result<(), MagdlError> {
        self.available
            .get_or_try_init(|| async {
                info!("Checking {} downloader", self.downloader.name());
                self.downloader.check_available().await
            })
            .await
            .map(|_| ())
    }

    /// Download `raw_link` into `destination` (or the configured default).
    ///
    /// Checks run strictly in order: downloader availability, link, directory.
    /// Nothing external is touched until all of them pass.
    pub async fn run(
        &self,
        raw_link: &str,
        destination: Option<&Path>,
    ) -> Result<DownloadReport, MagdlError> {
        self.check_downloader().await?;

        let magnet = MagnetLink::parse(raw_link)?;
        let destination = ensure_directory(&resolve_destination(destination, &self.settings)?).await?;

        let max_attempts = self.settings.max_attempts.max(1);
        let retry_delay = Duration::from_secs(self.settings.retry_delay_secs);
        let poll_interval = Duration::from_millis(self.settings.poll_interval_ms);
        let started_at = Utc::now();

        let mut attempt = 0;
        loop {
            attempt += 1;
            info!("Attempt {}/{} for {}", attempt, max_attempts, magnet);
            self.emit(CoreEvent::AttemptStarted {
                attempt,
                max_attempts,
            });

            let outcome = attempt_download(
                self.downloader.as_ref(),
                &magnet,
                &destination,
                poll_interval,
                &self.cancel,
                &self.event_tx,
            )
            .await;

            let failure = match outcome {
                AttemptOutcome::Success => {
                    self.emit(CoreEvent::Completed {
                        destination: destination.clone(),
                    });
                    return Ok(DownloadReport {
                        magnet,
                        destination,
                        downloader: self.settings.downloader,
                        attempts: attempt,
                        started_at,
                        finished_at: Utc::now(),
                    });
                }
                AttemptOutcome::Cancelled => return Err(MagdlError::Cancelled),
                AttemptOutcome::Failure(e) => e,
            };

            self.emit(CoreEvent::AttemptFailed {
                attempt,
                reason: failure.to_string(),
            });

            if !failure.is_retryable() {
                error!("Download failed: {}", failure);
                return Err(failure);
            }

            if attempt >= max_attempts {
                error!("Download failed after {} attempts: {}", attempt, failure);
                return Err(MagdlError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(failure),
                });
            }

            warn!(
                "Attempt {} failed: {}. Retrying in {}s",
                attempt,
                failure,
                retry_delay.as_secs()
            );
            self.emit(CoreEvent::RetryScheduled {
                next_attempt: attempt + 1,
                delay_secs: retry_delay.as_secs(),
            });

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(MagdlError::Cancelled),
                _ = tokio::time::sleep(retry_delay) => {}
            }
        }
    }
}
