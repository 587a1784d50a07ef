//! A single download attempt
//!
//! Starts the downloader, polls it at a fixed interval and reports how the
//! attempt ended. Retries are the caller's business.

use crate::engine::{Downloader, PollStatus};
use crate::error::MagdlError;
use magdl_types::{CoreEvent, MagnetLink};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How long a non-zero exit waits for a pending interrupt to land on the token
const INTERRUPT_GRACE: Duration = Duration::from_millis(250);

/// How a single attempt ended
#[derive(Debug)]
pub enum AttemptOutcome {
    Success,
    Failure(MagdlError),
    Cancelled,
}

/// Run one download attempt to completion, failure or cancellation.
///
/// Cancellation is observed between polls; the active download is aborted
/// before returning. A failure that coincides with cancellation (the child was
/// killed by the same interrupt) is reported as `Cancelled`. The child can see
/// the interrupt before we do, so a retryable failure first waits briefly for
/// the token.
pub async fn attempt_download(
    downloader: &dyn Downloader,
    magnet: &MagnetLink,
    destination: &Path,
    poll_interval: Duration,
    cancel: &CancellationToken,
    events: &broadcast::Sender<CoreEvent>,
) -> AttemptOutcome {
    if cancel.is_cancelled() {
        return AttemptOutcome::Cancelled;
    }

    let mut active = match downloader.start(magnet, destination).await {
        Ok(active) => active,
        Err(e) => return AttemptOutcome::Failure(e),
    };
    debug!("Started {} download into {}", downloader.name(), destination.display());

    let mut awaiting_metadata = false;
    loop {
        match active.poll().await {
            Ok(PollStatus::Complete) => {
                info!("Download finished");
                return AttemptOutcome::Success;
            }
            Ok(PollStatus::AwaitingMetadata) => {
                if !awaiting_metadata {
                    awaiting_metadata = true;
                    let _ = events.send(CoreEvent::AwaitingMetadata);
                }
            }
            Ok(PollStatus::Running(stats)) => {
                if awaiting_metadata {
                    awaiting_metadata = false;
                    let _ = events.send(CoreEvent::MetadataReady);
                }
                if let Some(stats) = stats {
                    let _ = events.send(CoreEvent::Progress(stats));
                }
            }
            Err(_) if cancel.is_cancelled() => {
                active.abort().await;
                return AttemptOutcome::Cancelled;
            }
            Err(e) => {
                if e.is_retryable() && interrupted_soon(cancel).await {
                    debug!("Downloader exited during an interrupt: {}", e);
                    active.abort().await;
                    return AttemptOutcome::Cancelled;
                }
                return AttemptOutcome::Failure(e);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Cancellation requested, stopping download");
                active.abort().await;
                return AttemptOutcome::Cancelled;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}

async fn interrupted_soon(cancel: &CancellationToken) -> bool {
    tokio::time::timeout(INTERRUPT_GRACE, cancel.cancelled())
        .await
        .is_ok()
}
