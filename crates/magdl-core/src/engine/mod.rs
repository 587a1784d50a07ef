//! Download engine - the external downloaders magdl can drive
//!
//! Each backend implements [`Downloader`]:
//! - `ProcessDownloader` spawns an external executable (aria2c)
//! - `SessionDownloader` drives an embedded BitTorrent session (librqbit)
//!
//! A single attempt against either backend is run by [`attempt_download`].

mod attempt;
mod process;
mod session;

pub use attempt::*;
pub use process::*;
pub use session::*;

use crate::error::MagdlError;
use async_trait::async_trait;
use magdl_types::{MagnetLink, TransferStats};
use std::path::Path;

/// What a running download reported on its latest check
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// The torrent description is still being fetched from peers
    AwaitingMetadata,
    /// Transfer in progress; stats are `None` when the backend exposes none
    Running(Option<TransferStats>),
    /// Everything has been downloaded
    Complete,
}

/// An external downloader capable of fetching a magnet link
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &'static str;

    /// Verify the backend can run on this system.
    ///
    /// Failure here is terminal and never retried.
    async fn check_available(&self) -> Result<(), MagdlError>;

    /// Begin downloading `magnet` into `destination`
    async fn start(
        &self,
        magnet: &MagnetLink,
        destination: &Path,
    ) -> Result<Box<dyn ActiveDownload>, MagdlError>;
}

/// Handle to a download started by a [`Downloader`]
#[async_trait]
pub trait ActiveDownload: Send {
    /// Check progress without blocking for long.
    ///
    /// An `Err` ends the attempt.
    async fn poll(&mut self) -> Result<PollStatus, MagdlError>;

    /// Stop the download. Called on cancellation.
    async fn abort(&mut self);
}
