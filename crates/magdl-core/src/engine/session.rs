//! Session backend - drives an embedded librqbit session
//!
//! Adding a magnet link resolves its metadata from peers first, which can take
//! a while. That step runs on a background task so `poll` can report it.
//!
//! The session keeps no state of its own on disk: DHT state and session
//! persistence are both off, so only the destination directory is written.

use crate::engine::{ActiveDownload, Downloader, PollStatus};
use crate::error::MagdlError;
use async_trait::async_trait;
use librqbit::{
    AddTorrent, AddTorrentOptions, AddTorrentResponse, ManagedTorrent, Session, SessionOptions,
    TorrentStats,
};
use magdl_types::{MagnetLink, SessionSettings, TransferStats};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Downloader backed by an in-process BitTorrent session
pub struct SessionDownloader {
    settings: SessionSettings,
    session: OnceCell<Arc<Session>>,
}

impl SessionDownloader {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            session: OnceCell::new(),
        }
    }

    /// Get the session, constructing it on first use
    async fn session(&self) -> Result<Arc<Session>, MagdlError> {
        self.session
            .get_or_try_init(|| async {
                let default_folder = std::env::current_dir()?;
                info!(
                    "Starting torrent session on ports {}..{}",
                    self.settings.listen_port_start, self.settings.listen_port_end
                );

                Session::new_with_opts(default_folder, session_options(&self.settings))
                    .await
                    .map_err(|e| MagdlError::Session(format!("{:#}", e)))
            })
            .await
            .cloned()
    }
}

fn session_options(settings: &SessionSettings) -> SessionOptions {
    SessionOptions {
        disable_dht: !settings.enable_dht,
        disable_dht_persistence: true,
        persistence: None,
        fastresume: false,
        listen_port_range: Some(settings.listen_port_start..settings.listen_port_end),
        ..Default::default()
    }
}

/// Decide whether a torrent the session already knows may be downloaded again
fn accept_existing(already_managed: bool, reject_duplicates: bool) -> Result<(), MagdlError> {
    if already_managed && reject_duplicates {
        Err(MagdlError::Duplicate)
    } else {
        Ok(())
    }
}

fn mib_to_bytes(mbps: f64) -> u64 {
    (mbps * BYTES_PER_MIB) as u64
}

/// Map a librqbit stats snapshot onto a poll result
fn poll_status(stats: &TorrentStats) -> Result<PollStatus, MagdlError> {
    if let Some(error) = &stats.error {
        return Err(MagdlError::Session(error.clone()));
    }
    if stats.finished {
        return Ok(PollStatus::Complete);
    }

    let (download_rate, upload_rate, peers) = match &stats.live {
        Some(live) => (
            mib_to_bytes(live.download_speed.mbps),
            mib_to_bytes(live.upload_speed.mbps),
            live.snapshot.peer_stats.live as u32,
        ),
        None => (0, 0, 0),
    };

    Ok(PollStatus::Running(Some(TransferStats {
        downloaded_bytes: stats.progress_bytes,
        total_bytes: stats.total_bytes,
        uploaded_bytes: stats.uploaded_bytes,
        download_rate,
        upload_rate,
        peers,
    })))
}

#[async_trait]
impl Downloader for SessionDownloader {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn check_available(&self) -> Result<(), MagdlError> {
        self.session().await.map(|_| ())
    }

    async fn start(
        &self,
        magnet: &MagnetLink,
        destination: &Path,
    ) -> Result<Box<dyn ActiveDownload>, MagdlError> {
        let session = self.session().await?;
        let uri = magnet.as_str().to_string();
        let output_folder = destination.to_string_lossy().into_owned();
        let reject_duplicates = self.settings.reject_duplicates;

        let resolver = {
            let session = session.clone();
            tokio::spawn(async move {
                let options = AddTorrentOptions {
                    output_folder: Some(output_folder),
                    // Reuse partial files left by an earlier run
                    overwrite: true,
                    ..Default::default()
                };
                let response = session
                    .add_torrent(AddTorrent::from_url(uri), Some(options))
                    .await
                    .map_err(|e| MagdlError::Session(format!("{:#}", e)))?;

                match response {
                    AddTorrentResponse::Added(_, handle) => Ok(handle),
                    AddTorrentResponse::AlreadyManaged(_, handle) => {
                        accept_existing(true, reject_duplicates)?;
                        Ok(handle)
                    }
                    AddTorrentResponse::ListOnly(_) => Err(MagdlError::Session(
                        "session returned a file listing instead of a download".to_string(),
                    )),
                }
            })
        };

        Ok(Box::new(TorrentDownload {
            session,
            destination: destination.to_path_buf(),
            phase: Phase::Resolving(resolver),
        }))
    }
}

enum Phase {
    Resolving(JoinHandle<Result<Arc<ManagedTorrent>, MagdlError>>),
    Transferring(Arc<ManagedTorrent>),
    Stopped,
}

/// A magnet link added to the session
struct TorrentDownload {
    session: Arc<Session>,
    destination: PathBuf,
    phase: Phase,
}

#[async_trait]
impl ActiveDownload for TorrentDownload {
    async fn poll(&mut self) -> Result<PollStatus, MagdlError> {
        if let Phase::Resolving(resolver) = &mut self.phase {
            if !resolver.is_finished() {
                return Ok(PollStatus::AwaitingMetadata);
            }
            let handle = resolver
                .await
                .map_err(|e| MagdlError::Session(format!("metadata task failed: {}", e)))??;
            debug!("Metadata resolved, saving into {}", self.destination.display());
            self.phase = Phase::Transferring(handle);
        }

        let handle = match &self.phase {
            Phase::Transferring(handle) => handle,
            _ => return Err(MagdlError::Cancelled),
        };

        poll_status(&handle.stats())
    }

    async fn abort(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::Resolving(resolver) => resolver.abort(),
            Phase::Transferring(handle) => {
                if let Err(e) = self.session.pause(&handle).await {
                    warn!("Failed to pause torrent: {:#}", e);
                }
            }
            Phase::Stopped => {}
        }
    }
}
