//! Shared types for magdl
//!
//! This crate contains the plain data structures used by both the
//! core orchestrator and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// Magnet Links
// ============================================================================

/// Literal prefix every accepted magnet link starts with
pub const MAGNET_PREFIX: &str = "magnet:?";

/// A magnet link that passed the prefix check.
///
/// Nothing past the prefix is interpreted here; the downloader is
/// responsible for `xt=urn:btih:...` and any embedded trackers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MagnetLink(String);

/// Reasons a magnet link is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    Empty,
    MissingPrefix,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Empty => write!(f, "magnet link is empty"),
            LinkError::MissingPrefix => {
                write!(f, "magnet link must start with \"{}\"", MAGNET_PREFIX)
            }
        }
    }
}

impl std::error::Error for LinkError {}

impl MagnetLink {
    /// Validate user input. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LinkError::Empty);
        }
        if !trimmed.starts_with(MAGNET_PREFIX) {
            return Err(LinkError::MissingPrefix);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MagnetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MagnetLink {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MagnetLink {
    type Error = LinkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MagnetLink> for String {
    fn from(link: MagnetLink) -> Self {
        link.0
    }
}

// ============================================================================
// Settings Types
// ============================================================================

/// Which external downloader drives the transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloaderKind {
    /// Spawn an external executable and wait for it to exit
    #[default]
    Process,
    /// Drive an embedded BitTorrent session and poll its status
    Session,
}

impl fmt::Display for DownloaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloaderKind::Process => write!(f, "process"),
            DownloaderKind::Session => write!(f, "session"),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Destination used when none is given, relative to the working directory
    pub download_dir: PathBuf,
    pub downloader: DownloaderKind,
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay in seconds between attempts
    pub retry_delay_secs: u64,
    /// Interval between status checks of a running download
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub process: ProcessSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("download"),
            downloader: DownloaderKind::default(),
            max_attempts: 3,
            retry_delay_secs: 3,
            poll_interval_ms: 1000,
            process: ProcessSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

/// Options handed to the external download executable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSettings {
    /// Executable name or path
    pub binary: String,
    /// Seconds to keep seeding after completion
    pub seed_time: u32,
    /// Resume partially downloaded files
    pub continue_partial: bool,
    pub max_concurrent_downloads: u32,
    pub max_connection_per_server: u32,
    /// Pieces a single file is split into
    pub split: u32,
    pub enable_dht: bool,
    pub enable_dht6: bool,
    /// Local peer discovery
    pub enable_lpd: bool,
    pub max_open_files: u32,
    /// Extra trackers, joined into a single option value
    pub trackers: Vec<String>,
    /// Oldest executable version known to accept every option above
    pub min_version: Option<ToolVersion>,
    /// Silence the executable's console readout
    #[serde(default)]
    pub quiet: bool,
}

/// Public trackers appended to every process download
pub const DEFAULT_TRACKERS: &[&str] = &[
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://open.stealth.si:80/announce",
    "udp://tracker.torrent.eu.org:451/announce",
    "udp://exodus.desync.com:6969/announce",
    "udp://open.demonii.com:1337/announce",
    "udp://tracker.openbittorrent.com:6969/announce",
    "udp://explodie.org:6969/announce",
    "https://tracker.tamersunion.org:443/announce",
];

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            binary: "aria2c".to_string(),
            seed_time: 0,
            continue_partial: true,
            max_concurrent_downloads: 5,
            max_connection_per_server: 16,
            split: 16,
            enable_dht: true,
            enable_dht6: true,
            enable_lpd: true,
            max_open_files: 100,
            trackers: DEFAULT_TRACKERS.iter().map(|t| t.to_string()).collect(),
            min_version: Some(ToolVersion::new(1, 19, 0)),
            quiet: false,
        }
    }
}

/// Options for the embedded BitTorrent session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// First TCP port the session may listen on
    pub listen_port_start: u16,
    /// End of the listen range (exclusive)
    pub listen_port_end: u16,
    /// Refuse a magnet the session is already managing
    pub reject_duplicates: bool,
    /// Find peers through the DHT
    #[serde(default = "default_true")]
    pub enable_dht: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            listen_port_start: 6881,
            listen_port_end: 6891,
            reject_duplicates: true,
            enable_dht: true,
        }
    }
}

/// A `major.minor.patch` version reported by an external tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ToolVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ToolVersion {
    type Err = String;

    /// Accepts `1.37.0`, `1.37` and tolerates suffixes such as `1.37.0-rc1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '.');
        let mut next = |required: bool| -> Result<u32, String> {
            match parts.next() {
                Some(part) => {
                    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
                    digits
                        .parse()
                        .map_err(|_| format!("invalid version component in {:?}", s))
                }
                None if required => Err(format!("invalid version {:?}", s)),
                None => Ok(0),
            }
        };
        Ok(Self::new(next(true)?, next(true)?, next(false)?))
    }
}

// ============================================================================
// Progress Types
// ============================================================================

/// Snapshot of a running transfer as reported by the downloader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferStats {
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub uploaded_bytes: u64,
    /// Bytes per second
    pub download_rate: u64,
    /// Bytes per second
    pub upload_rate: u64,
    pub peers: u32,
}

impl TransferStats {
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            (self.downloaded_bytes as f64 / self.total_bytes as f64) * 100.0
        }
    }
}

// ============================================================================
// Event Types
// ============================================================================

/// Events emitted by the core while a download runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    AttemptStarted {
        attempt: u32,
        max_attempts: u32,
    },
    AwaitingMetadata,
    MetadataReady,
    Progress(TransferStats),
    AttemptFailed {
        attempt: u32,
        reason: String,
    },
    RetryScheduled {
        next_attempt: u32,
        delay_secs: u64,
    },
    Completed {
        destination: PathBuf,
    },
}

/// Summary of a finished download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadReport {
    pub magnet: MagnetLink,
    /// Absolute directory the files were saved under
    pub destination: PathBuf,
    pub downloader: DownloaderKind,
    /// Attempts used, including the successful one
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl fmt::Display for DownloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Download complete after {} attempt(s), saved to {}",
            self.attempts,
            self.destination.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnet_link_accepts_prefix() {
        let link = MagnetLink::parse("  magnet:?xt=urn:btih:ABCDEF \n").unwrap();
        assert_eq!(link.as_str(), "magnet:?xt=urn:btih:ABCDEF");
    }

    #[test]
    fn test_magnet_link_rejects_bad_input() {
        assert_eq!(MagnetLink::parse(""), Err(LinkError::Empty));
        assert_eq!(MagnetLink::parse("   "), Err(LinkError::Empty));
        assert_eq!(
            MagnetLink::parse("http://example.com/file.torrent"),
            Err(LinkError::MissingPrefix)
        );
        // Prefix is matched literally
        assert_eq!(
            MagnetLink::parse("MAGNET:?xt=urn:btih:ABCDEF"),
            Err(LinkError::MissingPrefix)
        );
        assert_eq!(MagnetLink::parse("magnet:"), Err(LinkError::MissingPrefix));
    }

    #[test]
    fn test_magnet_link_deserialize_validates() {
        let ok: MagnetLink = serde_json::from_str("\"magnet:?xt=urn:btih:1\"").unwrap();
        assert_eq!(ok.as_str(), "magnet:?xt=urn:btih:1");
        assert!(serde_json::from_str::<MagnetLink>("\"not-a-magnet\"").is_err());
    }

    #[test]
    fn test_tool_version_parse_and_order() {
        let v: ToolVersion = "1.37.0".parse().unwrap();
        assert_eq!(v, ToolVersion::new(1, 37, 0));
        assert_eq!("1.18".parse::<ToolVersion>().unwrap(), ToolVersion::new(1, 18, 0));
        assert_eq!(
            "1.36.0-rc1".parse::<ToolVersion>().unwrap(),
            ToolVersion::new(1, 36, 0)
        );
        assert!("garbage".parse::<ToolVersion>().is_err());
        assert!(ToolVersion::new(1, 18, 9) < ToolVersion::new(1, 19, 0));
    }

    #[test]
    fn test_transfer_percent() {
        let mut stats = TransferStats::default();
        assert_eq!(stats.percent(), 0.0);
        stats.total_bytes = 200;
        stats.downloaded_bytes = 50;
        assert_eq!(stats.percent(), 25.0);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.download_dir, PathBuf::from("download"));
        assert_eq!(settings.downloader, DownloaderKind::Process);
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.retry_delay_secs, 3);
        assert_eq!(settings.poll_interval_ms, 1000);
        assert_eq!(settings.process.seed_time, 0);
        assert!(!settings.process.trackers.is_empty());
    }
}
