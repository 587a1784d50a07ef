//! Error types for magdl core

use magdl_types::LinkError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in magdl core
#[derive(Debug, Error)]
pub enum MagdlError {
    #[error("{tool} was not found on this system")]
    MissingDependency { tool: String, guidance: String },

    #[error("{tool} {found} is too old, {required} or newer is required")]
    IncompatibleVersion {
        tool: String,
        found: String,
        required: String,
    },

    #[error("No magnet link was given")]
    EmptyLink,

    #[error("No magnet link entered")]
    NoLinkEntered,

    #[error("Invalid magnet link: {0}")]
    InvalidLink(String),

    #[error("Cannot create download directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Downloader exited with {}", describe_exit(.code))]
    ExitStatus { code: Option<i32> },

    #[error("Torrent session error: {0}")]
    Session(String),

    #[error("This magnet link is already being downloaded")]
    Duplicate,

    #[error("Download failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<MagdlError>,
    },

    #[error("Download was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MagdlError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, MagdlError::ExitStatus { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MagdlError::Cancelled)
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

impl From<LinkError> for MagdlError {
    fn from(error: LinkError) -> Self {
        match error {
            LinkError::Empty => MagdlError::EmptyLink,
            LinkError::MissingPrefix => MagdlError::InvalidLink(error.to_string()),
        }
    }
}
