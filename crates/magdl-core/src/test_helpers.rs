//! Scripted downloader for exercising the orchestrator without real processes

use crate::engine::{ActiveDownload, Downloader, PollStatus};
use crate::error::MagdlError;
use async_trait::async_trait;
use magdl_types::{MagnetLink, TransferStats};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// One poll result in a scripted attempt
#[derive(Debug, Clone)]
pub enum MockStep {
    AwaitingMetadata,
    Running,
    Progress(TransferStats),
    Complete,
    /// Non-zero exit of the downloader
    Exit(i32),
    /// Non-retryable failure
    Error(String),
    /// Trigger cancellation, then exit like a child killed by the interrupt
    Interrupted(i32),
    /// Exit first, with the interrupt reaching the token shortly afterwards
    LateInterrupt(i32),
    /// Keep running until aborted
    Hang,
}

/// Downloader whose attempts follow a script, one script per `start` call
pub struct MockDownloader {
    available: bool,
    scripts: Mutex<VecDeque<Vec<MockStep>>>,
    starts: AtomicU32,
    availability_checks: AtomicU32,
    destinations: Mutex<Vec<PathBuf>>,
    aborted: Arc<AtomicBool>,
    interrupt: Arc<Mutex<Option<CancellationToken>>>,
}

impl MockDownloader {
    pub fn new(scripts: Vec<Vec<MockStep>>) -> Self {
        Self {
            available: true,
            scripts: Mutex::new(scripts.into()),
            starts: AtomicU32::new(0),
            availability_checks: AtomicU32::new(0),
            destinations: Mutex::new(Vec::new()),
            aborted: Arc::new(AtomicBool::new(false)),
            interrupt: Arc::new(Mutex::new(None)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::new())
        }
    }

    /// Token cancelled by `MockStep::Interrupted` and `MockStep::LateInterrupt`
    pub fn interrupt_with(&self, token: CancellationToken) {
        *self.interrupt.lock().unwrap() = Some(token);
    }

    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn availability_checks(&self) -> u32 {
        self.availability_checks.load(Ordering::SeqCst)
    }

    pub fn destinations(&self) -> Vec<PathBuf> {
        self.destinations.lock().unwrap().clone()
    }

    pub fn aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn check_available(&self) -> Result<(), MagdlError> {
        self.availability_checks.fetch_add(1, Ordering::SeqCst);
        if self.available {
            Ok(())
        } else {
            Err(MagdlError::MissingDependency {
                tool: "mock".to_string(),
                guidance: "install mock".to_string(),
            })
        }
    }

    async fn start(
        &self,
        _magnet: &MagnetLink,
        destination: &Path,
    ) -> Result<Box<dyn ActiveDownload>, MagdlError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.destinations
            .lock()
            .unwrap()
            .push(destination.to_path_buf());

        let steps = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted attempt left");

        Ok(Box::new(MockActive {
            steps: steps.into(),
            aborted: self.aborted.clone(),
            interrupt: self.interrupt.clone(),
        }))
    }
}

struct MockActive {
    steps: VecDeque<MockStep>,
    aborted: Arc<AtomicBool>,
    interrupt: Arc<Mutex<Option<CancellationToken>>>,
}

#[async_trait]
impl ActiveDownload for MockActive {
    async fn poll(&mut self) -> Result<PollStatus, MagdlError> {
        let step = match self.steps.front() {
            Some(MockStep::Hang) => MockStep::Hang,
            _ => self.steps.pop_front().unwrap_or(MockStep::Complete),
        };

        match step {
            MockStep::AwaitingMetadata => Ok(PollStatus::AwaitingMetadata),
            MockStep::Running | MockStep::Hang => Ok(PollStatus::Running(None)),
            MockStep::Progress(stats) => Ok(PollStatus::Running(Some(stats))),
            MockStep::Complete => Ok(PollStatus::Complete),
            MockStep::Exit(code) => Err(MagdlError::ExitStatus { code: Some(code) }),
            MockStep::Error(message) => Err(MagdlError::Session(message)),
            MockStep::Interrupted(code) => {
                if let Some(token) = self.interrupt.lock().unwrap().as_ref() {
                    token.cancel();
                }
                Err(MagdlError::ExitStatus { code: Some(code) })
            }
            MockStep::LateInterrupt(code) => {
                if let Some(token) = self.interrupt.lock().unwrap().clone() {
                    tokio::spawn(async move {
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        token.cancel();
                    });
                }
                Err(MagdlError::ExitStatus { code: Some(code) })
            }
        }
    }

    async fn abort(&mut self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}
