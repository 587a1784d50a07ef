//! Progress rendering for core events

use crate::output::format_stats;
use crate::OutputFormat;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use magdl_types::CoreEvent;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Turns core events into terminal output
pub struct EventRenderer {
    format: OutputFormat,
    /// Spinner while metadata is fetched, then the transfer bar
    bar: Option<ProgressBar>,
}

impl EventRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format, bar: None }
    }

    /// Print a line without tearing an active bar
    fn println(&self, line: String) {
        match &self.bar {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }

    fn spinner(message: &'static str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    fn transfer_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░  "),
        );
        pb
    }

    fn clear_bar(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }

    /// Render a single event
    pub fn handle_event(&mut self, event: &CoreEvent) {
        if self.format == OutputFormat::Json {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{}", line);
            }
            return;
        }

        match event {
            CoreEvent::AttemptStarted {
                attempt,
                max_attempts,
            } => {
                if *attempt > 1 {
                    self.println(format!(
                        "{} Attempt {}/{}",
                        style("↻").cyan(),
                        attempt,
                        max_attempts
                    ));
                }
            }

            CoreEvent::AwaitingMetadata => {
                self.clear_bar();
                self.bar = Some(Self::spinner("Fetching metadata from peers..."));
            }

            CoreEvent::MetadataReady => {
                self.clear_bar();
                println!("{} Metadata received", style("✓").green().bold());
            }

            CoreEvent::Progress(stats) => {
                let pb = self.bar.get_or_insert_with(Self::transfer_bar);
                pb.set_length(stats.total_bytes);
                pb.set_position(stats.downloaded_bytes);
                pb.set_message(format_stats(stats));
            }

            CoreEvent::AttemptFailed { attempt, reason } => {
                if let Some(pb) = self.bar.take() {
                    pb.abandon();
                }
                println!(
                    "{} Attempt {} failed: {}",
                    style("✗").red().bold(),
                    attempt,
                    reason
                );
            }

            CoreEvent::RetryScheduled {
                next_attempt,
                delay_secs,
            } => {
                println!(
                    "{} Retrying in {}s (attempt {})",
                    style("⏸").yellow(),
                    delay_secs,
                    next_attempt
                );
            }

            CoreEvent::Completed { .. } => {
                if let Some(pb) = self.bar.take() {
                    pb.finish();
                }
            }
        }
    }

    /// Clear any bar left behind by an interrupted download
    pub fn finish(&mut self) {
        self.clear_bar();
    }
}

/// Render events until the core drops its sender
pub async fn render_events(mut rx: broadcast::Receiver<CoreEvent>, format: OutputFormat) {
    let mut renderer = EventRenderer::new(format);

    loop {
        match rx.recv().await {
            Ok(event) => renderer.handle_event(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Progress renderer skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    renderer.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use magdl_types::TransferStats;

    #[test]
    fn test_progress_creates_and_completion_finishes_bar() {
        let mut renderer = EventRenderer::new(OutputFormat::Human);
        renderer.handle_event(&CoreEvent::Progress(TransferStats {
            downloaded_bytes: 10,
            total_bytes: 100,
            ..Default::default()
        }));

        let pb = renderer.bar.clone().expect("bar should exist");
        assert_eq!(pb.length(), Some(100));
        assert_eq!(pb.position(), 10);

        renderer.handle_event(&CoreEvent::Completed {
            destination: "/tmp/download".into(),
        });
        assert!(renderer.bar.is_none());
        assert!(pb.is_finished());
    }

    #[test]
    fn test_metadata_spinner_is_replaced() {
        let mut renderer = EventRenderer::new(OutputFormat::Human);
        renderer.handle_event(&CoreEvent::AwaitingMetadata);
        assert!(renderer.bar.is_some());
        renderer.handle_event(&CoreEvent::MetadataReady);
        assert!(renderer.bar.is_none());
    }

    #[tokio::test]
    async fn test_render_events_stops_when_sender_dropped() {
        let (tx, rx) = broadcast::channel(16);
        let task = tokio::spawn(render_events(rx, OutputFormat::Json));
        tx.send(CoreEvent::AwaitingMetadata).unwrap();
        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("renderer should exit")
            .unwrap();
    }
}
