//! Output formatting utilities

use crate::OutputFormat;
use console::style;
use magdl_core::MagdlError;
use magdl_types::{DownloadReport, TransferStats};

/// Print the final report in the specified format
pub fn print_report(report: &DownloadReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Human => {
            println!("{} {}", style("✓").green().bold(), report);
            println!("  Location: {}", style(report.destination.display()).cyan());
        }
    }
    Ok(())
}

/// Print a terminal error with any remediation hint
pub fn report_error(error: &MagdlError, format: OutputFormat) {
    if format == OutputFormat::Json {
        let value = serde_json::json!({
            "error": error.to_string(),
            "cancelled": error.is_cancelled(),
        });
        println!("{}", value);
        return;
    }

    match error {
        MagdlError::Cancelled => {
            eprintln!("{} Download cancelled", style("○").yellow().bold());
        }
        MagdlError::MissingDependency { guidance, .. } => {
            eprintln!("{} {}", style("✗").red().bold(), error);
            eprintln!("{}", guidance);
        }
        _ => {
            eprintln!("{} {}", style("✗").red().bold(), error);
        }
    }
}

/// Format bytes as human-readable
pub fn format_bytes(bytes: u64) -> String {
    human_bytes::human_bytes(bytes as f64)
}

/// Format speed as human-readable
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", human_bytes::human_bytes(bytes_per_sec as f64))
}

/// Format duration as human-readable
pub fn format_eta(seconds: u64) -> String {
    if seconds == 0 {
        return "—".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// One-line summary of a transfer snapshot
pub fn format_stats(stats: &TransferStats) -> String {
    let remaining = stats.total_bytes.saturating_sub(stats.downloaded_bytes);
    let eta = if stats.download_rate > 0 {
        remaining / stats.download_rate
    } else {
        0
    };

    format!(
        "{:.1}% ↓ {} ↑ {} of {} | {} peers | ETA {}",
        stats.percent(),
        format_speed(stats.download_rate),
        format_speed(stats.upload_rate),
        format_bytes(stats.total_bytes),
        stats.peers,
        format_eta(eta)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(0), "—");
        assert_eq!(format_eta(42), "42s");
        assert_eq!(format_eta(125), "2m 5s");
        assert_eq!(format_eta(3725), "1h 2m 5s");
    }

    #[test]
    fn test_format_stats_mentions_peers_and_percent() {
        let stats = TransferStats {
            downloaded_bytes: 250,
            total_bytes: 1000,
            uploaded_bytes: 0,
            download_rate: 50,
            upload_rate: 0,
            peers: 12,
        };
        let line = format_stats(&stats);
        assert!(line.starts_with("25.0%"));
        assert!(line.contains("12 peers"));
        assert!(line.ends_with("ETA 15s"));
    }
}
