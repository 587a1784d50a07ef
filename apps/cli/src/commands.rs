//! CLI command implementations

use crate::output::{print_report, report_error};
use crate::progress::render_events;
use crate::{Cli, OutputFormat};
use anyhow::Result;
use console::style;
use dialoguer::Input;
use magdl_core::{Magdl, MagdlError};
use magdl_types::Settings;
use std::process::ExitCode;
use tracing::debug;

/// Exit code used when the user interrupts the download
const EXIT_CANCELLED: u8 = 130;

/// Translate command-line flags into core settings
pub fn build_settings(cli: &Cli) -> Settings {
    let mut settings = Settings {
        downloader: cli.downloader.into(),
        max_attempts: cli.max_attempts,
        retry_delay_secs: cli.retry_delay,
        ..Default::default()
    };

    if let Some(binary) = &cli.aria2c {
        settings.process.binary = binary.clone();
    }
    if cli.no_version_check {
        settings.process.min_version = None;
    }
    // aria2c's console readout would interleave with the JSON lines on stdout
    settings.process.quiet = cli.output == OutputFormat::Json;

    settings
}

/// Text typed at the prompt, or `None` when nothing was entered
pub fn entered_link(input: String) -> Option<String> {
    if input.trim().is_empty() {
        None
    } else {
        Some(input)
    }
}

/// Exit code for a terminal error
pub fn exit_code_for(error: &MagdlError) -> ExitCode {
    if error.is_cancelled() {
        ExitCode::from(EXIT_CANCELLED)
    } else {
        ExitCode::FAILURE
    }
}

/// Download the magnet link given on the command line or at the prompt
pub async fn download(cli: Cli) -> Result<ExitCode> {
    let format = cli.output;
    let core = Magdl::from_settings(build_settings(&cli));

    if let Err(e) = core.check_downloader().await {
        report_error(&e, format);
        return Ok(exit_code_for(&e));
    }

    let raw_link = match cli.magnet {
        Some(link) => link,
        None if cli.interactive => {
            let input = Input::<String>::new()
                .with_prompt("Magnet link (magnet:?xt=urn:btih:...)")
                .allow_empty(true)
                .interact_text()?;
            match entered_link(input) {
                Some(link) => link,
                None => {
                    report_error(&MagdlError::NoLinkEntered, format);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        None => {
            eprintln!(
                "{} Usage: magdl <MAGNET_LINK> [DOWNLOAD_PATH]  (or magdl --interactive)",
                style("✗").red().bold()
            );
            return Ok(ExitCode::FAILURE);
        }
    };

    let token = core.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received");
            token.cancel();
        }
    });

    let renderer = tokio::spawn(render_events(core.subscribe(), format));

    if format == OutputFormat::Human {
        println!(
            "{} Downloading with {} downloader",
            style("↓").cyan().bold(),
            style(core.settings().downloader).cyan()
        );
    }

    let result = core.run(&raw_link, cli.download_path.as_deref()).await;

    // Closing the event channel lets the renderer drain and exit
    drop(core);
    let _ = renderer.await;

    match result {
        Ok(report) => {
            print_report(&report, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_error(&e, format);
            Ok(exit_code_for(&e))
        }
    }
}
