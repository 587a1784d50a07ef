//! magdl CLI - download a magnet link
//!
//! Hands the link to aria2c or to an embedded torrent session and reports
//! progress until the files are on disk.

mod commands;
mod output;
mod progress;

use clap::{CommandFactory, Parser};
use console::style;
use magdl_types::DownloaderKind;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// magdl - Magnet link downloader
#[derive(Parser)]
#[command(name = "magdl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Magnet link to download (magnet:?xt=urn:btih:...)
    magnet: Option<String>,

    /// Directory to save into [default: ./download]
    download_path: Option<PathBuf>,

    /// Prompt for the magnet link
    #[arg(short, long, conflicts_with = "magnet")]
    interactive: bool,

    /// Downloader backend
    #[arg(long, value_enum, env = "MAGDL_DOWNLOADER", default_value = "process")]
    downloader: DownloaderArg,

    /// Total download attempts before giving up
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = 3)]
    retry_delay: u64,

    /// aria2c executable to use
    #[arg(long, value_name = "PATH")]
    aria2c: Option<String>,

    /// Skip the aria2c minimum version check
    #[arg(long)]
    no_version_check: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<clap_complete::Shell>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum DownloaderArg {
    /// Run aria2c as a child process
    Process,
    /// Use the built-in BitTorrent session
    Session,
}

impl From<DownloaderArg> for DownloaderKind {
    fn from(arg: DownloaderArg) -> Self {
        match arg {
            DownloaderArg::Process => DownloaderKind::Process,
            DownloaderArg::Session => DownloaderKind::Session,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("magdl=debug,magdl_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "magdl", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    init_tracing(cli.verbose);

    match commands::download(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("✗").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
