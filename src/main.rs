//! CLI entry point for the opinion corpus builder.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use opinion_corpus::{
    BackoffRequester, BulkDownloader, CorpusLayout, ManifestHeader, SearchClient, SearchRequest,
    StopReason,
};
use tracing::{debug, error, info, warn};

mod cli;
mod config;
mod progress_display;
mod terminal;

use cli::Args;
use config::Settings;
use progress_display::ProgressDisplay;

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Run completed, including runs where some artifacts failed.
    Success,
    /// Fatal error before or after the download loop.
    Failure,
    /// Stopped by Ctrl+C.
    Interrupted,
}

impl ProcessExit {
    /// Numeric process exit code.
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Interrupted => 130,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    terminal::init_tracing(terminal::default_level(args.quiet, args.verbose));
    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(exit) => exit.into(),
        Err(err) => {
            error!(error = %format!("{err:#}"), "Fatal error");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: Args) -> Result<ProcessExit> {
    let file_config = config::load_default_file_config()?;
    if let Some((path, _)) = &file_config {
        debug!(path = %path.display(), "Loaded config file");
    }
    let settings = Settings::resolve(&args, file_config.as_ref().map(|(_, cfg)| cfg));
    debug!(?settings, "Resolved settings");

    let requester = BackoffRequester::new(settings.retry_policy, settings.timeouts)
        .context("Failed to build HTTP client")?;
    let search_client = SearchClient::with_base_url(requester.clone(), settings.search_url.clone());
    let downloader = BulkDownloader::with_storage_url(requester, &settings.storage_url)
        .context("Invalid storage URL")?
        .with_checkpoint_every(settings.checkpoint_every);

    let layout = CorpusLayout::new(&settings.data_dir, &args.corpus);
    let header = ManifestHeader::new(&args.corpus, &args.query, args.court.clone());
    let request = SearchRequest::new(&args.query, args.max_docs)
        .with_court(args.court.clone())
        .with_filed_after(args.filed_after.clone());

    let progress = ProgressDisplay::new(terminal::should_show_progress(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    ));

    info!(
        corpus = %args.corpus,
        query = %args.query,
        court = args.court.as_deref().unwrap_or("all"),
        max_docs = args.max_docs,
        "Building corpus"
    );

    let work = async {
        let outcome = search_client.search(&request, &progress).await;
        match &outcome.stop {
            StopReason::Failed(err) => warn!(
                found = outcome.artifacts.len(),
                requested = outcome.requested,
                shortfall = outcome.shortfall(),
                error = %err,
                "Search stopped early, continuing with partial results"
            ),
            stop => debug!(?stop, pages = outcome.pages_fetched, "Search finished"),
        }
        info!(found = outcome.artifacts.len(), "Found opinions with PDFs");

        if outcome.artifacts.is_empty() {
            warn!("No opinions found matching query");
            return Ok::<_, anyhow::Error>(ProcessExit::Success);
        }

        let stats = downloader
            .sync(&layout, header, &outcome.artifacts, &progress)
            .await
            .with_context(|| format!("Failed to sync corpus at '{}'", layout.root().display()))?;

        info!(
            downloaded = stats.downloaded,
            skipped = stats.skipped,
            failed = stats.failed,
            total = stats.manifest_entries,
            dir = %layout.opinions_dir().display(),
            "Download complete"
        );
        if stats.failed > 0 {
            warn!(failed = stats.failed, "Some opinions failed to download. Re-run to retry them.");
        }
        Ok(ProcessExit::Success)
    };

    tokio::select! {
        result = work => {
            progress.finish();
            result
        }
        () = wait_for_interrupt() => {
            progress.finish();
            warn!("Download interrupted by user (Ctrl+C)");
            info!("Progress has been saved. Re-run to resume.");
            Ok(ProcessExit::Interrupted)
        }
    }
}

/// Resolves on Ctrl+C. Never resolves if the signal handler cannot be installed.
async fn wait_for_interrupt() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
