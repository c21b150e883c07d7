//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::sync::LazyLock;

use clap::Parser;
use regex::Regex;

/// Default cap on downloaded opinions per run.
pub const DEFAULT_MAX_DOCS: usize = 150;

#[allow(clippy::expect_used)]
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid date regex"));

/// Build a local corpus of court-opinion PDFs from CourtListener.
///
/// Searches the CourtListener opinion index, then downloads every matching
/// PDF into `<data-dir>/<corpus>/opinions/` and records case metadata in
/// `<data-dir>/<corpus>/metadata.json`. Re-running resumes where the last run
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "opinion-corpus")]
#[command(author, version, about)]
pub struct Args {
    /// Full-text search query (e.g. "patent infringement obviousness")
    pub query: String,

    /// Corpus name; becomes the directory under the data dir
    #[arg(long, value_parser = parse_corpus_name)]
    pub corpus: String,

    /// Maximum number of opinions to download
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_DOCS)]
    pub max_docs: usize,

    /// Court identifier filter (e.g. cafc, ca9, scotus)
    #[arg(long)]
    pub court: Option<String>,

    /// Only opinions filed after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_filed_after)]
    pub filed_after: Option<String>,

    /// Root directory for corpora [default: ./data]
    #[arg(short = 'd', long)]
    pub data_dir: Option<PathBuf>,

    /// Delay before each request in milliseconds [default: 3000]
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=600_000))]
    pub delay_ms: Option<u64>,

    /// Maximum retries per request after the first attempt [default: 8]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(0..=20))]
    pub max_retries: Option<u32>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

fn parse_corpus_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("corpus name must not be empty".to_string());
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(format!("corpus name '{name}' must be a single directory name"));
    }
    Ok(name.to_string())
}

fn parse_filed_after(raw: &str) -> Result<String, String> {
    let invalid = || format!("invalid date '{raw}', expected YYYY-MM-DD");
    let captures = ISO_DATE.captures(raw).ok_or_else(invalid)?;
    let month: u32 = captures[2].parse().map_err(|_| invalid())?;
    let day: u32 = captures[3].parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid());
    }
    Ok(raw.to_string())
}
