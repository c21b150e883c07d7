//! File configuration and the settings resolved from CLI + file + defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use opinion_corpus::fetch::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES,
    HttpTimeouts,
};
use opinion_corpus::search::DEFAULT_SEARCH_URL;
use opinion_corpus::sync::{DEFAULT_CHECKPOINT_EVERY, DEFAULT_STORAGE_URL};
use opinion_corpus::RetryPolicy;

use crate::cli::Args;

/// Application directory name under the config home.
const APP_DIR: &str = "opinion-corpus";

/// Data directory used when neither CLI nor file sets one.
const DEFAULT_DATA_DIR: &str = "data";

/// Optional defaults read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub delay_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub max_backoff_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub checkpoint_every: Option<usize>,
    pub search_url: Option<String>,
    pub storage_url: Option<String>,
}

impl FileConfig {
    /// Validates ranges that the CLI would also enforce.
    pub fn validate(&self) -> Result<()> {
        if let Some(delay_ms) = self.delay_ms
            && delay_ms > 600_000
        {
            bail!("Invalid config value for `delay_ms`: {delay_ms}. Expected range: 0..=600000");
        }
        if let Some(max_retries) = self.max_retries
            && max_retries > 20
        {
            bail!("Invalid config value for `max_retries`: {max_retries}. Expected range: 0..=20");
        }
        validate_secs("max_backoff_secs", self.max_backoff_secs)?;
        validate_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/opinion-corpus/config.toml`
/// 2. `$HOME/.config/opinion-corpus/config.toml`
#[must_use]
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }
    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file from the default path, if one exists.
pub(crate) fn load_default_file_config() -> Result<Option<(PathBuf, FileConfig)>> {
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let config = load_file_config(&path)?;
    Ok(Some((path, config)))
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };
        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "data_dir" => {
                cfg.data_dir = Some(PathBuf::from(parse_string_literal(value).with_context(context)?));
            }
            "delay_ms" => cfg.delay_ms = Some(parse_integer_u64(value).with_context(context)?),
            "max_retries" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("max_retries out of range for u32"))
                    .with_context(context)?;
                cfg.max_retries = Some(n);
            }
            "max_backoff_secs" => {
                cfg.max_backoff_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "checkpoint_every" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let n = usize::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("checkpoint_every out of range"))
                    .with_context(context)?;
                cfg.checkpoint_every = Some(n);
            }
            "search_url" => {
                cfg.search_url = Some(parse_url_literal(value).with_context(context)?);
            }
            "storage_url" => {
                cfg.storage_url = Some(parse_url_literal(value).with_context(context)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_url_literal(raw_value: &str) -> Result<String> {
    let value = parse_string_literal(raw_value)?;
    url::Url::parse(&value).with_context(|| format!("'{value}' is not an absolute URL"))?;
    Ok(value)
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub data_dir: PathBuf,
    pub retry_policy: RetryPolicy,
    pub timeouts: HttpTimeouts,
    pub checkpoint_every: usize,
    pub search_url: String,
    pub storage_url: String,
}

impl Settings {
    /// Merges CLI flags over file values over built-in defaults.
    pub fn resolve(args: &Args, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();

        let base_delay = args
            .delay_ms
            .or(file.delay_ms)
            .map_or(DEFAULT_BASE_DELAY, Duration::from_millis);
        let max_retries = args
            .max_retries
            .or(file.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let max_delay = file
            .max_backoff_secs
            .map_or(DEFAULT_MAX_DELAY, Duration::from_secs);
        let defaults = HttpTimeouts::default();

        Self {
            data_dir: args
                .data_dir
                .clone()
                .or(file.data_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            retry_policy: RetryPolicy::new(max_retries, base_delay, max_delay, DEFAULT_BACKOFF_FACTOR),
            timeouts: HttpTimeouts {
                connect_secs: file.connect_timeout_secs.unwrap_or(defaults.connect_secs),
                read_secs: file.read_timeout_secs.unwrap_or(defaults.read_secs),
            },
            checkpoint_every: file.checkpoint_every.unwrap_or(DEFAULT_CHECKPOINT_EVERY),
            search_url: file
                .search_url
                .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
            storage_url: file
                .storage_url
                .unwrap_or_else(|| DEFAULT_STORAGE_URL.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["opinion-corpus", "asylum", "--corpus", "asylum"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
            # corpus defaults
            data_dir = "/srv/corpora"   # shared volume
            delay_ms = 1500
            checkpoint_every = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.data_dir, Some(PathBuf::from("/srv/corpora")));
        assert_eq!(cfg.delay_ms, Some(1500));
        assert_eq!(cfg.checkpoint_every, Some(0));
        assert!(cfg.max_retries.is_none());
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
            data_dir = "d"
            delay_ms = 10
            max_retries = 2
            max_backoff_secs = 60
            connect_timeout_secs = 5
            read_timeout_secs = 90
            checkpoint_every = 3
            search_url = "http://127.0.0.1:8080/search/"
            storage_url = "http://127.0.0.1:8080/storage"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.max_retries, Some(2));
        assert_eq!(cfg.max_backoff_secs, Some(60));
        assert_eq!(cfg.connect_timeout_secs, Some(5));
        assert_eq!(cfg.read_timeout_secs, Some(90));
        assert_eq!(cfg.search_url.as_deref(), Some("http://127.0.0.1:8080/search/"));
        assert_eq!(cfg.storage_url.as_deref(), Some("http://127.0.0.1:8080/storage"));
    }

    #[test]
    fn test_parse_config_hash_inside_string_is_kept() {
        let cfg = parse_config_str(r#"data_dir = "/tmp/#corpora""#).unwrap();
        assert_eq!(cfg.data_dir, Some(PathBuf::from("/tmp/#corpora")));
    }

    #[test]
    fn test_parse_config_unknown_key_names_line() {
        let err = parse_config_str("delay_ms = 10\nconcurrency = 4").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("concurrency"), "got: {msg}");
        assert!(msg.contains("line 2"), "got: {msg}");
    }

    #[test]
    fn test_parse_config_invalid_value_names_key_and_line() {
        let err = parse_config_str("\n\nmax_retries = -1").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("`max_retries`"), "got: {msg}");
        assert!(msg.contains("line 3"), "got: {msg}");
    }

    #[test]
    fn test_parse_config_missing_equals_is_syntax_error() {
        let err = parse_config_str("delay_ms 10").unwrap_err();
        assert!(err.to_string().contains("expected key = value"));
    }

    #[test]
    fn test_parse_config_unquoted_string_is_rejected() {
        assert!(parse_config_str("data_dir = /tmp").is_err());
    }

    #[test]
    fn test_parse_config_relative_url_is_rejected() {
        assert!(parse_config_str(r#"storage_url = "storage.example.com""#).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_timeouts() {
        assert!(parse_config_str("read_timeout_secs = 0").is_err());
        assert!(parse_config_str("connect_timeout_secs = 3601").is_err());
        assert!(parse_config_str("max_retries = 21").is_err());
    }

    // ==================== Resolution Tests ====================

    #[test]
    fn test_settings_defaults_without_file() {
        let settings = Settings::resolve(&args(&[]), None);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.retry_policy, RetryPolicy::default());
        assert_eq!(settings.timeouts, HttpTimeouts::default());
        assert_eq!(settings.checkpoint_every, DEFAULT_CHECKPOINT_EVERY);
        assert_eq!(settings.search_url, DEFAULT_SEARCH_URL);
        assert_eq!(settings.storage_url, DEFAULT_STORAGE_URL);
    }

    #[test]
    fn test_settings_file_overrides_defaults() {
        let file = FileConfig {
            data_dir: Some(PathBuf::from("/srv/corpora")),
            delay_ms: Some(250),
            max_retries: Some(2),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(&args(&[]), Some(&file));
        assert_eq!(settings.data_dir, PathBuf::from("/srv/corpora"));
        assert_eq!(settings.retry_policy.base_delay(), Duration::from_millis(250));
        assert_eq!(settings.retry_policy.max_attempts(), 3);
    }

    #[test]
    fn test_settings_cli_overrides_file() {
        let file = FileConfig {
            data_dir: Some(PathBuf::from("/srv/corpora")),
            delay_ms: Some(250),
            max_retries: Some(2),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(
            &args(&["--data-dir", "./local", "--delay-ms", "0", "--max-retries", "5"]),
            Some(&file),
        );
        assert_eq!(settings.data_dir, PathBuf::from("./local"));
        assert_eq!(settings.retry_policy.base_delay(), Duration::ZERO);
        assert_eq!(settings.retry_policy.max_attempts(), 6);
    }
}
