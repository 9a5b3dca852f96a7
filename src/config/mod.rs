//! Run configuration
//!
//! All settings come from environment variables and are collected once, at
//! startup, into an immutable [`Config`]. Components receive the pieces they
//! need from it and never read process state themselves.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

pub mod defaults;

use defaults::*;

use crate::errors::{AppError, AppResult};
use crate::labeling::{LabelMode, SourceKey, SourceLabeler};
use crate::models::normalize_source;

/// Raw settings as read from the environment (keys are lower-cased)
#[derive(Debug, Deserialize)]
struct EnvSettings {
    #[serde(default)]
    playlist_sources: String,
    #[serde(default = "default_validate_streams")]
    validate_streams: String,
    #[serde(default = "default_output_file")]
    output_file: String,
    #[serde(default = "default_liveness_workers")]
    liveness_workers: i64,
    #[serde(default = "default_liveness_timeout_seconds")]
    liveness_timeout_seconds: i64,
    #[serde(default = "default_liveness_connect_timeout_seconds")]
    liveness_connect_timeout_seconds: i64,
    #[serde(default = "default_liveness_retries")]
    liveness_retries: i64,
    #[serde(default = "default_liveness_log_file")]
    liveness_log_file: String,
    #[serde(default = "default_source_label_mode")]
    source_label_mode: String,
    #[serde(default)]
    source_passphrase: String,
    #[serde(default)]
    legacy_sources_file: Option<String>,
}

fn default_validate_streams() -> String {
    DEFAULT_VALIDATE_STREAMS.to_string()
}

fn default_output_file() -> String {
    DEFAULT_OUTPUT_FILE.to_string()
}

fn default_liveness_workers() -> i64 {
    DEFAULT_LIVENESS_WORKERS
}

fn default_liveness_timeout_seconds() -> i64 {
    DEFAULT_LIVENESS_TIMEOUT_SECS
}

fn default_liveness_connect_timeout_seconds() -> i64 {
    DEFAULT_LIVENESS_CONNECT_TIMEOUT_SECS
}

fn default_liveness_retries() -> i64 {
    DEFAULT_LIVENESS_RETRIES
}

fn default_liveness_log_file() -> String {
    DEFAULT_LIVENESS_LOG_FILE.to_string()
}

fn default_source_label_mode() -> String {
    DEFAULT_LABEL_MODE.to_string()
}


/// Stream liveness probing settings
#[derive(Debug, Clone)]
pub struct LivenessConfig {
    /// Maximum number of concurrent probes per source batch
    pub workers: usize,
    /// Read timeout per attempt (response headers and first body chunk)
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Retries after the first attempt
    pub retries: u32,
    /// Backoff before retry `n` (0-based) is `backoff_step * (n + 1)`
    pub backoff_step: Duration,
    pub user_agent: String,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_LIVENESS_WORKERS as usize,
            timeout: Duration::from_secs(DEFAULT_LIVENESS_TIMEOUT_SECS as u64),
            connect_timeout: Duration::from_secs(DEFAULT_LIVENESS_CONNECT_TIMEOUT_SECS as u64),
            retries: DEFAULT_LIVENESS_RETRIES as u32,
            backoff_step: Duration::from_millis(DEFAULT_LIVENESS_BACKOFF_STEP_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sources: Vec<String>,
    pub validate_streams: bool,
    pub output_file: PathBuf,
    /// TSV liveness log; `None` disables logging
    pub log_file: Option<PathBuf>,
    pub label_mode: LabelMode,
    pub liveness: LivenessConfig,
    source_key: Option<SourceKey>,
}

impl Config {
    /// Load settings from the process environment.
    ///
    /// `env_file` is the dotenv file named on the command line; it doubles
    /// as the legacy source list unless `LEGACY_SOURCES_FILE` says otherwise.
    pub fn load(env_file: Option<&Path>) -> AppResult<Self> {
        Self::from_environment(::config::Environment::default(), env_file)
    }

    /// Load settings from an explicit set of variables instead of the
    /// process environment
    pub fn from_env_map<I, K, V>(vars: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: ::config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_environment(::config::Environment::default().source(Some(map)), None)
    }

    fn from_environment(
        environment: ::config::Environment,
        env_file: Option<&Path>,
    ) -> AppResult<Self> {
        let settings: EnvSettings = ::config::Config::builder()
            .add_source(environment)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AppError::configuration(format!("Invalid environment settings: {e}")))?;

        Self::from_settings(settings, env_file)
    }

    fn from_settings(settings: EnvSettings, env_file: Option<&Path>) -> AppResult<Self> {
        let mut sources = parse_sources(&settings.playlist_sources);
        if sources.is_empty() {
            let legacy_file = match settings.legacy_sources_file.as_deref().map(str::trim) {
                Some(path) => PathBuf::from(path),
                None => env_file
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LEGACY_SOURCES_FILE)),
            };
            sources = read_legacy_sources(&legacy_file);
        }

        let workers = positive("LIVENESS_WORKERS", settings.liveness_workers)?;
        let timeout = positive("LIVENESS_TIMEOUT_SECONDS", settings.liveness_timeout_seconds)?;
        let connect_timeout = positive(
            "LIVENESS_CONNECT_TIMEOUT_SECONDS",
            settings.liveness_connect_timeout_seconds,
        )?;
        let retries = u32::try_from(settings.liveness_retries).map_err(|_| {
            AppError::configuration(format!(
                "LIVENESS_RETRIES must be a non-negative integer, got {}",
                settings.liveness_retries
            ))
        })?;

        let label_mode = settings
            .source_label_mode
            .trim()
            .parse::<LabelMode>()
            .map_err(|_| {
                AppError::configuration(format!(
                    "SOURCE_LABEL_MODE must be 'deterministic' or 'reversible', got '{}'",
                    settings.source_label_mode
                ))
            })?;

        let log_file = settings.liveness_log_file.trim();
        let log_file = (!log_file.is_empty()).then(|| PathBuf::from(log_file));

        Ok(Self {
            sources,
            validate_streams: settings.validate_streams.trim().eq_ignore_ascii_case("true"),
            output_file: PathBuf::from(settings.output_file.trim()),
            log_file,
            label_mode,
            liveness: LivenessConfig {
                workers: workers as usize,
                timeout: Duration::from_secs(timeout),
                connect_timeout: Duration::from_secs(connect_timeout),
                retries,
                ..LivenessConfig::default()
            },
            source_key: SourceKey::from_passphrase(&settings.source_passphrase),
        })
    }

    /// Key derived from `SOURCE_PASSPHRASE`
    pub fn source_key(&self) -> AppResult<&SourceKey> {
        self.source_key
            .as_ref()
            .ok_or_else(|| AppError::configuration("SOURCE_PASSPHRASE is required."))
    }

    /// Labeler for the configured mode and key
    pub fn labeler(&self) -> AppResult<SourceLabeler> {
        Ok(SourceLabeler::new(self.source_key()?.clone(), self.label_mode))
    }

    /// Check the preconditions of a playlist generation run
    pub fn validate_for_generate(&self) -> AppResult<()> {
        if self.sources.is_empty() {
            return Err(AppError::configuration(
                "No playlist sources found in PLAYLIST_SOURCES.",
            ));
        }
        self.source_key()?;
        Ok(())
    }
}

fn positive(name: &str, value: i64) -> AppResult<u64> {
    if value < 1 {
        return Err(AppError::configuration(format!(
            "{name} must be a positive integer, got {value}"
        )));
    }
    Ok(value as u64)
}

/// Split a newline- or comma-separated source list
pub fn parse_sources(raw: &str) -> Vec<String> {
    raw.replace(',', "\n")
        .lines()
        .map(normalize_source)
        .filter(|source| !source.is_empty())
        .collect()
}

/// Bare source lines of a legacy dotenv file: non-empty, not comments and
/// without `=`
pub fn parse_legacy_sources(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.contains('='))
        .map(normalize_source)
        .collect()
}

/// `KEY=VALUE` lines of a dotenv file, in file order.
///
/// Comments, blank lines and legacy source entries are left out. A source URL
/// with a query string contains `=` too, but never starts with a valid
/// variable name followed by `=`.
pub fn dotenv_assignments(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            line.split_once('=')
                .is_some_and(|(key, _)| is_env_var_name(key.trim()))
        })
        .collect()
}

fn is_env_var_name(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn read_legacy_sources(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_legacy_sources(&content),
        Err(e) => {
            debug!("No legacy sources read from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
