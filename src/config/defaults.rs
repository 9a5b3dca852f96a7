/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Output defaults
pub const DEFAULT_OUTPUT_FILE: &str = "iptv.m3u8";
pub const DEFAULT_VALIDATE_STREAMS: &str = "true";
pub const DEFAULT_LEGACY_SOURCES_FILE: &str = ".env";

// Liveness defaults
pub const DEFAULT_LIVENESS_WORKERS: i64 = 24;
pub const DEFAULT_LIVENESS_TIMEOUT_SECS: i64 = 6;
pub const DEFAULT_LIVENESS_CONNECT_TIMEOUT_SECS: i64 = 5;
pub const DEFAULT_LIVENESS_RETRIES: i64 = 2;
pub const DEFAULT_LIVENESS_BACKOFF_STEP_MS: u64 = 400;
pub const DEFAULT_LIVENESS_LOG_FILE: &str = "liveness.log";

// HTTP defaults
pub const DEFAULT_SOURCE_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; tvlink-liveness/1.0)";

// Labelling defaults
pub const DEFAULT_LABEL_MODE: &str = "deterministic";
