/// Filesystem and environment defaults shared by the CLI, config loader and pipeline

// Configuration locations
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_REGISTRY_DIR: &str = "registry/sources";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_LOG_DIR: &str = "logs";

// Environment variables
pub const OPENAI_KEY_ENV: &str = "OPENAI_KEY";
pub const METRICS_ADDR_ENV: &str = "MMS_METRICS_ADDR";

// Resolver defaults (OpenAI-compatible chat completions)
pub const DEFAULT_RESOLVER_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_RESOLVER_MODEL: &str = "gpt-4o-mini";

// Pipeline defaults
pub const DEFAULT_MAX_CONCURRENT_SOURCES: usize = 4;
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_WINDOW_MONTHS: u32 = 4;

/// Tokens that mark a raw date as a list or range of dates.
/// Spaced words keep "and"/"to" from matching inside month or weekday names.
pub const MULTI_DATE_DELIMITERS: [&str; 5] = ["&", "+", "-", " and ", " to "];

/// Canonical ISO rendering used for every date that leaves the pipeline
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
