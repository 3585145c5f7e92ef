//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{
    CliArgs, Command, DatabaseOverride, LoggingOverrides, PurgeArgs, ServeArgs, ServeOverrides,
    WorkerArgs, WorkerOverrides,
};

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::docs::GenerationSettings;
use crate::application::retry::RetryPolicy;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "specdoc";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_HTTP_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_DB_JOBS_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_JOBS_MAX_CONCURRENT: u32 = 10;
const DEFAULT_JOBS_DELIVERY_ATTEMPTS: u32 = 3;
const DEFAULT_JOBS_RESULT_TTL_HOURS: u64 = 24;
const DEFAULT_JOBS_ESTIMATE_SECS: u64 = 300;
const DEFAULT_GENAI_ENDPOINT_URL: &str = "http://localhost:8001/generate";
const DEFAULT_GENAI_TIMEOUT_SECS: u64 = 300;
const DEFAULT_GENAI_MAX_TOKENS: u32 = 3000;
const DEFAULT_GENAI_TEMPERATURE: f32 = 0.2;
const DEFAULT_GENAI_MODEL: &str = "default";
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_INITIAL_BACKOFF_MS: u64 = 4_000;
const DEFAULT_RETRY_MAX_BACKOFF_MS: u64 = 10_000;
const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;
const DEFAULT_MAX_SPEC_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_API_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_API_RATE_LIMIT_MAX_REQUESTS: u64 = 100;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub jobs: JobsSettings,
    pub genai: GenAiSettings,
    pub retry: RetrySettings,
    pub limits: LimitSettings,
    pub api_rate_limit: ApiRateLimitSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    /// Absolute base for download links; `None` keeps them relative.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub http_max_connections: NonZeroU32,
    pub jobs_max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct JobsSettings {
    pub max_concurrent: NonZeroU32,
    pub delivery_attempts: NonZeroU32,
    pub result_ttl: Duration,
    pub default_estimate: Duration,
}

#[derive(Debug, Clone)]
pub struct GenAiSettings {
    pub endpoint_url: Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_tokens: NonZeroU32,
    pub temperature: f32,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: NonZeroU32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

#[derive(Debug, Clone)]
pub struct LimitSettings {
    pub max_spec_bytes: NonZeroU64,
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ApiRateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.get(),
            initial_backoff: settings.initial_backoff,
            max_backoff: settings.max_backoff,
            multiplier: settings.multiplier,
        }
    }
}

impl From<&GenAiSettings> for GenerationSettings {
    fn from(settings: &GenAiSettings) -> Self {
        Self {
            max_tokens: settings.max_tokens.get(),
            temperature: settings.temperature,
            model: settings.model.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SPECDOC").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Worker(args)) => raw.apply_worker_overrides(&args.overrides),
        Some(Command::Purge(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    jobs: RawJobsSettings,
    genai: RawGenAiSettings,
    retry: RawRetrySettings,
    limits: RawLimitSettings,
    api_rate_limit: RawApiRateLimitSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(base) = overrides.server_public_base_url.as_ref() {
            self.server.public_base_url = Some(base.clone());
        }
        if let Some(window) = overrides.api_rate_limit_window_seconds {
            self.api_rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.api_rate_limit_max_requests {
            self.api_rate_limit.max_requests = Some(max);
        }

        self.apply_worker_overrides(&overrides.worker);
    }

    fn apply_worker_overrides(&mut self, overrides: &WorkerOverrides) {
        self.apply_database_override(&overrides.database);
        self.apply_logging_overrides(&overrides.logging);
        if let Some(value) = overrides.jobs_max_concurrent {
            self.jobs.max_concurrent = Some(value);
        }
        if let Some(url) = overrides.genai_endpoint_url.as_ref() {
            self.genai.endpoint_url = Some(url.clone());
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            jobs,
            genai,
            retry,
            limits,
            api_rate_limit,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            jobs: build_jobs_settings(jobs)?,
            genai: build_genai_settings(genai)?,
            retry: build_retry_settings(retry)?,
            limits: build_limit_settings(limits)?,
            api_rate_limit: build_api_rate_limit_settings(api_rate_limit)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    let public_base_url = match non_empty(server.public_base_url) {
        Some(raw) => {
            let url = Url::parse(&raw).map_err(|err| {
                LoadError::invalid("server.public_base_url", format!("invalid URL: {err}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "server.public_base_url",
                    "scheme must be http or https",
                ));
            }
            Some(raw.trim_end_matches('/').to_string())
        }
        None => None,
    };

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        public_base_url,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(true) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_empty(database.url);

    let http_value = database
        .http_max_connections
        .unwrap_or(DEFAULT_DB_HTTP_MAX_CONNECTIONS);
    let jobs_value = database
        .jobs_max_connections
        .unwrap_or(DEFAULT_DB_JOBS_MAX_CONNECTIONS);

    Ok(DatabaseSettings {
        url,
        http_max_connections: non_zero_u32(http_value.into(), "database.http_max_connections")?,
        jobs_max_connections: non_zero_u32(jobs_value.into(), "database.jobs_max_connections")?,
    })
}

fn build_jobs_settings(jobs: RawJobsSettings) -> Result<JobsSettings, LoadError> {
    let max_concurrent = jobs.max_concurrent.unwrap_or(DEFAULT_JOBS_MAX_CONCURRENT);
    let delivery_attempts = jobs
        .delivery_attempts
        .unwrap_or(DEFAULT_JOBS_DELIVERY_ATTEMPTS);
    let ttl_hours = jobs.result_ttl_hours.unwrap_or(DEFAULT_JOBS_RESULT_TTL_HOURS);
    if ttl_hours == 0 {
        return Err(LoadError::invalid(
            "jobs.result_ttl_hours",
            "must be greater than zero",
        ));
    }
    let estimate_secs = jobs
        .default_estimate_seconds
        .unwrap_or(DEFAULT_JOBS_ESTIMATE_SECS);
    if estimate_secs == 0 {
        return Err(LoadError::invalid(
            "jobs.default_estimate_seconds",
            "must be greater than zero",
        ));
    }

    Ok(JobsSettings {
        max_concurrent: non_zero_u32(max_concurrent.into(), "jobs.max_concurrent")?,
        delivery_attempts: non_zero_u32(delivery_attempts.into(), "jobs.delivery_attempts")?,
        result_ttl: Duration::from_secs(ttl_hours.saturating_mul(3600)),
        default_estimate: Duration::from_secs(estimate_secs),
    })
}

fn build_genai_settings(genai: RawGenAiSettings) -> Result<GenAiSettings, LoadError> {
    let raw_endpoint =
        non_empty(genai.endpoint_url).unwrap_or_else(|| DEFAULT_GENAI_ENDPOINT_URL.to_string());
    let endpoint_url = Url::parse(&raw_endpoint).map_err(|err| {
        LoadError::invalid("genai.endpoint_url", format!("invalid URL: {err}"))
    })?;
    if !matches!(endpoint_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "genai.endpoint_url",
            "scheme must be http or https",
        ));
    }

    let timeout_secs = genai.timeout_seconds.unwrap_or(DEFAULT_GENAI_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "genai.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let max_tokens = genai.max_tokens.unwrap_or(DEFAULT_GENAI_MAX_TOKENS);
    let temperature = genai.temperature.unwrap_or(DEFAULT_GENAI_TEMPERATURE);
    if !(0.0..=2.0).contains(&temperature) {
        return Err(LoadError::invalid(
            "genai.temperature",
            "must be between 0.0 and 2.0",
        ));
    }

    let model = non_empty(genai.model).unwrap_or_else(|| DEFAULT_GENAI_MODEL.to_string());

    Ok(GenAiSettings {
        endpoint_url,
        api_key: non_empty(genai.api_key),
        timeout: Duration::from_secs(timeout_secs),
        max_tokens: non_zero_u32(max_tokens.into(), "genai.max_tokens")?,
        temperature,
        model,
    })
}

fn build_retry_settings(retry: RawRetrySettings) -> Result<RetrySettings, LoadError> {
    let max_attempts = retry.max_attempts.unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS);
    let initial_ms = retry
        .initial_backoff_ms
        .unwrap_or(DEFAULT_RETRY_INITIAL_BACKOFF_MS);
    let max_ms = retry.max_backoff_ms.unwrap_or(DEFAULT_RETRY_MAX_BACKOFF_MS);
    if max_ms < initial_ms {
        return Err(LoadError::invalid(
            "retry.max_backoff_ms",
            "must not be smaller than retry.initial_backoff_ms",
        ));
    }
    let multiplier = retry.multiplier.unwrap_or(DEFAULT_RETRY_MULTIPLIER);
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(LoadError::invalid(
            "retry.multiplier",
            "must be a finite number of at least 1.0",
        ));
    }

    Ok(RetrySettings {
        max_attempts: non_zero_u32(max_attempts.into(), "retry.max_attempts")?,
        initial_backoff: Duration::from_millis(initial_ms),
        max_backoff: Duration::from_millis(max_ms),
        multiplier,
    })
}

fn build_limit_settings(limits: RawLimitSettings) -> Result<LimitSettings, LoadError> {
    let max_spec_bytes = NonZeroU64::new(limits.max_spec_bytes.unwrap_or(DEFAULT_MAX_SPEC_BYTES))
        .ok_or_else(|| LoadError::invalid("limits.max_spec_bytes", "must be greater than zero"))?;
    usize::try_from(max_spec_bytes.get()).map_err(|_| {
        LoadError::invalid(
            "limits.max_spec_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    let fetch_secs = limits
        .fetch_timeout_seconds
        .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
    if fetch_secs == 0 {
        return Err(LoadError::invalid(
            "limits.fetch_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(LimitSettings {
        max_spec_bytes,
        fetch_timeout: Duration::from_secs(fetch_secs),
    })
}

fn build_api_rate_limit_settings(
    rate_limit: RawApiRateLimitSettings,
) -> Result<ApiRateLimitSettings, LoadError> {
    let window_seconds_val = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_API_RATE_LIMIT_WINDOW_SECS);
    let window_seconds = non_zero_u32(window_seconds_val, "api_rate_limit.window_seconds")?;

    let max_requests_val = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_API_RATE_LIMIT_MAX_REQUESTS);
    let max_requests = non_zero_u32(max_requests_val, "api_rate_limit.max_requests")?;

    Ok(ApiRateLimitSettings {
        window_seconds,
        max_requests,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    http_max_connections: Option<u32>,
    jobs_max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawJobsSettings {
    max_concurrent: Option<u32>,
    delivery_attempts: Option<u32>,
    result_ttl_hours: Option<u64>,
    default_estimate_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGenAiSettings {
    endpoint_url: Option<String>,
    api_key: Option<String>,
    timeout_seconds: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRetrySettings {
    max_attempts: Option<u32>,
    initial_backoff_ms: Option<u64>,
    max_backoff_ms: Option<u64>,
    multiplier: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLimitSettings {
    max_spec_bytes: Option<u64>,
    fetch_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
