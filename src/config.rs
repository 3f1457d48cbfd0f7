//! Worker configuration

use crate::anchoring::ots::OtsConfig;
use crate::error::ConfigError;
use std::time::Duration;

pub const ENV_STORE_URL: &str = "SUPABASE_URL";
pub const ENV_STORE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const ENV_EMAIL_KEY: &str = "RESEND_API_KEY";
pub const ENV_EMAIL_FROM: &str = "OTS_WORKER_EMAIL_FROM";

pub const DEFAULT_EMAIL_API_BASE: &str = "https://api.resend.com";
pub const DEFAULT_EMAIL_SENDER: &str = "EcoSign <onboarding@resend.dev>";

/// Timeout for REST store and email requests
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Which phases a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunMode {
    /// Stamp queued jobs only
    Stamp,
    /// Follow up on pending jobs only
    Followup,
    /// Stamp, pause, then follow up
    Both,
}

impl RunMode {
    pub fn stamps(&self) -> bool {
        matches!(self, RunMode::Stamp | RunMode::Both)
    }

    pub fn follows_up(&self) -> bool {
        matches!(self, RunMode::Followup | RunMode::Both)
    }
}

/// Remote store (PostgREST) configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Project URL, without the `/rest/v1` suffix
    pub url: String,
    /// Service role key, sent as `apikey` and bearer token
    pub service_key: String,
}

impl StoreConfig {
    /// Base URL of the REST interface
    pub fn rest_base(&self) -> String {
        format!("{}/rest/v1", self.url.trim_end_matches('/'))
    }
}

/// Email provider configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// API key (None = notifications disabled)
    pub api_key: Option<String>,
    pub api_base: String,
    /// `From` header of completion emails
    pub sender: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_EMAIL_API_BASE.to_string(),
            sender: DEFAULT_EMAIL_SENDER.to_string(),
        }
    }
}

impl EmailConfig {
    /// Check if email delivery is configured
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Per-run settings, usually from the command line
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum jobs fetched per phase
    pub limit: usize,
    pub mode: RunMode,
    /// Pause between the stamp and follow-up phases
    pub phase_pause: Duration,
    /// Only notify once the proof carries a Bitcoin attestation
    pub require_confirmation: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            mode: RunMode::Both,
            phase_pause: Duration::from_secs(2),
            require_confirmation: false,
        }
    }
}

/// Complete worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub store: StoreConfig,
    pub email: EmailConfig,
    pub ots: OtsConfig,
    pub run: RunConfig,
}

impl WorkerConfig {
    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load credentials through an arbitrary variable lookup
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let url = read(ENV_STORE_URL).ok_or(ConfigError::MissingVar(ENV_STORE_URL))?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: ENV_STORE_URL,
                reason: format!("expected an http(s) URL, got {url:?}"),
            });
        }
        let service_key = read(ENV_STORE_KEY).ok_or(ConfigError::MissingVar(ENV_STORE_KEY))?;

        let email = EmailConfig {
            api_key: read(ENV_EMAIL_KEY),
            sender: read(ENV_EMAIL_FROM).unwrap_or_else(|| DEFAULT_EMAIL_SENDER.to_string()),
            ..EmailConfig::default()
        };

        Ok(Self {
            store: StoreConfig { url, service_key },
            email,
            ots: OtsConfig::default(),
            run: RunConfig::default(),
        })
    }

    /// Replace the run settings
    #[must_use]
    pub fn with_run(mut self, run: RunConfig) -> Self {
        self.run = run;
        self
    }

    /// Set the per-calendar request timeout
    #[must_use]
    pub fn with_calendar_timeout(mut self, timeout_secs: u64) -> Self {
        self.ots = self.ots.timeout_secs(timeout_secs);
        self
    }
}
