// Centralized configuration management for the link checker
// Loaded once in main and handed to every component at construction time

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub threat_intel: ThreatIntelConfig,
    pub probes: ProbeConfig,
    pub rendering: RenderingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Bind an OS-assigned port when `bind_address` is already taken
    pub port_fallback: bool,
    pub environment: Environment,
    pub cors_allowed_origins: Vec<String>,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Threat-matching service (Safe Browsing v4 lookup API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatIntelConfig {
    /// Lookups are skipped entirely when no key is configured
    pub api_key: Option<String>,
    pub api_url: String,
    pub client_id: String,
    pub client_version: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Default for ThreatIntelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://safebrowsing.googleapis.com/v4/threatMatches:find".to_string(),
            client_id: "link-checker".to_string(),
            client_version: "1.0".to_string(),
            timeout: Duration::from_secs(8),
            max_attempts: 2,
            retry_base_delay: Duration::from_millis(200),
        }
    }
}

/// Timeouts for the network probes and the whole assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub tls_connect_timeout: Duration,
    pub reachability_timeout: Duration,
    /// None waits for every probe to settle, however long it takes
    pub request_timeout: Option<Duration>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            tls_connect_timeout: Duration::from_secs(10),
            reachability_timeout: Duration::from_secs(15),
            request_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Headless rendering over WebDriver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderingConfig {
    pub enabled: bool,
    pub webdriver_url: String,
    pub max_sessions: usize,
    pub acquire_timeout: Duration,
    pub page_load_timeout: Duration,
    pub navigation_wait: Duration,
    pub ad_element_threshold: usize,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webdriver_url: "http://localhost:4444".to_string(),
            max_sessions: 4,
            acquire_timeout: Duration::from_secs(10),
            page_load_timeout: Duration::from_secs(30),
            navigation_wait: Duration::from_secs(30),
            ad_element_threshold: 3,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Helper function to get optional env var with default
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).trim().parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_u32_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).trim().parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_usize_or_default = |key: &str, default: &str| -> Result<usize, ConfigError> {
            get_or_default(key, default).trim().parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid usize".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        // Parse bind address to extract port
        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:3000");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "BIND_ADDRESS".to_string(),
                    format!("no port in '{}'", bind_address),
                )
            })?;

        let cors_allowed_origins: Vec<String> = get_or_default("CORS_ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server = ServerConfig {
            bind_address,
            port,
            port_fallback: parse_bool_or_default("PORT_FALLBACK", "true"),
            environment: Environment::from(get_or_default("ENVIRONMENT", "development")),
            cors_allowed_origins,
        };

        let defaults = ThreatIntelConfig::default();
        let threat_intel = ThreatIntelConfig {
            api_key: env::var("SAFE_BROWSING_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            api_url: get_or_default("SAFE_BROWSING_API_URL", &defaults.api_url),
            client_id: get_or_default("SAFE_BROWSING_CLIENT_ID", &defaults.client_id),
            client_version: get_or_default(
                "SAFE_BROWSING_CLIENT_VERSION",
                &defaults.client_version,
            ),
            timeout: Duration::from_secs(parse_u64_or_default("THREAT_INTEL_TIMEOUT_SECS", "8")?),
            max_attempts: parse_u32_or_default("THREAT_INTEL_MAX_ATTEMPTS", "2")?,
            retry_base_delay: Duration::from_millis(parse_u64_or_default(
                "THREAT_INTEL_RETRY_DELAY_MS",
                "200",
            )?),
        };

        let request_timeout_secs = parse_u64_or_default("REQUEST_TIMEOUT_SECS", "120")?;
        let probes = ProbeConfig {
            tls_connect_timeout: Duration::from_secs(parse_u64_or_default(
                "TLS_CONNECT_TIMEOUT_SECS",
                "10",
            )?),
            reachability_timeout: Duration::from_secs(parse_u64_or_default(
                "REACHABILITY_TIMEOUT_SECS",
                "15",
            )?),
            request_timeout: (request_timeout_secs > 0)
                .then(|| Duration::from_secs(request_timeout_secs)),
        };

        let rendering = RenderingConfig {
            enabled: parse_bool_or_default("RENDERING_ENABLED", "true"),
            webdriver_url: get_or_default("WEBDRIVER_URL", "http://localhost:4444"),
            max_sessions: parse_usize_or_default("RENDER_MAX_SESSIONS", "4")?,
            acquire_timeout: Duration::from_secs(parse_u64_or_default(
                "RENDER_ACQUIRE_TIMEOUT_SECS",
                "10",
            )?),
            page_load_timeout: Duration::from_secs(parse_u64_or_default(
                "PAGE_LOAD_TIMEOUT_SECS",
                "30",
            )?),
            navigation_wait: Duration::from_secs(parse_u64_or_default(
                "NAVIGATION_WAIT_SECS",
                "30",
            )?),
            ad_element_threshold: parse_usize_or_default("AD_ELEMENT_THRESHOLD", "3")?,
        };

        let config = Self {
            server,
            threat_intel,
            probes,
            rendering,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a probe unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = |key: &str| {
            ConfigError::InvalidValue(key.to_string(), "must be greater than 0".to_string())
        };

        if self.rendering.max_sessions == 0 {
            return Err(zero("RENDER_MAX_SESSIONS"));
        }
        if self.probes.tls_connect_timeout.is_zero() {
            return Err(zero("TLS_CONNECT_TIMEOUT_SECS"));
        }
        if self.probes.reachability_timeout.is_zero() {
            return Err(zero("REACHABILITY_TIMEOUT_SECS"));
        }
        if self.threat_intel.timeout.is_zero() {
            return Err(zero("THREAT_INTEL_TIMEOUT_SECS"));
        }
        if self.threat_intel.max_attempts == 0 {
            return Err(zero("THREAT_INTEL_MAX_ATTEMPTS"));
        }
        if self.rendering.page_load_timeout.is_zero() {
            return Err(zero("PAGE_LOAD_TIMEOUT_SECS"));
        }
        Ok(())
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "0.0.0.0:3000".to_string(),
                port: 3000,
                port_fallback: true,
                environment: Environment::Development,
                cors_allowed_origins: vec!["*".to_string()],
            },
            threat_intel: ThreatIntelConfig::default(),
            probes: ProbeConfig::default(),
            rendering: RenderingConfig::default(),
        }
    }
}
