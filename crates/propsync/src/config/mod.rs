use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the engine.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub broker: BrokerConfig,
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let broker_url =
            env::var("APP_BROKER_URL").unwrap_or_else(|_| "amqp://localhost:5672".to_string());
        let exchange = env::var("APP_BROKER_EXCHANGE").unwrap_or_else(|_| "propsync".to_string());

        let pricing_hour_raw = env::var("APP_PRICING_HOUR").unwrap_or_else(|_| "4".to_string());
        let pricing_hour = pricing_hour_raw
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|hour| *hour < 24)
            .ok_or_else(|| ConfigError::InvalidPricingHour {
                value: pricing_hour_raw.clone(),
            })?;

        let analytics_raw =
            env::var("APP_ANALYTICS_INTERVAL_SECS").unwrap_or_else(|_| "3600".to_string());
        let analytics_secs = analytics_raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigError::InvalidAnalyticsInterval {
                value: analytics_raw.clone(),
            })?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            broker: BrokerConfig {
                url: broker_url,
                exchange,
            },
            schedule: ScheduleConfig {
                pricing_hour,
                analytics_interval: Duration::from_secs(analytics_secs),
            },
        })
    }
}

/// Settings controlling the operational HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Broker connection parameters. The URL is handed to whichever transport the
/// binary wires in; the exchange name is declared at startup.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub exchange: String,
}

/// Timing for the recurring pricing and analytics jobs.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// UTC hour (0-23) at which the daily price recommendation request fires.
    pub pricing_hour: u8,
    pub analytics_interval: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPricingHour { value: String },
    InvalidAnalyticsInterval { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPricingHour { value } => {
                write!(f, "APP_PRICING_HOUR must be an hour 0-23, got '{value}'")
            }
            ConfigError::InvalidAnalyticsInterval { value } => {
                write!(
                    f,
                    "APP_ANALYTICS_INTERVAL_SECS must be a positive number of seconds, got '{value}'"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPricingHour { .. }
            | ConfigError::InvalidAnalyticsInterval { .. } => None,
        }
    }
}
