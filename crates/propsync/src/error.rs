use crate::config::ConfigError;
use crate::messaging::BrokerError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Broker(BrokerError),
    Store(StoreError),
    Io(std::io::Error),
    Server(Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    /// Wrap an HTTP-server or other runtime error owned by the binary.
    pub fn server(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Server(err.into())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Broker(err) => write!(f, "broker error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Broker(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(&**err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<BrokerError> for AppError {
    fn from(value: BrokerError) -> Self {
        Self::Broker(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
