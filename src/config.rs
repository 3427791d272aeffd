use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Configuration for the risk and reputation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Fraud detection configuration
    pub fraud: FraudConfig,
    /// Federated learning configuration
    pub federated: FederatedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudConfig {
    /// Detections above this risk score are persisted as alerts
    pub alert_risk_threshold: f64,
    /// Optional path for fraud model persistence
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedConfig {
    /// Dimensionality of the global model weight vector
    pub model_dim: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            fraud: FraudConfig {
                alert_risk_threshold: 60.0,
                model_path: None,
            },
            federated: FederatedConfig { model_dim: 10 },
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults, then validate.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("MARKETGUARD_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = env::var("MARKETGUARD_PORT") {
            config.server.port = port.parse().context("Invalid MARKETGUARD_PORT value")?;
        }

        if let Ok(level) = env::var("MARKETGUARD_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(threshold) = env::var("MARKETGUARD_FRAUD_ALERT_THRESHOLD") {
            config.fraud.alert_risk_threshold = threshold
                .parse()
                .context("Invalid MARKETGUARD_FRAUD_ALERT_THRESHOLD value")?;
        }

        if let Ok(path) = env::var("MARKETGUARD_FRAUD_MODEL_PATH") {
            config.fraud.model_path = Some(PathBuf::from(path));
        }

        if let Ok(dim) = env::var("MARKETGUARD_FEDERATED_MODEL_DIM") {
            config.federated.model_dim = dim
                .parse()
                .context("Invalid MARKETGUARD_FEDERATED_MODEL_DIM value")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for consistency
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if !(0.0..=100.0).contains(&self.fraud.alert_risk_threshold) {
            return Err(anyhow::anyhow!(
                "Fraud alert threshold must be within [0, 100], got {}",
                self.fraud.alert_risk_threshold
            ));
        }

        if self.federated.model_dim == 0 {
            return Err(anyhow::anyhow!("Federated model dimension must be non-zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_threshold_bounds() {
        let mut config = AppConfig::default();
        config.fraud.alert_risk_threshold = 101.0;
        assert!(config.validate().is_err());

        config.fraud.alert_risk_threshold = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_dim_must_be_positive() {
        let mut config = AppConfig::default();
        config.federated.model_dim = 0;
        assert!(config.validate().is_err());
    }
}
