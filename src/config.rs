//! Runtime settings: an optional TOML file overlaid with environment
//! variables for secrets and deployment-specific values.

use crate::application::engine::EngineConfig;
use crate::application::retry::RetryPolicy;
use crate::domain::fees::FeeSchedule;
use crate::domain::money::Currency;
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_GATEWAY_URL: &str = "TASKPAY_GATEWAY_URL";
pub const ENV_SECRET_KEY: &str = "TASKPAY_SECRET_KEY";
pub const ENV_WEBHOOK_SECRET: &str = "TASKPAY_WEBHOOK_SECRET";
pub const ENV_LISTEN_ADDR: &str = "TASKPAY_LISTEN_ADDR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub base_url: String,
    pub secret_key: String,
    /// Falls back to `secret_key` when empty, as most providers sign
    /// webhooks with the API secret.
    pub webhook_secret: String,
    pub timeout_secs: u64,
    pub verify_with_gateway: bool,
    pub callback_url: Option<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.paystack.co".to_string(),
            secret_key: String::new(),
            webhook_secret: String::new(),
            timeout_secs: 30,
            verify_with_gateway: true,
            callback_url: None,
        }
    }
}

impl GatewaySettings {
    pub fn webhook_secret(&self) -> &str {
        if self.webhook_secret.is_empty() {
            &self.secret_key
        } else {
            &self.webhook_secret
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub currency: Currency,
    pub gateway: GatewaySettings,
    pub fees: FeeSchedule,
    pub retry: RetryPolicy,
    pub server: ServerSettings,
}

impl Settings {
    /// Reads `path` (when given), applies environment overrides and
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| PaymentError::ConfigError(e.to_string()))
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_GATEWAY_URL) {
            self.gateway.base_url = url;
        }
        if let Some(key) = lookup(ENV_SECRET_KEY) {
            self.gateway.secret_key = key;
        }
        if let Some(secret) = lookup(ENV_WEBHOOK_SECRET) {
            self.gateway.webhook_secret = secret;
        }
        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            self.server.listen_addr = addr;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.fees.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(PaymentError::ConfigError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(PaymentError::ConfigError(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Secrets are only needed once we talk to the provider.
    pub fn require_secrets(&self) -> Result<()> {
        if self.gateway.secret_key.is_empty() {
            return Err(PaymentError::ConfigError(format!(
                "gateway secret key missing; set {ENV_SECRET_KEY}"
            )));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            currency: self.currency.clone(),
            fees: self.fees.clone(),
            retry: self.retry.clone(),
            verify_with_gateway: self.gateway.verify_with_gateway,
            callback_url: self.gateway.callback_url.clone(),
        }
    }
}
