use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decimal::Precision;
use crate::errors::{ReconcileError, Result};
use crate::types::CreditPhase;

const DEFAULT_POSTING_TIMEOUT: Duration = Duration::from_secs(10);

/// reconciliation configuration, usually derived from the pos profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// master switch for the payments feature
    pub payments_enabled: bool,
    pub allow_settlement_credits: bool,
    pub allow_existing_credits: bool,
    pub allow_new_payments: bool,
    /// bound on every ledger call
    #[serde(with = "millis", default = "default_timeout")]
    pub posting_timeout: Duration,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default)]
    pub cost_center: Option<String>,
}

fn default_timeout() -> Duration {
    DEFAULT_POSTING_TIMEOUT
}

impl ReconcileConfig {
    /// every channel enabled, 10 s ledger timeout, two-place currency
    pub fn standard() -> Self {
        Self {
            payments_enabled: true,
            allow_settlement_credits: true,
            allow_existing_credits: true,
            allow_new_payments: true,
            posting_timeout: DEFAULT_POSTING_TIMEOUT,
            precision: Precision::default(),
            cost_center: None,
        }
    }

    /// only reconcile credits that already exist; nothing new is minted
    pub fn existing_only() -> Self {
        Self {
            allow_settlement_credits: false,
            allow_new_payments: false,
            ..Self::standard()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.posting_timeout = timeout;
        self
    }

    pub fn with_cost_center(mut self, cost_center: impl Into<String>) -> Self {
        self.cost_center = Some(cost_center.into());
        self
    }

    /// parse from json, then validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ReconcileError::InvalidConfiguration {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.posting_timeout.is_zero() {
            return Err(ReconcileError::InvalidConfiguration {
                message: "posting timeout must be greater than zero".to_string(),
            });
        }
        if self.precision.decimal_places > 8 {
            return Err(ReconcileError::InvalidConfiguration {
                message: format!(
                    "precision of {} places exceeds the ledger scale",
                    self.precision.decimal_places
                ),
            });
        }
        Ok(())
    }

    pub fn phase_enabled(&self, phase: CreditPhase) -> bool {
        match phase {
            CreditPhase::Settlement => self.allow_settlement_credits,
            CreditPhase::Existing => self.allow_existing_credits,
            CreditPhase::NewPayment => self.allow_new_payments,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::standard()
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let config = ReconcileConfig::from_json(
            r#"{
                "payments_enabled": true,
                "allow_settlement_credits": false,
                "allow_existing_credits": true,
                "allow_new_payments": true,
                "posting_timeout": 2500,
                "cost_center": "Main - C"
            }"#,
        )
        .unwrap();

        assert_eq!(config.posting_timeout, Duration::from_millis(2500));
        assert_eq!(config.precision, Precision::new(2));
        assert!(!config.phase_enabled(CreditPhase::Settlement));
        assert!(config.phase_enabled(CreditPhase::NewPayment));
    }

    #[test]
    fn test_missing_timeout_defaults() {
        let config = ReconcileConfig::from_json(
            r#"{"payments_enabled": true, "allow_settlement_credits": true,
                "allow_existing_credits": true, "allow_new_payments": true}"#,
        )
        .unwrap();
        assert_eq!(config.posting_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ReconcileConfig::standard()
            .with_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_existing_only() {
        let config = ReconcileConfig::existing_only();
        assert!(config.phase_enabled(CreditPhase::Existing));
        assert!(!config.phase_enabled(CreditPhase::NewPayment));
        assert!(!config.phase_enabled(CreditPhase::Settlement));
    }
}
