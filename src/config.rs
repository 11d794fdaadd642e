use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::mora::{LateFeeConfig, LateFeeEngine};

/// ledger engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// outstanding balance at or below which a row counts as paid
    pub paid_tolerance: Money,
    /// label shown for rows inserted between two scheduled installments
    pub additional_label: String,
    pub late_fee: LateFeeConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            paid_tolerance: Money::from_decimal(dec!(0.01)),
            additional_label: "Adic.".to_string(),
            late_fee: LateFeeConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// load configuration from a JSON document; missing keys fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.paid_tolerance.is_negative() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("paid_tolerance must not be negative, got {}", self.paid_tolerance),
            });
        }
        if let Some(cap) = self.late_fee.maximum_fee {
            if cap.is_negative() {
                return Err(LedgerError::InvalidConfiguration {
                    message: format!("late_fee.maximum_fee must not be negative, got {cap}"),
                });
            }
        }
        if self.additional_label.trim().is_empty() {
            return Err(LedgerError::InvalidConfiguration {
                message: "additional_label must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// late-fee engine built from this configuration
    pub fn late_fee_engine(&self) -> LateFeeEngine {
        LateFeeEngine::new(self.late_fee.clone())
    }
}
