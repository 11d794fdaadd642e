use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};

/// what the daily late-fee rate is multiplied by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateFeeBasis {
    /// the rate is a money amount charged per overdue day
    #[default]
    PerDay,
    /// the rate is a fraction of the installment total charged per overdue day
    OnInstallment,
}

/// late-fee policy configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LateFeeConfig {
    pub basis: LateFeeBasis,
    /// overdue days forgiven before fees accrue
    pub grace_period_days: u32,
    /// cap on the suggested fee for a single installment
    pub maximum_fee: Option<Money>,
}

/// pluggable late-fee formula.
/// implementations must return zero at zero days and never decrease as days grow
pub trait LateFeePolicy {
    fn suggested_late_fee(&self, days_overdue: u32, daily_rate: Rate, installment_total: Money) -> Money;
}

/// simple (non-compounding) late-fee engine
#[derive(Debug, Clone, Default)]
pub struct LateFeeEngine {
    pub config: LateFeeConfig,
}

impl LateFeeEngine {
    pub fn new(config: LateFeeConfig) -> Self {
        Self { config }
    }

    /// calculate the suggested fee with its breakdown
    pub fn calculate(
        &self,
        days_overdue: u32,
        daily_rate: Rate,
        installment_total: Money,
    ) -> LateFeeCalculation {
        if days_overdue <= self.config.grace_period_days {
            return LateFeeCalculation {
                fee: Money::ZERO,
                days_charged: 0,
                grace_applied: days_overdue > 0,
                capped: false,
            };
        }

        let days_charged = days_overdue - self.config.grace_period_days;
        // negative rates and bases would make the fee shrink with time
        let rate = daily_rate.as_decimal().max(Decimal::ZERO);
        let per_day = match self.config.basis {
            LateFeeBasis::PerDay => rate,
            LateFeeBasis::OnInstallment => {
                installment_total.as_decimal().max(Decimal::ZERO) * rate
            }
        };

        let raw = Money::from_decimal(per_day * Decimal::from(days_charged));
        let (fee, capped) = match self.config.maximum_fee {
            Some(cap) if raw > cap => (cap, true),
            _ => (raw, false),
        };

        LateFeeCalculation {
            fee,
            days_charged,
            grace_applied: false,
            capped,
        }
    }
}

impl LateFeePolicy for LateFeeEngine {
    fn suggested_late_fee(&self, days_overdue: u32, daily_rate: Rate, installment_total: Money) -> Money {
        self.calculate(days_overdue, daily_rate, installment_total).fee
    }
}

/// late-fee calculation result
#[derive(Debug, Clone, PartialEq)]
pub struct LateFeeCalculation {
    pub fee: Money,
    pub days_charged: u32,
    pub grace_applied: bool,
    pub capped: bool,
}
