use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::installment::Installment;
use crate::payments::ledger::LedgerView;
use crate::types::{ContractId, InstallmentId};

/// financing contract with its installment table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    /// principal base for the running balance; includes flat interest for LINEAR schedules
    #[serde(rename = "saldoInicialTotal")]
    pub opening_balance: Money,
    #[serde(rename = "tasaMoraDiaria")]
    pub daily_late_fee_rate: Rate,
    /// storage order; display order comes from `sort_index`
    pub installments: Vec<Installment>,
}

/// contract-level fields the store accepts updates for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractUpdate {
    #[serde(rename = "saldoInicialTotal")]
    pub opening_balance: Money,
}

impl Contract {
    pub fn new(opening_balance: Money, daily_late_fee_rate: Rate) -> Self {
        Self {
            id: Uuid::new_v4(),
            opening_balance,
            daily_late_fee_rate,
            installments: Vec::new(),
        }
    }

    /// installments in display order
    pub fn sorted_installments(&self) -> Vec<&Installment> {
        let mut rows: Vec<&Installment> = self.installments.iter().collect();
        rows.sort_by(|a, b| a.sort_index.cmp(&b.sort_index));
        rows
    }

    pub fn sort_indices(&self) -> Vec<Decimal> {
        self.installments.iter().map(|i| i.sort_index).collect()
    }

    pub fn installment(&self, id: InstallmentId) -> Option<&Installment> {
        self.installments.iter().find(|i| i.id == id)
    }

    pub fn installment_mut(&mut self, id: InstallmentId) -> Option<&mut Installment> {
        self.installments.iter_mut().find(|i| i.id == id)
    }

    /// running balances and totals for display
    pub fn ledger(&self) -> LedgerView {
        LedgerView::reduce(self.opening_balance, &self.installments)
    }
}
