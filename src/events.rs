use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AmortizationMethod, ContractId, InstallmentId};

/// all events that can be emitted by a ledger session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // schedule events
    ScheduleGenerated {
        contract_id: ContractId,
        method: AmortizationMethod,
        periods: u32,
        opening_balance: Money,
        timestamp: DateTime<Utc>,
    },
    InstallmentsCleared {
        contract_id: ContractId,
        count: usize,
        timestamp: DateTime<Utc>,
    },
    InstallmentsRenumbered {
        contract_id: ContractId,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    // row events
    InstallmentInserted {
        contract_id: ContractId,
        installment_id: InstallmentId,
        sort_index: Decimal,
        timestamp: DateTime<Utc>,
    },
    InstallmentUpdated {
        contract_id: ContractId,
        installment_id: InstallmentId,
        fields: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    InstallmentDeleted {
        contract_id: ContractId,
        installment_id: InstallmentId,
        timestamp: DateTime<Utc>,
    },
    EditRolledBack {
        contract_id: ContractId,
        installment_id: InstallmentId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // load events
    RowsRederived {
        contract_id: ContractId,
        count: usize,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
