use rust_decimal::Decimal;
use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::{ContractId, InstallmentId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid principal: {amount} (must be greater than zero)")]
    InvalidPrincipal {
        amount: Money,
    },

    #[error("invalid term: {periods} periods (must be greater than zero)")]
    InvalidTerm {
        periods: i64,
    },

    #[error("invalid monthly rate: {rate} (must not be negative)")]
    InvalidRate {
        rate: Rate,
    },

    #[error("invalid money input: {input:?}")]
    InvalidMoneyInput {
        input: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("contract not found: {id}")]
    ContractNotFound {
        id: ContractId,
    },

    #[error("installment not found: {id}")]
    InstallmentNotFound {
        id: InstallmentId,
    },

    #[error("no pending edit for installment {id}")]
    NoPendingEdit {
        id: InstallmentId,
    },

    #[error("sort index {index} already used in contract")]
    DuplicateIndex {
        index: Decimal,
    },

    #[error("no room left between sort indices {lower} and {upper}; renumber the contract")]
    IndexExhausted {
        lower: Decimal,
        upper: Decimal,
    },

    #[error("amount out of range while computing {operation}")]
    CalculationOverflow {
        operation: String,
    },

    #[error("date out of range: {start} plus {months} months")]
    DateOutOfRange {
        start: chrono::NaiveDate,
        months: u32,
    },

    #[error("contract has {count} uncommitted edits")]
    PendingEdits {
        count: usize,
    },

    #[error("store error during {operation}: {message}")]
    Store {
        operation: String,
        message: String,
    },

    #[error("export failed: {message}")]
    Export {
        message: String,
    },
}

impl LedgerError {
    pub fn store(operation: &str, message: impl Into<String>) -> Self {
        LedgerError::Store {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn overflow(operation: &str) -> Self {
        LedgerError::CalculationOverflow {
            operation: operation.to_string(),
        }
    }

    /// validation errors are raised before any record is created
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidPrincipal { .. }
                | LedgerError::InvalidTerm { .. }
                | LedgerError::InvalidRate { .. }
                | LedgerError::InvalidMoneyInput { .. }
                | LedgerError::CalculationOverflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
