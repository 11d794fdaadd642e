pub mod config;
pub mod contract;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod export;
pub mod installment;
pub mod mora;
pub mod ordering;
pub mod payments;
pub mod session;
pub mod store;
pub mod types;

// re-export key types
pub use config::LedgerConfig;
pub use contract::{Contract, ContractUpdate};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use export::{ExportSink, JsonExport, LedgerReport, ReportRow};
pub use installment::{Installment, InstallmentEdit, InstallmentPatch};
pub use mora::{LateFeeBasis, LateFeeConfig, LateFeeEngine, LateFeePolicy};
pub use payments::{
    GeneratedSchedule, LedgerRow, LedgerTotals, LedgerView, ScheduleGenerator, ScheduleLine,
    ScheduleRequest,
};
pub use session::{InstallmentDraft, LedgerSession};
pub use store::{InMemoryStore, InstallmentStore};
pub use types::{AmortizationMethod, ContractId, InstallmentId, PaymentStatus};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
