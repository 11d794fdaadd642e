pub mod ledger;
pub mod schedule;

pub use ledger::{LedgerRow, LedgerTotals, LedgerView};
pub use schedule::{
    fixed_payment, GeneratedSchedule, ScheduleGenerator, ScheduleLine, ScheduleRequest,
};
