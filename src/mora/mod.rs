pub mod late_fee;
pub mod overdue;

pub use late_fee::{LateFeeBasis, LateFeeCalculation, LateFeeConfig, LateFeeEngine, LateFeePolicy};
pub use overdue::{days_overdue, today};
