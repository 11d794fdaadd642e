use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;

/// whole days between the due date and the payment date, never negative.
/// unpaid rows are measured against `today`
pub fn days_overdue(due_date: NaiveDate, paid_date: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let reference = paid_date.unwrap_or(today);
    let days = (reference - due_date).num_days();
    if days <= 0 {
        0
    } else {
        u32::try_from(days).unwrap_or(u32::MAX)
    }
}

/// calendar date of the provider's clock
pub fn today(time_provider: &SafeTimeProvider) -> NaiveDate {
    time_provider.now().date_naive()
}
