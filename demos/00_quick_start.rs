/// quick start - generate a table, record a payment, export the ledger
use cartera_ledger::chrono::NaiveDate;
use cartera_ledger::{
    AmortizationMethod, Contract, InMemoryStore, InstallmentEdit, JsonExport, ExportSink,
    LedgerConfig, LedgerSession, Money, Rate, SafeTimeProvider, ScheduleRequest, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);

    // a contract with a daily late fee of 0.50
    let store = InMemoryStore::new();
    let contract_id = store.create_contract(Contract::new(Money::ZERO, Rate::from_bps(5000)))?;

    let mut session = LedgerSession::new(store, LedgerConfig::default())?;
    session.load(contract_id, &time)?;

    // 12 monthly installments on a 1,200 balance at 2% a month
    let schedule = session.generate_schedule(
        contract_id,
        &ScheduleRequest {
            principal: Money::from_major(1_200),
            term_periods: 12,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15).ok_or("bad date")?,
            monthly_rate: Rate::from_percentage(2),
            method: AmortizationMethod::Frances,
        },
        &time,
    )?;
    println!("payment per period: {}", schedule.lines[0].payment);

    // pay the first installment in full
    let first = schedule.installments[0].id;
    session.edit(
        contract_id,
        first,
        InstallmentEdit::AmountPaid(schedule.lines[0].payment),
        &time,
    )?;
    session.commit(contract_id, first, &time)?;

    let report = session.report(contract_id, &time)?;
    let mut sink = JsonExport::new(std::io::stdout());
    sink.export(&report)?;

    Ok(())
}
