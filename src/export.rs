/// serializable report handed to PDF/spreadsheet exporters
use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::contract::Contract;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::payments::{LedgerTotals, LedgerView};
use crate::types::{ContractId, PaymentStatus};

/// fully derived view of a contract's table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerReport {
    pub contract_id: ContractId,
    pub generated_at: DateTime<Utc>,
    pub opening_balance: Money,
    pub daily_late_fee_rate: Rate,
    pub rows: Vec<ReportRow>,
    pub totals: LedgerTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub number: String,
    pub sort_index: Decimal,
    pub is_additional: bool,
    pub concept: String,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub capital: Money,
    pub interest: Money,
    pub installment_total: Money,
    pub late_fee_charged: Money,
    pub amount_paid: Money,
    pub outstanding: Money,
    pub days_overdue: u32,
    pub status: PaymentStatus,
    pub running_balance: Money,
    pub notes: String,
}

impl LedgerReport {
    pub fn build(contract: &Contract, generated_at: DateTime<Utc>) -> Self {
        Self::from_view(contract, &contract.ledger(), generated_at)
    }

    pub fn from_view(contract: &Contract, view: &LedgerView, generated_at: DateTime<Utc>) -> Self {
        let rows = view
            .rows
            .iter()
            .map(|row| {
                let i = &row.installment;
                ReportRow {
                    number: i.label.clone(),
                    sort_index: i.sort_index,
                    is_additional: i.is_additional(),
                    concept: i.concept.clone(),
                    due_date: i.due_date,
                    paid_date: i.paid_date,
                    capital: i.capital,
                    interest: i.interest,
                    installment_total: i.installment_total,
                    late_fee_charged: i.late_fee_charged,
                    amount_paid: i.amount_paid,
                    outstanding: i.outstanding,
                    days_overdue: i.days_overdue,
                    status: i.status,
                    running_balance: row.running_balance,
                    notes: i.notes.clone(),
                }
            })
            .collect();

        Self {
            contract_id: contract.id,
            generated_at,
            opening_balance: view.opening_balance,
            daily_late_fee_rate: contract.daily_late_fee_rate,
            rows,
            totals: view.totals.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::Export {
            message: e.to_string(),
        })
    }
}

/// destination for finished reports
pub trait ExportSink {
    fn export(&mut self, report: &LedgerReport) -> Result<()>;
}

/// writes reports as JSON documents
pub struct JsonExport<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonExport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: true,
        }
    }

    pub fn compact(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ExportSink for JsonExport<W> {
    fn export(&mut self, report: &LedgerReport) -> Result<()> {
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, report)
        } else {
            serde_json::to_writer(&mut self.writer, report)
        };
        written.map_err(|e| LedgerError::Export {
            message: e.to_string(),
        })?;
        self.writer.write_all(b"\n").map_err(|e| LedgerError::Export {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installment::Installment;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn contract() -> Contract {
        let mut contract = Contract::new(Money::from_major(1000), Rate::from_decimal(dec!(0.5)));
        let due = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut first = Installment::new(contract.id, dec!(1), "1".into(), "Cuota 1 de 2", due, Money::from_major(500), Money::from_major(10));
        first.amount_paid = Money::from_major(510);
        first.recompute_balances(Money::from_cents(1));
        let extra = Installment::new(contract.id, dec!(1.5), "Adic.".into(), "Seguro", due, Money::from_major(50), Money::ZERO);
        let second = Installment::new(contract.id, dec!(2), "2".into(), "Cuota 2 de 2", due, Money::from_major(500), Money::from_major(5));
        contract.installments = vec![second, extra, first];
        contract
    }

    #[test]
    fn test_report_rows_carry_running_balance() {
        let generated_at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let report = LedgerReport::build(&contract(), generated_at);

        let numbers: Vec<&str> = report.rows.iter().map(|r| r.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "Adic.", "2"]);
        assert!(report.rows[1].is_additional);
        assert_eq!(report.rows[0].running_balance, Money::from_major(500));
        assert_eq!(report.totals.final_balance, Money::from_major(500));
        assert_eq!(report.totals.paid, Money::from_major(510));
    }

    #[test]
    fn test_json_sink() {
        let generated_at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let report = LedgerReport::build(&contract(), generated_at);

        let mut sink = JsonExport::compact(Vec::new());
        sink.export(&report).unwrap();
        let output = String::from_utf8(sink.into_inner()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["rows"].as_array().unwrap().len(), 3);
        let amount = |v: &serde_json::Value| v.as_str().unwrap().parse::<Decimal>().unwrap();
        assert_eq!(amount(&parsed["rows"][0]["running_balance"]), dec!(500));
        assert_eq!(amount(&parsed["totals"]["final_balance"]), dec!(500));
        assert_eq!(parsed["rows"][1]["number"], "Adic.");
    }
}
