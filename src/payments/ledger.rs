use log::debug;
use serde::Serialize;

use crate::decimal::Money;
use crate::installment::Installment;

/// installment with its display-only running balance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub installment: Installment,
    /// part of the payment left after late fee and interest
    pub capital_credited: Money,
    /// outstanding principal right after this row
    #[serde(rename = "saldoCalculadoMomento")]
    pub running_balance: Money,
}

/// contract-wide footer figures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerTotals {
    pub late_fees_charged: Money,
    pub paid: Money,
    pub capital: Money,
    pub interest: Money,
    pub installment_total: Money,
    pub outstanding: Money,
    pub final_balance: Money,
}

/// read-side view of a contract's table; never persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerView {
    pub opening_balance: Money,
    pub rows: Vec<LedgerRow>,
    pub totals: LedgerTotals,
}

impl LedgerView {
    /// walk rows in sort order. payments go to late fee, then interest;
    /// only the surplus reduces principal
    pub fn reduce(opening_balance: Money, installments: &[Installment]) -> Self {
        let mut ordered: Vec<&Installment> = installments.iter().collect();
        ordered.sort_by(|a, b| a.sort_index.cmp(&b.sort_index));

        let mut balance = opening_balance;
        let mut totals = LedgerTotals::default();
        let mut rows = Vec::with_capacity(ordered.len());

        for installment in ordered {
            let surplus = installment.amount_paid - installment.late_fee_charged - installment.interest;
            let capital_credited = surplus.max(Money::ZERO);
            balance -= capital_credited;

            totals.late_fees_charged += installment.late_fee_charged;
            totals.paid += installment.amount_paid;
            totals.capital += installment.capital;
            totals.interest += installment.interest;
            totals.installment_total += installment.installment_total;
            totals.outstanding += installment.outstanding;

            rows.push(LedgerRow {
                installment: installment.clone(),
                capital_credited,
                running_balance: balance,
            });
        }
        totals.final_balance = balance;

        debug!(
            "reduced {} rows: opening {}, final balance {}",
            rows.len(),
            opening_balance,
            balance
        );

        Self {
            opening_balance,
            rows,
            totals,
        }
    }

    pub fn final_balance(&self) -> Money {
        self.totals.final_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installment::{DerivationContext, InstallmentEdit};
    use crate::decimal::Rate;
    use crate::mora::LateFeeEngine;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn row(index: Decimal, capital: i64, interest: i64, late_fee: i64, paid: i64) -> Installment {
        let engine = LateFeeEngine::default();
        let ctx = DerivationContext {
            daily_rate: Rate::ZERO,
            today: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            late_fees: &engine,
            paid_tolerance: Money::from_cents(1),
        };
        let mut row = Installment::new(
            Uuid::new_v4(),
            index,
            index.to_string(),
            "",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            Money::from_major(capital),
            Money::from_major(interest),
        );
        row.apply_edit(InstallmentEdit::LateFeeCharged(Money::from_major(late_fee)), &ctx);
        row.apply_edit(InstallmentEdit::AmountPaid(Money::from_major(paid)), &ctx);
        row
    }

    #[test]
    fn test_payment_consumes_interest_before_capital() {
        let view = LedgerView::reduce(Money::from_major(1000), &[row(dec!(1), 100, 10, 0, 110)]);

        assert_eq!(view.rows[0].capital_credited, Money::from_major(100));
        assert_eq!(view.rows[0].running_balance, Money::from_major(900));
        assert_eq!(view.final_balance(), Money::from_major(900));
    }

    #[test]
    fn test_late_fee_consumed_first() {
        let view = LedgerView::reduce(Money::from_major(1000), &[row(dec!(1), 100, 10, 15, 110)]);
        assert_eq!(view.rows[0].capital_credited, Money::from_major(85));
        assert_eq!(view.final_balance(), Money::from_major(915));
    }

    #[test]
    fn test_short_payment_credits_nothing() {
        let view = LedgerView::reduce(Money::from_major(1000), &[row(dec!(1), 100, 10, 5, 12)]);
        assert_eq!(view.rows[0].capital_credited, Money::ZERO);
        assert_eq!(view.final_balance(), Money::from_major(1000));
    }

    #[test]
    fn test_rows_walked_in_index_order() {
        let rows = vec![
            row(dec!(2), 100, 0, 0, 100),
            row(dec!(1.5), 50, 0, 0, 50),
            row(dec!(1), 100, 0, 0, 100),
        ];
        let view = LedgerView::reduce(Money::from_major(1000), &rows);

        let balances: Vec<Money> = view.rows.iter().map(|r| r.running_balance).collect();
        assert_eq!(
            balances,
            vec![Money::from_major(900), Money::from_major(850), Money::from_major(750)]
        );
        assert_eq!(view.rows[1].installment.sort_index, dec!(1.5));
    }

    #[test]
    fn test_totals() {
        let rows = vec![
            row(dec!(1), 100, 20, 5, 125),
            row(dec!(2), 100, 10, 0, 50),
            row(dec!(3), 100, 5, 0, 0),
        ];
        let view = LedgerView::reduce(Money::from_major(300), &rows);

        assert_eq!(view.totals.late_fees_charged, Money::from_major(5));
        assert_eq!(view.totals.paid, Money::from_major(175));
        assert_eq!(view.totals.capital, Money::from_major(300));
        assert_eq!(view.totals.interest, Money::from_major(35));
        assert_eq!(view.totals.installment_total, Money::from_major(335));
        assert_eq!(view.totals.outstanding, Money::from_major(165));
        // 100 credited from row 1, 40 from row 2
        assert_eq!(view.totals.final_balance, Money::from_major(160));
    }

    #[test]
    fn test_empty_table() {
        let view = LedgerView::reduce(Money::from_major(500), &[]);
        assert!(view.rows.is_empty());
        assert_eq!(view.final_balance(), Money::from_major(500));
    }
}
