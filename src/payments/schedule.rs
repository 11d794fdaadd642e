use chrono::{Months, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::installment::Installment;
use crate::ordering;
use crate::types::{AmortizationMethod, ContractId};

/// contract parameters for schedule generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub principal: Money,
    pub term_periods: i32,
    pub start_date: NaiveDate,
    /// per-period fraction, e.g. 0.015 for 1.5% a month
    pub monthly_rate: Rate,
    pub method: AmortizationMethod,
}

impl ScheduleRequest {
    /// reject inputs that cannot produce a schedule
    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(LedgerError::InvalidPrincipal {
                amount: self.principal,
            });
        }
        if self.term_periods <= 0 {
            return Err(LedgerError::InvalidTerm {
                periods: i64::from(self.term_periods),
            });
        }
        if self.monthly_rate.is_negative() {
            return Err(LedgerError::InvalidRate {
                rate: self.monthly_rate,
            });
        }
        Ok(())
    }
}

/// one period of a generated schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleLine {
    pub period: u32,
    pub due_date: NaiveDate,
    pub opening_balance: Money,
    pub capital: Money,
    pub interest: Money,
    pub payment: Money,
    pub closing_balance: Money,
}

/// generated schedule ready to persist
#[derive(Debug, Clone)]
pub struct GeneratedSchedule {
    pub method: AmortizationMethod,
    /// new `saldoInicialTotal` for the contract
    pub opening_balance: Money,
    pub lines: Vec<ScheduleLine>,
    pub installments: Vec<Installment>,
    pub total_interest: Money,
    pub total_payable: Money,
}

impl GeneratedSchedule {
    /// balance left after the last period; zero for a well-formed schedule
    pub fn closing_balance(&self) -> Money {
        self.lines
            .last()
            .map(|l| l.closing_balance)
            .unwrap_or(self.opening_balance)
    }
}

/// schedule generator
pub struct ScheduleGenerator {
    method: AmortizationMethod,
    additional_label: String,
}

impl ScheduleGenerator {
    pub fn new(method: AmortizationMethod) -> Self {
        Self {
            method,
            additional_label: "Adic.".to_string(),
        }
    }

    pub fn with_additional_label(mut self, label: impl Into<String>) -> Self {
        self.additional_label = label.into();
        self
    }

    /// generate installments for `contract_id`, numbered after `existing_indices`
    pub fn generate(
        &self,
        contract_id: ContractId,
        request: &ScheduleRequest,
        existing_indices: &[Decimal],
    ) -> Result<GeneratedSchedule> {
        request.validate()?;

        let (opening_balance, lines) = self.calculate_lines(request)?;

        let mut next_index = ordering::append_index(existing_indices.iter().copied());
        let term = lines.len();
        let installments = lines
            .iter()
            .map(|line| {
                let index = next_index;
                next_index += Decimal::ONE;
                Installment::new(
                    contract_id,
                    index,
                    ordering::label_for(index, &self.additional_label),
                    format!("Cuota {} de {}", line.period, term),
                    line.due_date,
                    line.capital,
                    line.interest,
                )
            })
            .collect();

        let total_interest = match self.method {
            // flat interest is folded into the capital column
            AmortizationMethod::Linear => opening_balance - request.principal,
            _ => lines.iter().map(|l| l.interest).sum(),
        };
        let total_payable = lines.iter().map(|l| l.payment).sum();

        debug!(
            "generated {} schedule: {} periods, opening balance {}, interest {}",
            self.method, term, opening_balance, total_interest
        );

        Ok(GeneratedSchedule {
            method: self.method,
            opening_balance,
            lines,
            installments,
            total_interest,
            total_payable,
        })
    }

    /// per-period figures and the contract's new opening balance
    pub fn calculate_lines(&self, request: &ScheduleRequest) -> Result<(Money, Vec<ScheduleLine>)> {
        request.validate()?;
        match self.method {
            AmortizationMethod::Linear => self.calculate_linear(request),
            AmortizationMethod::Aleman => self.calculate_aleman(request),
            AmortizationMethod::Frances => self.calculate_frances(request),
        }
    }

    /// flat interest folded into equal capital installments.
    ///
    /// Every period but the last carries `round2(total / n)`; the last one
    /// takes whatever remains so the capital column sums to the total. When
    /// the per-period amount rounds up on a long term (2.00 over 300 periods
    /// is 0.01 each) that remainder is negative.
    fn calculate_linear(&self, request: &ScheduleRequest) -> Result<(Money, Vec<ScheduleLine>)> {
        let n = request.term_periods as u32;
        let total_interest = request
            .principal
            .checked_apply_rate(request.monthly_rate)
            .and_then(|per_period| per_period.as_decimal().checked_mul(Decimal::from(n)))
            .map(Money::from_decimal)
            .ok_or_else(|| LedgerError::overflow("flat interest"))?;
        let total_to_amortize = request
            .principal
            .checked_add(total_interest)
            .ok_or_else(|| LedgerError::overflow("flat interest"))?;
        let fixed_capital = total_to_amortize / Decimal::from(n);

        let mut lines = Vec::with_capacity(n as usize);
        let mut balance = total_to_amortize;
        for period in 1..=n {
            let capital = if period == n {
                // last period absorbs the rounding remainder
                total_to_amortize - fixed_capital * Decimal::from(n - 1)
            } else {
                fixed_capital
            };
            let closing = balance - capital;
            lines.push(ScheduleLine {
                period,
                due_date: due_date(request.start_date, period - 1)?,
                opening_balance: balance,
                capital,
                interest: Money::ZERO,
                payment: capital,
                closing_balance: closing,
            });
            balance = closing;
        }

        Ok((total_to_amortize, lines))
    }

    /// constant capital, interest on the declining balance
    fn calculate_aleman(&self, request: &ScheduleRequest) -> Result<(Money, Vec<ScheduleLine>)> {
        let n = request.term_periods as u32;
        let fixed_capital = request.principal / Decimal::from(n);

        let mut lines = Vec::with_capacity(n as usize);
        let mut balance = request.principal;
        for period in 1..=n {
            let interest = period_interest(balance, request.monthly_rate)?;
            let capital = if period == n || fixed_capital > balance {
                balance
            } else {
                fixed_capital
            };
            let closing = balance - capital;
            lines.push(ScheduleLine {
                period,
                due_date: due_date(request.start_date, period - 1)?,
                opening_balance: balance,
                capital,
                interest,
                payment: period_payment(capital, interest)?,
                closing_balance: closing,
            });
            balance = closing;
        }

        Ok((request.principal, lines))
    }

    /// annuity with a fixed payment
    fn calculate_frances(&self, request: &ScheduleRequest) -> Result<(Money, Vec<ScheduleLine>)> {
        let n = request.term_periods as u32;
        let payment = fixed_payment(request.principal, request.monthly_rate, n)?;

        let mut lines = Vec::with_capacity(n as usize);
        let mut balance = request.principal;
        for period in 1..=n {
            let interest = period_interest(balance, request.monthly_rate)?;
            let mut capital = payment - interest;
            if period == n || capital > balance {
                capital = balance;
            }
            let closing = balance - capital;
            lines.push(ScheduleLine {
                period,
                due_date: due_date(request.start_date, period - 1)?,
                opening_balance: balance,
                capital,
                interest,
                payment: period_payment(capital, interest)?,
                closing_balance: closing,
            });
            balance = closing;
        }

        Ok((request.principal, lines))
    }
}

/// annuity payment: P * i / (1 - (1+i)^-n), or P / n without interest.
///
/// The discount factor shrinks towards zero instead of growing, so long
/// terms at high rates cannot overflow.
pub fn fixed_payment(principal: Money, rate: Rate, periods: u32) -> Result<Money> {
    if periods == 0 {
        return Ok(principal);
    }

    let i = rate.as_decimal();
    let even_split = principal / Decimal::from(periods);
    if i.is_zero() {
        return Ok(even_split);
    }

    let discount = Decimal::ONE
        .checked_div(Decimal::ONE + i)
        .ok_or_else(|| LedgerError::overflow("annuity payment"))?;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor
            .checked_mul(discount)
            .ok_or_else(|| LedgerError::overflow("annuity payment"))?;
    }

    let denominator = Decimal::ONE - factor;
    if denominator.is_zero() {
        // rate too small to register at 28 digits
        return Ok(even_split);
    }
    principal
        .as_decimal()
        .checked_mul(i)
        .and_then(|numerator| numerator.checked_div(denominator))
        .map(Money::from_decimal)
        .ok_or_else(|| LedgerError::overflow("annuity payment"))
}

fn period_interest(balance: Money, rate: Rate) -> Result<Money> {
    balance
        .checked_apply_rate(rate)
        .ok_or_else(|| LedgerError::overflow("period interest"))
}

fn period_payment(capital: Money, interest: Money) -> Result<Money> {
    capital
        .checked_add(interest)
        .ok_or_else(|| LedgerError::overflow("period payment"))
}

/// start date plus `months`, clamped to the end of shorter months
fn due_date(start: NaiveDate, months: u32) -> Result<NaiveDate> {
    start
        .checked_add_months(Months::new(months))
        .ok_or(LedgerError::DateOutOfRange { start, months })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn request(principal: i64, rate: Decimal, term: i32, method: AmortizationMethod) -> ScheduleRequest {
        ScheduleRequest {
            principal: Money::from_major(principal),
            term_periods: term,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            monthly_rate: Rate::from_decimal(rate),
            method,
        }
    }

    fn generate(request: &ScheduleRequest) -> GeneratedSchedule {
        ScheduleGenerator::new(request.method)
            .generate(Uuid::new_v4(), request, &[])
            .unwrap()
    }

    #[test]
    fn test_linear_sum_law() {
        let schedule = generate(&request(1000, dec!(0.015), 12, AmortizationMethod::Linear));

        assert_eq!(schedule.total_interest, Money::from_major(180));
        assert_eq!(schedule.opening_balance, Money::from_major(1180));
        assert_eq!(schedule.installments.len(), 12);

        let capital: Money = schedule.installments.iter().map(|i| i.capital).sum();
        assert_eq!(capital, Money::from_major(1180));

        for row in &schedule.installments {
            assert_eq!(row.interest, Money::ZERO);
            assert_eq!(row.installment_total, row.capital);
        }
        // 1180 / 12 = 98.33, last absorbs 1180 - 98.33 * 11
        assert_eq!(schedule.installments[0].capital, Money::from_cents(9833));
        assert_eq!(schedule.installments[11].capital, Money::from_cents(9837));
        assert_eq!(schedule.closing_balance(), Money::ZERO);
    }

    #[test]
    fn test_aleman_decreasing_law() {
        let schedule = generate(&request(1200, dec!(0.02), 12, AmortizationMethod::Aleman));

        assert_eq!(schedule.opening_balance, Money::from_major(1200));
        let totals: Vec<Money> = schedule.installments.iter().map(|i| i.installment_total).collect();
        for pair in totals.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        assert_eq!(schedule.installments[0].interest, Money::from_major(24));
        assert_eq!(schedule.installments[0].installment_total, Money::from_major(124));
        assert_eq!(schedule.closing_balance(), Money::ZERO);

        let capital: Money = schedule.installments.iter().map(|i| i.capital).sum();
        assert_eq!(capital, Money::from_major(1200));
    }

    #[test]
    fn test_aleman_last_period_clamps_remainder() {
        // 1000 / 3 = 333.33, last period takes 333.34
        let schedule = generate(&request(1000, dec!(0.01), 3, AmortizationMethod::Aleman));
        assert_eq!(schedule.installments[2].capital, Money::from_cents(33334));
        assert_eq!(schedule.closing_balance(), Money::ZERO);
    }

    #[test]
    fn test_frances_constant_law() {
        let schedule = generate(&request(1200, dec!(0.02), 12, AmortizationMethod::Frances));

        assert_eq!(schedule.opening_balance, Money::from_major(1200));
        let first = schedule.installments[0].installment_total;
        assert_eq!(first, Money::from_cents(11347));
        for row in &schedule.installments[..11] {
            assert_eq!(row.installment_total, first);
        }
        assert_eq!(schedule.closing_balance(), Money::ZERO);

        // capital portion grows, interest shrinks
        for pair in schedule.installments[..11].windows(2) {
            assert!(pair[1].capital > pair[0].capital);
            assert!(pair[1].interest < pair[0].interest);
        }
    }

    #[test]
    fn test_frances_zero_rate() {
        let schedule = generate(&request(1200, dec!(0), 12, AmortizationMethod::Frances));
        for row in &schedule.installments {
            assert_eq!(row.interest, Money::ZERO);
            assert_eq!(row.installment_total, Money::from_major(100));
        }
        assert_eq!(schedule.closing_balance(), Money::ZERO);
    }

    #[test]
    fn test_due_dates_step_by_month() {
        let schedule = generate(&request(1200, dec!(0.02), 3, AmortizationMethod::Aleman));
        let dates: Vec<NaiveDate> = schedule.installments.iter().map(|i| i.due_date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            ]
        );
    }

    #[test]
    fn test_rows_start_pending_and_continue_numbering() {
        let req = request(600, dec!(0.01), 3, AmortizationMethod::Frances);
        let schedule = ScheduleGenerator::new(req.method)
            .generate(Uuid::new_v4(), &req, &[dec!(1), dec!(2), dec!(2.5)])
            .unwrap();

        let indices: Vec<Decimal> = schedule.installments.iter().map(|i| i.sort_index).collect();
        assert_eq!(indices, vec![dec!(3), dec!(4), dec!(5)]);
        for row in &schedule.installments {
            assert_eq!(row.amount_paid, Money::ZERO);
            assert_eq!(row.late_fee_charged, Money::ZERO);
            assert_eq!(row.status, crate::types::PaymentStatus::Pendiente);
            assert!(!row.is_additional());
        }
        assert_eq!(schedule.installments[0].label, "3");
        assert_eq!(schedule.installments[2].concept, "Cuota 3 de 3");
    }

    #[test]
    fn test_validation() {
        let generator = ScheduleGenerator::new(AmortizationMethod::Linear);
        let id = Uuid::new_v4();

        let zero_term = request(1000, dec!(0.01), 0, AmortizationMethod::Linear);
        assert!(matches!(generator.generate(id, &zero_term, &[]), Err(LedgerError::InvalidTerm { periods: 0 })));

        let negative_term = request(1000, dec!(0.01), -3, AmortizationMethod::Linear);
        assert!(matches!(generator.generate(id, &negative_term, &[]), Err(LedgerError::InvalidTerm { .. })));

        let zero_principal = request(0, dec!(0.01), 12, AmortizationMethod::Linear);
        assert!(matches!(generator.generate(id, &zero_principal, &[]), Err(LedgerError::InvalidPrincipal { .. })));

        let negative_rate = request(1000, dec!(-0.01), 12, AmortizationMethod::Linear);
        let err = generator.generate(id, &negative_rate, &[]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRate { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn test_fixed_payment() {
        assert_eq!(fixed_payment(Money::from_major(1200), Rate::from_percentage(2), 12).unwrap(), Money::from_cents(11347));
        assert_eq!(fixed_payment(Money::from_major(1200), Rate::ZERO, 12).unwrap(), Money::from_major(100));
    }

    #[test]
    fn test_frances_long_term_high_rate() {
        // (1.1)^700 does not fit in a Decimal; the payment converges to P * i
        let schedule = generate(&request(10_000, dec!(0.1), 700, AmortizationMethod::Frances));
        assert_eq!(schedule.installments.len(), 700);
        assert_eq!(schedule.installments[0].installment_total, Money::from_major(1000));
        assert_eq!(schedule.closing_balance(), Money::ZERO);

        let capital: Money = schedule.installments.iter().map(|i| i.capital).sum();
        assert_eq!(capital, Money::from_major(10_000));
    }

    #[test]
    fn test_out_of_range_amounts_are_rejected() {
        let huge = ScheduleRequest {
            principal: Money::from_decimal(Decimal::from_i128_with_scale(10_i128.pow(28), 0)),
            ..request(1, dec!(1), 12, AmortizationMethod::Linear)
        };
        let id = Uuid::new_v4();

        for method in [AmortizationMethod::Linear, AmortizationMethod::Frances, AmortizationMethod::Aleman] {
            let req = ScheduleRequest { method, monthly_rate: Rate::from_decimal(dec!(10)), ..huge.clone() };
            let result = ScheduleGenerator::new(method).generate(id, &req, &[]);
            assert!(
                matches!(result, Err(LedgerError::CalculationOverflow { .. })),
                "{method} should report overflow"
            );
        }
    }

    #[test]
    fn test_linear_last_period_can_go_negative() {
        // 2.00 / 300 rounds up to 0.01, so 299 periods already carry 2.99
        let schedule = generate(&request(2, dec!(0), 300, AmortizationMethod::Linear));
        assert_eq!(schedule.installments[0].capital, Money::from_cents(1));
        assert_eq!(schedule.installments[299].capital, Money::from_cents(-99));

        let capital: Money = schedule.installments.iter().map(|i| i.capital).sum();
        assert_eq!(capital, Money::from_major(2));
        assert_eq!(schedule.closing_balance(), Money::ZERO);
    }
}
