use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::mora::{days_overdue, LateFeePolicy};
use crate::ordering;
use crate::types::{ContractId, InstallmentId, PaymentStatus};

/// one row of a contract's payment table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    #[serde(rename = "contratoId")]
    pub contract_id: ContractId,
    #[serde(rename = "indiceOrdenamiento")]
    pub sort_index: Decimal,
    #[serde(rename = "numeroCuotaTexto")]
    pub label: String,
    #[serde(rename = "concepto")]
    pub concept: String,
    #[serde(rename = "fechaVencimiento")]
    pub due_date: NaiveDate,
    #[serde(rename = "fechaPagoRealizado")]
    pub paid_date: Option<NaiveDate>,
    #[serde(rename = "valorCapital")]
    pub capital: Money,
    #[serde(rename = "valorInteres")]
    pub interest: Money,
    #[serde(rename = "valorCuotaTotal")]
    pub installment_total: Money,
    #[serde(rename = "valorMoraSugerido")]
    pub suggested_late_fee: Money,
    #[serde(rename = "valorMoraCobrado")]
    pub late_fee_charged: Money,
    #[serde(rename = "valorPagado")]
    pub amount_paid: Money,
    #[serde(rename = "saldoPendiente")]
    pub outstanding: Money,
    #[serde(rename = "diasMoraCalculados")]
    pub days_overdue: u32,
    #[serde(rename = "estadoPago")]
    pub status: PaymentStatus,
    #[serde(rename = "colorFila")]
    pub row_color: Option<String>,
    #[serde(rename = "observaciones")]
    pub notes: String,
}

/// inputs the row derivations need beyond the row itself
pub struct DerivationContext<'a> {
    /// the contract's daily late-fee rate
    pub daily_rate: Rate,
    /// reference date for unpaid rows
    pub today: NaiveDate,
    pub late_fees: &'a dyn LateFeePolicy,
    pub paid_tolerance: Money,
}

/// a single-cell edit
#[derive(Debug, Clone, PartialEq)]
pub enum InstallmentEdit {
    Concept(String),
    DueDate(NaiveDate),
    PaidDate(Option<NaiveDate>),
    Capital(Money),
    Interest(Money),
    LateFeeCharged(Money),
    AmountPaid(Money),
    RowColor(Option<String>),
    Notes(String),
}

impl InstallmentEdit {
    /// edits that move the row's money figures (and so the running balance)
    pub fn touches_money(&self) -> bool {
        matches!(
            self,
            InstallmentEdit::Capital(_)
                | InstallmentEdit::Interest(_)
                | InstallmentEdit::LateFeeCharged(_)
                | InstallmentEdit::AmountPaid(_)
        )
    }
}

/// classify a row from its outstanding balance and collected amount
pub fn classify_payment(outstanding: Money, amount_paid: Money, tolerance: Money) -> PaymentStatus {
    if outstanding <= tolerance {
        PaymentStatus::Pagado
    } else if amount_paid.is_positive() {
        PaymentStatus::Parcial
    } else {
        PaymentStatus::Pendiente
    }
}

impl Installment {
    /// create a pending row; money derivations are applied immediately,
    /// overdue fields start at zero
    pub fn new(
        contract_id: ContractId,
        sort_index: Decimal,
        label: String,
        concept: impl Into<String>,
        due_date: NaiveDate,
        capital: Money,
        interest: Money,
    ) -> Self {
        let mut installment = Self {
            id: Uuid::new_v4(),
            contract_id,
            sort_index,
            label,
            concept: concept.into(),
            due_date,
            paid_date: None,
            capital,
            interest,
            installment_total: Money::ZERO,
            suggested_late_fee: Money::ZERO,
            late_fee_charged: Money::ZERO,
            amount_paid: Money::ZERO,
            outstanding: Money::ZERO,
            days_overdue: 0,
            status: PaymentStatus::Pendiente,
            row_color: None,
            notes: String::new(),
        };
        installment.installment_total = installment.capital + installment.interest;
        installment.outstanding = installment.installment_total;
        installment
    }

    /// rows on a fractional key were inserted between scheduled installments
    pub fn is_additional(&self) -> bool {
        !ordering::is_integral(self.sort_index)
    }

    /// apply one edit and re-derive whatever depends on it
    pub fn apply_edit(&mut self, edit: InstallmentEdit, ctx: &DerivationContext<'_>) {
        match edit {
            InstallmentEdit::Concept(concept) => self.concept = concept,
            InstallmentEdit::Notes(notes) => self.notes = notes,
            InstallmentEdit::RowColor(color) => self.row_color = color,
            InstallmentEdit::DueDate(date) => {
                self.due_date = date;
                self.recompute_overdue(ctx);
            }
            InstallmentEdit::PaidDate(date) => {
                self.paid_date = date;
                self.recompute_overdue(ctx);
            }
            InstallmentEdit::Capital(amount) => {
                self.capital = amount;
                self.recompute_balances(ctx.paid_tolerance);
                // an installment-based fee follows the new total
                self.recompute_overdue(ctx);
            }
            InstallmentEdit::Interest(amount) => {
                self.interest = amount;
                self.recompute_balances(ctx.paid_tolerance);
                self.recompute_overdue(ctx);
            }
            InstallmentEdit::LateFeeCharged(amount) => {
                self.late_fee_charged = amount;
                self.recompute_balances(ctx.paid_tolerance);
            }
            InstallmentEdit::AmountPaid(amount) => {
                self.amount_paid = amount;
                self.recompute_balances(ctx.paid_tolerance);
            }
        }
    }

    /// days overdue and suggested fee. the charged fee is left alone
    pub fn recompute_overdue(&mut self, ctx: &DerivationContext<'_>) {
        self.days_overdue = days_overdue(self.due_date, self.paid_date, ctx.today);
        self.suggested_late_fee =
            ctx.late_fees
                .suggested_late_fee(self.days_overdue, ctx.daily_rate, self.installment_total);
    }

    /// installment total, outstanding balance and payment status
    pub fn recompute_balances(&mut self, paid_tolerance: Money) {
        self.installment_total = self.capital + self.interest;
        self.outstanding = self.capital + self.interest + self.late_fee_charged - self.amount_paid;
        self.status = classify_payment(self.outstanding, self.amount_paid, paid_tolerance);
    }

    /// recompute every derived field; true when the stored values were stale
    pub fn rederive(&mut self, ctx: &DerivationContext<'_>, additional_label: &str) -> bool {
        let before = self.clone();
        self.recompute_balances(ctx.paid_tolerance);
        self.recompute_overdue(ctx);
        self.label = ordering::label_for(self.sort_index, additional_label);
        *self != before
    }

    /// money invariants hold for the stored values
    pub fn is_consistent(&self) -> bool {
        self.installment_total == self.capital + self.interest
            && self.outstanding
                == self.capital + self.interest + self.late_fee_charged - self.amount_paid
    }

    /// one-click shortcut: charge the suggested late fee
    pub fn accept_suggested_late_fee(&mut self, paid_tolerance: Money) {
        self.late_fee_charged = self.suggested_late_fee;
        self.recompute_balances(paid_tolerance);
    }

    /// fields that differ from `before`, as a store patch
    pub fn diff(&self, before: &Installment) -> InstallmentPatch {
        fn changed<T: PartialEq + Clone>(now: &T, then: &T) -> Option<T> {
            (now != then).then(|| now.clone())
        }

        InstallmentPatch {
            sort_index: changed(&self.sort_index, &before.sort_index),
            label: changed(&self.label, &before.label),
            concept: changed(&self.concept, &before.concept),
            due_date: changed(&self.due_date, &before.due_date),
            paid_date: changed(&self.paid_date, &before.paid_date),
            capital: changed(&self.capital, &before.capital),
            interest: changed(&self.interest, &before.interest),
            installment_total: changed(&self.installment_total, &before.installment_total),
            suggested_late_fee: changed(&self.suggested_late_fee, &before.suggested_late_fee),
            late_fee_charged: changed(&self.late_fee_charged, &before.late_fee_charged),
            amount_paid: changed(&self.amount_paid, &before.amount_paid),
            outstanding: changed(&self.outstanding, &before.outstanding),
            days_overdue: changed(&self.days_overdue, &before.days_overdue),
            status: changed(&self.status, &before.status),
            row_color: changed(&self.row_color, &before.row_color),
            notes: changed(&self.notes, &before.notes),
        }
    }
}

/// partial update for a stored installment; `None` means unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstallmentPatch {
    #[serde(rename = "indiceOrdenamiento", skip_serializing_if = "Option::is_none")]
    pub sort_index: Option<Decimal>,
    #[serde(rename = "numeroCuotaTexto", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "concepto", skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    #[serde(rename = "fechaVencimiento", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "fechaPagoRealizado", skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<Option<NaiveDate>>,
    #[serde(rename = "valorCapital", skip_serializing_if = "Option::is_none")]
    pub capital: Option<Money>,
    #[serde(rename = "valorInteres", skip_serializing_if = "Option::is_none")]
    pub interest: Option<Money>,
    #[serde(rename = "valorCuotaTotal", skip_serializing_if = "Option::is_none")]
    pub installment_total: Option<Money>,
    #[serde(rename = "valorMoraSugerido", skip_serializing_if = "Option::is_none")]
    pub suggested_late_fee: Option<Money>,
    #[serde(rename = "valorMoraCobrado", skip_serializing_if = "Option::is_none")]
    pub late_fee_charged: Option<Money>,
    #[serde(rename = "valorPagado", skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<Money>,
    #[serde(rename = "saldoPendiente", skip_serializing_if = "Option::is_none")]
    pub outstanding: Option<Money>,
    #[serde(rename = "diasMoraCalculados", skip_serializing_if = "Option::is_none")]
    pub days_overdue: Option<u32>,
    #[serde(rename = "estadoPago", skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(rename = "colorFila", skip_serializing_if = "Option::is_none")]
    pub row_color: Option<Option<String>>,
    #[serde(rename = "observaciones", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl InstallmentPatch {
    pub fn is_empty(&self) -> bool {
        *self == InstallmentPatch::default()
    }

    /// names of the fields carried by this patch
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut push = |present: bool, name: &'static str| {
            if present {
                names.push(name);
            }
        };
        push(self.sort_index.is_some(), "sort_index");
        push(self.label.is_some(), "label");
        push(self.concept.is_some(), "concept");
        push(self.due_date.is_some(), "due_date");
        push(self.paid_date.is_some(), "paid_date");
        push(self.capital.is_some(), "capital");
        push(self.interest.is_some(), "interest");
        push(self.installment_total.is_some(), "installment_total");
        push(self.suggested_late_fee.is_some(), "suggested_late_fee");
        push(self.late_fee_charged.is_some(), "late_fee_charged");
        push(self.amount_paid.is_some(), "amount_paid");
        push(self.outstanding.is_some(), "outstanding");
        push(self.days_overdue.is_some(), "days_overdue");
        push(self.status.is_some(), "status");
        push(self.row_color.is_some(), "row_color");
        push(self.notes.is_some(), "notes");
        names
    }

    /// write the carried fields onto a stored record
    pub fn apply_to(&self, installment: &mut Installment) {
        if let Some(v) = self.sort_index {
            installment.sort_index = v;
        }
        if let Some(v) = &self.label {
            installment.label = v.clone();
        }
        if let Some(v) = &self.concept {
            installment.concept = v.clone();
        }
        if let Some(v) = self.due_date {
            installment.due_date = v;
        }
        if let Some(v) = self.paid_date {
            installment.paid_date = v;
        }
        if let Some(v) = self.capital {
            installment.capital = v;
        }
        if let Some(v) = self.interest {
            installment.interest = v;
        }
        if let Some(v) = self.installment_total {
            installment.installment_total = v;
        }
        if let Some(v) = self.suggested_late_fee {
            installment.suggested_late_fee = v;
        }
        if let Some(v) = self.late_fee_charged {
            installment.late_fee_charged = v;
        }
        if let Some(v) = self.amount_paid {
            installment.amount_paid = v;
        }
        if let Some(v) = self.outstanding {
            installment.outstanding = v;
        }
        if let Some(v) = self.days_overdue {
            installment.days_overdue = v;
        }
        if let Some(v) = self.status {
            installment.status = v;
        }
        if let Some(v) = &self.row_color {
            installment.row_color = v.clone();
        }
        if let Some(v) = &self.notes {
            installment.notes = v.clone();
        }
    }
}
