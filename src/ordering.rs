//! Fractional ordering keys for installment rows.
//!
//! Scheduled installments sit on integer keys; rows inserted between two of them
//! take the midpoint of their neighbours, so nothing else has to be renumbered.
//! Keys are exact decimals, which gives roughly 90 successive halvings between
//! the same two neighbours before `IndexExhausted` is returned. `compact` turns
//! every key back into a consecutive integer when that happens.

use rust_decimal::Decimal;

use crate::errors::{LedgerError, Result};
use crate::installment::Installment;
use crate::types::InstallmentId;

/// integer keys are regular scheduled installments
pub fn is_integral(index: Decimal) -> bool {
    index.fract().is_zero()
}

/// key for a row appended after every existing row
pub fn append_index<I>(existing: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    existing
        .into_iter()
        .max()
        .map(|max| max.floor() + Decimal::ONE)
        .unwrap_or(Decimal::ONE)
}

/// key for a row inserted right after `after`
pub fn insert_after_index<I>(after: Decimal, existing: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    let next = existing.into_iter().filter(|index| *index > after).min();

    match next {
        Some(next) => {
            let midpoint = (after + next) / Decimal::TWO;
            if midpoint <= after || midpoint >= next {
                return Err(LedgerError::IndexExhausted {
                    lower: after,
                    upper: next,
                });
            }
            Ok(midpoint.normalize())
        }
        None => Ok(after.floor() + Decimal::ONE),
    }
}

/// label shown in the installment number column
pub fn label_for(index: Decimal, additional_label: &str) -> String {
    if is_integral(index) {
        index.trunc().normalize().to_string()
    } else {
        additional_label.to_string()
    }
}

/// renumber rows to 1..=n in their current order; returns the rows whose key changed
pub fn compact(installments: &mut [Installment], additional_label: &str) -> Vec<InstallmentId> {
    installments.sort_by(|a, b| a.sort_index.cmp(&b.sort_index));

    let mut changed = Vec::new();
    for (position, installment) in installments.iter_mut().enumerate() {
        let index = Decimal::from(position as u64 + 1);
        if installment.sort_index != index {
            installment.sort_index = index;
            installment.label = label_for(index, additional_label);
            changed.push(installment.id);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_append_to_empty() {
        assert_eq!(append_index(Vec::new()), dec!(1));
    }

    #[test]
    fn test_append_after_additional_row() {
        assert_eq!(append_index(vec![dec!(1), dec!(2), dec!(2.5)]), dec!(3));
        assert_eq!(append_index(vec![dec!(1), dec!(7)]), dec!(8));
    }

    #[test]
    fn test_insert_between_neighbours() {
        let existing = vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)];
        let index = insert_after_index(dec!(3), existing).unwrap();

        assert_eq!(index, dec!(3.5));
        assert!(!is_integral(index));
        assert!(dec!(3) < index && index < dec!(4));
        assert_eq!(label_for(index, "Adic."), "Adic.");
    }

    #[test]
    fn test_insert_after_last_row() {
        let index = insert_after_index(dec!(4), vec![dec!(1), dec!(4)]).unwrap();
        assert_eq!(index, dec!(5));

        let index = insert_after_index(dec!(4.5), vec![dec!(4), dec!(4.5)]).unwrap();
        assert_eq!(index, dec!(5));
    }

    #[test]
    fn test_repeated_midpoints_eventually_exhaust() {
        let mut existing = vec![dec!(3), dec!(4)];
        let mut after = dec!(3);
        let mut inserted = 0;
        loop {
            match insert_after_index(after, existing.clone()) {
                Ok(index) => {
                    assert!(index > after);
                    existing.push(index);
                    after = index;
                    inserted += 1;
                }
                Err(LedgerError::IndexExhausted { .. }) => break,
                Err(other) => panic!("unexpected error: {other}"),
            }
            assert!(inserted < 500, "midpoints never ran out");
        }
        assert!(inserted > 50);
    }

    #[test]
    fn test_integer_labels() {
        assert_eq!(label_for(dec!(12), "Adic."), "12");
        assert_eq!(label_for(dec!(3.0), "Adic."), "3");
    }

    #[test]
    fn test_compact_preserves_order() {
        let contract_id = Uuid::new_v4();
        let due = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let make = |index: Decimal| {
            Installment::new(contract_id, index, label_for(index, "Adic."), "", due, Money::ZERO, Money::ZERO)
        };

        let mut rows = vec![make(dec!(2)), make(dec!(1)), make(dec!(1.5)), make(dec!(3))];
        let moved = rows[2].id;

        let changed = compact(&mut rows, "Adic.");

        let indices: Vec<Decimal> = rows.iter().map(|r| r.sort_index).collect();
        assert_eq!(indices, vec![dec!(1), dec!(2), dec!(3), dec!(4)]);
        assert_eq!(rows[1].id, moved);
        assert_eq!(rows[1].label, "2");
        assert_eq!(changed.len(), 3);
    }
}
