use crate::domain::models::{BreakDaySet, parse_date};
use chrono::Datelike;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BreakDayError {
    #[error("invalid break day: {0}")]
    InvalidDate(String),
    #[error("You can select maximum {limit} break days per month ({month} has {count})")]
    MonthlyLimitExceeded {
        month: String,
        count: usize,
        limit: usize,
    },
}

/// Accepts the candidate dates only if no calendar month holds more than
/// `max_per_month` of them.
pub fn validate_break_days<S: AsRef<str>>(
    candidates: &[S],
    max_per_month: usize,
) -> Result<BreakDaySet, BreakDayError> {
    let dates = candidates
        .iter()
        .map(|candidate| {
            let candidate = candidate.as_ref();
            parse_date(candidate, "break_day")
                .map_err(|_| BreakDayError::InvalidDate(candidate.trim().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let set = BreakDaySet::from_stored(dates);

    let mut per_month: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for date in set.iter() {
        *per_month.entry((date.year(), date.month())).or_default() += 1;
    }
    if let Some(((year, month), count)) = per_month
        .into_iter()
        .find(|(_, count)| *count > max_per_month)
    {
        return Err(BreakDayError::MonthlyLimitExceeded {
            month: format!("{year:04}-{month:02}"),
            count,
            limit: max_per_month,
        });
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    #[test]
    fn empty_selection_is_accepted() {
        let set = validate_break_days::<&str>(&[], 2).expect("empty set accepted");
        assert!(set.is_empty());
    }

    #[test]
    fn two_per_month_is_accepted() {
        let set = validate_break_days(&["2025-08-02", "2025-08-30", "2025-09-01"], 2)
            .expect("within cap");
        assert_eq!(set.len(), 3);
        assert_eq!(
            set.to_date_strings(),
            vec!["2025-08-02", "2025-08-30", "2025-09-01"]
        );
    }

    #[test]
    fn third_day_in_a_month_is_rejected() {
        let result = validate_break_days(&["2025-10-01", "2025-10-15", "2025-10-31"], 2);
        assert_eq!(
            result,
            Err(BreakDayError::MonthlyLimitExceeded {
                month: "2025-10".to_string(),
                count: 3,
                limit: 2,
            })
        );
    }

    #[test]
    fn same_month_in_different_years_counts_separately() {
        let result = validate_break_days(
            &["2025-01-01", "2025-01-02", "2026-01-01", "2026-01-02"],
            2,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn malformed_date_is_rejected() {
        let result = validate_break_days(&["2025-13-01"], 2);
        assert_eq!(result, Err(BreakDayError::InvalidDate("2025-13-01".to_string())));
    }

    proptest! {
        #[test]
        fn cap_is_enforced_for_any_selection(offsets in proptest::collection::btree_set(0i64..120, 0..12)) {
            let base = NaiveDate::from_ymd_opt(2025, 8, 1).expect("valid date");
            let dates = offsets
                .iter()
                .map(|offset| (base + Duration::days(*offset)).format("%Y-%m-%d").to_string())
                .collect::<Vec<_>>();

            let mut per_month = BTreeMap::new();
            for date in &dates {
                *per_month.entry(date[..7].to_string()).or_insert(0usize) += 1;
            }
            let within_cap = per_month.values().all(|count| *count <= 2);

            prop_assert_eq!(validate_break_days(&dates, 2).is_ok(), within_cap);
        }
    }
}
