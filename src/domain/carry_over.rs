use crate::domain::models::{DailyProgress, ProgressStatus, Schedule, ScheduleEntry};

pub const CARRY_OVER_NOTE: &str = "Carried over from previous day - Partial completion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarryOver {
    pub schedule: Schedule,
    pub inserted_at: usize,
    pub entry: ScheduleEntry,
    pub progress: DailyProgress,
}

/// Re-inserts the task at `index` ahead of the first non-break entry dated
/// after it, so repeated carry-overs move forward one study day at a time.
///
/// Returns `None` when the source is missing or a break day, or when no
/// study entry follows it on a later date.
pub fn carry_over(schedule: &Schedule, index: usize) -> Option<CarryOver> {
    let source = schedule.get(index).filter(|entry| !entry.is_break)?;
    let (target_index, target) = schedule
        .entries()
        .iter()
        .enumerate()
        .skip(index + 1)
        .find(|(_, entry)| !entry.is_break && entry.date > source.date)?;

    let entry = source.carried_over_to(target.date);
    Some(CarryOver {
        schedule: schedule.with_inserted(target_index, entry.clone()),
        inserted_at: target_index,
        entry,
        progress: DailyProgress {
            status: ProgressStatus::NotDone,
            notes: CARRY_OVER_NOTE.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DATE_FORMAT, Portion, Segment};
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, DATE_FORMAT).expect("valid date")
    }

    fn study(day: &str, subject: u32) -> ScheduleEntry {
        ScheduleEntry::study(
            date(day),
            &Segment {
                subject,
                unit: 1,
                part: "2-mark Qs (10)".to_string(),
                portion: Portion::Midterm,
            },
        )
    }

    fn sample_schedule() -> Schedule {
        Schedule::new(
            1,
            vec![
                study("2025-08-01", 1),
                ScheduleEntry::break_day(date("2025-08-02")),
                ScheduleEntry::break_day(date("2025-08-03")),
                study("2025-08-04", 2),
                study("2025-08-05", 3),
            ],
        )
    }

    #[test]
    fn carry_over_skips_break_days() {
        let schedule = sample_schedule();
        let result = carry_over(&schedule, 0).expect("carry over");

        assert_eq!(result.inserted_at, 3);
        assert_eq!(result.entry.date, date("2025-08-04"));
        assert_eq!(result.entry.subject, schedule.entries()[0].subject);
        assert!(
            result
                .entry
                .part
                .as_deref()
                .is_some_and(|part| part.ends_with("(Carried over)"))
        );
        assert_eq!(result.schedule.len(), schedule.len() + 1);
        assert_eq!(result.schedule.entries()[3], result.entry);
        assert_eq!(result.schedule.entries()[4], schedule.entries()[3]);
        assert_eq!(result.progress.status, ProgressStatus::NotDone);
        assert_eq!(result.progress.notes, CARRY_OVER_NOTE);
        assert!(result.schedule.is_date_ordered());
        assert_eq!(result.schedule.generation(), schedule.generation() + 1);
    }

    #[test]
    fn carry_over_at_end_of_schedule_is_noop() {
        let schedule = sample_schedule();
        assert!(carry_over(&schedule, 4).is_none());
    }

    #[test]
    fn carry_over_with_only_breaks_after_is_noop() {
        let schedule = Schedule::new(
            0,
            vec![
                study("2025-08-01", 1),
                ScheduleEntry::break_day(date("2025-08-02")),
            ],
        );
        assert!(carry_over(&schedule, 0).is_none());
    }

    #[test]
    fn carry_over_from_last_study_date_is_noop() {
        let schedule = sample_schedule();
        let first = carry_over(&schedule, 3).expect("carry over");
        assert_eq!(first.entry.date, date("2025-08-05"));
        assert!(carry_over(&first.schedule, first.inserted_at).is_none());
    }

    #[test]
    fn break_entries_and_missing_indices_are_ignored() {
        let schedule = sample_schedule();
        assert!(carry_over(&schedule, 1).is_none());
        assert!(carry_over(&schedule, 42).is_none());
    }

    #[test]
    fn chained_carry_over_moves_forward() {
        let schedule = sample_schedule();
        let first = carry_over(&schedule, 0).expect("first carry over");
        let second = carry_over(&first.schedule, first.inserted_at).expect("second carry over");

        assert_eq!(first.entry.date, date("2025-08-04"));
        assert_eq!(second.inserted_at, first.inserted_at + 2);
        assert_eq!(second.entry.date, date("2025-08-05"));
        assert_eq!(second.schedule.entries()[4], schedule.entries()[3]);
        assert!(second.schedule.is_date_ordered());
        assert_eq!(
            second.entry.part.as_deref(),
            Some("2-mark Qs (10) (Carried over) (Carried over)")
        );
        assert_eq!(second.schedule.len(), schedule.len() + 2);
    }

    proptest! {
        #[test]
        fn carry_over_preserves_other_entries(
            kinds in proptest::collection::vec(any::<bool>(), 1..30),
            pick in 0usize..30
        ) {
            let base = date("2025-08-01");
            let entries = kinds
                .iter()
                .enumerate()
                .map(|(offset, is_break)| {
                    let day = base + Duration::days(offset as i64);
                    if *is_break {
                        ScheduleEntry::break_day(day)
                    } else {
                        study(&day.format(DATE_FORMAT).to_string(), offset as u32 + 1)
                    }
                })
                .collect::<Vec<_>>();
            let schedule = Schedule::new(0, entries);
            let index = pick % schedule.len();

            if let Some(result) = carry_over(&schedule, index) {
                prop_assert_eq!(result.schedule.len(), schedule.len() + 1);
                prop_assert!(result.schedule.is_date_ordered());
                prop_assert!(result.entry.date > schedule.entries()[index].date);

                let mut without = result.schedule.entries().to_vec();
                without.remove(result.inserted_at);
                prop_assert_eq!(without.as_slice(), schedule.entries());
            }
        }
    }
}
