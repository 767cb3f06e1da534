use crate::domain::carry_over::{CarryOver, carry_over};
use crate::domain::models::{DailyProgress, ProgressStatus, Schedule};
use chrono::NaiveDate;

/// Writes and schedule change resulting from one status/notes edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub date: NaiveDate,
    pub progress: DailyProgress,
    pub carry_over: Option<CarryOver>,
}

/// Applies an edit to the entry at `index`. `None` keeps the previous value.
/// A transition into `Partial` carries the task over to the next study day.
pub fn apply_progress_update(
    schedule: &Schedule,
    index: usize,
    previous: &DailyProgress,
    status: Option<ProgressStatus>,
    notes: Option<String>,
) -> Result<ProgressUpdate, String> {
    let Some(entry) = schedule.get(index) else {
        return Err(format!("schedule entry not found: {index}"));
    };
    if entry.is_break {
        return Err(format!("break day has no progress: {}", entry.date_key()));
    }

    let progress = DailyProgress {
        status: status.unwrap_or(previous.status),
        notes: notes.unwrap_or_else(|| previous.notes.clone()),
    };
    let entered_partial =
        progress.status == ProgressStatus::Partial && previous.status != ProgressStatus::Partial;

    Ok(ProgressUpdate {
        date: entry.date,
        carry_over: if entered_partial {
            carry_over(schedule, index)
        } else {
            None
        },
        progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::carry_over::CARRY_OVER_NOTE;
    use crate::domain::models::{DATE_FORMAT, ScheduleEntry};

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, DATE_FORMAT).expect("valid date")
    }

    fn sample_schedule() -> Schedule {
        Schedule::new(
            2,
            vec![
                ScheduleEntry::revision(date("2025-11-05"), "Revision"),
                ScheduleEntry::break_day(date("2025-11-06")),
                ScheduleEntry::revision(date("2025-11-07"), "Revision"),
            ],
        )
    }

    #[test]
    fn notes_only_edit_keeps_status() {
        let previous = DailyProgress {
            status: ProgressStatus::Done,
            notes: "old".to_string(),
        };
        let update = apply_progress_update(
            &sample_schedule(),
            0,
            &previous,
            None,
            Some("new notes".to_string()),
        )
        .expect("update");

        assert_eq!(update.date, date("2025-11-05"));
        assert_eq!(update.progress.status, ProgressStatus::Done);
        assert_eq!(update.progress.notes, "new notes");
        assert!(update.carry_over.is_none());
    }

    #[test]
    fn entering_partial_triggers_carry_over() {
        let update = apply_progress_update(
            &sample_schedule(),
            0,
            &DailyProgress::default(),
            Some(ProgressStatus::Partial),
            None,
        )
        .expect("update");

        let carried = update.carry_over.expect("carry over");
        assert_eq!(carried.entry.date, date("2025-11-07"));
        assert_eq!(carried.progress.notes, CARRY_OVER_NOTE);
    }

    #[test]
    fn staying_partial_does_not_repeat_carry_over() {
        let previous = DailyProgress {
            status: ProgressStatus::Partial,
            notes: String::new(),
        };
        let update = apply_progress_update(
            &sample_schedule(),
            0,
            &previous,
            Some(ProgressStatus::Partial),
            Some("still going".to_string()),
        )
        .expect("update");
        assert!(update.carry_over.is_none());
    }

    #[test]
    fn break_and_missing_entries_are_rejected() {
        let schedule = sample_schedule();
        assert!(apply_progress_update(&schedule, 1, &DailyProgress::default(), None, None).is_err());
        assert!(apply_progress_update(&schedule, 9, &DailyProgress::default(), None, None).is_err());
    }
}
