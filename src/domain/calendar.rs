use crate::domain::models::{BreakDaySet, DateRange, SemesterCalendar};
use chrono::NaiveDate;

/// Available study days grouped by the exam they lead up to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayBuckets {
    pub pre_midterm: Vec<NaiveDate>,
    pub pre_final: Vec<NaiveDate>,
    pub post_final: Vec<NaiveDate>,
}

/// Every day from `start` to `end` inclusive that falls outside all blackout ranges.
pub fn study_days(start: NaiveDate, end: NaiveDate, blackouts: &[DateRange]) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !blackouts.iter().any(|range| range.contains(*day)))
        .collect()
}

pub fn semester_study_days(calendar: &SemesterCalendar) -> Vec<NaiveDate> {
    study_days(
        calendar.semester_start,
        calendar.semester_end,
        &calendar.blackouts(),
    )
}

/// Removes break days and splits the remaining days around the two exam windows.
pub fn partition_days(
    calendar: &SemesterCalendar,
    days: &[NaiveDate],
    break_days: &BreakDaySet,
) -> DayBuckets {
    let mut buckets = DayBuckets::default();
    for day in days.iter().copied().filter(|day| !break_days.contains(day)) {
        if day < calendar.midterm_exam.start {
            buckets.pre_midterm.push(day);
        } else if day > calendar.midterm_exam.end && day < calendar.final_exam.start {
            buckets.pre_final.push(day);
        } else if day > calendar.final_exam.end {
            buckets.post_final.push(day);
        }
    }
    buckets
}
