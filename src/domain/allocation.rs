use crate::domain::calendar::DayBuckets;
use crate::domain::models::{BreakDaySet, ScheduleEntry, Segment};
use crate::domain::segments::SegmentPlan;
use chrono::NaiveDate;
use serde::Serialize;

/// Work that did not fit the available days, or days that received no work.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationReport {
    pub unplaced_midterm: usize,
    pub unplaced_final: usize,
    pub unfilled_days: Vec<NaiveDate>,
}

impl AllocationReport {
    pub fn is_balanced(&self) -> bool {
        self.unplaced_midterm == 0 && self.unplaced_final == 0 && self.unfilled_days.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub entries: Vec<ScheduleEntry>,
    pub report: AllocationReport,
}

/// Assigns segments to days positionally and fills the days after the final
/// exam with revision entries. Output is sorted by date.
pub fn allocate(
    buckets: &DayBuckets,
    plan: &SegmentPlan,
    break_days: &BreakDaySet,
    revision_label: &str,
) -> Allocation {
    let mut entries = Vec::with_capacity(
        break_days.len()
            + buckets.pre_midterm.len()
            + buckets.pre_final.len()
            + buckets.post_final.len(),
    );
    let mut report = AllocationReport::default();

    entries.extend(break_days.iter().copied().map(ScheduleEntry::break_day));

    report.unplaced_midterm = zip_portion(
        &buckets.pre_midterm,
        &plan.midterm_segments,
        &mut entries,
        &mut report.unfilled_days,
    );
    report.unplaced_final = zip_portion(
        &buckets.pre_final,
        &plan.final_segments,
        &mut entries,
        &mut report.unfilled_days,
    );

    entries.extend(
        buckets
            .post_final
            .iter()
            .map(|day| ScheduleEntry::revision(*day, revision_label)),
    );

    entries.sort_by_key(|entry| entry.date);
    Allocation { entries, report }
}

fn zip_portion(
    days: &[NaiveDate],
    segments: &[Segment],
    entries: &mut Vec<ScheduleEntry>,
    unfilled_days: &mut Vec<NaiveDate>,
) -> usize {
    entries.extend(
        days.iter()
            .zip(segments)
            .map(|(day, segment)| ScheduleEntry::study(*day, segment)),
    );
    if days.len() > segments.len() {
        unfilled_days.extend_from_slice(&days[segments.len()..]);
    }
    segments.len().saturating_sub(days.len())
}
