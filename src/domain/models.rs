use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const UNASSIGNED_MARKER: &str = "-";
pub const CARRIED_OVER_SUFFIX: &str = " (Carried over)";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Portion {
    Midterm,
    Final,
    Revision,
}

impl Portion {
    pub fn label(self) -> &'static str {
        match self {
            Self::Midterm => "Midterm",
            Self::Final => "Final",
            Self::Revision => "Revision",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "midterm" => Some(Self::Midterm),
            "final" => Some(Self::Final),
            "revision" => Some(Self::Revision),
            _ => None,
        }
    }
}

/// Subject or unit reference of a schedule entry. Revision entries carry the
/// `-` marker instead of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskRef {
    Index(u32),
    Unassigned,
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(value) => write!(f, "{value}"),
            Self::Unassigned => f.write_str(UNASSIGNED_MARKER),
        }
    }
}

impl FromStr for TaskRef {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value == UNASSIGNED_MARKER {
            return Ok(Self::Unassigned);
        }
        value
            .parse::<u32>()
            .ok()
            .filter(|index| *index > 0)
            .map(Self::Index)
            .ok_or_else(|| format!("task reference must be a positive integer or '-': {value}"))
    }
}

impl Serialize for TaskRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Index(value) => serializer.serialize_u32(*value),
            Self::Unassigned => serializer.serialize_str(UNASSIGNED_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for TaskRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) if value > 0 => Ok(Self::Index(value)),
            Raw::Number(value) => Err(serde::de::Error::custom(format!(
                "task reference must be positive: {value}"
            ))),
            Raw::Text(value) => value.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub subject: u32,
    pub unit: u32,
    pub part: String,
    pub portion: Portion,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    pub subject: Option<TaskRef>,
    pub unit: Option<TaskRef>,
    pub part: Option<String>,
    pub portion: Option<Portion>,
    pub is_break: bool,
}

impl ScheduleEntry {
    pub fn study(date: NaiveDate, segment: &Segment) -> Self {
        Self {
            date,
            subject: Some(TaskRef::Index(segment.subject)),
            unit: Some(TaskRef::Index(segment.unit)),
            part: Some(segment.part.clone()),
            portion: Some(segment.portion),
            is_break: false,
        }
    }

    pub fn revision(date: NaiveDate, label: &str) -> Self {
        Self {
            date,
            subject: Some(TaskRef::Unassigned),
            unit: Some(TaskRef::Unassigned),
            part: Some(label.to_string()),
            portion: Some(Portion::Revision),
            is_break: false,
        }
    }

    pub fn break_day(date: NaiveDate) -> Self {
        Self {
            date,
            subject: None,
            unit: None,
            part: None,
            portion: None,
            is_break: true,
        }
    }

    /// Copy of this task moved to `date`, marked as carried over.
    pub fn carried_over_to(&self, date: NaiveDate) -> Self {
        let part = self.part.as_deref().unwrap_or_default();
        Self {
            date,
            subject: self.subject,
            unit: self.unit,
            part: Some(format!("{part}{CARRIED_OVER_SUFFIX}")),
            portion: self.portion,
            is_break: false,
        }
    }

    pub fn is_revision(&self) -> bool {
        !self.is_break && self.portion == Some(Portion::Revision)
    }

    pub fn date_key(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.is_break {
            if self.subject.is_some() || self.unit.is_some() || self.part.is_some() {
                return Err("break entry must not carry subject, unit or part".to_string());
            }
            return Ok(());
        }
        if self.subject.is_none() || self.unit.is_none() {
            return Err("entry.subject and entry.unit are required".to_string());
        }
        validate_non_empty(self.part.as_deref().unwrap_or_default(), "entry.part")
    }
}

/// Ordered plan snapshot. Mutations produce a new snapshot with a higher
/// generation and leave readers of the previous one untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    generation: u64,
    entries: Arc<[ScheduleEntry]>,
}

impl Schedule {
    pub fn new(generation: u64, entries: Vec<ScheduleEntry>) -> Self {
        Self {
            generation,
            entries: entries.into(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ScheduleEntry> {
        self.entries.get(index)
    }

    pub fn with_inserted(&self, index: usize, entry: ScheduleEntry) -> Self {
        let mut entries = self.entries.to_vec();
        entries.insert(index.min(entries.len()), entry);
        Self::new(self.generation + 1, entries)
    }

    pub fn is_date_ordered(&self) -> bool {
        self.entries
            .windows(2)
            .all(|pair| pair[0].date <= pair[1].date)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ProgressStatus {
    #[default]
    #[serde(rename = "not-done")]
    NotDone,
    #[serde(rename = "done")]
    Done,
    #[serde(rename = "partial")]
    Partial,
}

impl ProgressStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotDone => "not-done",
            Self::Done => "done",
            Self::Partial => "partial",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not-done" | "not_done" | "notdone" => Some(Self::NotDone),
            "done" => Some(Self::Done),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DailyProgress {
    #[serde(default)]
    pub status: ProgressStatus,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakDaySet {
    dates: BTreeSet<NaiveDate>,
}

impl BreakDaySet {
    /// Builds a set from already persisted dates without re-checking the monthly cap.
    pub fn from_stored(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.dates.contains(date)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.dates.iter()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn to_date_strings(&self) -> Vec<String> {
        self.dates
            .iter()
            .map(|date| date.format(DATE_FORMAT).to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn validate(&self, field_name: &str) -> Result<(), String> {
        if self.end < self.start {
            return Err(format!("{field_name}.end must not be before {field_name}.start"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SemesterCalendar {
    pub semester_start: NaiveDate,
    pub semester_end: NaiveDate,
    pub midterm_exam: DateRange,
    pub final_exam: DateRange,
}

impl SemesterCalendar {
    pub fn validate(&self) -> Result<(), String> {
        self.midterm_exam.validate("semester.midterm_exam")?;
        self.final_exam.validate("semester.final_exam")?;
        if self.final_exam.start <= self.midterm_exam.end {
            return Err("semester.final_exam must start after semester.midterm_exam ends".to_string());
        }
        Ok(())
    }

    pub fn blackouts(&self) -> [DateRange; 2] {
        [self.midterm_exam, self.final_exam]
    }
}

impl Default for SemesterCalendar {
    fn default() -> Self {
        Self {
            semester_start: fixed_date(2025, 8, 1),
            semester_end: fixed_date(2025, 12, 10),
            midterm_exam: DateRange {
                start: fixed_date(2025, 8, 20),
                end: fixed_date(2025, 8, 27),
            },
            final_exam: DateRange {
                start: fixed_date(2025, 10, 28),
                end: fixed_date(2025, 11, 4),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitRange {
    pub first: u32,
    pub last: u32,
}

impl UnitRange {
    pub fn units(&self) -> std::ops::RangeInclusive<u32> {
        self.first..=self.last
    }

    pub fn count(&self) -> usize {
        self.units().count()
    }

    fn validate(&self, field_name: &str) -> Result<(), String> {
        if self.first == 0 {
            return Err(format!("{field_name}.first must be >= 1"));
        }
        if self.last < self.first {
            return Err(format!("{field_name}.last must be >= {field_name}.first"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanBlueprint {
    pub part_labels: Vec<String>,
    pub midterm_units: UnitRange,
    pub final_units: UnitRange,
    pub revision_label: String,
    pub max_break_days_per_month: usize,
    #[serde(default = "default_max_subjects")]
    pub max_subjects: u32,
}

fn default_max_subjects() -> u32 {
    100
}

impl PlanBlueprint {
    pub fn validate(&self) -> Result<(), String> {
        if self.part_labels.is_empty() {
            return Err("blueprint.part_labels must not be empty".to_string());
        }
        for label in &self.part_labels {
            validate_non_empty(label, "blueprint.part_labels[]")?;
        }
        self.midterm_units.validate("blueprint.midterm_units")?;
        self.final_units.validate("blueprint.final_units")?;
        validate_non_empty(&self.revision_label, "blueprint.revision_label")?;
        if self.max_break_days_per_month == 0 {
            return Err("blueprint.max_break_days_per_month must be > 0".to_string());
        }
        if self.max_subjects == 0 {
            return Err("blueprint.max_subjects must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for PlanBlueprint {
    fn default() -> Self {
        Self {
            part_labels: vec![
                "2-mark Qs (10)".to_string(),
                "13-mark Qs (5)".to_string(),
                "15-mark Q (1)".to_string(),
            ],
            midterm_units: UnitRange { first: 1, last: 3 },
            final_units: UnitRange { first: 4, last: 5 },
            revision_label: "Revision / Buffer Day".to_string(),
            max_break_days_per_month: 2,
            max_subjects: default_max_subjects(),
        }
    }
}

pub fn parse_date(value: &str, field_name: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn fixed_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}
