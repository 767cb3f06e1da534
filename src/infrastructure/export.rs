use crate::domain::models::{DailyProgress, ScheduleEntry};
use crate::infrastructure::error::InfraError;
use chrono::NaiveDate;

pub const CSV_HEADER: [&str; 7] = [
    "Date",
    "Subject",
    "Unit",
    "Part/Action",
    "Portion",
    "Status",
    "Notes",
];
pub const BREAK_DAY_MARKER: &str = "Break Day";
const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Flat, display-ready form of one schedule entry joined with its progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub date: NaiveDate,
    pub subject: String,
    pub unit: String,
    pub part: String,
    pub portion: String,
    pub status: String,
    pub notes: String,
    pub is_break: bool,
}

impl ExportRow {
    pub fn from_entry(entry: &ScheduleEntry, progress: &DailyProgress) -> Self {
        if entry.is_break {
            return Self {
                date: entry.date,
                subject: String::new(),
                unit: String::new(),
                part: BREAK_DAY_MARKER.to_string(),
                portion: String::new(),
                status: String::new(),
                notes: String::new(),
                is_break: true,
            };
        }

        Self {
            date: entry.date,
            subject: entry.subject.map(|value| value.to_string()).unwrap_or_default(),
            unit: entry.unit.map(|value| value.to_string()).unwrap_or_default(),
            part: entry.part.clone().unwrap_or_default(),
            portion: entry
                .portion
                .map(|portion| portion.label().to_string())
                .unwrap_or_default(),
            status: progress.status.as_str().to_string(),
            notes: progress.notes.clone(),
            is_break: false,
        }
    }
}

pub fn export_rows<F>(entries: &[ScheduleEntry], mut progress_for: F) -> Vec<ExportRow>
where
    F: FnMut(NaiveDate) -> DailyProgress,
{
    entries
        .iter()
        .map(|entry| {
            let progress = if entry.is_break {
                DailyProgress::default()
            } else {
                progress_for(entry.date)
            };
            ExportRow::from_entry(entry, &progress)
        })
        .collect()
}

pub fn write_csv(rows: &[ExportRow]) -> Result<String, InfraError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        let date = row.date.format(DISPLAY_DATE_FORMAT).to_string();
        writer.write_record([
            date.as_str(),
            row.subject.as_str(),
            row.unit.as_str(),
            row.part.as_str(),
            row.portion.as_str(),
            row.status.as_str(),
            row.notes.as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|error| InfraError::Io(error.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|error| InfraError::InvalidInput(format!("csv output is not UTF-8: {error}")))
}

pub fn parse_csv(raw: &str) -> Result<Vec<ExportRow>, InfraError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(raw.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |index: usize| record.get(index).unwrap_or_default().to_string();
        let date_raw = field(0);
        let date = NaiveDate::parse_from_str(date_raw.trim(), DISPLAY_DATE_FORMAT)
            .map_err(|error| InfraError::InvalidInput(format!("invalid csv date '{date_raw}': {error}")))?;
        let subject = field(1);
        let part = field(3);
        rows.push(ExportRow {
            date,
            is_break: subject.is_empty() && part == BREAK_DAY_MARKER,
            subject,
            unit: field(2),
            part,
            portion: field(4),
            status: field(5),
            notes: field(6),
        });
    }
    Ok(rows)
}

/// Line-per-entry text used by the printable report.
pub fn render_report(user: &str, rows: &[ExportRow]) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format!("Study Plan for {user}"));
    for row in rows {
        let date = row.date.format(DISPLAY_DATE_FORMAT);
        if row.is_break {
            lines.push(format!("{date}: {BREAK_DAY_MARKER} - Recharge!"));
            continue;
        }
        let status = if row.status.is_empty() { "N/A" } else { &row.status };
        let mut line = format!(
            "{date}: Subject {}, Unit {}, {} ({}), Status: {status}",
            row.subject, row.unit, row.part, row.portion
        );
        if !row.notes.is_empty() {
            line.push_str(&format!(", Notes: {}", row.notes));
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DATE_FORMAT, Portion, ProgressStatus, Segment};

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, DATE_FORMAT).expect("valid date")
    }

    fn sample_entries() -> Vec<ScheduleEntry> {
        vec![
            ScheduleEntry::study(
                date("2025-08-01"),
                &Segment {
                    subject: 1,
                    unit: 2,
                    part: "13-mark Qs (5), long form".to_string(),
                    portion: Portion::Midterm,
                },
            ),
            ScheduleEntry::break_day(date("2025-08-02")),
            ScheduleEntry::revision(date("2025-11-05"), "Revision / Buffer Day"),
        ]
    }

    fn progress_for(day: NaiveDate) -> DailyProgress {
        if day == date("2025-08-01") {
            DailyProgress {
                status: ProgressStatus::Partial,
                notes: "said \"half done\", resume tomorrow".to_string(),
            }
        } else {
            DailyProgress::default()
        }
    }

    #[test]
    fn csv_roundtrip_preserves_rows() {
        let rows = export_rows(&sample_entries(), progress_for);
        let raw = write_csv(&rows).expect("write csv");

        assert!(raw.starts_with("Date,Subject,Unit,Part/Action,Portion,Status,Notes\n"));
        assert!(raw.contains("01/08/2025"));

        let parsed = parse_csv(&raw).expect("parse csv");
        assert_eq!(parsed, rows);
    }

    #[test]
    fn break_rows_use_marker() {
        let rows = export_rows(&sample_entries(), progress_for);
        assert!(rows[1].is_break);
        assert_eq!(rows[1].part, BREAK_DAY_MARKER);
        assert_eq!(rows[1].status, "");
        assert_eq!(rows[2].subject, "-");
        assert_eq!(rows[2].portion, "Revision");
        assert_eq!(rows[2].status, "not-done");
    }

    #[test]
    fn report_renders_one_line_per_entry() {
        let rows = export_rows(&sample_entries(), progress_for);
        let lines = render_report("student1", &rows);

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Study Plan for student1");
        assert_eq!(
            lines[1],
            "01/08/2025: Subject 1, Unit 2, 13-mark Qs (5), long form (Midterm), Status: partial, Notes: said \"half done\", resume tomorrow"
        );
        assert_eq!(lines[2], "02/08/2025: Break Day - Recharge!");
        assert_eq!(
            lines[3],
            "05/11/2025: Subject -, Unit -, Revision / Buffer Day (Revision), Status: not-done"
        );
    }

    #[test]
    fn parse_rejects_bad_dates() {
        let raw = "Date,Subject,Unit,Part/Action,Portion,Status,Notes\n2025-08-01,1,1,x,Midterm,done,\n";
        assert!(matches!(parse_csv(raw), Err(InfraError::InvalidInput(_))));
    }
}
