use crate::domain::models::{BreakDaySet, DailyProgress, DATE_FORMAT};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::KeyValueStore;
use chrono::NaiveDate;
use std::sync::Arc;

fn break_days_key(user: &str) -> String {
    format!("breakDays_{user}")
}

fn progress_key(user: &str, date: NaiveDate) -> String {
    format!("studyprogress_{user}_{}", date.format(DATE_FORMAT))
}

/// Per-user break days and daily progress. Unreadable values fall back to defaults.
#[derive(Clone)]
pub struct ProgressRepository {
    store: Arc<dyn KeyValueStore>,
}

impl ProgressRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load_break_days(&self, user: &str) -> Result<BreakDaySet, InfraError> {
        let Some(raw) = self.store.get(&break_days_key(user))? else {
            return Ok(BreakDaySet::default());
        };
        let Ok(values) = serde_json::from_str::<Vec<String>>(&raw) else {
            return Ok(BreakDaySet::default());
        };
        Ok(BreakDaySet::from_stored(values.iter().filter_map(|value| {
            NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
        })))
    }

    pub fn save_break_days(&self, user: &str, break_days: &BreakDaySet) -> Result<(), InfraError> {
        let payload = serde_json::to_string(&break_days.to_date_strings())?;
        self.store.set(&break_days_key(user), &payload)
    }

    pub fn load_progress(&self, user: &str, date: NaiveDate) -> Result<DailyProgress, InfraError> {
        Ok(self
            .store
            .get(&progress_key(user, date))?
            .and_then(|raw| serde_json::from_str::<DailyProgress>(&raw).ok())
            .unwrap_or_default())
    }

    pub fn save_progress(
        &self,
        user: &str,
        date: NaiveDate,
        progress: &DailyProgress,
    ) -> Result<(), InfraError> {
        let payload = serde_json::to_string(progress)?;
        self.store.set(&progress_key(user, date), &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ProgressStatus;
    use crate::infrastructure::kv_store::InMemoryKeyValueStore;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, DATE_FORMAT).expect("valid date")
    }

    fn repository() -> (Arc<InMemoryKeyValueStore>, ProgressRepository) {
        let store = Arc::new(InMemoryKeyValueStore::default());
        let repository = ProgressRepository::new(store.clone());
        (store, repository)
    }

    #[test]
    fn progress_defaults_when_absent() {
        let (_, repository) = repository();
        let progress = repository
            .load_progress("student1", date("2025-08-01"))
            .expect("load progress");
        assert_eq!(progress, DailyProgress::default());
    }

    #[test]
    fn progress_roundtrips_under_legacy_key() {
        let (store, repository) = repository();
        let progress = DailyProgress {
            status: ProgressStatus::Done,
            notes: "finished unit 1".to_string(),
        };
        repository
            .save_progress("student1", date("2025-08-01"), &progress)
            .expect("save progress");

        assert_eq!(
            store
                .get("studyprogress_student1_2025-08-01")
                .expect("raw value"),
            Some(r#"{"status":"done","notes":"finished unit 1"}"#.to_string())
        );
        assert_eq!(
            repository
                .load_progress("student1", date("2025-08-01"))
                .expect("load progress"),
            progress
        );
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        let (store, repository) = repository();
        store
            .set("studyprogress_student1_2025-08-01", "{not json")
            .expect("seed progress");
        store.set("breakDays_student1", "oops").expect("seed break days");

        assert_eq!(
            repository
                .load_progress("student1", date("2025-08-01"))
                .expect("load progress"),
            DailyProgress::default()
        );
        assert!(
            repository
                .load_break_days("student1")
                .expect("load break days")
                .is_empty()
        );
    }

    #[test]
    fn break_days_are_stored_as_iso_array() {
        let (store, repository) = repository();
        let break_days = BreakDaySet::from_stored([date("2025-09-03"), date("2025-08-02")]);
        repository
            .save_break_days("student2", &break_days)
            .expect("save break days");

        assert_eq!(
            store.get("breakDays_student2").expect("raw value"),
            Some(r#"["2025-08-02","2025-09-03"]"#.to_string())
        );
        assert_eq!(
            repository.load_break_days("student2").expect("load break days"),
            break_days
        );
        assert!(
            repository
                .load_break_days("student1")
                .expect("other user")
                .is_empty()
        );
    }
}
