use crate::domain::models::{PlanBlueprint, SemesterCalendar};
use crate::infrastructure::error::InfraError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const SEMESTER_JSON: &str = "semester.json";
const BLUEPRINT_JSON: &str = "blueprint.json";
const USERS_JSON: &str = "users.json";
const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    pub semester: SemesterCalendar,
    pub blueprint: PlanBlueprint,
    pub timezone: String,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    let semester = SemesterCalendar::default();
    let blueprint = PlanBlueprint::default();
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "Semester Planner",
                "timezone": DEFAULT_TIMEZONE
            }),
        ),
        (
            SEMESTER_JSON,
            serde_json::json!({
                "schema": 1,
                "semesterStart": semester.semester_start,
                "semesterEnd": semester.semester_end,
                "midtermExam": semester.midterm_exam,
                "finalExam": semester.final_exam
            }),
        ),
        (
            BLUEPRINT_JSON,
            serde_json::json!({
                "schema": 1,
                "partLabels": blueprint.part_labels,
                "midtermUnits": blueprint.midterm_units,
                "finalUnits": blueprint.final_units,
                "revisionLabel": blueprint.revision_label,
                "maxBreakDaysPerMonth": blueprint.max_break_days_per_month,
                "maxSubjects": blueprint.max_subjects
            }),
        ),
        (
            USERS_JSON,
            serde_json::json!({
                "schema": 1,
                "users": {
                    "student1": "password123",
                    "student2": "pass456"
                }
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn read_typed<T: DeserializeOwned>(path: &Path) -> Result<T, InfraError> {
    let value = read_config(path)?;
    serde_json::from_value(value)
        .map_err(|error| InfraError::InvalidConfig(format!("{}: {error}", path.display())))
}

pub fn read_semester_calendar(config_dir: &Path) -> Result<SemesterCalendar, InfraError> {
    let calendar: SemesterCalendar = read_typed(&config_dir.join(SEMESTER_JSON))?;
    calendar.validate().map_err(InfraError::InvalidConfig)?;
    Ok(calendar)
}

pub fn read_blueprint(config_dir: &Path) -> Result<PlanBlueprint, InfraError> {
    let blueprint: PlanBlueprint = read_typed(&config_dir.join(BLUEPRINT_JSON))?;
    blueprint.validate().map_err(InfraError::InvalidConfig)?;
    Ok(blueprint)
}

pub fn read_timezone(config_dir: &Path) -> Result<String, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_TIMEZONE)
        .to_string())
}

pub fn read_users(config_dir: &Path) -> Result<HashMap<String, String>, InfraError> {
    let path = config_dir.join(USERS_JSON);
    let users = read_config(&path)?;
    let table = users
        .get("users")
        .and_then(serde_json::Value::as_object)
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!("invalid users object structure in {}", path.display()))
        })?;
    Ok(table
        .iter()
        .filter_map(|(name, password)| {
            let name = name.trim();
            let password = password.as_str()?;
            (!name.is_empty()).then(|| (name.to_string(), password.to_string()))
        })
        .collect())
}

pub fn load_configs(config_dir: &Path) -> Result<PlannerConfig, InfraError> {
    Ok(PlannerConfig {
        semester: read_semester_calendar(config_dir)?,
        blueprint: read_blueprint(config_dir)?,
        timezone: read_timezone(config_dir)?,
    })
}
