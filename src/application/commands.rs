use crate::application::bootstrap::{BootstrapResult, bootstrap_workspace};
use crate::domain::allocation::{AllocationReport, allocate};
use crate::domain::break_days::validate_break_days;
use crate::domain::calendar::{partition_days, semester_study_days};
use crate::domain::models::{
    DATE_FORMAT, DailyProgress, ProgressStatus, Schedule, ScheduleEntry, parse_date,
};
use crate::domain::progress::apply_progress_update;
use crate::domain::segments::plan_segments;
use crate::infrastructure::config::{
    load_configs, read_blueprint, read_semester_calendar, read_timezone,
};
use crate::infrastructure::credential_store::CredentialTable;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::export::{export_rows, render_report, write_csv};
use crate::infrastructure::kv_store::{KeyValueStore, SqliteKeyValueStore};
use crate::infrastructure::progress_repository::ProgressRepository;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct AppState {
    workspace_root: PathBuf,
    config_dir: PathBuf,
    logs_dir: PathBuf,
    progress: ProgressRepository,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let store = Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path));
        Ok(Self::from_bootstrap(bootstrap, store))
    }

    pub fn with_store(
        workspace_root: PathBuf,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        Ok(Self::from_bootstrap(bootstrap, store))
    }

    fn from_bootstrap(bootstrap: BootstrapResult, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            workspace_root: bootstrap.workspace_root,
            config_dir: bootstrap.config_dir,
            logs_dir: bootstrap.logs_dir,
            progress: ProgressRepository::new(store),
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    session: Option<PlannerSession>,
}

/// Per-login planner state. The schedule is replaced wholesale on every
/// regeneration or carry-over.
#[derive(Debug, Clone)]
struct PlannerSession {
    user: String,
    request: Option<PlanRequest>,
    schedule: Option<Schedule>,
    last_generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlanRequest {
    name: String,
    subjects_count: u32,
    arrear_count: u32,
}

impl PlanRequest {
    fn parse(
        name: Option<String>,
        user: &str,
        subjects_count: i64,
        arrear_count: i64,
        max_subjects: u32,
    ) -> Result<Self, InfraError> {
        if subjects_count < 0 || arrear_count < 0 {
            return Err(InfraError::InvalidInput(
                "subject and arrear counts must not be negative".to_string(),
            ));
        }
        let Some(total) = subjects_count.checked_add(arrear_count) else {
            return Err(InfraError::InvalidInput(format!(
                "at most {max_subjects} subjects can be planned"
            )));
        };
        if total <= 0 {
            return Err(InfraError::InvalidInput(
                "Please enter at least one subject or arrear.".to_string(),
            ));
        }
        if total > i64::from(max_subjects) {
            return Err(InfraError::InvalidInput(format!(
                "at most {max_subjects} subjects can be planned (blueprint maxSubjects)"
            )));
        }

        let name = name
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(user)
            .to_string();
        Ok(Self {
            name,
            subjects_count: subjects_count as u32,
            arrear_count: arrear_count as u32,
        })
    }

    fn total_subjects(&self) -> u32 {
        self.subjects_count + self.arrear_count
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: Option<String>,
    pub generation: Option<u64>,
    pub entry_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntryResponse {
    pub index: usize,
    #[serde(flatten)]
    pub entry: ScheduleEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<DailyProgress>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanResponse {
    pub user: String,
    pub name: String,
    pub total_subjects: u32,
    pub generation: u64,
    pub entries: Vec<PlanEntryResponse>,
    pub report: AllocationReport,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreakDayCandidateResponse {
    pub date: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBreakDaysResponse {
    pub break_days: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regenerated: Option<GeneratePlanResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressResponse {
    pub date: String,
    pub progress: DailyProgress,
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carried_over: Option<PlanEntryResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaResponse {
    pub date: String,
    pub entries: Vec<PlanEntryResponse>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummaryResponse {
    pub total_tasks: usize,
    pub done: usize,
    pub partial: usize,
    pub not_done: usize,
    pub break_days: usize,
    pub revision_days: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub content: String,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

pub fn login_impl(
    state: &AppState,
    username: String,
    password: String,
) -> Result<LoginResponse, InfraError> {
    let credentials = CredentialTable::from_config(state.config_dir())?;
    let Some(user) = credentials.verify(&username, &password) else {
        return Err(InfraError::Unauthorized(
            "invalid username or password".to_string(),
        ));
    };

    {
        let mut runtime = lock_runtime(state)?;
        runtime.session = Some(PlannerSession {
            user: user.clone(),
            request: None,
            schedule: None,
            last_generation: 0,
        });
    }

    state.log_info("login", &format!("logged in user={user}"));
    Ok(LoginResponse { user })
}

pub fn logout_impl(state: &AppState) -> Result<bool, InfraError> {
    let previous = lock_runtime(state)?.session.take();
    let Some(session) = previous else {
        return Ok(false);
    };
    state.log_info("logout", &format!("logged out user={}", session.user));
    Ok(true)
}

pub fn session_impl(state: &AppState) -> Result<SessionResponse, InfraError> {
    let runtime = lock_runtime(state)?;
    let Some(session) = runtime.session.as_ref() else {
        return Ok(SessionResponse {
            user: None,
            generation: None,
            entry_count: 0,
        });
    };
    Ok(SessionResponse {
        user: Some(session.user.clone()),
        generation: session.schedule.as_ref().map(Schedule::generation),
        entry_count: session.schedule.as_ref().map_or(0, Schedule::len),
    })
}

pub fn generate_plan_impl(
    state: &AppState,
    name: Option<String>,
    subjects_count: i64,
    arrear_count: i64,
) -> Result<GeneratePlanResponse, InfraError> {
    let user = require_user(state)?;
    let blueprint = read_blueprint(state.config_dir())?;
    let request = PlanRequest::parse(
        name,
        &user,
        subjects_count,
        arrear_count,
        blueprint.max_subjects,
    )?;
    let response = regenerate(state, &user, request)?;

    state.log_info(
        "generate_plan",
        &format!(
            "generated plan user={} subjects={} generation={} entries={} unplaced_midterm={} unplaced_final={} unfilled_days={}",
            response.user,
            response.total_subjects,
            response.generation,
            response.entries.len(),
            response.report.unplaced_midterm,
            response.report.unplaced_final,
            response.report.unfilled_days.len()
        ),
    );
    Ok(response)
}

pub fn list_schedule_impl(state: &AppState) -> Result<Vec<PlanEntryResponse>, InfraError> {
    let (user, schedule) = current_schedule(state)?;
    entry_responses(state, &user, schedule.entries().iter().enumerate())
}

pub fn list_break_day_candidates_impl(
    state: &AppState,
) -> Result<Vec<BreakDayCandidateResponse>, InfraError> {
    let user = require_user(state)?;
    let calendar = read_semester_calendar(state.config_dir())?;
    let saved = state.progress.load_break_days(&user)?;

    Ok(semester_study_days(&calendar)
        .into_iter()
        .map(|date| BreakDayCandidateResponse {
            date: date.format(DATE_FORMAT).to_string(),
            selected: saved.contains(&date),
        })
        .collect())
}

pub fn save_break_days_impl(
    state: &AppState,
    dates: Vec<String>,
) -> Result<SaveBreakDaysResponse, InfraError> {
    let user = require_user(state)?;
    let config = load_configs(state.config_dir())?;
    let break_days = validate_break_days(&dates[..], config.blueprint.max_break_days_per_month)?;
    state.progress.save_break_days(&user, &break_days)?;

    let request = lock_runtime(state)?
        .session
        .as_ref()
        .and_then(|session| session.request.clone());
    let regenerated = match request {
        Some(request) => Some(regenerate(state, &user, request)?),
        None => None,
    };

    state.log_info(
        "save_break_days",
        &format!(
            "saved break_days={} user={user} regenerated={}",
            break_days.len(),
            regenerated.is_some()
        ),
    );
    Ok(SaveBreakDaysResponse {
        break_days: break_days.to_date_strings(),
        regenerated,
    })
}

pub fn update_progress_impl(
    state: &AppState,
    index: usize,
    status: Option<String>,
    notes: Option<String>,
) -> Result<UpdateProgressResponse, InfraError> {
    let (user, schedule) = current_schedule(state)?;
    let status = status.as_deref().map(parse_progress_status).transpose()?;
    let Some(entry) = schedule.get(index) else {
        return Err(InfraError::InvalidInput(format!(
            "schedule entry not found: {index}"
        )));
    };

    let previous = state.progress.load_progress(&user, entry.date)?;
    let update = apply_progress_update(&schedule, index, &previous, status, notes)
        .map_err(InfraError::InvalidInput)?;

    let mut generation = schedule.generation();
    if let Some(carry) = &update.carry_over {
        replace_schedule(state, &user, schedule.generation(), carry.schedule.clone())?;
        generation = carry.schedule.generation();
    }
    state
        .progress
        .save_progress(&user, update.date, &update.progress)?;

    let carried_over = match update.carry_over {
        Some(carry) => {
            state
                .progress
                .save_progress(&user, carry.entry.date, &carry.progress)?;
            state.log_info(
                "update_progress",
                &format!(
                    "carried over index={index} to date={} position={}",
                    carry.entry.date_key(),
                    carry.inserted_at
                ),
            );
            Some(PlanEntryResponse {
                index: carry.inserted_at,
                entry: carry.entry,
                progress: Some(carry.progress),
            })
        }
        None => None,
    };

    state.log_info(
        "update_progress",
        &format!(
            "updated progress date={} status={}",
            update.date.format(DATE_FORMAT),
            update.progress.status.as_str()
        ),
    );
    Ok(UpdateProgressResponse {
        date: update.date.format(DATE_FORMAT).to_string(),
        progress: update.progress,
        generation,
        carried_over,
    })
}

pub fn get_progress_impl(state: &AppState, date: String) -> Result<DailyProgress, InfraError> {
    let user = require_user(state)?;
    let date = parse_date(&date, "date").map_err(InfraError::InvalidInput)?;
    state.progress.load_progress(&user, date)
}

pub fn agenda_impl(state: &AppState, date: Option<String>) -> Result<AgendaResponse, InfraError> {
    let (user, schedule) = current_schedule(state)?;
    let date = match date.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_date(value, "date").map_err(InfraError::InvalidInput)?,
        None => today_in(&read_timezone(state.config_dir())?)?,
    };

    let entries = entry_responses(
        state,
        &user,
        schedule
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.date == date),
    )?;
    Ok(AgendaResponse {
        date: date.format(DATE_FORMAT).to_string(),
        entries,
    })
}

pub fn progress_summary_impl(state: &AppState) -> Result<ProgressSummaryResponse, InfraError> {
    let (user, schedule) = current_schedule(state)?;
    let progress = progress_by_date(state, &user, schedule.entries())?;

    let mut summary = ProgressSummaryResponse {
        total_tasks: 0,
        done: 0,
        partial: 0,
        not_done: 0,
        break_days: 0,
        revision_days: 0,
    };
    for entry in schedule.entries() {
        if entry.is_break {
            summary.break_days += 1;
            continue;
        }
        if entry.is_revision() {
            summary.revision_days += 1;
        }
        summary.total_tasks += 1;
        match progress.get(&entry.date).map(|value| value.status) {
            Some(ProgressStatus::Done) => summary.done += 1,
            Some(ProgressStatus::Partial) => summary.partial += 1,
            _ => summary.not_done += 1,
        }
    }
    Ok(summary)
}

pub fn export_csv_impl(state: &AppState, path: Option<String>) -> Result<ExportResponse, InfraError> {
    let (user, schedule) = current_schedule(state)?;
    let progress = progress_by_date(state, &user, schedule.entries())?;
    let rows = export_rows(schedule.entries(), |date| {
        progress.get(&date).cloned().unwrap_or_default()
    });
    let content = write_csv(&rows)?;
    let path = write_export(state, path, &content)?;

    state.log_info(
        "export_csv",
        &format!("exported rows={} user={user}", rows.len()),
    );
    Ok(ExportResponse {
        content,
        rows: rows.len(),
        path,
    })
}

pub fn export_report_impl(
    state: &AppState,
    path: Option<String>,
) -> Result<ExportResponse, InfraError> {
    let (user, schedule) = current_schedule(state)?;
    let progress = progress_by_date(state, &user, schedule.entries())?;
    let rows = export_rows(schedule.entries(), |date| {
        progress.get(&date).cloned().unwrap_or_default()
    });
    let mut content = render_report(&user, &rows).join("\n");
    content.push('\n');
    let path = write_export(state, path, &content)?;

    state.log_info(
        "export_report",
        &format!("exported report rows={} user={user}", rows.len()),
    );
    Ok(ExportResponse {
        content,
        rows: rows.len(),
        path,
    })
}

fn regenerate(
    state: &AppState,
    user: &str,
    request: PlanRequest,
) -> Result<GeneratePlanResponse, InfraError> {
    let config = load_configs(state.config_dir())?;
    let break_days = state.progress.load_break_days(user)?;
    let days = semester_study_days(&config.semester);
    let buckets = partition_days(&config.semester, &days, &break_days);
    let plan = plan_segments(request.total_subjects(), &config.blueprint);
    let allocation = allocate(
        &buckets,
        &plan,
        &break_days,
        &config.blueprint.revision_label,
    );

    let schedule = {
        let mut runtime = lock_runtime(state)?;
        let session = active_session(&mut runtime, user)?;
        session.last_generation += 1;
        let schedule = Schedule::new(session.last_generation, allocation.entries);
        session.schedule = Some(schedule.clone());
        session.request = Some(request.clone());
        schedule
    };

    Ok(GeneratePlanResponse {
        user: user.to_string(),
        name: request.name.clone(),
        total_subjects: request.total_subjects(),
        generation: schedule.generation(),
        entries: entry_responses(state, user, schedule.entries().iter().enumerate())?,
        report: allocation.report,
    })
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

fn active_session<'a>(
    runtime: &'a mut RuntimeState,
    user: &str,
) -> Result<&'a mut PlannerSession, InfraError> {
    runtime
        .session
        .as_mut()
        .filter(|session| session.user == user)
        .ok_or_else(|| InfraError::Unauthorized("please login first".to_string()))
}

/// Swaps in a mutated snapshot only if the session still holds the one it
/// was derived from.
fn replace_schedule(
    state: &AppState,
    user: &str,
    expected_generation: u64,
    schedule: Schedule,
) -> Result<(), InfraError> {
    let mut runtime = lock_runtime(state)?;
    let session = active_session(&mut runtime, user)?;
    let current = session.schedule.as_ref().map(Schedule::generation);
    if current != Some(expected_generation) {
        return Err(InfraError::InvalidInput(format!(
            "schedule changed since generation {expected_generation}, reload and retry"
        )));
    }
    session.last_generation = session.last_generation.max(schedule.generation());
    session.schedule = Some(schedule);
    Ok(())
}

fn require_user(state: &AppState) -> Result<String, InfraError> {
    lock_runtime(state)?
        .session
        .as_ref()
        .map(|session| session.user.clone())
        .ok_or_else(|| InfraError::Unauthorized("please login first".to_string()))
}

fn current_schedule(state: &AppState) -> Result<(String, Schedule), InfraError> {
    let runtime = lock_runtime(state)?;
    let Some(session) = runtime.session.as_ref() else {
        return Err(InfraError::Unauthorized("please login first".to_string()));
    };
    let Some(schedule) = session.schedule.clone() else {
        return Err(InfraError::InvalidInput("generate a plan first".to_string()));
    };
    Ok((session.user.clone(), schedule))
}

fn progress_by_date(
    state: &AppState,
    user: &str,
    entries: &[ScheduleEntry],
) -> Result<HashMap<NaiveDate, DailyProgress>, InfraError> {
    let mut progress = HashMap::new();
    for entry in entries.iter().filter(|entry| !entry.is_break) {
        if !progress.contains_key(&entry.date) {
            progress.insert(entry.date, state.progress.load_progress(user, entry.date)?);
        }
    }
    Ok(progress)
}

fn entry_responses<'a>(
    state: &AppState,
    user: &str,
    entries: impl Iterator<Item = (usize, &'a ScheduleEntry)>,
) -> Result<Vec<PlanEntryResponse>, InfraError> {
    let mut cache: HashMap<NaiveDate, DailyProgress> = HashMap::new();
    let mut responses = Vec::new();
    for (index, entry) in entries {
        let progress = if entry.is_break {
            None
        } else {
            if !cache.contains_key(&entry.date) {
                cache.insert(entry.date, state.progress.load_progress(user, entry.date)?);
            }
            cache.get(&entry.date).cloned()
        };
        responses.push(PlanEntryResponse {
            index,
            entry: entry.clone(),
            progress,
        });
    }
    Ok(responses)
}

fn parse_progress_status(value: &str) -> Result<ProgressStatus, InfraError> {
    ProgressStatus::parse(value).ok_or_else(|| {
        InfraError::InvalidInput(format!("unsupported progress status: {}", value.trim()))
    })
}

fn today_in(timezone: &str) -> Result<NaiveDate, InfraError> {
    let timezone: Tz = timezone
        .parse()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{timezone}': {error}")))?;
    Ok(Utc::now().with_timezone(&timezone).date_naive())
}

fn write_export(
    state: &AppState,
    path: Option<String>,
    content: &str,
) -> Result<Option<String>, InfraError> {
    let Some(path) = path
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return Ok(None);
    };

    let path = PathBuf::from(path);
    let path = if path.is_relative() {
        state.workspace_root().join(path)
    } else {
        path
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(Some(path.display().to_string()))
}
