pub mod application;
pub mod domain;
pub mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::commands::{
    AgendaResponse, AppState, BreakDayCandidateResponse, ExportResponse, GeneratePlanResponse,
    LoginResponse, PlanEntryResponse, ProgressSummaryResponse, SaveBreakDaysResponse,
    SessionResponse, UpdateProgressResponse, agenda_impl, export_csv_impl, export_report_impl,
    generate_plan_impl, get_progress_impl, list_break_day_candidates_impl, list_schedule_impl,
    login_impl, logout_impl, progress_summary_impl, save_break_days_impl, session_impl,
    update_progress_impl,
};
use domain::models::DailyProgress;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

const WORKSPACE_ENV: &str = "SEMESTER_PLANNER_ROOT";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BootstrapResponse {
    workspace_root: String,
    database_path: String,
}

fn bootstrap(state: &AppState, root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = match root {
        Some(path) => PathBuf::from(path),
        None => state.workspace_root().to_path_buf(),
    };

    let result = bootstrap_workspace(&workspace_root)
        .map_err(|error| state.command_error("bootstrap", &error))?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        database_path: result.database_path.display().to_string(),
    })
}

fn ping() -> &'static str {
    "pong"
}

fn login(state: &AppState, username: String, password: String) -> Result<LoginResponse, String> {
    login_impl(state, username, password).map_err(|error| state.command_error("login", &error))
}

fn logout(state: &AppState) -> Result<bool, String> {
    logout_impl(state).map_err(|error| state.command_error("logout", &error))
}

fn session(state: &AppState) -> Result<SessionResponse, String> {
    session_impl(state).map_err(|error| state.command_error("session", &error))
}

fn generate_plan(
    state: &AppState,
    name: Option<String>,
    subjects_count: i64,
    arrear_count: i64,
) -> Result<GeneratePlanResponse, String> {
    generate_plan_impl(state, name, subjects_count, arrear_count)
        .map_err(|error| state.command_error("generate_plan", &error))
}

fn list_schedule(state: &AppState) -> Result<Vec<PlanEntryResponse>, String> {
    list_schedule_impl(state).map_err(|error| state.command_error("list_schedule", &error))
}

fn list_break_day_candidates(state: &AppState) -> Result<Vec<BreakDayCandidateResponse>, String> {
    list_break_day_candidates_impl(state)
        .map_err(|error| state.command_error("list_break_day_candidates", &error))
}

fn save_break_days(state: &AppState, dates: Vec<String>) -> Result<SaveBreakDaysResponse, String> {
    save_break_days_impl(state, dates)
        .map_err(|error| state.command_error("save_break_days", &error))
}

fn update_progress(
    state: &AppState,
    index: usize,
    status: Option<String>,
    notes: Option<String>,
) -> Result<UpdateProgressResponse, String> {
    update_progress_impl(state, index, status, notes)
        .map_err(|error| state.command_error("update_progress", &error))
}

fn get_progress(state: &AppState, date: String) -> Result<DailyProgress, String> {
    get_progress_impl(state, date).map_err(|error| state.command_error("get_progress", &error))
}

fn agenda(state: &AppState, date: Option<String>) -> Result<AgendaResponse, String> {
    agenda_impl(state, date).map_err(|error| state.command_error("agenda", &error))
}

fn progress_summary(state: &AppState) -> Result<ProgressSummaryResponse, String> {
    progress_summary_impl(state).map_err(|error| state.command_error("progress_summary", &error))
}

fn export_csv(state: &AppState, path: Option<String>) -> Result<ExportResponse, String> {
    export_csv_impl(state, path).map_err(|error| state.command_error("export_csv", &error))
}

fn export_report(state: &AppState, path: Option<String>) -> Result<ExportResponse, String> {
    export_report_impl(state, path).map_err(|error| state.command_error("export_report", &error))
}

/// One line of input on the command channel.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub id: String,
    pub command: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandResponse {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    fn ok(id: String, result: serde_json::Value) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: String, message: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BootstrapArgs {
    root: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginArgs {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratePlanArgs {
    name: Option<String>,
    #[serde(default)]
    subjects_count: i64,
    #[serde(default)]
    arrear_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveBreakDaysArgs {
    dates: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProgressArgs {
    index: usize,
    status: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DateArgs {
    date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionalDateArgs {
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportArgs {
    path: Option<String>,
}

fn parse_args<T: DeserializeOwned>(command: &str, args: serde_json::Value) -> Result<T, String> {
    let args = if args.is_null() {
        serde_json::json!({})
    } else {
        args
    };
    serde_json::from_value(args).map_err(|error| format!("invalid arguments for {command}: {error}"))
}

fn to_value<T: Serialize>(value: T) -> Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|error| error.to_string())
}

fn route(state: &AppState, command: &str, args: serde_json::Value) -> Result<serde_json::Value, String> {
    match command {
        "ping" => to_value(ping()),
        "bootstrap" => {
            let args: BootstrapArgs = parse_args(command, args)?;
            to_value(bootstrap(state, args.root)?)
        }
        "login" => {
            let args: LoginArgs = parse_args(command, args)?;
            to_value(login(state, args.username, args.password)?)
        }
        "logout" => to_value(logout(state)?),
        "session" => to_value(session(state)?),
        "generate_plan" => {
            let args: GeneratePlanArgs = parse_args(command, args)?;
            to_value(generate_plan(
                state,
                args.name,
                args.subjects_count,
                args.arrear_count,
            )?)
        }
        "list_schedule" => to_value(list_schedule(state)?),
        "list_break_day_candidates" => to_value(list_break_day_candidates(state)?),
        "save_break_days" => {
            let args: SaveBreakDaysArgs = parse_args(command, args)?;
            to_value(save_break_days(state, args.dates)?)
        }
        "update_progress" => {
            let args: UpdateProgressArgs = parse_args(command, args)?;
            to_value(update_progress(state, args.index, args.status, args.notes)?)
        }
        "get_progress" => {
            let args: DateArgs = parse_args(command, args)?;
            to_value(get_progress(state, args.date)?)
        }
        "agenda" => {
            let args: OptionalDateArgs = parse_args(command, args)?;
            to_value(agenda(state, args.date)?)
        }
        "progress_summary" => to_value(progress_summary(state)?),
        "export_csv" => {
            let args: ExportArgs = parse_args(command, args)?;
            to_value(export_csv(state, args.path)?)
        }
        "export_report" => {
            let args: ExportArgs = parse_args(command, args)?;
            to_value(export_report(state, args.path)?)
        }
        other => Err(format!("unknown command: {other}")),
    }
}

pub fn dispatch(state: &AppState, request: CommandRequest) -> CommandResponse {
    let CommandRequest { id, command, args } = request;
    match route(state, &command, args) {
        Ok(result) => CommandResponse::ok(id, result),
        Err(message) => CommandResponse::err(id, message),
    }
}

/// Handles one raw input line. Malformed JSON gets an error response without an id.
pub fn dispatch_line(state: &AppState, line: &str) -> CommandResponse {
    match serde_json::from_str::<CommandRequest>(line) {
        Ok(request) => dispatch(state, request),
        Err(error) => {
            state.log_error("dispatch", &format!("bad request line: {error}"));
            CommandResponse::err(String::new(), format!("bad_json: {error}"))
        }
    }
}

pub fn run() -> Result<(), String> {
    let workspace_root = match std::env::var_os(WORKSPACE_ENV) {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };
    let app_state = AppState::new(workspace_root).map_err(|error| error.to_string())?;
    app_state.log_info("run", "command loop started");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.map_err(|error| error.to_string())?;
        if line.trim().is_empty() {
            continue;
        }

        let response = dispatch_line(&app_state, &line);
        let encoded = serde_json::to_string(&response)
            .unwrap_or_else(|_| "{\"ok\":false}".to_string());
        writeln!(stdout, "{encoded}").map_err(|error| error.to_string())?;
        stdout.flush().map_err(|error| error.to_string())?;
    }

    app_state.log_info("run", "command loop finished");
    Ok(())
}
