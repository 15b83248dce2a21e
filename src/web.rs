use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use actix_files::Files;
use actix_web::http::header;
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::client::SolverClient;
use crate::config::SchedulaConfig;
use crate::error::SchedulaError;
use crate::export::{export_csv_with, export_template, CsvStyle, Download, TemplateKind};
use crate::schedule::{build_grid_strict, find_duplicates, AssignmentRecord, ScheduleGrid};
use crate::session::{FileSlot, Session, UploadedFile};

pub const FILE_NAME_HEADER: &str = "X-File-Name";

/// Shared by every worker. The session is the single user's UI state.
pub struct AppState {
    pub session: Mutex<Session>,
    pub client: SolverClient,
    pub csv_style: CsvStyle,
    pub strict_duplicates: bool,
}

impl AppState {
    pub fn new(config: &SchedulaConfig) -> crate::error::Result<Self> {
        Ok(Self {
            session: Mutex::new(Session::new()),
            client: SolverClient::new(&config.solver)?,
            csv_style: config.export.csv_style,
            strict_duplicates: config.strict_duplicates,
        })
    }

    fn session(&self) -> Result<MutexGuard<'_, Session>> {
        self.session
            .lock()
            .map_err(|_| actix_web::error::ErrorInternalServerError("session state poisoned"))
    }
}

#[derive(Serialize)]
pub struct ScheduleResponse<'a> {
    success: bool,
    received_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    grid: &'a ScheduleGrid,
}

#[derive(Serialize)]
pub struct StatusResponse {
    file1: Option<String>,
    file2: Option<String>,
    busy: bool,
    can_submit: bool,
    has_schedule: bool,
}

fn download_response(download: Download) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(download.content_type.as_str())
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.filename),
        ))
        .body(download.body)
}

fn schedule_response(grid: &ScheduleGrid, received_at: Option<DateTime<Utc>>) -> HttpResponse {
    HttpResponse::Ok().json(ScheduleResponse {
        success: true,
        received_at,
        grid,
    })
}

/// Logs duplicate (room, time) claims and, in strict mode, turns them into
/// a failed submission.
fn screen_duplicates(
    outcome: crate::error::Result<Option<Vec<AssignmentRecord>>>,
    strict: bool,
) -> crate::error::Result<Option<Vec<AssignmentRecord>>> {
    let records = match outcome? {
        Some(records) => records,
        None => return Ok(None),
    };
    if strict {
        build_grid_strict(&records)?;
    } else {
        for dup in find_duplicates(&records) {
            warn!(
                room = ?dup.room,
                time = ?dup.time,
                kept = ?dup.kept,
                shadowed = ?dup.shadowed,
                "Slot assigned more than once, showing first course"
            );
        }
    }
    Ok(Some(records))
}

// Stores one of the two input files
async fn upload_file(
    req: HttpRequest,
    slot: web::Path<u8>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let slot = match FileSlot::from_number(slot.into_inner()) {
        Some(slot) => slot,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "Unknown file slot"})))
        }
    };

    let name = req
        .headers()
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.txt", slot.field_name()));

    state.session()?.select_file(slot, UploadedFile::new(name.clone(), body.to_vec()));

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "slot": slot.field_name(),
        "name": name,
    })))
}

/// Held while a submission is in flight. If the handler future is dropped
/// before the solver answers (client gone, server shutting down), the
/// session is released instead of staying busy forever.
struct InFlight<'a> {
    state: &'a AppState,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a AppState) -> Self {
        Self { state, settled: false }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match self.state.session.lock() {
            Ok(mut session) => session.abandon_submission(),
            Err(_) => warn!("Session state poisoned, submission left busy"),
        }
    }
}

// Forwards both files to the solver and keeps whatever comes back
async fn submit(state: web::Data<AppState>) -> Result<HttpResponse> {
    let submission = match state.session()?.begin_submission() {
        Ok(submission) => submission,
        Err(e @ SchedulaError::SubmissionInProgress) => {
            return Ok(HttpResponse::Conflict().json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            })))
        }
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            })))
        }
    };

    // The lock is not held while the solver works.
    let in_flight = InFlight::new(&state);
    let outcome = state.client.submit(&submission).await;
    let outcome = screen_duplicates(outcome, state.strict_duplicates);

    in_flight.settle();
    let mut session = state.session()?;
    session.finish_submission(outcome);
    match session.grid() {
        Some(grid) => Ok(schedule_response(&grid, session.received_at())),
        None => Ok(HttpResponse::BadGateway().json(serde_json::json!({"success": false}))),
    }
}

async fn get_schedule(state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = state.session()?;
    match session.grid() {
        Some(grid) => Ok(schedule_response(&grid, session.received_at())),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "Schedule not available"}))),
    }
}

async fn get_status(state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = state.session()?;
    let name_of = |slot| session.file(slot).map(|f: &UploadedFile| f.name.clone());
    Ok(HttpResponse::Ok().json(StatusResponse {
        file1: name_of(FileSlot::First),
        file2: name_of(FileSlot::Second),
        busy: session.is_busy(),
        can_submit: session.can_submit(),
        has_schedule: session.schedule().is_some(),
    }))
}

async fn reset_session(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut session = state.session()?;
    if session.is_busy() {
        return Ok(HttpResponse::Conflict().json(serde_json::json!({
            "success": false,
            "error": SchedulaError::SubmissionInProgress.to_string(),
        })));
    }
    session.clear();
    info!("Session cleared");
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

async fn export_schedule_csv(state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = state.session()?;
    let records = match session.schedule() {
        Some(records) => records,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "Schedule not available"})))
        }
    };
    let download = export_csv_with(records, state.csv_style)
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;
    info!(rows = records.len(), "Schedule exported as CSV");
    Ok(download_response(download))
}

async fn download_template(kind: web::Path<String>) -> Result<HttpResponse> {
    match kind.parse::<TemplateKind>() {
        Ok(kind) => Ok(download_response(export_template(kind))),
        Err(e) => Ok(HttpResponse::NotFound().json(serde_json::json!({"error": e}))),
    }
}

// HTML page handler
async fn index() -> Result<HttpResponse> {
    let html = include_str!("../templates/index.html");
    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

/// Routes, without state or middleware.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/api/status", web::get().to(get_status))
        .route("/api/session", web::delete().to(reset_session))
        .route("/api/submit", web::post().to(submit))
        .route("/api/schedule", web::get().to(get_schedule))
        .route("/api/export/csv", web::get().to(export_schedule_csv))
        .service(web::resource("/api/files/{slot}").route(web::put().to(upload_file)))
        .service(web::resource("/api/templates/{kind}").route(web::get().to(download_template)));
}

pub async fn start_server(config: SchedulaConfig) -> anyhow::Result<()> {
    let app_state = web::Data::new(AppState::new(&config)?);
    let static_dir: PathBuf = config.server.static_dir.clone();
    if !static_dir.is_dir() {
        warn!("Static directory {} not found, /static disabled", static_dir.display());
    }

    info!(
        bind = %config.server.bind,
        port = config.server.port,
        solver = %app_state.client.url(),
        "Starting web server"
    );

    HttpServer::new(move || {
        let static_dir = static_dir.clone();
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(move |cfg| {
                if static_dir.is_dir() {
                    cfg.service(Files::new("/static", static_dir));
                }
            })
            .configure(configure)
    })
    .bind((config.server.bind.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
