//! HTTP server for the roster import API.
//!
//! Holds a single import session. The import itself runs on a background
//! task; clients follow it through `GET /api/session` or the SSE stream.
//!
//! # API Endpoints
//!
//! | Method | Path                          | Description                          |
//! |--------|-------------------------------|--------------------------------------|
//! | GET    | `/health`                     | Health check                         |
//! | GET    | `/api/template`               | Download the sample file             |
//! | POST   | `/api/upload`                 | Upload an email list (→ preview)     |
//! | GET    | `/api/session`                | Current session snapshot             |
//! | DELETE | `/api/session/rows/{index}`   | Remove a row before importing        |
//! | POST   | `/api/session/start`          | Start importing valid rows           |
//! | POST   | `/api/session/reset`          | Start over                           |
//! | GET    | `/api/session/report`         | CSV report of a completed import     |
//! | GET    | `/api/logs`                   | SSE stream of logs and progress      |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, log_warning, LogEntry, LOG_BROADCASTER};
use super::types::{ImportEvent, SessionResponse, StartResponse};
use crate::config::Config;
use crate::directory::{HttpClientDirectory, RosterSource};
use crate::error::{ServerError, ServerResult, SessionError};
use crate::import::{
    report_csv, report_filename, template_csv, Executor, ImportRun, ImportSession, RowUpdate,
    TEMPLATE_FILENAME,
};
use crate::models::Stage;
use crate::validation::Roster;

const EVENT_CAPACITY: usize = 256;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    session: Arc<Mutex<ImportSession>>,
    executor: Executor,
    roster_source: Arc<dyn RosterSource>,
    events: broadcast::Sender<ImportEvent>,
    /// Held by the background run until its last directory call returns
    run_slot: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(executor: Executor, roster_source: Arc<dyn RosterSource>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session: Arc::new(Mutex::new(ImportSession::new())),
            executor,
            roster_source,
            events,
            run_slot: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Never held across an `.await`.
    fn lock_session(&self) -> MutexGuard<'_, ImportSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> SessionResponse {
        SessionResponse::from(self.lock_session().clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.events.subscribe()
    }
}

/// Build the router around an existing state
pub fn router(state: AppState, max_file_size: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/template", get(download_template))
        .route("/api/upload", post(upload_file))
        .route("/api/session", get(get_session))
        .route("/api/session/rows/{index}", delete(remove_row))
        .route("/api/session/start", post(start_import))
        .route("/api/session/reset", post(reset_session))
        .route("/api/session/report", get(download_report))
        .route("/api/logs", get(sse_events))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let directory = Arc::new(
        HttpClientDirectory::new(config.api_url.clone()).with_token(config.api_token.clone()),
    );
    let executor = Executor::new(directory.clone()).with_options(config.executor_options());
    let state = AppState::new(executor, directory);
    let app = router(state, config.max_file_size);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("🚀 Rosterload server running on http://localhost:{}", config.port);
    println!("   Client directory: {}", config.api_url);
    println!("   POST /api/upload         - Upload email list");
    println!("   POST /api/session/start  - Start import");
    println!("   GET  /api/logs           - SSE logs and progress");
    println!("   GET  /health             - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "rosterload",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn download_template() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", TEMPLATE_FILENAME),
            ),
        ],
        template_csv(),
    )
}

async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(state.snapshot())
}

/// Multipart fields: `file` (required) and `roster` (optional, one email
/// per line). Without `roster` the directory is asked for the current one.
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<Json<SessionResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut roster_text: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let name = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file = Some((name, bytes.to_vec()));
            }
            "roster" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                roster_text = Some(text);
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    log_info(format!("📄 New upload: {} ({} bytes)", file_name, bytes.len()));

    let roster = match roster_text {
        Some(text) => Roster::from_lines(&text),
        None => state.roster_source.fetch_roster().await?,
    };
    log_info(format!("Roster snapshot: {} connected client(s)", roster.len()));

    let mut session = state.lock_session();
    session.load_file(&file_name, &bytes, &roster)?;
    Ok(Json(SessionResponse::from(session.clone())))
}

async fn remove_row(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ServerResult<Json<SessionResponse>> {
    let mut session = state.lock_session();
    let removed = session.remove_row(index)?;
    log_info(format!("Removed {} (line {})", removed.email(), removed.original_line_number));
    Ok(Json(SessionResponse::from(session.clone())))
}

/// Only one run talks to the directory at a time. A run whose session was
/// reset keeps the slot until it drains.
async fn start_import(State(state): State<AppState>) -> ServerResult<(StatusCode, Json<StartResponse>)> {
    let slot = state
        .run_slot
        .clone()
        .try_lock_owned()
        .map_err(|_| ServerError::RunInProgress)?;

    let run = state.lock_session().begin_import()?;
    let response = StartResponse {
        session_id: run.session_id,
        stage: Stage::Importing,
        total: run.total,
    };

    tokio::spawn(async move {
        run_in_background(state, run).await;
        drop(slot);
    });
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Execute a run and write every result back into the shared session.
async fn run_in_background(state: AppState, run: ImportRun) {
    let ImportRun { session_id, mut rows, .. } = run;

    let mut sink = |update: &RowUpdate| {
        let applied = {
            let mut session = state.lock_session();
            session
                .apply_update(session_id, update)
                .map(|()| session.summary().copied())
        };

        match applied {
            Ok(completed) => {
                let _ = state.events.send(ImportEvent::Progress {
                    session_id,
                    update: update.clone(),
                });
                if let Some(summary) = completed {
                    let _ = state.events.send(ImportEvent::Completed { session_id, summary });
                }
            }
            Err(SessionError::StaleRun) => {
                log_warning(format!("{}: result dropped, session was reset", update.row.email()));
            }
            Err(e) => log_warning(format!("Could not record {}: {}", update.row.email(), e)),
        }
    };

    state.executor.run(&mut rows, &mut sink).await;
}

async fn reset_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let mut session = state.lock_session();
    session.reset();
    log_info("🔄 Session reset");
    Json(SessionResponse::from(session.clone()))
}

async fn download_report(State(state): State<AppState>) -> ServerResult<impl IntoResponse> {
    let session = state.lock_session().clone();
    if session.stage() != Stage::Complete {
        return Err(SessionError::WrongStage {
            expected: Stage::Complete,
            actual: session.stage(),
        }
        .into());
    }

    let body = report_csv(session.rows()).map_err(|e| ServerError::Internal(e.to_string()))?;
    let file_name = report_filename(session.completed_at().unwrap_or_else(Utc::now));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        body,
    ))
}

fn log_event(entry: LogEntry) -> Event {
    Event::default()
        .event("log")
        .json_data(&entry)
        .unwrap_or_else(|_| Event::default().comment("unserializable log entry"))
}

fn import_event(event: ImportEvent) -> Event {
    let name = match event {
        ImportEvent::Progress { .. } => "progress",
        ImportEvent::Completed { .. } => "completed",
    };
    Event::default()
        .event(name)
        .json_data(&event)
        .unwrap_or_else(|_| Event::default().comment("unserializable import event"))
}

/// SSE: replays recent logs, then streams new logs and import events
async fn sse_events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let replay = tokio_stream::iter(LOG_BROADCASTER.recent()).map(log_event);
    let logs = BroadcastStream::new(LOG_BROADCASTER.subscribe()).filter_map(|r| r.ok().map(log_event));
    let imports = BroadcastStream::new(state.subscribe()).filter_map(|r| r.ok().map(import_event));

    let stream = replay.chain(logs.merge(imports)).map(Ok::<_, Infallible>);

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
