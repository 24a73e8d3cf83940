use axum::{
    extract::{Path as AxumPath, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, get_service},
    Json, Router,
};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::bracket::derive;
use crate::config::normalize_participant;
use crate::picks::PickStore;
use crate::template::BracketTemplate;
use crate::types::*;

// ── State & helpers ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub template: Arc<BracketTemplate>,
    pub store: SharedPickStore,
}

type ApiError = (StatusCode, String);

fn invalid(msg: String) -> ApiError {
    (StatusCode::BAD_REQUEST, msg)
}

fn internal(msg: String) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, msg)
}

/// Lock the store, then call `f` with it.
fn with_store<F, R>(state: &AppState, f: F) -> Result<R, String>
where
    F: FnOnce(&PickStore) -> Result<R, String>,
{
    let guard = state.store.lock().map_err(|e| e.to_string())?;
    f(&guard)
}

fn json_no_store<T: Serialize>(value: &T) -> Response {
    let body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    (
        [
            ("Content-Type", "application/json"),
            ("Cache-Control", "no-store"),
            ("Pragma", "no-cache"),
            ("Expires", "0"),
        ],
        body,
    )
        .into_response()
}

// ── Core operations (typed; handlers wrap these) ───────────────────────

fn load_picks_file(state: &AppState, participant: &str) -> Result<PicksFile, ApiError> {
    normalize_participant(participant).map_err(invalid)?;
    with_store(state, |store| store.load(participant)).map_err(internal)
}

fn load_bracket(state: &AppState, participant: &str) -> Result<BracketResponse, ApiError> {
    let file = load_picks_file(state, participant)?;
    let bracket = derive(&state.template, &file.picks);
    Ok(BracketResponse {
        participant: file.participant,
        updated_at_ms: file.updated_at_ms,
        bracket,
    })
}

fn replace_picks(
    state: &AppState,
    participant: &str,
    picks: PredictionSet,
) -> Result<PicksFile, ApiError> {
    normalize_participant(participant).map_err(invalid)?;
    with_store(state, |store| store.save(participant, picks)).map_err(internal)
}

/// Single-pick writes validate against the template so the UI gets
/// immediate feedback; wholesale replacement stays permissive, matching the
/// engine's tolerance of stale sets.
fn apply_pick(
    state: &AppState,
    participant: &str,
    request: &PickRequest,
) -> Result<PicksFile, ApiError> {
    normalize_participant(participant).map_err(invalid)?;
    if state.template.get(&request.matchup_id).is_none() {
        return Err(invalid(format!("Unknown matchup `{}`.", request.matchup_id)));
    }
    if state.template.entrant(&request.winner_id).is_none() {
        return Err(invalid(format!("Unknown entrant `{}`.", request.winner_id)));
    }
    with_store(state, |store| {
        store.set_pick(participant, &request.matchup_id, &request.winner_id)
    })
    .map_err(internal)
}

fn remove_pick(state: &AppState, participant: &str, matchup_id: &str) -> Result<PicksFile, ApiError> {
    normalize_participant(participant).map_err(invalid)?;
    with_store(state, |store| store.clear_pick(participant, matchup_id)).map_err(internal)
}

// ── Handlers ───────────────────────────────────────────────────────────

async fn get_template(AxumState(state): AxumState<AppState>) -> Response {
    json_no_store(state.template.as_ref())
}

async fn get_participants(AxumState(state): AxumState<AppState>) -> Result<Response, ApiError> {
    let listed = with_store(&state, |store| store.list_participants()).map_err(internal)?;
    Ok(json_no_store(&listed))
}

async fn get_picks(
    AxumState(state): AxumState<AppState>,
    AxumPath(participant): AxumPath<String>,
) -> Result<Response, ApiError> {
    Ok(json_no_store(&load_picks_file(&state, &participant)?))
}

async fn put_picks(
    AxumState(state): AxumState<AppState>,
    AxumPath(participant): AxumPath<String>,
    Json(picks): Json<PredictionSet>,
) -> Result<Response, ApiError> {
    Ok(json_no_store(&replace_picks(&state, &participant, picks)?))
}

async fn post_pick(
    AxumState(state): AxumState<AppState>,
    AxumPath(participant): AxumPath<String>,
    Json(request): Json<PickRequest>,
) -> Result<Response, ApiError> {
    Ok(json_no_store(&apply_pick(&state, &participant, &request)?))
}

async fn delete_pick(
    AxumState(state): AxumState<AppState>,
    AxumPath((participant, matchup_id)): AxumPath<(String, String)>,
) -> Result<Response, ApiError> {
    Ok(json_no_store(&remove_pick(&state, &participant, &matchup_id)?))
}

async fn get_bracket(
    AxumState(state): AxumState<AppState>,
    AxumPath(participant): AxumPath<String>,
) -> Result<Response, ApiError> {
    Ok(json_no_store(&load_bracket(&state, &participant)?))
}

// ── Router & serve loop ────────────────────────────────────────────────

pub fn api_router(state: AppState, ui_dir: PathBuf) -> Router {
    let static_files = get_service(ServeDir::new(ui_dir));

    Router::new()
        .route("/api/template", get(get_template))
        .route("/api/participants", get(get_participants))
        .route("/api/picks/:participant", get(get_picks).put(put_picks).post(post_pick))
        .route("/api/picks/:participant/pick/:matchup", delete(delete_pick))
        .route("/api/bracket/:participant", get(get_bracket))
        .nest_service("/", static_files)
        .with_state(state)
}

pub async fn start_server(state: AppState, ui_dir: PathBuf, addr: &str) {
    let app = api_router(state, ui_dir);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("pick'em server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("pick'em server listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("pick'em server error: {e}");
    }
}
