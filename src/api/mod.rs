use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    AnswerField, Difficulty, FieldGrade, Grade, Method, Persona, Scenario, ScenarioError, Session,
    SessionConfig, Stats, Timing, Truth, Verdict, compute_truth, derive_seed, generate_problem,
    grade,
};

const DEFAULT_BASE_SEED: u32 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub max_sessions: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--host must be an IP address (got {0:?})")]
    InvalidHost(String),
    #[error("--max-sessions must be > 0")]
    ZeroSessions,
}

impl ServerConfig {
    pub fn new(host: &str, port: u16, max_sessions: usize) -> Result<Self, ConfigError> {
        let host = host
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(host.to_string()))?;
        if max_sessions == 0 {
            return Err(ConfigError::ZeroSessions);
        }
        Ok(Self {
            host,
            port,
            max_sessions,
        })
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid scenario: {0}")]
    InvalidScenario(#[from] ScenarioError),
    #[error("session {0} not found")]
    SessionNotFound(u64),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidScenario(_) => StatusCode::BAD_REQUEST,
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(target: "drill.api", status = status.as_u16(), error = %self, "request rejected");
        error_response(status, &self.to_string())
    }
}

/// Practice sessions keyed by id. Each entry is independent; the oldest is
/// evicted once the store is full.
#[derive(Debug)]
struct SessionStore {
    next_id: u64,
    max_sessions: usize,
    sessions: BTreeMap<u64, Session>,
}

impl SessionStore {
    fn new(max_sessions: usize) -> Self {
        Self {
            next_id: 1,
            max_sessions: max_sessions.max(1),
            sessions: BTreeMap::new(),
        }
    }

    fn insert(&mut self, session: Session) -> u64 {
        while self.sessions.len() >= self.max_sessions {
            if let Some((evicted, _)) = self.sessions.pop_first() {
                info!(target: "drill.sessions", session_id = evicted, "evicted oldest session");
            }
        }
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.insert(id, session);
        id
    }

    fn get(&self, id: u64) -> Result<&Session, ApiError> {
        self.sessions.get(&id).ok_or(ApiError::SessionNotFound(id))
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut Session, ApiError> {
        self.sessions
            .get_mut(&id)
            .ok_or(ApiError::SessionNotFound(id))
    }

    fn remove(&mut self, id: u64) -> Result<Session, ApiError> {
        self.sessions
            .remove(&id)
            .ok_or(ApiError::SessionNotFound(id))
    }
}

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<Mutex<SessionStore>>,
}

impl AppState {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(SessionStore::new(max_sessions))),
        }
    }

    fn store(&self) -> MutexGuard<'_, SessionStore> {
        // A poisoned store still holds whole sessions.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProblemPayload {
    seed: Option<u32>,
    base_seed: Option<u32>,
    problem_index: Option<u32>,
    difficulty: Option<Difficulty>,
    timing: Option<Timing>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TruthPayload {
    scenario: Scenario,
    #[serde(default)]
    timing: Option<Timing>,
}

/// Answers may arrive as typed text or as bare JSON numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawAnswer {
    Text(String),
    Number(f64),
}

impl RawAnswer {
    fn into_text(self) -> String {
        match self {
            RawAnswer::Text(text) => text,
            RawAnswer::Number(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GradePayload {
    method: Method,
    #[serde(default)]
    answers: BTreeMap<AnswerField, RawAnswer>,
    scenario: Scenario,
    #[serde(default)]
    timing: Option<Timing>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CreateSessionPayload {
    base_seed: Option<u32>,
    difficulty: Option<Difficulty>,
    timing: Option<Timing>,
    method: Option<Method>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SettingsPayload {
    difficulty: Option<Difficulty>,
    timing: Option<Timing>,
    method: Option<Method>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SessionGradePayload {
    answers: BTreeMap<AnswerField, RawAnswer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProblemRequest {
    seed: u32,
    base_seed: Option<u32>,
    problem_index: Option<u32>,
    difficulty: Difficulty,
    timing: Timing,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProblemResponse {
    seed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    problem_index: Option<u32>,
    difficulty: Difficulty,
    timing: Timing,
    persona: Persona,
    scenario: Scenario,
    truth: Truth,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GradeResponse {
    method: Method,
    all_correct: bool,
    verdicts: BTreeMap<AnswerField, Verdict>,
    fields: Vec<FieldGrade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<Stats>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    session_id: u64,
    base_seed: u32,
    problem_index: u32,
    seed: u32,
    difficulty: Difficulty,
    timing: Timing,
    method: Method,
    answer_fields: [AnswerField; 2],
    persona: Option<Persona>,
    scenario: Scenario,
    stats: Stats,
    accuracy: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionTruthResponse {
    session_id: u64,
    method: Method,
    truth: Truth,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/problem",
            get(problem_get_handler).post(problem_post_handler),
        )
        .route("/api/truth", post(truth_handler))
        .route("/api/grade", post(grade_handler))
        .route("/api/sessions", post(create_session_handler))
        .route(
            "/api/sessions/:id",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/api/sessions/:id/next", post(next_problem_handler))
        .route("/api/sessions/:id/scenario", put(replace_scenario_handler))
        .route("/api/sessions/:id/settings", put(settings_handler))
        .route("/api/sessions/:id/grade", post(session_grade_handler))
        .route("/api/sessions/:id/truth", get(session_truth_handler))
        .route("/api/sessions/:id/stats/reset", post(reset_stats_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(config: ServerConfig) -> std::io::Result<()> {
    let addr = SocketAddr::new(config.host, config.port);
    let app = create_router(AppState::new(config.max_sessions));

    let listener = TcpListener::bind(addr).await?;
    info!(
        target: "drill.api",
        %addr,
        max_sessions = config.max_sessions,
        "retirement drill API listening"
    );

    axum::serve(listener, app).await
}

/// Pretty JSON for one generated problem and its answers, as printed by the CLI.
pub fn render_problem(
    seed: u32,
    difficulty: Difficulty,
    timing: Timing,
) -> Result<String, serde_json::Error> {
    let request = ProblemRequest {
        seed,
        base_seed: None,
        problem_index: None,
        difficulty,
        timing,
    };
    serde_json::to_string_pretty(&build_problem_response(request))
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "OK" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn problem_get_handler(Query(payload): Query<ProblemPayload>) -> Response {
    problem_handler_impl(payload)
}

async fn problem_post_handler(Json(payload): Json<ProblemPayload>) -> Response {
    problem_handler_impl(payload)
}

fn problem_handler_impl(payload: ProblemPayload) -> Response {
    let request = problem_request_from_payload(payload);
    json_response(StatusCode::OK, build_problem_response(request))
}

async fn truth_handler(Json(payload): Json<TruthPayload>) -> Result<Response, ApiError> {
    payload.scenario.validate()?;
    let truth = compute_truth(&payload.scenario, payload.timing.unwrap_or_default());
    Ok(json_response(StatusCode::OK, truth))
}

async fn grade_handler(Json(payload): Json<GradePayload>) -> Result<Response, ApiError> {
    payload.scenario.validate()?;
    let truth = compute_truth(&payload.scenario, payload.timing.unwrap_or_default());
    let answers = answers_to_text(payload.answers);
    let result = grade(payload.method, &answers, &truth);
    Ok(json_response(StatusCode::OK, build_grade_response(result, None)))
}

async fn create_session_handler(
    State(state): State<AppState>,
    payload: Option<Json<CreateSessionPayload>>,
) -> Response {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let view = create_session(&state, payload);
    json_response(StatusCode::CREATED, view)
}

async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let store = state.store();
    let session = store.get(id)?;
    Ok(json_response(StatusCode::OK, session_view(id, session)))
}

async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    state.store().remove(id)?;
    info!(target: "drill.sessions", session_id = id, "session closed");
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn next_problem_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let mut store = state.store();
    let session = store.get_mut(id)?;
    session.next_problem();
    Ok(json_response(StatusCode::OK, session_view(id, session)))
}

async fn replace_scenario_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(scenario): Json<Scenario>,
) -> Result<Response, ApiError> {
    let mut store = state.store();
    let session = store.get_mut(id)?;
    session.replace_scenario(scenario)?;
    Ok(json_response(StatusCode::OK, session_view(id, session)))
}

async fn settings_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<SettingsPayload>,
) -> Result<Response, ApiError> {
    let mut store = state.store();
    let session = store.get_mut(id)?;
    apply_settings(session, payload);
    Ok(json_response(StatusCode::OK, session_view(id, session)))
}

async fn session_grade_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<SessionGradePayload>,
) -> Result<Response, ApiError> {
    let response = grade_session(&state, id, payload)?;
    Ok(json_response(StatusCode::OK, response))
}

async fn session_truth_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let store = state.store();
    let session = store.get(id)?;
    Ok(json_response(
        StatusCode::OK,
        SessionTruthResponse {
            session_id: id,
            method: session.method(),
            truth: *session.truth(),
        },
    ))
}

async fn reset_stats_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let mut store = state.store();
    let session = store.get_mut(id)?;
    session.reset_stats();
    Ok(json_response(StatusCode::OK, session_view(id, session)))
}

fn problem_request_from_payload(payload: ProblemPayload) -> ProblemRequest {
    let difficulty = payload.difficulty.unwrap_or(Difficulty::Normal);
    let timing = payload.timing.unwrap_or_default();

    match payload.seed {
        Some(seed) => ProblemRequest {
            seed,
            base_seed: None,
            problem_index: None,
            difficulty,
            timing,
        },
        None => {
            let base_seed = payload.base_seed.unwrap_or(DEFAULT_BASE_SEED);
            let problem_index = payload.problem_index.unwrap_or(0);
            ProblemRequest {
                seed: derive_seed(base_seed, problem_index),
                base_seed: Some(base_seed),
                problem_index: Some(problem_index),
                difficulty,
                timing,
            }
        }
    }
}

fn build_problem_response(request: ProblemRequest) -> ProblemResponse {
    let problem = generate_problem(request.seed, request.difficulty);
    let truth = compute_truth(&problem.scenario, request.timing);
    ProblemResponse {
        seed: problem.seed,
        base_seed: request.base_seed,
        problem_index: request.problem_index,
        difficulty: problem.difficulty,
        timing: request.timing,
        persona: problem.persona,
        scenario: problem.scenario,
        truth,
    }
}

fn session_config_from_payload(payload: CreateSessionPayload) -> SessionConfig {
    SessionConfig {
        base_seed: payload.base_seed.unwrap_or_else(rand::random::<u32>),
        difficulty: payload.difficulty.unwrap_or(Difficulty::Normal),
        timing: payload.timing.unwrap_or_default(),
        method: payload.method.unwrap_or_default(),
    }
}

fn create_session(state: &AppState, payload: CreateSessionPayload) -> SessionView {
    let config = session_config_from_payload(payload);
    let session = Session::new(config);
    let mut store = state.store();
    let id = store.insert(session.clone());
    info!(
        target: "drill.sessions",
        session_id = id,
        base_seed = config.base_seed,
        difficulty = ?config.difficulty,
        "session created"
    );
    session_view(id, &session)
}

fn apply_settings(session: &mut Session, payload: SettingsPayload) {
    if let Some(difficulty) = payload.difficulty {
        session.set_difficulty(difficulty);
    }
    if let Some(timing) = payload.timing {
        session.set_timing(timing);
    }
    if let Some(method) = payload.method {
        session.set_method(method);
    }
}

fn grade_session(
    state: &AppState,
    id: u64,
    payload: SessionGradePayload,
) -> Result<GradeResponse, ApiError> {
    let answers = answers_to_text(payload.answers);
    let mut store = state.store();
    let session = store.get_mut(id)?;
    let result = session.submit(&answers);
    info!(
        target: "drill.grader",
        session_id = id,
        method = ?result.method,
        correct = result.correct_count(),
        incorrect = result.incorrect_count(),
        "answers graded"
    );
    Ok(build_grade_response(result, Some(*session.stats())))
}

fn answers_to_text(answers: BTreeMap<AnswerField, RawAnswer>) -> BTreeMap<AnswerField, String> {
    answers
        .into_iter()
        .map(|(field, raw)| (field, raw.into_text()))
        .collect()
}

fn build_grade_response(result: Grade, stats: Option<Stats>) -> GradeResponse {
    GradeResponse {
        method: result.method,
        all_correct: result.all_correct(),
        verdicts: result.verdicts(),
        fields: result.fields,
        stats,
    }
}

fn session_view(id: u64, session: &Session) -> SessionView {
    SessionView {
        session_id: id,
        base_seed: session.base_seed(),
        problem_index: session.problem_index(),
        seed: session.current_seed(),
        difficulty: session.difficulty(),
        timing: session.timing(),
        method: session.method(),
        answer_fields: session.method().answer_fields(),
        persona: session.persona().cloned(),
        scenario: session.scenario().clone(),
        stats: *session.stats(),
        accuracy: session.stats().accuracy(),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
