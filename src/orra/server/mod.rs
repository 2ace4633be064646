// SPDX-License-Identifier: MIT

//! HTTP endpoints for a compiled workflow
//!
//! - `GET  /health`       liveness
//! - `GET  /flow`         step names and flow description
//! - `POST /flow`         run the compiled plan
//! - `POST /flow/{step}`  run a single step on its own

use axum::{
    extract::{rejection::JsonRejection, Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::OrraConfig;
use crate::error::{OrraError, ValidationError};
use crate::orra::graph::{Invocable, Plan};
use crate::orra::orchestrator::Orra;
use crate::orra::state::{State, StateSchema};
use crate::orra::step::StepHandle;

const CANCELLED_DETAIL: &str = "CancelledError: An operation was cancelled.";
const INTERRUPTED_DETAIL: &str = "KeyboardInterrupt: Ctrl+C was pressed.";

#[derive(Clone)]
struct AppState {
    plan: Arc<Plan>,
    steps: Arc<HashMap<String, StepHandle>>,
    order: Arc<Vec<String>>,
    schema: Arc<StateSchema>,
    /// Cancelled on shutdown; every invocation runs under a child token
    shutdown: CancellationToken,
}

/// Build the router for a compiled application.
///
/// Fails with [`OrraError::NotCompiled`] if `orra` has not been compiled, so
/// a missing compile step shows up at startup rather than on first request.
pub fn router(orra: &Orra, shutdown: CancellationToken) -> Result<Router, OrraError> {
    let plan = orra.plan()?;
    let handles = orra.step_handles();

    let state = AppState {
        plan,
        order: Arc::new(handles.iter().map(|h| h.name().to_string()).collect()),
        steps: Arc::new(
            handles
                .into_iter()
                .map(|h| (h.name().to_string(), h))
                .collect(),
        ),
        schema: orra.schema().clone(),
        shutdown,
    };

    Ok(Router::new()
        .route("/health", get(health_check))
        .route("/flow", get(describe_flow).post(run_flow))
        .route("/flow/{step}", post(run_step))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state))
}

/// Serve `orra` until `shutdown` is cancelled.
///
/// Invocations still running at shutdown are cancelled and answered with a
/// cancellation error before the listener closes.
pub async fn serve(
    orra: &Orra,
    config: &OrraConfig,
    shutdown: CancellationToken,
) -> Result<(), OrraError> {
    let app = router(orra, shutdown.clone())?;

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    log::info!("Listening on {}", config.base_url());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn describe_flow(AxumState(app): AxumState<AppState>) -> Json<Value> {
    Json(json!({
        "flow": app.plan.describe(),
        "steps": app.order.as_slice(),
    }))
}

async fn run_flow(
    AxumState(app): AxumState<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let state = app.schema.validate(body(payload)?)?;
    log::info!("Running workflow: {}", app.plan.describe());

    let output = run_cancellable(app.plan.clone(), state, &app.shutdown).await?;
    Ok(Json(output.into_json()))
}

async fn run_step(
    AxumState(app): AxumState<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let handle = app
        .steps
        .get(&name)
        .cloned()
        .ok_or(ApiError::StepNotFound(name))?;
    let state = app.schema.validate(body(payload)?)?;
    log::info!("Running step: {}", handle.name());

    let output = run_cancellable(Arc::new(handle), state, &app.shutdown).await?;
    Ok(Json(output.into_json()))
}

/// Unreadable bodies are reported like any other validation failure
fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ValidationError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ValidationError::single(rejection.body_text()))
}

/// Run `target` on its own task under a child of the shutdown token.
///
/// axum drops the handler future when the client goes away; the drop guard
/// then cancels the child token and the invocation stops at its next
/// suspension point instead of running on unobserved. A run cut short by
/// server shutdown is reported as an interrupt rather than a cancellation.
async fn run_cancellable(
    target: Arc<dyn Invocable>,
    state: State,
    shutdown: &CancellationToken,
) -> Result<State, ApiError> {
    let cancel = shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    let name = target.name().to_string();

    let task = tokio::spawn(async move { target.call(state, cancel).await });
    match task.await {
        Ok(Err(e)) if e.is_cancelled() && shutdown.is_cancelled() => Err(ApiError::Interrupted),
        Ok(result) => Ok(result?),
        Err(e) => {
            log::error!("Invocation of {} aborted: {}", name, e);
            Err(OrraError::step(name, e).into())
        }
    }
}

/// Error response for the HTTP surface
#[derive(Debug)]
pub enum ApiError {
    StepNotFound(String),
    /// The server shut down while the invocation was running
    Interrupted,
    Orra(OrraError),
}

impl From<OrraError> for ApiError {
    fn from(err: OrraError) -> Self {
        Self::Orra(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Orra(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::StepNotFound(name) => (
                StatusCode::NOT_FOUND,
                json!(format!("Step '{}' not found", name)),
            ),
            ApiError::Interrupted => {
                log::warn!("Ctrl+C was pressed, invocation interrupted");
                (StatusCode::BAD_REQUEST, json!(INTERRUPTED_DETAIL))
            }
            ApiError::Orra(OrraError::Validation(err)) => {
                let fields: Vec<Value> = err
                    .errors
                    .iter()
                    .map(|e| {
                        let mut loc = vec!["body".to_string()];
                        loc.extend(e.loc.iter().cloned());
                        json!({ "loc": loc, "msg": e.msg })
                    })
                    .collect();
                (StatusCode::UNPROCESSABLE_ENTITY, json!(fields))
            }
            ApiError::Orra(OrraError::Cancelled { step }) => {
                log::warn!(
                    "An operation was cancelled{}",
                    step.map(|s| format!(" during step {}", s))
                        .unwrap_or_default()
                );
                (StatusCode::BAD_REQUEST, json!(CANCELLED_DETAIL))
            }
            ApiError::Orra(err) => {
                log::error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, json!(err.to_string()))
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
