// crates/server/src/routes/tasks.rs
//! Task submission and lookup.
//!
//! - POST /generate — submit a job, returns immediately with its id
//! - GET /task/{task_id} — current snapshot of one task
//! - GET /tasks — every task that has not finished yet

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use gencode_core::{JobSpec, Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GitHub's limit on repository name length.
const MAX_REPO_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub repo_name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub github_org: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct GenerateResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub message: String,
}

/// POST /api/v1/generate — validate, create the task, start the job.
async fn generate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateResponse>> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let spec = validate(&state, req)?;

    let task = state.store.create(spec)?;
    crate::metrics::record_task_created();
    tracing::info!(
        task_id = %task.task_id,
        model = %task.model,
        repo = %task.repo_name,
        "Task submitted"
    );
    state.generator.spawn(task.task_id.clone());

    Ok(Json(GenerateResponse {
        task_id: task.task_id,
        status: task.status,
        message: task.message,
    }))
}

fn validate(state: &AppState, req: GenerateRequest) -> ApiResult<JobSpec> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("prompt is required".to_string()));
    }

    let repo_name = req.repo_name.trim();
    if !is_valid_repo_name(repo_name) {
        return Err(ApiError::BadRequest(format!(
            "invalid repo_name '{repo_name}': use 1-{MAX_REPO_NAME_LEN} letters, digits, '-', '_' or '.'"
        )));
    }

    let model = req
        .model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| state.default_model.clone());
    if !state.generator.has_model(&model) {
        let known: Vec<&str> = state.generator.providers().keys().collect();
        return Err(ApiError::BadRequest(format!(
            "invalid model '{model}', must be one of: {}",
            known.join(", ")
        )));
    }

    let github_org = req
        .github_org
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty());

    Ok(JobSpec {
        prompt: prompt.to_string(),
        repo_name: repo_name.to_string(),
        model,
        github_org,
    })
}

fn is_valid_repo_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_REPO_NAME_LEN
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// GET /api/v1/task/{task_id}
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.store.get(&TaskId::from(task_id))?))
}

/// GET /api/v1/tasks — newest first.
async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    Json(state.store.active())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate", post(generate))
        .route("/task/{task_id}", get(get_task))
        .route("/tasks", get(list_tasks))
}
