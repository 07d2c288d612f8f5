//! HTTP routes for task operations
//!
//! All routes sit behind the session gate:
//! - POST /tasks/create    - Create a task (notifies the assignee)
//! - GET  /tasks           - Tasks assigned to the caller
//! - PUT  /tasks/{id}/done - Mark a task done (assignee only)

use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::authenticate;
use crate::db::schemas::TaskDoc;
use crate::notify::Notifier;
use crate::routes::helpers::{
    error_response, error_to_response, json_response, parse_json_body, BoxBody, MessageResponse,
};
use crate::server::AppState;
use crate::tasks::TaskService;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_to: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    pub message: String,
    pub id: String,
    pub task: TaskDoc,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /tasks/create
async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state.signer) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let body: CreateTaskRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e)),
    };

    let service = match task_service(&state) {
        Some(s) => s,
        None => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create task"),
    };

    match service
        .create(&ctx.username, &body.title, &body.description, &body.assigned_to)
        .await
    {
        Ok(task) => {
            let id = task._id.map(|o| o.to_hex()).unwrap_or_default();
            json_response(
                StatusCode::OK,
                &CreateTaskResponse {
                    message: "Task created".into(),
                    id,
                    task,
                },
            )
        }
        Err(e) => error_to_response(e),
    }
}

/// GET /tasks
async fn handle_list(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state.signer) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let service = match task_service(&state) {
        Some(s) => s,
        None => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch tasks"),
    };

    match service.list_for_user(&ctx.username).await {
        Ok(tasks) => json_response(StatusCode::OK, &tasks),
        Err(e) => error_to_response(e),
    }
}

/// PUT /tasks/{id}/done
async fn handle_mark_done(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    task_id: &str,
) -> Response<BoxBody> {
    let ctx = match authenticate(&req, &state.signer) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let service = match task_service(&state) {
        Some(s) => s,
        None => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update task"),
    };

    match service.mark_done(&ctx.username, task_id).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &MessageResponse {
                message: "Task marked as done".into(),
            },
        ),
        Err(e) => error_to_response(e),
    }
}

fn task_service(state: &AppState) -> Option<TaskService> {
    let mongo = state.mongo.as_ref()?.clone();
    Some(TaskService::new(
        mongo,
        Notifier::new(Arc::clone(&state.registry)),
    ))
}

// =============================================================================
// Router
// =============================================================================

/// Handle task-related HTTP requests.
///
/// Returns Some(response) if the request was handled, None otherwise.
pub async fn handle_task_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    let response = match (&method, path.as_str()) {
        (&Method::POST, "/tasks/create") => handle_create(req, state).await,
        (&Method::GET, "/tasks") => handle_list(req, state).await,

        (&Method::PUT, p) if p.starts_with("/tasks/") && p.ends_with("/done") => {
            let task_id = p
                .strip_prefix("/tasks/")
                .and_then(|rest| rest.strip_suffix("/done"))
                .unwrap_or("");
            if task_id.is_empty() {
                error_response(StatusCode::BAD_REQUEST, "Missing task ID")
            } else {
                let task_id = task_id.to_string();
                handle_mark_done(req, state, &task_id).await
            }
        }

        (_, "/tasks") | (_, "/tasks/create") => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }

        _ => return None,
    };

    Some(response)
}
