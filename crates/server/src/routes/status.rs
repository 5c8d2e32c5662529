// crates/server/src/routes/status.rs
//! GET /status/{task_id} — SSE stream of one task's progress.
//!
//! Each task event is sent as `event: status` with the JSON payload of
//! [`StatusEvent`]; idle periods carry `: heartbeat` comments. The stream
//! ends after the event carrying a terminal status.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::routing::get;
use axum::Router;
use gencode_core::TaskId;
use tokio_util::sync::CancellationToken;

use crate::error::ApiResult;
use crate::session::{SessionEvent, StreamingSession};
use crate::state::AppState;

fn to_sse(event: SessionEvent) -> Event {
    match event {
        SessionEvent::Status(status) => {
            let json = serde_json::to_string(&status).unwrap_or_default();
            Event::default().event("status").data(json)
        }
        SessionEvent::Heartbeat => Event::default().comment("heartbeat"),
    }
}

/// Unknown tasks are answered with 404 before any stream is opened.
async fn stream_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let task_id = TaskId::from(task_id);
    let disconnect = CancellationToken::new();
    let session = StreamingSession::connect(
        &state.store,
        &state.hub,
        &task_id,
        state.heartbeat,
        disconnect.clone(),
    )?;

    // When the client goes away the transport drops this stream, which drops
    // the guard (cancelling the token) and the session together. The session's
    // Drop is what unregisters here; the token only wakes a caller that is
    // still awaiting `next_event`.
    let guard = disconnect.drop_guard();
    let stream = async_stream::stream! {
        let _guard = guard;
        let mut session = session;
        while let Some(event) = session.next_event().await {
            yield Ok(to_sse(event));
        }
    };

    Ok(Sse::new(stream))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/status/{task_id}", get(stream_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_state;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use gencode_core::{JobSpec, TaskStatus};
    use tower::ServiceExt;

    fn app(state: Arc<AppState>) -> Router {
        Router::new().nest("/api/v1", router()).with_state(state)
    }

    fn spec() -> JobSpec {
        JobSpec {
            prompt: "x".to_string(),
            repo_name: "y".to_string(),
            model: "deepseek".to_string(),
            github_org: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_task_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        let response = app(test_state(tmp.path()))
            .oneshot(
                Request::builder()
                    .uri("/api/v1/status/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_terminal_task_streams_final_event_and_ends() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        let task = state.store.create(spec()).unwrap();
        state.store.set_repo_url(&task.task_id, "https://github.com/me/y").unwrap();
        state
            .store
            .update_status(&task.task_id, TaskStatus::Completed, "done")
            .unwrap();

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/status/{}", task.task_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        // The body completes because the session closes on the terminal event.
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(
            text,
            "event: status\ndata: {\"status\":\"completed\",\"message\":\"done\",\"repo_url\":\"https://github.com/me/y\"}\n\n"
        );
        assert_eq!(state.hub.tracked_tasks().await, 0);
    }

    #[tokio::test]
    async fn test_dropping_response_unregisters_session() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        let task = state.store.create(spec()).unwrap();

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/status/{}", task.task_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.hub.subscriber_count(&task.task_id).await, 1);

        // Client went away before the task finished.
        drop(response);

        assert_eq!(state.hub.subscriber_count(&task.task_id).await, 0);
        assert_eq!(state.hub.tracked_tasks().await, 0);
    }

    #[test]
    fn test_heartbeat_is_a_comment() {
        let event = to_sse(SessionEvent::Heartbeat);
        assert!(format!("{event:?}").contains("heartbeat"));
    }
}
