//! Student tutor endpoints backed by the chat session controller.

use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures_util::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use super::{success, ApiResult};
use crate::auth::CurrentSession;
use crate::chat::{ChatController, SessionId, TurnEvent, TurnMode};
use crate::dashboard;
use crate::errors::AppError;
use crate::models::{
    ChatContext, EstablishSessionRequest, Identity, SessionSnapshot, TurnRequest, UserRole,
};
use crate::AppState;

fn student(current: &CurrentSession) -> Result<&Identity, AppError> {
    current.session.require_role(&[UserRole::Student])
}

async fn active_controller(
    state: &AppState,
    student_id: &str,
) -> Result<Arc<ChatController>, AppError> {
    state
        .chats
        .get(student_id)
        .await
        .ok_or_else(|| AppError::NotFound("No active tutoring session".to_string()))
}

fn target_session(controller: &ChatController, request: &TurnRequest) -> Result<SessionId, AppError> {
    request
        .session_id
        .or_else(|| controller.active_session_id())
        .ok_or_else(|| AppError::NotFound("No active tutoring session".to_string()))
}

/// POST /api/tutor/session - Start a fresh conversation for a learning context.
///
/// Resource level defaults to the student's school tier and customization to
/// the guidance saved by their teacher.
pub async fn establish_session(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<EstablishSessionRequest>,
) -> ApiResult<SessionSnapshot> {
    let identity = student(&current)?;
    let gateway = state.gateway()?;

    let resource_level = request
        .resource_level
        .unwrap_or_else(|| dashboard::student_resource_level(&identity.school_id));
    let customization = match request.customization {
        Some(text) => Some(text),
        None => {
            let teacher_id = dashboard::teacher_id_for_student(&identity.id);
            state.kv.customization(&teacher_id).await?
        }
    };
    let context = ChatContext::new(
        request.grade_level,
        &request.subject,
        resource_level,
        customization,
    )?;

    let controller = state.chats.get_or_create(&identity.id, gateway).await;
    success(controller.establish_session(context))
}

/// GET /api/tutor/session - The active conversation.
pub async fn get_session(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<SessionSnapshot> {
    let identity = student(&current)?;
    let snapshot = active_controller(&state, &identity.id)
        .await?
        .snapshot()
        .ok_or_else(|| AppError::NotFound("No active tutoring session".to_string()))?;
    success(snapshot)
}

/// DELETE /api/tutor/session - Discard the active conversation.
pub async fn end_session(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<bool> {
    let identity = student(&current)?;
    let ended = match state.chats.get(&identity.id).await {
        Some(controller) => controller.teardown(),
        None => false,
    };
    success(ended)
}

/// POST /api/tutor/session/turns - Ask a question and wait for the whole answer.
///
/// The answer is fetched in one request rather than streamed. The turn runs on
/// its own task, so a client that hangs up does not cut the answer short; it is
/// in the transcript on the next read.
pub async fn send_turn(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<TurnRequest>,
) -> ApiResult<SessionSnapshot> {
    let identity = student(&current)?;
    let controller = active_controller(&state, &identity.id).await?;
    let session_id = target_session(&controller, &request)?;

    let pending = controller.begin_turn(session_id, &request.text)?;
    tokio::spawn(pending.run_as(TurnMode::Whole))
        .await
        .map_err(|e| AppError::Internal(format!("Chat turn task failed: {}", e)))?;

    let snapshot = controller
        .snapshot()
        .ok_or_else(|| AppError::NotFound("No active tutoring session".to_string()))?;
    success(snapshot)
}

/// POST /api/tutor/session/turns/stream - Ask a question and receive the answer
/// as server-sent events: `fragment`* then one of `completed`, `failed` or
/// `cancelled`.
pub async fn stream_turn(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<TurnRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let identity = student(&current)?;
    let controller = active_controller(&state, &identity.id).await?;
    let session_id = target_session(&controller, &request)?;

    let pending = controller.begin_turn(session_id, &request.text)?;
    let events = controller.subscribe();
    tokio::spawn(pending.run());

    Ok(Sse::new(turn_events(events, session_id)).keep_alive(KeepAlive::default()))
}

fn event_name(event: &TurnEvent) -> &'static str {
    match event {
        TurnEvent::Fragment { .. } => "fragment",
        TurnEvent::Completed { .. } => "completed",
        TurnEvent::Failed { .. } => "failed",
        TurnEvent::Cancelled { .. } => "cancelled",
    }
}

/// Relay one session's events up to and including its terminal event.
fn turn_events(
    events: broadcast::Receiver<TurnEvent>,
    session_id: SessionId,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    futures_util::stream::unfold(Some(events), move |events| async move {
        let mut events = events?;
        loop {
            match events.recv().await {
                Ok(event) if event.session_id() != session_id => continue,
                Ok(event) => {
                    let sse = Event::default().event(event_name(&event)).json_data(&event);
                    let next = if event.is_terminal() { None } else { Some(events) };
                    return Some((sse, next));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("SSE relay for session {} skipped {} events", session_id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}
