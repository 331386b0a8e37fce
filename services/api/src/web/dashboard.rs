//! services/api/src/web/dashboard.rs
//!
//! The teacher dashboard's realtime socket. It holds a standing subscription to
//! exam changes for as long as the socket is open and answers every change by
//! re-querying the completed-exam list.

use crate::web::{
    middleware::{AuthSession, TeacherId},
    protocol::DashboardMessage,
    rest::ExamSummaryResponse,
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;
use vocab_exam_core::ports::PortError;

/// How often an idle dashboard re-checks that its auth session is still valid.
const SESSION_CHECK_PERIOD: Duration = Duration::from_secs(60);

pub async fn dashboard_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Extension(AuthSession(auth_session_id)): Extension<AuthSession>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, teacher_id, auth_session_id))
}

async fn handle_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    teacher_id: Uuid,
    auth_session_id: String,
) {
    info!("Dashboard connected for teacher {}", teacher_id);

    let (mut sender, mut receiver) = socket.split();
    let mut changes = app_state.notifier.subscribe();

    // The dashboard never sends anything meaningful; the reader only watches for the close.
    let closed = CancellationToken::new();
    let reader = {
        let closed = closed.clone();
        tokio::spawn(async move {
            while let Some(Ok(message)) = receiver.next().await {
                if matches!(message, Message::Close(_)) {
                    break;
                }
            }
            closed.cancel();
        })
    };

    let mut session_check = interval(SESSION_CHECK_PERIOD);
    session_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    session_check.tick().await;

    let mut next = Some(dashboard_update(&app_state, teacher_id, &auth_session_id).await);
    loop {
        if let Some(message) = next.take() {
            let expired = matches!(message, DashboardMessage::SessionExpired);
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize dashboard message: {}", e);
                    break;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            if expired {
                info!("Auth session expired; closing dashboard for teacher {}", teacher_id);
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }

        tokio::select! {
            _ = closed.cancelled() => break,
            change = changes.next() => match change {
                Some(_) => {
                    next = Some(dashboard_update(&app_state, teacher_id, &auth_session_id).await)
                }
                None => break,
            },
            _ = session_check.tick() => {
                if !session_is_valid(&app_state, &auth_session_id).await {
                    next = Some(DashboardMessage::SessionExpired);
                }
            }
        }
    }

    // Dropping `changes` releases the subscription.
    reader.abort();
    info!("Dashboard disconnected for teacher {}", teacher_id);
}

async fn session_is_valid(app_state: &AppState, auth_session_id: &str) -> bool {
    match app_state.db.validate_auth_session(auth_session_id).await {
        Ok(_) => true,
        Err(PortError::NotFound(_)) | Err(PortError::Unauthorized) => false,
        Err(e) => {
            // Store errors keep the dashboard open.
            warn!("Could not validate dashboard session: {}", e);
            true
        }
    }
}

/// The message a change should produce: the fresh exam list, or `SessionExpired`.
pub(crate) async fn dashboard_update(
    app_state: &AppState,
    teacher_id: Uuid,
    auth_session_id: &str,
) -> DashboardMessage {
    if !session_is_valid(app_state, auth_session_id).await {
        return DashboardMessage::SessionExpired;
    }
    match app_state.grader().list_exams(teacher_id).await {
        Ok(exams) => DashboardMessage::Exams {
            exams: exams.into_iter().map(ExamSummaryResponse::from).collect(),
        },
        Err(e) => {
            error!("Failed to reload exams for teacher {}: {}", teacher_id, e);
            DashboardMessage::Error {
                message: "Failed to load exams".to_string(),
            }
        }
    }
}
