//! services/api/src/web/ws_handler.rs
//!
//! This is the entry point and control loop for a student's exam WebSocket.
//! Each connection owns one `ExamFlow`; the countdown is driven by a wall-clock
//! interval that is polled alongside incoming frames, so a session only ever
//! has one logical thread of control.

use crate::error::exam_error_response;
use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use vocab_exam_core::{ExamFlow, ExamResult, FlowUpdate};

/// The handler for upgrading student HTTP requests to exam WebSocket connections.
pub async fn exam_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// What woke up the connection loop.
enum Event {
    Frame(String),
    Tick,
    Closed,
    Ignored,
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New exam WebSocket connection established.");

    let (sender, receiver) = socket.split();
    let mut flow = app_state.exam_flow();
    run_exam(&mut flow, receiver, sender, app_state.config.tick_interval).await;

    // Dropping the flow abandons an unfinished exam; the answers saved so far stay stored.
    match flow.session().exam_id() {
        Some(exam_id) if !flow.session().is_completed() => {
            info!("Student disconnected during exam {}", exam_id)
        }
        _ => info!("Exam WebSocket connection closed."),
    }
}

/// Polls client frames and the countdown until the client goes away. The
/// countdown only runs while an exam is in progress.
pub(crate) async fn run_exam<R, W>(
    flow: &mut ExamFlow,
    mut receiver: R,
    mut sender: W,
    tick_interval: Duration,
) where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
    W: Sink<Message> + Unpin,
{
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let in_progress = flow.session().is_in_progress();
        let event = tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => Event::Frame(text.to_string()),
                Some(Ok(Message::Close(_))) | None => Event::Closed,
                Some(Ok(_)) => Event::Ignored,
                Some(Err(e)) => {
                    warn!("Exam socket receive error: {}", e);
                    Event::Closed
                }
            },
            _ = ticker.tick(), if in_progress => Event::Tick,
        };

        let messages = match event {
            Event::Frame(text) => handle_text_message(flow, &text).await,
            Event::Tick => to_messages(flow.tick().await),
            Event::Closed => break,
            Event::Ignored => continue,
        };

        // A newly presented word gets a full first second.
        if messages
            .iter()
            .any(|m| matches!(m, ServerMessage::WordPresented { .. }))
        {
            ticker.reset();
        }

        if !send_all(&mut sender, &messages).await {
            break;
        }
    }
}

/// Applies one client frame to the flow and returns the frames to send back.
pub(crate) async fn handle_text_message(flow: &mut ExamFlow, text: &str) -> Vec<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Start {
            word_set_id,
            student_name,
        }) => to_messages(flow.start(word_set_id, &student_name).await),
        Ok(ClientMessage::Draft { text }) => {
            flow.update_draft(&text);
            Vec::new()
        }
        Ok(ClientMessage::Submit { sentence }) => {
            to_messages(flow.submit(sentence.as_deref()).await)
        }
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            vec![ServerMessage::Error {
                message: "Unrecognized message".to_string(),
            }]
        }
    }
}

fn to_messages(result: ExamResult<Vec<FlowUpdate>>) -> Vec<ServerMessage> {
    match result {
        Ok(updates) => updates.into_iter().map(ServerMessage::from).collect(),
        Err(e) => {
            debug!("Exam operation rejected: {}", e);
            let (_, message) = exam_error_response(e);
            vec![ServerMessage::Error { message }]
        }
    }
}

/// Sends frames in order. Returns `false` once the client is gone.
async fn send_all<W>(sender: &mut W, messages: &[ServerMessage]) -> bool
where
    W: Sink<Message> + Unpin,
{
    for message in messages {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server message: {}", e);
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            info!("Client disconnected.");
            return false;
        }
    }
    true
}
