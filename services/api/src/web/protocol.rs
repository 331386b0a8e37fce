//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocols: the student exam socket and the
//! teacher dashboard socket. All frames are JSON text tagged by `type`.

use crate::web::rest::ExamSummaryResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vocab_exam_core::FlowUpdate;

//=========================================================================================
// Student Exam Socket: Client -> Server
//=========================================================================================

/// Represents the structured text messages a student client can send to the server.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts an exam. Only valid once per connection.
    Start {
        word_set_id: Uuid,
        student_name: String,
    },

    /// The student's current sentence for the word on screen. Submitted as-is if time runs out.
    Draft { text: String },

    /// Submits the answer for the current word. A provided sentence replaces the draft.
    Submit {
        #[serde(default)]
        sentence: Option<String>,
    },
}

//=========================================================================================
// Student Exam Socket: Server -> Client
//=========================================================================================

/// Represents the structured text messages the server can send to a student.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ExamStarted {
        exam_id: Uuid,
        total_words: u32,
    },

    WordPresented {
        word_index: usize,
        total_words: u32,
        word_text: String,
        time_limit_seconds: u32,
    },

    /// One second of the current word's countdown has elapsed.
    Tick { time_left: u32 },

    AnswerRecorded {
        word_index: usize,
        time_taken_seconds: u32,
    },

    ExamCompleted { exam_id: Uuid },

    /// Reports an error. The connection stays open and the exam state is unchanged.
    Error { message: String },
}

impl From<FlowUpdate> for ServerMessage {
    fn from(update: FlowUpdate) -> Self {
        match update {
            FlowUpdate::Started {
                exam_id,
                total_words,
            } => ServerMessage::ExamStarted {
                exam_id,
                total_words,
            },
            FlowUpdate::WordPresented {
                word_index,
                total_words,
                word_text,
                time_limit_seconds,
            } => ServerMessage::WordPresented {
                word_index,
                total_words,
                word_text,
                time_limit_seconds,
            },
            FlowUpdate::Tick { time_left } => ServerMessage::Tick { time_left },
            FlowUpdate::AnswerRecorded {
                word_index,
                time_taken_seconds,
            } => ServerMessage::AnswerRecorded {
                word_index,
                time_taken_seconds,
            },
            FlowUpdate::Completed { exam_id } => ServerMessage::ExamCompleted { exam_id },
        }
    }
}

//=========================================================================================
// Teacher Dashboard Socket: Server -> Client
//=========================================================================================

/// Messages pushed to a teacher's dashboard. The dashboard never sends anything.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// The full list of completed exams, sent on connect and after every change.
    Exams { exams: Vec<ExamSummaryResponse> },

    /// The auth session is gone. The server closes the socket after this message.
    SessionExpired,

    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let id = Uuid::new_v4();
        let start: ClientMessage = serde_json::from_value(json!({
            "type": "start",
            "word_set_id": id,
            "student_name": "Ana"
        }))
        .unwrap();
        assert_eq!(
            start,
            ClientMessage::Start {
                word_set_id: id,
                student_name: "Ana".to_string()
            }
        );

        let submit: ClientMessage = serde_json::from_value(json!({ "type": "submit" })).unwrap();
        assert_eq!(submit, ClientMessage::Submit { sentence: None });
    }

    #[test]
    fn flow_updates_become_tagged_frames() {
        let exam_id = Uuid::new_v4();
        let frame = serde_json::to_value(ServerMessage::from(FlowUpdate::Completed { exam_id }))
            .unwrap();
        assert_eq!(frame, json!({ "type": "exam_completed", "exam_id": exam_id }));

        let frame = serde_json::to_value(ServerMessage::from(FlowUpdate::Tick { time_left: 7 }))
            .unwrap();
        assert_eq!(frame, json!({ "type": "tick", "time_left": 7 }));
    }

    #[test]
    fn session_expired_has_no_payload() {
        let frame = serde_json::to_value(DashboardMessage::SessionExpired).unwrap();
        assert_eq!(frame, json!({ "type": "session_expired" }));
    }
}
