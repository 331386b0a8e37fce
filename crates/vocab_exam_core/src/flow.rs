//! crates/vocab_exam_core/src/flow.rs
//!
//! Drives one student's exam: owns the `ExamSession` value, feeds it ticks and
//! drafts, and performs the persistence each transition requires.

use crate::domain::Exam;
use crate::error::{ExamError, ExamResult};
use crate::ports::{DatabaseService, ExamChange, ExamNotifier};
use crate::session::{Advance, ExamSession, PendingAnswer, TickOutcome};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// What the transport should tell the student after a flow operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowUpdate {
    Started {
        exam_id: Uuid,
        total_words: u32,
    },
    WordPresented {
        word_index: usize,
        total_words: u32,
        word_text: String,
        time_limit_seconds: u32,
    },
    Tick {
        time_left: u32,
    },
    AnswerRecorded {
        word_index: usize,
        time_taken_seconds: u32,
    },
    Completed {
        exam_id: Uuid,
    },
}

pub struct ExamFlow {
    db: Arc<dyn DatabaseService>,
    notifier: Arc<dyn ExamNotifier>,
    session: ExamSession,
}

impl ExamFlow {
    pub fn new(db: Arc<dyn DatabaseService>, notifier: Arc<dyn ExamNotifier>) -> Self {
        Self {
            db,
            notifier,
            session: ExamSession::NotStarted,
        }
    }

    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    /// Loads the word set and creates the exam row. No row is created for an empty set.
    pub async fn start(
        &mut self,
        word_set_id: Uuid,
        student_name: &str,
    ) -> ExamResult<Vec<FlowUpdate>> {
        if !matches!(self.session, ExamSession::NotStarted) {
            return Err(ExamError::Validation(
                "An exam has already been started on this connection".to_string(),
            ));
        }
        let student_name = student_name.trim();
        if student_name.is_empty() {
            return Err(ExamError::Validation(
                "Please enter your name".to_string(),
            ));
        }

        let word_set = self.db.get_word_set(word_set_id).await?;
        let words = self.db.list_words(word_set.id).await?;
        if words.is_empty() {
            return Err(ExamError::EmptyWordSet(word_set.id));
        }

        let exam: Exam = self
            .db
            .create_exam(word_set.id, student_name, words.len() as u32, Utc::now())
            .await?;
        self.session = ExamSession::begin(exam.id, words)?;
        self.notifier.notify(ExamChange::Inserted {
            exam_id: exam.id,
            word_set_id: exam.word_set_id,
        });
        info!(
            "Exam {} started by '{}' on word set '{}' ({} words)",
            exam.id, exam.student_name, word_set.name, exam.total_words
        );

        let mut updates = vec![FlowUpdate::Started {
            exam_id: exam.id,
            total_words: exam.total_words,
        }];
        updates.extend(self.presented());
        Ok(updates)
    }

    pub fn update_draft(&mut self, text: &str) {
        self.session = self.session.with_draft(text);
    }

    /// One elapsed second. An expiring countdown submits whatever the draft holds.
    pub async fn tick(&mut self) -> ExamResult<Vec<FlowUpdate>> {
        let (next, outcome) = self.session.tick();
        self.session = next;
        match outcome {
            TickOutcome::Counting { time_left } => Ok(vec![FlowUpdate::Tick { time_left }]),
            TickOutcome::Expired(pending) => {
                let mut updates = vec![FlowUpdate::Tick { time_left: 0 }];
                updates.extend(self.record(pending).await?);
                Ok(updates)
            }
            TickOutcome::Idle => Ok(Vec::new()),
        }
    }

    /// Explicit submission. A provided sentence replaces the current draft.
    pub async fn submit(&mut self, sentence: Option<&str>) -> ExamResult<Vec<FlowUpdate>> {
        if let Some(sentence) = sentence {
            self.update_draft(sentence);
        }
        let pending = self.session.pending_answer()?;
        self.record(pending).await
    }

    // The session only moves on after the answer is stored; a failed save leaves
    // the same word current so the student can submit again.
    async fn record(&mut self, pending: PendingAnswer) -> ExamResult<Vec<FlowUpdate>> {
        let word_index = pending.word_index;
        let word_id = pending.word_id;
        let saved = self
            .db
            .save_exam_answer(pending.into_new_answer(Utc::now()))
            .await
            .map_err(|e| {
                warn!("Failed to save answer for word {}: {}", word_id, e);
                ExamError::from(e)
            })?;

        let (next, advance) = self.session.advance(word_id)?;
        let mut updates = vec![FlowUpdate::AnswerRecorded {
            word_index,
            time_taken_seconds: saved.time_taken_seconds,
        }];

        match advance {
            Advance::NextWord { .. } => {
                self.session = next;
                updates.extend(self.presented());
            }
            Advance::Finished { exam_id } => {
                let exam = self.db.complete_exam(exam_id, Utc::now()).await?;
                self.session = next;
                self.notifier.notify(ExamChange::Completed {
                    exam_id,
                    word_set_id: exam.word_set_id,
                });
                info!("Exam {} completed", exam_id);
                updates.push(FlowUpdate::Completed { exam_id });
            }
        }
        Ok(updates)
    }

    fn presented(&self) -> Option<FlowUpdate> {
        let word = self.session.current_word()?;
        Some(FlowUpdate::WordPresented {
            word_index: self.session.word_index()?,
            total_words: self.session.total_words(),
            word_text: word.text.clone(),
            time_limit_seconds: word.time_limit_seconds,
        })
    }
}
