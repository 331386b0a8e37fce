//! crates/vocab_exam_core/src/session.rs
//!
//! The timed exam session as an explicit state machine value.
//!
//! Every transition takes the current `ExamSession` by reference and returns the
//! next one. Nothing here touches the clock or the database: a driver feeds it
//! one `tick` per elapsed second, persists the `PendingAnswer` it hands out, and
//! only calls `advance` once that answer is stored.

use crate::domain::{NewExamAnswer, Word, NO_ANSWER_PLACEHOLDER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("the word set has no words")]
    EmptyWordSet,
    #[error("no exam is in progress")]
    NotInProgress,
    #[error("answer for word {0} does not belong to the current word")]
    StaleAnswer(Uuid),
    #[error("inconsistent exam session: {0}")]
    Inconsistent(String),
}

/// Progress through the words of a started exam. `word_index` always points
/// at a word and `time_left` never exceeds that word's limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ActiveExamFields")]
pub struct ActiveExam {
    exam_id: Uuid,
    words: Vec<Word>,
    word_index: usize,
    time_left: u32,
    draft: String,
}

#[derive(Deserialize)]
struct ActiveExamFields {
    exam_id: Uuid,
    words: Vec<Word>,
    word_index: usize,
    time_left: u32,
    draft: String,
}

impl TryFrom<ActiveExamFields> for ActiveExam {
    type Error = SessionError;

    fn try_from(fields: ActiveExamFields) -> Result<Self, Self::Error> {
        let word = fields.words.get(fields.word_index).ok_or_else(|| {
            SessionError::Inconsistent(format!(
                "word index {} is outside {} words",
                fields.word_index,
                fields.words.len()
            ))
        })?;
        if fields.time_left > word.time_limit_seconds {
            return Err(SessionError::Inconsistent(format!(
                "{} seconds left on a {} second word",
                fields.time_left, word.time_limit_seconds
            )));
        }
        Ok(ActiveExam {
            exam_id: fields.exam_id,
            words: fields.words,
            word_index: fields.word_index,
            time_left: fields.time_left,
            draft: fields.draft,
        })
    }
}

impl ActiveExam {
    fn current(&self) -> &Word {
        &self.words[self.word_index]
    }

    fn pending(&self) -> PendingAnswer {
        let word = self.current();
        let trimmed = self.draft.trim();
        let sentence = if trimmed.is_empty() {
            NO_ANSWER_PLACEHOLDER.to_string()
        } else {
            trimmed.to_string()
        };
        PendingAnswer {
            exam_id: self.exam_id,
            word_id: word.id,
            word_text: word.text.clone(),
            word_index: self.word_index,
            sentence,
            time_taken_seconds: word.time_limit_seconds.saturating_sub(self.time_left),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExamSession {
    #[default]
    NotStarted,
    InProgress(ActiveExam),
    Completed { exam_id: Uuid, answered: u32 },
}

/// The answer the session would record for the current word right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnswer {
    pub exam_id: Uuid,
    pub word_id: Uuid,
    pub word_text: String,
    pub word_index: usize,
    pub sentence: String,
    pub time_taken_seconds: u32,
}

impl PendingAnswer {
    pub fn into_new_answer(self, submitted_at: DateTime<Utc>) -> NewExamAnswer {
        NewExamAnswer {
            exam_id: self.exam_id,
            word_id: self.word_id,
            word_text: self.word_text,
            student_sentence: self.sentence,
            time_taken_seconds: self.time_taken_seconds,
            submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The countdown moved on and is still running.
    Counting { time_left: u32 },
    /// The countdown just hit zero; the answer must be submitted.
    Expired(PendingAnswer),
    /// Nothing to count: not started, completed, or already expired.
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    NextWord { word_index: usize, time_left: u32 },
    Finished { exam_id: Uuid },
}

impl ExamSession {
    /// Starts presenting `words` in `order_index` order.
    pub fn begin(exam_id: Uuid, mut words: Vec<Word>) -> Result<Self, SessionError> {
        words.sort_by_key(|w| w.order_index);
        let first = words.first().ok_or(SessionError::EmptyWordSet)?;
        let time_left = first.time_limit_seconds;
        Ok(ExamSession::InProgress(ActiveExam {
            exam_id,
            words,
            word_index: 0,
            time_left,
            draft: String::new(),
        }))
    }

    /// Advances the clock by one second.
    pub fn tick(&self) -> (Self, TickOutcome) {
        match self {
            ExamSession::InProgress(active) if active.time_left > 0 => {
                let mut next = active.clone();
                next.time_left -= 1;
                let outcome = if next.time_left == 0 {
                    TickOutcome::Expired(next.pending())
                } else {
                    TickOutcome::Counting {
                        time_left: next.time_left,
                    }
                };
                (ExamSession::InProgress(next), outcome)
            }
            other => (other.clone(), TickOutcome::Idle),
        }
    }

    /// Replaces the student's sentence draft for the current word.
    pub fn with_draft(&self, text: &str) -> Self {
        match self {
            ExamSession::InProgress(active) => {
                let mut next = active.clone();
                next.draft = text.to_string();
                ExamSession::InProgress(next)
            }
            other => other.clone(),
        }
    }

    pub fn pending_answer(&self) -> Result<PendingAnswer, SessionError> {
        match self {
            ExamSession::InProgress(active) => Ok(active.pending()),
            _ => Err(SessionError::NotInProgress),
        }
    }

    /// Moves past the current word once its answer (`recorded_word_id`) is stored.
    pub fn advance(&self, recorded_word_id: Uuid) -> Result<(Self, Advance), SessionError> {
        let active = match self {
            ExamSession::InProgress(active) => active,
            _ => return Err(SessionError::NotInProgress),
        };
        if active.current().id != recorded_word_id {
            return Err(SessionError::StaleAnswer(recorded_word_id));
        }

        let next_index = active.word_index + 1;
        match active.words.get(next_index) {
            Some(word) => {
                let time_left = word.time_limit_seconds;
                let next = ActiveExam {
                    exam_id: active.exam_id,
                    words: active.words.clone(),
                    word_index: next_index,
                    time_left,
                    draft: String::new(),
                };
                Ok((
                    ExamSession::InProgress(next),
                    Advance::NextWord {
                        word_index: next_index,
                        time_left,
                    },
                ))
            }
            None => Ok((
                ExamSession::Completed {
                    exam_id: active.exam_id,
                    answered: active.words.len() as u32,
                },
                Advance::Finished {
                    exam_id: active.exam_id,
                },
            )),
        }
    }

    pub fn exam_id(&self) -> Option<Uuid> {
        match self {
            ExamSession::NotStarted => None,
            ExamSession::InProgress(active) => Some(active.exam_id),
            ExamSession::Completed { exam_id, .. } => Some(*exam_id),
        }
    }

    pub fn current_word(&self) -> Option<&Word> {
        match self {
            ExamSession::InProgress(active) => Some(active.current()),
            _ => None,
        }
    }

    pub fn word_index(&self) -> Option<usize> {
        match self {
            ExamSession::InProgress(active) => Some(active.word_index),
            _ => None,
        }
    }

    pub fn time_left(&self) -> Option<u32> {
        match self {
            ExamSession::InProgress(active) => Some(active.time_left),
            _ => None,
        }
    }

    pub fn total_words(&self) -> u32 {
        match self {
            ExamSession::NotStarted => 0,
            ExamSession::InProgress(active) => active.words.len() as u32,
            ExamSession::Completed { answered, .. } => *answered,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, ExamSession::InProgress(_))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExamSession::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, limit: u32, idx: u32) -> Word {
        Word {
            id: Uuid::new_v4(),
            word_set_id: Uuid::nil(),
            text: text.to_string(),
            time_limit_seconds: limit,
            order_index: idx,
        }
    }

    fn ticks(mut session: ExamSession, n: u32) -> (ExamSession, TickOutcome) {
        let mut last = TickOutcome::Idle;
        for _ in 0..n {
            let (next, outcome) = session.tick();
            session = next;
            last = outcome;
        }
        (session, last)
    }

    #[test]
    fn begin_rejects_empty_word_list() {
        assert_eq!(
            ExamSession::begin(Uuid::new_v4(), vec![]),
            Err(SessionError::EmptyWordSet)
        );
    }

    #[test]
    fn words_are_presented_in_order_index_order() {
        let words = vec![word("run", 15, 1), word("dog", 30, 0)];
        let session = ExamSession::begin(Uuid::new_v4(), words).unwrap();

        assert_eq!(session.current_word().unwrap().text, "dog");
        assert_eq!(session.time_left(), Some(30));
        assert_eq!(session.word_index(), Some(0));
        assert_eq!(session.total_words(), 2);
    }

    #[test]
    fn tick_counts_down_and_expires_once() {
        let session = ExamSession::begin(Uuid::new_v4(), vec![word("dog", 10, 0)]).unwrap();

        let (session, outcome) = session.tick();
        assert_eq!(outcome, TickOutcome::Counting { time_left: 9 });

        let (session, outcome) = ticks(session, 9);
        match outcome {
            TickOutcome::Expired(pending) => {
                assert_eq!(pending.sentence, NO_ANSWER_PLACEHOLDER);
                assert_eq!(pending.time_taken_seconds, 10);
            }
            other => panic!("expected expiry, got {other:?}"),
        }
        assert_eq!(session.time_left(), Some(0));

        let (session, outcome) = session.tick();
        assert_eq!(outcome, TickOutcome::Idle);
        assert_eq!(session.time_left(), Some(0));
    }

    #[test]
    fn pending_answer_trims_the_draft_and_measures_elapsed_time() {
        let session = ExamSession::begin(Uuid::new_v4(), vec![word("dog", 30, 0)]).unwrap();
        let (session, _) = ticks(session, 5);
        let session = session.with_draft("  The dog barks  ");

        let pending = session.pending_answer().unwrap();
        assert_eq!(pending.sentence, "The dog barks");
        assert_eq!(pending.time_taken_seconds, 5);
        assert_eq!(pending.word_text, "dog");
    }

    #[test]
    fn whitespace_draft_becomes_placeholder() {
        let session = ExamSession::begin(Uuid::new_v4(), vec![word("dog", 30, 0)])
            .unwrap()
            .with_draft("   ");
        assert_eq!(session.pending_answer().unwrap().sentence, NO_ANSWER_PLACEHOLDER);
    }

    #[test]
    fn advance_moves_to_next_word_and_clears_draft() {
        let words = vec![word("dog", 30, 0), word("run", 15, 1)];
        let first_id = words[0].id;
        let session = ExamSession::begin(Uuid::new_v4(), words)
            .unwrap()
            .with_draft("The dog barks");

        let (session, advance) = session.advance(first_id).unwrap();
        assert_eq!(
            advance,
            Advance::NextWord {
                word_index: 1,
                time_left: 15
            }
        );
        assert_eq!(session.current_word().unwrap().text, "run");
        assert_eq!(session.pending_answer().unwrap().sentence, NO_ANSWER_PLACEHOLDER);
    }

    #[test]
    fn advance_rejects_answers_for_other_words() {
        let words = vec![word("dog", 30, 0), word("run", 15, 1)];
        let second_id = words[1].id;
        let session = ExamSession::begin(Uuid::new_v4(), words).unwrap();

        assert_eq!(
            session.advance(second_id),
            Err(SessionError::StaleAnswer(second_id))
        );
        assert_eq!(session.word_index(), Some(0));
    }

    #[test]
    fn last_advance_completes_and_freezes_the_session() {
        let exam_id = Uuid::new_v4();
        let only = word("dog", 30, 0);
        let only_id = only.id;
        let session = ExamSession::begin(exam_id, vec![only]).unwrap();

        let (session, advance) = session.advance(only_id).unwrap();
        assert_eq!(advance, Advance::Finished { exam_id });
        assert!(session.is_completed());
        assert_eq!(session.total_words(), 1);

        assert_eq!(session.tick().1, TickOutcome::Idle);
        assert_eq!(session.pending_answer(), Err(SessionError::NotInProgress));
        assert_eq!(session.advance(only_id), Err(SessionError::NotInProgress));
    }

    #[test]
    fn session_survives_a_json_round_trip_mid_exam() {
        let session = ExamSession::begin(Uuid::new_v4(), vec![word("dog", 30, 0)])
            .unwrap()
            .with_draft("draft");
        let (session, _) = session.tick();

        let json = serde_json::to_string(&session).unwrap();
        let restored: ExamSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn inconsistent_sessions_are_rejected_on_load() {
        let session = ExamSession::begin(Uuid::new_v4(), vec![word("dog", 30, 0)]).unwrap();
        let valid = serde_json::to_value(&session).unwrap();

        let mut past_the_end = valid.clone();
        past_the_end["word_index"] = serde_json::json!(1);
        assert!(serde_json::from_value::<ExamSession>(past_the_end).is_err());

        let mut no_words = valid.clone();
        no_words["words"] = serde_json::json!([]);
        assert!(serde_json::from_value::<ExamSession>(no_words).is_err());

        let mut overfull_clock = valid;
        overfull_clock["time_left"] = serde_json::json!(31);
        assert!(serde_json::from_value::<ExamSession>(overfull_clock).is_err());
    }
}
