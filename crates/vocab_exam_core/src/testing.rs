//! crates/vocab_exam_core/src/testing.rs
//!
//! In-memory implementations of the ports, for unit and route tests.
//! Behaves like the PostgreSQL adapter for ordering, cascades, the foreign
//! keys from answers to words and the one-answer-per-word rule.

use crate::domain::{
    Exam, ExamAnswer, ExamSummary, NewExamAnswer, Teacher, TeacherCredentials, Word, WordSet,
    WordSetSummary,
};
use crate::ports::{
    DatabaseService, ExamChange, ExamChangeStream, ExamNotifier, PortError, PortResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::channel::mpsc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    teachers: Vec<(Teacher, String)>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    word_sets: Vec<WordSet>,
    words: Vec<Word>,
    exams: Vec<Exam>,
    answers: Vec<ExamAnswer>,
}

impl Tables {
    fn word_set(&self, id: Uuid) -> PortResult<&WordSet> {
        self.word_sets
            .iter()
            .find(|ws| ws.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Word set {} not found", id)))
    }

    fn exam_mut(&mut self, id: Uuid) -> PortResult<&mut Exam> {
        self.exams
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Exam {} not found", id)))
    }

    fn teacher_set_ids(&self, teacher_id: Uuid) -> Vec<Uuid> {
        self.word_sets
            .iter()
            .filter(|ws| ws.teacher_id == teacher_id)
            .map(|ws| ws.id)
            .collect()
    }
}

#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    fail_next_answer_save: AtomicBool,
    fail_next_completion: AtomicBool,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `save_exam_answer` call fail with `PortError::Unexpected`.
    pub fn fail_next_answer_save(&self) {
        self.fail_next_answer_save.store(true, Ordering::SeqCst);
    }

    /// Makes the next `complete_exam` call fail with `PortError::Unexpected`.
    pub fn fail_next_completion(&self) {
        self.fail_next_completion.store(true, Ordering::SeqCst);
    }

    pub fn exam_count(&self) -> usize {
        self.lock().exams.len()
    }

    /// Moves an auth session's expiry, e.g. into the past.
    pub fn expire_auth_session(&self, session_id: &str) {
        if let Some(entry) = self.lock().auth_sessions.get_mut(session_id) {
            entry.1 = Utc::now() - chrono::Duration::seconds(1);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A panicking test thread must not hide the tables from the others.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_teacher(
        &self,
        email: &str,
        full_name: &str,
        hashed_password: &str,
    ) -> PortResult<Teacher> {
        let mut t = self.lock();
        if t.teachers.iter().any(|(teacher, _)| teacher.email == email) {
            return Err(PortError::Conflict(format!("Email {} is already registered", email)));
        }
        let teacher = Teacher {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            created_at: Utc::now(),
        };
        t.teachers.push((teacher.clone(), hashed_password.to_string()));
        Ok(teacher)
    }

    async fn get_teacher_credentials_by_email(&self, email: &str) -> PortResult<TeacherCredentials> {
        self.lock()
            .teachers
            .iter()
            .find(|(teacher, _)| teacher.email == email)
            .map(|(teacher, hash)| TeacherCredentials {
                teacher_id: teacher.id,
                email: teacher.email.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("Teacher {} not found", email)))
    }

    async fn get_teacher_by_id(&self, teacher_id: Uuid) -> PortResult<Teacher> {
        self.lock()
            .teachers
            .iter()
            .find(|(teacher, _)| teacher.id == teacher_id)
            .map(|(teacher, _)| teacher.clone())
            .ok_or_else(|| PortError::NotFound(format!("Teacher {} not found", teacher_id)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        teacher_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.lock()
            .auth_sessions
            .insert(session_id.to_string(), (teacher_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.lock().auth_sessions.get(session_id) {
            Some((teacher_id, expires_at)) if *expires_at > Utc::now() => Ok(*teacher_id),
            _ => Err(PortError::NotFound("Auth session not found".to_string())),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.lock().auth_sessions.remove(session_id);
        Ok(())
    }

    async fn list_word_sets(&self) -> PortResult<Vec<WordSetSummary>> {
        let t = self.lock();
        Ok(t.word_sets
            .iter()
            .map(|ws| WordSetSummary {
                id: ws.id,
                name: ws.name.clone(),
                teacher_name: t
                    .teachers
                    .iter()
                    .find(|(teacher, _)| teacher.id == ws.teacher_id)
                    .map(|(teacher, _)| teacher.full_name.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn list_word_sets_for_teacher(&self, teacher_id: Uuid) -> PortResult<Vec<WordSet>> {
        let mut sets: Vec<WordSet> = self
            .lock()
            .word_sets
            .iter()
            .filter(|ws| ws.teacher_id == teacher_id)
            .cloned()
            .collect();
        sets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sets)
    }

    async fn count_word_sets_for_teacher(&self, teacher_id: Uuid) -> PortResult<u32> {
        Ok(self.lock().teacher_set_ids(teacher_id).len() as u32)
    }

    async fn get_word_set(&self, word_set_id: Uuid) -> PortResult<WordSet> {
        self.lock().word_set(word_set_id).cloned()
    }

    async fn create_word_set(
        &self,
        teacher_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<WordSet> {
        let word_set = WordSet {
            id: Uuid::new_v4(),
            teacher_id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        self.lock().word_sets.push(word_set.clone());
        Ok(word_set)
    }

    async fn update_word_set(
        &self,
        word_set_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<WordSet> {
        let mut t = self.lock();
        let word_set = t
            .word_sets
            .iter_mut()
            .find(|ws| ws.id == word_set_id)
            .ok_or_else(|| PortError::NotFound(format!("Word set {} not found", word_set_id)))?;
        word_set.name = name.to_string();
        word_set.description = description.map(str::to_string);
        Ok(word_set.clone())
    }

    async fn delete_word_set(&self, word_set_id: Uuid) -> PortResult<()> {
        let mut t = self.lock();
        t.word_set(word_set_id)?;
        let exam_ids: Vec<Uuid> = t
            .exams
            .iter()
            .filter(|e| e.word_set_id == word_set_id)
            .map(|e| e.id)
            .collect();
        t.answers.retain(|a| !exam_ids.contains(&a.exam_id));
        t.exams.retain(|e| e.word_set_id != word_set_id);
        t.words.retain(|w| w.word_set_id != word_set_id);
        t.word_sets.retain(|ws| ws.id != word_set_id);
        Ok(())
    }

    async fn list_words(&self, word_set_id: Uuid) -> PortResult<Vec<Word>> {
        let mut words: Vec<Word> = self
            .lock()
            .words
            .iter()
            .filter(|w| w.word_set_id == word_set_id)
            .cloned()
            .collect();
        words.sort_by_key(|w| w.order_index);
        Ok(words)
    }

    async fn add_word(
        &self,
        word_set_id: Uuid,
        text: &str,
        time_limit_seconds: u32,
    ) -> PortResult<Word> {
        let mut t = self.lock();
        t.word_set(word_set_id)?;
        let order_index = t.words.iter().filter(|w| w.word_set_id == word_set_id).count() as u32;
        let word = Word {
            id: Uuid::new_v4(),
            word_set_id,
            text: text.to_string(),
            time_limit_seconds,
            order_index,
        };
        t.words.push(word.clone());
        Ok(word)
    }

    async fn get_word(&self, word_id: Uuid) -> PortResult<Word> {
        self.lock()
            .words
            .iter()
            .find(|w| w.id == word_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Word {} not found", word_id)))
    }

    async fn delete_word(&self, word_id: Uuid) -> PortResult<()> {
        let mut t = self.lock();
        if t.answers.iter().any(|a| a.word_id == word_id) {
            return Err(PortError::Conflict(
                "This word has already been answered in an exam".to_string(),
            ));
        }
        let removed = t
            .words
            .iter()
            .position(|w| w.id == word_id)
            .map(|pos| t.words.remove(pos))
            .ok_or_else(|| PortError::NotFound(format!("Word {} not found", word_id)))?;
        for word in t.words.iter_mut() {
            if word.word_set_id == removed.word_set_id && word.order_index > removed.order_index {
                word.order_index -= 1;
            }
        }
        Ok(())
    }

    async fn create_exam(
        &self,
        word_set_id: Uuid,
        student_name: &str,
        total_words: u32,
        started_at: DateTime<Utc>,
    ) -> PortResult<Exam> {
        let mut t = self.lock();
        t.word_set(word_set_id)?;
        let exam = Exam {
            id: Uuid::new_v4(),
            word_set_id,
            student_name: student_name.to_string(),
            started_at,
            completed_at: None,
            total_words,
            total_score: None,
        };
        t.exams.push(exam.clone());
        Ok(exam)
    }

    async fn get_exam(&self, exam_id: Uuid) -> PortResult<Exam> {
        self.lock().exam_mut(exam_id).map(|e| e.clone())
    }

    async fn complete_exam(&self, exam_id: Uuid, completed_at: DateTime<Utc>) -> PortResult<Exam> {
        if self.fail_next_completion.swap(false, Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        let mut t = self.lock();
        let exam = t.exam_mut(exam_id)?;
        if exam.is_completed() {
            return Err(PortError::Conflict(format!("Exam {} is already completed", exam_id)));
        }
        exam.completed_at = Some(completed_at);
        Ok(exam.clone())
    }

    async fn list_exams_for_teacher(&self, teacher_id: Uuid) -> PortResult<Vec<Exam>> {
        let t = self.lock();
        let set_ids = t.teacher_set_ids(teacher_id);
        Ok(t.exams
            .iter()
            .filter(|e| set_ids.contains(&e.word_set_id))
            .cloned()
            .collect())
    }

    async fn list_completed_exams_for_teacher(
        &self,
        teacher_id: Uuid,
    ) -> PortResult<Vec<ExamSummary>> {
        let t = self.lock();
        let mut summaries: Vec<ExamSummary> = t
            .exams
            .iter()
            .filter_map(|e| {
                let completed_at = e.completed_at?;
                let word_set = t.word_set(e.word_set_id).ok()?;
                (word_set.teacher_id == teacher_id).then(|| ExamSummary {
                    id: e.id,
                    student_name: e.student_name.clone(),
                    word_set_name: word_set.name.clone(),
                    completed_at,
                    total_words: e.total_words,
                    total_score: e.total_score,
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(summaries)
    }

    async fn set_exam_score(&self, exam_id: Uuid, total_score: u32) -> PortResult<()> {
        self.lock().exam_mut(exam_id)?.total_score = Some(total_score);
        Ok(())
    }

    async fn save_exam_answer(&self, answer: NewExamAnswer) -> PortResult<ExamAnswer> {
        if self.fail_next_answer_save.swap(false, Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        let mut t = self.lock();
        if t.exam_mut(answer.exam_id)?.is_completed() {
            return Err(PortError::Conflict(format!(
                "Exam {} is already completed",
                answer.exam_id
            )));
        }
        if !t.words.iter().any(|w| w.id == answer.word_id) {
            return Err(PortError::NotFound(format!("Word {} not found", answer.word_id)));
        }
        if let Some(existing) = t
            .answers
            .iter_mut()
            .find(|a| a.exam_id == answer.exam_id && a.word_id == answer.word_id)
        {
            existing.student_sentence = answer.student_sentence;
            existing.time_taken_seconds = answer.time_taken_seconds;
            existing.submitted_at = answer.submitted_at;
            return Ok(existing.clone());
        }
        let saved = ExamAnswer {
            id: Uuid::new_v4(),
            exam_id: answer.exam_id,
            word_id: answer.word_id,
            word_text: answer.word_text,
            student_sentence: answer.student_sentence,
            time_taken_seconds: answer.time_taken_seconds,
            submitted_at: answer.submitted_at,
            is_correct: None,
            teacher_feedback: None,
            checked_at: None,
        };
        t.answers.push(saved.clone());
        Ok(saved)
    }

    async fn list_answers_for_exam(&self, exam_id: Uuid) -> PortResult<Vec<ExamAnswer>> {
        let mut answers: Vec<ExamAnswer> = self
            .lock()
            .answers
            .iter()
            .filter(|a| a.exam_id == exam_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| a.submitted_at);
        Ok(answers)
    }

    async fn get_answer(&self, answer_id: Uuid) -> PortResult<ExamAnswer> {
        self.lock()
            .answers
            .iter()
            .find(|a| a.id == answer_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Answer {} not found", answer_id)))
    }

    async fn grade_answer(
        &self,
        answer_id: Uuid,
        is_correct: bool,
        feedback: Option<&str>,
        checked_at: DateTime<Utc>,
    ) -> PortResult<ExamAnswer> {
        let mut t = self.lock();
        let answer = t
            .answers
            .iter_mut()
            .find(|a| a.id == answer_id)
            .ok_or_else(|| PortError::NotFound(format!("Answer {} not found", answer_id)))?;
        answer.is_correct = Some(is_correct);
        answer.teacher_feedback = feedback.map(str::to_string);
        answer.checked_at = Some(checked_at);
        Ok(answer.clone())
    }

    async fn count_correct_answers(&self, exam_id: Uuid) -> PortResult<u32> {
        Ok(self
            .lock()
            .answers
            .iter()
            .filter(|a| a.exam_id == exam_id && a.is_correct == Some(true))
            .count() as u32)
    }
}

/// Records every published change and fans it out to live subscribers.
#[derive(Default)]
pub struct RecordingNotifier {
    changes: Mutex<Vec<ExamChange>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ExamChange>>>,
}

impl RecordingNotifier {
    pub fn changes(&self) -> Vec<ExamChange> {
        self.changes.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ExamNotifier for RecordingNotifier {
    fn notify(&self, change: ExamChange) {
        if let Ok(mut changes) = self.changes.lock() {
            changes.push(change);
        }
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.unbounded_send(change).is_ok());
        }
    }

    fn subscribe(&self) -> ExamChangeStream {
        let (tx, rx) = mpsc::unbounded();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        Box::pin(rx)
    }
}
