//! crates/vocab_exam_core/src/word_sets.rs
//!
//! Authoring of word sets and their words. A teacher only ever sees and
//! changes their own sets.

use crate::domain::{Word, WordSet, WordSetSummary, MAX_TIME_LIMIT_SECONDS, MIN_TIME_LIMIT_SECONDS};
use crate::error::{ExamError, ExamResult};
use crate::ports::DatabaseService;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub fn validate_time_limit(seconds: u32) -> ExamResult<u32> {
    if (MIN_TIME_LIMIT_SECONDS..=MAX_TIME_LIMIT_SECONDS).contains(&seconds) {
        Ok(seconds)
    } else {
        Err(ExamError::Validation(format!(
            "Time limit must be between {} and {} seconds",
            MIN_TIME_LIMIT_SECONDS, MAX_TIME_LIMIT_SECONDS
        )))
    }
}

fn required(value: &str, what: &str) -> ExamResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ExamError::Validation(format!("Please enter a {}", what)));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Clone)]
pub struct WordSetManager {
    db: Arc<dyn DatabaseService>,
}

impl WordSetManager {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Every word set with its teacher's name, for students picking an exam.
    pub async fn available(&self) -> ExamResult<Vec<WordSetSummary>> {
        Ok(self.db.list_word_sets().await?)
    }

    pub async fn list(&self, teacher_id: Uuid) -> ExamResult<Vec<WordSet>> {
        Ok(self.db.list_word_sets_for_teacher(teacher_id).await?)
    }

    pub async fn create(
        &self,
        teacher_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> ExamResult<WordSet> {
        let name = required(name, "word set name")?;
        let description = optional(description);
        let word_set = self
            .db
            .create_word_set(teacher_id, &name, description.as_deref())
            .await?;
        info!("Teacher {} created word set '{}'", teacher_id, word_set.name);
        Ok(word_set)
    }

    pub async fn update(
        &self,
        teacher_id: Uuid,
        word_set_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> ExamResult<WordSet> {
        self.owned(teacher_id, word_set_id).await?;
        let name = required(name, "word set name")?;
        let description = optional(description);
        Ok(self
            .db
            .update_word_set(word_set_id, &name, description.as_deref())
            .await?)
    }

    pub async fn delete(&self, teacher_id: Uuid, word_set_id: Uuid) -> ExamResult<()> {
        self.owned(teacher_id, word_set_id).await?;
        self.db.delete_word_set(word_set_id).await?;
        info!("Teacher {} deleted word set {}", teacher_id, word_set_id);
        Ok(())
    }

    pub async fn words(&self, teacher_id: Uuid, word_set_id: Uuid) -> ExamResult<Vec<Word>> {
        self.owned(teacher_id, word_set_id).await?;
        Ok(self.db.list_words(word_set_id).await?)
    }

    pub async fn add_word(
        &self,
        teacher_id: Uuid,
        word_set_id: Uuid,
        text: &str,
        time_limit_seconds: u32,
    ) -> ExamResult<Word> {
        self.owned(teacher_id, word_set_id).await?;
        let text = required(text, "word")?;
        let time_limit_seconds = validate_time_limit(time_limit_seconds)?;
        Ok(self.db.add_word(word_set_id, &text, time_limit_seconds).await?)
    }

    pub async fn delete_word(&self, teacher_id: Uuid, word_id: Uuid) -> ExamResult<()> {
        let word = self.db.get_word(word_id).await?;
        self.owned(teacher_id, word.word_set_id).await?;
        Ok(self.db.delete_word(word_id).await?)
    }

    async fn owned(&self, teacher_id: Uuid, word_set_id: Uuid) -> ExamResult<WordSet> {
        let word_set = self.db.get_word_set(word_set_id).await?;
        if word_set.teacher_id != teacher_id {
            return Err(ExamError::NotFound(format!(
                "Word set {} not found",
                word_set_id
            )));
        }
        Ok(word_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_TIME_LIMIT_SECONDS;
    use crate::testing::InMemoryDatabase;

    async fn manager_with_teacher() -> (WordSetManager, Arc<InMemoryDatabase>, Uuid) {
        let db = Arc::new(InMemoryDatabase::new());
        let teacher = db.create_teacher("t@example.com", "Ms. T", "h").await.unwrap();
        (WordSetManager::new(db.clone()), db, teacher.id)
    }

    #[test]
    fn time_limit_bounds_are_inclusive() {
        assert!(validate_time_limit(MIN_TIME_LIMIT_SECONDS).is_ok());
        assert!(validate_time_limit(MAX_TIME_LIMIT_SECONDS).is_ok());
        assert!(validate_time_limit(DEFAULT_TIME_LIMIT_SECONDS).is_ok());
        assert!(validate_time_limit(9).is_err());
        assert!(validate_time_limit(301).is_err());
    }

    #[tokio::test]
    async fn create_trims_name_and_drops_blank_description() {
        let (manager, _, teacher_id) = manager_with_teacher().await;

        let set = manager
            .create(teacher_id, "  Week 1 Vocabulary ", Some("   "))
            .await
            .unwrap();
        assert_eq!(set.name, "Week 1 Vocabulary");
        assert_eq!(set.description, None);

        let err = manager.create(teacher_id, "  ", None).await.unwrap_err();
        assert!(matches!(err, ExamError::Validation(_)));
    }

    #[tokio::test]
    async fn words_keep_dense_order_after_deletion() {
        let (manager, _, teacher_id) = manager_with_teacher().await;
        let set = manager.create(teacher_id, "Week 1", None).await.unwrap();

        let dog = manager.add_word(teacher_id, set.id, "dog", 30).await.unwrap();
        manager.add_word(teacher_id, set.id, "run", 15).await.unwrap();
        manager.add_word(teacher_id, set.id, "sky", 60).await.unwrap();
        assert_eq!(dog.order_index, 0);

        manager.delete_word(teacher_id, dog.id).await.unwrap();
        let words = manager.words(teacher_id, set.id).await.unwrap();
        let order: Vec<(&str, u32)> = words
            .iter()
            .map(|w| (w.text.as_str(), w.order_index))
            .collect();
        assert_eq!(order, vec![("run", 0), ("sky", 1)]);

        let added = manager.add_word(teacher_id, set.id, "sea", 20).await.unwrap();
        assert_eq!(added.order_index, 2);
    }

    #[tokio::test]
    async fn answered_words_cannot_be_deleted() {
        let (manager, db, teacher_id) = manager_with_teacher().await;
        let set = manager.create(teacher_id, "Week 1", None).await.unwrap();
        let dog = manager.add_word(teacher_id, set.id, "dog", 30).await.unwrap();
        manager.add_word(teacher_id, set.id, "run", 15).await.unwrap();

        let exam = db.create_exam(set.id, "Ana", 2, chrono::Utc::now()).await.unwrap();
        db.save_exam_answer(crate::domain::NewExamAnswer {
            exam_id: exam.id,
            word_id: dog.id,
            word_text: dog.text.clone(),
            student_sentence: "The dog barks".to_string(),
            time_taken_seconds: 4,
            submitted_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

        assert!(matches!(
            manager.delete_word(teacher_id, dog.id).await,
            Err(ExamError::Validation(_))
        ));
        let words = manager.words(teacher_id, set.id).await.unwrap();
        let order: Vec<(&str, u32)> = words
            .iter()
            .map(|w| (w.text.as_str(), w.order_index))
            .collect();
        assert_eq!(order, vec![("dog", 0), ("run", 1)]);
        assert_eq!(db.list_answers_for_exam(exam.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_word_validates_text_and_time_limit() {
        let (manager, _, teacher_id) = manager_with_teacher().await;
        let set = manager.create(teacher_id, "Week 1", None).await.unwrap();

        assert!(matches!(
            manager.add_word(teacher_id, set.id, " ", 30).await,
            Err(ExamError::Validation(_))
        ));
        assert!(matches!(
            manager.add_word(teacher_id, set.id, "dog", 5).await,
            Err(ExamError::Validation(_))
        ));
        assert!(manager.words(teacher_id, set.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_sets_are_invisible() {
        let (manager, db, teacher_id) = manager_with_teacher().await;
        let other = db.create_teacher("o@example.com", "O", "h").await.unwrap();
        let set = manager.create(teacher_id, "Week 1", None).await.unwrap();

        assert!(matches!(
            manager.add_word(other.id, set.id, "dog", 30).await,
            Err(ExamError::NotFound(_))
        ));
        assert!(matches!(
            manager.delete(other.id, set.id).await,
            Err(ExamError::NotFound(_))
        ));
        assert!(manager.list(other.id).await.unwrap().is_empty());

        let available = manager.available().await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].teacher_name, "Ms. T");
    }

    #[tokio::test]
    async fn deleting_a_set_cascades_to_its_exams() {
        let (manager, db, teacher_id) = manager_with_teacher().await;
        let set = manager.create(teacher_id, "Week 1", None).await.unwrap();
        manager.add_word(teacher_id, set.id, "dog", 30).await.unwrap();
        db.create_exam(set.id, "Ana", 1, chrono::Utc::now()).await.unwrap();

        manager.delete(teacher_id, set.id).await.unwrap();
        assert_eq!(db.exam_count(), 0);
        assert!(matches!(
            manager.words(teacher_id, set.id).await,
            Err(ExamError::NotFound(_))
        ));
    }
}
