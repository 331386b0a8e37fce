//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-connection exam state.

use crate::config::Config;
use std::sync::Arc;
use vocab_exam_core::ports::{DatabaseService, ExamNotifier};
use vocab_exam_core::{ExamFlow, Grader, WordSetManager};

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub notifier: Arc<dyn ExamNotifier>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn word_sets(&self) -> WordSetManager {
        WordSetManager::new(self.db.clone())
    }

    pub fn grader(&self) -> Grader {
        Grader::new(self.db.clone())
    }

    /// A fresh exam flow for one student connection. Flows are never shared.
    pub fn exam_flow(&self) -> ExamFlow {
        ExamFlow::new(self.db.clone(), self.notifier.clone())
    }
}
