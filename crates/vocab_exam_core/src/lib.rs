pub mod analytics;
pub mod domain;
pub mod error;
pub mod flow;
pub mod grading;
pub mod ports;
pub mod session;
pub mod word_sets;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use analytics::{teacher_stats, TeacherStats};
pub use domain::{
    Exam, ExamAnswer, ExamSummary, NewExamAnswer, Teacher, TeacherCredentials, Word, WordSet,
    WordSetSummary,
};
pub use error::{ExamError, ExamResult};
pub use flow::{ExamFlow, FlowUpdate};
pub use grading::{GradeResult, Grader, GradingSheet};
pub use ports::{
    DatabaseService, ExamChange, ExamChangeStream, ExamNotifier, PortError, PortResult,
};
pub use session::{Advance, ExamSession, PendingAnswer, SessionError, TickOutcome};
pub use word_sets::WordSetManager;
