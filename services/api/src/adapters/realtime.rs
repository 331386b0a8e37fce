//! services/api/src/adapters/realtime.rs
//!
//! In-process implementation of the `ExamNotifier` port. Every subscriber gets
//! its own receiver on a `tokio::sync::broadcast` channel; dropping the stream
//! releases the subscription.

use async_stream::stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use vocab_exam_core::ports::{ExamChange, ExamChangeStream, ExamNotifier};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ExamChange>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ExamNotifier for BroadcastNotifier {
    fn notify(&self, change: ExamChange) {
        // An error only means nobody is listening right now.
        if self.sender.send(change).is_err() {
            debug!("No dashboard subscribers for {:?}", change);
        }
    }

    fn subscribe(&self) -> ExamChangeStream {
        let mut receiver = self.sender.subscribe();
        Box::pin(stream! {
            loop {
                match receiver.recv().await {
                    Ok(change) => yield change,
                    // Consumers re-query on every item, so missed changes collapse into the next one.
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Dashboard subscriber lagged by {} changes", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
