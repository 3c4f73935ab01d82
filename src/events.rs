//! Training-completion events and the background recovery worker
//!
//! Recording a session publishes a [`TrainingCompleted`] event. The worker
//! spawned by [`spawn_recovery_worker`] applies the post-training score
//! adjustment off the async executor. Its failures are logged and counted,
//! never reported back to the code that recorded the session.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{RecoveryError, Result};
use crate::models::TrainingSession;
use crate::service::RecoveryService;

/// A training session was stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingCompleted {
    pub user_id: String,
    pub session_id: String,
    pub total_volume: Option<Decimal>,
    pub exercise_type: String,
}

impl From<&TrainingSession> for TrainingCompleted {
    fn from(session: &TrainingSession) -> Self {
        TrainingCompleted {
            user_id: session.user_id.clone(),
            session_id: session.id.clone(),
            total_volume: session.total_volume,
            exercise_type: session.exercise_type.clone(),
        }
    }
}

/// Sending half of the training event channel
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: UnboundedSender<TrainingCompleted>,
}

/// Create a publisher and the receiver the worker consumes
pub fn channel() -> (EventPublisher, UnboundedReceiver<TrainingCompleted>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (EventPublisher { sender }, receiver)
}

impl EventPublisher {
    pub fn publish(&self, event: TrainingCompleted) -> Result<()> {
        debug!(user_id = %event.user_id, session_id = %event.session_id, "Publishing training event");

        self.sender
            .send(event)
            .map_err(|e| RecoveryError::Event(format!("worker is not running: session {}", e.0.session_id)))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// What the worker did with the events it received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: usize,
    /// A new reading was written
    pub adjusted: usize,
    /// No prior reading or zero impact
    pub skipped: usize,
    pub failed: usize,
}

/// Consume training events until every publisher is dropped or detached
///
/// Events still queued when the channel closes are processed before the
/// worker returns its stats.
pub fn spawn_recovery_worker(
    service: Arc<RecoveryService>,
    mut receiver: UnboundedReceiver<TrainingCompleted>,
) -> JoinHandle<WorkerStats> {
    tokio::spawn(async move {
        let mut stats = WorkerStats::default();

        while let Some(event) = receiver.recv().await {
            stats.received += 1;
            let service = Arc::clone(&service);
            let session_id = event.session_id.clone();

            let outcome = tokio::task::spawn_blocking(move || {
                service.update_recovery_after_training(
                    &event.user_id,
                    &event.session_id,
                    event.total_volume,
                    &event.exercise_type,
                )
            })
            .await;

            match outcome {
                Ok(Ok(Some(reading))) => {
                    stats.adjusted += 1;
                    debug!(session_id = %session_id, score = reading.recovery_score, "Recovery adjusted");
                }
                Ok(Ok(None)) => stats.skipped += 1,
                Ok(Err(err)) => {
                    stats.failed += 1;
                    error!(session_id = %session_id, error = %err, "Recovery adjustment failed");
                }
                Err(join_err) => {
                    stats.failed += 1;
                    error!(session_id = %session_id, error = %join_err, "Recovery adjustment task panicked");
                }
            }
        }

        info!(
            received = stats.received,
            adjusted = stats.adjusted,
            skipped = stats.skipped,
            failed = stats.failed,
            "Recovery worker stopped"
        );
        stats
    })
}
