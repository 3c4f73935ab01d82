// Library interface for recoveryrs modules
// The CLI and the integration tests both build on these

pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod impact;
pub mod import;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod recovery;
pub mod repository;
pub mod service;
pub mod suggestions;
pub mod training_load;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::AppConfig;
pub use database::{Database, DatabaseError};
pub use error::{RecoveryError, Result};
pub use events::{spawn_recovery_worker, EventPublisher, TrainingCompleted};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use recovery::{calculate_recovery_score, RecoveryStatus, RecoveryStatusLabel, RecoveryTrend, TrainingIntensity};
pub use repository::{InMemoryRepository, RecoveryReadingRepository, TrainingSessionRepository};
pub use service::{RecoveryService, ServiceConfig};
pub use suggestions::{Suggestion, SuggestionGenerator};
pub use training_load::{LoadStatus, TrainingLoadCalculator, TrainingLoadSnapshot};
