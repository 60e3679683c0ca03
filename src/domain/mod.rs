/// Domain module containing the core event types
///
/// This module defines the recorded Event, its category-specific payload and
/// the small value types (ids, categories, time ranges) shared by the store,
/// the analytics and the dispatcher.

pub mod event;
pub mod types;

// Re-export public types for easy access
pub use event::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid event payload: {message}")]
    InvalidPayload { message: String },

    #[error("Unknown event category: {0}")]
    UnknownCategory(String),

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),
}
