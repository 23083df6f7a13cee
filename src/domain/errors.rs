//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use crate::domain::Subject;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error(
        "Teacher {teacher} cannot teach {course_code} ({subject}) because their specialization is {specialization}"
    )]
    SpecializationMismatch {
        teacher: String,
        course_code: String,
        subject: Subject,
        specialization: Subject,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Student {roll_number} is not enrolled in {course_code}")]
    NotEnrolled {
        roll_number: i64,
        course_code: String,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    /// Storage unreachable or failing; the same write may succeed later.
    #[error("Repository error: {0}")]
    Repo(String),

    /// Storage rejected the write itself (UNIQUE, NOT NULL, ...); retrying cannot help.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt error: {0}")]
    Ui(String),

    #[error("Cancelled")]
    Cancelled,
}

impl DomainError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Only transient storage failures are worth replaying.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Repo(_))
    }
}
