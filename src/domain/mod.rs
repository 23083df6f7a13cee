//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod grading;
pub mod input;
pub mod subject;

pub use entities::{Course, Displayable, Person, Student, Teacher};
pub use errors::DomainError;
pub use grading::Grade;
pub use input::{CourseForm, StudentForm, TeacherForm};
pub use subject::Subject;
