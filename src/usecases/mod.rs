//! Application use cases. Orchestrate domain logic via ports.

pub mod persistence;
pub mod registry;
pub mod report_service;

pub use persistence::{LoadStats, Outcome, PersistenceSync, UpsertOutcome, WriteOp};
pub use registry::{PaymentSlip, Registry};
pub use report_service::{AcademicReport, ReportLine, ReportService};
