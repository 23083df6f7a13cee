//! Infrastructure adapters. Implement ports.
//!
//! Storage backends and the terminal UI. Map errors to DomainError.

pub mod persistence;
pub mod ui;
