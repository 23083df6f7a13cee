//! Inbound port. UI (adapter) calls into the application.

use crate::domain::DomainError;

/// Input port: UI/CLI drives registry operations until the user quits.
#[async_trait::async_trait]
pub trait InputPort: Send {
    /// Run the interactive session. Returns when the user exits.
    async fn run(&mut self) -> Result<(), DomainError>;
}
