//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for conferred items and audit events.
///
/// The core performs no I/O of its own: every confirmed match and every
/// "not found" outcome is handed to this collaborator, which can be backed
/// by any persistence layer (PostgreSQL, SQLite, in-memory, etc.).
#[async_trait]
pub trait ConferralStore: Send + Sync {
    /// Persist a newly conferred item
    async fn save_conferred_item(&mut self, item: &ConferredItem) -> MatchResult<()>;

    /// Get a conferred item by its confirmation handle
    async fn get_conferred_item(&self, conferred_id: Uuid) -> MatchResult<Option<ConferredItem>>;

    /// List all live conferred items
    async fn list_conferred_items(&self) -> MatchResult<Vec<ConferredItem>>;

    /// Delete a conferred item (the undo path)
    async fn delete_conferred_item(&mut self, conferred_id: Uuid) -> MatchResult<()>;

    /// Append an audit event
    async fn append_event(&mut self, event: &ConferEvent) -> MatchResult<()>;

    /// List all audit events in insertion order
    async fn list_events(&self) -> MatchResult<Vec<ConferEvent>>;
}
