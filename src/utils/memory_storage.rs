//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// In-memory conferral store for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<RwLock<HashMap<Uuid, ConferredItem>>>,
    events: Arc<RwLock<Vec<ConferEvent>>>,
}

impl MemoryStore {
    /// Create a new memory store instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.items.write().unwrap().clear();
        self.events.write().unwrap().clear();
    }
}

#[async_trait]
impl ConferralStore for MemoryStore {
    async fn save_conferred_item(&mut self, item: &ConferredItem) -> MatchResult<()> {
        self.items
            .write()
            .unwrap()
            .insert(item.conferred_id, item.clone());
        Ok(())
    }

    async fn get_conferred_item(&self, conferred_id: Uuid) -> MatchResult<Option<ConferredItem>> {
        Ok(self.items.read().unwrap().get(&conferred_id).cloned())
    }

    async fn list_conferred_items(&self) -> MatchResult<Vec<ConferredItem>> {
        let mut items: Vec<ConferredItem> = self.items.read().unwrap().values().cloned().collect();
        items.sort_by_key(|item| item.conferred_at);
        Ok(items)
    }

    async fn delete_conferred_item(&mut self, conferred_id: Uuid) -> MatchResult<()> {
        self.items.write().unwrap().remove(&conferred_id);
        Ok(())
    }

    async fn append_event(&mut self, event: &ConferEvent) -> MatchResult<()> {
        self.events.write().unwrap().push(event.clone());
        Ok(())
    }

    async fn list_events(&self) -> MatchResult<Vec<ConferEvent>> {
        Ok(self.events.read().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn item() -> ConferredItem {
        ConferredItem::new(Record::new(
            "bank".to_string(),
            "1".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "pix".to_string(),
            None,
            BigDecimal::from(10),
            String::new(),
        ))
    }

    #[tokio::test]
    async fn save_get_delete_round_trip() {
        let mut store = MemoryStore::new();
        let item = item();

        store.save_conferred_item(&item).await.unwrap();
        assert_eq!(
            store.get_conferred_item(item.conferred_id).await.unwrap(),
            Some(item.clone())
        );

        store.delete_conferred_item(item.conferred_id).await.unwrap();
        assert_eq!(
            store.get_conferred_item(item.conferred_id).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn clones_share_state() {
        let mut store = MemoryStore::new();
        let view = store.clone();

        store
            .append_event(&ConferEvent::not_found(BigDecimal::from(5)))
            .await
            .unwrap();
        assert_eq!(view.list_events().await.unwrap().len(), 1);

        view.clear();
        assert!(store.list_events().await.unwrap().is_empty());
    }
}
