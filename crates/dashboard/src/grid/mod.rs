//! Per-session table registry.
//!
//! Each signed-in session owns one [`TableState`], keyed by the `grid_id`
//! stored in the session. Tables idle for an hour are evicted; an evicted
//! table is simply re-created and re-loaded on the next visit.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use roster_core::TableState;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A user's table, shared between concurrent requests of the same session.
pub type SharedTable = Arc<RwLock<TableState>>;

const MAX_TABLES: u64 = 1000;
const TABLE_IDLE: Duration = Duration::from_secs(3600);

/// Registry of live tables.
#[derive(Clone)]
pub struct GridRegistry {
    tables: Cache<Uuid, SharedTable>,
}

impl Default for GridRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GridRegistry {
    #[must_use]
    pub fn new() -> Self {
        let tables = Cache::builder()
            .max_capacity(MAX_TABLES)
            .time_to_idle(TABLE_IDLE)
            .build();
        Self { tables }
    }

    /// The table for `grid_id`, creating an empty one if needed.
    pub async fn handle(&self, grid_id: Uuid) -> SharedTable {
        self.tables
            .get_with(grid_id, async { Arc::new(RwLock::new(TableState::new())) })
            .await
    }

    /// The table for `grid_id`, if one exists.
    pub async fn existing(&self, grid_id: Uuid) -> Option<SharedTable> {
        self.tables.get(&grid_id).await
    }

    /// Remove the table and mark it disposed, so requests still holding it
    /// see `TableError::Disposed`.
    pub async fn dispose(&self, grid_id: Uuid) {
        if let Some(table) = self.tables.remove(&grid_id).await {
            table.write().await.dispose();
            tracing::debug!(%grid_id, "Disposed table");
        }
    }

    /// Dispose the current table and return a fresh, unloaded one.
    pub async fn replace(&self, grid_id: Uuid) -> SharedTable {
        self.dispose(grid_id).await;
        self.handle(grid_id).await
    }

    /// Approximate number of live tables.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.tables.entry_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use roster_core::{TableError, UserRecord};

    use super::*;

    #[tokio::test]
    async fn test_handle_returns_same_table() {
        let registry = GridRegistry::new();
        let id = Uuid::new_v4();

        let first = registry.handle(id).await;
        let second = registry.handle(id).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.existing(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_dispose_marks_held_table() {
        let registry = GridRegistry::new();
        let id = Uuid::new_v4();
        let table = registry.handle(id).await;

        registry.dispose(id).await;

        assert!(registry.existing(id).await.is_none());
        let guard = table.read().await;
        assert!(guard.is_disposed());
        assert_eq!(guard.visible_rows().unwrap_err(), TableError::Disposed);
    }

    #[tokio::test]
    async fn test_replace_gives_fresh_table() {
        let registry = GridRegistry::new();
        let id = Uuid::new_v4();
        let old = registry.handle(id).await;
        {
            let mut guard = old.write().await;
            let ticket = guard.begin_load();
            guard
                .set_rows(ticket, vec![UserRecord::default()], "Roster")
                .unwrap();
        }

        let fresh = registry.replace(id).await;

        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(old.read().await.is_disposed());
        assert!(!fresh.read().await.is_ready());
    }
}
