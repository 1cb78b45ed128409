//! Read-through cache for table metadata, keyed by `(workspace, table)`.

use std::{sync::Arc, time::Duration};

use moka::sync::Cache;
use uuid::Uuid;

use super::metadata::TableConfig;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataKey {
    pub workspace: Uuid,
    pub table: String,
}

impl MetadataKey {
    pub fn new(workspace: Uuid, table: impl Into<String>) -> Self {
        Self {
            workspace,
            table: table.into(),
        }
    }
}

pub trait MetadataCache: Send + Sync {
    fn get(&self, key: &MetadataKey) -> Option<Arc<TableConfig>>;

    fn insert(&self, key: MetadataKey, config: Arc<TableConfig>);

    fn invalidate(&self, key: &MetadataKey);
}

/// Bounded in-memory cache with a time-to-live (TinyLFU admission).
pub struct MokaMetadataCache {
    inner: Cache<MetadataKey, Arc<TableConfig>>,
}

impl MokaMetadataCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }
}

impl MetadataCache for MokaMetadataCache {
    fn get(&self, key: &MetadataKey) -> Option<Arc<TableConfig>> {
        self.inner.get(key)
    }

    fn insert(&self, key: MetadataKey, config: Arc<TableConfig>) {
        self.inner.insert(key, config);
    }

    fn invalidate(&self, key: &MetadataKey) {
        self.inner.invalidate(key);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;
    use uuid::Uuid;

    use super::{MetadataCache, MetadataKey, MokaMetadataCache};
    use crate::engine::metadata::TableConfig;

    fn config() -> Arc<TableConfig> {
        Arc::new(
            serde_json::from_value(json!({
                "table_type": "base_table",
                "primary_key_column": "id",
                "field_metadata": [],
                "relationships": []
            }))
            .expect("config should decode"),
        )
    }

    #[test]
    fn entries_are_scoped_per_workspace() {
        let cache = MokaMetadataCache::new(16, Duration::from_secs(60));
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        cache.insert(MetadataKey::new(first, "orders"), config());

        assert!(cache.get(&MetadataKey::new(first, "orders")).is_some());
        assert!(cache.get(&MetadataKey::new(second, "orders")).is_none());
    }

    #[test]
    fn invalidate_drops_the_entry() {
        let cache = MokaMetadataCache::new(16, Duration::from_secs(60));
        let key = MetadataKey::new(Uuid::new_v4(), "orders");

        cache.insert(key.clone(), config());
        cache.invalidate(&key);

        assert!(cache.get(&key).is_none());
    }
}
