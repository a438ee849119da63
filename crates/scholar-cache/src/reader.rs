use std::sync::Arc;

use async_trait::async_trait;
use scholar_ledger::LedgerReader;
use scholar_types::{EntityKey, FieldValue, ReadError};
use tracing::{debug, instrument, warn};

use crate::cache::ResultCache;

/// Field reader that serves repeat reads from a shared [`ResultCache`].
///
/// Each `(entity, field)` pair is cached under its own
/// [`EntityKey::field`] key. Cheap to clone: clones share the cache and the
/// underlying reader.
#[derive(Clone)]
pub struct CachedReader {
    reader: Arc<dyn LedgerReader>,
    cache: Arc<ResultCache<FieldValue>>,
}

impl CachedReader {
    pub fn new(reader: Arc<dyn LedgerReader>, cache: Arc<ResultCache<FieldValue>>) -> Self {
        Self { reader, cache }
    }

    /// The shared cache, for display code that wants to peek or for stats.
    pub fn cache(&self) -> &Arc<ResultCache<FieldValue>> {
        &self.cache
    }

    /// Read a field, fetching from the ledger on a cache miss.
    #[instrument(skip(self))]
    pub async fn read(&self, entity: &str, field: &str) -> Result<FieldValue, ReadError> {
        let key = EntityKey::field(entity, field);
        let result = self
            .cache
            .get_or_fetch(key, || self.reader.read_field(entity, field))
            .await;

        if let Err(err) = &result {
            warn!(entity, field, error = %err, "ledger read failed");
        }
        result
    }

    /// Bypass the cache: drop the cached value and read again.
    ///
    /// This is the retry path after a read failure or a confirmed write.
    pub async fn refresh(&self, entity: &str, field: &str) -> Result<FieldValue, ReadError> {
        self.cache.invalidate(EntityKey::field(entity, field));
        self.read(entity, field).await
    }

    /// Drop every cached field of an entity.
    pub fn invalidate_entity(&self, entity: &str) -> usize {
        let removed = self.cache.invalidate_entity(entity);
        debug!(entity, removed, "cached entity reads invalidated");
        removed
    }
}

#[async_trait]
impl LedgerReader for CachedReader {
    async fn read_field(&self, entity: &str, field: &str) -> Result<FieldValue, ReadError> {
        self.read(entity, field).await
    }
}
