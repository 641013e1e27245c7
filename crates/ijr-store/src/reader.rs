use std::sync::Arc;

use tracing::debug;

use crate::error::StoreResult;
use crate::ops::{Document, FindQuery};
use crate::traits::DocumentStore;

/// Read access to any database and collection of one connection.
pub struct DocumentReader {
    store: Arc<dyn DocumentStore>,
}

impl DocumentReader {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn find(
        &self,
        database: &str,
        collection: &str,
        query: &FindQuery,
    ) -> StoreResult<Vec<Document>> {
        let docs = self.store.find(database, collection, query)?;
        debug!(database, collection, found = docs.len(), "find");
        Ok(docs)
    }

    /// Find the first document matching `query`.
    pub fn find_one(
        &self,
        database: &str,
        collection: &str,
        query: &FindQuery,
    ) -> StoreResult<Option<Document>> {
        let query = query.clone().limit(1);
        Ok(self.find(database, collection, &query)?.into_iter().next())
    }

    pub fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: &[Document],
    ) -> StoreResult<Vec<Document>> {
        let docs = self.store.aggregate(database, collection, pipeline)?;
        debug!(database, collection, stages = pipeline.len(), found = docs.len(), "aggregate");
        Ok(docs)
    }

    pub fn list_collections(&self, database: &str) -> StoreResult<Vec<String>> {
        self.store.list_collections(database)
    }

    /// Close the underlying connection.
    pub fn close(self) -> StoreResult<()> {
        self.store.close()
    }
}

impl std::fmt::Debug for DocumentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentReader").finish_non_exhaustive()
    }
}
