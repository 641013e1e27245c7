use std::sync::Arc;

use crate::credentials::StoreCredentials;
use crate::error::StoreResult;
use crate::ops::{BulkWriteSummary, Document, FindQuery, WriteOp};

/// Document database client.
///
/// Addressed by database and collection name. Backends own the wire
/// protocol and authentication; callers only see documents.
pub trait DocumentStore: Send + Sync {
    /// Return the documents matching `query`, sorted, limited and projected.
    fn find(
        &self,
        database: &str,
        collection: &str,
        query: &FindQuery,
    ) -> StoreResult<Vec<Document>>;

    /// Run an aggregation pipeline.
    fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: &[Document],
    ) -> StoreResult<Vec<Document>>;

    /// Apply write operations in order.
    ///
    /// Operations before a failing one stay applied.
    fn bulk_write(
        &self,
        database: &str,
        collection: &str,
        ops: &[WriteOp],
    ) -> StoreResult<BulkWriteSummary>;

    /// Names of the collections in a database, sorted.
    fn list_collections(&self, database: &str) -> StoreResult<Vec<String>>;

    /// Close the connection. Later calls fail with `Closed`.
    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Opens [`DocumentStore`] connections from credentials.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, credentials: &StoreCredentials) -> StoreResult<Arc<dyn DocumentStore>>;
}
