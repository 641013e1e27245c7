//! Buffered bulk writer.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::ops::{BulkWriteSummary, Document, WriteOp};
use crate::traits::DocumentStore;

/// Pending operations held before a flush is forced.
pub const DEFAULT_WRITE_THRESHOLD: usize = 250;

/// Field stamped with the write time on every document.
pub const TIMESTAMP_FIELD: &str = "_ts";

/// Field holding the document key.
pub const ID_FIELD: &str = "_id";

/// Buffers write operations for one collection and sends them as bulk
/// writes.
///
/// A flush happens once more than `threshold` operations are pending, on
/// [`DocumentWriter::flush`] and on [`DocumentWriter::close`]. Dropping the
/// writer flushes whatever is left; errors at that point are only logged, so
/// call `close` to observe them. A failed `close` discards the batch.
pub struct DocumentWriter {
    store: Arc<dyn DocumentStore>,
    database: String,
    collection: String,
    pending: Vec<WriteOp>,
    threshold: usize,
    written: BulkWriteSummary,
}

impl DocumentWriter {
    pub fn new(store: Arc<dyn DocumentStore>, database: &str, collection: &str) -> Self {
        Self {
            store,
            database: database.to_string(),
            collection: collection.to_string(),
            pending: Vec::new(),
            threshold: DEFAULT_WRITE_THRESHOLD,
            written: BulkWriteSummary::default(),
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Number of operations waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Totals of everything flushed so far.
    pub fn written(&self) -> BulkWriteSummary {
        self.written
    }

    /// Queue a document write, stamped with the current time.
    ///
    /// With a key the document is stored under `_id = key`, replacing any
    /// existing one; without a key it is inserted.
    pub fn write_data(&mut self, mut doc: Document, key: Option<&str>) -> StoreResult<()> {
        doc.insert(TIMESTAMP_FIELD.to_string(), Value::String(now_rfc3339()));
        let op = match key {
            Some(key) => {
                doc.insert(ID_FIELD.to_string(), Value::String(key.to_string()));
                let mut filter = Document::new();
                filter.insert(ID_FIELD.to_string(), Value::String(key.to_string()));
                WriteOp::ReplaceOne {
                    filter,
                    replacement: doc,
                    upsert: true,
                }
            }
            None => WriteOp::InsertOne { document: doc },
        };
        self.queue(op)
    }

    /// Queue an update of the first matching document.
    pub fn update_one(
        &mut self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> StoreResult<()> {
        self.queue(WriteOp::UpdateOne {
            filter,
            update,
            upsert,
        })
    }

    /// Queue an update of every matching document.
    pub fn update_many(&mut self, filter: Document, update: Document) -> StoreResult<()> {
        self.queue(WriteOp::UpdateMany { filter, update })
    }

    fn queue(&mut self, op: WriteOp) -> StoreResult<()> {
        self.pending.push(op);
        if self.pending.len() > self.threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Send all pending operations. Does nothing when none are pending.
    ///
    /// On error the batch stays pending and is sent again by the next flush.
    pub fn flush(&mut self) -> StoreResult<BulkWriteSummary> {
        if self.pending.is_empty() {
            return Ok(BulkWriteSummary::default());
        }
        let summary = self
            .store
            .bulk_write(&self.database, &self.collection, &self.pending)?;
        let ops = self.pending.len();
        self.pending.clear();
        debug!(
            database = %self.database,
            collection = %self.collection,
            ops,
            inserted = summary.inserted,
            modified = summary.modified,
            upserted = summary.upserted,
            "bulk write flushed"
        );
        self.written += summary;
        Ok(summary)
    }

    /// Flush and return the totals written over the writer's lifetime.
    ///
    /// If the final flush fails the pending batch is discarded, so nothing
    /// is written after the error is returned.
    pub fn close(mut self) -> StoreResult<BulkWriteSummary> {
        if let Err(e) = self.flush() {
            warn!(
                database = %self.database,
                collection = %self.collection,
                discarded = self.pending.len(),
                error = %e,
                "close failed, pending writes discarded"
            );
            self.pending.clear();
            return Err(e);
        }
        Ok(self.written)
    }
}

impl Drop for DocumentWriter {
    fn drop(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let count = self.pending.len();
        if let Err(e) = self.flush() {
            warn!(
                database = %self.database,
                collection = %self.collection,
                lost = count,
                error = %e,
                "failed to flush pending writes on drop"
            );
        }
    }
}

impl std::fmt::Debug for DocumentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentWriter")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("pending", &self.pending.len())
            .field("threshold", &self.threshold)
            .finish()
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
