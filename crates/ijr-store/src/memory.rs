use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::credentials::StoreCredentials;
use crate::error::{StoreError, StoreResult};
use crate::ops::{BulkWriteSummary, Document, FindQuery, SortOrder, WriteOp};
use crate::query::{
    apply_update, matches, project, seed_from_filter, sort_documents, validate_update,
};
use crate::traits::{DocumentStore, StoreConnector};

type Collections = BTreeMap<String, Vec<Document>>;

/// In-memory document store for tests and local runs.
///
/// Databases and collections are created on first write. Documents without
/// an `_id` get a generated 24-digit hex id on insert.
pub struct InMemoryDocumentStore {
    databases: RwLock<HashMap<String, Collections>>,
    next_id: AtomicU64,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            databases: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Snapshot of a collection, in insertion order.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        let dbs = self.databases.read().expect("lock poisoned");
        dbs.get(database)
            .and_then(|cols| cols.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    /// Total documents across all databases.
    pub fn len(&self) -> usize {
        let dbs = self.databases.read().expect("lock poisoned");
        dbs.values().flat_map(|cols| cols.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn generate_id(&self) -> Value {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        Value::String(format!("{n:024x}"))
    }

    fn ensure_id(&self, doc: &mut Document) {
        if !doc.contains_key("_id") {
            doc.insert("_id".to_string(), self.generate_id());
        }
    }

    fn apply(
        &self,
        namespace: &str,
        docs: &mut Vec<Document>,
        op: &WriteOp,
    ) -> StoreResult<BulkWriteSummary> {
        let mut summary = BulkWriteSummary::default();
        match op {
            WriteOp::InsertOne { document } => {
                let mut document = document.clone();
                self.ensure_id(&mut document);
                let id = &document["_id"];
                if docs.iter().any(|d| d.get("_id") == Some(id)) {
                    return Err(StoreError::DuplicateKey {
                        namespace: namespace.to_string(),
                        id: id.to_string(),
                    });
                }
                docs.push(document);
                summary.inserted += 1;
            }
            WriteOp::ReplaceOne {
                filter,
                replacement,
                upsert,
            } => match position(docs, filter)? {
                Some(index) => {
                    summary.matched += 1;
                    let mut replacement = replacement.clone();
                    if let Some(old_id) = docs[index].get("_id").cloned() {
                        match replacement.get("_id") {
                            Some(new_id) if *new_id != old_id => {
                                return Err(StoreError::InvalidOperation(format!(
                                    "replacement would change _id from {old_id} to {new_id}"
                                )));
                            }
                            Some(_) => {}
                            None => {
                                replacement.insert("_id".to_string(), old_id);
                            }
                        }
                    }
                    if docs[index] != replacement {
                        docs[index] = replacement;
                        summary.modified += 1;
                    }
                }
                None if *upsert => {
                    let mut document = replacement.clone();
                    if !document.contains_key("_id") {
                        if let Some(id) = seed_from_filter(filter)?.remove("_id") {
                            document.insert("_id".to_string(), id);
                        }
                    }
                    self.ensure_id(&mut document);
                    docs.push(document);
                    summary.upserted += 1;
                }
                None => {}
            },
            WriteOp::UpdateOne {
                filter,
                update,
                upsert,
            } => {
                validate_update(update)?;
                match position(docs, filter)? {
                    Some(index) => {
                        summary.matched += 1;
                        if apply_update(&mut docs[index], update)? {
                            summary.modified += 1;
                        }
                    }
                    None if *upsert => {
                        let mut document = seed_from_filter(filter)?;
                        apply_update(&mut document, update)?;
                        self.ensure_id(&mut document);
                        docs.push(document);
                        summary.upserted += 1;
                    }
                    None => {}
                }
            }
            WriteOp::UpdateMany { filter, update } => {
                validate_update(update)?;
                for doc in docs.iter_mut() {
                    if matches(doc, filter)? {
                        summary.matched += 1;
                        if apply_update(doc, update)? {
                            summary.modified += 1;
                        }
                    }
                }
            }
        }
        Ok(summary)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn position(docs: &[Document], filter: &Document) -> StoreResult<Option<usize>> {
    for (index, doc) in docs.iter().enumerate() {
        if matches(doc, filter)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn filtered(docs: &[Document], filter: &Document) -> StoreResult<Vec<Document>> {
    let mut out = Vec::new();
    for doc in docs {
        if matches(doc, filter)? {
            out.push(doc.clone());
        }
    }
    Ok(out)
}

fn single_stage(stage: &Document) -> StoreResult<(&str, &Value)> {
    let mut entries = stage.iter();
    match (entries.next(), entries.next()) {
        (Some((name, spec)), None) => Ok((name.as_str(), spec)),
        _ => Err(StoreError::InvalidOperation(
            "pipeline stage must have exactly one operator".into(),
        )),
    }
}

fn sort_spec(spec: &Value) -> StoreResult<Vec<(String, SortOrder)>> {
    let fields = spec
        .as_object()
        .ok_or_else(|| StoreError::InvalidOperation("$sort needs a document".into()))?;
    fields
        .iter()
        .map(|(field, order)| {
            SortOrder::from_spec(order)
                .map(|order| (field.clone(), order))
                .ok_or_else(|| {
                    StoreError::InvalidOperation(format!("$sort order for {field} must be 1 or -1"))
                })
        })
        .collect()
}

impl DocumentStore for InMemoryDocumentStore {
    fn find(
        &self,
        database: &str,
        collection: &str,
        query: &FindQuery,
    ) -> StoreResult<Vec<Document>> {
        let mut docs = filtered(&self.documents(database, collection), &query.filter)?;
        sort_documents(&mut docs, &query.sort);
        if let Some(limit) = query.effective_limit() {
            docs.truncate(limit);
        }
        match &query.projection {
            Some(fields) => docs.iter().map(|d| project(d, fields)).collect(),
            None => Ok(docs),
        }
    }

    fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: &[Document],
    ) -> StoreResult<Vec<Document>> {
        let mut docs = self.documents(database, collection);
        for stage in pipeline {
            match single_stage(stage)? {
                ("$match", Value::Object(filter)) => docs = filtered(&docs, filter)?,
                ("$sort", spec) => sort_documents(&mut docs, &sort_spec(spec)?),
                ("$limit", spec) => {
                    let limit = spec.as_u64().filter(|n| *n > 0).ok_or_else(|| {
                        StoreError::InvalidOperation("$limit must be a positive integer".into())
                    })?;
                    docs.truncate(limit as usize);
                }
                ("$match", _) => {
                    return Err(StoreError::InvalidOperation("$match needs a document".into()));
                }
                (other, _) => {
                    return Err(StoreError::Unsupported(format!("pipeline stage {other}")));
                }
            }
        }
        Ok(docs)
    }

    fn bulk_write(
        &self,
        database: &str,
        collection: &str,
        ops: &[WriteOp],
    ) -> StoreResult<BulkWriteSummary> {
        let namespace = format!("{database}.{collection}");
        let mut dbs = self.databases.write().expect("lock poisoned");
        let docs = dbs
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
        let mut summary = BulkWriteSummary::default();
        for op in ops {
            summary += self.apply(&namespace, docs, op)?;
        }
        Ok(summary)
    }

    fn list_collections(&self, database: &str) -> StoreResult<Vec<String>> {
        let dbs = self.databases.read().expect("lock poisoned");
        Ok(dbs
            .get(database)
            .map(|cols| cols.keys().cloned().collect())
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("document_count", &self.len())
            .finish()
    }
}

/// One connection to a shared [`InMemoryDocumentStore`].
///
/// Closing the connection does not affect the store or other connections.
#[derive(Debug)]
pub struct InMemoryConnection {
    store: Arc<InMemoryDocumentStore>,
    closed: AtomicBool,
}

impl InMemoryConnection {
    pub fn new(store: Arc<InMemoryDocumentStore>) -> Self {
        Self {
            store,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn open(&self) -> StoreResult<&InMemoryDocumentStore> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(&self.store)
    }
}

impl DocumentStore for InMemoryConnection {
    fn find(
        &self,
        database: &str,
        collection: &str,
        query: &FindQuery,
    ) -> StoreResult<Vec<Document>> {
        self.open()?.find(database, collection, query)
    }

    fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: &[Document],
    ) -> StoreResult<Vec<Document>> {
        self.open()?.aggregate(database, collection, pipeline)
    }

    fn bulk_write(
        &self,
        database: &str,
        collection: &str,
        ops: &[WriteOp],
    ) -> StoreResult<BulkWriteSummary> {
        self.open()?.bulk_write(database, collection, ops)
    }

    fn list_collections(&self, database: &str) -> StoreResult<Vec<String>> {
        self.open()?.list_collections(database)
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Connector handing out connections to a shared in-memory store.
///
/// When built with [`InMemoryConnector::with_credentials`], only those
/// credentials are accepted.
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    store: Arc<InMemoryDocumentStore>,
    accepted: Option<StoreCredentials>,
}

impl InMemoryConnector {
    pub fn new(store: Arc<InMemoryDocumentStore>) -> Self {
        Self { store, accepted: None }
    }

    pub fn with_credentials(
        store: Arc<InMemoryDocumentStore>,
        accepted: StoreCredentials,
    ) -> Self {
        Self {
            store,
            accepted: Some(accepted),
        }
    }

    pub fn store(&self) -> &Arc<InMemoryDocumentStore> {
        &self.store
    }
}

impl StoreConnector for InMemoryConnector {
    fn connect(&self, credentials: &StoreCredentials) -> StoreResult<Arc<dyn DocumentStore>> {
        if let Some(accepted) = &self.accepted {
            if accepted != credentials {
                return Err(StoreError::Auth {
                    user: credentials.user.clone(),
                });
            }
        }
        Ok(Arc::new(InMemoryConnection::new(Arc::clone(&self.store))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn seeded() -> InMemoryDocumentStore {
        let store = InMemoryDocumentStore::new();
        let ops: Vec<WriteOp> = [
            json!({"_id": "a", "function": "orders", "n": 2}),
            json!({"_id": "b", "function": "stock", "n": 1}),
            json!({"_id": "c", "function": "orders", "n": 3}),
        ]
        .into_iter()
        .map(|d| WriteOp::InsertOne { document: doc(d) })
        .collect();
        store.bulk_write("cfg", "functions", &ops).unwrap();
        store
    }

    #[test]
    fn insert_generates_ids_and_rejects_duplicates() {
        let store = InMemoryDocumentStore::new();
        let summary = store
            .bulk_write("db", "c", &[WriteOp::InsertOne { document: doc(json!({"x": 1})) }])
            .unwrap();
        assert_eq!(summary.inserted, 1);
        let docs = store.documents("db", "c");
        assert_eq!(docs[0]["_id"].as_str().map(str::len), Some(24));

        let dup = WriteOp::InsertOne { document: docs[0].clone() };
        assert!(matches!(
            store.bulk_write("db", "c", &[dup]),
            Err(StoreError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn find_filters_sorts_limits_projects() {
        let store = seeded();
        let query = FindQuery::eq("function", "orders")
            .sort_by("n", SortOrder::Descending)
            .limit(1)
            .project(["n"]);
        let found = store.find("cfg", "functions", &query).unwrap();
        assert_eq!(found, vec![doc(json!({"_id": "c", "n": 3}))]);

        let all = store.find("cfg", "functions", &FindQuery::all()).unwrap();
        assert_eq!(all.len(), 3);
        assert!(store.find("cfg", "missing", &FindQuery::all()).unwrap().is_empty());
    }

    #[test]
    fn replace_upsert_inserts_then_replaces() {
        let store = InMemoryDocumentStore::new();
        let op = |v: i64| WriteOp::ReplaceOne {
            filter: doc(json!({"_id": "k"})),
            replacement: doc(json!({"v": v})),
            upsert: true,
        };
        let first = store.bulk_write("db", "c", &[op(1)]).unwrap();
        assert_eq!(first.upserted, 1);
        let second = store.bulk_write("db", "c", &[op(2), op(2)]).unwrap();
        assert_eq!((second.matched, second.modified), (2, 1));
        assert_eq!(store.documents("db", "c"), vec![doc(json!({"_id": "k", "v": 2}))]);
    }

    #[test]
    fn replace_cannot_change_id() {
        let store = seeded();
        let op = WriteOp::ReplaceOne {
            filter: doc(json!({"_id": "a"})),
            replacement: doc(json!({"_id": "z"})),
            upsert: false,
        };
        assert!(matches!(
            store.bulk_write("cfg", "functions", &[op]),
            Err(StoreError::InvalidOperation(_))
        ));
    }

    #[test]
    fn update_one_and_many() {
        let store = seeded();
        let ops = [
            WriteOp::UpdateOne {
                filter: doc(json!({"function": "orders"})),
                update: doc(json!({"$set": {"enabled": true}})),
                upsert: false,
            },
            WriteOp::UpdateMany {
                filter: doc(json!({"function": "orders"})),
                update: doc(json!({"$set": {"n": 0}})),
            },
            WriteOp::UpdateOne {
                filter: doc(json!({"function": "new"})),
                update: doc(json!({"$set": {"n": 9}})),
                upsert: true,
            },
        ];
        let summary = store.bulk_write("cfg", "functions", &ops).unwrap();
        assert_eq!(summary.matched, 3);
        assert_eq!(summary.modified, 3);
        assert_eq!(summary.upserted, 1);

        let orders = store.find("cfg", "functions", &FindQuery::eq("function", "orders")).unwrap();
        assert!(orders.iter().all(|d| d["n"] == json!(0)));
        assert_eq!(orders[0]["enabled"], json!(true));
        assert!(!orders[1].contains_key("enabled"));

        let created = store.find("cfg", "functions", &FindQuery::eq("function", "new")).unwrap();
        assert_eq!(created[0]["n"], json!(9));
    }

    #[test]
    fn invalid_update_rejected_even_without_matches() {
        let store = seeded();
        let op = WriteOp::UpdateMany {
            filter: doc(json!({"function": "nothing"})),
            update: doc(json!({"n": 1})),
        };
        assert!(store.bulk_write("cfg", "functions", &[op]).is_err());
    }

    #[test]
    fn aggregate_pipeline() {
        let store = seeded();
        let pipeline = vec![
            doc(json!({"$match": {"function": "orders"}})),
            doc(json!({"$sort": {"n": 1}})),
            doc(json!({"$limit": 1})),
        ];
        let out = store.aggregate("cfg", "functions", &pipeline).unwrap();
        assert_eq!(out, vec![doc(json!({"_id": "a", "function": "orders", "n": 2}))]);

        let unsupported = vec![doc(json!({"$group": {"_id": "$function"}}))];
        assert!(matches!(
            store.aggregate("cfg", "functions", &unsupported),
            Err(StoreError::Unsupported(_))
        ));
        let bad_sort = vec![doc(json!({"$sort": {"n": 0}}))];
        assert!(matches!(
            store.aggregate("cfg", "functions", &bad_sort),
            Err(StoreError::InvalidOperation(_))
        ));
    }

    #[test]
    fn list_collections_sorted() {
        let store = seeded();
        store
            .bulk_write("cfg", "audit", &[WriteOp::InsertOne { document: doc(json!({})) }])
            .unwrap();
        assert_eq!(store.list_collections("cfg").unwrap(), vec!["audit", "functions"]);
        assert!(store.list_collections("other").unwrap().is_empty());
    }

    #[test]
    fn connector_checks_credentials_and_close() {
        let store = Arc::new(seeded());
        let creds = StoreCredentials::new("mem", "user", "pw");
        let connector = InMemoryConnector::with_credentials(Arc::clone(&store), creds.clone());

        let wrong = StoreCredentials::new("mem", "user", "nope");
        assert!(matches!(connector.connect(&wrong), Err(StoreError::Auth { .. })));

        let conn = connector.connect(&creds).unwrap();
        assert_eq!(conn.find("cfg", "functions", &FindQuery::all()).unwrap().len(), 3);
        conn.close().unwrap();
        assert!(matches!(conn.list_collections("cfg"), Err(StoreError::Closed)));

        let again = connector.connect(&creds).unwrap();
        assert!(again.list_collections("cfg").is_ok());
    }
}
