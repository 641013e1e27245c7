//! Per-function configuration documents.
//!
//! Each function's configuration lives in one collection as a document whose
//! `function` field holds the function name. Updates go through the diff
//! engine so unchanged configurations are never rewritten.

use std::sync::Arc;

use ijr_diff::{CompareOptions, Comparison, DiffNode, FlattenOptions};
use ijr_secrets::{SecretStore, Secrets};
use ijr_store::{
    Document, DocumentReader, DocumentStore, DocumentWriter, FindQuery, SortOrder,
    StoreConnector, StoreCredentials, TIMESTAMP_FIELD,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::settings::Settings;

/// Field naming the function a configuration document belongs to.
pub const FUNCTION_FIELD: &str = "function";

pub struct ConfigLoader {
    store: Arc<dyn DocumentStore>,
    reader: DocumentReader,
    database: String,
    collection: String,
    writer_threshold: usize,
    compare: CompareOptions,
    flatten: FlattenOptions,
}

impl ConfigLoader {
    /// Read store credentials from the configured secret and connect.
    pub fn connect<S: SecretStore>(
        settings: &Settings,
        secrets: &Secrets<S>,
        connector: &dyn StoreConnector,
    ) -> ConfigResult<Self> {
        let version = settings.secret_version()?;
        let credentials: StoreCredentials =
            secrets.typed_secret(&settings.store_secret, Some(version))?;
        let store = connector.connect(&credentials)?;
        info!(
            server = %credentials.server,
            database = %settings.database,
            collection = %settings.collection,
            "connected to configuration store"
        );
        Self::new(store, settings)
    }

    /// Use an already open connection.
    pub fn new(store: Arc<dyn DocumentStore>, settings: &Settings) -> ConfigResult<Self> {
        Ok(Self {
            reader: DocumentReader::new(Arc::clone(&store)),
            store,
            database: settings.database.clone(),
            collection: settings.collection.clone(),
            writer_threshold: settings.writer_threshold,
            compare: settings.compare_options()?,
            flatten: settings.flatten_options()?,
        })
    }

    /// The most recent configuration of `name`.
    pub fn function_config(&self, name: &str) -> ConfigResult<Document> {
        self.latest(name)?
            .ok_or_else(|| ConfigError::NotFound(name.to_string()))
    }

    /// Every configuration document, ordered by function name.
    pub fn all_configs(&self) -> ConfigResult<Vec<Document>> {
        let query = FindQuery::all().sort_by(FUNCTION_FIELD, SortOrder::Ascending);
        Ok(self.reader.find(&self.database, &self.collection, &query)?)
    }

    /// Store `config` as the configuration of `name` if it differs from the
    /// stored one.
    ///
    /// Reserved `_` keys and the configured ignore patterns take no part in
    /// the comparison. Returns the flattened diff, or `None` when nothing
    /// changed and nothing was written. A function without a stored
    /// configuration compares against an empty document.
    pub fn update_function_config(
        &self,
        name: &str,
        mut config: Document,
    ) -> ConfigResult<Option<DiffNode>> {
        config.insert(FUNCTION_FIELD.to_string(), Value::String(name.to_string()));
        let stored = self.latest(name)?.unwrap_or_default();
        let comparison = Comparison::new(
            &Value::Object(stored),
            &Value::Object(config.clone()),
            &self.compare,
            &self.flatten,
        );
        let (_, flattened) = comparison.into_parts();
        let Some(changes) = flattened else {
            debug!(function = name, "configuration unchanged");
            return Ok(None);
        };

        let mut writer =
            DocumentWriter::new(Arc::clone(&self.store), &self.database, &self.collection)
                .with_threshold(self.writer_threshold);
        writer.write_data(config, Some(name))?;
        writer.close()?;
        info!(function = name, changes = changes.len(), "configuration updated");
        Ok(Some(changes))
    }

    fn latest(&self, name: &str) -> ConfigResult<Option<Document>> {
        let query = FindQuery::eq(FUNCTION_FIELD, name)
            .sort_by(TIMESTAMP_FIELD, SortOrder::Descending)
            .limit(1);
        Ok(self.reader.find_one(&self.database, &self.collection, &query)?)
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}
