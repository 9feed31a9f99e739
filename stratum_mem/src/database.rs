use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use stratum_core::{BoxError, Document, DocumentDatabase, Filter, IndexSpec, Update};

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

/// The in-memory data store.
#[derive(Debug, Default)]
struct DatabaseData {
    collections: HashMap<String, Collection>,
}

/// An in-memory document database.
///
/// Useful for tests and development. Unique indexes are enforced the way a
/// document database does: a missing field counts as `null`, so two documents
/// lacking an indexed field collide.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDatabase {
    data: Arc<Mutex<DatabaseData>>,
}

impl InMemoryDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        log::debug!("Creating a new InMemoryDatabase");
        Self::default()
    }

    /// Names of every existing collection, sorted.
    pub async fn collection_names(&self) -> Vec<String> {
        let data = self.data.lock().await;
        let mut names: Vec<String> = data.collections.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Errors returned by the [`InMemoryDatabase`].
#[derive(Debug, thiserror::Error)]
pub enum InMemoryDatabaseError {
    /// A write would make two documents share the key of a unique index.
    #[error("Duplicate key {key} for unique index '{index}' on collection '{collection}'")]
    DuplicateKey {
        /// The collection written to.
        collection: String,
        /// The violated index.
        index: String,
        /// The duplicated key values.
        key: String,
    },
    /// An index with the same name but another definition exists.
    #[error("Index '{index}' already exists on collection '{collection}' with different options")]
    IndexConflict {
        /// The collection of the index.
        collection: String,
        /// The index name.
        index: String,
    },
}

fn index_key(index: &IndexSpec, document: &Document) -> Vec<Value> {
    index
        .keys
        .iter()
        .map(|(field, _)| document.get(field).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Checks every unique index of `indexes` against `documents`.
fn check_unique(
    collection: &str,
    indexes: &[IndexSpec],
    documents: &[Document],
) -> Result<(), InMemoryDatabaseError> {
    for index in indexes.iter().filter(|i| i.unique) {
        let mut seen = HashSet::with_capacity(documents.len());
        for document in documents {
            // Values aren't `Hash`; their canonical JSON text is.
            let key = Value::Array(index_key(index, document)).to_string();
            if !seen.insert(key.clone()) {
                return Err(InMemoryDatabaseError::DuplicateKey {
                    collection: collection.to_string(),
                    index: index.name.clone(),
                    key,
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentDatabase for InMemoryDatabase {
    async fn create_collection(&self, name: &str) -> Result<(), BoxError> {
        let mut data = self.data.lock().await;
        if !data.collections.contains_key(name) {
            log::debug!("Creating collection {}", name);
            data.collections.insert(name.to_string(), Collection::default());
        }
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, BoxError> {
        Ok(self.data.lock().await.collections.contains_key(name))
    }

    async fn drop_collection(&self, name: &str) -> Result<(), BoxError> {
        if self.data.lock().await.collections.remove(name).is_some() {
            log::debug!("Dropped collection {}", name);
        }
        Ok(())
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<(), BoxError> {
        let mut data = self.data.lock().await;
        let coll = data.collections.entry(collection.to_string()).or_default();

        if let Some(existing) = coll.indexes.iter().find(|i| i.name == index.name) {
            if existing == index {
                return Ok(());
            }
            return Err(Box::new(InMemoryDatabaseError::IndexConflict {
                collection: collection.to_string(),
                index: index.name.clone(),
            }));
        }

        check_unique(collection, std::slice::from_ref(index), &coll.documents)?;
        log::debug!("Creating index {} on {}", index.name, collection);
        coll.indexes.push(index.clone());
        Ok(())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<(), BoxError> {
        let mut data = self.data.lock().await;
        if let Some(coll) = data.collections.get_mut(collection) {
            coll.indexes.retain(|i| i.name != name);
        }
        Ok(())
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexSpec>, BoxError> {
        let data = self.data.lock().await;
        Ok(data
            .collections
            .get(collection)
            .map(|coll| coll.indexes.clone())
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), BoxError> {
        let mut data = self.data.lock().await;
        let coll = data.collections.entry(collection.to_string()).or_default();

        for index in coll.indexes.iter().filter(|i| i.unique) {
            let key = index_key(index, &document);
            if coll.documents.iter().any(|d| index_key(index, d) == key) {
                return Err(Box::new(InMemoryDatabaseError::DuplicateKey {
                    collection: collection.to_string(),
                    index: index.name.clone(),
                    key: Value::Array(key).to_string(),
                }));
            }
        }

        coll.documents.push(document);
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, BoxError> {
        let data = self.data.lock().await;
        Ok(data
            .collections
            .get(collection)
            .map(|coll| {
                coll.documents
                    .iter()
                    .filter(|d| filter.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, BoxError> {
        let mut data = self.data.lock().await;
        let Some(coll) = data.collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut matched = 0;
        let mut updated = coll.documents.clone();
        for document in updated.iter_mut().filter(|d| filter.matches(d)) {
            update.apply(document);
            matched += 1;
        }

        // All or nothing: a violating update leaves the collection untouched.
        check_unique(collection, &coll.indexes, &updated)?;
        coll.documents = updated;

        log::debug!("update_many on {} matched {} documents", collection, matched);
        Ok(matched)
    }
}
