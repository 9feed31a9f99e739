//! The document database collaborator.
//!
//! Migration bodies only ever talk to the database through [`DocumentDatabase`],
//! which keeps the runner and the migrations independent from the concrete
//! database product. Filters and updates are small typed values rather than raw
//! operator documents, so every backend can translate them faithfully.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::BoxError;

/// A schemaless document: a JSON object.
pub type Document = Map<String, Value>;

/// A single condition on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The field exists and equals the value.
    Eq(String, Value),
    /// The field is present (`true`) or absent (`false`).
    Exists(String, bool),
}

/// A conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// A filter matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Requires `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.into(), value.into()));
        self
    }

    /// Requires `field` to be present or absent.
    pub fn exists(mut self, field: impl Into<String>, present: bool) -> Self {
        self.conditions.push(Condition::Exists(field.into(), present));
        self
    }

    /// The conditions of this filter, in insertion order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => document.get(field) == Some(value),
            Condition::Exists(field, present) => document.contains_key(field) == *present,
        })
    }
}

/// A single field operation of an [`Update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Sets the field to the value, creating it if needed.
    Set(String, Value),
    /// Removes the field if present.
    Unset(String),
    /// Moves the value of the first field to the second one, if present.
    Rename(String, String),
}

/// An ordered list of field operations applied to each matched document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    /// An update with no operations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(field.into(), value.into()));
        self
    }

    /// Removes `field`.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(field.into()));
        self
    }

    /// Renames `from` to `to`.
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Rename(from.into(), to.into()));
        self
    }

    /// The operations of this update, in insertion order.
    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    /// Whether the update has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies the operations in order to a document.
    pub fn apply(&self, document: &mut Document) {
        for op in &self.ops {
            match op {
                UpdateOp::Set(field, value) => {
                    document.insert(field.clone(), value.clone());
                }
                UpdateOp::Unset(field) => {
                    document.remove(field);
                }
                UpdateOp::Rename(from, to) => {
                    if let Some(value) = document.remove(from) {
                        document.insert(to.clone(), value);
                    }
                }
            }
        }
    }
}

/// Sort order of an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrder {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
}

/// Description of a secondary index on a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name, unique per collection.
    pub name: String,
    /// Indexed top-level fields and their order.
    pub keys: Vec<(String, IndexOrder)>,
    /// Whether two documents may share the same key values.
    pub unique: bool,
}

impl IndexSpec {
    /// Creates a non-unique index specification with no keys.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            unique: false,
        }
    }

    /// Adds an ascending key.
    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), IndexOrder::Ascending));
        self
    }

    /// Adds a descending key.
    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), IndexOrder::Descending));
        self
    }

    /// Marks the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// The capability set migrations may use against the database.
///
/// Collection and index creation as well as drops are idempotent: creating
/// something that exists, or dropping something that doesn't, is not an error.
#[async_trait]
pub trait DocumentDatabase: Send + Sync {
    /// Creates a collection if it does not exist yet.
    async fn create_collection(&self, name: &str) -> Result<(), BoxError>;

    /// Checks whether a collection exists.
    async fn collection_exists(&self, name: &str) -> Result<bool, BoxError>;

    /// Drops a collection and all of its documents and indexes.
    async fn drop_collection(&self, name: &str) -> Result<(), BoxError>;

    /// Creates an index, creating the collection first when needed.
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<(), BoxError>;

    /// Drops an index by name.
    async fn drop_index(&self, collection: &str, name: &str) -> Result<(), BoxError>;

    /// Lists the secondary indexes of a collection.
    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexSpec>, BoxError>;

    /// Inserts a document, creating the collection first when needed.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), BoxError>;

    /// Returns every document matching the filter.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, BoxError>;

    /// Applies the update to every document matching the filter and returns how
    /// many documents matched.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::all().matches(&doc(json!({}))));
        assert!(Filter::all().matches(&doc(json!({"a": 1}))));
    }

    #[test]
    fn filter_conditions_are_conjunctive() {
        let filter = Filter::all().eq("role", "admin").exists("mfa_enabled", false);
        assert!(filter.matches(&doc(json!({"role": "admin"}))));
        assert!(!filter.matches(&doc(json!({"role": "admin", "mfa_enabled": true}))));
        assert!(!filter.matches(&doc(json!({"role": "user"}))));
    }

    #[test]
    fn eq_does_not_match_missing_field() {
        assert!(!Filter::all().eq("a", Value::Null).matches(&doc(json!({}))));
        assert!(Filter::all().eq("a", Value::Null).matches(&doc(json!({"a": null}))));
    }

    #[test]
    fn update_applies_operations_in_order() {
        let mut document = doc(json!({"secret": "abc", "stale": 1}));
        Update::new()
            .rename("secret", "totp_secret")
            .unset("stale")
            .set("mfa_enabled", false)
            .apply(&mut document);
        assert_eq!(
            Value::Object(document),
            json!({"totp_secret": "abc", "mfa_enabled": false})
        );
    }

    #[test]
    fn rename_of_missing_field_is_a_no_op() {
        let mut document = doc(json!({"a": 1}));
        Update::new().rename("b", "c").apply(&mut document);
        assert_eq!(Value::Object(document), json!({"a": 1}));
    }

    #[test]
    fn index_spec_builder() {
        let spec = IndexSpec::new("accounts_email").asc("email").desc("created_at").unique();
        assert!(spec.unique);
        assert_eq!(spec.keys[0], ("email".to_string(), IndexOrder::Ascending));
        assert_eq!(spec.keys[1], ("created_at".to_string(), IndexOrder::Descending));
    }
}
