use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use stratum_core::{
    BoxError, Condition, Document, DocumentDatabase, Filter, IndexOrder, IndexSpec, Update,
};

use crate::sql::{
    COLLECTION_TABLE_PREFIX, collection_table, fits_identifier, index_fits, is_valid_name,
    physical_index, quote_ident, quote_literal,
};

/// Document database on top of postgres.
///
/// Each collection is a table `stratum_doc_<collection>` holding one JSONB
/// `body` per document. Secondary indexes are expression indexes over the
/// indexed fields and are described in the `_stratum_indexes` table so they
/// can be listed back. A missing field is indexed as JSON `null`, which makes
/// unique indexes behave as in a document database.
#[derive(Debug, Clone)]
pub struct PgDocumentDatabase {
    pool: PgPool,
}

/// Errors returned by the [`PgDocumentDatabase`].
#[derive(Debug, thiserror::Error)]
pub enum PgDocumentDatabaseError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A collection or index name can't be mapped to a postgres identifier.
    #[error("Invalid name '{0}': use ASCII letters, digits, '_' or '-' and keep it short")]
    InvalidName(String),

    /// An index was declared without keys.
    #[error("Index '{index}' on collection '{collection}' has no keys")]
    EmptyIndex {
        /// The collection of the index.
        collection: String,
        /// The index name.
        index: String,
    },

    /// An index with the same name but another definition exists.
    #[error("Index '{index}' already exists on collection '{collection}' with different options")]
    IndexConflict {
        /// The collection of the index.
        collection: String,
        /// The index name.
        index: String,
    },

    /// A stored row doesn't hold what stratum wrote.
    #[error("Corrupt data in '{table}': {reason}")]
    Corrupt {
        /// The table holding the row.
        table: String,
        /// What is wrong with it.
        reason: String,
    },
}

type Result<T> = std::result::Result<T, PgDocumentDatabaseError>;

impl PgDocumentDatabase {
    /// Creates a new `PgDocumentDatabase` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ensures the index description table exists.
    pub async fn ensure_index_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _stratum_indexes (
                id BIGSERIAL PRIMARY KEY,
                collection VARCHAR(255) NOT NULL,
                name VARCHAR(255) NOT NULL,
                keys JSONB NOT NULL,
                is_unique BOOLEAN NOT NULL,
                UNIQUE (collection, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The quoted table name of a collection.
    fn table(&self, collection: &str) -> Result<String> {
        if !is_valid_name(collection) || !fits_identifier(COLLECTION_TABLE_PREFIX, &[collection]) {
            return Err(PgDocumentDatabaseError::InvalidName(collection.to_string()));
        }
        Ok(quote_ident(&collection_table(collection)))
    }

    async fn table_exists(&self, collection: &str) -> Result<bool> {
        self.table(collection)?;
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
            )
            "#,
        )
        .bind(collection_table(collection))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_table(&self, collection: &str) -> Result<()> {
        let table = self.table(collection)?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (id BIGSERIAL PRIMARY KEY, body JSONB NOT NULL)"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn drop_table(&self, collection: &str) -> Result<()> {
        let table = self.table(collection)?;
        self.ensure_index_table().await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM _stratum_indexes WHERE collection = $1")
            .bind(collection)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        log::debug!("Dropped collection {}", collection);
        Ok(())
    }

    async fn create_index_impl(&self, collection: &str, index: &IndexSpec) -> Result<()> {
        if !is_valid_name(&index.name) || !index_fits(collection, &index.name) {
            return Err(PgDocumentDatabaseError::InvalidName(index.name.clone()));
        }
        if index.keys.is_empty() {
            return Err(PgDocumentDatabaseError::EmptyIndex {
                collection: collection.to_string(),
                index: index.name.clone(),
            });
        }

        let table = self.table(collection)?;
        self.create_table(collection).await?;
        self.ensure_index_table().await?;

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            "SELECT keys, is_unique FROM _stratum_indexes WHERE collection = $1 AND name = $2",
        )
        .bind(collection)
        .bind(&index.name)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            let existing = decode_index(index.name.clone(), &row)?;
            if &existing == index {
                return Ok(());
            }
            return Err(PgDocumentDatabaseError::IndexConflict {
                collection: collection.to_string(),
                index: index.name.clone(),
            });
        }

        let expressions: Vec<String> = index
            .keys
            .iter()
            .map(|(field, order)| {
                let order = match order {
                    IndexOrder::Ascending => "ASC",
                    IndexOrder::Descending => "DESC",
                };
                format!(
                    "(COALESCE(body -> {}, 'null'::jsonb)) {order}",
                    quote_literal(field)
                )
            })
            .collect();

        sqlx::query(&format!(
            "CREATE {}INDEX {} ON {table} ({})",
            if index.unique { "UNIQUE " } else { "" },
            quote_ident(&physical_index(collection, &index.name)),
            expressions.join(", ")
        ))
        .execute(&mut *tx)
        .await?;

        let keys: Vec<(String, &str)> = index
            .keys
            .iter()
            .map(|(field, order)| {
                let order = match order {
                    IndexOrder::Ascending => "asc",
                    IndexOrder::Descending => "desc",
                };
                (field.clone(), order)
            })
            .collect();

        sqlx::query(
            r#"
            INSERT INTO _stratum_indexes (collection, name, keys, is_unique)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(collection)
        .bind(&index.name)
        .bind(Json(keys))
        .bind(index.unique)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::debug!("Created index {} on {}", index.name, collection);
        Ok(())
    }

    async fn drop_index_impl(&self, collection: &str, name: &str) -> Result<()> {
        self.table(collection)?;
        if !is_valid_name(name) || !index_fits(collection, name) {
            return Err(PgDocumentDatabaseError::InvalidName(name.to_string()));
        }
        self.ensure_index_table().await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            "DROP INDEX IF EXISTS {}",
            quote_ident(&physical_index(collection, name))
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM _stratum_indexes WHERE collection = $1 AND name = $2")
            .bind(collection)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    async fn list_indexes_impl(&self, collection: &str) -> Result<Vec<IndexSpec>> {
        self.table(collection)?;
        self.ensure_index_table().await?;

        let rows = sqlx::query(
            r#"
            SELECT name, keys, is_unique
            FROM _stratum_indexes
            WHERE collection = $1
            ORDER BY id ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| decode_index(row.try_get("name")?, row))
            .collect()
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<()> {
        let table = self.table(collection)?;
        self.create_table(collection).await?;

        sqlx::query(&format!("INSERT INTO {table} (body) VALUES ($1)"))
            .bind(Json(Value::Object(document)))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_impl(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let table = self.table(collection)?;
        if !self.table_exists(collection).await? {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT id, body FROM {table}"));
        push_filter(&mut query, filter);
        query.push(" ORDER BY id ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| decode_document(collection, row).map(|(_, document)| document))
            .collect()
    }

    async fn update_impl(&self, collection: &str, filter: &Filter, update: &Update) -> Result<u64> {
        let table = self.table(collection)?;
        if !self.table_exists(collection).await? {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT id, body FROM {table}"));
        push_filter(&mut query, filter);
        query.push(" ORDER BY id ASC FOR UPDATE");
        let rows = query.build().fetch_all(&mut *tx).await?;

        let mut matched = 0;
        for row in &rows {
            let (id, mut document) = decode_document(collection, row)?;
            update.apply(&mut document);
            sqlx::query(&format!("UPDATE {table} SET body = $1 WHERE id = $2"))
                .bind(Json(Value::Object(document)))
                .bind(id)
                .execute(&mut *tx)
                .await?;
            matched += 1;
        }

        tx.commit().await?;

        log::debug!("update_many on {} matched {} documents", collection, matched);
        Ok(matched)
    }
}

/// Appends the filter conditions as a `WHERE` clause.
fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    for (i, condition) in filter.conditions().iter().enumerate() {
        query.push(if i == 0 { " WHERE " } else { " AND " });
        match condition {
            Condition::Eq(field, value) => {
                query.push("body -> ");
                query.push_bind(field.clone());
                query.push(" = ");
                query.push_bind(Json(value.clone()));
            }
            Condition::Exists(field, present) => {
                if !present {
                    query.push("NOT ");
                }
                query.push("(body ? ");
                query.push_bind(field.clone());
                query.push(")");
            }
        }
    }
}

fn decode_document(collection: &str, row: &sqlx::postgres::PgRow) -> Result<(i64, Document)> {
    let id: i64 = row.try_get("id")?;
    let Json(body): Json<Value> = row.try_get("body")?;
    match body {
        Value::Object(document) => Ok((id, document)),
        other => Err(PgDocumentDatabaseError::Corrupt {
            table: collection_table(collection),
            reason: format!("document {id} is not an object: {other}"),
        }),
    }
}

fn decode_index(name: String, row: &sqlx::postgres::PgRow) -> Result<IndexSpec> {
    let Json(raw_keys): Json<Vec<(String, String)>> = row.try_get("keys")?;
    let unique: bool = row.try_get("is_unique")?;

    let mut keys = Vec::with_capacity(raw_keys.len());
    for (field, order) in raw_keys {
        let order = match order.as_str() {
            "asc" => IndexOrder::Ascending,
            "desc" => IndexOrder::Descending,
            other => {
                return Err(PgDocumentDatabaseError::Corrupt {
                    table: "_stratum_indexes".to_string(),
                    reason: format!("unknown order '{other}' in index '{name}'"),
                });
            }
        };
        keys.push((field, order));
    }

    Ok(IndexSpec { name, keys, unique })
}

#[async_trait]
impl DocumentDatabase for PgDocumentDatabase {
    async fn create_collection(&self, name: &str) -> std::result::Result<(), BoxError> {
        Ok(self.create_table(name).await?)
    }

    async fn collection_exists(&self, name: &str) -> std::result::Result<bool, BoxError> {
        Ok(self.table_exists(name).await?)
    }

    async fn drop_collection(&self, name: &str) -> std::result::Result<(), BoxError> {
        Ok(self.drop_table(name).await?)
    }

    async fn create_index(
        &self,
        collection: &str,
        index: &IndexSpec,
    ) -> std::result::Result<(), BoxError> {
        Ok(self.create_index_impl(collection, index).await?)
    }

    async fn drop_index(&self, collection: &str, name: &str) -> std::result::Result<(), BoxError> {
        Ok(self.drop_index_impl(collection, name).await?)
    }

    async fn list_indexes(&self, collection: &str) -> std::result::Result<Vec<IndexSpec>, BoxError> {
        Ok(self.list_indexes_impl(collection).await?)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> std::result::Result<(), BoxError> {
        Ok(self.insert(collection, document).await?)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> std::result::Result<Vec<Document>, BoxError> {
        Ok(self.find_impl(collection, filter).await?)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> std::result::Result<u64, BoxError> {
        Ok(self.update_impl(collection, filter, update).await?)
    }
}
