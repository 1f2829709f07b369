// Entity catalog - resolves (kind, id) pairs against the host's entities.
// The service never owns or validates entity data; it only needs to know
// that a target exists before recording a relationship to it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::error::{AppError, AppResult};
use crate::models::EntityRef;

/// Existence check for one entity kind. Hosts implement this per kind and
/// register the implementations at construction time; nothing is resolved
/// by name at call time.
#[async_trait]
pub trait EntityLookup: Send + Sync {
    async fn exists(&self, id: i64) -> Result<bool>;
}

/// Lookup backed by a fixed id set. Useful for hosts whose entities live
/// in memory, and for tests.
pub struct StaticEntityLookup {
    ids: HashSet<i64>,
}

impl StaticEntityLookup {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self { ids: ids.into_iter().collect() }
    }
}

#[async_trait]
impl EntityLookup for StaticEntityLookup {
    async fn exists(&self, id: i64) -> Result<bool> {
        Ok(self.ids.contains(&id))
    }
}

/// Lookup backed by a host table with an integer `id` primary key.
pub struct TableEntityLookup {
    pool: SqlitePool,
    table: String,
}

impl TableEntityLookup {
    pub fn new(pool: SqlitePool, table: &str) -> Result<Self> {
        // Table names cannot be bound as parameters; restrict to
        // identifier characters before interpolating.
        if table.is_empty()
            || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            anyhow::bail!("invalid catalog table name: {}", table);
        }
        Ok(Self { pool, table: table.to_string() })
    }
}

#[async_trait]
impl EntityLookup for TableEntityLookup {
    async fn exists(&self, id: i64) -> Result<bool> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {} WHERE id = ?",
            self.table
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("n") > 0)
    }
}

/// Registry of the entity kinds known to this deployment. Built once at
/// startup and injected into the relationship manager.
#[derive(Clone, Default)]
pub struct EntityCatalog {
    kinds: HashMap<String, Arc<dyn EntityLookup>>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: &str, lookup: Arc<dyn EntityLookup>) {
        self.kinds.insert(kind.to_string(), lookup);
    }

    pub fn knows(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn kind_names(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }

    /// Normalizes a (kind, id) pair into an `EntityRef`, confirming the
    /// kind is registered, the id is positive, and the entity exists.
    pub async fn resolve(&self, kind: &str, id: i64) -> AppResult<EntityRef> {
        let lookup = self.kinds.get(kind).ok_or_else(|| {
            AppError::Validation(format!("unknown entity kind: {}", kind))
        })?;
        if id <= 0 {
            return Err(AppError::Validation(format!(
                "entity id must be positive, got {}",
                id
            )));
        }
        if !lookup.exists(id).await? {
            return Err(AppError::NotFound(format!(
                "entity {}:{} does not exist",
                kind, id
            )));
        }
        Ok(EntityRef::new(kind, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> EntityCatalog {
        let mut catalog = EntityCatalog::new();
        catalog.register("photo", Arc::new(StaticEntityLookup::new([7, 8])));
        catalog
    }

    #[tokio::test]
    async fn resolves_known_entity() {
        let target = catalog().resolve("photo", 7).await.unwrap();
        assert_eq!(target, EntityRef::new("photo", 7));
    }

    #[tokio::test]
    async fn unknown_kind_is_validation_error() {
        let err = catalog().resolve("video", 7).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn non_positive_id_is_validation_error() {
        let err = catalog().resolve("photo", 0).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_entity_is_not_found() {
        let err = catalog().resolve("photo", 99).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
