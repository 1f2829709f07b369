// Read-side projections over the faves table. One implementation with an
// explicit active_only filter instead of per-state query objects.

use std::sync::Arc;

use anyhow::Result;

use crate::models::{EntityRef, Fave, RelationKind};
use crate::store::{fave_from_row, FaveStore};

#[derive(Clone)]
pub struct FaveQueries {
    store: Arc<FaveStore>,
}

impl FaveQueries {
    pub fn new(store: Arc<FaveStore>) -> Self {
        Self { store }
    }

    /// Active associations for a user, optionally of one kind.
    pub async fn active_for_user(
        &self,
        user_id: i64,
        kind: Option<&RelationKind>,
    ) -> Result<Vec<Fave>> {
        self.for_user(user_id, kind, true).await
    }

    /// All associations for a user, withdrawn included.
    pub async fn all_for_user(
        &self,
        user_id: i64,
        kind: Option<&RelationKind>,
    ) -> Result<Vec<Fave>> {
        self.for_user(user_id, kind, false).await
    }

    async fn for_user(
        &self,
        user_id: i64,
        kind: Option<&RelationKind>,
        active_only: bool,
    ) -> Result<Vec<Fave>> {
        let mut sql = String::from(
            "SELECT id, relation_kind_id, entity_kind, entity_id, user_id,
                    withdrawn, created_at, updated_at
             FROM faves WHERE user_id = ?",
        );
        if active_only {
            sql.push_str(" AND withdrawn = 0");
        }
        if kind.is_some() {
            sql.push_str(" AND relation_kind_id = ?");
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query(&sql).bind(user_id);
        if let Some(kind) = kind {
            query = query.bind(kind.id);
        }

        let rows = query.fetch_all(self.store.pool()).await?;
        Ok(rows.iter().map(fave_from_row).collect())
    }

    /// Associations (active and withdrawn) whose target has the given
    /// entity kind, e.g. "which users faved photos".
    pub async fn for_entity_kind(
        &self,
        entity_kind: &str,
        kind: Option<&RelationKind>,
    ) -> Result<Vec<Fave>> {
        let mut sql = String::from(
            "SELECT id, relation_kind_id, entity_kind, entity_id, user_id,
                    withdrawn, created_at, updated_at
             FROM faves WHERE entity_kind = ?",
        );
        if kind.is_some() {
            sql.push_str(" AND relation_kind_id = ?");
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query(&sql).bind(entity_kind);
        if let Some(kind) = kind {
            query = query.bind(kind.id);
        }

        let rows = query.fetch_all(self.store.pool()).await?;
        Ok(rows.iter().map(fave_from_row).collect())
    }

    /// "Has this user an active association with this exact entity."
    /// Absent and withdrawn both come back as `None`; neither is an error.
    pub async fn active_one(
        &self,
        user_id: i64,
        target: &EntityRef,
        kind: &RelationKind,
    ) -> Result<Option<Fave>> {
        let fave = self.store.find_exact(kind.id, target, user_id).await?;
        Ok(fave.filter(|f| f.is_active()))
    }
}
