// Association store - durable state for relation kinds and fave rows.
// The UNIQUE index on (relation_kind_id, entity_kind, entity_id, user_id)
// is the serialization point for concurrent writers to one tuple; there
// are no advisory locks above it.

use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::{AppError, AppResult};
use crate::models::{EntityRef, Fave, RelationKind};

pub struct FaveStore {
    pool: SqlitePool,
}

impl FaveStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        Ok(FaveStore { pool })
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        FaveStore { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS relation_kinds (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS faves (
                id INTEGER PRIMARY KEY,
                relation_kind_id INTEGER NOT NULL REFERENCES relation_kinds(id),
                entity_kind TEXT NOT NULL,
                entity_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                withdrawn INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(relation_kind_id, entity_kind, entity_id, user_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        // Query-side indexes: by user and by target entity kind.
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_faves_user ON faves(user_id, withdrawn)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_faves_entity_kind ON faves(entity_kind, relation_kind_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // --- relation kinds ---

    pub async fn create_kind(&self, name: &str, slug: &str) -> AppResult<RelationKind> {
        if slug.is_empty()
            || !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::Validation(format!("invalid slug: {:?}", slug)));
        }

        let result = sqlx::query(
            "INSERT INTO relation_kinds (name, slug) VALUES (?, ?)
             ON CONFLICT(slug) DO NOTHING",
        )
        .bind(name)
        .bind(slug)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BadRequest(format!(
                "relation kind with slug '{}' already exists",
                slug
            )));
        }

        Ok(RelationKind {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    /// Get-or-create by slug; used to seed the default kind at startup.
    pub async fn ensure_kind(&self, name: &str, slug: &str) -> Result<RelationKind> {
        sqlx::query(
            "INSERT INTO relation_kinds (name, slug) VALUES (?, ?)
             ON CONFLICT(slug) DO NOTHING",
        )
        .bind(name)
        .bind(slug)
        .execute(&self.pool)
        .await?;

        self.find_kind_by_slug(slug)
            .await?
            .ok_or_else(|| anyhow::anyhow!("relation kind '{}' missing after ensure", slug))
    }

    pub async fn find_kind_by_slug(&self, slug: &str) -> Result<Option<RelationKind>> {
        let row = sqlx::query("SELECT id, name, slug FROM relation_kinds WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| kind_from_row(&r)))
    }

    pub async fn kind_by_slug(&self, slug: &str) -> AppResult<RelationKind> {
        self.find_kind_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("relation kind '{}' not found", slug)))
    }

    pub async fn list_kinds(&self) -> Result<Vec<RelationKind>> {
        let rows = sqlx::query("SELECT id, name, slug FROM relation_kinds ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(kind_from_row).collect())
    }

    /// Edits the display name only. Slugs are immutable once the kind
    /// exists, since associations and URLs reference them.
    pub async fn rename_kind(&self, id: i64, name: &str) -> AppResult<RelationKind> {
        let result = sqlx::query("UPDATE relation_kinds SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("relation kind {} not found", id)));
        }

        let row = sqlx::query("SELECT id, name, slug FROM relation_kinds WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(kind_from_row(&row))
    }

    // --- fave rows ---

    /// Exact tuple lookup; at most one row by the uniqueness invariant.
    pub async fn find_exact(
        &self,
        kind_id: i64,
        target: &EntityRef,
        user_id: i64,
    ) -> Result<Option<Fave>> {
        let row = sqlx::query(
            "SELECT id, relation_kind_id, entity_kind, entity_id, user_id,
                    withdrawn, created_at, updated_at
             FROM faves
             WHERE relation_kind_id = ? AND entity_kind = ? AND entity_id = ? AND user_id = ?",
        )
        .bind(kind_id)
        .bind(&target.kind)
        .bind(target.id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| fave_from_row(&r)))
    }

    /// Atomic get-or-create keyed on the uniqueness tuple. Exactly one of
    /// any set of concurrent callers with the same key inserts the row
    /// (and sees `true`); the rest fetch the row it created.
    pub async fn insert_or_fetch(
        &self,
        kind_id: i64,
        target: &EntityRef,
        user_id: i64,
    ) -> Result<(Fave, bool)> {
        let now = Utc::now().timestamp_micros();

        let result = sqlx::query(
            "INSERT INTO faves (relation_kind_id, entity_kind, entity_id, user_id,
                                withdrawn, created_at, updated_at)
             VALUES (?, ?, ?, ?, 0, ?, ?)
             ON CONFLICT(relation_kind_id, entity_kind, entity_id, user_id) DO NOTHING",
        )
        .bind(kind_id)
        .bind(&target.kind)
        .bind(target.id)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok((
                Fave {
                    id: result.last_insert_rowid(),
                    relation_kind_id: kind_id,
                    entity_kind: target.kind.clone(),
                    entity_id: target.id,
                    user_id,
                    withdrawn: false,
                    created_at: now,
                    updated_at: now,
                },
                true,
            ));
        }

        // Conflict: another writer holds the tuple; fetch its row.
        let fave = self
            .find_exact(kind_id, target, user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("fave row for {} vanished after conflict", target))?;
        Ok((fave, false))
    }

    /// Persists the mutable state of a fave, always stamping `updated_at`.
    /// The stamp is clamped to at least `updated_at + 1` so it strictly
    /// increases even when two saves land inside one clock tick.
    pub async fn save(&self, fave: &mut Fave) -> Result<()> {
        let now = Utc::now().timestamp_micros().max(fave.updated_at + 1);

        let result = sqlx::query("UPDATE faves SET withdrawn = ?, updated_at = ? WHERE id = ?")
            .bind(fave.withdrawn)
            .bind(now)
            .bind(fave.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("fave {} no longer exists", fave.id);
        }

        fave.updated_at = now;
        Ok(())
    }
}

fn kind_from_row(row: &SqliteRow) -> RelationKind {
    RelationKind {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
    }
}

pub(crate) fn fave_from_row(row: &SqliteRow) -> Fave {
    Fave {
        id: row.get("id"),
        relation_kind_id: row.get("relation_kind_id"),
        entity_kind: row.get("entity_kind"),
        entity_id: row.get("entity_id"),
        user_id: row.get("user_id"),
        withdrawn: row.get("withdrawn"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
