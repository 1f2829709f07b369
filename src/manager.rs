// Relationship manager - the transactional mutation API over the store.
// Three operations with deliberately different idempotence laws:
// `create_or_reactivate` always drives toward active, `withdraw` requires
// the row to exist, `toggle` flips whatever state it finds (creating
// active if absent). They are kept separate so callers pick the one
// matching their intent instead of inferring it from flags.

use std::sync::Arc;

use crate::entity_catalog::EntityCatalog;
use crate::error::{AppError, AppResult};
use crate::models::{EntityRef, Fave, RelationKind};
use crate::store::FaveStore;

#[derive(Clone)]
pub struct FaveManager {
    store: Arc<FaveStore>,
    catalog: Arc<EntityCatalog>,
}

impl FaveManager {
    pub fn new(store: Arc<FaveStore>, catalog: Arc<EntityCatalog>) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    /// Records the relationship if absent. With `force_active`, an existing
    /// withdrawn row is reactivated; calling twice in a row leaves the
    /// state active either way (the second call only restamps
    /// `updated_at`). Never fails because the relationship already exists.
    pub async fn create_or_reactivate(
        &self,
        user_id: i64,
        target: &EntityRef,
        kind: &RelationKind,
        force_active: bool,
    ) -> AppResult<Fave> {
        let target = self.validate(user_id, target).await?;
        let (mut fave, created) =
            self.store.insert_or_fetch(kind.id, &target, user_id).await?;

        if !created && force_active {
            fave.withdrawn = false;
            self.store.save(&mut fave).await?;
        }

        tracing::debug!(
            user_id,
            target = %target,
            kind = %kind.slug,
            created,
            "create_or_reactivate"
        );
        Ok(fave)
    }

    /// Withdraws an existing relationship. Withdrawing a tuple that was
    /// never created is an error, not a no-op.
    pub async fn withdraw(
        &self,
        user_id: i64,
        target: &EntityRef,
        kind: &RelationKind,
    ) -> AppResult<Fave> {
        let target = self.validate(user_id, target).await?;
        let mut fave = self
            .store
            .find_exact(kind.id, &target, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no {} relationship from user {} to {}",
                    kind.slug, user_id, target
                ))
            })?;

        fave.withdrawn = true;
        self.store.save(&mut fave).await?;

        tracing::debug!(user_id, target = %target, kind = %kind.slug, "withdraw");
        Ok(fave)
    }

    /// Flips the relationship's state, creating it active if absent.
    /// Returns the row and whether it is active after the flip.
    pub async fn toggle(
        &self,
        user_id: i64,
        target: &EntityRef,
        kind: &RelationKind,
    ) -> AppResult<(Fave, bool)> {
        let target = self.validate(user_id, target).await?;
        let (mut fave, created) =
            self.store.insert_or_fetch(kind.id, &target, user_id).await?;

        if !created {
            fave.withdrawn = !fave.withdrawn;
            self.store.save(&mut fave).await?;
        }

        let active = !fave.withdrawn;
        tracing::debug!(user_id, target = %target, kind = %kind.slug, active, "toggle");
        Ok((fave, active))
    }

    async fn validate(&self, user_id: i64, target: &EntityRef) -> AppResult<EntityRef> {
        if user_id <= 0 {
            return Err(AppError::Unauthorized(
                "mutations require an authenticated user".to_string(),
            ));
        }
        self.catalog.resolve(&target.kind, target.id).await
    }
}
