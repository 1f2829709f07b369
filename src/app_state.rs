use std::sync::Arc;

use crate::{
    config::Config,
    entity_catalog::{EntityCatalog, TableEntityLookup},
    manager::FaveManager,
    queries::FaveQueries,
    store::FaveStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FaveStore>,
    pub manager: FaveManager,
    pub queries: FaveQueries,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(FaveStore::new(&config.database.url).await?);
        store.init().await?;

        // At least one relation kind must exist before any fave can be
        // recorded.
        let default_kind = store
            .ensure_kind(
                &config.catalog.default_kind_name,
                &config.catalog.default_kind_slug,
            )
            .await?;
        tracing::info!(slug = %default_kind.slug, "default relation kind ready");

        // Construction-time catalog wiring: each configured entity kind is
        // backed by a lookup against its host table.
        let mut catalog = EntityCatalog::new();
        for entry in &config.catalog.kinds {
            catalog.register(
                &entry.kind,
                Arc::new(TableEntityLookup::new(store.pool().clone(), &entry.table)?),
            );
            tracing::info!(kind = %entry.kind, table = %entry.table, "registered entity kind");
        }
        let catalog = Arc::new(catalog);

        Ok(Self {
            manager: FaveManager::new(store.clone(), catalog),
            queries: FaveQueries::new(store.clone()),
            store,
            config,
        })
    }
}
