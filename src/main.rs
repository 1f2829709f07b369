// Faves Service - polymorphic favorite/wishlist/flag associations

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use faves_service::{
    api::{create_faves_router, MOUNT_PATH},
    app_state::AppState,
    config::Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let app_state = AppState::new(config.clone()).await?;

    let faves_router = create_faves_router(app_state);

    let app = Router::new()
        .nest(MOUNT_PATH, faves_router)
        .layer(CorsLayer::permissive());

    let addr = config.server_address();
    tracing::info!("faves service starting on http://{}", addr);
    tracing::info!("  POST {}/{{kind_slug}}/{{entity_kind}}/{{entity_id}}        - fave", MOUNT_PATH);
    tracing::info!("  POST {}/remove/{{kind_slug}}/{{entity_kind}}/{{entity_id}} - unfave", MOUNT_PATH);
    tracing::info!("  POST {}/toggle/{{kind_slug}}/{{entity_kind}}/{{entity_id}} - toggle", MOUNT_PATH);
    tracing::info!("  GET  {}/users/{{user_id}}/{{kind_slug}}                    - faves for user", MOUNT_PATH);
    tracing::info!("  GET  {}/state/{{kind_slug}}/{{entity_kind}}/{{entity_id}}  - viewer fave state", MOUNT_PATH);
    tracing::info!("  GET  {}/links/{{kind_slug}}/{{entity_kind}}/{{entity_id}}  - action links", MOUNT_PATH);
    tracing::info!("  GET  {}/by-entity-kind/{{entity_kind}}                     - faves by entity kind", MOUNT_PATH);
    tracing::info!("  POST {}/kinds                                              - create relation kind", MOUNT_PATH);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
