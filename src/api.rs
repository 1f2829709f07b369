// HTTP adapter over the manager and query service. Thin by design: every
// handler resolves the relation kind by slug, delegates, and renders JSON.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    models::{EntityRef, Fave},
    viewer::Viewer,
};

/// Mount point used by `main` and by the action-link resolver.
pub const MOUNT_PATH: &str = "/api/v1/faves";

pub fn create_faves_router(state: AppState) -> Router {
    Router::new()
        .route("/kinds", post(create_kind).get(list_kinds))
        .route("/kinds/{id}", put(rename_kind))
        .route("/users/{user_id}/{kind_slug}", get(user_faves))
        .route("/by-entity-kind/{entity_kind}", get(entity_kind_faves))
        .route("/state/{kind_slug}/{entity_kind}/{entity_id}", get(fave_state))
        .route("/links/{kind_slug}/{entity_kind}/{entity_id}", get(action_links))
        .route("/toggle/{kind_slug}/{entity_kind}/{entity_id}", post(toggle_fave))
        .route("/remove/{kind_slug}/{entity_kind}/{entity_id}", post(unfave_entity))
        .route("/{kind_slug}/{entity_kind}/{entity_id}", post(fave_entity))
        .with_state(state)
}

fn fave_json(fave: &Fave) -> Value {
    json!({
        "id": fave.id,
        "relation_kind_id": fave.relation_kind_id,
        "target": { "kind": fave.entity_kind, "id": fave.entity_id },
        "user_id": fave.user_id,
        "withdrawn": fave.withdrawn,
        "created_at": fave.created_at,
        "updated_at": fave.updated_at,
    })
}

// --- relation kind administration ---

#[derive(Deserialize)]
struct CreateKindRequest {
    name: String,
    slug: String,
}

async fn create_kind(
    State(state): State<AppState>,
    _viewer: Viewer,
    Json(req): Json<CreateKindRequest>,
) -> AppResult<Json<Value>> {
    let kind = state.store.create_kind(&req.name, &req.slug).await?;
    tracing::info!(slug = %kind.slug, "created relation kind");
    Ok(Json(json!({ "id": kind.id, "name": kind.name, "slug": kind.slug })))
}

async fn list_kinds(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let kinds = state.store.list_kinds().await?;
    let count = kinds.len();
    Ok(Json(json!({ "kinds": kinds, "count": count })))
}

#[derive(Deserialize)]
struct RenameKindRequest {
    name: String,
}

async fn rename_kind(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
    Json(req): Json<RenameKindRequest>,
) -> AppResult<Json<Value>> {
    let kind = state.store.rename_kind(id, &req.name).await?;
    Ok(Json(json!({ "id": kind.id, "name": kind.name, "slug": kind.slug })))
}

// --- mutations ---

async fn fave_entity(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((kind_slug, entity_kind, entity_id)): Path<(String, String, i64)>,
) -> AppResult<Json<Value>> {
    let kind = state.store.kind_by_slug(&kind_slug).await?;
    let target = EntityRef::new(entity_kind, entity_id);
    let fave = state
        .manager
        .create_or_reactivate(viewer.user_id, &target, &kind, true)
        .await?;
    Ok(Json(fave_json(&fave)))
}

async fn unfave_entity(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((kind_slug, entity_kind, entity_id)): Path<(String, String, i64)>,
) -> AppResult<Json<Value>> {
    let kind = state.store.kind_by_slug(&kind_slug).await?;
    let target = EntityRef::new(entity_kind, entity_id);
    let fave = state.manager.withdraw(viewer.user_id, &target, &kind).await?;
    Ok(Json(fave_json(&fave)))
}

/// Toggle endpoint for asynchronous callers; responds with a minimal ack
/// rather than the full row.
async fn toggle_fave(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((kind_slug, entity_kind, entity_id)): Path<(String, String, i64)>,
) -> AppResult<Json<Value>> {
    let kind = state.store.kind_by_slug(&kind_slug).await?;
    let target = EntityRef::new(entity_kind, entity_id);
    let (fave, active) = state.manager.toggle(viewer.user_id, &target, &kind).await?;
    Ok(Json(json!({
        "success": true,
        "entity_id": fave.entity_id,
        "active": active,
    })))
}

// --- reads ---

#[derive(Deserialize)]
struct UserFavesParams {
    include_withdrawn: Option<bool>,
}

async fn user_faves(
    State(state): State<AppState>,
    Path((user_id, kind_slug)): Path<(i64, String)>,
    Query(params): Query<UserFavesParams>,
) -> AppResult<Json<Value>> {
    let kind = state.store.kind_by_slug(&kind_slug).await?;
    let faves = if params.include_withdrawn.unwrap_or(false) {
        state.queries.all_for_user(user_id, Some(&kind)).await?
    } else {
        state.queries.active_for_user(user_id, Some(&kind)).await?
    };
    Ok(Json(json!({
        "user_id": user_id,
        "kind": kind.slug,
        "count": faves.len(),
        "faves": faves.iter().map(fave_json).collect::<Vec<_>>(),
    })))
}

#[derive(Deserialize)]
struct EntityKindParams {
    kind: Option<String>,
}

async fn entity_kind_faves(
    State(state): State<AppState>,
    Path(entity_kind): Path<String>,
    Query(params): Query<EntityKindParams>,
) -> AppResult<Json<Value>> {
    let kind = match &params.kind {
        Some(slug) => Some(state.store.kind_by_slug(slug).await?),
        None => None,
    };
    let faves = state
        .queries
        .for_entity_kind(&entity_kind, kind.as_ref())
        .await?;
    Ok(Json(json!({
        "entity_kind": entity_kind,
        "count": faves.len(),
        "faves": faves.iter().map(fave_json).collect::<Vec<_>>(),
    })))
}

/// "Has the current viewer an active fave on this exact entity" - used by
/// callers rendering toggle-state UI. Absent is a normal answer, not 404.
async fn fave_state(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((kind_slug, entity_kind, entity_id)): Path<(String, String, i64)>,
) -> AppResult<Json<Value>> {
    let kind = state.store.kind_by_slug(&kind_slug).await?;
    let target = EntityRef::new(entity_kind, entity_id);
    let fave = state
        .queries
        .active_one(viewer.user_id, &target, &kind)
        .await?;
    Ok(Json(json!({
        "active": fave.is_some(),
        "fave": fave.as_ref().map(fave_json),
    })))
}

/// Resolves the add/remove/toggle action URLs for an entity + kind pair,
/// so page renderers never hardcode route shapes.
async fn action_links(
    State(state): State<AppState>,
    Path((kind_slug, entity_kind, entity_id)): Path<(String, String, i64)>,
) -> AppResult<Json<Value>> {
    let kind = state.store.kind_by_slug(&kind_slug).await?;
    if !state.manager.catalog().knows(&entity_kind) {
        return Err(AppError::Validation(format!(
            "unknown entity kind: {}",
            entity_kind
        )));
    }
    Ok(Json(json!({
        "fave_url": format!("{}/{}/{}/{}", MOUNT_PATH, kind.slug, entity_kind, entity_id),
        "unfave_url": format!("{}/remove/{}/{}/{}", MOUNT_PATH, kind.slug, entity_kind, entity_id),
        "toggle_url": format!("{}/toggle/{}/{}/{}", MOUNT_PATH, kind.slug, entity_kind, entity_id),
    })))
}
