use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::future::join_all;
use tempfile::NamedTempFile;
use tower::ServiceExt;

use faves_service::api::{create_faves_router, MOUNT_PATH};
use faves_service::app_state::AppState;
use faves_service::config::{CatalogConfig, Config, DatabaseConfig, KindTable, ServerConfig};
use faves_service::entity_catalog::{EntityCatalog, StaticEntityLookup};
use faves_service::manager::FaveManager;
use faves_service::models::EntityRef;
use faves_service::queries::FaveQueries;
use faves_service::store::FaveStore;

fn db_url(file: &NamedTempFile) -> String {
    format!("sqlite://{}?mode=rwc", file.path().display())
}

struct LibFixture {
    store: Arc<FaveStore>,
    manager: FaveManager,
    queries: FaveQueries,
    favorite: faves_service::RelationKind,
    _db: NamedTempFile,
}

async fn lib_fixture() -> LibFixture {
    let file = NamedTempFile::new().unwrap();
    let store = Arc::new(FaveStore::new(&db_url(&file)).await.unwrap());
    store.init().await.unwrap();
    let favorite = store.ensure_kind("Favorite", "favorite").await.unwrap();

    let mut catalog = EntityCatalog::new();
    catalog.register("photo", Arc::new(StaticEntityLookup::new(1..=100)));
    LibFixture {
        manager: FaveManager::new(store.clone(), Arc::new(catalog)),
        queries: FaveQueries::new(store.clone()),
        store,
        favorite,
        _db: file,
    }
}

#[tokio::test]
async fn round_trip_create_withdraw() {
    let fx = lib_fixture().await;
    let photo = EntityRef::new("photo", 7);

    fx.manager
        .create_or_reactivate(42, &photo, &fx.favorite, true)
        .await
        .unwrap();

    let fave = fx
        .queries
        .active_one(42, &photo, &fx.favorite)
        .await
        .unwrap()
        .expect("freshly created fave should be active");
    assert!(!fave.withdrawn);

    fx.manager.withdraw(42, &photo, &fx.favorite).await.unwrap();

    assert!(fx
        .queries
        .active_one(42, &photo, &fx.favorite)
        .await
        .unwrap()
        .is_none());

    let all = fx.queries.all_for_user(42, None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].withdrawn);
}

#[tokio::test]
async fn concurrent_insert_or_fetch_creates_exactly_one_row() {
    let fx = lib_fixture().await;
    let kind_id = fx.favorite.id;
    let target = EntityRef::new("photo", 7);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let store = fx.store.clone();
            let target = target.clone();
            tokio::spawn(async move { store.insert_or_fetch(kind_id, &target, 42).await })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let created_count = results.iter().filter(|(_, created)| *created).count();
    assert_eq!(created_count, 1);

    let row_id = results[0].0.id;
    assert!(results.iter().all(|(fave, _)| fave.id == row_id));

    let all = fx.queries.all_for_user(42, None).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn tuples_are_independent_across_users() {
    let fx = lib_fixture().await;
    let photo = EntityRef::new("photo", 7);

    fx.manager
        .create_or_reactivate(42, &photo, &fx.favorite, true)
        .await
        .unwrap();
    fx.manager
        .create_or_reactivate(43, &photo, &fx.favorite, true)
        .await
        .unwrap();
    fx.manager.withdraw(43, &photo, &fx.favorite).await.unwrap();

    assert!(fx
        .queries
        .active_one(42, &photo, &fx.favorite)
        .await
        .unwrap()
        .is_some());
    assert!(fx
        .queries
        .active_one(43, &photo, &fx.favorite)
        .await
        .unwrap()
        .is_none());
}

// --- HTTP adapter ---

async fn test_app() -> (Router, NamedTempFile) {
    let file = NamedTempFile::new().unwrap();
    let config = Config {
        database: DatabaseConfig { url: db_url(&file) },
        server: ServerConfig { host: "127.0.0.1".to_string(), port: 0 },
        catalog: CatalogConfig {
            kinds: vec![KindTable { kind: "photo".to_string(), table: "photos".to_string() }],
            default_kind_name: "Favorite".to_string(),
            default_kind_slug: "favorite".to_string(),
        },
    };
    let state = AppState::new(config).await.unwrap();

    // Host-side entity table the catalog validates against.
    sqlx::query("CREATE TABLE photos (id INTEGER PRIMARY KEY, title TEXT)")
        .execute(state.store.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO photos (id, title) VALUES (7, 'sunset'), (8, 'dunes')")
        .execute(state.store.pool())
        .await
        .unwrap();

    let app = Router::new().nest(MOUNT_PATH, create_faves_router(state));
    (app, file)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(path: &str, user_id: Option<i64>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("{}{}", MOUNT_PATH, path));
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn get(path: &str, user_id: Option<i64>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(format!("{}{}", MOUNT_PATH, path));
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn toggle_endpoint_flips_state() {
    let (app, _db) = test_app().await;

    let (status, body) = send(&app, post("/toggle/favorite/photo/7", Some(42))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["entity_id"], 7);
    assert_eq!(body["active"], true);

    let (_, body) = send(&app, post("/toggle/favorite/photo/7", Some(42))).await;
    assert_eq!(body["active"], false);

    let (status, body) = send(&app, get("/state/favorite/photo/7", Some(42))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);

    let (_, body) = send(&app, post("/toggle/favorite/photo/7", Some(42))).await;
    assert_eq!(body["active"], true);
}

#[tokio::test]
async fn mutations_require_identity() {
    let (app, _db) = test_app().await;

    let (status, _) = send(&app, post("/favorite/photo/7", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, post("/toggle/favorite/photo/7", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn fave_then_list_user_faves() {
    let (app, _db) = test_app().await;

    let (status, body) = send(&app, post("/favorite/photo/7", Some(42))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["withdrawn"], false);
    assert_eq!(body["target"]["kind"], "photo");

    let (status, body) = send(&app, get("/users/42/favorite", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = send(&app, post("/remove/favorite/photo/7", Some(42))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/users/42/favorite", None)).await;
    assert_eq!(body["count"], 0);

    let (_, body) = send(&app, get("/users/42/favorite?include_withdrawn=true", None)).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["faves"][0]["withdrawn"], true);
}

#[tokio::test]
async fn unfave_without_fave_is_404() {
    let (app, _db) = test_app().await;
    let (status, _) = send(&app, post("/remove/favorite/photo/7", Some(42))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_entity_and_unknown_kind_fail() {
    let (app, _db) = test_app().await;

    // entity 999 not in the photos table
    let (status, _) = send(&app, post("/favorite/photo/999", Some(42))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // entity kind never registered
    let (status, _) = send(&app, post("/favorite/video/7", Some(42))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // relation kind slug does not exist
    let (status, _) = send(&app, post("/wishlist/photo/7", Some(42))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn action_links_resolve() {
    let (app, _db) = test_app().await;

    let (status, body) = send(&app, get("/links/favorite/photo/7", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fave_url"], format!("{}/favorite/photo/7", MOUNT_PATH));
    assert_eq!(body["unfave_url"], format!("{}/remove/favorite/photo/7", MOUNT_PATH));
    assert_eq!(body["toggle_url"], format!("{}/toggle/favorite/photo/7", MOUNT_PATH));
}

#[tokio::test]
async fn kind_administration() {
    let (app, _db) = test_app().await;

    let req = Request::builder()
        .method("POST")
        .uri(format!("{}/kinds", MOUNT_PATH))
        .header("x-user-id", "1")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name": "Wishlist Item", "slug": "wishlist"}"#))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "wishlist");

    let (status, body) = send(&app, get("/kinds", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    // same kind, different target list than favorites
    let (status, _) = send(&app, post("/wishlist/photo/8", Some(42))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, get("/users/42/wishlist", None)).await;
    assert_eq!(body["count"], 1);
    let (_, body) = send(&app, get("/users/42/favorite", None)).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn by_entity_kind_spans_users() {
    let (app, _db) = test_app().await;

    send(&app, post("/favorite/photo/7", Some(42))).await;
    send(&app, post("/favorite/photo/8", Some(43))).await;
    send(&app, post("/remove/favorite/photo/8", Some(43))).await;

    let (status, body) = send(&app, get("/by-entity-kind/photo", None)).await;
    assert_eq!(status, StatusCode::OK);
    // withdrawn rows stay visible in the per-entity-kind projection
    assert_eq!(body["count"], 2);

    let (_, body) = send(&app, get("/by-entity-kind/photo?kind=favorite", None)).await;
    assert_eq!(body["count"], 2);
}
