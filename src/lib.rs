// faves_service - generic polymorphic "favorite" relationships: any
// authenticated user can attach a typed, revocable association to any
// entity kind the host registers.

pub mod api;
pub mod app_state;
pub mod config;
pub mod entity_catalog;
pub mod error;
pub mod manager;
pub mod models;
pub mod queries;
pub mod store;
pub mod viewer;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use models::{EntityRef, Fave, RelationKind};
