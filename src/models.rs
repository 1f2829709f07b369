use serde::{Deserialize, Serialize};

/// A named category of association ("Favorite", "Wishlist Item", "Flag").
/// One service instance can carry any number of kinds; the slug is the
/// URL-safe key adapters route on. The slug is immutable once the kind
/// exists; only the display name may be edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationKind {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Identity of an association target without a typed foreign key: the
/// entity kind's registered name plus an id that is opaque to this service
/// (it only has to be a key in that kind's namespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: String,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self { kind: kind.into(), id }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// One favorite-like relationship between a user and an entity, of a given
/// kind. At most one row exists per (relation_kind_id, entity_kind,
/// entity_id, user_id) tuple; the row is never deleted, only flipped
/// between active and withdrawn. Timestamps are epoch microseconds;
/// `updated_at` strictly increases on every save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fave {
    pub id: i64,
    pub relation_kind_id: i64,
    pub entity_kind: String,
    pub entity_id: i64,
    pub user_id: i64,
    pub withdrawn: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Fave {
    pub fn target(&self) -> EntityRef {
        EntityRef::new(self.entity_kind.clone(), self.entity_id)
    }

    pub fn is_active(&self) -> bool {
        !self.withdrawn
    }
}
