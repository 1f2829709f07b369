use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Entity kinds this deployment serves. Each entry maps a kind name to the
/// host table that owns entities of that kind; at least one relation kind
/// must also exist before any association can be created, so the default
/// kind is seeded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub kinds: Vec<KindTable>,
    pub default_kind_name: String,
    pub default_kind_slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindTable {
    pub kind: String,
    pub table: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/faves.db?mode=rwc".to_string()),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            catalog: CatalogConfig {
                kinds: parse_kinds(
                    &env::var("ENTITY_KINDS").unwrap_or_default(),
                )?,
                default_kind_name: env::var("DEFAULT_KIND_NAME")
                    .unwrap_or_else(|_| "Favorite".to_string()),
                default_kind_slug: env::var("DEFAULT_KIND_SLUG")
                    .unwrap_or_else(|_| "favorite".to_string()),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parses `ENTITY_KINDS`, a comma-separated list of `kind=table` pairs,
/// e.g. `photo=photos,post=blog_posts`.
fn parse_kinds(raw: &str) -> anyhow::Result<Vec<KindTable>> {
    let mut kinds = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (kind, table) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("malformed ENTITY_KINDS entry: {}", entry))?;
        kinds.push(KindTable {
            kind: kind.trim().to_string(),
            table: table.trim().to_string(),
        });
    }
    Ok(kinds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_table_pairs() {
        let kinds = parse_kinds("photo=photos, post=blog_posts").unwrap();
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[0].kind, "photo");
        assert_eq!(kinds[0].table, "photos");
        assert_eq!(kinds[1].kind, "post");
        assert_eq!(kinds[1].table, "blog_posts");
    }

    #[test]
    fn empty_list_is_ok() {
        assert!(parse_kinds("").unwrap().is_empty());
    }

    #[test]
    fn rejects_entry_without_table() {
        assert!(parse_kinds("photo").is_err());
    }
}
