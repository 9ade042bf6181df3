//! Beefweb interface description
//!
//! Beefweb ships its API as an OpenAPI document (`player-api.yml`). The client
//! is hand-written, so the only thing taken from the document is where the
//! API is mounted: `servers[0].url` for OpenAPI 3, `basePath` for Swagger 2.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::adapters::beefweb::DEFAULT_BASE_PATH;

#[derive(Debug, Error)]
pub enum ApiSpecError {
    #[error("failed to read interface description {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse interface description {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ServerEntry {
    #[serde(default)]
    url: String,
}

/// The parts of an OpenAPI/Swagger document we care about
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDescription {
    #[serde(default)]
    servers: Vec<ServerEntry>,
    #[serde(default)]
    base_path: Option<String>,
}

impl ApiDescription {
    /// Load and parse a YAML (or JSON) interface description
    pub fn load(path: &Path) -> Result<Self, ApiSpecError> {
        let content = std::fs::read_to_string(path).map_err(|source| ApiSpecError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ApiSpecError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Path prefix all player endpoints live under, without a trailing slash
    pub fn base_path(&self) -> String {
        let raw = self
            .servers
            .first()
            .map(|s| url_path(&s.url))
            .filter(|p| !p.is_empty())
            .or_else(|| self.base_path.clone())
            .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());

        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }
}

/// Path component of a server URL, which may be absolute or already a path
fn url_path(url: &str) -> String {
    match url.split_once("://") {
        Some((_, rest)) => match rest.find('/') {
            Some(idx) => rest[idx..].to_string(),
            None => String::new(),
        },
        None => url.to_string(),
    }
}
