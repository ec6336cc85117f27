pub mod types;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use types::{
    ConfluenceConfig, ConnectionStatus, DatabaseConfig, DatabaseEngine, GitConfig,
    KnowledgeSource, NewSource, SourceConfig,
};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source name is required")]
    MissingName,
    #[error("{kind} sources require `{field}`")]
    MissingField { kind: String, field: &'static str },
    #[error("unsupported source type `{0}`")]
    UnsupportedKind(String),
    #[error("invalid {kind} config: {reason}")]
    InvalidConfig { kind: String, reason: String },
    #[error("source not found: {0}")]
    NotFound(String),
}

/// Check the fields a source needs before it can be added.
pub fn validate(name: &str, config: &SourceConfig) -> Result<(), SourceError> {
    if name.trim().is_empty() {
        return Err(SourceError::MissingName);
    }
    let missing = |field| SourceError::MissingField {
        kind: config.kind().to_string(),
        field,
    };
    match config {
        SourceConfig::Confluence(c) => {
            if c.base_url.trim().is_empty() {
                return Err(missing("baseUrl"));
            }
            if c.api_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
                return Err(missing("apiToken"));
            }
        }
        SourceConfig::Github(g) | SourceConfig::Gitlab(g) => {
            if g.repo_url.trim().is_empty() {
                return Err(missing("repoUrl"));
            }
        }
        SourceConfig::Database(d) => {
            if d.host.trim().is_empty() {
                return Err(missing("host"));
            }
        }
        SourceConfig::FileUpload(f) => {
            if f.files.is_empty() {
                return Err(missing("files"));
            }
        }
        SourceConfig::Other { kind } => return Err(SourceError::UnsupportedKind(kind.clone())),
    }
    Ok(())
}

/// In-memory list of knowledge sources the guidance endpoint can select from.
pub struct SourceCatalog {
    sources: RwLock<Vec<KnowledgeSource>>,
}

impl SourceCatalog {
    pub fn new(sources: Vec<KnowledgeSource>) -> Self {
        Self {
            sources: RwLock::new(sources),
        }
    }

    /// Seed from a JSON list file when one is given and exists, otherwise demo data.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.filter(|p| p.exists()) else {
            info!("No sources file, seeding catalog with demo sources");
            return Ok(Self::new(demo_sources()));
        };

        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read sources file {:?}", path))?;
        let entries: Vec<serde_json::Value> =
            serde_json::from_slice(&raw).context("Failed to parse sources file")?;
        let mut sources = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<KnowledgeSource>(entry) {
                Ok(source) => sources.push(source),
                Err(e) => warn!(index, error = %e, "Skipping unreadable source entry"),
            }
        }
        info!(count = sources.len(), path = ?path, "Source catalog loaded");
        Ok(Self::new(sources))
    }

    pub async fn list(&self) -> Vec<KnowledgeSource> {
        self.sources.read().await.clone()
    }

    /// Look up selected IDs in the order given. Unknown and non-connected sources are skipped.
    pub async fn resolve(&self, ids: &[String]) -> Vec<KnowledgeSource> {
        let sources = self.sources.read().await;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match sources.iter().find(|s| &s.id == id) {
                Some(s) if s.status == ConnectionStatus::Connected => out.push(s.clone()),
                Some(s) => warn!(source_id = %id, status = ?s.status, "Skipping source that is not connected"),
                None => warn!(source_id = %id, "Skipping unknown source"),
            }
        }
        out
    }

    pub async fn add(&self, new: NewSource) -> Result<KnowledgeSource, SourceError> {
        let config = SourceConfig::from_parts(&new.kind, new.config).map_err(|e| {
            SourceError::InvalidConfig {
                kind: new.kind.clone(),
                reason: e.to_string(),
            }
        })?;
        validate(&new.name, &config)?;

        let mut sources = self.sources.write().await;
        let now = Utc::now();
        let mut millis = now.timestamp_millis();
        while sources.iter().any(|s| s.id == millis.to_string()) {
            millis += 1;
        }

        let source = KnowledgeSource {
            id: millis.to_string(),
            name: new.name.trim().to_string(),
            config,
            status: ConnectionStatus::Connected,
            created_at: now,
        };
        sources.push(source.clone());
        debug!(source_id = %source.id, kind = source.kind(), name = %source.name, "source added");
        Ok(source)
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: ConnectionStatus,
    ) -> Result<KnowledgeSource, SourceError> {
        let mut sources = self.sources.write().await;
        let source = sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;
        source.status = status;
        Ok(source.clone())
    }
}

fn demo_sources() -> Vec<KnowledgeSource> {
    let at = |y: i32, mo: u32, d: u32, h: u32, mi: u32| {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .unwrap_or_else(Utc::now)
    };
    vec![
        KnowledgeSource {
            id: "1".to_string(),
            name: "Company SOPs".to_string(),
            config: SourceConfig::Confluence(ConfluenceConfig {
                base_url: "https://company.atlassian.net/wiki".to_string(),
                space_key: Some("SUPPORT".to_string()),
                ..Default::default()
            }),
            status: ConnectionStatus::Connected,
            created_at: at(2024, 1, 15, 10, 0),
        },
        KnowledgeSource {
            id: "2".to_string(),
            name: "Documentation Repo".to_string(),
            config: SourceConfig::Github(GitConfig {
                repo_url: "https://github.com/company/docs".to_string(),
                branch: Some("main".to_string()),
                ..Default::default()
            }),
            status: ConnectionStatus::Connected,
            created_at: at(2024, 1, 10, 15, 30),
        },
        KnowledgeSource {
            id: "3".to_string(),
            name: "Customer Database".to_string(),
            config: SourceConfig::Database(DatabaseConfig {
                engine: DatabaseEngine::Postgresql,
                host: "localhost".to_string(),
                database: Some("crm_db".to_string()),
                ..Default::default()
            }),
            status: ConnectionStatus::Connected,
            created_at: at(2024, 1, 20, 9, 15),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_source(value: serde_json::Value) -> NewSource {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_load_without_file_uses_demo_sources() {
        let catalog = SourceCatalog::load(None).await.unwrap();
        let names: Vec<String> = catalog.list().await.into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["Company SOPs", "Documentation Repo", "Customer Database"]
        );

        let missing = Path::new("/nonexistent/sources.json");
        assert_eq!(SourceCatalog::load(Some(missing)).await.unwrap().list().await.len(), 3);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("crm-sources-{}.json", std::process::id()));
        let list = json!([
            {"id": "a", "name": "Runbooks", "type": "file_upload",
             "config": {"name": "Runbooks", "files": [{}], "description": "", "tags": []},
             "status": "connected", "createdAt": "2024-02-01T00:00:00Z"},
            {"id": "b", "name": "Legacy", "type": "database",
             "config": {"type": "oracle", "host": "h"}},
            {"name": "No id"}
        ]);
        std::fs::write(&path, serde_json::to_vec(&list).unwrap()).unwrap();

        let catalog = SourceCatalog::load(Some(&path)).await.unwrap();
        let _ = std::fs::remove_file(&path);

        let sources = catalog.list().await;
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind(), "file_upload");
        assert_eq!(sources[0].id, "a");
    }

    #[tokio::test]
    async fn test_resolve_keeps_order_and_skips_unusable() {
        let catalog = SourceCatalog::new(demo_sources());
        catalog
            .set_status("2", ConnectionStatus::Disconnected)
            .await
            .unwrap();

        let ids: Vec<String> = ["3", "missing", "2", "1"].iter().map(|s| s.to_string()).collect();
        let resolved: Vec<String> = catalog
            .resolve(&ids)
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(resolved, vec!["3", "1"]);
    }

    #[tokio::test]
    async fn test_add_validates_required_fields() {
        let catalog = SourceCatalog::new(vec![]);

        let err = catalog
            .add(new_source(json!({"name": "Wiki", "type": "confluence",
                "config": {"baseUrl": "https://x/wiki"}})))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::MissingField { field: "apiToken", .. }));

        let err = catalog
            .add(new_source(json!({"name": " ", "type": "github",
                "config": {"repoUrl": "https://github.com/a/b"}})))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::MissingName));

        let err = catalog
            .add(new_source(json!({"name": "X", "type": "notion"})))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedKind(_)));

        let err = catalog
            .add(new_source(json!({"name": "DB", "type": "database",
                "config": {"type": "oracle", "host": "h"}})))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidConfig { .. }));

        let err = catalog
            .add(new_source(json!({"name": "Empty", "type": "file_upload", "config": {"files": []}})))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::MissingField { field: "files", .. }));

        assert!(catalog.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_assigns_unique_ids() {
        let catalog = SourceCatalog::new(vec![]);
        let body = json!({"name": "Docs", "type": "gitlab",
            "config": {"repoUrl": "https://gitlab.com/a/b"}});

        let a = catalog.add(new_source(body.clone())).await.unwrap();
        let b = catalog.add(new_source(body)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.status, ConnectionStatus::Connected);
        assert_eq!(catalog.list().await[1].name, "Docs");
    }

    #[tokio::test]
    async fn test_set_status_unknown_id() {
        let catalog = SourceCatalog::new(vec![]);
        let err = catalog
            .set_status("nope", ConnectionStatus::Error)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}
