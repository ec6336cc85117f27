use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog-assigned source ID (creation time in milliseconds, as text).
pub type SourceId = String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Connected,
    Disconnected,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    #[default]
    Postgresql,
    Mysql,
    Mongodb,
    Sqlite,
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DatabaseEngine::Postgresql => "postgresql",
            DatabaseEngine::Mysql => "mysql",
            DatabaseEngine::Mongodb => "mongodb",
            DatabaseEngine::Sqlite => "sqlite",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_attachments: Option<bool>,
}

/// Shared by GitHub and GitLab sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitConfig {
    #[serde(default)]
    pub repo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_wiki: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    #[serde(rename = "type", default)]
    pub engine: DatabaseEngine,
    #[serde(default)]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileUploadConfig {
    /// Entries as the UI stored them. Browser `File` objects encode as `{}`,
    /// so anything JSON is accepted and kept as-is.
    #[serde(default)]
    pub files: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Kind-specific settings of a knowledge source. The kind tag travels as `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Confluence(ConfluenceConfig),
    Github(GitConfig),
    Gitlab(GitConfig),
    Database(DatabaseConfig),
    FileUpload(FileUploadConfig),
    /// A kind this build does not know; carried through so lists round-trip.
    Other { kind: String },
}

impl SourceConfig {
    /// Build from the stored `(type, config)` pair.
    pub fn from_parts(kind: &str, config: serde_json::Value) -> Result<Self, serde_json::Error> {
        let config = if config.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            config
        };
        Ok(match kind {
            "confluence" => SourceConfig::Confluence(serde_json::from_value(config)?),
            "github" => SourceConfig::Github(serde_json::from_value(config)?),
            "gitlab" => SourceConfig::Gitlab(serde_json::from_value(config)?),
            "database" => SourceConfig::Database(serde_json::from_value(config)?),
            "file_upload" => SourceConfig::FileUpload(serde_json::from_value(config)?),
            other => SourceConfig::Other {
                kind: other.to_string(),
            },
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            SourceConfig::Confluence(_) => "confluence",
            SourceConfig::Github(_) => "github",
            SourceConfig::Gitlab(_) => "gitlab",
            SourceConfig::Database(_) => "database",
            SourceConfig::FileUpload(_) => "file_upload",
            SourceConfig::Other { kind } => kind,
        }
    }

    /// The URL a reader would follow to reach this source, if it has one.
    pub fn primary_url(&self) -> Option<&str> {
        let url = match self {
            SourceConfig::Confluence(c) => c.base_url.as_str(),
            SourceConfig::Github(g) | SourceConfig::Gitlab(g) => g.repo_url.as_str(),
            _ => return None,
        };
        (!url.is_empty()).then_some(url)
    }

    fn to_value(&self) -> serde_json::Value {
        let value = match self {
            SourceConfig::Confluence(c) => serde_json::to_value(c),
            SourceConfig::Github(g) | SourceConfig::Gitlab(g) => serde_json::to_value(g),
            SourceConfig::Database(d) => serde_json::to_value(d),
            SourceConfig::FileUpload(f) => serde_json::to_value(f),
            SourceConfig::Other { .. } => Ok(serde_json::json!({})),
        };
        value.unwrap_or_default()
    }
}

/// A named, typed knowledge repository whose metadata feeds the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredSource", into = "StoredSource")]
pub struct KnowledgeSource {
    pub id: SourceId,
    pub name: String,
    pub config: SourceConfig,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeSource {
    pub fn kind(&self) -> &str {
        self.config.kind()
    }
}

/// Wire shape of a source: `{id, name, type, config, status, createdAt}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSource {
    id: SourceId,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    config: serde_json::Value,
    #[serde(default)]
    status: ConnectionStatus,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl TryFrom<StoredSource> for KnowledgeSource {
    type Error = serde_json::Error;

    fn try_from(s: StoredSource) -> Result<Self, Self::Error> {
        Ok(Self {
            config: SourceConfig::from_parts(&s.kind, s.config)?,
            id: s.id,
            name: s.name,
            status: s.status,
            created_at: s.created_at,
        })
    }
}

impl From<KnowledgeSource> for StoredSource {
    fn from(s: KnowledgeSource) -> Self {
        Self {
            kind: s.config.kind().to_string(),
            config: s.config.to_value(),
            id: s.id,
            name: s.name,
            status: s.status,
            created_at: s.created_at,
        }
    }
}

/// Body of a "create source" request: `{name, type, config}`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_stored_list() {
        let raw = json!([
            {
                "id": "1",
                "name": "Company SOPs",
                "type": "confluence",
                "config": {"baseUrl": "https://company.atlassian.net/wiki", "spaceKey": "SUPPORT"},
                "status": "connected",
                "createdAt": "2024-01-15T10:00:00Z"
            },
            {
                "id": "3",
                "name": "Customer Database",
                "type": "database",
                "config": {"type": "postgresql", "host": "localhost", "database": "crm_db"},
                "status": "error",
                "createdAt": "2024-01-20T09:15:00Z"
            }
        ]);
        let sources: Vec<KnowledgeSource> = serde_json::from_value(raw).unwrap();

        assert_eq!(sources[0].kind(), "confluence");
        assert_eq!(
            sources[0].config.primary_url(),
            Some("https://company.atlassian.net/wiki")
        );
        assert_eq!(sources[1].status, ConnectionStatus::Error);
        match &sources[1].config {
            SourceConfig::Database(db) => {
                assert_eq!(db.engine, DatabaseEngine::Postgresql);
                assert_eq!(db.database.as_deref(), Some("crm_db"));
            }
            other => panic!("expected database config, got {:?}", other),
        }
        assert_eq!(sources[1].config.primary_url(), None);
    }

    #[test]
    fn test_unknown_kind_survives_round_trip() {
        let raw = json!({"id": "9", "name": "Wiki", "type": "notion", "config": {"x": 1}});
        let source: KnowledgeSource = serde_json::from_value(raw).unwrap();
        assert_eq!(
            source.config,
            SourceConfig::Other {
                kind: "notion".to_string()
            }
        );

        let out = serde_json::to_value(&source).unwrap();
        assert_eq!(out["type"], "notion");
        assert_eq!(out["status"], "connected");
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let source = KnowledgeSource {
            id: "1".to_string(),
            name: "Docs".to_string(),
            config: SourceConfig::Github(GitConfig {
                repo_url: "https://github.com/company/docs".to_string(),
                branch: Some("main".to_string()),
                access_token: Some("ghp_secret".to_string()),
                ..Default::default()
            }),
            status: ConnectionStatus::Connected,
            created_at: Utc::now(),
        };
        let out = serde_json::to_value(&source).unwrap();
        assert_eq!(out["config"]["repoUrl"], "https://github.com/company/docs");
        assert!(out["config"].get("accessToken").is_none());
    }

    #[test]
    fn test_empty_url_is_not_a_primary_url() {
        let cfg = SourceConfig::from_parts("gitlab", serde_json::Value::Null).unwrap();
        assert_eq!(cfg.primary_url(), None);
        assert_eq!(cfg.kind(), "gitlab");
    }

    #[test]
    fn test_ui_shaped_configs_parse() {
        let raw = json!([
            {"id": "11", "name": "Runbooks", "type": "file_upload",
             "config": {"name": "Runbooks", "files": [{}, {}], "description": "", "tags": ["ops"]},
             "status": "connected", "createdAt": "2024-02-01T00:00:00Z"},
            {"id": "12", "name": "Docs", "type": "github",
             "config": {"name": "Docs", "repoUrl": "https://github.com/c/docs", "accessToken": "",
                        "branch": "main", "path": "/docs", "includeWiki": false}},
            {"id": "13", "name": "Replica", "type": "database",
             "config": {"name": "Replica", "host": "db", "port": "5432", "ssl": true}}
        ]);
        let sources: Vec<KnowledgeSource> = serde_json::from_value(raw).unwrap();

        match &sources[0].config {
            SourceConfig::FileUpload(f) => {
                assert_eq!(f.files.len(), 2);
                assert_eq!(f.tags, vec!["ops"]);
            }
            other => panic!("expected file upload config, got {:?}", other),
        }
        let out = serde_json::to_value(&sources[1]).unwrap();
        assert_eq!(out["config"]["path"], "/docs");
        assert_eq!(out["config"]["includeWiki"], false);
        match &sources[2].config {
            SourceConfig::Database(db) => assert_eq!(db.engine, DatabaseEngine::Postgresql),
            other => panic!("expected database config, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_database_engine_is_rejected() {
        let err = SourceConfig::from_parts("database", json!({"type": "oracle", "host": "h"}));
        assert!(err.is_err());
    }
}
