use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sources::types::KnowledgeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[default]
    SopBased,
    NewScenario,
    Unclear,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    #[default]
    Fresh,
    Stale,
    Outdated,
}

/// A ticket plus the knowledge sources selected for it.
#[derive(Debug, Clone)]
pub struct GuidanceRequest {
    pub ticket_id: String,
    pub customer_id: Option<String>,
    pub customer_voice: String,
    pub agent_context: String,
    pub priority: Priority,
    pub sources: Vec<KnowledgeSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStep {
    #[serde(rename = "step")]
    pub ordinal: u32,
    pub action: String,
    pub reasoning: String,
    #[serde(rename = "sopReference")]
    pub source_reference: String,
    #[serde(rename = "confluenceUrl")]
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCitation {
    pub title: String,
    pub url: String,
    pub version: String,
    pub relevance_score: f64,
}

/// Normalized guidance for an agent. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceResult {
    pub suggested_response: String,
    #[serde(rename = "processSteps")]
    pub steps: Vec<ProcessStep>,
    #[serde(rename = "sopSources")]
    pub citations: Vec<SourceCitation>,
    pub confidence_score: u8,
    pub classification: Classification,
    #[serde(rename = "sopFreshness")]
    pub freshness: Freshness,
    #[serde(rename = "totalSOPsConsulted")]
    pub total_sources_consulted: usize,
    pub reasoning: String,
    pub escalation_needed: bool,
    pub additional_resources: Vec<String>,
}
