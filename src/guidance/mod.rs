//! Guidance orchestration: one model call per ticket, with the reply repaired
//! into a complete [`GuidanceResult`] or replaced by a canned one.

pub mod citations;
pub mod prompts;
pub mod types;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::llm::{ChatBackend, ConnectivityReport, LlmError, Message, MessagesRequest};
use crate::sources::types::KnowledgeSource;

use citations::{
    build_citations, FixedRelevance, RandomRelevance, RelevanceScorer, FALLBACK_RELEVANCE,
    PLACEHOLDER_URL,
};
use types::{Classification, Freshness, GuidanceRequest, GuidanceResult, ProcessStep};

pub const GUIDANCE_MAX_TOKENS: u32 = 2000;
pub const GUIDANCE_TEMPERATURE: f64 = 0.1;

const DEFAULT_RESPONSE: &str = "Thank you for your inquiry. Let me review this and get back to \
    you with the appropriate guidance.";
const DEFAULT_ACTION: &str = "Review customer request";
const DEFAULT_STEP_REASONING: &str = "Standard customer service protocol";
const DEFAULT_REFERENCE: &str = "General Guidelines";
const DEFAULT_REASONING: &str = "Based on available knowledge sources and company policies";
const DEFAULT_CONFIDENCE: u8 = 75;

const FALLBACK_CONFIDENCE: u8 = 70;
const FALLBACK_REASONING: &str = "Fallback response due to API limitations or errors";
const FALLBACK_STEPS: [(&str, &str, &str); 3] = [
    (
        "Acknowledge customer inquiry",
        "Standard protocol for all customer contacts",
        "General Customer Service Guidelines",
    ),
    (
        "Review relevant policies and procedures",
        "Ensure compliance with company standards",
        "Standard Operating Procedures",
    ),
    (
        "Provide appropriate resolution or escalate if needed",
        "Customer satisfaction is our priority",
        "Resolution Framework",
    ),
];

/// Why a model reply could not be used.
#[derive(Debug, thiserror::Error)]
enum ReplyError {
    #[error(transparent)]
    Upstream(#[from] LlmError),
    #[error("reply is not valid JSON: {0}")]
    NotJson(String),
    #[error("reply JSON is not an object")]
    NotAnObject,
}

pub struct QueryOrchestrator {
    backend: Arc<dyn ChatBackend>,
    model: String,
    scorer: Arc<dyn RelevanceScorer>,
}

impl QueryOrchestrator {
    pub fn new(backend: Arc<dyn ChatBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            scorer: Arc::new(RandomRelevance),
        }
    }

    #[cfg(test)]
    pub fn with_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// The single model call made for a ticket.
    pub fn build_request(&self, request: &GuidanceRequest) -> MessagesRequest {
        let context = prompts::build_context(&request.sources);
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: GUIDANCE_MAX_TOKENS,
            temperature: Some(GUIDANCE_TEMPERATURE),
            system: Some(prompts::system_prompt(&context)),
            messages: vec![Message::user(prompts::user_prompt(request))],
        }
    }

    /// Produce guidance for a ticket. Never fails: any upstream or parse
    /// problem yields [`build_fallback`] for the request.
    pub async fn produce_guidance(&self, request: &GuidanceRequest) -> GuidanceResult {
        info!(
            ticket_id = %request.ticket_id,
            priority = %request.priority,
            sources = request.sources.len(),
            "Guidance requested"
        );

        match self.request_guidance(request).await {
            Ok(result) => {
                info!(
                    ticket_id = %request.ticket_id,
                    confidence = result.confidence_score,
                    steps = result.steps.len(),
                    "Guidance produced"
                );
                result
            }
            Err(e) => {
                warn!(ticket_id = %request.ticket_id, error = %e, "Using fallback guidance");
                build_fallback(request)
            }
        }
    }

    async fn request_guidance(&self, request: &GuidanceRequest) -> Result<GuidanceResult, ReplyError> {
        let body = self.build_request(request);
        let reply = self.backend.complete(&body).await?;

        let text = reply.first_text().unwrap_or("");
        debug!(reply_len = text.len(), "model reply text");

        let parsed: Value =
            serde_json::from_str(text).map_err(|e| ReplyError::NotJson(e.to_string()))?;
        if !parsed.is_object() {
            return Err(ReplyError::NotAnObject);
        }
        Ok(self.normalize(&parsed, &request.sources))
    }

    /// [`normalize`] with this orchestrator's relevance scorer.
    pub fn normalize(&self, raw: &Value, sources: &[KnowledgeSource]) -> GuidanceResult {
        normalize(raw, sources, self.scorer.as_ref())
    }

    pub async fn test_connectivity(&self) -> ConnectivityReport {
        let report = self.backend.check().await;
        match &report.error {
            None => info!("Model endpoint reachable"),
            Some(e) => warn!(error = %e, "Model endpoint check failed"),
        }
        report
    }
}

fn non_empty_str<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn enum_field<T: DeserializeOwned + Default>(obj: &Value, key: &str) -> T {
    obj.get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

fn number_field(obj: &Value, key: &str) -> Option<f64> {
    let v = obj.get(key)?;
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn step_ordinal(step: &Value, index: usize) -> u32 {
    number_field(step, "step")
        .filter(|n| *n >= 1.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32)
        .unwrap_or(index as u32 + 1)
}

/// Fill every missing or unusable field of a parsed model reply with its default.
///
/// Citations are always rebuilt from `sources` and `totalSOPsConsulted` is
/// always `sources.len()`. A reply without `processSteps` yields no steps;
/// defaults only apply inside steps the model did return.
pub fn normalize(
    raw: &Value,
    sources: &[KnowledgeSource],
    scorer: &dyn RelevanceScorer,
) -> GuidanceResult {
    let default_reference = sources
        .first()
        .map(|s| s.name.as_str())
        .unwrap_or(DEFAULT_REFERENCE);

    let steps = raw
        .get("processSteps")
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .enumerate()
                .map(|(i, step)| ProcessStep {
                    ordinal: step_ordinal(step, i),
                    action: non_empty_str(step, "action")
                        .unwrap_or(DEFAULT_ACTION)
                        .to_string(),
                    reasoning: non_empty_str(step, "reasoning")
                        .unwrap_or(DEFAULT_STEP_REASONING)
                        .to_string(),
                    source_reference: non_empty_str(step, "sopReference")
                        .unwrap_or(default_reference)
                        .to_string(),
                    source_url: non_empty_str(step, "confluenceUrl")
                        .unwrap_or(PLACEHOLDER_URL)
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let confidence_score = number_field(raw, "confidenceScore")
        .map(|c| c.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(DEFAULT_CONFIDENCE);

    let additional_resources = raw
        .get("additionalResources")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    GuidanceResult {
        suggested_response: non_empty_str(raw, "suggestedResponse")
            .unwrap_or(DEFAULT_RESPONSE)
            .to_string(),
        steps,
        citations: build_citations(sources, scorer),
        confidence_score,
        classification: enum_field::<Classification>(raw, "classification"),
        freshness: enum_field::<Freshness>(raw, "sopFreshness"),
        total_sources_consulted: sources.len(),
        reasoning: non_empty_str(raw, "reasoning")
            .unwrap_or(DEFAULT_REASONING)
            .to_string(),
        escalation_needed: raw
            .get("escalationNeeded")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        additional_resources,
    }
}

/// Deterministic guidance used whenever the model call or its reply fails.
pub fn build_fallback(request: &GuidanceRequest) -> GuidanceResult {
    let steps = FALLBACK_STEPS
        .iter()
        .enumerate()
        .map(|(i, (action, reasoning, reference))| ProcessStep {
            ordinal: i as u32 + 1,
            action: action.to_string(),
            reasoning: reasoning.to_string(),
            source_reference: reference.to_string(),
            source_url: PLACEHOLDER_URL.to_string(),
        })
        .collect();

    GuidanceResult {
        suggested_response: format!(
            "Thank you for contacting us regarding \"{}\". I understand this is a {} priority issue. \
             Let me review our procedures and get back to you with the appropriate next steps to resolve this matter.",
            request.customer_voice, request.priority
        ),
        steps,
        citations: build_citations(&request.sources, &FixedRelevance(FALLBACK_RELEVANCE)),
        confidence_score: FALLBACK_CONFIDENCE,
        classification: Classification::Unclear,
        freshness: Freshness::Fresh,
        total_sources_consulted: request.sources.len(),
        reasoning: FALLBACK_REASONING.to_string(),
        escalation_needed: false,
        additional_resources: vec![],
    }
}
