use crate::sources::types::{KnowledgeSource, SourceConfig};

use super::types::GuidanceRequest;

/// Context line used when the caller selected nothing.
pub const NO_SOURCES_CONTEXT: &str =
    "No specific knowledge sources selected. Use general customer service best practices.";

const SYSTEM_PREAMBLE: &str =
    "You are an AI customer service assistant with access to company knowledge repositories.";

const SYSTEM_TASK: &str = "Your task is to analyze customer queries and provide detailed, \
step-by-step guidance based on the available SOPs and documentation.";

/// Shape the model is told to answer in. Field names match `GuidanceResult`'s wire form.
pub const OUTPUT_SCHEMA: &str = r##"{
  "suggestedResponse": "Customer-facing response text",
  "processSteps": [
    {
      "step": 1,
      "action": "What to do",
      "reasoning": "Why this step is needed",
      "sopReference": "Which SOP/document this comes from",
      "confluenceUrl": "#"
    }
  ],
  "sopSources": [],
  "confidenceScore": 85,
  "classification": "sop_based",
  "sopFreshness": "fresh",
  "totalSOPsConsulted": 2,
  "reasoning": "Why you chose this approach",
  "escalationNeeded": false,
  "additionalResources": []
}"##;

/// One-sentence description of what a source holds, keyed by its kind.
pub fn source_details(config: &SourceConfig) -> String {
    match config {
        SourceConfig::Confluence(c) => format!(
            "Confluence space containing SOPs and documentation at {}",
            c.base_url
        ),
        SourceConfig::Github(g) | SourceConfig::Gitlab(g) => {
            format!("Code repository with documentation at {}", g.repo_url)
        }
        SourceConfig::Database(d) => format!(
            "{} database containing customer and operational data",
            d.engine
        ),
        SourceConfig::FileUpload(_) => "Uploaded SOP documents and knowledge files".to_string(),
        SourceConfig::Other { .. } => "Knowledge repository".to_string(),
    }
}

/// Describe the selected sources, one `- name (kind): details` line each.
pub fn build_context(sources: &[KnowledgeSource]) -> String {
    if sources.is_empty() {
        return NO_SOURCES_CONTEXT.to_string();
    }
    sources
        .iter()
        .map(|s| format!("- {} ({}): {}", s.name, s.kind(), source_details(&s.config)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn system_prompt(context: &str) -> String {
    format!(
        "{}\n\nAvailable Knowledge Sources:\n{}\n\n{}\n\nAlways respond in this exact JSON format:\n{}",
        SYSTEM_PREAMBLE, context, SYSTEM_TASK, OUTPUT_SCHEMA
    )
}

pub fn user_prompt(request: &GuidanceRequest) -> String {
    format!(
        "Customer Query Details:\n\
         - Ticket ID: {}\n\
         - Customer ID: {}\n\
         - Priority: {}\n\
         - Customer Voice: \"{}\"\n\
         - Agent Context: \"{}\"\n\n\
         Please analyze this query and provide a comprehensive response using the available knowledge sources.",
        request.ticket_id,
        request.customer_id.as_deref().unwrap_or("Not provided"),
        request.priority,
        request.customer_voice,
        request.agent_context,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guidance::types::Priority;
    use serde_json::json;

    fn sources() -> Vec<KnowledgeSource> {
        serde_json::from_value(json!([
            {"id": "1", "name": "SOPs", "type": "confluence", "config": {"baseUrl": "https://x/wiki"}},
            {"id": "2", "name": "Docs", "type": "gitlab", "config": {"repoUrl": "https://gitlab.com/c/docs"}},
            {"id": "3", "name": "CRM", "type": "database", "config": {"type": "mysql", "host": "db"}},
            {"id": "4", "name": "Uploads", "type": "file_upload", "config": {"files": []}},
            {"id": "5", "name": "Misc", "type": "sharepoint"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_context_one_line_per_source() {
        let ctx = build_context(&sources());
        let lines: Vec<&str> = ctx.lines().collect();
        assert_eq!(
            lines,
            vec![
                "- SOPs (confluence): Confluence space containing SOPs and documentation at https://x/wiki",
                "- Docs (gitlab): Code repository with documentation at https://gitlab.com/c/docs",
                "- CRM (database): mysql database containing customer and operational data",
                "- Uploads (file_upload): Uploaded SOP documents and knowledge files",
                "- Misc (sharepoint): Knowledge repository",
            ]
        );
    }

    #[test]
    fn test_context_without_sources() {
        assert_eq!(build_context(&[]), NO_SOURCES_CONTEXT);
    }

    #[test]
    fn test_system_prompt_embeds_context_and_schema() {
        let prompt = system_prompt("- SOPs (confluence): ...");
        assert!(prompt.contains("Available Knowledge Sources:\n- SOPs (confluence): ..."));
        assert!(prompt.ends_with(OUTPUT_SCHEMA));
        // The schema example itself must be valid JSON.
        let schema: serde_json::Value = serde_json::from_str(OUTPUT_SCHEMA).unwrap();
        assert_eq!(schema["processSteps"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_user_prompt_fields() {
        let mut request = GuidanceRequest {
            ticket_id: "T-42".to_string(),
            customer_id: None,
            customer_voice: "Where is my order?".to_string(),
            agent_context: "Shipped last week".to_string(),
            priority: Priority::Urgent,
            sources: vec![],
        };
        let prompt = user_prompt(&request);
        assert!(prompt.contains("- Ticket ID: T-42\n"));
        assert!(prompt.contains("- Customer ID: Not provided\n"));
        assert!(prompt.contains("- Priority: urgent\n"));
        assert!(prompt.contains("- Customer Voice: \"Where is my order?\"\n"));
        assert!(prompt.contains("- Agent Context: \"Shipped last week\"\n"));

        request.customer_id = Some("C-7".to_string());
        assert!(user_prompt(&request).contains("- Customer ID: C-7\n"));
    }
}
