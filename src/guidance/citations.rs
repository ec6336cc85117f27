use rand::Rng;

use crate::sources::types::KnowledgeSource;

use super::types::SourceCitation;

/// URL used when a source has nothing to link to.
pub const PLACEHOLDER_URL: &str = "#";
pub const CITATION_VERSION: &str = "1.0";
/// Relevance given to every citation on the fallback path.
pub const FALLBACK_RELEVANCE: f64 = 0.8;

/// Assigns a relevance score in `[0, 1]` to a cited source.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, source: &KnowledgeSource) -> f64;
}

/// Uniform draw floored at 0.7, so scores land in `[0.7, 1.0)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomRelevance;

impl RelevanceScorer for RandomRelevance {
    fn score(&self, _source: &KnowledgeSource) -> f64 {
        rand::thread_rng().gen::<f64>().max(0.7)
    }
}

/// Same score for every source.
#[derive(Debug, Clone, Copy)]
pub struct FixedRelevance(pub f64);

impl RelevanceScorer for FixedRelevance {
    fn score(&self, _source: &KnowledgeSource) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}

/// One citation per source, in source order. Model output never contributes here.
pub fn build_citations(
    sources: &[KnowledgeSource],
    scorer: &dyn RelevanceScorer,
) -> Vec<SourceCitation> {
    sources
        .iter()
        .map(|source| SourceCitation {
            title: source.name.clone(),
            url: source
                .config
                .primary_url()
                .unwrap_or(PLACEHOLDER_URL)
                .to_string(),
            version: CITATION_VERSION.to_string(),
            relevance_score: scorer.score(source),
        })
        .collect()
}
