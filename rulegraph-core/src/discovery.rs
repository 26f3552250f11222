// Rule discovery: promote non-seed documents that the extractors tie
// strongly to seed sections, and derive the expanded critical set.

use crate::corpus::Corpus;
use crate::extractors::analyze_temporal_criticality;
use crate::patterns::PatternLibrary;
use crate::types::{DiscoveredRule, RelationshipCandidate, RuleId};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

pub struct DiscoveryEngine<'a> {
    corpus: &'a Corpus,
    patterns: &'a PatternLibrary,
    analysis_date: NaiveDate,
    promotion_threshold: f64,
    hybrid_threshold: f64,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(
        corpus: &'a Corpus,
        patterns: &'a PatternLibrary,
        analysis_date: NaiveDate,
        promotion_threshold: f64,
        hybrid_threshold: f64,
    ) -> Self {
        Self {
            corpus,
            patterns,
            analysis_date,
            promotion_threshold,
            hybrid_threshold,
        }
    }

    /// Strongest extractor evidence per non-seed source, promoted at or above
    /// the threshold. Ordered by temporal score, then confidence, then id.
    pub fn discover(&self, relationships: &[RelationshipCandidate]) -> Vec<DiscoveredRule> {
        let mut best: BTreeMap<&str, &RelationshipCandidate> = BTreeMap::new();
        for candidate in relationships {
            if !candidate.extractor.is_discovery_source()
                || self.corpus.is_seed(&candidate.source_id)
                || !self.corpus.is_seed(&candidate.target_id)
            {
                continue;
            }
            best.entry(candidate.source_id.as_str())
                .and_modify(|current| {
                    let stronger = candidate.confidence > current.confidence
                        || (candidate.confidence == current.confidence
                            && candidate.extractor < current.extractor);
                    if stronger {
                        *current = candidate;
                    }
                })
                .or_insert(candidate);
        }

        let mut discovered: Vec<DiscoveredRule> = best
            .into_iter()
            .filter(|(_, candidate)| candidate.confidence >= self.promotion_threshold)
            .filter_map(|(id, candidate)| {
                let document = self.corpus.get(id)?;
                Some(DiscoveredRule {
                    rule_id: document.id.clone(),
                    title: document.title.clone(),
                    category: document.category_or_default().to_string(),
                    aggregate_confidence: candidate.confidence,
                    discovery_method: candidate.extractor,
                    reasons: candidate.reasons.clone(),
                    filing_questions: self.patterns.filing_questions_answered(document),
                    temporal: analyze_temporal_criticality(
                        document,
                        self.patterns.events(),
                        self.analysis_date,
                    ),
                })
            })
            .collect();

        discovered.sort_by(|a, b| {
            b.temporal
                .temporal_score()
                .total_cmp(&a.temporal.temporal_score())
                .then_with(|| b.aggregate_confidence.total_cmp(&a.aggregate_confidence))
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });

        info!("🔎 Discovered {} rules beyond the seed set", discovered.len());
        discovered
    }

    /// Seeds plus discovered rules at or above the hybrid threshold, sorted
    pub fn expanded_seed_set(&self, discovered: &[DiscoveredRule]) -> Vec<RuleId> {
        let mut expanded: Vec<RuleId> = self.corpus.seeds().iter().cloned().collect();
        expanded.extend(
            discovered
                .iter()
                .filter(|rule| rule.aggregate_confidence >= self.hybrid_threshold)
                .map(|rule| rule.rule_id.clone()),
        );
        expanded.sort();
        expanded.dedup();
        expanded
    }
}
