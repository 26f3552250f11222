use crate::always_apply::{expand_rules, AlwaysApplyRule};
use crate::config::PipelineConfig;
use crate::corpus::Corpus;
use crate::types::{EdgeKey, ExtractorId, RelationshipCandidate, RelationshipKind};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

pub const CATEGORY_SIMILARITY_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationResult {
    /// One per (source, target, kind), ordered by that key
    pub relationships: Vec<RelationshipCandidate>,
    pub dropped_below_floor: usize,
    pub dropped_unresolved: usize,
    pub merged_duplicates: usize,
    /// Categories whose similarity pairs hit the cap
    pub capped_categories: Vec<String>,
}

/// Canonical order: key ascending, then strongest first, then origin and
/// reasons so that identical keys always fold the same way.
pub fn canonical_order(a: &RelationshipCandidate, b: &RelationshipCandidate) -> Ordering {
    a.source_id
        .cmp(&b.source_id)
        .then_with(|| a.target_id.cmp(&b.target_id))
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.extractor.cmp(&b.extractor))
        .then_with(|| a.reasons.cmp(&b.reasons))
}

/// Single-writer dedup map keyed by (source, target, kind)
struct DedupMap<'a> {
    corpus: &'a Corpus,
    floor: f64,
    entries: BTreeMap<EdgeKey, RelationshipCandidate>,
    dropped_below_floor: usize,
    dropped_unresolved: usize,
    merged_duplicates: usize,
}

impl<'a> DedupMap<'a> {
    fn new(corpus: &'a Corpus, floor: f64) -> Self {
        Self {
            corpus,
            floor,
            entries: BTreeMap::new(),
            dropped_below_floor: 0,
            dropped_unresolved: 0,
            merged_duplicates: 0,
        }
    }

    fn offer(&mut self, candidate: RelationshipCandidate) {
        if candidate.source_id == candidate.target_id
            || !self.corpus.contains(&candidate.source_id)
            || !self.corpus.contains(&candidate.target_id)
        {
            trace!(
                source = %candidate.source_id,
                target = %candidate.target_id,
                "dropping unresolved candidate"
            );
            self.dropped_unresolved += 1;
            return;
        }
        if candidate.confidence < self.floor && !candidate.extractor.bypasses_floor() {
            self.dropped_below_floor += 1;
            return;
        }

        match self.entries.get_mut(&candidate.key()) {
            Some(existing) => {
                self.merged_duplicates += 1;
                if candidate.confidence > existing.confidence {
                    let loser = std::mem::replace(existing, candidate);
                    merge_reasons(existing, loser.reasons);
                } else {
                    merge_reasons(existing, candidate.reasons);
                }
            }
            None => {
                self.entries.insert(candidate.key(), candidate);
            }
        }
    }
}

/// Winner's reasons stay first; unseen loser reasons follow in order
fn merge_reasons(winner: &mut RelationshipCandidate, loser_reasons: Vec<String>) {
    for reason in loser_reasons {
        if !winner.reasons.contains(&reason) {
            winner.reasons.push(reason);
        }
    }
}

pub struct RelationshipAggregator {
    floor: f64,
    pair_cap: Option<usize>,
}

impl RelationshipAggregator {
    pub fn new(floor: f64, pair_cap: Option<usize>) -> Self {
        Self { floor, pair_cap }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.aggregation_confidence_floor, config.category_similarity_pair_cap)
    }

    /// Merge extractor output, hand-authored rules and category similarity
    /// into one deduplicated relationship set.
    pub fn aggregate(
        &self,
        corpus: &Corpus,
        candidates: Vec<RelationshipCandidate>,
        always_apply: &[AlwaysApplyRule],
    ) -> AggregationResult {
        let mut stream = candidates;
        let hand_authored = expand_rules(always_apply, corpus);
        debug!("📌 {} hand-authored candidates", hand_authored.len());
        stream.extend(hand_authored);
        stream.sort_by(canonical_order);

        let mut map = DedupMap::new(corpus, self.floor);
        for candidate in stream {
            map.offer(candidate);
        }

        let capped_categories = self.fold_category_similarity(corpus, &mut map);

        debug!(
            "🔗 Aggregated {} relationships ({} below floor, {} unresolved, {} duplicates merged)",
            map.entries.len(),
            map.dropped_below_floor,
            map.dropped_unresolved,
            map.merged_duplicates
        );

        AggregationResult {
            relationships: map.entries.into_values().collect(),
            dropped_below_floor: map.dropped_below_floor,
            dropped_unresolved: map.dropped_unresolved,
            merged_duplicates: map.merged_duplicates,
            capped_categories,
        }
    }

    /// Every unordered pair within a category, earlier document as source.
    /// Pairs go straight into the map.
    fn fold_category_similarity(&self, corpus: &Corpus, map: &mut DedupMap<'_>) -> Vec<String> {
        let mut capped = Vec::new();
        for (category, members) in corpus.by_category() {
            let mut emitted = 0usize;
            'pairs: for (i, source) in members.iter().enumerate() {
                for target in &members[i + 1..] {
                    if self.pair_cap.map_or(false, |cap| emitted >= cap) {
                        warn!(
                            "⚠️  Category '{}' hit the similarity pair cap ({}), rest skipped",
                            category, emitted
                        );
                        capped.push(category.to_string());
                        break 'pairs;
                    }
                    map.offer(
                        RelationshipCandidate::new(
                            &source.id,
                            &target.id,
                            RelationshipKind::CategorySimilarity,
                            CATEGORY_SIMILARITY_CONFIDENCE,
                            ExtractorId::CategorySimilarity,
                        )
                        .with_reason(format!("Both sections belong to category: {}", category)),
                    );
                    emitted += 1;
                }
            }
        }
        capped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RuleDocument;

    fn corpus() -> Corpus {
        Corpus::new(
            vec![
                RuleDocument::new("a", "A").with_category("X"),
                RuleDocument::new("b", "B").with_category("X"),
                RuleDocument::new("c", "C").with_category("Y"),
            ],
            &[],
        )
    }

    fn candidate(
        source: &str,
        target: &str,
        confidence: f64,
        reason: &str,
    ) -> RelationshipCandidate {
        RelationshipCandidate::new(
            source,
            target,
            RelationshipKind::Reference,
            confidence,
            ExtractorId::DirectReference,
        )
            .with_reason(reason)
    }

    fn aggregate(candidates: Vec<RelationshipCandidate>) -> AggregationResult {
        RelationshipAggregator::new(0.3, None).aggregate(&corpus(), candidates, &[])
    }

    #[test]
    fn highest_confidence_wins_and_reasons_merge() {
        let result = aggregate(vec![
            candidate("a", "c", 0.5, "weak"),
            candidate("a", "c", 0.9, "strong"),
            candidate("a", "c", 0.7, "strong"),
        ]);
        let edge = result.relationships.iter().find(|r| r.target_id == "c").unwrap();
        assert_eq!(edge.confidence, 0.9);
        assert_eq!(edge.reasons, vec!["strong".to_string(), "weak".to_string()]);
        assert_eq!(result.merged_duplicates, 2);
    }

    #[test]
    fn floor_is_inclusive_and_unresolved_are_dropped() {
        let result = aggregate(vec![
            candidate("a", "c", 0.3, "at floor"),
            candidate("b", "c", 0.29, "below"),
            candidate("a", "missing", 0.9, "unknown"),
            candidate("c", "c", 0.9, "self"),
        ]);
        let references: Vec<_> = result
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Reference)
            .collect();
        assert_eq!(references.len(), 1);
        assert_eq!(result.dropped_below_floor, 1);
        assert_eq!(result.dropped_unresolved, 2);
    }

    #[test]
    fn hand_authored_rules_bypass_floor() {
        let strict = RelationshipAggregator::new(1.0, None);
        let mut low = RelationshipCandidate::new(
            "a",
            "c",
            RelationshipKind::MeetAndConfer,
            0.1,
            ExtractorId::AlwaysApply,
        );
        low.reasons.push("manual".to_string());
        let result = strict.aggregate(&corpus(), vec![low], &[]);
        assert_eq!(result.relationships.len(), 1);
    }

    #[test]
    fn category_pairs_are_emitted_once_per_pair() {
        let result = aggregate(Vec::new());
        let similarity: Vec<_> = result
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::CategorySimilarity)
            .collect();
        assert_eq!(similarity.len(), 1);
        assert_eq!(similarity[0].source_id, "a");
        assert_eq!(similarity[0].target_id, "b");
        assert_eq!(similarity[0].confidence, CATEGORY_SIMILARITY_CONFIDENCE);
    }

    #[test]
    fn pair_cap_limits_each_category() {
        let docs = (0..5)
            .map(|i| RuleDocument::new(format!("d{}", i), "Doc").with_category("Same"))
            .collect();
        let corpus = Corpus::new(docs, &[]);
        let result = RelationshipAggregator::new(0.3, Some(3)).aggregate(&corpus, Vec::new(), &[]);
        assert_eq!(result.relationships.len(), 3);
        assert_eq!(result.capped_categories, vec!["Same".to_string()]);

        let unbounded = RelationshipAggregator::new(0.3, None).aggregate(&corpus, Vec::new(), &[]);
        assert_eq!(unbounded.relationships.len(), 10);
        assert!(unbounded.capped_categories.is_empty());
    }

    #[test]
    fn arrival_order_does_not_matter() {
        let forward = vec![
            candidate("a", "c", 0.6, "first"),
            candidate("a", "c", 0.6, "second"),
            candidate("b", "c", 0.8, "other"),
        ];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(aggregate(forward).relationships, aggregate(backward).relationships);
    }
}
