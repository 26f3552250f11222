use super::{ExtractionContext, RelationshipExtractor};
use crate::classifier::parse_numeric_prefix;
use crate::patterns::{near, SequenceTemplate};
use crate::types::{ExtractorId, RelationshipCandidate, RelationshipKind, RuleDocument};
use anyhow::Result;

const MIN_CONFIDENCE: f64 = 0.1;

/// Places non-seed documents inside named procedural sequences that already
/// contain seed sections.
pub struct SequenceExtractor;

impl Default for SequenceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Anchors of `template` covered by at least one configured seed id
    fn seed_anchor_count(template: &SequenceTemplate, context: &ExtractionContext<'_>) -> usize {
        let seed_numbers: Vec<f64> = context
            .corpus
            .seeds()
            .iter()
            .filter_map(|id| parse_numeric_prefix(id))
            .collect();
        template
            .anchors
            .iter()
            .filter(|anchor| seed_numbers.iter().any(|n| near(**anchor, *n)))
            .count()
    }
}

impl RelationshipExtractor for SequenceExtractor {
    fn extract(
        &self,
        document: &RuleDocument,
        context: &ExtractionContext<'_>,
    ) -> Result<Vec<RelationshipCandidate>> {
        if context.corpus.is_seed(&document.id) {
            return Ok(Vec::new());
        }
        let Some(number) = parse_numeric_prefix(&document.id) else {
            return Ok(Vec::new());
        };

        let mut candidates = Vec::new();
        for template in context.patterns.sequences() {
            if !template.contains(number) {
                continue;
            }
            let matched = Self::seed_anchor_count(template, context);
            if matched == 0 {
                continue;
            }
            let confidence = template.weight * matched as f64 / template.anchors.len() as f64;
            if confidence <= MIN_CONFIDENCE {
                continue;
            }

            for seed in context.corpus.seed_documents() {
                if seed.id == document.id {
                    continue;
                }
                let on_template =
                    parse_numeric_prefix(&seed.id).map_or(false, |n| template.contains(n));
                if !on_template {
                    continue;
                }
                candidates.push(
                    RelationshipCandidate::new(
                        &document.id,
                        &seed.id,
                        RelationshipKind::MotionSequence,
                        confidence,
                        ExtractorId::Sequence,
                    )
                    .with_reason(format!("Part of {}", template.name))
                    .with_reason(format!(
                        "{} of {} sequence steps are critical sections",
                        matched,
                        template.anchors.len()
                    )),
                );
            }
        }
        Ok(candidates)
    }

    fn id(&self) -> ExtractorId {
        ExtractorId::Sequence
    }
}
