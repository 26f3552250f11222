use super::{excerpt, ExtractionContext, RelationshipExtractor};
use crate::types::{ExtractorId, RelationshipCandidate, RelationshipKind, RuleDocument};
use anyhow::Result;
use tracing::trace;

const REFERENCE_CONFIDENCE: f64 = 0.5;
const PROCEDURAL_DEPENDENCY_CONFIDENCE: f64 = 0.7;
const TIMING_RELATIONSHIP_CONFIDENCE: f64 = 0.6;
const SEED_TARGET_BONUS: f64 = 0.2;
const MIN_CONFIDENCE: f64 = 0.3;

/// Explicit cross references, plus section citations found inside procedural
/// requirement and deadline spans.
pub struct DirectReferenceExtractor;

impl Default for DirectReferenceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectReferenceExtractor {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &self,
        out: &mut Vec<RelationshipCandidate>,
        document: &RuleDocument,
        target: &str,
        kind: RelationshipKind,
        base: f64,
        reason: String,
        context: &ExtractionContext<'_>,
    ) {
        let target = target.trim();
        if target == document.id {
            return;
        }
        if !context.corpus.contains(target) {
            trace!(source = %document.id, target, "unresolved reference");
            return;
        }

        let mut candidate = RelationshipCandidate::new(
            &document.id,
            target,
            kind,
            base,
            ExtractorId::DirectReference,
        )
        .with_reason(reason);
        if context.corpus.is_seed(target) {
            candidate.confidence = (candidate.confidence + SEED_TARGET_BONUS).min(1.0);
            candidate.reasons.push(format!("Section {} is a critical filing rule", target));
        }
        if candidate.confidence > MIN_CONFIDENCE {
            out.push(candidate);
        }
    }
}

impl RelationshipExtractor for DirectReferenceExtractor {
    fn extract(
        &self,
        document: &RuleDocument,
        context: &ExtractionContext<'_>,
    ) -> Result<Vec<RelationshipCandidate>> {
        let mut candidates = Vec::new();
        let fields = &document.extracted_fields;

        for reference in &fields.cross_references {
            self.push(
                &mut candidates,
                document,
                reference,
                RelationshipKind::Reference,
                REFERENCE_CONFIDENCE,
                format!("Section {} references Section {}", document.id, reference.trim()),
                context,
            );
        }

        for requirement in &fields.procedural_requirements {
            for cited in context.patterns.cited_ids(requirement) {
                self.push(
                    &mut candidates,
                    document,
                    &cited,
                    RelationshipKind::ProceduralDependency,
                    PROCEDURAL_DEPENDENCY_CONFIDENCE,
                    format!("Procedural dependency: \"{}\"", excerpt(requirement, 100)),
                    context,
                );
            }
        }

        for deadline in &fields.deadlines {
            for cited in context.patterns.cited_ids(deadline) {
                self.push(
                    &mut candidates,
                    document,
                    &cited,
                    RelationshipKind::TimingRelationship,
                    TIMING_RELATIONSHIP_CONFIDENCE,
                    format!("Timing relationship: \"{}\"", excerpt(deadline, 100)),
                    context,
                );
            }
        }

        Ok(candidates)
    }

    fn id(&self) -> ExtractorId {
        ExtractorId::DirectReference
    }
}
