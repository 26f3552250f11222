use super::{ExtractionContext, RelationshipExtractor};
use crate::types::{
    clamp_confidence, ExtractorId, RelationshipCandidate, RelationshipKind, RuleDocument,
};
use anyhow::Result;

const SEED_INCOMING_WEIGHT: f64 = 0.3;
const SEED_OUTGOING_WEIGHT: f64 = 0.4;
const CENTRALITY_WEIGHT: f64 = 0.2;
const CENTRALITY_MIN_DEGREE: usize = 5;
const MIN_CONFIDENCE: f64 = 0.4;

/// Documents tightly wired to seeds in the reference network.
pub struct NetworkPropagationExtractor;

impl Default for NetworkPropagationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkPropagationExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl RelationshipExtractor for NetworkPropagationExtractor {
    fn extract(
        &self,
        document: &RuleDocument,
        context: &ExtractionContext<'_>,
    ) -> Result<Vec<RelationshipCandidate>> {
        let corpus = context.corpus;
        if corpus.is_seed(&document.id) {
            return Ok(Vec::new());
        }

        let network = corpus.network();
        let seed_incoming = network
            .incoming(&document.id)
            .iter()
            .filter(|id| corpus.is_seed(id))
            .count();
        let seed_outgoing = network
            .outgoing(&document.id)
            .iter()
            .filter(|id| corpus.is_seed(id))
            .count();
        let degree = network.degree(&document.id);

        let mut confidence = SEED_INCOMING_WEIGHT * (seed_incoming as f64 / 2.0).min(1.0)
            + SEED_OUTGOING_WEIGHT * (seed_outgoing as f64 / 3.0).min(1.0);
        let mut reasons = vec![format!(
            "Referenced by {} critical sections, references {} critical sections",
            seed_incoming, seed_outgoing
        )];
        if degree > CENTRALITY_MIN_DEGREE {
            confidence += CENTRALITY_WEIGHT * (degree as f64 / 10.0).min(1.0);
            reasons.push(format!("High network centrality (degree {})", degree));
        }
        let confidence = clamp_confidence(confidence);
        if confidence <= MIN_CONFIDENCE {
            return Ok(Vec::new());
        }

        let neighbors = network.neighbors(&document.id);
        let mut targets: Vec<&String> = neighbors
            .iter()
            .filter(|id| corpus.is_seed(id) && corpus.contains(id))
            .collect();
        if targets.is_empty() {
            targets = neighbors.iter().filter(|id| corpus.contains(id)).collect();
        }

        Ok(targets
            .into_iter()
            .filter(|target| **target != document.id)
            .map(|target| {
                RelationshipCandidate::new(
                    &document.id,
                    target,
                    RelationshipKind::NetworkCentrality,
                    confidence,
                    ExtractorId::NetworkPropagation,
                )
                .with_reasons(reasons.iter().cloned())
            })
            .collect())
    }

    fn id(&self) -> ExtractorId {
        ExtractorId::NetworkPropagation
    }
}
