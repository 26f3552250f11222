use crate::corpus::Corpus;
use crate::patterns::PatternLibrary;
use crate::types::*;
use std::collections::BTreeSet;
use tracing::info;

pub struct GraphBuilder;

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// One node per distinct document id, then one edge per aggregated
    /// relationship. Edge weight always comes from the kind table.
    pub fn build_graph(
        &self,
        corpus: &Corpus,
        relationships: &[RelationshipCandidate],
        patterns: &PatternLibrary,
    ) -> RuleGraph {
        info!(
            "🏗️  Building rule graph from {} documents and {} relationships",
            corpus.len(),
            relationships.len()
        );

        let mut graph = RuleGraph::new();
        for document in corpus.documents() {
            // First document with an id wins
            graph
                .nodes
                .entry(document.id.clone())
                .or_insert_with(|| Self::create_node(document, corpus, patterns));
        }

        let mut seen: BTreeSet<EdgeKey> = BTreeSet::new();
        for relationship in relationships {
            if relationship.source_id == relationship.target_id
                || !graph.contains_node(&relationship.source_id)
                || !graph.contains_node(&relationship.target_id)
            {
                continue;
            }
            if !seen.insert(relationship.key()) {
                continue;
            }
            graph.edges.push(Self::create_edge(relationship));
        }
        graph.edges.sort_by(|a, b| {
            a.source_id
                .cmp(&b.source_id)
                .then_with(|| a.target_id.cmp(&b.target_id))
                .then_with(|| a.kind.cmp(&b.kind))
        });

        info!(
            "✅ Graph built: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    fn create_node(
        document: &RuleDocument,
        corpus: &Corpus,
        patterns: &PatternLibrary,
    ) -> GraphNode {
        let fields = &document.extracted_fields;
        GraphNode {
            id: document.id.clone(),
            label: format!("Section {}", document.id),
            title: document.title.clone(),
            category: document.category_or_default().to_string(),
            attributes: NodeAttributes {
                word_count: document.word_count(),
                cross_reference_count: fields.cross_references.len(),
                deadline_count: fields.deadlines.len(),
                procedural_requirement_count: fields.procedural_requirements.len(),
                key_provision_count: fields.key_provisions.len(),
                filing_questions: patterns.filing_questions_answered(document),
                is_seed: corpus.is_seed(&document.id),
            },
        }
    }

    fn create_edge(relationship: &RelationshipCandidate) -> GraphEdge {
        let description = relationship
            .reasons
            .first()
            .cloned()
            .unwrap_or_else(|| relationship.kind.label().to_string());
        GraphEdge {
            source_id: relationship.source_id.clone(),
            target_id: relationship.target_id.clone(),
            kind: relationship.kind,
            weight: relationship.kind.weight(),
            description,
            confidence: relationship.confidence,
            reasons: relationship.reasons.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PatternLibraryConfig;

    #[test]
    fn nodes_are_unique_and_edges_deduplicated() {
        let corpus = Corpus::new(
            vec![
                RuleDocument::new("a", "First A").with_category("X"),
                RuleDocument::new("b", "B").with_category("X"),
                RuleDocument::new("a", "Second A").with_category("Y"),
            ],
            &["b".to_string()],
        );
        let patterns = PatternLibrary::compile(&PatternLibraryConfig::default()).unwrap();
        let edge = RelationshipCandidate::new(
            "b",
            "a",
            RelationshipKind::MandatoryDocument,
            0.8,
            ExtractorId::AlwaysApply,
        )
        .with_reason("needed");
        let relationships = vec![
            edge.clone(),
            edge,
            RelationshipCandidate::new(
                "a",
                "a",
                RelationshipKind::Reference,
                0.9,
                ExtractorId::DirectReference,
            ),
            RelationshipCandidate::new(
                "a",
                "zzz",
                RelationshipKind::Reference,
                0.9,
                ExtractorId::DirectReference,
            ),
        ];

        let graph = GraphBuilder::new().build_graph(&corpus, &relationships, &patterns);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node("a").unwrap().title, "First A");
        assert!(graph.node("b").unwrap().attributes.is_seed);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges[0].weight, 8);
        assert_eq!(graph.edges[0].description, "needed");
    }

    #[test]
    fn edge_without_reasons_uses_kind_label() {
        let corpus = Corpus::new(
            vec![RuleDocument::new("a", "A"), RuleDocument::new("b", "B")],
            &[],
        );
        let patterns = PatternLibrary::compile(&PatternLibraryConfig::default()).unwrap();
        let relationships = vec![RelationshipCandidate::new(
            "a",
            "b",
            RelationshipKind::Reference,
            0.5,
            ExtractorId::DirectReference,
        )];
        let graph = GraphBuilder::new().build_graph(&corpus, &relationships, &patterns);
        assert_eq!(graph.edges[0].description, "References");
    }
}
