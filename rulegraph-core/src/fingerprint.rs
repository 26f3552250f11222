use crate::types::{RuleDocument, RuleGraph};
use sha2::{Digest, Sha256};

// Every field is length-prefixed so that ("ab", "c") and ("a", "bc") differ
fn update_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn update_list(hasher: &mut Sha256, values: &[String]) {
    hasher.update((values.len() as u64).to_le_bytes());
    for value in values {
        update_field(hasher, value);
    }
}

/// Hash of the snapshot content in delivery order
pub fn snapshot_fingerprint(documents: &[RuleDocument]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((documents.len() as u64).to_le_bytes());

    for document in documents {
        update_field(&mut hasher, &document.id);
        update_field(&mut hasher, &document.title);
        update_field(&mut hasher, &document.raw_text);
        update_field(&mut hasher, document.category.as_deref().unwrap_or(""));
        let fields = &document.extracted_fields;
        update_list(&mut hasher, &fields.cross_references);
        update_list(&mut hasher, &fields.deadlines);
        update_list(&mut hasher, &fields.procedural_requirements);
        update_list(&mut hasher, &fields.key_provisions);
    }

    format!("{:x}", hasher.finalize())
}

/// Hash of nodes (id order) and edges (key order). Equal graphs give equal
/// fingerprints across runs.
pub fn graph_fingerprint(graph: &RuleGraph) -> String {
    let mut hasher = Sha256::new();

    hasher.update((graph.nodes.len() as u64).to_le_bytes());
    for node in graph.nodes.values() {
        update_field(&mut hasher, &node.id);
        update_field(&mut hasher, &node.title);
        update_field(&mut hasher, &node.category);
    }

    let mut edges: Vec<_> = graph.edges.iter().collect();
    edges.sort_by(|a, b| a.key().cmp(&b.key()));
    hasher.update((edges.len() as u64).to_le_bytes());
    for edge in edges {
        update_field(&mut hasher, &edge.source_id);
        update_field(&mut hasher, &edge.target_id);
        update_field(&mut hasher, &edge.kind.key());
        hasher.update(edge.weight.to_le_bytes());
        hasher.update(edge.confidence.to_bits().to_le_bytes());
    }

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_fingerprint_tracks_content() {
        let documents = vec![RuleDocument::new("a", "A").with_text("body")];
        let same = vec![RuleDocument::new("a", "A").with_text("body")];
        let changed = vec![RuleDocument::new("a", "A").with_text("body!")];

        assert_eq!(snapshot_fingerprint(&documents), snapshot_fingerprint(&same));
        assert_ne!(snapshot_fingerprint(&documents), snapshot_fingerprint(&changed));
        assert_eq!(snapshot_fingerprint(&documents).len(), 64);
    }

    #[test]
    fn field_boundaries_matter() {
        let left = vec![RuleDocument::new("ab", "c")];
        let right = vec![RuleDocument::new("a", "bc")];
        assert_ne!(snapshot_fingerprint(&left), snapshot_fingerprint(&right));
    }

    #[test]
    fn empty_graph_has_stable_fingerprint() {
        assert_eq!(graph_fingerprint(&RuleGraph::new()), graph_fingerprint(&RuleGraph::new()));
    }
}
