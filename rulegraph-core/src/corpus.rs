use crate::types::{RuleDocument, RuleId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Read-only view of one snapshot: documents in snapshot order, an id index,
/// the seed set and the reference network.
#[derive(Debug, Clone)]
pub struct Corpus {
    documents: Vec<RuleDocument>,
    index: HashMap<RuleId, usize>,
    seeds: BTreeSet<RuleId>,
    network: ReferenceNetwork,
}

impl Corpus {
    /// First document wins when an id repeats
    pub fn new(documents: Vec<RuleDocument>, seed_ids: &[String]) -> Self {
        let mut unique = Vec::with_capacity(documents.len());
        let mut index = HashMap::with_capacity(documents.len());
        for document in documents {
            if index.contains_key(&document.id) {
                debug!(id = %document.id, "duplicate document id, keeping first");
                continue;
            }
            index.insert(document.id.clone(), unique.len());
            unique.push(document);
        }

        let network = ReferenceNetwork::build(&unique);
        Self {
            documents: unique,
            index,
            seeds: seed_ids.iter().map(|id| id.trim().to_string()).collect(),
            network,
        }
    }

    pub fn documents(&self) -> &[RuleDocument] {
        &self.documents
    }

    pub fn get(&self, id: &str) -> Option<&RuleDocument> {
        self.index.get(id).map(|&i| &self.documents[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Configured seed ids, present in the snapshot or not
    pub fn seeds(&self) -> &BTreeSet<RuleId> {
        &self.seeds
    }

    pub fn is_seed(&self, id: &str) -> bool {
        self.seeds.contains(id)
    }

    /// Seed documents actually present, in snapshot order
    pub fn seed_documents(&self) -> impl Iterator<Item = &RuleDocument> {
        self.documents.iter().filter(move |d| self.seeds.contains(&d.id))
    }

    pub fn network(&self) -> &ReferenceNetwork {
        &self.network
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents grouped by category, each group in snapshot order
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&RuleDocument>> {
        let mut groups: BTreeMap<&str, Vec<&RuleDocument>> = BTreeMap::new();
        for document in &self.documents {
            groups.entry(document.category_or_default()).or_default().push(document);
        }
        groups
    }
}

/// Directed adjacency built from explicit cross references only. Referenced
/// ids outside the snapshot still count toward degree.
#[derive(Debug, Clone, Default)]
pub struct ReferenceNetwork {
    outgoing: BTreeMap<RuleId, BTreeSet<RuleId>>,
    incoming: BTreeMap<RuleId, BTreeSet<RuleId>>,
}

static EMPTY: BTreeSet<RuleId> = BTreeSet::new();

impl ReferenceNetwork {
    pub fn build(documents: &[RuleDocument]) -> Self {
        let mut network = Self::default();
        for document in documents {
            for reference in &document.extracted_fields.cross_references {
                let reference = reference.trim();
                if reference.is_empty() || reference == document.id {
                    continue;
                }
                network
                    .outgoing
                    .entry(document.id.clone())
                    .or_default()
                    .insert(reference.to_string());
                network
                    .incoming
                    .entry(reference.to_string())
                    .or_default()
                    .insert(document.id.clone());
            }
        }
        network
    }

    pub fn outgoing(&self, id: &str) -> &BTreeSet<RuleId> {
        self.outgoing.get(id).unwrap_or(&EMPTY)
    }

    pub fn incoming(&self, id: &str) -> &BTreeSet<RuleId> {
        self.incoming.get(id).unwrap_or(&EMPTY)
    }

    pub fn degree(&self, id: &str) -> usize {
        self.outgoing(id).len() + self.incoming(id).len()
    }

    /// Union of both directions, sorted
    pub fn neighbors(&self, id: &str) -> BTreeSet<RuleId> {
        self.outgoing(id).union(self.incoming(id)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_keep_first_document() {
        let corpus = Corpus::new(
            vec![
                RuleDocument::new("1005", "First"),
                RuleDocument::new("1010", "Other"),
                RuleDocument::new("1005", "Second"),
            ],
            &["1005".to_string()],
        );
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get("1005").map(|d| d.title.as_str()), Some("First"));
        assert!(corpus.is_seed("1005"));
        assert_eq!(corpus.seed_documents().count(), 1);
    }

    #[test]
    fn network_tracks_both_directions() {
        let docs = vec![
            RuleDocument::new("a", "A").with_cross_references(["b", "c", "a"]),
            RuleDocument::new("b", "B").with_cross_references(["c"]),
        ];
        let network = ReferenceNetwork::build(&docs);
        assert_eq!(network.outgoing("a").len(), 2);
        assert_eq!(network.incoming("c").len(), 2);
        assert_eq!(network.degree("b"), 2);
        assert_eq!(network.degree("missing"), 0);
        assert!(!network.neighbors("a").contains("a"));
    }
}
