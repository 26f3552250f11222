use crate::fingerprint::graph_fingerprint;
use crate::types::*;
use super::analytics::GraphAnalytics;

impl RuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source_id == id)
    }

    pub fn edges_to<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target_id == id)
    }

    /// Edges with `id` at either end
    pub fn edges_touching<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.touches(id))
    }

    pub fn nodes_in_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a GraphNode> + 'a {
        self.nodes.values().filter(move |n| n.category == category)
    }

    /// SHA-256 over nodes and edges in canonical order
    pub fn fingerprint(&self) -> String {
        graph_fingerprint(self)
    }

    /// Full metrics bundle for this graph
    pub fn compute_metrics(&self) -> MetricsBundle {
        GraphAnalytics::compute_metrics(self)
    }
}
