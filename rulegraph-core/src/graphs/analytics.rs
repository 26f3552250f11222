use crate::types::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Pure metric functions over a built graph. Nothing here mutates the graph,
/// so every call is repeatable.
pub struct GraphAnalytics;

impl GraphAnalytics {
    pub fn compute_metrics(graph: &RuleGraph) -> MetricsBundle {
        MetricsBundle {
            total_nodes: graph.node_count(),
            total_edges: graph.edge_count(),
            centrality: Self::degree_centrality(graph),
            density: Self::network_density(graph),
            average_degree: Self::average_degree(graph),
            categories: Self::category_breakdown(graph),
            kind_distribution: Self::kind_distribution(graph),
        }
    }

    /// Edges touching each node in either direction. Every node is listed,
    /// highest degree first, ties by id.
    pub fn degree_centrality(graph: &RuleGraph) -> Vec<CentralityEntry> {
        let degrees = Self::degrees(graph);
        let mut entries: Vec<CentralityEntry> = graph
            .nodes
            .values()
            .map(|node| CentralityEntry {
                node_id: node.id.clone(),
                degree: degrees.get(node.id.as_str()).copied().unwrap_or(0),
                title: node.title.clone(),
                category: node.category.clone(),
            })
            .collect();
        entries.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.node_id.cmp(&b.node_id)));
        entries
    }

    /// Top `limit` entries of the centrality ranking
    pub fn central_nodes(graph: &RuleGraph, limit: usize) -> Vec<CentralityEntry> {
        let mut entries = Self::degree_centrality(graph);
        entries.truncate(limit);
        entries
    }

    /// edges / (n(n-1)/2), 0 for n <= 1, never above 1
    pub fn network_density(graph: &RuleGraph) -> f64 {
        let n = graph.node_count();
        if n <= 1 {
            return 0.0;
        }
        let possible = (n * (n - 1)) as f64 / 2.0;
        (graph.edge_count() as f64 / possible).clamp(0.0, 1.0)
    }

    pub fn average_degree(graph: &RuleGraph) -> f64 {
        let n = graph.node_count();
        if n == 0 {
            return 0.0;
        }
        2.0 * graph.edge_count() as f64 / n as f64
    }

    /// Per category: members, edges inside it, and edges crossing its border
    pub fn category_breakdown(graph: &RuleGraph) -> BTreeMap<String, CategoryStats> {
        let mut stats: BTreeMap<String, CategoryStats> = BTreeMap::new();
        for node in graph.nodes.values() {
            let entry = stats.entry(node.category.clone()).or_default();
            entry.node_count += 1;
            entry.node_ids.push(node.id.clone());
        }

        for edge in &graph.edges {
            let source = graph.node(&edge.source_id);
            let target = graph.node(&edge.target_id);
            let (Some(source), Some(target)) = (source, target) else {
                continue;
            };
            if source.category == target.category {
                if let Some(entry) = stats.get_mut(&source.category) {
                    entry.internal_edges += 1;
                }
            } else {
                for category in [&source.category, &target.category] {
                    if let Some(entry) = stats.get_mut(category) {
                        entry.external_edges += 1;
                    }
                }
            }
        }
        stats
    }

    pub fn kind_distribution(graph: &RuleGraph) -> BTreeMap<String, usize> {
        let mut distribution = BTreeMap::new();
        for edge in &graph.edges {
            *distribution.entry(edge.kind.key()).or_insert(0) += 1;
        }
        distribution
    }

    pub fn edges_of_kind(graph: &RuleGraph, kind: RelationshipKind) -> Vec<&GraphEdge> {
        graph.edges.iter().filter(|e| e.kind == kind).collect()
    }

    /// Distinct adjacent ids in either direction, sorted
    pub fn neighbors(graph: &RuleGraph, id: &str) -> Vec<RuleId> {
        let set: BTreeSet<&str> = graph
            .edges_touching(id)
            .map(|e| if e.source_id == id { e.target_id.as_str() } else { e.source_id.as_str() })
            .collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Fewest-hop path over the undirected view, endpoints included
    pub fn shortest_path(graph: &RuleGraph, from: &str, to: &str) -> Option<Vec<RuleId>> {
        if !graph.contains_node(from) || !graph.contains_node(to) {
            return None;
        }
        if from == to {
            return Some(vec![from.to_string()]);
        }

        let adjacency = Self::adjacency(graph);
        let mut previous: HashMap<&str, &str> = HashMap::new();
        let mut visited: BTreeSet<&str> = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            let Some(next) = adjacency.get(current) else {
                continue;
            };
            for &neighbor in next {
                if !visited.insert(neighbor) {
                    continue;
                }
                previous.insert(neighbor, current);
                if neighbor == to {
                    let mut path = vec![to.to_string()];
                    let mut step = to;
                    while let Some(&prior) = previous.get(step) {
                        path.push(prior.to_string());
                        step = prior;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(neighbor);
            }
        }
        None
    }

    pub fn node_statistics(graph: &RuleGraph, id: &str) -> Option<NodeStatistics> {
        graph.node(id)?;
        let mut kind_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut outgoing = 0;
        let mut incoming = 0;
        for edge in graph.edges_touching(id) {
            if edge.source_id == id {
                outgoing += 1;
            } else {
                incoming += 1;
            }
            *kind_counts.entry(edge.kind.key()).or_insert(0) += 1;
        }
        Some(NodeStatistics {
            node_id: id.to_string(),
            degree: outgoing + incoming,
            outgoing,
            incoming,
            kind_counts,
            neighbors: Self::neighbors(graph, id),
        })
    }

    /// Case-insensitive match on id, title or category
    pub fn search_nodes<'a>(graph: &'a RuleGraph, query: &str) -> Vec<&'a GraphNode> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        graph
            .nodes
            .values()
            .filter(|node| {
                node.id.to_lowercase().contains(&query)
                    || node.title.to_lowercase().contains(&query)
                    || node.category.to_lowercase().contains(&query)
            })
            .collect()
    }

    fn degrees(graph: &RuleGraph) -> HashMap<&str, usize> {
        let mut degrees: HashMap<&str, usize> = HashMap::new();
        for edge in &graph.edges {
            *degrees.entry(edge.source_id.as_str()).or_insert(0) += 1;
            *degrees.entry(edge.target_id.as_str()).or_insert(0) += 1;
        }
        degrees
    }

    fn adjacency(graph: &RuleGraph) -> HashMap<&str, BTreeSet<&str>> {
        let mut adjacency: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        for edge in &graph.edges {
            adjacency
                .entry(edge.source_id.as_str())
                .or_default()
                .insert(edge.target_id.as_str());
            adjacency
                .entry(edge.target_id.as_str())
                .or_default()
                .insert(edge.source_id.as_str());
        }
        adjacency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, category: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: format!("Section {}", id),
            title: format!("Title {}", id),
            category: category.to_string(),
            attributes: NodeAttributes::default(),
        }
    }

    fn edge(source: &str, target: &str, kind: RelationshipKind) -> GraphEdge {
        GraphEdge {
            source_id: source.to_string(),
            target_id: target.to_string(),
            kind,
            weight: kind.weight(),
            description: kind.label().to_string(),
            confidence: 0.5,
            reasons: Vec::new(),
        }
    }

    fn sample() -> RuleGraph {
        let mut graph = RuleGraph::new();
        for (id, category) in [("a", "X"), ("b", "X"), ("c", "Y"), ("d", "Y"), ("lonely", "Z")] {
            graph.nodes.insert(id.to_string(), node(id, category));
        }
        graph.edges = vec![
            edge("a", "b", RelationshipKind::Reference),
            edge("b", "c", RelationshipKind::Reference),
            edge("c", "d", RelationshipKind::CategorySimilarity),
        ];
        graph
    }

    #[test]
    fn centrality_lists_every_node_in_order() {
        let centrality = GraphAnalytics::degree_centrality(&sample());
        let order: Vec<(&str, usize)> = centrality
            .iter()
            .map(|e| (e.node_id.as_str(), e.degree))
            .collect();
        assert_eq!(order, vec![("b", 2), ("c", 2), ("a", 1), ("d", 1), ("lonely", 0)]);
        let total: usize = centrality.iter().map(|e| e.degree).sum();
        assert_eq!(total, 2 * 3);
    }

    #[test]
    fn density_and_average_degree() {
        let graph = sample();
        assert!((GraphAnalytics::network_density(&graph) - 3.0 / 10.0).abs() < 1e-12);
        assert!((GraphAnalytics::average_degree(&graph) - 6.0 / 5.0).abs() < 1e-12);

        let empty = RuleGraph::new();
        assert_eq!(GraphAnalytics::network_density(&empty), 0.0);
        assert_eq!(GraphAnalytics::average_degree(&empty), 0.0);
    }

    #[test]
    fn category_partition_counts_internal_and_crossing_edges() {
        let breakdown = GraphAnalytics::category_breakdown(&sample());
        assert_eq!(breakdown["X"].internal_edges, 1);
        assert_eq!(breakdown["X"].external_edges, 1);
        assert_eq!(breakdown["Y"].internal_edges, 1);
        assert_eq!(breakdown["Y"].external_edges, 1);
        assert_eq!(breakdown["Z"].node_count, 1);
        assert_eq!(breakdown["Z"].internal_edges + breakdown["Z"].external_edges, 0);
    }

    #[test]
    fn shortest_path_walks_undirected_view() {
        let graph = sample();
        assert_eq!(
            GraphAnalytics::shortest_path(&graph, "d", "a"),
            Some(vec!["d".to_string(), "c".to_string(), "b".to_string(), "a".to_string()])
        );
        assert_eq!(GraphAnalytics::shortest_path(&graph, "a", "lonely"), None);
        assert_eq!(GraphAnalytics::shortest_path(&graph, "a", "a"), Some(vec!["a".to_string()]));
        assert_eq!(GraphAnalytics::shortest_path(&graph, "a", "nowhere"), None);
    }

    #[test]
    fn node_statistics_and_neighbors() {
        let graph = sample();
        let stats = GraphAnalytics::node_statistics(&graph, "b").unwrap();
        assert_eq!(stats.degree, 2);
        assert_eq!(stats.outgoing, 1);
        assert_eq!(stats.incoming, 1);
        assert_eq!(stats.kind_counts["reference"], 2);
        assert_eq!(stats.neighbors, vec!["a".to_string(), "c".to_string()]);
        assert!(GraphAnalytics::node_statistics(&graph, "missing").is_none());
    }

    #[test]
    fn search_kind_filters_and_top_nodes() {
        let graph = sample();
        assert_eq!(GraphAnalytics::search_nodes(&graph, "TITLE C").len(), 1);
        assert_eq!(GraphAnalytics::search_nodes(&graph, "y").len(), 2);
        assert!(GraphAnalytics::search_nodes(&graph, "  ").is_empty());
        assert_eq!(GraphAnalytics::edges_of_kind(&graph, RelationshipKind::Reference).len(), 2);
        assert_eq!(GraphAnalytics::kind_distribution(&graph)["category_similarity"], 1);
        assert_eq!(GraphAnalytics::central_nodes(&graph, 2).len(), 2);
    }
}
