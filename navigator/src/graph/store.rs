use std::collections::{BTreeMap, HashMap};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};

use crate::config::GraphBackend;

/// Node kinds in the interview graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Theme,
    Event,
}

/// Edge kinds: a dependency edge points prerequisite -> dependent; a
/// contains edge points theme -> event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRelation {
    Dependency,
    Contains,
}

/// A node in serialized (checkpoint) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshotNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub status: String,
}

/// An edge in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation: EdgeRelation,
}

/// Serializable whole-graph structure. Edges serialize under "links".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphSnapshotNode>,
    #[serde(default)]
    pub links: Vec<GraphLink>,
}

/// Backing structure for the interview graph. The manager depends only on
/// this trait; which backend is behind it is a configuration detail.
pub trait GraphStore: std::fmt::Debug + Send {
    fn add_node(&mut self, id: &str, kind: NodeKind, status: &str);
    /// Insert an edge between two existing nodes. Duplicate edges and edges
    /// to unknown nodes are dropped silently.
    fn add_edge(&mut self, source: &str, target: &str, relation: EdgeRelation);
    /// Returns false when the node is unknown.
    fn set_status(&mut self, id: &str, status: &str) -> bool;
    fn contains_node(&self, id: &str) -> bool;
    fn node_count(&self) -> usize;
    fn edge_count(&self) -> usize;
    fn links(&self) -> Vec<GraphLink>;
    fn clear(&mut self);
    fn snapshot(&self) -> GraphSnapshot;
    fn restore(&mut self, snapshot: &GraphSnapshot);
}

pub fn build_store(backend: GraphBackend) -> Box<dyn GraphStore> {
    match backend {
        GraphBackend::Petgraph => Box::new(PetgraphStore::new()),
        GraphBackend::Adjacency => Box::new(AdjacencyStore::new()),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct NodeData {
    kind: NodeKind,
    status: String,
}

/// Plain adjacency-map backend.
#[derive(Debug, Default)]
pub struct AdjacencyStore {
    nodes: BTreeMap<String, NodeData>,
    links: Vec<GraphLink>,
}

impl AdjacencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for AdjacencyStore {
    fn add_node(&mut self, id: &str, kind: NodeKind, status: &str) {
        self.nodes.insert(
            id.to_string(),
            NodeData {
                kind,
                status: status.to_string(),
            },
        );
    }

    fn add_edge(&mut self, source: &str, target: &str, relation: EdgeRelation) {
        if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            return;
        }
        let link = GraphLink {
            source: source.to_string(),
            target: target.to_string(),
            relation,
        };
        if !self.links.contains(&link) {
            self.links.push(link);
        }
    }

    fn set_status(&mut self, id: &str, status: &str) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.status = status.to_string();
                true
            }
            None => false,
        }
    }

    fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.links.len()
    }

    fn links(&self) -> Vec<GraphLink> {
        self.links.clone()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
    }

    fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|(id, data)| GraphSnapshotNode {
                    id: id.clone(),
                    kind: data.kind,
                    status: data.status.clone(),
                })
                .collect(),
            links: self.links.clone(),
        }
    }

    fn restore(&mut self, snapshot: &GraphSnapshot) {
        self.clear();
        for node in &snapshot.nodes {
            self.add_node(&node.id, node.kind, &node.status);
        }
        for link in &snapshot.links {
            self.add_edge(&link.source, &link.target, link.relation);
        }
    }
}

/// petgraph-backed store. Keeps an id -> index side table because petgraph
/// nodes are addressed by index, not by our string ids.
#[derive(Debug, Default)]
pub struct PetgraphStore {
    graph: StableDiGraph<(String, NodeData), EdgeRelation>,
    indices: HashMap<String, NodeIndex>,
}

impl PetgraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for PetgraphStore {
    fn add_node(&mut self, id: &str, kind: NodeKind, status: &str) {
        let data = NodeData {
            kind,
            status: status.to_string(),
        };
        match self.indices.get(id) {
            Some(&index) => {
                self.graph[index] = (id.to_string(), data);
            }
            None => {
                let index = self.graph.add_node((id.to_string(), data));
                self.indices.insert(id.to_string(), index);
            }
        }
    }

    fn add_edge(&mut self, source: &str, target: &str, relation: EdgeRelation) {
        let (Some(&a), Some(&b)) = (self.indices.get(source), self.indices.get(target)) else {
            return;
        };
        let duplicate = self
            .graph
            .edges_connecting(a, b)
            .any(|edge| *edge.weight() == relation);
        if !duplicate {
            self.graph.add_edge(a, b, relation);
        }
    }

    fn set_status(&mut self, id: &str, status: &str) -> bool {
        match self.indices.get(id) {
            Some(&index) => {
                self.graph[index].1.status = status.to_string();
                true
            }
            None => false,
        }
    }

    fn contains_node(&self, id: &str) -> bool {
        self.indices.contains_key(id)
    }

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn links(&self) -> Vec<GraphLink> {
        self.graph
            .edge_references()
            .map(|edge| GraphLink {
                source: self.graph[edge.source()].0.clone(),
                target: self.graph[edge.target()].0.clone(),
                relation: *edge.weight(),
            })
            .collect()
    }

    fn clear(&mut self) {
        self.graph.clear();
        self.indices.clear();
    }

    fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .graph
                .node_indices()
                .map(|index| {
                    let (id, data) = &self.graph[index];
                    GraphSnapshotNode {
                        id: id.clone(),
                        kind: data.kind,
                        status: data.status.clone(),
                    }
                })
                .collect(),
            links: self.links(),
        }
    }

    fn restore(&mut self, snapshot: &GraphSnapshot) {
        self.clear();
        for node in &snapshot.nodes {
            self.add_node(&node.id, node.kind, &node.status);
        }
        for link in &snapshot.links {
            self.add_edge(&link.source, &link.target, link.relation);
        }
    }
}
