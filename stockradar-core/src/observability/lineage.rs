//! Data lineage graph — which data came from where, through which operation.
//!
//! Nodes are keyed by id; registering an id again replaces the node in place
//! (same position, new value). Edges are append-only and may only connect
//! registered ids. Nodes and edges are shared via `Arc`, so an exported
//! snapshot is cheap and keeps pointing at the records that existed when it
//! was taken.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Read,
    Write,
    Transform,
    Validate,
    Clean,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationType::Read => "READ",
            OperationType::Write => "WRITE",
            OperationType::Transform => "TRANSFORM",
            OperationType::Validate => "VALIDATE",
            OperationType::Clean => "CLEAN",
        };
        f.write_str(s)
    }
}

/// A dataset, file, API or processing step that data flows through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataNode {
    pub id: String,
    pub name: String,
    /// e.g. "table", "file", "api", "processor".
    #[serde(rename = "type")]
    pub node_type: String,
    pub metadata: BTreeMap<String, String>,
}

impl DataNode {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type: node_type.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// What happened between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub timestamp: NaiveDateTime,
    /// Component that performed the operation.
    pub operator: String,
    pub details: BTreeMap<String, String>,
}

impl Operation {
    /// An operation stamped with the current local time.
    pub fn now(op_type: OperationType, operator: impl Into<String>) -> Self {
        Self {
            op_type,
            timestamp: chrono::Local::now().naive_local(),
            operator: operator.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineageEdge {
    pub source: Arc<DataNode>,
    pub target: Arc<DataNode>,
    pub operation: Operation,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineageError {
    #[error("lineage node '{missing}' not found (edge {source_id} -> {target_id})")]
    NodeNotFound {
        source_id: String,
        target_id: String,
        missing: String,
    },
}

/// Point-in-time view returned by [`LineageGraph::export_graph`].
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Arc<DataNode>>,
    pub edges: Vec<Arc<LineageEdge>>,
}

#[derive(Debug, Default)]
pub struct LineageGraph {
    nodes: Vec<Arc<DataNode>>,
    index: HashMap<String, usize>,
    edges: Vec<Arc<LineageEdge>>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node, replacing any node with the same id.
    ///
    /// Returns the replaced node. Edges created earlier keep referring to the
    /// node value they were created with.
    pub fn add_node(&mut self, node: DataNode) -> Option<Arc<DataNode>> {
        let node = Arc::new(node);
        match self.index.get(&node.id) {
            Some(&i) => Some(std::mem::replace(&mut self.nodes[i], node)),
            None => {
                self.index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
                None
            }
        }
    }

    /// Append an edge between two registered nodes.
    ///
    /// Fails without touching the graph if either id is unknown. Parallel
    /// edges between the same pair are kept.
    pub fn add_edge(
        &mut self,
        source_id: &str,
        target_id: &str,
        operation: Operation,
    ) -> Result<Arc<LineageEdge>, LineageError> {
        let not_found = |missing: &str| LineageError::NodeNotFound {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            missing: missing.to_string(),
        };
        let source = self.node(source_id).ok_or_else(|| not_found(source_id))?.clone();
        let target = self.node(target_id).ok_or_else(|| not_found(target_id))?.clone();

        let edge = Arc::new(LineageEdge {
            source,
            target,
            operation,
        });
        self.edges.push(edge.clone());
        Ok(edge)
    }

    pub fn node(&self, id: &str) -> Option<&Arc<DataNode>> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes with an edge into `node_id`, one entry per id, ordered by id.
    pub fn get_upstream_nodes(&self, node_id: &str) -> Vec<Arc<DataNode>> {
        let ids: BTreeSet<&str> = self
            .edges
            .iter()
            .filter(|e| e.target.id == node_id)
            .map(|e| e.source.id.as_str())
            .collect();
        self.current_nodes(ids)
    }

    /// Nodes with an edge out of `node_id`, one entry per id, ordered by id.
    pub fn get_downstream_nodes(&self, node_id: &str) -> Vec<Arc<DataNode>> {
        let ids: BTreeSet<&str> = self
            .edges
            .iter()
            .filter(|e| e.source.id == node_id)
            .map(|e| e.target.id.as_str())
            .collect();
        self.current_nodes(ids)
    }

    /// Operations on every edge touching `node_id`, in edge insertion order.
    pub fn get_node_operations(&self, node_id: &str) -> Vec<&Operation> {
        self.edges
            .iter()
            .filter(|e| e.source.id == node_id || e.target.id == node_id)
            .map(|e| &e.operation)
            .collect()
    }

    pub fn export_graph(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Resolve neighbour ids to the node currently registered under each id.
    fn current_nodes(&self, ids: BTreeSet<&str>) -> Vec<Arc<DataNode>> {
        ids.into_iter()
            .filter_map(|id| self.node(id).cloned())
            .collect()
    }
}
