//! Dependency graph model.
//!
//! [`DependencyGraph`] is the accumulator shared by the worker threads: nodes
//! are deduplicated by [`NodeKey`] and edges are an append-only multiset.
//! Once the workers have joined, [`DependencyGraph::into_model`] produces a
//! [`GraphModel`], the sorted and renumbered form handed to the serializers in
//! `crate::visualization`.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::GardenerError;
use crate::parser::rules::IncludeStyle;

pub mod resolver;

/// Index of a node inside one `DependencyGraph`. Only meaningful for that graph,
/// and only obtainable from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node identity: a canonical file path, or the raw token of an include that
/// could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    File(PathBuf),
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub key: NodeKey,
    pub language: Option<String>,
    /// The file was itself scanned (discovered or passed as a root).
    pub scanned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub line: usize,
    pub style: IncludeStyle,
    pub token: String,
}

/// Target of `add_edge`: an existing node or a token that did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeTarget {
    Node(NodeId),
    Unresolved(String),
}

/// One include found in a scanned file, ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdge {
    pub target: PendingTarget,
    pub line: usize,
    pub style: IncludeStyle,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingTarget {
    File { path: PathBuf, language: Option<String> },
    Unresolved,
}

/// Everything one worker learned about one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub language: Option<String>,
    pub edges: Vec<PendingEdge>,
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeKey, NodeId>,
    edges: Vec<Edge>,
}

impl GraphState {
    fn intern(&mut self, key: NodeKey, language: Option<&str>) -> NodeId {
        if let Some(id) = self.index.get(&key) {
            debug_assert_eq!(
                self.nodes[id.0].language.as_deref(),
                language,
                "conflicting language tags for {key:?}"
            );
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode { key: key.clone(), language: language.map(str::to_string), scanned: false });
        self.index.insert(key, id);
        id
    }

    fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    fn target_id(&mut self, target: EdgeTarget) -> Option<NodeId> {
        match target {
            EdgeTarget::Node(id) => self.contains(id).then_some(id),
            EdgeTarget::Unresolved(token) => Some(self.intern(NodeKey::Unresolved(token), None)),
        }
    }
}

/// Thread-safe node/edge accumulator.
///
/// Every mutating method takes the internal lock once, so a whole file's
/// results can be inserted in a single critical section via
/// [`DependencyGraph::insert_outcome`].
#[derive(Debug, Default)]
pub struct DependencyGraph {
    state: Mutex<GraphState>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GraphState> {
        // A panicking worker cannot leave the state half-written: each method
        // finishes its pushes before returning.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Idempotent: the same canonical path always yields the same `NodeId`.
    pub fn add_node(&self, path: &Path, language: Option<&str>) -> NodeId {
        self.lock().intern(NodeKey::File(path.to_path_buf()), language)
    }

    /// Mark a file node as scanned.
    pub fn mark_scanned(&self, id: NodeId) {
        if let Some(node) = self.lock().nodes.get_mut(id.0) {
            node.scanned = true;
        }
    }

    /// Append an edge. Never merges with existing edges between the same pair.
    ///
    /// Ids that this graph did not hand out are dropped with a warning.
    pub fn add_edge(&self, source: NodeId, target: EdgeTarget, line: usize, style: IncludeStyle, token: &str) {
        let mut state = self.lock();
        if !state.contains(source) {
            tracing::warn!(source = source.0, token, "edge from unknown node dropped");
            return;
        }
        let Some(target) = state.target_id(target) else {
            tracing::warn!(source = source.0, token, "edge to unknown node dropped");
            return;
        };
        state.edges.push(Edge { source, target, line, style, token: token.to_string() });
    }

    /// Insert one scanned file and all its edges under one lock acquisition.
    /// Returns the number of edges added.
    pub fn insert_outcome(&self, outcome: FileOutcome) -> usize {
        let mut state = self.lock();
        let source = state.intern(NodeKey::File(outcome.path), outcome.language.as_deref());
        state.nodes[source.0].scanned = true;
        let added = outcome.edges.len();
        for edge in outcome.edges {
            let target = match edge.target {
                PendingTarget::File { path, language } => {
                    state.intern(NodeKey::File(path), language.as_deref())
                }
                PendingTarget::Unresolved => state.intern(NodeKey::Unresolved(edge.token.clone()), None),
            };
            state.edges.push(Edge { source, target, line: edge.line, style: edge.style, token: edge.token });
        }
        added
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.lock().edges.len()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<GraphNode> {
        self.lock().nodes.get(id.0).cloned()
    }

    /// Deterministic snapshot of the current content.
    #[must_use]
    pub fn model(&self) -> GraphModel {
        let state = self.lock();
        GraphModel::from_parts(&state.nodes, &state.edges)
    }

    /// Consume the graph once all writers are done.
    #[must_use]
    pub fn into_model(self) -> GraphModel {
        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        GraphModel::from_parts(&state.nodes, &state.edges)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelNode {
    pub id: usize,
    pub kind: NodeKind,
    /// Canonical path for files, raw token for unresolved includes.
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub scanned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEdge {
    pub source: usize,
    pub target: usize,
    pub line: usize,
    pub style: IncludeStyle,
    pub token: String,
}

/// Finished graph: nodes sorted by key and numbered `0..n`, edges sorted by
/// `(source, line, target, style, token)`. Identical inputs give identical
/// models regardless of how the work was scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphModel {
    pub nodes: Vec<ModelNode>,
    pub edges: Vec<ModelEdge>,
}

impl GraphModel {
    fn from_parts(nodes: &[GraphNode], edges: &[Edge]) -> Self {
        let mut order: Vec<usize> = (0..nodes.len()).collect();
        order.sort_by(|a, b| nodes[*a].key.cmp(&nodes[*b].key));
        let mut remap = vec![0usize; nodes.len()];
        for (new_id, old_id) in order.iter().enumerate() {
            remap[*old_id] = new_id;
        }

        let model_nodes = order
            .iter()
            .enumerate()
            .map(|(new_id, old_id)| {
                let node = &nodes[*old_id];
                let (kind, label, path) = match &node.key {
                    NodeKey::File(p) => (NodeKind::File, p.display().to_string(), Some(p.clone())),
                    NodeKey::Unresolved(t) => (NodeKind::Unresolved, t.clone(), None),
                };
                ModelNode { id: new_id, kind, label, path, language: node.language.clone(), scanned: node.scanned }
            })
            .collect();

        let mut model_edges: Vec<ModelEdge> = edges
            .iter()
            .map(|e| ModelEdge {
                source: remap[e.source.0],
                target: remap[e.target.0],
                line: e.line,
                style: e.style,
                token: e.token.clone(),
            })
            .collect();
        model_edges.sort_by(|a, b| {
            (a.source, a.line, a.target, a.style, &a.token).cmp(&(b.source, b.line, b.target, b.style, &b.token))
        });

        Self { nodes: model_nodes, edges: model_edges }
    }

    #[must_use]
    pub fn find_file(&self, path: &Path) -> Option<&ModelNode> {
        self.nodes.iter().find(|n| n.path.as_deref() == Some(path))
    }

    #[must_use]
    pub fn find_unresolved(&self, token: &str) -> Option<&ModelNode> {
        self.nodes.iter().find(|n| n.kind == NodeKind::Unresolved && n.label == token)
    }

    /// Edges leaving `node`, in model order.
    pub fn edges_from(&self, node: usize) -> impl Iterator<Item = &ModelEdge> {
        self.edges.iter().filter(move |e| e.source == node)
    }

    #[must_use]
    pub fn unresolved_edge_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| self.nodes.get(e.target).is_some_and(|n| n.kind == NodeKind::Unresolved))
            .count()
    }

    /// Save the model as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `GardenerError::Serialization` if encoding fails and `GardenerError::Io`
    /// if writing the file fails.
    pub fn save_json(&self, path: &Path) -> Result<(), GardenerError> {
        let data = serde_json::to_string_pretty(self).map_err(|e| GardenerError::Serialization(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load a model from a JSON file written by [`GraphModel::save_json`].
    ///
    /// # Errors
    /// Returns `GardenerError::Io` if reading fails and `GardenerError::Serialization`
    /// if the JSON is invalid.
    pub fn load_json(path: &Path) -> Result<Self, GardenerError> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| GardenerError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn add_node_is_idempotent() {
        let g = DependencyGraph::new();
        let a1 = g.add_node(Path::new("/p/a.c"), Some("c"));
        let b = g.add_node(Path::new("/p/b.h"), Some("c"));
        let a2 = g.add_node(Path::new("/p/a.c"), Some("c"));
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn edges_are_not_deduplicated() {
        let g = DependencyGraph::new();
        let a = g.add_node(Path::new("/p/a.c"), Some("c"));
        let b = g.add_node(Path::new("/p/b.h"), Some("c"));
        g.add_edge(a, EdgeTarget::Node(b), 3, IncludeStyle::Quoted, "b.h");
        g.add_edge(a, EdgeTarget::Node(b), 9, IncludeStyle::Quoted, "b.h");
        let model = g.into_model();
        let lines: Vec<_> = model.edges.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 9]);
    }

    #[test]
    fn unresolved_targets_share_one_node_per_token() {
        let g = DependencyGraph::new();
        let a = g.add_node(Path::new("/p/a.c"), Some("c"));
        let b = g.add_node(Path::new("/p/b.c"), Some("c"));
        g.add_edge(a, EdgeTarget::Unresolved("missing.h".into()), 1, IncludeStyle::Quoted, "missing.h");
        g.add_edge(b, EdgeTarget::Unresolved("missing.h".into()), 1, IncludeStyle::Quoted, "missing.h");
        let model = g.into_model();
        assert_eq!(model.nodes.len(), 3);
        let missing = model.find_unresolved("missing.h").expect("unresolved node");
        assert_eq!(missing.kind, NodeKind::Unresolved);
        assert!(missing.path.is_none());
        assert_eq!(model.unresolved_edge_count(), 2);
    }

    #[test]
    fn foreign_node_ids_are_dropped() {
        let g = DependencyGraph::new();
        let a = g.add_node(Path::new("/p/a.c"), Some("c"));
        g.add_edge(a, EdgeTarget::Node(NodeId(7)), 1, IncludeStyle::Quoted, "b.h");
        g.add_edge(NodeId(7), EdgeTarget::Node(a), 2, IncludeStyle::Quoted, "a.c");
        g.add_edge(NodeId(7), EdgeTarget::Unresolved("x.h".into()), 3, IncludeStyle::Quoted, "x.h");
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.node_count(), 1);
        assert_eq!(a.index(), 0);

        let model = g.into_model();
        assert_eq!(model.nodes.len(), 1);
        assert!(model.edges.is_empty());
    }

    #[test]
    fn self_edges_and_cycles_are_kept() {
        let g = DependencyGraph::new();
        let a = g.add_node(Path::new("/p/a.c"), Some("c"));
        let b = g.add_node(Path::new("/p/b.c"), Some("c"));
        g.add_edge(a, EdgeTarget::Node(a), 1, IncludeStyle::Quoted, "a.c");
        g.add_edge(a, EdgeTarget::Node(b), 2, IncludeStyle::Quoted, "b.c");
        g.add_edge(b, EdgeTarget::Node(a), 1, IncludeStyle::Quoted, "a.c");
        assert_eq!(g.edge_count(), 3);
        let model = g.model();
        let a_id = model.find_file(Path::new("/p/a.c")).unwrap().id;
        let b_id = model.find_file(Path::new("/p/b.c")).unwrap().id;
        assert!(model.edges.iter().any(|e| e.source == a_id && e.target == a_id));
        assert!(model.edges.iter().any(|e| e.source == a_id && e.target == b_id));
        assert!(model.edges.iter().any(|e| e.source == b_id && e.target == a_id));
    }

    #[test]
    fn model_is_independent_of_insertion_order() {
        let build = |paths: &[&str]| {
            let g = DependencyGraph::new();
            for p in paths {
                let outcome = FileOutcome {
                    path: PathBuf::from(p),
                    language: Some("c".into()),
                    edges: vec![
                        PendingEdge {
                            target: PendingTarget::File { path: PathBuf::from("/p/common.h"), language: Some("c".into()) },
                            line: 1,
                            style: IncludeStyle::Quoted,
                            token: "common.h".into(),
                        },
                        PendingEdge { target: PendingTarget::Unresolved, line: 2, style: IncludeStyle::Angle, token: "stdio.h".into() },
                    ],
                };
                g.insert_outcome(outcome);
            }
            g.into_model()
        };
        let forward = build(&["/p/a.c", "/p/b.c", "/p/c.c"]);
        let backward = build(&["/p/c.c", "/p/b.c", "/p/a.c"]);
        assert_eq!(forward, backward);
        assert_eq!(forward.nodes.len(), 5);
        assert_eq!(forward.edges.len(), 6);
        assert!(forward.find_file(Path::new("/p/a.c")).unwrap().scanned);
        assert!(!forward.find_file(Path::new("/p/common.h")).unwrap().scanned);
    }

    #[test]
    fn concurrent_inserts_lose_nothing() {
        let g = Arc::new(DependencyGraph::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let g = Arc::clone(&g);
                std::thread::spawn(move || {
                    let shared = g.add_node(Path::new("/p/shared.h"), Some("c"));
                    for i in 0..100 {
                        let src = g.add_node(&PathBuf::from(format!("/p/t{t}_{i}.c")), Some("c"));
                        g.mark_scanned(src);
                        g.add_edge(src, EdgeTarget::Node(shared), i + 1, IncludeStyle::Quoted, "shared.h");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(g.node_count(), 801);
        assert_eq!(g.edge_count(), 800);
    }

    #[test]
    fn json_round_trip_preserves_cycle() {
        let g = DependencyGraph::new();
        let a = g.add_node(Path::new("/p/a.c"), Some("c"));
        let b = g.add_node(Path::new("/p/b.c"), Some("c"));
        g.add_edge(a, EdgeTarget::Node(b), 1, IncludeStyle::Quoted, "b.c");
        g.add_edge(b, EdgeTarget::Node(a), 1, IncludeStyle::Quoted, "a.c");
        let model = g.into_model();

        let td = tempfile::tempdir().unwrap();
        let out = td.path().join("graph.json");
        model.save_json(&out).unwrap();
        let loaded = GraphModel::load_json(&out).unwrap();
        assert_eq!(loaded, model);
    }
}
