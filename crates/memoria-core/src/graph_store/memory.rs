//! In-memory graph store
//!
//! Two `RwLock`-guarded maps — nodes by id, edges by id — plus per-node
//! adjacency lists kept in sync on every mutation. Traversal is a plain BFS
//! over the adjacency lists, matching the `RwLock<HashMap<...>>` style used
//! throughout the rest of the crate's in-memory components.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use uuid::Uuid;

use super::{Direction, Edge, GraphQuery, GraphRow, GraphStore, GraphStoreError, NeighborMatch, Node};

struct Inner {
    nodes: HashMap<String, Node>,
    edges: HashMap<String, Edge>,
    /// node id -> edge ids leaving it
    out_edges: HashMap<String, Vec<String>>,
    /// node id -> edge ids entering it
    in_edges: HashMap<String, Vec<String>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            out_edges: HashMap::new(),
            in_edges: HashMap::new(),
        }
    }

    fn edges_for(&self, id: &str, edge_type: Option<&str>, direction: Direction) -> Vec<&Edge> {
        let mut ids: Vec<&String> = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            if let Some(v) = self.out_edges.get(id) {
                ids.extend(v.iter());
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            if let Some(v) = self.in_edges.get(id) {
                ids.extend(v.iter());
            }
        }
        ids.into_iter()
            .filter_map(|eid| self.edges.get(eid))
            .filter(|e| edge_type.is_none_or(|t| e.edge_type == t))
            .collect()
    }

    fn other_end(edge: &Edge, from: &str) -> String {
        if edge.from_id == from {
            edge.to_id.clone()
        } else {
            edge.from_id.clone()
        }
    }
}

/// In-memory, `RwLock`-guarded `GraphStore` implementation.
pub struct InMemoryGraphStore {
    inner: RwLock<Inner>,
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraphStore {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }
}

impl GraphStore for InMemoryGraphStore {
    fn upsert_node(
        &self,
        label: &str,
        id: Option<&str>,
        properties: serde_json::Value,
    ) -> Result<String, GraphStoreError> {
        let mut inner = self.inner.write().expect("graph store lock poisoned");

        if let Some(id) = id {
            if let Some(existing) = inner.nodes.get_mut(id) {
                existing.properties = properties;
                existing.label = label.to_string();
                return Ok(id.to_string());
            }
            let node = Node {
                id: id.to_string(),
                label: label.to_string(),
                properties,
                vector_id: None,
            };
            inner.nodes.insert(id.to_string(), node);
            inner.out_edges.entry(id.to_string()).or_default();
            inner.in_edges.entry(id.to_string()).or_default();
            return Ok(id.to_string());
        }

        let new_id = Uuid::new_v4().to_string();
        let node = Node {
            id: new_id.clone(),
            label: label.to_string(),
            properties,
            vector_id: None,
        };
        inner.nodes.insert(new_id.clone(), node);
        inner.out_edges.entry(new_id.clone()).or_default();
        inner.in_edges.entry(new_id.clone()).or_default();
        Ok(new_id)
    }

    fn upsert_edge(
        &self,
        from_id: &str,
        to_id: &str,
        edge_type: &str,
        properties: Option<serde_json::Value>,
    ) -> Result<String, GraphStoreError> {
        let mut inner = self.inner.write().expect("graph store lock poisoned");

        if !inner.nodes.contains_key(from_id) {
            return Err(GraphStoreError::EndpointMissing(from_id.to_string()));
        }
        if !inner.nodes.contains_key(to_id) {
            return Err(GraphStoreError::EndpointMissing(to_id.to_string()));
        }

        let existing_id = inner
            .out_edges
            .get(from_id)
            .into_iter()
            .flatten()
            .find(|eid| {
                inner
                    .edges
                    .get(*eid)
                    .is_some_and(|e| e.to_id == to_id && e.edge_type == edge_type)
            })
            .cloned();

        if let Some(eid) = existing_id {
            let edge = inner.edges.get_mut(&eid).expect("edge index out of sync");
            edge.properties = properties.unwrap_or(serde_json::json!({}));
            return Ok(eid);
        }

        let new_id = Uuid::new_v4().to_string();
        let edge = Edge {
            id: new_id.clone(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            edge_type: edge_type.to_string(),
            properties: properties.unwrap_or(serde_json::json!({})),
        };
        inner.edges.insert(new_id.clone(), edge);
        inner
            .out_edges
            .entry(from_id.to_string())
            .or_default()
            .push(new_id.clone());
        inner
            .in_edges
            .entry(to_id.to_string())
            .or_default()
            .push(new_id.clone());
        Ok(new_id)
    }

    fn get_node(&self, id: &str) -> Result<Node, GraphStoreError> {
        let inner = self.inner.read().expect("graph store lock poisoned");
        inner
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| GraphStoreError::NotFound(id.to_string()))
    }

    fn delete_node(&self, id: &str) -> Result<(), GraphStoreError> {
        let mut inner = self.inner.write().expect("graph store lock poisoned");
        inner.nodes.remove(id);

        let touching: Vec<String> = inner
            .out_edges
            .get(id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .chain(inner.in_edges.get(id).cloned().unwrap_or_default())
            .collect();

        for eid in &touching {
            if let Some(edge) = inner.edges.remove(eid) {
                if let Some(v) = inner.out_edges.get_mut(&edge.from_id) {
                    v.retain(|e| e != eid);
                }
                if let Some(v) = inner.in_edges.get_mut(&edge.to_id) {
                    v.retain(|e| e != eid);
                }
            }
        }
        inner.out_edges.remove(id);
        inner.in_edges.remove(id);
        Ok(())
    }

    fn set_vector_id(&self, id: &str, vector_id: Option<&str>) -> Result<(), GraphStoreError> {
        let mut inner = self.inner.write().expect("graph store lock poisoned");
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphStoreError::NotFound(id.to_string()))?;
        node.vector_id = vector_id.map(|s| s.to_string());
        Ok(())
    }

    fn neighbors(
        &self,
        id: &str,
        edge_type: Option<&str>,
        direction: Direction,
        max_depth: usize,
    ) -> Result<Vec<NeighborMatch>, GraphStoreError> {
        let inner = self.inner.read().expect("graph store lock poisoned");
        if !inner.nodes.contains_key(id) {
            return Err(GraphStoreError::NotFound(id.to_string()));
        }

        let mut visited: HashSet<String> = HashSet::from([id.to_string()]);
        let mut queue: VecDeque<(String, usize, Vec<Edge>)> = VecDeque::from([(id.to_string(), 0, Vec::new())]);
        let mut out = Vec::new();

        while let Some((current, depth, path)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge in inner.edges_for(&current, edge_type, direction) {
                let next = Inner::other_end(edge, &current);
                if visited.contains(&next) {
                    continue;
                }
                visited.insert(next.clone());
                let mut next_path = path.clone();
                next_path.push(edge.clone());
                if let Some(node) = inner.nodes.get(&next) {
                    out.push(NeighborMatch {
                        node: node.clone(),
                        path: next_path.clone(),
                    });
                }
                queue.push_back((next, depth + 1, next_path));
            }
        }
        Ok(out)
    }

    fn query(&self, query: &GraphQuery) -> Result<Vec<GraphRow>, GraphStoreError> {
        let inner = self.inner.read().expect("graph store lock poisoned");

        match query {
            GraphQuery::FindByProperty { label, key, value } => {
                let rows = inner
                    .nodes
                    .values()
                    .filter(|n| label.as_deref().is_none_or(|l| n.label == l))
                    .filter(|n| n.properties.get(key).is_some_and(|v| v == value))
                    .map(|n| GraphRow {
                        node: n.clone(),
                        path: Vec::new(),
                    })
                    .collect();
                Ok(rows)
            }
            GraphQuery::Traverse {
                start,
                edge_type,
                direction,
                max_depth,
            } => {
                drop(inner);
                let matches = self.neighbors(start, edge_type.as_deref(), *direction, *max_depth)?;
                Ok(matches
                    .into_iter()
                    .map(|m| GraphRow {
                        node: m.node,
                        path: m.path,
                    })
                    .collect())
            }
            GraphQuery::ShortestPath { from, to } => {
                if !inner.nodes.contains_key(from) {
                    return Err(GraphStoreError::NotFound(from.clone()));
                }
                if !inner.nodes.contains_key(to) {
                    return Err(GraphStoreError::NotFound(to.clone()));
                }
                if from == to {
                    let node = inner.nodes.get(from).expect("checked above").clone();
                    return Ok(vec![GraphRow { node, path: Vec::new() }]);
                }

                let mut visited: HashSet<String> = HashSet::from([from.clone()]);
                let mut queue: VecDeque<(String, Vec<Edge>)> = VecDeque::from([(from.clone(), Vec::new())]);

                while let Some((current, path)) = queue.pop_front() {
                    for edge in inner.edges_for(&current, None, Direction::Both) {
                        let next = Inner::other_end(edge, &current);
                        if visited.contains(&next) {
                            continue;
                        }
                        let mut next_path = path.clone();
                        next_path.push(edge.clone());
                        if next == *to {
                            let node = inner.nodes.get(&next).expect("endpoint exists").clone();
                            return Ok(vec![GraphRow {
                                node,
                                path: next_path,
                            }]);
                        }
                        visited.insert(next.clone());
                        queue.push_back((next, next_path));
                    }
                }
                Ok(Vec::new())
            }
        }
    }

    fn node_count(&self) -> usize {
        self.inner.read().expect("graph store lock poisoned").nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.inner.read().expect("graph store lock poisoned").edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upsert_node_creates_and_updates() {
        let store = InMemoryGraphStore::new();
        let id = store.upsert_node("Function", None, json!({"name": "foo"})).unwrap();
        let node = store.get_node(&id).unwrap();
        assert_eq!(node.label, "Function");

        store.upsert_node("Function", Some(&id), json!({"name": "bar"})).unwrap();
        let updated = store.get_node(&id).unwrap();
        assert_eq!(updated.properties["name"], "bar");
    }

    #[test]
    fn upsert_edge_requires_both_endpoints() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node("Function", None, json!({})).unwrap();
        let err = store.upsert_edge(&a, "missing", "CALLS", None);
        assert!(matches!(err, Err(GraphStoreError::EndpointMissing(_))));
    }

    #[test]
    fn upsert_edge_is_idempotent_by_type() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node("Function", None, json!({})).unwrap();
        let b = store.upsert_node("Function", None, json!({})).unwrap();

        let e1 = store.upsert_edge(&a, &b, "CALLS", Some(json!({"count": 1}))).unwrap();
        let e2 = store.upsert_edge(&a, &b, "CALLS", Some(json!({"count": 2}))).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn delete_node_removes_touching_edges() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node("Function", None, json!({})).unwrap();
        let b = store.upsert_node("Function", None, json!({})).unwrap();
        store.upsert_edge(&a, &b, "CALLS", None).unwrap();

        store.delete_node(&a).unwrap();
        assert!(store.get_node(&a).is_err());
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn neighbors_respects_direction_and_depth() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node("Function", None, json!({})).unwrap();
        let b = store.upsert_node("Function", None, json!({})).unwrap();
        let c = store.upsert_node("Function", None, json!({})).unwrap();
        store.upsert_edge(&a, &b, "CALLS", None).unwrap();
        store.upsert_edge(&b, &c, "CALLS", None).unwrap();

        let one_hop = store.neighbors(&a, None, Direction::Out, 1).unwrap();
        assert_eq!(one_hop.len(), 1);
        assert_eq!(one_hop[0].node.id, b);

        let two_hop = store.neighbors(&a, None, Direction::Out, 2).unwrap();
        let ids: Vec<_> = two_hop.iter().map(|m| m.node.id.clone()).collect();
        assert!(ids.contains(&c));

        let reversed = store.neighbors(&c, None, Direction::In, 2).unwrap();
        let ids: Vec<_> = reversed.iter().map(|m| m.node.id.clone()).collect();
        assert!(ids.contains(&a));
    }

    #[test]
    fn query_find_by_property() {
        let store = InMemoryGraphStore::new();
        store.upsert_node("Bug", None, json!({"status": "open"})).unwrap();
        store.upsert_node("Bug", None, json!({"status": "closed"})).unwrap();

        let rows = store
            .query(&GraphQuery::FindByProperty {
                label: Some("Bug".to_string()),
                key: "status".to_string(),
                value: json!("open"),
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn query_shortest_path_finds_minimal_route() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node("Function", None, json!({})).unwrap();
        let b = store.upsert_node("Function", None, json!({})).unwrap();
        let c = store.upsert_node("Function", None, json!({})).unwrap();
        store.upsert_edge(&a, &b, "CALLS", None).unwrap();
        store.upsert_edge(&b, &c, "CALLS", None).unwrap();
        store.upsert_edge(&a, &c, "RELATED_TO", None).unwrap();

        let rows = store
            .query(&GraphQuery::ShortestPath { from: a.clone(), to: c.clone() })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path.len(), 1);
        assert_eq!(rows[0].path[0].edge_type, "RELATED_TO");
    }

    #[test]
    fn set_vector_id_links_node_to_vector_record() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node("Concept", None, json!({})).unwrap();
        store.set_vector_id(&a, Some("vec-123")).unwrap();
        assert_eq!(store.get_node(&a).unwrap().vector_id.as_deref(), Some("vec-123"));
    }
}
