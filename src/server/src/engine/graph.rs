// Copyright 2026 The Voxdag Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A labeled graph over a key-value engine.
//!
//! Keys of a graph live in the data context of the graph instance, under the
//! [`KeyType::GraphVertex`] and [`KeyType::GraphEdge`] indices. An edge is
//! written for both `(a, b)` and `(b, a)` so the edges of a vertex are one
//! prefix scan.
//!
//! Values are JSON.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use voxdag_rock::lexical::prefix_range;
use voxdag_schema::keys::{graph_edge_index, graph_edge_prefix, graph_vertex_index};
use voxdag_schema::{DataContext, KeyType};

use super::*;

pub type VertexId = u64;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub weight: f64,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

/// An undirected edge, `from` is the smaller vertex id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: f64,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

pub trait GraphGetter: Send + Sync {
    fn get_vertex(&self, ctx: &DataContext, id: VertexId) -> Result<Option<Vertex>>;

    fn get_edge(&self, ctx: &DataContext, a: VertexId, b: VertexId) -> Result<Option<Edge>>;

    fn get_vertices(&self, ctx: &DataContext) -> Result<Vec<Vertex>>;

    /// The edges incident to a vertex.
    fn get_edges(&self, ctx: &DataContext, id: VertexId) -> Result<Vec<Edge>>;
}

pub trait GraphSetter: Send + Sync {
    /// Add or reweight a vertex, the properties are kept.
    fn add_vertex(&self, ctx: &DataContext, id: VertexId, weight: f64) -> Result<()>;

    /// Add or reweight an edge, both vertices must exist.
    fn add_edge(&self, ctx: &DataContext, a: VertexId, b: VertexId, weight: f64) -> Result<()>;

    fn set_vertex_property(
        &self,
        ctx: &DataContext,
        id: VertexId,
        name: &str,
        value: Value,
    ) -> Result<()>;

    fn set_edge_property(
        &self,
        ctx: &DataContext,
        a: VertexId,
        b: VertexId,
        name: &str,
        value: Value,
    ) -> Result<()>;

    /// Remove a vertex and its edges, returns whether it existed.
    fn remove_vertex(&self, ctx: &DataContext, id: VertexId) -> Result<bool>;

    /// Returns whether the edge existed.
    fn remove_edge(&self, ctx: &DataContext, a: VertexId, b: VertexId) -> Result<bool>;

    /// Remove every vertex and edge of the graph.
    fn remove_graph(&self, ctx: &DataContext) -> Result<()>;
}

#[inline]
fn vertex_key(ctx: &DataContext, id: VertexId) -> Vec<u8> {
    ctx.construct_key(&graph_vertex_index(id))
}

#[inline]
fn edge_prefix(ctx: &DataContext, id: VertexId) -> Vec<u8> {
    ctx.construct_key(&graph_edge_prefix(id))
}

#[inline]
fn edge_key(ctx: &DataContext, a: VertexId, b: VertexId) -> Vec<u8> {
    ctx.construct_key(&graph_edge_index(a, b))
}

/// A graph engine storing vertices and edges in a key-value engine.
pub struct KvGraphStore {
    kv: KeyValueEngine,
    /// Serializes read-modify-write updates.
    update_lock: Mutex<()>,
}

impl KvGraphStore {
    pub fn new(kv: KeyValueEngine) -> Self {
        KvGraphStore { kv, update_lock: Mutex::new(()) }
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.kv.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn write_edge(&self, ctx: &DataContext, edge: &Edge) -> Result<()> {
        let value = serde_json::to_vec(edge)?;
        let mut batch = WriteBatch::default();
        batch.put(edge_key(ctx, edge.from, edge.to), value.clone());
        batch.put(edge_key(ctx, edge.to, edge.from), value);
        self.kv.write(batch)
    }

    fn must_exist(&self, ctx: &DataContext, id: VertexId) -> Result<()> {
        match self.kv.get(&vertex_key(ctx, id))? {
            Some(_) => Ok(()),
            None => Err(Error::InvalidArgument(format!("vertex {id} not found"))),
        }
    }
}

impl GraphEngine for KvGraphStore {
    fn graph_db(self: Arc<Self>) -> Option<Arc<dyn GraphDb>> {
        Some(self)
    }

    fn graph_getter(self: Arc<Self>) -> Option<Arc<dyn GraphGetter>> {
        Some(self)
    }

    fn graph_setter(self: Arc<Self>) -> Option<Arc<dyn GraphSetter>> {
        Some(self)
    }
}

impl GraphDb for KvGraphStore {
    fn name(&self) -> &str {
        self.kv.name()
    }

    fn close(&self) -> Result<()> {
        // The key-value engine is closed by its owner.
        Ok(())
    }
}

impl GraphGetter for KvGraphStore {
    fn get_vertex(&self, ctx: &DataContext, id: VertexId) -> Result<Option<Vertex>> {
        self.read(&vertex_key(ctx, id))
    }

    fn get_edge(&self, ctx: &DataContext, a: VertexId, b: VertexId) -> Result<Option<Edge>> {
        self.read(&edge_key(ctx, a, b))
    }

    fn get_vertices(&self, ctx: &DataContext) -> Result<Vec<Vertex>> {
        let (begin, end) = ctx.key_type_range(KeyType::GraphVertex);
        self.kv
            .range(&begin, &end)?
            .into_iter()
            .map(|(_, value)| Ok(serde_json::from_slice(&value)?))
            .collect()
    }

    fn get_edges(&self, ctx: &DataContext, id: VertexId) -> Result<Vec<Edge>> {
        let (begin, end) = prefix_range(&edge_prefix(ctx, id));
        self.kv
            .range(&begin, &end)?
            .into_iter()
            .map(|(_, value)| Ok(serde_json::from_slice(&value)?))
            .collect()
    }
}

impl GraphSetter for KvGraphStore {
    fn add_vertex(&self, ctx: &DataContext, id: VertexId, weight: f64) -> Result<()> {
        let _guard = self.update_lock.lock().expect("Poisoned");
        let key = vertex_key(ctx, id);
        let mut vertex = self.read::<Vertex>(&key)?.unwrap_or(Vertex { id, ..Default::default() });
        vertex.weight = weight;
        self.kv.put(&key, &serde_json::to_vec(&vertex)?)
    }

    fn add_edge(&self, ctx: &DataContext, a: VertexId, b: VertexId, weight: f64) -> Result<()> {
        let _guard = self.update_lock.lock().expect("Poisoned");
        self.must_exist(ctx, a)?;
        self.must_exist(ctx, b)?;
        let mut edge = self.read::<Edge>(&edge_key(ctx, a, b))?.unwrap_or(Edge {
            from: a.min(b),
            to: a.max(b),
            ..Default::default()
        });
        edge.weight = weight;
        self.write_edge(ctx, &edge)
    }

    fn set_vertex_property(
        &self,
        ctx: &DataContext,
        id: VertexId,
        name: &str,
        value: Value,
    ) -> Result<()> {
        let _guard = self.update_lock.lock().expect("Poisoned");
        let key = vertex_key(ctx, id);
        let mut vertex = self
            .read::<Vertex>(&key)?
            .ok_or_else(|| Error::InvalidArgument(format!("vertex {id} not found")))?;
        vertex.properties.insert(name.to_owned(), value);
        self.kv.put(&key, &serde_json::to_vec(&vertex)?)
    }

    fn set_edge_property(
        &self,
        ctx: &DataContext,
        a: VertexId,
        b: VertexId,
        name: &str,
        value: Value,
    ) -> Result<()> {
        let _guard = self.update_lock.lock().expect("Poisoned");
        let mut edge = self
            .read::<Edge>(&edge_key(ctx, a, b))?
            .ok_or_else(|| Error::InvalidArgument(format!("edge ({a}, {b}) not found")))?;
        edge.properties.insert(name.to_owned(), value);
        self.write_edge(ctx, &edge)
    }

    fn remove_vertex(&self, ctx: &DataContext, id: VertexId) -> Result<bool> {
        let _guard = self.update_lock.lock().expect("Poisoned");
        let key = vertex_key(ctx, id);
        if self.kv.get(&key)?.is_none() {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        let (begin, end) = prefix_range(&edge_prefix(ctx, id));
        for (_, value) in self.kv.range(&begin, &end)? {
            let edge: Edge = serde_json::from_slice(&value)?;
            batch.delete(edge_key(ctx, edge.from, edge.to));
            batch.delete(edge_key(ctx, edge.to, edge.from));
        }
        batch.delete(key);
        self.kv.write(batch)?;
        Ok(true)
    }

    fn remove_edge(&self, ctx: &DataContext, a: VertexId, b: VertexId) -> Result<bool> {
        let _guard = self.update_lock.lock().expect("Poisoned");
        let key = edge_key(ctx, a, b);
        if self.kv.get(&key)?.is_none() {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        batch.delete(key);
        batch.delete(edge_key(ctx, b, a));
        self.kv.write(batch)?;
        Ok(true)
    }

    fn remove_graph(&self, ctx: &DataContext) -> Result<()> {
        let _guard = self.update_lock.lock().expect("Poisoned");
        for key_type in [KeyType::GraphVertex, KeyType::GraphEdge] {
            let (begin, end) = ctx.key_type_range(key_type);
            self.kv.delete_range(&begin, &end)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use voxdag_schema::{InstanceId, VersionId};

    use super::*;

    fn store() -> KvGraphStore {
        let engine = KeyValueEngine::probe(Arc::new(MemoryEngine::new("graph"))).unwrap();
        KvGraphStore::new(engine)
    }

    #[test]
    fn vertices_and_edges() {
        let graph = store();
        let ctx = DataContext::new(InstanceId(1), VersionId(1));
        for id in 1..=3 {
            graph.add_vertex(&ctx, id, id as f64).unwrap();
        }
        graph.add_edge(&ctx, 2, 1, 0.5).unwrap();
        graph.add_edge(&ctx, 2, 3, 1.5).unwrap();

        let edge = graph.get_edge(&ctx, 1, 2).unwrap().unwrap();
        assert_eq!((edge.from, edge.to, edge.weight), (1, 2, 0.5));
        assert_eq!(graph.get_edge(&ctx, 2, 1).unwrap(), Some(edge));
        assert_eq!(graph.get_edges(&ctx, 2).unwrap().len(), 2);
        assert_eq!(graph.get_edges(&ctx, 3).unwrap().len(), 1);
        assert_eq!(graph.get_vertices(&ctx).unwrap().len(), 3);

        let err = graph.add_edge(&ctx, 1, 9, 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn properties_survive_reweight() {
        let graph = store();
        let ctx = DataContext::new(InstanceId(1), VersionId(1));
        graph.add_vertex(&ctx, 7, 1.0).unwrap();
        graph.set_vertex_property(&ctx, 7, "name", json!("soma")).unwrap();
        graph.add_vertex(&ctx, 7, 2.0).unwrap();

        let vertex = graph.get_vertex(&ctx, 7).unwrap().unwrap();
        assert_eq!(vertex.weight, 2.0);
        assert_eq!(vertex.properties["name"], json!("soma"));

        graph.add_vertex(&ctx, 8, 1.0).unwrap();
        graph.add_edge(&ctx, 7, 8, 1.0).unwrap();
        graph.set_edge_property(&ctx, 8, 7, "kind", json!("synapse")).unwrap();
        let edge = graph.get_edge(&ctx, 7, 8).unwrap().unwrap();
        assert_eq!(edge.properties["kind"], json!("synapse"));
        assert!(graph.set_vertex_property(&ctx, 99, "name", json!(1)).is_err());
    }

    #[test]
    fn remove_vertex_drops_edges() {
        let graph = store();
        let ctx = DataContext::new(InstanceId(1), VersionId(1));
        for id in 1..=3 {
            graph.add_vertex(&ctx, id, 1.0).unwrap();
        }
        graph.add_edge(&ctx, 1, 2, 1.0).unwrap();
        graph.add_edge(&ctx, 1, 3, 1.0).unwrap();

        assert!(graph.remove_vertex(&ctx, 1).unwrap());
        assert!(!graph.remove_vertex(&ctx, 1).unwrap());
        assert!(graph.get_edges(&ctx, 2).unwrap().is_empty());
        assert!(graph.get_edges(&ctx, 3).unwrap().is_empty());

        graph.add_edge(&ctx, 2, 3, 1.0).unwrap();
        assert!(graph.remove_edge(&ctx, 3, 2).unwrap());
        assert!(!graph.remove_edge(&ctx, 2, 3).unwrap());
    }

    #[test]
    fn graphs_are_isolated_by_context() {
        let graph = store();
        let v1 = DataContext::new(InstanceId(1), VersionId(1));
        let v2 = DataContext::new(InstanceId(1), VersionId(2));
        graph.add_vertex(&v1, 1, 1.0).unwrap();
        graph.add_vertex(&v2, 2, 1.0).unwrap();
        assert!(graph.get_vertex(&v1, 2).unwrap().is_none());

        graph.remove_graph(&v1).unwrap();
        assert!(graph.get_vertices(&v1).unwrap().is_empty());
        assert_eq!(graph.get_vertices(&v2).unwrap().len(), 1);
    }
}
