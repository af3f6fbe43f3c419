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

//! Storage engines and their capabilities.
//!
//! An engine advertises what it can do through [`StorageEngine`] and
//! [`GraphEngine`], and setup turns every missing capability into
//! [`Error::MissingCapability`] before any tier is used.

mod graph;
mod memory;
#[cfg(feature = "rocksdb")]
mod options;
#[cfg(feature = "rocksdb")]
mod rocks;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
#[cfg(feature = "rocksdb")]
use voxdag_rock::fs::create_dir_all_if_not_exists;

pub use self::graph::{Edge, GraphGetter, GraphSetter, KvGraphStore, Vertex, VertexId};
pub use self::memory::MemoryEngine;
#[cfg(feature = "rocksdb")]
pub use self::rocks::RocksEngine;
use crate::tiers::TierKind;
use crate::{DbConfig, EngineConfig, EngineKind, Error, GraphKind, Result};

// The disk layouts.
const LAYOUT_DATA: &str = "db";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    OrderedKeyValueDb,
    KeyValueGetter,
    KeyValueSetter,
    GraphDb,
    GraphGetter,
    GraphSetter,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::OrderedKeyValueDb => "ordered key-value database",
            Capability::KeyValueGetter => "key-value getter",
            Capability::KeyValueSetter => "key-value setter",
            Capability::GraphDb => "graph database",
            Capability::GraphGetter => "graph getter",
            Capability::GraphSetter => "graph setter",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Writes applied atomically by one engine.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    #[inline]
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Put { key: key.into(), value: value.into() });
    }

    #[inline]
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Delete { key: key.into() });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

pub trait KeyValueGetter: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

pub trait KeyValueSetter: Send + Sync {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    fn write(&self, batch: WriteBatch) -> Result<()>;
}

pub trait OrderedKeyValueDb: Send + Sync {
    /// Visit the pairs of `[begin, end)` in ascending key order until `visit`
    /// returns `false`. An empty `end` is unbounded.
    ///
    /// The engine may be locked while visiting, so `visit` must not write
    /// into the same engine.
    fn scan(
        &self,
        begin: &[u8],
        end: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<()>;
}

/// A key-value storage engine, probed for its capabilities.
pub trait StorageEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Whether calls run native code, which shutdown can not interrupt.
    fn is_native(&self) -> bool {
        false
    }

    fn ordered(self: Arc<Self>) -> Option<Arc<dyn OrderedKeyValueDb>> {
        None
    }

    fn getter(self: Arc<Self>) -> Option<Arc<dyn KeyValueGetter>> {
        None
    }

    fn setter(self: Arc<Self>) -> Option<Arc<dyn KeyValueSetter>> {
        None
    }

    fn close(&self) -> Result<()>;
}

pub trait GraphDb: Send + Sync {
    fn name(&self) -> &str;

    fn close(&self) -> Result<()>;
}

/// A graph engine, probed for its capabilities.
pub trait GraphEngine: Send + Sync {
    fn graph_db(self: Arc<Self>) -> Option<Arc<dyn GraphDb>> {
        None
    }

    fn graph_getter(self: Arc<Self>) -> Option<Arc<dyn GraphGetter>> {
        None
    }

    fn graph_setter(self: Arc<Self>) -> Option<Arc<dyn GraphSetter>> {
        None
    }
}

/// A key-value engine with every capability probed.
#[derive(Clone)]
pub struct KeyValueEngine {
    engine: Arc<dyn StorageEngine>,
    ordered: Arc<dyn OrderedKeyValueDb>,
    getter: Arc<dyn KeyValueGetter>,
    setter: Arc<dyn KeyValueSetter>,
}

impl KeyValueEngine {
    pub fn probe(engine: Arc<dyn StorageEngine>) -> Result<Self> {
        let missing = |capability| Error::MissingCapability {
            engine: engine.name().to_owned(),
            capability,
        };
        let ordered = engine.clone().ordered().ok_or_else(|| missing(Capability::OrderedKeyValueDb))?;
        let getter = engine.clone().getter().ok_or_else(|| missing(Capability::KeyValueGetter))?;
        let setter = engine.clone().setter().ok_or_else(|| missing(Capability::KeyValueSetter))?;
        Ok(KeyValueEngine { engine, ordered, getter, setter })
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.engine.name()
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        self.engine.is_native()
    }

    #[inline]
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.getter.get(key)
    }

    #[inline]
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.setter.put(key, value)
    }

    #[inline]
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.setter.delete(key)
    }

    #[inline]
    pub fn write(&self, batch: WriteBatch) -> Result<()> {
        self.setter.write(batch)
    }

    #[inline]
    pub fn scan(
        &self,
        begin: &[u8],
        end: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<()> {
        self.ordered.scan(begin, end, visit)
    }

    /// Collect the pairs of `[begin, end)`.
    pub fn range(&self, begin: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut pairs = Vec::new();
        self.scan(begin, end, &mut |key, value| {
            pairs.push((key.to_owned(), value.to_owned()));
            true
        })?;
        Ok(pairs)
    }

    /// Collect the keys of `[begin, end)`.
    pub fn keys(&self, begin: &[u8], end: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        self.scan(begin, end, &mut |key, _| {
            keys.push(key.to_owned());
            true
        })?;
        Ok(keys)
    }

    /// Delete all keys of `[begin, end)` in one batch, returns the number of
    /// deleted keys.
    pub fn delete_range(&self, begin: &[u8], end: &[u8]) -> Result<usize> {
        let mut batch = WriteBatch::default();
        for key in self.keys(begin, end)? {
            batch.delete(key);
        }
        let deleted = batch.len();
        if deleted > 0 {
            self.write(batch)?;
        }
        Ok(deleted)
    }

    #[inline]
    pub fn close(&self) -> Result<()> {
        self.engine.close()
    }

    #[inline]
    pub fn same_engine(&self, other: &KeyValueEngine) -> bool {
        // Compare data pointers only, vtables of one type may differ.
        std::ptr::eq(
            Arc::as_ptr(&self.engine) as *const (),
            Arc::as_ptr(&other.engine) as *const (),
        )
    }
}

/// A graph engine with every capability probed.
#[derive(Clone)]
pub struct GraphHandle {
    db: Arc<dyn GraphDb>,
    getter: Arc<dyn GraphGetter>,
    setter: Arc<dyn GraphSetter>,
}

impl GraphHandle {
    pub fn probe(name: &str, engine: Arc<dyn GraphEngine>) -> Result<Self> {
        let missing =
            |capability| Error::MissingCapability { engine: name.to_owned(), capability };
        let db = engine.clone().graph_db().ok_or_else(|| missing(Capability::GraphDb))?;
        let getter = engine.clone().graph_getter().ok_or_else(|| missing(Capability::GraphGetter))?;
        let setter = engine.graph_setter().ok_or_else(|| missing(Capability::GraphSetter))?;
        Ok(GraphHandle { db, getter, setter })
    }

    #[inline]
    pub fn db(&self) -> &Arc<dyn GraphDb> {
        &self.db
    }

    #[inline]
    pub fn getter(&self) -> &Arc<dyn GraphGetter> {
        &self.getter
    }

    #[inline]
    pub fn setter(&self) -> &Arc<dyn GraphSetter> {
        &self.setter
    }
}

/// The engines of a datastore, every capability checked.
#[derive(Clone)]
pub struct Engines {
    default: KeyValueEngine,
    overrides: Vec<(TierKind, KeyValueEngine)>,
    graph: GraphHandle,
}

impl Engines {
    /// Open the configured engines under `root_dir`.
    pub fn setup(root_dir: &Path, cfg: &EngineConfig) -> Result<Self> {
        let default = open_engine(cfg.kind, &root_dir.join(LAYOUT_DATA), &cfg.db)?;
        let mut overrides = Vec::new();
        for tier in TierKind::ALL {
            if let Some(kind) = cfg.tier_override(tier) {
                let path = root_dir.join(format!("{LAYOUT_DATA}-{tier}"));
                overrides.push((tier, open_engine(kind, &path, &cfg.db)?));
            }
        }
        let graph = match cfg.graph {
            GraphKind::KeyValue => None,
        };
        Self::probe(default, overrides, graph)
    }

    /// Probe the capabilities of the given engines. Without a graph engine,
    /// a [`KvGraphStore`] over the metadata engine is used.
    pub fn probe(
        default: Arc<dyn StorageEngine>,
        overrides: Vec<(TierKind, Arc<dyn StorageEngine>)>,
        graph: Option<Arc<dyn GraphEngine>>,
    ) -> Result<Self> {
        let default = KeyValueEngine::probe(default)?;
        info!("default engine {}", default.name());
        let mut probed = Vec::with_capacity(overrides.len());
        for (tier, engine) in overrides {
            let engine = KeyValueEngine::probe(engine)?;
            info!("{tier} tier uses engine {}", engine.name());
            probed.push((tier, engine));
        }

        let graph = match graph {
            Some(graph) => GraphHandle::probe("graph", graph)?,
            None => {
                let kv = tier_engine(&default, &probed, TierKind::Metadata);
                let name = format!("{} graph", kv.name());
                GraphHandle::probe(&name, Arc::new(KvGraphStore::new(kv)))?
            }
        };
        Ok(Engines { default, overrides: probed, graph })
    }

    /// The engine serving a tier.
    #[inline]
    pub fn engine(&self, tier: TierKind) -> KeyValueEngine {
        tier_engine(&self.default, &self.overrides, tier)
    }

    #[inline]
    pub fn graph(&self) -> &GraphHandle {
        &self.graph
    }

    /// Close the graph and every distinct engine. All are closed even if
    /// some fail, the first error is returned.
    pub fn close(&self) -> Result<()> {
        let mut first_err = None;
        let mut record = |name: &str, result: Result<()>| {
            if let Err(err) = result {
                warn!("close engine {name}: {err}");
                first_err.get_or_insert(err);
            }
        };
        record(self.graph.db.name(), self.graph.db.close());

        let mut closed: Vec<&KeyValueEngine> = Vec::new();
        for engine in std::iter::once(&self.default).chain(self.overrides.iter().map(|(_, e)| e)) {
            if closed.iter().any(|e| e.same_engine(engine)) {
                continue;
            }
            record(engine.name(), engine.close());
            closed.push(engine);
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn tier_engine(
    default: &KeyValueEngine,
    overrides: &[(TierKind, KeyValueEngine)],
    tier: TierKind,
) -> KeyValueEngine {
    overrides
        .iter()
        .find(|(kind, _)| *kind == tier)
        .map(|(_, engine)| engine.clone())
        .unwrap_or_else(|| default.clone())
}

#[cfg_attr(not(feature = "rocksdb"), allow(unused_variables))]
fn open_engine(kind: EngineKind, path: &Path, db_cfg: &DbConfig) -> Result<Arc<dyn StorageEngine>> {
    match kind {
        EngineKind::Memory => Ok(Arc::new(MemoryEngine::new(path.display().to_string()))),
        #[cfg(feature = "rocksdb")]
        EngineKind::Rocksdb => {
            create_dir_all_if_not_exists(&path)?;
            Ok(Arc::new(RocksEngine::open(path, db_cfg)?))
        }
        #[cfg(feature = "rocksdb")]
        EngineKind::RocksdbReadOnly => Ok(Arc::new(RocksEngine::open_read_only(path, db_cfg)?)),
        #[cfg(not(feature = "rocksdb"))]
        EngineKind::Rocksdb | EngineKind::RocksdbReadOnly => Err(Error::InvalidArgument(format!(
            "engine {kind:?} of {} requires the rocksdb feature",
            path.display()
        ))),
    }
}
