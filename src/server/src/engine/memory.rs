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

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use log::debug;

use super::*;

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// An ordered in-memory engine, the contents are lost once closed.
pub struct MemoryEngine {
    name: String,
    tree: RwLock<Option<Tree>>,
}

impl MemoryEngine {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryEngine { name: name.into(), tree: RwLock::new(Some(Tree::new())) }
    }

    fn with_tree<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tree) -> T,
    {
        let tree = self.tree.read().expect("Poisoned");
        match tree.as_ref() {
            Some(tree) => Ok(f(tree)),
            None => Err(Error::EngineClosed(self.name.clone())),
        }
    }

    fn with_tree_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tree) -> T,
    {
        let mut tree = self.tree.write().expect("Poisoned");
        match tree.as_mut() {
            Some(tree) => Ok(f(tree)),
            None => Err(Error::EngineClosed(self.name.clone())),
        }
    }
}

impl StorageEngine for MemoryEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordered(self: Arc<Self>) -> Option<Arc<dyn OrderedKeyValueDb>> {
        Some(self)
    }

    fn getter(self: Arc<Self>) -> Option<Arc<dyn KeyValueGetter>> {
        Some(self)
    }

    fn setter(self: Arc<Self>) -> Option<Arc<dyn KeyValueSetter>> {
        Some(self)
    }

    fn close(&self) -> Result<()> {
        if let Some(tree) = self.tree.write().expect("Poisoned").take() {
            debug!("memory engine {} is closed with {} keys", self.name, tree.len());
        }
        Ok(())
    }
}

impl KeyValueGetter for MemoryEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_tree(|tree| tree.get(key).cloned())
    }
}

impl KeyValueSetter for MemoryEngine {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_tree_mut(|tree| {
            tree.insert(key.to_owned(), value.to_owned());
        })
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.with_tree_mut(|tree| {
            tree.remove(key);
        })
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.with_tree_mut(|tree| {
            for op in batch {
                match op {
                    WriteOp::Put { key, value } => {
                        tree.insert(key, value);
                    }
                    WriteOp::Delete { key } => {
                        tree.remove(&key);
                    }
                }
            }
        })
    }
}

impl OrderedKeyValueDb for MemoryEngine {
    fn scan(
        &self,
        begin: &[u8],
        end: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<()> {
        if !end.is_empty() && end <= begin {
            return Ok(());
        }
        self.with_tree(|tree| {
            let upper = if end.is_empty() { Bound::Unbounded } else { Bound::Excluded(end) };
            for (key, value) in tree.range::<[u8], _>((Bound::Included(begin), upper)) {
                if !visit(key, value) {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Arc<MemoryEngine> {
        let engine = Arc::new(MemoryEngine::new("test"));
        for i in 0u8..10 {
            engine.put(&[i], &[i * 2]).unwrap();
        }
        engine
    }

    #[test]
    fn scan_half_open_range() {
        let engine = engine();
        let mut keys = Vec::new();
        engine
            .scan(&[3], &[6], &mut |key, value| {
                assert_eq!(value[0], key[0] * 2);
                keys.push(key[0]);
                true
            })
            .unwrap();
        assert_eq!(keys, vec![3, 4, 5]);

        keys.clear();
        engine
            .scan(&[7], &[], &mut |key, _| {
                keys.push(key[0]);
                true
            })
            .unwrap();
        assert_eq!(keys, vec![7, 8, 9]);

        let mut visited = 0;
        engine.scan(&[6], &[3], &mut |_, _| {
            visited += 1;
            true
        })
        .unwrap();
        assert_eq!(visited, 0);
    }

    #[test]
    fn scan_stops_early() {
        let engine = engine();
        let mut visited = 0;
        engine
            .scan(&[], &[], &mut |_, _| {
                visited += 1;
                visited < 4
            })
            .unwrap();
        assert_eq!(visited, 4);
    }

    #[test]
    fn batch_and_delete() {
        let engine = engine();
        let mut batch = WriteBatch::default();
        batch.put(vec![20], vec![1]);
        batch.delete(vec![0]);
        batch.put(vec![21], vec![2]);
        batch.delete(vec![21]);
        engine.write(batch).unwrap();
        assert_eq!(engine.get(&[20]).unwrap(), Some(vec![1]));
        assert_eq!(engine.get(&[0]).unwrap(), None);
        assert_eq!(engine.get(&[21]).unwrap(), None);

        engine.delete(&[20]).unwrap();
        assert_eq!(engine.get(&[20]).unwrap(), None);
    }

    #[test]
    fn closed_engine_rejects_requests() {
        let engine = engine();
        engine.close().unwrap();
        engine.close().unwrap();
        assert!(matches!(engine.get(&[1]), Err(Error::EngineClosed(_))));
        assert!(matches!(engine.put(&[1], &[1]), Err(Error::EngineClosed(_))));
        assert!(matches!(engine.scan(&[], &[], &mut |_, _| true), Err(Error::EngineClosed(_))));
    }
}
