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

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::info;
use rocksdb::{Direction, IteratorMode, ReadOptions, DB};

use super::options::to_rocksdb_options;
use super::*;

/// An on-disk engine. Once opened read-only it lacks the setter capability.
pub struct RocksEngine {
    name: String,
    path: PathBuf,
    read_only: bool,
    db: RwLock<Option<DB>>,
}

impl RocksEngine {
    pub fn open(path: &Path, cfg: &DbConfig) -> Result<Self> {
        let options = to_rocksdb_options(cfg);
        info!("open rocksdb {}", path.display());
        let db = DB::open(&options, path)?;
        Ok(Self::new(path, db, false))
    }

    pub fn open_read_only(path: &Path, cfg: &DbConfig) -> Result<Self> {
        let options = to_rocksdb_options(cfg);
        info!("open rocksdb {} for read only", path.display());
        let db = DB::open_for_read_only(&options, path, false)?;
        Ok(Self::new(path, db, true))
    }

    fn new(path: &Path, db: DB, read_only: bool) -> Self {
        RocksEngine {
            name: format!("rocksdb {}", path.display()),
            path: path.to_owned(),
            read_only,
            db: RwLock::new(Some(db)),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_db<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&DB) -> Result<T>,
    {
        let db = self.db.read().expect("Poisoned");
        match db.as_ref() {
            Some(db) => f(db),
            None => Err(Error::EngineClosed(self.name.clone())),
        }
    }
}

impl StorageEngine for RocksEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_native(&self) -> bool {
        true
    }

    fn ordered(self: Arc<Self>) -> Option<Arc<dyn OrderedKeyValueDb>> {
        Some(self)
    }

    fn getter(self: Arc<Self>) -> Option<Arc<dyn KeyValueGetter>> {
        Some(self)
    }

    fn setter(self: Arc<Self>) -> Option<Arc<dyn KeyValueSetter>> {
        if self.read_only {
            None
        } else {
            Some(self)
        }
    }

    fn close(&self) -> Result<()> {
        if let Some(db) = self.db.write().expect("Poisoned").take() {
            if !self.read_only {
                db.flush()?;
            }
            info!("rocksdb {} is closed", self.path.display());
        }
        Ok(())
    }
}

impl KeyValueGetter for RocksEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_db(|db| Ok(db.get(key)?))
    }
}

impl KeyValueSetter for RocksEngine {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_db(|db| Ok(db.put(key, value)?))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.with_db(|db| Ok(db.delete(key)?))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut wb = rocksdb::WriteBatch::default();
        for op in batch {
            match op {
                WriteOp::Put { key, value } => wb.put(key, value),
                WriteOp::Delete { key } => wb.delete(key),
            }
        }
        self.with_db(|db| Ok(db.write(wb)?))
    }
}

impl OrderedKeyValueDb for RocksEngine {
    fn scan(
        &self,
        begin: &[u8],
        end: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<()> {
        self.with_db(|db| {
            let mut opts = ReadOptions::default();
            if !end.is_empty() {
                opts.set_iterate_upper_bound(end.to_owned());
            }
            let iter = db.iterator_opt(IteratorMode::From(begin, Direction::Forward), opts);
            for item in iter {
                let (key, value) = item?;
                if !visit(&key, &value) {
                    break;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;
    use voxdag_rock::fn_name;

    use super::*;

    #[test]
    fn reopen_read_only_lacks_setter() {
        let dir = TempDir::new(fn_name!()).unwrap();
        {
            let engine = Arc::new(RocksEngine::open(dir.path(), &DbConfig::default()).unwrap());
            let kv = KeyValueEngine::probe(engine.clone()).unwrap();
            kv.put(b"a", b"1").unwrap();
            kv.put(b"b", b"2").unwrap();
            kv.put(b"c", b"3").unwrap();
            assert_eq!(kv.range(b"a", b"c").unwrap().len(), 2);
            engine.close().unwrap();
            assert!(matches!(kv.get(b"a"), Err(Error::EngineClosed(_))));
        }

        let engine = Arc::new(RocksEngine::open_read_only(dir.path(), &DbConfig::default()).unwrap());
        let err = KeyValueEngine::probe(engine.clone()).err().unwrap();
        assert!(matches!(
            err,
            Error::MissingCapability { capability: Capability::KeyValueSetter, .. }
        ));
        assert_eq!(engine.clone().getter().unwrap().get(b"b").unwrap(), Some(b"2".to_vec()));
    }
}
