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

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use voxdag_runtime::{ExecutorConfig, GovernorConfig};

use crate::tiers::TierKind;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The datastore directory.
    pub root_dir: PathBuf,

    /// The number of executor threads, 0 means one thread per logical CPU.
    pub num_threads: usize,

    pub executor: ExecutorConfig,

    pub governor: GovernorConfig,

    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root_dir: PathBuf::from("voxdag"),
            num_threads: 0,
            executor: ExecutorConfig::default(),
            governor: GovernorConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    Memory,
    Rocksdb,
    RocksdbReadOnly,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    /// Vertices and edges stored in the key-value engine of the metadata tier.
    #[default]
    KeyValue,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The engine serving every tier without an override.
    pub kind: EngineKind,

    pub graph: GraphKind,

    /// Dedicated engines of tiers.
    pub metadata: Option<EngineKind>,
    pub small_data: Option<EngineKind>,
    pub big_data: Option<EngineKind>,

    pub db: DbConfig,
}

impl EngineConfig {
    pub fn tier_override(&self, tier: TierKind) -> Option<EngineKind> {
        match tier {
            TierKind::Metadata => self.metadata,
            TierKind::SmallData => self.small_data,
            TierKind::BigData => self.big_data,
        }
    }
}

/// The tuning of on-disk engines.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub max_background_jobs: i32,
    pub max_open_files: i32,
    pub bytes_per_sync: u64,
    pub write_buffer_size: usize,
    pub max_write_buffer_number: i32,
    pub target_file_size_base: u64,
    pub max_bytes_for_level_base: u64,
    pub block_size: usize,
    pub block_cache_size: usize,
    pub use_bloom_filter: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            max_background_jobs: 4,
            max_open_files: 1024,
            bytes_per_sync: 1 << 20,
            write_buffer_size: 64 << 20,
            max_write_buffer_number: 4,
            target_file_size_base: 64 << 20,
            max_bytes_for_level_base: 512 << 20,
            block_size: 64 << 10,
            block_cache_size: 256 << 20,
            use_bloom_filter: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_partial_config() {
        let cfg: Config = serde_json::from_str(
            r#"{
                "root_dir": "/tmp/voxdag",
                "governor": { "max_chunk_handlers": 3 },
                "engine": { "kind": "memory", "big_data": "rocksdb" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.root_dir, PathBuf::from("/tmp/voxdag"));
        assert_eq!(cfg.governor.max_chunk_handlers, 3);
        assert_eq!(cfg.governor.max_throttled_ops, 1);
        assert_eq!(cfg.engine.kind, EngineKind::Memory);
        assert_eq!(cfg.engine.tier_override(TierKind::BigData), Some(EngineKind::Rocksdb));
        assert_eq!(cfg.engine.tier_override(TierKind::Metadata), None);
        assert_eq!(cfg.engine.graph, GraphKind::KeyValue);
    }

    #[test]
    fn read_only_kind_name() {
        let kind: EngineKind = serde_json::from_str(r#""rocksdb_read_only""#).unwrap();
        assert_eq!(kind, EngineKind::RocksdbReadOnly);
    }
}
