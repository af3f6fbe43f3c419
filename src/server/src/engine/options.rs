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

use rocksdb::{BlockBasedOptions, Cache, Options};

use crate::DbConfig;

pub fn to_rocksdb_options(cfg: &DbConfig) -> Options {
    let mut opts = Options::default();
    opts.create_if_missing(true);

    opts.set_max_background_jobs(cfg.max_background_jobs);
    opts.set_max_open_files(cfg.max_open_files);
    opts.set_bytes_per_sync(cfg.bytes_per_sync);

    opts.set_write_buffer_size(cfg.write_buffer_size);
    opts.set_max_write_buffer_number(cfg.max_write_buffer_number);

    opts.set_target_file_size_base(cfg.target_file_size_base);
    opts.set_max_bytes_for_level_base(cfg.max_bytes_for_level_base);
    opts.set_level_compaction_dynamic_level_bytes(true);

    let cache = Cache::new_lru_cache(cfg.block_cache_size);
    let mut blk_opts = BlockBasedOptions::default();
    blk_opts.set_block_size(cfg.block_size);
    blk_opts.set_block_cache(&cache);
    blk_opts.set_cache_index_and_filter_blocks(true);
    if cfg.use_bloom_filter {
        blk_opts.set_bloom_filter(10.0, false);
    }
    opts.set_block_based_table_factory(&blk_opts);

    opts
}
