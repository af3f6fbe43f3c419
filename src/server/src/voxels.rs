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

//! Voxel blocks and labels of one data instance at one version.
//!
//! Blocks and label surfaces live on the big data tier, label maps and label
//! sizes on the small data tier. Every request holds a handler token while
//! it touches storage, batched writes additionally hold the global throttle.

use std::sync::Arc;

use log::debug;
use voxdag_rock::lexical::lexical_next_boundary;
use voxdag_runtime::{Executor, Governor};
use voxdag_schema::keys::{self, LabelBytes, SpatialMapIndex};
use voxdag_schema::{DataContext, IndexZYX};

use crate::engine::WriteBatch;
use crate::metrics::VOXEL_BATCH_PUT_BLOCKS;
use crate::tiers::StorageTiers;
use crate::Result;

#[derive(Clone)]
pub struct VoxelStore {
    ctx: DataContext,
    governor: Arc<Governor>,
    tiers: StorageTiers,
    executor: Executor,
}

impl VoxelStore {
    pub fn new(
        ctx: DataContext,
        governor: Arc<Governor>,
        tiers: StorageTiers,
        executor: Executor,
    ) -> Self {
        VoxelStore { ctx, governor, tiers, executor }
    }

    #[inline]
    pub fn context(&self) -> &DataContext {
        &self.ctx
    }

    pub async fn put_block(&self, block: IndexZYX, data: &[u8]) -> Result<()> {
        let _token = self.governor.acquire_handler().await;
        let index = keys::voxel_block_index(&block.to_bytes());
        self.tiers.big_data().put(&self.ctx, &index, data)
    }

    pub async fn get_block(&self, block: IndexZYX) -> Result<Option<Vec<u8>>> {
        let _token = self.governor.acquire_handler().await;
        let index = keys::voxel_block_index(&block.to_bytes());
        self.tiers.big_data().get(&self.ctx, &index)
    }

    /// Store blocks concurrently, one handler token per block. The tokens are
    /// claimed under the spawn lock, so concurrent batches do not interleave.
    pub async fn put_blocks(&self, blocks: Vec<(IndexZYX, Vec<u8>)>) -> Result<usize> {
        let num_blocks = blocks.len();
        VOXEL_BATCH_PUT_BLOCKS.observe(num_blocks as f64);
        let _throttle = self.governor.acquire_throttle().await;

        let mut handles = Vec::with_capacity(num_blocks);
        {
            let mut batch = self.governor.spawn_batch().await;
            for (block, data) in blocks {
                let token = batch.acquire().await;
                let tier = self.tiers.big_data().clone();
                let ctx = self.ctx;
                handles.push(self.executor.spawn(async move {
                    let _token = token;
                    let index = keys::voxel_block_index(&block.to_bytes());
                    tier.put(&ctx, &index, &data)
                }));
            }
        }

        for result in futures::future::try_join_all(handles).await? {
            result?;
        }
        debug!("put {num_blocks} blocks of {}", self.ctx);
        Ok(num_blocks)
    }

    /// The blocks whose ZYX index falls between `first` and `last` inclusive,
    /// in index order.
    pub async fn blocks_in_span(
        &self,
        first: IndexZYX,
        last: IndexZYX,
    ) -> Result<Vec<(IndexZYX, Vec<u8>)>> {
        let _token = self.governor.acquire_handler().await;
        let start = keys::voxel_block_index(&first.to_bytes());
        let end = lexical_next_boundary(&keys::voxel_block_index(&last.to_bytes()));
        let mut blocks = Vec::new();
        let mut result = Ok(());
        self.tiers.big_data().scan(&self.ctx, &start, &end, |index, value| {
            match keys::decode_voxel_block_index(index) {
                Ok(block) => blocks.push((block, value.to_owned())),
                Err(err) => {
                    result = Err(err);
                    return false;
                }
            }
            true
        })?;
        result?;
        Ok(blocks)
    }

    /// Map `label` to `mapping`, writing the forward and the inverse map
    /// together.
    pub async fn map_label(&self, label: u64, mapping: u64) -> Result<()> {
        let _token = self.governor.acquire_handler().await;
        let tier = self.tiers.small_data();
        let label_bytes = keys::label_bytes(label);

        let mut batch = WriteBatch::default();
        for (index, _) in tier.prefix_pairs(&self.ctx, &keys::forward_map_prefix(&label_bytes))? {
            let (_, old) = keys::decode_forward_map_index(&index)?;
            batch.delete(self.ctx.construct_key(&index));
            batch.delete(self.ctx.construct_key(&keys::inverse_map_index(&label_bytes, old)));
        }
        batch.put(self.ctx.construct_key(&keys::forward_map_index(&label_bytes, mapping)), vec![]);
        batch.put(self.ctx.construct_key(&keys::inverse_map_index(&label_bytes, mapping)), vec![]);
        tier.write(batch)
    }

    /// The label `label` is mapped to.
    pub async fn mapping(&self, label: u64) -> Result<Option<u64>> {
        let _token = self.governor.acquire_handler().await;
        let prefix = keys::forward_map_prefix(&keys::label_bytes(label));
        match self.tiers.small_data().prefix_pairs(&self.ctx, &prefix)?.first() {
            Some((index, _)) => Ok(Some(keys::decode_forward_map_index(index)?.1)),
            None => Ok(None),
        }
    }

    /// The labels mapped to `mapping`, in ascending order.
    pub async fn labels_mapped_to(&self, mapping: u64) -> Result<Vec<u64>> {
        let _token = self.governor.acquire_handler().await;
        let prefix = keys::inverse_map_prefix(mapping);
        self.tiers
            .small_data()
            .prefix_pairs(&self.ctx, &prefix)?
            .iter()
            .map(|(index, _)| Ok(u64::from_be_bytes(keys::decode_inverse_map_index(index)?.1)))
            .collect()
    }

    /// Record that `block` holds `label` mapped to `mapping`, together with
    /// the block in the label's block set.
    pub async fn map_block_label(&self, block: IndexZYX, label: u64, mapping: u64) -> Result<()> {
        let _token = self.governor.acquire_handler().await;
        let block_bytes = block.to_bytes();
        let spatial = SpatialMapIndex::new(&block_bytes, Some(&keys::label_bytes(label)), mapping);
        let mut batch = WriteBatch::default();
        batch.put(self.ctx.construct_key(spatial.as_bytes()), vec![]);
        batch.put(self.ctx.construct_key(&keys::label_spatial_map_index(label, &block_bytes)), vec![]);
        self.tiers.small_data().write(batch)
    }

    /// Record many labels of one block, reusing one spatial map index.
    pub async fn map_block_labels(&self, block: IndexZYX, labels: &[(u64, u64)]) -> Result<()> {
        let _token = self.governor.acquire_handler().await;
        let block_bytes = block.to_bytes();
        let mut spatial = SpatialMapIndex::new(&block_bytes, None, 0);
        let mut batch = WriteBatch::default();
        for &(label, mapping) in labels {
            spatial.update(Some(&keys::label_bytes(label)), mapping);
            batch.put(self.ctx.construct_key(spatial.as_bytes()), vec![]);
            batch.put(
                self.ctx.construct_key(&keys::label_spatial_map_index(label, &block_bytes)),
                vec![],
            );
        }
        self.tiers.small_data().write(batch)
    }

    /// The `(label, mapping)` pairs recorded for a block.
    pub async fn block_labels(&self, block: IndexZYX) -> Result<Vec<(LabelBytes, u64)>> {
        let _token = self.governor.acquire_handler().await;
        let prefix = keys::spatial_map_prefix(&block.to_bytes());
        self.tiers
            .small_data()
            .prefix_pairs(&self.ctx, &prefix)?
            .iter()
            .map(|(index, _)| Ok(keys::decode_spatial_map_index(index)?))
            .collect()
    }

    /// The blocks holding `label`, in ZYX order.
    pub async fn label_blocks(&self, label: u64) -> Result<Vec<IndexZYX>> {
        let _token = self.governor.acquire_handler().await;
        let prefix = keys::label_spatial_map_prefix(label);
        let mut blocks = Vec::new();
        for (index, _) in self.tiers.small_data().prefix_pairs(&self.ctx, &prefix)? {
            let (_, block) = keys::decode_label_spatial_map_index(&index)?;
            match IndexZYX::from_bytes(block) {
                Some(block) => blocks.push(block),
                None => {
                    return Err(crate::Error::InvalidData(format!(
                        "block index of label {label} with {} bytes",
                        block.len()
                    )))
                }
            }
        }
        Ok(blocks)
    }

    /// Set the voxel count of a label, replacing the count `previous` if any.
    pub async fn set_label_size(&self, label: u64, previous: Option<u64>, size: u64) -> Result<()> {
        let _token = self.governor.acquire_handler().await;
        let mut batch = WriteBatch::default();
        if let Some(previous) = previous {
            batch.delete(self.ctx.construct_key(&keys::label_sizes_index(previous, label)));
        }
        batch.put(self.ctx.construct_key(&keys::label_sizes_index(size, label)), vec![]);
        self.tiers.small_data().write(batch)
    }

    /// The labels with `min_size <= size <= max_size`, smallest first.
    pub async fn labels_by_size(&self, min_size: u64, max_size: u64) -> Result<Vec<u64>> {
        let _token = self.governor.acquire_handler().await;
        let (start, end) = keys::label_sizes_range(min_size, max_size);
        let mut labels = Vec::new();
        let mut result = Ok(());
        self.tiers.small_data().scan(&self.ctx, &start, &end, |index, _| {
            match keys::decode_label_sizes_index(index) {
                Ok(label) => labels.push(label),
                Err(err) => {
                    result = Err(err);
                    return false;
                }
            }
            true
        })?;
        result?;
        Ok(labels)
    }

    pub async fn put_label_surface(&self, label: u64, surface: &[u8]) -> Result<()> {
        let _token = self.governor.acquire_handler().await;
        self.tiers.big_data().put(&self.ctx, &keys::label_surface_index(label), surface)
    }

    pub async fn get_label_surface(&self, label: u64) -> Result<Option<Vec<u8>>> {
        let _token = self.governor.acquire_handler().await;
        self.tiers.big_data().get(&self.ctx, &keys::label_surface_index(label))
    }

    /// Delete every voxel and label index of this instance and version on
    /// every tier, graph indices of the same context are kept. Runs under the
    /// global throttle.
    pub async fn delete_all(&self) -> Result<usize> {
        let _throttle = self.governor.acquire_throttle().await;
        let _token = self.governor.acquire_handler().await;
        let (start, end) = keys::voxel_label_range();
        let small_data = self.tiers.small_data();
        let mut deleted = small_data.delete_range(&self.ctx, &start, &end)?;
        if !self.tiers.big_data().shares_engine(small_data) {
            deleted += self.tiers.big_data().delete_range(&self.ctx, &start, &end)?;
        }
        Ok(deleted)
    }
}
