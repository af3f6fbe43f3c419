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

//! The three storage tiers: metadata, small data and big data.
//!
//! Each tier is a thin named view over the key-value engine serving it. Keys
//! are qualified by a [`DataContext`] on the way in, and stripped back to
//! indices on the way out.

use std::fmt;
use std::sync::Arc;

use prometheus::IntCounter;
use voxdag_runtime::{Governor, NativeCallGuard};
use voxdag_schema::DataContext;

use crate::engine::{Engines, KeyValueEngine, WriteBatch};
use crate::metrics::*;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TierKind {
    Metadata,
    SmallData,
    BigData,
}

impl TierKind {
    pub const ALL: [TierKind; 3] = [TierKind::Metadata, TierKind::SmallData, TierKind::BigData];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Metadata => "metadata",
            TierKind::SmallData => "small_data",
            TierKind::BigData => "big_data",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct Tier {
    kind: TierKind,
    engine: KeyValueEngine,
    /// Tracks calls into native engines.
    governor: Option<Arc<Governor>>,
}

impl Tier {
    fn new(kind: TierKind, engine: KeyValueEngine, governor: &Arc<Governor>) -> Self {
        let governor = if engine.is_native() { Some(governor.clone()) } else { None };
        Tier { kind, engine, governor }
    }

    #[inline]
    pub fn kind(&self) -> TierKind {
        self.kind
    }

    #[inline]
    pub fn engine(&self) -> &KeyValueEngine {
        &self.engine
    }

    /// Whether both tiers are served by the same engine.
    #[inline]
    pub fn shares_engine(&self, other: &Tier) -> bool {
        self.engine.same_engine(&other.engine)
    }

    pub fn get(&self, ctx: &DataContext, index: &[u8]) -> Result<Option<Vec<u8>>> {
        self.counter(&TIER_READ_TOTAL).inc();
        let _native = self.native_call();
        self.engine.get(&ctx.construct_key(index))
    }

    pub fn put(&self, ctx: &DataContext, index: &[u8], value: &[u8]) -> Result<()> {
        self.counter(&TIER_WRITE_TOTAL).inc();
        let _native = self.native_call();
        self.engine.put(&ctx.construct_key(index), value)
    }

    pub fn delete(&self, ctx: &DataContext, index: &[u8]) -> Result<()> {
        self.counter(&TIER_WRITE_TOTAL).inc();
        let _native = self.native_call();
        self.engine.delete(&ctx.construct_key(index))
    }

    /// Apply a batch of fully-qualified keys atomically.
    pub fn write(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.counter(&TIER_WRITE_TOTAL).inc();
        let _native = self.native_call();
        self.engine.write(batch)
    }

    /// Visit the indices of `ctx` in `[start, end)` in ascending order until
    /// `visit` returns `false`. An empty `end` is the end of the context.
    pub fn scan<F>(&self, ctx: &DataContext, start: &[u8], end: &[u8], mut visit: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> bool,
    {
        self.counter(&TIER_SCAN_TOTAL).inc();
        let _native = self.native_call();
        let (begin, end) = ctx.qualify_range(start, end);
        let mut result = Ok(());
        self.engine.scan(&begin, &end, &mut |key, value| match ctx.index_from_key(key) {
            Ok(index) => visit(index, value),
            Err(err) => {
                result = Err(err.into());
                false
            }
        })?;
        result
    }

    /// Collect the index-value pairs of `ctx` with the given index prefix.
    pub fn prefix_pairs(&self, ctx: &DataContext, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let (start, end) = voxdag_rock::lexical::prefix_range(prefix);
        let mut pairs = Vec::new();
        self.scan(ctx, &start, &end, |index, value| {
            pairs.push((index.to_owned(), value.to_owned()));
            true
        })?;
        Ok(pairs)
    }

    /// Delete the indices of `ctx` in `[start, end)`, returns the number of
    /// deleted keys. An empty `end` is the end of the context.
    pub fn delete_range(&self, ctx: &DataContext, start: &[u8], end: &[u8]) -> Result<usize> {
        self.counter(&TIER_WRITE_TOTAL).inc();
        let _native = self.native_call();
        let (begin, end) = ctx.qualify_range(start, end);
        self.engine.delete_range(&begin, &end)
    }

    /// Delete every key of `ctx`, returns the number of deleted keys.
    pub fn delete_all(&self, ctx: &DataContext) -> Result<usize> {
        self.counter(&TIER_WRITE_TOTAL).inc();
        let _native = self.native_call();
        let (begin, end) = ctx.key_range();
        self.engine.delete_range(&begin, &end)
    }

    #[inline]
    fn native_call(&self) -> Option<NativeCallGuard> {
        self.governor.as_ref().map(|governor| governor.native_call())
    }

    #[inline]
    fn counter<'a>(&self, metric: &'a TierRequestTotal) -> &'a IntCounter {
        match self.kind {
            TierKind::Metadata => &metric.metadata,
            TierKind::SmallData => &metric.small_data,
            TierKind::BigData => &metric.big_data,
        }
    }
}

/// Routes requests to the engine of each tier.
#[derive(Clone)]
pub struct StorageTiers {
    metadata: Tier,
    small_data: Tier,
    big_data: Tier,
}

impl StorageTiers {
    pub fn new(engines: &Engines, governor: &Arc<Governor>) -> Self {
        let tier = |kind| Tier::new(kind, engines.engine(kind), governor);
        StorageTiers {
            metadata: tier(TierKind::Metadata),
            small_data: tier(TierKind::SmallData),
            big_data: tier(TierKind::BigData),
        }
    }

    #[inline]
    pub fn metadata(&self) -> &Tier {
        &self.metadata
    }

    #[inline]
    pub fn small_data(&self) -> &Tier {
        &self.small_data
    }

    #[inline]
    pub fn big_data(&self) -> &Tier {
        &self.big_data
    }

    pub fn tier(&self, kind: TierKind) -> &Tier {
        match kind {
            TierKind::Metadata => &self.metadata,
            TierKind::SmallData => &self.small_data,
            TierKind::BigData => &self.big_data,
        }
    }
}
