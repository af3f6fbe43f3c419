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

use lazy_static::lazy_static;
use prometheus::*;
use prometheus_static_metric::make_static_metric;

make_static_metric! {
    pub struct TierRequestTotal: IntCounter {
        "tier" => {
            metadata,
            small_data,
            big_data,
        },
    }
}

lazy_static! {
    pub static ref TIER_READ_TOTAL_VEC: IntCounterVec = register_int_counter_vec!(
        "tier_read_total",
        "The total reads of each storage tier",
        &["tier"]
    )
    .unwrap();
    pub static ref TIER_READ_TOTAL: TierRequestTotal =
        TierRequestTotal::from(&TIER_READ_TOTAL_VEC);
    pub static ref TIER_WRITE_TOTAL_VEC: IntCounterVec = register_int_counter_vec!(
        "tier_write_total",
        "The total writes of each storage tier",
        &["tier"]
    )
    .unwrap();
    pub static ref TIER_WRITE_TOTAL: TierRequestTotal =
        TierRequestTotal::from(&TIER_WRITE_TOTAL_VEC);
    pub static ref TIER_SCAN_TOTAL_VEC: IntCounterVec = register_int_counter_vec!(
        "tier_scan_total",
        "The total range scans of each storage tier",
        &["tier"]
    )
    .unwrap();
    pub static ref TIER_SCAN_TOTAL: TierRequestTotal =
        TierRequestTotal::from(&TIER_SCAN_TOTAL_VEC);
}

lazy_static! {
    pub static ref VOXEL_BATCH_PUT_BLOCKS: Histogram = register_histogram!(
        "voxel_batch_put_blocks",
        "The number of blocks of each batched put",
        exponential_buckets(1.0, 2.0, 16).unwrap(),
    )
    .unwrap();
    pub static ref SERVICE_SHUTDOWN_DURATION_SECONDS: Histogram = register_histogram!(
        "service_shutdown_duration_seconds",
        "The intervals of shutting down the service",
        exponential_buckets(0.001, 2.0, 16).unwrap(),
    )
    .unwrap();
}
