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

lazy_static! {
    pub static ref GOVERNOR_HANDLER_TOKENS_IN_USE: IntGauge = register_int_gauge!(
        "governor_handler_tokens_in_use",
        "The number of handler tokens checked out"
    )
    .unwrap();
    pub static ref GOVERNOR_ACTIVE_HANDLERS: IntGauge = register_int_gauge!(
        "governor_active_handlers",
        "The peak of handler tokens checked out over the last report window"
    )
    .unwrap();
    pub static ref GOVERNOR_ACTIVE_NATIVE_CALLS: IntGauge = register_int_gauge!(
        "governor_active_native_calls",
        "The number of outstanding native call regions"
    )
    .unwrap();
    pub static ref GOVERNOR_HANDLER_ACQUIRE_DURATION_SECONDS: Histogram = register_histogram!(
        "governor_handler_acquire_duration_seconds",
        "The intervals of waiting for a handler token",
        exponential_buckets(0.00005, 2.0, 20).unwrap(),
    )
    .unwrap();
    pub static ref GOVERNOR_THROTTLE_ACQUIRE_DURATION_SECONDS: Histogram = register_histogram!(
        "governor_throttle_acquire_duration_seconds",
        "The intervals of waiting for the global throttle",
        exponential_buckets(0.00005, 2.0, 20).unwrap(),
    )
    .unwrap();
    pub static ref GOVERNOR_DRAIN_WAITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "governor_drain_waits_total",
        "The total waits of draining before shutdown",
        &["type"]
    )
    .unwrap();
}
