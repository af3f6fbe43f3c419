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

// Lets `#[voxdag_macro::test]` resolve inside this crate.
extern crate self as voxdag_runtime;

mod executor;
mod group;
mod shutdown;

pub mod governor;
pub mod metrics;

use serde::{Deserialize, Serialize};
pub use tokio::select;

pub use self::executor::*;
pub use self::governor::{
    DrainOutcome, Governor, GovernorConfig, HandlerToken, NativeCallGuard, SpawnBatch,
    ThrottleGuard,
};
pub use self::group::TaskGroup;
pub use self::shutdown::{Shutdown, ShutdownNotifier};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub event_interval: Option<u32>,
    pub global_event_interval: Option<u32>,
    pub max_blocking_threads: Option<usize>,
}

#[cfg(test)]
mod tests {
    #[ctor::ctor]
    fn init() {
        tracing_subscriber::fmt::init();
    }
}
