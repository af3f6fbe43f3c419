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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::warn;
use tokio::sync::Notify;

use crate::metrics::GOVERNOR_ACTIVE_NATIVE_CALLS;

/// Tracks regions of native code, which cannot be interrupted by shutdown.
pub(super) struct NativeCalls {
    active: AtomicUsize,
    soft_limit: usize,
    /// Notified when the last region stops.
    pub(super) idle: Notify,
}

/// Marks an outstanding native call region, it stops on drop.
#[must_use = "the native call region stops once dropped"]
pub struct NativeCallGuard {
    calls: Arc<NativeCalls>,
}

impl NativeCalls {
    pub(super) fn new(soft_limit: usize) -> Self {
        NativeCalls { active: AtomicUsize::new(0), soft_limit, idle: Notify::new() }
    }

    /// Start a region. It never blocks, exceeding the soft limit only warns.
    pub(super) fn start(self: &Arc<Self>) -> NativeCallGuard {
        let active = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        GOVERNOR_ACTIVE_NATIVE_CALLS.inc();
        if active == self.soft_limit + 1 {
            warn!("{active} native calls outstanding, exceeds soft limit {}", self.soft_limit);
        }
        NativeCallGuard { calls: self.clone() }
    }

    fn stop(&self) {
        GOVERNOR_ACTIVE_NATIVE_CALLS.dec();
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    #[inline]
    pub(super) fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for NativeCallGuard {
    fn drop(&mut self) {
        self.calls.stop();
    }
}
