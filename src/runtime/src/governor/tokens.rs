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

use std::sync::Arc;

use tokio::sync::{MutexGuard, Notify, OwnedSemaphorePermit, Semaphore};

use crate::metrics::*;

/// A bounded pool of handler tokens.
pub(super) struct HandlerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    /// Notified when the last token is released.
    pub(super) idle: Notify,
}

/// A handler token checked out of the pool, released on drop.
#[must_use = "the token is released once dropped"]
pub struct HandlerToken {
    permit: Option<OwnedSemaphorePermit>,
    pool: Arc<HandlerPool>,
}

/// A permit of the global throttle, released on drop.
#[must_use = "the throttle is released once dropped"]
pub struct ThrottleGuard {
    _permit: OwnedSemaphorePermit,
}

/// Claims handler tokens for a batch of tasks while holding the spawn lock,
/// so tokens of other batches never interleave.
pub struct SpawnBatch<'a> {
    _lock: MutexGuard<'a, ()>,
    pool: &'a Arc<HandlerPool>,
    acquired: usize,
}

impl HandlerPool {
    pub(super) fn new(capacity: usize) -> Self {
        HandlerPool { semaphore: Arc::new(Semaphore::new(capacity)), capacity, idle: Notify::new() }
    }

    #[inline]
    pub(super) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(super) fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    pub(super) async fn acquire(self: &Arc<Self>) -> HandlerToken {
        let _timer = GOVERNOR_HANDLER_ACQUIRE_DURATION_SECONDS.start_timer();
        let permit =
            self.semaphore.clone().acquire_owned().await.expect("handler pool is never closed");
        self.checked_out(permit)
    }

    pub(super) fn try_acquire(self: &Arc<Self>) -> Option<HandlerToken> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        Some(self.checked_out(permit))
    }

    fn checked_out(self: &Arc<Self>, permit: OwnedSemaphorePermit) -> HandlerToken {
        GOVERNOR_HANDLER_TOKENS_IN_USE.inc();
        HandlerToken { permit: Some(permit), pool: self.clone() }
    }
}

impl Drop for HandlerToken {
    fn drop(&mut self) {
        drop(self.permit.take());
        GOVERNOR_HANDLER_TOKENS_IN_USE.dec();
        if self.pool.in_use() == 0 {
            self.pool.idle.notify_waiters();
        }
    }
}

impl ThrottleGuard {
    pub(super) async fn acquire(semaphore: &Arc<Semaphore>) -> Self {
        let _timer = GOVERNOR_THROTTLE_ACQUIRE_DURATION_SECONDS.start_timer();
        let permit = semaphore.clone().acquire_owned().await.expect("throttle is never closed");
        ThrottleGuard { _permit: permit }
    }
}

impl<'a> SpawnBatch<'a> {
    pub(super) fn new(lock: MutexGuard<'a, ()>, pool: &'a Arc<HandlerPool>) -> Self {
        SpawnBatch { _lock: lock, pool, acquired: 0 }
    }

    /// Wait for the next handler token of this batch.
    pub async fn acquire(&mut self) -> HandlerToken {
        let token = self.pool.acquire().await;
        self.acquired += 1;
        token
    }

    /// The number of tokens claimed by this batch so far.
    #[inline]
    pub fn acquired(&self) -> usize {
        self.acquired
    }
}
