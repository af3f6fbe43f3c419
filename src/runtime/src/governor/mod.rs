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

//! Admission control of concurrent work.
//!
//! The governor bounds how many handlers run at once with a pool of tokens,
//! serializes heavy operations with a global throttle, lets a bulk requester
//! claim many tokens before others interleave, and tracks native call regions
//! so shutdown can wait for them. Everything here is advisory: reads and
//! writes are never locked globally.

mod drain;
mod load;
mod native;
mod tokens;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};

pub use self::drain::DrainOutcome;
pub use self::load::LoadWindow;
pub use self::native::NativeCallGuard;
use self::native::NativeCalls;
use self::tokens::HandlerPool;
pub use self::tokens::{HandlerToken, SpawnBatch, ThrottleGuard};
use crate::metrics::GOVERNOR_ACTIVE_HANDLERS;
use crate::{Executor, JoinHandle, Shutdown};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// The number of handler tokens. Default: the number of logical CPUs.
    pub max_chunk_handlers: usize,

    /// The capacity of the global throttle.
    pub max_throttled_ops: usize,

    /// The soft limit of outstanding native call regions.
    pub max_native_calls: usize,

    pub handler_drain_attempts: u32,
    pub native_drain_attempts: u32,
    pub drain_interval_ms: u64,

    pub load_check_interval_ms: u64,
    /// The number of load checks of one report window.
    pub load_report_ticks: u32,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        GovernorConfig {
            max_chunk_handlers: num_cpus::get(),
            max_throttled_ops: 1,
            max_native_calls: 10000,
            handler_drain_attempts: 20,
            native_drain_attempts: 5,
            drain_interval_ms: 1000,
            load_check_interval_ms: 10,
            load_report_ticks: 100,
        }
    }
}

impl GovernorConfig {
    #[inline]
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    #[inline]
    pub fn load_check_interval(&self) -> Duration {
        Duration::from_millis(self.load_check_interval_ms.max(1))
    }
}

/// The owner of the token pool, the throttle and the native call counter.
pub struct Governor {
    cfg: GovernorConfig,
    handlers: Arc<HandlerPool>,
    throttle: Arc<Semaphore>,
    spawn_lock: Mutex<()>,
    native_calls: Arc<NativeCalls>,
    active_handlers: AtomicUsize,
}

impl Governor {
    pub fn new(mut cfg: GovernorConfig) -> Self {
        if cfg.max_chunk_handlers == 0 {
            warn!("max_chunk_handlers is 0, use 1 instead");
            cfg.max_chunk_handlers = 1;
        }
        if cfg.max_throttled_ops == 0 {
            warn!("max_throttled_ops is 0, use 1 instead");
            cfg.max_throttled_ops = 1;
        }
        info!(
            "governor with {} handler tokens, {} throttled ops, {} native calls",
            cfg.max_chunk_handlers, cfg.max_throttled_ops, cfg.max_native_calls
        );
        Governor {
            handlers: Arc::new(HandlerPool::new(cfg.max_chunk_handlers)),
            throttle: Arc::new(Semaphore::new(cfg.max_throttled_ops)),
            spawn_lock: Mutex::new(()),
            native_calls: Arc::new(NativeCalls::new(cfg.max_native_calls)),
            active_handlers: AtomicUsize::new(0),
            cfg,
        }
    }

    #[inline]
    pub fn config(&self) -> &GovernorConfig {
        &self.cfg
    }

    #[inline]
    pub fn handler_capacity(&self) -> usize {
        self.handlers.capacity()
    }

    /// Wait for a handler token.
    pub async fn acquire_handler(&self) -> HandlerToken {
        self.handlers.acquire().await
    }

    /// Take a handler token if one is available right now.
    pub fn try_acquire_handler(&self) -> Option<HandlerToken> {
        self.handlers.try_acquire()
    }

    /// The number of handler tokens checked out.
    #[inline]
    pub fn handlers_in_use(&self) -> usize {
        self.handlers.in_use()
    }

    /// The peak of [`Governor::handlers_in_use`] over the last report window
    /// of the load sampler.
    #[inline]
    pub fn active_handlers(&self) -> usize {
        self.active_handlers.load(Ordering::Relaxed)
    }

    /// Wait for a permit of the global throttle.
    pub async fn acquire_throttle(&self) -> ThrottleGuard {
        ThrottleGuard::acquire(&self.throttle).await
    }

    /// Take the spawn lock, released when the batch is dropped.
    pub async fn spawn_batch(&self) -> SpawnBatch<'_> {
        SpawnBatch::new(self.spawn_lock.lock().await, &self.handlers)
    }

    /// Mark the start of a native call region, which lasts until the guard is
    /// dropped.
    pub fn native_call(&self) -> NativeCallGuard {
        self.native_calls.start()
    }

    #[inline]
    pub fn active_native_calls(&self) -> usize {
        self.native_calls.active()
    }

    /// Wait until no handler token is checked out, or give up after
    /// `handler_drain_attempts` intervals.
    pub async fn drain_handlers(&self) -> DrainOutcome {
        drain::drain(
            "handlers",
            self.cfg.handler_drain_attempts,
            self.cfg.drain_interval(),
            &self.handlers.idle,
            || self.handlers.in_use(),
        )
        .await
    }

    /// Wait until no native call region is outstanding, or give up after
    /// `native_drain_attempts` intervals.
    pub async fn drain_native_calls(&self) -> DrainOutcome {
        drain::drain(
            "native_calls",
            self.cfg.native_drain_attempts,
            self.cfg.drain_interval(),
            &self.native_calls.idle,
            || self.native_calls.active(),
        )
        .await
    }

    /// Sample the handler tokens in use until `shutdown`, publishing the peak
    /// of each report window as the active handlers.
    pub fn spawn_load_sampler(
        self: &Arc<Self>,
        executor: &Executor,
        mut shutdown: Shutdown,
    ) -> JoinHandle<()> {
        let governor = self.clone();
        executor.spawn(async move {
            let mut window = LoadWindow::new(governor.cfg.load_report_ticks);
            let mut interval = tokio::time::interval(governor.cfg.load_check_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                crate::select! {
                    _ = shutdown.wait() => break,
                    _ = interval.tick() => {}
                }
                if let Some(peak) = window.observe(governor.handlers_in_use()) {
                    governor.active_handlers.store(peak, Ordering::Relaxed);
                    GOVERNOR_ACTIVE_HANDLERS.set(peak as i64);
                }
            }
            debug!("load sampler is stopped");
        })
    }
}
