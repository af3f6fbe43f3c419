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
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use voxdag_runtime::*;

#[ctor::ctor]
fn init() {
    tracing_subscriber::fmt::init();
}

fn governor(handlers: usize) -> Arc<Governor> {
    Arc::new(Governor::new(GovernorConfig {
        max_chunk_handlers: handlers,
        drain_interval_ms: 20,
        ..Default::default()
    }))
}

#[voxdag_macro::test(workers = 2)]
async fn exhausted_pool_blocks_until_release() {
    let governor = governor(3);
    let mut tokens = Vec::new();
    for _ in 0..3 {
        tokens.push(governor.acquire_handler().await);
    }

    let waiter = spawn({
        let governor = governor.clone();
        async move {
            let _token = governor.acquire_handler().await;
            Instant::now()
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    let released_at = Instant::now();
    tokens.pop();
    let acquired_at = waiter.await.unwrap();
    assert!(acquired_at >= released_at);
    assert_eq!(governor.handlers_in_use(), 2);
}

#[voxdag_macro::test(workers = 4)]
async fn throttle_serializes_heavy_operations() {
    let governor = governor(4);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let governor = governor.clone();
        let running = running.clone();
        let peak = peak.clone();
        handles.push(spawn(async move {
            let _guard = governor.acquire_throttle().await;
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            running.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[voxdag_macro::test(workers = 4)]
async fn spawn_batches_do_not_interleave() {
    let governor = governor(2);
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut batches = Vec::new();
    for batch_id in 0..3 {
        let governor = governor.clone();
        let order = order.clone();
        batches.push(spawn(async move {
            let mut batch = governor.spawn_batch().await;
            let mut tasks = Vec::new();
            for _ in 0..4 {
                let token = batch.acquire().await;
                order.lock().unwrap().push(batch_id);
                tasks.push(spawn(async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    drop(token);
                }));
            }
            assert_eq!(batch.acquired(), 4);
            drop(batch);
            for task in tasks {
                task.await.unwrap();
            }
        }));
    }
    for batch in batches {
        batch.await.unwrap();
    }

    let order = order.lock().unwrap();
    assert_eq!(order.len(), 12);
    for chunk in order.chunks(4) {
        assert!(chunk.iter().all(|id| *id == chunk[0]), "interleaved batches: {order:?}");
    }
    assert_eq!(governor.handlers_in_use(), 0);
}

#[voxdag_macro::test]
async fn native_drain_is_bounded() {
    let governor = governor(1);
    let _stuck = governor.native_call();
    let released = governor.native_call();
    drop(released);

    let start = Instant::now();
    let outcome = governor.drain_native_calls().await;
    assert_eq!(outcome, DrainOutcome::TimedOut { waits: 5, remaining: 1 });
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(5));
}

#[voxdag_macro::test]
async fn default_native_drain_gives_up_after_five_seconds() {
    let governor = Governor::new(GovernorConfig::default());
    let _stuck = governor.native_call();

    let start = Instant::now();
    let outcome = governor.drain_native_calls().await;
    let elapsed = start.elapsed();
    assert_eq!(outcome, DrainOutcome::TimedOut { waits: 5, remaining: 1 });
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(7));
}

#[voxdag_macro::test]
async fn handler_drain_is_bounded() {
    let governor = Arc::new(Governor::new(GovernorConfig {
        max_chunk_handlers: 2,
        handler_drain_attempts: 3,
        drain_interval_ms: 10,
        ..Default::default()
    }));
    let _token = governor.acquire_handler().await;
    let outcome = governor.drain_handlers().await;
    assert_eq!(outcome, DrainOutcome::TimedOut { waits: 3, remaining: 1 });
}
