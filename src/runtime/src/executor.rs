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

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use pin_project::pin_project;

use crate::ExecutorConfig;

const SLOW_POLL_THRESHOLD: Duration = Duration::from_millis(1);
const SLOW_SCHEDULE_THRESHOLD: Duration = Duration::from_millis(100);

enum TaskState {
    /// Not polled yet, holds the spawn time.
    First(Instant),
    Polled(Duration),
}

pub type JoinError = tokio::task::JoinError;

/// A handle that awaits the result of a task.
///
/// Dropping a [`JoinHandle`] will abort the underlying task.
#[must_use = "Drop this `JoinHandle` will abort the underlying task"]
#[derive(Debug)]
pub struct JoinHandle<T> {
    inner: tokio::task::JoinHandle<T>,
}

pub struct ExecutorOwner {
    runtime: tokio::runtime::Runtime,
}

/// An execution service, a cheap handle to the runtime of an
/// [`ExecutorOwner`].
#[derive(Clone)]
pub struct Executor
where
    Self: Send + Sync,
{
    handle: tokio::runtime::Handle,
}

#[pin_project]
struct FutureWrapper<F: Future> {
    #[pin]
    inner: F,
    state: TaskState,
}

impl ExecutorOwner {
    /// New executor and setup the underlying threads, scheduler. Zero
    /// threads means one thread per logical CPU.
    pub fn new(num_threads: usize) -> Self {
        Self::with_config(num_threads, ExecutorConfig::default())
    }

    pub fn with_config(num_threads: usize, cfg: ExecutorConfig) -> Self {
        use tokio::runtime::Builder;
        let num_threads = if num_threads == 0 { num_cpus::get() } else { num_threads };
        let runtime = Builder::new_multi_thread()
            .worker_threads(num_threads)
            .enable_all()
            .event_interval(cfg.event_interval.unwrap_or(61))
            .global_queue_interval(cfg.global_event_interval.unwrap_or(64))
            .max_blocking_threads(cfg.max_blocking_threads.unwrap_or(2))
            .thread_name("voxdag-worker")
            .thread_keep_alive(Duration::from_secs(60))
            .build()
            .expect("build tokio runtime");
        ExecutorOwner { runtime }
    }

    pub fn executor(&self) -> Executor {
        Executor { handle: self.runtime.handle().clone() }
    }
}

impl Executor {
    /// Spawns a task.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        JoinHandle { inner: self.handle.spawn(FutureWrapper::new(future)) }
    }

    /// Runs a future to completion on the executor. This is the executor’s
    /// entry point.
    #[inline]
    pub fn block_on<F, T>(&self, future: F) -> T
    where
        F: Future<Output = T> + Send,
        T: Send + 'static,
    {
        self.handle.block_on(future)
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = Result<T, JoinError>;

    #[inline]
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T> JoinHandle<T> {
    /// Checks if the task associated with this `JoinHandle` has finished.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<T> Drop for JoinHandle<T> {
    fn drop(&mut self) {
        self.inner.abort();
    }
}

impl<F: Future> FutureWrapper<F> {
    fn new(inner: F) -> Self {
        FutureWrapper { state: TaskState::First(Instant::now()), inner }
    }
}

impl<F: Future> Future for FutureWrapper<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        let mut duration = match this.state {
            TaskState::First(spawned_at) => {
                let delay = spawned_at.elapsed();
                if delay >= SLOW_SCHEDULE_THRESHOLD {
                    tracing::warn!(
                        "future is first polled {delay:?} after spawned: {}",
                        std::any::type_name::<F>(),
                    );
                }
                Duration::ZERO
            }
            TaskState::Polled(duration) => *duration,
        };

        let start = Instant::now();
        let output = Pin::new(&mut this.inner).poll(cx);
        let elapsed = start.elapsed();
        if elapsed >= SLOW_POLL_THRESHOLD {
            tracing::warn!(
                "future poll() execute total {elapsed:?}, polled {duration:?} before: {}",
                std::any::type_name::<F>(),
            );
        }

        duration += elapsed;
        *this.state = TaskState::Polled(duration);

        output
    }
}

/// Returns a `Executor` view over the currently running `ExecutorOwner`.
///
/// # Panics
///
/// This will panic if called outside the context of a runtime.
#[inline]
pub fn current() -> Executor {
    Executor { handle: tokio::runtime::Handle::current() }
}

/// Spawns a task with current `Executor`.
///
/// # Panics
///
/// This will panic if called outside the context of a runtime.
#[inline]
pub fn spawn<F, T>(future: F) -> JoinHandle<F::Output>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    current().spawn(future)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn spawn_and_join() {
        let owner = ExecutorOwner::new(2);
        let executor = owner.executor();
        let value = executor.block_on(async {
            let handle = spawn(async { 1 + 1 });
            handle.await.unwrap()
        });
        assert_eq!(value, 2);
    }

    #[test]
    fn wrapper_records_polled_duration() {
        let owner = ExecutorOwner::new(1);
        owner.executor().block_on(async {
            let mut wrapper = Box::pin(FutureWrapper::new(tokio::task::yield_now()));
            assert!(matches!(wrapper.state, TaskState::First(_)));
            let first = std::future::poll_fn(|cx| Poll::Ready(wrapper.as_mut().poll(cx))).await;
            assert!(first.is_pending());
            assert!(matches!(wrapper.state, TaskState::Polled(_)));
            wrapper.await;
        });
    }

    #[test]
    fn drop_handle_aborts_task() {
        let owner = ExecutorOwner::new(1);
        let executor = owner.executor();
        let done = Arc::new(AtomicBool::new(false));
        executor.block_on({
            let done = done.clone();
            async move {
                let handle = spawn(async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    done.store(true, Ordering::SeqCst);
                });
                drop(handle);
                tokio::time::sleep(Duration::from_millis(400)).await;
            }
        });
        assert!(!done.load(Ordering::SeqCst));
    }
}
