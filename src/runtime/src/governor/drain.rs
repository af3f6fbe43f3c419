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

use std::time::Duration;

use log::{info, warn};
use tokio::sync::Notify;

use crate::metrics::GOVERNOR_DRAIN_WAITS_TOTAL;

/// The result of waiting for outstanding work before shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Nothing is outstanding after `waits` intervals.
    Drained { waits: u32 },
    /// Gave up after `waits` intervals with `remaining` still outstanding.
    TimedOut { waits: u32, remaining: usize },
}

impl DrainOutcome {
    #[inline]
    pub fn is_drained(&self) -> bool {
        matches!(self, DrainOutcome::Drained { .. })
    }

    #[inline]
    pub fn waits(&self) -> u32 {
        match self {
            DrainOutcome::Drained { waits } | DrainOutcome::TimedOut { waits, .. } => *waits,
        }
    }
}

/// Poll `outstanding` once per `interval`, at most `attempts` times.
///
/// A wait ends early when `idle` is notified. It never fails: a timeout only
/// logs and reports what is left.
pub(super) async fn drain<F>(
    kind: &'static str,
    attempts: u32,
    interval: Duration,
    idle: &Notify,
    outstanding: F,
) -> DrainOutcome
where
    F: Fn() -> usize,
{
    let mut waits = 0;
    loop {
        let notified = idle.notified();
        tokio::pin!(notified);
        // Register before reading the count, so a release in between is not lost.
        notified.as_mut().enable();

        let active = outstanding();
        if active == 0 {
            info!("no {kind} active, waited {waits} times");
            return DrainOutcome::Drained { waits };
        }
        if waits >= attempts {
            warn!("already waited {waits} times for {active} {kind}, continuing with shutdown");
            return DrainOutcome::TimedOut { waits, remaining: active };
        }

        info!("waiting for {active} {kind} to finish ...");
        waits += 1;
        GOVERNOR_DRAIN_WAITS_TOTAL.with_label_values(&[kind]).inc();
        let _ = tokio::time::timeout(interval, notified).await;
    }
}
