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

use tokio::sync::watch;

/// Broadcasts a one-shot termination to every [`Shutdown`] subscribed.
pub struct ShutdownNotifier {
    sender: watch::Sender<bool>,
}

/// Completes once the [`ShutdownNotifier`] terminates or is dropped.
#[derive(Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl ShutdownNotifier {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        ShutdownNotifier { sender }
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown { receiver: self.sender.subscribe() }
    }

    /// Notify all subscribers. Returns `false` if it was already terminated.
    pub fn terminate(&self) -> bool {
        self.sender.send_if_modified(|terminated| !std::mem::replace(terminated, true))
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for ShutdownNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    #[inline]
    pub fn is_terminated(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Wait for the termination.
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow_and_update() {
            if self.receiver.changed().await.is_err() {
                // The notifier is dropped.
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[voxdag_macro::test]
    async fn terminate_wakes_subscribers() {
        let notifier = ShutdownNotifier::new();
        let mut shutdown = notifier.subscribe();
        let handle = crate::spawn(async move {
            shutdown.wait().await;
            shutdown.is_terminated()
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        assert!(notifier.terminate());
        assert!(!notifier.terminate());
        assert!(handle.await.unwrap());

        // Subscribing after termination completes immediately.
        notifier.subscribe().wait().await;
    }

    #[voxdag_macro::test]
    async fn dropped_notifier_releases_waiters() {
        let notifier = ShutdownNotifier::new();
        let mut shutdown = notifier.subscribe();
        drop(notifier);
        shutdown.wait().await;
        assert!(!shutdown.is_terminated());
    }
}
