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

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{info, warn};
use voxdag_rock::fs::{create_dir_all_if_not_exists, open_append, LockFile};
use voxdag_runtime::{DrainOutcome, Executor, Governor, ShutdownNotifier, TaskGroup};
use voxdag_schema::{Data, DataContext, VersionId};

use crate::engine::{Engines, GraphHandle};
use crate::metrics::SERVICE_SHUTDOWN_DURATION_SECONDS;
use crate::tiers::StorageTiers;
use crate::voxels::VoxelStore;
use crate::{Config, Error, Result};

/// Only one process may serve a datastore directory.
pub const LOCK_FILENAME: &str = "voxdag.lock";

/// Errors are appended to this file inside the datastore directory.
pub const ERROR_LOG_FILENAME: &str = "voxdag-errors.log";

pub fn error_log_path(root_dir: &Path) -> PathBuf {
    root_dir.join(ERROR_LOG_FILENAME)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownStage {
    Running,
    /// Waiting for handler tokens.
    Draining,
    /// Waiting for native call regions.
    NativeCallDrain,
    StorageEngineShutdown,
    Terminated,
}

impl fmt::Display for ShutdownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            ShutdownStage::Running => "running",
            ShutdownStage::Draining => "draining handlers",
            ShutdownStage::NativeCallDrain => "draining native calls",
            ShutdownStage::StorageEngineShutdown => "closing storage engines",
            ShutdownStage::Terminated => "terminated",
        };
        f.write_str(stage)
    }
}

#[derive(Clone, Debug)]
pub struct ShutdownReport {
    pub handlers: DrainOutcome,
    pub native_calls: DrainOutcome,
    pub engines_closed: bool,
    pub elapsed: Duration,
    pub uptime: Duration,
}

/// A datastore served by this process.
pub struct Service {
    root_dir: PathBuf,
    error_log: PathBuf,
    error_log_file: Mutex<File>,
    executor: Executor,
    governor: Arc<Governor>,
    engines: Engines,
    tiers: StorageTiers,
    stage: Mutex<ShutdownStage>,
    notifier: ShutdownNotifier,
    tasks: TaskGroup,
    started_at: Instant,
    _lock: LockFile,
}

impl Service {
    /// Take exclusive ownership of the datastore at `cfg.root_dir`, then set
    /// up engines, tiers and the governor.
    pub fn open(cfg: &Config, executor: Executor) -> Result<Self> {
        let root_dir = cfg.root_dir.clone();
        create_dir_all_if_not_exists(&root_dir)?;
        let lock = LockFile::try_acquire(root_dir.join(LOCK_FILENAME))?
            .ok_or_else(|| Error::AlreadyOpened(root_dir.display().to_string()))?;
        info!("take exclusive ownership of datastore {}", root_dir.display());

        let error_log = error_log_path(&root_dir);
        let error_log_file = open_append(&error_log)?;

        let engines = Engines::setup(&root_dir, &cfg.engine)?;
        let governor = Arc::new(Governor::new(cfg.governor.clone()));
        let tiers = StorageTiers::new(&engines, &governor);

        let notifier = ShutdownNotifier::new();
        let tasks = TaskGroup::default();
        tasks.add_task(governor.spawn_load_sampler(&executor, notifier.subscribe()));

        info!("datastore {} is running", root_dir.display());
        Ok(Service {
            root_dir,
            error_log,
            error_log_file: Mutex::new(error_log_file),
            executor,
            governor,
            engines,
            tiers,
            stage: Mutex::new(ShutdownStage::Running),
            notifier,
            tasks,
            started_at: Instant::now(),
            _lock: lock,
        })
    }

    #[inline]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// The error log of the datastore. The service appends the failures of
    /// its shutdown, other errors are written by the logger of the process.
    #[inline]
    pub fn error_log(&self) -> &Path {
        &self.error_log
    }

    #[inline]
    pub fn governor(&self) -> &Arc<Governor> {
        &self.governor
    }

    #[inline]
    pub fn tiers(&self) -> &StorageTiers {
        &self.tiers
    }

    #[inline]
    pub fn graph(&self) -> &GraphHandle {
        self.engines.graph()
    }

    /// The voxel store of `data` at `version`.
    pub fn voxel_store(&self, data: &dyn Data, version: VersionId) -> VoxelStore {
        VoxelStore::new(
            DataContext::for_data(data, version),
            self.governor.clone(),
            self.tiers.clone(),
            self.executor.clone(),
        )
    }

    pub fn stage(&self) -> ShutdownStage {
        *self.stage.lock().expect("Poisoned")
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.stage() == ShutdownStage::Running
    }

    #[inline]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Wait for handlers and native calls, then close the storage engines.
    ///
    /// Each wait is bounded, so this always completes. Returns
    /// [`Error::NotRunning`] if the shutdown was already started.
    pub async fn shutdown(&self) -> Result<ShutdownReport> {
        self.transit(ShutdownStage::Running, ShutdownStage::Draining)?;
        let _timer = SERVICE_SHUTDOWN_DURATION_SECONDS.start_timer();
        let start = Instant::now();
        info!("shutdown datastore {} after {:?}", self.root_dir.display(), self.uptime());
        self.notifier.terminate();

        let handlers = self.governor.drain_handlers().await;
        if let DrainOutcome::TimedOut { waits, remaining } = handlers {
            self.append_error(format_args!(
                "{remaining} handlers still active after {waits} waits"
            ));
        }
        self.set_stage(ShutdownStage::NativeCallDrain);
        let native_calls = self.governor.drain_native_calls().await;
        if let DrainOutcome::TimedOut { waits, remaining } = native_calls {
            self.append_error(format_args!(
                "{remaining} native calls still active after {waits} waits"
            ));
        }

        self.set_stage(ShutdownStage::StorageEngineShutdown);
        let engines_closed = match self.engines.close() {
            Ok(()) => true,
            Err(err) => {
                warn!("close storage engines of {}: {err}", self.root_dir.display());
                self.append_error(format_args!("close storage engines: {err}"));
                false
            }
        };
        self.tasks.abort_all();
        self.set_stage(ShutdownStage::Terminated);

        let report = ShutdownReport {
            handlers,
            native_calls,
            engines_closed,
            elapsed: start.elapsed(),
            uptime: self.uptime(),
        };
        info!("datastore {} is terminated: {report:?}", self.root_dir.display());
        Ok(report)
    }

    fn append_error(&self, msg: fmt::Arguments<'_>) {
        let mut file = self.error_log_file.lock().expect("Poisoned");
        if let Err(err) = writeln!(file, "shutdown datastore {}: {msg}", self.root_dir.display()) {
            warn!("write error log {}: {err}", self.error_log.display());
        }
    }

    fn transit(&self, from: ShutdownStage, to: ShutdownStage) -> Result<()> {
        let mut stage = self.stage.lock().expect("Poisoned");
        if *stage != from {
            return Err(Error::NotRunning);
        }
        info!("service stage {} => {}", *stage, to);
        *stage = to;
        Ok(())
    }

    fn set_stage(&self, to: ShutdownStage) {
        let mut stage = self.stage.lock().expect("Poisoned");
        info!("service stage {} => {}", *stage, to);
        *stage = to;
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;
    use voxdag_rock::fn_name;
    use voxdag_runtime::GovernorConfig;

    use super::*;

    fn config(dir: &Path) -> Config {
        Config {
            root_dir: dir.to_owned(),
            governor: GovernorConfig { drain_interval_ms: 10, ..Default::default() },
            ..Default::default()
        }
    }

    #[voxdag_macro::test]
    async fn second_open_is_rejected() {
        let dir = TempDir::new(fn_name!()).unwrap();
        let cfg = config(dir.path());
        let service = Service::open(&cfg, voxdag_runtime::current()).unwrap();
        assert!(service.error_log().exists());

        let err = Service::open(&cfg, voxdag_runtime::current()).err().unwrap();
        assert!(matches!(err, Error::AlreadyOpened(_)));

        service.shutdown().await.unwrap();
        drop(service);
        let service = Service::open(&cfg, voxdag_runtime::current()).unwrap();
        service.shutdown().await.unwrap();
    }

    #[voxdag_macro::test]
    async fn shutdown_runs_once() {
        let dir = TempDir::new(fn_name!()).unwrap();
        let service = Service::open(&config(dir.path()), voxdag_runtime::current()).unwrap();
        assert_eq!(service.stage(), ShutdownStage::Running);

        let report = service.shutdown().await.unwrap();
        assert!(report.handlers.is_drained());
        assert!(report.native_calls.is_drained());
        assert!(report.engines_closed);
        assert_eq!(service.stage(), ShutdownStage::Terminated);
        assert!(!service.is_running());
        assert!(std::fs::read_to_string(service.error_log()).unwrap().is_empty());

        assert!(matches!(service.shutdown().await, Err(Error::NotRunning)));
    }

    #[voxdag_macro::test]
    async fn shutdown_gives_up_on_stuck_work() {
        let dir = TempDir::new(fn_name!()).unwrap();
        let service = Service::open(&config(dir.path()), voxdag_runtime::current()).unwrap();
        let _token = service.governor().acquire_handler().await;
        let _native = service.governor().native_call();

        let report = service.shutdown().await.unwrap();
        assert_eq!(report.handlers, DrainOutcome::TimedOut { waits: 20, remaining: 1 });
        assert_eq!(report.native_calls, DrainOutcome::TimedOut { waits: 5, remaining: 1 });
        assert!(report.engines_closed);
        assert_eq!(service.stage(), ShutdownStage::Terminated);

        let log = std::fs::read_to_string(service.error_log()).unwrap();
        assert!(log.contains("1 handlers still active after 20 waits"));
        assert!(log.contains("1 native calls still active after 5 waits"));
    }
}
