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

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use voxdag_rock::fs::{create_dir_all_if_not_exists, open_append};
use voxdag_runtime::{Executor, ExecutorOwner};
use voxdag_server::{error_log_path, Config, Service};

#[derive(Parser)]
#[clap(version, about = "A versioned voxel and label datastore")]
struct Command {
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(clap::Subcommand)]
enum SubCommand {
    Start(StartCommand),
}

#[derive(Parser)]
#[clap(about = "Serve a datastore until SIGINT or SIGTERM")]
struct StartCommand {
    /// Sets the TOML config file. Keys may also be set by `VOXDAG__` prefixed
    /// environment variables, e.g. `VOXDAG__GOVERNOR__MAX_CHUNK_HANDLERS=8`.
    #[clap(long)]
    conf: Option<String>,

    /// Sets the datastore directory.
    #[clap(long)]
    root_dir: Option<PathBuf>,

    /// Sets the number of executor threads.
    #[clap(long)]
    num_threads: Option<usize>,

    /// Print the resolved config and exit.
    #[clap(long)]
    dump_config: bool,
}

impl StartCommand {
    fn run(self) -> Result<()> {
        let cfg = self.load_config()?;
        if self.dump_config {
            print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            return Ok(());
        }

        create_dir_all_if_not_exists(&cfg.root_dir)
            .with_context(|| format!("create datastore directory {}", cfg.root_dir.display()))?;
        init_tracing(&error_log_path(&cfg.root_dir))?;

        let owner = ExecutorOwner::with_config(cfg.num_threads, cfg.executor.clone());
        let executor = owner.executor();
        executor.block_on(serve(cfg, executor.clone()))
    }

    fn load_config(&self) -> Result<Config> {
        let mut builder = config::Config::builder();
        if let Some(conf) = &self.conf {
            builder = builder.add_source(config::File::with_name(conf));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("VOXDAG")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        let mut cfg: Config =
            builder.build()?.try_deserialize().context("deserialize config")?;
        if let Some(root_dir) = &self.root_dir {
            cfg.root_dir = root_dir.clone();
        }
        if let Some(num_threads) = self.num_threads {
            cfg.num_threads = num_threads;
        }
        Ok(cfg)
    }
}

/// Log to stderr, filtered by `RUST_LOG`, and append errors to the error log
/// of the datastore.
fn init_tracing(error_log: &Path) -> Result<()> {
    let file: File = open_append(error_log)
        .with_context(|| format!("open error log {}", error_log.display()))?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(atty::is(atty::Stream::Stderr))
                .with_filter(filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(LevelFilter::ERROR),
        )
        .init();
    Ok(())
}

async fn serve(cfg: Config, executor: Executor) -> Result<()> {
    let service = Service::open(&cfg, executor)
        .with_context(|| format!("open datastore {}", cfg.root_dir.display()))?;
    wait_for_signal().await;

    let report = service.shutdown().await?;
    info!(
        "datastore {} is terminated, handlers {:?}, native calls {:?}, engines closed {}, took {:?}",
        service.root_dir().display(),
        report.handlers,
        report.native_calls,
        report.engines_closed,
        report.elapsed,
    );
    if !report.handlers.is_drained() || !report.native_calls.is_drained() {
        warn!("datastore {} is terminated with work in flight", service.root_dir().display());
    }
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("install SIGINT handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("receive SIGINT, shutdown"),
        _ = terminate => info!("receive SIGTERM, shutdown"),
    }
}

fn main() -> Result<()> {
    let cmd = Command::parse();
    match cmd.subcmd {
        SubCommand::Start(cmd) => cmd.run(),
    }
}
