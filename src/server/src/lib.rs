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

//! The voxdag datastore service: storage engines probed for capabilities,
//! the three storage tiers, the voxel and label store, and the lifecycle of a
//! datastore served by one process.

mod config;
mod error;
mod metrics;
mod service;

pub mod engine;
pub mod tiers;
pub mod voxels;

pub use crate::config::*;
pub use crate::error::{Error, Result};
pub use crate::service::{
    error_log_path, Service, ShutdownReport, ShutdownStage, ERROR_LOG_FILENAME, LOCK_FILENAME,
};
pub use crate::tiers::{StorageTiers, Tier, TierKind};
pub use crate::voxels::VoxelStore;
