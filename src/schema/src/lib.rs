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

//! Identifiers and the binary keyspace of voxdag.
//!
//! Logical entities (repositories, versions, data instances, voxel blocks,
//! labels and label mappings) are turned into compact keys whose byte order
//! matches the order required by range scans over a sorted key-value store.

pub mod block;
pub mod context;
pub mod data;
mod error;
pub mod ids;
pub mod keys;

pub use self::block::{IndexCZYX, IndexZYX};
pub use self::context::DataContext;
pub use self::data::{Data, DataInstance};
pub use self::error::{Error, Result};
pub use self::ids::*;
pub use self::keys::KeyType;
