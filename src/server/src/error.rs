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

use crate::engine::Capability;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    // configuration errors
    #[error("{engine} engine does not support {capability}")]
    MissingCapability { engine: String, capability: Capability },

    #[error("invalid argument {0}")]
    InvalidArgument(String),

    #[error("datastore {0} is already opened by another process")]
    AlreadyOpened(String),

    // lifecycle errors
    #[error("service is not running")]
    NotRunning,

    #[error("engine {0} is closed")]
    EngineClosed(String),

    // internal errors
    #[error("invalid {0} data")]
    InvalidData(String),

    #[error("request canceled")]
    Canceled,

    #[error("schema {0}")]
    Schema(#[from] voxdag_schema::Error),

    #[error("io {0}")]
    Io(#[from] std::io::Error),

    #[error("json {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "rocksdb")]
    #[error("rocksdb {0}")]
    RocksDb(#[from] rocksdb::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<voxdag_runtime::JoinError> for Error {
    fn from(err: voxdag_runtime::JoinError) -> Self {
        if err.is_cancelled() {
            Error::Canceled
        } else {
            std::panic::resume_unwind(err.into_panic());
        }
    }
}
