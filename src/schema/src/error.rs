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
use crate::keys::KeyType;
use crate::DataContext;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("expected {expected} index, got {actual} byte instead")]
    KeyTypeMismatch { expected: KeyType, actual: u8 },

    #[error("unknown key type byte {0}")]
    UnknownKeyType(u8),

    #[error("invalid {key_type} index length {actual}, expect {expected}")]
    InvalidIndexLength { key_type: KeyType, expected: usize, actual: usize },

    #[error("key with {0} bytes is shorter than a data context")]
    KeyTooShort(usize),

    #[error("key does not belong to {0}")]
    ContextMismatch(DataContext),

    #[error("invalid uuid {0:?}")]
    InvalidUuid(String),

    #[error("instance id of data {0} is already reassigned")]
    InstanceIdReassigned(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
