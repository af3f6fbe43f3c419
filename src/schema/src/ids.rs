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

//! Fixed-width identifiers.
//!
//! Local ids are much smaller stand-ins for version UUIDs, repository and data
//! names, so they are cheap to embed into keys. They are encoded big-endian to
//! keep byte order equal to numeric order.
//!
//! Decoding does no length checking of its own: the caller must supply at
//! least [`SIZE`](LocalId::SIZE) bytes, a shorter slice panics.

use std::fmt;
use std::str::FromStr;

use fnv::FnvHashMap;
use log::warn;
use paste::paste;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

macro_rules! local_id {
    ($(#[$meta:meta])* $name:ident, $repr:ty) => {
        paste! {
            $(#[$meta])*
            #[derive(
                Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub $repr);

            impl $name {
                /// The number of bytes of the encoded form.
                pub const SIZE: usize = core::mem::size_of::<$repr>();
                pub const MAX: $name = $name(<$repr>::MAX);

                #[inline]
                pub const fn new(id: $repr) -> Self {
                    $name(id)
                }

                #[inline]
                pub const fn get(self) -> $repr {
                    self.0
                }

                /// Returns the big-endian encoding.
                #[inline]
                pub fn to_bytes(self) -> [u8; core::mem::size_of::<$repr>()] {
                    self.0.to_be_bytes()
                }

                /// Decodes an id from the head of `bytes`, returning the id and
                /// the number of bytes consumed.
                ///
                /// # Panics
                ///
                /// Panics if `bytes` is shorter than [`Self::SIZE`].
                #[inline]
                pub fn from_bytes(bytes: &[u8]) -> (Self, usize) {
                    let (id, len) = voxdag_rock::num::[<read_ $repr>](bytes);
                    ($name(id), len)
                }
            }

            impl From<$repr> for $name {
                #[inline]
                fn from(id: $repr) -> Self {
                    $name(id)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        }
    };
}

macro_rules! server_local_id {
    ($(#[$meta:meta])* $name:ident) => {
        local_id!($(#[$meta])* $name, u32);

        impl $name {
            /// Valid ids are greater than 0. `0` and the max value are
            /// reserved.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 > 0 && self != Self::MAX
            }
        }
    };
}

local_id!(
    /// A small local id, unique within this server.
    LocalId,
    u16
);

local_id!(
    /// A 32-bit local id, unique within this server.
    LocalId32,
    u32
);

server_local_id!(
    /// A server-specific identifier of a data instance. An instance id is
    /// only used within one repo, so all key values of a repo can be reached
    /// by range scans over the instances of that repo.
    InstanceId
);

server_local_id!(
    /// A server-specific identifier of a repo.
    RepoId
);

server_local_id!(
    /// A server-specific identifier of a version, eg. a node of the DAG of a
    /// repo.
    VersionId
);

/// Remapping of instance ids, used when data moves between servers.
pub type InstanceMap = FnvHashMap<InstanceId, InstanceId>;

/// Remapping of version ids, used when data moves between servers.
pub type VersionMap = FnvHashMap<VersionId, VersionId>;

const UUID_BYTES: usize = 16;
const UUID_HEX_LEN: usize = UUID_BYTES * 2;

/// The globally unique identifier of a DAG node, rendered as 32 hex chars.
///
/// Nodes are created by independent servers, so the id must be universally
/// unique. The empty string is the nil uuid, it is never valid.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeUuid(String);

impl NodeUuid {
    pub const NIL: NodeUuid = NodeUuid(String::new());

    /// Generate a new random uuid. If the random source is unavailable the
    /// [`NodeUuid::NIL`] is returned, callers must check [`NodeUuid::is_nil`]
    /// before using it.
    pub fn generate() -> Self {
        let mut bytes = [0u8; UUID_BYTES];
        match OsRng.try_fill_bytes(&mut bytes) {
            Ok(()) => Self::from_random_bytes(&bytes),
            Err(err) => {
                warn!("generate node uuid: {err}");
                Self::NIL
            }
        }
    }

    fn from_random_bytes(bytes: &[u8]) -> Self {
        let Ok(bytes) = <[u8; UUID_BYTES]>::try_from(bytes) else {
            return Self::NIL;
        };
        let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
        NodeUuid(uuid.simple().to_string())
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for NodeUuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != UUID_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidUuid(s.to_owned()));
        }
        Ok(NodeUuid(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for NodeUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! name_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(v: String) -> Self {
                $name(v)
            }
        }

        impl From<&str> for $name {
            fn from(v: &str) -> Self {
                $name(v.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_string!(
    /// The name of a data instance.
    DataName
);

name_string!(
    /// The name of a data type.
    TypeName
);

name_string!(
    /// The URL of a data type.
    TypeUrl
);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn local_ids_are_big_endian() {
        assert_eq!(LocalId(0x0102).to_bytes(), [0x01, 0x02]);
        assert_eq!(LocalId32(0x01020304).to_bytes(), [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(InstanceId(1).to_bytes(), [0, 0, 0, 1]);
        assert_eq!(RepoId::SIZE, 4);
        assert_eq!(LocalId::SIZE, 2);
    }

    #[test]
    fn decode_from_head_of_slice() {
        let mut buf = VersionId(77).to_bytes().to_vec();
        buf.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(VersionId::from_bytes(&buf), (VersionId(77), 4));
        assert_eq!(LocalId::from_bytes(&[0xAA, 0xBB, 0xCC]), (LocalId(0xAABB), 2));
    }

    #[test]
    #[should_panic]
    fn decode_short_slice_panics() {
        InstanceId::from_bytes(&[0, 1]);
    }

    #[test]
    fn encoded_order_matches_numeric_order() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        for _ in 0..1000 {
            let (a, b) = (rng.gen::<u32>(), rng.gen::<u32>());
            assert_eq!(a.cmp(&b), InstanceId(a).to_bytes().cmp(&InstanceId(b).to_bytes()));
            let (a, b) = (rng.gen::<u16>(), rng.gen::<u16>());
            assert_eq!(a.cmp(&b), LocalId(a).to_bytes().cmp(&LocalId(b).to_bytes()));
        }
    }

    #[test]
    fn reserved_ids_are_invalid() {
        assert!(!InstanceId(0).is_valid());
        assert!(!RepoId::MAX.is_valid());
        assert!(VersionId(1).is_valid());
        assert!(VersionId(u32::MAX - 1).is_valid());
    }

    #[test]
    fn generate_unique_uuids() {
        let mut seen = HashSet::new();
        for _ in 0..256 {
            let uuid = NodeUuid::generate();
            assert!(!uuid.is_nil());
            assert_eq!(uuid.as_str().len(), 32);
            assert!(uuid.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
            assert!(seen.insert(uuid));
        }
    }

    #[test]
    fn unexpected_random_length_is_nil() {
        assert!(NodeUuid::from_random_bytes(&[1, 2, 3]).is_nil());
        assert!(NodeUuid::NIL.is_nil());
        assert_eq!(NodeUuid::default(), NodeUuid::NIL);
    }

    #[test]
    fn parse_uuid() {
        let uuid = NodeUuid::generate();
        let parsed: NodeUuid = uuid.to_string().to_uppercase().parse().unwrap();
        assert_eq!(parsed, uuid);

        assert!(matches!("".parse::<NodeUuid>(), Err(Error::InvalidUuid(_))));
        assert!("xyz".repeat(11)[..32].parse::<NodeUuid>().is_err());
    }
}
