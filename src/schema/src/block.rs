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

//! Spatial indices of blocks.
//!
//! Coordinates are signed, so each component is stored big-endian with the
//! sign bit flipped: the byte order of an encoded index is the z, then y, then
//! x order of the coordinate.

use std::fmt;

use serde::{Deserialize, Serialize};
use voxdag_rock::num::decode_u32;

const SIGN_BIT: u32 = 0x8000_0000;

#[inline]
fn encode_coord(v: i32) -> [u8; 4] {
    ((v as u32) ^ SIGN_BIT).to_be_bytes()
}

#[inline]
fn decode_coord(bytes: &[u8]) -> Option<i32> {
    decode_u32(bytes).map(|v| (v ^ SIGN_BIT) as i32)
}

/// The coordinate of a block, indexed in z, y, x order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexZYX {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl IndexZYX {
    pub const SIZE: usize = 12;

    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        IndexZYX { x, y, z }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&encode_coord(self.z));
        buf[4..8].copy_from_slice(&encode_coord(self.y));
        buf[8..12].copy_from_slice(&encode_coord(self.x));
        buf
    }

    /// Decode an index, `None` is returned if `bytes` is not exactly
    /// [`IndexZYX::SIZE`] long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        Some(IndexZYX {
            z: decode_coord(&bytes[0..4])?,
            y: decode_coord(&bytes[4..8])?,
            x: decode_coord(&bytes[8..12])?,
        })
    }
}

impl fmt::Display for IndexZYX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A block coordinate within a channel, indexed in channel, z, y, x order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexCZYX {
    pub channel: i32,
    pub zyx: IndexZYX,
}

impl IndexCZYX {
    pub const SIZE: usize = 4 + IndexZYX::SIZE;

    #[inline]
    pub const fn new(channel: i32, zyx: IndexZYX) -> Self {
        IndexCZYX { channel, zyx }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&encode_coord(self.channel));
        buf[4..].copy_from_slice(&self.zyx.to_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        Some(IndexCZYX {
            channel: decode_coord(&bytes[0..4])?,
            zyx: IndexZYX::from_bytes(&bytes[4..])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zyx_layout() {
        let index = IndexZYX::new(1, 2, 3);
        assert_eq!(
            index.to_bytes(),
            [0x80, 0, 0, 3, 0x80, 0, 0, 2, 0x80, 0, 0, 1],
        );
        assert_eq!(IndexZYX::from_bytes(&index.to_bytes()), Some(index));
        assert_eq!(IndexZYX::from_bytes(&[0; 11]), None);
    }

    #[test]
    fn zyx_orders_by_z_then_y_then_x() {
        let mut indices = vec![
            IndexZYX::new(5, 0, 1),
            IndexZYX::new(-3, 0, 0),
            IndexZYX::new(0, -1, 0),
            IndexZYX::new(7, 2, -8),
            IndexZYX::new(-9, 2, -8),
        ];
        let mut encoded: Vec<_> = indices.iter().map(IndexZYX::to_bytes).collect();
        indices.sort_by_key(|i| (i.z, i.y, i.x));
        encoded.sort();
        let decoded: Vec<_> =
            encoded.iter().map(|b| IndexZYX::from_bytes(b).unwrap()).collect();
        assert_eq!(decoded, indices);
    }

    #[test]
    fn czyx_prefixes_channel() {
        let index = IndexCZYX::new(-1, IndexZYX::new(4, 5, 6));
        let bytes = index.to_bytes();
        assert_eq!(&bytes[..4], &[0x7F, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[4..], &IndexZYX::new(4, 5, 6).to_bytes());
        assert_eq!(IndexCZYX::from_bytes(&bytes), Some(index));
    }
}
