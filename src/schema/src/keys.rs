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

//! The keyspace of voxel blocks and labels.
//!
//! Every index starts with a [`KeyType`] byte, so indices of different kinds
//! never interleave in a sorted store, including indices written by data
//! types embedding others. Components of an index:
//!
//! - `a`: original label
//! - `b`: mapped label
//! - `s`: spatial index, the coordinate of a block
//! - `v`: number of voxels of a label
//! - `n`: id of a graph vertex
//!
//! All numbers are big-endian. These layouts are the storage format, they must
//! never change.

use std::fmt;

use voxdag_rock::lexical::{lexical_next_boundary, prefix_range};
use voxdag_rock::num::decode_u64;

use crate::{Error, IndexZYX, Result};

/// The encoded form of a label.
pub type LabelBytes = [u8; LABEL_SIZE];

pub const LABEL_SIZE: usize = 8;

const MAP_INDEX_SIZE: usize = 1 + LABEL_SIZE + LABEL_SIZE;

#[inline]
pub fn label_bytes(label: u64) -> LabelBytes {
    label.to_be_bytes()
}

/// The first byte of an index, partitioning the keyspace.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyType {
    /// Never written, a check for corrupt or incorrectly set keys.
    Unknown = 0,
    /// `s`
    VoxelBlock = 1,
    /// `a+b`, eg. supervoxel + body.
    ForwardMap = 2,
    /// `b+a`
    InverseMap = 3,
    /// `s+a+b`, to compose label maps of a block.
    SpatialMap = 4,
    /// `b+s`, to find all blocks intersecting a label.
    LabelSpatialMap = 5,
    /// `v+b`, for size range queries.
    LabelSizes = 6,
    /// `b`, the value is the sparse volume of the label.
    LabelSurface = 7,
    /// `n`, the value is the vertex.
    GraphVertex = 8,
    /// `n+n`, written in both directions, the value is the edge.
    GraphEdge = 9,
}

impl KeyType {
    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// The range covering every index of this type.
    #[inline]
    pub fn index_range(self) -> (Vec<u8>, Vec<u8>) {
        prefix_range(&[self.as_byte()])
    }
}

/// The range covering every voxel and label index, graph indices excluded.
#[inline]
pub fn voxel_label_range() -> (Vec<u8>, Vec<u8>) {
    let start = vec![KeyType::VoxelBlock.as_byte()];
    let end = lexical_next_boundary(&[KeyType::LabelSurface.as_byte()]);
    (start, end)
}

impl TryFrom<u8> for KeyType {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self> {
        Ok(match v {
            0 => KeyType::Unknown,
            1 => KeyType::VoxelBlock,
            2 => KeyType::ForwardMap,
            3 => KeyType::InverseMap,
            4 => KeyType::SpatialMap,
            5 => KeyType::LabelSpatialMap,
            6 => KeyType::LabelSizes,
            7 => KeyType::LabelSurface,
            8 => KeyType::GraphVertex,
            9 => KeyType::GraphEdge,
            _ => return Err(Error::UnknownKeyType(v)),
        })
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::Unknown => "Unknown Key Type",
            KeyType::VoxelBlock => "Voxel block",
            KeyType::ForwardMap => "Forward Label Map",
            KeyType::InverseMap => "Inverse Label Map",
            KeyType::SpatialMap => "Spatial Index to Labels Map",
            KeyType::LabelSpatialMap => "Forward Label to Spatial Index Map",
            KeyType::LabelSizes => "Forward Label sorted by volume",
            KeyType::LabelSurface => "Forward Label Surface",
            KeyType::GraphVertex => "Graph Vertex",
            KeyType::GraphEdge => "Graph Edge",
        };
        f.write_str(name)
    }
}

/// Check the leading type byte, then the length of an index.
fn check_index(index: &[u8], expected: KeyType, min_len: usize) -> Result<()> {
    match index.first() {
        Some(&actual) if actual != expected.as_byte() => {
            Err(Error::KeyTypeMismatch { expected, actual })
        }
        _ if index.len() < min_len => Err(Error::InvalidIndexLength {
            key_type: expected,
            expected: min_len,
            actual: index.len(),
        }),
        _ => Ok(()),
    }
}

#[inline]
fn read_u64(bytes: &[u8]) -> u64 {
    decode_u64(&bytes[..8]).expect("slice has exactly 8 bytes")
}

#[inline]
fn read_label(bytes: &[u8]) -> LabelBytes {
    let mut label = [0u8; LABEL_SIZE];
    label.copy_from_slice(&bytes[..LABEL_SIZE]);
    label
}

/// Index of a voxel block. Index = s
pub fn voxel_block_index(block: &[u8]) -> Vec<u8> {
    let mut index = Vec::with_capacity(1 + block.len());
    index.push(KeyType::VoxelBlock.as_byte());
    index.extend_from_slice(block);
    index
}

/// Recover the ZYX block coordinate of a voxel block index.
pub fn decode_voxel_block_index(index: &[u8]) -> Result<IndexZYX> {
    const LEN: usize = 1 + IndexZYX::SIZE;
    check_index(index, KeyType::VoxelBlock, LEN)?;
    IndexZYX::from_bytes(&index[1..]).ok_or(Error::InvalidIndexLength {
        key_type: KeyType::VoxelBlock,
        expected: LEN,
        actual: index.len(),
    })
}

/// Index of mapping a label into another label. Index = a+b
pub fn forward_map_index(label: &LabelBytes, mapping: u64) -> Vec<u8> {
    let mut index = vec![0u8; MAP_INDEX_SIZE];
    index[0] = KeyType::ForwardMap.as_byte();
    index[1..9].copy_from_slice(label);
    index[9..17].copy_from_slice(&mapping.to_be_bytes());
    index
}

/// Returns `(label, mapping)` of a forward map index.
pub fn decode_forward_map_index(index: &[u8]) -> Result<(LabelBytes, u64)> {
    check_index(index, KeyType::ForwardMap, MAP_INDEX_SIZE)?;
    Ok((read_label(&index[1..9]), read_u64(&index[9..17])))
}

/// The index prefix of all forward mappings of a label.
pub fn forward_map_prefix(label: &LabelBytes) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(1 + LABEL_SIZE);
    prefix.push(KeyType::ForwardMap.as_byte());
    prefix.extend_from_slice(label);
    prefix
}

/// Index of the inverse of a label mapping. Index = b+a
pub fn inverse_map_index(label: &LabelBytes, mapping: u64) -> Vec<u8> {
    let mut index = vec![0u8; MAP_INDEX_SIZE];
    index[0] = KeyType::InverseMap.as_byte();
    index[1..9].copy_from_slice(&mapping.to_be_bytes());
    index[9..17].copy_from_slice(label);
    index
}

/// Returns `(mapping, label)` of an inverse map index.
pub fn decode_inverse_map_index(index: &[u8]) -> Result<(u64, LabelBytes)> {
    check_index(index, KeyType::InverseMap, MAP_INDEX_SIZE)?;
    Ok((read_u64(&index[1..9]), read_label(&index[9..17])))
}

/// The index prefix of all labels mapped to `mapping`.
pub fn inverse_map_prefix(mapping: u64) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(1 + LABEL_SIZE);
    prefix.push(KeyType::InverseMap.as_byte());
    prefix.extend_from_slice(&mapping.to_be_bytes());
    prefix
}

/// Index of the label mappings of a block. Index = s+a+b
///
/// The index can be updated in place, so remapping passes over the same
/// block reuse one buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpatialMapIndex(Vec<u8>);

impl SpatialMapIndex {
    /// Build an index, an absent `label` leaves the label field zeroed.
    pub fn new(block: &[u8], label: Option<&LabelBytes>, mapping: u64) -> Self {
        let mut index = vec![0u8; 1 + block.len() + 2 * LABEL_SIZE];
        index[0] = KeyType::SpatialMap.as_byte();
        index[1..1 + block.len()].copy_from_slice(block);
        let mut this = SpatialMapIndex(index);
        this.update(label, mapping);
        this
    }

    /// Rewrite the trailing label and mapping, the type and the spatial index
    /// are kept. An absent `label` keeps the label field unchanged.
    pub fn update(&mut self, label: Option<&LabelBytes>, mapping: u64) {
        let offset = self.0.len() - 2 * LABEL_SIZE;
        if let Some(label) = label {
            self.0[offset..offset + LABEL_SIZE].copy_from_slice(label);
        }
        self.0[offset + LABEL_SIZE..].copy_from_slice(&mapping.to_be_bytes());
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for SpatialMapIndex {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<SpatialMapIndex> for Vec<u8> {
    #[inline]
    fn from(index: SpatialMapIndex) -> Self {
        index.0
    }
}

/// Returns `(label, mapping)` of a spatial map index over a ZYX block.
pub fn decode_spatial_map_index(index: &[u8]) -> Result<(LabelBytes, u64)> {
    const LABEL_OFFSET: usize = 1 + IndexZYX::SIZE;
    check_index(index, KeyType::SpatialMap, LABEL_OFFSET + 2 * LABEL_SIZE)?;
    let label = read_label(&index[LABEL_OFFSET..]);
    let mapping = read_u64(&index[LABEL_OFFSET + LABEL_SIZE..]);
    Ok((label, mapping))
}

/// The index prefix of all label mappings of a block.
pub fn spatial_map_prefix(block: &[u8]) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(1 + block.len());
    prefix.push(KeyType::SpatialMap.as_byte());
    prefix.extend_from_slice(block);
    prefix
}

/// Index of a block containing a voxel of `label`. Index = b+s
///
/// The block index scheme (eg. ZYX, CZYX) is up to the caller.
pub fn label_spatial_map_index(label: u64, block: &[u8]) -> Vec<u8> {
    let mut index = label_spatial_map_prefix(label);
    index.extend_from_slice(block);
    index
}

/// Returns the label and the raw block index bytes of a label spatial map
/// index. Interpreting the block bytes is up to the caller.
pub fn decode_label_spatial_map_index(index: &[u8]) -> Result<(u64, &[u8])> {
    check_index(index, KeyType::LabelSpatialMap, 1 + LABEL_SIZE)?;
    Ok((read_u64(&index[1..9]), &index[9..]))
}

/// The index prefix of all blocks of a label.
pub fn label_spatial_map_prefix(label: u64) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(1 + LABEL_SIZE + IndexZYX::SIZE);
    prefix.push(KeyType::LabelSpatialMap.as_byte());
    prefix.extend_from_slice(&label.to_be_bytes());
    prefix
}

/// Index of a label sorted by its number of voxels. Index = v+b
pub fn label_sizes_index(size: u64, label: u64) -> Vec<u8> {
    let mut index = vec![0u8; MAP_INDEX_SIZE];
    index[0] = KeyType::LabelSizes.as_byte();
    index[1..9].copy_from_slice(&size.to_be_bytes());
    index[9..17].copy_from_slice(&label.to_be_bytes());
    index
}

/// Returns the label of a label sizes index. The size is only used for
/// ordering and is not returned.
pub fn decode_label_sizes_index(index: &[u8]) -> Result<u64> {
    check_index(index, KeyType::LabelSizes, MAP_INDEX_SIZE)?;
    Ok(read_u64(&index[9..17]))
}

/// The index range of labels with `min_size <= size <= max_size`.
pub fn label_sizes_range(min_size: u64, max_size: u64) -> (Vec<u8>, Vec<u8>) {
    let start = label_sizes_index(min_size, 0);
    let end = match max_size.checked_add(1) {
        Some(size) => label_sizes_index(size, 0),
        None => lexical_next_boundary(&[KeyType::LabelSizes.as_byte()]),
    };
    (start, end)
}

/// Index of the surface of a label. Index = b
pub fn label_surface_index(label: u64) -> Vec<u8> {
    let mut index = Vec::with_capacity(1 + LABEL_SIZE);
    index.push(KeyType::LabelSurface.as_byte());
    index.extend_from_slice(&label.to_be_bytes());
    index
}

pub fn decode_label_surface_index(index: &[u8]) -> Result<u64> {
    check_index(index, KeyType::LabelSurface, 1 + LABEL_SIZE)?;
    Ok(read_u64(&index[1..9]))
}

/// Index of a graph vertex. Index = n
pub fn graph_vertex_index(id: u64) -> Vec<u8> {
    let mut index = Vec::with_capacity(9);
    index.push(KeyType::GraphVertex.as_byte());
    index.extend_from_slice(&id.to_be_bytes());
    index
}

pub fn decode_graph_vertex_index(index: &[u8]) -> Result<u64> {
    check_index(index, KeyType::GraphVertex, 9)?;
    Ok(read_u64(&index[1..9]))
}

/// The index prefix of all edges incident to a vertex.
pub fn graph_edge_prefix(id: u64) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(17);
    prefix.push(KeyType::GraphEdge.as_byte());
    prefix.extend_from_slice(&id.to_be_bytes());
    prefix
}

/// Index of the edge between `a` and `b`, seen from `a`. Index = n+n
pub fn graph_edge_index(a: u64, b: u64) -> Vec<u8> {
    let mut index = graph_edge_prefix(a);
    index.extend_from_slice(&b.to_be_bytes());
    index
}

pub fn decode_graph_edge_index(index: &[u8]) -> Result<(u64, u64)> {
    check_index(index, KeyType::GraphEdge, 17)?;
    Ok((read_u64(&index[1..9]), read_u64(&index[9..17])))
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use voxdag_rock::lexical::in_range;

    use super::*;

    #[test]
    fn forward_map_layout() {
        let index = forward_map_index(&label_bytes(1), 2);
        assert_eq!(
            index,
            vec![0x02, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2],
        );
    }

    #[test]
    fn map_indices_round_trip() {
        let mut rng = SmallRng::seed_from_u64(17);
        for _ in 0..256 {
            let label = label_bytes(rng.gen());
            let mapping = rng.gen();
            let forward = forward_map_index(&label, mapping);
            assert_eq!(decode_forward_map_index(&forward).unwrap(), (label, mapping));
            let inverse = inverse_map_index(&label, mapping);
            assert_eq!(decode_inverse_map_index(&inverse).unwrap(), (mapping, label));
        }
    }

    #[test]
    fn decoders_reject_other_key_types() {
        let sizes = label_sizes_index(100, 3);
        assert_eq!(
            decode_forward_map_index(&sizes),
            Err(Error::KeyTypeMismatch { expected: KeyType::ForwardMap, actual: 6 }),
        );
        let surface = label_surface_index(3);
        assert!(matches!(
            decode_label_sizes_index(&surface),
            Err(Error::KeyTypeMismatch { expected: KeyType::LabelSizes, actual: 7 })
        ));
        let block = voxel_block_index(&IndexZYX::new(1, 1, 1).to_bytes());
        assert!(decode_spatial_map_index(&block).is_err());
        assert!(decode_label_spatial_map_index(&block).is_err());
        assert!(decode_inverse_map_index(&block).is_err());
        assert!(decode_label_surface_index(&block).is_err());
        assert!(decode_voxel_block_index(&surface).is_err());
    }

    #[test]
    fn mismatch_error_message() {
        let err = decode_forward_map_index(&label_sizes_index(1, 1)).unwrap_err();
        assert_eq!(err.to_string(), "expected Forward Label Map index, got 6 byte instead");
    }

    #[test]
    fn short_indices_are_rejected() {
        let index = forward_map_index(&label_bytes(9), 9);
        assert_eq!(
            decode_forward_map_index(&index[..10]),
            Err(Error::InvalidIndexLength {
                key_type: KeyType::ForwardMap,
                expected: 17,
                actual: 10
            }),
        );
        assert!(decode_label_sizes_index(&[]).is_err());
        assert!(decode_voxel_block_index(&[KeyType::VoxelBlock.as_byte(); 20]).is_err());
    }

    #[test]
    fn label_surface_orders_by_label() {
        let mut rng = SmallRng::seed_from_u64(23);
        for _ in 0..1000 {
            let (a, b): (u64, u64) = (rng.gen(), rng.gen());
            assert_eq!(a.cmp(&b), label_surface_index(a).cmp(&label_surface_index(b)));
        }
        assert!(label_surface_index(255) < label_surface_index(256));
        assert_eq!(decode_label_surface_index(&label_surface_index(99)).unwrap(), 99);
    }

    #[test]
    fn label_sizes_order_by_size() {
        let mut rng = SmallRng::seed_from_u64(29);
        for _ in 0..1000 {
            let (s1, s2, label): (u64, u64, u64) = (rng.gen(), rng.gen(), rng.gen());
            assert_eq!(s1.cmp(&s2), label_sizes_index(s1, label).cmp(&label_sizes_index(s2, label)));
        }
        assert!(label_sizes_index(1, u64::MAX) < label_sizes_index(2, 0));
        assert_eq!(decode_label_sizes_index(&label_sizes_index(10, 4)).unwrap(), 4);
    }

    #[test]
    fn label_sizes_range_is_inclusive() {
        let (start, end) = label_sizes_range(10, 20);
        assert!(in_range(&start, &end, &label_sizes_index(10, 0)));
        assert!(in_range(&start, &end, &label_sizes_index(20, u64::MAX)));
        assert!(!in_range(&start, &end, &label_sizes_index(9, u64::MAX)));
        assert!(!in_range(&start, &end, &label_sizes_index(21, 0)));

        let (start, end) = label_sizes_range(0, u64::MAX);
        assert_eq!(end, vec![KeyType::LabelSurface.as_byte()]);
        assert!(in_range(&start, &end, &label_sizes_index(u64::MAX, u64::MAX)));
    }

    #[test]
    fn spatial_map_update_equals_fresh_build() {
        let block = IndexZYX::new(-4, 18, 7).to_bytes();
        let mut index = SpatialMapIndex::new(&block, Some(&label_bytes(1)), 2);
        index.update(Some(&label_bytes(0xDEAD)), 0xBEEF);
        assert_eq!(index, SpatialMapIndex::new(&block, Some(&label_bytes(0xDEAD)), 0xBEEF));
        assert_eq!(&index.as_bytes()[1..13], &block);
        assert_eq!(
            decode_spatial_map_index(index.as_bytes()).unwrap(),
            (label_bytes(0xDEAD), 0xBEEF)
        );
    }

    #[test]
    fn spatial_map_absent_label() {
        let block = IndexZYX::new(0, 0, 0).to_bytes();
        let mut index = SpatialMapIndex::new(&block, None, 5);
        assert_eq!(decode_spatial_map_index(index.as_bytes()).unwrap(), ([0; 8], 5));

        index.update(Some(&label_bytes(3)), 5);
        index.update(None, 6);
        assert_eq!(decode_spatial_map_index(index.as_bytes()).unwrap(), (label_bytes(3), 6));
        assert_eq!(index.into_bytes().len(), 1 + IndexZYX::SIZE + 16);
    }

    #[test]
    fn label_spatial_map_keeps_block_bytes() {
        let czyx = crate::IndexCZYX::new(2, IndexZYX::new(1, 2, 3)).to_bytes();
        let index = label_spatial_map_index(77, &czyx);
        let (label, block) = decode_label_spatial_map_index(&index).unwrap();
        assert_eq!(label, 77);
        assert_eq!(block, &czyx);

        let (start, end) = prefix_range(&label_spatial_map_prefix(77));
        assert!(in_range(&start, &end, &index));
        assert!(!in_range(&start, &end, &label_spatial_map_index(78, &czyx)));
    }

    #[test]
    fn voxel_block_round_trip() {
        let block = IndexZYX::new(3, -2, 1);
        let index = voxel_block_index(&block.to_bytes());
        assert_eq!(index[0], 1);
        assert_eq!(decode_voxel_block_index(&index).unwrap(), block);
    }

    #[test]
    fn key_types_partition_keyspace() {
        for byte in 0..=9u8 {
            let key_type = KeyType::try_from(byte).unwrap();
            assert_eq!(key_type.as_byte(), byte);
            let (start, end) = key_type.index_range();
            assert_eq!(start, vec![byte]);
            assert_eq!(end, vec![byte + 1]);
        }
        assert_eq!(KeyType::try_from(10), Err(Error::UnknownKeyType(10)));

        let (start, end) = KeyType::ForwardMap.index_range();
        assert!(in_range(&start, &end, &forward_map_index(&[0xFF; 8], u64::MAX)));
        assert!(!in_range(&start, &end, &inverse_map_index(&[0; 8], 0)));
    }

    #[test]
    fn graph_indices_stay_out_of_voxel_ranges() {
        let vertex = graph_vertex_index(1);
        let edge = graph_edge_index(1, 2);
        assert_eq!(decode_graph_vertex_index(&vertex).unwrap(), 1);
        assert_eq!(decode_graph_edge_index(&edge).unwrap(), (1, 2));
        assert!(decode_voxel_block_index(&vertex).is_err());
        assert!(decode_forward_map_index(&edge).is_err());

        let (start, end) = voxel_label_range();
        assert!(!in_range(&start, &end, &vertex));
        assert!(!in_range(&start, &end, &edge));
        assert!(in_range(&start, &end, &voxel_block_index(&IndexZYX::new(0, 0, 0).to_bytes())));
        assert!(in_range(&start, &end, &label_surface_index(u64::MAX)));

        let (start, end) = KeyType::VoxelBlock.index_range();
        assert!(!in_range(&start, &end, &vertex));
        let (start, end) = prefix_range(&graph_edge_prefix(1));
        assert!(in_range(&start, &end, &edge));
        assert!(!in_range(&start, &end, &graph_edge_index(2, 1)));
    }
}
