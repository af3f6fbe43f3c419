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

use voxdag_rock::lexical::prefix_range;

use crate::{Data, Error, InstanceId, InstanceMap, KeyType, Result, VersionId, VersionMap};

/// The version used by the keys of unversioned data.
pub const UNVERSIONED: VersionId = VersionId(0);

/// The scope of the keys of one data instance at one version.
///
/// A fully-qualified key is `instance id (4) + version id (4) + index`, so all
/// keys of an instance are contiguous, and within it all keys of a version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DataContext {
    instance: InstanceId,
    version: VersionId,
}

impl DataContext {
    /// The number of bytes a context prepends to an index.
    pub const SIZE: usize = InstanceId::SIZE + VersionId::SIZE;

    #[inline]
    pub const fn new(instance: InstanceId, version: VersionId) -> Self {
        DataContext { instance, version }
    }

    /// The context of `data` at `version`. Unversioned data ignores the
    /// version and always uses [`UNVERSIONED`].
    pub fn for_data(data: &dyn Data, version: VersionId) -> Self {
        let version = if data.versioned() { version } else { UNVERSIONED };
        DataContext { instance: data.instance_id(), version }
    }

    #[inline]
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    #[inline]
    pub fn version(&self) -> VersionId {
        self.version
    }

    pub fn prefix(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[..InstanceId::SIZE].copy_from_slice(&self.instance.to_bytes());
        buf[InstanceId::SIZE..].copy_from_slice(&self.version.to_bytes());
        buf
    }

    /// Qualify an index with this context.
    pub fn construct_key(&self, index: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(Self::SIZE + index.len());
        key.extend_from_slice(&self.prefix());
        key.extend_from_slice(index);
        key
    }

    /// Strip the context from a key and return the index.
    pub fn index_from_key<'a>(&self, key: &'a [u8]) -> Result<&'a [u8]> {
        if key.len() < Self::SIZE {
            return Err(Error::KeyTooShort(key.len()));
        }
        let (prefix, index) = key.split_at(Self::SIZE);
        if prefix != &self.prefix()[..] {
            return Err(Error::ContextMismatch(*self));
        }
        Ok(index)
    }

    /// The range of all keys of this context.
    #[inline]
    pub fn key_range(&self) -> (Vec<u8>, Vec<u8>) {
        prefix_range(&self.prefix())
    }

    /// The range of keys whose index starts with `index_prefix`.
    #[inline]
    pub fn prefix_range(&self, index_prefix: &[u8]) -> (Vec<u8>, Vec<u8>) {
        prefix_range(&self.construct_key(index_prefix))
    }

    /// The range of keys whose index has the given type.
    #[inline]
    pub fn key_type_range(&self, key_type: KeyType) -> (Vec<u8>, Vec<u8>) {
        self.prefix_range(&[key_type.as_byte()])
    }

    /// Qualify both bounds of an index range. An empty index `end` is mapped
    /// to the end of this context.
    pub fn qualify_range(&self, start: &[u8], end: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let start = self.construct_key(start);
        let end = if end.is_empty() { self.key_range().1 } else { self.construct_key(end) };
        (start, end)
    }

    /// The context after moving the data to a server with other ids. Ids
    /// absent from the maps are kept.
    pub fn remap(&self, instances: &InstanceMap, versions: &VersionMap) -> Self {
        let instance = instances.get(&self.instance).copied().unwrap_or(self.instance);
        let version = versions.get(&self.version).copied().unwrap_or(self.version);
        DataContext { instance, version }
    }
}

impl fmt::Display for DataContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance {} version {}", self.instance, self.version)
    }
}

#[cfg(test)]
mod tests {
    use voxdag_rock::lexical::in_range;

    use super::*;
    use crate::keys::label_surface_index;
    use crate::DataInstance;

    #[test]
    fn construct_and_strip_key() {
        let ctx = DataContext::new(InstanceId(2), VersionId(9));
        let index = label_surface_index(42);
        let key = ctx.construct_key(&index);
        assert_eq!(&key[..8], &[0, 0, 0, 2, 0, 0, 0, 9]);
        assert_eq!(ctx.index_from_key(&key).unwrap(), index.as_slice());

        assert_eq!(ctx.index_from_key(&key[..5]), Err(Error::KeyTooShort(5)));
        let other = DataContext::new(InstanceId(2), VersionId(10));
        assert_eq!(other.index_from_key(&key), Err(Error::ContextMismatch(other)));
    }

    #[test]
    fn ranges_group_keys() {
        let ctx = DataContext::new(InstanceId(1), VersionId(1));
        let surface = ctx.construct_key(&label_surface_index(7));

        let (start, end) = ctx.key_range();
        assert!(in_range(&start, &end, &surface));

        let (start, end) = ctx.key_type_range(KeyType::LabelSurface);
        assert!(in_range(&start, &end, &surface));
        let (start, end) = ctx.key_type_range(KeyType::LabelSizes);
        assert!(!in_range(&start, &end, &surface));

        let next = DataContext::new(InstanceId(1), VersionId(2));
        let (start, end) = ctx.key_range();
        assert!(!in_range(&start, &end, &next.construct_key(&label_surface_index(7))));
    }

    #[test]
    fn qualify_open_range() {
        let ctx = DataContext::new(InstanceId(4), VersionId(1));
        let (start, end) = ctx.qualify_range(&[KeyType::LabelSizes.as_byte()], &[]);
        assert_eq!(start, ctx.construct_key(&[6]));
        assert_eq!(end, ctx.key_range().1);
    }

    #[test]
    fn unversioned_data_shares_keys() {
        let data = DataInstance::new("roi", InstanceId(5), "roi", "roi", "0.1", false);
        let v1 = DataContext::for_data(&data, VersionId(1));
        let v2 = DataContext::for_data(&data, VersionId(2));
        assert_eq!(v1, v2);
        assert_eq!(v1.version(), UNVERSIONED);
        assert_eq!(v1.instance(), InstanceId(5));
    }

    #[test]
    fn remap_moved_context() {
        let ctx = DataContext::new(InstanceId(3), VersionId(8));
        let mut instances = InstanceMap::default();
        instances.insert(InstanceId(3), InstanceId(30));
        let mut versions = VersionMap::default();
        versions.insert(VersionId(8), VersionId(80));
        versions.insert(VersionId(9), VersionId(90));

        let moved = ctx.remap(&instances, &versions);
        assert_eq!(moved, DataContext::new(InstanceId(30), VersionId(80)));
        assert_eq!(&moved.construct_key(&[1])[..8], &[0, 0, 0, 30, 0, 0, 0, 80]);

        let other = DataContext::new(InstanceId(4), VersionId(9));
        assert_eq!(other.remap(&instances, &versions), DataContext::new(InstanceId(4), VersionId(90)));
        assert_eq!(ctx.remap(&InstanceMap::default(), &VersionMap::default()), ctx);
    }
}
