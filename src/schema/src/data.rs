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
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::{DataName, Error, InstanceId, Result, TypeName, TypeUrl};

/// The minimal interface of a data instance, implemented by data types.
///
/// An instance belongs to exactly one repo. Only its instance id may change,
/// and only once, to support transmitting data to a remote server.
pub trait Data: Send + Sync {
    fn data_name(&self) -> &DataName;

    fn instance_id(&self) -> InstanceId;

    /// Reassign the instance id. Returns [`Error::InstanceIdReassigned`] if it
    /// was already reassigned.
    fn set_instance_id(&self, id: InstanceId) -> Result<()>;

    fn type_name(&self) -> &TypeName;

    fn type_url(&self) -> &TypeUrl;

    fn type_version(&self) -> &str;

    fn versioned(&self) -> bool;
}

/// A plain [`Data`] implementation.
#[derive(Debug)]
pub struct DataInstance {
    name: DataName,
    instance_id: AtomicU32,
    reassigned: AtomicBool,
    type_name: TypeName,
    type_url: TypeUrl,
    type_version: String,
    versioned: bool,
}

impl DataInstance {
    pub fn new(
        name: impl Into<DataName>,
        instance_id: InstanceId,
        type_name: impl Into<TypeName>,
        type_url: impl Into<TypeUrl>,
        type_version: impl Into<String>,
        versioned: bool,
    ) -> Self {
        DataInstance {
            name: name.into(),
            instance_id: AtomicU32::new(instance_id.get()),
            reassigned: AtomicBool::new(false),
            type_name: type_name.into(),
            type_url: type_url.into(),
            type_version: type_version.into(),
            versioned,
        }
    }
}

impl Data for DataInstance {
    #[inline]
    fn data_name(&self) -> &DataName {
        &self.name
    }

    #[inline]
    fn instance_id(&self) -> InstanceId {
        InstanceId(self.instance_id.load(Ordering::Acquire))
    }

    fn set_instance_id(&self, id: InstanceId) -> Result<()> {
        if self.reassigned.swap(true, Ordering::AcqRel) {
            return Err(Error::InstanceIdReassigned(self.name.to_string()));
        }
        self.instance_id.store(id.get(), Ordering::Release);
        Ok(())
    }

    #[inline]
    fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    #[inline]
    fn type_url(&self) -> &TypeUrl {
        &self.type_url
    }

    #[inline]
    fn type_version(&self) -> &str {
        &self.type_version
    }

    #[inline]
    fn versioned(&self) -> bool {
        self.versioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grayscale() -> DataInstance {
        DataInstance::new(
            "grayscale",
            InstanceId(3),
            "uint8blk",
            "github.com/voxdag/datatype/imageblk/uint8",
            "0.2",
            true,
        )
    }

    #[test]
    fn instance_id_is_reassigned_once() {
        let data = grayscale();
        assert_eq!(data.instance_id(), InstanceId(3));

        data.set_instance_id(InstanceId(11)).unwrap();
        assert_eq!(data.instance_id(), InstanceId(11));

        let err = data.set_instance_id(InstanceId(12)).unwrap_err();
        assert_eq!(err, Error::InstanceIdReassigned("grayscale".to_owned()));
        assert_eq!(data.instance_id(), InstanceId(11));
    }

    #[test]
    fn identifying_fields() {
        let data = grayscale();
        assert_eq!(data.data_name().as_str(), "grayscale");
        assert_eq!(data.type_name().as_str(), "uint8blk");
        assert_eq!(data.type_url().as_str(), "github.com/voxdag/datatype/imageblk/uint8");
        assert_eq!(data.type_version(), "0.2");
        assert!(data.versioned());
    }
}
