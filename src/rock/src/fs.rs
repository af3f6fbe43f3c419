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

//! A mod to extend `std::fs`.
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Result};
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// Like `std::fs::create_dir_all` but ignore the already exists error.
pub fn create_dir_all_if_not_exists<P: AsRef<Path>>(dir: &P) -> Result<()> {
    match std::fs::create_dir_all(dir.as_ref()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err),
    }
}

/// Open a file for appending, create it if it does not exist.
pub fn open_append<P: AsRef<Path>>(path: P) -> Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// An advisory, exclusive lock over a file. The lock is released on drop.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    /// Try to lock the file at `path` exclusively. `None` is returned if the
    /// lock is held by somebody else.
    pub fn try_acquire<P: AsRef<Path>>(path: P) -> Result<Option<LockFile>> {
        let path = path.as_ref().to_owned();
        let file = OpenOptions::new().create(true).read(true).write(true).open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(LockFile { file, path })),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
