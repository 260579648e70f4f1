// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian repository primitives.

A repository is modeled as a [site::Site]: an ordered set of `Packages` files, each
with a [index::PackagesIndex] mapping package names (real and virtual) to the byte
offsets of the paragraphs defining them, and an optional base URL the files were
obtained from.

A [site::Site] is immutable once built. Reading paragraphs requires a
[site::ResolutionSession], which owns open file handles plus the bookkeeping of a
single dependency resolution. Any number of sessions can be opened against one site.
*/

pub mod dump;
pub mod index;
pub mod site;

use {
    crate::error::{DebianError, Result},
    std::fmt::{Display, Formatter},
};

/// Maximum number of `Packages` files a single [site::Site] can hold.
pub const MAX_SITE_FILES: usize = 256;

/// Identifies a single paragraph within a [site::Site].
///
/// This is the pair of the index of the `Packages` file within the site and the byte
/// offset of the paragraph within that file. Ordering is by file, then offset.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EntryId {
    file: u8,
    offset: u64,
}

impl EntryId {
    /// Construct an instance from a file index and offset.
    ///
    /// Errors if the file index cannot be represented.
    pub fn new(file: usize, offset: u64) -> Result<Self> {
        let file = u8::try_from(file).map_err(|_| DebianError::SiteTooManyFiles(MAX_SITE_FILES))?;

        Ok(Self { file, offset })
    }

    /// Index of the `Packages` file within its site.
    pub fn file_index(&self) -> usize {
        self.file as usize
    }

    /// Byte offset of the paragraph within its `Packages` file.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.file, self.offset)
    }
}
