// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Writing resolved paragraphs into a new `Packages` file. */

use {
    crate::{
        error::Result,
        repository::{site::ResolutionSession, EntryId},
    },
    log::debug,
    std::io::Write,
};

/// Rewrite a repository relative `Filename` to be relative to a mirror root.
///
/// `url` is flattened into a path by replacing its `://` scheme separator with `/`,
/// mirroring the layout of a directory tree populated by fetching from that URL.
pub fn rewrite_filename(url: &str, filename: &str) -> String {
    format!("{}/{}", url.replace("://", "/"), filename)
}

impl<'site> ResolutionSession<'site> {
    /// Write the paragraphs for the given entries to a writer.
    ///
    /// Paragraphs are emitted in iteration order, each followed by an empty line.
    /// Paragraphs from files with a base URL have their `Filename` rewritten with
    /// [rewrite_filename]. All other lines are written as they were read.
    pub fn dump<W: Write>(
        &mut self,
        entries: impl IntoIterator<Item = EntryId>,
        writer: &mut W,
    ) -> Result<()> {
        let site = self.site();
        let mut count = 0;

        for id in entries {
            let mut cf = self.read_entry(id)?;

            if let Some(url) = site.file(id.file_index())?.url() {
                cf.rewrite_field("Filename", |value| rewrite_filename(url, value))?;
            }

            cf.write(writer)?;
            writer.write_all(b"\n")?;
            count += 1;
        }

        debug!("dumped {} paragraphs", count);

        Ok(())
    }
}
