// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Defines primitives in control files.

See <https://www.debian.org/doc/debian-policy/ch-controlfields.html>
for the canonical source of truth for how control files work.

Unlike a general purpose control file parser, the types in this module preserve
the original text of every field. Mirroring tools need to re-emit paragraphs
byte-for-byte except for the fields they explicitly rewrite.
*/

use {
    crate::error::{DebianError, Result},
    std::{
        fmt::{Display, Formatter},
        io::{BufRead, Seek, SeekFrom, Write},
    },
};

/// Split a raw field line into its name and raw value.
///
/// The colon must appear on the first physical line of a folded field.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;

    if name.contains('\n') {
        None
    } else {
        Some((name.trim_end(), value))
    }
}

/// A paragraph in a control file.
///
/// A paragraph is an ordered series of raw field lines. Continuation lines (lines
/// starting with whitespace) are folded into the field line they continue, so each
/// entry holds the complete original text of one field, including newlines.
///
/// Field names are case insensitive on read and case preserving on rewrite.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ControlParagraph {
    lines: Vec<String>,
}

impl ControlParagraph {
    /// Construct an instance from raw field lines.
    ///
    /// The first physical line of every entry must contain a colon separating the
    /// field name from its value.
    pub fn from_lines(lines: Vec<String>) -> Result<Self> {
        if let Some(line) = lines.iter().find(|l| split_field(l).is_none()) {
            return Err(DebianError::ControlParseError(format!(
                "error parsing line '{}'; missing colon",
                line.trim_end()
            )));
        }

        Ok(Self { lines })
    }

    /// Whether the paragraph is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Iterate over the raw lines of this paragraph.
    pub fn iter_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|x| x.as_str())
    }

    /// Iterate over `(name, value)` pairs in this paragraph.
    ///
    /// Values are trimmed of surrounding whitespace but folded lines are preserved.
    pub fn iter_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines
            .iter()
            .filter_map(|line| split_field(line))
            .map(|(name, value)| (name, value.trim()))
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.lines.iter().position(|line| {
            split_field(line)
                .map(|(field, _)| field.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
    }

    /// Whether a named field is present in this paragraph.
    pub fn has_field(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    /// Obtain the trimmed string value of the named field.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.iter_fields()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Rewrite the value of an existing field.
    ///
    /// `rewrite` receives the current trimmed value and returns the new value. Only the
    /// line holding this field changes. The field name keeps its original casing.
    pub fn rewrite_field(
        &mut self,
        name: &str,
        rewrite: impl FnOnce(&str) -> String,
    ) -> Result<()> {
        let index = self
            .field_index(name)
            .ok_or_else(|| DebianError::ControlRewriteFieldMissing(name.to_string()))?;

        let line = &self.lines[index];
        let (field, value) = split_field(line)
            .ok_or_else(|| DebianError::ControlRewriteFieldMissing(name.to_string()))?;
        let new_line = format!("{}: {}\n", field, rewrite(value.trim()));

        self.lines[index] = new_line;

        Ok(())
    }

    /// Serialize the paragraph to a writer.
    ///
    /// A trailing newline is written as part of the final field. However, an
    /// extra newline is not present. So if serializing multiple paragraphs, an
    /// additional line break must be written to effectively terminate this paragraph.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for line in &self.lines {
            writer.write_all(line.as_bytes())?;
        }

        Ok(())
    }

    /// Read the paragraph starting at `offset` of a seekable reader.
    ///
    /// Returns [None] if there is no paragraph at or after `offset`.
    pub fn read_at<R: BufRead + Seek>(reader: &mut R, offset: u64) -> Result<Option<Self>> {
        reader.seek(SeekFrom::Start(offset))?;

        Ok(ControlParagraphReader::with_offset(reader, offset)
            .read_paragraph()?
            .map(|(_, paragraph)| paragraph))
    }
}

impl Display for ControlParagraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            f.write_str(line)?;
        }

        Ok(())
    }
}

/// A reader for [ControlParagraph] that tracks byte offsets.
///
/// Input is decoded as UTF-8 on a best-effort basis: invalid byte sequences are
/// replaced rather than failing the read. Offsets always refer to the raw bytes.
///
/// Instances can be consumed as an iterator. Each call into the iterator will attempt to
/// read a full paragraph from the underlying reader. A malformed paragraph is consumed in
/// its entirety before its error is emitted, so iteration can continue past it.
pub struct ControlParagraphReader<R: BufRead> {
    reader: R,
    offset: u64,
    finished: bool,
}

impl<R: BufRead> ControlParagraphReader<R> {
    /// Create a new instance bound to a reader positioned at its start.
    pub fn new(reader: R) -> Self {
        Self::with_offset(reader, 0)
    }

    /// Create a new instance bound to a reader already positioned at `offset`.
    pub fn with_offset(reader: R, offset: u64) -> Self {
        Self {
            reader,
            offset,
            finished: false,
        }
    }

    /// The byte offset of the next unread line.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Consumes the instance, returning the original reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next paragraph along with the byte offset of its first line.
    ///
    /// Blank (empty or whitespace-only) lines preceding the paragraph are skipped. A
    /// paragraph ends at a blank line or at end of input. Resolves to [None] at end of
    /// input.
    pub fn read_paragraph(&mut self) -> Result<Option<(u64, ControlParagraph)>> {
        let mut lines: Vec<String> = vec![];
        let mut start = None;
        let mut orphan_continuation = false;
        let mut buf = vec![];

        loop {
            buf.clear();
            let line_offset = self.offset;
            let bytes_read = self.reader.read_until(b'\n', &mut buf)?;

            if bytes_read == 0 {
                break;
            }

            self.offset += bytes_read as u64;
            let line = String::from_utf8_lossy(&buf);

            if line.trim().is_empty() {
                if start.is_some() {
                    break;
                }
                continue;
            }

            start.get_or_insert(line_offset);

            if line.starts_with(char::is_whitespace) {
                match lines.last_mut() {
                    Some(last) => last.push_str(&line),
                    None => orphan_continuation = true,
                }
            } else {
                lines.push(line.into_owned());
            }
        }

        let start = match start {
            Some(start) => start,
            None => return Ok(None),
        };

        if orphan_continuation {
            return Err(DebianError::ControlParseError(format!(
                "paragraph at offset {} begins with a continuation line",
                start
            )));
        }

        if let Some(last) = lines.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }

        let paragraph = ControlParagraph::from_lines(lines).map_err(|e| match e {
            DebianError::ControlParseError(msg) => {
                DebianError::ControlParseError(format!("paragraph at offset {}: {}", start, msg))
            }
            e => e,
        })?;

        Ok(Some((start, paragraph)))
    }
}

impl<R: BufRead> Iterator for ControlParagraphReader<R> {
    type Item = Result<(u64, ControlParagraph)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_paragraph() {
            Ok(Some(res)) => Some(Ok(res)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(DebianError::Io(e)) => {
                self.finished = true;
                Some(Err(DebianError::Io(e)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
