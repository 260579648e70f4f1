// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Indices of `Packages` files. */

use {
    crate::{
        binary_package_control::BinaryPackageControlFile,
        control::ControlParagraphReader,
        error::{DebianError, Result},
    },
    log::{debug, info, warn},
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeMap,
        io::{BufRead, BufReader, Write},
        path::Path,
    },
};

/// Maps package names to the byte offsets of paragraphs in a `Packages` file.
///
/// Every paragraph is recorded under its `Package` name and under every name it
/// declares in `Provides`. Offsets under a name are kept in file order.
///
/// Building is permissive: paragraphs that fail to parse, lack a `Package` field,
/// or have malformed `Provides` entries are skipped (or partially indexed) with a
/// warning instead of failing the whole file.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PackagesIndex {
    entries: BTreeMap<String, Vec<u64>>,
}

impl PackagesIndex {
    /// Index paragraphs read from a reader positioned at the start of a `Packages` file.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut index = Self::default();
        let mut skipped = 0;

        for res in ControlParagraphReader::new(reader) {
            let (offset, paragraph) = match res {
                Ok(v) => v,
                Err(DebianError::Io(e)) => return Err(DebianError::Io(e)),
                Err(e) => {
                    warn!("skipping malformed paragraph: {}", e);
                    skipped += 1;
                    continue;
                }
            };

            let cf = BinaryPackageControlFile::from(paragraph);

            let package = match cf.package() {
                Ok(package) => package,
                Err(e) => {
                    warn!("skipping paragraph at offset {}: {}", offset, e);
                    skipped += 1;
                    continue;
                }
            };

            index.insert(package, offset);

            for provide in cf.iter_provides() {
                match provide {
                    Ok(dep) => index.insert(&dep.package, offset),
                    Err(e) => warn!(
                        "ignoring Provides entry of {} at offset {}: {}",
                        package, offset, e
                    ),
                }
            }
        }

        if skipped > 0 {
            info!("{} paragraphs could not be indexed", skipped);
        }

        Ok(index)
    }

    /// Index a `Packages` file on the filesystem.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("indexing {}", path.display());

        let fh = std::fs::File::open(path)
            .map_err(|e| DebianError::IoPath(format!("{}", path.display()), e))?;

        let index = Self::from_reader(BufReader::new(fh))?;
        info!("indexed {} names from {}", index.len(), path.display());

        Ok(index)
    }

    /// Load a previously serialized index from a YAML file.
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let fh = std::fs::File::open(path)
            .map_err(|e| DebianError::IoPath(format!("{}", path.display()), e))?;

        Ok(serde_yaml::from_reader(BufReader::new(fh))?)
    }

    /// Serialize this index as YAML.
    pub fn write_yaml<W: Write>(&self, writer: W) -> Result<()> {
        Ok(serde_yaml::to_writer(writer, self)?)
    }

    /// Record a paragraph offset under a name.
    ///
    /// Recording the same offset for a name twice in a row is a no-op. This happens
    /// when a package provides its own name.
    pub fn insert(&mut self, name: &str, offset: u64) {
        let offsets = self.entries.entry(name.to_string()).or_default();

        if offsets.last() != Some(&offset) {
            offsets.push(offset);
        }
    }

    /// Offsets of paragraphs recorded under a name.
    pub fn offsets(&self, name: &str) -> &[u64] {
        self.entries
            .get(name)
            .map(|x| x.as_slice())
            .unwrap_or_default()
    }

    /// Iterate over indexed names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|x| x.as_str())
    }

    /// Number of distinct names indexed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::control::ControlParagraph,
        indoc::indoc,
        std::io::Cursor,
    };

    const PACKAGES: &str = indoc! {"
        Package: mawk
        Version: 1.3.4
        Architecture: amd64
        Provides: awk

        Package: gawk
        Version: 1:5.1.0-1
        Architecture: amd64
        Provides: awk, gawk, libgawk-api (= 3)

        Version: 1.0
        Architecture: all

        Package: broken
         continuation
        no colon

        Package: weird-provides
        Architecture: all
        Provides: ok-name, BAD NAME

        Package: mawk
        Version: 1.3.3
        Architecture: i386
    "};

    #[test]
    fn build() -> Result<()> {
        let index = PackagesIndex::from_reader(Cursor::new(PACKAGES))?;

        let offset = |needle: &str| PACKAGES.find(needle).unwrap() as u64;
        let mawk = offset("Package: mawk");
        let gawk = offset("Package: gawk");
        let mawk_old = offset("Package: mawk\nVersion: 1.3.3");
        let weird = offset("Package: weird-provides");

        assert_eq!(index.offsets("mawk"), &[mawk, mawk_old]);
        assert_eq!(index.offsets("gawk"), &[gawk]);
        assert_eq!(index.offsets("awk"), &[mawk, gawk]);
        assert_eq!(index.offsets("libgawk-api"), &[gawk]);
        assert_eq!(index.offsets("ok-name"), &[weird]);
        assert!(index.offsets("broken").is_empty());
        assert!(index.offsets("missing").is_empty());
        assert_eq!(
            index.names().collect::<Vec<_>>(),
            vec!["awk", "gawk", "libgawk-api", "mawk", "ok-name", "weird-provides"]
        );

        Ok(())
    }

    #[test]
    fn offsets_resolve_to_named_paragraphs() -> Result<()> {
        let index = PackagesIndex::from_reader(Cursor::new(PACKAGES))?;
        let mut reader = Cursor::new(PACKAGES);

        for name in index.names() {
            for offset in index.offsets(name) {
                let cf = BinaryPackageControlFile::from(
                    ControlParagraph::read_at(&mut reader, *offset)?
                        .expect("indexed offset should resolve to a paragraph"),
                );

                let provides_name = cf
                    .iter_provides()
                    .filter_map(|x| x.ok())
                    .any(|dep| dep.package == name);

                assert!(cf.package()? == name || provides_name, "{}", name);
            }
        }

        Ok(())
    }

    #[test]
    fn yaml_round_trip() -> Result<()> {
        let index = PackagesIndex::from_reader(Cursor::new(PACKAGES))?;

        let mut buf = vec![];
        index.write_yaml(&mut buf)?;
        let loaded: PackagesIndex = serde_yaml::from_slice(&buf)?;

        assert_eq!(loaded, index);

        Ok(())
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            PackagesIndex::from_path("/nonexistent/Packages"),
            Err(DebianError::IoPath(_, _))
        ));
    }
}
