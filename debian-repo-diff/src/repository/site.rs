// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Sites: collections of indexed `Packages` files. */

use {
    crate::{
        binary_package_control::BinaryPackageControlFile,
        control::ControlParagraph,
        dependency::DependencyVersionConstraint,
        error::{DebianError, Result},
        repository::{index::PackagesIndex, EntryId, MAX_SITE_FILES},
    },
    log::{debug, info},
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeSet,
        fs::File,
        io::BufReader,
        path::{Path, PathBuf},
    },
};

/// Configuration of a single `Packages` file within a [Site].
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SiteFileConfig {
    /// Filesystem path of the `Packages` file.
    pub path: PathBuf,

    /// Base URL of the repository the file belongs to.
    ///
    /// Used to rewrite `Filename` fields when dumping paragraphs.
    pub url: Option<String>,

    /// Path of a previously written YAML index of this file.
    ///
    /// If not defined, the file is indexed when the site is built.
    pub index: Option<PathBuf>,
}

/// Configuration for initializing a [Site].
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// `Packages` files constituting the site, in lookup order.
    #[serde(default)]
    pub files: Vec<SiteFileConfig>,
}

/// A `Packages` file belonging to a [Site].
#[derive(Clone, Debug)]
pub struct SiteFile {
    path: PathBuf,
    url: Option<String>,
    index: PackagesIndex,
}

impl SiteFile {
    /// Filesystem path of the `Packages` file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base URL of the repository this file belongs to.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The index of this file.
    pub fn index(&self) -> &PackagesIndex {
        &self.index
    }
}

/// An ordered collection of indexed `Packages` files.
///
/// Lookups consult files in the order they were added. Instances are immutable after
/// construction and can be shared by concurrent [ResolutionSession]s.
#[derive(Clone, Debug, Default)]
pub struct Site {
    files: Vec<SiteFile>,
}

impl Site {
    /// Construct an instance from a [SiteConfig].
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        let mut site = Self::default();

        for file in &config.files {
            let index = if let Some(path) = &file.index {
                Some(PackagesIndex::from_yaml_path(path)?)
            } else {
                None
            };

            site.add(&file.path, file.url.clone(), index)?;
        }

        Ok(site)
    }

    /// Add a `Packages` file to this site.
    ///
    /// The file is indexed unless a precomputed `index` is given. Errors if the site
    /// already holds [MAX_SITE_FILES] files.
    pub fn add(
        &mut self,
        path: impl AsRef<Path>,
        url: Option<String>,
        index: Option<PackagesIndex>,
    ) -> Result<()> {
        if self.files.len() >= MAX_SITE_FILES {
            return Err(DebianError::SiteTooManyFiles(MAX_SITE_FILES));
        }

        let path = path.as_ref().to_path_buf();

        let index = if let Some(index) = index {
            debug!("using precomputed index for {}", path.display());
            index
        } else {
            PackagesIndex::from_path(&path)?
        };

        self.files.push(SiteFile { path, url, index });

        Ok(())
    }

    /// Obtain the file at the given position.
    pub fn file(&self, index: usize) -> Result<&SiteFile> {
        self.files
            .get(index)
            .ok_or(DebianError::SiteUnknownFile(index))
    }

    /// Iterate over files in this site.
    pub fn files(&self) -> impl Iterator<Item = &SiteFile> {
        self.files.iter()
    }

    /// Number of files in this site.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Open a new [ResolutionSession] against this site.
    ///
    /// Every session owns its file handles and starts with empty resolution state.
    pub fn open(&self) -> Result<ResolutionSession<'_>> {
        let readers = self
            .files
            .iter()
            .map(|file| {
                File::open(&file.path)
                    .map(BufReader::new)
                    .map_err(|e| DebianError::IoPath(format!("{}", file.path.display()), e))
            })
            .collect::<Result<Vec<_>>>()?;

        info!("opened site with {} packages files", readers.len());

        Ok(ResolutionSession {
            site: self,
            readers,
            visited: BTreeSet::new(),
            broken: BTreeSet::new(),
        })
    }
}

/// An open [Site] plus the state of one dependency resolution.
///
/// The session tracks entries visited during resolution and the subset of those
/// found to have unsatisfiable dependencies.
pub struct ResolutionSession<'site> {
    site: &'site Site,
    readers: Vec<BufReader<File>>,
    visited: BTreeSet<EntryId>,
    broken: BTreeSet<EntryId>,
}

impl<'site> ResolutionSession<'site> {
    /// The site this session reads from.
    pub fn site(&self) -> &'site Site {
        self.site
    }

    /// Read the paragraph referenced by an [EntryId].
    pub fn read_entry(&mut self, id: EntryId) -> Result<BinaryPackageControlFile> {
        let reader = self
            .readers
            .get_mut(id.file_index())
            .ok_or(DebianError::SiteUnknownFile(id.file_index()))?;

        ControlParagraph::read_at(reader, id.offset())?
            .map(BinaryPackageControlFile::from)
            .ok_or(DebianError::SiteEntryMissing(id.file_index(), id.offset()))
    }

    /// Find paragraphs satisfying a name, architecture, and version constraint.
    ///
    /// `name` can be a real or a virtual package name. Paragraphs must have the wanted
    /// architecture or `Architecture: all`; a [None] architecture matches everything.
    ///
    /// Without a version constraint, every architecture-compatible paragraph matches.
    /// With one, a paragraph matches if it is itself named `name` and its `Version`
    /// satisfies the constraint, or if it provides `name` with a version satisfying
    /// the constraint. Unversioned `Provides` never satisfy a version constraint.
    ///
    /// Results are in file order, then index order within each file.
    pub fn lookup(
        &mut self,
        name: &str,
        architecture: Option<&str>,
        constraint: Option<&DependencyVersionConstraint>,
    ) -> Result<Vec<(EntryId, BinaryPackageControlFile)>> {
        let site = self.site;
        let mut res = vec![];

        for (file_index, file) in site.files.iter().enumerate() {
            for offset in file.index.offsets(name) {
                let id = EntryId::new(file_index, *offset)?;
                let cf = self.read_entry(id)?;

                if !cf.architecture_matches(architecture) {
                    continue;
                }

                let satisfied = match constraint {
                    None => true,
                    Some(constraint) => {
                        Self::version_satisfies(&cf, name, constraint)
                            || Self::provides_satisfies(&cf, name, constraint)
                    }
                };

                if satisfied {
                    res.push((id, cf));
                }
            }
        }

        Ok(res)
    }

    fn version_satisfies(
        cf: &BinaryPackageControlFile,
        name: &str,
        constraint: &DependencyVersionConstraint,
    ) -> bool {
        if cf.package().ok() != Some(name) {
            return false;
        }

        match cf.version() {
            Ok(version) => constraint.satisfied_by(&version),
            Err(e) => {
                debug!("ignoring version of {}: {}", name, e);
                false
            }
        }
    }

    fn provides_satisfies(
        cf: &BinaryPackageControlFile,
        name: &str,
        constraint: &DependencyVersionConstraint,
    ) -> bool {
        cf.iter_provides()
            .filter_map(|x| x.ok())
            .filter(|dep| dep.package == name)
            .any(|dep| match &dep.version_constraint {
                Some(provided) => constraint.satisfied_by(&provided.version),
                None => false,
            })
    }

    /// Whether an entry has been visited by this session.
    pub fn is_visited(&self, id: EntryId) -> bool {
        self.visited.contains(&id)
    }

    /// Record an entry as visited. Returns false if it was already visited.
    pub fn mark_visited(&mut self, id: EntryId) -> bool {
        self.visited.insert(id)
    }

    /// Whether an entry has been found to have unsatisfiable dependencies.
    pub fn is_broken(&self, id: EntryId) -> bool {
        self.broken.contains(&id)
    }

    /// Record an entry as having unsatisfiable dependencies.
    pub fn mark_broken(&mut self, id: EntryId) {
        self.broken.insert(id);
    }

    /// Entries visited by this session, in [EntryId] order.
    pub fn visited(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.visited.iter().copied()
    }

    /// Entries found to have unsatisfiable dependencies, in [EntryId] order.
    pub fn broken(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.broken.iter().copied()
    }

    /// Entries visited and not found broken, in [EntryId] order.
    ///
    /// After a successful resolution, these are the entries that need to be pulled.
    pub fn resolved_entries(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.visited.difference(&self.broken).copied()
    }

    /// Release the file handles held by this session.
    pub fn close(self) {
        debug!("closing site session with {} visited entries", self.visited.len());
    }
}
