// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Package dependency resolution across sites.

[diff] determines which entries of a source [Site] must be added to a destination
[Site] so a dependency expression becomes satisfiable, recursing through the
`Depends` and `Pre-Depends` of every source entry it selects. Entries selected along
the way are recorded as visited in the source [ResolutionSession]; entries whose
own dependencies cannot be satisfied are additionally recorded as broken.

Each entry is expanded at most once per session. Encountering an already visited
entry, including one still being evaluated higher up the stack, counts as satisfied.
This guarantees termination on cyclic dependency graphs but means two mutually
dependent entries that are both broken may not be reported as such.
*/

use {
    crate::{
        dependency::{DependencyList, SingleDependency},
        error::Result,
        repository::site::{ResolutionSession, Site, SiteConfig},
    },
    log::{debug, info},
    serde::{Deserialize, Serialize},
    std::{
        fmt::{Display, Formatter},
        io::Write,
    },
};

/// A path from an unsatisfiable dependency up to the expression that required it.
///
/// Links hold dependency alternatives as written in the selector or control field.
/// The first link is the dependency that could not be satisfied. Every following link
/// is the alternative whose selected package required the previous link.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BrokenChain {
    links: Vec<String>,
}

impl BrokenChain {
    /// Construct a chain consisting of a single unsatisfiable dependency.
    pub fn new(leaf: impl ToString) -> Self {
        Self {
            links: vec![leaf.to_string()],
        }
    }

    /// The dependency that could not be satisfied.
    pub fn leaf(&self) -> &str {
        &self.links[0]
    }

    /// Iterate over links, starting at the unsatisfiable dependency.
    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|x| x.as_str())
    }

    /// Extend this chain with the alternative that required its current head.
    pub fn required_by(mut self, dependency: impl ToString) -> Self {
        self.links.push(dependency.to_string());
        self
    }
}

impl Display for BrokenChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.links.join(" <- "))
    }
}

/// Evaluate a dependency expression string against source and destination sites.
///
/// Returns every [BrokenChain] preventing the expression from being satisfied. An
/// empty result means the expression is satisfiable by the destination plus the
/// source entries now recorded in `source` via [ResolutionSession::resolved_entries].
///
/// `architecture` is used for atoms that lack an explicit architecture qualifier.
pub fn diff(
    source: &mut ResolutionSession,
    destination: &mut ResolutionSession,
    selector: &str,
    architecture: Option<&str>,
) -> Result<Vec<BrokenChain>> {
    let dependencies = DependencyList::parse(selector)?;

    diff_dependency_list(source, destination, &dependencies, architecture)
}

/// Evaluate a parsed [DependencyList] against source and destination sites.
///
/// See [diff].
pub fn diff_dependency_list(
    source: &mut ResolutionSession,
    destination: &mut ResolutionSession,
    dependencies: &DependencyList,
    architecture: Option<&str>,
) -> Result<Vec<BrokenChain>> {
    let mut res = vec![];

    for variants in dependencies.requirements() {
        let mut satisfied = false;
        let mut chains = vec![];

        for (text, dep) in variants.iter_with_text() {
            if diff_single(source, destination, text, dep, architecture, &mut chains)? {
                satisfied = true;
                break;
            }
        }

        if satisfied {
            debug!("{} is satisfied", variants);
        } else {
            debug!("{} is not satisfiable", variants);
            res.extend(chains);
        }
    }

    Ok(res)
}

/// Evaluate a single dependency alternative, as parsed from `text`.
///
/// Returns whether it is satisfied. If not, the reasons are appended to `chains`.
///
/// A previously visited candidate satisfies the alternative unless it was found
/// broken, in which case the next candidate is tried.
fn diff_single(
    source: &mut ResolutionSession,
    destination: &mut ResolutionSession,
    text: &str,
    dep: &SingleDependency,
    architecture: Option<&str>,
    chains: &mut Vec<BrokenChain>,
) -> Result<bool> {
    let arch = dep.effective_architecture(architecture);
    let constraint = dep.version_constraint.as_ref();

    if !destination
        .lookup(&dep.package, arch, constraint)?
        .is_empty()
    {
        debug!("{} present in destination", dep);
        return Ok(true);
    }

    let candidates = source.lookup(&dep.package, arch, constraint)?;

    if candidates.is_empty() {
        debug!("{} not found in source", dep);
        chains.push(BrokenChain::new(text));
        return Ok(false);
    }

    for (id, cf) in candidates {
        if !source.mark_visited(id) {
            if source.is_broken(id) {
                debug!("entry {} for {} is already known broken", id, dep);
                chains.push(BrokenChain::new(text));
                continue;
            }

            debug!("{} satisfied by previously visited entry {}", dep, id);
            return Ok(true);
        }

        debug!("selected entry {} for {}", id, dep);

        let candidate_arch = cf.architecture();
        let mut broken =
            diff_dependency_list(source, destination, &cf.depends()?, candidate_arch)?;
        broken.extend(diff_dependency_list(
            source,
            destination,
            &cf.pre_depends()?,
            candidate_arch,
        )?);

        if broken.is_empty() {
            return Ok(true);
        }

        debug!("entry {} has {} broken dependencies", id, broken.len());
        source.mark_broken(id);
        chains.extend(broken.into_iter().map(|chain| chain.required_by(text)));
    }

    Ok(false)
}

/// Describes a diff between two sites.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiffConfig {
    /// The site packages may be pulled from.
    pub source: SiteConfig,

    /// The site whose contents are already available.
    pub destination: SiteConfig,

    /// Dependency expression to satisfy.
    pub selector: String,

    /// Architecture for atoms lacking an explicit qualifier.
    pub architecture: Option<String>,
}

/// Perform a diff as described by a [DiffConfig].
///
/// If the selector is satisfiable, the source entries that need to be added to the
/// destination are dumped to `writer` as a `Packages` file. Otherwise nothing is written
/// and the broken chains are returned.
pub fn diff_from_config<W: Write>(
    config: &DiffConfig,
    writer: &mut W,
) -> Result<Vec<BrokenChain>> {
    let source = Site::from_config(&config.source)?;
    let destination = Site::from_config(&config.destination)?;

    let mut source_session = source.open()?;
    let mut destination_session = destination.open()?;

    let broken = diff(
        &mut source_session,
        &mut destination_session,
        &config.selector,
        config.architecture.as_deref(),
    )?;

    if broken.is_empty() {
        let entries = source_session.resolved_entries().collect::<Vec<_>>();
        info!("writing {} resolved entries", entries.len());
        source_session.dump(entries, writer)?;
    } else {
        info!("{} broken dependency chains", broken.len());
    }

    source_session.close();
    destination_session.close();

    Ok(broken)
}
