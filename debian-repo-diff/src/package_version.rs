// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian package version string handling. */

use {
    crate::dependency::VersionRelationship,
    std::{
        cmp::Ordering,
        fmt::{Display, Formatter},
        num::ParseIntError,
        str::FromStr,
    },
    thiserror::Error,
};

#[derive(Clone, Debug, Error)]
pub enum VersionError {
    #[error("error parsing string to integer: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("the epoch component has non-digit characters: {0}")]
    EpochNonNumeric(String),

    #[error("upstream_version component is empty: {0}")]
    UpstreamVersionEmpty(String),

    #[error("version string contains whitespace: {0}")]
    Whitespace(String),
}

pub type Result<T> = std::result::Result<T, VersionError>;

/// A Debian package version.
///
/// The concise version of the format is `[epoch:]upstream_version[-debian_revision]`.
///
/// Parsing accepts any non-whitespace characters in the upstream and revision
/// components. The ordering rules below are defined for every character.
///
/// Ordering follows the Debian rules. The epoch is compared numerically. Then the
/// upstream version and finally the revision are compared with [compare_component].
/// A missing (or empty) epoch is `0` and a missing (or empty) revision is `0`.
#[derive(Clone, Debug)]
pub struct PackageVersion {
    epoch: Option<u32>,
    upstream_version: String,
    debian_revision: Option<String>,
}

impl PackageVersion {
    /// Construct an instance by parsing a version string.
    pub fn parse(s: &str) -> Result<Self> {
        if s.chars().any(|c| c.is_whitespace()) {
            return Err(VersionError::Whitespace(s.to_string()));
        }

        // Epoch is the part before the first colon, if present.
        // upstream_version and debian_revision are discovered by splitting on last hyphen.
        let (epoch, remainder) = if let Some(pos) = s.find(':') {
            (Some(&s[0..pos]), &s[pos + 1..])
        } else {
            (None, s)
        };

        let (upstream, debian) = if let Some(pos) = remainder.rfind('-') {
            (&remainder[0..pos], Some(&remainder[pos + 1..]))
        } else {
            (remainder, None)
        };

        let epoch = match epoch {
            Some("") => Some(0),
            Some(epoch) => {
                if !epoch.chars().all(|c| c.is_ascii_digit()) {
                    return Err(VersionError::EpochNonNumeric(s.to_string()));
                }

                Some(u32::from_str(epoch)?)
            }
            None => None,
        };

        if upstream.is_empty() {
            return Err(VersionError::UpstreamVersionEmpty(s.to_string()));
        }

        Ok(Self {
            epoch,
            upstream_version: upstream.to_string(),
            debian_revision: debian.map(|x| x.to_string()),
        })
    }

    /// The `epoch` component of the version string.
    ///
    /// Only `Some` if present or defined explicitly.
    pub fn epoch(&self) -> Option<u32> {
        self.epoch
    }

    /// Assumed value of `epoch` component.
    ///
    /// If the component isn't explicitly defined, a default of `0` will be assumed.
    pub fn epoch_assumed(&self) -> u32 {
        self.epoch.unwrap_or(0)
    }

    /// `upstream` component of the version string.
    pub fn upstream_version(&self) -> &str {
        &self.upstream_version
    }

    /// `debian_revision` component of the version string.
    pub fn debian_revision(&self) -> Option<&str> {
        self.debian_revision.as_deref()
    }

    /// Assumed value of the `debian_revision` component.
    ///
    /// Missing and empty revisions both compare as `0`.
    pub fn debian_revision_assumed(&self) -> &str {
        match self.debian_revision.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => "0",
        }
    }
}

impl FromStr for PackageVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for PackageVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(epoch) = self.epoch {
            write!(f, "{}:", epoch)?;
        }

        write!(f, "{}", self.upstream_version)?;

        if let Some(revision) = &self.debian_revision {
            write!(f, "-{}", revision)?;
        }

        Ok(())
    }
}

/// Split a string into leading characters matching a predicate and everything else.
///
/// Either value can be an empty string.
fn split_leading(s: &str, predicate: impl Fn(char) -> bool) -> (&str, &str) {
    match s.find(|c: char| !predicate(c)) {
        Some(pos) => (&s[0..pos], &s[pos..]),
        None => (s, ""),
    }
}

/// Split a version component into `(digits, non-digits)` runs.
///
/// Every run starts with a (possibly empty) digit run followed by a (possibly empty)
/// non-digit run.
fn split_runs(s: &str) -> Vec<(&str, &str)> {
    let mut runs = vec![];
    let mut remaining = s;

    while !remaining.is_empty() {
        let (digits, rest) = split_leading(remaining, |c| c.is_ascii_digit());
        let (other, rest) = split_leading(rest, |c| !c.is_ascii_digit());

        runs.push((digits, other));
        remaining = rest;
    }

    runs
}

/// Compare two runs of ASCII digits by numeric value.
///
/// Empty runs count as zero. Runs of any length are supported.
fn numeric_compare(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');

    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Rank of the position past the end of a non-digit run.
const END_OF_RUN_RANK: u8 = 1;

fn char_rank(c: char) -> u8 {
    match c {
        '~' => 0,
        c if c.is_ascii_alphabetic() => 2,
        _ => 3,
    }
}

/// Compare two non-digit runs.
///
/// Tildes sort before everything, even the end of the run. Letters sort after the end
/// of the run and every other character sorts after letters. When the class sequences
/// are identical, the original characters break the tie.
fn lexical_compare(a: &str, b: &str) -> Ordering {
    let ranks = |s: &str| {
        s.chars()
            .map(char_rank)
            .chain(std::iter::once(END_OF_RUN_RANK))
            .collect::<Vec<_>>()
    };

    ranks(a).cmp(&ranks(b)).then_with(|| a.cmp(b))
}

/// Compare a version component string using Debian rules.
///
/// Runs are compared pairwise from the left. If all compared runs are equal, the
/// component with fewer runs sorts first.
pub fn compare_component(a: &str, b: &str) -> Ordering {
    let a_runs = split_runs(a);
    let b_runs = split_runs(b);

    for ((a_digits, a_other), (b_digits, b_other)) in a_runs.iter().zip(b_runs.iter()) {
        match numeric_compare(a_digits, b_digits) {
            Ordering::Equal => {}
            res => return res,
        }

        match lexical_compare(a_other, b_other) {
            Ordering::Equal => {}
            res => return res,
        }
    }

    a_runs.len().cmp(&b_runs.len())
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch_assumed()
            .cmp(&other.epoch_assumed())
            .then_with(|| compare_component(&self.upstream_version, &other.upstream_version))
            .then_with(|| {
                compare_component(
                    self.debian_revision_assumed(),
                    other.debian_revision_assumed(),
                )
            })
    }
}

impl PartialOrd<Self> for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

/// Evaluate whether version string `x` stands in `relationship` to version string `y`.
pub fn compare_full_version(x: &str, relationship: VersionRelationship, y: &str) -> Result<bool> {
    let x = PackageVersion::parse(x)?;
    let y = PackageVersion::parse(y)?;

    Ok(relationship.matches(x.cmp(&y)))
}
