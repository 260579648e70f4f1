// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Package selector and dependency syntax handling.

A selector atom has the form `name[:arch] [(op version)]`. Atoms are combined into
a dependency list: commas separate requirements that must all be satisfied and
pipes separate alternatives of which one suffices.

See <https://www.debian.org/doc/debian-policy/ch-relationships.html> for the
syntax this is derived from.
 */

use {
    crate::{
        error::{DebianError, Result},
        package_version::PackageVersion,
    },
    once_cell::sync::Lazy,
    regex::Regex,
    std::{
        cmp::Ordering,
        fmt::{Display, Formatter},
        ops::Deref,
        str::FromStr,
    },
};

/// Regular expression to parse selector atoms.
pub static RE_SELECTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        ^\s*
        # Package names are at least 2 characters and start with an alphanumeric.
        (?P<package>[a-z0-9][a-z0-9.+\-]+)
        # Optional architecture qualifier.
        (?:\s*:\s*(?P<arch>[^\s(]+))?
        # Relationships are within an optional parenthesis.
        (?:\s*\(
            \s*
            (?P<relop>[<=>]+)
            \s*
            # Version string is everything up to space or closing parenthesis.
            (?P<version>[^\s)]+)
            \s*
        \))?
        \s*$
        "#,
    )
    .expect("selector regular expression should compile")
});

/// A version comparison operator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VersionRelationship {
    StrictlyEarlier,
    EarlierOrEqual,
    ExactlyEqual,
    LaterOrEqual,
    StrictlyLater,
}

impl Display for VersionRelationship {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::StrictlyEarlier => write!(f, "<<"),
            Self::EarlierOrEqual => write!(f, "<="),
            Self::ExactlyEqual => write!(f, "="),
            Self::LaterOrEqual => write!(f, ">="),
            Self::StrictlyLater => write!(f, ">>"),
        }
    }
}

impl FromStr for VersionRelationship {
    type Err = DebianError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "<<" => Ok(Self::StrictlyEarlier),
            "<=" => Ok(Self::EarlierOrEqual),
            "=" => Ok(Self::ExactlyEqual),
            ">=" => Ok(Self::LaterOrEqual),
            ">>" => Ok(Self::StrictlyLater),
            _ => Err(DebianError::UnknownVersionRelationship(s.to_string())),
        }
    }
}

impl VersionRelationship {
    /// Whether the result of comparing `candidate` against `wanted` satisfies this operator.
    pub fn matches(&self, ordering: Ordering) -> bool {
        matches!(
            (ordering, self),
            (
                Ordering::Equal,
                Self::ExactlyEqual | Self::LaterOrEqual | Self::EarlierOrEqual
            ) | (Ordering::Less, Self::StrictlyEarlier | Self::EarlierOrEqual)
                | (Ordering::Greater, Self::StrictlyLater | Self::LaterOrEqual)
        )
    }
}

/// Represents a version constraint on a given package.
#[derive(Clone, Debug, PartialEq)]
pub struct DependencyVersionConstraint {
    pub relationship: VersionRelationship,
    pub version: PackageVersion,
}

impl DependencyVersionConstraint {
    /// Whether a version satisfies this constraint.
    pub fn satisfied_by(&self, version: &PackageVersion) -> bool {
        self.relationship.matches(version.cmp(&self.version))
    }
}

/// A single selector atom.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleDependency {
    /// Package the dependency is on.
    pub package: String,
    /// Architecture qualifier, verbatim.
    pub architecture: Option<String>,
    pub version_constraint: Option<DependencyVersionConstraint>,
}

impl Display for SingleDependency {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.package)?;
        if let Some(arch) = &self.architecture {
            write!(f, ":{}", arch)?;
        }
        if let Some(constraint) = &self.version_constraint {
            write!(f, " ({} {})", constraint.relationship, constraint.version)?;
        }

        Ok(())
    }
}

impl FromStr for SingleDependency {
    type Err = DebianError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl SingleDependency {
    /// Parse a single selector atom.
    ///
    /// The whole string (modulo surrounding whitespace) must match the atom grammar.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = RE_SELECTOR
            .captures(s)
            .ok_or_else(|| DebianError::DependencyParse(s.to_string()))?;

        let version_constraint = match (caps.name("relop"), caps.name("version")) {
            (Some(relop), Some(version)) => Some(DependencyVersionConstraint {
                relationship: VersionRelationship::from_str(relop.as_str())?,
                version: PackageVersion::parse(version.as_str())?,
            }),
            _ => None,
        };

        Ok(Self {
            package: caps["package"].to_string(),
            architecture: caps.name("arch").map(|x| x.as_str().to_string()),
            version_constraint,
        })
    }

    /// Resolve the architecture to search for when evaluating this atom.
    ///
    /// The atom's own qualifier wins over `default`. `all` and `any` mean the
    /// architecture is unconstrained and resolve to [None].
    pub fn effective_architecture<'a>(&'a self, default: Option<&'a str>) -> Option<&'a str> {
        match self.architecture.as_deref().or(default) {
            Some("all" | "any") | None => None,
            Some(arch) => Some(arch),
        }
    }
}

/// Alternatives for a single requirement, delimited by pipes (`|`).
///
/// The trimmed source text of every alternative is retained alongside its parsed form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DependencyVariants {
    atoms: Vec<SingleDependency>,
    texts: Vec<String>,
}

impl DependencyVariants {
    fn parse(s: &str) -> Result<Self> {
        let mut res = Self::default();

        for text in s.split('|') {
            res.atoms.push(SingleDependency::parse(text)?);
            res.texts.push(text.trim().to_string());
        }

        Ok(res)
    }

    /// Iterate over alternatives along with the text they were parsed from.
    pub fn iter_with_text(&self) -> impl Iterator<Item = (&str, &SingleDependency)> {
        self.texts.iter().map(|x| x.as_str()).zip(self.atoms.iter())
    }
}

impl Display for DependencyVariants {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.atoms
                .iter()
                .map(|x| format!("{}", x))
                .collect::<Vec<_>>()
                .join(" | ")
        )
    }
}

impl Deref for DependencyVariants {
    type Target = Vec<SingleDependency>;

    fn deref(&self) -> &Self::Target {
        &self.atoms
    }
}

/// Represents an ordered list of dependencies, delimited by commas (`,`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DependencyList {
    dependencies: Vec<DependencyVariants>,
}

impl Display for DependencyList {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.dependencies
                .iter()
                .map(|x| format!("{}", x))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl FromStr for DependencyList {
    type Err = DebianError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl DependencyList {
    /// Parse a dependency list from a string.
    ///
    /// A dependency list is a comma-delimited list of expressions. Each expression is a
    /// `|` delimited list of selector atoms. An empty (or all whitespace) string is the
    /// empty list, which is trivially satisfied.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }

        let dependencies = s
            .split(',')
            .map(DependencyVariants::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { dependencies })
    }

    /// Parse an optional field value. An absent value is the empty list.
    pub fn parse_optional(s: Option<&str>) -> Result<Self> {
        s.map(Self::parse).transpose().map(|x| x.unwrap_or_default())
    }

    /// Whether this list has no requirements.
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Obtain the individual requirements constituting this list of dependencies.
    ///
    /// Each requirement is itself a set of alternatives. The length of this set is
    /// commonly 1.
    pub fn requirements(&self) -> impl Iterator<Item = &DependencyVariants> {
        self.dependencies.iter()
    }
}
