// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian binary package control files. */

use {
    crate::{
        control::ControlParagraph,
        dependency::{DependencyList, SingleDependency},
        error::{DebianError, Result},
        package_version::PackageVersion,
    },
    std::ops::{Deref, DerefMut},
};

/// A Debian binary package control paragraph, as seen in `Packages` files.
///
/// See <https://www.debian.org/doc/debian-policy/ch-controlfields.html#binary-package-control-files-debian-control>.
///
/// This type is a low-level wrapper around an inner [ControlParagraph].
/// [Deref] and [DerefMut] can be used to operate on the inner [ControlParagraph].
///
/// Fields that every index entry needs have getters that return [Result] and will
/// error if a field is not present. Other fields return [Option].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct BinaryPackageControlFile {
    paragraph: ControlParagraph,
}

impl Deref for BinaryPackageControlFile {
    type Target = ControlParagraph;

    fn deref(&self) -> &Self::Target {
        &self.paragraph
    }
}

impl DerefMut for BinaryPackageControlFile {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.paragraph
    }
}

impl From<ControlParagraph> for BinaryPackageControlFile {
    fn from(paragraph: ControlParagraph) -> Self {
        Self { paragraph }
    }
}

impl From<BinaryPackageControlFile> for ControlParagraph {
    fn from(cf: BinaryPackageControlFile) -> Self {
        cf.paragraph
    }
}

impl BinaryPackageControlFile {
    fn required_field_str(&self, name: &'static str) -> Result<&str> {
        self.field_str(name)
            .ok_or_else(|| DebianError::ControlRequiredFieldMissing(name.to_string()))
    }

    /// The `Package` field value.
    pub fn package(&self) -> Result<&str> {
        self.required_field_str("Package")
    }

    /// The `Version` field as its original string.
    pub fn version_str(&self) -> Result<&str> {
        self.required_field_str("Version")
    }

    /// The `Version` field parsed into a [PackageVersion].
    pub fn version(&self) -> Result<PackageVersion> {
        Ok(PackageVersion::parse(self.version_str()?)?)
    }

    /// The `Architecture` field.
    pub fn architecture(&self) -> Option<&str> {
        self.field_str("Architecture")
    }

    /// The `Filename` field.
    ///
    /// This is the location of the `.deb`, relative to the repository root.
    pub fn filename(&self) -> Option<&str> {
        self.field_str("Filename")
    }

    /// The `Provides` field, parsed to a [DependencyList].
    ///
    /// An absent field is the empty list.
    pub fn provides(&self) -> Result<DependencyList> {
        DependencyList::parse_optional(self.field_str("Provides"))
    }

    /// Iterate over the entries of the `Provides` field.
    ///
    /// Each comma delimited entry is parsed independently, so a malformed entry
    /// does not prevent reading the others.
    pub fn iter_provides(&self) -> impl Iterator<Item = Result<SingleDependency>> + '_ {
        self.field_str("Provides")
            .into_iter()
            .flat_map(|value| value.split(','))
            .map(SingleDependency::parse)
    }

    /// The `Depends` field, parsed to a [DependencyList].
    pub fn depends(&self) -> Result<DependencyList> {
        DependencyList::parse_optional(self.field_str("Depends"))
    }

    /// The `Pre-Depends` field, parsed to a [DependencyList].
    pub fn pre_depends(&self) -> Result<DependencyList> {
        DependencyList::parse_optional(self.field_str("Pre-Depends"))
    }

    /// Whether this package's architecture is compatible with a wanted architecture.
    ///
    /// `Architecture: all` packages are compatible with everything. A [None] wanted
    /// architecture is compatible with every package. Packages lacking an
    /// `Architecture` field only match an unconstrained search.
    pub fn architecture_matches(&self, wanted: Option<&str>) -> bool {
        match (self.architecture(), wanted) {
            (_, None) => true,
            (Some("all"), _) => true,
            (Some(arch), Some(wanted)) => arch == wanted,
            (None, Some(_)) => false,
        }
    }
}

#[cfg(test)]
mod test {
    use {super::*, crate::control::ControlParagraphReader, indoc::indoc, std::io::Cursor};

    fn parse(s: &str) -> Result<BinaryPackageControlFile> {
        let (_, p) = ControlParagraphReader::new(Cursor::new(s.to_string()))
            .read_paragraph()?
            .ok_or(DebianError::ControlParseError("no paragraph".into()))?;

        Ok(p.into())
    }

    #[test]
    fn accessors() -> Result<()> {
        let cf = parse(indoc! {"
            Package: app1
            Version: 1:2.0-3
            Architecture: amd64
            Provides: app, app-api (= 2)
            Pre-Depends: dpkg (>= 1.15)
            Depends: libfoo1 (>= 1.0), libbar1 | libbaz1
            Filename: pool/main/a/app1/app1_2.0-3_amd64.deb
        "})?;

        assert_eq!(cf.package()?, "app1");
        assert_eq!(cf.version_str()?, "1:2.0-3");
        assert_eq!(cf.version()?.epoch(), Some(1));
        assert_eq!(cf.architecture(), Some("amd64"));
        assert_eq!(cf.filename(), Some("pool/main/a/app1/app1_2.0-3_amd64.deb"));
        assert_eq!(cf.provides()?.requirements().count(), 2);
        assert_eq!(
            cf.iter_provides()
                .map(|x| x.map(|dep| dep.to_string()))
                .collect::<Result<Vec<_>>>()?,
            vec!["app", "app-api (= 2)"]
        );
        assert_eq!(cf.pre_depends()?.to_string(), "dpkg (>= 1.15)");
        assert_eq!(
            cf.depends()?.to_string(),
            "libfoo1 (>= 1.0), libbar1 | libbaz1"
        );

        Ok(())
    }

    #[test]
    fn missing_fields() -> Result<()> {
        let cf = parse("Package: app1\n")?;

        assert!(matches!(
            cf.version(),
            Err(DebianError::ControlRequiredFieldMissing(_))
        ));
        assert!(cf.depends()?.is_empty());
        assert!(cf.provides()?.is_empty());
        assert!(cf.architecture_matches(None));
        assert!(!cf.architecture_matches(Some("amd64")));

        Ok(())
    }

    #[test]
    fn architecture_matching() -> Result<()> {
        let amd64 = parse("Package: a1\nArchitecture: amd64\n")?;
        let all = parse("Package: a2\nArchitecture: all\n")?;

        assert!(amd64.architecture_matches(Some("amd64")));
        assert!(!amd64.architecture_matches(Some("i386")));
        assert!(amd64.architecture_matches(None));
        assert!(all.architecture_matches(Some("i386")));

        Ok(())
    }
}
