// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {crate::package_version::VersionError, thiserror::Error};

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum DebianError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path {0}: {1:?}")]
    IoPath(String, std::io::Error),

    #[error("YAML error: {0:?}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("version error: {0}")]
    Version(#[from] VersionError),

    #[error("control file parse error: {0}")]
    ControlParseError(String),

    #[error("required field missing in control paragraph: {0}")]
    ControlRequiredFieldMissing(String),

    #[error("cannot rewrite field not present in control paragraph: {0}")]
    ControlRewriteFieldMissing(String),

    #[error("failed to parse dependency expression: {0}")]
    DependencyParse(String),

    #[error("unknown version relationship operator: {0}")]
    UnknownVersionRelationship(String),

    #[error("site cannot hold more than {0} packages files")]
    SiteTooManyFiles(usize),

    #[error("entry references unknown packages file index {0}")]
    SiteUnknownFile(usize),

    #[error("no paragraph at offset {1} of packages file {0}")]
    SiteEntryMissing(usize, u64),
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, DebianError>;
