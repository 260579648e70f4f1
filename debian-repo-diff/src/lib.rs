// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian repository dependency diffing.

This crate answers the question: which packages of a source Debian repository need to
be copied into a destination repository so a given dependency expression can be
installed from the destination?

# A Tour of Functionality

Version strings are parsed and compared by [package_version::PackageVersion], following
the `[epoch:]upstream[-revision]` grammar and ordering rules used by `dpkg`.

Dependency expressions like `libc6 (>= 2.4), awk | mawk` are parsed by the
[dependency] module into a [dependency::DependencyList].

`Packages` files are read paragraph by paragraph with
[control::ControlParagraphReader], which tracks the byte offset of each paragraph.
[binary_package_control::BinaryPackageControlFile] provides typed access to the fields
of a paragraph.

The [repository] module models a repository as a [repository::site::Site]: an ordered
set of indexed `Packages` files. Resolution state lives in a
[repository::site::ResolutionSession] so one site can back several concurrent
resolutions.

[dependency_resolution::diff] walks a dependency expression through a source and a
destination session, recording which source entries are needed and reporting every
[dependency_resolution::BrokenChain] that prevents the expression from being satisfied.
The needed entries can then be written out with
[repository::site::ResolutionSession::dump].
*/

pub mod binary_package_control;
pub mod control;
pub mod dependency;
pub mod dependency_resolution;
pub mod error;
pub mod package_version;
pub mod repository;
