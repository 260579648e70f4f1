// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    debian_repo_diff::{
        dependency::VersionRelationship,
        dependency_resolution::diff,
        error::Result,
        package_version::{compare_full_version, PackageVersion},
        repository::site::Site,
    },
    indoc::indoc,
    std::path::{Path, PathBuf},
};

const URL: &str = "http://example.com/debian";

const SOURCE: &str = indoc! {"
    Package: libfoo1
    Version: 1.0
    Architecture: amd64
    Filename: pool/main/libf/libfoo1_1.0_amd64.deb

    Package: app1
    Version: 1.0
    Architecture: amd64
    Depends: libfoo1 (>= 1.0)
    Filename: pool/main/a/app1_1.0_amd64.deb

    Package: libbar1
    Version: 1.0
    Architecture: amd64
    Filename: pool/main/libb/libbar1_1.0_amd64.deb

    Package: app2
    Version: 1.0
    Architecture: amd64
    Depends: libbar1 (>= 2.0)
    Filename: pool/main/a/app2_1.0_amd64.deb

    Package: cycle-a
    Version: 1.0
    Architecture: all
    Depends: cycle-b
    Filename: pool/main/c/cycle-a_1.0_all.deb

    Package: cycle-b
    Version: 1.0
    Architecture: all
    Depends: cycle-a
    Filename: pool/main/c/cycle-b_1.0_all.deb

    Package: mail-client
    Version: 3.0
    Architecture: amd64
    Depends: mail-transport-agent
    Filename: pool/main/m/mail-client_3.0_amd64.deb

    Package: postfix
    Version: 3.5.6-1
    Architecture: amd64
    Provides: mail-transport-agent, default-mta (= 3.5.6-1)
    Filename: pool/main/p/postfix_3.5.6-1_amd64.deb
"};

const DESTINATION: &str = indoc! {"
    Package: libc6
    Version: 2.31-13
    Architecture: amd64
    Filename: pool/main/g/glibc/libc6_2.31-13_amd64.deb
"};

fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}

fn source_site(dir: &Path) -> Result<Site> {
    let mut site = Site::default();
    site.add(write_file(dir, "source", SOURCE)?, Some(URL.into()), None)?;
    Ok(site)
}

fn empty_site(dir: &Path) -> Result<Site> {
    let mut site = Site::default();
    site.add(write_file(dir, "empty", "")?, None, None)?;
    Ok(site)
}

#[test]
fn version_ordering() -> Result<()> {
    assert!(compare_full_version("1.0~rc1", VersionRelationship::StrictlyEarlier, "1.0")?);
    assert!(compare_full_version("1.0~~", VersionRelationship::StrictlyEarlier, "1.0~rc1")?);
    assert!(compare_full_version("2:1.0", VersionRelationship::StrictlyLater, "1:99.0")?);
    assert!(compare_full_version("1.0", VersionRelationship::ExactlyEqual, "1.0-0")?);

    let mut versions = ["1.10", "1.9", "1:0.1", "1.9-1", "1.9~beta"]
        .iter()
        .map(|x| PackageVersion::parse(x))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    versions.sort();

    assert_eq!(
        versions.iter().map(|x| x.to_string()).collect::<Vec<_>>(),
        vec!["1.9~beta", "1.9", "1.9-1", "1.10", "1:0.1"]
    );

    Ok(())
}

#[test]
fn resolves_and_dumps() -> Result<()> {
    let td = tempfile::tempdir()?;
    let source = source_site(td.path())?;
    let destination = empty_site(td.path())?;

    let mut source_session = source.open()?;
    let mut destination_session = destination.open()?;

    let broken = diff(&mut source_session, &mut destination_session, "app1", None)?;
    assert!(broken.is_empty());

    let entries = source_session.resolved_entries().collect::<Vec<_>>();
    assert_eq!(entries.len(), 2);

    let mut buf = vec![];
    source_session.dump(entries, &mut buf)?;

    assert_eq!(
        String::from_utf8_lossy(&buf),
        indoc! {"
            Package: libfoo1
            Version: 1.0
            Architecture: amd64
            Filename: http/example.com/debian/pool/main/libf/libfoo1_1.0_amd64.deb

            Package: app1
            Version: 1.0
            Architecture: amd64
            Depends: libfoo1 (>= 1.0)
            Filename: http/example.com/debian/pool/main/a/app1_1.0_amd64.deb

        "}
    );

    source_session.close();
    destination_session.close();

    Ok(())
}

#[test]
fn reports_broken_chain() -> Result<()> {
    let td = tempfile::tempdir()?;
    let source = source_site(td.path())?;
    let destination = empty_site(td.path())?;

    let mut source_session = source.open()?;
    let mut destination_session = destination.open()?;

    let broken = diff(&mut source_session, &mut destination_session, "app2", None)?;

    assert_eq!(
        broken.iter().map(|x| x.to_string()).collect::<Vec<_>>(),
        vec!["libbar1 (>= 2.0) <- app2"]
    );
    assert_eq!(source_session.broken().count(), 1);
    assert_eq!(source_session.resolved_entries().count(), 0);

    Ok(())
}

#[test]
fn destination_coverage_wins() -> Result<()> {
    let td = tempfile::tempdir()?;

    let mut source = source_site(td.path())?;
    source.add(write_file(td.path(), "source-libc", DESTINATION)?, None, None)?;

    let mut destination = Site::default();
    destination.add(write_file(td.path(), "destination", DESTINATION)?, None, None)?;

    let mut source_session = source.open()?;
    let mut destination_session = destination.open()?;

    let broken = diff(
        &mut source_session,
        &mut destination_session,
        "libc6 (>= 2.28), libc6:amd64",
        Some("amd64"),
    )?;

    assert!(broken.is_empty());
    assert_eq!(source_session.visited().count(), 0);

    Ok(())
}

#[test]
fn cycle_terminates() -> Result<()> {
    let td = tempfile::tempdir()?;
    let source = source_site(td.path())?;
    let destination = empty_site(td.path())?;

    let mut source_session = source.open()?;
    let mut destination_session = destination.open()?;

    diff(
        &mut source_session,
        &mut destination_session,
        "cycle-a",
        Some("amd64"),
    )?;

    assert_eq!(source_session.visited().count(), 2);

    Ok(())
}

#[test]
fn virtual_packages() -> Result<()> {
    let td = tempfile::tempdir()?;
    let source = source_site(td.path())?;
    let destination = empty_site(td.path())?;

    let mut source_session = source.open()?;
    let mut destination_session = destination.open()?;

    assert!(diff(
        &mut source_session,
        &mut destination_session,
        "mail-client",
        Some("amd64"),
    )?
    .is_empty());
    assert_eq!(source_session.resolved_entries().count(), 2);

    // Versioned requirements need a versioned Provides.
    let mut source_session = source.open()?;
    assert!(diff(
        &mut source_session,
        &mut destination_session,
        "default-mta (>= 3.0)",
        Some("amd64"),
    )?
    .is_empty());

    let mut source_session = source.open()?;
    let broken = diff(
        &mut source_session,
        &mut destination_session,
        "mail-transport-agent (>= 1.0)",
        Some("amd64"),
    )?;
    assert_eq!(broken.len(), 1);

    // Architecture mismatches are not candidates.
    let mut source_session = source.open()?;
    let broken = diff(
        &mut source_session,
        &mut destination_session,
        "mail-client",
        Some("i386"),
    )?;
    assert_eq!(broken.len(), 1);

    Ok(())
}

#[test]
fn concurrent_sessions() -> Result<()> {
    let td = tempfile::tempdir()?;
    let source = source_site(td.path())?;
    let destination = empty_site(td.path())?;

    let results = std::thread::scope(|scope| {
        let handles = ["app1", "app2", "mail-client", "app1 | app2"]
            .into_iter()
            .map(|selector| {
                let source = &source;
                let destination = &destination;

                scope.spawn(move || -> Result<(usize, usize)> {
                    let mut source_session = source.open()?;
                    let mut destination_session = destination.open()?;

                    let broken =
                        diff(&mut source_session, &mut destination_session, selector, None)?;
                    let visited = source_session.visited().count();

                    source_session.close();
                    destination_session.close();

                    Ok((broken.len(), visited))
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread should not panic"))
            .collect::<Result<Vec<_>>>()
    })?;

    assert_eq!(results, vec![(0, 2), (1, 1), (0, 2), (0, 2)]);

    Ok(())
}
