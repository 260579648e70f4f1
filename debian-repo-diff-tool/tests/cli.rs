// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    assert_cmd::Command,
    indoc::{formatdoc, indoc},
    predicates::prelude::*,
    std::path::Path,
};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

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

    Package: app2
    Version: 1.0
    Architecture: amd64
    Depends: libbar1 (>= 2.0)
    Filename: pool/main/a/app2_1.0_amd64.deb
"};

fn write_config(dir: &Path, selector: &str) -> Result<std::path::PathBuf> {
    let source = dir.join("source");
    std::fs::write(&source, SOURCE)?;
    let destination = dir.join("destination");
    std::fs::write(&destination, "")?;

    let config = dir.join(format!("{}.yaml", selector));
    std::fs::write(
        &config,
        formatdoc! {"
            source:
              files:
                - path: {}
                  url: http://example.com/debian
            destination:
              files:
                - path: {}
            selector: {}
            ",
            source.display(),
            destination.display(),
            selector
        },
    )?;

    Ok(config)
}

#[test]
fn diff_success() -> Result<()> {
    let td = tempfile::tempdir()?;
    let config = write_config(td.path(), "app1")?;

    Command::cargo_bin("drd")?
        .arg("diff")
        .arg("--yaml-config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Package: libfoo1\n"))
        .stdout(predicate::str::contains(
            "Filename: http/example.com/debian/pool/main/a/app1_1.0_amd64.deb\n",
        ));

    let output = td.path().join("Packages");
    Command::cargo_bin("drd")?
        .arg("diff")
        .arg("--yaml-config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(std::fs::read_to_string(&output)?.contains("Package: app1\n"));

    Ok(())
}

#[test]
fn diff_failure() -> Result<()> {
    let td = tempfile::tempdir()?;
    let config = write_config(td.path(), "app2")?;

    Command::cargo_bin("drd")?
        .arg("diff")
        .arg("--yaml-config")
        .arg(&config)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("libbar1 (>= 2.0) <- app2\n"));

    let output = td.path().join("Packages");
    Command::cargo_bin("drd")?
        .arg("diff")
        .arg("--yaml-config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .assert()
        .code(1);

    assert!(!output.exists());

    Ok(())
}

#[test]
fn index() -> Result<()> {
    let td = tempfile::tempdir()?;
    let packages = td.path().join("Packages");
    std::fs::write(&packages, SOURCE)?;

    Command::cargo_bin("drd")?
        .arg("index")
        .arg("--packages")
        .arg(&packages)
        .assert()
        .success()
        .stdout(predicate::str::contains("libfoo1:"))
        .stdout(predicate::str::contains("app2:"));

    Ok(())
}

#[test]
fn compare_versions() -> Result<()> {
    Command::cargo_bin("drd")?
        .args(["compare-versions", "1.0~rc1", "<<", "1.0"])
        .assert()
        .success()
        .stdout("true\n");

    Command::cargo_bin("drd")?
        .args(["compare-versions", "1:1.0", "<=", "2.0"])
        .assert()
        .success()
        .stdout("false\n");

    Command::cargo_bin("drd")?
        .args(["compare-versions", "1.0", "=", "bad version"])
        .assert()
        .failure();

    Ok(())
}
