// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    clap::{Arg, ArgMatches, Command},
    debian_repo_diff::{
        dependency::VersionRelationship,
        dependency_resolution::{diff_from_config, DiffConfig},
        error::DebianError,
        package_version::compare_full_version,
        repository::index::PackagesIndex,
    },
    log::{info, LevelFilter},
    std::{io::Write, str::FromStr},
    thiserror::Error,
};

const DIFF_ABOUT: &str = "\
Compute the packages needed to satisfy a dependency expression.

Given a source and a destination site, each consisting of one or more `Packages`
files, this command determines which paragraphs of the source need to be added to
the destination so the dependency expression can be satisfied. Dependencies of
selected source packages (`Depends` and `Pre-Depends`) are followed recursively.

On success, the needed paragraphs are written as a `Packages` file. `Filename`
fields of paragraphs from files with a `url` are rewritten to be relative to a
mirror of that URL (`http://example.com/debian` becomes `http/example.com/debian`).

On failure, every chain of unsatisfiable dependencies is printed, starting with
the dependency that could not be satisfied, and the process exits with code 1.

# YAML Configuration

source (required) (mapping)
   The site packages may be pulled from.

destination (required) (mapping)
   The site whose packages are already available.

selector (required) (string)
   Dependency expression to satisfy. e.g. `app1, libfoo1 (>= 1.0) | libbar1`.

architecture (optional) (string)
   Architecture to use for atoms lacking an explicit `:arch` qualifier.

A site mapping has a single key, `files`, a list of mappings with keys:

path (required) (string)
   Filesystem path of a `Packages` file.

url (optional) (string)
   Base URL of the repository the file was obtained from.

index (optional) (string)
   Path of an index previously written by the `index` command.
";

#[derive(Debug, Error)]
pub enum DrdError {
    #[error("argument parsing error: {0:?}")]
    Clap(#[from] clap::Error),

    #[error("{0:?}")]
    Debian(#[from] DebianError),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0:?}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("invalid sub-command: {0}")]
    InvalidSubCommand(String),

    #[error("{0} unsatisfiable dependency chains")]
    Unsatisfiable(usize),
}

pub type Result<T> = std::result::Result<T, DrdError>;

/// Open the output destination of a command.
fn output_writer(args: &ArgMatches) -> Result<Box<dyn Write>> {
    Ok(match args.value_of_os("output") {
        Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(std::io::stdout()),
    })
}

fn output_arg() -> Arg<'static> {
    Arg::new("output")
        .long("output")
        .short('o')
        .takes_value(true)
        .allow_invalid_utf8(true)
        .help("Path to write output to. Defaults to stdout")
}

pub fn run_cli() -> Result<()> {
    let app = Command::new("Debian Repository Diff")
        .version("0.1")
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Compute partial mirrors of Debian repositories")
        .arg_required_else_help(true);

    let app = app.arg(
        Arg::new("verbose")
            .long("verbose")
            .short('v')
            .global(true)
            .multiple_occurrences(true)
            .help("Increase logging verbosity. Can be specified multiple times."),
    );

    let app = app.subcommand(
        Command::new("diff")
            .about("Compute packages needed to satisfy a dependency expression")
            .long_about(DIFF_ABOUT)
            .arg(
                Arg::new("yaml-config")
                    .long("yaml-config")
                    .takes_value(true)
                    .required(true)
                    .allow_invalid_utf8(true)
                    .help("Path to a YAML file defining the diff configuration"),
            )
            .arg(output_arg()),
    );

    let app = app.subcommand(
        Command::new("index")
            .about("Index a Packages file")
            .long_about(
                "Index a Packages file.\n\n\
                The index maps every package name, including names declared in Provides,\n\
                to the byte offsets of the paragraphs defining it. It can be referenced\n\
                from the `index` key of a site file in a diff configuration to avoid\n\
                re-indexing large files.",
            )
            .arg(
                Arg::new("packages")
                    .long("packages")
                    .takes_value(true)
                    .required(true)
                    .allow_invalid_utf8(true)
                    .help("Path to the Packages file to index"),
            )
            .arg(output_arg()),
    );

    let mut app = app.subcommand(
        Command::new("compare-versions")
            .about("Compare two Debian package versions")
            .arg(Arg::new("a").required(true).help("Version on the left"))
            .arg(
                Arg::new("op")
                    .required(true)
                    .possible_values(["<<", "<=", "=", ">=", ">>"])
                    .help("Relationship to test"),
            )
            .arg(Arg::new("b").required(true).help("Version on the right")),
    );

    let matches = app.clone().get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("diff", args)) => command_diff(args),
        Some(("index", args)) => command_index(args),
        Some(("compare-versions", args)) => command_compare_versions(args),
        Some((command, _)) => Err(DrdError::InvalidSubCommand(command.to_string())),
        None => {
            app.print_help()?;
            Ok(())
        }
    }
}

fn command_diff(args: &ArgMatches) -> Result<()> {
    let yaml_path = args
        .value_of_os("yaml-config")
        .ok_or_else(|| DrdError::InvalidSubCommand("diff requires --yaml-config".into()))?;

    let f = std::fs::File::open(yaml_path)?;
    let config: DiffConfig = serde_yaml::from_reader(f)?;

    // Nothing is written to the output unless the selector is satisfiable.
    let mut packages = vec![];
    let broken = diff_from_config(&config, &mut packages)?;

    if broken.is_empty() {
        info!("{} is satisfiable", config.selector);

        let mut writer = output_writer(args)?;
        writer.write_all(&packages)?;
        writer.flush()?;

        Ok(())
    } else {
        for chain in &broken {
            eprintln!("{}", chain);
        }

        Err(DrdError::Unsatisfiable(broken.len()))
    }
}

fn command_index(args: &ArgMatches) -> Result<()> {
    let path = args
        .value_of_os("packages")
        .ok_or_else(|| DrdError::InvalidSubCommand("index requires --packages".into()))?;

    let index = PackagesIndex::from_path(path)?;

    let mut writer = output_writer(args)?;
    index.write_yaml(&mut writer)?;
    writer.flush()?;

    Ok(())
}

fn command_compare_versions(args: &ArgMatches) -> Result<()> {
    let a = args.value_of("a").unwrap_or_default();
    let b = args.value_of("b").unwrap_or_default();
    let op = VersionRelationship::from_str(args.value_of("op").unwrap_or_default())?;

    println!(
        "{}",
        compare_full_version(a, op, b).map_err(DebianError::from)?
    );

    Ok(())
}
