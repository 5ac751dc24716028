//! CLI bindings for all internal commands and modules.
//!
//! This module focuses on the common CLI bindings required to provide easy
//! APIs and consistency across all other modules. This is where the parent
//! CLI can be found, as well as utilities for fetching common switches and
//! values.
use clap::{App, AppSettings, Arg, ArgMatches};
use rusoto_s3::*;

use crate::types::{UtilError, UtilResult};

/// Constructs a new CLI application using Clap.
///
/// This will register all subcommand modules and embed all metadata. All
/// metadata is fetched dynamically from Cargo and shouldn't require to
/// be updated (ever).
pub fn build<'a, 'b>() -> App<'a, 'b> {
    App::new("")
        .name(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .subcommand(crate::listing::cmd())
        .settings(&[
            AppSettings::ArgRequiredElseHelp,
            AppSettings::DisableHelpSubcommand,
            AppSettings::SubcommandRequiredElseHelp,
            AppSettings::VersionlessSubcommands,
        ])
}

/// Executes a subcommand based on the parsed arguments from the CLI.
///
/// Submodules receive a connector for a singleton `S3Client` rather than a
/// client, so their arguments are validated before any credentials are
/// requested.
pub async fn exec<C>(connect: C, args: &ArgMatches<'_>) -> UtilResult<()>
where
    C: FnOnce(&ArgMatches<'_>) -> UtilResult<S3Client>,
{
    match args.subcommand() {
        ("ls", Some(subargs)) => crate::listing::exec(connect, subargs).await,
        _ => {
            build().print_help()?;
            Ok(())
        }
    }
}

/// Splits a listing target into a bucket and an optional pattern.
///
/// Targets may be provided as `bucket:pattern` or `s3://bucket/pattern`;
/// an empty pattern is the same as no pattern at all. Trailing delimiters
/// are kept, as they change what the pattern matches.
pub fn split_target(target: &str) -> (String, Option<String>) {
    let mut splitn = match target.strip_prefix("s3://") {
        Some(remainder) => remainder.splitn(2, '/'),
        None => target.splitn(2, ':'),
    };

    // bucket is required, pattern is optional after the separator
    let bucket = splitn.next().unwrap_or_default().to_string();
    let pattern = splitn
        .next()
        .filter(|pattern| !pattern.is_empty())
        .map(String::from);

    (bucket, pattern)
}

/// Parses a delimiter argument, which must be exactly one character.
pub fn parse_delimiter(value: &str) -> UtilResult<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(delimiter), None) => Ok(delimiter),
        _ => Err(UtilError::config(format!(
            "delimiter must be exactly one character: {:?}",
            value
        ))),
    }
}

/// Fetches the set of global arguments which should be attached on each command.
pub fn global_args<'a, 'b>() -> [Arg<'a, 'b>; 3] {
    [
        Arg::with_name("access-key-id")
            .help("Static AWS access key; the secret is prompted for")
            .long("access-key-id")
            .takes_value(true),
        Arg::with_name("quiet")
            .help("Only prints errors during execution")
            .short("q")
            .long("quiet")
            .conflicts_with("verbose"),
        Arg::with_name("verbose")
            .help("Prints debug output during execution")
            .short("v")
            .long("verbose"),
    ]
}
