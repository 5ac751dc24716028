//! Directory style listings of Amazon S3 buckets, with size totals.
//!
//! Object keys are split by a delimiter into a virtual hierarchy; each
//! directory is printed with its objects and summarized once the listing
//! has moved past it. Please see the main documentation in the repository.
//!
//! Credentials must be provided via guidelines in the [AWS Documentation]
//! (https://docs.aws.amazon.com/cli/latest/userguide/cli-environment.html),
//! or as a static access key via `--access-key-id`.
#[macro_use]
extern crate log as logger;

use clap::ArgMatches;
use rusoto_core::credential::{ChainProvider, StaticProvider};
use rusoto_core::{region::Region, HttpClient};
use rusoto_s3::*;

use std::io::{self, BufRead, Write};
use std::time::Duration;

mod cli;
mod log;
mod types;
mod walker;

mod listing;

use crate::types::{UtilError, UtilResult};

#[tokio::main]
async fn main() -> UtilResult<()> {
    // build the CLI and grab all argumentss
    let args = cli::build().get_matches();

    // global switches live on the subcommand
    let subargs = args.subcommand().1.unwrap_or(&args);

    // initialize logging
    log::init(subargs)?;

    // delegate to the cli mod, connecting once arguments are valid
    cli::exec(client, &args).await
}

/// Constructs an `S3Client` using the credentials chosen on the CLI.
fn client(args: &ArgMatches<'_>) -> UtilResult<S3Client> {
    // create client options
    let client = HttpClient::new()?;
    let region = Region::default();

    // static credentials prompt for the secret
    if let Some(access_key) = args.value_of("access-key-id") {
        let secret = prompt_secret()?;
        let provider = StaticProvider::new_minimal(access_key.to_string(), secret);
        return Ok(S3Client::new_with(client, provider, region));
    }

    // create provided with timeout
    let mut chain = ChainProvider::new();
    chain.set_timeout(Duration::from_millis(500));

    Ok(S3Client::new_with(client, chain, region))
}

/// Reads a secret access key from stdin (echo is not disabled).
fn prompt_secret() -> UtilResult<String> {
    eprint!("AWS secret access key: ");
    io::stderr().flush()?;

    let mut secret = String::new();
    io::stdin().lock().read_line(&mut secret)?;

    let secret = secret.trim().to_string();
    if secret.is_empty() {
        return Err(UtilError::config("no secret access key provided"));
    }

    Ok(secret)
}
