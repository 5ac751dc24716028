//! List S3 buckets as a directory hierarchy with size totals.
//!
//! Keys are split by a delimiter into virtual directories. Every directory
//! gets a header, a line per object and a summary once the listing has
//! moved past it, followed by a grand total for the whole request.
use clap::{App, Arg, ArgMatches, SubCommand};
use rusoto_s3::*;

use std::time::{Duration, Instant};

use crate::cli;
use crate::types::{ErrorKind, UtilError, UtilResult};
use crate::walker::{ItemSource, ObjectWalker};

pub mod aggregator;
pub mod matcher;
pub mod printer;
pub mod util;

use self::aggregator::{DirectoryAggregator, Reporter};
use self::matcher::KeyMatcher;
use self::printer::{LineSink, Printer, Stdout};
use self::util::SizeFormat;

/// Options shared by every target of a single invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListingConfig {
    pub delimiter: char,
    pub recursive: bool,
    pub size_format: SizeFormat,
    pub per_directory_totals: bool,
}

impl Default for ListingConfig {
    fn default() -> ListingConfig {
        ListingConfig {
            delimiter: '/',
            recursive: false,
            size_format: SizeFormat::Human,
            per_directory_totals: true,
        }
    }
}

impl ListingConfig {
    /// Builds and validates a `ListingConfig` from parsed arguments.
    pub fn from_args(args: &ArgMatches<'_>) -> UtilResult<ListingConfig> {
        let delimiter = cli::parse_delimiter(args.value_of("delimiter").unwrap_or("/"))?;
        let size_format = SizeFormat::parse(args.value_of("block-size").unwrap_or("auto"))?;

        Ok(ListingConfig {
            delimiter,
            recursive: args.is_present("recursive"),
            size_format,
            per_directory_totals: !args.is_present("no-subtotals"),
        })
    }
}

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("ls")
        .about("List buckets as directories with size totals")
        .args(&cli::global_args())
        .args(&[
            Arg::with_name("targets")
                .help("Buckets to list, as bucket[:pattern] or s3://bucket/pattern")
                .index(1)
                .multiple(true)
                .required(true),
            Arg::with_name("delimiter")
                .help("Delimiter for directories within object keys")
                .short("d")
                .long("delimiter")
                .takes_value(true)
                .default_value("/"),
            Arg::with_name("recursive")
                .help("Match all descendants of a directory pattern")
                .short("r")
                .long("recursive"),
            Arg::with_name("block-size")
                .help("Print sizes as counts of this block size, or auto")
                .short("B")
                .long("block-size")
                .takes_value(true)
                .default_value("auto"),
            Arg::with_name("no-subtotals")
                .help("Only print the grand total of each bucket")
                .short("S")
                .long("no-subtotals"),
        ])
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
///
/// The client is only created once the configuration is known to be valid,
/// as creating it may prompt for a secret key.
pub async fn exec<C>(connect: C, args: &ArgMatches<'_>) -> UtilResult<()>
where
    C: FnOnce(&ArgMatches<'_>) -> UtilResult<S3Client>,
{
    // validate everything before touching the network
    let config = ListingConfig::from_args(args)?;
    let targets: Vec<(String, Option<String>)> = args
        .values_of("targets")
        .into_iter()
        .flatten()
        .map(cli::split_target)
        .collect();

    let s3 = connect(args)?;

    let mut failures = 0;

    for (bucket, pattern) in targets {
        // one failed target doesn't stop the rest
        if let Err(err) = list(&s3, &bucket, pattern.as_deref(), &config).await {
            match err.kind() {
                ErrorKind::Config => error!("Invalid pattern for {}: {}", bucket, err),
                _ => error!("Unable to list {}: {}", bucket, err),
            }
            failures += 1;
        }
    }

    if failures > 0 {
        return Err(UtilError::from(format!("{} listing(s) failed", failures)));
    }

    Ok(())
}

/// Lists a single bucket/pattern pair to standard output.
async fn list(
    s3: &S3Client,
    bucket: &str,
    pattern: Option<&str>,
    config: &ListingConfig,
) -> UtilResult<()> {
    let matcher = KeyMatcher::configure(pattern)?;
    let prefix = matcher.prefix().map(String::from);

    info!("Listing bucket: {}", bucket);
    if let Some(spec) = matcher.spec() {
        debug!(
            "Requesting prefix {:?}, matching {:?} locally",
            spec.prefix(),
            spec.wild_suffix()
        );
    }

    let walker = ObjectWalker::new(s3, bucket.to_string(), prefix);

    render(walker, bucket, &matcher, config, Stdout).await?;
    Ok(())
}

/// Drives a full listing from a source through to a reporter.
///
/// Items which don't match are skipped; everything else is aggregated in
/// order. The reporter is returned once the total has been reported.
pub async fn run<I, R>(
    mut source: I,
    matcher: &KeyMatcher,
    config: &ListingConfig,
    reporter: R,
) -> UtilResult<R>
where
    I: ItemSource,
    R: Reporter,
{
    let start = Instant::now();
    let mut aggregator = DirectoryAggregator::new(config.delimiter, reporter);
    let mut matched = 0u64;

    // walk and aggregate all matching items
    while let Some(item) = source.next().await? {
        if !matcher.matches(&item.key, config.delimiter, config.recursive) {
            continue;
        }
        aggregator.consume(&item)?;
        matched += 1;
    }

    let reporter = aggregator.finalize()?;

    // whole seconds keep the duration readable
    let elapsed = Duration::from_secs(start.elapsed().as_secs());
    info!(
        "Listed {} objects in {}",
        matched,
        humantime::format_duration(elapsed)
    );

    Ok(reporter)
}

/// Renders a listing from a source straight into a line sink.
pub async fn render<I, S>(
    source: I,
    bucket: &str,
    matcher: &KeyMatcher,
    config: &ListingConfig,
    sink: S,
) -> UtilResult<S>
where
    I: ItemSource,
    S: LineSink,
{
    let printer = Printer::new(bucket, config.size_format, config.per_directory_totals, sink);
    let printer = run(source, matcher, config, printer).await?;
    Ok(printer.into_sink())
}
