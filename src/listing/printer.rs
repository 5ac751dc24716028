//! Text rendering of aggregation events.
use std::time::SystemTime;

use super::aggregator::{DirectoryStats, Reporter};
use super::util::SizeFormat;
use crate::walker::Item;

/// Label used for objects whose key is exactly their directory path.
const DIRECTORY_OBJECT: &str = "<directory object>";

/// Destination for rendered output lines.
pub trait LineSink {
    /// Writes a single line of output.
    fn line(&mut self, line: &str);
}

/// Sink writing every line to standard output.
pub struct Stdout;

impl LineSink for Stdout {
    fn line(&mut self, line: &str) {
        println!("{}", line);
    }
}

impl LineSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// `Reporter` rendering a listing as human readable lines.
pub struct Printer<S> {
    bucket: String,
    format: SizeFormat,
    per_directory: bool,
    sink: S,
}

impl<S: LineSink> Printer<S> {
    /// Constructs a new `Printer` for a bucket.
    pub fn new(bucket: &str, format: SizeFormat, per_directory: bool, sink: S) -> Printer<S> {
        Printer {
            bucket: bucket.to_string(),
            format,
            per_directory,
            sink,
        }
    }

    /// Consumes the printer, returning the inner sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn label(&self, path: &str) -> String {
        format!("{}:{}", self.bucket, path)
    }

    fn emit(&mut self, line: String) {
        self.sink.line(&line);
    }
}

/// Formats a timestamp to second precision.
fn timestamp(time: SystemTime) -> String {
    humantime::format_rfc3339_seconds(time).to_string()
}

impl<S: LineSink> Reporter for Printer<S> {
    fn header(&mut self, path: &str, continued: bool) {
        let label = self.label(path);
        if continued {
            self.emit(format!("{} (continued)", label));
        } else {
            self.emit(label);
        }
    }

    fn entry(&mut self, name: &str, item: &Item) {
        let name = if name.is_empty() { DIRECTORY_OBJECT } else { name };
        let line = format!(
            "{} {}: {}",
            self.format.format(item.size),
            timestamp(item.modified),
            name
        );
        self.emit(line);
    }

    fn summary(&mut self, path: &str, stats: &DirectoryStats) {
        if !self.per_directory {
            return;
        }

        let label = self.label(path);
        self.emit(format!("{} totals:", label));
        self.emit(format!(
            "{} directory objects; {} directory size",
            stats.direct_count,
            self.format.format(stats.direct_size)
        ));

        // only worth a line when subdirectories contributed
        if stats.subtree_count > stats.direct_count || stats.subtree_size > stats.direct_size {
            self.emit(format!(
                "    {} objects including subdirectories; {} size including subdirectories",
                stats.subtree_count,
                self.format.format(stats.subtree_size)
            ));
        }

        if let Some(latest) = stats.latest_modified {
            self.emit(format!("    latest modification {}", timestamp(latest)));
        }

        self.emit(String::new());
    }

    fn total(&mut self, stats: &DirectoryStats) {
        let label = self.label("");
        self.emit(format!("{} grand total", label));
        self.emit(format!(
            "{} total objects; {} total size",
            stats.subtree_count,
            self.format.format(stats.subtree_size)
        ));
        if let Some(latest) = stats.latest_modified {
            self.emit(format!("latest modification {}", timestamp(latest)));
        }
    }
}
