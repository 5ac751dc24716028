//! Directory aggregation over an ordered stream of listed items.
//!
//! Keys are interpreted as paths split by a delimiter. The aggregator keeps
//! a stack of the directories between the bucket root and the directory of
//! the last consumed item; directories are pushed when the stream descends
//! into them and popped (summarized, then rolled into their parent) once
//! the stream has moved past them. Only this chain is ever held in memory.
use std::time::SystemTime;

use crate::types::{UtilError, UtilResult};
use crate::walker::Item;

/// Running statistics for a single directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    /// Objects directly inside this directory.
    pub direct_count: u64,
    /// Bytes directly inside this directory.
    pub direct_size: u64,
    /// Objects inside this directory and all rolled up descendants.
    pub subtree_count: u64,
    /// Bytes inside this directory and all rolled up descendants.
    pub subtree_size: u64,
    /// Latest modification seen in this directory or its descendants.
    pub latest_modified: Option<SystemTime>,
}

impl DirectoryStats {
    /// Records an item living directly in this directory.
    fn record(&mut self, item: &Item) {
        self.direct_count += 1;
        self.direct_size += item.size;
        self.subtree_count += 1;
        self.subtree_size += item.size;
        self.touch(item.modified);
    }

    /// Rolls a finished child directory into this directory.
    fn absorb(&mut self, child: &DirectoryStats) {
        self.subtree_count += child.subtree_count;
        self.subtree_size += child.subtree_size;
        if let Some(modified) = child.latest_modified {
            self.touch(modified);
        }
    }

    /// Moves the latest modification forward, if newer.
    fn touch(&mut self, modified: SystemTime) {
        self.latest_modified = match self.latest_modified {
            Some(latest) if latest >= modified => Some(latest),
            _ => Some(modified),
        };
    }
}

/// Receiver of the events produced while aggregating a listing.
///
/// Paths are directory paths including their trailing delimiter; the
/// bucket root is the empty path.
pub trait Reporter {
    /// A directory starts receiving items; `continued` is set when the
    /// directory already received items before a subdirectory interrupted.
    fn header(&mut self, path: &str, continued: bool);

    /// An item inside the current directory, `name` being the key minus the
    /// directory path (empty for directory marker objects).
    fn entry(&mut self, name: &str, item: &Item);

    /// A directory has been wrapped up and will receive no more items.
    fn summary(&mut self, path: &str, stats: &DirectoryStats);

    /// The listing is finished; `stats` are the totals of the bucket root.
    fn total(&mut self, stats: &DirectoryStats);
}

/// Live directory on the aggregation stack.
#[derive(Debug)]
struct Directory {
    path: String,
    stats: DirectoryStats,
    headed: bool,
}

impl Directory {
    fn new(path: String) -> Directory {
        Directory {
            path,
            stats: DirectoryStats::default(),
            headed: false,
        }
    }
}

/// Incremental per-directory aggregation of a sorted listing.
pub struct DirectoryAggregator<R> {
    delimiter: char,
    reporter: R,
    stack: Vec<Directory>,
    active: bool,
}

impl<R: Reporter> DirectoryAggregator<R> {
    /// Constructs a new `DirectoryAggregator` emitting into a `Reporter`.
    pub fn new(delimiter: char, reporter: R) -> DirectoryAggregator<R> {
        DirectoryAggregator {
            delimiter,
            reporter,
            stack: vec![Directory::new(String::new())],
            active: false,
        }
    }

    /// Feeds the next item of the listing into the aggregator.
    pub fn consume(&mut self, item: &Item) -> UtilResult<()> {
        let dir_len = item
            .key
            .rfind(self.delimiter)
            .map(|idx| idx + self.delimiter.len_utf8())
            .unwrap_or(0);
        let item_dir = &item.key[..dir_len];

        if !self.active || self.current()?.path != item_dir {
            self.enter(item_dir)?;
        }

        let current = self
            .stack
            .last_mut()
            .ok_or_else(|| UtilError::invariant("directory stack is empty"))?;

        current.stats.record(item);
        self.reporter.entry(&item.key[dir_len..], item);

        Ok(())
    }

    /// Finishes the listing, wrapping up every live directory.
    ///
    /// The bucket total is always reported exactly once, even when no
    /// items were consumed. The reporter is handed back to the caller.
    pub fn finalize(mut self) -> UtilResult<R> {
        while self.stack.len() > 1 {
            self.wrap_up()?;
        }

        let root = self
            .stack
            .pop()
            .ok_or_else(|| UtilError::invariant("directory stack is empty"))?;

        if root.headed {
            self.reporter.summary(&root.path, &root.stats);
        }
        self.reporter.total(&root.stats);

        Ok(self.reporter)
    }

    /// Switches the active directory to `dir`.
    ///
    /// Directories which are not ancestors of `dir` are wrapped up first,
    /// then any missing directories between the deepest remaining ancestor
    /// and `dir` are opened.
    fn enter(&mut self, dir: &str) -> UtilResult<()> {
        while !dir.starts_with(self.current()?.path.as_str()) {
            self.wrap_up()?;
        }

        loop {
            let depth = self.current()?.path.len();
            if depth >= dir.len() {
                break;
            }
            let next = dir[depth..]
                .find(self.delimiter)
                .map(|idx| depth + idx + self.delimiter.len_utf8())
                .unwrap_or_else(|| dir.len());
            self.stack.push(Directory::new(dir[..next].to_string()));
        }

        let current = self
            .stack
            .last_mut()
            .ok_or_else(|| UtilError::invariant("directory stack is empty"))?;

        self.reporter.header(&current.path, current.headed);
        current.headed = true;
        self.active = true;

        Ok(())
    }

    /// Pops the deepest directory, reports it, and rolls it into its parent.
    fn wrap_up(&mut self) -> UtilResult<()> {
        if self.stack.len() < 2 {
            return Err(UtilError::invariant("cannot roll up the bucket root"));
        }

        let finished = self
            .stack
            .pop()
            .ok_or_else(|| UtilError::invariant("directory stack is empty"))?;

        debug!(
            "Wrapping up {} ({} objects)",
            finished.path, finished.stats.subtree_count
        );

        self.reporter.summary(&finished.path, &finished.stats);

        let parent = self.stack.last_mut().ok_or_else(|| {
            UtilError::invariant(format!("no parent to roll {} into", finished.path))
        })?;

        parent.stats.absorb(&finished.stats);
        self.active = false;

        Ok(())
    }

    /// Retrieves the deepest live directory.
    fn current(&self) -> UtilResult<&Directory> {
        self.stack
            .last()
            .ok_or_else(|| UtilError::invariant("directory stack is empty"))
    }
}

#[cfg(test)]
mod tests {
    use super::{DirectoryAggregator, DirectoryStats, Reporter};
    use crate::types::ErrorKind;
    use crate::walker::Item;

    use std::collections::BTreeMap;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    #[derive(Debug, PartialEq)]
    enum Event {
        Header(String, bool),
        Entry(String),
        Summary(String, DirectoryStats),
        Total(DirectoryStats),
    }

    #[derive(Default)]
    struct Recorder(Vec<Event>);

    impl Reporter for Recorder {
        fn header(&mut self, path: &str, continued: bool) {
            self.0.push(Event::Header(path.into(), continued));
        }

        fn entry(&mut self, name: &str, _item: &Item) {
            self.0.push(Event::Entry(name.into()));
        }

        fn summary(&mut self, path: &str, stats: &DirectoryStats) {
            self.0.push(Event::Summary(path.into(), stats.clone()));
        }

        fn total(&mut self, stats: &DirectoryStats) {
            self.0.push(Event::Total(stats.clone()));
        }
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn item(key: &str, size: u64, secs: u64) -> Item {
        Item {
            key: key.into(),
            size,
            modified: at(secs),
        }
    }

    fn stats(direct: (u64, u64), subtree: (u64, u64), latest: Option<u64>) -> DirectoryStats {
        DirectoryStats {
            direct_count: direct.0,
            direct_size: direct.1,
            subtree_count: subtree.0,
            subtree_size: subtree.1,
            latest_modified: latest.map(at),
        }
    }

    fn aggregate(delimiter: char, items: &[Item]) -> Vec<Event> {
        let mut aggregator = DirectoryAggregator::new(delimiter, Recorder::default());
        for item in items {
            aggregator.consume(item).unwrap();
        }
        aggregator.finalize().unwrap().0
    }

    #[test]
    fn aggregating_sibling_directories() {
        let events = aggregate(
            '/',
            &[
                item("a/1.txt", 100, 1),
                item("a/2.txt", 200, 2),
                item("b/1.txt", 50, 3),
            ],
        );

        assert_eq!(
            events,
            vec![
                Event::Header("a/".into(), false),
                Event::Entry("1.txt".into()),
                Event::Entry("2.txt".into()),
                Event::Summary("a/".into(), stats((2, 300), (2, 300), Some(2))),
                Event::Header("b/".into(), false),
                Event::Entry("1.txt".into()),
                Event::Summary("b/".into(), stats((1, 50), (1, 50), Some(3))),
                Event::Total(stats((0, 0), (3, 350), Some(3))),
            ]
        );
    }

    #[test]
    fn reporting_totals_for_empty_listings() {
        let events = aggregate('/', &[]);

        assert_eq!(events, vec![Event::Total(DirectoryStats::default())]);
    }

    #[test]
    fn resuming_parent_after_subdirectory() {
        let events = aggregate(
            '/',
            &[
                item("a/a.txt", 1, 5),
                item("a/b/x", 2, 9),
                item("a/c.txt", 4, 1),
            ],
        );

        assert_eq!(
            events,
            vec![
                Event::Header("a/".into(), false),
                Event::Entry("a.txt".into()),
                Event::Header("a/b/".into(), false),
                Event::Entry("x".into()),
                Event::Summary("a/b/".into(), stats((1, 2), (1, 2), Some(9))),
                Event::Header("a/".into(), true),
                Event::Entry("c.txt".into()),
                Event::Summary("a/".into(), stats((2, 5), (3, 7), Some(9))),
                Event::Total(stats((0, 0), (3, 7), Some(9))),
            ]
        );
    }

    #[test]
    fn wrapping_up_intermediate_directories() {
        let events = aggregate(
            '/',
            &[item("x/y/z/deep.bin", 10, 1), item("top.txt", 1, 2)],
        );

        assert_eq!(
            events,
            vec![
                Event::Header("x/y/z/".into(), false),
                Event::Entry("deep.bin".into()),
                Event::Summary("x/y/z/".into(), stats((1, 10), (1, 10), Some(1))),
                Event::Summary("x/y/".into(), stats((0, 0), (1, 10), Some(1))),
                Event::Summary("x/".into(), stats((0, 0), (1, 10), Some(1))),
                Event::Header("".into(), false),
                Event::Entry("top.txt".into()),
                Event::Summary("".into(), stats((1, 1), (2, 11), Some(2))),
                Event::Total(stats((1, 1), (2, 11), Some(2))),
            ]
        );
    }

    #[test]
    fn keeping_shared_ancestors_open() {
        let events = aggregate(
            '/',
            &[item("p/q/1", 1, 1), item("p/r/2", 2, 2)],
        );

        assert_eq!(
            events,
            vec![
                Event::Header("p/q/".into(), false),
                Event::Entry("1".into()),
                Event::Summary("p/q/".into(), stats((1, 1), (1, 1), Some(1))),
                Event::Header("p/r/".into(), false),
                Event::Entry("2".into()),
                Event::Summary("p/r/".into(), stats((1, 2), (1, 2), Some(2))),
                Event::Summary("p/".into(), stats((0, 0), (2, 3), Some(2))),
                Event::Total(stats((0, 0), (2, 3), Some(2))),
            ]
        );
    }

    #[test]
    fn naming_directory_marker_objects() {
        let events = aggregate('/', &[item("a/", 0, 1), item("a/file", 3, 2)]);

        assert_eq!(events[0], Event::Header("a/".into(), false));
        assert_eq!(events[1], Event::Entry("".into()));
        assert_eq!(events[2], Event::Entry("file".into()));
    }

    #[test]
    fn aggregating_with_custom_delimiters() {
        let events = aggregate(
            ':',
            &[item("one:a/b", 1, 1), item("one:c", 2, 2), item("two", 4, 3)],
        );

        assert_eq!(
            events,
            vec![
                Event::Header("one:".into(), false),
                Event::Entry("a/b".into()),
                Event::Entry("c".into()),
                Event::Summary("one:".into(), stats((2, 3), (2, 3), Some(2))),
                Event::Header("".into(), false),
                Event::Entry("two".into()),
                Event::Summary("".into(), stats((1, 4), (3, 7), Some(3))),
                Event::Total(stats((1, 4), (3, 7), Some(3))),
            ]
        );
    }

    #[test]
    fn aggregating_with_multibyte_delimiters() {
        let events = aggregate(
            'é',
            &[item("uneétwoéx", 1, 1), item("uneéy", 2, 2), item("z", 4, 3)],
        );

        assert_eq!(
            events,
            vec![
                Event::Header("uneétwoé".into(), false),
                Event::Entry("x".into()),
                Event::Summary("uneétwoé".into(), stats((1, 1), (1, 1), Some(1))),
                Event::Header("uneé".into(), false),
                Event::Entry("y".into()),
                Event::Summary("uneé".into(), stats((1, 2), (2, 3), Some(2))),
                Event::Header("".into(), false),
                Event::Entry("z".into()),
                Event::Summary("".into(), stats((1, 4), (3, 7), Some(3))),
                Event::Total(stats((1, 4), (3, 7), Some(3))),
            ]
        );
    }

    #[test]
    fn rolling_up_independently_of_order() {
        let forward = [
            item("a/1", 1, 1),
            item("a/2", 2, 2),
            item("a/b/3", 4, 3),
            item("c/4", 8, 4),
        ];
        let shuffled = [
            item("c/4", 8, 4),
            item("a/b/3", 4, 3),
            item("a/2", 2, 2),
            item("a/1", 1, 1),
        ];

        let collect = |items: &[Item]| {
            let mut summaries = BTreeMap::new();
            let mut totals = Vec::new();
            for event in aggregate('/', items) {
                match event {
                    Event::Summary(path, stats) => {
                        summaries.insert(path, stats);
                    }
                    Event::Total(stats) => totals.push(stats),
                    _ => (),
                }
            }
            (summaries, totals)
        };

        let (forward_summaries, forward_totals) = collect(&forward[..]);
        let (shuffled_summaries, shuffled_totals) = collect(&shuffled[..]);

        assert_eq!(forward_summaries, shuffled_summaries);
        assert_eq!(forward_totals, shuffled_totals);
        assert_eq!(forward_totals.len(), 1);
        assert_eq!(forward_summaries["a/"], stats((2, 3), (3, 7), Some(3)));
    }

    #[test]
    fn keeping_subtree_above_direct_stats() {
        let mut aggregator = DirectoryAggregator::new('/', Recorder::default());
        let items = [
            item("a/1", 5, 1),
            item("a/b/2", 6, 2),
            item("a/3", 7, 3),
            item("d/e/f/4", 8, 4),
        ];

        for item in &items {
            aggregator.consume(item).unwrap();
            for dir in &aggregator.stack {
                assert!(dir.stats.subtree_count >= dir.stats.direct_count);
                assert!(dir.stats.subtree_size >= dir.stats.direct_size);
            }
        }

        let recorder = aggregator.finalize().unwrap();
        for event in recorder.0 {
            if let Event::Summary(_, stats) = event {
                assert!(stats.subtree_count >= stats.direct_count);
                assert!(stats.subtree_size >= stats.direct_size);
            }
        }
    }

    #[test]
    fn refusing_to_roll_up_the_root() {
        let mut aggregator = DirectoryAggregator::new('/', Recorder::default());
        let err = aggregator.wrap_up().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Invariant);
    }
}
