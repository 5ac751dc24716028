//! Common object traversal structures for AWS S3.
//!
//! This module doesn't contain anything special beyond a pseudo-iterator
//! to walk over objects in S3 in a more idiomatic manner. Objects are
//! validated and converted into `Item` values as they leave the walker,
//! so nothing downstream has to deal with the optional Rusoto fields.
use async_trait::async_trait;
use rusoto_s3::*;

use std::time::SystemTime;

use crate::types::{UtilError, UtilResult};

/// A single listed object: key, size in bytes and modification time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub key: String,
    pub size: u64,
    pub modified: SystemTime,
}

impl Item {
    /// Converts a raw S3 `Object` into an `Item`.
    ///
    /// Objects missing a key or modification time, or reporting a negative
    /// size, are rejected as invariant violations of the listing service.
    pub fn from_object(object: Object) -> UtilResult<Item> {
        let key = object
            .key
            .ok_or_else(|| UtilError::invariant("listed object has no key"))?;

        let size = match object.size {
            Some(size) if size >= 0 => size as u64,
            Some(size) => {
                return Err(UtilError::invariant(format!(
                    "listed object {} has negative size {}",
                    key, size
                )))
            }
            None => return Err(UtilError::invariant(format!("listed object {} has no size", key))),
        };

        let modified = match object.last_modified {
            Some(ref stamp) => humantime::parse_rfc3339_weak(stamp)?,
            None => {
                return Err(UtilError::invariant(format!(
                    "listed object {} has no modification date",
                    key
                )))
            }
        };

        Ok(Item {
            key,
            size,
            modified,
        })
    }
}

/// Pull-based source of listed items.
///
/// Sources are single pass; once `None` is returned the source is exhausted
/// and will keep returning `None`. Errors are passed straight through.
#[async_trait(?Send)]
pub trait ItemSource {
    /// Attempts to fetch the next `Item` from this source.
    async fn next(&mut self) -> UtilResult<Option<Item>>;
}

/// Pseudo `Iterator` structure to walk over `Object` types in AWS S3.
///
/// As this is a fallible iteration, a `for` style loop cannot be used
/// easily. Instead, this pattern must be used:
///
/// ```rust
/// let walker = ObjectWalker::new(...);
///
/// while let Some(item) = walker.next().await? {
///     // do something...
/// }
/// ```
///
/// Even though this isn't as convenient as `for`, it's still much
/// cleaner than manually iterating the S3 object pages.
pub struct ObjectWalker<'a> {
    s3: &'a S3Client,
    token: Option<String>,
    bucket: String,
    prefix: Option<String>,
    buffer: std::vec::IntoIter<Object>,
    finished: bool,
}

impl<'a> ObjectWalker<'a> {
    /// Construct a new `ObjectWalker` for a bucket/prefix pair.
    pub fn new(s3: &'a S3Client, bucket: String, prefix: Option<String>) -> Self {
        Self {
            s3,
            bucket,
            prefix,
            token: None,
            buffer: Vec::new().into_iter(),
            finished: false,
        }
    }
}

#[async_trait(?Send)]
impl ItemSource for ObjectWalker<'_> {
    /// Attempts to fetch the next `Item` in the S3 archives.
    ///
    /// Calls can fail, which is why a `Result` is returned. Even if a call
    /// succeeds there is no guarantee an `Item` exists, which is why an
    /// `Option` is returned.
    ///
    /// Calling this method does not guarantee a call will be made to AWS;
    /// there may already be buffered data to be returned immediately.
    async fn next(&mut self) -> UtilResult<Option<Item>> {
        loop {
            // always check the buffer first
            if let Some(object) = self.buffer.next() {
                return Item::from_object(object).map(Some);
            }

            // if done, no fetch
            if self.finished {
                return Ok(None);
            }

            // create a request to list objects
            let request = ListObjectsV2Request {
                bucket: self.bucket.clone(),
                prefix: self.prefix.clone(),
                continuation_token: self.token.clone(),
                ..ListObjectsV2Request::default()
            };

            // execute the request and await the response
            let response = self.s3.list_objects_v2(request).await?;

            // store the page and next identifier
            self.buffer = response.contents.unwrap_or_default().into_iter();
            self.token = response.next_continuation_token;

            // check for last page
            if self.token.is_none() {
                self.finished = true;
            }

            debug!(
                "Fetched page of {} objects from {}",
                self.buffer.len(),
                self.bucket
            );
        }
    }
}

/// In-memory `ItemSource`, mainly useful for driving listings in tests.
#[cfg(test)]
pub struct VecSource {
    items: std::vec::IntoIter<UtilResult<Item>>,
}

#[cfg(test)]
impl VecSource {
    /// Constructs a source yielding the provided items in order.
    pub fn new(items: Vec<Item>) -> VecSource {
        Self::with_results(items.into_iter().map(Ok).collect())
    }

    /// Constructs a source which may also yield errors mid-stream.
    pub fn with_results(items: Vec<UtilResult<Item>>) -> VecSource {
        VecSource {
            items: items.into_iter(),
        }
    }
}

#[cfg(test)]
#[async_trait(?Send)]
impl ItemSource for VecSource {
    async fn next(&mut self) -> UtilResult<Option<Item>> {
        self.items.next().transpose()
    }
}
