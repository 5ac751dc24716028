//! Types module for the main runtime, exposing error and result types.
//!
//! Most code in this module is based around coercion of error types into
//! a common error type, to be used as the general "Error" of this crate.
//! Each error carries a kind so callers can tell bad configuration apart
//! from broken input and from failures of the listing transport.
use logger::SetLoggerError;
use quick_xml::events::Event;
use quick_xml::Reader;
use rusoto_core::request;

use std::fmt::{self, Debug, Display, Formatter};
use std::io;

/// Public type alias for a result with a `UtilError` error type.
pub type UtilResult<T> = Result<T, UtilError>;

/// Classification of a `UtilError`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid user configuration, raised before any listing starts.
    Config,
    /// Broken assumptions about the listed data or internal state.
    Invariant,
    /// Failures raised by external collaborators (network, IO, etc).
    Upstream,
}

/// Delegating error wrapper for errors raised by the main archive.
///
/// The internal `String` representation enables cheap coercion from
/// other error types by binding their error messages through. This
/// is somewhat similar to the `failure` crate, but minimal.
pub struct UtilError {
    kind: ErrorKind,
    msg: String,
}

impl UtilError {
    /// Constructs a configuration error.
    pub fn config<M: Into<String>>(msg: M) -> UtilError {
        UtilError {
            kind: ErrorKind::Config,
            msg: msg.into(),
        }
    }

    /// Constructs an invariant violation error.
    pub fn invariant<M: Into<String>>(msg: M) -> UtilError {
        UtilError {
            kind: ErrorKind::Invariant,
            msg: msg.into(),
        }
    }

    /// Retrieves the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Debug implementation for `UtilError`.
impl Debug for UtilError {
    /// Formats an `UtilError` by delegating to `Display`.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Display implementation for `UtilError`.
impl Display for UtilError {
    /// Formats an `UtilError` by writing out the inner representation.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

/// Macro to implement `From` for provided types.
macro_rules! derive_from {
    ($type:ty) => {
        impl<'a> From<$type> for UtilError {
            fn from(t: $type) -> UtilError {
                UtilError {
                    kind: ErrorKind::Upstream,
                    msg: t.to_string(),
                }
            }
        }
    };
}

// Easy derivations of derive_from.
derive_from!(&'a str);
derive_from!(io::Error);
derive_from!(clap::Error);
derive_from!(SetLoggerError);
derive_from!(humantime::TimestampError);
derive_from!(request::TlsError);
derive_from!(String);

/// Macro to implement `From` for Rusoto types.
macro_rules! derive_from_rusoto {
    ($type:ty) => {
        impl From<rusoto_core::RusotoError<$type>> for UtilError {
            /// Converts a Rusoto error to a `UtilError`.
            fn from(err: rusoto_core::RusotoError<$type>) -> UtilError {
                UtilError {
                    kind: ErrorKind::Upstream,
                    msg: extract_message(err.to_string()),
                }
            }
        }
    };
}

// derive error display for all used rusoto_s3 types
derive_from_rusoto!(rusoto_s3::ListObjectsV2Error);

/// Pulls the `<Message>` out of an XML error body, if there is one.
fn extract_message(msg: String) -> String {
    // XML, look for a message!
    if !msg.starts_with("<?xml") {
        return msg;
    }
    find_message(&msg).unwrap_or(msg)
}

/// Walks an XML document looking for the first `<Message>` tag.
fn find_message(xml: &str) -> Option<String> {
    // create an XML reader and buffer
    let mut reader = Reader::from_str(xml);
    let mut buffer = Vec::new();

    loop {
        // parse through each XML node event
        match reader.read_event(&mut buffer) {
            // end, or error, just give up
            Ok(Event::Eof) | Err(_) => return None,

            // if we find a message tag, we'll use that as the error
            Ok(Event::Start(ref e)) if e.name() == b"Message" => {
                return reader.read_text(b"Message", &mut Vec::new()).ok();
            }

            // skip
            _ => (),
        }
        // empty buffers
        buffer.clear();
    }
}
