//! Error types for traversal operations.
//!
//! All fallible operations in this crate return [`Result<T>`]. Errors fall
//! into two families with different propagation rules:
//!
//! - *Synchronous errors* ([`Error::InvalidArgument`], [`Error::Logic`]) are
//!   returned directly from the offending call and never reach the fault
//!   callback.
//! - *Recoverable faults* ([`Error::Fault`], [`Error::UnsupportedFormat`],
//!   [`Error::Decode`]) are dispatched through the process-wide fault
//!   callback (see [`crate::register_fault_callback`]) at every boundary
//!   where iteration can continue: the traversal skips the offending item
//!   and moves on to the next sibling or the next root.
//!
//! # Example
//!
//! ```rust
//! use archive_r::Error;
//!
//! fn classify(error: &Error) {
//!     if error.is_recoverable() {
//!         println!("traversal continues: {}", error);
//!     } else {
//!         println!("caller bug or I/O failure: {}", error);
//!     }
//! }
//! ```

use std::fmt;
use std::io;

use crate::hierarchy::PathHierarchy;

/// A recoverable traversal fault.
///
/// Faults carry a human-readable message, an errno-like integer (0 when no
/// OS error is involved), and the hierarchy of the entry the fault relates
/// to. They are handed to the registered fault callback and also embedded in
/// [`Error::Fault`] when a fault has to propagate as an error value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFault {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// OS error number when the fault originated from the host, 0 otherwise.
    pub errno: i32,
    /// Hierarchy of the entry the fault relates to; may be empty when the
    /// fault occurred before any entry was identified.
    pub hierarchy: PathHierarchy,
}

impl EntryFault {
    /// Creates a fault with no OS error number.
    pub fn new(message: impl Into<String>, hierarchy: PathHierarchy) -> Self {
        Self {
            message: message.into(),
            errno: 0,
            hierarchy,
        }
    }

    /// Creates a fault carrying an OS error number.
    pub fn with_errno(message: impl Into<String>, errno: i32, hierarchy: PathHierarchy) -> Self {
        Self {
            message: message.into(),
            errno,
            hierarchy,
        }
    }
}

impl fmt::Display for EntryFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if self.errno != 0 {
            write!(f, " (errno {})", self.errno)?;
        }
        if !self.hierarchy.is_empty() {
            write!(f, " [{}]", self.hierarchy)?;
        }
        Ok(())
    }
}

/// The main error type for traversal operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file or stream operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A caller-supplied argument was rejected.
    ///
    /// Raised synchronously for empty hierarchies, empty multi-volume part
    /// lists, empty root lists, and illegal operations on entries that are
    /// no longer traverser-managed. Never dispatched through the fault
    /// callback.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation was invoked in a state that does not admit it, such as
    /// reading payload bytes before any header was decoded.
    #[error("logic error: {0}")]
    Logic(String),

    /// The payload is not an archive this build can decode, or the detected
    /// format was excluded by the caller's format list.
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// The decoder encountered malformed archive data.
    #[error("decode error: {0}")]
    Decode(String),

    /// The stream does not support seeking.
    #[error("seek not supported by this stream")]
    SeekUnsupported,

    /// A recoverable fault, carrying entry context.
    #[error("{0}")]
    Fault(EntryFault),
}

impl Error {
    /// Creates a fault error with no OS error number.
    pub fn fault(message: impl Into<String>, hierarchy: PathHierarchy) -> Self {
        Error::Fault(EntryFault::new(message, hierarchy))
    }

    /// Creates a fault error carrying an OS error number.
    pub fn fault_errno(
        message: impl Into<String>,
        errno: i32,
        hierarchy: PathHierarchy,
    ) -> Self {
        Error::Fault(EntryFault::with_errno(message, errno, hierarchy))
    }

    /// Returns `true` if iteration can continue past this error.
    ///
    /// Recoverable errors are dispatched through the fault callback and the
    /// traversal advances to the next sibling or root. Non-recoverable
    /// errors indicate caller bugs (invalid arguments, illegal call
    /// sequences) and surface directly.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Fault(_) | Error::UnsupportedFormat(_) | Error::Decode(_) | Error::Io(_)
        )
    }

    /// Returns the embedded fault record, if any.
    pub fn as_fault(&self) -> Option<&EntryFault> {
        match self {
            Error::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// Returns the OS error number carried by this error, 0 when none.
    pub fn errno(&self) -> i32 {
        match self {
            Error::Io(e) => e
                .raw_os_error()
                .or_else(|| tunneled(e).map(|inner| inner.errno()).filter(|n| *n != 0))
                .unwrap_or(0),
            Error::Fault(fault) => fault.errno,
            _ => 0,
        }
    }

    /// Converts this error into a fault record anchored at `hierarchy`.
    ///
    /// Errors that already carry a fault keep their own context, including
    /// faults that crossed an `io::Read` adapter on their way through a
    /// decoder; everything else is wrapped with the supplied hierarchy.
    pub fn into_fault(self, hierarchy: PathHierarchy) -> EntryFault {
        match self {
            Error::Fault(fault) => fault,
            Error::Io(e) => match tunneled(&e) {
                Some(Error::Fault(fault)) => fault.clone(),
                Some(inner) => {
                    EntryFault::with_errno(inner.to_string(), inner.errno(), hierarchy)
                }
                None => EntryFault::with_errno(
                    e.to_string(),
                    e.raw_os_error().unwrap_or(0),
                    hierarchy,
                ),
            },
            other => EntryFault::with_errno(other.to_string(), other.errno(), hierarchy),
        }
    }
}

/// Recovers a crate error that was boxed into an `io::Error` by a stream
/// adapter.
fn tunneled(error: &io::Error) -> Option<&Error> {
    error.get_ref()?.downcast_ref::<Error>()
}

/// A specialized `Result` type for traversal operations.
pub type Result<T> = std::result::Result<T, Error>;
