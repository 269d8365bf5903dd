//! # archive_r
//!
//! Uniform lazy traversal of nested archives and filesystem trees.
//!
//! A [`Traverser`] takes one or more root locations (a regular file, a
//! directory, or an explicit multi-volume group) and yields a single
//! pre-order sequence of [`Entry`] values spanning the root and every
//! archive nested inside it, to any depth. Entry payloads are read on
//! demand; nothing is extracted to disk.
//!
//! ## Quick Start
//!
//! ### Walking a nested archive
//!
//! ```rust,no_run
//! use archive_r::{make_single_path, Traverser, TraverserOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let traverser = Traverser::new(
//!         vec![make_single_path("archive.tar.gz")],
//!         TraverserOptions::new(),
//!     )?;
//!
//!     for entry in &traverser {
//!         println!("{}{}", "  ".repeat(entry.depth()), entry.name());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Reading an entry during (or after) iteration
//!
//! ```rust,no_run
//! use archive_r::{make_single_path, Traverser, TraverserOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let traverser = Traverser::new(
//!         vec![make_single_path("archive.tar.gz")],
//!         TraverserOptions::new(),
//!     )?;
//!
//!     let mut kept = None;
//!     for entry in &traverser {
//!         if entry.name() == "wanted.txt" {
//!             // Cloning detaches the entry: it stays readable after the
//!             // iteration has moved on by reopening its hierarchy.
//!             kept = Some(entry.clone());
//!         }
//!     }
//!
//!     if let Some(mut entry) = kept {
//!         let mut data = Vec::new();
//!         let mut buf = [0u8; 8192];
//!         loop {
//!             let n = entry.read(&mut buf)?;
//!             if n == 0 {
//!                 break;
//!             }
//!             data.extend_from_slice(&buf[..n]);
//!         }
//!         println!("{} bytes", data.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Aggregating multi-volume parts
//!
//! ```rust,no_run
//! use archive_r::{make_single_path, Traverser, TraverserOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let traverser = Traverser::new(
//!         vec![make_single_path("backup.tar.gz")],
//!         TraverserOptions::new(),
//!     )?;
//!
//!     for mut entry in &traverser {
//!         // Group `archive.tar.gz.part001`, `.part002`, and so on. When the
//!         // enclosing archive ends, the parts are concatenated and the
//!         // combined archive's contents are yielded in turn.
//!         if let Some(base) = entry.name().strip_suffix(".part001") {
//!             let base = base.to_string();
//!             entry.set_multi_volume_group(&base)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Traversal model
//!
//! Iteration is single-threaded and cooperative: each increment runs one
//! engine step to completion. Entries are yielded in deterministic
//! pre-order; the header of a nested archive always precedes its contents.
//! The most recently yielded entry is *live*: reading it streams straight
//! from the open decoder stack, and [`Entry::set_descent`] /
//! [`Entry::set_multi_volume_group`] register intents for the next step.
//! Cloned entries (and entries held past the next increment) are
//! *detached*: reading them reopens the archive chain from the stored
//! hierarchy.
//!
//! Recoverable problems (unreadable files, malformed nested archives,
//! unresolvable multi-volume groups) never abort iteration. They are
//! dispatched to the process-wide fault callback (see
//! [`register_fault_callback`]) and the traversal continues with the next
//! sibling or the next root.

pub mod error;
pub mod hierarchy;
pub mod metadata;
pub mod options;
pub mod stream;

mod archive;
mod cursor;
mod decoder;
mod entry;
mod hooks;
mod orchestrator;
mod traverser;
mod volume_manager;

pub use entry::Entry;
pub use error::{EntryFault, Error, Result};
pub use hierarchy::{
    make_single_path, merge_multi_volume_sources, merge_multi_volume_sources_ordered,
    sort_hierarchies, PartOrdering, PathEntry, PathHierarchy,
};
pub use hooks::{
    register_fault_callback, register_root_stream_factory, FaultCallback, RootStreamFactory,
};
pub use metadata::{
    collect_root_metadata, Digest, FileKind, MetadataMap, MetadataValue, SparseRegion, Xattr,
};
pub use options::{is_recognized_format, TraverserOptions, STANDARD_FORMATS};
pub use stream::DataStream;
pub use traverser::{Entries, Traverser};

/// Buffer size used by internal read loops.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;
