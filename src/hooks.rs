//! Process-wide callback slots.
//!
//! Two hooks customize a traversal's interaction with the outside world:
//!
//! - the *fault callback* receives an [`EntryFault`] for every recoverable
//!   fault the traversal skips past;
//! - the *root-stream factory* can serve the depth-0 stream of any
//!   hierarchy, virtualizing the filesystem. Returning `None` falls back to
//!   the built-in system file stream.
//!
//! Both slots are process-wide. Replacement is atomic with respect to
//! concurrent reads: users of a slot snapshot the current callback and
//! invoke it after releasing the lock, so replacing a callback never
//! deadlocks against in-flight I/O. Registering `None` resets a slot.

use std::sync::{Arc, RwLock};

use crate::error::EntryFault;
use crate::hierarchy::PathHierarchy;
use crate::stream::DataStream;

/// Callback invoked for every recoverable fault.
pub type FaultCallback = Arc<dyn Fn(&EntryFault) + Send + Sync>;

/// Factory consulted for depth-0 streams; `None` falls back to the
/// filesystem.
pub type RootStreamFactory =
    Arc<dyn Fn(&PathHierarchy) -> Option<Box<dyn DataStream>> + Send + Sync>;

static FAULT_CALLBACK: RwLock<Option<FaultCallback>> = RwLock::new(None);
static ROOT_STREAM_FACTORY: RwLock<Option<RootStreamFactory>> = RwLock::new(None);

/// Registers the process-wide fault callback; `None` resets the slot.
pub fn register_fault_callback(callback: Option<FaultCallback>) {
    let mut slot = FAULT_CALLBACK
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = callback;
}

/// Registers the process-wide root-stream factory; `None` resets the slot.
pub fn register_root_stream_factory(factory: Option<RootStreamFactory>) {
    let mut slot = ROOT_STREAM_FACTORY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = factory;
}

/// Dispatches a fault to the registered callback, if any.
///
/// The callback snapshot is taken under the lock and invoked after the lock
/// is released.
pub(crate) fn dispatch_fault(fault: &EntryFault) {
    log::warn!("traversal fault: {}", fault);
    let snapshot = {
        let slot = FAULT_CALLBACK
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.clone()
    };
    if let Some(callback) = snapshot {
        callback(fault);
    }
}

/// Asks the registered factory for a depth-0 stream.
pub(crate) fn root_stream_for(hierarchy: &PathHierarchy) -> Option<Box<dyn DataStream>> {
    let snapshot = {
        let slot = ROOT_STREAM_FACTORY
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.clone()
    };
    snapshot.and_then(|factory| factory(hierarchy))
}
