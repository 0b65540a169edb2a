//! Constants used throughout the slotdb library.
//!
//! This module provides central definitions for the reserved slot keys and
//! the tuning defaults shared between modules.

use std::time::Duration;

/// Slot key holding the serialized collections blob.
pub const DOCUMENTS: &str = "Documents";

/// Slot key holding the epoch-millisecond timestamp of the last successful write.
pub const LAST_UPDATE: &str = "LastUpdate";

/// Slot key holding the instance id of the most recent writer.
pub const LAST_UPDATER: &str = "LastUpdater";

/// Slot key holding the boolean flag guarding mutation.
pub const LOCKED: &str = "Locked";

/// Reserved document field carrying the primary key.
pub const ID_FIELD: &str = "_id";

/// Length of a generated document id in hex characters.
pub const DOC_ID_LEN: usize = 16;

/// Default interval between polls of the `Locked` flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default time to wait for the `Locked` flag to clear before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);
