//! Cooperative mutual exclusion over the shared `Locked` slot.
//!
//! Multiple store handles (other tabs, other tasks, other threads) share one
//! slot namespace, and the only write guard available is a boolean flag in
//! that namespace. [`SlotLock`] polls the flag at a fixed interval until it
//! observes it clear, then claims it. There is no compare-and-swap in the
//! slot API, so a narrow check-then-act window exists between "observed
//! unlocked" and "claimed"; this is an accepted limitation of the protocol,
//! not something the lock tries to paper over.
//!
//! No ownership token is recorded alongside the flag. `release` therefore
//! cannot verify that it still legitimately owns the lock, and
//! `force_clear` cannot distinguish a stale flag left by a crashed holder
//! from one currently held. Force-clearing is reserved for explicit startup
//! recovery paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::Result;
use crate::backend::Slots;
use crate::constants::{DEFAULT_LOCK_TIMEOUT, DEFAULT_POLL_INTERVAL, LOCKED};

/// Timing configuration for lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// Interval between polls of the `Locked` flag.
    pub poll_interval: Duration,
    /// Total time to wait for the flag to clear before failing.
    pub timeout: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Errors raised by lock acquisition.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LockError {
    /// The `Locked` flag never cleared within the timeout window.
    #[error("Lock not acquired within {waited_ms}ms")]
    Timeout {
        /// How long acquisition waited before giving up
        waited_ms: u64,
    },
}

impl LockError {
    /// Check if this error indicates acquisition timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::Timeout { .. })
    }
}

impl From<LockError> for crate::Error {
    fn from(err: LockError) -> Self {
        crate::Error::Lock(err)
    }
}

/// Cooperative lock over the shared `Locked` flag.
///
/// One `SlotLock` belongs to one store handle. `claim` is idempotent within
/// that handle: once the handle believes it holds the lock, further claims
/// are no-ops until `release`.
#[derive(Debug)]
pub struct SlotLock {
    slots: Slots,
    settings: LockSettings,
    held: AtomicBool,
}

impl SlotLock {
    /// Create a lock over the given slot namespace.
    pub fn new(slots: Slots, settings: LockSettings) -> Self {
        Self {
            slots,
            settings,
            held: AtomicBool::new(false),
        }
    }

    /// Whether this handle currently believes it holds the lock.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Acquire exclusive write rights.
    ///
    /// No-op if this handle already holds the lock. Otherwise polls the
    /// shared flag at the configured interval until it is observed false,
    /// then writes it true. A flag that never clears within the configured
    /// timeout fails with [`LockError::Timeout`]; the caller must not
    /// perform any persisted mutation after that.
    pub async fn claim(&self) -> Result<()> {
        if self.held.load(Ordering::SeqCst) {
            return Ok(());
        }

        let started = Instant::now();
        let deadline = started + self.settings.timeout;
        loop {
            let locked = match self.slots.get_flag(LOCKED).await {
                Ok(flag) => flag,
                // A never-written flag is an unlocked store.
                Err(e) if e.is_not_found() => false,
                Err(e) => return Err(e),
            };

            if !locked {
                // Check-then-act window: another claimant may slip in
                // between this observation and the write below.
                self.slots.set_flag(LOCKED, true).await?;
                self.held.store(true, Ordering::SeqCst);
                debug!(waited_ms = started.elapsed().as_millis() as u64, "lock claimed");
                return Ok(());
            }

            if Instant::now() >= deadline {
                let waited_ms = started.elapsed().as_millis() as u64;
                warn!(waited_ms, "lock acquisition timed out");
                return Err(LockError::Timeout { waited_ms }.into());
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Release the lock if this handle believes it holds it.
    ///
    /// Clears the shared flag unconditionally in that case; without an
    /// ownership token there is no way to verify the flag still belongs to
    /// this handle.
    pub async fn release(&self) -> Result<()> {
        if self.held.swap(false, Ordering::SeqCst) {
            self.slots.set_flag(LOCKED, false).await?;
            debug!("lock released");
        }
        Ok(())
    }

    /// Unconditionally clear the shared flag.
    ///
    /// Startup recovery for a flag left set by a holder that never released
    /// it. Must only be invoked from an explicit recovery path; it cannot
    /// tell a stale flag from a live one.
    pub async fn force_clear(&self) -> Result<()> {
        info!("force-clearing shared lock flag");
        self.held.store(false, Ordering::SeqCst);
        self.slots.set_flag(LOCKED, false).await
    }
}
