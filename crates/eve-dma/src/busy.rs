//! Busy flag shared between the foreground and the completion interrupt
//!
//! The flag is the only state both contexts touch. It has exactly one writer
//! per phase: `start_transfer` sets it, the completion handler clears it.
//! Plain atomic loads and stores are enough (no read-modify-write), which
//! keeps it usable on Cortex-M0+ parts without CAS instructions.

use core::sync::atomic::{AtomicU8, Ordering};

/// Observable state of the transfer path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusyState {
    /// No transfer in flight; the buffer may be refilled.
    Idle,
    /// A transfer is armed; the buffer belongs to the DMA engine.
    Pending,
}

/// Raw value of [`BusyState::Idle`].
pub const IDLE: u8 = 0;

/// Raw value of [`BusyState::Pending`].
pub const PENDING: u8 = 42;

/// Transfer-pending flag.
///
/// Lives in a `static` next to the shared transport so the foreground can
/// poll it without entering a critical section.
#[derive(Debug)]
pub struct BusyFlag {
    state: AtomicU8,
}

impl BusyFlag {
    /// Idle flag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// True while a transfer is in flight.
    ///
    /// Acquire: a caller that sees idle also sees every hardware write the
    /// completion handler made before clearing the flag.
    pub fn is_busy(&self) -> bool {
        self.state.load(Ordering::Acquire) != IDLE
    }

    /// Current state.
    pub fn state(&self) -> BusyState {
        if self.is_busy() {
            BusyState::Pending
        } else {
            BusyState::Idle
        }
    }

    /// Resolve once the flag is idle, yielding between polls.
    ///
    /// Never resolves if the completion interrupt never fires.
    pub async fn wait_idle(&self) {
        while self.is_busy() {
            embassy_futures::yield_now().await;
        }
    }

    pub(crate) fn set_pending(&self) {
        self.state.store(PENDING, Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        self.state.store(IDLE, Ordering::Release);
    }
}

impl Default for BusyFlag {
    fn default() -> Self {
        Self::new()
    }
}
