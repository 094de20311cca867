//! Sharing the transport with the DMA interrupt
//!
//! On target the transport lives in a `static` so the interrupt vector can
//! reach it. Foreground access goes through a critical section, which also
//! masks the completion interrupt for its duration. The busy flag lives in
//! its own `static` and is polled without one.
//!
//! ```rust,ignore
//! static BUSY: BusyFlag = BusyFlag::new();
//! static BUFFER: StaticCell<TransferBuffer> = StaticCell::new();
//! static EVE: SharedTransport<EveTransport> = SharedTransport::new();
//!
//! #[interrupt]
//! fn DMAC() {
//!     EVE.on_interrupt();
//! }
//! ```

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::OutputPin;
use eve_platform::dma::DmaEngine;
use eve_platform::spi::SpiTx;

use crate::transport::Transport;

/// Something the completion interrupt can finish.
pub trait CompletionHandler {
    /// Run the completion handler (interrupt context).
    fn on_complete(&mut self);

    /// True while a transfer is waiting for its completion interrupt.
    fn is_busy(&self) -> bool;
}

impl<E, S, CS, const N: usize> CompletionHandler for Transport<'_, E, S, CS, N>
where
    E: DmaEngine,
    S: SpiTx,
    CS: OutputPin,
{
    fn on_complete(&mut self) {
        Transport::on_complete(self);
    }

    fn is_busy(&self) -> bool {
        Transport::is_busy(self)
    }
}

/// Interrupt-safe slot holding the transport.
pub struct SharedTransport<T> {
    inner: Mutex<RefCell<Option<T>>>,
}

impl<T> SharedTransport<T> {
    /// Empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// True once a transport is installed.
    pub fn is_installed(&self) -> bool {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow()
                .map_or(true, |slot| slot.is_some())
        })
    }

    /// Run `f` on the transport inside a critical section.
    ///
    /// `None` if nothing is installed or the slot is already borrowed
    /// (re-entrant call from inside `f`).
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow(cs).try_borrow_mut().ok()?;
            slot.as_mut().map(f)
        })
    }
}

impl<T: CompletionHandler> SharedTransport<T> {
    /// Put `transport` in the slot, returning whatever was there.
    ///
    /// Refused with `Err(transport)` while the installed transport has a
    /// transfer in flight (its completion interrupt must still find it), or
    /// while the slot is borrowed.
    pub fn install(&self, transport: T) -> Result<Option<T>, T> {
        critical_section::with(|cs| {
            let Ok(mut slot) = self.inner.borrow(cs).try_borrow_mut() else {
                return Err(transport);
            };
            if slot.as_ref().is_some_and(T::is_busy) {
                #[cfg(feature = "defmt")]
                defmt::warn!("EVE transport swap refused: transfer in flight");
                return Err(transport);
            }
            Ok(slot.replace(transport))
        })
    }

    /// Remove the transport from the slot.
    ///
    /// `None` when the slot is empty or borrowed, and while the installed
    /// transport has a transfer in flight; it stays installed until the
    /// completion interrupt has run.
    pub fn take(&self) -> Option<T> {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow(cs).try_borrow_mut().ok()?;
            if slot.as_ref().is_some_and(T::is_busy) {
                #[cfg(feature = "defmt")]
                defmt::warn!("EVE transport removal refused: transfer in flight");
                return None;
            }
            slot.take()
        })
    }

    /// Entry point for the DMA interrupt vector. Returns false when no
    /// transport is installed.
    pub fn on_interrupt(&self) -> bool {
        self.with(CompletionHandler::on_complete).is_some()
    }
}

impl<T> Default for SharedTransport<T> {
    fn default() -> Self {
        Self::new()
    }
}
