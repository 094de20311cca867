//! Transfer lifecycle: arm, frame, complete
//!
//! [`Transport`] is the single owning context of the transfer path. It
//! borrows the [`TransferBuffer`] and the [`BusyFlag`] (both `static` on
//! target) and owns the DMA engine, the SPI port and the chip-select line.
//!
//! ```text
//!            start_transfer                 on_complete (IRQ)
//!  Idle ──────────────────────▶ Pending ──────────────────────▶ Idle
//!        RX off, burst clock,             ack, wait TXC, normal clock,
//!        CS low, flag set, enable         RX on, CS high, flag clear
//! ```
//!
//! The flag is set before the channel enable bit is written, so a completion
//! interrupt that fires immediately after enable always finds it pending. A
//! refused enable rolls everything back.

use core::sync::atomic::{compiler_fence, Ordering};

use embedded_hal::digital::OutputPin;
use eve_platform::dma::{Armed, DmaEngine};
use eve_platform::dma_safety::TRANSFER_BUFFER_WORDS;
use eve_platform::gpio::ChipSelect;
use eve_platform::spi::SpiTx;

use crate::buffer::TransferBuffer;
use crate::busy::{BusyFlag, BusyState};
use crate::error::TransferError;

/// Transfer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferStats {
    /// Transfers armed.
    pub started: u32,
    /// Transfers finished by the completion handler.
    pub completed: u32,
    /// Start requests rejected (busy or empty).
    pub rejected: u32,
    /// Start requests the backend refused.
    pub failed: u32,
    /// Wire length of the last armed transfer.
    pub last_len: u16,
}

/// DMA-assisted SPI transfer path to the co-processor.
pub struct Transport<'a, E, S, CS, const N: usize = TRANSFER_BUFFER_WORDS> {
    buffer: &'a mut TransferBuffer<N>,
    busy: &'a BusyFlag,
    engine: E,
    spi: S,
    cs: ChipSelect<CS>,
    stats: TransferStats,
}

impl<'a, E, S, CS, const N: usize> Transport<'a, E, S, CS, N>
where
    E: DmaEngine,
    S: SpiTx,
    CS: OutputPin,
{
    /// Assemble the transfer path. Call [`init`](Self::init) before the
    /// first transfer.
    pub fn new(
        buffer: &'a mut TransferBuffer<N>,
        busy: &'a BusyFlag,
        engine: E,
        spi: S,
        cs: CS,
    ) -> Self {
        Self {
            buffer,
            busy,
            engine,
            spi,
            cs: ChipSelect::new(cs),
            stats: TransferStats::default(),
        }
    }

    /// One-time setup: deassert chip-select, initialise the DMA engine.
    pub fn init(&mut self) -> Result<(), TransferError<E::Error>> {
        self.cs.deassert().map_err(|_| TransferError::ChipSelect)?;
        self.engine.init().map_err(TransferError::Dma)?;

        #[cfg(feature = "defmt")]
        defmt::info!("EVE transfer path ready, {=usize} word buffer", N);

        Ok(())
    }

    /// True while a transfer is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Busy flag state.
    pub fn state(&self) -> BusyState {
        self.busy.state()
    }

    /// Start a new encoding session (fill index back to 0).
    pub fn reset_index(&mut self) -> Result<(), TransferError<E::Error>> {
        self.ensure_idle()?;
        self.buffer.reset_index();
        Ok(())
    }

    /// Append one word to the buffer.
    pub fn append(&mut self, word: u32) -> Result<(), TransferError<E::Error>> {
        self.ensure_idle()?;
        self.buffer.push(word)?;
        Ok(())
    }

    /// Reset the buffer and write a memory-write header for `address`.
    pub fn begin_write(&mut self, address: u32) -> Result<(), TransferError<E::Error>> {
        self.ensure_idle()?;
        self.buffer.begin_write(address)?;
        Ok(())
    }

    /// Words currently buffered.
    pub fn fill_index(&self) -> usize {
        self.buffer.len()
    }

    /// Words that can still be appended.
    pub fn remaining_capacity(&self) -> usize {
        self.buffer.remaining_capacity()
    }

    /// Read access to the buffer.
    pub fn buffer(&self) -> &TransferBuffer<N> {
        &*self.buffer
    }

    /// Hand the buffered words to the DMA engine.
    ///
    /// Returns the wire length in bytes. Never blocks: the transfer finishes
    /// in the background and [`on_complete`](Self::on_complete) runs from the
    /// DMA interrupt. Backends that report [`Armed::Completed`] have already
    /// sent the bytes; the completion handler then runs before this returns.
    ///
    /// Rejected with no side effects while busy or empty. If the backend
    /// refuses to arm, the flag stays idle, CS is deasserted and the receiver
    /// re-enabled; the caller may retry.
    pub fn start_transfer(&mut self) -> Result<u16, TransferError<E::Error>> {
        if self.busy.is_busy() {
            self.stats.rejected = self.stats.rejected.saturating_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("EVE transfer rejected: busy");
            return Err(TransferError::Busy);
        }
        let Some(len) = self.buffer.wire_len() else {
            self.stats.rejected = self.stats.rejected.saturating_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("EVE transfer rejected: buffer empty");
            return Err(TransferError::Empty);
        };

        let source = self.buffer.wire_bytes();
        if let Err(e) = self.engine.prepare(source) {
            self.stats.failed = self.stats.failed.saturating_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("EVE transfer: descriptor update refused");
            return Err(TransferError::Dma(e));
        }

        self.spi.set_receiver(false);
        self.spi.set_burst_clock(true);
        if self.cs.assert().is_err() {
            self.spi.set_burst_clock(false);
            self.spi.set_receiver(true);
            self.stats.failed = self.stats.failed.saturating_add(1);
            return Err(TransferError::ChipSelect);
        }

        self.busy.set_pending();
        // Descriptor and flag writes must not sink below the enable.
        compiler_fence(Ordering::SeqCst);

        match self.engine.start(source) {
            Ok(armed) => {
                self.stats.started = self.stats.started.saturating_add(1);
                self.stats.last_len = len;

                #[cfg(feature = "defmt")]
                defmt::debug!("EVE DMA armed: {=u16} bytes", len);

                if armed == Armed::Completed {
                    self.on_complete();
                }
                Ok(len)
            }
            Err(e) => {
                self.busy.clear();
                self.cs.deassert().ok();
                self.spi.set_burst_clock(false);
                self.spi.set_receiver(true);
                self.stats.failed = self.stats.failed.saturating_add(1);

                #[cfg(feature = "defmt")]
                defmt::warn!("EVE DMA arm refused, flag left idle");

                Err(TransferError::Dma(e))
            }
        }
    }

    /// Completion handler. Call from the DMA interrupt vector.
    ///
    /// Acknowledges the channel, spins until the SPI shift register is empty
    /// (the DMA is done once the last byte reached the peripheral, not the
    /// wire), drops back to the normal clock, re-enables the receiver, deasserts CS and only then clears the
    /// busy flag. A completion while idle is acknowledged and ignored.
    pub fn on_complete(&mut self) {
        self.engine.acknowledge();

        if !self.busy.is_busy() {
            #[cfg(feature = "defmt")]
            defmt::warn!("EVE DMA completion while idle, ignored");
            return;
        }

        while !self.spi.is_drained() {
            core::hint::spin_loop();
        }

        self.spi.set_burst_clock(false);
        self.spi.set_receiver(true);
        // No error path out of the interrupt; a stuck CS shows up as a
        // co-processor that ignores the next transfer.
        self.cs.deassert().ok();

        compiler_fence(Ordering::SeqCst);
        self.busy.clear();
        self.stats.completed = self.stats.completed.saturating_add(1);

        #[cfg(feature = "defmt")]
        defmt::trace!("EVE DMA complete");
    }

    /// Transfer counters.
    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    /// The DMA engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The SPI port.
    pub fn spi(&self) -> &S {
        &self.spi
    }

    /// The chip-select line.
    pub fn chip_select(&self) -> &ChipSelect<CS> {
        &self.cs
    }

    /// Take the peripherals back.
    ///
    /// Refused with `Err(self)` while a transfer is in flight: the completion
    /// interrupt still needs the engine to acknowledge the channel and clear
    /// the flag.
    pub fn release(self) -> Result<(E, S, CS), Self> {
        if self.busy.is_busy() {
            #[cfg(feature = "defmt")]
            defmt::warn!("EVE transport release refused: transfer in flight");
            return Err(self);
        }
        Ok((self.engine, self.spi, self.cs.release()))
    }

    fn ensure_idle(&self) -> Result<(), TransferError<E::Error>> {
        if self.busy.is_busy() {
            return Err(TransferError::Busy);
        }
        Ok(())
    }
}

impl<E, S, CS: OutputPin, const N: usize> core::fmt::Debug for Transport<'_, E, S, CS, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transport")
            .field("fill_index", &self.buffer.len())
            .field("busy", &self.busy.is_busy())
            .field("cs_asserted", &self.cs.is_asserted())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
