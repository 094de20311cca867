//! SPI transmit port abstraction
//!
//! The DMA engine writes into the SPI data register on its own; the transfer
//! core only needs two more things from the peripheral: gating the receiver
//! during write-only bursts, and knowing when the shift register is empty.

/// SPI peripheral contract for DMA-driven write bursts.
pub trait SpiTx {
    /// Switch the receive path on or off.
    ///
    /// Must be writable while the peripheral is enabled (on SAM SERCOM,
    /// `CTRLB.RXEN` is not enable-protected).
    fn set_receiver(&mut self, enabled: bool);

    /// True once the last byte has been clocked out of the shift register
    /// (not merely accepted into the peripheral's buffer).
    fn is_drained(&self) -> bool;

    /// True while the receive path is enabled.
    fn receiver_enabled(&self) -> bool;

    /// Switch to the write-burst clock (`true`) or back to the normal one.
    ///
    /// Called before a DMA burst is armed and after its last byte left the
    /// shift register. Ports without a separate burst clock ignore it.
    fn set_burst_clock(&mut self, _burst: bool) {}
}

impl<T: SpiTx + ?Sized> SpiTx for &mut T {
    fn set_receiver(&mut self, enabled: bool) {
        (**self).set_receiver(enabled);
    }

    fn is_drained(&self) -> bool {
        (**self).is_drained()
    }

    fn receiver_enabled(&self) -> bool {
        (**self).receiver_enabled()
    }

    fn set_burst_clock(&mut self, burst: bool) {
        (**self).set_burst_clock(burst);
    }
}

/// Port for backends that write synchronously through a blocking bus.
///
/// The bus call returns only after the bytes left the wire, so the port is
/// always drained and the receiver is never touched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReceiverGate;

impl SpiTx for NoReceiverGate {
    fn set_receiver(&mut self, _enabled: bool) {}

    fn is_drained(&self) -> bool {
        true
    }

    fn receiver_enabled(&self) -> bool {
        true
    }
}

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// SPI mode (CPOL, CPHA)
    pub mode: SpiMode,
    /// Bit order
    pub bit_order: BitOrder,
}

impl SpiConfig {
    /// Highest SPI clock the co-processor accepts before its PLL is set up.
    pub const EVE_INIT_MAX_HZ: u32 = 11_000_000;

    /// Highest SPI clock for write bursts once the co-processor runs.
    pub const EVE_BURST_MAX_HZ: u32 = 30_000_000;

    /// Settings valid right after power-up (mode 0, MSB first, 8 MHz).
    #[must_use]
    pub const fn eve_init() -> Self {
        Self {
            frequency: 8_000_000,
            mode: SpiMode::Mode0,
            bit_order: BitOrder::MsbFirst,
        }
    }

    /// Write-burst settings once the co-processor clock is configured.
    #[must_use]
    pub const fn eve_burst() -> Self {
        Self {
            frequency: Self::EVE_BURST_MAX_HZ,
            mode: SpiMode::Mode0,
            bit_order: BitOrder::MsbFirst,
        }
    }

    /// Same settings at another clock frequency.
    #[must_use]
    pub const fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self::eve_init()
    }
}

/// SPI modes (CPOL, CPHA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiMode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

/// Bit order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit first
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}
