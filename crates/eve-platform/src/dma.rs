//! DMA abstraction layer
//!
//! One DMA channel, bound to the SPI transmit-data-register-empty trigger,
//! moves the transfer buffer into the SPI data register. The transfer core
//! drives it through [`DmaEngine`]; each target supplies one implementation.

/// How a backend reports the outcome of [`DmaEngine::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Armed {
    /// The channel is running; the completion interrupt will follow.
    Pending,
    /// The bytes already left the wire (polling backends). No interrupt
    /// follows, the caller finishes the transfer itself.
    Completed,
}

/// DMA engine adapter: one channel, one descriptor, memory → SPI DATA.
///
/// Call order per transfer: [`prepare`](Self::prepare) then
/// [`start`](Self::start); later, from the completion interrupt,
/// [`acknowledge`](Self::acknowledge).
pub trait DmaEngine {
    /// Error type
    type Error: core::fmt::Debug;

    /// One-time controller setup: reset, static descriptor fields, trigger,
    /// completion interrupt. Calling it twice without a reset is undefined.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Rewrite the descriptor's length and source fields for `source`.
    ///
    /// `source` must stay untouched until the transfer completes; the caller
    /// guarantees this through its busy flag.
    fn prepare(&mut self, source: &[u8]) -> Result<(), Self::Error>;

    /// Enable the channel. Past this point the hardware drains the buffer on
    /// its own; nothing here blocks.
    fn start(&mut self, source: &[u8]) -> Result<Armed, Self::Error>;

    /// Clear the channel's transfer-complete flag (interrupt context).
    fn acknowledge(&mut self);
}

impl<T: DmaEngine + ?Sized> DmaEngine for &mut T {
    type Error = T::Error;

    fn init(&mut self) -> Result<(), Self::Error> {
        (**self).init()
    }

    fn prepare(&mut self, source: &[u8]) -> Result<(), Self::Error> {
        (**self).prepare(source)
    }

    fn start(&mut self, source: &[u8]) -> Result<Armed, Self::Error> {
        (**self).start(source)
    }

    fn acknowledge(&mut self) {
        (**self).acknowledge();
    }
}

// ── SAM DMAC descriptor layout ──────────────────────────────────────────────

/// `BTCTRL.VALID`: descriptor is valid.
pub const BTCTRL_VALID: u16 = 1 << 0;
/// `BTCTRL.BEATSIZE` = BYTE (bits 8..=9 cleared, 8-bit beats).
pub const BTCTRL_BEATSIZE_BYTE: u16 = 0;
/// `BTCTRL.SRCINC`: increment source address.
pub const BTCTRL_SRCINC: u16 = 1 << 10;

/// SAM DMAC transfer descriptor (16 bytes, 16-byte aligned, shared layout
/// on SAMC2x and SAMx5x).
///
/// Rebuilt in place on every transfer: `btcnt` and `srcaddr` change,
/// `btctrl`, `dstaddr` and `descaddr` are installed once by `init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, align(16))]
pub struct DmaDescriptor {
    /// Block transfer control.
    pub btctrl: u16,
    /// Block transfer count (beats).
    pub btcnt: u16,
    /// Source address; one past the last byte when `SRCINC` is set.
    pub srcaddr: u32,
    /// Destination address (the SPI DATA register).
    pub dstaddr: u32,
    /// Next descriptor address, 0 = none.
    pub descaddr: u32,
}

impl DmaDescriptor {
    /// An all-zero (invalid) descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            btctrl: 0,
            btcnt: 0,
            srcaddr: 0,
            dstaddr: 0,
            descaddr: 0,
        }
    }
}

/// Descriptor plus write-back slot for a single-channel DMAC.
///
/// The controller reads these through `BASEADDR` / `WRBADDR`, so the memory
/// must not move once `init` ran. Hand it over as `&'static mut` (from a
/// `StaticCell`).
#[derive(Debug, Default)]
#[repr(C, align(16))]
pub struct DescriptorMemory {
    /// Channel 0 descriptor.
    pub descriptor: DmaDescriptor,
    /// Channel 0 write-back descriptor (written by the controller).
    pub writeback: DmaDescriptor,
}

impl DescriptorMemory {
    /// Zeroed descriptor memory.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            descriptor: DmaDescriptor::new(),
            writeback: DmaDescriptor::new(),
        }
    }
}
