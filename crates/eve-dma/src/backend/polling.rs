//! Blocking fallback for targets without a usable DMA path
//!
//! Sends the wire bytes through an `embedded-hal` [`SpiBus`] and flushes
//! before returning, then reports the transfer as already completed. Pair it
//! with [`NoReceiverGate`](eve_platform::spi::NoReceiverGate): the bus owns
//! its receiver and is idle once `flush` returns.

use embedded_hal::spi::{Error as _, SpiBus};
use eve_platform::dma::{Armed, DmaEngine};

/// Polling backend errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollingError<E> {
    /// Zero-length transfer.
    Empty,
    /// The bus failed the write or flush.
    Bus(E),
}

#[cfg(feature = "std")]
impl<E: embedded_hal::spi::Error> std::error::Error for PollingError<E> {}

impl<E: embedded_hal::spi::Error> core::fmt::Display for PollingError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "Zero-length SPI transfer"),
            Self::Bus(e) => write!(f, "SPI bus error: {}", e.kind()),
        }
    }
}

/// Synchronous [`DmaEngine`] over a blocking SPI bus.
#[derive(Debug)]
pub struct PollingEngine<B> {
    bus: B,
}

impl<B: SpiBus> PollingEngine<B> {
    /// Engine writing through `bus`.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Give back the bus.
    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B: SpiBus> DmaEngine for PollingEngine<B> {
    type Error = PollingError<B::Error>;

    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn prepare(&mut self, source: &[u8]) -> Result<(), Self::Error> {
        if source.is_empty() {
            return Err(PollingError::Empty);
        }
        Ok(())
    }

    fn start(&mut self, source: &[u8]) -> Result<Armed, Self::Error> {
        self.bus.write(source).map_err(PollingError::Bus)?;
        self.bus.flush().map_err(PollingError::Bus)?;
        Ok(Armed::Completed)
    }

    fn acknowledge(&mut self) {}
}
