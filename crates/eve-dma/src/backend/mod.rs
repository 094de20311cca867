//! Per-target DMA engine adapters
//!
//! - [`sam_dmac`] + [`sercom`]: register-level SAMC2x / SAMx5x DMAC channel
//!   feeding a SERCOM in SPI master mode
//! - [`polling`]: blocking `embedded-hal` SPI bus for targets without DMA
//!
//! All backends compile on every target; the `samc2x` / `samx5x` features
//! only select [`DmacLayout::TARGET`](eve_platform::config::DmacLayout).

pub mod polling;
pub mod sam_dmac;
pub mod sercom;

pub use polling::{PollingEngine, PollingError};
pub use sam_dmac::{SamDmac, SamDmacError};
pub use sercom::SercomSpi;
