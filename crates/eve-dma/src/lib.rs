//! DMA-assisted SPI transfer path to an EVE graphics co-processor
//!
//! The encoding layer fills a [`TransferBuffer`]; [`Transport::start_transfer`]
//! frames it with chip-select and hands it to a DMA channel; the DMA
//! interrupt runs [`Transport::on_complete`], which waits for the SPI shift
//! register to drain, ends the frame and clears the [`BusyFlag`].
//!
//! # Lifecycle
//!
//! ```text
//! reset_index / begin_write
//!         ↓
//! append × n            (BusyFlag idle, buffer owned by the caller)
//!         ↓
//! start_transfer        (RX off, CS low, flag pending, DMA enable)
//!         ↓
//! DMA IRQ → on_complete (ack, wait TXC, RX on, CS high, flag idle)
//! ```
//!
//! # Backends
//!
//! - [`backend::SamDmac`] + [`backend::SercomSpi`]: SAMC2x / SAMx5x registers
//! - [`backend::PollingEngine`]: blocking `embedded-hal` SPI bus
//!
//! Any other target implements [`eve_platform::DmaEngine`] and
//! [`eve_platform::SpiTx`]; the state machine here stays the same.
//!
//! # Features
//!
//! - `std`: `std::error::Error` impls, host mocks from `eve-platform`
//! - `samc2x` / `samx5x`: select `DmacLayout::TARGET`
//! - `cortex-m`: NVIC interrupt line
//! - `defmt`: logging and `defmt::Format` derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod backend;
pub mod buffer;
pub mod busy;
pub mod error;
pub mod shared;
pub mod transport;

pub use buffer::TransferBuffer;
pub use busy::{BusyFlag, BusyState};
pub use error::{BufferFull, TransferError};
pub use shared::{CompletionHandler, SharedTransport};
pub use transport::{TransferStats, Transport};
