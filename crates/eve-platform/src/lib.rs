//! Platform layer for the EVE co-processor SPI/DMA transfer path
//!
//! This crate provides the hardware-facing capabilities the transfer core in
//! `eve-dma` is built on. Every capability is a trait so the core state
//! machine runs unchanged against real registers, a HAL, or the simulated
//! peripherals in [`mocks`].
//!
//! # Architecture Layers
//!
//! ```text
//! Command encoding (out of scope: display lists, co-processor commands)
//!         ↓
//! Transfer core (eve-dma: buffer, busy flag, completion handler)
//!         ↓
//! Platform layer (this crate - trait abstractions)
//!         ↓
//! Hardware (SAM DMAC + SERCOM registers, embedded-hal SPI bus, NVIC)
//! ```
//!
//! # Capabilities
//!
//! - [`DmaEngine`] - one DMA channel bound to the SPI transmit trigger
//! - [`SpiTx`] - receive-path gate and shift-register drain flag
//! - [`IrqLine`] - completion interrupt registration
//! - [`RegisterBlock`] - raw register access for register-level backends
//! - [`ChipSelect`] / [`PowerDown`] - the co-processor's GPIO lines
//!
//! # Features
//!
//! - `std`: simulated peripherals for host tests ([`mocks`])
//! - `cortex-m`: NVIC-backed [`IrqLine`]
//! - `defmt`: `defmt::Format` derives

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
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
// Pedantic lints suppressed for this hardware crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod dma;
pub mod dma_safety;
pub mod gpio;
pub mod irq;
pub mod mocks;
pub mod regs;
pub mod spi;

pub use config::{DmaConfig, DmacLayout};
pub use dma::{Armed, DmaDescriptor, DmaEngine, DescriptorMemory};
pub use dma_safety::Align32;
pub use gpio::{ChipSelect, PinState, PowerDown};
pub use irq::IrqLine;
pub use regs::{Mmio, RegisterBlock};
pub use spi::{BitOrder, NoReceiverGate, SpiConfig, SpiMode, SpiTx};
