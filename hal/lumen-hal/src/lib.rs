//! Lumen Hardware Abstraction Layer
//!
//! This crate defines the boundary between the display command layer and
//! whatever actually moves bytes to the panel controller. Chip-specific
//! transports implement these traits; `lumen-core` never sees a bus.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (lumen-firmware, etc.)     │
//! └─────────────────────────────────────────┘
//!                     │  Command / Batch
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  lumen-core (commands, scheduler)       │
//! └─────────────────────────────────────────┘
//!                     │  Submission
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  lumen-drivers (runner, SPI bus)        │
//! └─────────────────────────────────────────┘
//!                     │  DisplayBus (this crate)
//!                     ▼
//!               SPI + D/C pin
//! ```
//!
//! # Traits
//!
//! - [`bus::DisplayBus`] - Transaction-based command/data transport
//! - [`spi::SpiConfig`] - Bus clock and mode settings

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod spi;

pub use bus::{DisplayBus, TransactionNature};
pub use spi::{Mode, SpiConfig};
