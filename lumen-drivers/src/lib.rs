//! Transport side of the command pipeline
//!
//! - [`runner::BusRunner`]: pulls submissions off a command queue, builds a
//!   job per command and executes it on a [`DisplayBus`](lumen_hal::DisplayBus)
//! - [`spi::SpiDisplayBus`]: 4-wire SPI bus with a D/C pin
//! - [`reset::hard_reset`]: RESX pulse with the datasheet timings

#![no_std]
#![deny(unsafe_code)]

pub mod reset;
pub mod runner;
pub mod spi;

pub use reset::hard_reset;
pub use runner::{BusRunner, RunnerStats};
pub use spi::{SpiBusError, SpiDisplayBus, SpiTransaction};
