//! Board-agnostic command layer for ST7789 display controllers
//!
//! This crate turns controller operations into transport-ready commands
//! and hands them to the transport through a scheduler:
//!
//! - Payload storage (inline, system-owned, caller-borrowed)
//! - Opcodes and their data phase directions
//! - Command factory with the datasheet bit layouts
//! - Jobs binding a command to its transaction handles
//! - Scheduler contract and a channel-backed implementation
//! - Panel configuration and the init sequence
//!
//! ```text
//!   factory::caset(..) ─┐
//!   factory::ramwr(..) ─┼─▶ Batch ─▶ Scheduler::schedule ─▶ Ticket
//!   factory::dispon() ──┘                 │
//!                                   CommandQueue
//!                                         │
//!                      transport: Job { command, handles } ─▶ bus
//!                                         │
//!                   Scheduler::wait(ticket) ◀── Completion
//! ```

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod command;
pub mod config;
pub mod factory;
pub mod job;
pub mod opcode;
pub mod payload;
pub mod queue;
pub mod scheduler;

pub use command::{Command, CommandError};
pub use config::{ConfigError, PanelConfig};
pub use factory::{GammaTable, PorchSettings};
pub use job::Job;
pub use opcode::{Direction, Opcode, Orientation, PixelFormat};
pub use payload::{Ownership, Payload, INLINE_CAPACITY};
pub use queue::{
    CommandQueue, Completion, QueueScheduler, Submission, MAX_IN_FLIGHT, QUEUE_DEPTH,
    RETAINED_OUTCOMES,
};
pub use scheduler::{
    Batch, CompletionError, JobState, Readback, ScheduleError, Scheduler, Ticket, MAX_BATCH,
    MAX_READBACK,
};
