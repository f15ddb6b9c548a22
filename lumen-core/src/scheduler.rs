//! Scheduler contract
//!
//! Callers hand batches of commands to a [`Scheduler`] and get a [`Ticket`]
//! back straight away. Scheduling never suspends. The only suspending
//! operation is [`Scheduler::wait`], which resolves once every command of
//! the ticket's batch has executed (or the batch failed).
//!
//! Commands of one batch execute in order. Batches are independent units;
//! implementations are free to run them in submission order or not.

use core::fmt;
use core::future::Future;

use heapless::Vec;

use crate::command::Command;

/// Most commands accepted in one batch
pub const MAX_BATCH: usize = 32;

/// Most bytes returned by one read command
pub const MAX_READBACK: usize = 8;

const _: () = assert!(MAX_BATCH > 0);

/// Bytes returned by the last read command of a batch; empty for write-only batches
pub type Readback = Vec<u8, MAX_READBACK>;

/// Errors raised while scheduling a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// Batch has no commands
    EmptyBatch,
    /// Batch already holds [`MAX_BATCH`] commands
    BatchFull,
    /// Submission queue cannot take the whole batch right now
    QueueFull,
    /// Too many tickets are waiting for completion
    TooManyInFlight,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::EmptyBatch => write!(f, "batch is empty"),
            ScheduleError::BatchFull => write!(f, "batch is full"),
            ScheduleError::QueueFull => write!(f, "submission queue is full"),
            ScheduleError::TooManyInFlight => write!(f, "too many batches in flight"),
        }
    }
}

/// Errors reported when a batch completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompletionError<E> {
    /// A transaction failed; the rest of the batch was discarded unexecuted
    Transport(E),
    /// Ticket was not issued by this scheduler, or its outcome is no longer held
    UnknownTicket,
}

impl<E: fmt::Debug> fmt::Display for CompletionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Transport(err) => write!(f, "transport error: {:?}", err),
            CompletionError::UnknownTicket => write!(f, "unknown ticket"),
        }
    }
}

/// Handle for one scheduled batch
///
/// Tickets cannot be copied; waiting on one consumes it.
#[must_use = "a batch's outcome is only observed by waiting on its ticket"]
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ticket {
    id: u32,
}

impl Ticket {
    /// Issue a ticket; for use by scheduler implementations
    pub const fn new(id: u32) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> u32 {
        self.id
    }
}

/// Lifecycle of a job
///
/// States only move forward: built, submitted, executing, completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JobState {
    /// Command and handles exist, nothing queued yet
    Built,
    /// Queued, not yet picked up by the transport
    Submitted,
    /// Transport is running the command
    Executing,
    /// Finished, successfully or not
    Completed,
}

impl JobState {
    /// The following state, or `None` once completed
    pub const fn advance(self) -> Option<Self> {
        match self {
            JobState::Built => Some(JobState::Submitted),
            JobState::Submitted => Some(JobState::Executing),
            JobState::Executing => Some(JobState::Completed),
            JobState::Completed => None,
        }
    }

    /// True if `next` is a legal successor of `self`
    pub fn can_become(self, next: Self) -> bool {
        self.advance() == Some(next)
    }
}

/// Ordered group of commands submitted under one ticket
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch<'a> {
    commands: Vec<Command<'a>, MAX_BATCH>,
}

impl<'a> Batch<'a> {
    pub const fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Batch holding one command
    pub fn single(command: Command<'a>) -> Self {
        let mut batch = Self::new();
        // MAX_BATCH is non-zero
        let _ = batch.commands.push(command);
        batch
    }

    /// Collect commands, failing if there are more than [`MAX_BATCH`]
    pub fn try_from_iter<I>(commands: I) -> Result<Self, ScheduleError>
    where
        I: IntoIterator<Item = Command<'a>>,
    {
        let mut batch = Self::new();
        for command in commands {
            batch.push(command)?;
        }
        Ok(batch)
    }

    /// Append a command
    pub fn push(&mut self, command: Command<'a>) -> Result<(), ScheduleError> {
        self.commands
            .push(command)
            .map_err(|_| ScheduleError::BatchFull)
    }

    /// Append every command of `other`
    pub fn append(&mut self, other: Batch<'a>) -> Result<(), ScheduleError> {
        if self.commands.len() + other.len() > MAX_BATCH {
            return Err(ScheduleError::BatchFull);
        }
        for command in other {
            self.push(command)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command<'a>] {
        &self.commands
    }
}

impl<'a> From<Command<'a>> for Batch<'a> {
    fn from(command: Command<'a>) -> Self {
        Self::single(command)
    }
}

impl<'a> IntoIterator for Batch<'a> {
    type Item = Command<'a>;
    type IntoIter = <Vec<Command<'a>, MAX_BATCH> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

/// Caller side of the command pipeline
///
/// `'a` is the lifetime of caller buffers referenced by scheduled
/// commands; they stay borrowed until the scheduler is gone.
pub trait Scheduler<'a> {
    /// Transport error reported at completion
    type Error: fmt::Debug;

    /// Queue a batch for execution without suspending
    fn schedule(&mut self, batch: Batch<'a>) -> Result<Ticket, ScheduleError>;

    /// Suspend until the ticket's batch has completed
    fn wait(
        &mut self,
        ticket: Ticket,
    ) -> impl Future<Output = Result<Readback, CompletionError<Self::Error>>>;

    /// Queue a single command
    fn schedule_one(&mut self, command: Command<'a>) -> Result<Ticket, ScheduleError> {
        self.schedule(Batch::single(command))
    }
}
