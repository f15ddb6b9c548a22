//! Channel-backed scheduler
//!
//! A [`CommandQueue`] connects one caller to one transport task:
//!
//! ```text
//!   QueueScheduler ──submissions──▶ transport (runner)
//!        ▲                              │
//!        └──────────completions─────────┘
//! ```
//!
//! The caller side never blocks: [`QueueScheduler::schedule`] only uses
//! `try_send`, after checking that the whole batch fits. Each command of a
//! batch is sent as its own [`Submission`]; the last one carries `last` so
//! the transport knows when to post the batch's [`Completion`].

use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::command::Command;
use crate::scheduler::{
    Batch, CompletionError, JobState, Readback, ScheduleError, Scheduler, Ticket,
};

/// Submission queue depth, in commands
pub const QUEUE_DEPTH: usize = 32;

/// Most batches awaiting completion at once
pub const MAX_IN_FLIGHT: usize = 4;

/// Outcomes kept for tickets that have not been waited on yet
///
/// When more arrive, the oldest is discarded; waiting on its ticket then
/// reports [`CompletionError::UnknownTicket`].
pub const RETAINED_OUTCOMES: usize = 2 * MAX_IN_FLIGHT;

/// One command on its way to the transport
#[derive(Debug)]
pub struct Submission<'a> {
    /// Ticket of the batch this command belongs to
    pub ticket: u32,
    /// Final command of the batch
    pub last: bool,
    pub command: Command<'a>,
}

/// Outcome of one batch, posted by the transport
#[derive(Debug)]
pub struct Completion<E> {
    pub ticket: u32,
    pub outcome: Result<Readback, E>,
}

/// Channels shared by a scheduler and its transport
///
/// Serves exactly one [`QueueScheduler`]: completions are matched to
/// tickets by the scheduler that issued them.
pub struct CommandQueue<'a, M: RawMutex, E> {
    submissions: Channel<M, Submission<'a>, QUEUE_DEPTH>,
    completions: Channel<M, Completion<E>, MAX_IN_FLIGHT>,
}

impl<'a, M: RawMutex, E> CommandQueue<'a, M, E> {
    pub const fn new() -> Self {
        Self {
            submissions: Channel::new(),
            completions: Channel::new(),
        }
    }

    /// Caller-side handle
    pub fn scheduler(&self) -> QueueScheduler<'_, 'a, M, E> {
        QueueScheduler {
            queue: self,
            next_ticket: 0,
            outstanding: Vec::new(),
            finished: Vec::new(),
        }
    }

    /// Next submission, waiting if none is queued (transport side)
    pub async fn receive(&self) -> Submission<'a> {
        self.submissions.receive().await
    }

    /// Next submission if one is queued (transport side)
    pub fn try_receive(&self) -> Option<Submission<'a>> {
        self.submissions.try_receive().ok()
    }

    /// Post a batch outcome (transport side)
    pub async fn complete(&self, completion: Completion<E>) {
        self.completions.send(completion).await
    }

    /// Commands waiting for the transport
    pub fn pending(&self) -> usize {
        self.submissions.len()
    }
}

impl<M: RawMutex, E> Default for CommandQueue<'_, M, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Scheduler`] over a [`CommandQueue`]
///
/// A batch counts against [`MAX_IN_FLIGHT`] until the transport posts its
/// outcome, whether or not its ticket is ever waited on. Outcomes that
/// arrive before their ticket is waited on are retained, up to
/// [`RETAINED_OUTCOMES`].
pub struct QueueScheduler<'q, 'a, M: RawMutex, E> {
    queue: &'q CommandQueue<'a, M, E>,
    next_ticket: u32,
    outstanding: Vec<u32, MAX_IN_FLIGHT>,
    finished: Vec<(u32, Result<Readback, E>), RETAINED_OUTCOMES>,
}

impl<'a, M: RawMutex, E> QueueScheduler<'_, 'a, M, E> {
    /// Batches the transport has not finished yet
    pub fn in_flight(&mut self) -> usize {
        self.collect_ready();
        self.outstanding.len()
    }

    /// Where a ticket's batch stands, as far as the caller can tell
    ///
    /// Reports `Submitted` until the transport has posted the outcome; the
    /// executing phase is only visible on the transport side. `None` for a
    /// ticket this scheduler has no record of.
    pub fn state(&mut self, ticket: &Ticket) -> Option<JobState> {
        self.collect_ready();
        let id = ticket.id();
        if self.finished.iter().any(|(t, _)| *t == id) {
            Some(JobState::Completed)
        } else if self.outstanding.contains(&id) {
            Some(JobState::Submitted)
        } else {
            None
        }
    }

    /// Wait until every outstanding batch has completed
    ///
    /// Outcomes stay available to [`Scheduler::wait`].
    pub async fn drain(&mut self) {
        while !self.outstanding.is_empty() {
            let completion = self.queue.completions.receive().await;
            self.keep(completion);
        }
    }

    fn collect_ready(&mut self) {
        while let Ok(completion) = self.queue.completions.try_receive() {
            self.keep(completion);
        }
    }

    fn keep(&mut self, completion: Completion<E>) {
        self.outstanding.retain(|&t| t != completion.ticket);
        if self.finished.is_full() {
            self.finished.remove(0);
        }
        // Room was made above
        let _ = self.finished.push((completion.ticket, completion.outcome));
    }

    fn take_finished(&mut self, id: u32) -> Option<Result<Readback, E>> {
        let index = self.finished.iter().position(|(t, _)| *t == id)?;
        Some(self.finished.remove(index).1)
    }
}

impl<'a, M: RawMutex, E: fmt::Debug> Scheduler<'a> for QueueScheduler<'_, 'a, M, E> {
    type Error = E;

    fn schedule(&mut self, batch: Batch<'a>) -> Result<Ticket, ScheduleError> {
        if batch.is_empty() {
            return Err(ScheduleError::EmptyBatch);
        }
        self.collect_ready();
        if self.outstanding.is_full() {
            return Err(ScheduleError::TooManyInFlight);
        }
        if self.queue.submissions.free_capacity() < batch.len() {
            return Err(ScheduleError::QueueFull);
        }

        let id = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);

        let last = batch.len() - 1;
        for (index, command) in batch.into_iter().enumerate() {
            // Capacity was checked above and this is the only producer
            self.queue
                .submissions
                .try_send(Submission {
                    ticket: id,
                    last: index == last,
                    command,
                })
                .map_err(|_| ScheduleError::QueueFull)?;
        }
        self.outstanding
            .push(id)
            .map_err(|_| ScheduleError::TooManyInFlight)?;

        Ok(Ticket::new(id))
    }

    async fn wait(&mut self, ticket: Ticket) -> Result<Readback, CompletionError<E>> {
        let id = ticket.id();
        if let Some(outcome) = self.take_finished(id) {
            return outcome.map_err(CompletionError::Transport);
        }
        if !self.outstanding.contains(&id) {
            return Err(CompletionError::UnknownTicket);
        }

        loop {
            let completion = self.queue.completions.receive().await;
            if completion.ticket == id {
                self.outstanding.retain(|&t| t != id);
                return completion.outcome.map_err(CompletionError::Transport);
            }
            self.keep(completion);
        }
    }
}
