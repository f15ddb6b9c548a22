//! Bus runner
//!
//! The runner is the transport's execution context. For every submission
//! it takes off the queue it:
//!
//! 1. creates the command-phase handle, and a data-phase handle if the
//!    command has a data phase, and binds them with the command into a job
//! 2. writes the opcode, then writes the payload; a read sends the opcode
//!    and takes the response in one bus query
//! 3. drops the job, releasing the payload and both handles
//! 4. on the batch's last command, posts the batch outcome
//!
//! After a failed phase the remaining commands of that batch are dropped
//! unexecuted and the batch completes with the error. Nothing is retried.

use embassy_sync::blocking_mutex::raw::RawMutex;
use lumen_core::opcode::Direction;
use lumen_core::queue::{CommandQueue, Completion, Submission};
use lumen_core::scheduler::{Readback, MAX_READBACK};
use lumen_core::{Command, Job};
use lumen_hal::{DisplayBus, TransactionNature};

/// Counters kept by a runner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunnerStats {
    /// Commands that ran both phases successfully
    pub executed: u32,
    /// Commands dropped because an earlier command of their batch failed
    pub discarded: u32,
    /// Batches completed with an error
    pub failed_batches: u32,
}

/// Executes queued commands on a display bus
pub struct BusRunner<B: DisplayBus> {
    bus: B,
    failure: Option<B::Error>,
    readback: Readback,
    stats: RunnerStats,
}

impl<B: DisplayBus> BusRunner<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            failure: None,
            readback: Readback::new(),
            stats: RunnerStats::default(),
        }
    }

    pub fn stats(&self) -> RunnerStats {
        self.stats
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Serve the queue forever
    pub async fn run<M: RawMutex>(&mut self, queue: &CommandQueue<'_, M, B::Error>) -> ! {
        loop {
            self.step(queue).await;
        }
    }

    /// Wait for one submission and process it
    pub async fn step<M: RawMutex>(&mut self, queue: &CommandQueue<'_, M, B::Error>) {
        let submission = queue.receive().await;
        self.process(queue, submission).await;
    }

    /// Process every submission already queued, returning how many there were
    pub async fn run_pending<M: RawMutex>(
        &mut self,
        queue: &CommandQueue<'_, M, B::Error>,
    ) -> usize {
        let mut processed = 0;
        while let Some(submission) = queue.try_receive() {
            self.process(queue, submission).await;
            processed += 1;
        }
        processed
    }

    async fn process<'a, M: RawMutex>(
        &mut self,
        queue: &CommandQueue<'a, M, B::Error>,
        submission: Submission<'a>,
    ) {
        let Submission {
            ticket,
            last,
            command,
        } = submission;

        if self.failure.is_some() {
            #[cfg(feature = "defmt")]
            defmt::trace!("ticket {}: discarding {}", ticket, command.opcode());
            drop(command);
            self.stats.discarded += 1;
        } else if let Err(err) = self.execute(command).await {
            #[cfg(feature = "defmt")]
            defmt::warn!("ticket {}: transport error {}", ticket, defmt::Debug2Format(&err));
            self.failure = Some(err);
        } else {
            self.stats.executed += 1;
        }

        if last {
            let outcome = match self.failure.take() {
                Some(err) => {
                    self.stats.failed_batches += 1;
                    self.readback.clear();
                    Err(err)
                }
                None => Ok(core::mem::take(&mut self.readback)),
            };
            queue.complete(Completion { ticket, outcome }).await;
        }
    }

    async fn execute(&mut self, command: Command<'_>) -> Result<(), B::Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("executing {}", command);

        let command_phase = self.bus.transaction(TransactionNature::Command, 1);
        let bus = &mut self.bus;
        let mut job = Job::new(command, command_phase, |command| {
            bus.transaction(data_nature(command.direction()), data_len(command))
        });

        let result = execute_job(&mut self.bus, &mut job, &mut self.readback).await;
        // Payload and both handles are released here, before the batch completes
        drop(job);
        result
    }
}

fn data_nature(direction: Direction) -> TransactionNature {
    match direction {
        Direction::Read => TransactionNature::DataRead,
        Direction::Write | Direction::None => TransactionNature::DataWrite,
    }
}

/// Bytes moved by the data phase; responses are capped at the readback size
fn data_len(command: &Command<'_>) -> usize {
    match command.direction() {
        Direction::Read => command.len().min(MAX_READBACK),
        Direction::Write | Direction::None => command.len(),
    }
}

async fn execute_job<B: DisplayBus>(
    bus: &mut B,
    job: &mut Job<'_, B::Transaction>,
    readback: &mut Readback,
) -> Result<(), B::Error> {
    let (command, command_phase, data_phase) = job.parts_mut();
    let opcode = command.opcode().code();

    match (command.direction(), data_phase) {
        (Direction::Read, Some(data_phase)) => {
            let len = data_len(command);
            let mut buf = [0u8; MAX_READBACK];
            bus.query(command_phase, opcode, data_phase, &mut buf[..len])
                .await?;
            readback.clear();
            // len <= MAX_READBACK
            let _ = readback.extend_from_slice(&buf[..len]);
        }
        (_, data_phase) => {
            bus.write(command_phase, &[opcode]).await?;
            if let Some(data_phase) = data_phase {
                if !command.is_empty() {
                    bus.write(data_phase, command.payload()).await?;
                }
            }
        }
    }
    Ok(())
}
