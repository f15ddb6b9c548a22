//! Jobs: a command bound to its transport handles
//!
//! The transport builds a [`Job`] when it picks up a submitted command and
//! drops it once the command has executed. Dropping the job releases the
//! command payload (per its [`Ownership`](crate::payload::Ownership)) and
//! both transaction handles, so every resource tied to one command goes
//! away at the same point.

use crate::command::Command;
use crate::opcode::Direction;

/// A command together with the transaction handles that carry it
#[derive(Debug)]
pub struct Job<'a, T> {
    command: Command<'a>,
    command_phase: T,
    data_phase: Option<T>,
}

impl<'a, T> Job<'a, T> {
    /// Bind a command to its handles
    ///
    /// `data_phase` is only called when the command has a data phase, so
    /// opcode-only commands never create a second transaction.
    pub fn new(
        command: Command<'a>,
        command_phase: T,
        data_phase: impl FnOnce(&Command<'a>) -> T,
    ) -> Self {
        let data_phase = match command.direction() {
            Direction::None => None,
            Direction::Write | Direction::Read => Some(data_phase(&command)),
        };
        Self {
            command,
            command_phase,
            data_phase,
        }
    }

    pub fn command(&self) -> &Command<'a> {
        &self.command
    }

    pub fn command_phase_mut(&mut self) -> &mut T {
        &mut self.command_phase
    }

    /// Data phase handle, absent for opcode-only commands
    pub fn data_phase_mut(&mut self) -> Option<&mut T> {
        self.data_phase.as_mut()
    }

    /// Split borrow used while executing both phases
    pub fn parts_mut(&mut self) -> (&Command<'a>, &mut T, Option<&mut T>) {
        (
            &self.command,
            &mut self.command_phase,
            self.data_phase.as_mut(),
        )
    }

    /// Release the handles and keep the command
    pub fn into_command(self) -> Command<'a> {
        self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory;
    use core::cell::Cell;

    struct Handle<'c> {
        drops: &'c Cell<u32>,
    }

    impl Drop for Handle<'_> {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn test_opcode_only_job_has_no_data_phase() {
        let mut calls = 0;
        let mut job = Job::new(factory::dispon(), 1u8, |_| {
            calls += 1;
            2u8
        });
        assert_eq!(calls, 0);
        assert!(job.data_phase_mut().is_none());
        assert_eq!(*job.command_phase_mut(), 1);
    }

    #[test]
    fn test_write_job_has_data_phase() {
        let mut job = Job::new(factory::caset(0, 239), 1u8, |command| command.len() as u8);
        assert_eq!(job.data_phase_mut(), Some(&mut 4));
        assert_eq!(job.command().opcode(), crate::opcode::Opcode::ColumnAddressSet);
    }

    #[test]
    fn test_drop_releases_both_handles() {
        let drops = Cell::new(0);
        let job = Job::new(
            factory::colmod(Default::default()),
            Handle { drops: &drops },
            |_| Handle { drops: &drops },
        );
        assert_eq!(drops.get(), 0);
        drop(job);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_into_command_releases_handles() {
        let drops = Cell::new(0);
        let job = Job::new(factory::rddid(), Handle { drops: &drops }, |_| Handle {
            drops: &drops,
        });
        let command = job.into_command();
        assert_eq!(drops.get(), 2);
        assert_eq!(command.len(), 3);
    }
}
