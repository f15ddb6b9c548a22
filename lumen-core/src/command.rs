//! Command descriptors
//!
//! A [`Command`] is everything the transport needs to run one controller
//! operation: the opcode, the data phase direction and the payload. It is
//! immutable once built; the fields are only reachable through accessors.

use core::fmt;

use crate::opcode::{Direction, Opcode};
use crate::payload::{Ownership, Payload};

/// Errors raised while building a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// A system-owned payload buffer could not be allocated
    Allocation {
        /// Requested payload length
        len: usize,
    },
    /// The payload length does not fit the opcode
    Length {
        /// Opcode the payload was attached to
        opcode: Opcode,
        /// Length the opcode takes
        expected: usize,
        /// Length supplied
        actual: usize,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Allocation { len } => {
                write!(f, "failed to allocate a {}-byte payload", len)
            }
            CommandError::Length {
                opcode,
                expected,
                actual,
            } => write!(
                f,
                "{:?} takes {} payload bytes, got {}",
                opcode, expected, actual
            ),
        }
    }
}

/// A transport-ready controller command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    opcode: Opcode,
    direction: Direction,
    payload: Payload<'a>,
}

impl<'a> Command<'a> {
    /// Build a command; the direction follows from the opcode
    ///
    /// The payload must be exactly as long as the opcode's parameter block.
    /// Bulk memory writes accept any length.
    pub fn new(opcode: Opcode, payload: Payload<'a>) -> Result<Self, CommandError> {
        match opcode.payload_len() {
            Some(expected) if expected != payload.len() => Err(CommandError::Length {
                opcode,
                expected,
                actual: payload.len(),
            }),
            _ => Ok(Self::new_unchecked(opcode, payload)),
        }
    }

    /// Factory path: lengths are fixed by the constructor's layout
    pub(crate) fn new_unchecked(opcode: Opcode, payload: Payload<'a>) -> Self {
        Self {
            opcode,
            direction: opcode.direction(),
            payload,
        }
    }

    /// Opcode sent during the command phase
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Data phase direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Data phase length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True when only the opcode is sent
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Data phase bytes
    pub fn payload(&self) -> &[u8] {
        self.payload.as_slice()
    }

    /// Who releases the payload bytes
    pub fn ownership(&self) -> Ownership {
        self.payload.ownership()
    }

    /// Underlying payload store
    pub fn payload_store(&self) -> &Payload<'a> {
        &self.payload
    }

    /// Detach the command from caller memory, copying a borrowed payload
    pub fn into_static(self) -> Result<Command<'static>, CommandError> {
        Ok(Command {
            opcode: self.opcode,
            direction: self.direction,
            payload: self.payload.into_static()?,
        })
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Command<'_> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Command {{ opcode: {}, direction: {}, len: {} }}",
            self.opcode,
            self.direction,
            self.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_only_command() {
        let command = Command::new(Opcode::SwReset, Payload::empty()).unwrap();
        assert_eq!(command.opcode(), Opcode::SwReset);
        assert_eq!(command.direction(), Direction::None);
        assert!(command.is_empty());
        assert_eq!(command.ownership(), Ownership::Inline);
    }

    #[test]
    fn test_direction_follows_opcode() {
        let command = Command::new(Opcode::PixelFormat, Payload::from_caller(&[0x55])).unwrap();
        assert_eq!(command.direction(), Direction::Write);
        assert_eq!(command.payload(), &[0x55]);
    }

    #[test]
    fn test_into_static_keeps_fields() {
        let source = [1u8, 2];
        let command = Command::new(Opcode::PowerControl1, Payload::from_caller(&source))
            .unwrap()
            .into_static()
            .unwrap();
        assert_eq!(command.opcode(), Opcode::PowerControl1);
        assert_eq!(command.payload(), &[1, 2]);
    }

    #[test]
    fn test_payload_length_must_match_opcode() {
        let err = Command::new(Opcode::SwReset, Payload::from_caller(&[1, 2, 3])).unwrap_err();
        assert_eq!(
            err,
            CommandError::Length {
                opcode: Opcode::SwReset,
                expected: 0,
                actual: 3,
            }
        );

        let err = Command::new(Opcode::ColumnAddressSet, Payload::inline([0, 1])).unwrap_err();
        assert!(matches!(err, CommandError::Length { expected: 4, actual: 2, .. }));
    }

    #[test]
    fn test_bulk_write_takes_any_length() {
        let pixels = [0xF8u8; 3];
        let command = Command::new(Opcode::MemoryWrite, Payload::from_caller(&pixels)).unwrap();
        assert_eq!(command.len(), 3);
        assert!(Command::new(Opcode::MemoryWriteContinue, Payload::empty()).is_ok());
    }

    #[test]
    fn test_borrowed_payload_is_copied_when_detached() {
        let mut pixels = [0x1Fu8; 32];
        let command = Command::new(Opcode::MemoryWrite, Payload::from_caller(&pixels))
            .unwrap()
            .into_static()
            .unwrap();
        assert_eq!(command.ownership(), Ownership::System);

        pixels.fill(0);
        assert_eq!(command.payload(), &[0x1F; 32][..]);
    }

    #[test]
    fn test_length_error_display() {
        use alloc::string::ToString;

        let err = CommandError::Length {
            opcode: Opcode::PowerControl1,
            expected: 2,
            actual: 5,
        };
        assert_eq!(err.to_string(), "PowerControl1 takes 2 payload bytes, got 5");
    }

    #[test]
    fn test_allocation_error_display() {
        use alloc::string::ToString;

        let err = CommandError::Allocation { len: 14 };
        assert_eq!(err.to_string(), "failed to allocate a 14-byte payload");
    }
}
