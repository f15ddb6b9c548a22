//! Command payload storage
//!
//! A payload is the data phase that follows an opcode. Most ST7789 commands
//! carry a handful of parameter bytes, so those live inline in the command
//! value. Longer payloads live in a separate buffer, and the variant records
//! who releases it:
//!
//! | length            | source            | variant    | released by           |
//! |-------------------|-------------------|------------|-----------------------|
//! | <= capacity       | copied            | `Inline`   | nobody (part of value)|
//! | > capacity        | caller buffer     | `Borrowed` | caller                |
//! | > capacity        | built by factory  | `Owned`    | `Drop`, exactly once  |
//!
//! A borrowed buffer carries the caller's lifetime, so the borrow checker
//! keeps it alive and unmodified for as long as any command, job or queued
//! submission refers to it.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::command::CommandError;

/// Number of payload bytes stored inline without allocating
pub const INLINE_CAPACITY: usize = 8;

/// Who is responsible for releasing a payload's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ownership {
    /// Stored inside the payload value
    Inline,
    /// Heap buffer freed when the payload is dropped
    System,
    /// Caller memory, never freed here
    Caller,
}

/// Payload bytes of a command
///
/// The storage variant is private so the inline invariants (length within
/// [`INLINE_CAPACITY`], zeroed tail) hold for every value; use
/// [`ownership`](Payload::ownership) to inspect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload<'a>(Repr<'a>);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Repr<'a> {
    /// Up to [`INLINE_CAPACITY`] bytes; bytes past `len` are always zero
    Inline {
        len: u8,
        bytes: [u8; INLINE_CAPACITY],
    },
    /// Heap buffer allocated by the factory
    Owned(Box<[u8]>),
    /// Caller buffer, referenced without copying
    Borrowed(&'a [u8]),
}

impl Payload<'static> {
    /// Zero-length payload (opcode-only command)
    pub const fn empty() -> Self {
        Payload(Repr::Inline {
            len: 0,
            bytes: [0; INLINE_CAPACITY],
        })
    }

    /// Fixed-size parameter block stored inline
    pub const fn inline<const N: usize>(params: [u8; N]) -> Self {
        const { assert!(N <= INLINE_CAPACITY) };
        let mut bytes = [0; INLINE_CAPACITY];
        let mut i = 0;
        while i < N {
            bytes[i] = params[i];
            i += 1;
        }
        Payload(Repr::Inline {
            len: N as u8,
            bytes,
        })
    }

    /// Acquire `len` zeroed, writable bytes
    ///
    /// Short payloads use inline storage and never allocate. Longer ones get
    /// a fresh heap buffer; if that allocation fails nothing is returned but
    /// the error.
    pub fn acquire(len: usize) -> Result<Self, CommandError> {
        if len <= INLINE_CAPACITY {
            return Ok(Payload(Repr::Inline {
                len: len as u8,
                bytes: [0; INLINE_CAPACITY],
            }));
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| CommandError::Allocation { len })?;
        buffer.resize(len, 0);
        Ok(Payload(Repr::Owned(buffer.into_boxed_slice())))
    }

    /// Acquire `len` bytes and fill them in place
    pub fn encode(len: usize, fill: impl FnOnce(&mut [u8])) -> Result<Self, CommandError> {
        let mut payload = Self::acquire(len)?;
        if let Some(buf) = payload.bytes_mut() {
            fill(buf);
        }
        Ok(payload)
    }

    /// Copy `data` into storage this payload owns, whatever its length
    pub fn copied(data: &[u8]) -> Result<Self, CommandError> {
        Self::encode(data.len(), |buf| buf.copy_from_slice(data))
    }
}

impl<'a> Payload<'a> {
    /// Store a caller buffer
    ///
    /// Short buffers are copied inline, after which the caller may reuse
    /// `data` immediately. Longer buffers are referenced, not copied.
    pub fn from_caller(data: &'a [u8]) -> Self {
        if data.len() <= INLINE_CAPACITY {
            let mut bytes = [0; INLINE_CAPACITY];
            bytes[..data.len()].copy_from_slice(data);
            Payload(Repr::Inline {
                len: data.len() as u8,
                bytes,
            })
        } else {
            Payload(Repr::Borrowed(data))
        }
    }

    /// Number of payload bytes
    pub fn len(&self) -> usize {
        match &self.0 {
            Repr::Inline { len, .. } => *len as usize,
            Repr::Owned(buffer) => buffer.len(),
            Repr::Borrowed(data) => data.len(),
        }
    }

    /// True for opcode-only commands
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The payload bytes
    pub fn as_slice(&self) -> &[u8] {
        match &self.0 {
            Repr::Inline { len, bytes } => &bytes[..*len as usize],
            Repr::Owned(buffer) => buffer,
            Repr::Borrowed(data) => data,
        }
    }

    /// Address of the first payload byte
    pub fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    /// Whole inline storage, including the zeroed tail past `len`
    pub fn inline_storage(&self) -> Option<&[u8; INLINE_CAPACITY]> {
        match &self.0 {
            Repr::Inline { bytes, .. } => Some(bytes),
            Repr::Owned(_) | Repr::Borrowed(_) => None,
        }
    }

    /// Detach the payload from caller memory
    ///
    /// Inline and system-owned payloads move unchanged. A borrowed payload
    /// is copied into a system-owned buffer, which may fail to allocate.
    pub fn into_static(self) -> Result<Payload<'static>, CommandError> {
        match self.0 {
            Repr::Inline { len, bytes } => Ok(Payload(Repr::Inline { len, bytes })),
            Repr::Owned(buffer) => Ok(Payload(Repr::Owned(buffer))),
            Repr::Borrowed(data) => Payload::copied(data),
        }
    }

    /// Where the bytes live and who frees them
    pub fn ownership(&self) -> Ownership {
        match &self.0 {
            Repr::Inline { .. } => Ownership::Inline,
            Repr::Owned(_) => Ownership::System,
            Repr::Borrowed(_) => Ownership::Caller,
        }
    }

    /// Writable view while the payload is being built
    ///
    /// Caller buffers are never writable through a payload.
    fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.0 {
            Repr::Inline { len, bytes } => Some(&mut bytes[..*len as usize]),
            Repr::Owned(buffer) => Some(buffer),
            Repr::Borrowed(_) => None,
        }
    }
}

impl AsRef<[u8]> for Payload<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload() {
        let payload = Payload::empty();
        assert_eq!(payload.len(), 0);
        assert!(payload.is_empty());
        assert_eq!(payload.ownership(), Ownership::Inline);
    }

    #[test]
    fn test_small_caller_buffer_is_copied() {
        let mut source = [1u8, 2, 3, 4];
        let payload = Payload::from_caller(&source).into_static().unwrap();
        assert_eq!(payload.ownership(), Ownership::Inline);

        source[0] = 0xFF;
        assert_eq!(source[0], 0xFF);
        assert_eq!(payload.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_capacity_boundary() {
        let at_capacity = [7u8; INLINE_CAPACITY];
        assert_eq!(
            Payload::from_caller(&at_capacity).ownership(),
            Ownership::Inline
        );

        let over_capacity = [7u8; INLINE_CAPACITY + 1];
        assert_eq!(
            Payload::from_caller(&over_capacity).ownership(),
            Ownership::Caller
        );
    }

    #[test]
    fn test_large_caller_buffer_is_referenced() {
        let source = [0xA5u8; 64];
        let payload = Payload::from_caller(&source);
        assert_eq!(payload.ownership(), Ownership::Caller);
        assert_eq!(payload.as_ptr(), source.as_ptr());
        assert_eq!(payload.len(), 64);
    }

    #[test]
    fn test_into_static_copies_borrowed_bytes() {
        let mut source = [0x5Au8; 40];
        let payload = Payload::from_caller(&source).into_static().unwrap();
        assert_eq!(payload.ownership(), Ownership::System);

        source.fill(0);
        assert_eq!(payload.as_slice(), &[0x5A; 40][..]);
    }

    #[test]
    fn test_inline_params() {
        let payload = Payload::inline([0xA4, 0x93]);
        assert_eq!(payload.as_slice(), &[0xA4, 0x93]);
        assert_eq!(payload.ownership(), Ownership::Inline);
    }

    #[test]
    fn test_acquire_small_is_inline_and_zeroed() {
        let payload = Payload::acquire(3).unwrap();
        assert_eq!(payload.ownership(), Ownership::Inline);
        assert_eq!(payload.as_slice(), &[0, 0, 0]);
    }

    #[test]
    fn test_acquire_large_is_system_owned() {
        let payload = Payload::acquire(14).unwrap();
        assert_eq!(payload.ownership(), Ownership::System);
        assert_eq!(payload.len(), 14);
        assert!(payload.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_leaves_tail_zeroed() {
        let payload = Payload::encode(1, |buf| buf[0] = 0x55).unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(
            payload.inline_storage(),
            Some(&[0x55, 0, 0, 0, 0, 0, 0, 0])
        );
    }

    #[test]
    fn test_copied_never_borrows() {
        let source = [3u8; 32];
        let payload = Payload::copied(&source).unwrap();
        assert_eq!(payload.ownership(), Ownership::System);
        assert_ne!(payload.as_ptr(), source.as_ptr());
        assert_eq!(payload.as_slice(), &source[..]);
    }

    #[test]
    fn test_impossible_allocation_fails_cleanly() {
        let result = Payload::acquire(usize::MAX);
        assert_eq!(result, Err(CommandError::Allocation { len: usize::MAX }));
    }
}
