//! Display bus abstraction
//!
//! A display controller command travels as up to two bus transactions: the
//! opcode byte with D/C low, then an optional data phase with D/C high. The
//! transport hands out one opaque transaction handle per phase; the handle
//! lives inside the job that owns the command until that job completes.
//!
//! Reads are the exception on the wire: the controller drops a read if the
//! bus is released between opcode and response, so [`DisplayBus::query`]
//! runs both phases as one transfer.

/// What a single bus transaction carries
///
/// Attached to every transaction so the transport can drive the D/C and
/// R/W lines before clocking bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransactionNature {
    /// Opcode byte. D/C = 0, R/W = 0.
    Command,
    /// Parameter bytes read back from the controller. D/C = 1, R/W = 1.
    DataRead,
    /// Parameter bytes written to the controller. D/C = 1, R/W = 0.
    DataWrite,
}

impl TransactionNature {
    /// Level of the D/C line during this transaction
    pub const fn dc_high(self) -> bool {
        !matches!(self, TransactionNature::Command)
    }

    /// Whether bytes flow from the controller to the host
    pub const fn is_read(self) -> bool {
        matches!(self, TransactionNature::DataRead)
    }
}

/// Transaction-based display transport
///
/// Implementations own the physical bus. Handles are created when a command
/// is submitted and dropped together with the job that owns them, which only
/// happens once the job's transactions have finished.
pub trait DisplayBus {
    /// Opaque per-phase transaction handle
    type Transaction;

    /// Transport error, reported back to whoever awaits the command
    type Error: core::fmt::Debug;

    /// Create the handle for one phase of a command
    ///
    /// # Arguments
    /// * `nature` - Command, data read or data write phase
    /// * `len` - Number of bytes the phase will move
    fn transaction(&mut self, nature: TransactionNature, len: usize) -> Self::Transaction;

    /// Clock `data` out to the controller as the given transaction
    fn write(
        &mut self,
        transaction: &mut Self::Transaction,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Clock bytes in from the controller as the given transaction
    fn read(
        &mut self,
        transaction: &mut Self::Transaction,
        buf: &mut [u8],
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Send a read opcode and clock its response into `buf`
    ///
    /// Transports that frame transfers with chip select must keep it
    /// asserted across both phases. The default runs [`write`](Self::write)
    /// then [`read`](Self::read).
    fn query(
        &mut self,
        command: &mut Self::Transaction,
        opcode: u8,
        response: &mut Self::Transaction,
        buf: &mut [u8],
    ) -> impl core::future::Future<Output = Result<(), Self::Error>> {
        async move {
            self.write(command, &[opcode]).await?;
            self.read(response, buf).await
        }
    }
}

impl<T: DisplayBus + ?Sized> DisplayBus for &mut T {
    type Transaction = T::Transaction;
    type Error = T::Error;

    fn transaction(&mut self, nature: TransactionNature, len: usize) -> Self::Transaction {
        T::transaction(self, nature, len)
    }

    async fn write(
        &mut self,
        transaction: &mut Self::Transaction,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        T::write(self, transaction, data).await
    }

    async fn read(
        &mut self,
        transaction: &mut Self::Transaction,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        T::read(self, transaction, buf).await
    }

    async fn query(
        &mut self,
        command: &mut Self::Transaction,
        opcode: u8,
        response: &mut Self::Transaction,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        T::query(self, command, opcode, response, buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dc_levels() {
        assert!(!TransactionNature::Command.dc_high());
        assert!(TransactionNature::DataWrite.dc_high());
        assert!(TransactionNature::DataRead.dc_high());
    }

    /// Logs (nature, byte count) per transfer
    struct LogBus {
        log: [(TransactionNature, usize); 2],
        used: usize,
    }

    impl DisplayBus for LogBus {
        type Transaction = TransactionNature;
        type Error = ();

        fn transaction(&mut self, nature: TransactionNature, _len: usize) -> TransactionNature {
            nature
        }

        async fn write(&mut self, nature: &mut TransactionNature, data: &[u8]) -> Result<(), ()> {
            self.log[self.used] = (*nature, data.len());
            self.used += 1;
            Ok(())
        }

        async fn read(&mut self, nature: &mut TransactionNature, buf: &mut [u8]) -> Result<(), ()> {
            buf.fill(0xA5);
            self.log[self.used] = (*nature, buf.len());
            self.used += 1;
            Ok(())
        }
    }

    #[test]
    fn test_default_query_writes_then_reads() {
        let mut bus = LogBus {
            log: [(TransactionNature::Command, 0); 2],
            used: 0,
        };
        let mut command = bus.transaction(TransactionNature::Command, 1);
        let mut response = bus.transaction(TransactionNature::DataRead, 3);
        let mut buf = [0u8; 3];

        embassy_futures::block_on(bus.query(&mut command, 0x04, &mut response, &mut buf)).unwrap();
        assert_eq!(buf, [0xA5; 3]);
        assert_eq!(
            bus.log,
            [
                (TransactionNature::Command, 1),
                (TransactionNature::DataRead, 3),
            ]
        );
    }

    #[test]
    fn test_read_direction() {
        assert!(TransactionNature::DataRead.is_read());
        assert!(!TransactionNature::DataWrite.is_read());
        assert!(!TransactionNature::Command.is_read());
    }
}
