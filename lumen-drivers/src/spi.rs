//! 4-wire SPI display bus
//!
//! The ST7789 serial interface in 4-line mode uses a separate D/C line:
//! low while the opcode byte is clocked, high for parameters and pixel
//! data. Chip select framing is left to the [`SpiDevice`].
//!
//! Reads run as a single device transaction so chip select stays low from
//! the opcode through the response. Responses longer than one byte start
//! with a dummy clock cycle, which is stripped here.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::Operation;
use embedded_hal_async::spi::SpiDevice;
use lumen_core::scheduler::MAX_READBACK;
use lumen_hal::{DisplayBus, TransactionNature};

/// SPI bus errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiBusError<S, P> {
    /// SPI transfer failed
    Spi(S),
    /// D/C pin could not be driven
    Pin(P),
    /// Transfer length differs from the length the transaction was opened with
    Length { expected: usize, actual: usize },
}

/// One phase of a command on the SPI bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiTransaction {
    nature: TransactionNature,
    len: usize,
}

impl SpiTransaction {
    pub fn nature(&self) -> TransactionNature {
        self.nature
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// [`DisplayBus`] over an SPI device and a D/C pin
pub struct SpiDisplayBus<SPI, DC> {
    spi: SPI,
    dc: DC,
}

impl<SPI, DC> SpiDisplayBus<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    pub fn new(spi: SPI, dc: DC) -> Self {
        Self { spi, dc }
    }

    /// Release the SPI device and D/C pin
    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }

    fn check(
        transaction: &SpiTransaction,
        len: usize,
    ) -> Result<(), SpiBusError<SPI::Error, DC::Error>> {
        if len != transaction.len {
            return Err(SpiBusError::Length {
                expected: transaction.len,
                actual: len,
            });
        }
        Ok(())
    }

    fn select(
        &mut self,
        transaction: &SpiTransaction,
        len: usize,
    ) -> Result<(), SpiBusError<SPI::Error, DC::Error>> {
        Self::check(transaction, len)?;
        if transaction.nature.dc_high() {
            self.dc.set_high().map_err(SpiBusError::Pin)
        } else {
            self.dc.set_low().map_err(SpiBusError::Pin)
        }
    }
}

impl<SPI, DC> DisplayBus for SpiDisplayBus<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    type Transaction = SpiTransaction;
    type Error = SpiBusError<SPI::Error, DC::Error>;

    fn transaction(&mut self, nature: TransactionNature, len: usize) -> SpiTransaction {
        SpiTransaction { nature, len }
    }

    async fn write(
        &mut self,
        transaction: &mut SpiTransaction,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        self.select(transaction, data.len())?;
        self.spi.write(data).await.map_err(SpiBusError::Spi)
    }

    async fn read(
        &mut self,
        transaction: &mut SpiTransaction,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.select(transaction, buf.len())?;
        self.spi.read(buf).await.map_err(SpiBusError::Spi)
    }

    async fn query(
        &mut self,
        command: &mut SpiTransaction,
        opcode: u8,
        response: &mut SpiTransaction,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        Self::check(response, buf.len())?;
        if buf.len() > MAX_READBACK {
            return Err(SpiBusError::Length {
                expected: MAX_READBACK,
                actual: buf.len(),
            });
        }
        // D/C is only sampled with the opcode
        self.select(command, 1)?;

        if buf.len() <= 1 {
            return self
                .spi
                .transaction(&mut [Operation::Write(&[opcode]), Operation::Read(buf)])
                .await
                .map_err(SpiBusError::Spi);
        }

        let mut raw = [0u8; MAX_READBACK + 1];
        let raw = &mut raw[..buf.len() + 1];
        self.spi
            .transaction(&mut [Operation::Write(&[opcode]), Operation::Read(&mut *raw)])
            .await
            .map_err(SpiBusError::Spi)?;
        strip_dummy_bit(raw, buf);
        Ok(())
    }
}

/// Drop the leading dummy bit of a multi-byte response
///
/// `raw` holds one byte more than `out`.
fn strip_dummy_bit(raw: &[u8], out: &mut [u8]) {
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = (raw[i] << 1) | (raw[i + 1] >> 7);
    }
}
