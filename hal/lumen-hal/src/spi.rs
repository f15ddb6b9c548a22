//! SPI settings for the display link
//!
//! Chip HALs translate these into their own peripheral configuration.

/// Clock mode, numbered by (CPOL << 1) | CPHA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

impl Mode {
    /// CPOL: clock line is high between transfers
    pub const fn idles_high(self) -> bool {
        matches!(self, Mode::Mode2 | Mode::Mode3)
    }

    /// CPHA: data is sampled on the second clock edge
    pub const fn samples_on_second_edge(self) -> bool {
        matches!(self, Mode::Mode1 | Mode::Mode3)
    }
}

/// Display link clocking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    pub mode: Mode,
}

impl SpiConfig {
    /// ST7789 write timing: 16 ns minimum serial clock cycle.
    ///
    /// Mode 3 also works on breakout boards that tie CS low permanently.
    pub const ST7789: Self = Self::new(62_500_000, Mode::Mode3);

    pub const fn new(frequency: u32, mode: Mode) -> Self {
        Self { frequency, mode }
    }

    /// Same mode, different clock
    pub const fn with_frequency(self, frequency: u32) -> Self {
        Self { frequency, ..self }
    }
}
