//! Panel configuration
//!
//! Describes one ST7789 module: its visible area, where that area sits in
//! controller memory, and the analog settings the init sequence programs.
//! [`PanelConfig::default`] matches the common 240x240 IPS modules.
//!
//! With the `serde` feature the configuration can be stored as postcard
//! bytes; with `toml` it can be read from a TOML document:
//!
//! ```toml
//! width = 240
//! height = 320
//! orientation = "east"
//!
//! [porch]
//! back = 12
//! front = 12
//! ```

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandError};
use crate::factory::{self, GammaTable, PorchSettings};
use crate::opcode::{madctl, Orientation, PixelFormat};
use crate::scheduler::{Batch, ScheduleError};

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Building a command failed
    Command(CommandError),
    /// Sequence does not fit in a batch
    Schedule(ScheduleError),
    /// TOML document is malformed or has wrong field types
    Parse,
    /// Output buffer too small for the encoded configuration
    Serialize,
    /// Stored bytes are not a valid configuration
    Deserialize,
}

impl From<CommandError> for ConfigError {
    fn from(e: CommandError) -> Self {
        ConfigError::Command(e)
    }
}

impl From<ScheduleError> for ConfigError {
    fn from(e: ScheduleError) -> Self {
        ConfigError::Schedule(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Command(e) => write!(f, "{}", e),
            ConfigError::Schedule(e) => write!(f, "{}", e),
            ConfigError::Parse => write!(f, "invalid panel configuration"),
            ConfigError::Serialize => write!(f, "configuration does not fit the buffer"),
            ConfigError::Deserialize => write!(f, "corrupt stored configuration"),
        }
    }
}

/// Gate driver voltages (GCTRL)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GateSettings {
    /// VGH level selector, 0..=7
    pub vghs: u8,
    /// VGL level selector, 0..=7
    pub vgls: u8,
}

impl Default for GateSettings {
    fn default() -> Self {
        // VGH 13.26 V, VGL -10.43 V
        Self { vghs: 3, vgls: 5 }
    }
}

/// Normal mode frame rate (FRCTRL2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameRate {
    /// Inversion selection, 0..=7
    pub nla: u8,
    /// Line period divider, 0..=31
    pub rtna: u8,
}

impl Default for FrameRate {
    fn default() -> Self {
        // 60 Hz
        Self { nla: 0, rtna: 0x0F }
    }
}

/// Analog supply levels (PWCTRL1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PowerSettings {
    pub avdd: u8,
    pub avcl: u8,
    pub vds: u8,
}

impl Default for PowerSettings {
    fn default() -> Self {
        // AVDD 6.8 V, AVCL -4.8 V, VDS 2.3 V
        Self {
            avdd: 2,
            avcl: 2,
            vds: 1,
        }
    }
}

/// One ST7789 panel module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PanelConfig {
    /// Visible columns in the native (north) orientation
    pub width: u16,
    /// Visible rows in the native (north) orientation
    pub height: u16,
    /// First visible column in controller memory
    pub column_offset: u16,
    /// First visible row in controller memory
    pub row_offset: u16,
    pub orientation: Orientation,
    /// Panel wired with blue and red swapped
    pub bgr: bool,
    pub pixel_format: PixelFormat,
    /// IPS panels need inversion on to show true colors
    pub inverted: bool,
    pub porch: PorchSettings,
    pub gate: GateSettings,
    pub vcom: u8,
    pub lcm: u8,
    pub vrh: u8,
    pub vdv: u8,
    pub frame_rate: FrameRate,
    pub power: PowerSettings,
    pub positive_gamma: GammaTable,
    pub negative_gamma: GammaTable,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: 240,
            height: 240,
            column_offset: 0,
            row_offset: 0,
            orientation: Orientation::North,
            bgr: false,
            pixel_format: PixelFormat::Rgb565,
            inverted: true,
            porch: PorchSettings::default(),
            gate: GateSettings::default(),
            vcom: 0x19,
            lcm: 0x2C,
            vrh: 0x12,
            vdv: 0x20,
            frame_rate: FrameRate::default(),
            power: PowerSettings::default(),
            positive_gamma: GammaTable::POSITIVE,
            negative_gamma: GammaTable::NEGATIVE,
        }
    }
}

impl PanelConfig {
    /// Minimum wait after SWRESET before SLPOUT
    pub const RESET_DELAY_MS: u64 = 120;

    /// Minimum wait after SLPOUT before the next command
    pub const WAKE_DELAY_MS: u64 = 5;

    /// Controller frame memory columns
    pub const FRAME_COLUMNS: u16 = 240;

    /// Controller frame memory rows
    pub const FRAME_ROWS: u16 = 320;

    /// Visible size in the configured orientation, as (columns, rows)
    pub fn dimensions(&self) -> (u16, u16) {
        if self.orientation.is_landscape() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Bytes in one full frame
    pub fn frame_len(&self) -> usize {
        self.pixel_format
            .bytes_for(self.width as usize * self.height as usize)
    }

    /// Register setup that follows SLPOUT
    ///
    /// Ends with the display switched on.
    pub fn configure(&self) -> Result<Batch<'static>, ConfigError> {
        let inversion = if self.inverted {
            factory::invon()
        } else {
            factory::invoff()
        };

        let commands: [Command<'static>; 16] = [
            factory::colmod(self.pixel_format),
            factory::madctl_for(self.orientation, self.bgr),
            factory::porctrl(&self.porch),
            factory::gctrl(self.gate.vghs, self.gate.vgls),
            factory::vcoms(self.vcom),
            factory::lcmctrl(self.lcm),
            factory::vdvvrhen(true),
            factory::vrhs(self.vrh),
            factory::vdvs(self.vdv),
            factory::frctrl2(self.frame_rate.nla, self.frame_rate.rtna),
            factory::pwctrl1(self.power.avdd, self.power.avcl, self.power.vds),
            factory::pvgamctrl(&self.positive_gamma)?,
            factory::nvgamctrl(&self.negative_gamma)?,
            inversion,
            factory::noron(),
            factory::dispon(),
        ];
        Ok(Batch::try_from_iter(commands)?)
    }

    /// Complete bring-up in one batch: reset, wake, then [`configure`](Self::configure)
    ///
    /// The batch carries no delays. Controllers that enforce the reset and
    /// wake timings need [`factory::swreset`] and [`factory::slpout`]
    /// scheduled on their own, with [`RESET_DELAY_MS`](Self::RESET_DELAY_MS)
    /// and [`WAKE_DELAY_MS`](Self::WAKE_DELAY_MS) waited after each.
    pub fn init_sequence(&self) -> Result<Batch<'static>, ConfigError> {
        let mut batch = Batch::try_from_iter([factory::swreset(), factory::slpout()])?;
        batch.append(self.configure()?)?;
        Ok(batch)
    }

    /// Address window for a memory write, inclusive, in visible coordinates
    ///
    /// Push [`factory::ramwr`] onto the returned batch to fill the window.
    pub fn window<'a>(
        &self,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
    ) -> Result<Batch<'a>, ConfigError> {
        let (column_offset, row_offset) = self.memory_offsets();
        Ok(Batch::try_from_iter([
            factory::caset(
                x0.saturating_add(column_offset),
                x1.saturating_add(column_offset),
            ),
            factory::raset(y0.saturating_add(row_offset), y1.saturating_add(row_offset)),
        ])?)
    }

    /// Offset of the visible area for the current orientation
    ///
    /// A mirrored axis scans frame memory from the far end, so its offset is
    /// measured from there. Row/column exchange then swaps the pair.
    fn memory_offsets(&self) -> (u16, u16) {
        let flags = self.orientation.madctl();
        let mut column_offset = self.column_offset;
        let mut row_offset = self.row_offset;
        if flags & madctl::MX != 0 {
            column_offset =
                Self::FRAME_COLUMNS.saturating_sub(self.width.saturating_add(column_offset));
        }
        if flags & madctl::MY != 0 {
            row_offset = Self::FRAME_ROWS.saturating_sub(self.height.saturating_add(row_offset));
        }
        if flags & madctl::MV != 0 {
            (row_offset, column_offset)
        } else {
            (column_offset, row_offset)
        }
    }

    /// Window covering the whole visible area
    pub fn full_window<'a>(&self) -> Result<Batch<'a>, ConfigError> {
        let (columns, rows) = self.dimensions();
        self.window(0, 0, columns.saturating_sub(1), rows.saturating_sub(1))
    }
}

#[cfg(feature = "serde")]
impl PanelConfig {
    /// Encode into `buf`, returning the used prefix
    pub fn to_postcard<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Serialize)
    }

    /// Encode into a fresh buffer
    pub fn to_postcard_vec(&self) -> Result<alloc::vec::Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Serialize)
    }

    /// Decode bytes written by [`to_postcard`](Self::to_postcard)
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)
    }
}

#[cfg(feature = "toml")]
impl PanelConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|_| ConfigError::Parse)
    }
}
