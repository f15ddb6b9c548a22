//! ST7789 opcodes and their fixed properties
//!
//! Values come from the controller's system function command table.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Controller command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// No operation
    Nop = 0x00,
    /// Software reset
    SwReset = 0x01,
    /// Read display ID (RDDID)
    ReadDisplayId = 0x04,
    /// Read display status (RDDST)
    ReadDisplayStatus = 0x09,
    /// Enter sleep mode (SLPIN)
    SleepIn = 0x10,
    /// Leave sleep mode (SLPOUT)
    SleepOut = 0x11,
    /// Normal display mode on (NORON)
    NormalMode = 0x13,
    /// Display inversion off (INVOFF)
    InversionOff = 0x20,
    /// Display inversion on (INVON)
    InversionOn = 0x21,
    /// Display off (DISPOFF)
    DisplayOff = 0x28,
    /// Display on (DISPON)
    DisplayOn = 0x29,
    /// Column address set (CASET)
    ColumnAddressSet = 0x2A,
    /// Row address set (RASET)
    RowAddressSet = 0x2B,
    /// Memory write (RAMWR)
    MemoryWrite = 0x2C,
    /// Memory data access control (MADCTL)
    MemoryDataAccessControl = 0x36,
    /// Interface pixel format (COLMOD)
    PixelFormat = 0x3A,
    /// Memory write continue (RAMWRC)
    MemoryWriteContinue = 0x3C,
    /// Porch setting (PORCTRL)
    PorchControl = 0xB2,
    /// Gate control (GCTRL)
    GateControl = 0xB7,
    /// VCOM setting (VCOMS)
    VcomSetting = 0xBB,
    /// LCM control (LCMCTRL)
    LcmControl = 0xC0,
    /// VDV and VRH command enable (VDVVRHEN)
    VdvVrhEnable = 0xC2,
    /// VRH set (VRHS)
    VrhSet = 0xC3,
    /// VDV set (VDVS)
    VdvSet = 0xC4,
    /// Frame rate control in normal mode (FRCTRL2)
    FrameRateControl2 = 0xC6,
    /// Power control 1 (PWCTRL1)
    PowerControl1 = 0xD0,
    /// Positive voltage gamma control (PVGAMCTRL)
    PositiveGamma = 0xE0,
    /// Negative voltage gamma control (NVGAMCTRL)
    NegativeGamma = 0xE1,
}

/// Every opcode, in code order
pub const ALL_OPCODES: [Opcode; 28] = [
    Opcode::Nop,
    Opcode::SwReset,
    Opcode::ReadDisplayId,
    Opcode::ReadDisplayStatus,
    Opcode::SleepIn,
    Opcode::SleepOut,
    Opcode::NormalMode,
    Opcode::InversionOff,
    Opcode::InversionOn,
    Opcode::DisplayOff,
    Opcode::DisplayOn,
    Opcode::ColumnAddressSet,
    Opcode::RowAddressSet,
    Opcode::MemoryWrite,
    Opcode::MemoryDataAccessControl,
    Opcode::PixelFormat,
    Opcode::MemoryWriteContinue,
    Opcode::PorchControl,
    Opcode::GateControl,
    Opcode::VcomSetting,
    Opcode::LcmControl,
    Opcode::VdvVrhEnable,
    Opcode::VrhSet,
    Opcode::VdvSet,
    Opcode::FrameRateControl2,
    Opcode::PowerControl1,
    Opcode::PositiveGamma,
    Opcode::NegativeGamma,
];

impl Opcode {
    /// The byte sent during the command phase
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up an opcode by its byte
    pub fn from_code(code: u8) -> Option<Self> {
        ALL_OPCODES.iter().copied().find(|op| op.code() == code)
    }

    /// Data phase direction, fixed by the opcode
    pub const fn direction(self) -> Direction {
        match self {
            Opcode::Nop
            | Opcode::SwReset
            | Opcode::SleepIn
            | Opcode::SleepOut
            | Opcode::NormalMode
            | Opcode::InversionOff
            | Opcode::InversionOn
            | Opcode::DisplayOff
            | Opcode::DisplayOn => Direction::None,
            Opcode::ReadDisplayId | Opcode::ReadDisplayStatus => Direction::Read,
            _ => Direction::Write,
        }
    }

    /// Payload length in bytes, or `None` for bulk memory writes
    pub const fn payload_len(self) -> Option<usize> {
        match self.direction() {
            Direction::None => Some(0),
            _ => match self {
                Opcode::ReadDisplayId => Some(3),
                Opcode::ReadDisplayStatus => Some(4),
                Opcode::ColumnAddressSet | Opcode::RowAddressSet => Some(4),
                Opcode::MemoryWrite | Opcode::MemoryWriteContinue => None,
                Opcode::PorchControl => Some(5),
                Opcode::VdvVrhEnable | Opcode::PowerControl1 => Some(2),
                Opcode::PositiveGamma | Opcode::NegativeGamma => Some(14),
                _ => Some(1),
            },
        }
    }
}

/// Whether a data phase follows the opcode, and which way it moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Opcode only
    None,
    /// Host to controller
    Write,
    /// Controller to host
    Read,
}

/// COLMOD interface pixel format
///
/// High nibble selects the RGB interface color depth, low nibble the
/// control interface format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum PixelFormat {
    /// 12 bits per pixel, 4K colors
    Rgb444 = 0x53,
    /// 16 bits per pixel, 65K colors
    #[default]
    Rgb565 = 0x55,
    /// 18 bits per pixel, 262K colors
    Rgb666 = 0x66,
}

impl PixelFormat {
    /// COLMOD register value
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Bytes per pixel on a serial interface, rounded up
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb444 | PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb666 => 3,
        }
    }

    /// Bytes needed to send `pixels` pixels
    ///
    /// 12-bit pixels are packed two to three bytes.
    pub const fn bytes_for(self, pixels: usize) -> usize {
        match self {
            PixelFormat::Rgb444 => (pixels * 3).div_ceil(2),
            _ => pixels * self.bytes_per_pixel(),
        }
    }
}

/// MADCTL flag bits
pub mod madctl {
    /// Page address order (row flip)
    pub const MY: u8 = 0x80;
    /// Column address order (column flip)
    pub const MX: u8 = 0x40;
    /// Page/column exchange (row/column swap)
    pub const MV: u8 = 0x20;
    /// Vertical refresh order
    pub const ML: u8 = 0x10;
    /// BGR subpixel order
    pub const BGR: u8 = 0x08;
    /// Horizontal refresh order
    pub const MH: u8 = 0x04;
}

/// Screen orientation, expressed as where the panel's top edge points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Orientation {
    /// Native portrait
    #[default]
    North,
    /// Rotated 90° clockwise
    East,
    /// Rotated 180°
    South,
    /// Rotated 270° clockwise
    West,
}

impl Orientation {
    /// MADCTL address-order flags for this orientation
    pub const fn madctl(self) -> u8 {
        match self {
            Orientation::North => 0,
            Orientation::East => madctl::MX | madctl::MV,
            Orientation::South => madctl::MX | madctl::MY,
            Orientation::West => madctl::MY | madctl::MV,
        }
    }

    /// Rows and columns are exchanged
    pub const fn is_landscape(self) -> bool {
        matches!(self, Orientation::East | Orientation::West)
    }
}
