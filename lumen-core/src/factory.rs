//! Command factory
//!
//! One constructor per ST7789 operation. Each function packs its arguments
//! into the datasheet bit layout of that command's parameter bytes. Field
//! values are masked to their register width; out-of-range inputs are
//! truncated, not rejected.
//!
//! Parameter payloads are always copied, so arguments may be reused as soon
//! as the function returns. Only the bulk memory writes ([`ramwr`],
//! [`ramwrc`]) reference caller memory.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandError};
use crate::opcode::{madctl, Opcode, Orientation, PixelFormat};
use crate::payload::Payload;

/// Gamma table register length
pub const GAMMA_LEN: usize = 14;

fn opcode_only(opcode: Opcode) -> Command<'static> {
    Command::new_unchecked(opcode, Payload::empty())
}

fn params<const N: usize>(opcode: Opcode, bytes: [u8; N]) -> Command<'static> {
    Command::new_unchecked(opcode, Payload::inline(bytes))
}

/// NOP
pub fn nop() -> Command<'static> {
    opcode_only(Opcode::Nop)
}

/// Software reset; wait 5 ms before the next command, 120 ms before SLPOUT
pub fn swreset() -> Command<'static> {
    opcode_only(Opcode::SwReset)
}

/// Enter sleep mode
pub fn slpin() -> Command<'static> {
    opcode_only(Opcode::SleepIn)
}

/// Leave sleep mode; wait 5 ms before the next command
pub fn slpout() -> Command<'static> {
    opcode_only(Opcode::SleepOut)
}

/// Normal display mode on
pub fn noron() -> Command<'static> {
    opcode_only(Opcode::NormalMode)
}

/// Display inversion off
pub fn invoff() -> Command<'static> {
    opcode_only(Opcode::InversionOff)
}

/// Display inversion on
pub fn invon() -> Command<'static> {
    opcode_only(Opcode::InversionOn)
}

/// Display off
pub fn dispoff() -> Command<'static> {
    opcode_only(Opcode::DisplayOff)
}

/// Display on
pub fn dispon() -> Command<'static> {
    opcode_only(Opcode::DisplayOn)
}

/// Column address window, inclusive
pub fn caset(xs: u16, xe: u16) -> Command<'static> {
    let [xs_hi, xs_lo] = xs.to_be_bytes();
    let [xe_hi, xe_lo] = xe.to_be_bytes();
    params(Opcode::ColumnAddressSet, [xs_hi, xs_lo, xe_hi, xe_lo])
}

/// Row address window, inclusive
pub fn raset(ys: u16, ye: u16) -> Command<'static> {
    let [ys_hi, ys_lo] = ys.to_be_bytes();
    let [ye_hi, ye_lo] = ye.to_be_bytes();
    params(Opcode::RowAddressSet, [ys_hi, ys_lo, ye_hi, ye_lo])
}

/// Memory write starting at the window origin
///
/// Pixel data longer than the inline capacity is referenced, not copied:
/// `data` stays borrowed until the command has executed and been dropped.
pub fn ramwr(data: &[u8]) -> Command<'_> {
    Command::new_unchecked(Opcode::MemoryWrite, Payload::from_caller(data))
}

/// Memory write continuing after the last written pixel
pub fn ramwrc(data: &[u8]) -> Command<'_> {
    Command::new_unchecked(Opcode::MemoryWriteContinue, Payload::from_caller(data))
}

/// Memory write with the pixel data copied into command-owned storage
pub fn ramwr_copied(data: &[u8]) -> Result<Command<'static>, CommandError> {
    Ok(Command::new_unchecked(Opcode::MemoryWrite, Payload::copied(data)?))
}

/// Memory data access control, raw flags
pub fn madctl(flags: u8) -> Command<'static> {
    params(Opcode::MemoryDataAccessControl, [flags])
}

/// Memory data access control for an orientation
pub fn madctl_for(orientation: Orientation, bgr: bool) -> Command<'static> {
    let mut flags = orientation.madctl();
    if bgr {
        flags |= madctl::BGR;
    }
    madctl(flags)
}

/// Interface pixel format
pub fn colmod(format: PixelFormat) -> Command<'static> {
    params(Opcode::PixelFormat, [format.bits()])
}

/// Porch timing (PORCTRL)
///
/// Back and front porch for normal mode take 7 bits each. Idle and partial
/// mode porches are 4-bit nibbles, back porch high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PorchSettings {
    /// BPA: back porch, normal mode
    pub back: u8,
    /// FPA: front porch, normal mode
    pub front: u8,
    /// PSEN: use separate idle and partial porches
    pub separate: bool,
    /// BPB: back porch, idle mode
    pub idle_back: u8,
    /// FPB: front porch, idle mode
    pub idle_front: u8,
    /// BPC: back porch, partial mode
    pub partial_back: u8,
    /// FPC: front porch, partial mode
    pub partial_front: u8,
}

impl Default for PorchSettings {
    fn default() -> Self {
        Self {
            back: 0x0C,
            front: 0x0C,
            separate: false,
            idle_back: 3,
            idle_front: 3,
            partial_back: 3,
            partial_front: 3,
        }
    }
}

impl PorchSettings {
    /// PORCTRL parameter bytes
    pub const fn to_register(&self) -> [u8; 5] {
        [
            self.back & 0x7F,
            self.front & 0x7F,
            self.separate as u8,
            ((self.idle_back & 0x0F) << 4) | (self.idle_front & 0x0F),
            ((self.partial_back & 0x0F) << 4) | (self.partial_front & 0x0F),
        ]
    }
}

/// Porch setting
pub fn porctrl(porch: &PorchSettings) -> Command<'static> {
    params(Opcode::PorchControl, porch.to_register())
}

/// Gate control: VGH and VGL level selectors
pub fn gctrl(vghs: u8, vgls: u8) -> Command<'static> {
    params(Opcode::GateControl, [((vghs & 0x07) << 4) | (vgls & 0x07)])
}

/// VCOM setting
pub fn vcoms(vcom: u8) -> Command<'static> {
    params(Opcode::VcomSetting, [vcom & 0x3F])
}

/// LCM control
pub fn lcmctrl(flags: u8) -> Command<'static> {
    params(Opcode::LcmControl, [flags & 0x7F])
}

/// Take VDV and VRH from the command registers instead of NVM
pub fn vdvvrhen(enable: bool) -> Command<'static> {
    params(Opcode::VdvVrhEnable, [enable as u8, 0xFF])
}

/// VRH set
pub fn vrhs(vrh: u8) -> Command<'static> {
    params(Opcode::VrhSet, [vrh & 0x3F])
}

/// VDV set
pub fn vdvs(vdv: u8) -> Command<'static> {
    params(Opcode::VdvSet, [vdv & 0x3F])
}

/// Frame rate in normal mode: inversion selection and RTNA divider
pub fn frctrl2(nla: u8, rtna: u8) -> Command<'static> {
    params(
        Opcode::FrameRateControl2,
        [((nla << 5) & 0xE0) | (rtna & 0x1F)],
    )
}

/// Power control 1: AVDD, AVCL and VDS levels
pub fn pwctrl1(avdd: u8, avcl: u8, vds: u8) -> Command<'static> {
    params(
        Opcode::PowerControl1,
        [
            0xA4,
            ((avdd << 6) & 0xC0) | ((avcl << 4) & 0x30) | (vds & 0x03),
        ],
    )
}

/// One gamma correction curve (PVGAMCTRL / NVGAMCTRL)
///
/// Fields are named after the voltage levels they set. Register layout:
///
/// | byte | bits |
/// |------|------|
/// | 0 | `V63[3:0] << 4 \| V0[3:0]` |
/// | 1 | `V1[5:0]` |
/// | 2 | `V2[5:0]` |
/// | 3 | `V4[4:0]` |
/// | 4 | `V6[4:0]` |
/// | 5 | `J0[1:0] << 4 \| V13[3:0]` |
/// | 6 | `V20[6:0]` |
/// | 7 | `V36[2:0] << 4 \| V27[2:0]` |
/// | 8 | `V43[6:0]` |
/// | 9 | `J1[1:0] << 4 \| V50[3:0]` |
/// | 10 | `V57[4:0]` |
/// | 11 | `V59[4:0]` |
/// | 12 | `V61[5:0]` |
/// | 13 | `V62[5:0]` |
///
/// Serialized as the 14 register bytes, the form vendor init tables use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(from = "[u8; 14]", into = "[u8; 14]")
)]
pub struct GammaTable {
    pub v0: u8,
    pub v1: u8,
    pub v2: u8,
    pub v4: u8,
    pub v6: u8,
    pub v13: u8,
    pub v20: u8,
    pub v27: u8,
    pub v36: u8,
    pub v43: u8,
    pub v50: u8,
    pub v57: u8,
    pub v59: u8,
    pub v61: u8,
    pub v62: u8,
    pub v63: u8,
    pub j0: u8,
    pub j1: u8,
}

impl GammaTable {
    /// Positive curve of a typical 240x240 IPS module
    pub const POSITIVE: Self = Self::from_register([
        0xD0, 0x04, 0x0D, 0x11, 0x13, 0x2B, 0x3F, 0x54, 0x4C, 0x18, 0x0D, 0x0B, 0x1F, 0x23,
    ]);

    /// Negative curve of a typical 240x240 IPS module
    pub const NEGATIVE: Self = Self::from_register([
        0xD0, 0x04, 0x0C, 0x11, 0x13, 0x2C, 0x3F, 0x44, 0x51, 0x2F, 0x1F, 0x1F, 0x20, 0x23,
    ]);

    /// Pack into register bytes
    pub const fn to_register(&self) -> [u8; GAMMA_LEN] {
        [
            ((self.v63 & 0x0F) << 4) | (self.v0 & 0x0F),
            self.v1 & 0x3F,
            self.v2 & 0x3F,
            self.v4 & 0x1F,
            self.v6 & 0x1F,
            ((self.j0 & 0x03) << 4) | (self.v13 & 0x0F),
            self.v20 & 0x7F,
            ((self.v36 & 0x07) << 4) | (self.v27 & 0x07),
            self.v43 & 0x7F,
            ((self.j1 & 0x03) << 4) | (self.v50 & 0x0F),
            self.v57 & 0x1F,
            self.v59 & 0x1F,
            self.v61 & 0x3F,
            self.v62 & 0x3F,
        ]
    }

    /// Unpack register bytes, as listed in panel vendor init tables
    pub const fn from_register(bytes: [u8; GAMMA_LEN]) -> Self {
        Self {
            v0: bytes[0] & 0x0F,
            v63: bytes[0] >> 4,
            v1: bytes[1] & 0x3F,
            v2: bytes[2] & 0x3F,
            v4: bytes[3] & 0x1F,
            v6: bytes[4] & 0x1F,
            v13: bytes[5] & 0x0F,
            j0: (bytes[5] >> 4) & 0x03,
            v20: bytes[6] & 0x7F,
            v27: bytes[7] & 0x07,
            v36: (bytes[7] >> 4) & 0x07,
            v43: bytes[8] & 0x7F,
            v50: bytes[9] & 0x0F,
            j1: (bytes[9] >> 4) & 0x03,
            v57: bytes[10] & 0x1F,
            v59: bytes[11] & 0x1F,
            v61: bytes[12] & 0x3F,
            v62: bytes[13] & 0x3F,
        }
    }
}

impl From<[u8; GAMMA_LEN]> for GammaTable {
    fn from(bytes: [u8; GAMMA_LEN]) -> Self {
        Self::from_register(bytes)
    }
}

impl From<GammaTable> for [u8; GAMMA_LEN] {
    fn from(table: GammaTable) -> Self {
        table.to_register()
    }
}

fn gamma(opcode: Opcode, table: &GammaTable) -> Result<Command<'static>, CommandError> {
    let bytes = table.to_register();
    let payload = Payload::encode(GAMMA_LEN, |buf| buf.copy_from_slice(&bytes))?;
    Ok(Command::new_unchecked(opcode, payload))
}

/// Positive voltage gamma control
pub fn pvgamctrl(table: &GammaTable) -> Result<Command<'static>, CommandError> {
    gamma(Opcode::PositiveGamma, table)
}

/// Negative voltage gamma control
pub fn nvgamctrl(table: &GammaTable) -> Result<Command<'static>, CommandError> {
    gamma(Opcode::NegativeGamma, table)
}

/// Read display ID: manufacturer, version and module ID bytes
pub fn rddid() -> Command<'static> {
    params(Opcode::ReadDisplayId, [0; 3])
}

/// Read display status
pub fn rddst() -> Command<'static> {
    params(Opcode::ReadDisplayStatus, [0; 4])
}
