//! SSD1306 protocol tables for the greyscale scan hack
//!
//! Everything here is configuration data, not behavior: command byte
//! sequences and wait budgets that keep one controller revision's row
//! scan synchronized. Alternate revisions get their own [`Protocol`]
//! value; the pump never hardcodes a byte.
//!
//! The technique leans on observed controller behavior rather than the
//! datasheet: setting a 1-row multiplex ratio parks the row counter at a
//! known position (a frame sync substitute), and a 57-row scan leaves
//! padding rows either side of the visible 40 so oscillator drift and
//! software jitter land in the padding instead of on glass.

/// Documented SSD1306 command subset used by this driver.
pub mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const MEM_ADDR_MODE: u8 = 0x20;
    pub const SET_START_LINE: u8 = 0x40;
    pub const SET_SEG_REMAP: u8 = 0xA1;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_COM_SCAN_DEC: u8 = 0xC8;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_VCOM_DESELECT: u8 = 0xDB;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const ENTIRE_ON_RESUME: u8 = 0xA4;
    pub const SET_NORMAL: u8 = 0xA6;
    pub const CHARGE_PUMP: u8 = 0x8D;
    pub const SET_IREF: u8 = 0xAD;
    pub const SET_COL_ADDR: u8 = 0x21;
    pub const SET_PAGE_ADDR: u8 = 0x22;
    pub const NOP: u8 = 0xE3;
}

/// Clocks per scanned row: two 1-clock precharge phases plus the 50-clock
/// row period (constant across this controller family even where the
/// datasheet omits it).
pub const ROW_CLOCKS: u32 = 1 + 1 + 50;

/// Highest nominal frequency of the controller's internal RC oscillator.
pub const OSC_MAX_HZ: u32 = 530_000;

/// Rows of output time granted for the row counter to reach its parking
/// position before a subframe is loaded.
pub const PARK_ROWS: u32 = 8;

/// Rows of output time granted after a subframe is loaded, placing the
/// scan position halfway into the padding region when the next park hits.
pub const SCAN_ROWS: u32 = 48;

/// Rows driven per subframe in grey mode: the visible 40 plus padding
/// before the scan wraps.
pub const EXTENDED_ROWS: u8 = 57;

/// Display-offset value used while the row counter is parked.
pub const PARK_OFFSET: u8 = 52;

/// Nominal output time for `rows` rows at the highest oscillator
/// frequency, rounded to the nearest microsecond.
pub const fn rows_to_us(rows: u32) -> u64 {
    let numerator = rows as u64 * ROW_CLOCKS as u64 * 1_000_000;
    (numerator + OSC_MAX_HZ as u64 / 2) / OSC_MAX_HZ as u64
}

/// Grey-mode bring-up: standard init except the shortest precharge phases
/// and the fastest internal clock, so three subframes fit where one frame
/// used to.
const GREY_INIT: &[u8] = &[
    cmd::DISPLAY_OFF,
    cmd::MEM_ADDR_MODE,
    0x00,
    cmd::SET_START_LINE,
    cmd::SET_SEG_REMAP,
    cmd::SET_MUX_RATIO,
    63,
    cmd::SET_COM_SCAN_DEC,
    cmd::SET_DISPLAY_OFFSET,
    0,
    cmd::SET_COM_PINS,
    0x12,
    cmd::SET_CLOCK_DIV,
    0xF0,
    cmd::SET_PRECHARGE,
    0x11,
    cmd::SET_VCOM_DESELECT,
    0x20,
    cmd::SET_CONTRAST,
    0x7F,
    cmd::ENTIRE_ON_RESUME,
    cmd::SET_NORMAL,
    cmd::CHARGE_PUMP,
    0x14,
    cmd::SET_IREF,
    0x30,
    cmd::DISPLAY_ON,
];

/// Standard single-rate configuration, restored at teardown. Includes the
/// GDRAM window so the panel is immediately usable by a conventional
/// driver.
const STANDARD_INIT: &[u8] = &[
    cmd::DISPLAY_OFF,
    cmd::MEM_ADDR_MODE,
    0x00,
    cmd::SET_START_LINE,
    cmd::SET_SEG_REMAP,
    cmd::SET_MUX_RATIO,
    crate::HEIGHT as u8 - 1,
    cmd::SET_COM_SCAN_DEC,
    cmd::SET_DISPLAY_OFFSET,
    0,
    cmd::SET_COM_PINS,
    0x12,
    cmd::SET_CLOCK_DIV,
    0x80,
    cmd::SET_PRECHARGE,
    0xF1,
    cmd::SET_VCOM_DESELECT,
    0x20,
    cmd::SET_CONTRAST,
    0x7F,
    cmd::ENTIRE_ON_RESUME,
    cmd::SET_NORMAL,
    cmd::CHARGE_PUMP,
    0x14,
    cmd::SET_IREF,
    0x30,
    cmd::DISPLAY_ON,
    cmd::SET_COL_ADDR,
    28,
    99,
    cmd::SET_PAGE_ADDR,
    0,
    4,
];

/// GDRAM window covering the 72x40 panel (centered in the controller's
/// 128-column RAM).
const WINDOW: &[u8] = &[cmd::SET_COL_ADDR, 28, 99, cmd::SET_PAGE_ADDR, 0, 4];

/// One controller revision's command sequences and wait budgets.
#[derive(Debug, Clone, Copy)]
pub struct Protocol {
    /// Bring-up sequence for the fast three-subframe scan.
    pub init_cmds: &'static [u8],
    /// Restore sequence for the conventional single-rate scan.
    pub restore_cmds: &'static [u8],
    /// GDRAM window set after bring-up.
    pub window_cmds: &'static [u8],
    /// Park the row counter ahead of a subframe (1-row multiplex).
    pub pre_frame_cmds: [u8; 4],
    /// Resume the extended scan after a subframe is loaded.
    pub post_frame_cmds: [u8; 4],
    /// Budget from park to subframe transmission, microseconds.
    pub pre_frame_us: u64,
    /// Budget from subframe transmission to the next park, microseconds.
    pub frame_us: u64,
}

impl Protocol {
    /// Timings and sequences for the SSD1306-driven 72x40 panels.
    pub const fn ssd1306_72x40() -> Self {
        Self {
            init_cmds: GREY_INIT,
            restore_cmds: STANDARD_INIT,
            window_cmds: WINDOW,
            pre_frame_cmds: [
                cmd::SET_MUX_RATIO,
                0,
                cmd::SET_DISPLAY_OFFSET,
                PARK_OFFSET,
            ],
            post_frame_cmds: [
                cmd::SET_DISPLAY_OFFSET,
                crate::HEIGHT as u8 + (64 - EXTENDED_ROWS),
                cmd::SET_MUX_RATIO,
                EXTENDED_ROWS - 1,
            ],
            pre_frame_us: rows_to_us(PARK_ROWS),
            frame_us: rows_to_us(SCAN_ROWS),
        }
    }

    /// Per-subframe contrast command pairs for one 0..=255 brightness
    /// level. The three scales approximate a non-linear ramp across the
    /// binary-weighted subframes, deepening the greys.
    pub const fn contrast_ramp(level: u8) -> [[u8; 2]; 3] {
        [
            [cmd::SET_CONTRAST, level >> 6],
            [cmd::SET_CONTRAST, level >> 1],
            [cmd::SET_CONTRAST, level],
        ]
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::ssd1306_72x40()
    }
}
