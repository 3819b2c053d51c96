//! Keyboard reports as written to and read from the keyboard endpoints
//!
//! Field positions mirror [`super::KEYBOARD_REPORT_DESCRIPTOR`]: a modifier byte, a reserved
//! byte and six key slots on the way in, five LED bits on the way out.

use log::{error, warn};
use packed_struct::prelude::*;

use crate::endpoint::KEYBOARD_EPSIZE;
use crate::{DescriptorError, Result};

pub const NO_EVENT_INDICATED: u8 = 0x00;
pub const ERROR_ROLL_OVER: u8 = 0x01;
pub const POST_FAIL: u8 = 0x02;
pub const ERROR_UNDEFINED: u8 = 0x03;

pub const LEFT_CONTROL: u8 = 0xE0;
pub const LEFT_SHIFT: u8 = 0xE1;
pub const LEFT_ALT: u8 = 0xE2;
pub const LEFT_GUI: u8 = 0xE3;
pub const RIGHT_CONTROL: u8 = 0xE4;
pub const RIGHT_SHIFT: u8 = 0xE5;
pub const RIGHT_ALT: u8 = 0xE6;
pub const RIGHT_GUI: u8 = 0xE7;

/// Highest key usage the report descriptor's key array accepts
pub const MAX_KEY_USAGE: u8 = 0x65;
pub const KEY_SLOTS: usize = 6;
pub const LEDS_REPORT_LEN: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, PackedStruct)]
#[packed_struct(endian = "lsb", bit_numbering = "lsb0", size_bytes = "1")]
pub struct KeyboardLedsReport {
    #[packed_field(bits = "0")]
    pub num_lock: bool,
    #[packed_field(bits = "1")]
    pub caps_lock: bool,
    #[packed_field(bits = "2")]
    pub scroll_lock: bool,
    #[packed_field(bits = "3")]
    pub compose: bool,
    #[packed_field(bits = "4")]
    pub kana: bool,
}

impl KeyboardLedsReport {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let data: &[u8; LEDS_REPORT_LEN] = data
            .get(..LEDS_REPORT_LEN)
            .and_then(|d| d.try_into().ok())
            .ok_or(DescriptorError::Truncated { offset: 0 })?;
        Ok(Self::unpack(data)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, PackedStruct)]
#[packed_struct(endian = "lsb", bit_numbering = "msb0", size_bytes = "8")]
pub struct BootKeyboardReport {
    #[packed_field(bits = "0")]
    pub right_gui: bool,
    #[packed_field(bits = "1")]
    pub right_alt: bool,
    #[packed_field(bits = "2")]
    pub right_shift: bool,
    #[packed_field(bits = "3")]
    pub right_ctrl: bool,
    #[packed_field(bits = "4")]
    pub left_gui: bool,
    #[packed_field(bits = "5")]
    pub left_alt: bool,
    #[packed_field(bits = "6")]
    pub left_shift: bool,
    #[packed_field(bits = "7")]
    pub left_ctrl: bool,
    #[packed_field(bytes = "2..8", element_size_bits = "8")]
    pub keys: [u8; 6],
}

impl BootKeyboardReport {
    /// Builds a report from pressed key usages
    ///
    /// Modifier usages set their bit. Usages above [`MAX_KEY_USAGE`] and repeated usages are
    /// skipped. More than six other keys, or an error usage, fill every slot with the error code
    /// (phantom state).
    pub fn new<K: IntoIterator<Item = u8>>(keys: K) -> Self {
        let mut report = Self::default();

        let mut error = false;
        let mut i = 0;
        for k in keys.into_iter() {
            match k {
                LEFT_CONTROL => report.left_ctrl = true,
                LEFT_SHIFT => report.left_shift = true,
                LEFT_ALT => report.left_alt = true,
                LEFT_GUI => report.left_gui = true,
                RIGHT_CONTROL => report.right_ctrl = true,
                RIGHT_SHIFT => report.right_shift = true,
                RIGHT_ALT => report.right_alt = true,
                RIGHT_GUI => report.right_gui = true,
                NO_EVENT_INDICATED => {}
                ERROR_ROLL_OVER | POST_FAIL | ERROR_UNDEFINED => {
                    if !error {
                        error = true;
                        i = report.keys.len();
                        report.keys.fill(k);
                    }
                }
                _ => {
                    if error || report.keys[..i].contains(&k) {
                        continue;
                    }

                    if k > MAX_KEY_USAGE {
                        warn!("Key usage {:X} is outside the report's key array, dropped", k);
                        continue;
                    }

                    if i < report.keys.len() {
                        report.keys[i] = k;
                        i += 1;
                    } else {
                        error = true;
                        i = report.keys.len();
                        report.keys.fill(ERROR_ROLL_OVER);
                    }
                }
            }
        }
        report
    }

    pub fn modifiers(&self) -> u8 {
        [
            self.left_ctrl,
            self.left_shift,
            self.left_alt,
            self.left_gui,
            self.right_ctrl,
            self.right_shift,
            self.right_alt,
            self.right_gui,
        ]
        .iter()
        .enumerate()
        .fold(0, |acc, (bit, &set)| acc | ((set as u8) << bit))
    }

    /// The bytes to place in the IN endpoint buffer
    pub fn to_bytes(&self) -> Result<[u8; KEYBOARD_EPSIZE as usize]> {
        self.pack().map_err(|e| {
            error!("Error packing BootKeyboardReport: {:?}", e);
            DescriptorError::from(e)
        })
    }
}
