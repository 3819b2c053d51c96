//! String descriptors
//!
//! Strings are encoded at compile time into `bLength`, `bDescriptorType` and UTF-16LE code units,
//! with no terminator. Index 0 is the language table.

use crate::config::{LANGUAGE_ID_EN_US, MANUFACTURER, PRODUCT, SERIAL_NUMBER};
use crate::descriptor::{
    DescriptorType, MANUFACTURER_INDEX, PRODUCT_INDEX, SERIAL_NUMBER_INDEX,
};

pub const HEADER_LEN: usize = 2;
/// `bLength` is a byte and must stay even
pub const MAX_CODE_UNITS: usize = 126;

/// Number of UTF-16 code units needed for `s`
pub const fn utf16_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut units = 0;
    let mut i = 0;
    while i < bytes.len() {
        let (_, width) = decode_utf8(bytes, i);
        units += if width == 4 { 2 } else { 1 };
        i += width;
    }
    units
}

pub const fn string_descriptor_len(s: &str) -> usize {
    HEADER_LEN + 2 * utf16_len(s)
}

pub const fn string_descriptor<const N: usize>(s: &str) -> [u8; N] {
    let units = utf16_len(s);
    assert!(units <= MAX_CODE_UNITS, "string descriptor too long");
    assert!(N == HEADER_LEN + 2 * units, "buffer size differs from bLength");

    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = DescriptorType::String as u8;

    let bytes = s.as_bytes();
    let mut pos = HEADER_LEN;
    let mut i = 0;
    while i < bytes.len() {
        let (c, width) = decode_utf8(bytes, i);
        if c >= 0x1_0000 {
            let c = c - 0x1_0000;
            out = put_u16(out, pos, 0xD800 | (c >> 10) as u16);
            out = put_u16(out, pos + 2, 0xDC00 | (c & 0x3FF) as u16);
            pos += 4;
        } else {
            out = put_u16(out, pos, c as u16);
            pos += 2;
        }
        i += width;
    }
    out
}

/// String descriptor zero: the list of supported language ids
pub const fn language_descriptor<const N: usize>(language_ids: &[u16]) -> [u8; N] {
    assert!(!language_ids.is_empty(), "at least one language id is required");
    assert!(N == HEADER_LEN + 2 * language_ids.len(), "buffer size differs from bLength");

    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = DescriptorType::String as u8;
    let mut i = 0;
    while i < language_ids.len() {
        assert!(language_ids[i] != 0, "language id 0 is reserved");
        out = put_u16(out, HEADER_LEN + 2 * i, language_ids[i]);
        i += 1;
    }
    out
}

const fn put_u16<const N: usize>(mut out: [u8; N], pos: usize, value: u16) -> [u8; N] {
    let le = value.to_le_bytes();
    out[pos] = le[0];
    out[pos + 1] = le[1];
    out
}

/// Decodes the scalar starting at `i` of valid UTF-8, returning it and its width in bytes
const fn decode_utf8(bytes: &[u8], i: usize) -> (u32, usize) {
    let b0 = bytes[i] as u32;
    if b0 < 0x80 {
        (b0, 1)
    } else if b0 < 0xE0 {
        (((b0 & 0x1F) << 6) | (bytes[i + 1] as u32 & 0x3F), 2)
    } else if b0 < 0xF0 {
        (
            ((b0 & 0x0F) << 12) | ((bytes[i + 1] as u32 & 0x3F) << 6) | (bytes[i + 2] as u32 & 0x3F),
            3,
        )
    } else {
        (
            ((b0 & 0x07) << 18)
                | ((bytes[i + 1] as u32 & 0x3F) << 12)
                | ((bytes[i + 2] as u32 & 0x3F) << 6)
                | (bytes[i + 3] as u32 & 0x3F),
            4,
        )
    }
}

pub const LANGUAGE_IDS: &[u16] = &[LANGUAGE_ID_EN_US];

pub static LANGUAGE_DESCRIPTOR: [u8; HEADER_LEN + 2 * LANGUAGE_IDS.len()] =
    language_descriptor(LANGUAGE_IDS);
pub static MANUFACTURER_DESCRIPTOR: [u8; string_descriptor_len(MANUFACTURER)] =
    string_descriptor(MANUFACTURER);
pub static PRODUCT_DESCRIPTOR: [u8; string_descriptor_len(PRODUCT)] = string_descriptor(PRODUCT);
pub static SERIAL_DESCRIPTOR: [u8; string_descriptor_len(SERIAL_NUMBER)] =
    string_descriptor(SERIAL_NUMBER);

/// The string descriptor answering `GET_DESCRIPTOR(STRING, index)`
pub fn string_descriptor_at(index: u8) -> Option<&'static [u8]> {
    match index {
        0 => Some(&LANGUAGE_DESCRIPTOR),
        MANUFACTURER_INDEX => Some(&MANUFACTURER_DESCRIPTOR),
        PRODUCT_INDEX => Some(&PRODUCT_DESCRIPTOR),
        SERIAL_NUMBER_INDEX => Some(&SERIAL_DESCRIPTOR),
        _ => None,
    }
}
