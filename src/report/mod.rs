//! HID report descriptor and the report layout it declares
//!
//! The host's HID driver interprets [`KEYBOARD_REPORT_DESCRIPTOR`] to learn where each field of
//! the IN report lives. [`report_layout`] runs the same short-item interpretation at compile time
//! so the declared report size can be checked against [`KEYBOARD_EPSIZE`] and against the bytes
//! [`keyboard::BootKeyboardReport`] packs.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::endpoint::KEYBOARD_EPSIZE;
use crate::DescriptorError;

pub mod keyboard;

/// HID Keyboard report descriptor conforming to the Boot specification
///
/// This aims to be compatible with BIOS and other reduced functionality USB hosts
///
/// This is defined in Appendix B.1 & E.6 of [Device Class Definition for Human
/// Interface Devices (Hid) Version 1.11](<https://www.usb.org/sites/default/files/hid1_11.pdf>)
#[rustfmt::skip]
pub const KEYBOARD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,         // Usage Page (Generic Desktop),
    0x09, 0x06,         // Usage (Keyboard),
    0xA1, 0x01,         // Collection (Application),
    0x05, 0x07,         //     Usage Page (Key Codes),
    0x19, 0xE0,         //     Usage Minimum (224),
    0x29, 0xE7,         //     Usage Maximum (231),
    0x15, 0x00,         //     Logical Minimum (0),
    0x25, 0x01,         //     Logical Maximum (1),
    0x75, 0x01,         //     Report Size (1),
    0x95, 0x08,         //     Report Count (8),
    0x81, 0x02,         //     Input (Data, Variable, Absolute), ;Modifier byte
    0x95, 0x01,         //     Report Count (1),
    0x75, 0x08,         //     Report Size (8),
    0x81, 0x01,         //     Input (Constant), ;Reserved byte
    0x95, 0x05,         //     Report Count (5),
    0x75, 0x01,         //     Report Size (1),
    0x05, 0x08,         //     Usage Page (LEDs),
    0x19, 0x01,         //     Usage Minimum (1),
    0x29, 0x05,         //     Usage Maximum (5),
    0x91, 0x02,         //     Output (Data, Variable, Absolute), ;LED report
    0x95, 0x01,         //     Report Count (1),
    0x75, 0x03,         //     Report Size (3),
    0x91, 0x01,         //     Output (Constant), ;LED report padding
    0x95, 0x06,         //     Report Count (6),
    0x75, 0x08,         //     Report Size (8),
    0x15, 0x00,         //     Logical Minimum (0),
    0x25, 0x65,         //     Logical Maximum (101),
    0x05, 0x07,         //     Usage Page (Key Codes),
    0x19, 0x00,         //     Usage Minimum (0),
    0x29, 0x65,         //     Usage Maximum (101),
    0x81, 0x00,         //     Input (Data, Array), ;Key arrays (6 bytes)
    0xC0,               // End Collection
];

/// Prefix of a long item, which carries its own size and tag bytes
pub const LONG_ITEM_PREFIX: u8 = 0xFE;
/// Nesting of Push items supported while computing a layout
pub const GLOBAL_STACK_DEPTH: usize = 4;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ItemType {
    Main = 0,
    Global = 1,
    Local = 2,
    Reserved = 3,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MainTag {
    Input = 0x8,
    Output = 0x9,
    Collection = 0xA,
    Feature = 0xB,
    EndCollection = 0xC,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum GlobalTag {
    UsagePage = 0x0,
    LogicalMinimum = 0x1,
    LogicalMaximum = 0x2,
    PhysicalMinimum = 0x3,
    PhysicalMaximum = 0x4,
    UnitExponent = 0x5,
    Unit = 0x6,
    ReportSize = 0x7,
    ReportId = 0x8,
    ReportCount = 0x9,
    Push = 0xA,
    Pop = 0xB,
}

/// A decoded item. Long items are reported with [`LONG_ITEM_PREFIX`] as their tag and no data.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportItem {
    pub offset: usize,
    pub item_type: ItemType,
    pub tag: u8,
    /// Data byte count, 0, 1, 2 or 4 for short items
    pub size: u8,
    pub data: u32,
    /// Encoded length of the item, prefix included
    pub len: usize,
}

impl ReportItem {
    pub const fn is_long(&self) -> bool {
        self.tag == LONG_ITEM_PREFIX
    }

    pub const fn is_main(&self, tag: MainTag) -> bool {
        matches!(self.item_type, ItemType::Main) && self.tag == tag as u8
    }

    pub const fn is_global(&self, tag: GlobalTag) -> bool {
        matches!(self.item_type, ItemType::Global) && self.tag == tag as u8
    }
}

pub const fn parse_item(descriptor: &[u8], offset: usize) -> Result<ReportItem, DescriptorError> {
    let prefix = descriptor[offset];
    if prefix == LONG_ITEM_PREFIX {
        if offset + 3 > descriptor.len() {
            return Err(DescriptorError::Truncated { offset });
        }
        let size = descriptor[offset + 1];
        let len = 3 + size as usize;
        if offset + len > descriptor.len() {
            return Err(DescriptorError::Truncated { offset });
        }
        return Ok(ReportItem {
            offset,
            item_type: ItemType::Reserved,
            tag: LONG_ITEM_PREFIX,
            size,
            data: 0,
            len,
        });
    }

    let size: usize = match prefix & 0x03 {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => 4,
    };
    if offset + 1 + size > descriptor.len() {
        return Err(DescriptorError::Truncated { offset });
    }
    let mut data = 0u32;
    let mut i = 0;
    while i < size {
        data |= (descriptor[offset + 1 + i] as u32) << (8 * i);
        i += 1;
    }
    let item_type = match (prefix >> 2) & 0x03 {
        0 => ItemType::Main,
        1 => ItemType::Global,
        2 => ItemType::Local,
        _ => ItemType::Reserved,
    };
    Ok(ReportItem {
        offset,
        item_type,
        tag: prefix >> 4,
        size: size as u8,
        data,
        len: 1 + size,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct GlobalState {
    report_size: u32,
    report_count: u32,
}

/// Bit totals declared by a report descriptor, summed over every report it defines
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportLayout {
    pub input_bits: u32,
    pub output_bits: u32,
    pub feature_bits: u32,
    /// Reports are prefixed by a one byte report id
    pub report_ids: bool,
}

impl ReportLayout {
    pub const fn input_bytes(&self) -> usize {
        Self::bytes(self.input_bits, self.report_ids)
    }

    pub const fn output_bytes(&self) -> usize {
        Self::bytes(self.output_bits, self.report_ids)
    }

    const fn bytes(bits: u32, report_ids: bool) -> usize {
        if bits == 0 {
            return 0;
        }
        (bits as usize + 7) / 8 + if report_ids { 1 } else { 0 }
    }
}

pub const fn report_layout(descriptor: &[u8]) -> Result<ReportLayout, DescriptorError> {
    let mut layout = ReportLayout {
        input_bits: 0,
        output_bits: 0,
        feature_bits: 0,
        report_ids: false,
    };
    let mut global = GlobalState {
        report_size: 0,
        report_count: 0,
    };
    let mut stack = [global; GLOBAL_STACK_DEPTH];
    let mut stack_len = 0;
    let mut depth = 0u32;

    let mut offset = 0;
    while offset < descriptor.len() {
        let item = match parse_item(descriptor, offset) {
            Ok(item) => item,
            Err(e) => return Err(e),
        };
        offset += item.len;
        if item.is_long() {
            continue;
        }

        let bits = global.report_size.saturating_mul(global.report_count);
        if item.is_global(GlobalTag::ReportSize) {
            global.report_size = item.data;
        } else if item.is_global(GlobalTag::ReportCount) {
            global.report_count = item.data;
        } else if item.is_global(GlobalTag::ReportId) {
            layout.report_ids = true;
        } else if item.is_global(GlobalTag::Push) {
            if stack_len == GLOBAL_STACK_DEPTH {
                return Err(DescriptorError::GlobalStackOverflow);
            }
            stack[stack_len] = global;
            stack_len += 1;
        } else if item.is_global(GlobalTag::Pop) {
            if stack_len == 0 {
                return Err(DescriptorError::GlobalStackUnderflow);
            }
            stack_len -= 1;
            global = stack[stack_len];
        } else if item.is_main(MainTag::Input) {
            layout.input_bits = layout.input_bits.saturating_add(bits);
        } else if item.is_main(MainTag::Output) {
            layout.output_bits = layout.output_bits.saturating_add(bits);
        } else if item.is_main(MainTag::Feature) {
            layout.feature_bits = layout.feature_bits.saturating_add(bits);
        } else if item.is_main(MainTag::Collection) {
            depth += 1;
        } else if item.is_main(MainTag::EndCollection) {
            if depth == 0 {
                return Err(DescriptorError::UnbalancedCollection);
            }
            depth -= 1;
        }
    }

    if depth != 0 {
        return Err(DescriptorError::UnbalancedCollection);
    }
    Ok(layout)
}

pub const KEYBOARD_REPORT_LAYOUT: ReportLayout = match report_layout(KEYBOARD_REPORT_DESCRIPTOR) {
    Ok(layout) => layout,
    Err(_) => panic!("keyboard report descriptor does not parse"),
};

const _: () = {
    assert!(KEYBOARD_REPORT_LAYOUT.input_bytes() == KEYBOARD_EPSIZE as usize);
    assert!(!KEYBOARD_REPORT_LAYOUT.report_ids);
    assert!(KEYBOARD_REPORT_LAYOUT.output_bytes() == keyboard::LEDS_REPORT_LEN);
};
