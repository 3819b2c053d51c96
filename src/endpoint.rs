//! Endpoint numbering shared by the transceiver driver and the descriptor tables
//!
//! The driver routes hardware FIFOs using [`HARDWARE_ENDPOINTS`] and the configuration descriptor
//! advertises [`KEYBOARD_EPADDR`], both derived from [`KEYBOARD_ENDPOINT_NUMBER`].

use packed_struct::prelude::*;
use usb_device::endpoint::EndpointAddress;

/// Direction bit of `bEndpointAddress`, set for IN (device to host) endpoints
pub const ENDPOINT_DIRECTION_IN: u8 = 0x80;
pub const ENDPOINT_NUMBER_MASK: u8 = 0x0F;

/// Buffer offset of the control endpoint in transceiver RAM
pub const EP0_ADDR: u16 = 0;
/// Buffer offset of hardware endpoint 1, after the 8 byte EP0 buffer and its 2 byte CRC slack
pub const EP1_ADDR: u16 = 10;

pub const CONTROL_ENDPOINT_NUMBER: u8 = 0;
pub const KEYBOARD_ENDPOINT_NUMBER: u8 = 1;

/// Key reports, IN half of hardware endpoint 1
pub const KEYBOARD_EPADDR: u8 = in_address(KEYBOARD_ENDPOINT_NUMBER);
/// LED state, OUT half of hardware endpoint 1. Only advertised with the `led-endpoint` feature.
pub const KEYBOARD_LED_EPADDR: u8 = out_address(KEYBOARD_ENDPOINT_NUMBER);
/// 1 modifier byte, 1 reserved byte and 6 key slots
pub const KEYBOARD_EPSIZE: u8 = UsbPacketSize::Bytes8 as u8;
pub const CONTROL_EPSIZE: u8 = UsbPacketSize::Bytes8 as u8;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, PrimitiveEnum)]
#[repr(u8)]
pub enum UsbPacketSize {
    Bytes8 = 8,
    Bytes16 = 16,
    Bytes32 = 32,
    Bytes64 = 64,
}

/// A physical endpoint of the transceiver and where its DMA buffer lives
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareEndpoint {
    pub number: u8,
    pub buffer_addr: u16,
    pub max_packet_size: UsbPacketSize,
}

pub const HARDWARE_ENDPOINTS: [HardwareEndpoint; 2] = [
    HardwareEndpoint {
        number: CONTROL_ENDPOINT_NUMBER,
        buffer_addr: EP0_ADDR,
        max_packet_size: UsbPacketSize::Bytes8,
    },
    HardwareEndpoint {
        number: KEYBOARD_ENDPOINT_NUMBER,
        buffer_addr: EP1_ADDR,
        max_packet_size: UsbPacketSize::Bytes8,
    },
];

pub const fn in_address(number: u8) -> u8 {
    assert!(number <= ENDPOINT_NUMBER_MASK, "endpoint number out of range");
    ENDPOINT_DIRECTION_IN | number
}

pub const fn out_address(number: u8) -> u8 {
    assert!(number <= ENDPOINT_NUMBER_MASK, "endpoint number out of range");
    number
}

pub const fn endpoint_number(address: u8) -> u8 {
    address & ENDPOINT_NUMBER_MASK
}

pub const fn is_in(address: u8) -> bool {
    address & ENDPOINT_DIRECTION_IN != 0
}

/// The hardware endpoint wired to `address`, ignoring direction
pub const fn hardware_endpoint(address: u8) -> Option<HardwareEndpoint> {
    let number = endpoint_number(address);
    let mut i = 0;
    while i < HARDWARE_ENDPOINTS.len() {
        if HARDWARE_ENDPOINTS[i].number == number {
            return Some(HARDWARE_ENDPOINTS[i]);
        }
        i += 1;
    }
    None
}

pub fn endpoint_address(address: u8) -> EndpointAddress {
    EndpointAddress::from(address)
}

const _: () = {
    assert!(hardware_endpoint(KEYBOARD_EPADDR).is_some());
    assert!(hardware_endpoint(KEYBOARD_LED_EPADDR).is_some());
    assert!(is_in(KEYBOARD_EPADDR) && !is_in(KEYBOARD_LED_EPADDR));
};
