//! The composite configuration descriptor
//!
//! Hosts read a configuration as one flat stream: the 9 byte header followed by every
//! interface, class and endpoint descriptor, each found through the length byte of the one before
//! it. [`ConfigurationDescriptor`] keeps the sub-descriptors as an ordered list and derives
//! `wTotalLength`, `bNumInterfaces` and every `bNumEndpoints` from it, so adding or removing an
//! endpoint is a single entry in [`KEYBOARD_DESCRIPTORS`].

use crate::config;
use crate::descriptor::*;
use crate::endpoint::{
    hardware_endpoint, ENDPOINT_DIRECTION_IN, KEYBOARD_EPADDR, KEYBOARD_EPSIZE,
};
use crate::report::KEYBOARD_REPORT_DESCRIPTOR;
use crate::{DescriptorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubDescriptor {
    Interface(InterfaceDescriptor),
    Hid(HidDescriptor),
    Endpoint(EndpointDescriptor),
}

impl SubDescriptor {
    pub const fn len(&self) -> usize {
        match self {
            SubDescriptor::Interface(_) => InterfaceDescriptor::LEN,
            SubDescriptor::Hid(_) => HidDescriptor::LEN,
            SubDescriptor::Endpoint(_) => EndpointDescriptor::LEN,
        }
    }

    pub const fn descriptor_type(&self) -> DescriptorType {
        match self {
            SubDescriptor::Interface(_) => InterfaceDescriptor::DESCRIPTOR_TYPE,
            SubDescriptor::Hid(_) => HidDescriptor::DESCRIPTOR_TYPE,
            SubDescriptor::Endpoint(_) => EndpointDescriptor::DESCRIPTOR_TYPE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationDescriptor<'a> {
    pub header: ConfigurationHeader,
    pub descriptors: &'a [SubDescriptor],
}

impl<'a> ConfigurationDescriptor<'a> {
    pub const fn total_length(&self) -> usize {
        let mut len = ConfigurationHeader::LEN;
        let mut i = 0;
        while i < self.descriptors.len() {
            len += self.descriptors[i].len();
            i += 1;
        }
        len
    }

    /// Alternate settings share their interface number and are not counted again
    pub const fn num_interfaces(&self) -> u8 {
        let mut count = 0;
        let mut i = 0;
        while i < self.descriptors.len() {
            if let SubDescriptor::Interface(interface) = &self.descriptors[i] {
                if interface.bAlternateSetting == 0 {
                    count += 1;
                }
            }
            i += 1;
        }
        count
    }

    /// Endpoints listed after the interface at `position`, up to the next interface
    pub const fn num_endpoints(&self, position: usize) -> u8 {
        let mut count = 0;
        let mut i = position + 1;
        while i < self.descriptors.len() {
            match &self.descriptors[i] {
                SubDescriptor::Interface(_) => break,
                SubDescriptor::Endpoint(_) => count += 1,
                SubDescriptor::Hid(_) => {}
            }
            i += 1;
        }
        count
    }

    /// Checks the ordering rules a host relies on when it walks the stream
    ///
    /// * the first sub-descriptor is an interface
    /// * interface numbers start at 0 and are contiguous
    /// * a HID descriptor directly follows its interface, ahead of the endpoints
    /// * every endpoint is wired to a hardware endpoint that can hold its packets
    pub const fn validate(&self) {
        assert!(!self.descriptors.is_empty(), "configuration has no interface");
        assert!(
            matches!(self.descriptors[0], SubDescriptor::Interface(_)),
            "configuration must start with an interface descriptor"
        );
        assert!(self.total_length() <= u16::MAX as usize, "configuration too long");

        let mut next_interface = 0;
        let mut i = 0;
        while i < self.descriptors.len() {
            match &self.descriptors[i] {
                SubDescriptor::Interface(interface) => {
                    if interface.bAlternateSetting == 0 {
                        assert!(
                            interface.bInterfaceNumber == next_interface,
                            "interface numbers must be contiguous"
                        );
                        next_interface += 1;
                    }
                }
                SubDescriptor::Hid(_) => {
                    assert!(
                        matches!(self.descriptors[i - 1], SubDescriptor::Interface(_)),
                        "HID descriptor must directly follow its interface"
                    );
                }
                SubDescriptor::Endpoint(endpoint) => {
                    let hw = hardware_endpoint(endpoint.bEndpointAddress);
                    assert!(hw.is_some(), "endpoint is not wired to the transceiver");
                    if let Some(hw) = hw {
                        assert!(
                            endpoint.wMaxPacketSize <= hw.max_packet_size as u16,
                            "endpoint packet size exceeds its hardware buffer"
                        );
                    }
                }
            }
            i += 1;
        }
    }

    /// Encodes the full configuration, `N` must equal [`Self::total_length`]
    pub const fn bytes<const N: usize>(&self) -> [u8; N] {
        self.validate();
        assert!(N == self.total_length(), "buffer size differs from wTotalLength");

        let mut out = [0u8; N];
        out = copy_at(
            out,
            0,
            &self
                .header
                .bytes(self.total_length() as u16, self.num_interfaces()),
        );
        let mut pos = ConfigurationHeader::LEN;
        let mut i = 0;
        while i < self.descriptors.len() {
            out = match &self.descriptors[i] {
                SubDescriptor::Interface(interface) => {
                    copy_at(out, pos, &interface.bytes(self.num_endpoints(i)))
                }
                SubDescriptor::Hid(hid) => copy_at(out, pos, &hid.bytes()),
                SubDescriptor::Endpoint(endpoint) => copy_at(out, pos, &endpoint.bytes()),
            };
            pos += self.descriptors[i].len();
            i += 1;
        }
        out
    }
}

const fn copy_at<const N: usize>(mut out: [u8; N], pos: usize, src: &[u8]) -> [u8; N] {
    let mut i = 0;
    while i < src.len() {
        out[pos + i] = src[i];
        i += 1;
    }
    out
}

/// One descriptor found while walking a descriptor stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDescriptor<'a> {
    pub offset: usize,
    pub descriptor_type: u8,
    /// The whole descriptor, length and type bytes included
    pub bytes: &'a [u8],
}

/// Walks a flat descriptor stream using each descriptor's own length byte
///
/// Stops after the first error.
pub struct DescriptorIter<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> DescriptorIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            failed: false,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for DescriptorIter<'a> {
    type Item = Result<RawDescriptor<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        let offset = self.offset;
        let remaining = &self.data[offset..];
        let length = remaining[0];
        if length < 2 {
            self.failed = true;
            return Some(Err(DescriptorError::InvalidLength { offset, length }));
        }
        match remaining.get(..length as usize) {
            None => {
                self.failed = true;
                Some(Err(DescriptorError::Truncated { offset }))
            }
            Some(bytes) => {
                self.offset += bytes.len();
                Some(Ok(RawDescriptor {
                    offset,
                    descriptor_type: bytes[1],
                    bytes,
                }))
            }
        }
    }
}

/// `wTotalLength` of a configuration header, as read by a host after its first 9 byte request
pub fn read_total_length(header: &[u8]) -> Result<u16> {
    if header.len() < ConfigurationHeader::LEN {
        return Err(DescriptorError::Truncated { offset: 0 });
    }
    if header[0] as usize != ConfigurationHeader::LEN {
        return Err(DescriptorError::InvalidLength {
            offset: 0,
            length: header[0],
        });
    }
    if header[1] != DescriptorType::Configuration as u8 {
        return Err(DescriptorError::UnknownDescriptorType(header[1]));
    }
    Ok(u16::from_le_bytes([header[2], header[3]]))
}

pub const KEYBOARD_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    bInterfaceNumber: 0,
    bAlternateSetting: 0,
    bInterfaceClass: USB_CLASS_HID,
    bInterfaceSubClass: InterfaceSubClass::for_protocol(InterfaceProtocol::Keyboard) as u8,
    bInterfaceProtocol: InterfaceProtocol::Keyboard as u8,
    iInterface: NO_DESCRIPTOR,
};

pub const KEYBOARD_HID: HidDescriptor = HidDescriptor {
    bcdHID: SPEC_VERSION_1_11,
    bCountryCode: COUNTRY_CODE_NOT_SUPPORTED,
    wDescriptorLength: KEYBOARD_REPORT_DESCRIPTOR.len() as u16,
};

pub const KEYBOARD_IN_ENDPOINT: EndpointDescriptor = EndpointDescriptor {
    bEndpointAddress: KEYBOARD_EPADDR,
    bmAttributes: ENDPOINT_TYPE_INTERRUPT,
    wMaxPacketSize: KEYBOARD_EPSIZE as u16,
    bInterval: config::interval_ms(config::KEYBOARD_POLL_INTERVAL),
};

#[cfg(feature = "led-endpoint")]
pub const KEYBOARD_LED_OUT_ENDPOINT: EndpointDescriptor = EndpointDescriptor {
    bEndpointAddress: crate::endpoint::KEYBOARD_LED_EPADDR,
    bmAttributes: ENDPOINT_TYPE_INTERRUPT,
    wMaxPacketSize: KEYBOARD_EPSIZE as u16,
    bInterval: config::interval_ms(config::KEYBOARD_LED_POLL_INTERVAL),
};

pub const KEYBOARD_DESCRIPTORS: &[SubDescriptor] = &[
    SubDescriptor::Interface(KEYBOARD_INTERFACE),
    SubDescriptor::Hid(KEYBOARD_HID),
    SubDescriptor::Endpoint(KEYBOARD_IN_ENDPOINT),
    #[cfg(feature = "led-endpoint")]
    SubDescriptor::Endpoint(KEYBOARD_LED_OUT_ENDPOINT),
];

pub const CONFIGURATION_DESCRIPTOR: ConfigurationDescriptor<'static> = ConfigurationDescriptor {
    header: ConfigurationHeader {
        bConfigurationValue: 1,
        iConfiguration: NO_DESCRIPTOR,
        bmAttributes: configuration_attributes(config::SELF_POWERED, config::REMOTE_WAKEUP),
        bMaxPower: config::max_power_units(config::MAX_POWER_MA),
    },
    descriptors: KEYBOARD_DESCRIPTORS,
};

pub static CONFIGURATION_DESCRIPTOR_BYTES: [u8; CONFIGURATION_DESCRIPTOR.total_length()] =
    CONFIGURATION_DESCRIPTOR.bytes();

/// The HID descriptor on its own, for `GET_DESCRIPTOR(HID)`
pub static KEYBOARD_HID_DESCRIPTOR_BYTES: [u8; HidDescriptor::LEN] = KEYBOARD_HID.bytes();

const _: () = assert!(KEYBOARD_IN_ENDPOINT.bEndpointAddress & ENDPOINT_DIRECTION_IN != 0);
