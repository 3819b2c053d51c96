//! Answers `GET_DESCRIPTOR` from the static tables
//!
//! A transceiver driver that runs its own control pipe decodes the SETUP packet with
//! [`DescriptorRequest::from_setup`] and transmits the slice [`get_descriptor`] returns, in
//! `bMaxPacketSize0` sized packets. The slice is already cut to `wLength`.

use log::{trace, warn};
use num_enum::TryFromPrimitive;
use packed_struct::prelude::*;
use usb_device::control::{Recipient, Request, RequestType};

use crate::descriptor::configuration::{
    CONFIGURATION_DESCRIPTOR_BYTES, KEYBOARD_HID_DESCRIPTOR_BYTES, KEYBOARD_INTERFACE,
};
use crate::descriptor::string::string_descriptor_at;
use crate::descriptor::{DescriptorType, DEVICE_DESCRIPTOR_BYTES};
use crate::report::KEYBOARD_REPORT_DESCRIPTOR;
use crate::{DescriptorError, Result};

pub const SETUP_PACKET_LEN: usize = 8;

/// The 8 byte SETUP packet of a control transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq, PackedStruct)]
#[packed_struct(endian = "lsb", bit_numbering = "msb0", size_bytes = "8")]
pub struct SetupPacket {
    /// Device to host
    #[packed_field(bits = "0")]
    pub direction: bool,
    #[packed_field(bits = "1:2")]
    pub request_type: u8,
    #[packed_field(bits = "3:7")]
    pub recipient: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub fn get_descriptor(
        recipient: Recipient,
        descriptor_type: DescriptorType,
        index: u8,
        language_id: u16,
        length: u16,
    ) -> Self {
        Self {
            direction: true,
            request_type: RequestType::Standard as u8,
            recipient: recipient as u8,
            request: Request::GET_DESCRIPTOR,
            value: (u16::from(u8::from(descriptor_type)) << 8) | u16::from(index),
            index: language_id,
            length,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorRequest {
    pub descriptor_type: u8,
    pub index: u8,
    /// Language id for string requests, interface number for class descriptors
    pub w_index: u16,
    pub length: u16,
}

impl DescriptorRequest {
    pub fn new(descriptor_type: DescriptorType, index: u8, length: u16) -> Self {
        Self {
            descriptor_type: descriptor_type.into(),
            index,
            w_index: 0,
            length,
        }
    }

    pub fn from_setup(setup: &[u8; SETUP_PACKET_LEN]) -> Result<Self> {
        let packet = SetupPacket::unpack(setup)?;
        if !packet.direction
            || packet.request_type != RequestType::Standard as u8
            || packet.request != Request::GET_DESCRIPTOR
        {
            trace!(
                "not a GET_DESCRIPTOR, request type: {:X}, request: {:X}",
                packet.request_type,
                packet.request
            );
            return Err(DescriptorError::UnsupportedRequest(packet.request));
        }
        Ok(Self {
            descriptor_type: (packet.value >> 8) as u8,
            index: (packet.value & 0xFF) as u8,
            w_index: packet.index,
            length: packet.length,
        })
    }
}

/// The full descriptor for `request`, ignoring `wLength`
///
/// HID and report descriptors belong to the keyboard interface and are only found when `wIndex`
/// names it.
pub fn lookup(request: &DescriptorRequest) -> Result<&'static [u8]> {
    let unsupported = DescriptorError::UnsupportedIndex {
        descriptor_type: request.descriptor_type,
        index: request.index,
    };
    let descriptor_type = DescriptorType::try_from_primitive(request.descriptor_type)
        .map_err(|_| DescriptorError::UnknownDescriptorType(request.descriptor_type))?;
    let keyboard_interface =
        request.index == 0 && request.w_index == u16::from(KEYBOARD_INTERFACE.bInterfaceNumber);

    match descriptor_type {
        DescriptorType::Device if request.index == 0 => Ok(&DEVICE_DESCRIPTOR_BYTES),
        DescriptorType::Configuration if request.index == 0 => Ok(&CONFIGURATION_DESCRIPTOR_BYTES),
        DescriptorType::String => string_descriptor_at(request.index).ok_or(unsupported),
        DescriptorType::Hid if keyboard_interface => Ok(&KEYBOARD_HID_DESCRIPTOR_BYTES),
        DescriptorType::Report if keyboard_interface => Ok(KEYBOARD_REPORT_DESCRIPTOR),
        DescriptorType::Interface | DescriptorType::Endpoint => {
            Err(DescriptorError::UnknownDescriptorType(request.descriptor_type))
        }
        _ => Err(unsupported),
    }
}

/// The descriptor for `request`, cut to the `wLength` the host asked for
pub fn get_descriptor(request: &DescriptorRequest) -> Result<&'static [u8]> {
    match lookup(request) {
        Ok(bytes) => {
            let len = bytes.len().min(request.length as usize);
            trace!(
                "GET_DESCRIPTOR type:{:X} index:{:X}, sending {:X} of {:X} bytes",
                request.descriptor_type,
                request.index,
                len,
                bytes.len()
            );
            Ok(&bytes[..len])
        }
        Err(e) => {
            warn!(
                "Unsupported GET_DESCRIPTOR type:{:X} index:{:X} - {:?}",
                request.descriptor_type, request.index, e
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use env_logger::Env;

    use super::*;
    use crate::descriptor::string::MANUFACTURER_DESCRIPTOR;

    fn init_logging() {
        let _ = env_logger::Builder::from_env(Env::default().default_filter_or("trace"))
            .is_test(true)
            .try_init();
    }

    #[test]
    fn header_read_then_full_read() {
        init_logging();

        let header =
            get_descriptor(&DescriptorRequest::new(DescriptorType::Configuration, 0, 9)).unwrap();
        assert_eq!(header, &CONFIGURATION_DESCRIPTOR_BYTES[..9]);

        let total = u16::from_le_bytes([header[2], header[3]]);
        let full = get_descriptor(&DescriptorRequest::new(
            DescriptorType::Configuration,
            0,
            total,
        ))
        .unwrap();
        assert_eq!(full, &CONFIGURATION_DESCRIPTOR_BYTES[..]);
    }

    #[test]
    fn short_requests_are_truncated_and_long_ones_are_not_padded() {
        init_logging();

        let device = get_descriptor(&DescriptorRequest::new(DescriptorType::Device, 0, 8)).unwrap();
        assert_eq!(device, &DEVICE_DESCRIPTOR_BYTES[..8]);

        let device =
            get_descriptor(&DescriptorRequest::new(DescriptorType::Device, 0, 0xFFFF)).unwrap();
        assert_eq!(device.len(), 18);

        let none = get_descriptor(&DescriptorRequest::new(DescriptorType::Device, 0, 0)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn class_descriptors_are_found() {
        init_logging();

        assert_eq!(
            lookup(&DescriptorRequest::new(DescriptorType::Report, 0, 0xFF)),
            Ok(KEYBOARD_REPORT_DESCRIPTOR)
        );
        assert_eq!(
            lookup(&DescriptorRequest::new(DescriptorType::Hid, 0, 0xFF)),
            Ok(&KEYBOARD_HID_DESCRIPTOR_BYTES[..])
        );
        assert_eq!(
            lookup(&DescriptorRequest::new(DescriptorType::String, 1, 0xFF)),
            Ok(&MANUFACTURER_DESCRIPTOR[..])
        );
    }

    #[test]
    fn class_descriptors_need_the_keyboard_interface() {
        init_logging();

        for descriptor_type in [DescriptorType::Hid, DescriptorType::Report] {
            let mut request = DescriptorRequest::new(descriptor_type, 0, 0xFF);
            assert!(get_descriptor(&request).is_ok());

            request.w_index = 1;
            assert_eq!(
                get_descriptor(&request),
                Err(DescriptorError::UnsupportedIndex {
                    descriptor_type: descriptor_type.into(),
                    index: 0
                })
            );
        }

        // interface 1 through a decoded SETUP packet
        let setup =
            SetupPacket::get_descriptor(Recipient::Interface, DescriptorType::Report, 0, 1, 0xFF)
                .pack()
                .unwrap();
        let request = DescriptorRequest::from_setup(&setup).unwrap();
        assert_eq!(request.w_index, 1);
        assert!(matches!(
            lookup(&request),
            Err(DescriptorError::UnsupportedIndex { .. })
        ));
    }

    #[test]
    fn recipient_keeps_all_five_bits() {
        init_logging();

        let setup = SetupPacket::get_descriptor(Recipient::Other, DescriptorType::Device, 0, 0, 18);
        assert_eq!(setup.pack().unwrap()[0], 0x83);

        // bmRequestType 0x90: device to host, standard, recipient 0x10
        let packet = SetupPacket::unpack(&[0x90, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x00]).unwrap();
        assert!(packet.direction);
        assert_eq!(packet.request_type, RequestType::Standard as u8);
        assert_eq!(packet.recipient, 0x10);
        assert_eq!(packet.pack().unwrap()[0], 0x90);
    }

    #[test]
    fn unknown_requests_are_rejected() {
        init_logging();

        assert_eq!(
            get_descriptor(&DescriptorRequest::new(DescriptorType::String, 9, 0xFF)),
            Err(DescriptorError::UnsupportedIndex {
                descriptor_type: 0x03,
                index: 9
            })
        );
        assert_eq!(
            get_descriptor(&DescriptorRequest::new(DescriptorType::Configuration, 1, 0xFF)),
            Err(DescriptorError::UnsupportedIndex {
                descriptor_type: 0x02,
                index: 1
            })
        );
        assert_eq!(
            get_descriptor(&DescriptorRequest::new(DescriptorType::Endpoint, 0, 7)),
            Err(DescriptorError::UnknownDescriptorType(0x05))
        );

        let mut request = DescriptorRequest::new(DescriptorType::Device, 0, 18);
        request.descriptor_type = 0x0F;
        assert_eq!(
            get_descriptor(&request),
            Err(DescriptorError::UnknownDescriptorType(0x0F))
        );
    }

    #[test]
    fn setup_packet_decodes_to_request() {
        init_logging();

        let setup = SetupPacket::get_descriptor(
            Recipient::Device,
            DescriptorType::String,
            2,
            0x0409,
            0xFF,
        )
        .pack()
        .unwrap();
        assert_eq!(setup, [0x80, 0x06, 0x02, 0x03, 0x09, 0x04, 0xFF, 0x00]);

        let request = DescriptorRequest::from_setup(&setup).unwrap();
        assert_eq!(request.descriptor_type, 0x03);
        assert_eq!(request.index, 2);
        assert_eq!(request.w_index, 0x0409);
        assert_eq!(request.length, 0xFF);
    }

    #[test]
    fn non_descriptor_setup_packets_are_rejected() {
        init_logging();

        // SET_ADDRESS
        let set_address = [0x00, 0x05, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(
            DescriptorRequest::from_setup(&set_address),
            Err(DescriptorError::UnsupportedRequest(Request::SET_ADDRESS))
        );

        // class GET_REPORT
        let get_report = [0xA1, 0x01, 0x00, 0x01, 0x00, 0x00, 0x08, 0x00];
        assert_eq!(
            DescriptorRequest::from_setup(&get_report),
            Err(DescriptorError::UnsupportedRequest(0x01))
        );
    }
}
