//! USB descriptor tables for the ECmacro02 boot keyboard.
//!
//! Everything the device tells a host during enumeration lives here as `'static` byte tables,
//! built by `const fn` encoders so that every length byte, `wTotalLength` and endpoint address is
//! derived rather than written by hand:
//!
//! * [`descriptor::DEVICE_DESCRIPTOR_BYTES`] for `GET_DESCRIPTOR(DEVICE)`
//! * [`descriptor::configuration::CONFIGURATION_DESCRIPTOR_BYTES`] for `GET_DESCRIPTOR(CONFIGURATION)`
//! * [`report::KEYBOARD_REPORT_DESCRIPTOR`] for the HID `GET_DESCRIPTOR(REPORT)`
//! * [`descriptor::string`] for the indexed `GET_DESCRIPTOR(STRING)` requests
//!
//! A USB stack can either serve the tables directly through [`request::get_descriptor`], or use
//! the [`usb-device`](https://crates.io/crates/usb-device) adapter in [`class`].
//!
//! ```rust
//! use ecmacro_usb::request::{get_descriptor, DescriptorRequest};
//! use ecmacro_usb::descriptor::DescriptorType;
//!
//! // hosts first read only the 9 byte configuration header
//! let header = get_descriptor(&DescriptorRequest::new(DescriptorType::Configuration, 0, 9)).unwrap();
//! assert_eq!(header.len(), 9);
//! let total_length = u16::from_le_bytes([header[2], header[3]]);
//! assert_eq!(total_length as usize, ecmacro_usb::descriptor::configuration::CONFIGURATION_DESCRIPTOR_BYTES.len());
//! ```
#![no_std]

//Allow the use of std in tests
#[cfg(test)]
#[macro_use]
extern crate std;

use packed_struct::PackingError;
use usb_device::UsbError;

pub mod class;
pub mod config;
pub mod descriptor;
pub mod endpoint;
pub mod report;
pub mod request;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorError {
    /// A descriptor or item claims more bytes than remain in the buffer
    Truncated { offset: usize },
    /// A descriptor length byte is smaller than the two byte header
    InvalidLength { offset: usize, length: u8 },
    UnknownDescriptorType(u8),
    UnsupportedIndex { descriptor_type: u8, index: u8 },
    /// The SETUP packet is not a device-to-host `GET_DESCRIPTOR`
    UnsupportedRequest(u8),
    UnbalancedCollection,
    GlobalStackOverflow,
    GlobalStackUnderflow,
    Serialization,
    UsbError,
}

impl From<PackingError> for DescriptorError {
    fn from(_: PackingError) -> Self {
        DescriptorError::Serialization
    }
}

impl From<UsbError> for DescriptorError {
    fn from(e: UsbError) -> Self {
        match e {
            UsbError::ParseError => DescriptorError::Serialization,
            _ => DescriptorError::UsbError,
        }
    }
}

pub type Result<T> = core::result::Result<T, DescriptorError>;
