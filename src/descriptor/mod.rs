//! Standard USB and HID class descriptors
//!
//! Each record encodes to the exact byte layout of the USB 2.0 (chapter 9) or HID 1.11
//! (section 6.2.1) structure through a `const fn bytes`. `bLength` and `bDescriptorType` are
//! never stored, they are written from `LEN` and `DESCRIPTOR_TYPE`. Counts that depend on other
//! descriptors (`wTotalLength`, `bNumInterfaces`, `bNumEndpoints`) are supplied by
//! [`configuration::ConfigurationDescriptor`].
#![allow(non_snake_case)]

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::config;
use crate::endpoint::CONTROL_EPSIZE;

pub mod configuration;
pub mod string;

pub const USB_CLASS_NONE: u8 = 0x00;
pub const USB_CLASS_HID: u8 = 0x03;
pub const SPEC_VERSION_1_11: u16 = 0x0111; //1.11 in BCD
pub const COUNTRY_CODE_NOT_SUPPORTED: u8 = 0x0;
/// String index meaning "no string"
pub const NO_DESCRIPTOR: u8 = 0;

pub const CONFIG_ATTR_RESERVED: u8 = 0x80;
pub const CONFIG_ATTR_SELF_POWERED: u8 = 0x40;
pub const CONFIG_ATTR_REMOTE_WAKEUP: u8 = 0x20;

pub const ENDPOINT_TYPE_CONTROL: u8 = 0x00;
pub const ENDPOINT_TYPE_INTERRUPT: u8 = 0x03;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DescriptorType {
    Device = 0x01,
    Configuration = 0x02,
    String = 0x03,
    Interface = 0x04,
    Endpoint = 0x05,
    Hid = 0x21,
    Report = 0x22,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Ord, PartialOrd, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum InterfaceProtocol {
    None = 0x00,
    Keyboard = 0x01,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum InterfaceSubClass {
    None = 0x00,
    Boot = 0x01,
}

impl InterfaceSubClass {
    /// Only boot protocol devices carry the boot subclass
    pub const fn for_protocol(protocol: InterfaceProtocol) -> Self {
        match protocol {
            InterfaceProtocol::None => Self::None,
            InterfaceProtocol::Keyboard => Self::Boot,
        }
    }
}

pub const fn configuration_attributes(self_powered: bool, remote_wakeup: bool) -> u8 {
    let mut attributes = CONFIG_ATTR_RESERVED;
    if self_powered {
        attributes |= CONFIG_ATTR_SELF_POWERED;
    }
    if remote_wakeup {
        attributes |= CONFIG_ATTR_REMOTE_WAKEUP;
    }
    attributes
}

const fn lo(value: u16) -> u8 {
    value.to_le_bytes()[0]
}

const fn hi(value: u16) -> u8 {
    value.to_le_bytes()[1]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub bcdUSB: u16,
    pub bDeviceClass: u8,
    pub bDeviceSubClass: u8,
    pub bDeviceProtocol: u8,
    pub bMaxPacketSize0: u8,
    pub idVendor: u16,
    pub idProduct: u16,
    pub bcdDevice: u16,
    pub iManufacturer: u8,
    pub iProduct: u8,
    pub iSerialNumber: u8,
    pub bNumConfigurations: u8,
}

impl DeviceDescriptor {
    pub const LEN: usize = 18;
    pub const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Device;

    pub const fn bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            Self::DESCRIPTOR_TYPE as u8,
            lo(self.bcdUSB),
            hi(self.bcdUSB),
            self.bDeviceClass,
            self.bDeviceSubClass,
            self.bDeviceProtocol,
            self.bMaxPacketSize0,
            lo(self.idVendor),
            hi(self.idVendor),
            lo(self.idProduct),
            hi(self.idProduct),
            lo(self.bcdDevice),
            hi(self.bcdDevice),
            self.iManufacturer,
            self.iProduct,
            self.iSerialNumber,
            self.bNumConfigurations,
        ]
    }
}

/// Configuration header fields that are not derived from the sub-descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationHeader {
    pub bConfigurationValue: u8,
    pub iConfiguration: u8,
    pub bmAttributes: u8,
    pub bMaxPower: u8,
}

impl ConfigurationHeader {
    pub const LEN: usize = 9;
    pub const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Configuration;

    pub const fn bytes(&self, total_length: u16, num_interfaces: u8) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            Self::DESCRIPTOR_TYPE as u8,
            lo(total_length),
            hi(total_length),
            num_interfaces,
            self.bConfigurationValue,
            self.iConfiguration,
            self.bmAttributes,
            self.bMaxPower,
        ]
    }
}

/// Interface fields, `bNumEndpoints` is counted by the composite descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub bInterfaceNumber: u8,
    pub bAlternateSetting: u8,
    pub bInterfaceClass: u8,
    pub bInterfaceSubClass: u8,
    pub bInterfaceProtocol: u8,
    pub iInterface: u8,
}

impl InterfaceDescriptor {
    pub const LEN: usize = 9;
    pub const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Interface;

    pub const fn bytes(&self, num_endpoints: u8) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            Self::DESCRIPTOR_TYPE as u8,
            self.bInterfaceNumber,
            self.bAlternateSetting,
            num_endpoints,
            self.bInterfaceClass,
            self.bInterfaceSubClass,
            self.bInterfaceProtocol,
            self.iInterface,
        ]
    }
}

/// HID class descriptor with a single report descriptor entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidDescriptor {
    pub bcdHID: u16,
    pub bCountryCode: u8,
    /// Length of the report descriptor this interface answers `GET_DESCRIPTOR(REPORT)` with
    pub wDescriptorLength: u16,
}

impl HidDescriptor {
    pub const LEN: usize = 9;
    pub const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Hid;
    pub const NUM_DESCRIPTORS: u8 = 1;

    pub const fn bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            Self::DESCRIPTOR_TYPE as u8,
            lo(self.bcdHID),
            hi(self.bcdHID),
            self.bCountryCode,
            Self::NUM_DESCRIPTORS,
            DescriptorType::Report as u8,
            lo(self.wDescriptorLength),
            hi(self.wDescriptorLength),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub bEndpointAddress: u8,
    pub bmAttributes: u8,
    pub wMaxPacketSize: u16,
    pub bInterval: u8,
}

impl EndpointDescriptor {
    pub const LEN: usize = 7;
    pub const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Endpoint;

    pub const fn bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            Self::DESCRIPTOR_TYPE as u8,
            self.bEndpointAddress,
            self.bmAttributes,
            lo(self.wMaxPacketSize),
            hi(self.wMaxPacketSize),
            self.bInterval,
        ]
    }
}

pub const MANUFACTURER_INDEX: u8 = 1;
pub const PRODUCT_INDEX: u8 = 2;
pub const SERIAL_NUMBER_INDEX: u8 = 3;

/// Device class 0, the class is declared by the keyboard interface
pub const DEVICE_DESCRIPTOR: DeviceDescriptor = DeviceDescriptor {
    bcdUSB: config::USB_VERSION,
    bDeviceClass: USB_CLASS_NONE,
    bDeviceSubClass: 0,
    bDeviceProtocol: 0,
    bMaxPacketSize0: CONTROL_EPSIZE,
    idVendor: config::VENDOR_ID,
    idProduct: config::PRODUCT_ID,
    bcdDevice: config::DEVICE_RELEASE,
    iManufacturer: MANUFACTURER_INDEX,
    iProduct: PRODUCT_INDEX,
    iSerialNumber: SERIAL_NUMBER_INDEX,
    bNumConfigurations: 1,
};

pub static DEVICE_DESCRIPTOR_BYTES: [u8; DeviceDescriptor::LEN] = DEVICE_DESCRIPTOR.bytes();
