//! [`usb-device`](https://crates.io/crates/usb-device) class for the keyboard interface
//!
//! The class claims the endpoint addresses from [`crate::endpoint`] when allocating, and writes
//! its interface, HID and endpoint descriptors from the same constants the static configuration
//! table is built from. A device built with [`device_builder`] therefore enumerates with a
//! configuration descriptor identical to
//! [`CONFIGURATION_DESCRIPTOR_BYTES`](crate::descriptor::configuration::CONFIGURATION_DESCRIPTOR_BYTES).

use log::{error, info, trace, warn};
use usb_device::class_prelude::*;
use usb_device::control::{Recipient, Request, RequestType};
use usb_device::endpoint::{Endpoint, EndpointDirection};
use usb_device::prelude::{UsbDeviceBuilder, UsbVidPid};
use usb_device::Result;

use crate::config;
use crate::descriptor::configuration::{
    CONFIGURATION_DESCRIPTOR, KEYBOARD_HID_DESCRIPTOR_BYTES, KEYBOARD_IN_ENDPOINT,
    KEYBOARD_INTERFACE,
};
use crate::descriptor::{DescriptorType, EndpointDescriptor, DEVICE_DESCRIPTOR};
use crate::endpoint::endpoint_address;
use crate::report::keyboard::BootKeyboardReport;
#[cfg(feature = "led-endpoint")]
use crate::report::keyboard::KeyboardLedsReport;
use crate::report::KEYBOARD_REPORT_DESCRIPTOR;

#[cfg(test)]
mod test;

/// A `UsbDeviceBuilder` carrying the identity from [`DEVICE_DESCRIPTOR`] and the configuration
/// header attributes
pub fn device_builder<B: UsbBus>(usb_alloc: &UsbBusAllocator<B>) -> UsbDeviceBuilder<'_, B> {
    let attributes = CONFIGURATION_DESCRIPTOR.header.bmAttributes;
    UsbDeviceBuilder::new(
        usb_alloc,
        UsbVidPid(DEVICE_DESCRIPTOR.idVendor, DEVICE_DESCRIPTOR.idProduct),
    )
    .manufacturer(config::MANUFACTURER)
    .product(config::PRODUCT)
    .serial_number(config::SERIAL_NUMBER)
    .device_class(DEVICE_DESCRIPTOR.bDeviceClass)
    .device_sub_class(DEVICE_DESCRIPTOR.bDeviceSubClass)
    .device_protocol(DEVICE_DESCRIPTOR.bDeviceProtocol)
    .max_packet_size_0(DEVICE_DESCRIPTOR.bMaxPacketSize0)
    .device_release(DEVICE_DESCRIPTOR.bcdDevice)
    .self_powered(attributes & crate::descriptor::CONFIG_ATTR_SELF_POWERED != 0)
    .supports_remote_wakeup(attributes & crate::descriptor::CONFIG_ATTR_REMOTE_WAKEUP != 0)
    .max_power(config::MAX_POWER_MA as usize)
}

fn alloc_endpoint<'a, B: UsbBus, D: EndpointDirection>(
    usb_alloc: &'a UsbBusAllocator<B>,
    descriptor: &EndpointDescriptor,
) -> Result<Endpoint<'a, B, D>> {
    usb_alloc.alloc(
        Some(endpoint_address(descriptor.bEndpointAddress)),
        EndpointType::Interrupt,
        descriptor.wMaxPacketSize,
        descriptor.bInterval,
    )
}

/// Boot keyboard interface backed by the static descriptor tables
pub struct BootKeyboardClass<'a, B: UsbBus> {
    interface: InterfaceNumber,
    in_endpoint: EndpointIn<'a, B>,
    #[cfg(feature = "led-endpoint")]
    out_endpoint: EndpointOut<'a, B>,
}

impl<'a, B: UsbBus> BootKeyboardClass<'a, B> {
    /// Allocates the interface and endpoints, failing if the bus cannot provide the fixed
    /// endpoint addresses
    pub fn new(usb_alloc: &'a UsbBusAllocator<B>) -> Result<Self> {
        let interface = usb_alloc.interface();
        if u8::from(interface) != KEYBOARD_INTERFACE.bInterfaceNumber {
            warn!(
                "Keyboard allocated interface {:X}, descriptors advertise {:X}",
                u8::from(interface),
                KEYBOARD_INTERFACE.bInterfaceNumber
            );
        }

        let in_endpoint = alloc_endpoint(usb_alloc, &KEYBOARD_IN_ENDPOINT).map_err(|e| {
            error!("Failed to allocate keyboard IN endpoint - {:?}", e);
            e
        })?;

        #[cfg(feature = "led-endpoint")]
        let out_endpoint = alloc_endpoint(
            usb_alloc,
            &crate::descriptor::configuration::KEYBOARD_LED_OUT_ENDPOINT,
        )
        .map_err(|e| {
            error!("Failed to allocate keyboard LED OUT endpoint - {:?}", e);
            e
        })?;

        Ok(Self {
            interface,
            in_endpoint,
            #[cfg(feature = "led-endpoint")]
            out_endpoint,
        })
    }

    pub fn write_report(&self, report: &BootKeyboardReport) -> Result<usize> {
        let data = report.to_bytes().map_err(|_| UsbError::ParseError)?;
        self.in_endpoint.write(&data)
    }

    #[cfg(feature = "led-endpoint")]
    pub fn read_report(&self) -> Result<KeyboardLedsReport> {
        let mut data = [0; crate::report::keyboard::LEDS_REPORT_LEN];
        self.out_endpoint.read(&mut data)?;
        KeyboardLedsReport::from_bytes(&data).map_err(|_| UsbError::ParseError)
    }

    fn get_descriptor(transfer: ControlIn<B>) {
        let request: &Request = transfer.request();
        match DescriptorType::try_from((request.value >> 8) as u8) {
            Ok(DescriptorType::Report) => {
                match transfer.accept_with_static(KEYBOARD_REPORT_DESCRIPTOR) {
                    Err(e) => error!("Failed to send report descriptor - {:?}", e),
                    Ok(_) => {
                        trace!("Sent report descriptor")
                    }
                }
            }
            Ok(DescriptorType::Hid) => {
                match transfer.accept_with_static(&KEYBOARD_HID_DESCRIPTOR_BYTES) {
                    Err(e) => {
                        error!("Failed to send Hid descriptor - {:?}", e);
                    }
                    Ok(_) => {
                        trace!("Sent hid descriptor")
                    }
                }
            }
            _ => {
                warn!(
                    "Unsupported descriptor type, request type:{:X?}, request:{:X}, value:{:X}",
                    request.request_type, request.request, request.value
                );
            }
        }
    }
}

impl<B: UsbBus> UsbClass<B> for BootKeyboardClass<'_, B> {
    fn get_configuration_descriptors(&self, writer: &mut DescriptorWriter) -> Result<()> {
        writer.interface_alt(
            self.interface,
            KEYBOARD_INTERFACE.bAlternateSetting,
            KEYBOARD_INTERFACE.bInterfaceClass,
            KEYBOARD_INTERFACE.bInterfaceSubClass,
            KEYBOARD_INTERFACE.bInterfaceProtocol,
            None,
        )?;

        //Hid descriptor
        writer.write(
            DescriptorType::Hid as u8,
            &KEYBOARD_HID_DESCRIPTOR_BYTES[2..],
        )?;

        //Endpoint descriptors
        writer.endpoint(&self.in_endpoint)?;
        #[cfg(feature = "led-endpoint")]
        writer.endpoint(&self.out_endpoint)?;

        info!("wrote keyboard config descriptor");
        Ok(())
    }

    fn control_in(&mut self, transfer: ControlIn<B>) {
        let request: &Request = transfer.request();
        //only respond to standard requests for this interface
        if !(request.request_type == RequestType::Standard
            && request.recipient == Recipient::Interface
            && request.index == u8::from(self.interface) as u16)
        {
            return;
        }

        trace!(
            "ctrl_in: request type: {:?}, request: {:X}, value: {:X}",
            request.request_type,
            request.request,
            request.value
        );

        if request.request == Request::GET_DESCRIPTOR {
            Self::get_descriptor(transfer);
        }
    }
}
