use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::vec::Vec;

use env_logger::Env;
use packed_struct::prelude::*;
use usb_device::bus::PollResult;
use usb_device::UsbDirection;

use super::*;
use crate::descriptor::configuration::CONFIGURATION_DESCRIPTOR_BYTES;
use crate::descriptor::string::{LANGUAGE_DESCRIPTOR, PRODUCT_DESCRIPTOR};
use crate::descriptor::DEVICE_DESCRIPTOR_BYTES;
use crate::endpoint::KEYBOARD_EPADDR;
use crate::request::SetupPacket;

fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("trace"))
        .is_test(true)
        .try_init();
}

/// Replays SETUP packets to the control endpoint and hands everything written back to it to
/// `write_val` once the data stage ends
struct TestUsbBus<'a, F> {
    next_ep_index: usize,
    allocated: Vec<EndpointAddress>,
    read_data: &'a [&'a [u8]],
    write_val: F,
    inner: Mutex<RefCell<TestUsbBusInner>>,
}
struct TestUsbBusInner {
    next_read_data: usize,
    write_data: Vec<u8>,
}

impl<'a, F> TestUsbBus<'a, F> {
    fn new(read_data: &'a [&'a [u8]], write_val: F) -> Self {
        TestUsbBus {
            next_ep_index: 1,
            allocated: Vec::new(),
            read_data,
            write_val,
            inner: Mutex::new(RefCell::new(TestUsbBusInner {
                write_data: Vec::new(),
                next_read_data: 0,
            })),
        }
    }
}

impl<F> UsbBus for TestUsbBus<'_, F>
where
    F: core::marker::Sync + Fn(&Vec<u8>),
{
    fn alloc_ep(
        &mut self,
        ep_dir: UsbDirection,
        ep_addr: Option<EndpointAddress>,
        _ep_type: EndpointType,
        _max_packet_size: u16,
        _interval: u8,
    ) -> Result<EndpointAddress> {
        let ep = match ep_addr {
            Some(addr) => addr,
            None => {
                let ep = EndpointAddress::from_parts(self.next_ep_index, ep_dir);
                self.next_ep_index += 1;
                ep
            }
        };
        if self.allocated.contains(&ep) {
            return Err(UsbError::InvalidEndpoint);
        }
        self.allocated.push(ep);
        Ok(ep)
    }

    fn enable(&mut self) {}
    fn reset(&self) {
        todo!()
    }
    fn set_device_address(&self, _addr: u8) {
        todo!()
    }
    fn write(&self, _ep_addr: EndpointAddress, buf: &[u8]) -> Result<usize> {
        let inner_ref = self.inner.lock().unwrap();
        let mut inner = inner_ref.borrow_mut();

        inner.write_data.extend_from_slice(buf);

        if buf.len() < 8 && inner.next_read_data >= self.read_data.len() {
            //if we get less than a full buffer, the write is complete, validate the buffer
            (self.write_val)(&inner.write_data)
        }

        Ok(buf.len())
    }
    fn read(&self, _ep_addr: EndpointAddress, buf: &mut [u8]) -> Result<usize> {
        let inner_ref = self.inner.lock().unwrap();
        let mut inner = inner_ref.borrow_mut();
        let read_data = self.read_data[inner.next_read_data];
        assert!(
            read_data.len() <= 8,
            "test harness doesn't support multi packet reads"
        );
        buf[..read_data.len()].copy_from_slice(read_data);
        inner.next_read_data += 1;
        Ok(read_data.len())
    }
    fn set_stalled(&self, _ep_addr: EndpointAddress, _stalled: bool) {}
    fn is_stalled(&self, _ep_addr: EndpointAddress) -> bool {
        todo!()
    }
    fn suspend(&self) {
        todo!()
    }
    fn resume(&self) {
        todo!()
    }
    fn poll(&self) -> PollResult {
        let inner_ref = self.inner.lock().unwrap();
        let inner = inner_ref.borrow_mut();
        if inner.write_data.is_empty() {
            assert!(
                inner.next_read_data < self.read_data.len(),
                "No data written but all data has been read"
            );

            PollResult::Data {
                ep_out: 0x0,
                ep_in_complete: 0x0,
                ep_setup: 0x1, //setup packet received for ep 0
            }
        } else {
            PollResult::Data {
                ep_out: 0x0,
                ep_in_complete: 0x1, //request the next packet
                ep_setup: 0x0,
            }
        }
    }
}

/// Runs one control IN transfer through a device built with [`device_builder`] and the keyboard
/// class, asserting the host receives `expected`
fn assert_control_in(setup: SetupPacket, expected: &[u8]) {
    init_logging();

    let validated = AtomicBool::new(false);
    let validate_write_data = |v: &Vec<u8>| {
        assert_eq!(v.as_slice(), expected);
        validated.store(true, Ordering::SeqCst);
    };

    let packed = setup.pack().unwrap();
    let read_data: &[&[u8]] = &[&packed];

    let usb_bus = TestUsbBus::new(read_data, validate_write_data);
    let usb_alloc = UsbBusAllocator::new(usb_bus);

    let mut keyboard = BootKeyboardClass::new(&usb_alloc).unwrap();
    let mut usb_dev = device_builder(&usb_alloc).build();

    //poll the usb bus
    for _ in 0..16 {
        assert!(usb_dev.poll(&mut [&mut keyboard]));
    }
    assert!(validated.load(Ordering::SeqCst), "no data stage completed");
}

#[test]
fn enumerated_configuration_matches_static_table() {
    assert_control_in(
        SetupPacket::get_descriptor(Recipient::Device, DescriptorType::Configuration, 0, 0, 0xFFFF),
        &CONFIGURATION_DESCRIPTOR_BYTES,
    );
}

#[test]
fn configuration_header_read_is_truncated() {
    assert_control_in(
        SetupPacket::get_descriptor(Recipient::Device, DescriptorType::Configuration, 0, 0, 9),
        &CONFIGURATION_DESCRIPTOR_BYTES[..9],
    );
}

#[test]
fn report_descriptor_is_served_to_interface() {
    assert_control_in(
        SetupPacket::get_descriptor(Recipient::Interface, DescriptorType::Report, 0, 0, 0xFF),
        KEYBOARD_REPORT_DESCRIPTOR,
    );
}

#[test]
fn hid_descriptor_is_served_to_interface() {
    assert_control_in(
        SetupPacket::get_descriptor(Recipient::Interface, DescriptorType::Hid, 0, 0, 0xFF),
        &KEYBOARD_HID_DESCRIPTOR_BYTES,
    );
}

#[test]
fn strings_match_static_tables() {
    assert_control_in(
        SetupPacket::get_descriptor(Recipient::Device, DescriptorType::String, 0, 0, 0xFF),
        &LANGUAGE_DESCRIPTOR,
    );
    assert_control_in(
        SetupPacket::get_descriptor(
            Recipient::Device,
            DescriptorType::String,
            crate::descriptor::PRODUCT_INDEX,
            config::LANGUAGE_ID_EN_US,
            0xFF,
        ),
        &PRODUCT_DESCRIPTOR,
    );
}

#[test]
fn device_identity_matches_static_table() {
    init_logging();

    // usb-device writes its own bcdUSB, everything after it must match
    let validated = AtomicBool::new(false);
    let validate_write_data = |v: &Vec<u8>| {
        assert_eq!(v.len(), DEVICE_DESCRIPTOR_BYTES.len());
        assert_eq!(&v[..2], &DEVICE_DESCRIPTOR_BYTES[..2]);
        assert_eq!(&v[4..], &DEVICE_DESCRIPTOR_BYTES[4..]);
        validated.store(true, Ordering::SeqCst);
    };

    let packed = SetupPacket::get_descriptor(Recipient::Device, DescriptorType::Device, 0, 0, 18)
        .pack()
        .unwrap();
    let read_data: &[&[u8]] = &[&packed];

    let usb_bus = TestUsbBus::new(read_data, validate_write_data);
    let usb_alloc = UsbBusAllocator::new(usb_bus);

    let mut keyboard = BootKeyboardClass::new(&usb_alloc).unwrap();
    let mut usb_dev = device_builder(&usb_alloc).build();

    for _ in 0..16 {
        assert!(usb_dev.poll(&mut [&mut keyboard]));
    }
    assert!(validated.load(Ordering::SeqCst));
}

#[test]
fn class_claims_keyboard_endpoint_address() {
    init_logging();

    let usb_bus = TestUsbBus::new(&[], |_: &Vec<u8>| {});
    let usb_alloc = UsbBusAllocator::new(usb_bus);

    let keyboard = BootKeyboardClass::new(&usb_alloc).unwrap();
    assert_eq!(u8::from(keyboard.in_endpoint.address()), KEYBOARD_EPADDR);
    assert_eq!(u8::from(keyboard.interface), KEYBOARD_INTERFACE.bInterfaceNumber);

    // the fixed address is already taken
    assert!(matches!(
        BootKeyboardClass::new(&usb_alloc),
        Err(UsbError::InvalidEndpoint)
    ));
}

#[test]
fn write_report_sends_one_packet() {
    init_logging();

    let usb_bus = TestUsbBus::new(&[], |_: &Vec<u8>| {});
    let usb_alloc = UsbBusAllocator::new(usb_bus);

    let keyboard = BootKeyboardClass::new(&usb_alloc).unwrap();
    let _usb_dev = device_builder(&usb_alloc).build();

    let report = BootKeyboardReport::new([0x04]);
    assert!(matches!(keyboard.write_report(&report), Ok(8)));
}
