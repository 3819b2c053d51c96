//! Device identity, fixed at build time

use embedded_time::duration::Milliseconds;

pub const VENDOR_ID: u16 = 0x1209;
pub const PRODUCT_ID: u16 = 0xC55D;
/// 1.00 in BCD
pub const DEVICE_RELEASE: u16 = 0x0100;
/// 1.10 in BCD
pub const USB_VERSION: u16 = 0x0110;

pub const MANUFACTURER: &str = "QuadState";
pub const PRODUCT: &str = "ECmacro02";
pub const SERIAL_NUMBER: &str = "CH552";
/// English (United States)
pub const LANGUAGE_ID_EN_US: u16 = 0x0409;

pub const MAX_POWER_MA: u16 = 100;
pub const REMOTE_WAKEUP: bool = true;
pub const SELF_POWERED: bool = false;

pub const KEYBOARD_POLL_INTERVAL: Milliseconds = Milliseconds(10);
#[cfg(feature = "led-endpoint")]
pub const KEYBOARD_LED_POLL_INTERVAL: Milliseconds = Milliseconds(10);

/// `bInterval` for a full speed interrupt endpoint, which counts whole milliseconds
pub const fn interval_ms(interval: Milliseconds) -> u8 {
    assert!(
        interval.0 >= 1 && interval.0 <= u8::MAX as u32,
        "interrupt interval must be 1..=255 ms"
    );
    interval.0 as u8
}

/// `bMaxPower` counts in units of 2 mA
pub const fn max_power_units(milliamps: u16) -> u8 {
    assert!(milliamps <= 500, "bus powered devices may draw at most 500 mA");
    (milliamps / 2) as u8
}
