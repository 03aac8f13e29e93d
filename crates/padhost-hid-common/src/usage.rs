//! HID usage pages and usages referenced by the usage-stream codecs.
//!
//! Only the subset game controllers actually report. Values follow the USB
//! HID Usage Tables.

#![allow(missing_docs)]

// Usage pages
pub const PAGE_GENERIC_DESKTOP: u16 = 0x01;
pub const PAGE_SIMULATION_CONTROLS: u16 = 0x02;
pub const PAGE_GENERIC_DEVICE_CONTROLS: u16 = 0x06;
pub const PAGE_KEYBOARD_KEYPAD: u16 = 0x07;
pub const PAGE_BUTTON: u16 = 0x09;
pub const PAGE_CONSUMER: u16 = 0x0c;

// Generic Desktop page
pub const USAGE_AXIS_X: u16 = 0x30;
pub const USAGE_AXIS_Y: u16 = 0x31;
pub const USAGE_AXIS_Z: u16 = 0x32;
pub const USAGE_AXIS_RX: u16 = 0x33;
pub const USAGE_AXIS_RY: u16 = 0x34;
pub const USAGE_AXIS_RZ: u16 = 0x35;
pub const USAGE_WHEEL: u16 = 0x38;
pub const USAGE_HAT: u16 = 0x39;
pub const USAGE_SYSTEM_MAIN_MENU: u16 = 0x85;
pub const USAGE_DPAD_UP: u16 = 0x90;
pub const USAGE_DPAD_DOWN: u16 = 0x91;
pub const USAGE_DPAD_RIGHT: u16 = 0x92;
pub const USAGE_DPAD_LEFT: u16 = 0x93;

// Simulation Controls page
pub const USAGE_ACCELERATOR: u16 = 0xc4;
pub const USAGE_BRAKE: u16 = 0xc5;

// Generic Device Controls page
pub const USAGE_BATTERY_STRENGTH: u16 = 0x20;

// Keyboard/Keypad page
pub const USAGE_KB_LEFT_CONTROL: u16 = 0xe0;
pub const USAGE_KB_RIGHT_GUI: u16 = 0xe7;

// Consumer page
pub const USAGE_RECORD: u16 = 0xb2;
pub const USAGE_FAST_FORWARD: u16 = 0xb3;
pub const USAGE_REWIND: u16 = 0xb4;
pub const USAGE_PLAY_PAUSE: u16 = 0xcd;
pub const USAGE_AC_SEARCH: u16 = 0x0221;
pub const USAGE_AC_HOME: u16 = 0x0223;
pub const USAGE_AC_BACK: u16 = 0x0224;
