//! Usage-stream mapping for firmware 4.8 and 5.x reports.
//!
//! Unlike the fixed-format families, the Xbox Wireless Controller is
//! decoded through its report descriptor: the engine walks each input
//! report and feeds the resulting usage events here one at a time. The
//! mapping matches the Android HID tables the 2019 firmware update moved
//! to.

use padhost_controller_types::Controller;
use padhost_controller_types::gamepad::{TRIGGER_BUTTON_THRESHOLD, button, misc_button};
use padhost_hid_common::descriptor::UsageEvent;
use padhost_hid_common::normalize::{
    hat_to_dpad, process_axis, process_dpad, process_hat, process_pedal,
};
use padhost_hid_common::usage;
use tracing::{debug, info};

/// Firmware generation, decided by report shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Firmware {
    /// The 2019 update; most Bluetooth pads in the wild.
    #[default]
    V4_8,
    /// The BLE firmware; adds the Share button.
    V5,
}

/// Per-connection Xbox state.
#[derive(Debug, Default)]
pub struct XboxDevice {
    version: Firmware,
}

impl XboxDevice {
    /// Fresh state, assuming the 4.8 firmware until a report proves
    /// otherwise.
    pub fn new() -> Self {
        XboxDevice::default()
    }

    /// Detected firmware generation.
    pub fn firmware(&self) -> Firmware {
        self.version
    }

    /// Apply one usage event to the snapshot.
    ///
    /// Unknown usages are logged and skipped; clone pads report all kinds
    /// of vendor noise.
    pub fn handle_usage(&mut self, event: &UsageEvent, ctl: &mut Controller) {
        let value = event.value;
        let pressed = value != 0;

        if event.page == usage::PAGE_GENERIC_DEVICE_CONTROLS {
            if event.usage == usage::USAGE_BATTERY_STRENGTH {
                ctl.battery = value.clamp(0, 255) as u8;
            } else {
                debug!(page = event.page, usage = event.usage, "xbox: unsupported usage");
            }
            return;
        }

        // The Share button only exists on the 5.x firmware; seeing it
        // (even released) upgrades the assumed version.
        if event.page == usage::PAGE_CONSUMER
            && event.usage == usage::USAGE_RECORD
            && self.version != Firmware::V5
        {
            info!("xbox: firmware 5.x detected");
            self.version = Firmware::V5;
        }

        let Some(gp) = ctl.gamepad_mut() else {
            return;
        };

        match (event.page, event.usage) {
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_X) => {
                gp.axis_x = process_axis(&event.globals, value);
            }
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_Y) => {
                gp.axis_y = process_axis(&event.globals, value);
            }
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_Z) => {
                gp.axis_rx = process_axis(&event.globals, value);
            }
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_RZ) => {
                gp.axis_ry = process_axis(&event.globals, value);
            }
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_HAT) => {
                gp.dpad = hat_to_dpad(process_hat(&event.globals, value));
            }
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_SYSTEM_MAIN_MENU) => {
                gp.set_misc(misc_button::SYSTEM, pressed);
            }
            (
                usage::PAGE_GENERIC_DESKTOP,
                usage::USAGE_DPAD_UP
                | usage::USAGE_DPAD_DOWN
                | usage::USAGE_DPAD_RIGHT
                | usage::USAGE_DPAD_LEFT,
            ) => {
                process_dpad(event.usage, value, &mut gp.dpad);
            }
            (usage::PAGE_SIMULATION_CONTROLS, usage::USAGE_ACCELERATOR) => {
                gp.throttle = process_pedal(&event.globals, value);
                gp.set_button(button::TRIGGER_R, gp.throttle >= TRIGGER_BUTTON_THRESHOLD);
            }
            (usage::PAGE_SIMULATION_CONTROLS, usage::USAGE_BRAKE) => {
                gp.brake = process_pedal(&event.globals, value);
                gp.set_button(button::TRIGGER_L, gp.brake >= TRIGGER_BUTTON_THRESHOLD);
            }
            (usage::PAGE_BUTTON, n) => match n {
                0x01 => gp.set_button(button::A, pressed),
                0x02 => gp.set_button(button::B, pressed),
                0x04 => gp.set_button(button::X, pressed),
                0x05 => gp.set_button(button::Y, pressed),
                0x07 => gp.set_button(button::SHOULDER_L, pressed),
                0x08 => gp.set_button(button::SHOULDER_R, pressed),
                // Unused in 4.8, View button in 5.x.
                0x0b => gp.set_misc(misc_button::SELECT, pressed),
                0x0c => gp.set_misc(misc_button::START, pressed),
                0x0d => gp.set_misc(misc_button::SYSTEM, pressed),
                0x0e => gp.set_button(button::THUMB_L, pressed),
                0x0f => gp.set_button(button::THUMB_R, pressed),
                // Declared but unused slots.
                0x03 | 0x06 | 0x09 | 0x0a => {}
                other => {
                    debug!(usage = other, "xbox: unsupported button");
                }
            },
            (usage::PAGE_CONSUMER, usage::USAGE_RECORD) => {
                gp.set_misc(misc_button::CAPTURE, pressed);
            }
            (usage::PAGE_CONSUMER, usage::USAGE_AC_BACK) => {
                // View button on 4.8 (5.x moved it to the button page).
                gp.set_misc(misc_button::SELECT, pressed);
            }
            (page, u) => {
                debug!(page, usage = u, "xbox: unsupported usage");
            }
        }
    }
}
