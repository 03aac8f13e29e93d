//! Descriptor-driven codecs for devices without a dedicated protocol
//! crate: generic gamepads, mice and keyboards.
//!
//! All three are usage-stream codecs: the engine walks each input report
//! against the parsed descriptor and feeds the usage events here.

use padhost_controller_types::gamepad::{TRIGGER_BUTTON_THRESHOLD, button, misc_button};
use padhost_controller_types::{Controller, mouse_button};
use padhost_hid_common::descriptor::UsageEvent;
use padhost_hid_common::normalize::{
    hat_to_dpad, process_axis, process_dpad, process_hat, process_pedal,
};
use padhost_hid_common::usage;
use tracing::debug;

/// Codec for gamepads bound by class-of-device or fallback.
///
/// The button layout assumes the common "A at button 1" ordering; devices
/// that deviate are what the remap tables are for.
#[derive(Debug, Default)]
pub struct GenericDevice;

impl GenericDevice {
    /// Apply one usage event to the snapshot.
    pub fn handle_usage(&mut self, event: &UsageEvent, ctl: &mut Controller) {
        let value = event.value;
        let pressed = value != 0;

        if event.page == usage::PAGE_GENERIC_DEVICE_CONTROLS {
            if event.usage == usage::USAGE_BATTERY_STRENGTH {
                ctl.battery = value.clamp(0, 255) as u8;
            }
            return;
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
            // Many pads report their analog triggers on RX/RY.
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_RX) => {
                gp.brake = process_pedal(&event.globals, value);
                gp.set_button(button::TRIGGER_L, gp.brake >= TRIGGER_BUTTON_THRESHOLD);
            }
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_RY) => {
                gp.throttle = process_pedal(&event.globals, value);
                gp.set_button(button::TRIGGER_R, gp.throttle >= TRIGGER_BUTTON_THRESHOLD);
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
                0x03 => gp.set_button(button::X, pressed),
                0x04 => gp.set_button(button::Y, pressed),
                0x05 => gp.set_button(button::SHOULDER_L, pressed),
                0x06 => gp.set_button(button::SHOULDER_R, pressed),
                0x07 => gp.set_button(button::TRIGGER_L, pressed),
                0x08 => gp.set_button(button::TRIGGER_R, pressed),
                0x09 => gp.set_misc(misc_button::SELECT, pressed),
                0x0a => gp.set_misc(misc_button::START, pressed),
                0x0b => gp.set_button(button::THUMB_L, pressed),
                0x0c => gp.set_button(button::THUMB_R, pressed),
                0x0d => gp.set_misc(misc_button::SYSTEM, pressed),
                other => {
                    debug!(usage = other, "generic: unsupported button");
                }
            },
            (usage::PAGE_CONSUMER, usage::USAGE_AC_HOME) => {
                gp.set_misc(misc_button::SYSTEM, pressed);
            }
            (usage::PAGE_CONSUMER, usage::USAGE_AC_BACK) => {
                gp.set_misc(misc_button::SELECT, pressed);
            }
            (page, u) => {
                debug!(page, usage = u, "generic: unsupported usage");
            }
        }
    }
}

/// Codec for pointing devices. Deltas are per-report, so the snapshot must
/// be re-initialized before each walk.
#[derive(Debug, Default)]
pub struct MouseDevice;

impl MouseDevice {
    /// Apply one usage event to the snapshot.
    pub fn handle_usage(&mut self, event: &UsageEvent, ctl: &mut Controller) {
        let value = event.value;
        let pressed = value != 0;

        let Some(m) = ctl.mouse_mut() else {
            return;
        };

        match (event.page, event.usage) {
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_X) => m.delta_x = value,
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_Y) => m.delta_y = value,
            (usage::PAGE_GENERIC_DESKTOP, usage::USAGE_WHEEL) => {
                m.scroll_wheel = value.clamp(i8::MIN as i32, i8::MAX as i32) as i8;
            }
            (usage::PAGE_BUTTON, n) => match n {
                0x01 => set_mouse_button(&mut m.buttons, mouse_button::LEFT, pressed),
                0x02 => set_mouse_button(&mut m.buttons, mouse_button::RIGHT, pressed),
                0x03 => set_mouse_button(&mut m.buttons, mouse_button::MIDDLE, pressed),
                0x04 => set_mouse_button(&mut m.buttons, mouse_button::AUX_0, pressed),
                0x05 => set_mouse_button(&mut m.buttons, mouse_button::AUX_1, pressed),
                other => {
                    debug!(usage = other, "mouse: unsupported button");
                }
            },
            (page, u) => {
                debug!(page, usage = u, "mouse: unsupported usage");
            }
        }
    }
}

fn set_mouse_button(buttons: &mut u16, bit: u16, pressed: bool) {
    if pressed {
        *buttons |= bit;
    }
}

/// Codec for boot-style keyboards: an array of pressed usages plus a
/// modifier bitmask.
#[derive(Debug, Default)]
pub struct KeyboardDevice;

impl KeyboardDevice {
    /// Apply one usage event to the snapshot.
    pub fn handle_usage(&mut self, event: &UsageEvent, ctl: &mut Controller) {
        if event.page != usage::PAGE_KEYBOARD_KEYPAD {
            debug!(page = event.page, usage = event.usage, "keyboard: unsupported usage");
            return;
        }
        let padhost_controller_types::ControllerState::Keyboard(kb) = &mut ctl.state else {
            return;
        };
        let usage = event.usage;
        if (usage::USAGE_KB_LEFT_CONTROL..=usage::USAGE_KB_RIGHT_GUI).contains(&usage) {
            if event.value != 0 {
                kb.modifiers |= 1 << (usage - usage::USAGE_KB_LEFT_CONTROL);
            }
            return;
        }
        // Array fields report the usage of each held key; value 0 is the
        // no-key filler.
        if usage != 0 && event.value != 0 && usage <= u8::MAX as u16 && !kb.press(usage as u8) {
            debug!(usage, "keyboard: rollover full, key dropped");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use padhost_hid_common::normalize::{DPAD_UP, HidGlobals};

    const AXIS_8: HidGlobals = HidGlobals {
        logical_minimum: 0,
        logical_maximum: 255,
        report_size: 8,
    };
    const REL_8: HidGlobals = HidGlobals {
        logical_minimum: -127,
        logical_maximum: 127,
        report_size: 8,
    };
    const BIT: HidGlobals = HidGlobals {
        logical_minimum: 0,
        logical_maximum: 1,
        report_size: 1,
    };
    const KEY_ARRAY: HidGlobals = HidGlobals {
        logical_minimum: 0,
        logical_maximum: 0xff,
        report_size: 8,
    };

    fn ev(page: u16, usage: u16, value: i32, globals: HidGlobals) -> UsageEvent {
        UsageEvent {
            page,
            usage,
            value,
            globals,
        }
    }

    #[test]
    fn generic_pad_maps_axes_buttons_and_hat() {
        let mut dev = GenericDevice;
        let mut ctl = Controller::gamepad();
        dev.handle_usage(&ev(usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_X, 255, AXIS_8), &mut ctl);
        dev.handle_usage(
            &ev(
                usage::PAGE_GENERIC_DESKTOP,
                usage::USAGE_HAT,
                0,
                HidGlobals {
                    logical_minimum: 0,
                    logical_maximum: 7,
                    report_size: 4,
                },
            ),
            &mut ctl,
        );
        dev.handle_usage(&ev(usage::PAGE_BUTTON, 0x01, 1, BIT), &mut ctl);
        dev.handle_usage(&ev(usage::PAGE_BUTTON, 0x09, 1, BIT), &mut ctl);

        let gp = ctl.gamepad_mut().unwrap();
        assert_eq!(gp.axis_x, 511);
        assert_eq!(gp.dpad, DPAD_UP);
        assert!(gp.is_pressed(button::A));
        assert_eq!(gp.misc_buttons, misc_button::SELECT);
    }

    #[test]
    fn generic_trigger_axes_set_digital_buttons() {
        let mut dev = GenericDevice;
        let mut ctl = Controller::gamepad();
        dev.handle_usage(&ev(usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_RX, 255, AXIS_8), &mut ctl);
        let gp = ctl.gamepad_mut().unwrap();
        assert_eq!(gp.brake, 1023);
        assert!(gp.is_pressed(button::TRIGGER_L));
    }

    #[test]
    fn mouse_deltas_and_buttons() {
        let mut dev = MouseDevice;
        let mut ctl = Controller::mouse();
        dev.handle_usage(&ev(usage::PAGE_GENERIC_DESKTOP, usage::USAGE_AXIS_X, -12, REL_8), &mut ctl);
        dev.handle_usage(&ev(usage::PAGE_GENERIC_DESKTOP, usage::USAGE_WHEEL, 1, REL_8), &mut ctl);
        dev.handle_usage(&ev(usage::PAGE_BUTTON, 0x02, 1, BIT), &mut ctl);
        let m = ctl.mouse_mut().unwrap();
        assert_eq!(m.delta_x, -12);
        assert_eq!(m.scroll_wheel, 1);
        assert_eq!(m.buttons, mouse_button::RIGHT);
    }

    #[test]
    fn keyboard_modifiers_and_rollover() {
        let mut dev = KeyboardDevice;
        let mut ctl = Controller::keyboard();
        // Left shift is modifier bit 1.
        dev.handle_usage(&ev(usage::PAGE_KEYBOARD_KEYPAD, 0xe1, 1, BIT), &mut ctl);
        // 'a' held (array element: usage carries the key).
        dev.handle_usage(&ev(usage::PAGE_KEYBOARD_KEYPAD, 0x04, 0x04, KEY_ARRAY), &mut ctl);
        // Filler element, ignored.
        dev.handle_usage(&ev(usage::PAGE_KEYBOARD_KEYPAD, 0, 0, KEY_ARRAY), &mut ctl);

        match &ctl.state {
            padhost_controller_types::ControllerState::Keyboard(kb) => {
                assert_eq!(kb.modifiers, 0b10);
                assert_eq!(kb.pressed_keys[0], 0x04);
                assert_eq!(kb.pressed_keys[1], 0);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }
}
