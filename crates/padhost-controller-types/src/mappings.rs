//! Configurable gamepad remapping, applied just before delivery.
//!
//! The canonical layout is the Xbox layout (A south, B east, X west,
//! Y north). The Switch layout swaps the face buttons; a custom table can
//! rewire every button, dpad direction and axis.

use serde::{Deserialize, Serialize};

use crate::gamepad::{Gamepad, button, misc_button};
use crate::{DPAD_DOWN, DPAD_LEFT, DPAD_RIGHT, DPAD_UP};

/// Which remapping to apply before snapshots reach the platform.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingsType {
    /// Canonical layout, identity remap.
    #[default]
    Xbox,
    /// Swap A/B and X/Y.
    Switch,
    /// Full user-provided table.
    Custom(GamepadMappings),
}

/// Source an output axis reads from in a custom table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisSource {
    /// Left stick horizontal.
    X,
    /// Left stick vertical.
    Y,
    /// Right stick horizontal.
    Rx,
    /// Right stick vertical.
    Ry,
    /// Brake pedal.
    Brake,
    /// Throttle pedal.
    Throttle,
}

/// One remapped axis: a source plus optional inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisMapping {
    /// Where the value comes from.
    pub source: AxisSource,
    /// Negate after reading.
    pub inverted: bool,
}

impl AxisMapping {
    fn read(&self, gp: &Gamepad) -> i32 {
        let v = match self.source {
            AxisSource::X => gp.axis_x,
            AxisSource::Y => gp.axis_y,
            AxisSource::Rx => gp.axis_rx,
            AxisSource::Ry => gp.axis_ry,
            AxisSource::Brake => gp.brake,
            AxisSource::Throttle => gp.throttle,
        };
        if self.inverted { -v } else { v }
    }
}

fn axis(source: AxisSource) -> AxisMapping {
    AxisMapping {
        source,
        inverted: false,
    }
}

/// Full custom remap table. Button fields hold the *output* bit for each
/// canonical input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamepadMappings {
    /// Output bit for canonical A.
    pub button_a: u16,
    /// Output bit for canonical B.
    pub button_b: u16,
    /// Output bit for canonical X.
    pub button_x: u16,
    /// Output bit for canonical Y.
    pub button_y: u16,
    /// Output bit for the left shoulder.
    pub button_shoulder_l: u16,
    /// Output bit for the right shoulder.
    pub button_shoulder_r: u16,
    /// Output bit for the left trigger.
    pub button_trigger_l: u16,
    /// Output bit for the right trigger.
    pub button_trigger_r: u16,
    /// Output bit for the left thumb click.
    pub button_thumb_l: u16,
    /// Output bit for the right thumb click.
    pub button_thumb_r: u16,

    /// Output bit for dpad up.
    pub dpad_up: u8,
    /// Output bit for dpad down.
    pub dpad_down: u8,
    /// Output bit for dpad right.
    pub dpad_right: u8,
    /// Output bit for dpad left.
    pub dpad_left: u8,

    /// Output bit for the system button.
    pub misc_system: u8,
    /// Output bit for select.
    pub misc_select: u8,
    /// Output bit for start.
    pub misc_start: u8,
    /// Output bit for capture.
    pub misc_capture: u8,

    /// Source for the output left-stick horizontal.
    pub axis_x: AxisMapping,
    /// Source for the output left-stick vertical.
    pub axis_y: AxisMapping,
    /// Source for the output right-stick horizontal.
    pub axis_rx: AxisMapping,
    /// Source for the output right-stick vertical.
    pub axis_ry: AxisMapping,
    /// Source for the output brake.
    pub brake: AxisMapping,
    /// Source for the output throttle.
    pub throttle: AxisMapping,
}

impl Default for GamepadMappings {
    fn default() -> Self {
        GamepadMappings {
            button_a: button::A,
            button_b: button::B,
            button_x: button::X,
            button_y: button::Y,
            button_shoulder_l: button::SHOULDER_L,
            button_shoulder_r: button::SHOULDER_R,
            button_trigger_l: button::TRIGGER_L,
            button_trigger_r: button::TRIGGER_R,
            button_thumb_l: button::THUMB_L,
            button_thumb_r: button::THUMB_R,
            dpad_up: DPAD_UP,
            dpad_down: DPAD_DOWN,
            dpad_right: DPAD_RIGHT,
            dpad_left: DPAD_LEFT,
            misc_system: misc_button::SYSTEM,
            misc_select: misc_button::SELECT,
            misc_start: misc_button::START,
            misc_capture: misc_button::CAPTURE,
            axis_x: axis(AxisSource::X),
            axis_y: axis(AxisSource::Y),
            axis_rx: axis(AxisSource::Rx),
            axis_ry: axis(AxisSource::Ry),
            brake: axis(AxisSource::Brake),
            throttle: axis(AxisSource::Throttle),
        }
    }
}

/// Apply `mappings` to a decoded gamepad snapshot.
pub fn remap(mappings: &MappingsType, gp: &Gamepad) -> Gamepad {
    match mappings {
        MappingsType::Xbox => *gp,
        MappingsType::Switch => {
            let mut out = *gp;
            out.buttons &= !(button::A | button::B | button::X | button::Y);
            if gp.buttons & button::A != 0 {
                out.buttons |= button::B;
            }
            if gp.buttons & button::B != 0 {
                out.buttons |= button::A;
            }
            if gp.buttons & button::X != 0 {
                out.buttons |= button::Y;
            }
            if gp.buttons & button::Y != 0 {
                out.buttons |= button::X;
            }
            out
        }
        MappingsType::Custom(map) => {
            let mut out = Gamepad::default();

            let button_pairs = [
                (button::A, map.button_a),
                (button::B, map.button_b),
                (button::X, map.button_x),
                (button::Y, map.button_y),
                (button::SHOULDER_L, map.button_shoulder_l),
                (button::SHOULDER_R, map.button_shoulder_r),
                (button::TRIGGER_L, map.button_trigger_l),
                (button::TRIGGER_R, map.button_trigger_r),
                (button::THUMB_L, map.button_thumb_l),
                (button::THUMB_R, map.button_thumb_r),
            ];
            for (input, output) in button_pairs {
                if gp.buttons & input != 0 {
                    out.buttons |= output;
                }
            }

            let dpad_pairs = [
                (DPAD_UP, map.dpad_up),
                (DPAD_DOWN, map.dpad_down),
                (DPAD_RIGHT, map.dpad_right),
                (DPAD_LEFT, map.dpad_left),
            ];
            for (input, output) in dpad_pairs {
                if gp.dpad & input != 0 {
                    out.dpad |= output;
                }
            }

            let misc_pairs = [
                (misc_button::SYSTEM, map.misc_system),
                (misc_button::SELECT, map.misc_select),
                (misc_button::START, map.misc_start),
                (misc_button::CAPTURE, map.misc_capture),
            ];
            for (input, output) in misc_pairs {
                if gp.misc_buttons & input != 0 {
                    out.misc_buttons |= output;
                }
            }

            out.axis_x = map.axis_x.read(gp);
            out.axis_y = map.axis_y.read(gp);
            out.axis_rx = map.axis_rx.read(gp);
            out.axis_ry = map.axis_ry.read(gp);
            out.brake = map.brake.read(gp);
            out.throttle = map.throttle.read(gp);

            out.gyro = gp.gyro;
            out.accel = gp.accel;
            out
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn xbox_is_identity() {
        let mut gp = Gamepad::default();
        gp.buttons = button::A | button::THUMB_R;
        gp.axis_x = -300;
        assert_eq!(remap(&MappingsType::Xbox, &gp), gp);
    }

    #[test]
    fn switch_swaps_face_buttons() {
        let mut gp = Gamepad::default();
        gp.buttons = button::A | button::X | button::SHOULDER_L;
        let out = remap(&MappingsType::Switch, &gp);
        assert!(out.is_pressed(button::B));
        assert!(out.is_pressed(button::Y));
        assert!(out.is_pressed(button::SHOULDER_L));
        assert!(!out.is_pressed(button::A));
        assert!(!out.is_pressed(button::X));
    }

    #[test]
    fn custom_rewires_axes_and_buttons() {
        let mut map = GamepadMappings::default();
        map.button_a = button::Y;
        map.axis_x = AxisMapping {
            source: AxisSource::Ry,
            inverted: true,
        };

        let mut gp = Gamepad::default();
        gp.buttons = button::A;
        gp.axis_ry = 200;
        let out = remap(&MappingsType::Custom(map), &gp);
        assert!(out.is_pressed(button::Y));
        assert!(!out.is_pressed(button::A));
        assert_eq!(out.axis_x, -200);
    }

    #[test]
    fn custom_default_is_identity() {
        let mut gp = Gamepad::default();
        gp.buttons = button::B;
        gp.dpad = DPAD_LEFT;
        gp.misc_buttons = misc_button::START;
        gp.brake = 77;
        let out = remap(&MappingsType::Custom(GamepadMappings::default()), &gp);
        assert_eq!(out, gp);
    }

    proptest::proptest! {
        // The Switch layout swaps A/B and X/Y; applying it twice must give
        // back the input, and no remap may invent or drop pressed buttons.
        #[test]
        fn switch_remap_is_an_involution(buttons in proptest::num::u16::ANY) {
            let mut gp = Gamepad::default();
            gp.buttons = buttons;
            let once = remap(&MappingsType::Switch, &gp);
            let twice = remap(&MappingsType::Switch, &once);
            proptest::prop_assert_eq!(twice, gp);
            proptest::prop_assert_eq!(
                once.buttons.count_ones(),
                gp.buttons.count_ones()
            );
        }
    }
}
