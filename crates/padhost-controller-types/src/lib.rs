//! Canonical controller snapshot types.
//!
//! Every family codec decodes into the same value model: a
//! [`Controller`] tagged with the kind of device it is. Gamepad axes are
//! normalized to `-512..=511`, pedals to `0..=1023`, and the battery level
//! uses fixed anchors (0 = unavailable, 1 = empty, 255 = full).

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod gamepad;
pub mod mappings;

pub use gamepad::Gamepad;
pub use mappings::{GamepadMappings, MappingsType};

pub use padhost_hid_common::normalize::{
    AXIS_NORMALIZE_RANGE, DPAD_DOWN, DPAD_LEFT, DPAD_RIGHT, DPAD_UP,
};

/// Battery level meaning "not reported by this device".
pub const BATTERY_UNAVAILABLE: u8 = 0;
/// Lowest reportable battery level.
pub const BATTERY_EMPTY: u8 = 1;
/// Highest reportable battery level.
pub const BATTERY_FULL: u8 = 255;

/// Player seat assignment, a bitmask so multi-seat layouts stay expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct GamepadSeat(pub u8);

impl GamepadSeat {
    /// No seat assigned.
    pub const NONE: GamepadSeat = GamepadSeat(0);
    /// Player 1.
    pub const A: GamepadSeat = GamepadSeat(1 << 0);
    /// Player 2.
    pub const B: GamepadSeat = GamepadSeat(1 << 1);
    /// Player 3.
    pub const C: GamepadSeat = GamepadSeat(1 << 2);
    /// Player 4.
    pub const D: GamepadSeat = GamepadSeat(1 << 3);

    /// Seat for the `n`-th player (0-based); wraps past four seats.
    pub fn for_player(n: u8) -> Self {
        GamepadSeat(1 << (n % 4))
    }

    /// Player number (1-based) for LED encoding: number of the lowest set bit.
    pub fn player_number(self) -> u8 {
        if self.0 == 0 {
            0
        } else {
            self.0.trailing_zeros() as u8 + 1
        }
    }
}

/// Per-kind controller payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ControllerState {
    /// A gamepad-class device.
    Gamepad(Gamepad),
    /// A mouse, real or virtual (Sony touchpads).
    Mouse(Mouse),
    /// A keyboard.
    Keyboard(Keyboard),
    /// A Wii Balance Board.
    BalanceBoard(BalanceBoard),
}

/// Full canonical snapshot delivered to the platform after each report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Controller {
    /// Battery level; see [`BATTERY_UNAVAILABLE`] / [`BATTERY_EMPTY`] / [`BATTERY_FULL`].
    pub battery: u8,
    /// The device-kind payload.
    pub state: ControllerState,
}

impl Controller {
    /// Fresh zeroed gamepad snapshot.
    pub fn gamepad() -> Self {
        Controller {
            battery: BATTERY_UNAVAILABLE,
            state: ControllerState::Gamepad(Gamepad::default()),
        }
    }

    /// Fresh zeroed mouse snapshot.
    pub fn mouse() -> Self {
        Controller {
            battery: BATTERY_UNAVAILABLE,
            state: ControllerState::Mouse(Mouse::default()),
        }
    }

    /// Fresh zeroed keyboard snapshot.
    pub fn keyboard() -> Self {
        Controller {
            battery: BATTERY_UNAVAILABLE,
            state: ControllerState::Keyboard(Keyboard::default()),
        }
    }

    /// Fresh zeroed balance-board snapshot.
    pub fn balance_board() -> Self {
        Controller {
            battery: BATTERY_UNAVAILABLE,
            state: ControllerState::BalanceBoard(BalanceBoard::default()),
        }
    }

    /// Mutable access to the gamepad payload, if this is a gamepad.
    pub fn gamepad_mut(&mut self) -> Option<&mut Gamepad> {
        match &mut self.state {
            ControllerState::Gamepad(gp) => Some(gp),
            _ => None,
        }
    }

    /// Mutable access to the mouse payload, if this is a mouse.
    pub fn mouse_mut(&mut self) -> Option<&mut Mouse> {
        match &mut self.state {
            ControllerState::Mouse(m) => Some(m),
            _ => None,
        }
    }
}

/// Mouse buttons bitmask values.
pub mod mouse_button {
    /// Left click.
    pub const LEFT: u16 = 1 << 0;
    /// Right click.
    pub const RIGHT: u16 = 1 << 1;
    /// Middle click.
    pub const MIDDLE: u16 = 1 << 2;
    /// First aux button (usually "back").
    pub const AUX_0: u16 = 1 << 3;
    /// Second aux button (usually "forward").
    pub const AUX_1: u16 = 1 << 4;
}

/// Relative mouse snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Mouse {
    /// Horizontal motion since the previous report.
    pub delta_x: i32,
    /// Vertical motion since the previous report.
    pub delta_y: i32,
    /// Pressed buttons, see [`mouse_button`].
    pub buttons: u16,
    /// Wheel detents since the previous report.
    pub scroll_wheel: i8,
}

/// Most simultaneously pressed keys a snapshot can carry.
pub const PRESSED_KEYS_MAX: usize = 10;

/// Keyboard snapshot: pressed key usages plus the modifier bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Keyboard {
    /// HID key usages currently held, zero-terminated.
    pub pressed_keys: [u8; PRESSED_KEYS_MAX],
    /// Modifier bits, bit 0 = left control through bit 7 = right GUI.
    pub modifiers: u8,
}

impl Keyboard {
    /// Record one pressed key; silently drops past [`PRESSED_KEYS_MAX`].
    pub fn press(&mut self, usage: u8) -> bool {
        for slot in self.pressed_keys.iter_mut() {
            if *slot == 0 {
                *slot = usage;
                return true;
            }
        }
        false
    }
}

/// Balance-board snapshot: calibrated weight per sensor, in grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct BalanceBoard {
    /// Top-right sensor.
    pub tr: i32,
    /// Bottom-right sensor.
    pub br: i32,
    /// Top-left sensor.
    pub tl: i32,
    /// Bottom-left sensor.
    pub bl: i32,
    /// Raw temperature byte, for drift compensation upstream.
    pub temperature: i32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn seat_player_numbers() {
        assert_eq!(GamepadSeat::NONE.player_number(), 0);
        assert_eq!(GamepadSeat::A.player_number(), 1);
        assert_eq!(GamepadSeat::D.player_number(), 4);
        assert_eq!(GamepadSeat::for_player(5), GamepadSeat::B);
    }

    #[test]
    fn keyboard_press_caps_at_max() {
        let mut kb = Keyboard::default();
        for i in 0..PRESSED_KEYS_MAX {
            assert!(kb.press(4 + i as u8));
        }
        assert!(!kb.press(0x52));
        assert_eq!(kb.pressed_keys[0], 4);
    }

    #[test]
    fn snapshot_serializes() {
        let ctl = Controller::gamepad();
        let json = serde_json::to_string(&ctl).unwrap();
        let back: Controller = serde_json::from_str(&json).unwrap();
        assert_eq!(ctl, back);
    }
}
