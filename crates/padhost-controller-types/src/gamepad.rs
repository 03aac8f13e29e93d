//! The canonical gamepad snapshot and its button/dpad bit layout.

/// Face and shoulder buttons, one bit each.
pub mod button {
    /// South button (Xbox A).
    pub const A: u16 = 1 << 0;
    /// East button (Xbox B).
    pub const B: u16 = 1 << 1;
    /// West button (Xbox X).
    pub const X: u16 = 1 << 2;
    /// North button (Xbox Y).
    pub const Y: u16 = 1 << 3;
    /// Left shoulder (L1).
    pub const SHOULDER_L: u16 = 1 << 4;
    /// Right shoulder (R1).
    pub const SHOULDER_R: u16 = 1 << 5;
    /// Left trigger as a digital press (L2).
    pub const TRIGGER_L: u16 = 1 << 6;
    /// Right trigger as a digital press (R2).
    pub const TRIGGER_R: u16 = 1 << 7;
    /// Left stick click (L3).
    pub const THUMB_L: u16 = 1 << 8;
    /// Right stick click (R3).
    pub const THUMB_R: u16 = 1 << 9;
}

/// System-level buttons, kept apart from the gameplay bitmask.
pub mod misc_button {
    /// Vendor/system button (PS, Xbox, Home).
    pub const SYSTEM: u8 = 1 << 0;
    /// Select / Share / Create / `-`.
    pub const SELECT: u8 = 1 << 1;
    /// Start / Options / `+`.
    pub const START: u8 = 1 << 2;
    /// Capture / Mute.
    pub const CAPTURE: u8 = 1 << 3;
}

/// A trigger at or past this value also sets the digital trigger button.
pub const TRIGGER_BUTTON_THRESHOLD: i32 = 512;

/// Canonical gamepad state. Axes are `-512..=511`, pedals `0..=1023`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Gamepad {
    /// Dpad bits, see [`crate::DPAD_UP`] and friends.
    pub dpad: u8,
    /// Left stick horizontal.
    pub axis_x: i32,
    /// Left stick vertical.
    pub axis_y: i32,
    /// Right stick horizontal.
    pub axis_rx: i32,
    /// Right stick vertical.
    pub axis_ry: i32,
    /// Left trigger / brake pedal.
    pub brake: i32,
    /// Right trigger / throttle pedal.
    pub throttle: i32,
    /// Gameplay buttons, see [`button`].
    pub buttons: u16,
    /// System buttons, see [`misc_button`].
    pub misc_buttons: u8,
    /// Calibrated gyroscope, degrees/s scaled by the family codec.
    pub gyro: [i32; 3],
    /// Calibrated accelerometer, g scaled by the family codec.
    pub accel: [i32; 3],
}

impl Gamepad {
    /// Set `bits` in the gameplay button mask when `pressed`.
    pub fn set_button(&mut self, bits: u16, pressed: bool) {
        if pressed {
            self.buttons |= bits;
        }
    }

    /// Set `bits` in the misc button mask when `pressed`.
    pub fn set_misc(&mut self, bits: u8, pressed: bool) {
        if pressed {
            self.misc_buttons |= bits;
        }
    }

    /// True when the gameplay button `bits` are all held.
    pub fn is_pressed(&self, bits: u16) -> bool {
        self.buttons & bits == bits
    }
}
