//! Touchpad-as-mouse tracking.
//!
//! Both Sony pads report absolute touch coordinates; the virtual mouse
//! wants relative motion. The tracker keeps the previous sample and emits
//! deltas only while the same touch stays active, so a new touch never
//! jumps the cursor.

use padhost_controller_types::{Mouse, mouse_button};

/// Touchpad width in sensor units.
pub const TOUCHPAD_WIDTH: i32 = 1920;
/// The left-click region covers the left three quarters of the pad.
pub const LEFT_CLICK_BOUNDARY: i32 = TOUCHPAD_WIDTH * 3 / 4;

/// One decoded touch point.
#[derive(Debug, Clone, Copy)]
pub struct TouchPoint {
    /// Bit 7 of the contact byte is set when the finger lifted.
    pub active: bool,
    /// Absolute horizontal position.
    pub x: i32,
    /// Absolute vertical position.
    pub y: i32,
}

impl TouchPoint {
    /// Decode the packed 4-byte touch point.
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        let [contact, x_lo, mid, y_hi] = *bytes.first_chunk::<4>()?;
        Some(TouchPoint {
            active: contact & 0x80 == 0,
            x: (i32::from(mid & 0x0f) << 8) + i32::from(x_lo),
            y: (i32::from(y_hi) << 4) + i32::from(mid >> 4),
        })
    }
}

/// Absolute-to-relative converter for the primary touch point.
#[derive(Debug, Default)]
pub struct TouchpadTracker {
    x_prev: i32,
    y_prev: i32,
    prev_touch_active: bool,
}

impl TouchpadTracker {
    /// Feed one touch point plus the pad-click state, producing a mouse
    /// snapshot.
    pub fn update(&mut self, point: TouchPoint, clicked: bool, mouse: &mut Mouse) {
        if self.prev_touch_active {
            mouse.delta_x = point.x - self.x_prev;
            mouse.delta_y = point.y - self.y_prev;
        } else {
            mouse.delta_x = 0;
            mouse.delta_y = 0;
        }

        mouse.buttons = 0;
        if clicked {
            if point.x < LEFT_CLICK_BOUNDARY {
                mouse.buttons |= mouse_button::LEFT;
            } else {
                mouse.buttons |= mouse_button::RIGHT;
            }
        }

        self.prev_touch_active = point.active;
        self.x_prev = point.x;
        self.y_prev = point.y;
    }

    /// No touches this report: stop tracking so the next touch starts fresh.
    pub fn reset(&mut self) {
        self.prev_touch_active = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn active_at(x: i32, y: i32) -> TouchPoint {
        TouchPoint { active: true, x, y }
    }

    #[test]
    fn point_decodes_packed_coordinates()  {
        // x = 0x234, y = 0x567
        let p = TouchPoint::from_wire(&[0x01, 0x34, 0x72, 0x56]).unwrap();
        assert!(p.active);
        assert_eq!(p.x, 0x234);
        assert_eq!(p.y, 0x567);

        let lifted = TouchPoint::from_wire(&[0x81, 0x00, 0x00, 0x00]).unwrap();
        assert!(!lifted.active);
    }

    #[test]
    fn first_touch_emits_no_delta() {
        let mut t = TouchpadTracker::default();
        let mut m = Mouse::default();
        t.update(active_at(100, 200), false, &mut m);
        assert_eq!((m.delta_x, m.delta_y), (0, 0));

        t.update(active_at(110, 195), false, &mut m);
        assert_eq!((m.delta_x, m.delta_y), (10, -5));
    }

    #[test]
    fn lift_and_retouch_does_not_jump() {
        let mut t = TouchpadTracker::default();
        let mut m = Mouse::default();
        t.update(active_at(100, 100), false, &mut m);
        t.update(TouchPoint { active: false, x: 105, y: 100 }, false, &mut m);
        t.reset();
        // New touch far away: no delta.
        t.update(active_at(1800, 900), false, &mut m);
        assert_eq!((m.delta_x, m.delta_y), (0, 0));
    }

    #[test]
    fn click_splits_left_and_right() {
        let mut t = TouchpadTracker::default();
        let mut m = Mouse::default();
        t.update(active_at(100, 100), true, &mut m);
        assert_eq!(m.buttons, mouse_button::LEFT);
        t.update(active_at(1500, 100), true, &mut m);
        assert_eq!(m.buttons, mouse_button::RIGHT);
        t.update(active_at(1500, 100), false, &mut m);
        assert_eq!(m.buttons, 0);
    }
}
