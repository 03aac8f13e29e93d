//! Nintendo Switch controller protocol.
//!
//! Supports the Pro Controller, both Joy-Cons (sideways, as standalone
//! pads) and the Switch Online SNES controller. Protocol details follow the
//! dekuNukem reverse-engineering notes and the Linux `hid-nintendo` driver.
//!
//! The crate is pure: [`SwitchDevice`] consumes input report bytes and
//! produces [`WireFrame`]s for the engine to queue. Timers (the setup
//! timeout, rumble delay and duration) live in the engine; this crate only
//! exposes the deadlines and the frames to send when they fire.
//!
//! [`WireFrame`]: padhost_hid_common::WireFrame

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod fsm;
pub mod ids;
pub mod input;
pub mod output;

pub use fsm::{HandshakeState, Reaction, SwitchDevice};
pub use ids::{ControllerType, SETUP_TIMEOUT_MS};
pub use input::{Calibration, StickCal};

/// Known device names, for clones that do not answer SDP queries.
///
/// Matching by name assigns the listed vendor/product ids.
pub const DEVICE_NAMES: &[(&str, u16, u16)] = &[
    ("Pro Controller", ids::NINTENDO_VID, ids::PRO_CONTROLLER_PID),
    ("Joy-Con (L)", ids::NINTENDO_VID, ids::JOYCON_L_PID),
    ("Joy-Con (R)", ids::NINTENDO_VID, ids::JOYCON_R_PID),
    (
        "SNES Controller",
        ids::NINTENDO_VID,
        ids::ONLINE_SNES_CONTROLLER_PID,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_names_carry_nintendo_vid() {
        for (_, vid, _) in DEVICE_NAMES {
            assert_eq!(*vid, ids::NINTENDO_VID);
        }
    }
}
