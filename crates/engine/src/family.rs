//! Per-family dispatch.
//!
//! A bound device carries one [`Binding`]: the resolved family, its
//! protocol state and (for usage-stream families) the parsed report
//! descriptor. Every capability is an exhaustive `match`; a family that
//! lacks a capability gets a no-op arm, never an error.

use hid_dualshock_protocol::{Ds4Device, Ds5Device};
use hid_switch_protocol::SwitchDevice;
use hid_wii_protocol::WiiDevice;
use hid_xbox_protocol::{QuadRumble, XboxDevice};
use padhost_controller_types::{Controller, GamepadSeat};
use padhost_errors::ReportError;
use padhost_hid_common::WireFrame;
use padhost_hid_common::descriptor::{DescriptorError, ReportDescriptor};
use tracing::{debug, info, warn};

use crate::binding::Family;

/// Wii handshake steps answer fast; a missing reply means a lost frame.
pub const WII_SETUP_STEP_MS: u64 = 300;

/// Protocol state for one bound device.
#[derive(Debug)]
pub enum FamilyState {
    /// Switch Pro / Joy-Con / SNES handshake and codec.
    Switch(SwitchDevice),
    /// DualShock 4 codec.
    DualShock4(Ds4Device),
    /// DualSense codec and feature chain.
    DualSense(Ds5Device),
    /// Wii probe and DRM codecs.
    Wii(WiiDevice),
    /// Xbox usage-stream mapping.
    Xbox(XboxDevice),
    /// Descriptor-driven gamepad fallback.
    Generic(crate::generic::GenericDevice),
    /// Descriptor-driven mouse.
    Mouse(crate::generic::MouseDevice),
    /// Descriptor-driven keyboard.
    Keyboard(crate::generic::KeyboardDevice),
}

/// What feeding one report (input or feature) produced, unified across
/// families.
#[derive(Debug, Default)]
pub struct Decode {
    /// Frames to send, in order.
    pub frames: Vec<WireFrame>,
    /// The controller snapshot changed.
    pub snapshot: bool,
    /// The virtual mouse snapshot changed (Sony touchpads).
    pub mouse_snapshot: bool,
    /// The handshake just completed.
    pub ready: bool,
}

/// A device's resolved family plus everything needed to drive it.
#[derive(Debug)]
pub struct Binding {
    /// The resolved family.
    pub family: Family,
    /// Per-family protocol state.
    pub state: FamilyState,
    /// Parsed report descriptor, for usage-stream families.
    pub descriptor: Option<ReportDescriptor>,
}

impl Binding {
    /// Fresh binding for a resolved family.
    pub fn new(family: Family, product_id: u16) -> Self {
        let state = match family {
            Family::Switch => FamilyState::Switch(SwitchDevice::new()),
            Family::DualShock4 => FamilyState::DualShock4(Ds4Device::new()),
            Family::DualSense => FamilyState::DualSense(Ds5Device::new(product_id)),
            Family::Wii => FamilyState::Wii(WiiDevice::new(product_id)),
            Family::Xbox => FamilyState::Xbox(XboxDevice::new()),
            Family::Generic => FamilyState::Generic(crate::generic::GenericDevice),
            Family::Mouse => FamilyState::Mouse(crate::generic::MouseDevice),
            Family::Keyboard => FamilyState::Keyboard(crate::generic::KeyboardDevice),
        };
        Binding {
            family,
            state,
            descriptor: None,
        }
    }

    /// Handshake frames to send right after binding.
    pub fn setup(&mut self) -> Vec<WireFrame> {
        match &mut self.state {
            FamilyState::Switch(dev) => dev.start(),
            FamilyState::DualShock4(dev) => dev.start(),
            FamilyState::DualSense(dev) => dev.start(),
            FamilyState::Wii(dev) => dev.start(),
            FamilyState::Xbox(_)
            | FamilyState::Generic(_)
            | FamilyState::Mouse(_)
            | FamilyState::Keyboard(_) => Vec::new(),
        }
    }

    /// Per-step handshake guard interval, for families that need one.
    pub fn setup_step_timeout_ms(&self) -> Option<u64> {
        match &self.state {
            FamilyState::Switch(_) => Some(hid_switch_protocol::SETUP_TIMEOUT_MS),
            FamilyState::Wii(_) => Some(WII_SETUP_STEP_MS),
            _ => None,
        }
    }

    /// Force the handshake past a step whose reply never came.
    pub fn on_setup_timeout(&mut self) -> Decode {
        match &mut self.state {
            FamilyState::Switch(dev) => {
                let r = dev.on_setup_timeout();
                Decode {
                    frames: r.frames,
                    snapshot: r.snapshot,
                    ready: r.ready,
                    ..Decode::default()
                }
            }
            FamilyState::Wii(dev) => Decode {
                frames: dev.on_setup_timeout(),
                ..Decode::default()
            },
            _ => Decode::default(),
        }
    }

    /// True once the family's handshake is done. Families without a
    /// handshake are ready from the start.
    pub fn is_ready(&self) -> bool {
        match &self.state {
            FamilyState::Switch(dev) => dev.is_ready(),
            FamilyState::DualSense(dev) => dev.is_ready(),
            FamilyState::Wii(dev) => dev.is_ready(),
            FamilyState::DualShock4(_)
            | FamilyState::Xbox(_)
            | FamilyState::Generic(_)
            | FamilyState::Mouse(_)
            | FamilyState::Keyboard(_) => true,
        }
    }

    /// Reset `ctl` to the family's blank snapshot, keeping the battery
    /// level (it arrives on its own cadence).
    pub fn init_report(&self, ctl: &mut Controller) {
        let battery = ctl.battery;
        *ctl = match self.family {
            Family::Mouse => Controller::mouse(),
            Family::Keyboard => Controller::keyboard(),
            // The Wii codec switches to a balance-board snapshot itself
            // when that extension is identified.
            _ => Controller::gamepad(),
        };
        ctl.battery = battery;
    }

    /// Sony pads get a touchpad-as-mouse virtual child.
    pub fn spawns_virtual_mouse(&self) -> bool {
        matches!(self.family, Family::DualShock4 | Family::DualSense)
    }

    /// Per-family `duration == 0` while idle quirk; see
    /// [`crate::rumble::plan`].
    pub fn stops_rumble_when_idle(&self) -> bool {
        matches!(self.family, Family::Wii)
    }

    /// Mouse and keyboard snapshots are chatty; identical consecutive ones
    /// are suppressed.
    pub fn suppress_identical(&self) -> bool {
        matches!(self.family, Family::Mouse | Family::Keyboard)
    }

    /// Feed one interrupt-channel input report.
    ///
    /// `mouse` is the parent-owned virtual mouse snapshot for Sony pads.
    pub fn parse_input_report(
        &mut self,
        report: &[u8],
        ctl: &mut Controller,
        mouse: Option<&mut Controller>,
    ) -> Result<Decode, ReportError> {
        let Binding {
            state, descriptor, ..
        } = self;
        match state {
            FamilyState::Switch(dev) => {
                let r = dev.process_report(report, ctl)?;
                Ok(Decode {
                    frames: r.frames,
                    snapshot: r.snapshot,
                    ready: r.ready,
                    ..Decode::default()
                })
            }
            FamilyState::DualShock4(dev) => {
                let r = dev.process_report(report, ctl, mouse)?;
                Ok(Decode {
                    frames: r.frames,
                    snapshot: r.snapshot,
                    mouse_snapshot: r.mouse_snapshot,
                    ..Decode::default()
                })
            }
            FamilyState::DualSense(dev) => {
                let r = dev.process_report(report, ctl, mouse)?;
                Ok(Decode {
                    snapshot: r.snapshot,
                    mouse_snapshot: r.mouse_snapshot,
                    ..Decode::default()
                })
            }
            FamilyState::Wii(dev) => {
                let r = dev.process_report(report, ctl)?;
                Ok(Decode {
                    frames: r.frames,
                    snapshot: r.snapshot,
                    ready: r.ready,
                    ..Decode::default()
                })
            }
            FamilyState::Xbox(dev) => {
                walk(descriptor.as_ref(), report, |e| dev.handle_usage(&e, ctl))
            }
            FamilyState::Generic(dev) => {
                walk(descriptor.as_ref(), report, |e| dev.handle_usage(&e, ctl))
            }
            FamilyState::Mouse(dev) => {
                walk(descriptor.as_ref(), report, |e| dev.handle_usage(&e, ctl))
            }
            FamilyState::Keyboard(dev) => {
                walk(descriptor.as_ref(), report, |e| dev.handle_usage(&e, ctl))
            }
        }
    }

    /// Feed one GET_REPORT reply from the control channel.
    pub fn parse_feature_report(&mut self, report: &[u8]) -> Result<Decode, ReportError> {
        match &mut self.state {
            FamilyState::DualShock4(dev) => {
                let frames = dev.process_feature_report(report)?;
                Ok(Decode {
                    frames,
                    ..Decode::default()
                })
            }
            FamilyState::DualSense(dev) => {
                let r = dev.process_feature_report(report)?;
                Ok(Decode {
                    frames: r.frames,
                    ready: r.ready,
                    ..Decode::default()
                })
            }
            _ => {
                debug!(family = self.family.name(), "feature report ignored");
                Ok(Decode::default())
            }
        }
    }

    /// Frames lighting the player indicator for a seat.
    pub fn set_player_leds(&mut self, seat: GamepadSeat) -> Vec<WireFrame> {
        match &mut self.state {
            FamilyState::Switch(dev) => dev.set_player_leds(seat.0).into_iter().collect(),
            FamilyState::DualSense(dev) => vec![dev.set_player_leds(seat.player_number())],
            FamilyState::Wii(dev) => dev.set_player_leds(seat.0).into_iter().collect(),
            FamilyState::DualShock4(_)
            | FamilyState::Xbox(_)
            | FamilyState::Generic(_)
            | FamilyState::Mouse(_)
            | FamilyState::Keyboard(_) => Vec::new(),
        }
    }

    /// Frame setting the lightbar color, for families that have one.
    pub fn set_lightbar_color(&mut self, r: u8, g: u8, b: u8) -> Option<WireFrame> {
        match &mut self.state {
            FamilyState::DualShock4(dev) => Some(dev.set_lightbar_color(r, g, b)),
            FamilyState::DualSense(dev) => Some(dev.set_lightbar_color(r, g, b)),
            _ => None,
        }
    }

    /// Frames starting dual rumble at the given magnitudes.
    pub fn rumble_start(&mut self, weak: u8, strong: u8) -> Vec<WireFrame> {
        match &mut self.state {
            FamilyState::Switch(dev) => vec![dev.rumble_start(weak, strong)],
            FamilyState::DualShock4(dev) => vec![dev.rumble_start(weak, strong)],
            FamilyState::DualSense(dev) => vec![dev.rumble_start(weak, strong)],
            FamilyState::Wii(dev) => dev.rumble_start().into_iter().collect(),
            FamilyState::Xbox(_) => {
                vec![hid_xbox_protocol::rumble_frame(QuadRumble::dual(
                    weak, strong,
                ))]
            }
            FamilyState::Generic(_) | FamilyState::Mouse(_) | FamilyState::Keyboard(_) => {
                Vec::new()
            }
        }
    }

    /// Frames stopping rumble.
    pub fn rumble_stop(&mut self) -> Vec<WireFrame> {
        match &mut self.state {
            FamilyState::Switch(dev) => vec![dev.rumble_stop()],
            FamilyState::DualShock4(dev) => vec![dev.rumble_stop()],
            FamilyState::DualSense(dev) => vec![dev.rumble_stop()],
            FamilyState::Wii(dev) => dev.rumble_stop().into_iter().collect(),
            FamilyState::Xbox(_) => vec![hid_xbox_protocol::rumble_stop_frame()],
            FamilyState::Generic(_) | FamilyState::Mouse(_) | FamilyState::Keyboard(_) => {
                Vec::new()
            }
        }
    }

    /// Log a diagnostic line for this device.
    pub fn device_dump(&self) {
        match &self.state {
            FamilyState::Switch(dev) => {
                let (major, minor) = dev.firmware_version();
                info!(
                    family = "switch",
                    controller = ?dev.controller_type(),
                    state = ?dev.state(),
                    firmware = format_args!("{major}.{minor}"),
                    "device dump"
                );
            }
            FamilyState::DualShock4(dev) => {
                let (fw, hw) = dev.versions();
                info!(family = "ds4", fw, hw, "device dump");
            }
            FamilyState::DualSense(dev) => {
                let (fw, hw) = dev.versions();
                info!(family = "ds5", state = ?dev.state(), fw, hw, "device dump");
            }
            FamilyState::Wii(dev) => {
                info!(
                    family = "wii",
                    state = ?dev.state(),
                    dev_type = ?dev.dev_type(),
                    ext = ?dev.ext_type(),
                    mode = ?dev.mode(),
                    "device dump"
                );
            }
            FamilyState::Xbox(dev) => {
                info!(family = "xbox", firmware = ?dev.firmware(), "device dump");
            }
            FamilyState::Generic(_) => info!(family = "generic", "device dump"),
            FamilyState::Mouse(_) => info!(family = "mouse", "device dump"),
            FamilyState::Keyboard(_) => info!(family = "keyboard", "device dump"),
        }
    }
}

/// Walk a report against the descriptor, mapping walker errors into the
/// report error taxonomy.
fn walk<F>(
    descriptor: Option<&ReportDescriptor>,
    report: &[u8],
    emit: F,
) -> Result<Decode, ReportError>
where
    F: FnMut(padhost_hid_common::descriptor::UsageEvent),
{
    let Some(desc) = descriptor else {
        warn!("usage-stream family without a descriptor, report dropped");
        return Err(ReportError::malformed("usage-stream", report.len(), 0));
    };
    match desc.walk_input(report, emit) {
        Ok(()) => Ok(Decode {
            snapshot: true,
            ..Decode::default()
        }),
        Err(DescriptorError::UnknownReportId(id)) => Err(ReportError::UnexpectedReportId {
            family: "usage-stream",
            id,
        }),
        Err(DescriptorError::ReportTooShort { got, want }) => Err(ReportError::Malformed {
            family: "usage-stream",
            actual: got,
            expected: want.div_ceil(8),
        }),
        Err(e) => {
            warn!(error = %e, "descriptor walk failed");
            Err(ReportError::Truncated {
                offset: 0,
                len: report.len(),
            })
        }
    }
}
