//! Capability binding: deciding which controller family drives a device.
//!
//! Resolution order is vendor/product ids, then device name, then
//! class-of-device bits, then the generic descriptor-driven fallback. A
//! name match also assigns the ids the name implies, so clones that answer
//! no SDP queries still bind like the real article.

use tracing::debug;

/// A controller family the engine can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Switch Pro, Joy-Cons, Switch Online SNES.
    Switch,
    /// DualShock 4 (v1/v2).
    DualShock4,
    /// DualSense and DualSense Edge.
    DualSense,
    /// Wii Remote family, Wii U Pro, Balance Board.
    Wii,
    /// Xbox Wireless Controller.
    Xbox,
    /// Anything else that looks like a gamepad; descriptor-driven.
    Generic,
    /// A Bluetooth mouse, or the Sony touchpad virtual child.
    Mouse,
    /// A Bluetooth keyboard.
    Keyboard,
}

impl Family {
    /// Short name for logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Family::Switch => "switch",
            Family::DualShock4 => "ds4",
            Family::DualSense => "ds5",
            Family::Wii => "wii",
            Family::Xbox => "xbox",
            Family::Generic => "generic",
            Family::Mouse => "mouse",
            Family::Keyboard => "keyboard",
        }
    }

    /// True for families decoded through the HID report descriptor.
    pub fn requires_descriptor(self) -> bool {
        matches!(
            self,
            Family::Xbox | Family::Generic | Family::Mouse | Family::Keyboard
        )
    }
}

/// Everything known about a device when binding is attempted. Zero fields
/// mean unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fingerprint<'a> {
    /// Vendor id, if SDP answered.
    pub vendor_id: u16,
    /// Product id, if SDP answered.
    pub product_id: u16,
    /// Remote name, if the name request answered.
    pub name: Option<&'a str>,
    /// Class of device from the inquiry response.
    pub class_of_device: u32,
}

/// The outcome of resolution. Name matches fill in the ids the protocol
/// crates expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Family to bind.
    pub family: Family,
    /// Effective vendor id.
    pub vendor_id: u16,
    /// Effective product id.
    pub product_id: u16,
}

const COD_MAJOR_PERIPHERAL: u32 = 0x05;
const COD_MINOR_POINTING: u32 = 0x80;
const COD_MINOR_KEYBOARD: u32 = 0x40;

/// True when the class of device is one the engine will accept at all.
pub fn cod_is_supported(cod: u32) -> bool {
    (cod >> 8) & 0x1f == COD_MAJOR_PERIPHERAL
}

/// Resolve the family for a device.
pub fn resolve(fp: &Fingerprint<'_>) -> Resolution {
    let (vendor_id, product_id) = if fp.vendor_id != 0 {
        (fp.vendor_id, fp.product_id)
    } else {
        fp.name
            .and_then(ids_from_name)
            .unwrap_or((fp.vendor_id, fp.product_id))
    };

    if let Some(family) = family_from_ids(vendor_id, product_id) {
        return Resolution {
            family,
            vendor_id,
            product_id,
        };
    }

    if let Some(family) = family_from_cod(fp.class_of_device) {
        debug!(cod = fp.class_of_device, family = family.name(), "bound by class of device");
        return Resolution {
            family,
            vendor_id,
            product_id,
        };
    }

    Resolution {
        family: Family::Generic,
        vendor_id,
        product_id,
    }
}

fn family_from_ids(vendor_id: u16, product_id: u16) -> Option<Family> {
    match (vendor_id, product_id) {
        (hid_switch_protocol::ids::NINTENDO_VID, pid) => match pid {
            hid_switch_protocol::ids::PRO_CONTROLLER_PID
            | hid_switch_protocol::ids::JOYCON_L_PID
            | hid_switch_protocol::ids::JOYCON_R_PID
            | hid_switch_protocol::ids::ONLINE_SNES_CONTROLLER_PID => Some(Family::Switch),
            hid_wii_protocol::ids::REMOTE_PID | hid_wii_protocol::ids::REMOTE_MP_PID => {
                Some(Family::Wii)
            }
            _ => None,
        },
        (hid_dualshock_protocol::SONY_VID, pid) => match pid {
            hid_dualshock_protocol::DS4_PID | hid_dualshock_protocol::DS4_V2_PID => {
                Some(Family::DualShock4)
            }
            hid_dualshock_protocol::DS5_PID | hid_dualshock_protocol::DS5_EDGE_PID => {
                Some(Family::DualSense)
            }
            _ => None,
        },
        (hid_xbox_protocol::XBOX_WIRELESS_VID, hid_xbox_protocol::XBOX_WIRELESS_PID) => {
            Some(Family::Xbox)
        }
        _ => None,
    }
}

/// Ids implied by a device name. Nintendo and Sony names match exactly;
/// Xbox clones add suffixes, so that one is a prefix match.
fn ids_from_name(name: &str) -> Option<(u16, u16)> {
    for table in [
        hid_switch_protocol::DEVICE_NAMES,
        hid_wii_protocol::DEVICE_NAMES,
        hid_dualshock_protocol::DEVICE_NAMES,
    ] {
        for &(known, vid, pid) in table {
            if name == known {
                return Some((vid, pid));
            }
        }
    }
    if name.starts_with(hid_xbox_protocol::DEVICE_NAME) {
        return Some((
            hid_xbox_protocol::XBOX_WIRELESS_VID,
            hid_xbox_protocol::XBOX_WIRELESS_PID,
        ));
    }
    None
}

fn family_from_cod(cod: u32) -> Option<Family> {
    if cod == 0 || !cod_is_supported(cod) {
        return None;
    }
    if cod & COD_MINOR_POINTING != 0 {
        Some(Family::Mouse)
    } else if cod & COD_MINOR_KEYBOARD != 0 {
        Some(Family::Keyboard)
    } else {
        Some(Family::Generic)
    }
}
