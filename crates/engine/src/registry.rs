//! Fixed-pool device registry with generation-checked handles.
//!
//! Slots are never reallocated; a destroyed slot bumps its generation so
//! every outstanding handle to it becomes detectably stale. Timers and
//! platform callbacks carry handles, never references.

use padhost_controller_types::{Controller, GamepadSeat};
use padhost_errors::DeviceError;
use tracing::info;

use crate::binding::Family;
use crate::family::Binding;
use crate::outgoing::OutgoingRing;
use crate::rumble::RumbleState;
use crate::timer::TimerHandle;

/// Size of the device pool.
pub const MAX_DEVICES: usize = 8;

/// A generation-checked reference to a device slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    /// Slot index.
    pub index: u8,
    /// Slot generation at the time the handle was issued.
    pub generation: u32,
}

/// Bluetooth device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BdAddr(pub [u8; 6]);

impl std::fmt::Display for BdAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let a = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

/// Connection lifecycle. Transitions are monotonic; a device never moves
/// backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    /// Slot allocated, channels not open yet.
    Connecting,
    /// Channels open, authentication pending.
    PendingPairing,
    /// Bound and running its handshake.
    PendingReady,
    /// Fully usable; snapshots flow.
    Ready,
}

/// Everything the engine tracks per device.
#[derive(Debug)]
pub struct DeviceSlot {
    /// Remote address; zero for virtual children.
    pub address: BdAddr,
    /// ACL connection handle.
    pub connection_handle: u16,
    /// L2CAP control channel id.
    pub control_cid: u16,
    /// L2CAP interrupt channel id.
    pub interrupt_cid: u16,
    /// Vendor id, once known.
    pub vendor_id: u16,
    /// Product id, once known.
    pub product_id: u16,
    /// Class of device from inquiry.
    pub class_of_device: u32,
    /// Remote name, once known.
    pub name: String,
    /// The name request answered.
    pub has_name: bool,
    /// The inquiry carried a class of device.
    pub has_cod: bool,
    /// SDP answered with vendor/product ids.
    pub has_vendor_product: bool,
    /// The remote initiated the connection.
    pub incoming: bool,
    /// Lifecycle state.
    pub lifecycle: ConnectionState,
    /// Descriptor received before binding; moved into the binding.
    pub pending_descriptor: Option<padhost_hid_common::descriptor::ReportDescriptor>,
    /// Resolved family state; `None` until bound.
    pub binding: Option<Binding>,
    /// Canonical snapshot, updated by decode.
    pub controller: Controller,
    /// Scratch snapshot for the Sony touchpad virtual mouse.
    pub virtual_mouse: Controller,
    /// Last snapshot delivered, for suppress-if-identical families.
    pub last_delivered: Option<Controller>,
    /// Haptics scheduler state.
    pub rumble: RumbleState,
    /// Frames waiting for a busy channel.
    pub outgoing: OutgoingRing,
    /// Parent device, for virtual children.
    pub parent: Option<DeviceHandle>,
    /// Virtual child, for Sony pads.
    pub child: Option<DeviceHandle>,
    /// Assigned player seat.
    pub seat: GamepadSeat,
    /// Stuck-before-ready guard timer.
    pub guard_timer: Option<TimerHandle>,
    /// Per-handshake-step timer.
    pub setup_timer: Option<TimerHandle>,
    /// System button held; suppress until release.
    pub misc_latched: bool,
    /// Switch-family system button cooldown is running.
    pub misc_cooldown: bool,
    /// `begin_ready` already ran for this connection.
    pub ready_requested: bool,
}

impl DeviceSlot {
    fn new(address: BdAddr, outgoing_capacity: usize) -> Self {
        DeviceSlot {
            address,
            connection_handle: 0,
            control_cid: 0,
            interrupt_cid: 0,
            vendor_id: 0,
            product_id: 0,
            class_of_device: 0,
            name: String::new(),
            has_name: false,
            has_cod: false,
            has_vendor_product: false,
            incoming: false,
            lifecycle: ConnectionState::Connecting,
            pending_descriptor: None,
            binding: None,
            controller: Controller::gamepad(),
            virtual_mouse: Controller::mouse(),
            last_delivered: None,
            rumble: RumbleState::Disabled,
            outgoing: OutgoingRing::new(outgoing_capacity),
            parent: None,
            child: None,
            seat: GamepadSeat::NONE,
            guard_timer: None,
            setup_timer: None,
            misc_latched: false,
            misc_cooldown: false,
            ready_requested: false,
        }
    }

    /// Resolved family, if bound.
    pub fn family(&self) -> Option<Family> {
        self.binding.as_ref().map(|b| b.family)
    }

    /// Log one diagnostic line for this slot.
    pub fn dump(&self, index: usize) {
        info!(
            index,
            address = %self.address,
            lifecycle = ?self.lifecycle,
            family = self.family().map(Family::name).unwrap_or("unbound"),
            name = %self.name,
            vid = format_args!("{:#06x}", self.vendor_id),
            pid = format_args!("{:#06x}", self.product_id),
            seat = self.seat.player_number(),
            "device"
        );
        if let Some(binding) = &self.binding {
            binding.device_dump();
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    dev: Option<DeviceSlot>,
}

/// The fixed pool of device slots.
#[derive(Debug)]
pub struct DeviceRegistry {
    slots: [Slot; MAX_DEVICES],
    outgoing_capacity: usize,
}

impl DeviceRegistry {
    /// Empty registry; `outgoing_capacity` sizes each device's send ring.
    pub fn new(outgoing_capacity: usize) -> Self {
        DeviceRegistry {
            slots: std::array::from_fn(|_| Slot {
                generation: 1,
                dev: None,
            }),
            outgoing_capacity,
        }
    }

    /// Allocate a slot for a new connection.
    pub fn create(&mut self, address: BdAddr) -> Result<DeviceHandle, DeviceError> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.dev.is_none())
            .ok_or(DeviceError::PoolExhausted)?;
        slot.dev = Some(DeviceSlot::new(address, self.outgoing_capacity));
        Ok(DeviceHandle {
            index: index as u8,
            generation: slot.generation,
        })
    }

    /// Checked immutable access.
    pub fn get(&self, handle: DeviceHandle) -> Result<&DeviceSlot, DeviceError> {
        let slot = self
            .slots
            .get(handle.index as usize)
            .ok_or_else(|| DeviceError::not_found(format!("slot {}", handle.index)))?;
        if slot.generation != handle.generation {
            return Err(DeviceError::StaleHandle {
                index: handle.index,
                current: slot.generation,
                held: handle.generation,
            });
        }
        slot.dev
            .as_ref()
            .ok_or_else(|| DeviceError::not_found(format!("slot {} empty", handle.index)))
    }

    /// Checked mutable access.
    pub fn get_mut(&mut self, handle: DeviceHandle) -> Result<&mut DeviceSlot, DeviceError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .ok_or_else(|| DeviceError::not_found(format!("slot {}", handle.index)))?;
        if slot.generation != handle.generation {
            return Err(DeviceError::StaleHandle {
                index: handle.index,
                current: slot.generation,
                held: handle.generation,
            });
        }
        slot.dev
            .as_mut()
            .ok_or_else(|| DeviceError::not_found(format!("slot {} empty", handle.index)))
    }

    /// Free a slot and invalidate all handles to it.
    pub fn release(&mut self, handle: DeviceHandle) -> Result<(), DeviceError> {
        // Validate the handle first.
        self.get(handle)?;
        let slot = &mut self.slots[handle.index as usize];
        slot.dev = None;
        slot.generation = slot.generation.wrapping_add(1);
        Ok(())
    }

    /// Iterate occupied slots with their current handles.
    pub fn iter(&self) -> impl Iterator<Item = (DeviceHandle, &DeviceSlot)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.dev.as_ref().map(|dev| {
                (
                    DeviceHandle {
                        index: i as u8,
                        generation: s.generation,
                    },
                    dev,
                )
            })
        })
    }

    /// Find a device by remote address.
    pub fn find_by_address(&self, address: BdAddr) -> Option<DeviceHandle> {
        self.iter()
            .find(|(_, d)| d.address == address)
            .map(|(h, _)| h)
    }

    /// Find a device owning an L2CAP channel.
    pub fn find_by_channel(&self, channel_id: u16) -> Option<DeviceHandle> {
        self.iter()
            .find(|(_, d)| {
                channel_id != 0 && (d.control_cid == channel_id || d.interrupt_cid == channel_id)
            })
            .map(|(h, _)| h)
    }

    /// Find a device by ACL connection handle.
    pub fn find_by_connection_handle(&self, connection_handle: u16) -> Option<DeviceHandle> {
        self.iter()
            .find(|(_, d)| connection_handle != 0 && d.connection_handle == connection_handle)
            .map(|(h, _)| h)
    }

    /// Find the first ready device matching a predicate. Devices still
    /// connecting never match.
    pub fn find_ready<F>(&self, mut predicate: F) -> Option<DeviceHandle>
    where
        F: FnMut(&DeviceSlot) -> bool,
    {
        self.iter()
            .find(|(_, d)| d.lifecycle == ConnectionState::Ready && predicate(d))
            .map(|(h, _)| h)
    }

    /// Occupied slot count.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.dev.is_some()).count()
    }

    /// True when no slots are occupied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First seat not taken by any device.
    pub fn next_free_seat(&self) -> GamepadSeat {
        let taken: u8 = self.iter().map(|(_, d)| d.seat.0).fold(0, |a, b| a | b);
        for player in 1..=4u8 {
            let seat = GamepadSeat::for_player(player);
            if taken & seat.0 == 0 {
                return seat;
            }
        }
        GamepadSeat::NONE
    }

    /// Log one line per occupied slot.
    pub fn dump_all(&self) {
        info!(devices = self.len(), "registry dump");
        for (h, d) in self.iter() {
            d.dump(h.index as usize);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn addr(last: u8) -> BdAddr {
        BdAddr([0, 1, 2, 3, 4, last])
    }

    #[test]
    fn pool_exhaustion() {
        let mut reg = DeviceRegistry::new(8);
        for i in 0..MAX_DEVICES {
            reg.create(addr(i as u8)).unwrap();
        }
        assert_eq!(reg.create(addr(0xff)), Err(DeviceError::PoolExhausted));
    }

    #[test]
    fn release_makes_handles_stale() {
        let mut reg = DeviceRegistry::new(8);
        let h = reg.create(addr(1)).unwrap();
        reg.release(h).unwrap();
        assert!(matches!(
            reg.get(h),
            Err(DeviceError::StaleHandle { .. })
        ));
        // Double release is also stale, not a panic.
        assert!(reg.release(h).is_err());

        // A reused slot issues a handle with a new generation.
        let h2 = reg.create(addr(2)).unwrap();
        assert_eq!(h2.index, h.index);
        assert_ne!(h2.generation, h.generation);
        assert!(reg.get(h2).is_ok());
    }

    #[test]
    fn channel_lookup_ignores_zero() {
        let mut reg = DeviceRegistry::new(8);
        let h = reg.create(addr(1)).unwrap();
        assert_eq!(reg.find_by_channel(0), None);
        reg.get_mut(h).unwrap().interrupt_cid = 0x41;
        assert_eq!(reg.find_by_channel(0x41), Some(h));
    }

    #[test]
    fn predicate_lookup_only_matches_ready() {
        let mut reg = DeviceRegistry::new(8);
        let h = reg.create(addr(1)).unwrap();
        assert_eq!(reg.find_ready(|_| true), None);
        reg.get_mut(h).unwrap().lifecycle = ConnectionState::Ready;
        assert_eq!(reg.find_ready(|_| true), Some(h));
    }

    #[test]
    fn seats_fill_in_player_order() {
        let mut reg = DeviceRegistry::new(8);
        assert_eq!(reg.next_free_seat(), GamepadSeat::A);
        let h = reg.create(addr(1)).unwrap();
        reg.get_mut(h).unwrap().seat = GamepadSeat::A;
        assert_eq!(reg.next_free_seat(), GamepadSeat::B);
    }
}
