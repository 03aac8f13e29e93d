//! Port traits separating the engine from the platform above and the
//! Bluetooth transport below.
//!
//! The engine never talks to an application or a radio directly; the
//! embedder implements [`Platform`] and [`Transport`] and drives the engine
//! entry points from its own event loop.

use padhost_controller_types::Controller;

use crate::registry::DeviceHandle;

/// Answer from the ready callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vetoable {
    /// Keep the device.
    Accept,
    /// Reject it; the engine disconnects and destroys the device.
    Veto,
}

/// Out-of-band events, delivered apart from controller snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobEvent {
    /// The vendor/system button was pressed (edge, one per press).
    SystemButton,
    /// The radio was switched on or off by the stack underneath.
    BluetoothEnabled(bool),
}

/// Properties the engine can query from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformProperty {
    /// Wipe stored link keys at the next bring-up.
    DeleteStoredKeys,
}

/// Why a transport write did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The channel cannot take data right now; retry after
    /// [`Transport::request_can_send_now`] answers.
    #[error("channel busy")]
    Busy,
    /// The channel is gone; the frame is dropped.
    #[error("channel closed")]
    Closed,
}

/// Upward interface: the application embedding the engine.
pub trait Platform {
    /// A device slot was allocated for a new connection.
    fn on_device_connected(&mut self, handle: DeviceHandle);

    /// A device was torn down. The handle is stale after this returns.
    fn on_device_disconnected(&mut self, handle: DeviceHandle);

    /// The device finished its handshake. Returning [`Vetoable::Veto`]
    /// makes the engine disconnect and destroy it.
    fn on_device_ready(&mut self, handle: DeviceHandle) -> Vetoable;

    /// One canonical snapshot, after decode and remap.
    fn on_controller_data(&mut self, handle: DeviceHandle, controller: &Controller);

    /// System button and similar out-of-band events. `device` is `None`
    /// for events that do not belong to one device.
    fn on_oob_event(&mut self, device: Option<DeviceHandle>, event: OobEvent);

    /// Query a platform-defined property. The default knows none.
    fn get_property(&self, property: PlatformProperty) -> Option<i32> {
        let _ = property;
        None
    }
}

/// Downward interface: the L2CAP transport.
pub trait Transport {
    /// Try to write one frame on a channel.
    fn send(&mut self, channel_id: u16, frame: &[u8]) -> Result<(), SendError>;

    /// Ask to be called back via the engine's `on_can_send_now` once the
    /// channel can take data again.
    fn request_can_send_now(&mut self, channel_id: u16);
}
