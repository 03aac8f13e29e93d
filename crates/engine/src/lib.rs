//! Bluetooth HID host engine for game controllers.
//!
//! Ties the per-family protocol crates together: a fixed device pool with
//! generation-checked handles, capability binding, handshake supervision,
//! a cancel-before-reschedule haptics scheduler, a bounded outgoing queue
//! and canonical snapshot delivery. Single-threaded by design; the
//! embedder drives the [`Engine`] entry points from one event loop and
//! supplies monotonic time.

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod binding;
pub mod config;
pub mod engine;
pub mod family;
pub mod generic;
pub mod outgoing;
pub mod ports;
pub mod registry;
pub mod rumble;
pub mod timer;

pub use binding::{Family, Fingerprint, Resolution};
pub use config::EngineConfig;
pub use engine::Engine;
pub use ports::{OobEvent, Platform, PlatformProperty, SendError, Transport, Vetoable};
pub use registry::{BdAddr, ConnectionState, DeviceHandle, MAX_DEVICES};
pub use rumble::RumbleState;
