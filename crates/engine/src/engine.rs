//! The host engine: single-threaded orchestration of registry, binding,
//! handshakes, haptics and delivery.
//!
//! The embedder drives everything through the entry points below from one
//! event loop; time is caller-supplied monotonic milliseconds, so the
//! engine itself never reads a clock.

use padhost_controller_types::gamepad::misc_button;
use padhost_controller_types::mappings::remap;
use padhost_controller_types::{Controller, ControllerState, GamepadSeat};
use padhost_errors::DeviceError;
use padhost_hid_common::WireFrame;
use padhost_hid_common::descriptor::ReportDescriptor;
use tracing::{debug, error, info, warn};

use crate::binding::{Family, Fingerprint, resolve};
use crate::config::EngineConfig;
use crate::family::Binding;
use crate::outgoing::PendingFrame;
use crate::ports::{OobEvent, Platform, SendError, Transport, Vetoable};
use crate::registry::{BdAddr, ConnectionState, DeviceHandle, DeviceRegistry};
use crate::rumble::{RumbleAction, RumbleState, plan};
use crate::timer::{TimerKind, TimerService};

/// HIDP DATA transaction header on input reports; stripped when present.
const TRANSACTION_DATA_INPUT: u8 = 0xa1;

/// The Bluetooth HID host engine.
///
/// Generic over the [`Platform`] above it and the [`Transport`] below it;
/// owns the device pool and the timer service.
pub struct Engine<P: Platform, T: Transport> {
    config: EngineConfig,
    registry: DeviceRegistry,
    timers: TimerService,
    platform: P,
    transport: T,
}

impl<P: Platform, T: Transport> Engine<P, T> {
    /// Engine with an empty device pool.
    pub fn new(config: EngineConfig, platform: P, transport: T) -> Self {
        let registry = DeviceRegistry::new(config.outgoing_capacity);
        Engine {
            config,
            registry,
            timers: TimerService::new(),
            platform,
            transport,
        }
    }

    /// The device pool, for lookups and diagnostics.
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// The timer service (read-only; the engine owns scheduling).
    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    /// The platform implementation.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The transport implementation.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable transport access, for embedders that multiplex it.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- lifecycle ----------------------------------------------------

    /// Allocate a device for a new connection and arm its guard timer.
    pub fn connect(
        &mut self,
        address: BdAddr,
        incoming: bool,
        now_ms: u64,
    ) -> Result<DeviceHandle, DeviceError> {
        let handle = self.registry.create(address)?;
        let deadline = now_ms + self.config.connection_timeout_ms;
        let guard = self
            .timers
            .arm(deadline, TimerKind::ConnectionGuard, handle);
        let slot = self.registry.get_mut(handle)?;
        slot.incoming = incoming;
        slot.guard_timer = Some(guard);
        info!(index = handle.index, %address, incoming, "device connecting");
        self.platform.on_device_connected(handle);
        Ok(handle)
    }

    /// Record the remote name from the name request.
    pub fn set_device_name(&mut self, handle: DeviceHandle, name: &str) -> Result<(), DeviceError> {
        let slot = self.registry.get_mut(handle)?;
        slot.name = name.to_owned();
        slot.has_name = true;
        Ok(())
    }

    /// Record the class of device from the inquiry response.
    pub fn set_class_of_device(
        &mut self,
        handle: DeviceHandle,
        cod: u32,
    ) -> Result<(), DeviceError> {
        let slot = self.registry.get_mut(handle)?;
        slot.class_of_device = cod;
        slot.has_cod = true;
        Ok(())
    }

    /// Record vendor/product ids from SDP.
    pub fn set_vendor_product(
        &mut self,
        handle: DeviceHandle,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<(), DeviceError> {
        let slot = self.registry.get_mut(handle)?;
        slot.vendor_id = vendor_id;
        slot.product_id = product_id;
        slot.has_vendor_product = true;
        Ok(())
    }

    /// Store the HID report descriptor from SDP. A descriptor that does
    /// not parse is logged and treated as absent.
    pub fn set_hid_descriptor(
        &mut self,
        handle: DeviceHandle,
        descriptor: &[u8],
    ) -> Result<(), DeviceError> {
        let parsed = match ReportDescriptor::parse(descriptor) {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(index = handle.index, error = %e, "descriptor rejected");
                None
            }
        };
        let slot = self.registry.get_mut(handle)?;
        match &mut slot.binding {
            Some(binding) => binding.descriptor = parsed,
            None => slot.pending_descriptor = parsed,
        }
        Ok(())
    }

    /// Both L2CAP channels are open.
    pub fn on_channels_open(
        &mut self,
        handle: DeviceHandle,
        control_cid: u16,
        interrupt_cid: u16,
        connection_handle: u16,
    ) -> Result<(), DeviceError> {
        let slot = self.registry.get_mut(handle)?;
        if slot.lifecycle != ConnectionState::Connecting {
            let e = DeviceError::DoubleStateTransition("channels open");
            warn!(index = handle.index, state = ?slot.lifecycle, "{e}");
            return Err(e);
        }
        slot.control_cid = control_cid;
        slot.interrupt_cid = interrupt_cid;
        slot.connection_handle = connection_handle;
        slot.lifecycle = ConnectionState::PendingPairing;
        Ok(())
    }

    /// Authentication finished; bind the family and start its handshake.
    pub fn on_pairing_complete(
        &mut self,
        handle: DeviceHandle,
        now_ms: u64,
    ) -> Result<(), DeviceError> {
        let slot = self.registry.get_mut(handle)?;
        if slot.lifecycle != ConnectionState::PendingPairing {
            let e = DeviceError::DoubleStateTransition("pairing complete");
            warn!(index = handle.index, state = ?slot.lifecycle, "{e}");
            return Err(e);
        }
        if let Some(binding) = &slot.binding {
            let e = DeviceError::AlreadyBound(binding.family.name());
            warn!(index = handle.index, "{e}");
            return Err(e);
        }

        let resolution = resolve(&Fingerprint {
            vendor_id: if slot.has_vendor_product {
                slot.vendor_id
            } else {
                0
            },
            product_id: slot.product_id,
            name: slot.has_name.then_some(slot.name.as_str()),
            class_of_device: if slot.has_cod {
                slot.class_of_device
            } else {
                0
            },
        });
        slot.vendor_id = resolution.vendor_id;
        slot.product_id = resolution.product_id;

        let mut binding = Binding::new(resolution.family, resolution.product_id);
        binding.descriptor = slot.pending_descriptor.take();
        if binding.family.requires_descriptor() && binding.descriptor.is_none() {
            if binding.family == Family::Xbox {
                // Clones that impersonate the pad by name rarely serve a
                // descriptor; bind them against the stock 4.8 one.
                binding.descriptor =
                    ReportDescriptor::parse(hid_xbox_protocol::FALLBACK_DESCRIPTOR).ok();
            } else {
                warn!(
                    index = handle.index,
                    family = binding.family.name(),
                    "bound without a descriptor; reports will be dropped"
                );
            }
        }
        binding.init_report(&mut slot.controller);
        info!(
            index = handle.index,
            family = binding.family.name(),
            vid = format_args!("{:#06x}", resolution.vendor_id),
            pid = format_args!("{:#06x}", resolution.product_id),
            "device bound"
        );

        let frames = binding.setup();
        let step = binding.setup_step_timeout_ms();
        let ready = binding.is_ready();
        slot.binding = Some(binding);
        slot.lifecycle = ConnectionState::PendingReady;

        for frame in frames {
            self.send_frame(handle, frame);
        }
        if let Some(step_ms) = step {
            self.arm_setup_timer(handle, now_ms, step_ms);
        }
        if ready {
            self.begin_ready(handle, now_ms);
        }
        Ok(())
    }

    /// Tear a device down: timers, children, notification, slot release.
    pub fn disconnect(&mut self, handle: DeviceHandle) {
        let Ok(slot) = self.registry.get_mut(handle) else {
            debug!(index = handle.index, "disconnect on stale handle");
            return;
        };

        for timer in [slot.guard_timer.take(), slot.setup_timer.take()]
            .into_iter()
            .flatten()
        {
            self.timers.cancel(timer);
        }
        if let Some(timer) = slot.rumble.live_timer() {
            self.timers.cancel(timer);
        }
        slot.rumble = RumbleState::Disabled;
        slot.outgoing.clear();

        let child = slot.child.take();
        let parent = slot.parent;
        let notify = slot.lifecycle >= ConnectionState::PendingPairing || parent.is_some();
        let seat = slot.seat;

        if let Some(child) = child {
            self.disconnect(child);
        }
        if let Some(parent) = parent
            && let Ok(parent_slot) = self.registry.get_mut(parent)
        {
            parent_slot.child = None;
        }

        if notify {
            self.platform.on_device_disconnected(handle);
        }
        if seat != GamepadSeat::NONE {
            debug!(index = handle.index, seat = seat.player_number(), "seat freed");
        }
        if let Err(e) = self.registry.release(handle) {
            debug!(index = handle.index, error = %e, "release failed");
        }
    }

    // ---- report paths -------------------------------------------------

    /// Feed one interrupt-channel report. `bytes` may carry the HIDP DATA
    /// transaction byte; report data starts at the report id.
    pub fn on_report_received(&mut self, handle: DeviceHandle, bytes: &[u8], now_ms: u64) {
        let report = match bytes.split_first() {
            Some((&TRANSACTION_DATA_INPUT, rest)) => rest,
            _ => bytes,
        };

        let Ok(slot) = self.registry.get_mut(handle) else {
            debug!(index = handle.index, "report for stale handle");
            return;
        };
        let Some(binding) = slot.binding.as_mut() else {
            warn!(index = handle.index, "report before binding, dropped");
            return;
        };

        // Decode into scratch copies so a malformed report leaves the
        // committed snapshots untouched.
        let mut working = slot.controller.clone();
        let mut mouse = slot.virtual_mouse.clone();
        binding.init_report(&mut working);
        if binding.spawns_virtual_mouse() {
            mouse = Controller::mouse();
        }

        let wants_mouse = binding.spawns_virtual_mouse();
        let decode = match binding.parse_input_report(
            report,
            &mut working,
            wants_mouse.then_some(&mut mouse),
        ) {
            Ok(d) => d,
            Err(e) => {
                warn!(index = handle.index, error = %e, "input report rejected");
                return;
            }
        };

        let still_setting_up = !binding.is_ready();
        let step = binding.setup_step_timeout_ms();
        if decode.snapshot {
            slot.controller = working;
        }
        if decode.mouse_snapshot {
            slot.virtual_mouse = mouse;
        }

        let has_frames = !decode.frames.is_empty();
        for frame in decode.frames {
            self.send_frame(handle, frame);
        }

        if decode.ready {
            self.clear_setup_timer(handle);
            self.begin_ready(handle, now_ms);
        } else if still_setting_up
            && has_frames
            && let Some(step_ms) = step
        {
            // The handshake advanced; restart the step guard.
            self.arm_setup_timer(handle, now_ms, step_ms);
        }

        if decode.snapshot {
            self.deliver(handle, now_ms);
        }
        if decode.mouse_snapshot {
            self.deliver_virtual_mouse(handle);
        }
    }

    /// Feed one GET_REPORT reply from the control channel. `bytes` starts
    /// at the feature report id (transaction byte already stripped).
    pub fn on_feature_report(&mut self, handle: DeviceHandle, bytes: &[u8], now_ms: u64) {
        let Ok(slot) = self.registry.get_mut(handle) else {
            debug!(index = handle.index, "feature report for stale handle");
            return;
        };
        let Some(binding) = slot.binding.as_mut() else {
            warn!(index = handle.index, "feature report before binding, dropped");
            return;
        };
        let decode = match binding.parse_feature_report(bytes) {
            Ok(d) => d,
            Err(e) => {
                warn!(index = handle.index, error = %e, "feature report rejected");
                return;
            }
        };
        for frame in decode.frames {
            self.send_frame(handle, frame);
        }
        if decode.ready {
            self.clear_setup_timer(handle);
            self.begin_ready(handle, now_ms);
        }
    }

    /// The transport can take data on a channel again. Pops exactly one
    /// queued frame.
    pub fn on_can_send_now(&mut self, channel_id: u16) {
        let Some(handle) = self.registry.find_by_channel(channel_id) else {
            debug!(channel_id, "can-send-now for unknown channel");
            return;
        };
        let Ok(slot) = self.registry.get_mut(handle) else {
            return;
        };
        let Some(frame) = slot.outgoing.pop() else {
            return;
        };
        let more = !slot.outgoing.is_empty();
        match self.transport.send(frame.channel_id, &frame.payload) {
            Ok(()) => {
                if more {
                    self.transport.request_can_send_now(channel_id);
                }
            }
            Err(SendError::Busy) => {
                if let Ok(slot) = self.registry.get_mut(handle) {
                    slot.outgoing.requeue_front(frame);
                }
                self.transport.request_can_send_now(channel_id);
            }
            Err(SendError::Closed) => {
                warn!(channel_id, "channel closed with queued frames");
            }
        }
    }

    /// Run every timer due at or before `now_ms`.
    pub fn process_timers(&mut self, now_ms: u64) {
        while let Some(fired) = self.timers.pop_due(now_ms) {
            match fired.kind {
                TimerKind::ConnectionGuard => self.on_connection_guard(fired.device),
                TimerKind::SetupStep => self.on_setup_step(fired.device, now_ms),
                TimerKind::RumbleDelay => self.on_rumble_delay(fired.device, now_ms),
                TimerKind::RumbleDuration => self.on_rumble_duration(fired.device),
                TimerKind::MiscCooldown => {
                    if let Ok(slot) = self.registry.get_mut(fired.device) {
                        slot.misc_cooldown = false;
                    }
                }
            }
        }
    }

    /// Deadline of the next armed timer, for the embedder's event loop.
    pub fn next_timer_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    // ---- haptics ------------------------------------------------------

    /// Schedule dual rumble. A new request always replaces the previous
    /// schedule; `duration_ms == 0` stops a playing effect.
    pub fn play_dual_rumble(
        &mut self,
        handle: DeviceHandle,
        start_delay_ms: u16,
        duration_ms: u16,
        weak_magnitude: u8,
        strong_magnitude: u8,
        now_ms: u64,
    ) -> Result<(), DeviceError> {
        let slot = self.registry.get_mut(handle)?;
        let Some(binding) = slot.binding.as_mut() else {
            debug!(index = handle.index, "rumble before binding, ignored");
            return Ok(());
        };

        if let Some(timer) = slot.rumble.live_timer() {
            self.timers.cancel(timer);
        }

        let action = plan(
            &slot.rumble,
            start_delay_ms,
            duration_ms,
            binding.stops_rumble_when_idle(),
        );
        let frames: Vec<WireFrame> = match action {
            RumbleAction::StartNow => {
                let frames = binding.rumble_start(weak_magnitude, strong_magnitude);
                let timer = self.timers.arm(
                    now_ms + u64::from(duration_ms),
                    TimerKind::RumbleDuration,
                    handle,
                );
                slot.rumble = RumbleState::InProgress { timer };
                frames
            }
            RumbleAction::StartLater => {
                let timer = self.timers.arm(
                    now_ms + u64::from(start_delay_ms),
                    TimerKind::RumbleDelay,
                    handle,
                );
                slot.rumble = RumbleState::Delayed {
                    timer,
                    duration_ms,
                    weak: weak_magnitude,
                    strong: strong_magnitude,
                };
                Vec::new()
            }
            RumbleAction::StopNow => {
                slot.rumble = RumbleState::Disabled;
                binding.rumble_stop()
            }
            RumbleAction::Ignore => {
                slot.rumble = RumbleState::Disabled;
                Vec::new()
            }
        };
        for frame in frames {
            self.send_frame(handle, frame);
        }
        Ok(())
    }

    /// Set the lightbar color, on families that have one.
    pub fn set_lightbar_color(
        &mut self,
        handle: DeviceHandle,
        r: u8,
        g: u8,
        b: u8,
    ) -> Result<(), DeviceError> {
        let slot = self.registry.get_mut(handle)?;
        let frame = slot
            .binding
            .as_mut()
            .and_then(|binding| binding.set_lightbar_color(r, g, b));
        if let Some(frame) = frame {
            self.send_frame(handle, frame);
        }
        Ok(())
    }

    /// Re-send the player indicator for the device's assigned seat.
    pub fn set_player_leds(&mut self, handle: DeviceHandle) -> Result<(), DeviceError> {
        let slot = self.registry.get_mut(handle)?;
        let seat = slot.seat;
        let frames = match slot.binding.as_mut() {
            Some(binding) => binding.set_player_leds(seat),
            None => Vec::new(),
        };
        for frame in frames {
            self.send_frame(handle, frame);
        }
        Ok(())
    }

    /// Forward a radio on/off toggle from the stack underneath.
    pub fn notify_bluetooth_enabled(&mut self, enabled: bool) {
        info!(enabled, "bluetooth toggled");
        self.platform
            .on_oob_event(None, OobEvent::BluetoothEnabled(enabled));
    }

    /// Log diagnostics for every device.
    pub fn dump_all(&self) {
        self.registry.dump_all();
    }

    // ---- internals ----------------------------------------------------

    fn arm_setup_timer(&mut self, handle: DeviceHandle, now_ms: u64, step_ms: u64) {
        self.clear_setup_timer(handle);
        let timer = self
            .timers
            .arm(now_ms + step_ms, TimerKind::SetupStep, handle);
        if let Ok(slot) = self.registry.get_mut(handle) {
            slot.setup_timer = Some(timer);
        }
    }

    fn clear_setup_timer(&mut self, handle: DeviceHandle) {
        if let Ok(slot) = self.registry.get_mut(handle)
            && let Some(timer) = slot.setup_timer.take()
        {
            self.timers.cancel(timer);
        }
    }

    /// The handshake completed; offer the device to the platform.
    fn begin_ready(&mut self, handle: DeviceHandle, now_ms: u64) {
        let Ok(slot) = self.registry.get_mut(handle) else {
            return;
        };
        if slot.ready_requested {
            let e = DeviceError::DoubleStateTransition("begin ready");
            warn!(index = handle.index, "{e}");
            return;
        }
        slot.ready_requested = true;

        match self.platform.on_device_ready(handle) {
            Vetoable::Accept => self.complete_ready(handle, now_ms),
            Vetoable::Veto => {
                info!(index = handle.index, "device vetoed by application");
                self.disconnect(handle);
            }
        }
    }

    fn complete_ready(&mut self, handle: DeviceHandle, now_ms: u64) {
        let seat = self.registry.next_free_seat();
        let Ok(slot) = self.registry.get_mut(handle) else {
            return;
        };
        if slot.lifecycle == ConnectionState::Ready {
            let e = DeviceError::DoubleStateTransition("complete ready");
            warn!(index = handle.index, "{e}");
            return;
        }
        slot.lifecycle = ConnectionState::Ready;
        if let Some(timer) = slot.guard_timer.take() {
            self.timers.cancel(timer);
        }

        let is_pointer = matches!(slot.family(), Some(Family::Mouse | Family::Keyboard));
        if !is_pointer {
            slot.seat = seat;
        }
        let frames = match slot.binding.as_mut() {
            Some(binding) if !is_pointer => binding.set_player_leds(seat),
            _ => Vec::new(),
        };
        let spawn_child =
            slot.parent.is_none() && slot.binding.as_ref().is_some_and(Binding::spawns_virtual_mouse);
        info!(index = handle.index, seat = seat.player_number(), "device ready");

        for frame in frames {
            self.send_frame(handle, frame);
        }
        if spawn_child {
            match self.create_virtual_mouse(handle, now_ms) {
                Ok(child) => debug!(
                    index = handle.index,
                    child = child.index,
                    "virtual mouse attached"
                ),
                Err(DeviceError::VirtualDisabled) => {}
                Err(e) => warn!(index = handle.index, error = %e, "virtual mouse failed"),
            }
        }
    }

    /// Create the touchpad-as-mouse child for a Sony pad. The child runs
    /// the same ready/veto gate as a real device.
    fn create_virtual_mouse(
        &mut self,
        parent: DeviceHandle,
        now_ms: u64,
    ) -> Result<DeviceHandle, DeviceError> {
        if !self.config.enable_virtual_devices {
            return Err(DeviceError::VirtualDisabled);
        }
        let address = self.registry.get(parent)?.address;
        let child = self.registry.create(address)?;
        {
            let slot = self.registry.get_mut(child)?;
            slot.parent = Some(parent);
            slot.lifecycle = ConnectionState::PendingReady;
            let binding = Binding::new(Family::Mouse, 0);
            binding.init_report(&mut slot.controller);
            slot.binding = Some(binding);
        }
        self.registry.get_mut(parent)?.child = Some(child);
        self.begin_ready(child, now_ms);
        // The platform may have vetoed it inside begin_ready.
        match self.registry.get(child) {
            Ok(_) => Ok(child),
            Err(e) => Err(e),
        }
    }

    fn on_connection_guard(&mut self, handle: DeviceHandle) {
        let Ok(slot) = self.registry.get_mut(handle) else {
            debug!(index = handle.index, "guard timer for stale handle");
            return;
        };
        slot.guard_timer = None;
        if slot.lifecycle == ConnectionState::Ready {
            return;
        }
        let e = DeviceError::ConnectionTimeout {
            index: handle.index,
            timeout_ms: self.config.connection_timeout_ms,
        };
        warn!(state = ?slot.lifecycle, "{e}");
        self.disconnect(handle);
    }

    fn on_setup_step(&mut self, handle: DeviceHandle, now_ms: u64) {
        let Ok(slot) = self.registry.get_mut(handle) else {
            debug!(index = handle.index, "setup timer for stale handle");
            return;
        };
        slot.setup_timer = None;
        let Some(binding) = slot.binding.as_mut() else {
            return;
        };
        let decode = binding.on_setup_timeout();
        let step = binding.setup_step_timeout_ms();
        for frame in decode.frames {
            self.send_frame(handle, frame);
        }
        if decode.ready {
            self.begin_ready(handle, now_ms);
        } else if let Some(step_ms) = step {
            self.arm_setup_timer(handle, now_ms, step_ms);
        }
    }

    fn on_rumble_delay(&mut self, handle: DeviceHandle, now_ms: u64) {
        let Ok(slot) = self.registry.get_mut(handle) else {
            debug!(index = handle.index, "rumble timer for stale handle");
            return;
        };
        let RumbleState::Delayed {
            duration_ms,
            weak,
            strong,
            ..
        } = slot.rumble
        else {
            return;
        };
        let Some(binding) = slot.binding.as_mut() else {
            return;
        };
        let frames = binding.rumble_start(weak, strong);
        let timer = self.timers.arm(
            now_ms + u64::from(duration_ms),
            TimerKind::RumbleDuration,
            handle,
        );
        slot.rumble = RumbleState::InProgress { timer };
        for frame in frames {
            self.send_frame(handle, frame);
        }
    }

    fn on_rumble_duration(&mut self, handle: DeviceHandle) {
        let Ok(slot) = self.registry.get_mut(handle) else {
            debug!(index = handle.index, "rumble timer for stale handle");
            return;
        };
        if !matches!(slot.rumble, RumbleState::InProgress { .. }) {
            return;
        }
        slot.rumble = RumbleState::Disabled;
        let frames = match slot.binding.as_mut() {
            Some(binding) => binding.rumble_stop(),
            None => Vec::new(),
        };
        for frame in frames {
            self.send_frame(handle, frame);
        }
    }

    /// Deliver the committed snapshot: system button edge handling, remap,
    /// suppress-if-identical, platform callback.
    fn deliver(&mut self, handle: DeviceHandle, now_ms: u64) {
        let cooldown_ms = self.config.misc_button_cooldown_ms;
        let Ok(slot) = self.registry.get_mut(handle) else {
            return;
        };
        let Some(binding) = slot.binding.as_ref() else {
            return;
        };
        let family = binding.family;
        let suppress = binding.suppress_identical();

        let mut out = slot.controller.clone();
        let mut oob = false;
        if let Some(gp) = out.gamepad_mut() {
            let pressed = gp.misc_buttons & misc_button::SYSTEM != 0;
            if pressed {
                if slot.misc_latched || slot.misc_cooldown {
                    gp.misc_buttons &= !misc_button::SYSTEM;
                } else {
                    slot.misc_latched = true;
                    oob = true;
                    if family == Family::Switch {
                        // Switch reports deliver press and release
                        // back-to-back; a cooldown keeps one physical press
                        // from registering twice.
                        slot.misc_cooldown = true;
                        let timer = self.timers.arm(
                            now_ms + cooldown_ms,
                            TimerKind::MiscCooldown,
                            handle,
                        );
                        debug!(index = handle.index, timer = ?timer, "misc cooldown armed");
                    }
                }
            } else {
                slot.misc_latched = false;
            }
        }
        if let ControllerState::Gamepad(gp) = &out.state {
            out.state = ControllerState::Gamepad(remap(&self.config.mappings, gp));
        }

        if suppress && slot.last_delivered.as_ref() == Some(&out) {
            return;
        }
        slot.last_delivered = Some(out.clone());

        if oob {
            self.platform
                .on_oob_event(Some(handle), OobEvent::SystemButton);
        }
        self.platform.on_controller_data(handle, &out);
    }

    /// Copy the parent-decoded touchpad mouse into the child and deliver
    /// it under the child's handle.
    fn deliver_virtual_mouse(&mut self, parent: DeviceHandle) {
        let Ok(parent_slot) = self.registry.get(parent) else {
            return;
        };
        let Some(child) = parent_slot.child else {
            return;
        };
        let snapshot = parent_slot.virtual_mouse.clone();
        let Ok(child_slot) = self.registry.get_mut(child) else {
            return;
        };
        if child_slot.lifecycle != ConnectionState::Ready {
            return;
        }
        child_slot.controller = snapshot.clone();
        if child_slot.last_delivered.as_ref() == Some(&snapshot) {
            return;
        }
        child_slot.last_delivered = Some(snapshot.clone());
        self.platform.on_controller_data(child, &snapshot);
    }

    /// Try to write a frame; queue it when the channel is busy.
    fn send_frame(&mut self, handle: DeviceHandle, frame: WireFrame) {
        let Ok(slot) = self.registry.get(handle) else {
            return;
        };
        let (channel_id, payload) = match frame {
            WireFrame::Control(p) => (slot.control_cid, p),
            WireFrame::Interrupt(p) => (slot.interrupt_cid, p),
        };
        if channel_id == 0 {
            debug!(index = handle.index, "frame dropped, channel not open");
            return;
        }
        match self.transport.send(channel_id, &payload) {
            Ok(()) => {}
            Err(SendError::Busy) => {
                let Ok(slot) = self.registry.get_mut(handle) else {
                    return;
                };
                let queued = slot.outgoing.push(PendingFrame {
                    channel_id,
                    payload,
                });
                if !queued {
                    error!(
                        index = handle.index,
                        channel_id, "outgoing ring full, frame dropped"
                    );
                }
                self.transport.request_can_send_now(channel_id);
            }
            Err(SendError::Closed) => {
                warn!(index = handle.index, channel_id, "send on closed channel");
            }
        }
    }
}
