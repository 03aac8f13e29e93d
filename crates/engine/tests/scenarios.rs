//! End-to-end engine scenarios over fake platform and transport ports.

#![allow(clippy::unwrap_used)]

use hid_switch_protocol::HandshakeState;
use padhost_controller_types::gamepad::misc_button;
use padhost_controller_types::{Controller, ControllerState};
use padhost_engine::family::FamilyState;
use padhost_engine::{
    BdAddr, ConnectionState, DeviceHandle, Engine, EngineConfig, OobEvent, Platform, RumbleState,
    SendError, Transport, Vetoable,
};
use padhost_errors::DeviceError;

/// Records every callback; vetoes the ready of one slot index when asked.
#[derive(Default)]
struct FakePlatform {
    connected: Vec<DeviceHandle>,
    disconnected: Vec<DeviceHandle>,
    ready: Vec<DeviceHandle>,
    data: Vec<(DeviceHandle, Controller)>,
    oob: Vec<(Option<DeviceHandle>, OobEvent)>,
    veto_index: Option<u8>,
}

impl Platform for FakePlatform {
    fn on_device_connected(&mut self, handle: DeviceHandle) {
        self.connected.push(handle);
    }

    fn on_device_disconnected(&mut self, handle: DeviceHandle) {
        self.disconnected.push(handle);
    }

    fn on_device_ready(&mut self, handle: DeviceHandle) -> Vetoable {
        self.ready.push(handle);
        if self.veto_index == Some(handle.index) {
            Vetoable::Veto
        } else {
            Vetoable::Accept
        }
    }

    fn on_controller_data(&mut self, handle: DeviceHandle, controller: &Controller) {
        self.data.push((handle, controller.clone()));
    }

    fn on_oob_event(&mut self, device: Option<DeviceHandle>, event: OobEvent) {
        self.oob.push((device, event));
    }
}

/// Records sends; refuses them all while `busy`.
#[derive(Default)]
struct FakeTransport {
    sent: Vec<(u16, Vec<u8>)>,
    csn_requests: Vec<u16>,
    busy: bool,
}

impl Transport for FakeTransport {
    fn send(&mut self, channel_id: u16, frame: &[u8]) -> Result<(), SendError> {
        if self.busy {
            return Err(SendError::Busy);
        }
        self.sent.push((channel_id, frame.to_vec()));
        Ok(())
    }

    fn request_can_send_now(&mut self, channel_id: u16) {
        self.csn_requests.push(channel_id);
    }
}

const CONTROL_CID: u16 = 0x40;
const INTERRUPT_CID: u16 = 0x41;

fn engine(config: EngineConfig) -> Engine<FakePlatform, FakeTransport> {
    static TRACING: std::sync::Once = std::sync::Once::new();
    TRACING.call_once(|| tracing_subscriber::fmt().with_test_writer().init());
    Engine::new(config, FakePlatform::default(), FakeTransport::default())
}

fn addr(last: u8) -> BdAddr {
    BdAddr([0x00, 0x1b, 0xdc, 0x00, 0x00, last])
}

/// Connect, identify and pair a device in one go.
fn pair(
    engine: &mut Engine<FakePlatform, FakeTransport>,
    address: BdAddr,
    vendor_id: u16,
    product_id: u16,
    now_ms: u64,
) -> DeviceHandle {
    let handle = engine.connect(address, true, now_ms).unwrap();
    engine
        .set_vendor_product(handle, vendor_id, product_id)
        .unwrap();
    engine
        .on_channels_open(handle, CONTROL_CID, INTERRUPT_CID, 0x0b)
        .unwrap();
    engine.on_pairing_complete(handle, now_ms).unwrap();
    handle
}

/// An extended DS4 input report as it arrives on the interrupt channel,
/// HIDP DATA transaction byte included.
fn ds4_report(stick_x: u8, ps_pressed: bool) -> Vec<u8> {
    let mut bytes = vec![0u8; 79];
    bytes[0] = 0xa1;
    bytes[1] = 0x11;
    let payload = &mut bytes[4..];
    payload[0] = stick_x; // left stick X
    payload[1] = 127;
    payload[2] = 127;
    payload[3] = 127;
    payload[4] = 0x08; // hat released
    payload[6] = u8::from(ps_pressed);
    payload[29] = 0x08; // battery nibble
    bytes
}

fn delivered_axis_x(data: &(DeviceHandle, Controller)) -> i32 {
    match &data.1.state {
        ControllerState::Gamepad(gp) => gp.axis_x,
        other => panic!("expected a gamepad snapshot, got {other:?}"),
    }
}

#[test]
fn ds4_pairs_decodes_and_delivers() {
    let mut engine = engine(EngineConfig::default());
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);

    // Setup sent an output report and a calibration GET_REPORT, and the
    // family is ready at once: device accepted, touchpad mouse attached.
    let sent = &engine.transport().sent;
    assert!(sent.iter().any(|(cid, _)| *cid == INTERRUPT_CID));
    assert!(sent.iter().any(|(cid, f)| *cid == CONTROL_CID && f[0] == 0x43));
    assert_eq!(engine.platform().ready.len(), 2);
    assert_eq!(engine.registry().len(), 2);
    let slot = engine.registry().get(handle).unwrap();
    assert_eq!(slot.lifecycle, ConnectionState::Ready);
    assert!(slot.child.is_some());

    engine.on_report_received(handle, &ds4_report(200, false), 10);
    let gamepad_data: Vec<_> = engine
        .platform()
        .data
        .iter()
        .filter(|(h, _)| *h == handle)
        .collect();
    assert_eq!(gamepad_data.len(), 1);
    assert_eq!(delivered_axis_x(gamepad_data[0]), (200 - 127) * 4);
}

#[test]
fn malformed_report_leaves_snapshot_untouched() {
    let mut engine = engine(EngineConfig::default());
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);

    engine.on_report_received(handle, &ds4_report(200, false), 10);
    let before = engine.registry().get(handle).unwrap().controller.clone();
    let delivered = engine.platform().data.len();

    // Right id, wrong length: rejected before commit.
    let mut bad = ds4_report(50, false);
    bad.truncate(40);
    engine.on_report_received(handle, &bad, 20);

    assert_eq!(engine.registry().get(handle).unwrap().controller, before);
    assert_eq!(engine.platform().data.len(), delivered);
}

#[test]
fn system_button_is_edge_triggered() {
    let mut engine = engine(EngineConfig::default());
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);

    engine.on_report_received(handle, &ds4_report(127, true), 10);
    engine.on_report_received(handle, &ds4_report(127, true), 20);
    assert_eq!(engine.platform().oob.len(), 1);
    assert_eq!(
        engine.platform().oob[0],
        (Some(handle), OobEvent::SystemButton)
    );

    // The first snapshot carries the press, the held repeat does not.
    let snapshots: Vec<u8> = engine
        .platform()
        .data
        .iter()
        .filter(|(h, _)| *h == handle)
        .map(|(_, c)| match &c.state {
            ControllerState::Gamepad(gp) => gp.misc_buttons,
            _ => 0,
        })
        .collect();
    assert_eq!(snapshots[0] & misc_button::SYSTEM, misc_button::SYSTEM);
    assert_eq!(snapshots[1] & misc_button::SYSTEM, 0);

    // Release re-arms the edge.
    engine.on_report_received(handle, &ds4_report(127, false), 30);
    engine.on_report_received(handle, &ds4_report(127, true), 40);
    assert_eq!(engine.platform().oob.len(), 2);
}

#[test]
fn immediate_rumble_starts_and_expires() {
    let mut engine = engine(EngineConfig::default());
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);
    engine.transport_mut().sent.clear();

    engine
        .play_dual_rumble(handle, 0, 250, 200, 100, 1_000)
        .unwrap();
    assert_eq!(engine.transport().sent.len(), 1);
    assert_eq!(engine.transport().sent[0].0, INTERRUPT_CID);
    assert!(matches!(
        engine.registry().get(handle).unwrap().rumble,
        RumbleState::InProgress { .. }
    ));
    assert_eq!(engine.timers().live(), 1);
    assert_eq!(engine.next_timer_deadline(), Some(1_250));

    engine.process_timers(1_250);
    assert_eq!(engine.transport().sent.len(), 2);
    assert_eq!(
        engine.registry().get(handle).unwrap().rumble,
        RumbleState::Disabled
    );
    assert_eq!(engine.timers().live(), 0);
}

#[test]
fn delayed_rumble_waits_for_its_timer() {
    let mut engine = engine(EngineConfig::default());
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);
    engine.transport_mut().sent.clear();

    engine.play_dual_rumble(handle, 100, 250, 60, 60, 0).unwrap();
    assert!(engine.transport().sent.is_empty());
    assert!(matches!(
        engine.registry().get(handle).unwrap().rumble,
        RumbleState::Delayed { .. }
    ));

    engine.process_timers(100);
    assert_eq!(engine.transport().sent.len(), 1);
    engine.process_timers(350);
    assert_eq!(engine.transport().sent.len(), 2);
    assert_eq!(
        engine.registry().get(handle).unwrap().rumble,
        RumbleState::Disabled
    );
}

#[test]
fn rumble_reschedule_keeps_one_timer() {
    let mut engine = engine(EngineConfig::default());
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);

    engine.play_dual_rumble(handle, 0, 500, 255, 255, 0).unwrap();
    engine.play_dual_rumble(handle, 50, 500, 255, 255, 10).unwrap();
    engine.play_dual_rumble(handle, 0, 500, 255, 255, 20).unwrap();
    assert_eq!(engine.timers().live(), 1);

    // duration 0 while playing stops the effect.
    engine.transport_mut().sent.clear();
    engine.play_dual_rumble(handle, 0, 0, 0, 0, 30).unwrap();
    assert_eq!(engine.transport().sent.len(), 1);
    assert_eq!(
        engine.registry().get(handle).unwrap().rumble,
        RumbleState::Disabled
    );
    assert_eq!(engine.timers().live(), 0);

    // duration 0 while idle is ignored on families that keep rumble armed.
    engine.transport_mut().sent.clear();
    engine.play_dual_rumble(handle, 0, 0, 0, 0, 40).unwrap();
    assert!(engine.transport().sent.is_empty());
}

#[test]
fn busy_channel_queues_and_drains_one_per_grant() {
    let mut engine = engine(EngineConfig {
        outgoing_capacity: 2,
        ..EngineConfig::default()
    });
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);
    engine.transport_mut().sent.clear();
    engine.transport_mut().busy = true;

    for i in 0..3u8 {
        engine.set_lightbar_color(handle, i, 0, 0).unwrap();
    }
    // Two queued, the third dropped; every refusal asked for a grant.
    assert!(engine.transport().sent.is_empty());
    assert_eq!(engine.registry().get(handle).unwrap().outgoing.len(), 2);
    assert_eq!(engine.transport().csn_requests.len(), 3);

    engine.transport_mut().busy = false;
    engine.on_can_send_now(INTERRUPT_CID);
    assert_eq!(engine.transport().sent.len(), 1);
    assert_eq!(engine.registry().get(handle).unwrap().outgoing.len(), 1);
    // More frames are waiting, so another grant was requested.
    assert_eq!(engine.transport().csn_requests.len(), 4);

    engine.on_can_send_now(INTERRUPT_CID);
    assert_eq!(engine.transport().sent.len(), 2);
    assert!(engine.registry().get(handle).unwrap().outgoing.is_empty());
}

#[test]
fn switch_setup_step_timeout_forces_one_advance() {
    let mut engine = engine(EngineConfig::default());
    let handle = pair(&mut engine, addr(1), 0x057e, 0x2009, 0);

    let state_of = |engine: &Engine<FakePlatform, FakeTransport>| {
        match &engine.registry().get(handle).unwrap().binding.as_ref().unwrap().state {
            FamilyState::Switch(dev) => dev.state(),
            other => panic!("expected a switch binding, got {other:?}"),
        }
    };
    assert_eq!(state_of(&engine), HandshakeState::ReqDevInfo);
    assert!(engine.platform().ready.is_empty());
    assert_eq!(
        engine.next_timer_deadline(),
        Some(hid_switch_protocol::SETUP_TIMEOUT_MS)
    );

    let sent_before = engine.transport().sent.len();
    engine.process_timers(hid_switch_protocol::SETUP_TIMEOUT_MS);
    assert_eq!(state_of(&engine), HandshakeState::ReadFactoryStickCal);
    assert_eq!(engine.transport().sent.len(), sent_before + 1);
    // The step guard was re-armed for the next subcommand.
    assert_eq!(
        engine
            .timers()
            .next_deadline(),
        Some(hid_switch_protocol::SETUP_TIMEOUT_MS * 2)
    );
}

#[test]
fn vetoed_virtual_mouse_detaches_from_parent() {
    let mut engine = Engine::new(
        EngineConfig::default(),
        FakePlatform {
            // The child lands in the second slot.
            veto_index: Some(1),
            ..FakePlatform::default()
        },
        FakeTransport::default(),
    );
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);

    assert_eq!(engine.platform().ready.len(), 2);
    assert_eq!(engine.platform().disconnected.len(), 1);
    assert_eq!(engine.registry().len(), 1);
    assert_eq!(engine.registry().get(handle).unwrap().child, None);

    let child = engine.platform().ready[1];
    assert!(matches!(
        engine.registry().get(child),
        Err(DeviceError::StaleHandle { .. })
    ));
}

#[test]
fn disabled_virtual_devices_spawn_nothing() {
    let mut engine = engine(EngineConfig {
        enable_virtual_devices: false,
        ..EngineConfig::default()
    });
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);

    assert_eq!(engine.platform().ready.len(), 1);
    assert_eq!(engine.registry().len(), 1);
    assert_eq!(engine.registry().get(handle).unwrap().child, None);
}

#[test]
fn disconnect_takes_the_child_along() {
    let mut engine = engine(EngineConfig::default());
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);
    let child = engine.registry().get(handle).unwrap().child.unwrap();

    engine.disconnect(handle);
    assert!(engine.registry().is_empty());
    assert_eq!(engine.platform().disconnected.len(), 2);
    assert_eq!(engine.timers().live(), 0);

    // Both handles are stale; a second disconnect is a no-op.
    engine.disconnect(handle);
    engine.disconnect(child);
    assert_eq!(engine.platform().disconnected.len(), 2);
}

#[test]
fn guard_timer_reaps_a_stuck_connection() {
    let mut engine = engine(EngineConfig::default());
    let handle = engine.connect(addr(1), false, 0).unwrap();
    engine
        .on_channels_open(handle, CONTROL_CID, INTERRUPT_CID, 0x0b)
        .unwrap();

    engine.process_timers(EngineConfig::default().connection_timeout_ms);
    assert!(engine.registry().is_empty());
    assert!(matches!(
        engine.registry().get(handle),
        Err(DeviceError::StaleHandle { .. })
    ));
}

#[test]
fn ready_device_outlives_its_guard_deadline() {
    let mut engine = engine(EngineConfig::default());
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);

    engine.process_timers(EngineConfig::default().connection_timeout_ms + 1);
    assert_eq!(
        engine.registry().get(handle).unwrap().lifecycle,
        ConnectionState::Ready
    );
}

#[test]
fn lifecycle_transitions_never_repeat() {
    let mut engine = engine(EngineConfig::default());
    let handle = engine.connect(addr(1), false, 0).unwrap();
    engine
        .on_channels_open(handle, CONTROL_CID, INTERRUPT_CID, 0x0b)
        .unwrap();
    assert_eq!(
        engine.on_channels_open(handle, CONTROL_CID, INTERRUPT_CID, 0x0b),
        Err(DeviceError::DoubleStateTransition("channels open"))
    );

    engine
        .set_vendor_product(handle, 0x054c, 0x05c4)
        .unwrap();
    engine.on_pairing_complete(handle, 0).unwrap();
    assert_eq!(
        engine.on_pairing_complete(handle, 0),
        Err(DeviceError::DoubleStateTransition("pairing complete"))
    );
}

#[test]
fn radio_toggle_reaches_the_platform_without_a_device() {
    let mut engine = engine(EngineConfig::default());
    engine.notify_bluetooth_enabled(true);
    engine.notify_bluetooth_enabled(false);
    assert_eq!(
        engine.platform().oob,
        vec![
            (None, OobEvent::BluetoothEnabled(true)),
            (None, OobEvent::BluetoothEnabled(false)),
        ]
    );
}

#[test]
fn pool_exhaustion_is_an_error_not_a_panic() {
    let mut engine = engine(EngineConfig::default());
    for i in 0..8 {
        engine.connect(addr(i), false, 0).unwrap();
    }
    assert_eq!(
        engine.connect(addr(0xff), false, 0),
        Err(DeviceError::PoolExhausted)
    );
}

#[test]
fn virtual_mouse_snapshots_deliver_under_the_child_handle() {
    let mut engine = engine(EngineConfig::default());
    let handle = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);
    let child = engine.registry().get(handle).unwrap().child.unwrap();

    engine.on_report_received(handle, &ds4_report(127, false), 10);
    let mouse_data: Vec<_> = engine
        .platform()
        .data
        .iter()
        .filter(|(h, _)| *h == child)
        .collect();
    assert_eq!(mouse_data.len(), 1);
    assert!(matches!(mouse_data[0].1.state, ControllerState::Mouse(_)));

    // An identical idle touchpad snapshot is suppressed.
    engine.on_report_received(handle, &ds4_report(127, false), 20);
    let mouse_count = engine
        .platform()
        .data
        .iter()
        .filter(|(h, _)| *h == child)
        .count();
    assert_eq!(mouse_count, 1);
}

#[test]
fn timers_fire_in_deadline_order_across_devices() {
    let mut engine = engine(EngineConfig::default());
    let first = pair(&mut engine, addr(1), 0x054c, 0x05c4, 0);
    let second = pair(&mut engine, addr(2), 0x054c, 0x05c4, 0);

    engine.play_dual_rumble(second, 0, 100, 9, 9, 0).unwrap();
    engine.play_dual_rumble(first, 0, 300, 9, 9, 0).unwrap();
    assert_eq!(engine.next_timer_deadline(), Some(100));

    engine.process_timers(100);
    assert_eq!(
        engine.registry().get(second).unwrap().rumble,
        RumbleState::Disabled
    );
    assert!(matches!(
        engine.registry().get(first).unwrap().rumble,
        RumbleState::InProgress { .. }
    ));

    engine.process_timers(300);
    assert_eq!(engine.timers().live(), 0);
}
