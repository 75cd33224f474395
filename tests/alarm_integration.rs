//! Integration tests: keypad → AlarmController → status transitions.

use std::cell::Cell;
use std::collections::VecDeque;

use homeguard::alarm::AlarmController;
use homeguard::alarm::StateOutcome;
use homeguard::app::ports::{
    KeypadPort, MenuAction, Notice, StoragePort, TimePort, UiPort,
};
use homeguard::bridge::types::{Credential, NetworkInfo, ScannedNetwork};
use homeguard::config::SystemConfig;
use homeguard::error::StorageError;
use homeguard::identity::IdentityStore;
use homeguard::keys::Key;
use homeguard::mesh::roster::SensorRecord;
use homeguard::mesh::wire::{SensorKind, SensorState};
use homeguard::mesh::SensorMesh;
use homeguard::status::{AlertCause, ArmMethod, ArmState};

// ── Mock implementations ──────────────────────────────────────

struct TestClock(Cell<u64>);

impl TestClock {
    fn new() -> Self {
        Self(Cell::new(0))
    }
    fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl TimePort for TestClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}

struct ScriptKeypad {
    keys: VecDeque<Key>,
}

impl ScriptKeypad {
    fn new(symbols: &[u8]) -> Self {
        Self {
            keys: symbols.iter().filter_map(|&b| Key::from_ascii(b)).collect(),
        }
    }
    fn empty() -> Self {
        Self {
            keys: VecDeque::new(),
        }
    }
}

impl KeypadPort for ScriptKeypad {
    fn poll_key(&mut self) -> Option<Key> {
        self.keys.pop_front()
    }
}

#[derive(Default)]
struct MockUi {
    notices: Vec<Notice>,
    countdowns: Vec<u16>,
    siren_on: bool,
}

impl UiPort for MockUi {
    fn show_status(&mut self, _: &homeguard::status::AlarmStatus, _: u8, _: u8, _: i32) {}
    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
    fn show_arm_countdown(&mut self, secs_left: u16) {
        self.countdowns.push(secs_left);
    }
    fn show_pin_progress(&mut self, _: usize) {}
    fn siren(&mut self, on: bool) {
        self.siren_on = on;
    }
    fn show_network_info(&mut self, _: &NetworkInfo) {}
    fn choose_menu(&mut self) -> Option<MenuAction> {
        None
    }
    fn choose_network(&mut self, _: &[ScannedNetwork]) -> Option<usize> {
        None
    }
    fn read_credential(&mut self) -> Credential {
        Credential::default()
    }
}

#[derive(Default)]
struct MockStorage {
    store: std::collections::HashMap<String, Vec<u8>>,
}

impl StoragePort for MockStorage {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.store.get(&format!("{ns}::{key}")) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }
    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store.insert(format!("{ns}::{key}"), data.to_vec());
        Ok(())
    }
    fn exists(&self, ns: &str, key: &str) -> bool {
        self.store.contains_key(&format!("{ns}::{key}"))
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn controller(clock: &TestClock) -> AlarmController {
    let mut pin = heapless::String::new();
    pin.push_str("1234").unwrap();
    AlarmController::new(SystemConfig::default(), pin, clock)
}

fn mesh_with_sensor(clock: &TestClock, kind: SensorKind) -> SensorMesh {
    let mut mesh = SensorMesh::new(42, 1);
    mesh.roster.register(SensorRecord {
        id: 1,
        kind,
        state: SensorState::Ping,
        last_seen_ms: clock.now_ms(),
    });
    mesh
}

// ── Arming ────────────────────────────────────────────────────

#[test]
fn correct_pin_and_option_b_arms_stay() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ui = MockUi::default();
    let mut keypad = ScriptKeypad::new(b"1234#B");

    let outcome = ctrl.request_state_change(&mut keypad, &mut ui, &clock, &mut mesh);

    assert_eq!(outcome, StateOutcome::Changed);
    let status = ctrl.status();
    assert_eq!(status.state, ArmState::Armed);
    assert_eq!(status.method, ArmMethod::Stay);
    assert!(ui.countdowns.is_empty());
    assert!(ui.notices.contains(&Notice::PinCorrect));
}

#[test]
fn option_a_arms_away_after_visible_countdown() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Pir);
    let mut ui = MockUi::default();
    let mut keypad = ScriptKeypad::new(b"1234#A");

    ctrl.request_state_change(&mut keypad, &mut ui, &clock, &mut mesh);

    assert_eq!(ctrl.status().method, ArmMethod::Away);
    // Default 30 second countdown, counting down to 1.
    assert_eq!(ui.countdowns.len(), 30);
    assert_eq!(ui.countdowns.first(), Some(&30));
    assert_eq!(ui.countdowns.last(), Some(&1));
}

#[test]
fn method_dialog_timeout_defaults_to_stay() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ui = MockUi::default();
    // Correct PIN, then no dialog input at all.
    let mut keypad = ScriptKeypad::new(b"1234#");

    ctrl.request_state_change(&mut keypad, &mut ui, &clock, &mut mesh);

    assert_eq!(ctrl.status().state, ArmState::Armed);
    assert_eq!(ctrl.status().method, ArmMethod::Stay);
}

#[test]
fn arming_refused_while_a_sensor_is_offline() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    // Silence the sensor past the offline threshold.
    clock.advance(31_000);
    let mut ui = MockUi::default();
    let mut keypad = ScriptKeypad::new(b"1234#");

    let outcome = ctrl.request_state_change(&mut keypad, &mut ui, &clock, &mut mesh);

    assert_eq!(outcome, StateOutcome::Refused { offline_slot: 0 });
    assert_eq!(ctrl.status().state, ArmState::Disarmed);
    assert!(ui.notices.contains(&Notice::ArmRefusedSensorsOffline));
}

#[test]
fn backspace_recovers_a_mistyped_pin() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ui = MockUi::default();
    // 129 <backspace> <backspace> 234 # B
    let mut keypad = ScriptKeypad::new(b"129**234#B");

    let outcome = ctrl.request_state_change(&mut keypad, &mut ui, &clock, &mut mesh);

    assert_eq!(outcome, StateOutcome::Changed);
    assert_eq!(ctrl.status().state, ArmState::Armed);
}

// ── Disarming and failed entries ──────────────────────────────

fn armed_controller(clock: &TestClock, mesh: &mut SensorMesh) -> AlarmController {
    let mut ctrl = controller(clock);
    let mut ui = MockUi::default();
    let mut keypad = ScriptKeypad::new(b"1234#B");
    ctrl.request_state_change(&mut keypad, &mut ui, clock, mesh);
    assert_eq!(ctrl.status().state, ArmState::Armed);
    ctrl
}

#[test]
fn correct_pin_disarms() {
    let clock = TestClock::new();
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ctrl = armed_controller(&clock, &mut mesh);
    let mut ui = MockUi::default();
    let mut keypad = ScriptKeypad::new(b"1234#");

    let outcome = ctrl.request_state_change(&mut keypad, &mut ui, &clock, &mut mesh);

    assert_eq!(outcome, StateOutcome::Changed);
    assert_eq!(ctrl.status(), homeguard::status::AlarmStatus::disarmed());
    assert!(!ui.siren_on);
}

#[test]
fn wrong_pin_while_armed_raises_alert() {
    let clock = TestClock::new();
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ctrl = armed_controller(&clock, &mut mesh);
    let mut ui = MockUi::default();
    let mut keypad = ScriptKeypad::new(b"9999#");

    let outcome = ctrl.request_state_change(&mut keypad, &mut ui, &clock, &mut mesh);

    assert_eq!(outcome, StateOutcome::Changed);
    assert_eq!(ctrl.status().state, ArmState::Alert);
    assert!(ui.notices.contains(&Notice::PinIncorrect));
}

#[test]
fn pin_timeout_while_armed_raises_alert() {
    let clock = TestClock::new();
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ctrl = armed_controller(&clock, &mut mesh);
    let mut ui = MockUi::default();
    let mut keypad = ScriptKeypad::empty();

    let outcome = ctrl.request_state_change(&mut keypad, &mut ui, &clock, &mut mesh);

    assert_eq!(outcome, StateOutcome::Changed);
    assert_eq!(ctrl.status().state, ArmState::Alert);
    assert!(ui.notices.contains(&Notice::PinTimedOut));
}

#[test]
fn wrong_pin_while_disarmed_changes_nothing() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ui = MockUi::default();
    let mut keypad = ScriptKeypad::new(b"0000#");

    let outcome = ctrl.request_state_change(&mut keypad, &mut ui, &clock, &mut mesh);

    assert_eq!(outcome, StateOutcome::Unchanged);
    assert_eq!(ctrl.status().state, ArmState::Disarmed);
}

// ── Grace window ──────────────────────────────────────────────

#[test]
fn sustained_trigger_alerts_after_grace_window() {
    let clock = TestClock::new();
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ctrl = armed_controller(&clock, &mut mesh);

    mesh.roster.update(1, SensorState::Triggered, clock.now_ms());
    assert_eq!(ctrl.evaluate_triggers(&clock, &mesh), None);
    assert_eq!(ctrl.status().state, ArmState::Armed);
    assert_eq!(ctrl.status().cause, AlertCause::OneTriggered);

    // Still within the 10 s window.
    clock.advance(9_000);
    mesh.roster.update(1, SensorState::Triggered, clock.now_ms());
    assert_eq!(ctrl.evaluate_triggers(&clock, &mesh), None);

    clock.advance(1_000);
    mesh.roster.update(1, SensorState::Triggered, clock.now_ms());
    assert_eq!(
        ctrl.evaluate_triggers(&clock, &mesh),
        Some(AlertCause::OneTriggered)
    );
    assert_eq!(ctrl.status().state, ArmState::Alert);
}

#[test]
fn trigger_clearing_resets_the_grace_window() {
    let clock = TestClock::new();
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ctrl = armed_controller(&clock, &mut mesh);

    mesh.roster.update(1, SensorState::Triggered, clock.now_ms());
    clock.advance(9_000);
    ctrl.evaluate_triggers(&clock, &mesh);

    // Sensor goes quiet again; the window restarts from here.
    mesh.roster.update(1, SensorState::Ping, clock.now_ms());
    ctrl.evaluate_triggers(&clock, &mesh);
    assert_eq!(ctrl.status().cause, AlertCause::None);

    clock.advance(9_000);
    mesh.roster.update(1, SensorState::Triggered, clock.now_ms());
    assert_eq!(ctrl.evaluate_triggers(&clock, &mesh), None);
    assert_eq!(ctrl.status().state, ArmState::Armed);
}

#[test]
fn multiple_triggered_sensors_report_many() {
    let clock = TestClock::new();
    let mut mesh = SensorMesh::new(42, 1);
    for id in [1u8, 2] {
        mesh.roster.register(SensorRecord {
            id,
            kind: SensorKind::Magnet,
            state: SensorState::Ping,
            last_seen_ms: 0,
        });
    }
    let mut ctrl = armed_controller(&clock, &mut mesh);

    for id in [1u8, 2] {
        mesh.roster.update(id, SensorState::Triggered, clock.now_ms());
    }
    clock.advance(10_000);
    for id in [1u8, 2] {
        mesh.roster.update(id, SensorState::Triggered, clock.now_ms());
    }
    assert_eq!(
        ctrl.evaluate_triggers(&clock, &mesh),
        Some(AlertCause::ManyTriggered)
    );
}

// ── Health sweep ──────────────────────────────────────────────

#[test]
fn offline_sensor_while_armed_alerts_immediately() {
    let clock = TestClock::new();
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ctrl = armed_controller(&clock, &mut mesh);
    let mut ui = MockUi::default();

    // Sweep runs on its 10 s cadence; sensor has been silent for 31 s.
    clock.advance(31_000);
    assert_eq!(
        ctrl.check_health(&mut ui, &clock, &mesh),
        Some(AlertCause::Offline)
    );
    assert_eq!(ctrl.status().state, ArmState::Alert);
    assert_eq!(ctrl.status().cause, AlertCause::Offline);
}

#[test]
fn offline_sensor_while_disarmed_only_notifies() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ui = MockUi::default();

    clock.advance(31_000);
    assert_eq!(ctrl.check_health(&mut ui, &clock, &mesh), None);
    assert_eq!(ctrl.status().state, ArmState::Disarmed);
    assert!(ui.notices.contains(&Notice::SensorOffline { slot: 0 }));
}

#[test]
fn low_battery_notified_only_while_responsive() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ui = MockUi::default();

    clock.advance(10_000);
    mesh.roster
        .update(1, SensorState::BatteryLow, clock.now_ms());
    assert_eq!(ctrl.check_health(&mut ui, &clock, &mesh), None);
    assert!(ui.notices.contains(&Notice::SensorLowBattery { slot: 0 }));
}

#[test]
fn health_sweep_respects_its_cadence() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ui = MockUi::default();

    // Before the first 10 s cadence boundary, nothing is checked.
    clock.advance(5_000);
    ctrl.check_health(&mut ui, &clock, &mesh);
    assert!(ui.notices.is_empty());
}

// ── Remote status ─────────────────────────────────────────────

#[test]
fn remote_disarm_silences_an_alert() {
    let clock = TestClock::new();
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ctrl = armed_controller(&clock, &mut mesh);
    let mut ui = MockUi::default();

    clock.advance(31_000);
    ctrl.check_health(&mut ui, &clock, &mesh);
    assert_eq!(ctrl.status().state, ArmState::Alert);

    let changed =
        ctrl.apply_remote_status(&mut ui, &clock, &mut mesh, ArmState::Disarmed, ArmMethod::None);
    assert!(changed);
    assert_eq!(ctrl.status(), homeguard::status::AlarmStatus::disarmed());
}

#[test]
fn matching_remote_status_is_a_no_op() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut ui = MockUi::default();

    let changed =
        ctrl.apply_remote_status(&mut ui, &clock, &mut mesh, ArmState::Disarmed, ArmMethod::None);
    assert!(!changed);
    assert!(ui.notices.is_empty());
}

// ── PIN management ────────────────────────────────────────────

#[test]
fn change_pin_verifies_current_and_persists_new() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut ui = MockUi::default();
    let mut store = IdentityStore::new(MockStorage::default());
    store.init_if_first_boot().unwrap();
    // Current PIN, then the replacement.
    let mut keypad = ScriptKeypad::new(b"1234#5678#");

    let changed = ctrl
        .change_pin(&mut keypad, &mut ui, &clock, &mut store)
        .unwrap();

    assert!(changed);
    assert_eq!(store.pin().unwrap().as_str(), "5678");
    assert!(ui.notices.contains(&Notice::PinChanged));
}

#[test]
fn change_pin_rejected_on_wrong_current_pin() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut ui = MockUi::default();
    let mut store = IdentityStore::new(MockStorage::default());
    store.init_if_first_boot().unwrap();
    let mut keypad = ScriptKeypad::new(b"1111#5678#");

    let changed = ctrl
        .change_pin(&mut keypad, &mut ui, &clock, &mut store)
        .unwrap();

    assert!(!changed);
    assert_eq!(store.pin().unwrap().as_str(), "1234");
}

#[test]
fn load_defaults_restores_factory_pin() {
    let clock = TestClock::new();
    let mut ctrl = controller(&clock);
    let mut ui = MockUi::default();
    let mut store = IdentityStore::new(MockStorage::default());
    store.init_if_first_boot().unwrap();
    store.set_pin("9999").unwrap();

    ctrl.load_default_pin(&mut ui, &mut store).unwrap();
    assert_eq!(store.pin().unwrap().as_str(), "1234");

    // The cached PIN follows: the factory PIN now disarms.
    let mut mesh = mesh_with_sensor(&clock, SensorKind::Magnet);
    let mut keypad = ScriptKeypad::new(b"1234#B");
    let outcome = ctrl.request_state_change(&mut keypad, &mut ui, &clock, &mut mesh);
    assert_eq!(outcome, StateOutcome::Changed);
}
