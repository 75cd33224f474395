//! The cooperative main loop.
//!
//! One [`AlarmService`] instance owns the serial bridge, the sensor mesh,
//! the persisted identity and the alarm controller. Each loop iteration
//! polls in a fixed order: serial, alert handling, sensor health, radio,
//! keypad. Everything is pull-based; no component calls back into the loop.

use log::{info, warn};

use crate::alarm::dialog::{choice_dialog, Choice};
use crate::alarm::{AlarmController, StateOutcome};
use crate::app::events::AppEvent;
use crate::app::ports::{
    EventSink, KeypadPort, MenuAction, Notice, PairingBus, RadioPort, SerialLink, StoragePort,
    TimePort, UiPort,
};
use crate::bridge::scan::ScanList;
use crate::bridge::types::{Credential, NetworkInfo};
use crate::bridge::{Inbound, SerialBridge};
use crate::config::{RetryPolicy, SystemConfig};
use crate::error::{BridgeError, Error, Result};
use crate::identity::IdentityStore;
use crate::mesh::{MeshUpdate, SensorMesh};
use crate::status::ArmState;
use crate::timer::Deadline;

/// What the caller of [`AlarmService::poll_once`] should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    /// The user asked for a companion reset; restart the firmware too so
    /// both sides renegotiate from scratch.
    RestartRequested,
}

pub struct AlarmService<L: SerialLink, S: StoragePort> {
    bridge: SerialBridge<L>,
    store: IdentityStore<S>,
    controller: AlarmController,
    mesh: SensorMesh,
    network: Option<NetworkInfo>,
    config: SystemConfig,
}

impl<L: SerialLink, S: StoragePort> AlarmService<L, S> {
    /// Bring the system up: seed identity on first boot, wait for the
    /// companion's id announcement, establish the network, and build the
    /// domain objects from persisted state.
    ///
    /// Blocks until the companion has announced itself and a network is
    /// joined; the alarm is unusable without its reporting path.
    pub fn boot(
        link: L,
        storage: S,
        config: SystemConfig,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> Result<Self> {
        config.validate()?;

        let mut store = IdentityStore::new(storage);
        store.init_if_first_boot()?;

        let mut bridge = SerialBridge::new(link, config.response_timeout_ms);
        let device_id = Self::wait_device_id(&mut bridge, clock);
        info!("companion announced device id {device_id}");

        let session_id = store.session_id()?;
        let pin = store.pin()?;

        let mut service = Self {
            bridge,
            store,
            controller: AlarmController::new(config.clone(), pin, clock),
            mesh: SensorMesh::new(device_id, session_id),
            network: None,
            config,
        };

        ui.notify(Notice::WifiConnecting);
        while !service.is_network_connected(ui, clock, events) {
            service.reconnect_network(keypad, ui, clock, events);
        }

        events.emit(&AppEvent::Started(service.controller.status().state));
        Ok(service)
    }

    fn wait_device_id(bridge: &mut SerialBridge<L>, clock: &impl TimePort) -> u32 {
        loop {
            match bridge.poll() {
                Some(Inbound::DeviceId(id)) => return id,
                Some(_) => {}
                None => clock.sleep_ms(10),
            }
        }
    }

    pub fn status(&self) -> crate::status::AlarmStatus {
        self.controller.status()
    }

    /// One iteration of the cooperative loop.
    pub fn poll_once(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        radio: &mut impl RadioPort,
        pairing: &mut impl PairingBus,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> Result<LoopAction> {
        // 1. Companion activity.
        self.service_serial(keypad, ui, clock, events)?;

        // 2. An active alert blocks here until it is disarmed.
        if self.controller.status().state == ArmState::Alert {
            self.run_alert(keypad, ui, clock, events)?;
        }

        // 3. Sensor health sweep.
        if let Some(cause) = self.controller.check_health(ui, clock, &self.mesh) {
            events.emit(&AppEvent::AlertRaised(cause));
            self.report_status(clock, events);
        }

        // 4. Radio traffic and the trigger grace window.
        match self
            .mesh
            .listen(radio, clock, &self.controller.status())
        {
            Some(MeshUpdate::Adopted { id, .. }) => {
                events.emit(&AppEvent::SensorAdopted { id });
            }
            Some(MeshUpdate::Report { .. }) | Some(MeshUpdate::Ignored) | None => {}
        }
        if let Some(cause) = self.controller.evaluate_triggers(clock, &self.mesh) {
            events.emit(&AppEvent::AlertRaised(cause));
            self.report_status(clock, events);
        }

        // 5. Keypad.
        let action = self.service_keypad(keypad, ui, pairing, clock, events)?;

        self.draw_status(ui);
        Ok(action)
    }

    // --- serial handling ---

    fn service_serial(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> Result<()> {
        while let Some(inbound) = self.bridge.poll() {
            match inbound {
                Inbound::Disconnected => {
                    self.network = None;
                    events.emit(&AppEvent::NetworkDisconnected);
                    // While armed the companion reconnects silently on its
                    // own; only bother the user when disarmed.
                    if self.controller.status().state == ArmState::Disarmed {
                        ui.notify(Notice::WifiDisconnected);
                        while !self.reconnect_network(keypad, ui, clock, events) {}
                    }
                }
                Inbound::NetworkInfo(info) => {
                    events.emit(&AppEvent::NetworkConnected(info.clone()));
                    self.network = Some(info);
                }
                Inbound::RemoteStatus { state, method } => {
                    let before = self.controller.status().state;
                    let changed = self.controller.apply_remote_status(
                        ui, clock, &mut self.mesh, state, method,
                    );
                    if changed {
                        events.emit(&AppEvent::StateChanged {
                            from: before,
                            to: self.controller.status().state,
                        });
                        self.report_status(clock, events);
                    }
                }
                Inbound::DeviceId(_)
                | Inbound::ScanStart { .. }
                | Inbound::ScanEntry(_)
                | Inbound::ScanEnd
                | Inbound::Ok
                | Inbound::Malformed
                | Inbound::Unknown => {}
            }
        }
        Ok(())
    }

    // --- alert handling ---

    /// Sound the siren until a correct PIN or a remote disarm ends the
    /// alert. Deliberately monopolises the loop; nothing else matters
    /// during a break-in.
    fn run_alert(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> Result<()> {
        self.report_status(clock, events);
        ui.siren(true);
        while self.controller.status().state == ArmState::Alert {
            if let Some(key) = keypad.poll_key() {
                if key.is_enter_pin() {
                    let before = self.controller.status().state;
                    let outcome =
                        self.controller
                            .request_state_change(keypad, ui, clock, &mut self.mesh);
                    if outcome == StateOutcome::Changed {
                        events.emit(&AppEvent::StateChanged {
                            from: before,
                            to: self.controller.status().state,
                        });
                        self.report_status(clock, events);
                    }
                }
            }
            // A remote disarm must get through as well.
            if let Some(Inbound::RemoteStatus { state, method }) = self.bridge.poll() {
                let changed = self
                    .controller
                    .apply_remote_status(ui, clock, &mut self.mesh, state, method);
                if changed {
                    events.emit(&AppEvent::StateChanged {
                        from: ArmState::Alert,
                        to: self.controller.status().state,
                    });
                    self.report_status(clock, events);
                }
            }
            clock.sleep_ms(10);
        }
        ui.siren(false);
        Ok(())
    }

    // --- keypad handling ---

    fn service_keypad(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        pairing: &mut impl PairingBus,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> Result<LoopAction> {
        let Some(key) = keypad.poll_key() else {
            return Ok(LoopAction::Continue);
        };

        if key.is_enter_pin() {
            let before = self.controller.status().state;
            match self
                .controller
                .request_state_change(keypad, ui, clock, &mut self.mesh)
            {
                StateOutcome::Changed => {
                    events.emit(&AppEvent::StateChanged {
                        from: before,
                        to: self.controller.status().state,
                    });
                    self.report_status(clock, events);
                }
                StateOutcome::Refused { offline_slot } => {
                    events.emit(&AppEvent::ArmRefused { offline_slot });
                }
                StateOutcome::Unchanged => {}
            }
        } else if key.is_menu() && self.controller.status().state == ArmState::Disarmed {
            return self.run_menu(keypad, ui, pairing, clock, events);
        }
        Ok(LoopAction::Continue)
    }

    // --- menu ---

    fn run_menu(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        pairing: &mut impl PairingBus,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> Result<LoopAction> {
        let Some(action) = ui.choose_menu() else {
            return Ok(LoopAction::Continue);
        };
        match action {
            MenuAction::ShowNetworkInfo => {
                let info = self.network.clone().unwrap_or_else(NetworkInfo::invalid);
                ui.show_network_info(&info);
            }
            MenuAction::ChangeNetwork => {
                if confirmed(keypad, clock, self.config.selection_timeout_secs) {
                    self.change_network(keypad, ui, clock, events)?;
                }
            }
            MenuAction::ChangePin => {
                if confirmed(keypad, clock, self.config.selection_timeout_secs)
                    && self
                        .controller
                        .change_pin(keypad, ui, clock, &mut self.store)?
                {
                    events.emit(&AppEvent::PinChanged);
                }
            }
            MenuAction::SensorSetup => {
                self.sensor_setup(keypad, ui, pairing, clock, events)?;
            }
            MenuAction::LoadDefaults => {
                if confirmed(keypad, clock, self.config.selection_timeout_secs) {
                    self.controller.load_default_pin(ui, &mut self.store)?;
                    events.emit(&AppEvent::PinChanged);
                }
            }
            MenuAction::ResetCompanion => {
                if confirmed(keypad, clock, self.config.selection_timeout_secs)
                    && self.send_with_retry(clock, |b, c| b.send_reset(c)).is_ok()
                {
                    return Ok(LoopAction::RestartRequested);
                }
            }
        }
        Ok(LoopAction::Continue)
    }

    // --- sensor setup ---

    /// Option A clears the roster (after a second confirmation) and starts
    /// a new session; option B repeatedly pairs new sensors.
    fn sensor_setup(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        pairing: &mut impl PairingBus,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> Result<()> {
        let clear = choice_dialog(keypad, clock, self.config.selection_timeout_secs);
        if clear == Choice::OptionA {
            if confirmed(keypad, clock, self.config.selection_timeout_secs) {
                let session_id = self.mesh.new_session(&mut self.store)?;
                events.emit(&AppEvent::SessionReset { session_id });
            }
            return Ok(());
        }

        loop {
            if !self.mesh.can_add_sensor() {
                ui.notify(Notice::RosterFull);
                return Ok(());
            }
            ui.notify(Notice::PairingWaiting);
            match self.mesh.pair(
                pairing,
                clock,
                &mut self.store,
                self.config.pairing_timeout_secs,
            ) {
                Ok(record) => {
                    events.emit(&AppEvent::SensorPaired {
                        id: record.id,
                        kind: record.kind,
                    });
                }
                Err(e) => {
                    warn!("pairing failed: {e}");
                    ui.notify(Notice::PairingFailed);
                }
            }
            // A = add another, anything else exits.
            if choice_dialog(keypad, clock, self.config.selection_timeout_secs) != Choice::OptionA {
                return Ok(());
            }
        }
    }

    // --- network lifecycle ---

    /// Block until the companion reports either an association or a
    /// disconnect. Updates the cached network info on success.
    fn is_network_connected(
        &mut self,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> bool {
        loop {
            match self.bridge.poll() {
                Some(Inbound::Disconnected) => {
                    ui.notify(Notice::WifiDisconnected);
                    events.emit(&AppEvent::NetworkDisconnected);
                    return false;
                }
                Some(Inbound::NetworkInfo(info)) => {
                    ui.notify(Notice::WifiConnected);
                    events.emit(&AppEvent::NetworkConnected(info.clone()));
                    self.network = Some(info);
                    return true;
                }
                Some(_) => {}
                None => clock.sleep_ms(10),
            }
        }
    }

    /// Offer the user a choice between joining a different network and
    /// retrying the stored one. No answer means retry.
    fn reconnect_network(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> bool {
        match choice_dialog(keypad, clock, self.config.selection_timeout_secs) {
            Choice::OptionA => self
                .change_network(keypad, ui, clock, events)
                .unwrap_or(false),
            Choice::OptionB | Choice::TimedOut => {
                ui.notify(Notice::WifiConnecting);
                if self.send_with_retry(clock, |b, c| b.send_retry(c)).is_err() {
                    ui.notify(Notice::CompanionUnresponsive);
                    events.emit(&AppEvent::CompanionUnresponsive);
                    return false;
                }
                self.is_network_connected(ui, clock, events)
            }
        }
    }

    /// Drop the current network and walk the user through joining a new
    /// one. Loops over scan attempts until a join succeeds.
    fn change_network(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> Result<bool> {
        if self
            .send_with_retry(clock, |b, c| b.send_network_change(c))
            .is_err()
        {
            ui.notify(Notice::CompanionUnresponsive);
            events.emit(&AppEvent::CompanionUnresponsive);
            return Ok(false);
        }
        self.network = None;
        // The companion restarts its output stream; drop any partial line.
        self.bridge.clear();
        while !self.connect_new_network(keypad, ui, clock, events)? {}
        Ok(true)
    }

    /// One scan-choose-join attempt. `Ok(false)` means rescan or retry.
    fn connect_new_network(
        &mut self,
        _keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        events: &mut impl EventSink,
    ) -> Result<bool> {
        let mut list = ScanList::new();
        let deadline = Deadline::after(clock, u64::from(self.config.scan_window_ms));
        let mut in_batch = false;
        loop {
            if deadline.expired(clock) {
                ui.notify(Notice::NoNetworksFound);
                return Ok(false);
            }
            match self.bridge.poll() {
                Some(Inbound::ScanStart { .. }) => in_batch = true,
                Some(Inbound::ScanEntry(net)) if in_batch => list.push(net),
                Some(Inbound::ScanEnd) if in_batch => break,
                Some(_) => {}
                None => clock.sleep_ms(10),
            }
        }
        if list.is_empty() {
            ui.notify(Notice::NoNetworksFound);
            return Ok(false);
        }

        let Some(index) = ui.choose_network(list.as_slice()) else {
            // User asked for a rescan.
            return Ok(false);
        };
        let Some(network) = list.get(index).cloned() else {
            return Ok(false);
        };

        let credential = if network.encryption.needs_credential() {
            ui.read_credential()
        } else {
            Credential::default()
        };

        if self
            .send_with_retry(clock, |b, c| {
                b.send_credentials(c, network.ssid.as_str(), &credential)
            })
            .is_err()
        {
            ui.notify(Notice::CompanionUnresponsive);
            events.emit(&AppEvent::CompanionUnresponsive);
            return Err(Error::Bridge(BridgeError::CompanionUnresponsive));
        }

        ui.notify(Notice::WifiConnecting);
        Ok(self.is_network_connected(ui, clock, events))
    }

    // --- helpers ---

    /// Run a bridge command under the configured retry policy.
    fn send_with_retry<T: TimePort>(
        &mut self,
        clock: &T,
        mut send: impl FnMut(&mut SerialBridge<L>, &T) -> core::result::Result<(), BridgeError>,
    ) -> core::result::Result<(), BridgeError> {
        match self.config.command_retry {
            RetryPolicy::Forever => loop {
                if send(&mut self.bridge, clock).is_ok() {
                    return Ok(());
                }
                warn!("companion unresponsive, retrying command");
            },
            RetryPolicy::Limit(attempts) => {
                let mut last = BridgeError::CompanionUnresponsive;
                for _ in 0..attempts {
                    match send(&mut self.bridge, clock) {
                        Ok(()) => return Ok(()),
                        Err(e) => last = e,
                    }
                }
                Err(last)
            }
        }
    }

    fn report_status(&mut self, clock: &impl TimePort, events: &mut impl EventSink) {
        let status = self.controller.status();
        if self.bridge.send_status(clock, &status).is_err() {
            warn!("companion did not acknowledge status report");
            events.emit(&AppEvent::CompanionUnresponsive);
        }
    }

    fn draw_status(&mut self, ui: &mut impl UiPort) {
        let (magnet, pir) = self.mesh.roster.counts();
        let rssi = self
            .network
            .as_ref()
            .map(|n| n.rssi)
            .unwrap_or(crate::bridge::types::INVALID_RSSI);
        ui.show_status(&self.controller.status(), magnet, pir, rssi);
    }
}

/// Ask for a yes/no confirmation. Option A confirms.
fn confirmed(keypad: &mut impl KeypadPort, clock: &impl TimePort, timeout_secs: u16) -> bool {
    choice_dialog(keypad, clock, timeout_secs) == Choice::OptionA
}
