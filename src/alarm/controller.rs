//! The orchestrating alarm state machine.
//!
//! Owns the process-wide [`AlarmStatus`] and every transition into and out
//! of Armed and Alert. All inputs arrive by polling: the service loop calls
//! [`evaluate_triggers`](AlarmController::evaluate_triggers) and
//! [`check_health`](AlarmController::check_health) once per iteration and
//! routes keypad/serial activity into the request methods.

use heapless::String;
use log::{info, warn};

use crate::alarm::dialog::{choice_dialog, Choice};
use crate::alarm::pin::{collect_pin, pin_entry_outcome, PinOutcome};
use crate::app::ports::{KeypadPort, Notice, StoragePort, TimePort, UiPort};
use crate::config::{SystemConfig, PIN_LENGTH};
use crate::error::Result;
use crate::identity::IdentityStore;
use crate::mesh::SensorMesh;
use crate::status::{AlarmStatus, AlertCause, ArmMethod, ArmState};
use crate::timer::Countdown;

/// What a keypad-initiated state change request produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOutcome {
    /// The lifecycle state changed; the caller reports it onward.
    Changed,
    /// Arming was refused because the sensor in this slot is offline.
    Refused { offline_slot: usize },
    /// Nothing happened (bad PIN while disarmed, dialog abandoned).
    Unchanged,
}

pub struct AlarmController {
    status: AlarmStatus,
    /// In-memory mirror of the persisted PIN.
    pin: String<PIN_LENGTH>,
    /// Runs while at least one sensor is triggered; expiry raises Alert.
    grace: Countdown,
    /// Cadence of the offline / low-battery sweep.
    health: Countdown,
    config: SystemConfig,
}

impl AlarmController {
    pub fn new(config: SystemConfig, pin: String<PIN_LENGTH>, clock: &impl TimePort) -> Self {
        Self {
            status: AlarmStatus::disarmed(),
            pin,
            grace: Countdown::new(clock, u64::from(config.alert_grace_secs) * 1_000),
            health: Countdown::new(clock, u64::from(config.sensor_check_secs) * 1_000),
            config,
        }
    }

    pub fn status(&self) -> AlarmStatus {
        self.status
    }

    /// The D-key flow: collect a PIN and change state accordingly.
    ///
    /// A correct PIN toggles Disarmed <-> Armed (arming runs the method
    /// dialog and, for Away, the visible countdown) or silences an Alert.
    /// While armed, anything other than a correct PIN is treated as an
    /// intrusion attempt and raises Alert immediately.
    pub fn request_state_change(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        mesh: &mut SensorMesh,
    ) -> StateOutcome {
        let outcome = pin_entry_outcome(
            keypad,
            ui,
            clock,
            self.pin.as_str(),
            self.config.pin_timeout_secs,
        );
        match outcome {
            PinOutcome::Correct => {
                ui.notify(Notice::PinCorrect);
                if self.status.state == ArmState::Disarmed {
                    self.try_arm(keypad, ui, clock, mesh)
                } else {
                    self.disarm(ui, clock, mesh);
                    StateOutcome::Changed
                }
            }
            PinOutcome::Incorrect | PinOutcome::TimedOut => {
                ui.notify(match outcome {
                    PinOutcome::Incorrect => Notice::PinIncorrect,
                    _ => Notice::PinTimedOut,
                });
                if self.status.state == ArmState::Armed {
                    warn!("failed PIN entry while armed, raising alert");
                    self.status.state = ArmState::Alert;
                    StateOutcome::Changed
                } else {
                    StateOutcome::Unchanged
                }
            }
        }
    }

    fn try_arm(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        mesh: &mut SensorMesh,
    ) -> StateOutcome {
        // The precondition is checked at the moment of arming only.
        if let Some(slot) =
            mesh.roster
                .offline_slot(clock.now_ms(), self.config.offline_timeout_ms)
        {
            ui.notify(Notice::ArmRefusedSensorsOffline);
            return StateOutcome::Refused { offline_slot: slot };
        }

        // A = Away, B = Stay, no answer = Stay.
        let method = match choice_dialog(keypad, clock, self.config.selection_timeout_secs) {
            Choice::OptionA => ArmMethod::Away,
            Choice::OptionB | Choice::TimedOut => ArmMethod::Stay,
        };

        if method == ArmMethod::Away {
            for secs_left in (1..=self.config.arm_delay_secs).rev() {
                ui.show_arm_countdown(secs_left);
                clock.sleep_ms(1_000);
            }
        }

        self.status.state = ArmState::Armed;
        self.status.method = method;
        self.status.cause = AlertCause::None;
        // Discard any trigger state accumulated while disarmed.
        mesh.roster.reset_states(clock.now_ms());
        self.grace.reset(clock);
        self.health.reset(clock);
        ui.notify(Notice::StateChanged);
        info!("armed ({method:?})");
        StateOutcome::Changed
    }

    fn disarm(&mut self, ui: &mut impl UiPort, clock: &impl TimePort, mesh: &mut SensorMesh) {
        self.status.disarm();
        mesh.roster.reset_states(clock.now_ms());
        self.grace.reset(clock);
        ui.siren(false);
        ui.notify(Notice::StateChanged);
        info!("disarmed");
    }

    /// Evaluate the triggered-sensor grace window. Returns the cause when
    /// this call raised an Alert.
    ///
    /// While at least one sensor reports Triggered the grace countdown
    /// runs; if the count returns to zero before expiry, the countdown
    /// restarts and no alert happens. Expiry with a non-zero count means
    /// nobody disarmed in time.
    pub fn evaluate_triggers(
        &mut self,
        clock: &impl TimePort,
        mesh: &SensorMesh,
    ) -> Option<AlertCause> {
        if self.status.state != ArmState::Armed {
            return None;
        }
        match mesh.roster.triggered_count() {
            0 => {
                self.grace.reset(clock);
                self.status.cause = AlertCause::None;
            }
            1 => self.status.cause = AlertCause::OneTriggered,
            _ => self.status.cause = AlertCause::ManyTriggered,
        }
        if self.grace.expired(clock) {
            self.status.state = ArmState::Alert;
            info!("grace window elapsed, alert ({:?})", self.status.cause);
            return Some(self.status.cause);
        }
        None
    }

    /// Periodic sensor health sweep. Returns the cause when this call
    /// raised an Alert.
    ///
    /// While armed, an offline sensor is tamper-equivalent and alerts
    /// immediately. While disarmed it is a user notification, as is a low
    /// battery.
    pub fn check_health(
        &mut self,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        mesh: &SensorMesh,
    ) -> Option<AlertCause> {
        if !self.health.expired(clock) {
            return None;
        }
        self.health.reset(clock);

        let now = clock.now_ms();
        let offline = mesh.roster.offline_slot(now, self.config.offline_timeout_ms);
        match self.status.state {
            ArmState::Armed => {
                if offline.is_some() {
                    self.status.state = ArmState::Alert;
                    self.status.cause = AlertCause::Offline;
                    warn!("sensor offline while armed, alert");
                    return Some(AlertCause::Offline);
                }
            }
            ArmState::Disarmed => {
                if let Some(slot) = offline {
                    ui.notify(Notice::SensorOffline { slot });
                } else if let Some(slot) = mesh
                    .roster
                    .low_battery_slot(now, self.config.offline_timeout_ms)
                {
                    ui.notify(Notice::SensorLowBattery { slot });
                }
            }
            ArmState::Alert => {}
        }
        None
    }

    /// Apply a status pushed by the companion (e.g. a disarm from the
    /// phone app). Returns true when the local state actually changed.
    pub fn apply_remote_status(
        &mut self,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        mesh: &mut SensorMesh,
        state: ArmState,
        method: ArmMethod,
    ) -> bool {
        if state == self.status.state && method == self.status.method {
            return false;
        }
        if state == ArmState::Disarmed {
            self.disarm(ui, clock, mesh);
        } else {
            self.status.state = state;
            self.status.method = method;
            ui.notify(Notice::StateChanged);
            info!("remote state change to {state:?} ({method:?})");
        }
        true
    }

    /// Change the PIN: verify the current one, then collect and persist a
    /// replacement. Returns true on success.
    pub fn change_pin<S: StoragePort>(
        &mut self,
        keypad: &mut impl KeypadPort,
        ui: &mut impl UiPort,
        clock: &impl TimePort,
        store: &mut IdentityStore<S>,
    ) -> Result<bool> {
        match pin_entry_outcome(
            keypad,
            ui,
            clock,
            self.pin.as_str(),
            self.config.pin_timeout_secs,
        ) {
            PinOutcome::Correct => ui.notify(Notice::PinCorrect),
            PinOutcome::Incorrect => {
                ui.notify(Notice::PinIncorrect);
                return Ok(false);
            }
            PinOutcome::TimedOut => {
                ui.notify(Notice::PinTimedOut);
                return Ok(false);
            }
        }
        let Some(new_pin) = collect_pin(keypad, ui, clock, self.config.pin_timeout_secs) else {
            ui.notify(Notice::PinTimedOut);
            return Ok(false);
        };
        store.set_pin(new_pin.as_str())?;
        self.pin = new_pin;
        ui.notify(Notice::PinChanged);
        info!("PIN changed");
        Ok(true)
    }

    /// Restore the factory PIN.
    pub fn load_default_pin<S: StoragePort>(
        &mut self,
        ui: &mut impl UiPort,
        store: &mut IdentityStore<S>,
    ) -> Result<()> {
        store.reset_pin()?;
        self.pin = store.pin()?;
        ui.notify(Notice::DefaultsLoaded);
        Ok(())
    }
}
