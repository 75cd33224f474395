//! Console UI adapter.
//!
//! Renders every [`UiPort`] interaction as a log line. Used on the host
//! for simulation and on hardware builds until the LCD/buzzer board is
//! attached; the interactive selections report "no input".

use log::info;

use crate::app::ports::{MenuAction, Notice, UiPort};
use crate::bridge::types::{Credential, NetworkInfo, ScannedNetwork};
use crate::status::AlarmStatus;

pub struct ConsoleUi;

impl ConsoleUi {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new()
    }
}

impl UiPort for ConsoleUi {
    fn show_status(&mut self, status: &AlarmStatus, magnet_count: u8, pir_count: u8, rssi: i32) {
        info!(
            "UI | {:?}/{:?} magnets={magnet_count} pirs={pir_count} rssi={rssi}",
            status.state, status.method
        );
    }

    fn notify(&mut self, notice: Notice) {
        info!("UI | notice: {notice:?}");
    }

    fn show_arm_countdown(&mut self, secs_left: u16) {
        info!("UI | arming in {secs_left}s");
    }

    fn show_pin_progress(&mut self, entered: usize) {
        info!("UI | pin digits entered: {entered}");
    }

    fn siren(&mut self, on: bool) {
        info!("UI | siren {}", if on { "ON" } else { "off" });
    }

    fn show_network_info(&mut self, info: &NetworkInfo) {
        info!(
            "UI | network {} rssi={} ip={}",
            info.ssid, info.rssi, info.local_ip
        );
    }

    fn choose_menu(&mut self) -> Option<MenuAction> {
        None
    }

    fn choose_network(&mut self, networks: &[ScannedNetwork]) -> Option<usize> {
        info!("UI | {} networks found, none selected", networks.len());
        None
    }

    fn read_credential(&mut self) -> Credential {
        Credential::default()
    }
}
