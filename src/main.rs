//! Homeguard firmware — main entry point.
//!
//! Hexagonal layout: hardware adapters on the outside, ports in between,
//! the alarm service in the middle.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  UartLink    Nrf24Radio   I2cKeypad   I2cPairingBus      │
//! │  (SerialLink)(RadioPort)  (KeypadPort)(PairingBus)       │
//! │  NvsAdapter  MonotonicClock  ConsoleUi  LogEventSink     │
//! │  (StoragePort)(TimePort)     (UiPort)   (EventSink)      │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ───────────────     │
//! │                                                          │
//! │  ┌──────────────────────────────────────────────────┐    │
//! │  │      AlarmService: controller · mesh · bridge    │    │
//! │  └──────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{anyhow, Result};
use log::{error, info};

use esp_idf_hal::gpio::{AnyOutputPin, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::spi::{config::Config as SpiConfig, SpiDeviceDriver};
use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};

use homeguard::adapters::console::ConsoleUi;
use homeguard::adapters::keypad::I2cKeypad;
use homeguard::adapters::log_sink::LogEventSink;
use homeguard::adapters::nvs::NvsAdapter;
use homeguard::adapters::radio::{I2cPairingBus, Nrf24Radio};
use homeguard::adapters::time::MonotonicClock;
use homeguard::adapters::uart::UartLink;
use homeguard::app::ports::TimePort;
use homeguard::app::{AlarmService, LoopAction};

const KEYPAD_I2C_ADDR: u8 = 0x20;
const PAIRING_I2C_ADDR: u8 = 0x08;
const RADIO_CHANNEL: u8 = 76;
const RADIO_ADDRESS: [u8; 5] = *b"HMGRD";

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("homeguard v{}", env!("CARGO_PKG_VERSION"));

    let peripherals =
        Peripherals::take().map_err(|e| anyhow!("peripherals unavailable: {e}"))?;

    // Companion module on UART1.
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio18,
        Option::<esp_idf_hal::gpio::AnyIOPin>::None,
        Option::<esp_idf_hal::gpio::AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(115_200)),
    )?;
    let link = UartLink::new(uart);

    // Keypad expander on I2C0, pairing bus on I2C1.
    let keypad_i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &I2cConfig::new().baudrate(Hertz(100_000)),
    )?;
    let mut keypad = I2cKeypad::new(keypad_i2c, KEYPAD_I2C_ADDR);

    let pairing_i2c = I2cDriver::new(
        peripherals.i2c1,
        peripherals.pins.gpio10,
        peripherals.pins.gpio11,
        &I2cConfig::new().baudrate(Hertz(100_000)),
    )?;
    let mut pairing = I2cPairingBus::new(pairing_i2c, PAIRING_I2C_ADDR);

    // Sensor radio on SPI2.
    let spi = SpiDeviceDriver::new_single(
        peripherals.spi2,
        peripherals.pins.gpio12,
        peripherals.pins.gpio13,
        Some(peripherals.pins.gpio14),
        Some(peripherals.pins.gpio15),
        &esp_idf_hal::spi::config::DriverConfig::new(),
        &SpiConfig::new().baudrate(Hertz(8_000_000)),
    )?;
    let ce = PinDriver::output(AnyOutputPin::from(peripherals.pins.gpio16))?;
    let mut radio = Nrf24Radio::new(spi, ce, RADIO_CHANNEL, &RADIO_ADDRESS)
        .map_err(|e| anyhow!("radio init: {e}"))?;

    let nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init: {e}"))?;
    let config = nvs.load_config();

    let clock = MonotonicClock::new();
    let mut ui = ConsoleUi::new();
    let mut events = LogEventSink::new();

    let mut service = AlarmService::boot(
        link,
        nvs,
        config,
        &mut keypad,
        &mut ui,
        &clock,
        &mut events,
    )
    .map_err(|e| anyhow!("boot: {e}"))?;

    info!("system ready, entering control loop");

    loop {
        match service.poll_once(
            &mut keypad,
            &mut ui,
            &mut radio,
            &mut pairing,
            &clock,
            &mut events,
        ) {
            Ok(LoopAction::Continue) => {}
            Ok(LoopAction::RestartRequested) => {
                info!("restart requested");
                unsafe { esp_idf_svc::sys::esp_restart() };
            }
            Err(e) => error!("loop error: {e}"),
        }
        clock.sleep_ms(10);
    }
}
