//! nRF24L01+ transceiver adapter, plus the I2C pairing bus.
//!
//! The radio stays in receive mode permanently; outbound instructions ride
//! on acknowledgment payloads (`W_ACK_PAYLOAD`), which is what lets the
//! controller answer a sensor before reading its message.
//!
//! Generic over the embedded-hal SPI/GPIO/I2C traits so the register
//! protocol is host-testable without hardware.

use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;
use log::warn;

use crate::app::ports::{PairingBus, RadioPort};
use crate::error::{Error, Result};

// Register map (subset).
const REG_EN_AA: u8 = 0x01;
const REG_RF_CH: u8 = 0x05;
const REG_STATUS: u8 = 0x07;
const REG_RX_ADDR_P0: u8 = 0x0A;
const REG_FIFO_STATUS: u8 = 0x17;
const REG_DYNPD: u8 = 0x1C;
const REG_FEATURE: u8 = 0x1D;
const REG_CONFIG: u8 = 0x00;

// Commands.
const CMD_R_REGISTER: u8 = 0x00;
const CMD_W_REGISTER: u8 = 0x20;
const CMD_R_RX_PL_WID: u8 = 0x60;
const CMD_R_RX_PAYLOAD: u8 = 0x61;
const CMD_FLUSH_RX: u8 = 0xE2;
const CMD_W_ACK_PAYLOAD: u8 = 0xA8;

// Bits.
const CONFIG_PWR_UP_PRIM_RX_CRC: u8 = 0b0000_1111;
const STATUS_RX_DR: u8 = 0x40;
const FIFO_RX_EMPTY: u8 = 0x01;

const MAX_PAYLOAD: usize = 32;

pub struct Nrf24Radio<SPI, CE> {
    spi: SPI,
    ce: CE,
}

impl<SPI: SpiDevice, CE: OutputPin> Nrf24Radio<SPI, CE> {
    /// Configure the transceiver: auto-ack with dynamic and ack payloads
    /// on pipe 0, CRC on, and enter receive mode.
    pub fn new(spi: SPI, ce: CE, channel: u8, address: &[u8; 5]) -> Result<Self> {
        let mut radio = Self { spi, ce };
        radio.write_register(REG_EN_AA, &[0x01])?;
        radio.write_register(REG_RF_CH, &[channel & 0x7F])?;
        radio.write_register(REG_RX_ADDR_P0, address)?;
        // EN_DPL | EN_ACK_PAY
        radio.write_register(REG_FEATURE, &[0x06])?;
        radio.write_register(REG_DYNPD, &[0x01])?;
        radio.write_register(REG_CONFIG, &[CONFIG_PWR_UP_PRIM_RX_CRC])?;
        radio.command(CMD_FLUSH_RX, &[], &mut [])?;
        radio.ce.set_high().map_err(|_| Error::Init("radio CE pin"))?;
        Ok(radio)
    }

    fn command(&mut self, opcode: u8, tx: &[u8], rx: &mut [u8]) -> Result<u8> {
        let mut out = [0u8; 1 + MAX_PAYLOAD];
        let mut inp = [0u8; 1 + MAX_PAYLOAD];
        let len = 1 + tx.len().max(rx.len());
        out[0] = opcode;
        out[1..=tx.len()].copy_from_slice(tx);
        self.spi
            .transfer(&mut inp[..len], &out[..len])
            .map_err(|_| Error::Init("radio SPI transfer"))?;
        let n = rx.len();
        rx.copy_from_slice(&inp[1..=n]);
        Ok(inp[0])
    }

    fn write_register(&mut self, reg: u8, value: &[u8]) -> Result<u8> {
        self.command(CMD_W_REGISTER | (reg & 0x1F), value, &mut [])
    }

    fn read_register(&mut self, reg: u8) -> Result<u8> {
        let mut value = [0u8; 1];
        self.command(CMD_R_REGISTER | (reg & 0x1F), &[], &mut value)?;
        Ok(value[0])
    }
}

impl<SPI: SpiDevice, CE: OutputPin> RadioPort for Nrf24Radio<SPI, CE> {
    fn message_pending(&mut self) -> bool {
        match self.read_register(REG_FIFO_STATUS) {
            Ok(fifo) => fifo & FIFO_RX_EMPTY == 0,
            Err(_) => false,
        }
    }

    fn queue_ack_payload(&mut self, payload: &[u8]) {
        let len = payload.len().min(MAX_PAYLOAD);
        if self
            .command(CMD_W_ACK_PAYLOAD, &payload[..len], &mut [])
            .is_err()
        {
            warn!("radio: failed to queue ack payload");
        }
    }

    fn read_message(&mut self, buf: &mut [u8]) -> usize {
        let mut width = [0u8; 1];
        if self.command(CMD_R_RX_PL_WID, &[], &mut width).is_err() {
            return 0;
        }
        let len = usize::from(width[0]).min(buf.len()).min(MAX_PAYLOAD);
        if len == 0 {
            return 0;
        }
        if self.command(CMD_R_RX_PAYLOAD, &[], &mut buf[..len]).is_err() {
            return 0;
        }
        // Clear the data-ready flag.
        if self.write_register(REG_STATUS, &[STATUS_RX_DR]).is_err() {
            warn!("radio: failed to clear RX_DR");
        }
        len
    }
}

// ---------------------------------------------------------------------------
// Pairing bus
// ---------------------------------------------------------------------------

/// [`PairingBus`] over I2C: the candidate sensor is a slave on a fixed
/// address during setup.
pub struct I2cPairingBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> I2cPairingBus<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }
}

impl<I2C: I2c> PairingBus for I2cPairingBus<I2C> {
    fn request_kind(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        self.i2c.read(self.address, &mut byte).ok()?;
        Some(byte[0])
    }

    fn send_identity(&mut self, payload: &str) {
        if self.i2c.write(self.address, payload.as_bytes()).is_err() {
            warn!("pairing: identity write failed");
        }
    }

    fn read_outcome(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        self.i2c.read(self.address, &mut byte).ok()?;
        Some(byte[0])
    }
}
