//! UART adapter for the companion serial link.

use esp_idf_hal::uart::UartDriver;

use crate::app::ports::SerialLink;

/// [`SerialLink`] over a hardware UART. Reads are non-blocking; the line
/// terminator is appended here so the bridge stays byte-oriented.
pub struct UartLink {
    uart: UartDriver<'static>,
}

impl UartLink {
    pub fn new(uart: UartDriver<'static>) -> Self {
        Self { uart }
    }
}

impl SerialLink for UartLink {
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.uart.read(&mut byte, 0) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn write_line(&mut self, line: &str) {
        if self.uart.write(line.as_bytes()).is_err() || self.uart.write(b"\n").is_err() {
            log::warn!("uart: write failed");
        }
    }
}
