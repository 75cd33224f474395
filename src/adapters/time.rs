//! Monotonic clock adapter.
//!
//! - with the `espidf` feature — wraps `esp_timer_get_time()` (microsecond
//!   precision, monotonic) and the FreeRTOS delay.
//! - without it — uses `std::time::Instant` for host-side testing.

use crate::app::ports::TimePort;

pub struct MonotonicClock {
    #[cfg(not(feature = "espidf"))]
    start: std::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimePort for MonotonicClock {
    #[cfg(feature = "espidf")]
    fn now_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(feature = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(feature = "espidf")]
    fn sleep_ms(&self, ms: u64) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms as u32);
    }

    #[cfg(not(feature = "espidf"))]
    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}
