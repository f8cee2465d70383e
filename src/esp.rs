//! ESP-IDF adaptation layer: UART sink, scheduler probe, hardware TRNG.
//!
//! Only compiled for `target_os = "espidf"`; host builds inject test
//! doubles through the pipeline configuration instead.
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32 GPIO (TX) ──────▶ USB-UART RX
//!                          └─▶ PC serial monitor
//! ```

use esp_idf_svc::hal::gpio;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartTxDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys;

use crate::entropy::{EntropyError, EntropySource};
use crate::transport::Sink;

/// UART configuration for the log transport.
pub struct UartSinkConfig {
    pub baud_rate: u32,
}

impl Default for UartSinkConfig {
    fn default() -> Self {
        Self { baud_rate: 115_200 }
    }
}

/// TX-only UART transport sink.
pub struct UartSink {
    driver: UartTxDriver<'static>,
}

impl UartSink {
    /// Bring up a TX-only UART for log output.
    pub fn new(
        uart: impl Peripheral<P = uart::UART1> + 'static,
        tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'static,
        config: &UartSinkConfig,
    ) -> Result<Self, sys::EspError> {
        let uart_config = uart::config::Config::default().baudrate(Hertz(config.baud_rate));

        let driver = UartTxDriver::new(
            uart,
            tx_pin,
            Option::<gpio::AnyIOPin>::None, // CTS
            Option::<gpio::AnyIOPin>::None, // RTS
            &uart_config,
        )?;

        Ok(Self { driver })
    }
}

impl Sink for UartSink {
    fn write(&mut self, bytes: &[u8]) {
        // Best-effort: serial output has no flow-control feedback contract.
        let _ = self.driver.write(bytes);
    }
}

/// FreeRTOS `taskSCHEDULER_RUNNING`; the macro is not exported by bindgen.
const SCHEDULER_RUNNING: sys::BaseType_t = 2;

/// True while the FreeRTOS scheduler is actively running tasks. Used as the
/// pipeline's scheduler probe on this target.
pub fn scheduler_running() -> bool {
    // SAFETY: xTaskGetSchedulerState is always safe to call.
    unsafe { sys::xTaskGetSchedulerState() == SCHEDULER_RUNNING }
}

/// Hardware TRNG entropy source.
///
/// `esp_fill_random` is cryptographically secure while RF or the bootloader
/// entropy source is enabled, and it always produces the requested length.
pub struct Trng;

impl EntropySource for Trng {
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, EntropyError> {
        // SAFETY: the buffer is valid for writes of its full length.
        unsafe { sys::esp_fill_random(buf.as_mut_ptr().cast(), buf.len()) };
        Ok(buf.len())
    }
}
