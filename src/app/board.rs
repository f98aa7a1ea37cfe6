//! Board pins: status LEDs and the modem control lines.

use cellular_demo::config::timing::{LED_OFF_MS, LED_ON_MS, MODEM_RESET_HOLD_MS};
use cellular_demo::log_debug;

use embassy_nrf::gpio::{Level, Output, OutputDrive, Pin};
use embassy_nrf::Peri;
use embassy_time::Timer;

/// LEDs are wired active-high on the DK.
const LED_ON: Level = Level::High;
const LED_OFF: Level = Level::Low;

/// The two status LEDs, always driven together.
pub struct Leds {
	leds: [Output<'static>; 2],
}

impl Leds {
	pub fn new(led1: Peri<'static, impl Pin>, led2: Peri<'static, impl Pin>) -> Self {
		Self {
			leds: [
				Output::new(led1, LED_OFF, OutputDrive::Standard),
				Output::new(led2, LED_OFF, OutputDrive::Standard),
			],
		}
	}

	pub fn set(&mut self, on: bool) {
		let level = if on { LED_ON } else { LED_OFF };
		for led in &mut self.leds {
			led.set_level(level);
		}
	}

	/// Blink both LEDs `count` times.
	pub async fn blink(&mut self, count: u32) {
		for _ in 0..count {
			self.set(true);
			Timer::after_millis(LED_ON_MS).await;
			self.set(false);
			Timer::after_millis(LED_OFF_MS).await;
		}
	}
}

/// Modem enable, remap and reset lines. All are active-low and idle high.
pub struct ModemPins {
	chen: Output<'static>,
	remap: Output<'static>,
	reset: Output<'static>,
}

impl ModemPins {
	pub fn new(
		chen: Peri<'static, impl Pin>,
		remap: Peri<'static, impl Pin>,
		reset: Peri<'static, impl Pin>,
	) -> Self {
		Self {
			chen: Output::new(chen, Level::High, OutputDrive::Standard),
			remap: Output::new(remap, Level::High, OutputDrive::Standard),
			reset: Output::new(reset, Level::High, OutputDrive::Standard),
		}
	}

	/// Get the modem out of reset: enable it, select the default memory map,
	/// pulse reset.
	pub async fn power_on(&mut self) {
		log_debug!("Modem power-on sequence");
		self.chen.set_low();
		self.remap.set_low();
		self.reset.set_low();
		Timer::after_millis(MODEM_RESET_HOLD_MS).await;
		self.reset.set_high();
	}
}
