//! System restart, the only recovery this firmware has.

use core::fmt::Write as _;

use cellular_demo::config::timing::RESTART_FLUSH_MS;
use cellular_demo::logger::{self, Level, Text};
use cellular_demo::HEALTH;

use cortex_m::peripheral::SCB;
use embassy_time::Timer;

/// Log, give the console time to flush, then reset the chip.
///
/// Only the first caller performs the reset, later callers park until it
/// happens. Never returns.
pub async fn escalate(reason: &str) -> ! {
	if !HEALTH.begin_restart() {
		loop {
			Timer::after_secs(1).await;
		}
	}

	// Waits for room in a full log queue, this line must not be dropped
	let mut text = Text::new();
	let _ = write!(text, "SYSTEM RESET... ({})", reason);
	logger::submit_waiting(Level::Error, text).await;
	Timer::after_millis(RESTART_FLUSH_MS).await;
	SCB::sys_reset()
}
