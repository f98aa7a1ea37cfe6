#![no_std]
#![no_main]

mod app;

use panic_halt as _;

use cellular_demo::config::timing::MODEM_SETTLE_MS;
use cellular_demo::config::{LOG_LEVEL, RADIO};
use cellular_demo::logger;
use cellular_demo::{log_info, log_warn};

use embassy_executor::Spawner;
use embassy_time::Timer;

use app::board::{Leds, ModemPins};
use app::{console, demo, recovery};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
	/* Initialize embassy-nrf peripherals and related libraries */
	let p = embassy_nrf::init(Default::default());

	// Console on UART0 TX (P0.27), available as VCOM0 through USB
	if console::init(&spawner, p.SERIAL0, p.P0_27).is_err() {
		recovery::escalate("console").await;
	}

	match LOG_LEVEL.map(logger::level_from_name) {
		Some(Some(level)) => logger::set_max_level(level),
		Some(None) => log_warn!("Unknown LOG_LEVEL, keeping {}", logger::max_level()),
		None => {}
	}

	let mut leds = Leds::new(p.P0_00, p.P0_01);
	let mut modem_pins = ModemPins::new(p.P0_10, p.P0_11, p.P0_12);

	log_info!("");
	log_info!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
	log_info!("Radio: band {} EARFCN {}", RADIO.band, RADIO.earfcn);

	Timer::after_millis(100).await;
	leds.blink(1).await;

	/* Get Modem out of reset */
	modem_pins.power_on().await;
	Timer::after_millis(MODEM_SETTLE_MS).await;
	leds.blink(3).await;

	#[cfg(feature = "demo-dweet")]
	{
		#[cfg(not(feature = "modem-trace"))]
		let stack = app::bring_up_network(&spawner).await;
		// Modem traces on UART1 TX (P0.29), VCOM1 through USB
		#[cfg(feature = "modem-trace")]
		let stack = app::bring_up_network(&spawner, p.SERIAL1, p.P0_29).await;

		match stack {
			Ok(stack) => demo::dweet_loop(stack, &mut leds).await,
			Err(e) => {
				cellular_demo::log_error!("Network bring-up failed: {}", e);
				recovery::escalate("bring-up").await
			}
		}
	}

	#[cfg(not(feature = "demo-dweet"))]
	demo::idle_loop(&mut leds).await;
}
