//! UART console draining the log queue.

use core::fmt::Write as _;
use core::ptr::addr_of_mut;

use cellular_demo::error::{Error, Result};
use cellular_demo::logger::{self, Level, LINE_CAPACITY};

use embassy_executor::Spawner;
use embassy_nrf::buffered_uarte::{self, BufferedUarteTx};
use embassy_nrf::gpio::Pin;
use embassy_nrf::uarte::{self, Baudrate, Parity};
use embassy_nrf::{bind_interrupts, peripherals, Peri};
use embassy_time::Instant;

bind_interrupts!(struct ConsoleIrqs {
	SERIAL0 => buffered_uarte::InterruptHandler<peripherals::SERIAL0>;
});

static mut CONSOLE_UART_BUF: [u8; 2048] = [0u8; 2048];

/// Timestamp and level prefix on top of the line itself.
type Line = heapless::String<{ LINE_CAPACITY + 24 }>;

/// Start the console on SERIAL0 at 115200 baud.
///
/// # Errors
/// Returns `Error::TaskSpawn` if the console task cannot be spawned.
pub fn init(
	spawner: &Spawner,
	serial0: Peri<'static, peripherals::SERIAL0>,
	tx_pin: Peri<'static, impl Pin>,
) -> Result<()> {
	let mut config = uarte::Config::default();
	config.parity = Parity::EXCLUDED;
	config.baudrate = Baudrate::BAUD115200;

	let uart = BufferedUarteTx::new(serial0, tx_pin, ConsoleIrqs, config, unsafe {
		&mut *addr_of_mut!(CONSOLE_UART_BUF)
	});

	let token = console_task(uart).map_err(|_| Error::TaskSpawn)?;
	spawner.spawn(token);
	Ok(())
}

/// Task writing queued log lines to the UART.
#[embassy_executor::task]
pub async fn console_task(mut uart: BufferedUarteTx<'static>) -> ! {
	loop {
		let line = logger::next_line().await;

		let dropped = logger::take_dropped();
		if dropped > 0 {
			let mut out = Line::new();
			let _ = write!(out, "... {} log lines dropped", dropped);
			write_line(&mut uart, Level::Warn, &out).await;
		}

		write_line(&mut uart, line.level, &line.text).await;
	}
}

async fn write_line(uart: &mut BufferedUarteTx<'static>, level: Level, text: &str) {
	let mut out = Line::new();
	let _ = write!(out, "[{:08}ms] {} {}\r\n", Instant::now().as_millis(), level, text);

	let bytes = out.as_bytes();
	let mut offset = 0;
	while offset < bytes.len() {
		match uart.write(&bytes[offset..]).await {
			Ok(written) => offset += written,
			Err(_) => break,
		}
	}
}
