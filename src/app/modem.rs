//! Modem initialization and management for nRF91 series.
//!
//! Brings up the embassy-net-nrf91 driver, spawns the tasks the modem
//! needs and announces `DeviceReady` once the modem answers.
//!
//! ## Modem Traces
//! With the `modem-trace` feature, modem traces are forwarded to UART1 at
//! 1 Mbaud. Connect a trace tool to the UART1 TX pin to capture them.
//!
//! ## Radio commands
//! Commands queued by the health monitor are executed by
//! [`radio_command_task`] one at a time. Responses are logged, never checked.

use core::mem::MaybeUninit;
use core::slice;

use cellular_demo::at::{self, FinalResult};
use cellular_demo::error::{Error, Result};
use cellular_demo::event::{self, ConnectionEvent, DeviceEvent};
use cellular_demo::{log_at, log_debug, log_info, radio};

use embassy_executor::Spawner;
use embassy_net_nrf91::{Control, NetDriver, Runner, State};
use embassy_nrf::interrupt;
use static_cell::StaticCell;

use super::status;

#[cfg(feature = "modem-trace")]
use core::ptr::addr_of_mut;
#[cfg(feature = "modem-trace")]
use embassy_net_nrf91::{TraceBuffer, TraceReader};
#[cfg(feature = "modem-trace")]
use embassy_nrf::buffered_uarte::{self, BufferedUarteTx};
#[cfg(feature = "modem-trace")]
use embassy_nrf::{bind_interrupts, gpio::Pin, peripherals, uarte, Peri};

// External symbols for IPC memory region (defined in memory.x)
unsafe extern "C" {
	static __start_ipc: u8;
	static __end_ipc: u8;
}

/// IPC interrupt handler required for modem communication.
#[interrupt]
fn IPC() {
	embassy_net_nrf91::on_ipc_irq();
}

#[cfg(feature = "modem-trace")]
bind_interrupts!(struct TraceIrqs {
	SERIAL1 => buffered_uarte::InterruptHandler<peripherals::SERIAL1>;
});

// Static buffer for trace UART TX
#[cfg(feature = "modem-trace")]
static mut TRACE_UART_BUF: [u8; 4096] = [0u8; 4096];

/// Task to run the modem driver.
///
/// This task must be spawned and will run forever, handling
/// modem IPC communication.
#[embassy_executor::task]
pub async fn modem_runner_task(runner: Runner<'static>) -> ! {
	runner.run().await
}

/// Task to forward modem traces to UART1.
#[cfg(feature = "modem-trace")]
#[embassy_executor::task]
pub async fn trace_task(mut uart: BufferedUarteTx<'static>, reader: TraceReader<'static>) -> ! {
	let mut rx = [0u8; 1024];
	loop {
		let n = reader.read(&mut rx[..]).await;
		let mut offset = 0;
		while offset < n {
			match uart.write(&rx[offset..n]).await {
				Ok(written) => offset += written,
				Err(_) => break,
			}
		}
	}
}

/// Task executing the radio configuration commands queued by the health
/// monitor.
#[embassy_executor::task]
pub async fn radio_command_task(control: &'static Control<'static>) -> ! {
	loop {
		let cmd = radio::next_command().await;
		let mut resp_buf = [0u8; 128];
		// Fire-and-forget: a failure here surfaces later as a device event
		let _ = send_logged(control, &cmd, &mut resp_buf).await;
	}
}

/// Get the IPC memory region from linker symbols.
///
/// # Safety
/// This function reads from linker-defined symbols and creates
/// a mutable slice from them. The caller must ensure the memory
/// region is valid and not accessed elsewhere.
unsafe fn get_ipc_memory() -> &'static mut [MaybeUninit<u8>] {
	let ipc_start = &__start_ipc as *const u8 as *mut MaybeUninit<u8>;
	let ipc_end = &__end_ipc as *const u8 as *mut MaybeUninit<u8>;
	let ipc_len = ipc_end.offset_from(ipc_start) as usize;
	slice::from_raw_parts_mut(ipc_start, ipc_len)
}

/// Initialize the modem and spawn required tasks.
///
/// Returns tuple of (NetDriver for network stack, Control for AT commands).
/// `DeviceReady` has been published when this returns.
///
/// # Errors
/// Returns `Error::TaskSpawn` if task spawning fails.
#[cfg(not(feature = "modem-trace"))]
pub async fn init(spawner: &Spawner) -> Result<(NetDriver<'static>, &'static Control<'static>)> {
	let ipc_mem = unsafe { get_ipc_memory() };

	static STATE: StaticCell<State> = StaticCell::new();
	let (device, control, runner) = embassy_net_nrf91::new(STATE.init(State::new()), ipc_mem).await;

	let token = modem_runner_task(runner).map_err(|_| Error::TaskSpawn)?;
	spawner.spawn(token);

	static CONTROL: StaticCell<Control<'static>> = StaticCell::new();
	let control = CONTROL.init(control);

	control.wait_init().await;
	start(spawner, control).await?;

	Ok((device, control))
}

/// Initialize the modem with trace forwarding to UART1.
///
/// Modem traces will be output on UART1 TX pin at 1 Mbaud.
///
/// # Errors
/// Returns `Error::TaskSpawn` if task spawning fails.
#[cfg(feature = "modem-trace")]
pub async fn init_with_trace(
	spawner: &Spawner,
	serial1: Peri<'static, peripherals::SERIAL1>,
	trace_tx_pin: Peri<'static, impl Pin>,
) -> Result<(NetDriver<'static>, &'static Control<'static>)> {
	let ipc_mem = unsafe { get_ipc_memory() };

	static STATE: StaticCell<State> = StaticCell::new();
	static TRACE_BUF: StaticCell<TraceBuffer> = StaticCell::new();

	let (device, control, runner, trace_reader) = embassy_net_nrf91::new_with_trace(
		STATE.init(State::new()),
		ipc_mem,
		TRACE_BUF.init(TraceBuffer::new()),
	)
	.await;

	let mut trace_config = uarte::Config::default();
	trace_config.baudrate = uarte::Baudrate::BAUD1M;

	let trace_uart =
		BufferedUarteTx::new(serial1, trace_tx_pin, TraceIrqs, trace_config, unsafe {
			&mut *addr_of_mut!(TRACE_UART_BUF)
		});

	let token = trace_task(trace_uart, trace_reader).map_err(|_| Error::TaskSpawn)?;
	spawner.spawn(token);

	let token = modem_runner_task(runner).map_err(|_| Error::TaskSpawn)?;
	spawner.spawn(token);

	static CONTROL_TRACE: StaticCell<Control<'static>> = StaticCell::new();
	let control = CONTROL_TRACE.init(control);

	control.wait_init().await;

	let mut resp_buf = [0u8; 64];
	let _ = control.at_command(b"AT%XMODEMTRACE=1,2", &mut resp_buf).await;

	start(spawner, control).await?;

	Ok((device, control))
}

/// Common tail of both init paths: identify the modem, start the command
/// executor and the status monitor, then report the device as ready.
async fn start(spawner: &Spawner, control: &'static Control<'static>) -> Result<()> {
	let mut buf = [0u8; 128];
	if let Some(version) = get_firmware_version(control, &mut buf).await {
		log_info!("Modem firmware: {}", version.trim_end_matches("OK").trim());
	}
	if let Some(imei) = get_imei(control, &mut buf).await {
		log_info!("IMEI: {}", imei.trim_end_matches("OK").trim());
	}

	let token = radio_command_task(control).map_err(|_| Error::TaskSpawn)?;
	spawner.spawn(token);

	let token = status::status_monitor_task(control).map_err(|_| Error::TaskSpawn)?;
	spawner.spawn(token);

	event::publish(ConnectionEvent::device(DeviceEvent::DeviceReady, 0)).await;
	Ok(())
}

/// Send an AT command and return the response text.
///
/// # Errors
/// `Error::NoResponse` if the modem returned nothing,
/// `Error::InvalidResponse` if the response is not UTF-8.
pub async fn at_query<'b>(control: &Control<'_>, cmd: &str, resp_buf: &'b mut [u8]) -> Result<&'b str> {
	let len = control.at_command(cmd.as_bytes(), resp_buf).await;
	if len == 0 {
		return Err(Error::NoResponse);
	}
	core::str::from_utf8(&resp_buf[..len]).map_err(|_| Error::InvalidResponse)
}

/// Send an AT command and log the exchange.
pub async fn send_logged<'b>(control: &Control<'_>, cmd: &str, resp_buf: &'b mut [u8]) -> Result<&'b str> {
	match at_query(control, cmd, resp_buf).await {
		Ok(resp) => {
			log_at!(cmd, resp.trim());
			Ok(resp)
		}
		Err(e) => {
			log_debug!(">> {} ({})", cmd, e);
			Err(e)
		}
	}
}

/// Send an AT command and check if response contains "OK".
///
/// # Returns
/// `Ok(())` if response contains "OK", `Err(Error::AtCommand)` otherwise.
pub async fn at_command_ok(control: &Control<'_>, cmd: &str) -> Result<()> {
	let mut resp_buf = [0u8; 128];
	let resp = send_logged(control, cmd, &mut resp_buf).await?;
	match at::final_result(resp) {
		FinalResult::Ok => Ok(()),
		FinalResult::Empty => Err(Error::NoResponse),
		FinalResult::Error => Err(Error::AtCommand),
	}
}

/// Get modem firmware version.
pub async fn get_firmware_version<'b>(control: &Control<'_>, buf: &'b mut [u8]) -> Option<&'b str> {
	at_query(control, "AT+CGMR", buf).await.ok()
}

/// Get IMEI.
pub async fn get_imei<'b>(control: &Control<'_>, buf: &'b mut [u8]) -> Option<&'b str> {
	at_query(control, "AT+CGSN", buf).await.ok()
}
