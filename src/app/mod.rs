//! Firmware side: board pins, modem, IP stack and the tasks tying them to
//! the health monitor.

pub mod board;
pub mod console;
pub mod demo;
pub mod recovery;

#[cfg(feature = "demo-dweet")]
mod connection;
#[cfg(feature = "demo-dweet")]
mod modem;
#[cfg(feature = "demo-dweet")]
mod network;
#[cfg(feature = "demo-dweet")]
mod status;
#[cfg(feature = "demo-dweet")]
mod supervisor;

#[cfg(feature = "demo-dweet")]
pub use bring_up::bring_up_network;

#[cfg(feature = "demo-dweet")]
mod bring_up {
	use cellular_demo::error::{Error, Result};
	use cellular_demo::{log_info, log_warn};

	use embassy_executor::Spawner;
	use embassy_net::Stack;
	#[cfg(feature = "modem-trace")]
	use embassy_nrf::{gpio::Pin, peripherals, Peri};

	use super::{connection, modem, network, supervisor};

	/// Start the modem and the IP stack and connect to the cellular network.
	///
	/// Returns once the link is globally up.
	///
	/// # Errors
	/// Returns `Error::TaskSpawn` if one of the tasks cannot be spawned.
	pub async fn bring_up_network(
		spawner: &Spawner,
		#[cfg(feature = "modem-trace")] serial1: Peri<'static, peripherals::SERIAL1>,
		#[cfg(feature = "modem-trace")] trace_tx_pin: Peri<'static, impl Pin>,
	) -> Result<&'static Stack<'static>> {
		// The supervisor must run before the modem reports DeviceReady
		let token = supervisor::supervisor_task().map_err(|_| Error::TaskSpawn)?;
		spawner.spawn(token);

		log_info!("Initializing modem...");
		#[cfg(not(feature = "modem-trace"))]
		let (device, control) = modem::init(spawner).await?;
		#[cfg(feature = "modem-trace")]
		let (device, control) = modem::init_with_trace(spawner, serial1, trace_tx_pin).await?;
		log_info!("Modem ready!");

		let stack = network::init(spawner, device).await?;

		log_info!("Establishing connection");
		while let Err(e) = connection::connect(control, stack).await {
			log_warn!("Could not connect to cellular network ({}) .. try again", e);
		}
		log_info!("Network ready!");

		Ok(stack)
	}
}
