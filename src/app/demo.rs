//! Demo loops run once the board is up.
//!
//! With `demo-dweet` the firmware posts a signal value to dweet.io every
//! second and feeds each outcome to the health monitor. Without it the board
//! just idles and blinks.

#[cfg(not(feature = "demo-dweet"))]
pub use idle::idle_loop;

#[cfg(not(feature = "demo-dweet"))]
mod idle {
	use cellular_demo::config::timing::IDLE_INTERVAL_MS;
	use cellular_demo::log_info;

	use embassy_time::Timer;

	use crate::app::board::Leds;

	/// Log and blink twice every two seconds.
	pub async fn idle_loop(leds: &mut Leds) -> ! {
		loop {
			Timer::after_millis(IDLE_INTERVAL_MS).await;
			log_info!("Idle APP...");
			leds.blink(2).await;
		}
	}
}

#[cfg(feature = "demo-dweet")]
pub use dweet::dweet_loop;

#[cfg(feature = "demo-dweet")]
mod dweet {
	use cellular_demo::config::timing::{SOCKET_TIMEOUT_SECS, TRAFFIC_INTERVAL_MS};
	use cellular_demo::config::{DWEET_PORT, DWEET_SERVER, DWEET_THING, MSG_LEN};
	use cellular_demo::dweet;
	use cellular_demo::error::{Error, Result};
	use cellular_demo::health::RecoveryDecision;
	use cellular_demo::{log_debug, log_error, log_info, log_warn, HEALTH};

	use embassy_net::dns::DnsQueryType;
	use embassy_net::tcp::TcpSocket;
	use embassy_net::Stack;
	use embassy_time::{Duration, Timer};

	use crate::app::board::Leds;
	use crate::app::recovery;

	/// Post a signal every second, restart after too many failures in a row.
	pub async fn dweet_loop(stack: &Stack<'_>, leds: &mut Leds) -> ! {
		let mut i: u32 = 0;
		loop {
			Timer::after_millis(TRAFFIC_INTERVAL_MS).await;

			let signal = dweet::signal_value(i);
			let success = match send_signal(stack, "Signal", signal).await {
				Ok(()) => {
					leds.blink(1).await;
					true
				}
				Err(e) => {
					leds.blink(4).await;
					log_warn!("DWEET signal failed: {}", e);
					false
				}
			};

			if HEALTH.record_traffic_outcome(success) == RecoveryDecision::Escalate {
				log_error!("A lot of consecutive errors");
				recovery::escalate("traffic failures").await;
			}

			i = i.wrapping_add(1);
			let totals = HEALTH.totals();
			log_info!(
				"[[[[ [[[ [[ [ {} Success / {} Failure ] ]] ]]] ]]]]",
				totals.successes,
				totals.failures
			);
		}
	}

	/// One HTTP round trip: resolve, connect, send the request, read the
	/// first chunk of the response.
	async fn send_signal(stack: &Stack<'_>, key: &str, value: u32) -> Result<()> {
		let request = dweet::build_request(DWEET_THING, key, value)?;

		let addrs = stack
			.dns_query(DWEET_SERVER, DnsQueryType::A)
			.await
			.map_err(|_| Error::Dns)?;
		let addr = *addrs.first().ok_or(Error::Dns)?;

		let mut rx_buffer = [0u8; MSG_LEN];
		let mut tx_buffer = [0u8; MSG_LEN];
		let mut socket = TcpSocket::new(*stack, &mut rx_buffer, &mut tx_buffer);
		socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)));

		log_debug!("socket.connect...");
		let result = exchange(&mut socket, (addr, DWEET_PORT), request.as_bytes()).await;

		log_debug!("socket.close...");
		socket.close();
		result
	}

	async fn exchange(
		socket: &mut TcpSocket<'_>,
		remote: (embassy_net::IpAddress, u16),
		request: &[u8],
	) -> Result<()> {
		socket.connect(remote).await.map_err(|e| {
			log_warn!("Failed to connect with {}: {:?}", DWEET_SERVER, e);
			Error::Socket
		})?;

		log_debug!("socket.send...");
		let mut written = 0;
		while written < request.len() {
			match socket.write(&request[written..]).await {
				Ok(0) => {
					log_warn!("Failed to send HTTP request: connection closed");
					return Err(Error::Socket);
				}
				Ok(n) => written += n,
				Err(e) => {
					log_warn!("Failed to send HTTP request: {:?}", e);
					return Err(Error::Socket);
				}
			}
		}

		log_debug!("socket.recv...");
		let mut response = [0u8; MSG_LEN - 1];
		match socket.read(&mut response).await {
			Ok(n) => {
				if let Some(code) = dweet::status_code(&response[..n]) {
					log_debug!("HTTP {}", code);
				}
				Ok(())
			}
			Err(e) => {
				log_warn!("Failed to receive HTTP response: {:?}", e);
				Err(Error::Socket)
			}
		}
	}
}
