//! Cellular connect sequence.
//!
//! registration -> packet domain attach -> PDP context -> IP stack. Each
//! failed attempt is reported as a `StateRetryEvent`; once the retries are
//! used up the failing step is published with its error code and
//! `final_try` set, which the health monitor escalates.

use cellular_demo::config::timing::REGISTRATION_TIMEOUT_SECS;
use cellular_demo::error::{Error, Result};
use cellular_demo::event::{self, CellularStatus, ConnectionEvent, DeviceEvent, LinkStatus};
use cellular_demo::health::LinkState;
use cellular_demo::pdp::{self, DnsServers};
use cellular_demo::registration::{self, RegistrationStatus};
use cellular_demo::{log_error, log_info, log_warn, HEALTH};

use core::net::Ipv4Addr;

use embassy_net::Stack;
use embassy_net_nrf91::Control;
use embassy_time::{with_timeout, Duration, Timer};

use super::{modem, network};

/// How long the stack may take to apply the PDP configuration.
const CONFIG_TIMEOUT_SECS: u64 = 10;

/// A failed step and why it failed.
type StepError = (DeviceEvent, Error);

/// Connect to the cellular network, retrying failed attempts.
///
/// Returns once the link is globally up, or with the last error after the
/// final attempt has been reported.
pub async fn connect(control: &Control<'_>, stack: &Stack<'_>) -> Result<()> {
	while HEALTH.link() != LinkState::GlobalUp {
		match attempt(control, stack).await {
			Ok(()) => {
				HEALTH.record_connect_attempt(true);
				log_info!("Connection Established.");
				return Ok(());
			}
			Err((step, err)) => {
				let outcome = HEALTH.record_connect_attempt(false);
				let attempts = outcome.attempts as i32;
				if outcome.final_try {
					log_error!("Fatal connection failure: {}", err);
					let status = CellularStatus::failed(err.into(), attempts, true);
					event::publish(ConnectionEvent::Device(step, status)).await;
					return Err(err);
				}
				log_warn!("Couldn't connect: {}, will retry", err);
				event::publish(ConnectionEvent::device(DeviceEvent::StateRetryEvent, attempts)).await;
				Timer::after_secs(1).await;
			}
		}
	}
	Ok(())
}

async fn attempt(control: &Control<'_>, stack: &Stack<'_>) -> core::result::Result<(), StepError> {
	event::publish(ConnectionEvent::Link(LinkStatus::Connecting)).await;

	wait_registered(control)
		.await
		.map_err(|e| (DeviceEvent::RegistrationStatusChanged, e))?;

	check_attached(control).await.map_err(|e| (DeviceEvent::AttachNetwork, e))?;
	event::publish(ConnectionEvent::device(DeviceEvent::AttachNetwork, 1)).await;

	let ip = activate(control).await.map_err(|e| (DeviceEvent::ActivatePdpContext, e))?;
	event::publish(ConnectionEvent::device(DeviceEvent::ActivatePdpContext, 0)).await;

	let dns = dns_servers(control).await;
	network::configure(stack, ip, &dns);
	log_info!("IP address: {} ({} DNS servers)", ip, dns.len());
	event::publish(ConnectionEvent::Link(LinkStatus::LocalAddressUp)).await;

	with_timeout(Duration::from_secs(CONFIG_TIMEOUT_SECS), network::wait_for_config(stack))
		.await
		.map_err(|_| (DeviceEvent::ActivatePdpContext, Error::Timeout))?;
	event::publish(ConnectionEvent::Link(LinkStatus::GlobalAddressUp)).await;

	Ok(())
}

/// Wait until the modem is registered, home or roaming.
async fn wait_registered(control: &Control<'_>) -> Result<()> {
	let mut resp_buf = [0u8; 128];
	let current = modem::at_query(control, "AT+CEREG?", &mut resp_buf)
		.await
		.ok()
		.and_then(|resp| registration::parse_cereg_response(resp.as_bytes()))
		.map(|report| report.status);

	let status = match current {
		Some(status) if status.is_registered() => status,
		_ => {
			log_info!("Waiting for network registration...");
			with_timeout(
				Duration::from_secs(REGISTRATION_TIMEOUT_SECS),
				registration::wait_for_registration(),
			)
			.await
			.map_err(|_| Error::Timeout)?
		}
	};

	match status {
		RegistrationStatus::RegisteredHome | RegistrationStatus::RegisteredRoaming => {
			log_info!("Network registered!");
			Ok(())
		}
		other => {
			log_warn!("Registration failed: {}", other.as_str());
			Err(Error::Registration)
		}
	}
}

async fn check_attached(control: &Control<'_>) -> Result<()> {
	let mut resp_buf = [0u8; 64];
	let resp = modem::at_query(control, "AT+CGATT?", &mut resp_buf).await?;
	match pdp::parse_cgatt_response(resp) {
		Some(true) => Ok(()),
		Some(false) => Err(Error::Attach),
		None => Err(Error::InvalidResponse),
	}
}

/// Activate PDP context (data connection).
///
/// For nRF91, the default PDP context (CID 0) is normally activated by the
/// modem right after registration. Only if it has no address yet is it
/// activated by hand.
async fn activate(control: &Control<'_>) -> Result<Ipv4Addr> {
	// Give the modem time to establish data connection after registration
	Timer::after_millis(1000).await;

	if let Some(ip) = get_ip_address(control).await {
		return Ok(ip);
	}

	let _ = modem::at_command_ok(control, "AT+CGDCONT=0,\"IP\"").await;
	Timer::after_millis(100).await;

	if modem::at_command_ok(control, "AT+CGACT=1,0").await.is_err() {
		// The network may still be setting the bearer up
		Timer::after_millis(2000).await;
	} else {
		Timer::after_millis(1000).await;
	}

	get_ip_address(control).await.ok_or(Error::PdpActivation)
}

/// Get the IP address assigned to the PDP context.
async fn get_ip_address(control: &Control<'_>) -> Option<Ipv4Addr> {
	let mut resp_buf = [0u8; 128];
	let resp = modem::at_query(control, "AT+CGPADDR=0", &mut resp_buf).await.ok()?;
	pdp::parse_cgpaddr_response(resp)
}

async fn dns_servers(control: &Control<'_>) -> DnsServers {
	let mut resp_buf = [0u8; 256];
	match modem::at_query(control, "AT+CGCONTRDP=0", &mut resp_buf).await {
		Ok(resp) => pdp::parse_cgcontrdp_dns(resp),
		Err(_) => DnsServers::new(),
	}
}
