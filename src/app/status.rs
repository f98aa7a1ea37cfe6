//! Modem status monitor.
//!
//! Polls SIM state, EPS registration and signal quality and turns every
//! change into a [`ConnectionEvent`]. Registration changes are also signalled
//! on `REGISTRATION_SIGNAL` for the connect sequence.

use cellular_demo::at::{self, SimState};
use cellular_demo::config::timing::STATUS_POLL_SECS;
use cellular_demo::error::Error;
use cellular_demo::event::{self, ConnectionEvent, DeviceEvent, LinkStatus};
use cellular_demo::registration::{self, AccessTechnology, RegistrationStatus, REGISTRATION_SIGNAL};
use cellular_demo::{log_info, HEALTH};

use embassy_net_nrf91::Control;
use embassy_time::Timer;

use super::modem;

/// EPS registration reporting with location information.
const CEREG_MODE: i32 = 2;

/// Task polling the modem status.
#[embassy_executor::task]
pub async fn status_monitor_task(control: &'static Control<'static>) -> ! {
	let mut monitor = StatusMonitor::new();

	monitor.enable_urcs(control).await;
	Timer::after_millis(100).await;

	loop {
		monitor.poll(control).await;
		Timer::after_secs(STATUS_POLL_SECS).await;
	}
}

/// Last reported state of the modem, used to publish changes only.
pub struct StatusMonitor {
	sim: Option<SimState>,
	registration: Option<RegistrationStatus>,
	cell_id: Option<u32>,
	act: Option<AccessTechnology>,
	rsrp: Option<i32>,
}

impl StatusMonitor {
	pub fn new() -> Self {
		Self {
			sim: None,
			registration: None,
			cell_id: None,
			act: None,
			rsrp: None,
		}
	}

	/// Enable CEREG reports with location information.
	pub async fn enable_urcs(&self, control: &Control<'_>) {
		if modem::at_command_ok(control, "AT+CEREG=2").await.is_ok() {
			event::publish(ConnectionEvent::device(
				DeviceEvent::RegistrationTypeChanged,
				CEREG_MODE,
			))
			.await;
		}
	}

	/// Query the modem once and publish whatever changed.
	pub async fn poll(&mut self, control: &Control<'_>) {
		self.poll_sim(control).await;
		self.poll_registration(control).await;
		self.poll_signal(control).await;
	}

	async fn poll_sim(&mut self, control: &Control<'_>) {
		let mut resp_buf = [0u8; 64];
		let Some(resp) = query(control, "AT+CPIN?", &mut resp_buf).await else {
			return;
		};
		let Some(sim) = at::parse_cpin_response(resp) else {
			return;
		};
		if self.sim != Some(sim) {
			self.sim = Some(sim);
			log_info!("SIM {}", sim.as_str());
			event::publish(ConnectionEvent::device(DeviceEvent::SimStatusChanged, sim.code())).await;
		}
	}

	async fn poll_registration(&mut self, control: &Control<'_>) {
		let mut resp_buf = [0u8; 128];
		let Some(resp) = query(control, "AT+CEREG?", &mut resp_buf).await else {
			return;
		};
		let Some(report) = registration::parse_cereg_response(resp.as_bytes()) else {
			return;
		};

		if self.registration != Some(report.status) {
			let was_registered = self.registration.is_some_and(RegistrationStatus::is_registered);
			self.registration = Some(report.status);
			log_info!("CEREG: {}", report.status.as_str());
			REGISTRATION_SIGNAL.signal(report.status);
			event::publish(ConnectionEvent::device(
				DeviceEvent::RegistrationStatusChanged,
				report.status as i32,
			))
			.await;

			if was_registered && !report.status.is_registered() && HEALTH.is_connected() {
				event::publish(ConnectionEvent::Link(LinkStatus::Disconnected)).await;
			}
		}

		if report.cell_id.is_some() && self.cell_id != report.cell_id {
			self.cell_id = report.cell_id;
			let cell_id = report.cell_id.unwrap_or_default();
			event::publish(ConnectionEvent::device(DeviceEvent::CellIdChanged, cell_id as i32)).await;
		}

		if let Some(act) = report.act {
			if self.act != Some(act) {
				self.act = Some(act);
				event::publish(ConnectionEvent::device(
					DeviceEvent::RadioAccessTechnologyChanged,
					act.code() as i32,
				))
				.await;
			}
		}
	}

	async fn poll_signal(&mut self, control: &Control<'_>) {
		let mut resp_buf = [0u8; 64];
		let Some(resp) = query(control, "AT+CESQ", &mut resp_buf).await else {
			return;
		};
		let rsrp = at::parse_cesq_rsrp(resp);
		if rsrp.is_some() && rsrp != self.rsrp {
			self.rsrp = rsrp;
			event::publish(ConnectionEvent::device(
				DeviceEvent::SignalQuality,
				rsrp.unwrap_or_default(),
			))
			.await;
		}
	}
}

/// Run a status query. A silent modem is reported as `DeviceTimeout`.
async fn query<'b>(control: &Control<'_>, cmd: &str, resp_buf: &'b mut [u8]) -> Option<&'b str> {
	match modem::at_query(control, cmd, resp_buf).await {
		Ok(resp) => Some(resp),
		Err(Error::NoResponse) => {
			event::publish(ConnectionEvent::device(DeviceEvent::DeviceTimeout, 0)).await;
			None
		}
		Err(_) => None,
	}
}
