//! Connection and device events.
//!
//! Everything that happens to the modem or the IP link is reported as a
//! [`ConnectionEvent`] on [`EVENTS`]. The supervisor task is the single
//! consumer and hands each event to the health monitor in arrival order.

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Depth of the event queue.
pub const EVENT_QUEUE_DEPTH: usize = 16;

/// Queue carrying events from the modem side to the supervisor.
pub static EVENTS: Channel<CriticalSectionRawMutex, ConnectionEvent, EVENT_QUEUE_DEPTH> =
	Channel::new();

/// Publish an event, waiting for room in the queue.
pub async fn publish(event: ConnectionEvent) {
	EVENTS.send(event).await;
}

/// Wait for the next event.
pub async fn next() -> ConnectionEvent {
	EVENTS.receive().await
}

/// Network-layer error code carried by device events.
///
/// Zero means OK, the negative values follow the usual socket API numbering.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
	pub const OK: Self = Self(0);
	pub const UNSUPPORTED: Self = Self(-3002);
	pub const NO_CONNECTION: Self = Self(-3004);
	pub const NO_ADDRESS: Self = Self(-3006);
	pub const NO_MEMORY: Self = Self(-3007);
	pub const DNS_FAILURE: Self = Self(-3009);
	pub const DEVICE_ERROR: Self = Self(-3012);
	pub const CONNECTION_LOST: Self = Self(-3016);
	pub const CONNECTION_TIMEOUT: Self = Self(-3017);

	pub fn is_ok(self) -> bool {
		self == Self::OK
	}
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Link-layer status of the IP interface.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LinkStatus {
	/// Local IP address configured
	LocalAddressUp,
	/// Global IP address configured, traffic can flow
	GlobalAddressUp,
	/// Connection attempt started
	Connecting,
	/// No connection to the network
	Disconnected,
	/// Status code this firmware does not know about
	Unsupported(i32),
}

impl LinkStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::LocalAddressUp => "Local IP address set",
			Self::GlobalAddressUp => "Global IP address set",
			Self::Connecting => "Connecting to network",
			Self::Disconnected => "No connection to network",
			Self::Unsupported(_) => "Not supported",
		}
	}
}

/// Device lifecycle events of the cellular modem.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeviceEvent {
	DeviceReady,
	SimStatusChanged,
	RegistrationStatusChanged,
	RegistrationTypeChanged,
	CellIdChanged,
	RadioAccessTechnologyChanged,
	AttachNetwork,
	ActivatePdpContext,
	SignalQuality,
	/// The connection sequence is retrying a failed step
	StateRetryEvent,
	/// The modem did not answer in time
	DeviceTimeout,
	/// Event code this firmware does not know about
	Unknown(i32),
}

impl DeviceEvent {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::DeviceReady => "CellularDeviceReady",
			Self::SimStatusChanged => "CellularSIMStatusChanged",
			Self::RegistrationStatusChanged => "CellularRegistrationStatusChanged",
			Self::RegistrationTypeChanged => "CellularRegistrationTypeChanged",
			Self::CellIdChanged => "CellularCellIDChanged",
			Self::RadioAccessTechnologyChanged => "CellularRadioAccessTechnologyChanged",
			Self::AttachNetwork => "CellularAttachNetwork",
			Self::ActivatePdpContext => "CellularActivatePDPContext",
			Self::SignalQuality => "CellularSignalQuality",
			Self::StateRetryEvent => "CellularStateRetryEvent",
			Self::DeviceTimeout => "CellularDeviceTimeout",
			Self::Unknown(_) => "Not supported status",
		}
	}
}

/// Payload of a device event.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CellularStatus {
	pub error: ErrorCode,
	/// Event specific value (registration state, cell id, RSRP, ...)
	pub status_data: i32,
	/// Set when the reporting step will not be retried again
	pub final_try: bool,
}

impl CellularStatus {
	pub const fn ok(status_data: i32) -> Self {
		Self {
			error: ErrorCode::OK,
			status_data,
			final_try: false,
		}
	}

	pub const fn failed(error: ErrorCode, status_data: i32, final_try: bool) -> Self {
		Self {
			error,
			status_data,
			final_try,
		}
	}
}

impl fmt::Display for CellularStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"(error={}) (status={}) (is_final_try={})",
			self.error, self.status_data, self.final_try as u8
		)
	}
}

/// An event delivered to the health monitor.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConnectionEvent {
	Link(LinkStatus),
	Device(DeviceEvent, CellularStatus),
}

impl ConnectionEvent {
	/// Device event carrying an OK status.
	pub const fn device(kind: DeviceEvent, status_data: i32) -> Self {
		Self::Device(kind, CellularStatus::ok(status_data))
	}

	/// Short name for logs.
	pub fn name(&self) -> &'static str {
		match self {
			Self::Link(status) => status.as_str(),
			Self::Device(kind, _) => kind.as_str(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names_for_logs() {
		assert_eq!(ConnectionEvent::Link(LinkStatus::Disconnected).name(), "No connection to network");
		assert_eq!(
			ConnectionEvent::device(DeviceEvent::DeviceReady, 0).name(),
			"CellularDeviceReady"
		);
	}

	#[test]
	fn status_renders_like_the_modem_log() {
		let status = CellularStatus::failed(ErrorCode::NO_CONNECTION, 3, true);
		assert_eq!(
			format!("{status}"),
			"(error=-3004) (status=3) (is_final_try=1)"
		);
	}

	#[test]
	fn queue_delivers_in_order() {
		let first = ConnectionEvent::device(DeviceEvent::DeviceReady, 0);
		let second = ConnectionEvent::Link(LinkStatus::Connecting);
		EVENTS.try_send(first).unwrap();
		EVENTS.try_send(second).unwrap();
		assert_eq!(EVENTS.try_receive().unwrap(), first);
		assert_eq!(EVENTS.try_receive().unwrap(), second);
	}
}
