//! Connection health monitor.
//!
//! Classifies every connection event and every traffic outcome into a
//! [`RecoveryDecision`]. The monitor never tries to repair anything itself:
//! the only recovery is a full system restart, which the firmware performs
//! when it is handed [`RecoveryDecision::Escalate`].
//!
//! The state is shared between the supervisor task (events) and the demo
//! loop (traffic outcomes). Every operation is a single critical section;
//! logging and radio commands happen after the lock is released.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::config::{RadioConfig, MAX_CONNECT_RETRIES, MAX_CONSECUTIVE_FAILURES};
use crate::event::{CellularStatus, ConnectionEvent, DeviceEvent, LinkStatus};
use crate::radio::{self, CommandSink};
use crate::{log_debug, log_error, log_info};

/// What the caller must do after an event or outcome.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RecoveryDecision {
	/// Nothing to do
	Continue,
	/// The failed step may be attempted again
	Retry,
	/// Restart the system
	Escalate,
}

/// Link state inferred from the last link-layer event.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LinkState {
	Down,
	Connecting,
	LocalUp,
	GlobalUp,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
	Nominal,
	/// A restart has been requested, terminal for this boot
	Restarting,
}

/// Mutable state guarded by the monitor.
#[derive(Clone, Copy, Debug)]
pub struct HealthState {
	pub consecutive_failures: u8,
	pub successes: u32,
	pub failures: u32,
	pub connect_attempts: u8,
	pub link: LinkState,
	pub last_device_event: Option<DeviceEvent>,
	pub mode: Mode,
}

impl HealthState {
	pub const fn new() -> Self {
		Self {
			consecutive_failures: 0,
			successes: 0,
			failures: 0,
			connect_attempts: 0,
			link: LinkState::Down,
			last_device_event: None,
			mode: Mode::Nominal,
		}
	}
}

impl Default for HealthState {
	fn default() -> Self {
		Self::new()
	}
}

/// Success and failure totals of the traffic loop.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TrafficTotals {
	pub successes: u32,
	pub failures: u32,
}

/// Result of recording a connection attempt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ConnectOutcome {
	pub decision: RecoveryDecision,
	/// Failed attempts so far, zero after a success
	pub attempts: u8,
	/// No retries left, the failure should be reported as final
	pub final_try: bool,
}

pub struct HealthMonitor {
	radio: RadioConfig,
	state: Mutex<CriticalSectionRawMutex, RefCell<HealthState>>,
}

impl HealthMonitor {
	pub const fn new(radio: RadioConfig) -> Self {
		Self {
			radio,
			state: Mutex::new(RefCell::new(HealthState::new())),
		}
	}

	/// Copy of the current state.
	pub fn snapshot(&self) -> HealthState {
		self.state.lock(|state| *state.borrow())
	}

	pub fn link(&self) -> LinkState {
		self.state.lock(|state| state.borrow().link)
	}

	/// True while the IP link is usable.
	pub fn is_connected(&self) -> bool {
		matches!(self.link(), LinkState::LocalUp | LinkState::GlobalUp)
	}

	pub fn totals(&self) -> TrafficTotals {
		self.state.lock(|state| {
			let state = state.borrow();
			TrafficTotals {
				successes: state.successes,
				failures: state.failures,
			}
		})
	}

	/// Classify a connection event.
	///
	/// `DeviceReady` additionally emits the radio band/channel sequence into
	/// `sink`; that side effect does not change the decision.
	pub fn classify(&self, event: &ConnectionEvent, sink: &mut impl CommandSink) -> RecoveryDecision {
		match *event {
			ConnectionEvent::Link(status) => self.classify_link(status),
			ConnectionEvent::Device(kind, status) => self.classify_device(kind, status, sink),
		}
	}

	fn classify_link(&self, status: LinkStatus) -> RecoveryDecision {
		let next = match status {
			LinkStatus::LocalAddressUp => LinkState::LocalUp,
			LinkStatus::GlobalAddressUp => LinkState::GlobalUp,
			LinkStatus::Connecting => LinkState::Connecting,
			LinkStatus::Disconnected => LinkState::Down,
			LinkStatus::Unsupported(code) => {
				log_error!("Not supported (0x{:X})", code);
				return RecoveryDecision::Escalate;
			}
		};
		self.state.lock(|state| state.borrow_mut().link = next);

		log_debug!("{}!", status.as_str());
		match status {
			LinkStatus::Disconnected => RecoveryDecision::Escalate,
			_ => RecoveryDecision::Continue,
		}
	}

	fn classify_device(
		&self,
		kind: DeviceEvent,
		status: CellularStatus,
		sink: &mut impl CommandSink,
	) -> RecoveryDecision {
		self.state.lock(|state| state.borrow_mut().last_device_event = Some(kind));

		let decision = match kind {
			DeviceEvent::DeviceReady => {
				log_debug!("{} {}", kind.as_str(), status);
				radio::configure(&self.radio, sink);
				RecoveryDecision::Continue
			}
			DeviceEvent::SimStatusChanged
			| DeviceEvent::RegistrationStatusChanged
			| DeviceEvent::RegistrationTypeChanged
			| DeviceEvent::CellIdChanged
			| DeviceEvent::RadioAccessTechnologyChanged
			| DeviceEvent::AttachNetwork
			| DeviceEvent::ActivatePdpContext
			| DeviceEvent::SignalQuality => {
				log_debug!("{} {}", kind.as_str(), status);
				RecoveryDecision::Continue
			}
			DeviceEvent::StateRetryEvent => {
				log_info!("{} {}", kind.as_str(), status);
				RecoveryDecision::Continue
			}
			// Too frequent to be worth a line
			DeviceEvent::DeviceTimeout => RecoveryDecision::Continue,
			DeviceEvent::Unknown(code) => {
				log_error!("{} (code={}) {}", kind.as_str(), code, status);
				RecoveryDecision::Escalate
			}
		};

		if !status.error.is_ok() {
			log_error!("Unrecoverable Error: {} {}", kind.as_str(), status);
			return RecoveryDecision::Escalate;
		}
		decision
	}

	/// Record the outcome of one round trip of the traffic loop.
	pub fn record_traffic_outcome(&self, success: bool) -> RecoveryDecision {
		self.state.lock(|state| {
			let mut state = state.borrow_mut();
			if success {
				state.successes = state.successes.wrapping_add(1);
				state.consecutive_failures = 0;
				return RecoveryDecision::Continue;
			}

			state.failures = state.failures.wrapping_add(1);
			state.consecutive_failures += 1;
			if state.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
				state.consecutive_failures = 0;
				RecoveryDecision::Escalate
			} else {
				RecoveryDecision::Continue
			}
		})
	}

	/// Record the outcome of one connection attempt.
	///
	/// Failures always ask for a retry. The failure that follows more than
	/// [`MAX_CONNECT_RETRIES`] failed retries is flagged as final and the
	/// counter starts over.
	pub fn record_connect_attempt(&self, success: bool) -> ConnectOutcome {
		self.state.lock(|state| {
			let mut state = state.borrow_mut();
			if success {
				state.connect_attempts = 0;
				return ConnectOutcome {
					decision: RecoveryDecision::Continue,
					attempts: 0,
					final_try: false,
				};
			}

			let attempts = state.connect_attempts + 1;
			let final_try = state.connect_attempts > MAX_CONNECT_RETRIES;
			state.connect_attempts = if final_try { 0 } else { attempts };
			ConnectOutcome {
				decision: RecoveryDecision::Retry,
				attempts,
				final_try,
			}
		})
	}

	/// Enter the restarting mode. Returns `true` for the first caller only.
	pub fn begin_restart(&self) -> bool {
		self.state.lock(|state| {
			let mut state = state.borrow_mut();
			let first = state.mode == Mode::Nominal;
			state.mode = Mode::Restarting;
			first
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::RADIO;
	use crate::event::ErrorCode;
	use crate::logger;

	#[derive(Default)]
	struct Recorder(Vec<String>);

	impl CommandSink for Recorder {
		fn discard(&mut self, cmd: &str) {
			self.0.push(cmd.to_string());
		}
	}

	const LOG_ONLY: [DeviceEvent; 8] = [
		DeviceEvent::SimStatusChanged,
		DeviceEvent::RegistrationStatusChanged,
		DeviceEvent::RegistrationTypeChanged,
		DeviceEvent::CellIdChanged,
		DeviceEvent::RadioAccessTechnologyChanged,
		DeviceEvent::AttachNetwork,
		DeviceEvent::ActivatePdpContext,
		DeviceEvent::SignalQuality,
	];

	fn all_device_events() -> Vec<DeviceEvent> {
		let mut all = LOG_ONLY.to_vec();
		all.extend([
			DeviceEvent::DeviceReady,
			DeviceEvent::StateRetryEvent,
			DeviceEvent::DeviceTimeout,
			DeviceEvent::Unknown(42),
		]);
		all
	}

	fn monitor() -> HealthMonitor {
		HealthMonitor::new(RADIO)
	}

	#[test]
	fn any_error_code_escalates() {
		let monitor = monitor();
		let errors = [ErrorCode::NO_CONNECTION, ErrorCode::DEVICE_ERROR, ErrorCode(1)];
		for kind in all_device_events() {
			for error in errors {
				for final_try in [false, true] {
					let event = ConnectionEvent::Device(kind, CellularStatus::failed(error, 0, final_try));
					assert_eq!(
						monitor.classify(&event, &mut Recorder::default()),
						RecoveryDecision::Escalate,
						"{kind:?} with {error:?}"
					);
				}
			}
		}
	}

	#[test]
	fn known_device_events_continue() {
		let monitor = monitor();
		let mut sink = Recorder::default();
		for kind in LOG_ONLY
			.into_iter()
			.chain([DeviceEvent::StateRetryEvent, DeviceEvent::DeviceTimeout])
		{
			let event = ConnectionEvent::device(kind, 1);
			assert_eq!(monitor.classify(&event, &mut sink), RecoveryDecision::Continue, "{kind:?}");
		}
		assert!(sink.0.is_empty());
	}

	#[test]
	fn unknown_device_event_escalates() {
		let event = ConnectionEvent::device(DeviceEvent::Unknown(99), 0);
		assert_eq!(
			monitor().classify(&event, &mut Recorder::default()),
			RecoveryDecision::Escalate
		);
	}

	#[test]
	fn link_events() {
		let monitor = monitor();
		let mut sink = Recorder::default();
		for status in [
			LinkStatus::LocalAddressUp,
			LinkStatus::GlobalAddressUp,
			LinkStatus::Connecting,
		] {
			assert_eq!(
				monitor.classify(&ConnectionEvent::Link(status), &mut sink),
				RecoveryDecision::Continue
			);
		}
		assert_eq!(
			monitor.classify(&ConnectionEvent::Link(LinkStatus::Disconnected), &mut sink),
			RecoveryDecision::Escalate
		);
		assert_eq!(
			monitor.classify(&ConnectionEvent::Link(LinkStatus::Unsupported(7)), &mut sink),
			RecoveryDecision::Escalate
		);
	}

	#[test]
	fn link_state_follows_events() {
		let monitor = monitor();
		let mut sink = Recorder::default();
		assert!(!monitor.is_connected());

		monitor.classify(&ConnectionEvent::Link(LinkStatus::Connecting), &mut sink);
		assert_eq!(monitor.link(), LinkState::Connecting);
		monitor.classify(&ConnectionEvent::Link(LinkStatus::GlobalAddressUp), &mut sink);
		assert!(monitor.is_connected());
		monitor.classify(&ConnectionEvent::Link(LinkStatus::Disconnected), &mut sink);
		assert_eq!(monitor.link(), LinkState::Down);
	}

	#[test]
	fn bring_up_scenario_configures_radio_once() {
		let monitor = monitor();
		let mut sink = Recorder::default();
		let events = [
			ConnectionEvent::device(DeviceEvent::DeviceReady, 0),
			ConnectionEvent::device(DeviceEvent::SimStatusChanged, 0),
			ConnectionEvent::Link(LinkStatus::Connecting),
			ConnectionEvent::Link(LinkStatus::GlobalAddressUp),
		];
		let decisions: Vec<_> = events.iter().map(|e| monitor.classify(e, &mut sink)).collect();

		assert_eq!(decisions, [RecoveryDecision::Continue; 4]);
		assert_eq!(
			sink.0,
			["AT+CFUN=4", "AT+BAND=5", "AT+CFUN=1", "AT+EARFCN=2525"]
		);
		assert_eq!(
			monitor.snapshot().last_device_event,
			Some(DeviceEvent::SimStatusChanged)
		);
	}

	#[test]
	fn failed_device_ready_still_escalates() {
		let mut sink = Recorder::default();
		let event = ConnectionEvent::Device(
			DeviceEvent::DeviceReady,
			CellularStatus::failed(ErrorCode::DEVICE_ERROR, 0, true),
		);
		assert_eq!(monitor().classify(&event, &mut sink), RecoveryDecision::Escalate);
	}

	#[test]
	fn registration_error_escalates() {
		let event = ConnectionEvent::Device(
			DeviceEvent::RegistrationStatusChanged,
			CellularStatus::failed(ErrorCode::NO_CONNECTION, 3, false),
		);
		assert_eq!(
			monitor().classify(&event, &mut Recorder::default()),
			RecoveryDecision::Escalate
		);
	}

	#[test]
	fn third_consecutive_failure_escalates() {
		let monitor = monitor();
		assert_eq!(monitor.record_traffic_outcome(false), RecoveryDecision::Continue);
		assert_eq!(monitor.record_traffic_outcome(false), RecoveryDecision::Continue);
		assert_eq!(monitor.record_traffic_outcome(false), RecoveryDecision::Escalate);
		assert_eq!(monitor.snapshot().consecutive_failures, 0);
	}

	#[test]
	fn success_resets_failure_streak() {
		let monitor = monitor();
		monitor.record_traffic_outcome(false);
		assert_eq!(monitor.record_traffic_outcome(true), RecoveryDecision::Continue);
		assert_eq!(monitor.snapshot().consecutive_failures, 0);

		assert_eq!(monitor.record_traffic_outcome(false), RecoveryDecision::Continue);
		assert_eq!(monitor.record_traffic_outcome(false), RecoveryDecision::Continue);
		assert_eq!(
			monitor.totals(),
			TrafficTotals {
				successes: 1,
				failures: 3
			}
		);
	}

	#[test]
	fn connect_failures_retry_until_final() {
		let monitor = monitor();
		// First attempt plus MAX_CONNECT_RETRIES retries, none of them final
		for attempt in 1..=MAX_CONNECT_RETRIES + 1 {
			let outcome = monitor.record_connect_attempt(false);
			assert_eq!(outcome.decision, RecoveryDecision::Retry);
			assert_eq!(outcome.attempts, attempt);
			assert!(!outcome.final_try, "attempt {attempt}");
		}
		let last = monitor.record_connect_attempt(false);
		assert!(last.final_try);
		assert_eq!(last.attempts, MAX_CONNECT_RETRIES + 2);
		assert_eq!(monitor.snapshot().connect_attempts, 0);

		monitor.record_connect_attempt(false);
		let ok = monitor.record_connect_attempt(true);
		assert_eq!(ok.decision, RecoveryDecision::Continue);
		assert_eq!(monitor.snapshot().connect_attempts, 0);
	}

	#[test]
	fn final_flag_only_on_fifth_failure() {
		let monitor = monitor();
		let flags: Vec<bool> = (0..5)
			.map(|_| monitor.record_connect_attempt(false).final_try)
			.collect();
		assert_eq!(flags, [false, false, false, false, true]);
	}

	#[test]
	fn timeout_is_silent_and_retry_logs_at_info() {
		let monitor = monitor();
		let mut sink = Recorder::default();
		logger::take_captured();

		monitor.classify(&ConnectionEvent::device(DeviceEvent::DeviceTimeout, 4711), &mut sink);
		assert!(logger::take_captured().is_empty());

		monitor.classify(&ConnectionEvent::device(DeviceEvent::StateRetryEvent, 4712), &mut sink);
		let lines = logger::take_captured();
		assert_eq!(lines.len(), 1);
		assert_eq!(lines[0].level, logger::Level::Info);
		assert!(lines[0].text.starts_with("CellularStateRetryEvent"));
		assert!(lines[0].text.contains("(status=4712)"));
	}

	#[test]
	fn restart_is_entered_once() {
		let monitor = monitor();
		assert!(monitor.begin_restart());
		assert!(!monitor.begin_restart());
		assert_eq!(monitor.snapshot().mode, Mode::Restarting);
	}
}
