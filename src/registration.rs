//! Network registration status.
//!
//! Parses +CEREG reports (with the `n=2` location fields) and carries
//! registration changes to waiting tasks through a signal.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Network registration status from +CEREG responses.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegistrationStatus {
	/// Not registered, MT is not currently searching for a network
	NotRegistered = 0,
	/// Registered, home network
	RegisteredHome = 1,
	/// Not registered, MT is currently searching for a network
	Searching = 2,
	/// Registration denied
	Denied = 3,
	/// Unknown (e.g., out of range)
	Unknown = 4,
	/// Registered, roaming
	RegisteredRoaming = 5,
	/// UICC failure
	SimFailure = 90,
}

impl RegistrationStatus {
	/// Parse registration status from numeric value.
	pub fn from_u8(val: u8) -> Self {
		match val {
			0 => Self::NotRegistered,
			1 => Self::RegisteredHome,
			2 => Self::Searching,
			3 => Self::Denied,
			5 => Self::RegisteredRoaming,
			90 => Self::SimFailure,
			_ => Self::Unknown,
		}
	}

	/// Check if this status represents a successful network registration.
	pub fn is_registered(self) -> bool {
		matches!(self, Self::RegisteredHome | Self::RegisteredRoaming)
	}

	/// Registration can not succeed without outside intervention.
	pub fn is_rejected(self) -> bool {
		matches!(self, Self::Denied | Self::SimFailure)
	}

	/// Get a human-readable description of the status.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::NotRegistered => "Not registered",
			Self::RegisteredHome => "Registered (home network)",
			Self::Searching => "Searching...",
			Self::Denied => "Registration denied",
			Self::Unknown => "Unknown",
			Self::RegisteredRoaming => "Registered (roaming)",
			Self::SimFailure => "SIM failure",
		}
	}
}

/// Access technology reported in +CEREG.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AccessTechnology {
	LteM,
	NbIot,
	Other(u8),
}

impl AccessTechnology {
	pub fn from_u8(val: u8) -> Self {
		match val {
			7 => Self::LteM,
			9 => Self::NbIot,
			other => Self::Other(other),
		}
	}

	pub fn code(self) -> u8 {
		match self {
			Self::LteM => 7,
			Self::NbIot => 9,
			Self::Other(other) => other,
		}
	}
}

/// Decoded +CEREG report.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CeregReport {
	pub status: RegistrationStatus,
	pub tac: Option<u16>,
	pub cell_id: Option<u32>,
	pub act: Option<AccessTechnology>,
}

/// Global signal for CEREG registration status changes.
///
/// The status monitor signals this when registration status changes,
/// allowing other tasks to await registration events.
pub static REGISTRATION_SIGNAL: Signal<CriticalSectionRawMutex, RegistrationStatus> = Signal::new();

/// Parse a +CEREG response.
///
/// Handles both query response format: `+CEREG: <n>,<stat>[,<tac>,<ci>,<AcT>]`
/// and URC format: `+CEREG: <stat>[,<tac>,<ci>,<AcT>]`
pub fn parse_cereg_response(response: &[u8]) -> Option<CeregReport> {
	let resp_str = core::str::from_utf8(response).ok()?;

	let cereg_pos = resp_str.find("+CEREG:")?;
	let after_cereg = &resp_str[cereg_pos + 7..];
	let line = after_cereg.lines().next()?.trim();

	let mut fields = line.split(',').map(str::trim);
	let first = fields.next()?;

	// In the URC the second field is the quoted TAC, in the query it is <stat>
	let mut rest = fields.clone();
	let stat_str = match rest.next() {
		Some(second) if !second.starts_with('"') => {
			fields.next();
			second
		}
		_ => first,
	};

	let stat: u8 = stat_str.parse().ok()?;
	let tac = fields.next().and_then(parse_hex_field).map(|v| v as u16);
	let cell_id = fields.next().and_then(parse_hex_field);
	let act = fields
		.next()
		.and_then(|f| f.parse::<u8>().ok())
		.map(AccessTechnology::from_u8);

	Some(CeregReport {
		status: RegistrationStatus::from_u8(stat),
		tac,
		cell_id,
		act,
	})
}

fn parse_hex_field(field: &str) -> Option<u32> {
	let hex = field.trim_matches('"');
	if hex.is_empty() {
		return None;
	}
	u32::from_str_radix(hex, 16).ok()
}

/// Wait for the network to become registered.
///
/// Returns the registration status that caused the function to return.
pub async fn wait_for_registration() -> RegistrationStatus {
	loop {
		let status = REGISTRATION_SIGNAL.wait().await;
		if status.is_registered() || status.is_rejected() {
			return status;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn query_with_location() {
		let report = parse_cereg_response(b"+CEREG: 2,1,\"0A2E\",\"01A2D101\",7\r\nOK\r\n").unwrap();
		assert_eq!(report.status, RegistrationStatus::RegisteredHome);
		assert_eq!(report.tac, Some(0x0A2E));
		assert_eq!(report.cell_id, Some(0x01A2_D101));
		assert_eq!(report.act, Some(AccessTechnology::LteM));
	}

	#[test]
	fn query_while_searching() {
		let report = parse_cereg_response(b"+CEREG: 2,2\r\nOK\r\n").unwrap();
		assert_eq!(report.status, RegistrationStatus::Searching);
		assert_eq!(report.cell_id, None);
		assert!(!report.status.is_registered());
	}

	#[test]
	fn urc_format() {
		let report = parse_cereg_response(b"+CEREG: 5,\"0A2E\",\"00000B01\",9").unwrap();
		assert_eq!(report.status, RegistrationStatus::RegisteredRoaming);
		assert_eq!(report.cell_id, Some(0xB01));
		assert_eq!(report.act, Some(AccessTechnology::NbIot));
	}

	#[test]
	fn bare_urc() {
		let report = parse_cereg_response(b"+CEREG: 3").unwrap();
		assert!(report.status.is_rejected());
	}

	#[test]
	fn garbage_is_rejected() {
		assert_eq!(parse_cereg_response(b"ERROR\r\n"), None);
		assert_eq!(parse_cereg_response(b"+CEREG: x,y"), None);
	}
}
