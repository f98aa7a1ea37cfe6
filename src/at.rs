//! Helpers for plain AT responses: final result codes, SIM state and
//! signal quality.

/// Final result of an AT exchange.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FinalResult {
	Ok,
	Error,
	/// Nothing came back
	Empty,
}

pub fn final_result(response: &str) -> FinalResult {
	if response.trim().is_empty() {
		FinalResult::Empty
	} else if response.contains("ERROR") {
		FinalResult::Error
	} else if response.contains("OK") {
		FinalResult::Ok
	} else {
		FinalResult::Error
	}
}

/// SIM state from +CPIN.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SimState {
	Ready,
	PinRequired,
	PukRequired,
	Other,
}

impl SimState {
	/// Value used as `status_data` in SIM events.
	pub fn code(self) -> i32 {
		match self {
			Self::Ready => 0,
			Self::PinRequired => 1,
			Self::PukRequired => 2,
			Self::Other => 3,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Ready => "ready",
			Self::PinRequired => "PIN required",
			Self::PukRequired => "PUK required",
			Self::Other => "unavailable",
		}
	}
}

/// Parse `+CPIN: <code>`. A bare ERROR usually means no SIM.
pub fn parse_cpin_response(response: &str) -> Option<SimState> {
	let Some(pos) = response.find("+CPIN:") else {
		return (final_result(response) == FinalResult::Error).then_some(SimState::Other);
	};
	let code = response[pos + 6..].lines().next()?.trim();
	Some(match code {
		"READY" => SimState::Ready,
		"SIM PIN" => SimState::PinRequired,
		"SIM PUK" => SimState::PukRequired,
		_ => SimState::Other,
	})
}

/// RSRP in dBm from `+CESQ: <rxlev>,<ber>,<rscp>,<ecno>,<rsrq>,<rsrp>`.
///
/// Index 255 means unknown. Index `n` covers `-141 + n` dBm.
pub fn parse_cesq_rsrp(response: &str) -> Option<i32> {
	let pos = response.find("+CESQ:")?;
	let line = response[pos + 6..].lines().next()?;
	let rsrp: i32 = line.split(',').nth(5)?.trim().parse().ok()?;
	if rsrp == 255 {
		return None;
	}
	Some(rsrp - 141)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn final_results() {
		assert_eq!(final_result("\r\nOK\r\n"), FinalResult::Ok);
		assert_eq!(final_result("+CME ERROR: 10\r\n"), FinalResult::Error);
		assert_eq!(final_result(""), FinalResult::Empty);
	}

	#[test]
	fn cpin_states() {
		assert_eq!(parse_cpin_response("+CPIN: READY\r\nOK\r\n"), Some(SimState::Ready));
		assert_eq!(parse_cpin_response("+CPIN: SIM PIN\r\nOK\r\n"), Some(SimState::PinRequired));
		assert_eq!(parse_cpin_response("+CME ERROR: 10\r\n"), Some(SimState::Other));
		assert_eq!(parse_cpin_response(""), None);
	}

	#[test]
	fn cesq_rsrp() {
		assert_eq!(parse_cesq_rsrp("+CESQ: 99,99,255,255,20,58\r\nOK"), Some(-83));
		assert_eq!(parse_cesq_rsrp("+CESQ: 99,99,255,255,255,255\r\nOK"), None);
	}
}
