//! Error handling for the cellular demo.
//!
//! Every operation that talks to the modem or the IP stack returns
//! `Result<T, Error>`. Nothing in this crate halts on error: failures that
//! cannot be handled in place are reported to the health monitor, which is
//! the only place allowed to decide on a system restart.

use core::fmt;

use crate::event::ErrorCode;

/// Application error type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
	/// Modem initialization failed
	ModemInit,
	/// AT command failed or returned ERROR
	AtCommand,
	/// No response from the modem
	NoResponse,
	/// Network registration failed or was denied
	Registration,
	/// Packet domain attach failed
	Attach,
	/// PDP context activation failed
	PdpActivation,
	/// Network stack initialization failed
	NetworkInit,
	/// DNS resolution failed
	Dns,
	/// TCP/IP socket error
	Socket,
	/// Timeout waiting for operation
	Timeout,
	/// Invalid response from modem or server
	InvalidResponse,
	/// Buffer too small for the message being built
	BufferFull,
	/// Task spawn failed
	TaskSpawn,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::ModemInit => write!(f, "Modem initialization failed"),
			Error::AtCommand => write!(f, "AT command failed"),
			Error::NoResponse => write!(f, "No response from modem"),
			Error::Registration => write!(f, "Network registration failed"),
			Error::Attach => write!(f, "Network attach failed"),
			Error::PdpActivation => write!(f, "PDP context activation failed"),
			Error::NetworkInit => write!(f, "Network stack initialization failed"),
			Error::Dns => write!(f, "DNS resolution failed"),
			Error::Socket => write!(f, "Socket error"),
			Error::Timeout => write!(f, "Operation timed out"),
			Error::InvalidResponse => write!(f, "Invalid response"),
			Error::BufferFull => write!(f, "Buffer too small"),
			Error::TaskSpawn => write!(f, "Failed to spawn task"),
		}
	}
}

impl From<Error> for ErrorCode {
	fn from(err: Error) -> Self {
		match err {
			Error::ModemInit | Error::AtCommand | Error::InvalidResponse => ErrorCode::DEVICE_ERROR,
			Error::NoResponse | Error::Timeout => ErrorCode::CONNECTION_TIMEOUT,
			Error::Registration | Error::Attach => ErrorCode::NO_CONNECTION,
			Error::PdpActivation => ErrorCode::NO_ADDRESS,
			Error::NetworkInit | Error::TaskSpawn => ErrorCode::UNSUPPORTED,
			Error::Dns => ErrorCode::DNS_FAILURE,
			Error::Socket => ErrorCode::CONNECTION_LOST,
			Error::BufferFull => ErrorCode::NO_MEMORY,
		}
	}
}

/// Result type alias for this application.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_error_maps_to_a_failure_code() {
		let all = [
			Error::ModemInit,
			Error::AtCommand,
			Error::NoResponse,
			Error::Registration,
			Error::Attach,
			Error::PdpActivation,
			Error::NetworkInit,
			Error::Dns,
			Error::Socket,
			Error::Timeout,
			Error::InvalidResponse,
			Error::BufferFull,
			Error::TaskSpawn,
		];
		for err in all {
			assert!(!ErrorCode::from(err).is_ok(), "{err} mapped to OK");
		}
	}
}
