//! Build-time configuration.
//!
//! Radio band and channel, the dweet endpoint and the fixed delays used
//! during bring-up and recovery.

/// LTE bands the board is expected to camp on, with the EARFCN used for each.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Band {
	B2,
	B3,
	B5,
	B8,
	B20,
	B28,
	B86,
}

impl Band {
	pub const ALL: [Band; 7] = [
		Band::B2,
		Band::B3,
		Band::B5,
		Band::B8,
		Band::B20,
		Band::B28,
		Band::B86,
	];

	/// 3GPP band number.
	pub const fn number(self) -> u8 {
		match self {
			Band::B2 => 2,
			Band::B3 => 3,
			Band::B5 => 5,
			Band::B8 => 8,
			Band::B20 => 20,
			Band::B28 => 28,
			Band::B86 => 86,
		}
	}

	/// Downlink channel used on this band.
	pub const fn earfcn(self) -> u32 {
		match self {
			Band::B2 => 744,
			Band::B3 => 1440,
			Band::B5 => 2525,
			Band::B8 => 3606,
			Band::B20 => 6300,
			Band::B28 => 9300,
			Band::B86 => 70546,
		}
	}
}

/// Radio band and channel programmed into the modem when it becomes ready.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RadioConfig {
	pub band: u8,
	pub earfcn: u32,
}

impl RadioConfig {
	pub const fn for_band(band: Band) -> Self {
		Self {
			band: band.number(),
			earfcn: band.earfcn(),
		}
	}

	/// Look up the band that owns `earfcn` in the channel table.
	pub const fn from_earfcn(earfcn: u32) -> Option<Self> {
		let mut i = 0;
		while i < Band::ALL.len() {
			if Band::ALL[i].earfcn() == earfcn {
				return Some(Self::for_band(Band::ALL[i]));
			}
			i += 1;
		}
		None
	}
}

impl Default for RadioConfig {
	fn default() -> Self {
		RADIO
	}
}

/// Downlink channel the modem is locked to. The band follows from the table.
pub const RADIO_EARFCN: u32 = 2525;

/// Radio settings of this build.
pub const RADIO: RadioConfig = match RadioConfig::from_earfcn(RADIO_EARFCN) {
	Some(radio) => radio,
	None => panic!("RADIO_EARFCN is not in the channel table"),
};

/// Most verbose log level, by name (`ERR`, `WRN`, `INF`, `DBG`). Unset keeps
/// the build default.
pub const LOG_LEVEL: Option<&str> = option_env!("LOG_LEVEL");

/// Host the dweet demo talks to.
pub const DWEET_SERVER: &str = "www.dweet.io";
/// Value of the Host header.
pub const DWEET_HOST_HEADER: &str = "dweet.io";
pub const DWEET_PORT: u16 = 80;

/// Dweet "thing" the signal is posted to.
pub const DWEET_THING: &str = match option_env!("DWEET_THING") {
	Some(thing) => thing,
	None => "nrf9151-demo",
};

/// Size of the request and response buffers.
pub const MSG_LEN: usize = 500;

/// Consecutive traffic failures that force a restart.
pub const MAX_CONSECUTIVE_FAILURES: u8 = 3;

/// Connection retries before a failure is reported as final.
pub const MAX_CONNECT_RETRIES: u8 = 3;

pub mod timing {
	/// Time the modem reset line is held low during power-on.
	pub const MODEM_RESET_HOLD_MS: u64 = 100;
	/// Settle time after releasing the modem from reset.
	pub const MODEM_SETTLE_MS: u64 = 1000;
	/// Time given to the console to flush before a system reset.
	pub const RESTART_FLUSH_MS: u64 = 2000;
	pub const TRAFFIC_INTERVAL_MS: u64 = 1000;
	pub const IDLE_INTERVAL_MS: u64 = 2000;
	pub const SOCKET_TIMEOUT_SECS: u64 = 30;
	pub const REGISTRATION_TIMEOUT_SECS: u64 = 180;
	pub const STATUS_POLL_SECS: u64 = 5;
	pub const LED_ON_MS: u64 = 200;
	pub const LED_OFF_MS: u64 = 400;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_radio_is_band_5() {
		assert_eq!(RADIO, RadioConfig { band: 5, earfcn: 2525 });
		assert_eq!(RADIO, RadioConfig::for_band(Band::B5));
	}

	#[test]
	fn earfcn_resolves_its_band() {
		assert_eq!(RadioConfig::from_earfcn(9300).map(|r| r.band), Some(28));
		assert_eq!(RadioConfig::from_earfcn(70546).map(|r| r.band), Some(86));
		assert_eq!(RadioConfig::from_earfcn(1234), None);
	}

	#[test]
	fn channel_table_has_no_duplicates() {
		for (i, a) in Band::ALL.iter().enumerate() {
			for b in &Band::ALL[i + 1..] {
				assert_ne!(a.earfcn(), b.earfcn());
			}
		}
	}
}
