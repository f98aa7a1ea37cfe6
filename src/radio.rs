//! Radio band and channel configuration.
//!
//! The health monitor emits the configuration sequence into a
//! [`CommandSink`]. In the firmware the sink is [`RadioQueue`], a bounded
//! queue drained by the modem command task, so emitting never waits on the
//! modem. Commands are fire-and-forget: their responses are logged but never
//! checked here, errors show up later as device events.

use core::fmt::Write as _;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::config::RadioConfig;

/// Longest AT command this module produces.
pub const COMMAND_CAPACITY: usize = 32;

pub type Command = heapless::String<COMMAND_CAPACITY>;

/// Destination for AT commands whose result is not awaited.
pub trait CommandSink {
	fn discard(&mut self, cmd: &str);
}

/// Commands waiting for the modem command task.
pub static RADIO_COMMANDS: Channel<CriticalSectionRawMutex, Command, 8> = Channel::new();

/// [`CommandSink`] backed by [`RADIO_COMMANDS`].
pub struct RadioQueue;

impl CommandSink for RadioQueue {
	fn discard(&mut self, cmd: &str) {
		let mut command = Command::new();
		if command.push_str(cmd).is_err() {
			crate::log_error!("AT command too long, dropped: {}", cmd);
			return;
		}
		if RADIO_COMMANDS.try_send(command).is_err() {
			crate::log_error!("Radio command queue full, dropped: {}", cmd);
		}
	}
}

/// Wait for the next queued command.
pub async fn next_command() -> Command {
	RADIO_COMMANDS.receive().await
}

/// Build the band/channel sequence: radio off, band, radio on, channel.
///
/// The modem only accepts the band change with the radio disabled, so the
/// order is fixed.
pub fn configuration_commands(radio: &RadioConfig) -> [Command; 4] {
	let mut band = Command::new();
	let mut earfcn = Command::new();
	// Both fit in COMMAND_CAPACITY for any u8 band and u32 channel.
	let _ = write!(band, "AT+BAND={}", radio.band);
	let _ = write!(earfcn, "AT+EARFCN={}", radio.earfcn);

	[fixed("AT+CFUN=4"), band, fixed("AT+CFUN=1"), earfcn]
}

/// Emit the configuration sequence into `sink`.
pub fn configure(radio: &RadioConfig, sink: &mut impl CommandSink) {
	for cmd in configuration_commands(radio) {
		sink.discard(&cmd);
	}
}

fn fixed(cmd: &str) -> Command {
	let mut command = Command::new();
	let _ = command.push_str(cmd);
	command
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Band;

	#[derive(Default)]
	struct Recorder(Vec<String>);

	impl CommandSink for Recorder {
		fn discard(&mut self, cmd: &str) {
			self.0.push(cmd.to_string());
		}
	}

	#[test]
	fn sequence_disables_radio_around_band_change() {
		let mut sink = Recorder::default();
		configure(&RadioConfig::for_band(Band::B5), &mut sink);
		assert_eq!(
			sink.0,
			["AT+CFUN=4", "AT+BAND=5", "AT+CFUN=1", "AT+EARFCN=2525"]
		);
	}

	#[test]
	fn largest_channel_fits() {
		let cmds = configuration_commands(&RadioConfig {
			band: u8::MAX,
			earfcn: u32::MAX,
		});
		assert_eq!(cmds[1].as_str(), "AT+BAND=255");
		assert_eq!(cmds[3].as_str(), "AT+EARFCN=4294967295");
	}
}
