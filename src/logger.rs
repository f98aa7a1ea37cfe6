//! Logging over a line queue.
//!
//! The `log_*!` macros format into a fixed-size `heapless::String` and push
//! the line onto [`LOG_QUEUE`] without waiting, so they can be used from
//! plain functions as well as from tasks. The console task in the firmware
//! drains the queue to the UART. A full queue drops the line and counts it.

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use portable_atomic::{AtomicU32, AtomicU8, Ordering};

/// Maximum length of one log line, longer output is truncated.
pub const LINE_CAPACITY: usize = 192;

/// Depth of the log queue.
pub const LOG_QUEUE_DEPTH: usize = 32;

/// Text of one log line.
pub type Text = heapless::String<LINE_CAPACITY>;

/// Severity of a log line, most severe first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum Level {
	Error = 0,
	Warn = 1,
	Info = 2,
	Debug = 3,
}

impl Level {
	pub fn as_str(self) -> &'static str {
		match self {
			Level::Error => "ERR",
			Level::Warn => "WRN",
			Level::Info => "INF",
			Level::Debug => "DBG",
		}
	}

	fn from_u8(val: u8) -> Self {
		match val {
			0 => Level::Error,
			1 => Level::Warn,
			2 => Level::Info,
			_ => Level::Debug,
		}
	}
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One queued log line.
#[derive(Clone, Debug)]
pub struct LogLine {
	pub level: Level,
	pub text: Text,
}

/// Lines waiting for the console.
pub static LOG_QUEUE: Channel<CriticalSectionRawMutex, LogLine, LOG_QUEUE_DEPTH> = Channel::new();

static MAX_LEVEL: AtomicU8 = AtomicU8::new(if cfg!(debug_assertions) {
	Level::Debug as u8
} else {
	Level::Info as u8
});

static DROPPED: AtomicU32 = AtomicU32::new(0);

/// Set the most verbose level that still gets queued.
pub fn set_max_level(level: Level) {
	MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn max_level() -> Level {
	Level::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

pub fn enabled(level: Level) -> bool {
	level <= max_level()
}

/// Queue a formatted line. Used by the macros, never blocks.
pub fn submit(level: Level, text: Text) {
	let line = LogLine { level, text };
	#[cfg(test)]
	capture::record(&line);
	if LOG_QUEUE.try_send(line).is_err() {
		DROPPED.fetch_add(1, Ordering::Relaxed);
	}
}

/// Queue a line, waiting for room instead of dropping it.
///
/// For the last lines before a reset, which must reach the console.
pub async fn submit_waiting(level: Level, text: Text) {
	enqueue_waiting(&LOG_QUEUE, LogLine { level, text }).await;
}

async fn enqueue_waiting<const N: usize>(
	queue: &Channel<CriticalSectionRawMutex, LogLine, N>,
	line: LogLine,
) {
	#[cfg(test)]
	capture::record(&line);
	queue.send(line).await;
}

/// Parse a level name as printed in the log (`ERR`, `WRN`, `INF`, `DBG`).
pub fn level_from_name(name: &str) -> Option<Level> {
	[Level::Error, Level::Warn, Level::Info, Level::Debug]
		.into_iter()
		.find(|level| level.as_str().eq_ignore_ascii_case(name))
}

/// Number of lines dropped since the last call.
pub fn take_dropped() -> u32 {
	DROPPED.swap(0, Ordering::Relaxed)
}

/// Wait for the next queued line.
pub async fn next_line() -> LogLine {
	LOG_QUEUE.receive().await
}

/// Log a formatted message at the given level.
///
/// # Example
/// ```ignore
/// log!(Level::Info, "Counter: {}", 42);
/// ```
#[macro_export]
macro_rules! log {
	($level:expr, $($arg:tt)*) => {{
		let level = $level;
		if $crate::logger::enabled(level) {
			use core::fmt::Write as _;
			let mut text = $crate::logger::Text::new();
			let _ = core::write!(&mut text, $($arg)*);
			$crate::logger::submit(level, text);
		}
	}};
}

#[macro_export]
macro_rules! log_error {
	($($arg:tt)*) => { $crate::log!($crate::logger::Level::Error, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
	($($arg:tt)*) => { $crate::log!($crate::logger::Level::Warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_info {
	($($arg:tt)*) => { $crate::log!($crate::logger::Level::Info, $($arg)*) };
}

#[macro_export]
macro_rules! log_debug {
	($($arg:tt)*) => { $crate::log!($crate::logger::Level::Debug, $($arg)*) };
}

/// Log an AT command exchange (command sent and response received).
///
/// # Example
/// ```ignore
/// log_at!("AT+CFUN?", response_str);
/// ```
#[macro_export]
macro_rules! log_at {
	($cmd:expr, $resp:expr) => {{
		$crate::log_debug!(">> {}", $cmd);
		$crate::log_debug!("<< {}", $resp);
	}};
}

/// Per-thread copy of every submitted line, so tests running in parallel
/// can check what they logged.
#[cfg(test)]
mod capture {
	use std::cell::RefCell;
	use std::vec::Vec;

	use super::LogLine;

	std::thread_local! {
		static LINES: RefCell<Vec<LogLine>> = const { RefCell::new(Vec::new()) };
	}

	pub fn record(line: &LogLine) {
		LINES.with(|lines| lines.borrow_mut().push(line.clone()));
	}

	pub fn take() -> Vec<LogLine> {
		LINES.with(|lines| lines.take())
	}
}

/// Lines logged by the current test thread since the last call.
#[cfg(test)]
pub fn take_captured() -> std::vec::Vec<LogLine> {
	capture::take()
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::FutureExt as _;

	#[test]
	fn levels_order_from_most_severe() {
		assert!(Level::Error < Level::Warn);
		assert!(Level::Info < Level::Debug);
		assert_eq!(Level::from_u8(Level::Warn as u8), Level::Warn);
		assert_eq!(Level::from_u8(200), Level::Debug);
	}

	#[test]
	fn errors_are_always_enabled() {
		assert!(enabled(Level::Error));
	}

	#[test]
	fn level_names() {
		assert_eq!(level_from_name("WRN"), Some(Level::Warn));
		assert_eq!(level_from_name("dbg"), Some(Level::Debug));
		assert_eq!(level_from_name("verbose"), None);
	}

	fn line(text: &str) -> LogLine {
		LogLine {
			level: Level::Error,
			text: Text::try_from(text).unwrap(),
		}
	}

	#[test]
	fn waiting_submit_holds_line_until_queue_has_room() {
		let queue: Channel<CriticalSectionRawMutex, LogLine, 2> = Channel::new();
		queue.try_send(line("first")).unwrap();
		queue.try_send(line("second")).unwrap();

		// Full queue: the line is neither queued nor dropped, the send waits
		assert!(enqueue_waiting(&queue, line("reset")).now_or_never().is_none());
		assert_eq!(queue.len(), 2);

		assert_eq!(queue.try_receive().unwrap().text, "first");
		futures::executor::block_on(enqueue_waiting(&queue, line("reset")));
		assert_eq!(queue.try_receive().unwrap().text, "second");
		assert_eq!(queue.try_receive().unwrap().text, "reset");
	}
}
