//! Dweet signal request building and response inspection.

use core::fmt::Write as _;

use crate::config::{DWEET_HOST_HEADER, MSG_LEN};
use crate::error::{Error, Result};

pub type Request = heapless::String<MSG_LEN>;

/// Value posted on iteration `i`: odd iterations send `i`, even ones `0`,
/// so the dweet graph shows a square-ish wave.
pub fn signal_value(iteration: u32) -> u32 {
	if iteration % 2 != 0 {
		iteration
	} else {
		0
	}
}

/// Build `GET /dweet/for/<thing>?<key>=<value>`.
pub fn build_request(thing: &str, key: &str, value: u32) -> Result<Request> {
	let mut request = Request::new();
	write!(
		request,
		"GET /dweet/for/{}?{}={} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
		thing, key, value, DWEET_HOST_HEADER
	)
	.map_err(|_| Error::BufferFull)?;
	Ok(request)
}

/// Status code from the first line of an HTTP response.
pub fn status_code(response: &[u8]) -> Option<u16> {
	let text = core::str::from_utf8(response).ok()?;
	let mut parts = text.lines().next()?.split_whitespace();
	if !parts.next()?.starts_with("HTTP/") {
		return None;
	}
	parts.next()?.parse().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn signal_alternates() {
		let values: Vec<u32> = (0..6).map(signal_value).collect();
		assert_eq!(values, [0, 1, 0, 3, 0, 5]);
	}

	#[test]
	fn request_line_and_headers() {
		let request = build_request("my-board", "Signal", 7).unwrap();
		assert_eq!(
			request.as_str(),
			"GET /dweet/for/my-board?Signal=7 HTTP/1.1\r\nHost: dweet.io\r\nConnection: close\r\n\r\n"
		);
	}

	#[test]
	fn oversized_thing_does_not_fit() {
		let thing = "x".repeat(MSG_LEN);
		assert_eq!(build_request(&thing, "Signal", 1), Err(Error::BufferFull));
	}

	#[test]
	fn status_line() {
		assert_eq!(status_code(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n"), Some(200));
		assert_eq!(status_code(b"HTTP/1.1 404 Not Found\r\n"), Some(404));
		assert_eq!(status_code(b"garbage"), None);
	}
}
