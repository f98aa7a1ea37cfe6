//! Packet domain response parsing.
//!
//! Attach state (+CGATT), the address of the default PDP context
//! (+CGPADDR) and the DNS servers handed out with it (+CGCONTRDP).

use core::net::Ipv4Addr;

/// DNS servers of a PDP context, primary first.
pub type DnsServers = heapless::Vec<Ipv4Addr, 2>;

/// Parse `+CGATT: <state>`. Returns whether the packet domain is attached.
pub fn parse_cgatt_response(response: &str) -> Option<bool> {
	let pos = response.find("+CGATT:")?;
	let state = response[pos + 7..].lines().next()?.trim();
	match state {
		"0" => Some(false),
		"1" => Some(true),
		_ => None,
	}
}

/// Parse +CGPADDR response to extract IP address.
/// Format: +CGPADDR: 0,"10.160.x.x"
pub fn parse_cgpaddr_response(response: &str) -> Option<Ipv4Addr> {
	let cgpaddr_pos = response.find("+CGPADDR:")?;
	let after = &response[cgpaddr_pos + 9..];

	let quote_start = after.find('"')? + 1;
	let quote_end = after[quote_start..].find('"')? + quote_start;
	parse_ipv4(&after[quote_start..quote_end])
}

/// Parse the DNS servers out of a +CGCONTRDP response.
///
/// Format: `+CGCONTRDP: <cid>,<bearer>,<apn>,<local addr>,<gw>,<dns1>,<dns2>,...`
/// The modem may print one line per address family, the first line with
/// IPv4 servers wins.
pub fn parse_cgcontrdp_dns(response: &str) -> DnsServers {
	let mut servers = DnsServers::new();
	for line in response.lines() {
		let Some(pos) = line.find("+CGCONTRDP:") else {
			continue;
		};
		let fields = line[pos + 11..].split(',').map(|f| f.trim().trim_matches('"'));
		for dns in fields.skip(5).take(2).filter_map(parse_ipv4) {
			let _ = servers.push(dns);
		}
		if !servers.is_empty() {
			break;
		}
	}
	servers
}

/// Parse an IPv4 address string.
pub fn parse_ipv4(s: &str) -> Option<Ipv4Addr> {
	let mut parts = s.split('.');
	let a: u8 = parts.next()?.parse().ok()?;
	let b: u8 = parts.next()?.parse().ok()?;
	let c: u8 = parts.next()?.parse().ok()?;
	let d: u8 = parts.next()?.parse().ok()?;

	if parts.next().is_some() {
		return None; // Too many parts
	}

	Some(Ipv4Addr::new(a, b, c, d))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cgpaddr() {
		assert_eq!(
			parse_cgpaddr_response("+CGPADDR: 0,\"10.160.3.77\"\r\nOK\r\n"),
			Some(Ipv4Addr::new(10, 160, 3, 77))
		);
		assert_eq!(parse_cgpaddr_response("+CGPADDR: 0\r\nOK\r\n"), None);
	}

	#[test]
	fn cgcontrdp_dns_servers() {
		let resp = "+CGCONTRDP: 0,,\"iot.example\",\"\",\"\",\"8.8.8.8\",\"8.8.4.4\",,,,,1464\r\nOK\r\n";
		let dns = parse_cgcontrdp_dns(resp);
		assert_eq!(dns.as_slice(), [Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)]);
	}

	#[test]
	fn cgcontrdp_skips_ipv6_only_line() {
		let resp = "+CGCONTRDP: 0,,\"apn\",\"\",\"\",\"2001:4860::8888\",\"\"\r\n\
			+CGCONTRDP: 0,,\"apn\",\"\",\"\",\"1.1.1.1\",\"\"\r\nOK\r\n";
		assert_eq!(parse_cgcontrdp_dns(resp).as_slice(), [Ipv4Addr::new(1, 1, 1, 1)]);
	}

	#[test]
	fn cgatt() {
		assert_eq!(parse_cgatt_response("+CGATT: 1\r\nOK"), Some(true));
		assert_eq!(parse_cgatt_response("+CGATT: 0\r\nOK"), Some(false));
		assert_eq!(parse_cgatt_response("ERROR"), None);
	}

	#[test]
	fn ipv4_rejects_extra_octets() {
		assert_eq!(parse_ipv4("1.2.3.4.5"), None);
		assert_eq!(parse_ipv4("1.2.3"), None);
		assert_eq!(parse_ipv4("256.1.1.1"), None);
	}
}
