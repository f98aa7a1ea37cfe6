//! Network stack for nRF91 modem using embassy-net.
//!
//! TCP/IP over the cellular modem with the embassy-net-nrf91 driver. The IP
//! configuration comes from the PDP context, not DHCP.

use cellular_demo::error::{Error, Result};
use cellular_demo::pdp::DnsServers;

use embassy_executor::Spawner;
use embassy_net::{ConfigV4, Ipv4Address, Ipv4Cidr, Stack, StackResources, StaticConfigV4};
use embassy_net_nrf91::NetDriver;
use embassy_time::Timer;
use static_cell::StaticCell;

/// Network stack resources.
/// One socket for the demo, one for DNS, spare for the stack.
const SOCKET_COUNT: usize = 4;

/// Task to run the embassy-net stack.
#[embassy_executor::task]
pub async fn net_task(mut runner: embassy_net::Runner<'static, NetDriver<'static>>) -> ! {
	runner.run().await
}

/// Initialize the network stack.
///
/// The stack starts unconfigured, [`configure`] is called once the PDP
/// context provides an address.
///
/// # Errors
/// Returns `Error::TaskSpawn` if the network task cannot be spawned.
pub async fn init(spawner: &Spawner, device: NetDriver<'static>) -> Result<&'static Stack<'static>> {
	static RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();
	let resources = RESOURCES.init(StackResources::new());

	let config = embassy_net::Config::default();

	let seed = embassy_time::Instant::now().as_ticks();

	static STACK: StaticCell<Stack<'static>> = StaticCell::new();
	let (stack, runner) = embassy_net::new(device, config, resources, seed);
	let stack = STACK.init(stack);

	let token = net_task(runner).map_err(|_| Error::TaskSpawn)?;
	spawner.spawn(token);

	Ok(stack)
}

/// Set the IPv4 configuration from the PDP context.
pub fn configure(stack: &Stack<'_>, address: Ipv4Address, dns: &DnsServers) {
	let mut static_config = StaticConfigV4 {
		address: Ipv4Cidr::new(address, 32),
		// Point-to-point link, the modem routes everything
		gateway: None,
		dns_servers: Default::default(),
	};
	for server in dns {
		let _ = static_config.dns_servers.push(*server);
	}
	stack.set_config_v4(ConfigV4::Static(static_config));
}

/// Wait for the network stack to have a valid IP configuration.
pub async fn wait_for_config(stack: &Stack<'_>) {
	while !stack.is_config_up() {
		Timer::after_millis(100).await;
	}
}
