//! Hands every connection event to the health monitor.

use cellular_demo::health::RecoveryDecision;
use cellular_demo::radio::RadioQueue;
use cellular_demo::{event, HEALTH};

use super::recovery;

#[embassy_executor::task]
pub async fn supervisor_task() -> ! {
	let mut radio = RadioQueue;
	loop {
		let incoming = event::next().await;
		if HEALTH.classify(&incoming, &mut radio) == RecoveryDecision::Escalate {
			recovery::escalate(incoming.name()).await;
		}
	}
}
