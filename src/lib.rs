//! Hardware independent part of the nRF9151 cellular demo.
//!
//! Holds the connection health monitor and everything it needs to reason
//! about the modem: the event model, AT response parsing, the radio
//! configuration sequence and the log queue. The firmware binary wires
//! these to embassy-net-nrf91 and the board pins.

#![cfg_attr(not(test), no_std)]

pub mod logger;

pub mod at;
pub mod config;
pub mod dweet;
pub mod error;
pub mod event;
pub mod health;
pub mod pdp;
pub mod radio;
pub mod registration;

use config::RADIO;
use health::HealthMonitor;

/// Health monitor shared by the supervisor and the traffic loop.
pub static HEALTH: HealthMonitor = HealthMonitor::new(RADIO);
