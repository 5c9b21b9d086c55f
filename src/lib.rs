//! Bit-banged I2C master engine.
//!
//! # Description
//! This crate emulates the I2C bus protocol in software by sequencing
//! direction changes, level changes, and fixed delays on two general-purpose
//! digital lines. It provides the five bus primitives (START, STOP, byte
//! write, byte read, and acknowledgment sampling); composing them into
//! addressed transactions is the caller's responsibility.
//!
//! The engine is generic over a line-control collaborator ([`Line`]) and a
//! timing collaborator ([`embedded_hal::delay::DelayNs`]), so the same code
//! drives real open-drain pins ([`OpenDrain`]) or the in-memory simulation
//! in the `sim` module (behind the `sim` feature) used for host testing.
//!
//! # Limitations
//! Single-master only. Timing is purely delay-based: the engine never waits
//! on a peripheral-driven clock level, so a peripheral that stretches the
//! clock beyond the configured quantum will desynchronize the transfer.
#![cfg_attr(not(test), no_std)]
#![deny(warnings)]

pub mod bus;
pub mod line;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use bus::{BusState, Config, Error, Operation, SoftI2c};
pub use line::{Direction, Level, Line, OpenDrain};
