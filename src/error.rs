use std::time::Duration;

use failure::Fail;

use crate::twowire::Phase;

/// Errors reported by the protocol drivers.
///
/// None of these leave a transfer half-open: a driver returning an error has
/// already released the bus and is back in `Phase::Idle`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum DriverError {
	/// A line didn't reach the expected level in time (clock stretching,
	/// bus held low by another party, device busy for too long).
	#[fail(display = "timed out after {:?} in phase {}", waited, phase)]
	TimedOut {
		phase: Phase,
		waited: Duration,
	},

	/// The addressed device didn't pull the data line low in the ACK slot.
	#[fail(display = "no acknowledge in phase {}", phase)]
	NotAcknowledged {
		phase: Phase,
	},

	#[fail(display = "bus already initialized")]
	AlreadyInitialized,

	#[fail(display = "not initialized")]
	NotInitialized,

	#[fail(display = "invalid device address 0x{:02x} (needs to fit in 7 bits)", _0)]
	InvalidAddress(u8),

	#[fail(display = "invalid display position line {} column {}", line, column)]
	InvalidPosition {
		line: u8,
		column: u8,
	},

	#[fail(display = "{} bytes don't fit into a page of {} bytes", len, page_size)]
	PageOverflow {
		len: usize,
		page_size: usize,
	},

	#[fail(display = "invalid protocol transition {} -> {}", from, to)]
	InvalidTransition {
		from: Phase,
		to: Phase,
	},
}

impl DriverError {
	pub fn is_timeout(&self) -> bool {
		match self {
			DriverError::TimedOut { .. } => true,
			_ => false,
		}
	}

	pub fn is_nack(&self) -> bool {
		match self {
			DriverError::NotAcknowledged { .. } => true,
			_ => false,
		}
	}
}

pub type DriverResult<T> = Result<T, DriverError>;
