//! Bit-banged two-wire (I²C style) master for serial EEPROMs like the
//! Microchip 24LC256 (32 KiB, 64-byte pages, 16-bit memory addresses).
//!
//! Both lines are open-drain: the master only ever releases a line or pulls
//! it low, pull-ups make released lines read high.
//!
//! Framing:
//! - START: SDA falls while SCL is high
//! - STOP: SDA rises while SCL is high
//! - 8 data bits MSB first, SDA changes only while SCL is low
//! - ninth clock: receiver pulls SDA low to acknowledge
//!
//! Transfers:
//! - write: START, control (0b1010_A2A1A0 << 1 | 0), address high, address
//!   low, data..., STOP
//! - random read: START, control | 0, address high, address low, repeated
//!   START, control | 1, data (ACK all but the last byte, NACK the last),
//!   STOP
//!
//! After a write the device runs an internal write cycle (5 ms) and doesn't
//! acknowledge its address until it's done.

mod hardware;
mod low_level;
mod operations;
mod phase;

pub use self::hardware::{
	Hardware,
	Pins,
};

pub use self::operations::{
	join_address,
	split_address,
	Reader,
	TwoWire,
	PAGE_SIZE,
};

pub use self::phase::Phase;
