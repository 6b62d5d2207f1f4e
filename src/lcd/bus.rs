use std::time::Duration;

use crate::lines::{
	put_bits,
	OutputLine,
	StrobeLine,
};
use crate::time::Clock;

use super::commands;

/// EN high time; the controller needs at least 460ns
pub const ENABLE_PULSE: Duration = Duration::from_micros(1);
/// EN low time between the two nibbles of a byte
pub const NIBBLE_GAP: Duration = Duration::from_micros(1);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Register {
	/// RS low
	Command,
	/// RS high
	Data,
}

/// Control lines plus a data bus of some width.
///
/// `write` leaves RS, RW and EN low; waiting for the controller to execute
/// is up to the caller.
pub trait DataBus: Clock {
	/// function set for this bus width, two lines, 5x8 font
	const FUNCTION_SET: u8;

	/// RS, RW and EN low
	fn rest(&mut self);

	/// Single strobe with 0x3 on DB7..DB4, as an 8-bit controller expects
	/// it after power up.
	fn wake(&mut self);

	fn write(&mut self, byte: u8, register: Register);
}

/// DB7..DB4 only; bytes go out as two nibbles, high nibble first.
///
/// `data[0]` is DB4, `data[3]` is DB7.
#[derive(Debug)]
pub struct FourBitBus<RS, RW, EN, D, C> {
	rs: RS,
	rw: RW,
	en: EN,
	data: [D; 4],
	clock: C,
}

impl<RS, RW, EN, D, C> FourBitBus<RS, RW, EN, D, C>
where
	RS: OutputLine,
	RW: OutputLine,
	EN: OutputLine,
	D: OutputLine,
	C: Clock,
{
	pub fn new(rs: RS, rw: RW, en: EN, data: [D; 4], clock: C) -> Self {
		FourBitBus { rs, rw, en, data, clock }
	}

	fn nibble(&mut self, nibble: u8) {
		put_bits(&mut self.data, nibble & 0x0f);
		self.en.pulse(&mut self.clock, ENABLE_PULSE);
	}
}

impl<RS, RW, EN, D, C: Clock> Clock for FourBitBus<RS, RW, EN, D, C> {
	fn now(&self) -> Duration {
		self.clock.now()
	}

	fn delay(&mut self, duration: Duration) {
		self.clock.delay(duration)
	}
}

impl<RS, RW, EN, D, C> DataBus for FourBitBus<RS, RW, EN, D, C>
where
	RS: OutputLine,
	RW: OutputLine,
	EN: OutputLine,
	D: OutputLine,
	C: Clock,
{
	const FUNCTION_SET: u8 = commands::FUNCTION_SET_4BIT_2LINE;

	fn rest(&mut self) {
		self.en.set_low();
		self.rs.set_low();
		self.rw.set_low();
	}

	fn wake(&mut self) {
		self.rest();
		// single nibble: the low half of the bus isn't connected
		self.nibble(commands::WAKE >> 4);
	}

	fn write(&mut self, byte: u8, register: Register) {
		self.en.set_low();
		self.rw.set_low();
		self.rs.set(register == Register::Data);

		self.nibble(byte >> 4);
		self.clock.delay(NIBBLE_GAP);
		self.nibble(byte);

		self.rest();
	}
}

/// DB7..DB0; `data[0]` is DB0.
#[derive(Debug)]
pub struct EightBitBus<RS, RW, EN, D, C> {
	rs: RS,
	rw: RW,
	en: EN,
	data: [D; 8],
	clock: C,
}

impl<RS, RW, EN, D, C> EightBitBus<RS, RW, EN, D, C>
where
	RS: OutputLine,
	RW: OutputLine,
	EN: OutputLine,
	D: OutputLine,
	C: Clock,
{
	pub fn new(rs: RS, rw: RW, en: EN, data: [D; 8], clock: C) -> Self {
		EightBitBus { rs, rw, en, data, clock }
	}
}

impl<RS, RW, EN, D, C: Clock> Clock for EightBitBus<RS, RW, EN, D, C> {
	fn now(&self) -> Duration {
		self.clock.now()
	}

	fn delay(&mut self, duration: Duration) {
		self.clock.delay(duration)
	}
}

impl<RS, RW, EN, D, C> DataBus for EightBitBus<RS, RW, EN, D, C>
where
	RS: OutputLine,
	RW: OutputLine,
	EN: OutputLine,
	D: OutputLine,
	C: Clock,
{
	const FUNCTION_SET: u8 = commands::FUNCTION_SET_8BIT_2LINE;

	fn rest(&mut self) {
		self.en.set_low();
		self.rs.set_low();
		self.rw.set_low();
	}

	fn wake(&mut self) {
		self.write(commands::WAKE, Register::Command);
	}

	fn write(&mut self, byte: u8, register: Register) {
		self.en.set_low();
		self.rw.set_low();
		self.rs.set(register == Register::Data);

		put_bits(&mut self.data, byte);
		self.en.pulse(&mut self.clock, ENABLE_PULSE);

		self.rest();
	}
}
