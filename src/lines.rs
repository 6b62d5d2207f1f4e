//! Line capabilities the drivers are written against.
//!
//! A backend (simulation, sysfs GPIO, ...) only has to provide single lines;
//! all protocol logic lives in the drivers.

use std::time::Duration;

use crate::time::Clock;

pub trait OutputLine {
	fn set(&mut self, high: bool);

	fn set_high(&mut self) {
		self.set(true)
	}

	fn set_low(&mut self) {
		self.set(false)
	}
}

pub trait InputLine {
	fn is_high(&mut self) -> bool;

	fn is_low(&mut self) -> bool {
		!self.is_high()
	}
}

/// Open-drain line: `set(true)` releases the line (a pull-up makes it read
/// high unless someone else pulls it down), `set(false)` pulls it low.
pub trait OpenDrainLine: OutputLine + InputLine {}

impl<L: OutputLine + InputLine + ?Sized> OpenDrainLine for L {}

/// Line latching data on the receiving side when pulsed.
pub trait StrobeLine: OutputLine {
	// strobe rests low; high for (at least) `width`, then back low
	fn pulse<C: Clock + ?Sized>(&mut self, clock: &mut C, width: Duration) {
		self.set_high();
		clock.delay(width);
		self.set_low();
	}
}

impl<L: OutputLine + ?Sized> StrobeLine for L {}

impl<'a, L: ?Sized + OutputLine> OutputLine for &'a mut L {
	fn set(&mut self, high: bool) {
		L::set(*self, high)
	}
}

impl<'a, L: ?Sized + InputLine> InputLine for &'a mut L {
	fn is_high(&mut self) -> bool {
		L::is_high(*self)
	}
}

/// Put the lowest `lines.len()` bits of `value` on `lines`, `lines[0]`
/// getting bit 0.
pub fn put_bits<L: OutputLine>(lines: &mut [L], value: u8) {
	for (bit, line) in lines.iter_mut().enumerate() {
		line.set(0 != value & (1u8 << bit));
	}
}

/// Read `lines` into a bit pattern, `lines[0]` going to bit 0.
pub fn read_bits<L: InputLine>(lines: &mut [L]) -> u8 {
	let mut result = 0u8;
	for (bit, line) in lines.iter_mut().enumerate() {
		if line.is_high() {
			result |= 1u8 << bit;
		}
	}
	result
}
