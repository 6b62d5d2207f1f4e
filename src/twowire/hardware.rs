use std::time::Duration;

use crate::lines::OpenDrainLine;
use crate::time::Clock;

/// The two open-drain lines of the bus plus a time source.
///
/// `set_*_line(true)` releases a line, `set_*_line(false)` pulls it low;
/// reading returns the actual bus level.
pub trait Hardware: Clock {
	fn set_clock_line(&mut self, release: bool);
	fn set_data_line(&mut self, release: bool);

	fn clock_line(&mut self) -> bool;
	fn data_line(&mut self) -> bool;
}

/// Bus handle wiring: which line is SCL, which is SDA.
#[derive(Debug)]
pub struct Pins<SCL, SDA, C> {
	pub scl: SCL,
	pub sda: SDA,
	pub clock: C,
}

impl<SCL, SDA, C> Pins<SCL, SDA, C> {
	pub fn new(scl: SCL, sda: SDA, clock: C) -> Self {
		Pins { scl, sda, clock }
	}
}

impl<SCL, SDA, C: Clock> Clock for Pins<SCL, SDA, C> {
	fn now(&self) -> Duration {
		self.clock.now()
	}

	fn delay(&mut self, duration: Duration) {
		self.clock.delay(duration)
	}
}

impl<SCL, SDA, C> Hardware for Pins<SCL, SDA, C>
where
	SCL: OpenDrainLine,
	SDA: OpenDrainLine,
	C: Clock,
{
	fn set_clock_line(&mut self, release: bool) {
		self.scl.set(release);
	}

	fn set_data_line(&mut self, release: bool) {
		self.sda.set(release);
	}

	fn clock_line(&mut self) -> bool {
		self.scl.is_high()
	}

	fn data_line(&mut self) -> bool {
		self.sda.is_high()
	}
}
