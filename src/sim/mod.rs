//! Simulated backend: a manually advanced clock and behavioural models of
//! the devices on the other end of the lines.
//!
//! Models see every line change immediately and read the simulated clock to
//! check timing, so driver tests run deterministically and instantly.

use std::cell::{
	Cell,
	RefCell,
};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::lines::{
	InputLine,
	OutputLine,
};
use crate::time::Clock;

mod eeprom;
mod hd44780;
mod matrix;

pub use self::eeprom::{
	BusStats,
	SimTwoWirePins,
	TwoWireBus,
	TwoWireSim,
	EEPROM_SIZE,
};
pub use self::hd44780::{
	Hd44780,
	LcdSim,
	SimEightBitBus,
	SimFourBitBus,
};
pub use self::matrix::{
	KeypadSim,
	Matrix,
	SimKeypad,
};

/// Simulated time; clones share the same time line.
#[derive(Clone, Default)]
pub struct SimClock {
	now: Rc<Cell<Duration>>,
}

impl SimClock {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn advance(&self, duration: Duration) {
		self.now.set(self.now.get() + duration);
	}
}

impl fmt::Debug for SimClock {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("SimClock").field("now", &self.now.get()).finish()
	}
}

impl Clock for SimClock {
	fn now(&self) -> Duration {
		self.now.get()
	}

	fn delay(&mut self, duration: Duration) {
		self.advance(duration);
	}
}

/// Device side of simulated lines, indexed by line number.
pub trait Wiring {
	fn drive(&mut self, line: usize, high: bool);
	fn sample(&mut self, line: usize) -> bool;
}

/// One line into a simulated device.
pub struct SimLine<W> {
	wiring: Rc<RefCell<W>>,
	line: usize,
}

impl<W> SimLine<W> {
	pub(crate) fn new(wiring: &Rc<RefCell<W>>, line: usize) -> Self {
		SimLine {
			wiring: wiring.clone(),
			line,
		}
	}
}

impl<W> fmt::Debug for SimLine<W> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "SimLine({})", self.line)
	}
}

impl<W: Wiring> OutputLine for SimLine<W> {
	fn set(&mut self, high: bool) {
		self.wiring.borrow_mut().drive(self.line, high);
	}
}

impl<W: Wiring> InputLine for SimLine<W> {
	fn is_high(&mut self) -> bool {
		self.wiring.borrow_mut().sample(self.line)
	}
}
