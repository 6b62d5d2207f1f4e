use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::lcd::{
	commands::LINE_ADDRESSES,
	EightBitBus,
	FourBitBus,
};
use crate::time::Clock;

use super::{
	SimClock,
	SimLine,
	Wiring,
};

const RS: usize = 0;
const RW: usize = 1;
const EN: usize = 2;
// DB0..DB7 are lines 3..10
const DB0: usize = 3;
const DB4: usize = DB0 + 4;
const LINES: usize = DB0 + 8;

const LINE_NAMES: [&str; LINES] = ["RS", "RW", "EN", "DB0", "DB1", "DB2", "DB3", "DB4", "DB5", "DB6", "DB7"];

const MIN_ENABLE_PULSE: Duration = Duration::from_nanos(460);
const POWER_ON_BUSY: Duration = Duration::from_millis(15);
const EXECUTE: Duration = Duration::from_micros(37);
const EXECUTE_CLEAR_HOME: Duration = Duration::from_micros(1520);

// visible characters per line of the modelled 20x4 panel
const COLUMNS: usize = 20;

/// Model of an HD44780 controller as seen from its pins; RW is expected to
/// stay low.
pub struct Hd44780 {
	levels: [bool; LINES],
	clock: SimClock,
	enable_rose: Duration,
	busy_until: Duration,
	eight_bit: bool,
	two_lines: bool,
	// high nibble waiting for its low half (4-bit mode)
	pending: Option<u8>,
	ddram: [u8; 0x80],
	cgram: [u8; 0x40],
	address: u8,
	cgram_selected: bool,
	increment: bool,
	display_on: bool,
	cursor_on: bool,
	blink: bool,
	commands: Vec<u8>,
	violations: Vec<String>,
	ignored_strobes: usize,
}

impl Hd44780 {
	fn violation(&mut self, message: String) {
		debug!("sim lcd: {}", message);
		self.violations.push(message);
	}

	fn bus_bits(&self, first: usize, count: usize) -> u8 {
		let mut result = 0u8;
		for bit in 0..count {
			if self.levels[first + bit] {
				result |= 1u8 << bit;
			}
		}
		result
	}

	fn strobe_started(&mut self) {
		self.enable_rose = self.clock.now();
		if self.levels[RW] {
			self.violation("EN raised with RW high".to_string());
		}
	}

	fn strobe_ended(&mut self) {
		let now = self.clock.now();
		let width = now - self.enable_rose;
		if width < MIN_ENABLE_PULSE {
			self.violation(format!("EN pulse of {:?} too short", width));
		}
		if now < self.busy_until {
			trace!("sim lcd: strobe ignored, busy for another {:?}", self.busy_until - now);
			self.ignored_strobes += 1;
			return;
		}

		let data = self.levels[RS];
		if self.eight_bit {
			let byte = self.bus_bits(DB0, 8);
			self.execute(data, byte);
		} else {
			let nibble = self.bus_bits(DB4, 4);
			match self.pending.take() {
				None => self.pending = Some(nibble),
				Some(high) => self.execute(data, (high << 4) | nibble),
			}
		}
	}

	fn step_address(&mut self) {
		if self.cgram_selected {
			let next = if self.increment { self.address.wrapping_add(1) } else { self.address.wrapping_sub(1) };
			self.address = next & 0x3f;
			return;
		}
		let next = if self.two_lines {
			match (self.increment, self.address) {
				(true, 0x27) => 0x40,
				(true, 0x67) => 0x00,
				(true, a) => a.wrapping_add(1),
				(false, 0x00) => 0x67,
				(false, 0x40) => 0x27,
				(false, a) => a - 1,
			}
		} else {
			match (self.increment, self.address) {
				(true, 0x4f) => 0x00,
				(true, a) => a.wrapping_add(1),
				(false, 0x00) => 0x4f,
				(false, a) => a - 1,
			}
		};
		self.address = next & 0x7f;
	}

	fn execute(&mut self, data: bool, byte: u8) {
		let now = self.clock.now();
		self.busy_until = now + EXECUTE;

		if data {
			trace!("sim lcd: data 0x{:02x} @0x{:02x}", byte, self.address);
			if self.cgram_selected {
				self.cgram[self.address as usize] = byte;
			} else {
				self.ddram[self.address as usize] = byte;
			}
			self.step_address();
			return;
		}

		trace!("sim lcd: command 0x{:02x}", byte);
		self.commands.push(byte);
		if 0 != byte & 0x80 {
			self.address = byte & 0x7f;
			self.cgram_selected = false;
		} else if 0 != byte & 0x40 {
			self.address = byte & 0x3f;
			self.cgram_selected = true;
		} else if 0 != byte & 0x20 {
			self.eight_bit = 0 != byte & 0x10;
			self.two_lines = 0 != byte & 0x08;
			self.pending = None;
		} else if 0 != byte & 0x10 {
			// cursor move (display shift is not modelled)
			if 0 == byte & 0x08 {
				let increment = self.increment;
				self.increment = 0 != byte & 0x04;
				self.step_address();
				self.increment = increment;
			}
		} else if 0 != byte & 0x08 {
			self.display_on = 0 != byte & 0x04;
			self.cursor_on = 0 != byte & 0x02;
			self.blink = 0 != byte & 0x01;
		} else if 0 != byte & 0x04 {
			self.increment = 0 != byte & 0x02;
		} else if 0 != byte & 0x02 {
			self.address = 0;
			self.cgram_selected = false;
			self.busy_until = now + EXECUTE_CLEAR_HOME;
		} else if 0 != byte & 0x01 {
			self.ddram = [b' '; 0x80];
			self.address = 0;
			self.cgram_selected = false;
			self.increment = true;
			self.busy_until = now + EXECUTE_CLEAR_HOME;
		}
	}
}

impl Wiring for Hd44780 {
	fn drive(&mut self, line: usize, high: bool) {
		assert!(line < LINES, "lcd sim has no line {}", line);
		let old = self.levels[line];
		self.levels[line] = high;
		if old == high {
			return;
		}
		if line == EN {
			if high {
				self.strobe_started();
			} else {
				self.strobe_ended();
			}
		} else if self.levels[EN] {
			self.violation(format!("{} changed while EN high", LINE_NAMES[line]));
		}
	}

	fn sample(&mut self, line: usize) -> bool {
		assert!(line < LINES, "lcd sim has no line {}", line);
		self.levels[line]
	}
}

pub type SimFourBitBus = FourBitBus<SimLine<Hd44780>, SimLine<Hd44780>, SimLine<Hd44780>, SimLine<Hd44780>, SimClock>;
pub type SimEightBitBus = EightBitBus<SimLine<Hd44780>, SimLine<Hd44780>, SimLine<Hd44780>, SimLine<Hd44780>, SimClock>;

/// 20x4 character display; powered on (8-bit mode, busy for 15ms) at
/// creation time.
pub struct LcdSim {
	controller: Rc<RefCell<Hd44780>>,
	clock: SimClock,
}

impl LcdSim {
	pub fn new(clock: SimClock) -> Self {
		let controller = Hd44780 {
			levels: [false; LINES],
			clock: clock.clone(),
			enable_rose: Duration::from_secs(0),
			busy_until: clock.now() + POWER_ON_BUSY,
			eight_bit: true,
			two_lines: false,
			pending: None,
			ddram: [b' '; 0x80],
			cgram: [0; 0x40],
			address: 0,
			cgram_selected: false,
			increment: true,
			display_on: false,
			cursor_on: false,
			blink: false,
			commands: Vec::new(),
			violations: Vec::new(),
			ignored_strobes: 0,
		};
		LcdSim {
			controller: Rc::new(RefCell::new(controller)),
			clock,
		}
	}

	fn line(&self, line: usize) -> SimLine<Hd44780> {
		SimLine::new(&self.controller, line)
	}

	/// DB4..DB7 connected; DB0..DB3 float low.
	pub fn four_bit_bus(&self) -> SimFourBitBus {
		let data = [self.line(DB4), self.line(DB4 + 1), self.line(DB4 + 2), self.line(DB4 + 3)];
		FourBitBus::new(self.line(RS), self.line(RW), self.line(EN), data, self.clock.clone())
	}

	pub fn eight_bit_bus(&self) -> SimEightBitBus {
		let data = [
			self.line(DB0),
			self.line(DB0 + 1),
			self.line(DB0 + 2),
			self.line(DB0 + 3),
			self.line(DB0 + 4),
			self.line(DB0 + 5),
			self.line(DB0 + 6),
			self.line(DB0 + 7),
		];
		EightBitBus::new(self.line(RS), self.line(RW), self.line(EN), data, self.clock.clone())
	}

	/// `len` DDRAM bytes starting at `address` as text.
	pub fn text_at(&self, address: u8, len: usize) -> String {
		let controller = self.controller.borrow();
		(0..len)
			.map(|offset| controller.ddram[(address as usize + offset) & 0x7f] as char)
			.collect()
	}

	/// Visible text of a (0-based) display line, trailing blanks removed.
	pub fn line_text(&self, line: usize) -> String {
		let text = self.text_at(LINE_ADDRESSES[line], COLUMNS);
		text.trim_end().to_string()
	}

	pub fn cgram(&self, address: u8) -> u8 {
		self.controller.borrow().cgram[(address & 0x3f) as usize]
	}

	pub fn address_counter(&self) -> u8 {
		self.controller.borrow().address
	}

	pub fn is_four_bit(&self) -> bool {
		!self.controller.borrow().eight_bit
	}

	pub fn is_two_line(&self) -> bool {
		self.controller.borrow().two_lines
	}

	/// (display, cursor, blink)
	pub fn display_control(&self) -> (bool, bool, bool) {
		let c = self.controller.borrow();
		(c.display_on, c.cursor_on, c.blink)
	}

	pub fn increments(&self) -> bool {
		self.controller.borrow().increment
	}

	/// Every command executed so far (data writes not included).
	pub fn commands(&self) -> Vec<u8> {
		self.controller.borrow().commands.clone()
	}

	/// Protocol errors seen on the pins.
	pub fn violations(&self) -> Vec<String> {
		self.controller.borrow().violations.clone()
	}

	/// Strobes that arrived while the controller was still executing.
	pub fn ignored_strobes(&self) -> usize {
		self.controller.borrow().ignored_strobes
	}

	/// (RS, RW, EN)
	pub fn control_levels(&self) -> (bool, bool, bool) {
		let c = self.controller.borrow();
		(c.levels[RS], c.levels[RW], c.levels[EN])
	}
}
