use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::config::TwoWireConfig;
use crate::time::Clock;
use crate::twowire::{
	Pins,
	PAGE_SIZE,
};

use super::{
	SimClock,
	SimLine,
	Wiring,
};

/// 24LC256: 32 KiB
pub const EEPROM_SIZE: usize = 0x8000;

const SCL: usize = 0;
const SDA: usize = 1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
	// waiting for START
	Idle,
	Control,
	AddressHigh,
	AddressLow,
	Data,
	Transmit,
}

/// Model of a 24LC256 reacting to SCL/SDA edges.
struct Eeprom {
	address: u8,
	memory: Vec<u8>,
	pointer: u16,
	mode: Mode,
	// mode after the current ACK clock
	next: Mode,
	// clock rises seen in the current byte frame (9 per frame)
	bit: u8,
	shift: u8,
	out: u8,
	master_ack: bool,
	drive_low: bool,
	// (address, data) latched since START, written on STOP
	pending: Vec<(u16, u8)>,
	busy_until: Duration,
	write_cycle: Duration,
	clock: SimClock,
}

impl Eeprom {
	fn mask(address: u16) -> u16 {
		address & (EEPROM_SIZE as u16 - 1)
	}

	fn is_busy(&self) -> bool {
		self.clock.now() < self.busy_until
	}

	fn on_start(&mut self) {
		if !self.pending.is_empty() {
			trace!("sim eeprom: write aborted by START");
			self.pending.clear();
		}
		self.mode = Mode::Control;
		self.bit = 0;
		self.shift = 0;
		self.drive_low = false;
	}

	fn on_stop(&mut self) {
		if !self.pending.is_empty() {
			for (address, data) in self.pending.drain(..) {
				self.memory[address as usize] = data;
			}
			self.busy_until = self.clock.now() + self.write_cycle;
		}
		self.mode = Mode::Idle;
		self.drive_low = false;
	}

	// a full byte was clocked in; returns whether to ACK it
	fn accept(&mut self, byte: u8) -> bool {
		match self.mode {
			Mode::Control => {
				if byte >> 1 != self.address || self.is_busy() {
					return false;
				}
				self.next = if 0 != byte & 1 { Mode::Transmit } else { Mode::AddressHigh };
			},
			Mode::AddressHigh => {
				self.pointer = ((byte as u16) << 8) | (self.pointer & 0x00ff);
				self.next = Mode::AddressLow;
			},
			Mode::AddressLow => {
				self.pointer = Self::mask((self.pointer & 0xff00) | byte as u16);
				self.next = Mode::Data;
			},
			Mode::Data => {
				self.pending.push((self.pointer, byte));
				// page write wraps inside the page
				let page = self.pointer & !(PAGE_SIZE as u16 - 1);
				self.pointer = page | ((self.pointer + 1) & (PAGE_SIZE as u16 - 1));
				self.next = Mode::Data;
			},
			Mode::Idle | Mode::Transmit => return false,
		}
		true
	}

	fn load_out(&mut self) {
		self.out = self.memory[self.pointer as usize];
		self.bit = 0;
		self.drive_low = 0 == self.out & 0x80;
	}

	fn clock_rise(&mut self, sda: bool) {
		match self.mode {
			Mode::Idle => (),
			Mode::Transmit => {
				self.bit += 1;
				if self.bit == 9 {
					self.master_ack = !sda;
				}
			},
			_ => {
				self.bit += 1;
				if self.bit <= 8 {
					self.shift = (self.shift << 1) | (sda as u8);
				}
			},
		}
	}

	fn clock_fall(&mut self) {
		match self.mode {
			Mode::Idle => (),
			Mode::Transmit => {
				if self.bit < 8 {
					self.drive_low = 0 == self.out & (0x80 >> self.bit);
				} else if self.bit == 8 {
					// master's ACK slot
					self.drive_low = false;
				} else {
					self.pointer = Self::mask(self.pointer.wrapping_add(1));
					if self.master_ack {
						self.load_out();
					} else {
						self.mode = Mode::Idle;
						self.drive_low = false;
					}
				}
			},
			_ => {
				if self.bit == 8 {
					let byte = self.shift;
					let ack = self.accept(byte);
					trace!("sim eeprom: {:?} 0x{:02x} -> {}", self.mode, byte, if ack { "ACK" } else { "NACK" });
					self.drive_low = ack;
					if !ack {
						self.mode = Mode::Idle;
					}
				} else if self.bit == 9 {
					self.drive_low = false;
					self.bit = 0;
					self.shift = 0;
					self.mode = self.next;
					if self.mode == Mode::Transmit {
						self.load_out();
					}
				}
			},
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct BusStats {
	pub starts: usize,
	pub stops: usize,
}

/// Wired-AND of master, EEPROM and test knobs on SCL and SDA.
pub struct TwoWireBus {
	master_scl: bool,
	master_sda: bool,
	hold_scl: bool,
	hold_sda: bool,
	// bus levels after the last update
	scl: bool,
	sda: bool,
	stats: BusStats,
	eeprom: Eeprom,
}

impl TwoWireBus {
	fn levels(&self) -> (bool, bool) {
		let scl = self.master_scl && !self.hold_scl;
		let sda = self.master_sda && !self.hold_sda && !self.eeprom.drive_low;
		(scl, sda)
	}

	fn update(&mut self) {
		let (scl, sda) = self.levels();
		if scl != self.scl {
			self.scl = scl;
			if scl {
				self.eeprom.clock_rise(sda);
			} else {
				self.eeprom.clock_fall();
			}
			// device only changes SDA while SCL is low
			self.sda = self.levels().1;
		} else if sda != self.sda {
			self.sda = sda;
			if scl {
				if sda {
					self.stats.stops += 1;
					self.eeprom.on_stop();
				} else {
					self.stats.starts += 1;
					self.eeprom.on_start();
				}
			}
		}
	}
}

impl Wiring for TwoWireBus {
	fn drive(&mut self, line: usize, high: bool) {
		match line {
			SCL => self.master_scl = high,
			SDA => self.master_sda = high,
			_ => panic!("two-wire sim has no line {}", line),
		}
		self.update();
	}

	fn sample(&mut self, line: usize) -> bool {
		let (scl, sda) = self.levels();
		match line {
			SCL => scl,
			SDA => sda,
			_ => panic!("two-wire sim has no line {}", line),
		}
	}
}

pub type SimTwoWirePins = Pins<SimLine<TwoWireBus>, SimLine<TwoWireBus>, SimClock>;

/// Two-wire bus with pull-ups and a 24LC256 attached.
pub struct TwoWireSim {
	bus: Rc<RefCell<TwoWireBus>>,
	clock: SimClock,
}

impl TwoWireSim {
	/// Fresh (erased: all 0xff) EEPROM answering to `address`.
	pub fn new(clock: SimClock, address: u8) -> Self {
		let eeprom = Eeprom {
			address,
			memory: vec![0xff; EEPROM_SIZE],
			pointer: 0,
			mode: Mode::Idle,
			next: Mode::Idle,
			bit: 0,
			shift: 0,
			out: 0xff,
			master_ack: false,
			drive_low: false,
			pending: Vec::new(),
			busy_until: Duration::from_secs(0),
			write_cycle: TwoWireConfig::default().write_cycle,
			clock: clock.clone(),
		};
		let bus = TwoWireBus {
			master_scl: true,
			master_sda: true,
			hold_scl: false,
			hold_sda: false,
			scl: true,
			sda: true,
			stats: BusStats::default(),
			eeprom,
		};
		TwoWireSim {
			bus: Rc::new(RefCell::new(bus)),
			clock,
		}
	}

	pub fn scl(&self) -> SimLine<TwoWireBus> {
		SimLine::new(&self.bus, SCL)
	}

	pub fn sda(&self) -> SimLine<TwoWireBus> {
		SimLine::new(&self.bus, SDA)
	}

	pub fn pins(&self) -> SimTwoWirePins {
		Pins::new(self.scl(), self.sda(), self.clock.clone())
	}

	/// Some other party keeps SCL low (endless clock stretching).
	pub fn hold_clock_low(&self, hold: bool) {
		let mut bus = self.bus.borrow_mut();
		bus.hold_scl = hold;
		bus.update();
	}

	/// Some other party keeps SDA low.
	pub fn hold_data_low(&self, hold: bool) {
		let mut bus = self.bus.borrow_mut();
		bus.hold_sda = hold;
		bus.update();
	}

	pub fn stats(&self) -> BusStats {
		self.bus.borrow().stats
	}

	/// Both lines up and the device not in the middle of a transfer.
	pub fn is_idle(&self) -> bool {
		let bus = self.bus.borrow();
		bus.scl && bus.sda && bus.eeprom.mode == Mode::Idle
	}

	/// Internal write cycle still running.
	pub fn is_busy(&self) -> bool {
		self.bus.borrow().eeprom.is_busy()
	}

	pub fn memory(&self, address: u16) -> u8 {
		self.bus.borrow().eeprom.memory[Eeprom::mask(address) as usize]
	}

	pub fn set_memory(&self, address: u16, data: &[u8]) {
		let mut bus = self.bus.borrow_mut();
		for (offset, &byte) in data.iter().enumerate() {
			let address = Eeprom::mask(address.wrapping_add(offset as u16));
			bus.eeprom.memory[address as usize] = byte;
		}
	}
}
