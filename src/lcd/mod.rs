//! HD44780 compatible character LCD on a parallel bus.
//!
//! The controller never answers (RW stays low), so everything depends on
//! waiting long enough after each transfer; the settle times below are the
//! datasheet minimums plus some margin.

use std::fmt;
use std::time::Duration;

use crate::error::{
	DriverError,
	DriverResult,
};

mod bus;

pub use self::bus::{
	DataBus,
	EightBitBus,
	FourBitBus,
	Register,
	ENABLE_PULSE,
	NIBBLE_GAP,
};

pub mod commands {
	pub const CLEAR_DISPLAY: u8 = 0x01;
	pub const RETURN_HOME: u8 = 0x02;

	pub const ENTRY_MODE_CURSOR_LEFT: u8 = 0x04;
	pub const ENTRY_MODE_CURSOR_RIGHT: u8 = 0x06;

	pub const DISPLAY_ON: u8 = 0x0c;
	pub const CURSOR_ON: u8 = 0x0a;
	pub const CURSOR_BLINK: u8 = 0x09;

	// function set
	pub const WAKE: u8 = 0x30;
	pub const FUNCTION_SET_4BIT_2LINE: u8 = 0x28;
	pub const FUNCTION_SET_8BIT_2LINE: u8 = 0x38;

	pub const SET_DDRAM_ADDRESS: u8 = 0x80;

	/// DDRAM address of the first column of each line (20x4 layout; 16x2
	/// displays only show the first two)
	pub const LINE_ADDRESSES: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

	/// DDRAM columns per line
	pub const LINE_LENGTH: u8 = 40;
}

use self::commands::*;

/// wait after power up before the first strobe (>40ms)
pub const POWER_UP_DELAY: Duration = Duration::from_millis(40);
/// clear display / return home (>1.52ms)
pub const CLEAR_HOME_SETTLE: Duration = Duration::from_micros(1700);
/// after the first of the three wake strobes of `Lcd::reset` (>4.1ms)
pub const RESET_FIRST_SETTLE: Duration = Duration::from_micros(4100);
/// after the other wake strobes (>100us)
pub const RESET_SETTLE: Duration = Duration::from_micros(100);
/// all other commands (>37us)
pub const COMMAND_SETTLE: Duration = Duration::from_micros(40);
/// data write (>37us)
pub const CHARACTER_SETTLE: Duration = Duration::from_micros(40);

pub fn settle_time(command: u8) -> Duration {
	if command < 4 {
		CLEAR_HOME_SETTLE
	} else {
		COMMAND_SETTLE
	}
}

pub struct Lcd<B: DataBus> {
	bus: B,
	initialized: bool,
}

impl<B: DataBus> Lcd<B> {
	pub fn new(bus: B) -> Self {
		Lcd {
			bus,
			initialized: false,
		}
	}

	pub fn is_initialized(&self) -> bool {
		self.initialized
	}

	pub fn into_bus(self) -> B {
		self.bus
	}

	/// Power-up sequence: a single wake strobe, then the bus width and
	/// display setup.
	///
	/// Leaves a blank display with blinking cursor in the top left corner,
	/// moving right after each character.
	///
	/// Only valid once: a 4-bit controller already in 4-bit mode would pair
	/// the single wake nibble with the next one. Use `reset` to start over.
	pub fn initialize(&mut self) -> DriverResult<()> {
		if self.initialized {
			warn!("LCD already initialized; use reset to resynchronize");
			return Err(DriverError::AlreadyInitialized);
		}
		debug!("LCD: initializing (function set 0x{:02x})", B::FUNCTION_SET);
		self.bus.rest();
		self.bus.delay(POWER_UP_DELAY);

		self.bus.wake();
		self.bus.delay(COMMAND_SETTLE);

		self.configure();
		Ok(())
	}

	/// Resynchronize a controller in an unknown state (e.g. a 4-bit bus out
	/// of step after a glitch) and set it up like `initialize`.
	///
	/// Three wake strobes force 8-bit mode whatever the controller expected
	/// next.
	pub fn reset(&mut self) {
		debug!("LCD: reset");
		self.bus.rest();
		for &settle in &[RESET_FIRST_SETTLE, RESET_SETTLE, RESET_SETTLE] {
			self.bus.wake();
			self.bus.delay(settle);
		}
		self.configure();
	}

	// controller is in 8-bit mode here
	fn configure(&mut self) {
		// the first function set switches the bus width; with a 4-bit bus the
		// second nibble is lost (controller is busy), so send it twice
		self.command(B::FUNCTION_SET);
		self.command(B::FUNCTION_SET);
		self.command(DISPLAY_ON | CURSOR_ON | CURSOR_BLINK);
		self.command(CLEAR_DISPLAY);
		self.command(ENTRY_MODE_CURSOR_RIGHT);

		self.initialized = true;
	}

	fn check_initialized(&self) -> DriverResult<()> {
		if self.initialized {
			Ok(())
		} else {
			Err(DriverError::NotInitialized)
		}
	}

	fn command(&mut self, command: u8) {
		trace!("LCD command 0x{:02x}", command);
		self.bus.write(command, Register::Command);
		self.bus.delay(settle_time(command));
	}

	pub fn send_command(&mut self, command: u8) -> DriverResult<()> {
		self.check_initialized()?;
		self.command(command);
		Ok(())
	}

	pub fn write_character(&mut self, letter: u8) -> DriverResult<()> {
		self.check_initialized()?;
		trace!("LCD data 0x{:02x}", letter);
		self.bus.write(letter, Register::Data);
		self.bus.delay(CHARACTER_SETTLE);
		Ok(())
	}

	/// Lazily write `text` one character per `next()`, up to the end or the
	/// first NUL.
	pub fn characters<'a, 't>(&'a mut self, text: &'t [u8]) -> Characters<'a, 't, B> {
		Characters {
			lcd: self,
			text: text.iter(),
			done: false,
		}
	}

	/// Write all of `text` (up to a NUL); returns the number of characters
	/// written.
	pub fn write_string(&mut self, text: &str) -> DriverResult<usize> {
		let mut written = 0;
		for c in self.characters(text.as_bytes()) {
			c?;
			written += 1;
		}
		debug!("LCD: wrote {:?} ({} characters)", text, written);
		Ok(written)
	}

	pub fn clear(&mut self) -> DriverResult<()> {
		self.send_command(CLEAR_DISPLAY)
	}

	pub fn home(&mut self) -> DriverResult<()> {
		self.send_command(RETURN_HOME)
	}

	/// Move the cursor; `line` and `column` count from 0.
	pub fn set_cursor(&mut self, line: u8, column: u8) -> DriverResult<()> {
		let address = cursor_address(line, column)?;
		self.send_command(SET_DDRAM_ADDRESS | address)
	}
}

/// DDRAM address for a (0-based) line and column.
pub fn cursor_address(line: u8, column: u8) -> DriverResult<u8> {
	let base = match LINE_ADDRESSES.get(line as usize) {
		Some(&base) => base,
		None => return Err(DriverError::InvalidPosition { line, column }),
	};
	// lines 3 and 4 continue lines 1 and 2
	let limit = if line < 2 { LINE_LENGTH } else { LINE_LENGTH - LINE_ADDRESSES[2] };
	if column >= limit {
		return Err(DriverError::InvalidPosition { line, column });
	}
	Ok(base + column)
}

impl<B: DataBus> fmt::Write for Lcd<B> {
	fn write_str(&mut self, s: &str) -> fmt::Result {
		self.write_string(s).map(|_| ()).map_err(|e| {
			warn!("LCD write failed: {}", e);
			fmt::Error
		})
	}
}

pub struct Characters<'a, 't, B: DataBus + 'a> {
	lcd: &'a mut Lcd<B>,
	text: std::slice::Iter<'t, u8>,
	done: bool,
}

impl<'a, 't, B: DataBus> Iterator for Characters<'a, 't, B> {
	type Item = DriverResult<u8>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		match self.text.next() {
			None | Some(&0) => {
				self.done = true;
				None
			},
			Some(&c) => Some(self.lcd.write_character(c).map(|()| c)),
		}
	}
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use super::{
		cursor_address,
		settle_time,
	};

	#[test]
	fn clear_and_home_wait_longer() {
		assert!(settle_time(0x01) >= Duration::from_micros(1520));
		assert!(settle_time(0x02) >= Duration::from_micros(1520));
		assert!(settle_time(0x03) >= Duration::from_micros(1520));
		assert!(settle_time(0x06) >= Duration::from_micros(37));
		assert!(settle_time(0x06) < Duration::from_micros(1520));
		assert!(settle_time(0xc0) < Duration::from_micros(1520));
	}

	#[test]
	fn cursor_addresses() {
		assert_eq!(cursor_address(0, 0).unwrap(), 0x00);
		assert_eq!(cursor_address(1, 0).unwrap(), 0x40);
		assert_eq!(cursor_address(2, 0).unwrap(), 0x14);
		assert_eq!(cursor_address(3, 0).unwrap(), 0x54);
		assert_eq!(cursor_address(1, 5).unwrap(), 0x45);
		assert_eq!(cursor_address(0, 39).unwrap(), 0x27);
		assert_eq!(cursor_address(3, 19).unwrap(), 0x67);
		assert!(cursor_address(4, 0).is_err());
		assert!(cursor_address(0, 40).is_err());
		assert!(cursor_address(2, 20).is_err());
	}
}
