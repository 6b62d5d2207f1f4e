//! 4x3 matrix keypad (phone layout) scanned over GPIO.
//!
//! Rows are inputs with pull-downs, columns are outputs. A pressed key
//! connects its column to its row, so driving a column high shows the key
//! on its row input.
//!
//! ```text
//!          col 1  col 2  col 3
//!   row 1    1      2      3
//!   row 2    4      5      6
//!   row 3    7      8      9
//!   row 4    *      0      #
//! ```
//!
//! Only a single pressed key is decoded correctly: with keys in several
//! columns the leftmost column wins, several keys in one column give a
//! meaningless code.

use crate::config::KeypadConfig;
use crate::lines::{
	read_bits,
	InputLine,
	OutputLine,
};
use crate::time::Clock;

pub const ROWS: usize = 4;
pub const COLUMNS: usize = 3;

/// returned by `Keypad::get_key` when nothing is pressed
pub const NO_KEY: u8 = 0xff;

pub const STAR: u8 = 10;
pub const HASH: u8 = 12;

/// Key code for a row pattern (bit `n` set: row `n + 1` active) and a
/// 1-based column.
///
/// `code = row * 3 - (3 - column)`; the 0 key sits where 11 would be.
/// Patterns with several bits set produce garbage (but never panic).
pub fn decode(rows: u8, column: u8) -> u8 {
	let row = match rows {
		0b0100 => 3,
		0b1000 => 4,
		// 1 and 2 are already the row number
		r => r,
	};
	let key = row.wrapping_mul(3).wrapping_sub(3u8.wrapping_sub(column));
	if key == 11 {
		0
	} else {
		key
	}
}

/// Printed legend of a key code.
pub fn key_label(code: u8) -> Option<char> {
	match code {
		0..=9 => Some((b'0' + code) as char),
		STAR => Some('*'),
		HASH => Some('#'),
		_ => None,
	}
}

pub struct Keypad<R, C, K> {
	rows: [R; ROWS],
	columns: [C; COLUMNS],
	clock: K,
	config: KeypadConfig,
}

impl<R, C, K> Keypad<R, C, K>
where
	R: InputLine,
	C: OutputLine,
	K: Clock,
{
	/// `rows[0]` is row 1, `columns[0]` the leftmost column.
	///
	/// Rows need to be inputs pulled low, columns outputs.
	pub fn new(rows: [R; ROWS], columns: [C; COLUMNS], clock: K, config: KeypadConfig) -> Self {
		Keypad {
			rows,
			columns,
			clock,
			config,
		}
	}

	pub fn into_parts(self) -> ([R; ROWS], [C; COLUMNS], K) {
		(self.rows, self.columns, self.clock)
	}

	/// All columns low.
	pub fn initialize(&mut self) {
		self.drive_columns(None);
	}

	// `None`: all columns high; `Some(n)`: only column n high
	fn drive_columns(&mut self, active: Option<usize>) {
		for (index, column) in self.columns.iter_mut().enumerate() {
			column.set(active == Some(index));
		}
	}

	fn sample_rows(&mut self) -> u8 {
		let settle = self.config.settle;
		self.clock.delay(settle);
		read_bits(&mut self.rows)
	}

	/// Non-blocking scan; `NO_KEY` if nothing is pressed.
	pub fn get_key(&mut self) -> u8 {
		for column in self.columns.iter_mut() {
			column.set_high();
		}
		let rows = self.sample_rows();
		if rows == 0 {
			self.drive_columns(None);
			return NO_KEY;
		}

		let mut found = None;
		for column in 0..COLUMNS {
			self.drive_columns(Some(column));
			let rows = self.sample_rows();
			if rows != 0 {
				found = Some((rows, column));
				break;
			}
		}
		self.drive_columns(None);

		match found {
			None => {
				// released between the two scans
				trace!("keypad: key released during scan");
				NO_KEY
			},
			Some((rows, column)) => {
				let key = decode(rows, column as u8 + 1);
				debug!("keypad: rows 0b{:04b} column {} -> key {}", rows, column + 1, key);
				key
			},
		}
	}

	pub fn pressed(&mut self) -> Option<u8> {
		match self.get_key() {
			NO_KEY => None,
			key => Some(key),
		}
	}
}
