use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::config::KeypadConfig;
use crate::keypad::{
	Keypad,
	COLUMNS,
	ROWS,
};
use crate::time::Clock;

use super::{
	SimClock,
	SimLine,
	Wiring,
};

// rows are lines 0..4, columns 4..7
const FIRST_COLUMN: usize = ROWS;

/// RC delay of a row input after a column changed
const SETTLE: Duration = Duration::from_micros(5);

const LEGEND: [[char; COLUMNS]; ROWS] = [
	['1', '2', '3'],
	['4', '5', '6'],
	['7', '8', '9'],
	['*', '0', '#'],
];

/// Switch matrix: a closed switch connects its column to its row; rows are
/// pulled low.
pub struct Matrix {
	columns: [bool; COLUMNS],
	pressed: [[bool; COLUMNS]; ROWS],
	clock: SimClock,
	last_change: Option<Duration>,
	unsettled_reads: usize,
}

impl Wiring for Matrix {
	fn drive(&mut self, line: usize, high: bool) {
		assert!(line >= FIRST_COLUMN && line < FIRST_COLUMN + COLUMNS, "keypad sim: line {} is not a column", line);
		let column = line - FIRST_COLUMN;
		if self.columns[column] != high {
			self.columns[column] = high;
			self.last_change = Some(self.clock.now());
		}
	}

	fn sample(&mut self, line: usize) -> bool {
		if line >= FIRST_COLUMN {
			assert!(line < FIRST_COLUMN + COLUMNS, "keypad sim has no line {}", line);
			return self.columns[line - FIRST_COLUMN];
		}

		if let Some(changed) = self.last_change {
			if self.clock.now() - changed < SETTLE {
				self.unsettled_reads += 1;
			}
		}
		let row = &self.pressed[line];
		(0..COLUMNS).any(|column| row[column] && self.columns[column])
	}
}

pub type SimKeypad = Keypad<SimLine<Matrix>, SimLine<Matrix>, SimClock>;

/// Phone layout 4x3 keypad; positions count from 0.
pub struct KeypadSim {
	matrix: Rc<RefCell<Matrix>>,
	clock: SimClock,
}

impl KeypadSim {
	pub fn new(clock: SimClock) -> Self {
		let matrix = Matrix {
			columns: [false; COLUMNS],
			pressed: [[false; COLUMNS]; ROWS],
			clock: clock.clone(),
			last_change: None,
			unsettled_reads: 0,
		};
		KeypadSim {
			matrix: Rc::new(RefCell::new(matrix)),
			clock,
		}
	}

	fn line(&self, line: usize) -> SimLine<Matrix> {
		SimLine::new(&self.matrix, line)
	}

	pub fn rows(&self) -> [SimLine<Matrix>; ROWS] {
		[self.line(0), self.line(1), self.line(2), self.line(3)]
	}

	pub fn columns(&self) -> [SimLine<Matrix>; COLUMNS] {
		[self.line(FIRST_COLUMN), self.line(FIRST_COLUMN + 1), self.line(FIRST_COLUMN + 2)]
	}

	pub fn keypad(&self, config: KeypadConfig) -> SimKeypad {
		Keypad::new(self.rows(), self.columns(), self.clock.clone(), config)
	}

	pub fn press(&self, row: usize, column: usize) {
		self.matrix.borrow_mut().pressed[row][column] = true;
	}

	pub fn release(&self, row: usize, column: usize) {
		self.matrix.borrow_mut().pressed[row][column] = false;
	}

	pub fn release_all(&self) {
		self.matrix.borrow_mut().pressed = [[false; COLUMNS]; ROWS];
	}

	/// Press the key labelled `label`; false if there is no such key.
	pub fn press_key(&self, label: char) -> bool {
		for (row, keys) in LEGEND.iter().enumerate() {
			if let Some(column) = keys.iter().position(|&k| k == label) {
				self.press(row, column);
				return true;
			}
		}
		false
	}

	/// Row samples taken before the lines settled after a column change.
	pub fn unsettled_reads(&self) -> usize {
		self.matrix.borrow().unsettled_reads
	}

	pub fn columns_low(&self) -> bool {
		self.matrix.borrow().columns.iter().all(|&high| !high)
	}
}
