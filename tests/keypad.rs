use std::time::Duration;

use bitbang_drivers::config::KeypadConfig;
use bitbang_drivers::keypad::{
	key_label,
	COLUMNS,
	HASH,
	NO_KEY,
	ROWS,
	STAR,
};
use bitbang_drivers::sim::{
	KeypadSim,
	SimClock,
};

const LEGEND: [[char; COLUMNS]; ROWS] = [
	['1', '2', '3'],
	['4', '5', '6'],
	['7', '8', '9'],
	['*', '0', '#'],
];

#[test]
fn every_key() {
	let pad = KeypadSim::new(SimClock::new());
	let mut keypad = pad.keypad(KeypadConfig::default());
	keypad.initialize();
	assert!(pad.columns_low());

	for row in 0..ROWS {
		for column in 0..COLUMNS {
			pad.release_all();
			pad.press(row, column);
			let key = keypad.get_key();
			assert_eq!(key_label(key), Some(LEGEND[row][column]), "row {} column {} gave {}", row, column, key);
			assert!(pad.columns_low());
		}
	}
	assert_eq!(pad.unsettled_reads(), 0);
}

#[test]
fn special_keys() {
	let pad = KeypadSim::new(SimClock::new());
	let mut keypad = pad.keypad(KeypadConfig::default());
	keypad.initialize();
	for &(label, code) in &[('*', STAR), ('0', 0), ('#', HASH)] {
		pad.release_all();
		assert!(pad.press_key(label));
		assert_eq!(keypad.get_key(), code);
	}
	assert!(!pad.press_key('A'));
}

#[test]
fn no_key() {
	let pad = KeypadSim::new(SimClock::new());
	let mut keypad = pad.keypad(KeypadConfig::default());
	keypad.initialize();
	assert_eq!(keypad.get_key(), NO_KEY);
	assert_eq!(keypad.pressed(), None);
	assert!(pad.columns_low());

	pad.press_key('9');
	assert_eq!(keypad.pressed(), Some(9));
	pad.release_all();
	assert_eq!(keypad.pressed(), None);
}

#[test]
fn leftmost_column_wins() {
	let pad = KeypadSim::new(SimClock::new());
	let mut keypad = pad.keypad(KeypadConfig::default());
	keypad.initialize();
	pad.press_key('3');
	pad.press_key('7');
	assert_eq!(keypad.get_key(), 7);
	pad.release(2, 0);
	assert_eq!(keypad.get_key(), 3);
}

#[test]
fn same_column_is_garbage_but_harmless() {
	let pad = KeypadSim::new(SimClock::new());
	let mut keypad = pad.keypad(KeypadConfig::default());
	keypad.initialize();
	pad.press_key('2');
	pad.press_key('5');
	pad.press_key('8');
	let key = keypad.get_key();
	assert_ne!(key, NO_KEY);
	assert!(pad.columns_low());
}

#[test]
fn short_settle_is_noticed() {
	let pad = KeypadSim::new(SimClock::new());
	let config = KeypadConfig {
		settle: Duration::from_micros(1),
	};
	let mut keypad = pad.keypad(config);
	keypad.initialize();
	pad.press_key('5');
	keypad.get_key();
	assert!(pad.unsettled_reads() > 0);
}
