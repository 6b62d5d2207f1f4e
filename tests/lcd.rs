use std::fmt::Write;

use bitbang_drivers::lcd::Lcd;
use bitbang_drivers::sim::{
	LcdSim,
	SimClock,
};
use bitbang_drivers::DriverError;

fn check_clean(display: &LcdSim) {
	assert_eq!(display.violations(), Vec::<String>::new());
	// RS, RW and EN back at rest
	assert_eq!(display.control_levels(), (false, false, false));
}

#[test]
fn hello_world_four_bit() {
	let display = LcdSim::new(SimClock::new());
	let mut lcd = Lcd::new(display.four_bit_bus());
	lcd.initialize().unwrap();
	assert_eq!(lcd.write_string("Hello").unwrap(), 5);
	lcd.set_cursor(1, 0).unwrap();
	assert_eq!(lcd.write_string("World!").unwrap(), 6);

	assert_eq!(display.line_text(0), "Hello");
	assert_eq!(display.line_text(1), "World!");
	check_clean(&display);
	assert!(display.is_four_bit());
	assert!(display.is_two_line());
	assert_eq!(display.display_control(), (true, true, true));
	assert!(display.increments());
}

#[test]
fn four_bit_init_sequence() {
	let display = LcdSim::new(SimClock::new());
	let mut lcd = Lcd::new(display.four_bit_bus());
	lcd.initialize().unwrap();
	// 0x30 wake and the 0x2 nibble of the first function set arrive as
	// 8-bit commands; the low nibble of that function set is ignored
	assert_eq!(display.commands(), vec![0x30, 0x20, 0x28, 0x0f, 0x01, 0x06]);
	assert_eq!(display.ignored_strobes(), 1);
	check_clean(&display);
}

#[test]
fn eight_bit_bus() {
	let display = LcdSim::new(SimClock::new());
	let mut lcd = Lcd::new(display.eight_bit_bus());
	lcd.initialize().unwrap();
	assert_eq!(display.commands(), vec![0x30, 0x38, 0x38, 0x0f, 0x01, 0x06]);
	assert_eq!(display.ignored_strobes(), 0);

	lcd.write_string("8 bit").unwrap();
	lcd.set_cursor(3, 2).unwrap();
	lcd.write_string("line 4").unwrap();
	assert_eq!(display.line_text(0), "8 bit");
	assert_eq!(display.line_text(3), "  line 4");
	assert!(!display.is_four_bit());
	check_clean(&display);
}

#[test]
fn not_initialized() {
	let display = LcdSim::new(SimClock::new());
	let mut lcd = Lcd::new(display.four_bit_bus());
	assert!(!lcd.is_initialized());
	assert_eq!(lcd.write_character(b'x'), Err(DriverError::NotInitialized));
	assert_eq!(lcd.send_command(0x01), Err(DriverError::NotInitialized));
	assert_eq!(lcd.write_string("x"), Err(DriverError::NotInitialized));
	assert_eq!(lcd.set_cursor(0, 0), Err(DriverError::NotInitialized));
	assert!(display.commands().is_empty());
}

#[test]
fn stops_at_nul() {
	let display = LcdSim::new(SimClock::new());
	let mut lcd = Lcd::new(display.four_bit_bus());
	lcd.initialize().unwrap();
	let written: Vec<u8> = lcd.characters(b"ab\0cd").map(|c| c.unwrap()).collect();
	assert_eq!(written, b"ab".to_vec());
	assert_eq!(display.line_text(0), "ab");
	assert_eq!(display.address_counter(), 2);
}

#[test]
fn clear_and_home() {
	let display = LcdSim::new(SimClock::new());
	let mut lcd = Lcd::new(display.four_bit_bus());
	lcd.initialize().unwrap();
	lcd.write_string("gone").unwrap();
	lcd.home().unwrap();
	assert_eq!(display.address_counter(), 0);
	lcd.write_string("G").unwrap();
	assert_eq!(display.line_text(0), "Gone");
	lcd.clear().unwrap();
	assert_eq!(display.line_text(0), "");
	lcd.write_string("new").unwrap();
	assert_eq!(display.line_text(0), "new");
	check_clean(&display);
	assert_eq!(display.ignored_strobes(), 1);
}

#[test]
fn invalid_position() {
	let display = LcdSim::new(SimClock::new());
	let mut lcd = Lcd::new(display.four_bit_bus());
	lcd.initialize().unwrap();
	assert_eq!(lcd.set_cursor(4, 0), Err(DriverError::InvalidPosition { line: 4, column: 0 }));
	assert_eq!(lcd.set_cursor(2, 20), Err(DriverError::InvalidPosition { line: 2, column: 20 }));
}

#[test]
fn reset_resynchronizes() {
	let display = LcdSim::new(SimClock::new());
	let mut lcd = Lcd::new(display.four_bit_bus());
	lcd.initialize().unwrap();
	lcd.write_string("before").unwrap();

	lcd.reset();
	assert!(display.is_four_bit());
	assert!(display.is_two_line());
	assert_eq!(display.line_text(0), "");
	lcd.write_string("after").unwrap();
	assert_eq!(display.line_text(0), "after");
	check_clean(&display);
}

#[test]
fn second_initialize_is_refused() {
	let display = LcdSim::new(SimClock::new());
	let mut lcd = Lcd::new(display.four_bit_bus());
	lcd.initialize().unwrap();
	let commands = display.commands();

	assert_eq!(lcd.initialize(), Err(DriverError::AlreadyInitialized));
	// nothing sent, setup intact
	assert_eq!(display.commands(), commands);
	assert!(display.is_four_bit());
	assert!(display.is_two_line());
	assert!(lcd.is_initialized());

	lcd.write_string("still ok").unwrap();
	assert_eq!(display.line_text(0), "still ok");
	check_clean(&display);
}

#[test]
fn formatted_output() {
	let display = LcdSim::new(SimClock::new());
	let mut lcd = Lcd::new(display.four_bit_bus());
	lcd.initialize().unwrap();
	write!(lcd, "T={}C", 21).unwrap();
	assert_eq!(display.line_text(0), "T=21C");
}
