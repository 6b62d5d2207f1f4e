#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate bitbang_drivers;
use bitbang_drivers::*;

use std::process::exit;
use std::time::Duration;

use bitbang_drivers::config::{
	parse_number,
	FromStrRadix,
	KeypadConfig,
	PinList,
	TwoWireConfig,
	DEFAULT_EEPROM_ADDRESS,
};
use bitbang_drivers::gpio::SysfsGpio;
use bitbang_drivers::keypad::{
	key_label,
	Keypad,
	NO_KEY,
};
use bitbang_drivers::lcd::{
	DataBus,
	EightBitBus,
	FourBitBus,
	Lcd,
};
use bitbang_drivers::lines::{
	InputLine,
	OutputLine,
};
use bitbang_drivers::sim::{
	KeypadSim,
	LcdSim,
	SimClock,
	TwoWireSim,
};
use bitbang_drivers::time::{
	Clock,
	SystemClock,
};
use bitbang_drivers::twowire::{
	Hardware,
	Pins,
	TwoWire,
};

// how long `eeprom write` waits for the write cycle to finish
const WRITE_READY_TIMEOUT: Duration = Duration::from_millis(20);

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_number<T: FromStrRadix>(matches: &clap::ArgMatches, name: &str) -> AResult<T> {
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	parse_number(param).map_err(|e| {
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn print_hex(start: u16, data: &[u8]) {
	for (i, byte) in data.iter().enumerate() {
		if 0 == i % 16 {
			print!("{:04x} ", start as usize + i);
		} else if 0 == i % 8 {
			print!(" ");
		}
		print!(" {:02x}", byte);
		if 15 == i % 16 {
			println!();
		}
	}
	if 0 != data.len() % 16 {
		println!();
	}
}

fn eeprom_operation<H: Hardware>(bus: &mut TwoWire<H>, sub_m: &clap::ArgMatches) -> AResult<()> {
	match sub_m.subcommand() {
		("read", Some(m)) => {
			let address: u16 = get_number(m, "ADDRESS")?;
			let value = bus.read(address)?;
			println!("@{:04x}: {:02x}", address, value);
		},
		("write", Some(m)) => {
			let address: u16 = get_number(m, "ADDRESS")?;
			let value: u8 = get_number(m, "VALUE")?;
			bus.write(address, value)?;
			let busy = bus.wait_ready(WRITE_READY_TIMEOUT)?;
			info!("wrote 0x{:02x} to @{:04x} (write cycle took {:?})", value, address, busy);
		},
		("dump", Some(m)) => {
			let address: u16 = get_number(m, "ADDRESS")?;
			let length: usize = get_number(m, "LENGTH")?;
			ensure!(address as usize + length <= 0x10000, "dump of {} bytes at @{:04x} exceeds the address space", length, address);
			let mut data = vec![0u8; length];
			bus.read_sequential(address, &mut data)?;
			print_hex(address, &data);
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand for 'eeprom' {:?}", cmd),
	}
	Ok(())
}

fn eeprom_command(sub_m: &clap::ArgMatches, simulate: bool) -> AResult<()> {
	let device: u8 = match sub_m.value_of("device") {
		Some(_) => get_number(sub_m, "device")?,
		None => DEFAULT_EEPROM_ADDRESS,
	};
	let config = TwoWireConfig::default();

	if simulate {
		let sim = TwoWireSim::new(SimClock::new(), device);
		let mut bus = TwoWire::new(sim.pins(), config);
		bus.initialize(device)?;
		return eeprom_operation(&mut bus, sub_m);
	}

	let scl: u32 = get_number(sub_m, "scl")?;
	let sda: u32 = get_number(sub_m, "sda")?;
	let gpio = SysfsGpio::new();
	let pins = Pins::new(gpio.open_drain(scl)?, gpio.open_drain(sda)?, SystemClock::new());
	let mut bus = TwoWire::new(pins, config);
	bus.initialize(device)?;
	eeprom_operation(&mut bus, sub_m)
}

fn lcd_print<B: DataBus>(lcd: &mut Lcd<B>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let text = match sub_m.value_of("TEXT") {
		Some(t) => t,
		None => bail!("missing parameter TEXT"),
	};
	let line: u8 = match sub_m.value_of("line") {
		Some(_) => get_number(sub_m, "line")?,
		None => 1,
	};
	ensure!(line >= 1, "display lines count from 1");

	lcd.initialize()?;
	lcd.set_cursor(line - 1, 0)?;
	let written = lcd.write_string(text)?;
	info!("printed {} characters on line {}", written, line);
	Ok(())
}

fn lcd_command(sub_m: &clap::ArgMatches, simulate: bool) -> AResult<()> {
	let print_m = match sub_m.subcommand() {
		("print", Some(m)) => m,
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand for 'lcd' {:?}", cmd),
	};

	if simulate {
		let display = LcdSim::new(SimClock::new());
		let mut lcd = Lcd::new(display.four_bit_bus());
		lcd_print(&mut lcd, print_m)?;
		for line in 0..4 {
			println!("{}: {:?}", line + 1, display.line_text(line));
		}
		return Ok(());
	}

	let rs: u32 = get_number(sub_m, "rs")?;
	let rw: u32 = get_number(sub_m, "rw")?;
	let en: u32 = get_number(sub_m, "en")?;
	let data: PinList = get_param(sub_m, "data")?;
	let gpio = SysfsGpio::new();
	let (rs, rw, en) = (gpio.output(rs, false)?, gpio.output(rw, false)?, gpio.output(en, false)?);

	match data.len() {
		4 => {
			let d = &data.0;
			let data = [gpio.output(d[0], false)?, gpio.output(d[1], false)?, gpio.output(d[2], false)?, gpio.output(d[3], false)?];
			let mut lcd = Lcd::new(FourBitBus::new(rs, rw, en, data, SystemClock::new()));
			lcd_print(&mut lcd, print_m)
		},
		8 => {
			let d = &data.0;
			let data = [
				gpio.output(d[0], false)?,
				gpio.output(d[1], false)?,
				gpio.output(d[2], false)?,
				gpio.output(d[3], false)?,
				gpio.output(d[4], false)?,
				gpio.output(d[5], false)?,
				gpio.output(d[6], false)?,
				gpio.output(d[7], false)?,
			];
			let mut lcd = Lcd::new(EightBitBus::new(rs, rw, en, data, SystemClock::new()));
			lcd_print(&mut lcd, print_m)
		},
		n => bail!("need 4 (DB4..DB7) or 8 (DB0..DB7) data pins, got {} ({})", n, data),
	}
}

fn keypad_scan<R, C, K>(keypad: &mut Keypad<R, C, K>) -> AResult<()>
where
	R: InputLine,
	C: OutputLine,
	K: Clock,
{
	keypad.initialize();
	match keypad.get_key() {
		NO_KEY => println!("no key pressed"),
		key => match key_label(key) {
			Some(label) => println!("key {} ({})", label, key),
			None => println!("unknown key code {} (several keys pressed?)", key),
		},
	}
	Ok(())
}

fn keypad_command(sub_m: &clap::ArgMatches, simulate: bool) -> AResult<()> {
	let scan_m = match sub_m.subcommand() {
		("scan", Some(m)) => m,
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand for 'keypad' {:?}", cmd),
	};
	let config = KeypadConfig::default();

	if simulate {
		let pad = KeypadSim::new(SimClock::new());
		if let Some(keys) = scan_m.value_of("press") {
			for label in keys.chars() {
				ensure!(pad.press_key(label), "no key {:?} on the keypad", label);
			}
		}
		return keypad_scan(&mut pad.keypad(config));
	}

	let rows: PinList = get_param(sub_m, "rows")?;
	let columns: PinList = get_param(sub_m, "columns")?;
	let r = rows.expect_len(4, "row")?;
	let c = columns.expect_len(3, "column")?;
	let gpio = SysfsGpio::new();
	let rows = [gpio.input(r[0])?, gpio.input(r[1])?, gpio.input(r[2])?, gpio.input(r[3])?];
	let columns = [gpio.output(c[0], false)?, gpio.output(c[1], false)?, gpio.output(c[2], false)?];
	keypad_scan(&mut Keypad::new(rows, columns, SystemClock::new(), config))
}

fn demo() -> AResult<()> {
	let clock = SimClock::new();

	let chip = TwoWireSim::new(clock.clone(), DEFAULT_EEPROM_ADDRESS);
	let mut bus = TwoWire::new(chip.pins(), TwoWireConfig::default());
	bus.initialize(DEFAULT_EEPROM_ADDRESS)?;
	bus.write(0x1122, 0x24)?;
	bus.wait_write_cycle();
	println!("EEPROM @1122: {:02x}", bus.read(0x1122)?);

	let display = LcdSim::new(clock.clone());
	let mut lcd = Lcd::new(display.four_bit_bus());
	lcd.initialize()?;
	lcd.write_string("Hello")?;
	lcd.set_cursor(1, 0)?;
	lcd.write_string("World!")?;
	for line in 0..2 {
		println!("LCD line {}: {:?}", line + 1, display.line_text(line));
	}

	let pad = KeypadSim::new(clock.clone());
	let mut keypad = pad.keypad(KeypadConfig::default());
	keypad.initialize();
	for &label in &['5', '0', '#'] {
		pad.release_all();
		pad.press_key(label);
		let key = keypad.get_key();
		println!("keypad {}: code {}", label, key);
	}
	pad.release_all();
	println!("keypad idle: code {}", keypad.get_key());

	debug!("demo took {:?} of simulated time", clock.now());
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg simulate: -s --simulate "use simulated devices instead of sysfs GPIO")
		(@subcommand demo =>
			(about: "run EEPROM, LCD and keypad demos against simulated devices")
		)
		(@subcommand eeprom =>
			(about: "24LC256 style EEPROM on a bit-banged two-wire bus")
			(@setting SubcommandRequiredElseHelp)
			(@arg scl: --scl +takes_value "GPIO used as SCL")
			(@arg sda: --sda +takes_value "GPIO used as SDA")
			(@arg device: --device +takes_value "7-bit device address (default 0x50)")
			(@subcommand read =>
				(about: "read a single byte")
				(@arg ADDRESS: +required "memory address")
			)
			(@subcommand write =>
				(about: "write a single byte")
				(@arg ADDRESS: +required "memory address")
				(@arg VALUE: +required "byte to write")
			)
			(@subcommand dump =>
				(about: "hex dump a memory range")
				(@arg ADDRESS: +required "start address")
				(@arg LENGTH: +required "number of bytes")
			)
		)
		(@subcommand lcd =>
			(about: "HD44780 character display")
			(@setting SubcommandRequiredElseHelp)
			(@arg rs: --rs +takes_value "GPIO used as RS")
			(@arg rw: --rw +takes_value "GPIO used as RW")
			(@arg en: --en +takes_value "GPIO used as EN")
			(@arg data: --data +takes_value "data GPIOs, DB4..DB7 or DB0..DB7 (comma separated)")
			(@subcommand print =>
				(about: "initialize the display and print text")
				(@arg line: -l --line +takes_value "display line (from 1)")
				(@arg TEXT: +required "text to print")
			)
		)
		(@subcommand keypad =>
			(about: "4x3 matrix keypad")
			(@setting SubcommandRequiredElseHelp)
			(@arg rows: --rows +takes_value "row GPIOs, row 1 first (comma separated)")
			(@arg columns: --columns +takes_value "column GPIOs, left first (comma separated)")
			(@subcommand scan =>
				(about: "scan once and print the pressed key")
				(@arg press: --press +takes_value "keys held down on the simulated keypad")
			)
		)
	).get_matches();
	let simulate = matches.is_present("simulate");

	match matches.subcommand() {
		("demo", _) => {
			demo()
		},
		("eeprom", Some(sub_m)) => {
			eeprom_command(sub_m, simulate)
		},
		("lcd", Some(sub_m)) => {
			lcd_command(sub_m, simulate)
		},
		("keypad", Some(sub_m)) => {
			keypad_command(sub_m, simulate)
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
