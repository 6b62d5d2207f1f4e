use std::fmt;
use std::str;
use std::time::Duration;

/// Timing and addressing of a two-wire bus.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TwoWireConfig {
	/// half a clock period; 1.25us is a 400 kHz class bus
	pub half_period: Duration,
	/// how long a device may hold SCL (or SDA before START) low
	pub stretch_timeout: Duration,
	/// internal write cycle of the device after STOP
	pub write_cycle: Duration,
}

impl Default for TwoWireConfig {
	fn default() -> Self {
		TwoWireConfig {
			half_period: Duration::from_nanos(1250),
			stretch_timeout: Duration::from_millis(10),
			write_cycle: Duration::from_millis(5),
		}
	}
}

/// 24LC256 with A2..A0 tied to ground
pub const DEFAULT_EEPROM_ADDRESS: u8 = 0x50;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct KeypadConfig {
	/// wait after changing column outputs before sampling rows
	pub settle: Duration,
}

impl Default for KeypadConfig {
	fn default() -> Self {
		KeypadConfig {
			// 25 cycles at 3 MHz, rounded up
			settle: Duration::from_micros(9),
		}
	}
}

/// Parse decimal or `0x`-prefixed hexadecimal numbers.
pub fn parse_number<T>(s: &str) -> crate::AResult<T>
where
	T: FromStrRadix,
{
	let s = s.trim();
	let (digits, radix) = if s.starts_with("0x") || s.starts_with("0X") {
		(&s[2..], 16)
	} else {
		(s, 10)
	};
	ensure!(!digits.is_empty(), "empty number: {:?}", s);
	with_context!(("invalid number {:?}", s), {
		Ok(T::from_str_radix(digits, radix)?)
	})
}

pub trait FromStrRadix: Sized {
	fn from_str_radix(src: &str, radix: u32) -> Result<Self, std::num::ParseIntError>;
}

macro_rules! impl_from_str_radix {
	($($t:ty)*) => {$(
		impl FromStrRadix for $t {
			fn from_str_radix(src: &str, radix: u32) -> Result<Self, std::num::ParseIntError> {
				<$t>::from_str_radix(src, radix)
			}
		}
	)*};
}

impl_from_str_radix!(u8 u16 u32 usize);

/// Comma separated list of GPIO numbers, e.g. `17,27,22`
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PinList(pub Vec<u32>);

impl PinList {
	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Fail unless exactly `count` pins were given.
	pub fn expect_len(&self, count: usize, role: &str) -> crate::AResult<&[u32]> {
		ensure!(self.0.len() == count, "need {} {} pins, got {} ({})", count, role, self.0.len(), self);
		Ok(&self.0)
	}
}

impl fmt::Display for PinList {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for (i, pin) in self.0.iter().enumerate() {
			if i > 0 {
				write!(f, ",")?;
			}
			write!(f, "{}", pin)?;
		}
		Ok(())
	}
}

impl str::FromStr for PinList {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut pins = Vec::new();
		for part in s.split(',') {
			let part = part.trim();
			ensure!(!part.is_empty(), "empty entry in pin list {:?}", s);
			let pin = with_context!(("invalid pin in list {:?}", s), parse_number::<u32>(part))?;
			ensure!(!pins.contains(&pin), "pin {} used twice in {:?}", pin, s);
			pins.push(pin);
		}
		Ok(PinList(pins))
	}
}

#[cfg(test)]
mod test {
	use super::{
		parse_number,
		PinList,
	};

	fn check_pins(repr: &str, pins: &[u32]) {
		match repr.parse::<PinList>() {
			Err(e) => panic!("{} failed to parse as PinList: {}", repr, e),
			Ok(list) => assert_eq!(&list.0[..], pins, "failed validating parsed {}", repr),
		}
	}

	fn check_invalid_pins(repr: &str) {
		assert!(repr.parse::<PinList>().is_err(), "{:?} must not be a valid pin list", repr);
	}

	#[test]
	fn parse_pin_list() {
		check_pins("17", &[17]);
		check_pins("17,27,22", &[17, 27, 22]);
		check_pins(" 5, 6 ,13", &[5, 6, 13]);
		check_pins("0x10,0x11", &[16, 17]);
		assert_eq!("4,5,6".parse::<PinList>().unwrap().to_string(), "4,5,6");
		check_invalid_pins("");
		check_invalid_pins(",");
		check_invalid_pins("1,,2");
		check_invalid_pins("1,2,");
		check_invalid_pins("a");
		check_invalid_pins("1,1");
		check_invalid_pins("-3");
	}

	#[test]
	fn parse_numbers() {
		assert_eq!(parse_number::<u16>("0x1122").unwrap(), 0x1122);
		assert_eq!(parse_number::<u16>("4386").unwrap(), 0x1122);
		assert_eq!(parse_number::<u8>("0X24").unwrap(), 0x24);
		assert!(parse_number::<u8>("0x").is_err());
		assert!(parse_number::<u8>("256").is_err());
		assert!(parse_number::<u8>("0x100").is_err());
		assert!(parse_number::<u16>("").is_err());
	}

	#[test]
	fn expect_pin_count() {
		let list: PinList = "1,2,3".parse().unwrap();
		assert!(list.expect_len(3, "column").is_ok());
		assert!(list.expect_len(4, "row").is_err());
	}
}
