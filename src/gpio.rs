//! GPIO lines through the Linux sysfs interface (`/sys/class/gpio`).
//!
//! Setting up a line can fail and returns errors; toggling and sampling an
//! opened line can't report errors through the line traits, so those only
//! get logged.

use std::fs;
use std::io::{
	self,
	Write,
};
use std::os::unix::fs::FileExt;
use std::path::{
	Path,
	PathBuf,
};

use crate::lines::{
	InputLine,
	OutputLine,
};

pub const SYSFS_GPIO: &str = "/sys/class/gpio";

/// A sysfs GPIO tree; usually `/sys/class/gpio`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SysfsGpio {
	root: PathBuf,
}

impl Default for SysfsGpio {
	fn default() -> Self {
		Self::new()
	}
}

fn write_file(path: &Path, content: &str) -> io::Result<()> {
	fs::OpenOptions::new().write(true).truncate(true).open(path)?.write_all(content.as_bytes())
}

impl SysfsGpio {
	pub fn new() -> Self {
		Self::with_root(SYSFS_GPIO)
	}

	pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
		SysfsGpio { root: root.into() }
	}

	fn pin_dir(&self, pin: u32) -> PathBuf {
		self.root.join(format!("gpio{}", pin))
	}

	/// Make `gpioN` appear (no-op if already exported).
	pub fn export(&self, pin: u32) -> crate::AResult<()> {
		let dir = self.pin_dir(pin);
		if dir.is_dir() {
			return Ok(());
		}
		with_context!(("GPIO {}: export", pin), {
			write_file(&self.root.join("export"), &pin.to_string())?;
			Ok(())
		})?;
		ensure!(dir.is_dir(), "GPIO {}: {} missing after export", pin, dir.display());
		debug!("GPIO {} exported", pin);
		Ok(())
	}

	fn open(&self, pin: u32, direction: &str) -> crate::AResult<Pin> {
		self.export(pin)?;
		let dir = self.pin_dir(pin);
		with_context!(("GPIO {}: set direction {:?}", pin, direction), {
			write_file(&dir.join("direction"), direction)?;
			Ok(())
		})?;
		let value = with_context!(("GPIO {}: open value", pin), {
			Ok(fs::OpenOptions::new().read(true).write(true).open(dir.join("value"))?)
		})?;
		Ok(Pin { number: pin, dir, value })
	}

	/// Push-pull output, starting at `high`.
	pub fn output(&self, pin: u32, high: bool) -> crate::AResult<OutputPin> {
		// "high"/"low" switch direction and level in one step
		let pin = self.open(pin, if high { "high" } else { "low" })?;
		Ok(OutputPin { pin })
	}

	pub fn input(&self, pin: u32) -> crate::AResult<InputPin> {
		let pin = self.open(pin, "in")?;
		Ok(InputPin { pin })
	}

	/// Emulated open-drain line (needs an external pull-up); starts
	/// released.
	pub fn open_drain(&self, pin: u32) -> crate::AResult<OpenDrainPin> {
		let pin = self.open(pin, "in")?;
		Ok(OpenDrainPin { pin, released: true })
	}
}

#[derive(Debug)]
struct Pin {
	number: u32,
	dir: PathBuf,
	value: fs::File,
}

impl Pin {
	fn read(&self) -> bool {
		let mut buf = [0u8];
		match self.value.read_at(&mut buf, 0) {
			Ok(1) => buf[0] == b'1',
			Ok(_) => {
				error!("GPIO {}: empty value", self.number);
				false
			},
			Err(e) => {
				error!("GPIO {}: failed to read value: {}", self.number, e);
				false
			},
		}
	}

	fn write(&self, high: bool) {
		let buf = if high { b"1" } else { b"0" };
		if let Err(e) = self.value.write_at(buf, 0) {
			error!("GPIO {}: failed to write value: {}", self.number, e);
		}
	}

	fn direction(&self, direction: &str) {
		if let Err(e) = write_file(&self.dir.join("direction"), direction) {
			error!("GPIO {}: failed to set direction {:?}: {}", self.number, direction, e);
		}
	}
}

#[derive(Debug)]
pub struct OutputPin {
	pin: Pin,
}

impl OutputPin {
	pub fn number(&self) -> u32 {
		self.pin.number
	}
}

impl OutputLine for OutputPin {
	fn set(&mut self, high: bool) {
		self.pin.write(high)
	}
}

#[derive(Debug)]
pub struct InputPin {
	pin: Pin,
}

impl InputPin {
	pub fn number(&self) -> u32 {
		self.pin.number
	}
}

impl InputLine for InputPin {
	fn is_high(&mut self) -> bool {
		self.pin.read()
	}
}

/// Released: input (pull-up wins); pulled low: output driving 0.
#[derive(Debug)]
pub struct OpenDrainPin {
	pin: Pin,
	released: bool,
}

impl OpenDrainPin {
	pub fn number(&self) -> u32 {
		self.pin.number
	}
}

impl OutputLine for OpenDrainPin {
	fn set(&mut self, release: bool) {
		if release == self.released {
			return;
		}
		self.pin.direction(if release { "in" } else { "low" });
		self.released = release;
	}
}

impl InputLine for OpenDrainPin {
	fn is_high(&mut self) -> bool {
		self.pin.read()
	}
}

#[cfg(test)]
mod test {
	use std::fs;
	use std::path::{
		Path,
		PathBuf,
	};

	use crate::lines::{
		InputLine,
		OutputLine,
	};

	use super::SysfsGpio;

	// fake sysfs tree with already exported pins
	fn fake_tree(name: &str, pins: &[u32]) -> PathBuf {
		let root = std::env::temp_dir().join(format!("bitbang-gpio-{}-{}", name, std::process::id()));
		let _ = fs::remove_dir_all(&root);
		fs::create_dir_all(&root).unwrap();
		for pin in pins {
			let dir = root.join(format!("gpio{}", pin));
			fs::create_dir_all(&dir).unwrap();
			fs::write(dir.join("direction"), "in").unwrap();
			fs::write(dir.join("value"), "0").unwrap();
		}
		fs::write(root.join("export"), "").unwrap();
		root
	}

	fn read(root: &Path, pin: u32, file: &str) -> String {
		fs::read_to_string(root.join(format!("gpio{}", pin)).join(file)).unwrap()
	}

	#[test]
	fn output_sets_direction_and_value() {
		let root = fake_tree("output", &[17]);
		let gpio = SysfsGpio::with_root(&root);
		let mut pin = gpio.output(17, false).unwrap();
		assert_eq!(read(&root, 17, "direction"), "low");
		pin.set_high();
		assert_eq!(&read(&root, 17, "value")[..1], "1");
		pin.set_low();
		assert_eq!(&read(&root, 17, "value")[..1], "0");
		fs::remove_dir_all(&root).unwrap();
	}

	#[test]
	fn input_reads_value() {
		let root = fake_tree("input", &[4]);
		let gpio = SysfsGpio::with_root(&root);
		let mut pin = gpio.input(4).unwrap();
		assert!(pin.is_low());
		fs::write(root.join("gpio4").join("value"), "1\n").unwrap();
		assert!(pin.is_high());
		fs::remove_dir_all(&root).unwrap();
	}

	#[test]
	fn open_drain_switches_direction() {
		let root = fake_tree("open-drain", &[2]);
		let gpio = SysfsGpio::with_root(&root);
		let mut pin = gpio.open_drain(2).unwrap();
		assert_eq!(read(&root, 2, "direction"), "in");
		pin.set_low();
		assert_eq!(read(&root, 2, "direction"), "low");
		pin.set_high();
		assert_eq!(read(&root, 2, "direction"), "in");
		fs::remove_dir_all(&root).unwrap();
	}

	#[test]
	fn export_missing_pin_fails() {
		let root = fake_tree("export", &[]);
		let gpio = SysfsGpio::with_root(&root);
		// nothing creates gpio9 in a plain directory
		assert!(gpio.input(9).is_err());
		assert_eq!(fs::read_to_string(root.join("export")).unwrap(), "9");
		fs::remove_dir_all(&root).unwrap();
	}
}
