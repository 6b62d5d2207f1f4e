use std::time::Duration;

use crate::config::TwoWireConfig;
use crate::error::{
	DriverError,
	DriverResult,
};
use crate::time::Clock;

use super::{
	low_level::Transaction,
	Hardware,
	Phase,
};

/// 24LC256 page size
pub const PAGE_SIZE: usize = 64;

const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Split a memory address into the bytes sent on the wire (high first).
pub fn split_address(address: u16) -> (u8, u8) {
	((address >> 8) as u8, (address & 0xff) as u8)
}

pub fn join_address(high: u8, low: u8) -> u16 {
	((high as u16) << 8) | (low as u16)
}

/// Two-wire bus handle for an EEPROM with 16-bit memory addresses.
///
/// The handle owns its lines; every operation borrows it mutably, so
/// transfers never interleave.
pub struct TwoWire<H: Hardware> {
	pub(super) hardware: H,
	pub(super) config: TwoWireConfig,
	pub(super) phase: Phase,
	device: Option<u8>,
}

impl<H: Hardware> TwoWire<H> {
	pub fn new(hardware: H, config: TwoWireConfig) -> Self {
		TwoWire {
			hardware,
			config,
			phase: Phase::Idle,
			device: None,
		}
	}

	pub fn config(&self) -> &TwoWireConfig {
		&self.config
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn device_address(&self) -> Option<u8> {
		self.device
	}

	pub fn into_hardware(self) -> H {
		self.hardware
	}

	/// Block on the bus time source.
	pub fn delay(&mut self, duration: Duration) {
		self.hardware.delay(duration);
	}

	/// Wait the configured write cycle; needed after `write` and
	/// `write_page` before the device answers again.
	pub fn wait_write_cycle(&mut self) {
		let write_cycle = self.config.write_cycle;
		self.hardware.delay(write_cycle);
	}

	pub fn initialize(&mut self, device_address: u8) -> DriverResult<()> {
		if let Some(device) = self.device {
			warn!("two-wire bus already initialized for device 0x{:02x}", device);
			return Err(DriverError::AlreadyInitialized);
		}
		if device_address > 0x7f {
			return Err(DriverError::InvalidAddress(device_address));
		}

		// idle bus: both lines released
		self.hardware.set_clock_line(true);
		self.hardware.set_data_line(true);
		self.device = Some(device_address);
		debug!("two-wire bus initialized for device 0x{:02x} ({:?})", device_address, self.config);
		Ok(())
	}

	fn device(&self) -> DriverResult<u8> {
		self.device.ok_or(DriverError::NotInitialized)
	}

	// START, device address + write, memory address
	fn address_memory(&mut self, address: u16) -> DriverResult<Transaction<'_, H>> {
		let device = self.device()?;
		let (high, low) = split_address(address);

		let mut tx = Transaction::begin(self)?;
		tx.send_address(device, false)?;
		tx.send_data(high)?;
		tx.send_data(low)?;
		Ok(tx)
	}

	pub fn write(&mut self, address: u16, value: u8) -> DriverResult<()> {
		debug!("two-wire write @0x{:04x}: 0x{:02x}", address, value);
		let mut tx = self.address_memory(address)?;
		tx.send_data(value)?;
		tx.stop()
	}

	/// Write up to one page in a single transfer.
	///
	/// The device wraps around inside the page the start address is in.
	pub fn write_page(&mut self, address: u16, data: &[u8]) -> DriverResult<()> {
		if data.len() > PAGE_SIZE {
			return Err(DriverError::PageOverflow {
				len: data.len(),
				page_size: PAGE_SIZE,
			});
		}
		debug!("two-wire page write @0x{:04x}: {} bytes", address, data.len());
		let mut tx = self.address_memory(address)?;
		for &byte in data {
			tx.send_data(byte)?;
		}
		tx.stop()
	}

	/// Random read positioned at `address`; every `read_byte` continues
	/// sequentially.
	///
	/// The device wraps around at the end of its memory, so the reader never
	/// runs out: bound it (`take`) before collecting.
	pub fn reader(&mut self, address: u16) -> DriverResult<Reader<'_, H>> {
		let device = self.device()?;
		let mut tx = self.address_memory(address)?;
		tx.restart()?;
		tx.send_address(device, true)?;
		Ok(Reader { transaction: tx })
	}

	pub fn read(&mut self, address: u16) -> DriverResult<u8> {
		let mut reader = self.reader(address)?;
		let value = reader.read_byte()?;
		reader.finish()?;
		debug!("two-wire read @0x{:04x}: 0x{:02x}", address, value);
		Ok(value)
	}

	pub fn read_sequential(&mut self, address: u16, target: &mut [u8]) -> DriverResult<()> {
		let mut reader = self.reader(address)?;
		for t in target.iter_mut() {
			*t = reader.read_byte()?;
		}
		reader.finish()?;
		debug!("two-wire sequential read @0x{:04x}: {} bytes", address, target.len());
		Ok(())
	}

	/// Acknowledge polling: address the device until it answers.
	///
	/// Returns how long the device was busy.
	pub fn wait_ready(&mut self, max_wait: Duration) -> DriverResult<Duration> {
		let device = self.device()?;
		let started = self.hardware.now();

		loop {
			self.enter(Phase::WaitBusy)?;
			let probe = Transaction::begin(self).and_then(|mut tx| {
				tx.send_address(device, false)?;
				tx.stop()
			});
			let waited = self.hardware.now() - started;
			match probe {
				Ok(()) => {
					debug!("two-wire device 0x{:02x} ready after {:?}", device, waited);
					return Ok(waited);
				},
				Err(ref e) if e.is_nack() => (),
				Err(e) => return Err(e),
			}

			if waited >= max_wait {
				warn!("two-wire device 0x{:02x} still busy after {:?}", device, waited);
				return Err(DriverError::TimedOut {
					phase: Phase::WaitBusy,
					waited,
				});
			}
			self.hardware.delay(POLL_INTERVAL.min(max_wait - waited));
		}
	}
}

/// Sequential reader; the last byte read gets NACKed when the reader is
/// finished or dropped.
pub struct Reader<'a, H: Hardware + 'a> {
	transaction: Transaction<'a, H>,
}

impl<'a, H: Hardware> Reader<'a, H> {
	pub fn read_byte(&mut self) -> DriverResult<u8> {
		self.transaction.receive_byte()
	}

	/// NACK and STOP, reporting bus errors (dropping does the same but
	/// only logs them).
	pub fn finish(self) -> DriverResult<()> {
		self.transaction.stop()
	}
}

// endless, see `TwoWire::reader`
impl<'a, H: Hardware> Iterator for Reader<'a, H> {
	type Item = DriverResult<u8>;

	fn next(&mut self) -> Option<Self::Item> {
		Some(self.read_byte())
	}
}

#[cfg(test)]
mod test {
	use super::{
		join_address,
		split_address,
	};

	#[test]
	fn address_bytes() {
		assert_eq!(split_address(0x1122), (0x11, 0x22));
		assert_eq!(split_address(0x00ff), (0x00, 0xff));
		assert_eq!(split_address(0xff00), (0xff, 0x00));
	}

	#[test]
	fn address_bytes_rejoin() {
		for address in 0..=0xffffu16 {
			let (high, low) = split_address(address);
			assert_eq!(high, (address >> 8) as u8);
			assert_eq!(low, (address & 0xff) as u8);
			assert_eq!(join_address(high, low), address);
		}
	}
}
