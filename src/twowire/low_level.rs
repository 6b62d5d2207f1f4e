use crate::error::{
	DriverError,
	DriverResult,
};
use crate::time::Clock;

use super::{
	Hardware,
	Phase,
	TwoWire,
};

// clocks needed to get any device to its ACK slot
const RECOVERY_CLOCKS: usize = 9;

// Bit layer. All waits on the bus are bounded by `stretch_timeout`; data is
// only changed while SCL is low, START/STOP are SDA edges while SCL is high.
impl<H: Hardware> TwoWire<H> {
	pub(super) fn enter(&mut self, next: Phase) -> DriverResult<()> {
		if !self.phase.can_enter(next) {
			return Err(DriverError::InvalidTransition {
				from: self.phase,
				to: next,
			});
		}
		trace!("two-wire phase {} -> {}", self.phase, next);
		self.phase = next;
		Ok(())
	}

	fn half_cycle(&mut self) {
		let half_period = self.config.half_period;
		self.hardware.delay(half_period);
	}

	fn timed_out(&self, waited: std::time::Duration) -> DriverError {
		warn!("two-wire bus stuck in phase {} for {:?}", self.phase, waited);
		DriverError::TimedOut {
			phase: self.phase,
			waited,
		}
	}

	// release SCL and wait until a stretching device lets it go up
	fn release_clock(&mut self) -> DriverResult<()> {
		self.hardware.set_clock_line(true);
		let (timeout, poll) = (self.config.stretch_timeout, self.config.half_period);
		match self.hardware.wait_until(timeout, poll, |hw| hw.clock_line()) {
			Ok(()) => Ok(()),
			Err(waited) => Err(self.timed_out(waited)),
		}
	}

	// also used for repeated START: SCL is low after the previous ACK clock
	pub(super) fn start_condition(&mut self) -> DriverResult<()> {
		self.hardware.set_data_line(true);
		self.half_cycle();
		self.release_clock()?;

		// someone else still holding SDA
		let (timeout, poll) = (self.config.stretch_timeout, self.config.half_period);
		if let Err(waited) = self.hardware.wait_until(timeout, poll, |hw| hw.data_line()) {
			return Err(self.timed_out(waited));
		}
		self.half_cycle();

		self.hardware.set_data_line(false);
		self.half_cycle();
		self.hardware.set_clock_line(false);
		self.half_cycle();
		Ok(())
	}

	// A device still shifting out data keeps SDA low and swallows the STOP;
	// clock it until it lets go (at the latest in the ACK slot).
	pub(super) fn stop_condition(&mut self) -> DriverResult<()> {
		let started = self.hardware.now();
		for clocks in 0..=RECOVERY_CLOCKS {
			self.hardware.set_data_line(false);
			self.half_cycle();
			self.release_clock()?;
			self.half_cycle();
			self.hardware.set_data_line(true);
			self.half_cycle();
			if self.hardware.data_line() {
				if clocks > 0 {
					debug!("two-wire: SDA released after {} extra clocks", clocks);
				}
				return Ok(());
			}
			self.hardware.set_clock_line(false);
			self.half_cycle();
		}
		self.hardware.set_clock_line(true);
		let waited = self.hardware.now() - started;
		Err(self.timed_out(waited))
	}

	fn write_bit(&mut self, bit: bool) -> DriverResult<()> {
		self.hardware.set_data_line(bit);
		self.half_cycle();
		self.release_clock()?;
		self.half_cycle();
		self.hardware.set_clock_line(false);
		Ok(())
	}

	// sample SDA while SCL is high
	fn read_bit(&mut self) -> DriverResult<bool> {
		self.hardware.set_data_line(true);
		self.half_cycle();
		self.release_clock()?;
		self.half_cycle();
		let bit = self.hardware.data_line();
		self.hardware.set_clock_line(false);
		Ok(bit)
	}

	/// Send a byte MSB first in `phase`, then check the ACK slot.
	pub(super) fn write_byte(&mut self, phase: Phase, byte: u8) -> DriverResult<()> {
		self.enter(phase)?;
		trace!("two-wire {}: 0x{:02x}", phase, byte);
		for bit in (0..8).rev() {
			self.write_bit(0 != byte & (1u8 << bit))?;
		}

		self.enter(Phase::WaitAck)?;
		if self.read_bit()? {
			// SDA stayed high: nobody acknowledged
			debug!("two-wire: no ACK for 0x{:02x} in phase {}", byte, phase);
			return Err(DriverError::NotAcknowledged { phase });
		}
		Ok(())
	}

	pub(super) fn read_byte(&mut self) -> DriverResult<u8> {
		self.enter(Phase::ReceiveData)?;
		let result = self.clock_in_byte()?;
		trace!("two-wire {}: 0x{:02x}", self.phase, result);
		Ok(result)
	}

	fn clock_in_byte(&mut self) -> DriverResult<u8> {
		let mut result = 0u8;
		for bit in (0..8).rev() {
			if self.read_bit()? {
				result |= 1u8 << bit;
			}
		}
		Ok(result)
	}

	// ACK: pull SDA low in the ninth clock; NACK: leave it released
	pub(super) fn send_ack(&mut self, ack: bool) -> DriverResult<()> {
		self.write_bit(!ack)
	}
}

/// A transfer in flight; borrows the bus exclusively.
///
/// Dropping a transaction aborts it: a device sending data gets a NACK,
/// STOP is issued and the bus goes back to `Phase::Idle`.
pub struct Transaction<'a, H: Hardware + 'a> {
	bus: &'a mut TwoWire<H>,
	// device ACKed a read address and is sending
	receiving: bool,
	// last received byte not acknowledged yet
	pending_ack: bool,
}

impl<'a, H: Hardware> Transaction<'a, H> {
	// START from idle (or from acknowledge polling)
	pub(super) fn begin(bus: &'a mut TwoWire<H>) -> DriverResult<Self> {
		bus.enter(Phase::Start)?;
		let mut tx = Transaction {
			bus,
			receiving: false,
			pending_ack: false,
		};
		tx.bus.start_condition()?;
		Ok(tx)
	}

	pub(super) fn send_address(&mut self, device: u8, read: bool) -> DriverResult<()> {
		let control = (device << 1) | (read as u8);
		self.bus.write_byte(Phase::SendAddress, control)?;
		self.receiving = read;
		Ok(())
	}

	pub(super) fn send_data(&mut self, byte: u8) -> DriverResult<()> {
		self.bus.write_byte(Phase::SendData, byte)
	}

	pub(super) fn restart(&mut self) -> DriverResult<()> {
		self.bus.enter(Phase::Start)?;
		self.bus.start_condition()
	}

	// the ACK for the previous byte is only sent once we know another
	// byte is wanted
	pub(super) fn receive_byte(&mut self) -> DriverResult<u8> {
		if self.pending_ack {
			self.pending_ack = false;
			self.bus.send_ack(true)?;
		}
		let byte = self.bus.read_byte()?;
		self.pending_ack = true;
		Ok(byte)
	}

	pub(super) fn stop(mut self) -> DriverResult<()> {
		self.finish()
	}

	fn finish(&mut self) -> DriverResult<()> {
		if self.bus.phase.is_idle() {
			return Ok(());
		}

		let mut result = Ok(());
		if self.receiving {
			self.receiving = false;
			if !self.pending_ack {
				// the device already drives the first bit of its next byte;
				// take the byte so the NACK lands in its ACK slot
				result = self.bus.clock_in_byte().map(|byte| {
					trace!("two-wire: discarding 0x{:02x}", byte);
				});
			}
			self.pending_ack = false;
			if result.is_ok() {
				result = self.bus.send_ack(false);
			}
		}

		// entering STOP is always valid from an active phase
		self.bus.phase = Phase::Stop;
		let stopped = self.bus.stop_condition();
		self.bus.phase = Phase::Idle;
		trace!("two-wire phase stop -> idle");

		result.and(stopped)
	}
}

impl<'a, H: Hardware> Drop for Transaction<'a, H> {
	fn drop(&mut self) {
		if let Err(e) = self.finish() {
			warn!("two-wire: failed to release bus after aborted transfer: {}", e);
		}
	}
}
