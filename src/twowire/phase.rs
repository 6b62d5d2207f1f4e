use std::fmt;

/// Phase of a two-wire transfer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Phase {
	Idle,
	/// acknowledge polling a busy device
	WaitBusy,
	/// START or repeated START condition
	Start,
	SendAddress,
	SendData,
	/// ninth clock after a sent byte
	WaitAck,
	ReceiveData,
	Stop,
}

impl Phase {
	pub const ALL: [Phase; 8] = [
		Phase::Idle,
		Phase::WaitBusy,
		Phase::Start,
		Phase::SendAddress,
		Phase::SendData,
		Phase::WaitAck,
		Phase::ReceiveData,
		Phase::Stop,
	];

	/// Transition table.
	///
	/// STOP can be entered from any active phase: that's how transfers are
	/// aborted.
	pub fn can_enter(self, next: Phase) -> bool {
		use self::Phase::*;

		match (self, next) {
			(Idle, Start) | (Idle, WaitBusy) => true,
			(WaitBusy, Start) => true,
			(Start, SendAddress) => true,
			(SendAddress, WaitAck) | (SendData, WaitAck) => true,
			(WaitAck, SendData) | (WaitAck, Start) | (WaitAck, ReceiveData) => true,
			(ReceiveData, ReceiveData) => true,
			(Stop, Idle) => true,
			(Idle, Stop) | (Stop, Stop) => false,
			(_, Stop) => true,
			_ => false,
		}
	}

	pub fn is_idle(self) -> bool {
		self == Phase::Idle
	}
}

impl Default for Phase {
	fn default() -> Self {
		Phase::Idle
	}
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let name = match self {
			Phase::Idle => "idle",
			Phase::WaitBusy => "wait-busy",
			Phase::Start => "start",
			Phase::SendAddress => "send-address",
			Phase::SendData => "send-data",
			Phase::WaitAck => "wait-ack",
			Phase::ReceiveData => "receive-data",
			Phase::Stop => "stop",
		};
		f.write_str(name)
	}
}
