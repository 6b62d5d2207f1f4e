use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Time source the drivers use for settle times and bounded waits.
///
/// `now` is the time elapsed since some fixed (but arbitrary) point;
/// `delay` must block for *at least* the given duration.
pub trait Clock {
	fn now(&self) -> Duration;
	fn delay(&mut self, duration: Duration);

	/// Poll `ready` every `interval` until it returns true or `max_wait`
	/// passed; on timeout returns the time spent waiting.
	///
	/// `ready` is always checked at least once, and once more after the
	/// deadline passed.
	fn wait_until<F>(&mut self, max_wait: Duration, interval: Duration, mut ready: F) -> Result<(), Duration>
	where
		Self: Sized,
		F: FnMut(&mut Self) -> bool,
	{
		let started = self.now();
		loop {
			if ready(self) {
				return Ok(());
			}
			let waited = self.now() - started;
			if waited >= max_wait {
				return Err(waited);
			}
			// zero intervals would never advance a simulated clock
			let step = interval.max(Duration::from_nanos(1));
			self.delay(step.min(max_wait - waited));
		}
	}
}

impl<'a, C: ?Sized + Clock> Clock for &'a mut C {
	fn now(&self) -> Duration {
		C::now(*self)
	}

	fn delay(&mut self, duration: Duration) {
		C::delay(*self, duration)
	}
}

/// Wall clock; `delay` sleeps until the full duration elapsed.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
	started: Instant,
}

impl SystemClock {
	pub fn new() -> Self {
		SystemClock {
			started: Instant::now(),
		}
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for SystemClock {
	fn now(&self) -> Duration {
		self.started.elapsed()
	}

	fn delay(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}
