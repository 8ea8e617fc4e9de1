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

/// 32-bit register file of the SoC "system control" block; all offsets are
/// byte offsets relative to the block base.
pub trait Registers {
	fn read_dword(&mut self, offset: usize) -> u32;
	fn write_dword(&mut self, offset: usize, data: u32);

	// wait (at least) `duration`; hardware timing requirements depend on it
	fn delay(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}

impl<'a, R: ?Sized + Registers> Registers for &'a mut R {
	fn read_dword(&mut self, offset: usize) -> u32 {
		R::read_dword(*self, offset)
	}
	fn write_dword(&mut self, offset: usize, data: u32) {
		R::write_dword(*self, offset, data);
	}
	fn delay(&mut self, duration: Duration) {
		R::delay(*self, duration);
	}
}
