/// Master driver for the I2C controller of Ralink RT2880-family SoCs.
///
/// The controller runs one transaction at a time: BYTECNT holds the number of
/// bytes minus one, the first byte to send is put into DATAOUT before STARTXFR
/// is written. Everything after that is paced by polling STATUS: SDOEMPTY when
/// the next byte can be written to DATAOUT, DATARDY when DATAIN holds the next
/// received byte, and BUSY until the transaction is finished on the bus.
///
/// The controller gives no feedback about NAKs; the only failure visible on
/// this level is a status bit not showing up within the polling budget.

use std::fmt;
use std::time::Duration;

mod regs;

pub use self::regs::{
	Config,
	Status,
};

use self::regs::*;
use crate::hardware::Registers;

/// Settle time after pulsing the I2C reset line
pub const RESET_SETTLE: Duration = Duration::from_micros(500);

/// SCLK = PB_CLK / (2 * CLKDIV); max SCLK for the EEPROM is 400 kHz (at 2.7V),
/// assuming a 150 MHz bus clock.
#[cfg(not(feature = "fpga"))]
pub const DEFAULT_CLOCK_DIVIDER: u32 = 375;
#[cfg(feature = "fpga")]
pub const DEFAULT_CLOCK_DIVIDER: u32 = 60;

/// 8-bit bus address of an AT24Cxx with all address pins tied low (R/W bit
/// clear); DEVADDR takes the 7-bit right-justified form.
pub const EEPROM_BUS_ADDRESS: u8 = 0xA0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressWidth {
	/// AT24C01A/02/04/08A/16A: the address bits above 8 go into the device
	/// address ("page")
	One,
	/// AT24C512 and friends
	Two,
}

impl AddressWidth {
	pub fn bytes(&self) -> usize {
		match self {
			AddressWidth::One => 1,
			AddressWidth::Two => 2,
		}
	}
}

impl Default for AddressWidth {
	#[cfg(not(feature = "two-byte-address"))]
	fn default() -> Self {
		AddressWidth::One
	}

	#[cfg(feature = "two-byte-address")]
	fn default() -> Self {
		AddressWidth::Two
	}
}

/// What to do when a status bit doesn't show up within the polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeoutPolicy {
	/// carry on as if the controller was ready
	Ignore,
	/// carry on, but log a warning
	Warn,
	/// abort the transaction with an error
	Fail,
}

impl Default for TimeoutPolicy {
	fn default() -> Self {
		TimeoutPolicy::Ignore
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusConfig {
	pub clock_divider: u32,
	pub address_width: AddressWidth,
	pub timeout_policy: TimeoutPolicy,
}

impl Default for BusConfig {
	fn default() -> Self {
		BusConfig {
			clock_divider: DEFAULT_CLOCK_DIVIDER,
			address_width: AddressWidth::default(),
			timeout_policy: TimeoutPolicy::default(),
		}
	}
}

impl BusConfig {
	/// status polls per byte (SDOEMPTY / DATARDY)
	pub fn byte_poll_limit(&self) -> u32 {
		self.clock_divider.saturating_mul(25)
	}

	/// status polls waiting for BUSY to clear after the last byte
	pub fn busy_poll_limit(&self) -> u32 {
		self.clock_divider.saturating_mul(30)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Poll {
	Ready,
	TimedOut,
}

/// Outcome of a transaction that wasn't aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Completion {
	/// byte slots the controller never got ready for; these bytes were
	/// skipped (write) or left untouched (read)
	pub stalled_bytes: usize,
	/// BUSY was still set when giving up
	pub busy_timeout: bool,
}

impl Completion {
	pub fn is_clean(&self) -> bool {
		0 == self.stalled_bytes && !self.busy_timeout
	}

	/// accumulate the outcome of a following transaction
	pub fn absorb(&mut self, other: Completion) {
		self.stalled_bytes += other.stalled_bytes;
		self.busy_timeout |= other.busy_timeout;
	}
}

/// Register values as seen by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Snapshot {
	pub config: Config,
	pub clock_divider: u32,
	pub device_address: u32,
	pub address: u32,
	pub status: Status,
	pub byte_count: u32,
}

impl fmt::Display for Snapshot {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "CONFIG  : {:?}", self.config)?;
		writeln!(f, "CLKDIV  : {}", self.clock_divider)?;
		writeln!(f, "DEVADDR : 0x{:02x}", self.device_address)?;
		writeln!(f, "ADDR    : 0x{:02x}", self.address)?;
		writeln!(f, "STATUS  : {:?}", self.status)?;
		write!(f, "BYTECNT : {}", self.byte_count)
	}
}

/// Owns the register block; there is exactly one master on the bus, so there
/// must only be one `Controller` per register block.
pub struct Controller<R: Registers> {
	regs: R,
	config: BusConfig,
}

impl<R: Registers> Controller<R> {
	pub fn new(regs: R, config: BusConfig) -> Self {
		Controller {
			regs,
			config,
		}
	}

	pub fn config(&self) -> &BusConfig {
		&self.config
	}

	pub fn address_width(&self) -> AddressWidth {
		self.config.address_width
	}

	pub fn into_inner(self) -> R {
		self.regs
	}

	fn reg_read(&mut self, offset: usize) -> u32 {
		self.regs.read_dword(I2C_BASE + offset)
	}

	fn reg_write(&mut self, offset: usize, data: u32) {
		self.regs.write_dword(I2C_BASE + offset, data);
	}

	pub fn delay(&mut self, duration: Duration) {
		self.regs.delay(duration);
	}

	pub fn status(&mut self) -> Status {
		Status(self.reg_read(STATUS))
	}

	pub fn snapshot(&mut self) -> Snapshot {
		Snapshot {
			config: Config(self.reg_read(CONFIG)),
			clock_divider: self.reg_read(CLKDIV),
			device_address: self.reg_read(DEVADDR),
			address: self.reg_read(ADDR),
			status: self.status(),
			byte_count: self.reg_read(BYTECNT),
		}
	}

	/// Select the target device by its 8-bit bus address (R/W bit ignored)
	pub fn select_device(&mut self, bus_address: u8) {
		self.reg_write(DEVADDR, (bus_address >> 1) as u32);
	}

	/// Reset the controller and load the EEPROM defaults
	pub fn init(&mut self) {
		self.regs.write_dword(RSTCTRL, RSTCTRL_I2C_RESET);
		self.regs.write_dword(RSTCTRL, 0);
		self.delay(RESET_SETTLE);

		self.reg_write(CONFIG, Config::default_eeprom().0);
		let clock_divider = self.config.clock_divider;
		self.reg_write(CLKDIV, clock_divider);

		/*
		 * AT24C512: 1|0|1|0|0|A1|A2|R/W
		 * AT24C01A/02: 1|0|1|0|A2|A1|A0|R/W
		 *          4K:          A2 A1 P0
		 *          8K:          A2 P1 P0
		 *         16K:          P2 P1 P0
		 */
		self.select_device(EEPROM_BUS_ADDRESS);

		// the address phase is disabled (it only supports a single byte);
		// EEPROM addresses are sent as data bytes
		self.reg_write(ADDR, 0);

		debug!("I2C initialized: clock divider {}, {:?} address", clock_divider, self.config.address_width);
	}

	/// Poll status until `ready` returns true, at most `limit` times
	pub fn poll<F>(&mut self, limit: u32, ready: F) -> Poll
	where
		F: Fn(Status) -> bool,
	{
		for _ in 0..limit.max(1) {
			if ready(self.status()) {
				return Poll::Ready;
			}
		}
		Poll::TimedOut
	}

	fn timed_out(&self, what: fmt::Arguments) -> crate::AResult<()> {
		match self.config.timeout_policy {
			TimeoutPolicy::Ignore => {
				debug!("I2C timeout {}", what);
				Ok(())
			},
			TimeoutPolicy::Warn => {
				warn!("I2C timeout {}", what);
				Ok(())
			},
			TimeoutPolicy::Fail => bail!("I2C timeout {}", what),
		}
	}

	fn wait_idle(&mut self, completion: &mut Completion) -> crate::AResult<()> {
		let limit = self.config.busy_poll_limit();
		if Poll::TimedOut == self.poll(limit, |s| !s.is_busy()) {
			completion.busy_timeout = true;
			self.timed_out(format_args!("waiting for transaction to finish"))?;
		}
		Ok(())
	}

	/// Send the EEPROM address followed by `data`; `data` may be empty to only
	/// set the EEPROM's address pointer ("dummy write").
	pub fn write(&mut self, address: u32, data: &[u8]) -> crate::AResult<Completion> {
		let width = self.config.address_width;
		let n = data.len() + width.bytes();
		let mut completion = Completion::default();

		debug!("I2C write @0x{:04x}: {} bytes", address, data.len());

		self.reg_write(BYTECNT, (n - 1) as u32);
		let first = match width {
			AddressWidth::One => address & 0xff,
			AddressWidth::Two => (address >> 8) & 0xff,
		};
		self.reg_write(DATAOUT, first);
		self.reg_write(STARTXFR, WRITE_CMD);

		let limit = self.config.byte_poll_limit();
		for i in 0..n - 1 {
			let byte = match width {
				AddressWidth::Two if 0 == i => address as u8,
				AddressWidth::Two => data[i - 1],
				AddressWidth::One => data[i],
			};
			match self.poll(limit, |s| s.is_sdo_empty()) {
				Poll::Ready => self.reg_write(DATAOUT, byte as u32),
				Poll::TimedOut => {
					completion.stalled_bytes += 1;
					self.timed_out(format_args!("sending byte {} of {}", i + 2, n))?;
				},
			}
		}

		self.wait_idle(&mut completion)?;
		Ok(completion)
	}

	/// Receive `data.len()` bytes; needs a preceding (dummy) write to set the
	/// EEPROM address pointer.
	pub fn read(&mut self, data: &mut [u8]) -> crate::AResult<Completion> {
		let mut completion = Completion::default();
		if data.is_empty() {
			return Ok(completion);
		}

		debug!("I2C read: {} bytes", data.len());

		self.reg_write(BYTECNT, (data.len() - 1) as u32);
		self.reg_write(STARTXFR, READ_CMD);

		let limit = self.config.byte_poll_limit();
		let total = data.len();
		for (i, byte) in data.iter_mut().enumerate() {
			match self.poll(limit, |s| s.is_data_ready()) {
				Poll::Ready => *byte = self.reg_read(DATAIN) as u8,
				Poll::TimedOut => {
					completion.stalled_bytes += 1;
					self.timed_out(format_args!("receiving byte {} of {}", i + 1, total))?;
				},
			}
		}

		self.wait_idle(&mut completion)?;
		Ok(completion)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::sim::{
		Event,
		SimController,
	};

	fn controller(address_width: AddressWidth) -> Controller<SimController> {
		let config = BusConfig {
			address_width,
			..BusConfig::default()
		};
		let mut ctrl = Controller::new(SimController::new(address_width), config);
		ctrl.init();
		ctrl
	}

	#[test]
	fn init_programs_defaults() {
		let mut ctrl = controller(AddressWidth::One);
		let snapshot = ctrl.snapshot();
		assert_eq!(snapshot.config, Config::default_eeprom());
		assert_eq!(snapshot.clock_divider, DEFAULT_CLOCK_DIVIDER);
		assert_eq!(snapshot.device_address, 0x50);
		assert_eq!(snapshot.address, 0);
		let regs = ctrl.into_inner();
		assert_eq!(regs.events(), &[
			Event::Reset,
			Event::Delay(RESET_SETTLE),
			Event::DeviceAddress(0x50),
		][..]);
	}

	#[test]
	fn init_is_idempotent() {
		let mut ctrl = controller(AddressWidth::One);
		ctrl.write(0x12, &[1, 2, 3]).unwrap();
		ctrl.init();
		let once = ctrl.into_inner().registers();

		let mut ctrl = controller(AddressWidth::One);
		ctrl.init();
		let twice = ctrl.into_inner().registers();

		assert_eq!(once, twice);
	}

	#[test]
	fn one_byte_address_wire_format() {
		let mut ctrl = controller(AddressWidth::One);
		let completion = ctrl.write(0x1234, &[0xaa, 0xbb]).unwrap();
		assert!(completion.is_clean());
		let regs = ctrl.into_inner();
		assert_eq!(regs.last_write_bytes(), &[0x34, 0xaa, 0xbb][..]);
		assert_eq!(regs.last_byte_count(), 2);
	}

	#[test]
	fn two_byte_address_sends_high_byte_first() {
		let mut ctrl = controller(AddressWidth::Two);
		ctrl.write(0x1234, &[0xaa]).unwrap();
		let regs = ctrl.into_inner();
		assert_eq!(regs.last_write_bytes(), &[0x12, 0x34, 0xaa][..]);
		assert_eq!(regs.last_byte_count(), 2);
	}

	#[test]
	fn dummy_write_then_read() {
		let mut ctrl = controller(AddressWidth::One);
		ctrl.write(0x20, &[9, 8, 7]).unwrap();
		ctrl.write(0x20, &[]).unwrap();
		let mut buf = [0u8; 3];
		let completion = ctrl.read(&mut buf).unwrap();
		assert!(completion.is_clean());
		assert_eq!(buf, [9, 8, 7]);
	}

	#[test]
	fn stalled_transmitter_is_ignored_by_default() {
		let mut sim = SimController::new(AddressWidth::One);
		sim.set_stuck(true);
		let mut ctrl = Controller::new(sim, BusConfig { clock_divider: 2, ..BusConfig::default() });
		ctrl.init();
		let completion = ctrl.write(0x00, &[1, 2]).unwrap();
		assert_eq!(completion.stalled_bytes, 2);
		assert!(completion.busy_timeout);
		assert!(!completion.is_clean());
	}

	#[test]
	fn stalled_transmitter_fails_when_strict() {
		let mut sim = SimController::new(AddressWidth::One);
		sim.set_stuck(true);
		let config = BusConfig {
			clock_divider: 2,
			timeout_policy: TimeoutPolicy::Fail,
			..BusConfig::default()
		};
		let mut ctrl = Controller::new(sim, config);
		ctrl.init();
		assert!(ctrl.write(0x00, &[1]).is_err());
		let mut buf = [0u8; 1];
		assert!(ctrl.read(&mut buf).is_err());
	}

	#[test]
	fn stalled_transmitter_completes_with_warning() {
		let mut sim = SimController::new(AddressWidth::One);
		sim.set_stuck(true);
		let config = BusConfig {
			clock_divider: 2,
			timeout_policy: TimeoutPolicy::Warn,
			..BusConfig::default()
		};
		let mut ctrl = Controller::new(sim, config);
		ctrl.init();
		let completion = ctrl.write(0x00, &[1, 2]).unwrap();
		assert_eq!(completion.stalled_bytes, 2);
		assert!(completion.busy_timeout);

		let mut buf = [0u8; 3];
		let completion = ctrl.read(&mut buf).unwrap();
		assert_eq!(completion.stalled_bytes, 3);
		assert!(completion.busy_timeout);
	}

	#[test]
	fn read_timeout_leaves_buffer_untouched() {
		let mut sim = SimController::new(AddressWidth::One);
		sim.set_stuck(true);
		let mut ctrl = Controller::new(sim, BusConfig { clock_divider: 2, ..BusConfig::default() });
		ctrl.init();
		let mut buf = [0x5a; 2];
		let completion = ctrl.read(&mut buf).unwrap();
		assert_eq!(completion.stalled_bytes, 2);
		assert_eq!(buf, [0x5a, 0x5a]);
	}

	#[test]
	fn poll_limits() {
		let config = BusConfig { clock_divider: 375, ..BusConfig::default() };
		assert_eq!(config.byte_poll_limit(), 9375);
		assert_eq!(config.busy_poll_limit(), 11250);
	}

	#[test]
	fn poll_limits_saturate() {
		let config = BusConfig { clock_divider: u32::MAX, ..BusConfig::default() };
		assert_eq!(config.byte_poll_limit(), u32::MAX);
		assert_eq!(config.busy_poll_limit(), u32::MAX);

		let config = BusConfig { clock_divider: 200_000_000, ..BusConfig::default() };
		assert_eq!(config.byte_poll_limit(), u32::MAX);
	}
}
