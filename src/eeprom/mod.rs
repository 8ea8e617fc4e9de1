/// Paged access to AT24Cxx serial EEPROMs behind the SoC I2C controller.
///
/// Reads: "random read" per block, i.e. a write transaction with only the
/// address bytes (sets the EEPROM address pointer), followed by a read
/// transaction.
///
/// Writes: one page write per block, then the EEPROM needs up to 5ms for its
/// internal write cycle. It doesn't answer on the bus meanwhile, and the
/// controller can't tell us about that, so just wait.
///
/// EEPROMs with a single address byte take address bits 8-10 as "page" bits in
/// the device address.

use std::time::Duration;

mod blocks;

pub use self::blocks::{
	Blocks,
	Chunk,
	blocks,
	bytewise,
};

use crate::hardware::Registers;
use crate::i2c::{
	AddressWidth,
	BusConfig,
	Completion,
	Controller,
	EEPROM_BUS_ADDRESS,
};

/// sequential read size; BYTECNT has only 6 bits, so it can't be more than 64
pub const READ_BLOCK: usize = 16;

/// AT24C01A/02 have 8-byte pages
pub const WRITE_BLOCK: usize = 8;

/// internal write cycle of the EEPROM after each (page) write
pub const WRITE_CYCLE: Duration = Duration::from_millis(5);

/// size of the largest supported EEPROM (AT24C512, 64 KiB)
pub const MAX_SIZE: usize = 0x1_0000;

/// 8-bit bus address including the page bits for `address` (one address
/// byte EEPROMs only); page bits beyond 3 bits are dropped.
pub fn page_bus_address(address: u32) -> u8 {
	let page = (((address >> 8) & 0x7) << 1) as u8;
	EEPROM_BUS_ADDRESS | page
}

pub struct Eeprom<R: Registers> {
	ctrl: Controller<R>,
}

impl<R: Registers> Eeprom<R> {
	pub fn new(ctrl: Controller<R>) -> Self {
		Eeprom {
			ctrl,
		}
	}

	pub fn open(regs: R, config: BusConfig) -> Self {
		Eeprom::new(Controller::new(regs, config))
	}

	pub fn controller(&mut self) -> &mut Controller<R> {
		&mut self.ctrl
	}

	pub fn into_inner(self) -> Controller<R> {
		self.ctrl
	}

	pub fn init(&mut self) {
		self.ctrl.init();
	}

	// device address stays at its init value for two address bytes
	fn select_page(&mut self, address: u32) {
		if AddressWidth::One == self.ctrl.address_width() {
			let bus_address = page_bus_address(address);
			trace!("EEPROM page select @0x{:04x}: device 0x{:02x}", address, bus_address >> 1);
			self.ctrl.select_device(bus_address);
		}
	}

	fn random_read(&mut self, address: u32, data: &mut [u8]) -> crate::AResult<Completion> {
		self.select_page(address);

		// dummy write
		let mut completion = self.ctrl.write(address, &[])?;
		completion.absorb(self.ctrl.read(data)?);
		Ok(completion)
	}

	fn random_write(&mut self, address: u32, data: &[u8]) -> crate::AResult<Completion> {
		self.select_page(address);

		let completion = self.ctrl.write(address, data)?;
		self.ctrl.delay(WRITE_CYCLE);
		Ok(completion)
	}

	fn read_chunks(&mut self, chunks: Blocks, data: &mut [u8]) -> crate::AResult<Completion> {
		let mut completion = Completion::default();
		for chunk in chunks {
			let target = &mut data[chunk.offset..chunk.offset + chunk.len];
			completion.absorb(self.random_read(chunk.address, target)?);
		}
		Ok(completion)
	}

	/// Read `data.len()` bytes starting at `address`: full `READ_BLOCK`s first,
	/// the remainder byte by byte.
	pub fn read(&mut self, address: u32, data: &mut [u8]) -> crate::AResult<Completion> {
		debug!("EEPROM read @0x{:04x}: {} bytes", address, data.len());
		let chunks = blocks(address, data.len(), READ_BLOCK);
		self.read_chunks(chunks, data)
	}

	/// Read every byte in a separate random read
	pub fn read_bytewise(&mut self, address: u32, data: &mut [u8]) -> crate::AResult<Completion> {
		debug!("EEPROM read @0x{:04x}: {} bytes (bytewise)", address, data.len());
		let chunks = bytewise(address, data.len());
		self.read_chunks(chunks, data)
	}

	/// Write `data` starting at `address`: full `WRITE_BLOCK`s first, the
	/// remainder byte by byte; waits for the write cycle after each.
	pub fn write(&mut self, address: u32, data: &[u8]) -> crate::AResult<Completion> {
		debug!("EEPROM write @0x{:04x}: {} bytes", address, data.len());
		let mut completion = Completion::default();
		for chunk in blocks(address, data.len(), WRITE_BLOCK) {
			let source = &data[chunk.offset..chunk.offset + chunk.len];
			completion.absorb(self.random_write(chunk.address, source)?);
		}
		Ok(completion)
	}

	/// Reset the controller and read the configuration area (starts at 0)
	pub fn read_config(&mut self, data: &mut [u8]) -> crate::AResult<Completion> {
		self.init();
		self.read(0, data)
	}
}
