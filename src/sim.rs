//! Simulated I2C controller with an AT24Cxx EEPROM attached, for tests.
//!
//! Transactions complete instantly: SDOEMPTY is set for as long as a write
//! transaction expects more bytes, DATARDY while a read transaction has bytes
//! left. Page write rollover of the real chips isn't modelled.

use std::time::Duration;

use crate::hardware::Registers;
use crate::i2c::AddressWidth;

const RSTCTRL: usize = 0x34;
const RSTCTRL_I2C_RESET: u32 = 1 << 9;
const I2C_BASE: usize = 0x900;

const DEVADDR: usize = 2;
const DATAOUT: usize = 4;
const DATAIN: usize = 5;
const STATUS: usize = 6;
const STARTXFR: usize = 7;
const BYTECNT: usize = 8;
const REGISTER_COUNT: usize = 9;

const MEMORY_SIZE: usize = 0x1_0000;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Event {
	Reset,
	Delay(Duration),
	/// DEVADDR register written (7-bit address)
	DeviceAddress(u8),
	/// completed write transaction with `len` payload bytes
	Write { device: u8, address: u32, len: usize },
	/// read transaction started at the EEPROM's address pointer
	Read { device: u8, address: u32, len: usize },
}

enum Transfer {
	Idle,
	Write { bytes: Vec<u8>, remaining: usize },
	Read { remaining: usize },
}

pub struct SimController {
	rstctrl: u32,
	regs: [u32; REGISTER_COUNT],
	width: AddressWidth,
	memory: Vec<u8>,
	pointer: u32,
	transfer: Transfer,
	stuck: bool,
	events: Vec<Event>,
	last_write: Vec<u8>,
	last_byte_count: u32,
}

impl SimController {
	pub fn new(width: AddressWidth) -> Self {
		SimController {
			rstctrl: 0,
			regs: [0; REGISTER_COUNT],
			width,
			memory: vec![0xff; MEMORY_SIZE],
			pointer: 0,
			transfer: Transfer::Idle,
			stuck: false,
			events: Vec::new(),
			last_write: Vec::new(),
			last_byte_count: 0,
		}
	}

	/// controller never gets ready: BUSY forever, no SDOEMPTY / DATARDY
	pub fn set_stuck(&mut self, stuck: bool) {
		self.stuck = stuck;
	}

	pub fn events(&self) -> &[Event] {
		&self.events
	}

	pub fn take_events(&mut self) -> Vec<Event> {
		std::mem::replace(&mut self.events, Vec::new())
	}

	/// transactions only, without delays and register writes
	pub fn transactions(&self) -> Vec<Event> {
		self.events.iter().filter(|e| match e {
			Event::Write { .. } | Event::Read { .. } => true,
			_ => false,
		}).cloned().collect()
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn fill(&mut self, address: usize, data: &[u8]) {
		self.memory[address..address + data.len()].copy_from_slice(data);
	}

	pub fn registers(&self) -> (u32, [u32; REGISTER_COUNT]) {
		(self.rstctrl, self.regs)
	}

	/// all bytes (address + payload) of the last completed write transaction
	pub fn last_write_bytes(&self) -> &[u8] {
		&self.last_write
	}

	pub fn last_byte_count(&self) -> u32 {
		self.last_byte_count
	}

	fn device(&self) -> u8 {
		self.regs[DEVADDR] as u8
	}

	fn status(&self) -> u32 {
		if self.stuck {
			return 0x01;
		}
		match self.transfer {
			Transfer::Idle => 0x00,
			Transfer::Write { .. } => 0x01 | 0x02,
			Transfer::Read { .. } => 0x01 | 0x04,
		}
	}

	fn start(&mut self, command: u32) {
		self.last_byte_count = self.regs[BYTECNT];
		if self.stuck {
			return;
		}
		let count = self.regs[BYTECNT] as usize + 1;
		if 0 == command {
			let bytes = vec![self.regs[DATAOUT] as u8];
			self.transfer = Transfer::Write { bytes, remaining: count - 1 };
			self.maybe_finish_write();
		} else {
			self.events.push(Event::Read {
				device: self.device(),
				address: self.pointer,
				len: count,
			});
			self.transfer = Transfer::Read { remaining: count };
		}
	}

	fn send(&mut self, byte: u8) {
		if let Transfer::Write { ref mut bytes, ref mut remaining } = self.transfer {
			if *remaining > 0 {
				bytes.push(byte);
				*remaining -= 1;
			}
		}
		self.maybe_finish_write();
	}

	fn maybe_finish_write(&mut self) {
		let bytes = match self.transfer {
			Transfer::Write { ref bytes, remaining: 0 } => bytes.clone(),
			_ => return,
		};
		self.transfer = Transfer::Idle;

		let (address, payload) = match self.width {
			AddressWidth::One => {
				let page = (self.regs[DEVADDR] & 0x7) << 8;
				(page | bytes[0] as u32, &bytes[1..])
			},
			AddressWidth::Two => {
				((bytes[0] as u32) << 8 | bytes[1] as u32, &bytes[2..])
			},
		};
		for (i, b) in payload.iter().enumerate() {
			let a = (address as usize + i) % MEMORY_SIZE;
			self.memory[a] = *b;
		}
		self.pointer = address + payload.len() as u32;
		self.events.push(Event::Write {
			device: self.device(),
			address,
			len: payload.len(),
		});
		self.last_write = bytes;
	}

	fn receive(&mut self) -> u32 {
		let done = match self.transfer {
			Transfer::Read { ref mut remaining } => {
				*remaining -= 1;
				0 == *remaining
			},
			_ => return self.regs[DATAIN],
		};
		if done {
			self.transfer = Transfer::Idle;
		}
		let data = self.memory[self.pointer as usize % MEMORY_SIZE];
		self.pointer += 1;
		self.regs[DATAIN] = data as u32;
		data as u32
	}
}

impl Registers for SimController {
	fn read_dword(&mut self, offset: usize) -> u32 {
		if RSTCTRL == offset {
			return self.rstctrl;
		}
		let index = (offset - I2C_BASE) / 4;
		match index {
			STATUS => self.status(),
			DATAIN => self.receive(),
			_ => self.regs[index],
		}
	}

	fn write_dword(&mut self, offset: usize, data: u32) {
		if RSTCTRL == offset {
			self.rstctrl = data;
			if 0 != data & RSTCTRL_I2C_RESET {
				self.regs = [0; REGISTER_COUNT];
				self.transfer = Transfer::Idle;
				self.events.push(Event::Reset);
			}
			return;
		}
		let index = (offset - I2C_BASE) / 4;
		match index {
			STATUS | DATAIN => (), // read only
			STARTXFR => {
				self.regs[index] = data;
				self.start(data);
			},
			DATAOUT => {
				self.regs[index] = data;
				self.send(data as u8);
			},
			DEVADDR => {
				self.regs[index] = data;
				self.events.push(Event::DeviceAddress(data as u8));
			},
			_ => self.regs[index] = data,
		}
	}

	fn delay(&mut self, duration: Duration) {
		self.events.push(Event::Delay(duration));
	}
}
