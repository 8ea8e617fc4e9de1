use std::fmt;

// offsets relative to the system control block
pub const RSTCTRL: usize = 0x0034;
pub const RSTCTRL_I2C_RESET: u32 = 1 << 9;

pub const I2C_BASE: usize = 0x0900;

// offsets relative to I2C_BASE
pub const CONFIG: usize = 0x00;
pub const CLKDIV: usize = 0x04;
pub const DEVADDR: usize = 0x08;
pub const ADDR: usize = 0x0C;
pub const DATAOUT: usize = 0x10;
pub const DATAIN: usize = 0x14;
pub const STATUS: usize = 0x18;
pub const STARTXFR: usize = 0x1C;
pub const BYTECNT: usize = 0x20;

// STARTXFR commands
pub const WRITE_CMD: u32 = 0x00;
pub const READ_CMD: u32 = 0x01;

// status flags (read only)
const STATUS_BUSY:     u32 = 0x01;
const STATUS_SDOEMPTY: u32 = 0x02; // transmit buffer empty
const STATUS_DATARDY:  u32 = 0x04; // receive data ready

// config flags
const CFG_ADDRLEN_MASK:   u32 = 0x7 << 5;
const CFG_ADDRLEN_8:      u32 = 7 << 5;
const CFG_DEVADLEN_MASK:  u32 = 0x7 << 2;
const CFG_DEVADLEN_7:     u32 = 6 << 2;
const CFG_ADDRDIS:        u32 = 1 << 1; // no address transmission
const CFG_DEVADDIS:       u32 = 1 << 0; // no device address transmission

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Status(pub u32);

impl Status {
	pub fn is_busy(&self) -> bool {
		0 != self.0 & STATUS_BUSY
	}
	pub fn is_sdo_empty(&self) -> bool {
		0 != self.0 & STATUS_SDOEMPTY
	}
	pub fn is_data_ready(&self) -> bool {
		0 != self.0 & STATUS_DATARDY
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:08x}", self.0)
	}
}

impl fmt::Debug for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:08x} (", self.0)?;
		if self.is_busy() { write!(f, " [BUSY]")?; }
		if self.is_sdo_empty() { write!(f, " [SDOEMPTY]")?; }
		if self.is_data_ready() { write!(f, " [DATARDY]")?; }
		write!(f, " )")
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Config(pub u32);

impl Config {
	/// 8-bit address length, 7-bit device address, address phase disabled
	/// (the EEPROM address bytes are sent as data instead)
	pub fn default_eeprom() -> Self {
		*Config(0)
			.set_address_len_8()
			.set_device_address_len_7()
			.set_address_disabled()
	}

	pub fn address_len(&self) -> u32 {
		(self.0 & CFG_ADDRLEN_MASK) >> 5
	}
	pub fn set_address_len_8(&mut self) -> &mut Self {
		self.0 = (self.0 & !CFG_ADDRLEN_MASK) | CFG_ADDRLEN_8;
		self
	}

	pub fn device_address_len(&self) -> u32 {
		(self.0 & CFG_DEVADLEN_MASK) >> 2
	}
	pub fn set_device_address_len_7(&mut self) -> &mut Self {
		self.0 = (self.0 & !CFG_DEVADLEN_MASK) | CFG_DEVADLEN_7;
		self
	}

	pub fn is_address_disabled(&self) -> bool {
		0 != self.0 & CFG_ADDRDIS
	}
	pub fn set_address_disabled(&mut self) -> &mut Self {
		self.0 = self.0 | CFG_ADDRDIS;
		self
	}

	pub fn is_device_address_disabled(&self) -> bool {
		0 != self.0 & CFG_DEVADDIS
	}
}

impl fmt::Display for Config {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:08x}", self.0)
	}
}

impl fmt::Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f,
			"0x{:08x} (address length: {}, device address length: {}",
			self.0,
			self.address_len(),
			self.device_address_len(),
		)?;
		if self.is_address_disabled() { write!(f, " [ADDRDIS]")?; }
		if self.is_device_address_disabled() { write!(f, " [DEVADDIS]")?; }
		write!(f, ")")
	}
}
