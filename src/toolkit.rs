/// Operations behind the command line tool: every command resets the
/// controller first.

use std::fmt;
use std::io;
use std::str;

use crate::eeprom::{
	Eeprom,
	MAX_SIZE,
};
use crate::hardware::Registers;
use crate::i2c::Snapshot;

/// Parse a hex number with optional "0x" prefix
pub fn parse_hex(s: &str) -> crate::AResult<u32> {
	let digits = if s.starts_with("0x") || s.starts_with("0X") {
		&s[2..]
	} else {
		s
	};
	with_context!(("invalid hex number: {:?}", s),
		Ok(u32::from_str_radix(digits, 16)?)
	)
}

/// Size of a value written by `write_value`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ValueSize {
	Byte,
	Word,
	Dword,
}

impl ValueSize {
	pub fn bytes(&self) -> usize {
		match self {
			ValueSize::Byte => 1,
			ValueSize::Word => 2,
			ValueSize::Dword => 4,
		}
	}
}

impl fmt::Display for ValueSize {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.bytes())
	}
}

impl str::FromStr for ValueSize {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match parse_hex(s)? {
			1 => Ok(ValueSize::Byte),
			2 => Ok(ValueSize::Word),
			4 => Ok(ValueSize::Dword),
			n => bail!("size must be 1, 2 or 4 bytes, not {}", n),
		}
	}
}

/// Reset the controller and read `length` bytes at `address`
pub fn read<R: Registers>(ee: &mut Eeprom<R>, address: u32, length: usize, bytewise: bool) -> crate::AResult<Vec<u8>> {
	ee.init();
	let mut buf = vec![0u8; length];
	let completion = if bytewise {
		ee.read_bytewise(address, &mut buf)?
	} else {
		ee.read(address, &mut buf)?
	};
	if !completion.is_clean() {
		debug!("EEPROM read @0x{:04x} incomplete: {:?}", address, completion);
	}
	Ok(buf)
}

/// Read up to 4 bytes at `address` as little-endian number
pub fn read_value<R: Registers>(ee: &mut Eeprom<R>, address: u32, length: usize, bytewise: bool) -> crate::AResult<u32> {
	ensure!(length >= 1 && length <= 4, "can only read 1 to 4 bytes as value, not {}", length);
	let buf = read(ee, address, length, bytewise)?;
	let mut value = [0u8; 4];
	value[..length].copy_from_slice(&buf);
	Ok(u32::from_le_bytes(value))
}

/// Reset the controller and write the lowest `size` bytes of `value` (little
/// endian) at `address`
pub fn write_value<R: Registers>(ee: &mut Eeprom<R>, address: u32, value: u32, size: ValueSize) -> crate::AResult<()> {
	ee.init();
	let bytes = value.to_le_bytes();
	let completion = ee.write(address, &bytes[..size.bytes()])?;
	if !completion.is_clean() {
		debug!("EEPROM write @0x{:04x} incomplete: {:?}", address, completion);
	}
	Ok(())
}

/// Reset the controller and read the first `length` bytes of the EEPROM
pub fn read_config<R: Registers>(ee: &mut Eeprom<R>, length: usize) -> crate::AResult<Vec<u8>> {
	ensure!(length <= MAX_SIZE, "can't read more than 0x{:x} bytes, not 0x{:x}", MAX_SIZE, length);
	let mut buf = vec![0u8; length];
	let completion = ee.read_config(&mut buf)?;
	if !completion.is_clean() {
		warn!("EEPROM didn't respond in time, data may be incomplete: {:?}", completion);
	}
	Ok(buf)
}

/// Diagnostic only: shows the controller registers, doesn't touch the EEPROM
pub fn dump<R: Registers>(ee: &mut Eeprom<R>) -> Snapshot {
	info!("EEPROM dump requested; showing I2C controller state only");
	ee.controller().snapshot()
}

pub fn hexdump<W: io::Write>(out: &mut W, base: u32, data: &[u8]) -> io::Result<()> {
	for (i, b) in data.iter().enumerate() {
		if 0 == i % 16 {
			write!(out, "{:08x} ", base as usize + i)?;
		} else if 0 == i % 8 {
			write!(out, " ")?;
		}
		write!(out, " {:02x}", b)?;
		if 15 == i % 16 {
			writeln!(out)?;
		}
	}
	if 0 != data.len() % 16 {
		writeln!(out)?;
	}
	Ok(())
}
