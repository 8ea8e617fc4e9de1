/// One bus transaction worth of a transfer
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Chunk {
	/// EEPROM address
	pub address: u32,
	/// offset into the caller's buffer
	pub offset: usize,
	pub len: usize,
}

/// Splits `[address, address + len)` into as many full `block` sized chunks
/// as fit, followed by single bytes for the remainder.
///
/// Chunks are not aligned to the EEPROM pages; they start at `address`.
#[derive(Clone, Debug)]
pub struct Blocks {
	address: u32,
	full_end: usize,
	end: usize,
	block: usize,
	offset: usize,
}

impl Iterator for Blocks {
	type Item = Chunk;

	fn next(&mut self) -> Option<Self::Item> {
		if self.offset >= self.end {
			return None;
		}
		let len = if self.offset < self.full_end { self.block } else { 1 };
		let chunk = Chunk {
			address: self.address.wrapping_add(self.offset as u32),
			offset: self.offset,
			len,
		};
		self.offset += len;
		Some(chunk)
	}
}

pub fn blocks(address: u32, len: usize, block: usize) -> Blocks {
	assert!(block > 0);
	Blocks {
		address,
		full_end: (len / block) * block,
		end: len,
		block,
		offset: 0,
	}
}

pub fn bytewise(address: u32, len: usize) -> Blocks {
	blocks(address, len, 1)
}
