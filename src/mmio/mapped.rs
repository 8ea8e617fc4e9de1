use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::io::{
	FromRawFd,
};
use std::ptr;

use libc::{
	MAP_SHARED,
	O_CLOEXEC,
	O_RDWR,
	O_SYNC,
	PROT_READ,
	PROT_WRITE,
	_SC_PAGESIZE,
	c_void,
	mmap,
	munmap,
	off_t,
	open,
	sysconf,
};

use crate::hardware::Registers;

#[derive(Debug)]
pub struct Mapped {
	map: ptr::NonNull<u8>, // start of the (page aligned) mapping
	map_len: usize,
	offset: usize, // `base` relative to `map`
	len: usize,
	base: u64,
}

impl Drop for Mapped {
	fn drop(&mut self) {
		unsafe {
			let res = munmap(
				self.map.as_ptr() as *mut c_void,
				self.map_len,
			);
			if 0 != res {
				panic!("munmap failed: {}", io::Error::last_os_error());
			}
		}
	}
}

impl Mapped {
	/// physical address of the first mapped register
	pub fn base(&self) -> u64 {
		self.base
	}

	fn register(&self, offset: usize) -> *mut u32 {
		assert!(offset & 3 == 0);
		assert!(offset + 3 < self.len);
		unsafe { self.map.as_ptr().add(self.offset + offset) as *mut u32 }
	}

	pub fn read_dword(&self, offset: usize) -> u32 {
		unsafe { ptr::read_volatile(self.register(offset)) }
	}

	pub fn write_dword(&mut self, offset: usize, data: u32) {
		unsafe { ptr::write_volatile(self.register(offset), data) }
	}
}

impl Registers for Mapped {
	fn read_dword(&mut self, offset: usize) -> u32 {
		Mapped::read_dword(self, offset)
	}

	fn write_dword(&mut self, offset: usize, data: u32) {
		Mapped::write_dword(self, offset, data)
	}
}

fn page_size() -> usize {
	let size = unsafe { sysconf(_SC_PAGESIZE) };
	if size <= 0 { 4096 } else { size as usize }
}

// TODO: exclusive open / file locking?
pub fn inner_open(path: &str, base: u64, len: usize) -> io::Result<Mapped> {
	let page_mask = (page_size() - 1) as u64;
	let map_base = base & !page_mask;
	let offset = (base - map_base) as usize;
	let map_len = offset + len;

	let path = CString::new(path)?;

	let fd = unsafe { open(path.as_ptr(), O_RDWR | O_CLOEXEC | O_SYNC) };
	if -1 == fd {
		return Err(io::Error::last_os_error());
	}
	// now get fd managed to prevent resource leak; the mapping stays valid
	// after the fd is closed
	let _f = unsafe { fs::File::from_raw_fd(fd) };

	let area = unsafe {
		mmap(
			ptr::null_mut(),
			map_len,
			PROT_READ | PROT_WRITE,
			MAP_SHARED,
			fd,
			map_base as off_t,
		)
	};

	if area as usize == !0usize {
		return Err(io::Error::last_os_error());
	}
	match ptr::NonNull::new(area as *mut u8) {
		None => panic!("mmap shouldn't return NULL ever"),
		Some(map) => Ok(Mapped{
			map,
			map_len,
			offset,
			len,
			base,
		}),
	}
}
