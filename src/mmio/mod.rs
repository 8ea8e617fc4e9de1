use std::io;

mod mapped;

pub use self::mapped::Mapped;

/// Physical base of the RT2880/RT305x "system control" block; `RALINK_SYSCTL_BASE`
/// is the KSEG1 alias 0xB000_0000 of it.
pub const DEFAULT_SYSCTL_BASE: u64 = 0x1000_0000;

/// Covers reset control (0x34) and the I2C block (0x900..0x924).
pub const SYSCTL_LEN: usize = 0x1000;

pub fn open_sysctl(base: u64) -> crate::AResult<Mapped> {
	with_context!(("couldn't map system control registers at 0x{:08x}", base), {
		let map: io::Result<Mapped> = mapped::inner_open("/dev/mem", base, SYSCTL_LEN);
		Ok(map?)
	})
}
