#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate ralink_i2c_eeprom;
use ralink_i2c_eeprom::*;

use std::io;
use std::process::exit;

use ralink_i2c_eeprom::eeprom::Eeprom;
use ralink_i2c_eeprom::i2c::{
	AddressWidth,
	BusConfig,
	TimeoutPolicy,
};
use ralink_i2c_eeprom::mmio::Mapped;

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_hex_param(matches: &clap::ArgMatches, name: &str) -> AResult<u32> {
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param_context(name, toolkit::parse_hex(param))
}

fn param_context<T>(name: &str, r: AResult<T>) -> AResult<T> {
	r.map_err(|e| {
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

fn bus_config(matches: &clap::ArgMatches) -> AResult<BusConfig> {
	let mut config = BusConfig::default();

	if matches.is_present("fpga") {
		config.clock_divider = 60;
	}
	if matches.is_present("clkdiv") {
		let clock_divider: u32 = get_param(matches, "clkdiv")?;
		ensure!(clock_divider > 0, "clock divider must not be zero");
		config.clock_divider = clock_divider;
	}
	if matches.is_present("width") {
		config.address_width = match get_param::<u8>(matches, "width")? {
			1 => AddressWidth::One,
			2 => AddressWidth::Two,
			n => bail!("EEPROM address must be 1 or 2 bytes, not {}", n),
		};
	}
	if matches.is_present("strict") {
		config.timeout_policy = TimeoutPolicy::Fail;
	} else if matches.is_present("warn") {
		config.timeout_policy = TimeoutPolicy::Warn;
	}

	Ok(config)
}

fn open_eeprom(matches: &clap::ArgMatches) -> AResult<Eeprom<Mapped>> {
	let base = if matches.is_present("base") {
		get_hex_param(matches, "base")? as u64
	} else {
		mmio::DEFAULT_SYSCTL_BASE
	};
	let config = bus_config(matches)?;
	debug!("system control @0x{:08x}, {:?}", base, config);

	let regs = mmio::open_sysctl(base)?;
	debug!("mapped system control block @0x{:08x}", regs.base());
	Ok(Eeprom::open(regs, config))
}

fn read(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address = get_hex_param(sub_m, "ADDRESS")?;
	let length: usize = if sub_m.is_present("length") {
		get_param(sub_m, "length")?
	} else {
		4
	};
	let bytewise = sub_m.is_present("bytewise");

	let mut ee = open_eeprom(matches)?;
	let value = toolkit::read_value(&mut ee, address, length, bytewise)?;
	println!("0x{:04x} : 0x{:04x}", address as u16, value);

	Ok(())
}

fn write(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let size: toolkit::ValueSize = get_param(sub_m, "SIZE")?;
	let address = get_hex_param(sub_m, "ADDRESS")?;
	let value = get_hex_param(sub_m, "VALUE")?;

	let mut ee = open_eeprom(matches)?;
	toolkit::write_value(&mut ee, address, value, size)?;
	println!("0x{:08x}: 0x{:08x} in {} bytes", address as u16, value, size);

	Ok(())
}

fn read_config(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let length = get_hex_param(sub_m, "LENGTH")? as usize;

	let mut ee = open_eeprom(matches)?;
	let buf = toolkit::read_config(&mut ee, length)?;
	toolkit::hexdump(&mut io::stdout(), 0, &buf)?;

	Ok(())
}

fn dump(matches: &clap::ArgMatches) -> AResult<()> {
	let mut ee = open_eeprom(matches)?;
	println!("{}", toolkit::dump(&mut ee));

	Ok(())
}

fn app() -> clap::App<'static, 'static> {
	clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg base: -b --base +takes_value "physical address of the system control block (hex, default 10000000)")
		(@arg width: -w --width +takes_value "EEPROM address bytes (1: AT24C01A-16A, 2: AT24C512)")
		(@arg clkdiv: --clkdiv +takes_value "I2C clock divider (SCLK = bus clock / (2 * CLKDIV))")
		(@arg fpga: --fpga "use the clock divider for the FPGA board")
		(@arg strict: --strict conflicts_with[warn] "fail on I2C timeouts")
		(@arg warn: --warn conflicts_with[strict] "log I2C timeouts")
		(@subcommand read =>
			(about: "read value from EEPROM")
			(@arg bytewise: --bytewise "read byte by byte instead of blocks")
			(@arg length: -l --length +takes_value "number of bytes (1-4, default 4)")
			(@arg ADDRESS: +required "EEPROM address (hex)")
		)
		(@subcommand write =>
			(about: "write value to EEPROM")
			(@arg SIZE: +required "value size in bytes: 1, 2 or 4")
			(@arg ADDRESS: +required "EEPROM address (hex)")
			(@arg VALUE: +required "value (hex)")
		)
		(@subcommand read_config =>
			(about: "hexdump the EEPROM configuration area")
			(@arg LENGTH: +required "number of bytes (hex)")
		)
		(@subcommand dump =>
			(about: "show I2C controller registers")
		)
	)
}

fn main_app() -> AResult<()> {
	let matches = app().get_matches();

	match matches.subcommand() {
		("read", Some(sub_m)) => {
			read(&matches, sub_m)
		}
		("write", Some(sub_m)) => {
			write(&matches, sub_m)
		}
		("read_config", Some(sub_m)) => {
			read_config(&matches, sub_m)
		}
		("dump", _) => {
			dump(&matches)
		}
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		// eprintln!("Backtrace: {:?}", e.backtrace());
		exit(1);
	}
}
