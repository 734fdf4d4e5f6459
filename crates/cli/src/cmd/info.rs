//! Implementation of the `kiln info` command.

use anyhow::Result;

use kiln_core::platform::Platform;

use crate::output;

pub fn cmd_info() -> Result<()> {
  let platform = Platform::detect();

  output::print_info(&format!("kiln v{}", env!("CARGO_PKG_VERSION")));
  output::print_stat("Platform", &platform.to_string());
  output::print_stat("OS", platform.os);
  output::print_stat("Arch", platform.arch);
  output::print_stat("Host", &platform.hostname);
  output::print_stat("User", &platform.username);

  Ok(())
}
