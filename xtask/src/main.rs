// Licensed under the Apache-2.0 license

mod tasks;

use anyhow::{bail, Result};

const USAGE: &str = "\
Usage: cargo xtask <command>

Commands:
  test                 Run host unit and doc tests against the simulated bus
  build-avr [--mcu M]  Cross-compile the driver for AVR (nightly, build-std)
";

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        print!("{USAGE}");
        return Ok(());
    };

    match command.as_str() {
        "test" => tasks::host_tests(),
        "build-avr" => {
            let mcu = match (args.next().as_deref(), args.next()) {
                (None, _) => tasks::DEFAULT_MCU.to_string(),
                (Some("--mcu"), Some(mcu)) => mcu,
                _ => bail!("expected `--mcu <name>`\n\n{USAGE}"),
            };
            tasks::build_avr(&mcu)
        }
        "help" | "--help" | "-h" => {
            print!("{USAGE}");
            Ok(())
        }
        other => bail!("unknown command `{other}`\n\n{USAGE}"),
    }
}
