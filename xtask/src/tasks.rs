// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;

pub const DEFAULT_MCU: &str = "atmega328p";

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map_or_else(|| manifest_dir.clone(), PathBuf::from)
}

fn run(mut cmd: Command, what: &str) -> Result<()> {
    cmd.current_dir(workspace_root());
    let status = cmd
        .status()
        .with_context(|| format!("Failed to spawn cargo for {what}"))?;

    if !status.success() {
        anyhow::bail!("{what} failed with {status}");
    }
    Ok(())
}

/// Run the driver tests on the host with the simulated register file.
pub fn host_tests() -> Result<()> {
    println!("Running host tests...");

    let mut cmd = Command::new("cargo");
    cmd.args(["test", "-p", "avr-twi", "--features", "sim,std"]);
    run(cmd, "host tests")?;

    println!("Host tests passed");
    Ok(())
}

/// Build the library for an AVR part. Needs a nightly toolchain with rust-src.
pub fn build_avr(mcu: &str) -> Result<()> {
    println!("Building avr-twi for {mcu}...");

    let mut cmd = Command::new("cargo");
    cmd.args([
        "+nightly",
        "build",
        "-p",
        "avr-twi",
        "--release",
        "--target",
        "avr-none",
        "-Z",
        "build-std=core",
    ]);
    cmd.env("RUSTFLAGS", format!("-C target-cpu={mcu}"));
    run(cmd, "AVR build")?;

    println!("AVR build for {mcu} finished");
    Ok(())
}
