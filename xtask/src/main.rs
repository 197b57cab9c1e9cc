// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use std::env;
use std::path::PathBuf;
use std::process::Command;

const FIRMWARE_DIR: &str = "scalelink-firmware";
const FIRMWARE_BIN: &str = "scalelink";
const FIRMWARE_TARGET: &str = "xtensa-esp32-none-elf";
const HOST_PACKAGES: [&str; 2] = ["scalelink-messages", "scalelink-core"];

/// Firmware images, each one a Cargo feature of the firmware crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    BusDisplay,
    Bus,
    BusSleep,
    BleNotify,
    BleNotifySleep,
    DisplayOnly,
}

const VARIANTS: [Variant; 6] = [
    Variant::BusDisplay,
    Variant::Bus,
    Variant::BusSleep,
    Variant::BleNotify,
    Variant::BleNotifySleep,
    Variant::DisplayOnly,
];

impl Variant {
    fn feature(&self) -> &'static str {
        match self {
            Variant::BusDisplay => "bus-display",
            Variant::Bus => "bus",
            Variant::BusSleep => "bus-sleep",
            Variant::BleNotify => "ble-notify",
            Variant::BleNotifySleep => "ble-notify-sleep",
            Variant::DisplayOnly => "display-only",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command_ {
    Build(Vec<Variant>),
    Flash(Variant),
    Monitor,
    Test,
    Help,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = match parse_command(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error parsing command: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = execute_command(command) {
        eprintln!("Error executing command: {}", e);
        std::process::exit(1);
    }
}

fn parse_command(args: &[String]) -> Result<Command_, String> {
    if args.is_empty() {
        return Err("No command provided".to_string());
    }

    match args[0].as_str() {
        "build" => match args.get(1).map(String::as_str) {
            None => Ok(Command_::Build(vec![Variant::BusDisplay])),
            Some("all") => Ok(Command_::Build(VARIANTS.to_vec())),
            Some(variant) => Ok(Command_::Build(vec![parse_variant(variant)?])),
        },
        "flash" => {
            let variant = match args.get(1) {
                Some(variant) => parse_variant(variant)?,
                None => Variant::BusDisplay,
            };
            Ok(Command_::Flash(variant))
        }
        "monitor" => Ok(Command_::Monitor),
        "test" => Ok(Command_::Test),
        "help" => Ok(Command_::Help),
        _ => Err(format!("Unknown command: {}", args[0])),
    }
}

fn parse_variant(name: &str) -> Result<Variant, String> {
    VARIANTS
        .iter()
        .copied()
        .find(|variant| variant.feature() == name)
        .ok_or_else(|| format!("Unknown variant: {}", name))
}

fn execute_command(cmd: Command_) -> Result<(), String> {
    match cmd {
        Command_::Build(variants) => {
            for variant in variants {
                build(variant)?;
            }
            Ok(())
        }
        Command_::Flash(variant) => flash(variant),
        Command_::Monitor => run_espflash(&["monitor", "--chip", "esp32"]),
        Command_::Test => run_host_tests(),
        Command_::Help => {
            print_usage();
            Ok(())
        }
    }
}

fn build(variant: Variant) -> Result<(), String> {
    println!("Building {}...", variant.feature());
    run_firmware_cargo("build", variant)?;
    save_image(variant)?;
    println!("✓ {} built successfully", variant.feature());
    Ok(())
}

fn flash(variant: Variant) -> Result<(), String> {
    println!("Building and flashing {}...", variant.feature());
    // `cargo run` goes through the espflash runner of the firmware's .cargo/config.toml
    run_firmware_cargo("run", variant)
}

fn firmware_args(subcommand: &str, variant: Variant) -> Vec<String> {
    vec![
        subcommand.to_string(),
        "--release".to_string(),
        "--no-default-features".to_string(),
        "--features".to_string(),
        variant.feature().to_string(),
    ]
}

/// Runs cargo inside the firmware directory so its toolchain file and target config apply.
fn run_firmware_cargo(subcommand: &str, variant: Variant) -> Result<(), String> {
    let status = Command::new("cargo")
        .current_dir(FIRMWARE_DIR)
        .args(firmware_args(subcommand, variant))
        .status()
        .map_err(|e| format!("Failed to run cargo {}: {}", subcommand, e))?;

    if !status.success() {
        return Err(format!("cargo {} failed for {}", subcommand, variant.feature()));
    }

    Ok(())
}

fn image_paths(variant: Variant) -> (PathBuf, PathBuf) {
    let release_dir = PathBuf::from(FIRMWARE_DIR)
        .join("target")
        .join(FIRMWARE_TARGET)
        .join("release");
    let elf = release_dir.join(FIRMWARE_BIN);
    let bin = release_dir.join(format!("{}-{}.bin", FIRMWARE_BIN, variant.feature()));
    (elf, bin)
}

fn save_image(variant: Variant) -> Result<(), String> {
    let (elf_path, bin_path) = image_paths(variant);

    if !elf_path.exists() {
        return Err(format!("ELF binary not found at {}", elf_path.display()));
    }

    println!("Generating .bin file for {}...", variant.feature());
    let elf = elf_path.to_string_lossy();
    let bin = bin_path.to_string_lossy();
    run_espflash(&["save-image", "--chip", "esp32", &elf, &bin])?;
    println!("✓ Generated {}", bin_path.display());
    Ok(())
}

fn run_espflash(args: &[&str]) -> Result<(), String> {
    let status = Command::new("espflash")
        .args(args)
        .status()
        .map_err(|e| {
            format!(
                "Failed to run espflash: {}. Install it with `cargo install espflash`.",
                e
            )
        })?;

    if !status.success() {
        return Err(format!("espflash {} failed", args.first().unwrap_or(&"")));
    }

    Ok(())
}

fn run_host_tests() -> Result<(), String> {
    let mut cmd = Command::new("cargo");
    cmd.arg("test");
    for package in HOST_PACKAGES {
        cmd.args(["--package", package]);
    }

    let status = cmd
        .status()
        .map_err(|e| format!("Failed to run cargo test: {}", e))?;

    if !status.success() {
        return Err("Host tests failed".to_string());
    }

    Ok(())
}

fn print_usage() {
    eprintln!(
        "Usage: cargo xtask <COMMAND> [VARIANT]\n\
         \n\
         Commands:\n\
         \tbuild       Build the variant, or every variant with `all` (generates .bin files)\n\
         \tflash       Build, flash and monitor the variant\n\
         \tmonitor     Attach to the serial console\n\
         \ttest        Run the host side tests\n\
         \thelp        Show this help message\n\
         \n\
         Variants:\n\
         \tbus-display         Socket.IO bus with the status display (default)\n\
         \tbus                 Socket.IO bus, no display\n\
         \tbus-sleep           Socket.IO bus and display, deep sleeps after 10 empty readings\n\
         \tble-notify          BLE notify characteristic\n\
         \tble-notify-sleep    BLE notify, deep sleeps after 300 s empty\n\
         \tdisplay-only        Display only, deep sleeps after 30 s empty\n\
         \n\
         Wi-Fi and bus settings come from SCALELINK_WIFI_SSID, SCALELINK_WIFI_PASSWORD,\n\
         SCALELINK_WIFI_SSID_2, SCALELINK_WIFI_PASSWORD_2, SCALELINK_BUS_HOST,\n\
         SCALELINK_BUS_PORT and SCALELINK_ROOM at build time.\n\
         \n\
         Examples:\n\
         \tcargo xtask build                  # Build bus-display\n\
         \tcargo xtask build all              # Build every variant\n\
         \tcargo xtask flash ble-notify       # Flash the BLE build\n\
         \tcargo xtask test                   # Run host tests"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn build_defaults_to_bus_display() {
        assert_eq!(
            parse_command(&args(&["build"])),
            Ok(Command_::Build(vec![Variant::BusDisplay]))
        );
        assert_eq!(
            parse_command(&args(&["build", "all"])),
            Ok(Command_::Build(VARIANTS.to_vec()))
        );
    }

    #[test]
    fn variants_parse_by_feature_name() {
        for variant in VARIANTS {
            assert_eq!(parse_variant(variant.feature()), Ok(variant));
        }
        assert!(parse_variant("wifi").is_err());
    }

    #[test]
    fn flash_takes_a_variant() {
        assert_eq!(
            parse_command(&args(&["flash", "ble-notify-sleep"])),
            Ok(Command_::Flash(Variant::BleNotifySleep))
        );
        assert!(parse_command(&args(&["flash", "nope"])).is_err());
        assert!(parse_command(&args(&["attach"])).is_err());
    }

    #[test]
    fn firmware_builds_exactly_one_variant_feature() {
        let built = firmware_args("build", Variant::DisplayOnly);
        assert_eq!(
            built,
            args(&["build", "--release", "--no-default-features", "--features", "display-only"])
        );
    }

    #[test]
    fn image_is_named_after_the_variant() {
        let (elf, bin) = image_paths(Variant::BusSleep);
        assert!(elf.ends_with("xtensa-esp32-none-elf/release/scalelink"));
        assert!(bin.ends_with("release/scalelink-bus-sleep.bin"));
    }
}
