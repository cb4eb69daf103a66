// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Build-time support for the nanokernel.
//!
//! The kernel is configured through a Kconfig-style `.config` file.  The file to use is named by
//! the `DOTCONFIG` environment variable.  A crate's `build.rs` can then call:
//!
//! - [`export_bool_kconfig`] so that every `CONFIG_FOO=y` setting can be tested with
//!   `#[cfg(CONFIG_FOO)]`.
//! - [`build_kconfig_mod`] to generate `$OUT_DIR/kconfig.rs`, a `kconfig` module holding a
//!   constant for every setting, which the crate pulls in with `include!`.
//!
//! ```ignore
//! fn main() {
//!     nanokernel_build::export_bool_kconfig_from("nanokernel.conf").unwrap();
//!     nanokernel_build::build_kconfig_mod_from("nanokernel.conf").unwrap();
//! }
//! ```

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;

/// A single value from the `.config` file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// `CONFIG_FOO=y`.  A setting of `n` is written as a comment by Kconfig, and never shows up.
    Bool,
    /// A decimal integer.
    Int(i64),
    /// A hexadecimal integer, as written `0x...`.
    Hex(u64),
    /// A quoted string, with the quotes and escapes removed.
    Str(String),
}

/// A parsed `.config` file, in file order.
#[derive(Clone, Debug, Default)]
pub struct Kconfig {
    pub entries: Vec<(String, Value)>,
}

impl Kconfig {
    /// Parse the text of a `.config` file.
    pub fn parse(text: &str) -> Result<Kconfig> {
        let config_y = Regex::new(r"^(CONFIG_[A-Za-z0-9_]+)=y$")?;
        let config_hex = Regex::new(r"^(CONFIG_[A-Za-z0-9_]+)=(0x[0-9a-fA-F]+)$")?;
        let config_int = Regex::new(r"^(CONFIG_[A-Za-z0-9_]+)=(-?[0-9]+)$")?;
        let config_str = Regex::new(r#"^(CONFIG_[A-Za-z0-9_]+)="(.*)"$"#)?;

        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(caps) = config_y.captures(line) {
                entries.push((caps[1].to_string(), Value::Bool));
            } else if let Some(caps) = config_hex.captures(line) {
                let value = u64::from_str_radix(&caps[2][2..], 16)
                    .with_context(|| format!("line {}: bad hex value", lineno + 1))?;
                entries.push((caps[1].to_string(), Value::Hex(value)));
            } else if let Some(caps) = config_int.captures(line) {
                let value = caps[2].parse()
                    .with_context(|| format!("line {}: bad integer value", lineno + 1))?;
                entries.push((caps[1].to_string(), Value::Int(value)));
            } else if let Some(caps) = config_str.captures(line) {
                entries.push((caps[1].to_string(), Value::Str(unescape(&caps[2]))));
            } else {
                bail!("line {}: unrecognized config line: {:?}", lineno + 1, line);
            }
        }
        Ok(Kconfig { entries })
    }

    /// Read and parse a `.config` file.
    pub fn load(path: &Path) -> Result<Kconfig> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Kconfig::parse(&text)
            .with_context(|| format!("parsing {}", path.display()))
    }

    /// Iterate over the names of the boolean settings that are enabled.
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.entries.iter()
            .filter(|(_, v)| *v == Value::Bool)
            .map(|(k, _)| k.as_str())
    }

    /// Render the `kconfig` module.
    pub fn to_module(&self) -> String {
        let mut out = String::new();
        out.push_str("/// Generated from the Kconfig `.config` file.\n");
        out.push_str("#[allow(dead_code)]\n");
        out.push_str("pub mod kconfig {\n");
        for (name, value) in &self.entries {
            // Writing to a String cannot fail.
            let _ = match value {
                Value::Bool => writeln!(out, "    pub const {}: bool = true;", name),
                Value::Int(v) => writeln!(out, "    pub const {}: isize = {};", name, v),
                Value::Hex(v) => writeln!(out, "    pub const {}: usize = {:#x};", name, v),
                Value::Str(v) => writeln!(out, "    pub const {}: &str = {:?};", name, v),
            };
        }
        out.push_str("}\n");
        out
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Locate the `.config` file: `DOTCONFIG` if set, otherwise `default`, relative to the crate
/// being built.
pub fn dotconfig_path(default: &str) -> Result<PathBuf> {
    println!("cargo:rerun-if-env-changed=DOTCONFIG");
    let path = match env::var("DOTCONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => {
            let dir = env::var("CARGO_MANIFEST_DIR").context("CARGO_MANIFEST_DIR not set")?;
            Path::new(&dir).join(default)
        }
    };
    println!("cargo:rerun-if-changed={}", path.display());
    Ok(path)
}

/// Export boolean Kconfig entries as cfg flags, reading the file named by `DOTCONFIG`.
pub fn export_bool_kconfig() -> Result<()> {
    let path = env::var("DOTCONFIG").context("DOTCONFIG must be set by the build")?;
    export_bool_kconfig_from_path(Path::new(&path))
}

/// Like [`export_bool_kconfig`], falling back to `default` when `DOTCONFIG` is not set.
pub fn export_bool_kconfig_from(default: &str) -> Result<()> {
    export_bool_kconfig_from_path(&dotconfig_path(default)?)
}

fn export_bool_kconfig_from_path(path: &Path) -> Result<()> {
    let config = Kconfig::load(path)?;
    for name in config.enabled() {
        println!("cargo:rustc-cfg={}", name);
    }
    Ok(())
}

/// Generate `$OUT_DIR/kconfig.rs` from the file named by `DOTCONFIG`.
pub fn build_kconfig_mod() -> Result<()> {
    let path = env::var("DOTCONFIG").context("DOTCONFIG must be set by the build")?;
    build_kconfig_mod_from_path(Path::new(&path))
}

/// Like [`build_kconfig_mod`], falling back to `default` when `DOTCONFIG` is not set.
pub fn build_kconfig_mod_from(default: &str) -> Result<()> {
    build_kconfig_mod_from_path(&dotconfig_path(default)?)
}

fn build_kconfig_mod_from_path(path: &Path) -> Result<()> {
    let config = Kconfig::load(path)?;
    let out_dir = env::var("OUT_DIR").context("OUT_DIR not set")?;
    let gen_path = Path::new(&out_dir).join("kconfig.rs");
    fs::write(&gen_path, config.to_module())
        .with_context(|| format!("writing {}", gen_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# Generated by Kconfig
CONFIG_NANOKERNEL=y
# CONFIG_OBJECT_TRACING is not set
CONFIG_SYS_CLOCK_TICKS_PER_SEC=100
CONFIG_SRAM_BASE_ADDRESS=0x20000000
CONFIG_BOARD="qemu_x86"
CONFIG_OFFSET=-4
"#;

    #[test]
    fn parses_all_kinds() {
        let config = Kconfig::parse(SAMPLE).unwrap();
        assert_eq!(config.entries, vec![
            ("CONFIG_NANOKERNEL".to_string(), Value::Bool),
            ("CONFIG_SYS_CLOCK_TICKS_PER_SEC".to_string(), Value::Int(100)),
            ("CONFIG_SRAM_BASE_ADDRESS".to_string(), Value::Hex(0x2000_0000)),
            ("CONFIG_BOARD".to_string(), Value::Str("qemu_x86".to_string())),
            ("CONFIG_OFFSET".to_string(), Value::Int(-4)),
        ]);
        assert_eq!(config.enabled().collect::<Vec<_>>(), vec!["CONFIG_NANOKERNEL"]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Kconfig::parse("CONFIG_FOO=maybe").is_err());
        assert!(Kconfig::parse("not a config line").is_err());
    }

    #[test]
    fn unescapes_strings() {
        let config = Kconfig::parse(r#"CONFIG_NAME="a \"quoted\" \\ name""#).unwrap();
        assert_eq!(config.entries[0].1, Value::Str(r#"a "quoted" \ name"#.to_string()));
    }

    #[test]
    fn module_has_typed_constants() {
        let module = Kconfig::parse(SAMPLE).unwrap().to_module();
        assert!(module.contains("pub const CONFIG_NANOKERNEL: bool = true;"));
        assert!(module.contains("pub const CONFIG_SYS_CLOCK_TICKS_PER_SEC: isize = 100;"));
        assert!(module.contains("pub const CONFIG_SRAM_BASE_ADDRESS: usize = 0x20000000;"));
        assert!(module.contains(r#"pub const CONFIG_BOARD: &str = "qemu_x86";"#));
    }
}
