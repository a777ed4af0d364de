//! Report renderers for command results.
//!
//! - [`terminal`] — colored, tabular output; respects `--quiet`.
//! - [`print_json`] — the command's result structure as pretty JSON on stdout.

pub mod terminal;

use anyhow::Result;
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
