//! License identifiers and license texts.
//!
//! - [`spdx`] — normalizes declared license strings into the ids stored in cache records.
//! - [`detector`] — finds license files next to a dependency and recognizes their text.

pub mod detector;
pub mod spdx;
