//! Configuration for the GPTC controller
//!
//! Loaded from TOML, overlaid with `GPTC_*` environment variables and then
//! validated as a whole.

pub mod types;

pub use types::*;
