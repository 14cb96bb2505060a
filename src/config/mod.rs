//! Configuration loaded from `keeper.toml`, with command-line overrides
//! applied by the binaries.

pub mod settings;

pub use settings::{ClientSettings, ServerSettings, Settings};
