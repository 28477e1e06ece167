//! Configuration parsing for pedal-mapper
//!
//! This crate handles parsing the KDL settings file of the pedal daemon.
//! Key bindings are compiled into the daemon and are not part of this file.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{parse_config, parse_config_str};
