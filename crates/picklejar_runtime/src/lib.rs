//! Parse pipeline, transport envelope, and CLI support for picklejar.
//!
//! This crate provides:
//! - [`parse_bytes`] - Interpret and normalize one stream into an [`Outcome`]
//! - [`Outcome`] - The `{"ok": ...}` document handed to a transport
//! - [`load_config`] - `ParseConfig` from a JSON file
//! - [`Watchdog`] - Cancels a parse that runs past a deadline
//! - [`init_logging`] - `tracing` output on stderr

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod envelope;
pub mod logging;
pub mod pipeline;
pub mod watchdog;

pub use config::{ConfigError, load_config};
pub use envelope::{ErrorReport, Outcome};
pub use logging::init_logging;
pub use pipeline::{parse_bytes, parse_value};
pub use watchdog::Watchdog;
