#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

/// One raw serial line parsed into a normalized reading.
pub mod record;

/// The in-memory store the file hierarchy is projected from.
pub mod store;

/// User-defined projection rules producing derived readings.
pub mod projection;

/// Maps store entries to file attributes and contents on demand.
pub mod fs;

/// Serial line source.
pub mod serial;

/// Scripted in-memory line source, for tests and dry runs.
pub mod mock;

/// The line-source seam the supervisor reads through.
pub mod source;

/// The background task owning the line source's lifecycle.
pub mod supervisor;

/// Hands accepted readings to an external receiver script.
pub mod push;

/// Relates to config files.
pub mod config;

/// The command line interface.
pub mod cli;

/// Possible errors in this library.
pub mod error;

/// Logging/tracing setup.
pub mod logging;
