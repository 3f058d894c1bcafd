//! Virtual GPIO library.
//!
//! Simulates an LED and a button as single-bit lines, each exposed as a
//! pseudo-file that reads back `'0'` or `'1'` and accepts short writes.

pub mod client;
pub mod config;
pub mod error;
pub mod gpio;
pub mod host;
pub mod registry;
pub mod server;

pub use error::{GpioError, Result};
pub use gpio::{Endpoint, Line, StateCell};
pub use registry::{OpenFile, Registry};
