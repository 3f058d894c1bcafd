//! Simulated GPIO lines.
//!
//! Each line is a [`StateCell`] bound to a named [`Endpoint`]. All traffic
//! between callers and a cell goes through the fallible copies in
//! [`transfer`].

pub mod endpoint;
pub mod state_cell;
pub mod transfer;

pub use endpoint::{Endpoint, Line};
pub use state_cell::{StateCell, WRITE_CAPACITY, decode, describe, encode};
pub use transfer::{ClaimedSource, TransferFault, UserSink, UserSource};
