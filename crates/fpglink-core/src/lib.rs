//! fpglink-core — wire format, chunked transfer engine, and device
//! controller for the soft-processor debug link. The ctl binary supplies
//! the concrete serial transport and the executable reader.

pub mod config;
pub mod controller;
pub mod image;
pub mod transfer;
pub mod transport;
pub mod wire;

#[cfg(test)]
mod test_util;

pub use controller::{Controller, Output, SessionState};
pub use image::MemoryRange;
pub use transport::Transport;
