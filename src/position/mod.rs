//! Target position service.
//!
//! The server hands out a random yoga position to attempt and the hold
//! instructions for it; the client polls it from the coaching loop.

mod catalog;
mod client;
mod server;

pub use catalog::{PositionCatalog, DEFAULT_HOLD_INSTRUCTIONS, YOGA_POSITIONS};
pub use client::PositionClient;
pub use server::{PositionConfig, PositionServer, DEFAULT_POSITION_ADDR};
