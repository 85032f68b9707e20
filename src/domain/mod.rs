//! Domain layer - Volume requests, brick plans and port definitions
//!
//! This module defines the values flowing through the planning pipeline
//! and the traits (ports) that inventory adapters implement.

pub mod plan;
pub mod ports;
pub mod request;

pub use plan::*;
pub use ports::*;
pub use request::*;
