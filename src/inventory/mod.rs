//! Inventory Module
//!
//! In-memory device registry backing the device inventory port.

pub mod registry;

pub use registry::*;
