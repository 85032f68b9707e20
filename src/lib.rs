//! Bricks Planner - Capacity planning for distributed storage volumes
//!
//! Given a volume-creation request, computes the brick/subvolume topology
//! that satisfies the requested redundancy and capacity, then places each
//! brick on a device of a cluster peer while keeping the bricks of a
//! subvolume in separate zones.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          BricksPlanner                               │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────┐   ┌─────────────────────┐   ┌──────────────────┐  │
//! │  │   Topology    │──▶│  Layout Strategies  │──▶│   Zone-Aware     │  │
//! │  │   Resolver    │   │  + Brick Builder    │   │   Allocator      │  │
//! │  └───────────────┘   └─────────────────────┘   └────────┬─────────┘  │
//! │                                                         │            │
//! │                                          owned snapshot │            │
//! ├─────────────────────────────────────────────────────────┴────────────┤
//! │                    DeviceInventory (port)                            │
//! │              ┌──────────────────────────────┐                        │
//! │              │  DeviceRegistry (in-memory)  │                        │
//! │              └──────────────────────────────┘                        │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`planner`]: Resolver, layout strategies, brick sizing and allocator
//! - [`inventory`]: In-memory device registry
//! - [`domain`]: Request, plan and device types plus the inventory port
//! - [`config`]: Planner policy configuration
//! - [`error`]: Error types and handling

pub mod config;
pub mod domain;
pub mod error;
pub mod inventory;
pub mod planner;

// Re-export commonly used types
pub use config::PlannerConfig;

pub use domain::{
    Brick, BrickPlacement, BrickSpec, BrickType, Device, DeviceInventory, DeviceInventoryRef,
    ProvisionerType, ResolvedVolume, Subvolume, SubvolumeLayout, SubvolumeType,
    VolumeCreateRequest, VolumePlan,
};

pub use error::{Error, ErrorKind, FailureClass, Result};

pub use inventory::{DeviceRegistry, DeviceState, RegisteredDevice};

pub use planner::{plan_volume, BricksPlanner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
