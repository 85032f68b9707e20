//! Planner Module
//!
//! The planning pipeline as pure stages: resolve the topology, generate
//! the brick layout, then place bricks on a device snapshot.

pub mod allocator;
pub mod brick;
pub mod engine;
pub mod layout;
pub mod sizing;
pub mod topology;

pub use allocator::{allocate, Allocation, AllocationOptions};
pub use brick::BrickBuilder;
pub use engine::BricksPlanner;
pub use layout::{generate_layout, LayoutStrategy};
pub use topology::{default_redundancy, resolve};

use crate::config::PlannerConfig;
use crate::domain::{Device, VolumePlan, VolumeCreateRequest};
use crate::error::Result;
use tracing::info;

/// Plan the bricks of `req` against an owned device snapshot
///
/// The snapshot is consumed; on failure nothing of it escapes.
pub fn plan_volume(
    req: &VolumeCreateRequest,
    config: &PlannerConfig,
    devices: Vec<Device>,
) -> Result<VolumePlan> {
    let volume = resolve(req, config)?;
    let layout = generate_layout(&volume, config)?;
    let allocation = allocate(
        layout,
        devices,
        AllocationOptions {
            provisioner_type: volume.provisioner_type,
            subvol_zones_overlap: volume.subvol_zones_overlap,
        },
    )?;

    let plan = VolumePlan {
        volume,
        subvolumes: allocation.subvolumes,
    };

    info!(
        volume = %plan.volume.name,
        subvol_type = %plan.volume.subvol_type,
        subvolumes = plan.subvolumes.len(),
        bricks = plan.bricks().count(),
        device_usage = %sizing::format_size(plan.total_device_usage()),
        "Planned volume bricks"
    );

    Ok(plan)
}
