//! Topology Resolver
//!
//! Validates a volume request and derives its subvolume type, disperse
//! counts, effective max brick size and distribute count.

use crate::config::PlannerConfig;
use crate::domain::{ProvisionerType, ResolvedVolume, SubvolumeType, VolumeCreateRequest};
use crate::error::{Error, Result};
use tracing::debug;

/// Disperse counts after validation and defaulting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisperseCounts {
    pub disperse_count: u32,
    pub data_count: u32,
    pub redundancy_count: u32,
}

/// Default redundancy for a disperse count: the count with its highest
/// set bit cleared, or 1 when that leaves nothing
pub fn default_redundancy(disperse_count: u32) -> u32 {
    if disperse_count == 0 {
        return 1;
    }
    let highest_bit = 1u32 << (31 - disperse_count.leading_zeros());
    match disperse_count & !highest_bit {
        0 => 1,
        rest => rest,
    }
}

fn resolve_replica(req: &VolumeCreateRequest) -> Result<Option<SubvolumeType>> {
    if req.arbiter_count > 1 {
        return Err(Error::InvalidArbiterCount {
            count: req.arbiter_count,
        });
    }

    if req.replica_count < 2 {
        return Ok(None);
    }

    if req.replica_count > 3 {
        return Err(Error::InvalidReplicaCount {
            count: req.replica_count,
        });
    }

    Ok(Some(SubvolumeType::Replicate))
}

fn resolve_disperse(req: &VolumeCreateRequest) -> Result<Option<DisperseCounts>> {
    if req.disperse_count == 0
        && req.disperse_data_count == 0
        && req.disperse_redundancy_count == 0
    {
        return Ok(None);
    }

    if req.disperse_data_count > 0 && req.disperse_redundancy_count == 0 {
        return Err(Error::RedundancyRequired);
    }

    let mut disperse_count = req.disperse_count;
    if req.disperse_data_count > 0 {
        disperse_count = req
            .disperse_data_count
            .checked_add(req.disperse_redundancy_count)
            .ok_or_else(|| Error::Validation("disperse count overflows".into()))?;
    }

    let redundancy_count = match req.disperse_redundancy_count {
        0 => default_redundancy(disperse_count),
        r => r,
    };

    let data_count = match req.disperse_data_count {
        0 => disperse_count.saturating_sub(redundancy_count),
        d => d,
    };

    if u64::from(redundancy_count) * 2 >= u64::from(disperse_count) {
        return Err(Error::InvalidRedundancyCount {
            redundancy: redundancy_count,
            disperse_count,
        });
    }

    Ok(Some(DisperseCounts {
        disperse_count,
        data_count,
        redundancy_count,
    }))
}

fn resolve_max_brick_size(req: &VolumeCreateRequest, config: &PlannerConfig) -> Result<u64> {
    let mut max_brick_size = req.max_brick_size;

    if max_brick_size > 0 && max_brick_size < config.min_brick_size {
        return Err(Error::InvalidMaxBrickSize {
            size: max_brick_size,
            reason: format!("minimum size required is {}", config.min_brick_size),
        });
    }

    if req.provisioner_type == ProvisionerType::Loop {
        if max_brick_size > config.default_loop_max_brick_size {
            return Err(Error::InvalidMaxBrickSize {
                size: max_brick_size,
                reason: format!(
                    "max brick size supported for loop back bricks is {}",
                    config.default_loop_max_brick_size
                ),
            });
        }
        if max_brick_size == 0 {
            max_brick_size = config.default_loop_max_brick_size;
        }
    }

    Ok(max_brick_size)
}

fn resolve_snapshot_reserve_factor(req: &VolumeCreateRequest, config: &PlannerConfig) -> Result<f64> {
    let factor = req.snapshot_reserve_factor;
    if factor == 0.0 {
        return Ok(config.default_snapshot_reserve_factor);
    }
    if !factor.is_finite() || factor < 1.0 {
        return Err(Error::Validation(format!(
            "snapshot reserve factor must be >= 1.0, got {}",
            factor
        )));
    }
    Ok(factor)
}

/// Validate `req` and derive its topology
pub fn resolve(req: &VolumeCreateRequest, config: &PlannerConfig) -> Result<ResolvedVolume> {
    if req.name.trim().is_empty() {
        return Err(Error::Validation("volume name is required".into()));
    }
    if req.size == 0 {
        return Err(Error::Validation("volume size must be greater than zero".into()));
    }

    let mut subvol_type = SubvolumeType::Distribute;

    if let Some(t) = resolve_replica(req)? {
        subvol_type = t;
    }

    let disperse = resolve_disperse(req)?;
    if disperse.is_some() {
        subvol_type = SubvolumeType::Disperse;
    }

    let max_brick_size = resolve_max_brick_size(req, config)?;
    let snapshot_reserve_factor = resolve_snapshot_reserve_factor(req, config)?;

    let mut distribute_count = req.distribute_count;
    if max_brick_size > 0 && req.size > max_brick_size {
        // A distribute brick holds the whole subvolume, replica bricks an
        // equal share each and disperse bricks 1/data-count of it.
        let bricks_per_subvol = match (disperse, subvol_type) {
            (Some(d), _) => d.data_count.max(1),
            (None, SubvolumeType::Replicate) => req.replica_count,
            _ => 1,
        };
        let max_subvol_size = max_brick_size
            .checked_mul(u64::from(bricks_per_subvol))
            .ok_or_else(|| Error::Validation("max subvolume size overflows".into()))?;
        let count = req.size.div_ceil(max_subvol_size);
        distribute_count = u32::try_from(count).map_err(|_| {
            Error::Validation(format!("distribute count {} is too large", count))
        })?;
    }

    let disperse = disperse.unwrap_or(DisperseCounts {
        disperse_count: 0,
        data_count: 0,
        redundancy_count: 0,
    });

    let resolved = ResolvedVolume {
        name: req.name.clone(),
        size: req.size,
        subvol_type,
        replica_count: req.replica_count,
        arbiter_count: req.arbiter_count,
        disperse_count: disperse.disperse_count,
        disperse_data_count: disperse.data_count,
        disperse_redundancy_count: disperse.redundancy_count,
        distribute_count,
        max_brick_size,
        provisioner_type: req.provisioner_type,
        snapshot_reserve_factor,
        average_file_size: match req.average_file_size {
            0 => config.default_average_file_size,
            n => n,
        },
        subvol_zones_overlap: req.subvol_zones_overlap,
    };

    debug!(
        volume = %resolved.name,
        subvol_type = %resolved.subvol_type,
        distribute_count = resolved.distribute_count,
        max_brick_size = resolved.max_brick_size,
        "Resolved volume topology"
    );

    Ok(resolved)
}
