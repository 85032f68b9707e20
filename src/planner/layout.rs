//! Layout Generator
//!
//! One layout strategy per subvolume type decides how many bricks a
//! subvolume has, how large each one is and which role it plays.

use super::brick::BrickBuilder;
use crate::config::PlannerConfig;
use crate::domain::{BrickType, ResolvedVolume, SubvolumeLayout, SubvolumeType};
use crate::error::{Error, Result};
use crate::planner::sizing::KIB;
use tracing::debug;

/// Space an arbiter needs per file it tracks
const ARBITER_BYTES_PER_FILE: u64 = 4 * KIB;

/// Per-type brick fan-out of a subvolume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStrategy {
    /// A single brick holding the whole subvolume
    Distribute { subvol_size: u64 },
    /// Each brick takes an equal share of the subvolume; the last brick
    /// is an arbiter when `arbiter_size` is set
    Replicate {
        brick_size: u64,
        replica_count: u32,
        arbiter_size: Option<u64>,
    },
    /// Bricks holding 1/data-count of the subvolume; the trailing
    /// `redundancy_count` bricks are parity
    Disperse {
        brick_size: u64,
        disperse_count: u32,
        redundancy_count: u32,
    },
}

impl LayoutStrategy {
    /// Select and initialize the strategy for a resolved volume
    pub fn new(volume: &ResolvedVolume, subvol_size: u64, config: &PlannerConfig) -> Self {
        match volume.subvol_type {
            SubvolumeType::Distribute => LayoutStrategy::Distribute { subvol_size },
            SubvolumeType::Replicate => {
                let brick_size = subvol_size / u64::from(volume.replica_count.max(1));
                let arbiter_size = (volume.arbiter_count > 0).then(|| {
                    let files = subvol_size / volume.average_file_size.max(1);
                    files
                        .saturating_mul(ARBITER_BYTES_PER_FILE)
                        .max(config.min_brick_size)
                        .min(brick_size.max(config.min_brick_size))
                });
                LayoutStrategy::Replicate {
                    brick_size,
                    replica_count: volume.replica_count,
                    arbiter_size,
                }
            }
            SubvolumeType::Disperse => LayoutStrategy::Disperse {
                brick_size: subvol_size / u64::from(volume.disperse_data_count.max(1)),
                disperse_count: volume.disperse_count,
                redundancy_count: volume.disperse_redundancy_count,
            },
        }
    }

    /// Number of bricks in each subvolume
    pub fn brick_count(&self) -> usize {
        match *self {
            LayoutStrategy::Distribute { .. } => 1,
            LayoutStrategy::Replicate { replica_count, .. } => replica_count as usize,
            LayoutStrategy::Disperse { disperse_count, .. } => disperse_count as usize,
        }
    }

    fn is_last(&self, idx: usize) -> bool {
        idx + 1 == self.brick_count()
    }

    /// Size of brick `idx` (0-based)
    pub fn brick_size(&self, idx: usize) -> u64 {
        match *self {
            LayoutStrategy::Distribute { subvol_size } => subvol_size,
            LayoutStrategy::Replicate {
                brick_size,
                arbiter_size,
                ..
            } => match arbiter_size {
                Some(size) if self.is_last(idx) => size,
                _ => brick_size,
            },
            LayoutStrategy::Disperse { brick_size, .. } => brick_size,
        }
    }

    /// Role of brick `idx` (0-based)
    pub fn brick_type(&self, idx: usize) -> BrickType {
        match *self {
            LayoutStrategy::Distribute { .. } => BrickType::Brick,
            LayoutStrategy::Replicate { arbiter_size, .. } => {
                if arbiter_size.is_some() && self.is_last(idx) {
                    BrickType::Arbiter
                } else {
                    BrickType::Brick
                }
            }
            LayoutStrategy::Disperse {
                disperse_count,
                redundancy_count,
                ..
            } => {
                let data_count = disperse_count.saturating_sub(redundancy_count) as usize;
                if idx >= data_count {
                    BrickType::Parity
                } else {
                    BrickType::Brick
                }
            }
        }
    }
}

/// Build the unplaced brick layout of every subvolume
pub fn generate_layout(
    volume: &ResolvedVolume,
    config: &PlannerConfig,
) -> Result<Vec<SubvolumeLayout>> {
    let num_subvols = volume.subvolume_count() as usize;
    let subvol_size = volume.subvolume_size();

    // No brick is larger than its subvolume
    if subvol_size < config.min_brick_size {
        return Err(Error::BrickTooSmall {
            size: subvol_size,
            minimum: config.min_brick_size,
        });
    }

    let remainder = volume.size % num_subvols as u64;
    if remainder > 0 {
        debug!(
            volume = %volume.name,
            remainder,
            "Requested size does not divide evenly across subvolumes, remainder dropped"
        );
    }

    let strategy = LayoutStrategy::new(volume, subvol_size, config);
    let bricks_root = config.bricks_root();
    let builder = BrickBuilder::new(&bricks_root, volume, config.min_brick_size);

    let mut subvols = Vec::new();
    for sv in 0..num_subvols {
        let bricks = (0..strategy.brick_count())
            .map(|b| builder.build(sv + 1, b + 1, strategy.brick_size(b), strategy.brick_type(b)))
            .collect::<Result<Vec<_>>>()?;

        subvols.push(SubvolumeLayout {
            subvol_type: volume.subvol_type,
            bricks,
            replica_count: volume.replica_count,
            arbiter_count: volume.arbiter_count,
            disperse_count: volume.disperse_count,
        });
    }

    debug!(
        volume = %volume.name,
        subvolumes = subvols.len(),
        bricks_per_subvolume = strategy.brick_count(),
        subvol_size,
        "Generated brick layout"
    );

    Ok(subvols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProvisionerType, VolumeCreateRequest};
    use crate::planner::sizing::{normalize_size, GIB, MIB, TIB};
    use crate::planner::topology::resolve;
    use assert_matches::assert_matches;

    fn layout(req: &VolumeCreateRequest) -> Result<Vec<SubvolumeLayout>> {
        let config = PlannerConfig::default();
        let volume = resolve(req, &config)?;
        generate_layout(&volume, &config)
    }

    #[test]
    fn test_distribute_layout() {
        let req = VolumeCreateRequest::new("gv0", 10 * GIB);
        let subvols = layout(&req).unwrap();
        assert_eq!(subvols.len(), 1);
        assert_eq!(subvols[0].subvol_type, SubvolumeType::Distribute);
        assert_eq!(subvols[0].bricks.len(), 1);
        assert_eq!(subvols[0].bricks[0].size, 10 * GIB);
        assert_eq!(subvols[0].bricks[0].brick_type, BrickType::Brick);
    }

    #[test]
    fn test_replicate_layout() {
        let mut req = VolumeCreateRequest::new("gv0", 300 * GIB);
        req.replica_count = 3;
        let subvols = layout(&req).unwrap();
        assert_eq!(subvols.len(), 1);
        assert_eq!(subvols[0].subvol_type, SubvolumeType::Replicate);
        assert_eq!(subvols[0].replica_count, 3);
        assert_eq!(subvols[0].bricks.len(), 3);
        for brick in &subvols[0].bricks {
            assert_eq!(brick.size, 100 * GIB);
            assert_eq!(brick.brick_type, BrickType::Brick);
        }
    }

    #[test]
    fn test_arbiter_layout() {
        let mut req = VolumeCreateRequest::new("gv0", 64 * GIB);
        req.replica_count = 3;
        req.arbiter_count = 1;
        let subvols = layout(&req).unwrap();
        let bricks = &subvols[0].bricks;
        assert_eq!(bricks.len(), 3);
        assert_eq!(bricks[0].brick_type, BrickType::Brick);
        assert_eq!(bricks[1].brick_type, BrickType::Brick);
        assert_eq!(bricks[2].brick_type, BrickType::Arbiter);
        // 1M files of 64 KiB, 4 KiB each
        assert_eq!(bricks[2].size, 4 * GIB);
        assert_eq!(bricks[0].size, normalize_size(64 * GIB / 3));
        assert_eq!(bricks[1].size, bricks[0].size);
    }

    #[test]
    fn test_arbiter_size_floor() {
        let mut req = VolumeCreateRequest::new("gv0", 120 * MIB);
        req.replica_count = 3;
        req.arbiter_count = 1;
        let subvols = layout(&req).unwrap();
        assert_eq!(subvols[0].bricks[0].size, 40 * MIB);
        assert_eq!(subvols[0].bricks[2].size, 20 * MIB);
    }

    #[test]
    fn test_disperse_layout() {
        let mut req = VolumeCreateRequest::new("gv0", 40 * GIB);
        req.disperse_data_count = 4;
        req.disperse_redundancy_count = 2;
        let subvols = layout(&req).unwrap();
        assert_eq!(subvols.len(), 1);
        let bricks = &subvols[0].bricks;
        assert_eq!(subvols[0].disperse_count, 6);
        assert_eq!(bricks.len(), 6);
        for brick in bricks {
            assert_eq!(brick.size, 10 * GIB);
        }
        let roles: Vec<_> = bricks.iter().map(|b| b.brick_type).collect();
        assert_eq!(
            roles,
            vec![
                BrickType::Brick,
                BrickType::Brick,
                BrickType::Brick,
                BrickType::Brick,
                BrickType::Parity,
                BrickType::Parity,
            ]
        );
    }

    #[test]
    fn test_loop_distribute_layout() {
        let mut req = VolumeCreateRequest::new("gv0", 1000 * GIB);
        req.provisioner_type = ProvisionerType::Loop;
        req.max_brick_size = 100 * GIB;
        let subvols = layout(&req).unwrap();
        assert_eq!(subvols.len(), 10);
        for (i, sv) in subvols.iter().enumerate() {
            assert_eq!(sv.bricks.len(), 1);
            assert_eq!(sv.bricks[0].size, 100 * GIB);
            assert_eq!(sv.bricks[0].tp_name, format!("tp_gv0_s{}_b1", i + 1));
            assert!(sv.bricks[0].mount_options.ends_with(",loop"));
        }
    }

    #[test]
    fn test_size_truncation() {
        let mut req = VolumeCreateRequest::new("gv0", TIB + 5);
        req.distribute_count = 4;
        let subvols = layout(&req).unwrap();
        let total: u64 = subvols.iter().map(|sv| sv.bricks[0].size).sum();
        assert_eq!(total, TIB);
        assert!(req.size - total < 4 + 4 * 512);
    }

    #[test]
    fn test_brick_too_small_after_subdivision() {
        let mut req = VolumeCreateRequest::new("gv0", 60 * MIB);
        req.disperse_data_count = 4;
        req.disperse_redundancy_count = 2;
        assert_matches!(layout(&req), Err(Error::BrickTooSmall { .. }));

        let mut req = VolumeCreateRequest::new("gv0", 30 * MIB);
        req.distribute_count = 2;
        assert_matches!(layout(&req), Err(Error::BrickTooSmall { .. }));

        // Replica share below the minimum
        let mut req = VolumeCreateRequest::new("gv0", 50 * MIB);
        req.replica_count = 3;
        assert_matches!(layout(&req), Err(Error::BrickTooSmall { .. }));
    }

    #[test]
    fn test_huge_distribute_count_fails_before_building() {
        let mut req = VolumeCreateRequest::new("gv0", GIB);
        req.distribute_count = u32::MAX;
        assert_matches!(
            layout(&req),
            Err(Error::BrickTooSmall { size: 0, minimum }) if minimum == 20 * MIB
        );
    }

    #[test]
    fn test_strategy_dispatch() {
        let config = PlannerConfig::default();
        let mut req = VolumeCreateRequest::new("gv0", 10 * GIB);
        req.replica_count = 2;
        let volume = resolve(&req, &config).unwrap();
        let strategy = LayoutStrategy::new(&volume, 10 * GIB, &config);
        assert_eq!(
            strategy,
            LayoutStrategy::Replicate {
                brick_size: 5 * GIB,
                replica_count: 2,
                arbiter_size: None,
            }
        );
        assert_eq!(strategy.brick_count(), 2);
    }
}
