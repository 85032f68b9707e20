//! Brick Sizing & Path Builder
//!
//! Turns an abstract brick size into thin pool sizes, deterministic
//! names and mount options.

use crate::domain::{BrickSpec, BrickType, ProvisionerType, ResolvedVolume};
use crate::error::{Error, Result};
use crate::planner::sizing::{normalize_size, pool_metadata_size, thin_pool_size};

/// Mount options shared by every brick filesystem
pub const BRICK_MOUNT_OPTIONS: &str = "rw,inode64,noatime,nouuid,discard";

/// Filesystem created on every brick
pub const BRICK_FS_TYPE: &str = "xfs";

/// Directory inside the brick mount point that holds the data
pub const BRICK_DIR_SUFFIX: &str = "/brick";

/// Mount options for a provisioner type
pub fn mount_options(provisioner: ProvisionerType) -> String {
    match provisioner {
        ProvisionerType::Lvm => BRICK_MOUNT_OPTIONS.to_string(),
        ProvisionerType::Loop => format!("{},loop", BRICK_MOUNT_OPTIONS),
    }
}

fn pool_overflow(size: u64, factor: f64) -> Error {
    Error::Validation(format!(
        "thin pool for a {} byte brick with snapshot reserve factor {} is too large",
        size, factor
    ))
}

/// Builds the bricks of one volume
#[derive(Debug, Clone)]
pub struct BrickBuilder<'a> {
    bricks_root: &'a str,
    volume: &'a ResolvedVolume,
    min_brick_size: u64,
}

impl<'a> BrickBuilder<'a> {
    pub fn new(bricks_root: &'a str, volume: &'a ResolvedVolume, min_brick_size: u64) -> Self {
        Self {
            bricks_root,
            volume,
            min_brick_size,
        }
    }

    /// Size and name brick `brick_idx` of subvolume `subvol_idx` (both 1-based)
    pub fn build(
        &self,
        subvol_idx: usize,
        brick_idx: usize,
        size: u64,
        brick_type: BrickType,
    ) -> Result<BrickSpec> {
        if size < self.min_brick_size {
            return Err(Error::BrickTooSmall {
                size,
                minimum: self.min_brick_size,
            });
        }

        let name = &self.volume.name;
        let factor = self.volume.snapshot_reserve_factor;
        let tp_size = thin_pool_size(size, factor).ok_or_else(|| pool_overflow(size, factor))?;
        let tp_metadata_size = pool_metadata_size(tp_size);
        let total_size = tp_size
            .checked_add(tp_metadata_size)
            .ok_or_else(|| pool_overflow(size, factor))?;

        Ok(BrickSpec {
            brick_type,
            path: format!(
                "{}/{}/subvol{}/brick{}{}",
                self.bricks_root, name, subvol_idx, brick_idx, BRICK_DIR_SUFFIX
            ),
            brick_dir_suffix: BRICK_DIR_SUFFIX.to_string(),
            tp_name: format!("tp_{}_s{}_b{}", name, subvol_idx, brick_idx),
            lv_name: format!("brick_{}_s{}_b{}", name, subvol_idx, brick_idx),
            size: normalize_size(size),
            tp_size,
            tp_metadata_size,
            total_size,
            fs_type: BRICK_FS_TYPE.to_string(),
            mount_options: mount_options(self.volume.provisioner_type),
        })
    }
}
