//! Brick Plan Types
//!
//! Values produced by the planning pipeline: the resolved topology, the
//! unplaced brick layout and the final placed plan handed to the
//! orchestration layer.

use super::request::ProvisionerType;
use crate::error::Error;
use serde::{Deserialize, Serialize};

// =============================================================================
// Subvolume & Brick Types
// =============================================================================

/// Redundancy scheme of a subvolume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubvolumeType {
    /// Single brick, no redundancy
    #[default]
    Distribute,
    /// Full copies of the data on every brick
    Replicate,
    /// Erasure coded across data and redundancy bricks
    Disperse,
}

impl std::fmt::Display for SubvolumeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubvolumeType::Distribute => write!(f, "distribute"),
            SubvolumeType::Replicate => write!(f, "replicate"),
            SubvolumeType::Disperse => write!(f, "disperse"),
        }
    }
}

impl std::str::FromStr for SubvolumeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "distribute" => Ok(SubvolumeType::Distribute),
            "replicate" => Ok(SubvolumeType::Replicate),
            "disperse" => Ok(SubvolumeType::Disperse),
            _ => Err(Error::UnsupportedSubvolumeType(s.to_string())),
        }
    }
}

/// Role of a brick inside its subvolume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrickType {
    /// Regular data brick
    #[default]
    Brick,
    /// Replicate arbiter holding metadata only
    Arbiter,
    /// Disperse redundancy brick
    Parity,
}

impl std::fmt::Display for BrickType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrickType::Brick => write!(f, "brick"),
            BrickType::Arbiter => write!(f, "arbiter"),
            BrickType::Parity => write!(f, "parity"),
        }
    }
}

// =============================================================================
// Resolved Volume
// =============================================================================

/// A validated request with every derived count filled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVolume {
    pub name: String,
    /// Requested capacity in bytes
    pub size: u64,
    pub subvol_type: SubvolumeType,
    pub replica_count: u32,
    pub arbiter_count: u32,
    pub disperse_count: u32,
    pub disperse_data_count: u32,
    pub disperse_redundancy_count: u32,
    /// Number of subvolumes (0 when not derived or requested, meaning 1)
    pub distribute_count: u32,
    /// Effective max brick size (0 = unbounded)
    pub max_brick_size: u64,
    pub provisioner_type: ProvisionerType,
    pub snapshot_reserve_factor: f64,
    pub average_file_size: u64,
    pub subvol_zones_overlap: bool,
}

impl ResolvedVolume {
    /// Number of subvolumes the layout will contain
    pub fn subvolume_count(&self) -> u32 {
        self.distribute_count.max(1)
    }

    /// Capacity assigned to each subvolume; any remainder of the integer
    /// division is dropped
    pub fn subvolume_size(&self) -> u64 {
        self.size / u64::from(self.subvolume_count())
    }
}

// =============================================================================
// Bricks
// =============================================================================

/// Sizing and naming of a brick, before placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickSpec {
    pub brick_type: BrickType,
    /// Brick directory (mount point plus `brick_dir_suffix`)
    pub path: String,
    pub brick_dir_suffix: String,
    /// Thin pool name
    pub tp_name: String,
    /// Thin logical volume name
    pub lv_name: String,
    /// Nominal brick size in bytes
    pub size: u64,
    pub tp_size: u64,
    pub tp_metadata_size: u64,
    /// Space consumed on the device: pool plus metadata
    pub total_size: u64,
    pub fs_type: String,
    pub mount_options: String,
}

/// Where a brick lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickPlacement {
    pub peer_id: String,
    /// Volume group (device) name
    pub vg_name: String,
    /// Backing device of the volume group
    pub root_device: String,
    /// Block device or image file holding the brick filesystem
    pub device_path: String,
}

/// A placed brick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brick {
    #[serde(flatten)]
    pub spec: BrickSpec,
    #[serde(flatten)]
    pub placement: BrickPlacement,
}

// =============================================================================
// Subvolumes
// =============================================================================

/// Subvolume with sized and named bricks that are not yet placed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubvolumeLayout {
    pub subvol_type: SubvolumeType,
    pub bricks: Vec<BrickSpec>,
    pub replica_count: u32,
    pub arbiter_count: u32,
    pub disperse_count: u32,
}

/// Subvolume whose bricks are all placed on devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subvolume {
    pub subvol_type: SubvolumeType,
    pub bricks: Vec<Brick>,
    pub replica_count: u32,
    pub arbiter_count: u32,
    pub disperse_count: u32,
}

// =============================================================================
// Volume Plan
// =============================================================================

/// Complete output of one planning call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePlan {
    pub volume: ResolvedVolume,
    pub subvolumes: Vec<Subvolume>,
}

impl VolumePlan {
    /// All bricks in subvolume order
    pub fn bricks(&self) -> impl Iterator<Item = &Brick> {
        self.subvolumes.iter().flat_map(|sv| sv.bricks.iter())
    }

    /// Device space the plan consumes across the cluster
    pub fn total_device_usage(&self) -> u64 {
        self.bricks().map(|b| b.spec.total_size).sum()
    }
}
