//! Volume Create Request
//!
//! The caller-supplied description of a volume: target capacity,
//! redundancy scheme, brick size limits and placement filters.

use serde::{Deserialize, Serialize};

// =============================================================================
// Provisioner Type
// =============================================================================

/// How bricks are backed on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionerType {
    /// Thin logical volume inside the device's volume group
    #[default]
    Lvm,
    /// Image file on the backing device, mounted over a loop device
    Loop,
}

impl std::fmt::Display for ProvisionerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionerType::Lvm => write!(f, "lvm"),
            ProvisionerType::Loop => write!(f, "loop"),
        }
    }
}

// =============================================================================
// Volume Create Request
// =============================================================================

/// Request to plan the bricks of a new volume
///
/// Counts left at zero are "unset"; the topology resolver derives them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeCreateRequest {
    /// Volume name, used in brick paths and LV names
    pub name: String,
    /// Requested usable capacity in bytes
    pub size: u64,
    /// Replica count (2 or 3 selects a replicate volume)
    pub replica_count: u32,
    /// Arbiter count (0 or 1)
    pub arbiter_count: u32,
    /// Bricks per disperse subvolume
    pub disperse_count: u32,
    /// Data bricks per disperse subvolume
    pub disperse_data_count: u32,
    /// Redundancy bricks per disperse subvolume
    pub disperse_redundancy_count: u32,
    /// Number of subvolumes in the distribute set
    pub distribute_count: u32,
    /// Upper bound for a single brick's size in bytes (0 = unbounded)
    pub max_brick_size: u64,
    /// Brick backing type
    pub provisioner_type: ProvisionerType,
    /// Thin pool size as a multiple of brick size (0 = configured default)
    pub snapshot_reserve_factor: f64,
    /// Allow subvolumes to reuse each other's zones
    pub subvol_zones_overlap: bool,
    /// Expected average file size, used to size arbiter bricks (0 = configured default)
    pub average_file_size: u64,
    /// Only place bricks on these peers
    pub limit_peers: Vec<String>,
    /// Never place bricks on these peers
    pub exclude_peers: Vec<String>,
    /// Only place bricks in these zones
    pub limit_zones: Vec<String>,
    /// Never place bricks in these zones
    pub exclude_zones: Vec<String>,
}

impl VolumeCreateRequest {
    /// Create a plain distribute request
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            ..Default::default()
        }
    }

    /// Check whether a device on `peer_id` in `zone` passes the
    /// request's peer and zone filters
    pub fn accepts(&self, peer_id: &str, zone: &str) -> bool {
        if !self.limit_peers.is_empty() && !self.limit_peers.iter().any(|p| p == peer_id) {
            return false;
        }
        if self.exclude_peers.iter().any(|p| p == peer_id) {
            return false;
        }
        if !self.limit_zones.is_empty() && !self.limit_zones.iter().any(|z| z == zone) {
            return false;
        }
        if self.exclude_zones.iter().any(|z| z == zone) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioner_display() {
        assert_eq!(ProvisionerType::Lvm.to_string(), "lvm");
        assert_eq!(ProvisionerType::Loop.to_string(), "loop");
    }

    #[test]
    fn test_deserialize_partial_request() {
        let req: VolumeCreateRequest = serde_json::from_str(
            r#"{"name": "gv0", "size": 1073741824, "replica_count": 3, "provisioner_type": "loop"}"#,
        )
        .unwrap();
        assert_eq!(req.name, "gv0");
        assert_eq!(req.replica_count, 3);
        assert_eq!(req.provisioner_type, ProvisionerType::Loop);
        assert_eq!(req.max_brick_size, 0);
        assert!(!req.subvol_zones_overlap);
    }

    #[test]
    fn test_accepts_filters() {
        let mut req = VolumeCreateRequest::new("gv0", 1);
        assert!(req.accepts("peer-1", "zone-a"));

        req.limit_peers = vec!["peer-1".into()];
        assert!(req.accepts("peer-1", "zone-a"));
        assert!(!req.accepts("peer-2", "zone-a"));

        req.exclude_zones = vec!["zone-a".into()];
        assert!(!req.accepts("peer-1", "zone-a"));
        assert!(req.accepts("peer-1", "zone-b"));

        let mut req = VolumeCreateRequest::new("gv0", 1);
        req.limit_zones = vec!["zone-b".into()];
        req.exclude_peers = vec!["peer-3".into()];
        assert!(!req.accepts("peer-1", "zone-a"));
        assert!(req.accepts("peer-1", "zone-b"));
        assert!(!req.accepts("peer-3", "zone-b"));
    }
}
