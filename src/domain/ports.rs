//! Domain Ports - Boundaries toward the device inventory
//!
//! The planner never talks to peers or storage directly. An inventory
//! adapter supplies a point-in-time snapshot of candidate devices and
//! records the capacity consumed by accepted plans.

use super::plan::VolumePlan;
use super::request::VolumeCreateRequest;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Device
// =============================================================================

/// A volume group on one peer, as seen by one planning call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Peer owning the device
    pub peer_id: String,
    /// Volume group name
    pub name: String,
    /// Fault-domain label
    pub zone: String,
    /// Backing block device (or directory for loop-back bricks)
    pub device: String,
    /// Free bytes
    pub available_size: u64,
    /// Already holds at least one brick
    pub used: bool,
}

// =============================================================================
// Device Inventory Port
// =============================================================================

/// Port for device inventory access
#[async_trait]
pub trait DeviceInventory: Send + Sync {
    /// Snapshot of the devices eligible for `req`, in placement order
    async fn available_devices(&self, req: &VolumeCreateRequest) -> Result<Vec<Device>>;

    /// Record the capacity consumed by an accepted plan
    async fn reserve(&self, plan: &VolumePlan) -> Result<()>;

    /// Give back the capacity of a plan whose volume was deleted
    async fn release(&self, plan: &VolumePlan) -> Result<()>;
}

pub type DeviceInventoryRef = Arc<dyn DeviceInventory>;
