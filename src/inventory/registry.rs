//! Device Registry
//!
//! Cluster-wide list of volume groups with their free space. Snapshots
//! handed to the planner are owned copies; accepted plans are applied
//! back through `reserve` and undone through `release`.

use crate::domain::{Device, DeviceInventory, VolumeCreateRequest, VolumePlan};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

// =============================================================================
// Registered Device
// =============================================================================

/// Whether a device may receive new bricks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    #[default]
    Enabled,
    Disabled,
}

/// A volume group known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredDevice {
    pub peer_id: String,
    /// Volume group name
    pub name: String,
    /// Fault-domain label; empty means the peer is its own zone
    #[serde(default)]
    pub zone: String,
    /// Backing block device
    pub device: String,
    /// Free bytes
    pub available_size: u64,
    /// Bricks currently carved from this device
    #[serde(default)]
    pub brick_count: u32,
    #[serde(default)]
    pub state: DeviceState,
}

impl RegisteredDevice {
    pub fn new(
        peer_id: impl Into<String>,
        name: impl Into<String>,
        zone: impl Into<String>,
        device: impl Into<String>,
        available_size: u64,
    ) -> Self {
        Self {
            peer_id: peer_id.into(),
            name: name.into(),
            zone: zone.into(),
            device: device.into(),
            available_size,
            brick_count: 0,
            state: DeviceState::Enabled,
        }
    }

    /// Zone used for placement
    pub fn effective_zone(&self) -> &str {
        if self.zone.is_empty() {
            &self.peer_id
        } else {
            &self.zone
        }
    }

    fn matches(&self, peer_id: &str, name: &str) -> bool {
        self.peer_id == peer_id && self.name == name
    }

    fn to_device(&self) -> Device {
        Device {
            peer_id: self.peer_id.clone(),
            name: self.name.clone(),
            zone: self.effective_zone().to_string(),
            device: self.device.clone(),
            available_size: self.available_size,
            used: self.brick_count > 0,
        }
    }
}

// =============================================================================
// Device Registry
// =============================================================================

/// Bytes and brick counts taken from each device
type DeviceUsage = HashMap<DeviceKey, (u64, u32)>;

/// (peer id, volume group name)
type DeviceKey = (String, String);

#[derive(Debug, Default)]
struct RegistryState {
    /// Registration order
    devices: Vec<RegisteredDevice>,
    /// Capacity held by each reserved volume
    reservations: HashMap<String, DeviceUsage>,
}

impl RegistryState {
    fn find(&self, peer_id: &str, name: &str) -> Option<&RegisteredDevice> {
        self.devices.iter().find(|d| d.matches(peer_id, name))
    }
}

/// In-memory device registry, kept in registration order
#[derive(Debug)]
pub struct DeviceRegistry {
    state: RwLock<RegistryState>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(RegistryState::default()),
        })
    }

    /// Create a registry pre-populated with `devices`
    pub fn with_devices(devices: Vec<RegisteredDevice>) -> Result<Arc<Self>> {
        for (i, d) in devices.iter().enumerate() {
            if devices[..i].iter().any(|o| o.matches(&d.peer_id, &d.name)) {
                return Err(Error::DeviceExists {
                    peer_id: d.peer_id.clone(),
                    name: d.name.clone(),
                });
            }
        }
        Ok(Arc::new(Self {
            state: RwLock::new(RegistryState {
                devices,
                reservations: HashMap::new(),
            }),
        }))
    }

    /// Register a new device
    pub async fn register_device(&self, device: RegisteredDevice) -> Result<()> {
        let mut state = self.state.write().await;
        if state.find(&device.peer_id, &device.name).is_some() {
            return Err(Error::DeviceExists {
                peer_id: device.peer_id,
                name: device.name,
            });
        }
        info!(
            peer = %device.peer_id,
            vg = %device.name,
            zone = %device.effective_zone(),
            available_size = device.available_size,
            "Registered device"
        );
        state.devices.push(device);
        Ok(())
    }

    /// Remove a device
    pub async fn remove_device(&self, peer_id: &str, name: &str) -> Result<RegisteredDevice> {
        let mut state = self.state.write().await;
        let idx = state
            .devices
            .iter()
            .position(|d| d.matches(peer_id, name))
            .ok_or_else(|| not_found(peer_id, name))?;
        Ok(state.devices.remove(idx))
    }

    /// Enable or disable a device for new bricks
    pub async fn set_device_state(&self, peer_id: &str, name: &str, state: DeviceState) -> Result<()> {
        let mut inner = self.state.write().await;
        let device = inner
            .devices
            .iter_mut()
            .find(|d| d.matches(peer_id, name))
            .ok_or_else(|| not_found(peer_id, name))?;
        device.state = state;
        debug!(peer = %peer_id, vg = %name, ?state, "Updated device state");
        Ok(())
    }

    /// All registered devices
    pub async fn devices(&self) -> Vec<RegisteredDevice> {
        self.state.read().await.devices.clone()
    }

    /// Whether `volume` currently holds reserved capacity
    pub async fn is_reserved(&self, volume: &str) -> bool {
        self.state.read().await.reservations.contains_key(volume)
    }

    /// Owned snapshot of the devices eligible for `req`, largest free
    /// space first; ties keep registration order
    pub async fn snapshot(&self, req: &VolumeCreateRequest) -> Vec<Device> {
        let state = self.state.read().await;
        let mut snapshot: Vec<Device> = state
            .devices
            .iter()
            .filter(|d| d.state == DeviceState::Enabled)
            .filter(|d| req.accepts(&d.peer_id, d.effective_zone()))
            .map(RegisteredDevice::to_device)
            .collect();
        snapshot.sort_by(|a, b| b.available_size.cmp(&a.available_size));
        snapshot
    }

    fn usage_by_device(plan: &VolumePlan) -> DeviceUsage {
        let mut usage = DeviceUsage::new();
        for brick in plan.bricks() {
            let key = (brick.placement.peer_id.clone(), brick.placement.vg_name.clone());
            let entry = usage.entry(key).or_default();
            entry.0 += brick.spec.total_size;
            entry.1 += 1;
        }
        usage
    }
}

fn key_of(device: &RegisteredDevice) -> DeviceKey {
    (device.peer_id.clone(), device.name.clone())
}

fn not_found(peer_id: &str, name: &str) -> Error {
    Error::DeviceNotFound {
        peer_id: peer_id.to_string(),
        name: name.to_string(),
    }
}

#[async_trait]
impl DeviceInventory for DeviceRegistry {
    async fn available_devices(&self, req: &VolumeCreateRequest) -> Result<Vec<Device>> {
        Ok(self.snapshot(req).await)
    }

    async fn reserve(&self, plan: &VolumePlan) -> Result<()> {
        let volume = &plan.volume.name;
        let usage = Self::usage_by_device(plan);
        let mut state = self.state.write().await;

        if state.reservations.contains_key(volume) {
            return Err(Error::AlreadyReserved {
                volume: volume.clone(),
            });
        }

        // Check everything before touching anything
        for ((peer_id, name), &(bytes, _)) in &usage {
            let device = state
                .find(peer_id, name)
                .ok_or_else(|| not_found(peer_id, name))?;
            if device.available_size < bytes {
                return Err(Error::DeviceCapacityExceeded {
                    peer_id: peer_id.clone(),
                    name: name.clone(),
                    requested: bytes,
                    available: device.available_size,
                });
            }
        }

        for device in state.devices.iter_mut() {
            if let Some(&(bytes, bricks)) = usage.get(&key_of(device)) {
                device.available_size -= bytes;
                device.brick_count += bricks;
            }
        }
        debug!(volume = %volume, devices = usage.len(), "Reserved plan capacity");
        state.reservations.insert(volume.clone(), usage);
        Ok(())
    }

    /// Returns what was recorded at reserve time, not what `plan` claims.
    /// Devices removed since then are skipped.
    async fn release(&self, plan: &VolumePlan) -> Result<()> {
        let volume = &plan.volume.name;
        let mut state = self.state.write().await;

        let usage = state
            .reservations
            .remove(volume)
            .ok_or_else(|| Error::NotReserved {
                volume: volume.clone(),
            })?;

        for device in state.devices.iter_mut() {
            if let Some(&(bytes, bricks)) = usage.get(&key_of(device)) {
                device.available_size = device.available_size.saturating_add(bytes);
                device.brick_count = device.brick_count.saturating_sub(bricks);
            }
        }
        debug!(volume = %volume, devices = usage.len(), "Released plan capacity");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::planner::plan_volume;
    use crate::planner::sizing::GIB;
    use assert_matches::assert_matches;

    fn dev(peer: &str, name: &str, zone: &str, size: u64) -> RegisteredDevice {
        RegisteredDevice::new(peer, name, zone, format!("/dev/{}", name), size)
    }

    #[tokio::test]
    async fn test_register_and_remove() {
        let registry = DeviceRegistry::new();
        registry.register_device(dev("p1", "vg1", "z1", GIB)).await.unwrap();
        assert_matches!(
            registry.register_device(dev("p1", "vg1", "z2", GIB)).await,
            Err(Error::DeviceExists { .. })
        );
        // Same VG name on another peer is a different device
        registry.register_device(dev("p2", "vg1", "z2", GIB)).await.unwrap();
        assert_eq!(registry.devices().await.len(), 2);

        let removed = registry.remove_device("p1", "vg1").await.unwrap();
        assert_eq!(removed.zone, "z1");
        assert_matches!(
            registry.remove_device("p1", "vg1").await,
            Err(Error::DeviceNotFound { .. })
        );
    }

    #[test]
    fn test_with_devices_rejects_duplicates() {
        let result = DeviceRegistry::with_devices(vec![
            dev("p1", "vg1", "z1", GIB),
            dev("p1", "vg1", "z1", GIB),
        ]);
        assert_matches!(result, Err(Error::DeviceExists { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_order_and_zone_fallback() {
        let registry = DeviceRegistry::with_devices(vec![
            dev("p1", "small", "z1", GIB),
            dev("p2", "big", "", 10 * GIB),
            dev("p3", "mid-a", "z3", 5 * GIB),
            dev("p4", "mid-b", "z4", 5 * GIB),
        ])
        .unwrap();

        let snapshot = registry.snapshot(&VolumeCreateRequest::new("gv0", GIB)).await;
        let names: Vec<_> = snapshot.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["big", "mid-a", "mid-b", "small"]);
        assert_eq!(snapshot[0].zone, "p2");
    }

    #[tokio::test]
    async fn test_snapshot_filters() {
        let registry = DeviceRegistry::with_devices(vec![
            dev("p1", "vg1", "z1", GIB),
            dev("p2", "vg2", "z2", GIB),
            dev("p3", "vg3", "z3", GIB),
        ])
        .unwrap();
        registry
            .set_device_state("p3", "vg3", DeviceState::Disabled)
            .await
            .unwrap();

        let mut req = VolumeCreateRequest::new("gv0", GIB);
        assert_eq!(registry.snapshot(&req).await.len(), 2);

        req.exclude_zones = vec!["z1".into()];
        let snapshot = registry.snapshot(&req).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "vg2");

        let mut req = VolumeCreateRequest::new("gv0", GIB);
        req.limit_peers = vec!["p1".into()];
        let snapshot = registry.snapshot(&req).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].peer_id, "p1");
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let registry = DeviceRegistry::with_devices(vec![
            dev("p1", "vg1", "z1", 10 * GIB),
            dev("p2", "vg2", "z2", 10 * GIB),
        ])
        .unwrap();
        let mut req = VolumeCreateRequest::new("gv0", 4 * GIB);
        req.replica_count = 2;

        let snapshot = registry.snapshot(&req).await;
        let plan = plan_volume(&req, &PlannerConfig::default(), snapshot).unwrap();
        let brick_total = plan.subvolumes[0].bricks[0].spec.total_size;

        registry.reserve(&plan).await.unwrap();
        for d in registry.devices().await {
            assert_eq!(d.available_size, 10 * GIB - brick_total);
            assert_eq!(d.brick_count, 1);
        }
        let snapshot = registry.snapshot(&req).await;
        assert!(snapshot.iter().all(|d| d.used));

        registry.release(&plan).await.unwrap();
        for d in registry.devices().await {
            assert_eq!(d.available_size, 10 * GIB);
            assert_eq!(d.brick_count, 0);
        }
    }

    #[tokio::test]
    async fn test_reserve_is_atomic() {
        let registry = DeviceRegistry::with_devices(vec![
            dev("p1", "vg1", "z1", 10 * GIB),
            dev("p2", "vg2", "z2", 10 * GIB),
        ])
        .unwrap();
        let mut req = VolumeCreateRequest::new("gv0", 4 * GIB);
        req.replica_count = 2;
        let plan = plan_volume(&req, &PlannerConfig::default(), registry.snapshot(&req).await).unwrap();

        // The device behind the second brick disappears before reserving
        let gone = &plan.subvolumes[0].bricks[1].placement;
        registry.remove_device(&gone.peer_id, &gone.vg_name).await.unwrap();

        assert_matches!(registry.reserve(&plan).await, Err(Error::DeviceNotFound { .. }));
        let remaining = registry.devices().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].available_size, 10 * GIB);
        assert_eq!(remaining[0].brick_count, 0);
        assert!(!registry.is_reserved("gv0").await);
    }

    async fn reserved_registry() -> (Arc<DeviceRegistry>, VolumePlan) {
        let registry = DeviceRegistry::with_devices(vec![
            dev("p1", "vg1", "z1", 10 * GIB),
            dev("p2", "vg2", "z2", 10 * GIB),
        ])
        .unwrap();
        let mut req = VolumeCreateRequest::new("gv0", 4 * GIB);
        req.replica_count = 2;
        let plan = plan_volume(&req, &PlannerConfig::default(), registry.snapshot(&req).await).unwrap();
        registry.reserve(&plan).await.unwrap();
        (registry, plan)
    }

    #[tokio::test]
    async fn test_release_twice_is_rejected() {
        let (registry, plan) = reserved_registry().await;

        registry.release(&plan).await.unwrap();
        assert_matches!(
            registry.release(&plan).await,
            Err(Error::NotReserved { volume }) if volume == "gv0"
        );
        for d in registry.devices().await {
            assert_eq!(d.available_size, 10 * GIB);
            assert_eq!(d.brick_count, 0);
        }
    }

    #[tokio::test]
    async fn test_release_of_unreserved_plan_is_rejected() {
        let registry = DeviceRegistry::with_devices(vec![
            dev("p1", "vg1", "z1", 10 * GIB),
            dev("p2", "vg2", "z2", 10 * GIB),
        ])
        .unwrap();
        let mut req = VolumeCreateRequest::new("gv0", 4 * GIB);
        req.replica_count = 2;
        let plan = plan_volume(&req, &PlannerConfig::default(), registry.snapshot(&req).await).unwrap();

        assert_matches!(registry.release(&plan).await, Err(Error::NotReserved { .. }));
        for d in registry.devices().await {
            assert_eq!(d.available_size, 10 * GIB);
        }
    }

    #[tokio::test]
    async fn test_reserve_twice_is_rejected() {
        let (registry, plan) = reserved_registry().await;
        let before = registry.devices().await;

        assert_matches!(
            registry.reserve(&plan).await,
            Err(Error::AlreadyReserved { .. })
        );
        assert_eq!(registry.devices().await, before);
        assert!(registry.is_reserved("gv0").await);
    }

    #[tokio::test]
    async fn test_release_skips_removed_devices() {
        let (registry, plan) = reserved_registry().await;
        let gone = &plan.subvolumes[0].bricks[0].placement;
        registry.remove_device(&gone.peer_id, &gone.vg_name).await.unwrap();

        registry.release(&plan).await.unwrap();
        let remaining = registry.devices().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].available_size, 10 * GIB);
        assert!(!registry.is_reserved("gv0").await);
    }

    #[test]
    fn test_deserialize_inventory() {
        let yaml = r#"
- peer_id: p1
  name: vg1
  zone: z1
  device: /dev/sdb
  available_size: 1073741824
- peer_id: p2
  name: vg2
  device: /dev/sdc
  available_size: 2147483648
  brick_count: 2
  state: disabled
"#;
        let devices: Vec<RegisteredDevice> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].state, DeviceState::Enabled);
        assert_eq!(devices[1].effective_zone(), "p2");
        assert_eq!(devices[1].brick_count, 2);
        assert_eq!(devices[1].state, DeviceState::Disabled);
    }
}
