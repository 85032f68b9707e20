//! Bricks Planner Engine
//!
//! Binds the pure planning pipeline to a device inventory. Each call
//! plans against its own snapshot; `plan_and_reserve` additionally
//! serializes snapshot, planning and reservation so concurrent callers
//! never hand out the same capacity twice.

use super::plan_volume;
use crate::config::PlannerConfig;
use crate::domain::ports::DeviceInventoryRef;
use crate::domain::{VolumeCreateRequest, VolumePlan};
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Planner bound to a device inventory
pub struct BricksPlanner {
    config: PlannerConfig,
    inventory: DeviceInventoryRef,
    /// Held across snapshot, plan and reserve
    plan_lock: Mutex<()>,
}

impl BricksPlanner {
    /// Create a new planner
    pub fn new(config: PlannerConfig, inventory: DeviceInventoryRef) -> Arc<Self> {
        Arc::new(Self {
            config,
            inventory,
            plan_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Compute a plan without recording it in the inventory
    pub async fn plan(&self, req: &VolumeCreateRequest) -> Result<VolumePlan> {
        let devices = self.inventory.available_devices(req).await?;
        debug!(
            volume = %req.name,
            devices = devices.len(),
            "Fetched device snapshot"
        );
        plan_volume(req, &self.config, devices)
    }

    /// Compute a plan and reserve its capacity in the inventory
    pub async fn plan_and_reserve(&self, req: &VolumeCreateRequest) -> Result<VolumePlan> {
        let _guard = self.plan_lock.lock().await;
        let plan = self.plan(req).await?;
        self.inventory.reserve(&plan).await?;
        info!(volume = %plan.volume.name, "Reserved device capacity for plan");
        Ok(plan)
    }

    /// Return the capacity of a previously reserved plan
    pub async fn release(&self, plan: &VolumePlan) -> Result<()> {
        let _guard = self.plan_lock.lock().await;
        self.inventory.release(plan).await?;
        info!(volume = %plan.volume.name, "Released device capacity of plan");
        Ok(())
    }
}
