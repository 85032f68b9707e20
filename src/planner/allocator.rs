//! Zone-Aware Greedy Allocator
//!
//! Places every brick of a layout on a device in two first-fit passes:
//! fresh devices first, then any device with room left. Bricks of one
//! subvolume never share a zone.
//!
//! The zone-used set lives for the whole call and is only cleared at the
//! start of a subvolume when `subvol_zones_overlap` is set. Without the
//! flag a zone used by one subvolume stays closed for all later ones.

use crate::domain::{
    Brick, BrickPlacement, BrickSpec, Device, ProvisionerType, Subvolume, SubvolumeLayout,
};
use crate::error::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Knobs of one allocation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationOptions {
    pub provisioner_type: ProvisionerType,
    pub subvol_zones_overlap: bool,
}

/// Placed subvolumes plus the working copy of the inventory they consumed
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub subvolumes: Vec<Subvolume>,
    pub devices: Vec<Device>,
}

/// Which devices a pass may pick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Only devices not holding a brick yet
    Fresh,
    /// Any device with enough space
    Reuse,
}

fn device_path(device: &Device, brick: &BrickSpec, provisioner: ProvisionerType) -> String {
    match provisioner {
        ProvisionerType::Lvm => format!("/dev/{}/{}", device.name, brick.lv_name),
        ProvisionerType::Loop => {
            format!("{}/{}/{}.img", device.device, brick.tp_name, brick.lv_name)
        }
    }
}

/// First device in inventory order that fits `brick`
fn find_device(
    devices: &[Device],
    brick: &BrickSpec,
    zones: &HashSet<String>,
    pass: Pass,
) -> Option<usize> {
    devices.iter().position(|d| {
        d.available_size >= brick.total_size
            && !zones.contains(&d.zone)
            && (pass == Pass::Reuse || !d.used)
    })
}

fn run_pass(
    pass: Pass,
    bricks: &[BrickSpec],
    placements: &mut [Option<BrickPlacement>],
    devices: &mut [Device],
    zones: &mut HashSet<String>,
    provisioner: ProvisionerType,
) {
    for (brick, slot) in bricks.iter().zip(placements.iter_mut()) {
        if slot.is_some() {
            continue;
        }
        let Some(idx) = find_device(devices, brick, zones, pass) else {
            continue;
        };

        let device = &mut devices[idx];
        *slot = Some(BrickPlacement {
            peer_id: device.peer_id.clone(),
            vg_name: device.name.clone(),
            root_device: device.device.clone(),
            device_path: device_path(device, brick, provisioner),
        });

        zones.insert(device.zone.clone());
        device.available_size -= brick.total_size;
        device.used = true;

        debug!(
            brick = %brick.path,
            peer = %device.peer_id,
            vg = %device.name,
            zone = %device.zone,
            ?pass,
            "Placed brick"
        );
    }
}

/// Place every brick of `layout` on the `devices` working copy
///
/// Fails without returning anything when the inventory is empty or a
/// subvolume cannot be fully placed.
pub fn allocate(
    layout: Vec<SubvolumeLayout>,
    mut devices: Vec<Device>,
    options: AllocationOptions,
) -> Result<Allocation> {
    if devices.is_empty() {
        return Err(Error::NoDevicesAvailable);
    }

    let mut zones: HashSet<String> = HashSet::new();
    let mut subvolumes = Vec::with_capacity(layout.len());

    for (idx, sv) in layout.into_iter().enumerate() {
        if options.subvol_zones_overlap {
            zones.clear();
        }

        let mut placements: Vec<Option<BrickPlacement>> = vec![None; sv.bricks.len()];

        run_pass(
            Pass::Fresh,
            &sv.bricks,
            &mut placements,
            &mut devices,
            &mut zones,
            options.provisioner_type,
        );

        if placements.iter().any(Option::is_none) {
            run_pass(
                Pass::Reuse,
                &sv.bricks,
                &mut placements,
                &mut devices,
                &mut zones,
                options.provisioner_type,
            );
        }

        let unplaced = placements.iter().filter(|p| p.is_none()).count();
        if unplaced > 0 {
            warn!(
                subvolume = idx + 1,
                unplaced,
                total = sv.bricks.len(),
                "Not enough device capacity to place subvolume"
            );
            return Err(Error::InsufficientCapacity {
                subvolume: idx + 1,
                unplaced,
                total: sv.bricks.len(),
            });
        }

        let bricks = sv
            .bricks
            .into_iter()
            .zip(placements.into_iter().flatten())
            .map(|(spec, placement)| Brick { spec, placement })
            .collect();

        subvolumes.push(Subvolume {
            subvol_type: sv.subvol_type,
            bricks,
            replica_count: sv.replica_count,
            arbiter_count: sv.arbiter_count,
            disperse_count: sv.disperse_count,
        });
    }

    Ok(Allocation {
        subvolumes,
        devices,
    })
}
