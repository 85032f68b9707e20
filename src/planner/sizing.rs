//! Units and thin-provisioning size arithmetic

use crate::error::{Error, Result};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;
pub const TIB: u64 = 1024 * GIB;
pub const PIB: u64 = 1024 * TIB;

/// Smallest brick the planner will produce
pub const MIN_BRICK_SIZE: u64 = 20 * MIB;

/// Max (and default) brick size for loop-back bricks
pub const DEFAULT_MAX_LOOP_BRICK_SIZE: u64 = 100 * GIB;

/// LVM allocation granularity
pub const SECTOR_SIZE: u64 = 512;

/// Upper bound for thin pool metadata
pub const MAX_POOL_METADATA_SIZE: u64 = 16 * GIB;

/// Round a size down to the LVM allocation granularity
#[inline]
pub fn normalize_size(size: u64) -> u64 {
    size - size % SECTOR_SIZE
}

/// Thin pool metadata size for a pool: 0.5% of the pool, at most 16 GiB
pub fn pool_metadata_size(pool_size: u64) -> u64 {
    normalize_size((pool_size / 200).min(MAX_POOL_METADATA_SIZE))
}

/// Thin pool size holding a brick plus its snapshot reserve, or `None`
/// when it does not fit in a u64
pub fn thin_pool_size(brick_size: u64, snapshot_reserve_factor: f64) -> Option<u64> {
    let size = brick_size as f64 * snapshot_reserve_factor;
    if !size.is_finite() || size < 0.0 || size >= u64::MAX as f64 {
        return None;
    }
    Some(normalize_size(size as u64))
}

/// Parse a capacity string (e.g. "100GiB", "1Ti", "512") to bytes
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::CapacityParse("empty capacity string".into()));
    }

    let num_end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let num_str = &s[..num_end];
    let unit_str = s[num_end..].trim();

    let multiplier: u64 = match unit_str.to_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KI" | "KIB" => KIB,
        "M" | "MB" | "MI" | "MIB" => MIB,
        "G" | "GB" | "GI" | "GIB" => GIB,
        "T" | "TB" | "TI" | "TIB" => TIB,
        "P" | "PB" | "PI" | "PIB" => PIB,
        _ => {
            return Err(Error::CapacityParse(format!(
                "unknown unit: {}",
                unit_str
            )))
        }
    };

    // Whole numbers stay exact; fractions go through f64
    if let Ok(whole) = num_str.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| Error::CapacityParse(format!("capacity overflows: {}", s)));
    }

    let num: f64 = num_str
        .parse()
        .map_err(|_| Error::CapacityParse(format!("invalid number: {}", num_str)))?;
    let bytes = num * multiplier as f64;
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(Error::CapacityParse(format!("capacity overflows: {}", s)));
    }
    Ok(bytes as u64)
}

/// Render a byte count with the largest binary unit that fits
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 5] = [
        (PIB, "PiB"),
        (TIB, "TiB"),
        (GIB, "GiB"),
        (MIB, "MiB"),
        (KIB, "KiB"),
    ];
    for (unit, suffix) in UNITS {
        if bytes >= unit {
            return format!("{:.2}{}", bytes as f64 / unit as f64, suffix);
        }
    }
    format!("{}B", bytes)
}
