//! Geometry calculator for carton fitting.
//!
//! Pure functions computing unit-fit counts across the six axis-aligned
//! orientations, 3D placement grids for a full carton, packing efficiency,
//! and the canonical signature that identifies a placement pattern.

use sha2::{Digest, Sha256};

use crate::model::{CartonType, Item, Placement};

/// Truncated hex length of a pattern signature.
const SIGNATURE_LEN: usize = 12;

/// Returns the six axis-aligned orientations of an item's dimension triple.
///
/// The item has no front/back distinction, so the 24 rotations collapse to
/// the 6 orderings of (length, width, height). Order matters: ties between
/// equal-count orientations are broken by first-found position in this list.
fn orientations(item: &Item) -> [(f64, f64, f64); 6] {
    let (l, w, h) = (item.length, item.width, item.height);
    [
        (l, w, h),
        (l, h, w),
        (w, l, h),
        (w, h, l),
        (h, l, w),
        (h, w, l),
    ]
}

/// Calculates the volume of an item from its dimensions.
pub fn item_volume(length: f64, width: f64, height: f64) -> f64 {
    length * width * height
}

/// Integer fit count along one carton axis for one item dimension.
///
/// Non-positive item dimensions never fit; an item dimension larger than the
/// carton's yields 0 through the floor division.
fn axis_fit(carton_dim: f64, item_dim: f64) -> u64 {
    if item_dim <= 0.0 {
        return 0;
    }
    (carton_dim / item_dim).floor() as u64
}

/// Per-orientation axis fit counts, or `None` if any axis count is zero.
fn grid_fit(carton: &CartonType, oriented: (f64, f64, f64)) -> Option<(u64, u64, u64)> {
    let (l, w, h) = oriented;
    let fit_x = axis_fit(carton.length, l);
    let fit_y = axis_fit(carton.width, w);
    let fit_z = axis_fit(carton.height, h);
    if fit_x == 0 || fit_y == 0 || fit_z == 0 {
        return None;
    }
    Some((fit_x, fit_y, fit_z))
}

/// Achievable unit count for one orientation after all resource caps.
///
/// The raw geometric capacity is capped independently by the carton's volume
/// (when the item declares a volume) and by the carton's weight limit (when
/// both the limit and the item weight are positive).
fn capacity_for_orientation(item: &Item, carton: &CartonType, oriented: (f64, f64, f64)) -> u64 {
    let Some((fit_x, fit_y, fit_z)) = grid_fit(carton, oriented) else {
        return 0;
    };

    let fit_by_dim = fit_x.saturating_mul(fit_y).saturating_mul(fit_z);
    let fit_by_vol = if item.volume > 0.0 {
        (carton.volume / item.volume).floor() as u64
    } else {
        u64::MAX
    };
    let fit_by_wt = if carton.weight_limit > 0.0 && item.weight > 0.0 {
        (carton.weight_limit / item.weight).floor() as u64
    } else {
        u64::MAX
    };

    fit_by_dim.min(fit_by_vol).min(fit_by_wt)
}

/// Calculates the maximum units of `item` a single carton can hold.
///
/// Considers all six orientations and returns the best achievable count, or
/// 0 if no orientation fits at all.
pub fn max_units_fit(item: &Item, carton: &CartonType) -> u64 {
    orientations(item)
        .iter()
        .map(|&oriented| capacity_for_orientation(item, carton, oriented))
        .max()
        .unwrap_or(0)
}

/// Like [`max_units_fit`], but also generates one placement per unit for the
/// winning orientation.
///
/// The fit grid is iterated z-major, then rows (y), then columns (x), and
/// emission stops once the capped unit count is reached. Equal-count
/// orientations keep the first one found.
pub fn max_units_fit_with_positions(item: &Item, carton: &CartonType) -> (u64, Vec<Placement>) {
    let mut best_fit = 0u64;
    let mut best_orientation = None;

    for oriented in orientations(item) {
        let units = capacity_for_orientation(item, carton, oriented);
        if units > best_fit {
            best_fit = units;
            best_orientation = Some(oriented);
        }
    }

    let Some((l, w, h)) = best_orientation else {
        return (0, Vec::new());
    };

    // The orientation won, so the grid is non-degenerate here.
    let Some((fit_x, fit_y, fit_z)) = grid_fit(carton, (l, w, h)) else {
        return (0, Vec::new());
    };

    let rotated = (l, w, h) != (item.length, item.width, item.height);
    let grid_total = fit_x.saturating_mul(fit_y).saturating_mul(fit_z);
    let mut placements = Vec::with_capacity(best_fit.min(grid_total) as usize);

    'fill: for z in 0..fit_z {
        for y in 0..fit_y {
            for x in 0..fit_x {
                if placements.len() as u64 >= best_fit {
                    break 'fill;
                }
                placements.push(Placement {
                    x: x as f64 * l,
                    y: y as f64 * w,
                    z: z as f64 * h,
                    length: l,
                    width: w,
                    height: h,
                    rotated,
                });
            }
        }
    }

    (best_fit, placements)
}

/// Calculates how efficiently the carton space is used, in percent.
pub fn packing_efficiency(item_volume: f64, carton_volume: f64, units_packed: u64) -> f64 {
    if carton_volume <= 0.0 {
        return 0.0;
    }
    let used_volume = item_volume * units_packed as f64;
    (used_volume / carton_volume) * 100.0
}

/// Creates the canonical signature of a packing pattern.
///
/// Placements are sorted by (x, y, z) so the digest is independent of input
/// order; coordinates and dimensions are fixed to two decimals so the digest
/// is stable across platforms. Identical geometry for the same item/carton
/// pair always yields the same signature.
pub fn pattern_signature(item_id: &str, carton_id: &str, placements: &[Placement]) -> String {
    let mut sorted: Vec<&Placement> = placements.iter().collect();
    sorted.sort_by(|a, b| {
        a.x.total_cmp(&b.x)
            .then_with(|| a.y.total_cmp(&b.y))
            .then_with(|| a.z.total_cmp(&b.z))
    });

    let mut parts = Vec::with_capacity(sorted.len() + 1);
    parts.push(format!("{}:{}", item_id, carton_id));
    for pos in sorted {
        parts.push(format!(
            "{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{}",
            pos.x,
            pos.y,
            pos.z,
            pos.length,
            pos.width,
            pos.height,
            pos.rotated as u8
        ));
    }

    let digest = format!("{:x}", Sha256::digest(parts.join("|").as_bytes()));
    digest[..SIGNATURE_LEN].to_string()
}
