//! Carton selection strategies and item grouping.
//!
//! Given one item type, the candidate carton catalog and a remaining
//! quantity, the optimizer scores every eligible carton and picks the best
//! one under the configured strategy. It also groups shape-identical items so
//! the controller can process them as one batch.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geometry;
use crate::model::{CartonType, Item, ItemEntry};

/// Objective used to rank carton candidates.
///
/// A closed set: each variant dispatches to its own three-way comparator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PackingStrategy {
    /// Fewest physical cartons, then least wasted capacity, then cost.
    #[default]
    MinimizeCartons,
    /// Least wasted capacity, then best efficiency, then cost.
    MinimizeWaste,
    /// Best efficiency, then least wasted capacity, then cost.
    MaximizeEfficiency,
}

impl PackingStrategy {
    /// The strategy's wire name (matches the serde representation).
    pub fn name(&self) -> &'static str {
        match self {
            PackingStrategy::MinimizeCartons => "minimize_cartons",
            PackingStrategy::MinimizeWaste => "minimize_waste",
            PackingStrategy::MaximizeEfficiency => "maximize_efficiency",
        }
    }
}

impl std::fmt::Display for PackingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A scored carton candidate for one item type and remaining quantity.
#[derive(Clone, Debug)]
pub struct CartonChoice {
    pub carton: CartonType,
    /// Maximum units one carton of this type holds.
    pub fit_capacity: u64,
    /// Units that would go into the next carton.
    pub units_to_pack: u64,
    /// Whole cartons required for the full remaining quantity.
    pub cartons_needed: u64,
    /// Surplus capacity across those cartons.
    pub waste_units: u64,
    pub efficiency: f64,
    pub cost_score: f64,
}

impl CartonChoice {
    fn score(item: &Item, carton: &CartonType, fit_capacity: u64, remaining_qty: u64) -> Self {
        let units_to_pack = remaining_qty.min(fit_capacity);
        let cartons_needed = remaining_qty.div_ceil(fit_capacity);
        let waste_units = cartons_needed * fit_capacity - remaining_qty;
        let efficiency =
            geometry::packing_efficiency(item.volume, carton.volume, units_to_pack);
        let cost_score = carton.cost_per_unit * cartons_needed as f64;
        Self {
            carton: carton.clone(),
            fit_capacity,
            units_to_pack,
            cartons_needed,
            waste_units,
            efficiency,
            cost_score,
        }
    }

    /// Three-way comparison under the given strategy; `Less` means better.
    fn compare(&self, other: &Self, strategy: PackingStrategy) -> Ordering {
        match strategy {
            PackingStrategy::MinimizeCartons => self
                .cartons_needed
                .cmp(&other.cartons_needed)
                .then_with(|| self.waste_units.cmp(&other.waste_units))
                .then_with(|| self.cost_score.total_cmp(&other.cost_score)),
            PackingStrategy::MinimizeWaste => self
                .waste_units
                .cmp(&other.waste_units)
                .then_with(|| other.efficiency.total_cmp(&self.efficiency))
                .then_with(|| self.cost_score.total_cmp(&other.cost_score)),
            PackingStrategy::MaximizeEfficiency => other
                .efficiency
                .total_cmp(&self.efficiency)
                .then_with(|| self.waste_units.cmp(&other.waste_units))
                .then_with(|| self.cost_score.total_cmp(&other.cost_score)),
        }
    }
}

/// Finds the best carton for `item` under `strategy`, or `None` if no carton
/// type can hold even one unit.
///
/// Disabled cartons are never considered; fragile items only see
/// fragile-safe cartons. On a full tie the earlier catalog entry wins.
pub fn find_optimal_carton_assignment(
    item: &Item,
    cartons: &[CartonType],
    remaining_qty: u64,
    strategy: PackingStrategy,
) -> Option<CartonChoice> {
    let mut best: Option<CartonChoice> = None;

    for carton in cartons {
        if carton.disabled {
            continue;
        }
        if item.fragile && !carton.fragile_safe {
            continue;
        }

        let fit_capacity = geometry::max_units_fit(item, carton);
        if fit_capacity == 0 {
            continue;
        }

        let candidate = CartonChoice::score(item, carton, fit_capacity, remaining_qty);
        match &best {
            Some(current) if candidate.compare(current, strategy) != Ordering::Less => {}
            _ => best = Some(candidate),
        }
    }

    best
}

/// A group of shape-identical items processed as one batch.
#[derive(Clone, Debug)]
pub struct ItemGroup {
    /// Representative item used for all fit calculations.
    pub sample: Item,
    /// The original entries, in submission order.
    pub members: Vec<ItemEntry>,
    /// Summed quantity across all members.
    pub total_qty: u64,
}

/// Grouping key: dimension multiset plus weight, volume and fragility.
///
/// Bit-level float comparison on purpose; grouping is exact, with no
/// tolerance.
#[derive(PartialEq, Eq)]
struct GroupKey {
    dims: [u64; 3],
    weight: u64,
    volume: u64,
    fragile: bool,
}

impl GroupKey {
    fn of(item: &Item) -> Self {
        let mut dims = [item.length, item.width, item.height];
        dims.sort_by(f64::total_cmp);
        Self {
            dims: dims.map(f64::to_bits),
            weight: item.weight.to_bits(),
            volume: item.volume.to_bits(),
            fragile: item.fragile,
        }
    }
}

/// Groups items whose dimension multiset, weight, volume and fragility all
/// match exactly, preserving first-seen order.
pub fn group_similar_items(entries: &[ItemEntry]) -> Vec<ItemGroup> {
    let mut keys: Vec<GroupKey> = Vec::new();
    let mut groups: Vec<ItemGroup> = Vec::new();

    for entry in entries {
        let key = GroupKey::of(&entry.item);
        match keys.iter().position(|k| *k == key) {
            Some(idx) => {
                groups[idx].members.push(entry.clone());
                groups[idx].total_qty += entry.quantity;
            }
            None => {
                keys.push(key);
                groups.push(ItemGroup {
                    sample: entry.item.clone(),
                    members: vec![entry.clone()],
                    total_qty: entry.quantity,
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, dims: (f64, f64, f64), weight: f64, volume: f64) -> Item {
        Item::new(id, dims, weight, volume, false).unwrap()
    }

    fn carton(id: &str, dims: (f64, f64, f64), cost: f64) -> CartonType {
        let volume = dims.0 * dims.1 * dims.2;
        CartonType::new(id, dims, volume, 0.0, cost).unwrap()
    }

    fn entry(item: Item, quantity: u64) -> ItemEntry {
        ItemEntry { item, quantity }
    }

    #[test]
    fn returns_none_when_nothing_fits() {
        let item = item("A", (50.0, 50.0, 50.0), 1.0, 125_000.0);
        let cartons = vec![carton("C1", (10.0, 10.0, 10.0), 1.0)];
        assert!(
            find_optimal_carton_assignment(&item, &cartons, 10, PackingStrategy::default())
                .is_none()
        );
    }

    #[test]
    fn skips_disabled_cartons() {
        let item = item("A", (10.0, 10.0, 10.0), 1.0, 1000.0);
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 1.0).with_disabled(true)];
        assert!(
            find_optimal_carton_assignment(&item, &cartons, 10, PackingStrategy::default())
                .is_none()
        );
    }

    #[test]
    fn fragile_items_require_fragile_safe_cartons() {
        let item = Item::new("A", (10.0, 10.0, 10.0), 1.0, 1000.0, true).unwrap();
        let unsafe_carton = carton("C1", (100.0, 100.0, 100.0), 1.0);
        let safe_carton = carton("C2", (50.0, 50.0, 50.0), 1.0).with_fragile_safe(true);

        let choice = find_optimal_carton_assignment(
            &item,
            &[unsafe_carton, safe_carton],
            10,
            PackingStrategy::default(),
        )
        .expect("safe carton should be selected");
        assert_eq!(choice.carton.id, "C2");
    }

    #[test]
    fn scoring_example() {
        // 1000 units fit, qty 100: one carton, 900 waste units.
        let item = item("A", (10.0, 10.0, 10.0), 1.0, 1000.0);
        let carton = CartonType::new("C1", (100.0, 100.0, 100.0), 1e6, 1000.0, 1.0).unwrap();
        let choice =
            find_optimal_carton_assignment(&item, &[carton], 100, PackingStrategy::default())
                .unwrap();
        assert_eq!(choice.fit_capacity, 1000);
        assert_eq!(choice.units_to_pack, 100);
        assert_eq!(choice.cartons_needed, 1);
        assert_eq!(choice.waste_units, 900);
    }

    #[test]
    fn strategies_can_disagree() {
        // qty 30: the big carton holds all 30 in one box but wastes 70 units;
        // the small carton needs 2 boxes but wastes none.
        let item = item("A", (10.0, 10.0, 10.0), 0.0, 1000.0);
        let big = carton("BIG", (100.0, 100.0, 10.0), 1.0); // 100 per carton
        let small = carton("SMALL", (50.0, 30.0, 10.0), 1.0); // 15 per carton

        let cartons = vec![big, small];
        let fewest =
            find_optimal_carton_assignment(&item, &cartons, 30, PackingStrategy::MinimizeCartons)
                .unwrap();
        assert_eq!(fewest.carton.id, "BIG");
        assert_eq!(fewest.cartons_needed, 1);

        let tightest =
            find_optimal_carton_assignment(&item, &cartons, 30, PackingStrategy::MinimizeWaste)
                .unwrap();
        assert_eq!(tightest.carton.id, "SMALL");
        assert_eq!(tightest.waste_units, 0);
    }

    #[test]
    fn maximize_efficiency_prefers_fuller_carton() {
        let item = item("A", (10.0, 10.0, 10.0), 0.0, 1000.0);
        // Small carton is 100% full with 15 units; big carton only 30%.
        let big = carton("BIG", (100.0, 100.0, 10.0), 1.0);
        let small = carton("SMALL", (50.0, 30.0, 10.0), 1.0);

        let choice = find_optimal_carton_assignment(
            &item,
            &[big, small],
            30,
            PackingStrategy::MaximizeEfficiency,
        )
        .unwrap();
        assert_eq!(choice.carton.id, "SMALL");
    }

    #[test]
    fn tie_prefers_earlier_catalog_entry() {
        let item = item("A", (10.0, 10.0, 10.0), 0.0, 1000.0);
        let first = carton("FIRST", (20.0, 20.0, 10.0), 1.0);
        let second = carton("SECOND", (20.0, 20.0, 10.0), 1.0);

        let choice = find_optimal_carton_assignment(
            &item,
            &[first, second],
            4,
            PackingStrategy::default(),
        )
        .unwrap();
        assert_eq!(choice.carton.id, "FIRST");
    }

    #[test]
    fn groups_rotated_duplicates_together() {
        let entries = vec![
            entry(item("A", (10.0, 20.0, 30.0), 1.0, 6000.0), 5),
            entry(item("B", (30.0, 10.0, 20.0), 1.0, 6000.0), 7),
        ];
        let groups = group_similar_items(&entries);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total_qty, 12);
        assert_eq!(groups[0].sample.id, "A");
        assert_eq!(groups[0].members.len(), 2);
    }

    #[test]
    fn grouping_is_exact_on_weight_volume_and_fragility() {
        let entries = vec![
            entry(item("A", (10.0, 20.0, 30.0), 1.0, 6000.0), 5),
            entry(item("B", (10.0, 20.0, 30.0), 2.0, 6000.0), 5),
            entry(Item::new("C", (10.0, 20.0, 30.0), 1.0, 6000.0, true).unwrap(), 5),
        ];
        let groups = group_similar_items(&entries);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn strategy_names_round_trip_through_serde() {
        for (strategy, name) in [
            (PackingStrategy::MinimizeCartons, "\"minimize_cartons\""),
            (PackingStrategy::MinimizeWaste, "\"minimize_waste\""),
            (PackingStrategy::MaximizeEfficiency, "\"maximize_efficiency\""),
        ] {
            assert_eq!(serde_json::to_string(&strategy).unwrap(), name);
            let parsed: PackingStrategy = serde_json::from_str(name).unwrap();
            assert_eq!(parsed, strategy);
        }
    }
}
