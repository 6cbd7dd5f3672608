//! Packing controller: orchestrates a full carton suggestion run.
//!
//! Groups the submitted items, repeatedly asks the optimizer for a carton
//! choice, computes the full-capacity placement pattern, deduplicates
//! identical patterns by their signature and aggregates the final plan. One
//! run owns all of its state (the pattern registry in particular); there is
//! no cross-call state, so concurrent runs need no coordination.

use serde::Serialize;
use utoipa::ToSchema;

use crate::assignment::{AssignmentView, CartonAssignment};
use crate::geometry;
use crate::model::{CartonType, Item, ItemEntry};
use crate::optimizer::{self, PackingStrategy};

/// Tuning knobs for a controller run.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// A single batch never exceeds `items_per_carton * batch_cap_multiplier`
    /// units, bounding the carton count produced by one loop step.
    pub batch_cap_multiplier: u64,
}

impl EngineConfig {
    pub const DEFAULT_BATCH_CAP_MULTIPLIER: u64 = 10_000;

    /// Overrides the batch cap multiplier (builder style).
    pub fn with_batch_cap_multiplier(mut self, multiplier: u64) -> Self {
        self.batch_cap_multiplier = multiplier.max(1);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_cap_multiplier: Self::DEFAULT_BATCH_CAP_MULTIPLIER,
        }
    }
}

/// Structured validation failure, reported before any computation begins.
#[derive(Debug, Clone)]
pub enum PackingError {
    NoItems,
    NoCartons,
    InvalidItem { index: usize, reason: String },
    InvalidCarton { index: usize, reason: String },
}

impl std::fmt::Display for PackingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackingError::NoItems => write!(f, "Items must be a non-empty list"),
            PackingError::NoCartons => write!(f, "Cartons must be a non-empty list"),
            PackingError::InvalidItem { index, reason } => {
                write!(f, "Item {}: {}", index, reason)
            }
            PackingError::InvalidCarton { index, reason } => {
                write!(f, "Carton {}: {}", index, reason)
            }
        }
    }
}

impl std::error::Error for PackingError {}

/// An item quantity that could not be placed in any carton.
///
/// A domain outcome, not a fault: the caller decides whether an unpacked
/// remainder is fatal to its workflow.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UnpackedItem {
    pub item: Item,
    pub quantity: u64,
}

/// The aggregate result of one controller run.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PackingPlan {
    pub carton_assignments: Vec<AssignmentView>,
    pub total_cartons: u64,
    pub unique_patterns: usize,
    pub total_cost: f64,
    /// Unweighted mean of per-assignment efficiency.
    pub average_efficiency: f64,
    pub unpacked_items: Vec<UnpackedItem>,
    #[schema(example = "minimize_cartons_pattern_optimized")]
    pub strategy_used: String,
    pub items_processed: u64,
    pub cartons_evaluated: usize,
}

/// Events emitted while a run progresses, for live streaming to a client.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A grouped item batch is being processed.
    GroupStarted { item_id: String, total_qty: u64 },
    /// A new packing pattern entered the registry.
    PatternRegistered {
        carton_id: String,
        signature: Option<String>,
        carton_count: u64,
    },
    /// A batch merged into an already registered pattern.
    PatternMerged {
        signature: String,
        added_cartons: u64,
    },
    /// A group remainder could not be placed.
    GroupUnpacked { item_id: String, quantity: u64 },
    /// Run complete.
    Finished {
        total_cartons: u64,
        unique_patterns: usize,
        unpacked: usize,
    },
}

/// Validates a packing request without running it.
///
/// Checks list non-emptiness, item/carton field invariants and strictly
/// positive quantities. Returns the first failure with a human-readable
/// reason; it never panics.
pub fn validate_packing_request(
    items: &[ItemEntry],
    cartons: &[CartonType],
) -> Result<(), PackingError> {
    if items.is_empty() {
        return Err(PackingError::NoItems);
    }
    if cartons.is_empty() {
        return Err(PackingError::NoCartons);
    }
    for (index, entry) in items.iter().enumerate() {
        entry.validate().map_err(|err| PackingError::InvalidItem {
            index,
            reason: err.to_string(),
        })?;
    }
    for (index, carton) in cartons.iter().enumerate() {
        carton
            .validate()
            .map_err(|err| PackingError::InvalidCarton {
                index,
                reason: err.to_string(),
            })?;
    }
    Ok(())
}

/// Runs a full carton suggestion and returns the aggregate plan.
pub fn suggest_cartons(
    items: &[ItemEntry],
    cartons: &[CartonType],
    strategy: PackingStrategy,
    enable_3d: bool,
    config: &EngineConfig,
) -> Result<PackingPlan, PackingError> {
    suggest_cartons_with_progress(items, cartons, strategy, enable_3d, config, |_| {})
}

/// Like [`suggest_cartons`], but reports progress through a callback.
///
/// The engine itself stays synchronous; the callback is invoked inline and
/// is suitable for SSE forwarding from a blocking task.
pub fn suggest_cartons_with_progress(
    items: &[ItemEntry],
    cartons: &[CartonType],
    strategy: PackingStrategy,
    enable_3d: bool,
    config: &EngineConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> Result<PackingPlan, PackingError> {
    validate_packing_request(items, cartons)?;

    let groups = optimizer::group_similar_items(items);

    // Registry keyed by pattern signature (or a synthetic non-merging key
    // when 3D is disabled), in insertion order.
    let mut registry: Vec<(String, CartonAssignment)> = Vec::new();
    let mut unpacked_items: Vec<UnpackedItem> = Vec::new();

    for group in &groups {
        let item = &group.sample;
        let mut remaining = group.total_qty;

        on_event(&PackEvent::GroupStarted {
            item_id: item.id.clone(),
            total_qty: remaining,
        });

        while remaining > 0 {
            let Some(choice) =
                optimizer::find_optimal_carton_assignment(item, cartons, remaining, strategy)
            else {
                report_unpacked(group, remaining, &mut unpacked_items, &mut on_event);
                break;
            };

            // The pattern is always the carton filled to full capacity, not
            // merely to this batch's quantity: that is what makes signatures
            // comparable across batches and groups.
            let (items_per_carton, placements, signature) = if enable_3d {
                let (units, placements) =
                    geometry::max_units_fit_with_positions(item, &choice.carton);
                let signature =
                    geometry::pattern_signature(&item.id, &choice.carton.id, &placements);
                (units, Some(placements), Some(signature))
            } else {
                (choice.fit_capacity, None, None)
            };

            if items_per_carton == 0 {
                report_unpacked(group, remaining, &mut unpacked_items, &mut on_event);
                break;
            }

            let units_this_batch =
                remaining.min(items_per_carton.saturating_mul(config.batch_cap_multiplier));
            let cartons_this_batch = units_this_batch.div_ceil(items_per_carton);

            let merged = signature
                .as_ref()
                .and_then(|sig| registry.iter().position(|(key, _)| key == sig));
            match merged {
                Some(idx) => {
                    let (key, existing) = &mut registry[idx];
                    existing.absorb_batch(&item.id, units_this_batch, cartons_this_batch);
                    on_event(&PackEvent::PatternMerged {
                        signature: key.clone(),
                        added_cartons: cartons_this_batch,
                    });
                }
                None => {
                    let key = signature.clone().unwrap_or_else(|| {
                        format!("{}_{}_{}", choice.carton.id, item.id, registry.len())
                    });
                    let mut assignment = CartonAssignment::new(
                        choice.carton.clone(),
                        signature.clone(),
                        items_per_carton,
                    );
                    assignment.add_items(
                        &item.id,
                        units_this_batch,
                        item.volume,
                        cartons_this_batch,
                        choice.efficiency,
                        placements.as_deref(),
                    );
                    on_event(&PackEvent::PatternRegistered {
                        carton_id: choice.carton.id.clone(),
                        signature: signature.clone(),
                        carton_count: cartons_this_batch,
                    });
                    registry.push((key, assignment));
                }
            }

            remaining -= units_this_batch;
        }
    }

    let assignments: Vec<CartonAssignment> =
        registry.into_iter().map(|(_, assignment)| assignment).collect();

    let total_cartons = assignments.iter().map(|a| a.carton_count).sum();
    let total_cost = assignments.iter().map(|a| a.total_cost).sum();
    let average_efficiency = if assignments.is_empty() {
        0.0
    } else {
        assignments
            .iter()
            .map(|a| a.average_efficiency())
            .sum::<f64>()
            / assignments.len() as f64
    };
    let unique_patterns = assignments.len();

    on_event(&PackEvent::Finished {
        total_cartons,
        unique_patterns,
        unpacked: unpacked_items.len(),
    });

    Ok(PackingPlan {
        carton_assignments: assignments.iter().map(|a| a.to_view()).collect(),
        total_cartons,
        unique_patterns,
        total_cost,
        average_efficiency,
        unpacked_items,
        strategy_used: format!("{}_pattern_optimized", strategy),
        items_processed: items.iter().map(|e| e.quantity).sum(),
        cartons_evaluated: cartons.len(),
    })
}

/// Distributes an unplaceable remainder back over the group's original
/// entries, so reported unpacked quantities sum exactly to the remainder.
fn report_unpacked(
    group: &optimizer::ItemGroup,
    remaining: u64,
    unpacked_items: &mut Vec<UnpackedItem>,
    on_event: &mut impl FnMut(&PackEvent),
) {
    let mut to_report = remaining;
    for member in &group.members {
        if to_report == 0 {
            break;
        }
        let quantity = member.quantity.min(to_report);
        to_report -= quantity;
        on_event(&PackEvent::GroupUnpacked {
            item_id: member.item.id.clone(),
            quantity,
        });
        unpacked_items.push(UnpackedItem {
            item: member.item.clone(),
            quantity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, dims: (f64, f64, f64), weight: f64, volume: f64) -> Item {
        Item::new(id, dims, weight, volume, false).unwrap()
    }

    fn entry(item: Item, quantity: u64) -> ItemEntry {
        ItemEntry { item, quantity }
    }

    fn carton(id: &str, dims: (f64, f64, f64), weight_limit: f64, cost: f64) -> CartonType {
        let volume = dims.0 * dims.1 * dims.2;
        CartonType::new(id, dims, volume, weight_limit, cost).unwrap()
    }

    fn run(
        items: &[ItemEntry],
        cartons: &[CartonType],
        strategy: PackingStrategy,
        enable_3d: bool,
    ) -> PackingPlan {
        suggest_cartons(items, cartons, strategy, enable_3d, &EngineConfig::default())
            .expect("valid request")
    }

    #[test]
    fn rejects_empty_inputs() {
        let items = vec![entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 10)];
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 1000.0, 1.0)];

        assert!(matches!(
            validate_packing_request(&[], &cartons),
            Err(PackingError::NoItems)
        ));
        assert!(matches!(
            validate_packing_request(&items, &[]),
            Err(PackingError::NoCartons)
        ));
        assert!(validate_packing_request(&items, &cartons).is_ok());
    }

    #[test]
    fn rejects_zero_quantity() {
        let items = vec![entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 0)];
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 1000.0, 1.0)];
        assert!(matches!(
            validate_packing_request(&items, &cartons),
            Err(PackingError::InvalidItem { index: 0, .. })
        ));
    }

    #[test]
    fn single_item_single_carton_plan() {
        // 1000 units fit per carton; qty 100 needs exactly one carton.
        let items = vec![entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 100)];
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 1000.0, 1.0)];

        let plan = run(&items, &cartons, PackingStrategy::default(), true);
        assert_eq!(plan.total_cartons, 1);
        assert_eq!(plan.unique_patterns, 1);
        assert!((plan.total_cost - 1.0).abs() < 1e-9);
        assert!(plan.unpacked_items.is_empty());
        assert_eq!(plan.items_processed, 100);
        assert_eq!(plan.cartons_evaluated, 1);
        assert_eq!(plan.carton_assignments[0].total_items, 100);
    }

    #[test]
    fn identical_patterns_from_split_quantities_merge() {
        // Two entries of the same shape are grouped into one batch and land
        // on a single full-capacity pattern.
        let items = vec![
            entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 1500),
            entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 1500),
        ];
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 1000.0, 1.0)];

        let plan = run(&items, &cartons, PackingStrategy::default(), true);
        assert_eq!(plan.unique_patterns, 1);
        assert_eq!(plan.total_cartons, 3);
        assert_eq!(plan.carton_assignments[0].carton_count, 3);
        assert_eq!(plan.carton_assignments[0].total_items, 3000);
    }

    #[test]
    fn merge_across_separate_groups_with_same_pattern() {
        // Same dims but different weight: two groups, same winning carton and
        // same full-capacity geometry, so one pattern entry.
        let items = vec![
            entry(item("A", (10.0, 10.0, 10.0), 0.0, 1000.0), 600),
            entry(item("A", (10.0, 10.0, 10.0), 0.5, 1000.0), 600),
        ];
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 0.0, 1.0)];

        let plan = run(&items, &cartons, PackingStrategy::default(), true);
        assert_eq!(plan.unique_patterns, 1);
        assert_eq!(plan.total_cartons, 2);
    }

    #[test]
    fn conservation_of_units() {
        let items = vec![
            entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 2500),
            entry(item("B", (500.0, 500.0, 500.0), 1.0, 1.25e8), 7),
            entry(item("C", (25.0, 25.0, 25.0), 1.0, 15_625.0), 33),
        ];
        let cartons = vec![
            carton("C1", (100.0, 100.0, 100.0), 1000.0, 1.0),
            carton("C2", (50.0, 50.0, 50.0), 100.0, 0.5),
        ];

        let plan = run(&items, &cartons, PackingStrategy::default(), true);
        let packed: u64 = plan.carton_assignments.iter().map(|a| a.total_items).sum();
        let unpacked: u64 = plan.unpacked_items.iter().map(|u| u.quantity).sum();
        assert_eq!(packed + unpacked, plan.items_processed);
        assert_eq!(plan.items_processed, 2540);
    }

    #[test]
    fn oversized_item_reported_unpacked() {
        let items = vec![entry(item("BIG", (500.0, 500.0, 500.0), 1.0, 1.25e8), 7)];
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 1000.0, 1.0)];

        let plan = run(&items, &cartons, PackingStrategy::default(), true);
        assert!(plan.carton_assignments.is_empty());
        assert_eq!(plan.total_cartons, 0);
        assert_eq!(plan.unpacked_items.len(), 1);
        assert_eq!(plan.unpacked_items[0].quantity, 7);
        assert_eq!(plan.unpacked_items[0].item.id, "BIG");
    }

    #[test]
    fn disabled_3d_keeps_aggregates_but_no_positions() {
        let items = vec![entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 2500)];
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 1000.0, 1.0)];

        let with_3d = run(&items, &cartons, PackingStrategy::default(), true);
        let without = run(&items, &cartons, PackingStrategy::default(), false);

        assert_eq!(without.total_cartons, with_3d.total_cartons);
        assert!((without.total_cost - with_3d.total_cost).abs() < 1e-9);
        for assignment in &without.carton_assignments {
            assert!(assignment.pattern_signature.is_none());
            for item in &assignment.items {
                assert!(item.positions.is_empty());
            }
        }
    }

    #[test]
    fn batch_cap_bounds_one_step() {
        // Capacity 1 per carton with multiplier 2: 5 units take 3 loop steps,
        // merged back into a single pattern entry.
        let items = vec![entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 5)];
        let cartons = vec![carton("C1", (10.0, 10.0, 10.0), 1000.0, 1.0)];
        let config = EngineConfig::default().with_batch_cap_multiplier(2);

        let plan = suggest_cartons(&items, &cartons, PackingStrategy::default(), true, &config)
            .expect("valid request");
        assert_eq!(plan.total_cartons, 5);
        assert_eq!(plan.unique_patterns, 1);
        assert_eq!(plan.carton_assignments[0].total_items, 5);
    }

    #[test]
    fn synthetic_keys_never_merge_without_3d() {
        // One group, capacity forces multiple loop steps; without signatures
        // each step creates its own entry.
        let items = vec![entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 5)];
        let cartons = vec![carton("C1", (10.0, 10.0, 10.0), 1000.0, 1.0)];
        let config = EngineConfig::default().with_batch_cap_multiplier(2);

        let plan = suggest_cartons(&items, &cartons, PackingStrategy::default(), false, &config)
            .expect("valid request");
        assert_eq!(plan.total_cartons, 5);
        assert_eq!(plan.unique_patterns, 3);
    }

    #[test]
    fn average_efficiency_is_unweighted_mean() {
        // Two distinct patterns with different efficiencies.
        let items = vec![
            entry(item("A", (10.0, 10.0, 10.0), 0.0, 1000.0), 1000),
            entry(item("B", (50.0, 50.0, 50.0), 0.0, 125_000.0), 4),
        ];
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 0.0, 1.0)];

        let plan = run(&items, &cartons, PackingStrategy::default(), true);
        assert_eq!(plan.unique_patterns, 2);
        // A fills its carton completely (100%), B only half (50%).
        assert!((plan.average_efficiency - 75.0).abs() < 1e-9);
        let mean = plan
            .carton_assignments
            .iter()
            .map(|a| a.efficiency)
            .sum::<f64>()
            / plan.carton_assignments.len() as f64;
        assert!((plan.average_efficiency - mean).abs() < 1e-9);
    }

    #[test]
    fn strategy_name_recorded_in_plan() {
        let items = vec![entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 10)];
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 1000.0, 1.0)];
        let plan = run(&items, &cartons, PackingStrategy::MinimizeWaste, true);
        assert_eq!(plan.strategy_used, "minimize_waste_pattern_optimized");
    }

    #[test]
    fn progress_events_in_order() {
        let items = vec![
            entry(item("A", (10.0, 10.0, 10.0), 1.0, 1000.0), 100),
            entry(item("BIG", (500.0, 500.0, 500.0), 1.0, 1.25e8), 3),
        ];
        let cartons = vec![carton("C1", (100.0, 100.0, 100.0), 1000.0, 1.0)];

        let mut kinds = Vec::new();
        let plan = suggest_cartons_with_progress(
            &items,
            &cartons,
            PackingStrategy::default(),
            true,
            &EngineConfig::default(),
            |event| {
                kinds.push(match event {
                    PackEvent::GroupStarted { .. } => "group",
                    PackEvent::PatternRegistered { .. } => "registered",
                    PackEvent::PatternMerged { .. } => "merged",
                    PackEvent::GroupUnpacked { .. } => "unpacked",
                    PackEvent::Finished { .. } => "finished",
                });
            },
        )
        .expect("valid request");

        assert_eq!(plan.unpacked_items.len(), 1);
        assert_eq!(
            kinds,
            vec!["group", "registered", "group", "unpacked", "finished"]
        );
    }
}
