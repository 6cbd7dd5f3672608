//! Carton assignment accumulator.
//!
//! One `CartonAssignment` is one row of the output plan: a carton type, how
//! many physical cartons repeat the same packing pattern, the item types
//! placed with their quantities, and (when 3D output is enabled) the shared
//! placement list. The placement memory is paid once per pattern, not once
//! per physical carton.

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{CartonType, Placement};

/// Display colors cycled per distinct item type within an assignment.
///
/// Assignment is keyed by the count of distinct item ids recorded so far, so
/// coloring is order-dependent: a fixed item-processing order reproduces the
/// exact same colors.
const ITEM_COLOR_PALETTE: [&str; 7] = [
    "#e74c3c", "#3498db", "#2ecc71", "#f39c12", "#9b59b6", "#1abc9c", "#34495e",
];

/// Per-item-type summary inside one assignment.
#[derive(Clone, Debug)]
pub struct ItemDetail {
    pub item_id: String,
    pub qty: u64,
    pub volume_per_unit: f64,
    pub total_volume: f64,
}

/// One placed unit with its display metadata, for the visualization layer.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PlacedUnit {
    pub item_id: String,
    #[schema(value_type = [f64; 3])]
    pub position: [f64; 3],
    #[schema(value_type = [f64; 3])]
    pub dimensions: [f64; 3],
    pub rotated: bool,
    #[schema(example = "#3498db")]
    pub color: String,
    pub index: u64,
}

/// Accumulator tying a carton type to the items packed into it.
#[derive(Clone, Debug)]
pub struct CartonAssignment {
    pub carton: CartonType,
    pub pattern_signature: Option<String>,
    pub items_per_carton: u64,
    pub carton_count: u64,
    pub assigned_volume: f64,
    pub total_cost: f64,
    efficiency_scores: Vec<f64>,
    item_details: Vec<ItemDetail>,
    placements: Vec<PlacedUnit>,
}

impl CartonAssignment {
    /// Creates an empty assignment for one carton type.
    pub fn new(
        carton: CartonType,
        pattern_signature: Option<String>,
        items_per_carton: u64,
    ) -> Self {
        Self {
            carton,
            pattern_signature,
            items_per_carton,
            carton_count: 0,
            assigned_volume: 0.0,
            total_cost: 0.0,
            efficiency_scores: Vec::new(),
            item_details: Vec::new(),
            placements: Vec::new(),
        }
    }

    /// Records a batch of items packed into `cartons_needed` cartons.
    ///
    /// Placements, when supplied, are stored up to `qty` entries and tagged
    /// with the palette color for the current distinct-item count.
    pub fn add_items(
        &mut self,
        item_id: &str,
        qty: u64,
        volume_per_unit: f64,
        cartons_needed: u64,
        efficiency: f64,
        placements: Option<&[Placement]>,
    ) {
        self.carton_count += cartons_needed;
        let total_volume = qty as f64 * volume_per_unit;
        self.assigned_volume += total_volume;
        self.efficiency_scores.push(efficiency);
        self.total_cost += self.carton.cost_per_unit * cartons_needed as f64;

        self.merge_item_detail(item_id, qty, volume_per_unit, total_volume);

        if let Some(placements) = placements {
            let color = ITEM_COLOR_PALETTE
                [self.distinct_item_count() % ITEM_COLOR_PALETTE.len()]
            .to_string();
            let limit = usize::try_from(qty).unwrap_or(usize::MAX);
            for (i, pos) in placements.iter().take(limit).enumerate() {
                self.placements.push(PlacedUnit {
                    item_id: item_id.to_string(),
                    position: [pos.x, pos.y, pos.z],
                    dimensions: [pos.length, pos.width, pos.height],
                    rotated: pos.rotated,
                    color: color.clone(),
                    index: i as u64 + 1,
                });
            }
        }
    }

    /// Merges a repeated batch of the same pattern: more cartons of the same
    /// layout, no new placements or efficiency samples.
    pub fn absorb_batch(&mut self, item_id: &str, qty: u64, cartons_needed: u64) {
        self.carton_count += cartons_needed;
        self.total_cost += self.carton.cost_per_unit * cartons_needed as f64;

        let volume_per_unit = self
            .item_details
            .iter()
            .find(|d| d.item_id == item_id)
            .map(|d| d.volume_per_unit)
            .unwrap_or(0.0);
        let total_volume = qty as f64 * volume_per_unit;
        self.assigned_volume += total_volume;
        self.merge_item_detail(item_id, qty, volume_per_unit, total_volume);
    }

    fn merge_item_detail(
        &mut self,
        item_id: &str,
        qty: u64,
        volume_per_unit: f64,
        total_volume: f64,
    ) {
        match self.item_details.iter_mut().find(|d| d.item_id == item_id) {
            Some(existing) => {
                existing.qty += qty;
                existing.total_volume += total_volume;
            }
            None => self.item_details.push(ItemDetail {
                item_id: item_id.to_string(),
                qty,
                volume_per_unit,
                total_volume,
            }),
        }
    }

    fn distinct_item_count(&self) -> usize {
        self.item_details.len()
    }

    /// Unweighted mean of the recorded efficiency samples.
    pub fn average_efficiency(&self) -> f64 {
        if self.efficiency_scores.is_empty() {
            return 0.0;
        }
        self.efficiency_scores.iter().sum::<f64>() / self.efficiency_scores.len() as f64
    }

    /// Carton space utilization in percent.
    pub fn utilization(&self) -> f64 {
        if self.carton.volume <= 0.0 {
            return 0.0;
        }
        (self.assigned_volume / self.carton.volume) * 100.0
    }

    /// Total units across all item types in this assignment.
    pub fn total_items(&self) -> u64 {
        self.item_details.iter().map(|d| d.qty).sum()
    }

    /// Textual summary like `"WIDGET-A (×100); WIDGET-B (×40)"`.
    pub fn item_summary(&self) -> String {
        self.item_details
            .iter()
            .map(|d| format!("{} (×{})", d.item_id, d.qty))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Builds the serializable plan row.
    pub fn to_view(&self) -> AssignmentView {
        AssignmentView {
            carton: self.carton.clone(),
            carton_count: self.carton_count,
            assigned_volume: self.assigned_volume,
            packing_efficiency: format!("{:.1}%", self.average_efficiency()),
            utilization: format!("{:.1}%", self.utilization()),
            item_summary: self.item_summary(),
            total_items: self.total_items(),
            total_cost: self.total_cost,
            pattern_signature: self.pattern_signature.clone(),
            items_per_carton: self.items_per_carton,
            items: self
                .item_details
                .iter()
                .map(|d| AssignmentItem {
                    item_code: d.item_id.clone(),
                    quantity: d.qty,
                    positions: self
                        .placements
                        .iter()
                        .filter(|p| p.item_id == d.item_id)
                        .cloned()
                        .collect(),
                })
                .collect(),
            efficiency: self.average_efficiency(),
        }
    }
}

/// Serializable view of one assignment, for external consumption.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AssignmentView {
    pub carton: CartonType,
    pub carton_count: u64,
    pub assigned_volume: f64,
    #[schema(example = "87.5%")]
    pub packing_efficiency: String,
    #[schema(example = "87.5%")]
    pub utilization: String,
    pub item_summary: String,
    pub total_items: u64,
    pub total_cost: f64,
    pub pattern_signature: Option<String>,
    pub items_per_carton: u64,
    pub items: Vec<AssignmentItem>,
    pub efficiency: f64,
}

/// Per-item slice of an assignment with its placement list.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AssignmentItem {
    pub item_code: String,
    pub quantity: u64,
    pub positions: Vec<PlacedUnit>,
}
