//! Data models for the carton packing engine.
//!
//! This module defines the value types exchanged with the caller:
//! - `Item`: an article to be packed, with dimensions, weight and quantity
//! - `CartonType`: a candidate container profile with capacity limits and cost
//! - `Placement`: one item instance's 3D offset and orientation inside a carton
//!
//! Items and cartons arrive as loosely shaped JSON from the surrounding
//! business layer; they are validated once here, at the boundary, and treated
//! as trusted afterwards.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{Dimensional, Weighted, validation};

/// Validation error for item or carton data.
#[derive(Debug, Clone)]
pub enum ValidationError {
    InvalidMeasure(String),
    InvalidQuantity(String),
    MissingId,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidMeasure(msg) => write!(f, "Invalid measure: {}", msg),
            ValidationError::InvalidQuantity(msg) => write!(f, "Invalid quantity: {}", msg),
            ValidationError::MissingId => write!(f, "Identifier must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

fn check_measure(value: f64, name: &str) -> Result<(), ValidationError> {
    validation::validate_measure(value, name).map_err(ValidationError::InvalidMeasure)
}

/// An article to be packed.
///
/// `volume` is supplied independently of the dimensions since it may include
/// a packaging allowance; it is only used for volumetric capping, never
/// recomputed from `length * width * height`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Item {
    #[schema(example = "WIDGET-A")]
    pub id: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    pub volume: f64,
    #[serde(default)]
    pub fragile: bool,
}

impl Item {
    /// Creates a new item with validation.
    ///
    /// # Examples
    /// ```
    /// use cartonize::model::Item;
    ///
    /// let ok = Item::new("A", (10.0, 10.0, 10.0), 1.0, 1000.0, false);
    /// assert!(ok.is_ok());
    ///
    /// let bad = Item::new("A", (-10.0, 10.0, 10.0), 1.0, 1000.0, false);
    /// assert!(bad.is_err());
    /// ```
    pub fn new(
        id: impl Into<String>,
        dims: (f64, f64, f64),
        weight: f64,
        volume: f64,
        fragile: bool,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            id: id.into(),
            length: dims.0,
            width: dims.1,
            height: dims.2,
            weight,
            volume,
            fragile,
        };
        item.validate()?;
        Ok(item)
    }

    /// Re-checks the invariants after deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingId);
        }
        check_measure(self.length, "Length")?;
        check_measure(self.width, "Width")?;
        check_measure(self.height, "Height")?;
        check_measure(self.weight, "Weight")?;
        check_measure(self.volume, "Volume")?;
        Ok(())
    }
}

impl Dimensional for Item {
    fn dims(&self) -> (f64, f64, f64) {
        (self.length, self.width, self.height)
    }
}

impl Weighted for Item {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// An item together with its requested quantity, as submitted by the caller.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemEntry {
    pub item: Item,
    #[schema(example = 100)]
    pub quantity: u64,
}

impl ItemEntry {
    /// Validates the item and the quantity invariant (> 0).
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.item.validate()?;
        validation::validate_quantity(self.quantity).map_err(ValidationError::InvalidQuantity)
    }
}

/// A candidate carton profile, not a physical instance.
///
/// A `weight_limit` of 0 means the carton imposes no weight cap. Disabled
/// cartons stay in the catalog but are never selected.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CartonType {
    #[schema(example = "BOX-M")]
    pub id: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub volume: f64,
    pub weight_limit: f64,
    pub cost_per_unit: f64,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub fragile_safe: bool,
}

impl CartonType {
    /// Creates a new carton type with validation.
    pub fn new(
        id: impl Into<String>,
        dims: (f64, f64, f64),
        volume: f64,
        weight_limit: f64,
        cost_per_unit: f64,
    ) -> Result<Self, ValidationError> {
        let carton = Self {
            id: id.into(),
            length: dims.0,
            width: dims.1,
            height: dims.2,
            volume,
            weight_limit,
            cost_per_unit,
            disabled: false,
            fragile_safe: false,
        };
        carton.validate()?;
        Ok(carton)
    }

    /// Marks the carton safe for fragile items (builder style).
    pub fn with_fragile_safe(mut self, fragile_safe: bool) -> Self {
        self.fragile_safe = fragile_safe;
        self
    }

    /// Enables or disables the carton for selection (builder style).
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Re-checks the invariants after deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingId);
        }
        check_measure(self.length, "Length")?;
        check_measure(self.width, "Width")?;
        check_measure(self.height, "Height")?;
        check_measure(self.volume, "Volume")?;
        check_measure(self.weight_limit, "Weight limit")?;
        check_measure(self.cost_per_unit, "Cost per unit")?;
        Ok(())
    }
}

impl Dimensional for CartonType {
    fn dims(&self) -> (f64, f64, f64) {
        (self.length, self.width, self.height)
    }
}

/// One item instance's offset and effective orientation inside a carton.
///
/// Placements are produced by grid filling, so they never overlap and always
/// lie within the carton's bounding box by construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Placement {
    #[schema(example = 0.0)]
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Effective (possibly rotated) dimensions at this offset.
    pub length: f64,
    pub width: f64,
    pub height: f64,
    /// True iff the orientation differs from the item's declared one.
    pub rotated: bool,
}
