//! Common types and traits shared across the packing engine.
//!
//! Defines the trait seams for anything with spatial extent or mass and the
//! boundary validation helpers used by the model constructors.

/// Trait for objects with 3D dimensions.
///
/// Provides a common interface for all objects with spatial extent.
pub trait Dimensional {
    /// Returns the dimensions as (length, width, height).
    fn dims(&self) -> (f64, f64, f64);

    /// Volume of the bounding box (length × width × height).
    fn bounding_volume(&self) -> f64 {
        let (l, w, h) = self.dims();
        l * w * h
    }
}

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight in kg.
    fn weight(&self) -> f64;
}

/// Validation functions for boundary checks.
///
/// Zero values are accepted on purpose: a zero dimension or weight is a
/// domain outcome ("no fit" / "no weight cap"), not a malformed request.
pub mod validation {

    /// Validates a single dimensional or volumetric value.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the field for error messages
    ///
    /// # Returns
    /// `Ok(())` for finite, non-negative values, otherwise error text
    pub fn validate_measure(value: f64, name: &str) -> Result<(), String> {
        if value < 0.0 {
            return Err(format!("{} must not be negative, got: {}", name, value));
        }
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        Ok(())
    }

    /// Validates a requested quantity.
    ///
    /// # Returns
    /// `Ok(())` for strictly positive quantities, otherwise error text
    pub fn validate_quantity(value: u64) -> Result<(), String> {
        if value == 0 {
            return Err("Quantity must be positive".to_string());
        }
        Ok(())
    }
}
