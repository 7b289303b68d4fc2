//! Two-node axial bar elements and their local matrices.

use nalgebra::{Matrix6, Vector3, Vector6};
use serde::{Deserialize, Serialize};

use crate::errors::ElementPropertyError;
use crate::geometry::{Force, Point};

/// Material and section properties of a bar.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementProperties {
    /// Elastic modulus in pascals.
    pub elastic_modulus: f64,
    /// Cross-sectional area in square metres.
    pub area: f64,
    /// Density in kilograms per cubic metre.
    pub density: f64,
}

impl ElementProperties {
    /// Create a property set with explicit values.
    #[must_use]
    pub const fn new(elastic_modulus: f64, area: f64, density: f64) -> Self {
        Self {
            elastic_modulus,
            area,
            density,
        }
    }

    /// Check that the properties describe a physical bar.
    ///
    /// # Errors
    ///
    /// Returns [`ElementPropertyError`] when a value is not finite, when the area or
    /// elastic modulus is not strictly positive, or when the density is negative.
    pub fn validate(&self) -> Result<(), ElementPropertyError> {
        if !(self.elastic_modulus.is_finite() && self.area.is_finite() && self.density.is_finite())
        {
            return Err(ElementPropertyError::NonFiniteProperty);
        }
        if self.area <= 0.0 {
            return Err(ElementPropertyError::NonPositiveArea { area: self.area });
        }
        if self.elastic_modulus <= 0.0 {
            return Err(ElementPropertyError::NonPositiveElasticModulus {
                elastic_modulus: self.elastic_modulus,
            });
        }
        if self.density < 0.0 {
            return Err(ElementPropertyError::NegativeDensity {
                density: self.density,
            });
        }
        Ok(())
    }

    /// Axial rigidity `E·A`.
    #[must_use]
    pub fn axial_rigidity(&self) -> f64 {
        self.elastic_modulus * self.area
    }
}

/// A bar connecting two nodes of a [`Structure`](crate::Structure).
///
/// The endpoints live on the graph edge; the element itself only carries the
/// immutable material data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Element {
    /// Material and section data.
    properties: ElementProperties,
}

impl Element {
    pub(crate) fn new(properties: ElementProperties) -> Self {
        Self { properties }
    }

    /// Material and section data of the bar.
    #[must_use]
    pub fn properties(&self) -> ElementProperties {
        self.properties
    }
}

/// Geometry-resolved bar used to evaluate local matrices.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BarKernel {
    /// Unit vector from the start node to the end node.
    direction: Vector3<f64>,
    /// Undeformed length.
    length: f64,
    /// Material and section data.
    properties: ElementProperties,
}

impl BarKernel {
    /// Resolve the bar between `start` and `end`, `None` when they coincide.
    pub(crate) fn new(start: Point, end: Point, properties: ElementProperties) -> Option<Self> {
        let length = start.distance_to(end);
        if length == 0.0 {
            return None;
        }
        Some(Self {
            direction: (end.to_vector() - start.to_vector()) / length,
            length,
            properties,
        })
    }

    pub(crate) fn length(&self) -> f64 {
        self.length
    }

    /// Axial stiffness `E·A/L`.
    fn axial_stiffness(&self) -> f64 {
        self.properties.axial_rigidity() / self.length
    }

    /// Global-axis stiffness `(E·A/L)·[[ddᵗ, -ddᵗ], [-ddᵗ, ddᵗ]]`.
    pub(crate) fn stiffness(&self) -> Matrix6<f64> {
        let outer = self.direction * self.direction.transpose();
        let scale = self.axial_stiffness();
        let mut local = Matrix6::zeros();
        for row in 0..3 {
            for col in 0..3 {
                let value = scale * outer[(row, col)];
                local[(row, col)] = value;
                local[(row + 3, col + 3)] = value;
                local[(row, col + 3)] = -value;
                local[(row + 3, col)] = -value;
            }
        }
        local
    }

    /// Lumped mass: half of `ρ·A·L` on every translation of each end.
    pub(crate) fn lumped_mass(&self) -> Matrix6<f64> {
        let half = 0.5 * self.properties.density * self.properties.area * self.length;
        Matrix6::from_diagonal_element(half)
    }

    /// Internal end forces for the stacked end displacements `[u1; u2]`.
    pub(crate) fn internal_force(&self, end_displacements: &Vector6<f64>) -> Vector6<f64> {
        self.stiffness() * end_displacements
    }

    /// Axial force for the stacked end displacements, tension positive.
    pub(crate) fn axial_force(&self, end_displacements: &Vector6<f64>) -> f64 {
        let start = end_displacements.fixed_rows::<3>(0);
        let end = end_displacements.fixed_rows::<3>(3);
        self.axial_stiffness() * self.direction.dot(&(end - start))
    }
}

/// Stack two nodal forces into the 6-component element load `[f1; f2]`.
#[must_use]
pub fn local_load(start: Force, end: Force) -> Vector6<f64> {
    Vector6::new(start.x, start.y, start.z, end.x, end.y, end.z)
}
