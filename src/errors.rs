//! Error types produced while editing or analysing structures.

use petgraph::graph::{EdgeIndex, NodeIndex};
use thiserror::Error;

/// Error returned when a static or dynamic analysis fails.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// Returned when a node handle does not belong to the structure.
    #[error("node {0:?} does not exist in this structure")]
    UnknownNode(NodeIndex),
    /// Returned when an element handle does not belong to the structure.
    #[error("element {0:?} does not exist in this structure")]
    UnknownElement(EdgeIndex),
    /// Returned when an element spans zero distance.
    #[error("element {0:?} has zero length")]
    ZeroLengthElement(EdgeIndex),
    /// Returned when DOF-dependent data is requested before enumeration, or after an
    /// edit that changed the numbering.
    #[error("degrees of freedom are not enumerated for the current constraints")]
    NotEnumerated,
    /// Returned when solving before the global matrices were assembled.
    #[error("global matrices have not been assembled")]
    NotAssembled,
    /// Returned when results are requested before the static solve.
    #[error("structure has not been solved")]
    NotSolved,
    /// Returned when the free-DOF stiffness matrix cannot be factorised.
    #[error("stiffness matrix is singular or indefinite; check supports and connectivity")]
    UnstableStructure,
    /// Returned when the mass matrix cannot be factorised for the initial acceleration.
    #[error("mass matrix is singular; every free degree of freedom needs attached mass")]
    SingularMass,
    /// Returned when the effective stiffness of a time step cannot be factorised.
    #[error("effective stiffness is singular at t = {time}")]
    SingularEffectiveStiffness {
        /// Time at the start of the failed step.
        time: f64,
    },
    /// Returned when a supplied vector does not match the number of free DOFs.
    #[error("expected a vector with {expected} entries, received {actual}")]
    DimensionMismatch {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
    /// Returned when the time integration parameters are rejected.
    #[error("invalid integration parameters: {0}")]
    InvalidIntegration(#[from] IntegrationParameterError),
}

/// Error returned when element properties are not physically meaningful.
///
/// The variants describe the reason the supplied value is rejected so callers can
/// present actionable feedback to users.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ElementPropertyError {
    /// Returned when the cross-sectional area is zero or negative.
    #[error("area must be positive (received {area})")]
    NonPositiveArea {
        /// Rejected cross-sectional area in square metres.
        area: f64,
    },
    /// Returned when the elastic modulus is zero or negative.
    #[error("elastic modulus must be positive (received {elastic_modulus})")]
    NonPositiveElasticModulus {
        /// Rejected elastic modulus in pascals.
        elastic_modulus: f64,
    },
    /// Returned when the density is negative.
    #[error("density must not be negative (received {density})")]
    NegativeDensity {
        /// Rejected density in kilograms per cubic metre.
        density: f64,
    },
    /// Returned when any property is NaN or infinite.
    #[error("element properties must be finite")]
    NonFiniteProperty,
}

/// Error returned when editing a [`Structure`](crate::Structure) with invalid input.
///
/// # Examples
///
/// ```
/// use petgraph::graph::NodeIndex;
/// use trussdyn::{force, Structure, StructureEditError};
///
/// let mut structure = Structure::new();
/// let missing = NodeIndex::new(42);
/// let error = structure
///     .set_force(missing, force(0.0, -1.0, 0.0))
///     .expect_err("unknown node is rejected");
/// assert_eq!(error, StructureEditError::UnknownNode(missing));
/// ```
#[derive(Debug, Error, PartialEq)]
pub enum StructureEditError {
    /// Returned when a node cannot be found in the structure.
    #[error("node {0:?} does not exist in this structure")]
    UnknownNode(NodeIndex),
    /// Returned when the supplied element properties are invalid.
    #[error("invalid element properties")]
    InvalidElementProperties(#[source] ElementPropertyError),
}

/// Error returned when the generalized-alpha parameters are rejected.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum IntegrationParameterError {
    /// Returned when the initial step is zero, negative or not finite.
    #[error("initial step must be positive and finite (received {0})")]
    NonPositiveStep(f64),
    /// Returned when the end time does not lie after the start time.
    #[error("end time {end} must be greater than start time {start}")]
    EmptyInterval {
        /// Requested start time.
        start: f64,
        /// Requested end time.
        end: f64,
    },
    /// Returned when the spectral radius is outside `(0, 1]`.
    #[error("spectral radius must lie in (0, 1] (received {0})")]
    SpectralRadiusOutOfRange(f64),
    /// Returned when a Rayleigh coefficient is negative or not finite.
    #[error("Rayleigh damping coefficients must be non-negative (received {mass}, {stiffness})")]
    InvalidDamping {
        /// Mass-proportional coefficient.
        mass: f64,
        /// Stiffness-proportional coefficient.
        stiffness: f64,
    },
    /// Returned when the error tolerance or its adaptation band is unusable.
    #[error("error tolerance {tolerance} with band ({lower}, {upper}) is invalid")]
    InvalidTolerance {
        /// Target relative error.
        tolerance: f64,
        /// Lower band factor.
        lower: f64,
        /// Upper band factor.
        upper: f64,
    },
}
