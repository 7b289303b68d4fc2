#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

mod assembly;
pub mod dynamic;
mod element;
pub mod errors;
pub mod geometry;
mod node;
mod solver;
mod structure;

pub use assembly::GlobalSystem;
pub use dynamic::{
    AlphaCoefficients, DynamicHistory, DynamicIntegrator, GeneralizedAlphaConfig, TimeSpan,
};
pub use element::{local_load, Element, ElementProperties};
pub use errors::{
    AnalysisError, ElementPropertyError, IntegrationParameterError, StructureEditError,
};
pub use geometry::{force, point, Axis, Constraint, Displacement, Force, Point};
pub use node::Node;
pub use structure::Structure;

pub use petgraph::graph::{EdgeIndex, NodeIndex};
