//! Global stiffness, mass and load assembly.

use nalgebra::{DMatrix, DVector, Matrix6};
use petgraph::graph::{EdgeIndex, Graph};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::element::{BarKernel, Element};
use crate::errors::AnalysisError;
use crate::geometry::Axis;
use crate::node::Node;

/// Global matrices restricted to the free degrees of freedom.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GlobalSystem {
    /// Stiffness matrix `K`, `num_dof × num_dof`.
    stiffness: DMatrix<f64>,
    /// Lumped mass matrix `M`, `num_dof × num_dof`.
    mass: DMatrix<f64>,
    /// Load vector `F`, `num_dof`.
    load: DVector<f64>,
}

impl GlobalSystem {
    /// Number of free degrees of freedom the system was assembled for.
    #[must_use]
    pub fn num_dof(&self) -> usize {
        self.load.len()
    }

    /// Global stiffness matrix.
    #[must_use]
    pub fn stiffness(&self) -> &DMatrix<f64> {
        &self.stiffness
    }

    /// Global mass matrix.
    #[must_use]
    pub fn mass(&self) -> &DMatrix<f64> {
        &self.mass
    }

    /// Global load vector.
    #[must_use]
    pub fn load(&self) -> &DVector<f64> {
        &self.load
    }

    /// Rayleigh damping `C = α₁·M + α₂·K`.
    #[must_use]
    pub fn rayleigh_damping(&self, mass_coefficient: f64, stiffness_coefficient: f64) -> DMatrix<f64> {
        &self.mass * mass_coefficient + &self.stiffness * stiffness_coefficient
    }
}

/// Local contributions of one element together with its global DOF map.
struct ElementContribution {
    /// Global index for each of the six local DOFs.
    dofs: [Option<usize>; 6],
    /// Local stiffness.
    stiffness: Matrix6<f64>,
    /// Local lumped mass.
    mass: Matrix6<f64>,
}

/// Concatenate the DOF triples of an element's two end nodes.
pub(crate) fn element_dofs(start: &Node, end: &Node) -> [Option<usize>; 6] {
    let [a, b, c] = start.dof_indices();
    let [d, e, f] = end.dof_indices();
    [a, b, c, d, e, f]
}

/// Resolve the kernel of `edge`, failing on zero length.
pub(crate) fn element_kernel(
    graph: &Graph<Node, Element>,
    edge: EdgeIndex,
) -> Result<BarKernel, AnalysisError> {
    let (start, end) = graph
        .edge_endpoints(edge)
        .ok_or(AnalysisError::UnknownElement(edge))?;
    BarKernel::new(
        graph[start].position(),
        graph[end].position(),
        graph[edge].properties(),
    )
    .ok_or(AnalysisError::ZeroLengthElement(edge))
}

/// Add `local` into `global` for every pair of mapped indices.
///
/// Pairs touching a fixed DOF are dropped, which removes the constrained rows and
/// columns without ever forming them.
fn scatter_add(global: &mut DMatrix<f64>, local: &Matrix6<f64>, dofs: &[Option<usize>; 6]) {
    for (row_local, global_row) in dofs.iter().enumerate() {
        let Some(row) = *global_row else { continue };
        for (col_local, global_col) in dofs.iter().enumerate() {
            if let Some(col) = *global_col {
                global[(row, col)] += local[(row_local, col_local)];
            }
        }
    }
}

/// Assemble `K`, `M` and `F` for an enumerated graph with `num_dof` free DOFs.
///
/// Element kernels are evaluated in parallel; the scatter into the shared matrices runs
/// afterwards in element insertion order, so the result does not depend on scheduling.
pub(crate) fn assemble(
    graph: &Graph<Node, Element>,
    num_dof: usize,
) -> Result<GlobalSystem, AnalysisError> {
    let edges: Vec<EdgeIndex> = graph.edge_indices().collect();
    let contributions = edges
        .par_iter()
        .map(|&edge| {
            let kernel = element_kernel(graph, edge)?;
            let (start, end) = graph
                .edge_endpoints(edge)
                .ok_or(AnalysisError::UnknownElement(edge))?;
            Ok(ElementContribution {
                dofs: element_dofs(&graph[start], &graph[end]),
                stiffness: kernel.stiffness(),
                mass: kernel.lumped_mass(),
            })
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;

    let mut stiffness = DMatrix::zeros(num_dof, num_dof);
    let mut mass = DMatrix::zeros(num_dof, num_dof);
    for contribution in &contributions {
        scatter_add(&mut stiffness, &contribution.stiffness, &contribution.dofs);
        scatter_add(&mut mass, &contribution.mass, &contribution.dofs);
    }

    // Loads are taken once per node so shared nodes are not counted per element.
    let mut load = DVector::zeros(num_dof);
    for node in graph.node_weights() {
        let force = node.force();
        for axis in Axis::ALL {
            if let Some(index) = node.dof(axis) {
                load[index] += force.component(axis);
            }
        }
    }

    debug!(
        num_dof,
        elements = contributions.len(),
        "assembled global system"
    );
    Ok(GlobalSystem {
        stiffness,
        mass,
        load,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::element::ElementProperties;
    use crate::geometry::{point, Constraint, Force};

    fn enumerate(graph: &mut Graph<Node, Element>) -> usize {
        graph
            .node_weights_mut()
            .fold(0, |next, node| node.enumerate(next))
    }

    #[test]
    fn scatter_drops_fixed_pairs() {
        let mut global = DMatrix::zeros(2, 2);
        let local = Matrix6::from_fn(|row, col| (row * 6 + col) as f64);
        let dofs = [None, Some(1), None, Some(0), None, None];
        scatter_add(&mut global, &local, &dofs);
        assert_eq!(global[(1, 1)], local[(1, 1)]);
        assert_eq!(global[(1, 0)], local[(1, 3)]);
        assert_eq!(global[(0, 1)], local[(3, 1)]);
        assert_eq!(global[(0, 0)], local[(3, 3)]);
    }

    #[test]
    fn two_collinear_bars_form_spring_chain() {
        let properties = ElementProperties::new(100.0, 1.0, 2.0);
        let mut graph = Graph::new();
        let a = graph.add_node(Node::new(point(0.0, 0.0, 0.0)));
        let b = graph.add_node(Node::new(point(1.0, 0.0, 0.0)));
        let c = graph.add_node(Node::new(point(3.0, 0.0, 0.0)));
        graph[a].set_constraint(Constraint::FIXED);
        for node in [b, c] {
            graph[node].set_constraint(Constraint::new(false, true, true));
        }
        graph[c].set_force(Force::new(5.0, 7.0, 0.0));
        graph.add_edge(a, b, Element::new(properties));
        graph.add_edge(b, c, Element::new(properties));

        let num_dof = enumerate(&mut graph);
        assert_eq!(num_dof, 2);
        let system = assemble(&graph, num_dof).expect("assembly succeeds");

        let expected = DMatrix::from_row_slice(2, 2, &[150.0, -50.0, -50.0, 50.0]);
        assert_relative_eq!(*system.stiffness(), expected, epsilon = 1.0e-12);
        // Node b collects half of both bars, node c half of the second one.
        assert_relative_eq!(system.mass()[(0, 0)], 3.0, epsilon = 1.0e-12);
        assert_relative_eq!(system.mass()[(1, 1)], 2.0, epsilon = 1.0e-12);
        // The load on the restrained y axis is dropped.
        assert_eq!(system.load().as_slice(), &[0.0, 5.0]);
    }

    #[test]
    fn rayleigh_damping_combines_mass_and_stiffness() {
        let system = GlobalSystem {
            stiffness: DMatrix::from_element(1, 1, 10.0),
            mass: DMatrix::from_element(1, 1, 2.0),
            load: DVector::zeros(1),
        };
        let damping = system.rayleigh_damping(0.5, 0.1);
        assert_relative_eq!(damping[(0, 0)], 2.0, epsilon = 1.0e-12);
    }

    #[test]
    fn zero_length_element_is_reported() {
        let mut graph = Graph::new();
        let a = graph.add_node(Node::new(point(1.0, 1.0, 0.0)));
        let b = graph.add_node(Node::new(point(1.0, 1.0, 0.0)));
        let edge = graph.add_edge(a, b, Element::new(ElementProperties::new(1.0, 1.0, 1.0)));
        let num_dof = enumerate(&mut graph);
        assert_eq!(
            assemble(&graph, num_dof),
            Err(AnalysisError::ZeroLengthElement(edge))
        );
    }
}
