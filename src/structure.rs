//! Structure container: numbering, assembly and the static solve.

use nalgebra::{DVector, Matrix6, Vector6};
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use tracing::debug;

use crate::assembly::{self, GlobalSystem};
use crate::element::{local_load, Element, ElementProperties};
use crate::errors::{AnalysisError, StructureEditError};
use crate::geometry::{Axis, Constraint, Displacement, Force, Point};
use crate::node::Node;
use crate::solver::solve_spd;

/// Container for a pin-jointed truss model.
///
/// Nodes and elements are owned by the structure and addressed through the
/// [`NodeIndex`] and [`EdgeIndex`] handles returned on insertion. Insertion order is
/// the basis for degree-of-freedom numbering.
#[derive(Clone, Debug, Default)]
pub struct Structure {
    /// Underlying graph storage for nodes and elements.
    graph: Graph<Node, Element>,
    /// Number of free DOFs when the current numbering is valid.
    num_dof: Option<usize>,
    /// Matrices assembled for the current numbering.
    system: Option<GlobalSystem>,
    /// Free-DOF displacement from the latest static solve.
    solution: Option<DVector<f64>>,
}

impl Structure {
    /// Create an empty structure.
    ///
    /// # Examples
    /// ```
    /// use trussdyn::Structure;
    ///
    /// let structure = Structure::new();
    /// assert_eq!(structure.node_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of nodes in the structure.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of elements in the structure.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate over node handles in insertion order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Iterate over element handles in insertion order.
    pub fn element_indices(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    /// Read access to a node.
    #[must_use]
    pub fn node(&self, node: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(node)
    }

    /// Read access to an element.
    #[must_use]
    pub fn element(&self, element: EdgeIndex) -> Option<&Element> {
        self.graph.edge_weight(element)
    }

    /// The two end nodes of an element, start first.
    #[must_use]
    pub fn element_nodes(&self, element: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(element)
    }

    /// Add a new node to the structure.
    ///
    /// The node starts free and unloaded. Adding a node discards any existing
    /// numbering.
    ///
    /// # Examples
    /// ```
    /// use trussdyn::{point, Structure};
    ///
    /// let mut structure = Structure::new();
    /// let node = structure.add_node(point(0.0, 0.0, 0.0));
    /// assert_eq!(structure.node_count(), 1);
    /// assert_eq!(node.index(), 0);
    /// ```
    pub fn add_node(&mut self, position: Point) -> NodeIndex {
        self.invalidate_numbering();
        self.graph.add_node(Node::new(position))
    }

    /// Connect two nodes with a new bar.
    ///
    /// # Errors
    ///
    /// Returns [`StructureEditError::UnknownNode`] when either node is not part of this
    /// structure and [`StructureEditError::InvalidElementProperties`] when the
    /// properties are rejected by [`ElementProperties::validate`].
    pub fn add_element(
        &mut self,
        start: NodeIndex,
        end: NodeIndex,
        properties: ElementProperties,
    ) -> Result<EdgeIndex, StructureEditError> {
        for node in [start, end] {
            if self.graph.node_weight(node).is_none() {
                return Err(StructureEditError::UnknownNode(node));
            }
        }
        properties
            .validate()
            .map_err(StructureEditError::InvalidElementProperties)?;
        self.invalidate_system();
        Ok(self.graph.add_edge(start, end, Element::new(properties)))
    }

    /// Set the restraint state for a node.
    ///
    /// Accepts a [`Constraint`] or a `[bool; 3]` in X, Y, Z order, where `true` marks a
    /// fixed direction. Changing a constraint discards the numbering, so
    /// [`enumerate_dof`](Self::enumerate_dof) must run again before assembly.
    ///
    /// # Errors
    ///
    /// Returns [`StructureEditError::UnknownNode`] when `node` is not part of this structure.
    pub fn set_constraint(
        &mut self,
        node: NodeIndex,
        constraint: impl Into<Constraint>,
    ) -> Result<(), StructureEditError> {
        if self.graph.node_weight(node).is_none() {
            return Err(StructureEditError::UnknownNode(node));
        }
        self.invalidate_numbering();
        self.graph[node].set_constraint(constraint.into());
        Ok(())
    }

    /// Apply a point load to a node.
    ///
    /// # Errors
    ///
    /// Returns [`StructureEditError::UnknownNode`] when `node` is not part of this structure.
    pub fn set_force(&mut self, node: NodeIndex, force: Force) -> Result<(), StructureEditError> {
        if self.graph.node_weight(node).is_none() {
            return Err(StructureEditError::UnknownNode(node));
        }
        self.invalidate_system();
        self.graph[node].set_force(force);
        Ok(())
    }

    /// Number the free degrees of freedom and return their count.
    ///
    /// Nodes are visited in insertion order and each node's X, Y, Z directions in
    /// turn; every free direction receives the next index starting at zero. Any
    /// previously assembled matrices and results are discarded.
    pub fn enumerate_dof(&mut self) -> usize {
        self.invalidate_system();
        let num_dof = self
            .graph
            .node_weights_mut()
            .fold(0, |next, node| node.enumerate(next));
        debug!(num_dof, nodes = self.node_count(), "enumerated degrees of freedom");
        self.num_dof = Some(num_dof);
        num_dof
    }

    /// Number of free DOFs, `None` before enumeration.
    #[must_use]
    pub fn num_dof(&self) -> Option<usize> {
        self.num_dof
    }

    /// Assemble the global stiffness, mass and load for the current numbering.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotEnumerated`] when the numbering is missing or stale
    /// and [`AnalysisError::ZeroLengthElement`] for degenerate elements.
    pub fn assemble(&mut self) -> Result<&GlobalSystem, AnalysisError> {
        let num_dof = self.num_dof.ok_or(AnalysisError::NotEnumerated)?;
        self.invalidate_system();
        let system = assembly::assemble(&self.graph, num_dof)?;
        Ok(&*self.system.insert(system))
    }

    /// The assembled global system, `None` until [`assemble`](Self::assemble) succeeds.
    #[must_use]
    pub fn system(&self) -> Option<&GlobalSystem> {
        self.system.as_ref()
    }

    /// Enumerate and assemble when either is missing, then return the system.
    ///
    /// # Errors
    ///
    /// Propagates assembly failures.
    pub fn ensure_assembled(&mut self) -> Result<&GlobalSystem, AnalysisError> {
        if self.num_dof.is_none() {
            self.enumerate_dof();
        }
        if self.system.is_none() {
            self.assemble()?;
        }
        self.system.as_ref().ok_or(AnalysisError::NotAssembled)
    }

    /// Solve `K·u = F` on the free DOFs and store the displacement field.
    ///
    /// The solution is written back to every node; fixed directions receive zero.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotEnumerated`] or [`AnalysisError::NotAssembled`] when
    /// called out of sequence, and [`AnalysisError::UnstableStructure`] when the
    /// stiffness matrix is singular, indefinite or too ill-conditioned to factorise.
    pub fn solve(&mut self) -> Result<&DVector<f64>, AnalysisError> {
        if self.num_dof.is_none() {
            return Err(AnalysisError::NotEnumerated);
        }
        let system = self.system.as_ref().ok_or(AnalysisError::NotAssembled)?;
        let solution = solve_spd(system.stiffness(), system.load())
            .ok_or(AnalysisError::UnstableStructure)?;
        debug!(
            num_dof = solution.len(),
            max_displacement = solution.amax(),
            "solved static system"
        );
        for node in self.graph.node_weights_mut() {
            let [x, y, z] = node
                .dof_indices()
                .map(|dof| dof.map_or(0.0, |index| solution[index]));
            node.set_displacement(Displacement::new(x, y, z));
        }
        Ok(&*self.solution.insert(solution))
    }

    /// Enumerate, assemble and solve in one call.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] when the structure cannot be assembled or solved.
    ///
    /// # Examples
    /// ```
    /// use trussdyn::{force, point, ElementProperties, Structure};
    ///
    /// let mut structure = Structure::new();
    /// let a = structure.add_node(point(0.0, 0.0, 0.0));
    /// let b = structure.add_node(point(2.0, 0.0, 0.0));
    /// structure.set_constraint(a, [true, true, true])?;
    /// structure.set_constraint(b, [false, true, true])?;
    /// structure.set_force(b, force(1_000.0, 0.0, 0.0))?;
    /// structure.add_element(a, b, ElementProperties::new(200.0e9, 0.01, 7_850.0))?;
    ///
    /// structure.evaluate()?;
    /// let ux = structure.node(b).expect("node exists").displacement().x;
    /// assert!((ux - 1.0e-6).abs() < 1.0e-15);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn evaluate(&mut self) -> Result<(), AnalysisError> {
        self.enumerate_dof();
        self.assemble()?;
        self.solve()?;
        Ok(())
    }

    /// Free-DOF displacement vector from the latest solve.
    #[must_use]
    pub fn displacement(&self) -> Option<&DVector<f64>> {
        self.solution.as_ref()
    }

    /// Displacement of every node stacked as `[x0, y0, z0, x1, ...]`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotSolved`] before a successful solve.
    pub fn full_displacement(&self) -> Result<DVector<f64>, AnalysisError> {
        if self.solution.is_none() {
            return Err(AnalysisError::NotSolved);
        }
        Ok(DVector::from_iterator(
            3 * self.node_count(),
            self.graph.node_weights().flat_map(|node| {
                let displacement = node.displacement();
                [displacement.x, displacement.y, displacement.z]
            }),
        ))
    }

    /// Length of an element.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnknownElement`] or [`AnalysisError::ZeroLengthElement`].
    pub fn element_length(&self, element: EdgeIndex) -> Result<f64, AnalysisError> {
        Ok(assembly::element_kernel(&self.graph, element)?.length())
    }

    /// Global-axis 6×6 stiffness of an element.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnknownElement`] or [`AnalysisError::ZeroLengthElement`].
    pub fn element_stiffness(&self, element: EdgeIndex) -> Result<Matrix6<f64>, AnalysisError> {
        Ok(assembly::element_kernel(&self.graph, element)?.stiffness())
    }

    /// Lumped 6×6 mass of an element.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnknownElement`] or [`AnalysisError::ZeroLengthElement`].
    pub fn element_mass(&self, element: EdgeIndex) -> Result<Matrix6<f64>, AnalysisError> {
        Ok(assembly::element_kernel(&self.graph, element)?.lumped_mass())
    }

    /// Applied forces of the element's end nodes stacked as `[f1; f2]`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnknownElement`] for a foreign handle.
    pub fn element_load(&self, element: EdgeIndex) -> Result<Vector6<f64>, AnalysisError> {
        let (start, end) = self
            .graph
            .edge_endpoints(element)
            .ok_or(AnalysisError::UnknownElement(element))?;
        Ok(local_load(self.graph[start].force(), self.graph[end].force()))
    }

    /// Global DOF indices of a node for X, Y and Z.
    ///
    /// Unlike [`Node::dof_indices`], this separates a fixed direction from a structure
    /// that has not been numbered.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotEnumerated`] before numbering and
    /// [`AnalysisError::UnknownNode`] for a foreign handle.
    pub fn node_dofs(&self, node: NodeIndex) -> Result<[Option<usize>; 3], AnalysisError> {
        if self.num_dof.is_none() {
            return Err(AnalysisError::NotEnumerated);
        }
        self.graph
            .node_weight(node)
            .map(Node::dof_indices)
            .ok_or(AnalysisError::UnknownNode(node))
    }

    /// Global DOF map of an element: the start node's triple followed by the end node's.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotEnumerated`] before numbering and
    /// [`AnalysisError::UnknownElement`] for a foreign handle.
    pub fn element_dofs(&self, element: EdgeIndex) -> Result<[Option<usize>; 6], AnalysisError> {
        if self.num_dof.is_none() {
            return Err(AnalysisError::NotEnumerated);
        }
        let (start, end) = self
            .graph
            .edge_endpoints(element)
            .ok_or(AnalysisError::UnknownElement(element))?;
        Ok(assembly::element_dofs(&self.graph[start], &self.graph[end]))
    }

    /// Gather the element's end displacements from a free-DOF vector.
    fn element_end_displacements(
        &self,
        element: EdgeIndex,
        displacement: &DVector<f64>,
    ) -> Result<Vector6<f64>, AnalysisError> {
        let num_dof = self.num_dof.ok_or(AnalysisError::NotEnumerated)?;
        if displacement.len() != num_dof {
            return Err(AnalysisError::DimensionMismatch {
                expected: num_dof,
                actual: displacement.len(),
            });
        }
        let dofs = self.element_dofs(element)?;
        Ok(Vector6::from_fn(|row, _| {
            dofs[row].map_or(0.0, |index| displacement[index])
        }))
    }

    /// Internal end forces `K_local · u_e` of an element for any free-DOF displacement
    /// vector, such as the static solution or one column of a dynamic history.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotEnumerated`] before numbering,
    /// [`AnalysisError::DimensionMismatch`] when `displacement` does not have
    /// `num_dof` entries, and the element lookup errors.
    pub fn element_internal_force(
        &self,
        element: EdgeIndex,
        displacement: &DVector<f64>,
    ) -> Result<Vector6<f64>, AnalysisError> {
        let end_displacements = self.element_end_displacements(element, displacement)?;
        let kernel = assembly::element_kernel(&self.graph, element)?;
        Ok(kernel.internal_force(&end_displacements))
    }

    /// Axial force of an element for a free-DOF displacement vector, tension positive.
    ///
    /// # Errors
    ///
    /// Same conditions as [`element_internal_force`](Self::element_internal_force).
    pub fn element_axial_force(
        &self,
        element: EdgeIndex,
        displacement: &DVector<f64>,
    ) -> Result<f64, AnalysisError> {
        let end_displacements = self.element_end_displacements(element, displacement)?;
        let kernel = assembly::element_kernel(&self.graph, element)?;
        Ok(kernel.axial_force(&end_displacements))
    }

    /// Axial force of an element in the static solution.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotSolved`] before a successful solve.
    pub fn member_axial_force(&self, element: EdgeIndex) -> Result<f64, AnalysisError> {
        let solution = self.solution.as_ref().ok_or(AnalysisError::NotSolved)?;
        self.element_axial_force(element, solution)
    }

    /// Axial stress of an element in the static solution.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotSolved`] before a successful solve.
    pub fn member_stress(&self, element: EdgeIndex) -> Result<f64, AnalysisError> {
        let force = self.member_axial_force(element)?;
        let area = self
            .element(element)
            .ok_or(AnalysisError::UnknownElement(element))?
            .properties()
            .area;
        Ok(force / area)
    }

    /// Support reactions of every node in insertion order.
    ///
    /// The reaction is the resultant of the element end forces at the node minus the
    /// applied load, reported on fixed directions only; free directions are zero. For a
    /// solved structure the reactions balance the applied loads.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotSolved`] before a successful solve.
    pub fn reactions(&self) -> Result<Vec<Force>, AnalysisError> {
        let full = self.full_displacement()?;
        let mut resultant = DVector::<f64>::zeros(full.len());
        for edge in self.graph.edge_indices() {
            let (start, end) = self
                .graph
                .edge_endpoints(edge)
                .ok_or(AnalysisError::UnknownElement(edge))?;
            let bases = [3 * start.index(), 3 * end.index()];
            let end_displacements = Vector6::from_fn(|row, _| full[bases[row / 3] + row % 3]);
            let forces = assembly::element_kernel(&self.graph, edge)?.internal_force(&end_displacements);
            for row in 0..6 {
                resultant[bases[row / 3] + row % 3] += forces[row];
            }
        }
        Ok(self
            .graph
            .node_indices()
            .map(|index| {
                let node = &self.graph[index];
                let constraint = node.constraint();
                let applied = node.force();
                let base = 3 * index.index();
                let [x, y, z] = Axis::ALL.map(|axis| {
                    if constraint.is_fixed(axis) {
                        resultant[base + axis.index()] - applied.component(axis)
                    } else {
                        0.0
                    }
                });
                Force::new(x, y, z)
            })
            .collect())
    }

    /// Drop numbering, matrices and results after an edit that changes the layout.
    fn invalidate_numbering(&mut self) {
        if self.num_dof.take().is_some() {
            for node in self.graph.node_weights_mut() {
                node.clear_dofs();
            }
        }
        self.invalidate_system();
    }

    /// Drop matrices and results after an edit that keeps the numbering.
    fn invalidate_system(&mut self) {
        self.system = None;
        if self.solution.take().is_some() {
            for node in self.graph.node_weights_mut() {
                node.set_displacement(Displacement::default());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{force, point};

    fn steel() -> ElementProperties {
        ElementProperties::new(200.0e9, 0.01, 7_850.0)
    }

    /// Single bar along X with an axial load at the free end.
    fn cantilever(load: f64) -> (Structure, NodeIndex, EdgeIndex) {
        let mut structure = Structure::new();
        let support = structure.add_node(point(0.0, 0.0, 0.0));
        let free = structure.add_node(point(1.0, 0.0, 0.0));
        structure
            .set_constraint(support, Constraint::FIXED)
            .expect("support applied");
        structure
            .set_constraint(free, [false, true, true])
            .expect("support applied");
        structure
            .set_force(free, force(load, 0.0, 0.0))
            .expect("load applied");
        let member = structure
            .add_element(support, free, steel())
            .expect("element added");
        (structure, free, member)
    }

    #[test]
    fn node_mutators_return_error_for_unknown_indices() {
        let mut structure = Structure::new();
        let mut other = Structure::new();
        other.add_node(point(0.0, 0.0, 0.0));
        let foreign = other.add_node(point(1.0, 0.0, 0.0));

        assert_eq!(
            structure.set_constraint(foreign, Constraint::FIXED),
            Err(StructureEditError::UnknownNode(foreign))
        );
        assert_eq!(
            structure.set_force(foreign, force(1.0, 0.0, 0.0)),
            Err(StructureEditError::UnknownNode(foreign))
        );
        let local = structure.add_node(point(0.0, 0.0, 0.0));
        assert_eq!(
            structure.add_element(local, foreign, steel()),
            Err(StructureEditError::UnknownNode(foreign))
        );
    }

    #[test]
    fn invalid_element_properties_are_rejected() {
        let mut structure = Structure::new();
        let a = structure.add_node(point(0.0, 0.0, 0.0));
        let b = structure.add_node(point(1.0, 0.0, 0.0));
        let error = structure
            .add_element(a, b, ElementProperties::new(200.0e9, 0.0, 1.0))
            .expect_err("zero area rejected");
        assert!(matches!(error, StructureEditError::InvalidElementProperties(_)));
        assert_eq!(structure.element_count(), 0);
    }

    #[test]
    fn enumeration_follows_insertion_and_axis_order() {
        let mut structure = Structure::new();
        let a = structure.add_node(point(0.0, 0.0, 0.0));
        let b = structure.add_node(point(1.0, 0.0, 0.0));
        let c = structure.add_node(point(0.0, 1.0, 0.0));
        structure.set_constraint(a, [true, false, true]).expect("a");
        structure.set_constraint(c, [false, true, false]).expect("c");

        assert_eq!(structure.enumerate_dof(), 6);
        let dofs = |node| structure.node(node).expect("node").dof_indices();
        assert_eq!(dofs(a), [None, Some(0), None]);
        assert_eq!(dofs(b), [Some(1), Some(2), Some(3)]);
        assert_eq!(dofs(c), [Some(4), None, Some(5)]);
    }

    #[test]
    fn node_dofs_require_current_numbering() {
        let (mut structure, free, _) = cantilever(-1_000.0);
        assert_eq!(structure.node_dofs(free), Err(AnalysisError::NotEnumerated));

        structure.enumerate_dof();
        assert_eq!(structure.node_dofs(free), Ok([Some(0), None, None]));

        let mut other = Structure::new();
        other.add_node(point(0.0, 0.0, 0.0));
        other.add_node(point(1.0, 0.0, 0.0));
        let foreign = other.add_node(point(2.0, 0.0, 0.0));
        assert_eq!(
            structure.node_dofs(foreign),
            Err(AnalysisError::UnknownNode(foreign))
        );

        structure
            .set_constraint(free, Constraint::FIXED)
            .expect("constraint applied");
        assert_eq!(structure.node_dofs(free), Err(AnalysisError::NotEnumerated));
    }

    #[test]
    fn co_located_nodes_are_distinct() {
        let mut structure = Structure::new();
        let a = structure.add_node(point(1.0, 1.0, 1.0));
        let b = structure.add_node(point(1.0, 1.0, 1.0));
        assert_ne!(a, b);
        assert_eq!(structure.node_count(), 2);
    }

    #[test]
    fn out_of_sequence_calls_are_rejected() {
        let (mut structure, _, member) = cantilever(-1_000.0);
        assert_eq!(structure.assemble().err(), Some(AnalysisError::NotEnumerated));
        assert_eq!(structure.solve().err(), Some(AnalysisError::NotEnumerated));
        assert_eq!(
            structure.element_dofs(member),
            Err(AnalysisError::NotEnumerated)
        );

        structure.enumerate_dof();
        assert_eq!(structure.solve().err(), Some(AnalysisError::NotAssembled));
        assert_eq!(structure.member_axial_force(member), Err(AnalysisError::NotSolved));
        assert_eq!(structure.full_displacement(), Err(AnalysisError::NotSolved));
    }

    #[test]
    fn constraint_change_discards_numbering_and_results() {
        let (mut structure, free, _) = cantilever(-1_000.0);
        structure.evaluate().expect("analysis succeeds");
        assert!(structure.system().is_some());

        structure
            .set_constraint(free, Constraint::FIXED)
            .expect("constraint applied");
        assert_eq!(structure.num_dof(), None);
        assert!(structure.system().is_none());
        assert!(structure.displacement().is_none());
        let node = structure.node(free).expect("node");
        assert_eq!(node.dof_indices(), [None; 3]);
        assert_eq!(node.displacement(), Displacement::default());
        assert_eq!(structure.assemble().err(), Some(AnalysisError::NotEnumerated));
    }

    #[test]
    fn cantilever_analysis_matches_expected_displacements() {
        let (mut structure, free, member) = cantilever(-1_000.0);
        structure.evaluate().expect("analysis succeeds");

        let displacement = structure.node(free).expect("node").displacement();
        let expected_displacement = -1_000.0 * 1.0 / (0.01 * 200.0e9);
        assert_relative_eq!(displacement.x, expected_displacement, epsilon = 1.0e-12);
        assert_eq!(displacement.y, 0.0);
        assert_eq!(displacement.z, 0.0);

        let force = structure.member_axial_force(member).expect("force available");
        assert_relative_eq!(force, -1_000.0, epsilon = 1.0e-6);
        let stress = structure.member_stress(member).expect("stress available");
        assert_relative_eq!(stress, -100_000.0, epsilon = 1.0e-4);
    }

    #[test]
    fn element_queries_report_local_matrices() {
        let (mut structure, _, member) = cantilever(250.0);
        assert_relative_eq!(structure.element_length(member).expect("length"), 1.0);
        let stiffness = structure.element_stiffness(member).expect("stiffness");
        assert_relative_eq!(stiffness[(0, 0)], 2.0e9, epsilon = 1.0e-3);
        let mass = structure.element_mass(member).expect("mass");
        assert_relative_eq!(mass[(4, 4)], 0.5 * 7_850.0 * 0.01, epsilon = 1.0e-9);
        let load = structure.element_load(member).expect("load");
        assert_eq!(load[3], 250.0);

        assert_eq!(structure.enumerate_dof(), 1);
        assert_eq!(
            structure.element_dofs(member),
            Ok([None, None, None, Some(0), None, None])
        );
    }

    #[test]
    fn internal_force_rejects_wrong_vector_length() {
        let (mut structure, _, member) = cantilever(1.0);
        structure.enumerate_dof();
        assert_eq!(
            structure.element_internal_force(member, &DVector::zeros(4)),
            Err(AnalysisError::DimensionMismatch {
                expected: 1,
                actual: 4
            })
        );
        let forces = structure
            .element_internal_force(member, &DVector::from_element(1, 1.0e-6))
            .expect("internal force");
        assert_relative_eq!(forces[3], 2.0e3, epsilon = 1.0e-6);
        assert_relative_eq!(forces[0], -2.0e3, epsilon = 1.0e-6);
    }

    #[test]
    fn unsupported_structure_is_unstable() {
        let mut structure = Structure::new();
        let a = structure.add_node(point(0.0, 0.0, 0.0));
        let b = structure.add_node(point(1.0, 0.0, 0.0));
        structure.add_element(a, b, steel()).expect("element added");
        structure.set_force(b, force(1.0, 0.0, 0.0)).expect("load");
        assert_eq!(structure.evaluate(), Err(AnalysisError::UnstableStructure));
    }

    #[test]
    fn fully_fixed_structure_solves_trivially() {
        let mut structure = Structure::new();
        let a = structure.add_node(point(0.0, 0.0, 0.0));
        structure.set_constraint(a, Constraint::FIXED).expect("fixed");
        structure.evaluate().expect("nothing to solve");
        assert_eq!(structure.num_dof(), Some(0));
        assert_eq!(structure.full_displacement(), Ok(DVector::zeros(3)));
    }

    #[test]
    fn cantilever_reaction_balances_load() {
        let (mut structure, _, _) = cantilever(-1_000.0);
        structure.evaluate().expect("analysis succeeds");
        let reactions = structure.reactions().expect("reactions available");
        assert_relative_eq!(reactions[0].x, 1_000.0, epsilon = 1.0e-6);
        assert_eq!(reactions[1], Force::default());
    }
}
