//! Nodes of a truss structure.

use serde::Serialize;

use crate::geometry::{Axis, Constraint, Displacement, Force, Point};

/// A pin joint owned by a [`Structure`](crate::Structure).
///
/// Nodes are identified by the `NodeIndex` returned on insertion, so two nodes at the
/// same position are still distinct.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    /// Position of the node in metres.
    position: Point,
    /// Restraint flags for the three translations.
    constraint: Constraint,
    /// External load applied to the node in newtons.
    force: Force,
    /// Global free-DOF index per axis; `None` for fixed or not yet enumerated.
    dofs: [Option<usize>; 3],
    /// Solved displacement of the node in metres.
    displacement: Displacement,
}

impl Node {
    /// Create a free, unloaded node at `position`.
    pub(crate) fn new(position: Point) -> Self {
        Self {
            position,
            constraint: Constraint::FREE,
            force: Force::default(),
            dofs: [None; 3],
            displacement: Displacement::default(),
        }
    }

    /// Position of the node.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Current restraint flags.
    #[must_use]
    pub fn constraint(&self) -> Constraint {
        self.constraint
    }

    /// Applied external force.
    #[must_use]
    pub fn force(&self) -> Force {
        self.force
    }

    /// Global DOF indices for X, Y and Z.
    ///
    /// A `None` slot is a fixed direction, but every slot is also `None` while the
    /// structure has not been enumerated. Check
    /// [`Structure::num_dof`](crate::Structure::num_dof) first, or use
    /// [`Structure::node_dofs`](crate::Structure::node_dofs) which reports the missing
    /// numbering as an error.
    #[must_use]
    pub fn dof_indices(&self) -> [Option<usize>; 3] {
        self.dofs
    }

    /// Global DOF index along a single axis.
    #[must_use]
    pub fn dof(&self, axis: Axis) -> Option<usize> {
        self.dofs[axis.index()]
    }

    /// Displacement from the latest static solve, zero before it.
    #[must_use]
    pub fn displacement(&self) -> Displacement {
        self.displacement
    }

    pub(crate) fn set_constraint(&mut self, constraint: Constraint) {
        self.constraint = constraint;
    }

    pub(crate) fn set_force(&mut self, force: Force) {
        self.force = force;
    }

    /// Number the free directions starting at `next`, returning the next unused index.
    pub(crate) fn enumerate(&mut self, mut next: usize) -> usize {
        for axis in Axis::ALL {
            self.dofs[axis.index()] = if self.constraint.is_fixed(axis) {
                None
            } else {
                let index = next;
                next += 1;
                Some(index)
            };
        }
        next
    }

    pub(crate) fn clear_dofs(&mut self) {
        self.dofs = [None; 3];
    }

    pub(crate) fn set_displacement(&mut self, displacement: Displacement) {
        self.displacement = displacement;
    }
}
