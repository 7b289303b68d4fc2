use approx::assert_relative_eq;
use trussdyn::{force, point, Constraint, EdgeIndex, ElementProperties, NodeIndex, Structure};

/// Planar bridge of seven nodes and eleven bars pinned at both ends and loaded at
/// the top chord centre.
struct Bridge {
    structure: Structure,
    nodes: Vec<NodeIndex>,
    elements: Vec<EdgeIndex>,
}

const LOAD: f64 = -100.0e3;

fn bridge_properties() -> ElementProperties {
    let radius: f64 = 0.01;
    ElementProperties::new(2.1e11, std::f64::consts::PI * radius.powi(2), 1000.0)
}

fn build_bridge() -> Bridge {
    let height = 0.5 * 3.0_f64.sqrt();
    let mut structure = Structure::new();
    let nodes: Vec<NodeIndex> = [
        (0.0, 0.0),
        (0.5, height),
        (1.0, 0.0),
        (1.5, height),
        (2.0, 0.0),
        (2.5, height),
        (3.0, 0.0),
    ]
    .iter()
    .map(|&(x, y)| structure.add_node(point(x, y, 0.0)))
    .collect();

    let planar = Constraint::new(false, false, true);
    for (position, &node) in nodes.iter().enumerate() {
        let constraint = if position == 0 || position == 6 {
            Constraint::FIXED
        } else {
            planar
        };
        structure
            .set_constraint(node, constraint)
            .expect("constraint assignment succeeds");
    }
    structure
        .set_force(nodes[3], force(0.0, LOAD, 0.0))
        .expect("load assignment succeeds");

    let connectivity = [
        (0, 1),
        (0, 2),
        (1, 2),
        (1, 3),
        (2, 3),
        (2, 4),
        (3, 4),
        (3, 5),
        (4, 5),
        (4, 6),
        (5, 6),
    ];
    let elements = connectivity
        .iter()
        .map(|&(start, end)| {
            structure
                .add_element(nodes[start], nodes[end], bridge_properties())
                .expect("element creation succeeds")
        })
        .collect();

    Bridge {
        structure,
        nodes,
        elements,
    }
}

#[test]
fn dof_count_matches_constraints() {
    let mut bridge = build_bridge();
    let num_dof = bridge.structure.enumerate_dof();

    let fixed: usize = bridge
        .nodes
        .iter()
        .map(|&node| {
            bridge
                .structure
                .node(node)
                .expect("node exists")
                .constraint()
                .fixed_count()
        })
        .sum();
    assert_eq!(num_dof, 3 * bridge.nodes.len() - fixed);
    assert_eq!(num_dof, 10);
}

#[test]
fn global_matrices_are_symmetric() {
    let mut bridge = build_bridge();
    let system = bridge.structure.ensure_assembled().expect("assembly succeeds");

    assert_relative_eq!(
        *system.stiffness(),
        system.stiffness().transpose(),
        max_relative = 1.0e-12
    );
    assert_relative_eq!(*system.mass(), system.mass().transpose());
    assert_eq!(system.load().len(), 10);
}

#[test]
fn static_response_is_symmetric_and_pins_stay_put() {
    let mut bridge = build_bridge();
    bridge.structure.evaluate().expect("bridge analysis succeeds");

    let displacement = |position: usize| {
        bridge
            .structure
            .node(bridge.nodes[position])
            .expect("node exists")
            .displacement()
    };

    for pin in [0, 6] {
        let pinned = displacement(pin);
        assert_eq!((pinned.x, pinned.y, pinned.z), (0.0, 0.0, 0.0));
    }
    for (left, right) in [(1, 5), (2, 4)] {
        let (a, b) = (displacement(left), displacement(right));
        assert_relative_eq!(a.x, -b.x, max_relative = 1.0e-9);
        assert_relative_eq!(a.y, b.y, max_relative = 1.0e-9);
    }

    let centre = displacement(3);
    assert_relative_eq!(centre.y, -4.37887e-3, max_relative = 1.0e-4);
    assert!(centre.x.abs() < 1.0e-12);
    assert_relative_eq!(displacement(1).x, 8.751e-4, max_relative = 1.0e-3);
    assert_relative_eq!(displacement(2).y, -3.19994e-3, max_relative = 1.0e-4);
}

#[test]
fn reactions_balance_applied_load() {
    let mut bridge = build_bridge();
    bridge.structure.evaluate().expect("bridge analysis succeeds");

    let reactions = bridge.structure.reactions().expect("reactions available");
    let total_x: f64 = reactions.iter().map(|reaction| reaction.x).sum();
    let total_y: f64 = reactions.iter().map(|reaction| reaction.y).sum();
    assert!(total_x.abs() < 1.0e-6 * LOAD.abs());
    assert_relative_eq!(total_y, -LOAD, max_relative = 1.0e-9);

    // Symmetric loading splits the vertical reaction evenly between the pins.
    assert_relative_eq!(reactions[0].y, -LOAD / 2.0, max_relative = 1.0e-9);
    assert_relative_eq!(reactions[6].y, -LOAD / 2.0, max_relative = 1.0e-9);
}

#[test]
fn members_share_load_symmetrically() {
    let mut bridge = build_bridge();
    bridge.structure.evaluate().expect("bridge analysis succeeds");

    let axial = |index: usize| {
        bridge
            .structure
            .member_axial_force(bridge.elements[index])
            .expect("axial force available")
    };
    // Mirror pairs about the vertical through the loaded node.
    for (left, right) in [(0, 10), (1, 9), (2, 8), (3, 7), (4, 6)] {
        assert_relative_eq!(axial(left), axial(right), max_relative = 1.0e-9);
    }
    // Top chord is compressed and the centre bar of the bottom chord is stretched.
    assert!(axial(3) < 0.0);
    assert!(axial(5) > 0.0);
}

#[test]
fn zero_load_gives_zero_displacement() {
    let mut bridge = build_bridge();
    bridge
        .structure
        .set_force(bridge.nodes[3], force(0.0, 0.0, 0.0))
        .expect("load assignment succeeds");
    bridge.structure.evaluate().expect("bridge analysis succeeds");

    let full = bridge
        .structure
        .full_displacement()
        .expect("solution available");
    assert_eq!(full.len(), 21);
    assert!(full.iter().all(|&value| value == 0.0));
}

#[test]
fn solution_satisfies_assembled_equilibrium() {
    let mut bridge = build_bridge();
    bridge.structure.evaluate().expect("bridge analysis succeeds");

    let system = bridge.structure.system().expect("system assembled");
    let solution = bridge.structure.displacement().expect("solution available");
    let residual = system.stiffness() * solution - system.load();
    assert!(residual.norm() < 1.0e-6 * system.load().norm());
}
