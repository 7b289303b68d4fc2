use std::{env, fs};

use serde_json::json;
use trussdyn::{
    force, point, Axis, Constraint, DynamicIntegrator, ElementProperties, GeneralizedAlphaConfig,
    Structure, TimeSpan,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional integrator settings; omitted fields keep their defaults
    let config = match env::args().nth(1) {
        Some(path) => serde_json::from_str::<GeneralizedAlphaConfig>(&fs::read_to_string(path)?)?,
        None => GeneralizedAlphaConfig::default(),
    };

    // Bars with a 10 mm radius
    let radius: f64 = 0.01;
    let properties = ElementProperties::new(2.1e11, std::f64::consts::PI * radius.powi(2), 1000.0);

    // Seven nodes, alternating between the bottom and top chords
    let height = 0.5 * 3.0_f64.sqrt();
    let mut structure = Structure::new();
    let nodes: Vec<_> = (0..7)
        .map(|i| {
            let y = if i % 2 == 1 { height } else { 0.0 };
            structure.add_node(point(0.5 * f64::from(i), y, 0.0))
        })
        .collect();

    // Pin both ends and keep everything else in the XY plane
    for (i, &node) in nodes.iter().enumerate() {
        if i == 0 || i == nodes.len() - 1 {
            structure.set_constraint(node, Constraint::FIXED)?;
        } else {
            structure.set_constraint(node, [false, false, true])?;
        }
    }
    structure.set_force(nodes[3], force(0.0, -100.0e3, 0.0))?;

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
    let mut elements = Vec::with_capacity(connectivity.len());
    for (start, end) in connectivity {
        elements.push(structure.add_element(nodes[start], nodes[end], properties)?);
    }

    // Static response
    structure.evaluate()?;
    let displacements: Vec<_> = nodes
        .iter()
        .filter_map(|&node| structure.node(node).map(|node| node.displacement()))
        .collect();
    let axial_forces = elements
        .iter()
        .map(|&element| structure.member_axial_force(element))
        .collect::<Result<Vec<_>, _>>()?;
    let reactions = structure.reactions()?;

    // Transient response to the same load applied suddenly
    let span = TimeSpan::new(0.0, 0.5, 1.0e-3);
    let history = DynamicIntegrator::new(&mut structure, config)?.integrate(span)?;
    let smallest_step = history.step_sizes().iter().copied().fold(f64::INFINITY, f64::min);
    let largest_step = history.step_sizes().iter().copied().fold(0.0, f64::max);
    let peak_deflection = structure
        .node(nodes[3])
        .and_then(|node| node.dof(Axis::Y))
        .and_then(|dof| history.dof_displacement(dof))
        .map(|series| series.into_iter().fold(0.0, |peak: f64, value| peak.min(value)));

    let summary = json!({
        "num_dof": structure.num_dof(),
        "static": {
            "displacements": displacements,
            "axial_forces": axial_forces,
            "reactions": reactions,
        },
        "dynamic": {
            "config": config,
            "span": span,
            "steps": history.len(),
            "final_time": history.time().last(),
            "smallest_step": smallest_step,
            "largest_step": largest_step,
            "peak_centre_deflection": peak_deflection,
            "final_displacement": history.final_displacement().map(|u| u.as_slice().to_vec()),
            "cumulative_error": history.cumulative_errors().last(),
        },
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    // All done
    Ok(())
}
