/// Example program to measure a body mesh and print every measurement
/// Run with: cargo run --example measure_mesh -- path/to/result.ply

use bodymeasure_lib::core::body_measurer::BodyMeasurer;
use bodymeasure_lib::core::ply::read_ply;
use bodymeasure_lib::models::measurement::{MeasurementSet, STANDARD_LABELS};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("usage: measure_mesh <mesh.ply>")?;

    println!("=== Body Mesh Measurement ===\n");

    let mesh = read_ply(&path)?;
    println!("Mesh: {}", path.display());
    println!("  Vertices: {}", mesh.vertex_count());
    println!("  Faces: {}", mesh.face_count());
    if let Some((min, max)) = mesh.bounds() {
        println!("  Bounds: {:?} .. {:?}", min, max);
    }
    println!();

    let mut measurer = BodyMeasurer::from_mesh(mesh)?;
    if let Some(model) = measurer.model() {
        println!("Body model: {}\n", model.as_str());
    }
    measurer.measure(&BodyMeasurer::all_possible_measurements());

    println!("Labelled measurements (cm):");
    for (label, value) in measurer.measurements().label_measurements(STANDARD_LABELS) {
        println!("  {}: {:.2}", label, value);
    }
    println!();

    match MeasurementSet::from_measurements(measurer.measurements()) {
        Ok(set) => println!("Result:\n{}", serde_json::to_string_pretty(&set)?),
        Err(e) => println!("Result incomplete: {}", e),
    }

    Ok(())
}
