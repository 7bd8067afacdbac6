// Anthropometric measurements on a fitted body mesh
//
// Lengths are taken between landmark vertices; circumferences are tape
// lengths around a plane cross-section through landmark vertices.
// Mesh units are metres, results are centimetres.

use crate::core::landmarks::{Landmark, LandmarkSet};
use crate::core::ply::read_ply;
use crate::core::slicing::{hull_perimeter, nearest_component, slice_mesh, Plane};
use crate::models::measurement::*;
use crate::models::mesh::{BodyModelType, TriangleMesh};
use glam::Vec3;
use std::path::Path;

const METRES_TO_CM: f64 = 100.0;

/// Orientation of a circumference cutting plane
#[derive(Debug, Clone, Copy)]
pub enum PlaneNormal {
    /// Horizontal cut
    Up,
    /// Perpendicular to the segment between two landmarks
    Along(Landmark, Landmark),
}

#[derive(Debug, Clone, Copy)]
pub enum Definition {
    /// Distance along the up axis only
    VerticalLength(Landmark, Landmark),
    /// Straight-line distance
    Length(Landmark, Landmark),
    /// Plane through the mean of the landmarks
    Circumference(&'static [Landmark], PlaneNormal),
}

pub const MEASUREMENT_DEFINITIONS: &[(&str, Definition)] = {
    use Definition::*;
    use Landmark::*;
    &[
        (HEIGHT, VerticalLength(HeadTop, LeftHeel)),
        (SHOULDER_TO_CROTCH_HEIGHT, VerticalLength(ShoulderTop, InseamPoint)),
        (ARM_LEFT_LENGTH, Length(LeftShoulder, LeftWrist)),
        (ARM_RIGHT_LENGTH, Length(RightShoulder, RightWrist)),
        (INSIDE_LEG_HEIGHT, Length(LowLeftHip, LeftAnkle)),
        (SHOULDER_BREADTH, Length(LeftShoulder, RightShoulder)),
        (TORSO_BACK_LENGTH, Length(ShoulderTop, BackBellyButton)),
        (HEAD_CIRCUMFERENCE, Circumference(&[HeadLeftTemple], PlaneNormal::Up)),
        (NECK_CIRCUMFERENCE, Circumference(&[NeckAdamApple], PlaneNormal::Up)),
        (CHEST_CIRCUMFERENCE, Circumference(&[LeftNipple, RightNipple], PlaneNormal::Up)),
        (WAIST_CIRCUMFERENCE, Circumference(&[BellyButton, BackBellyButton], PlaneNormal::Up)),
        (HIP_CIRCUMFERENCE, Circumference(&[PubicBone], PlaneNormal::Up)),
        (WRIST_RIGHT_CIRCUMFERENCE, Circumference(&[RightWrist], PlaneNormal::Along(RightForearm, RightWrist))),
        (BICEP_RIGHT_CIRCUMFERENCE, Circumference(&[RightBicep], PlaneNormal::Along(RightShoulder, RightWrist))),
        (FOREARM_RIGHT_CIRCUMFERENCE, Circumference(&[RightForearm], PlaneNormal::Along(RightShoulder, RightWrist))),
        (THIGH_LEFT_CIRCUMFERENCE, Circumference(&[LeftThigh], PlaneNormal::Up)),
        (CALF_LEFT_CIRCUMFERENCE, Circumference(&[LeftCalf], PlaneNormal::Up)),
        (ANKLE_LEFT_CIRCUMFERENCE, Circumference(&[LeftAnkle], PlaneNormal::Up)),
    ]
};

/// Measures one body mesh
pub struct BodyMeasurer {
    mesh: TriangleMesh,
    landmarks: LandmarkSet,
    model: Option<BodyModelType>,
    measurements: Measurements,
}

impl BodyMeasurer {
    /// Classify the mesh by vertex count and use that model's landmarks
    pub fn from_mesh(mesh: TriangleMesh) -> MeasureResult<Self> {
        let model = BodyModelType::from_vertex_count(mesh.vertex_count())?;
        tracing::debug!(model = model.as_str(), "Classified body mesh");

        Ok(Self {
            landmarks: LandmarkSet::for_model(model),
            model: Some(model),
            mesh,
            measurements: Measurements::default(),
        })
    }

    /// Measure a mesh with a custom landmark table
    pub fn with_landmarks(mesh: TriangleMesh, landmarks: LandmarkSet) -> Self {
        Self {
            mesh,
            landmarks,
            model: None,
            measurements: Measurements::default(),
        }
    }

    pub fn model(&self) -> Option<BodyModelType> {
        self.model
    }

    pub fn all_possible_measurements() -> Vec<&'static str> {
        MEASUREMENT_DEFINITIONS.iter().map(|(name, _)| *name).collect()
    }

    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    /// Compute the named measurements. Failures are logged and leave the
    /// measurement out of the table.
    pub fn measure(&mut self, names: &[&str]) {
        for name in names {
            let Some((_, definition)) = MEASUREMENT_DEFINITIONS.iter().find(|(n, _)| n == name) else {
                tracing::warn!(measurement = %name, "Unknown measurement requested");
                continue;
            };

            match self.evaluate(name, definition) {
                Ok(value) => self.measurements.insert(name, value),
                Err(e) => tracing::warn!(measurement = %name, error = %e, "Measurement skipped"),
            }
        }
    }

    fn landmark_position(&self, landmark: Landmark) -> MeasureResult<Vec3> {
        let vertex_count = self.mesh.vertex_count();
        let index = self
            .landmarks
            .index(landmark)
            .ok_or_else(|| MeasureError::MissingLandmark(format!("{:?}", landmark)))?;

        self.mesh
            .vertices
            .get(index)
            .map(|v| Vec3::from_array(*v))
            .ok_or(MeasureError::LandmarkOutOfRange {
                index,
                vertex_count,
            })
    }

    fn evaluate(&self, name: &str, definition: &Definition) -> MeasureResult<f64> {
        match *definition {
            Definition::VerticalLength(a, b) => {
                let (a, b) = (self.landmark_position(a)?, self.landmark_position(b)?);
                Ok((a.y - b.y).abs() as f64 * METRES_TO_CM)
            }
            Definition::Length(a, b) => {
                let (a, b) = (self.landmark_position(a)?, self.landmark_position(b)?);
                Ok(a.distance(b) as f64 * METRES_TO_CM)
            }
            Definition::Circumference(at, normal) => {
                let positions = at
                    .iter()
                    .map(|l| self.landmark_position(*l))
                    .collect::<MeasureResult<Vec<Vec3>>>()?;
                let origin = positions.iter().copied().sum::<Vec3>() / positions.len() as f32;

                let plane = match normal {
                    PlaneNormal::Up => Plane::horizontal(origin),
                    PlaneNormal::Along(from, to) => {
                        let direction = self.landmark_position(to)? - self.landmark_position(from)?;
                        Plane::new(origin, direction)
                            .ok_or_else(|| MeasureError::DegeneratePlane(name.to_string()))?
                    }
                };

                let components = slice_mesh(&self.mesh, &plane);
                let component = nearest_component(&components, origin)
                    .ok_or_else(|| MeasureError::EmptySlice(name.to_string()))?;

                Ok(hull_perimeter(component, &plane) * METRES_TO_CM)
            }
        }
    }
}

/// Reload a mesh file, measure it and extract the client-facing values
pub fn measure_mesh_file(path: &Path) -> MeasureResult<MeasurementSet> {
    let mesh = read_ply(path)?;
    let mut measurer = BodyMeasurer::from_mesh(mesh)?;
    measurer.measure(&BodyMeasurer::all_possible_measurements());

    for (label, value) in measurer.measurements().label_measurements(STANDARD_LABELS) {
        tracing::info!(measurement = %label, cm = %format!("{:.2}", value), "Labelled measurement");
    }

    let set = MeasurementSet::from_measurements(measurer.measurements())?;
    tracing::info!(?set, "Measurement set extracted");
    Ok(set)
}
