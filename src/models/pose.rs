// Data models for pose estimation output: per-person tracks of per-frame mesh vertices

use ndarray as nd;
use ndarray_npy::NpzReader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ==============================================================================
// Estimator Configuration
// ==============================================================================

/// Tracker used by the estimator to associate detections across frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMethod {
    /// Multi-person 2D keypoint tracker
    Pose,
    /// Bounding box tracker
    Bbox,
}

impl TrackingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMethod::Pose => "pose",
            TrackingMethod::Bbox => "bbox",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoseConfig {
    pub tracking_method: TrackingMethod,
    pub run_smplify: bool,  // Refine the regressed body with SMPLify
    pub smooth: bool,       // Temporal smoothing of the per-frame output
    pub no_render: bool,    // Skip rendering the overlay video
    pub timeout_secs: u64,  // Upper bound for a single estimator run
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            tracking_method: TrackingMethod::Pose,
            run_smplify: true,
            smooth: true,
            no_render: true,
            timeout_secs: 1800,
        }
    }
}

// ==============================================================================
// Person Selection
// ==============================================================================

/// Which tracked person a mesh is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum PersonSelection {
    /// The first detected person (lowest track id)
    First,
    /// A specific track id
    Id(i64),
}

impl Default for PersonSelection {
    fn default() -> Self {
        PersonSelection::First
    }
}

// ==============================================================================
// Estimator Output
// ==============================================================================

/// All frames of one tracked person
#[derive(Debug, Clone)]
pub struct PersonTrack {
    pub person_id: i64,
    pub frame_ids: Vec<i64>,
    pub verts: nd::Array3<f32>, // [frames, vertices, 3]
}

impl PersonTrack {
    pub fn frame_count(&self) -> usize {
        self.verts.shape()[0]
    }

    pub fn vertex_count(&self) -> usize {
        self.verts.shape()[1]
    }

    /// Vertices of a single frame
    pub fn frame_vertices(&self, frame_index: usize) -> PoseResult<Vec<[f32; 3]>> {
        if self.verts.shape()[2] != 3 {
            return Err(PoseError::MalformedOutput(format!(
                "verts for person {} have {} components per vertex, expected 3",
                self.person_id,
                self.verts.shape()[2]
            )));
        }
        if frame_index >= self.frame_count() {
            return Err(PoseError::FrameOutOfRange {
                person_id: self.person_id,
                frame_index,
                frame_count: self.frame_count(),
            });
        }

        let frame = self.verts.index_axis(nd::Axis(0), frame_index);
        Ok(frame
            .outer_iter()
            .map(|v| [v[0], v[1], v[2]])
            .collect())
    }
}

/// Per-person dictionary of per-frame mesh vertices
#[derive(Debug, Clone, Default)]
pub struct PoseOutput {
    pub persons: BTreeMap<i64, PersonTrack>,
}

impl PoseOutput {
    /// Load the `.npz` written by the estimator bridge.
    ///
    /// Layout: `person_ids` (int64, 1-D), then per id `verts_<id>`
    /// (float32, `[F, V, 3]`) and optionally `frame_ids_<id>` (int64, `[F]`).
    pub fn load_npz(path: &Path) -> PoseResult<Self> {
        let file = std::fs::File::open(path)?;
        let mut npz = NpzReader::new(file)
            .map_err(|e| PoseError::ReadFailed(format!("{}: {}", path.display(), e)))?;

        let person_ids: nd::Array1<i64> = npz
            .by_name("person_ids")
            .map_err(|e| PoseError::MalformedOutput(format!("missing person_ids: {}", e)))?;

        let mut persons = BTreeMap::new();
        for &person_id in person_ids.iter() {
            let verts: nd::Array3<f32> = npz
                .by_name(&format!("verts_{}", person_id))
                .map_err(|e| {
                    PoseError::MalformedOutput(format!("missing verts for person {}: {}", person_id, e))
                })?;

            // Frame ids are informational; fall back to 0..F when the bridge omits them
            let frame_ids: Vec<i64> = match npz.by_name::<nd::OwnedRepr<i64>, nd::Ix1>(&format!("frame_ids_{}", person_id)) {
                Ok(ids) => ids.to_vec(),
                Err(_) => (0..verts.shape()[0] as i64).collect(),
            };

            persons.insert(
                person_id,
                PersonTrack {
                    person_id,
                    frame_ids,
                    verts,
                },
            );
        }

        Ok(Self { persons })
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    /// Resolve a person selection to a track
    pub fn person(&self, selection: PersonSelection) -> PoseResult<&PersonTrack> {
        match selection {
            PersonSelection::First => self
                .persons
                .values()
                .next()
                .ok_or(PoseError::NoPersonDetected),
            PersonSelection::Id(id) => self
                .persons
                .get(&id)
                .ok_or(PoseError::PersonNotFound(id)),
        }
    }

    /// Vertices of the selected person at the given frame
    pub fn select(&self, selection: PersonSelection, frame_index: usize) -> PoseResult<Vec<[f32; 3]>> {
        self.person(selection)?.frame_vertices(frame_index)
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PoseError {
    #[error("Video file not found: {0}")]
    VideoNotFound(String),

    #[error("Pose estimator failed: {0}")]
    EstimatorFailed(String),

    #[error("Pose estimator timed out after {0} seconds")]
    Timeout(u64),

    #[error("Processing failed")]
    ResultMissing,

    #[error("Failed to read pose output: {0}")]
    ReadFailed(String),

    #[error("Malformed pose output: {0}")]
    MalformedOutput(String),

    #[error("No person detected in video")]
    NoPersonDetected,

    #[error("Person {0} not present in pose output")]
    PersonNotFound(i64),

    #[error("Frame {frame_index} out of range for person {person_id} ({frame_count} frames)")]
    FrameOutOfRange {
        person_id: i64,
        frame_index: usize,
        frame_count: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PoseResult<T> = Result<T, PoseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::NpzWriter;

    fn track(person_id: i64, frames: usize, verts: usize) -> PersonTrack {
        let data = nd::Array3::from_shape_fn((frames, verts, 3), |(f, v, c)| {
            (f * 100 + v * 10 + c) as f32
        });
        PersonTrack {
            person_id,
            frame_ids: (0..frames as i64).collect(),
            verts: data,
        }
    }

    #[test]
    fn test_tracking_method_names() {
        assert_eq!(TrackingMethod::Pose.as_str(), "pose");
        assert_eq!(TrackingMethod::Bbox.as_str(), "bbox");
    }

    #[test]
    fn test_pose_config_default() {
        let config = PoseConfig::default();
        assert_eq!(config.tracking_method, TrackingMethod::Pose);
        assert!(config.run_smplify);
        assert!(config.smooth);
        assert!(config.no_render);
    }

    #[test]
    fn test_select_first_person_uses_lowest_id() {
        let mut output = PoseOutput::default();
        output.persons.insert(7, track(7, 2, 4));
        output.persons.insert(1, track(1, 2, 4));

        let person = output.person(PersonSelection::First).unwrap();
        assert_eq!(person.person_id, 1);
    }

    #[test]
    fn test_frame_vertices() {
        let person = track(1, 3, 4);
        let verts = person.frame_vertices(2).unwrap();
        assert_eq!(verts.len(), 4);
        assert_eq!(verts[1], [210.0, 211.0, 212.0]);
    }

    #[test]
    fn test_frame_out_of_range() {
        let person = track(1, 2, 4);
        assert!(matches!(
            person.frame_vertices(2),
            Err(PoseError::FrameOutOfRange { frame_count: 2, .. })
        ));
    }

    #[test]
    fn test_two_component_vertices_are_malformed() {
        let person = PersonTrack {
            person_id: 4,
            frame_ids: vec![0],
            verts: nd::Array3::zeros((1, 4, 2)),
        };
        match person.frame_vertices(0) {
            Err(PoseError::MalformedOutput(message)) => assert!(message.contains("person 4"), "{}", message),
            other => panic!("unexpected result: {:?}", other),
        }

        let mut output = PoseOutput::default();
        output.persons.insert(4, person);
        assert!(matches!(
            output.select(PersonSelection::First, 0),
            Err(PoseError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_empty_output_has_no_person() {
        let output = PoseOutput::default();
        assert!(matches!(
            output.select(PersonSelection::First, 0),
            Err(PoseError::NoPersonDetected)
        ));
        assert!(matches!(
            output.select(PersonSelection::Id(3), 0),
            Err(PoseError::PersonNotFound(3))
        ));
    }

    #[test]
    fn test_load_npz() {
        let dir = std::env::temp_dir().join(format!("pose_npz_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("vibe_output.npz");

        {
            let mut npz = NpzWriter::new(std::fs::File::create(&path).unwrap());
            npz.add_array("person_ids", &nd::arr1(&[2i64, 1])).unwrap();
            npz.add_array("verts_1", &track(1, 2, 5).verts).unwrap();
            npz.add_array("frame_ids_1", &nd::arr1(&[10i64, 11])).unwrap();
            npz.add_array("verts_2", &track(2, 1, 5).verts).unwrap();
            npz.finish().unwrap();
        }

        let output = PoseOutput::load_npz(&path).unwrap();
        assert_eq!(output.persons.len(), 2);
        assert_eq!(output.persons[&1].frame_ids, vec![10, 11]);
        assert_eq!(output.persons[&2].frame_ids, vec![0]);

        let verts = output.select(PersonSelection::First, 0).unwrap();
        assert_eq!(verts.len(), 5);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
