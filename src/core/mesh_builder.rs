// Mesh builder
// Turns estimator output into a triangle mesh file: one person, one frame,
// the body model face topology, written as PLY.

use crate::core::body_model::FaceTopology;
use crate::core::ply::{write_ply, PlyFormat};
use crate::models::mesh::{MeshError, TriangleMesh};
use crate::models::pose::{PersonSelection, PoseError, PoseOutput};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshBuildError {
    #[error(transparent)]
    Pose(#[from] PoseError),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

pub type MeshBuildResult<T> = Result<T, MeshBuildError>;

/// Which frame of which person becomes the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameSelection {
    pub person: PersonSelection,
    pub frame_index: usize,
}

/// Assemble a mesh from already-loaded pose output
pub fn build_mesh(
    pose: &PoseOutput,
    topology: &FaceTopology,
    selection: FrameSelection,
) -> MeshBuildResult<TriangleMesh> {
    let person = pose.person(selection.person)?;
    let vertices = person.frame_vertices(selection.frame_index)?;

    tracing::debug!(
        person_id = person.person_id,
        frame_index = selection.frame_index,
        frames = person.frame_count(),
        vertices = vertices.len(),
        "Selected pose frame"
    );

    Ok(TriangleMesh::new(vertices, topology.faces.clone())?)
}

/// Load pose output, build the selected mesh and write it to `output_path`
pub fn pose_to_mesh(
    pose_file: &Path,
    topology: &FaceTopology,
    selection: FrameSelection,
    output_path: &Path,
) -> MeshBuildResult<PathBuf> {
    let pose = PoseOutput::load_npz(pose_file)?;
    if pose.is_empty() {
        return Err(PoseError::NoPersonDetected.into());
    }

    let mesh = build_mesh(&pose, topology, selection)?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(MeshError::from)?;
    }
    write_ply(&mesh, output_path, PlyFormat::BinaryLittleEndian)?;

    tracing::info!(
        path = %output_path.display(),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Mesh written"
    );
    Ok(output_path.to_path_buf())
}
