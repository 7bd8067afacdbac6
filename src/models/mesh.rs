// Triangle mesh data and body-model classification

use serde::{Deserialize, Serialize};

/// Vertex count of the SMPL body model
pub const SMPL_VERTEX_COUNT: usize = 6890;
/// Vertex count of the SMPL-X body model
pub const SMPLX_VERTEX_COUNT: usize = 10475;

/// Parametric body model a mesh was generated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyModelType {
    Smpl,
    SmplX,
}

impl BodyModelType {
    /// Classify a mesh by its vertex count
    pub fn from_vertex_count(count: usize) -> MeshResult<Self> {
        match count {
            SMPL_VERTEX_COUNT => Ok(BodyModelType::Smpl),
            SMPLX_VERTEX_COUNT => Ok(BodyModelType::SmplX),
            other => Err(MeshError::UnexpectedVertexCount(other)),
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            BodyModelType::Smpl => SMPL_VERTEX_COUNT,
            BodyModelType::SmplX => SMPLX_VERTEX_COUNT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyModelType::Smpl => "smpl",
            BodyModelType::SmplX => "smplx",
        }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Build a mesh, checking that every face references an existing vertex
    pub fn new(vertices: Vec<[f32; 3]>, faces: Vec<[u32; 3]>) -> MeshResult<Self> {
        let vertex_count = vertices.len();
        if let Some(bad) = faces
            .iter()
            .flatten()
            .find(|&&i| i as usize >= vertex_count)
        {
            return Err(MeshError::FaceIndexOutOfRange {
                index: *bad,
                vertex_count,
            });
        }

        Ok(Self { vertices, faces })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Axis-aligned bounds as (min, max)
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(mut lo, mut hi), v| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(v[axis]);
                hi[axis] = hi[axis].max(v[axis]);
            }
            (lo, hi)
        }))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("Unexpected vertex count {0}.")]
    UnexpectedVertexCount(usize),

    #[error("Face index {index} out of range for {vertex_count} vertices")]
    FaceIndexOutOfRange { index: u32, vertex_count: usize },

    #[error("Invalid face topology: {0}")]
    InvalidTopology(String),

    #[error("PLY error: {0}")]
    Ply(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MeshResult<T> = Result<T, MeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_vertex_count() {
        assert_eq!(BodyModelType::from_vertex_count(6890).unwrap(), BodyModelType::Smpl);
        assert_eq!(BodyModelType::from_vertex_count(10475).unwrap(), BodyModelType::SmplX);
        assert!(matches!(
            BodyModelType::from_vertex_count(100),
            Err(MeshError::UnexpectedVertexCount(100))
        ));
    }

    #[test]
    fn test_mesh_rejects_bad_face() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        assert!(TriangleMesh::new(vertices.clone(), vec![[0, 1, 2]]).is_ok());
        assert!(matches!(
            TriangleMesh::new(vertices, vec![[0, 1, 3]]),
            Err(MeshError::FaceIndexOutOfRange { index: 3, vertex_count: 3 })
        ));
    }

    #[test]
    fn test_bounds() {
        let mesh = TriangleMesh::new(
            vec![[0.0, -1.0, 2.0], [1.0, 3.0, -2.0], [0.5, 0.0, 0.0]],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let (lo, hi) = mesh.bounds().unwrap();
        assert_eq!(lo, [0.0, -1.0, -2.0]);
        assert_eq!(hi, [1.0, 3.0, 2.0]);
    }
}
