// Fixed face topology of the SMPL family of body models
//
// Only the triangle list of the model is consumed; the parametric shape and
// pose blending belong to the external estimator.

use crate::models::mesh::{MeshError, MeshResult};
use ndarray as nd;
use ndarray_npy::{NpzReader, ReadNpyExt};
use std::path::{Path, PathBuf};

/// Key of the face array inside a body model `.npz`
pub const FACES_KEY: &str = "f";

/// Triangle list shared by every mesh of one body model
#[derive(Debug, Clone, PartialEq)]
pub struct FaceTopology {
    pub faces: Vec<[u32; 3]>,
    pub source: PathBuf,
}

impl FaceTopology {
    /// Load faces from a `.npy` file or from key `f` of a `.npz` model file
    pub fn load(path: &Path) -> MeshResult<Self> {
        if !path.exists() {
            return Err(MeshError::InvalidTopology(format!(
                "face topology not found at {}",
                path.display()
            )));
        }

        let is_npz = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("npz"))
            .unwrap_or(false);

        let faces = if is_npz {
            Self::read_npz(path)?
        } else {
            Self::read_npy(path)?
        };

        let faces = Self::to_triangles(&faces)?;
        tracing::debug!(faces = faces.len(), path = %path.display(), "Loaded face topology");

        Ok(Self {
            faces,
            source: path.to_path_buf(),
        })
    }

    /// Highest vertex index referenced by any face
    pub fn max_index(&self) -> Option<u32> {
        self.faces.iter().flatten().copied().max()
    }

    // Model files ship faces as uint32 or int64 depending on the exporter
    fn read_npy(path: &Path) -> MeshResult<nd::Array2<i64>> {
        macro_rules! try_dtype {
            ($t:ty) => {
                if let Ok(array) = nd::Array2::<$t>::read_npy(std::fs::File::open(path)?) {
                    return Ok(array.mapv(|v| v as i64));
                }
            };
        }
        try_dtype!(i64);
        try_dtype!(u32);
        try_dtype!(i32);
        try_dtype!(u64);

        Err(MeshError::InvalidTopology(format!(
            "{} is not a 2-D integer array",
            path.display()
        )))
    }

    fn read_npz(path: &Path) -> MeshResult<nd::Array2<i64>> {
        macro_rules! try_dtype {
            ($t:ty) => {
                let mut npz = NpzReader::new(std::fs::File::open(path)?)
                    .map_err(|e| MeshError::InvalidTopology(format!("{}: {}", path.display(), e)))?;
                if let Ok(array) = npz.by_name::<nd::OwnedRepr<$t>, nd::Ix2>(FACES_KEY) {
                    return Ok(array.mapv(|v| v as i64));
                }
            };
        }
        try_dtype!(i64);
        try_dtype!(u32);
        try_dtype!(i32);
        try_dtype!(u64);

        Err(MeshError::InvalidTopology(format!(
            "{} has no integer '{}' array",
            path.display(),
            FACES_KEY
        )))
    }

    fn to_triangles(array: &nd::Array2<i64>) -> MeshResult<Vec<[u32; 3]>> {
        if array.ncols() != 3 {
            return Err(MeshError::InvalidTopology(format!(
                "expected [N, 3] faces, got {:?}",
                array.shape()
            )));
        }

        array
            .outer_iter()
            .map(|row| {
                let mut tri = [0u32; 3];
                for (slot, &v) in tri.iter_mut().zip(row.iter()) {
                    *slot = u32::try_from(v).map_err(|_| {
                        MeshError::InvalidTopology(format!("face index {} out of range", v))
                    })?;
                }
                Ok(tri)
            })
            .collect()
    }
}
