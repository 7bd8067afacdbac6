// Anatomical landmark vertices of the SMPL and SMPL-X templates

use crate::models::mesh::BodyModelType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Landmark {
    HeadTop,
    HeadLeftTemple,
    NeckAdamApple,
    LeftHeel,
    RightHeel,
    LeftNipple,
    RightNipple,
    ShoulderTop,
    InseamPoint,
    BellyButton,
    BackBellyButton,
    Crotch,
    PubicBone,
    RightWrist,
    LeftWrist,
    RightBicep,
    RightForearm,
    LeftShoulder,
    RightShoulder,
    LowLeftHip,
    LeftThigh,
    LeftCalf,
    LeftAnkle,
}

/// Vertex index of each landmark for one body model
#[derive(Debug, Clone)]
pub struct LandmarkSet {
    indices: Vec<(Landmark, usize)>,
}

impl LandmarkSet {
    pub fn new(indices: Vec<(Landmark, usize)>) -> Self {
        Self { indices }
    }

    pub fn for_model(model: BodyModelType) -> Self {
        match model {
            BodyModelType::Smpl => Self::smpl(),
            BodyModelType::SmplX => Self::smplx(),
        }
    }

    pub fn index(&self, landmark: Landmark) -> Option<usize> {
        self.indices
            .iter()
            .find(|(l, _)| *l == landmark)
            .map(|(_, i)| *i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Landmark, usize)> {
        self.indices.iter()
    }

    fn smpl() -> Self {
        use Landmark::*;
        Self::new(vec![
            (HeadTop, 412),
            (HeadLeftTemple, 166),
            (NeckAdamApple, 3050),
            (LeftHeel, 3458),
            (RightHeel, 6858),
            (LeftNipple, 3042),
            (RightNipple, 6489),
            (ShoulderTop, 3068),
            (InseamPoint, 3149),
            (BellyButton, 3501),
            (BackBellyButton, 3022),
            (Crotch, 1210),
            (PubicBone, 3145),
            (RightWrist, 5559),
            (LeftWrist, 2241),
            (RightBicep, 4855),
            (RightForearm, 5197),
            (LeftShoulder, 3011),
            (RightShoulder, 6470),
            (LowLeftHip, 3134),
            (LeftThigh, 947),
            (LeftCalf, 1103),
            (LeftAnkle, 3325),
        ])
    }

    fn smplx() -> Self {
        use Landmark::*;
        Self::new(vec![
            (HeadTop, 8976),
            (HeadLeftTemple, 1980),
            (NeckAdamApple, 8940),
            (LeftHeel, 8847),
            (RightHeel, 8635),
            (LeftNipple, 3572),
            (RightNipple, 8340),
            (ShoulderTop, 5616),
            (InseamPoint, 5601),
            (BellyButton, 5939),
            (BackBellyButton, 5941),
            (Crotch, 3797),
            (PubicBone, 5949),
            (RightWrist, 7449),
            (LeftWrist, 4823),
            (RightBicep, 6788),
            (RightForearm, 7266),
            (LeftShoulder, 4442),
            (RightShoulder, 7218),
            (LowLeftHip, 4112),
            (LeftThigh, 3577),
            (LeftCalf, 3732),
            (LeftAnkle, 5880),
        ])
    }
}
