//! Face counting and mesh face presets.

use crate::error::{ShapeError, ShapeResult};
use crate::shape::{
    HoleShape, PathCurve, PrimitiveShape, PrimitiveShapeType, ProfileShape, SculptType,
};

/// Hollow value used by the hollow mesh presets.
const PRESET_HOLLOW: u16 = 27_500;
/// Profile begin used by the cut mesh presets.
const PRESET_PROFILE_BEGIN: u16 = 9_375;

impl PrimitiveShape {
    /// Number of texturable faces.
    ///
    /// Sculpts have one face. Meshes report the face count of the prim preset
    /// they were given by [`PrimitiveShape::set_mesh_num_faces`].
    #[must_use]
    pub fn number_of_sides(&self) -> i32 {
        if self.is_sculpt() && self.sculpt_kind() != Some(SculptType::Mesh) {
            1
        } else {
            self.number_of_sides_no_sculpt()
        }
    }

    /// Number of faces the profile and path alone produce.
    #[must_use]
    pub fn number_of_sides_no_sculpt(&self) -> i32 {
        let hollow = i32::from(self.profile_hollow != 0);
        let profile_cut = 2 * i32::from(self.profile_begin != 0 || self.profile_end != 0);
        let path_cut = 2 * i32::from(self.path_begin != 0 || self.path_end != 0);

        match self.shape_type_no_sculpt() {
            PrimitiveShapeType::Box => 6 + hollow + profile_cut,
            PrimitiveShapeType::Cylinder => 3 + hollow + profile_cut,
            PrimitiveShapeType::Prism => 5 + hollow + profile_cut,
            // The sphere dimple is its profile cut.
            PrimitiveShapeType::Sphere => 1 + hollow + path_cut + profile_cut,
            PrimitiveShapeType::Torus => 1 + hollow + profile_cut + path_cut,
            PrimitiveShapeType::Tube => 4 + hollow + profile_cut + path_cut,
            PrimitiveShapeType::Ring => 3 + hollow + profile_cut + path_cut,
            PrimitiveShapeType::Sculpt | PrimitiveShapeType::Unknown => 0,
        }
    }

    /// Reshape the prim fields so a mesh reports `faces` faces.
    ///
    /// Only 1 to 9 faces have a preset; the shape is untouched otherwise.
    pub fn set_mesh_num_faces(&mut self, faces: i32) -> ShapeResult<()> {
        let (profile, path, hollow, profile_begin) = match faces {
            1 => (ProfileShape::Circle, PathCurve::Circle, 0, 0),
            2 => (ProfileShape::Circle, PathCurve::Circle, PRESET_HOLLOW, 0),
            3 => (ProfileShape::Circle, PathCurve::Straight, 0, 0),
            4 => (ProfileShape::Circle, PathCurve::Straight, PRESET_HOLLOW, 0),
            5 => (ProfileShape::EquilateralTriangle, PathCurve::Straight, 0, 0),
            6 => (ProfileShape::Square, PathCurve::Straight, 0, 0),
            7 => (ProfileShape::Square, PathCurve::Straight, PRESET_HOLLOW, 0),
            8 => (ProfileShape::Square, PathCurve::Straight, 0, PRESET_PROFILE_BEGIN),
            9 => (
                ProfileShape::Square,
                PathCurve::Straight,
                PRESET_HOLLOW,
                PRESET_PROFILE_BEGIN,
            ),
            _ => {
                return Err(ShapeError::OutOfRange {
                    context: "mesh face count",
                    value: i64::from(faces),
                });
            }
        };

        self.set_profile(profile, HoleShape::Triangle);
        self.path_curve = path as u8;
        self.profile_hollow = hollow;
        self.profile_begin = profile_begin;
        self.profile_end = 0;
        self.path_begin = 0;
        self.path_end = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_base_face_counts() {
        let expected = [
            (PrimitiveShapeType::Box, 6),
            (PrimitiveShapeType::Cylinder, 3),
            (PrimitiveShapeType::Prism, 5),
            (PrimitiveShapeType::Sphere, 1),
            (PrimitiveShapeType::Torus, 1),
            (PrimitiveShapeType::Tube, 4),
            (PrimitiveShapeType::Ring, 3),
        ];
        for (ty, faces) in expected {
            assert_eq!(PrimitiveShape::of_type(ty).number_of_sides(), faces, "{ty:?}");
        }
    }

    #[test]
    fn test_hollow_and_cuts_add_faces() {
        let mut shape = PrimitiveShape::of_type(PrimitiveShapeType::Box);
        shape.profile_hollow = 10_000;
        assert_eq!(shape.number_of_sides(), 7);
        shape.profile_begin = 5_000;
        assert_eq!(shape.number_of_sides(), 9);
        // A path cut on a straight path adds nothing.
        shape.path_begin = 5_000;
        assert_eq!(shape.number_of_sides(), 9);

        let mut torus = PrimitiveShape::of_type(PrimitiveShapeType::Torus);
        torus.path_end = 10_000;
        assert_eq!(torus.number_of_sides(), 3);
    }

    #[test]
    fn test_sphere_dimple() {
        let mut sphere = PrimitiveShape::of_type(PrimitiveShapeType::Sphere);
        sphere.profile_begin = 10_000;
        assert_eq!(sphere.number_of_sides(), 3);
    }

    #[test]
    fn test_sculpt_has_one_face() {
        let shape = PrimitiveShape {
            sculpt_type: SculptType::Sphere as u8,
            sculpt_map: Uuid::from_u128(7),
            ..PrimitiveShape::default()
        };
        assert_eq!(shape.number_of_sides(), 1);
        assert_eq!(shape.number_of_sides_no_sculpt(), 6);
    }

    #[test]
    fn test_mesh_face_presets() {
        for faces in 1..=9 {
            let mut shape = PrimitiveShape {
                sculpt_type: SculptType::Mesh as u8,
                sculpt_map: Uuid::from_u128(7),
                ..PrimitiveShape::default()
            };
            shape.set_mesh_num_faces(faces).unwrap();
            assert_eq!(shape.number_of_sides(), faces);
            assert_eq!(shape.hole_shape(), Some(HoleShape::Triangle));
        }
    }

    #[test]
    fn test_mesh_face_count_out_of_range() {
        let mut shape = PrimitiveShape::default();
        let before = shape.clone();
        assert_eq!(
            shape.set_mesh_num_faces(10),
            Err(ShapeError::OutOfRange {
                context: "mesh face count",
                value: 10
            })
        );
        assert!(shape.set_mesh_num_faces(0).is_err());
        assert_eq!(shape, before);
    }
}
