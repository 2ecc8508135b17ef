//! The 45-byte primitive shape record and its enumerations.

use crate::error::{ShapeError, ShapeResult};
use uuid::Uuid;

/// Length of a serialized shape record.
pub const SHAPE_RECORD_LEN: usize = 45;

/// Object code of an ordinary primitive.
pub const PCODE_PRIMITIVE: u8 = 9;

/// Profile cross-section, stored in the low nibble of the profile curve byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProfileShape {
    Circle = 0,
    Square = 1,
    IsometricTriangle = 2,
    EquilateralTriangle = 3,
    RightTriangle = 4,
    HalfCircle = 5,
}

impl ProfileShape {
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Circle,
            1 => Self::Square,
            2 => Self::IsometricTriangle,
            3 => Self::EquilateralTriangle,
            4 => Self::RightTriangle,
            5 => Self::HalfCircle,
            _ => return None,
        })
    }

    #[must_use]
    pub fn is_triangle(self) -> bool {
        matches!(
            self,
            Self::IsometricTriangle | Self::EquilateralTriangle | Self::RightTriangle
        )
    }
}

/// Hole shape, stored in the high nibble of the profile curve byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum HoleShape {
    /// Same shape as the profile.
    #[default]
    Same = 0x00,
    Circle = 0x10,
    Square = 0x20,
    Triangle = 0x30,
}

impl HoleShape {
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x00 => Self::Same,
            0x10 => Self::Circle,
            0x20 => Self::Square,
            0x30 => Self::Triangle,
            _ => return None,
        })
    }

    /// The hole actually cut, resolving `Same` against the profile.
    #[must_use]
    pub fn effective(self, profile: ProfileShape) -> Self {
        match self {
            Self::Same => match profile {
                ProfileShape::Circle | ProfileShape::HalfCircle => Self::Circle,
                ProfileShape::Square => Self::Square,
                _ => Self::Triangle,
            },
            other => other,
        }
    }
}

/// Path the profile is extruded along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PathCurve {
    Straight = 0x10,
    Circle = 0x20,
    Circle2 = 0x30,
    Test = 0x40,
    Flexible = 0x80,
}

impl PathCurve {
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x10 => Self::Straight,
            0x20 => Self::Circle,
            0x30 => Self::Circle2,
            0x40 => Self::Test,
            0x80 => Self::Flexible,
            _ => return None,
        })
    }

    #[must_use]
    pub fn is_circular(self) -> bool {
        matches!(self, Self::Circle | Self::Circle2)
    }
}

/// Sculpted geometry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SculptType {
    #[default]
    None = 0,
    Sphere = 1,
    Torus = 2,
    Plane = 3,
    Cylinder = 4,
    Mesh = 5,
}

impl SculptType {
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::None,
            1 => Self::Sphere,
            2 => Self::Torus,
            3 => Self::Plane,
            4 => Self::Cylinder,
            5 => Self::Mesh,
            _ => return None,
        })
    }
}

/// How the physics engine represents the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PhysicsShapeType {
    #[default]
    Prim = 0,
    None = 1,
    ConvexHull = 2,
}

impl PhysicsShapeType {
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Prim,
            1 => Self::None,
            2 => Self::ConvexHull,
            _ => return None,
        })
    }
}

/// Shape kind derived from profile, path and sculpt fields.
///
/// The discriminants match the script `PRIM_TYPE_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveShapeType {
    Box,
    Cylinder,
    Prism,
    Sphere,
    Torus,
    Tube,
    Ring,
    Sculpt,
    Unknown,
}

impl PrimitiveShapeType {
    /// Script constant for this type, `None` for `Unknown`.
    #[must_use]
    pub fn code(self) -> Option<i32> {
        Some(match self {
            Self::Box => 0,
            Self::Cylinder => 1,
            Self::Prism => 2,
            Self::Sphere => 3,
            Self::Torus => 4,
            Self::Tube => 5,
            Self::Ring => 6,
            Self::Sculpt => 7,
            Self::Unknown => return None,
        })
    }

    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Box,
            1 => Self::Cylinder,
            2 => Self::Prism,
            3 => Self::Sphere,
            4 => Self::Torus,
            5 => Self::Tube,
            6 => Self::Ring,
            7 => Self::Sculpt,
            _ => return None,
        })
    }

    /// Profile and path that produce this type, `None` for sculpt and unknown.
    #[must_use]
    pub fn profile_and_path(self) -> Option<(ProfileShape, PathCurve)> {
        Some(match self {
            Self::Box => (ProfileShape::Square, PathCurve::Straight),
            Self::Cylinder => (ProfileShape::Circle, PathCurve::Straight),
            Self::Prism => (ProfileShape::EquilateralTriangle, PathCurve::Straight),
            Self::Sphere => (ProfileShape::HalfCircle, PathCurve::Circle),
            Self::Torus => (ProfileShape::Circle, PathCurve::Circle),
            Self::Tube => (ProfileShape::Square, PathCurve::Circle),
            Self::Ring => (ProfileShape::EquilateralTriangle, PathCurve::Circle),
            Self::Sculpt | Self::Unknown => return None,
        })
    }
}

/// Packed primitive geometry.
///
/// Field values are the raw wire integers; [`PrimitiveShape::decoded_params`]
/// turns them into clamped floats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimitiveShape {
    pub sculpt_map: Uuid,
    /// Sculpt kind in the low three bits.
    pub sculpt_type: u8,
    pub sculpt_inverted: u8,
    pub sculpt_mirrored: u8,
    pub path_begin: u16,
    pub path_curve: u8,
    pub path_end: u16,
    pub path_radius_offset: i8,
    pub path_revolutions: u8,
    pub path_scale_x: u8,
    pub path_scale_y: u8,
    pub path_shear_x: u8,
    pub path_shear_y: u8,
    pub path_skew: i8,
    pub path_taper_x: i8,
    pub path_taper_y: i8,
    pub path_twist: i8,
    pub path_twist_begin: i8,
    pub profile_begin: u16,
    pub profile_curve: u8,
    pub profile_end: u16,
    pub profile_hollow: u16,
    pub pcode: u8,
    pub physics_shape_type: u8,
    pub state: u8,
}

impl Default for PrimitiveShape {
    /// A half-metre default box.
    fn default() -> Self {
        Self {
            sculpt_map: Uuid::nil(),
            sculpt_type: SculptType::None as u8,
            sculpt_inverted: 0,
            sculpt_mirrored: 0,
            path_begin: 0,
            path_curve: PathCurve::Straight as u8,
            path_end: 0,
            path_radius_offset: 0,
            path_revolutions: 0,
            path_scale_x: 100,
            path_scale_y: 100,
            path_shear_x: 0,
            path_shear_y: 0,
            path_skew: 0,
            path_taper_x: 0,
            path_taper_y: 0,
            path_twist: 0,
            path_twist_begin: 0,
            profile_begin: 0,
            profile_curve: ProfileShape::Square as u8,
            profile_end: 0,
            profile_hollow: 0,
            pcode: PCODE_PRIMITIVE,
            physics_shape_type: PhysicsShapeType::Prim as u8,
            state: 0,
        }
    }
}

impl PrimitiveShape {
    /// Decode a 45-byte shape record.
    ///
    /// # Format
    ///
    /// - Bytes 0-15: sculpt map UUID
    /// - Byte 16: sculpt type, bytes 17-18: inverted and mirrored flags
    /// - Bytes 19-34: path begin (u16), curve, end (u16), radius offset,
    ///   revolutions, scale x/y, shear x/y, skew, taper x/y, twist, twist begin
    /// - Bytes 35-41: profile begin (u16), curve, end (u16), hollow (u16)
    /// - Bytes 42-44: pcode, physics shape type, state
    ///
    /// All multi-byte integers are little-endian. Every byte is kept as
    /// stored, so any record re-encodes identically.
    pub fn from_bytes(data: &[u8]) -> ShapeResult<Self> {
        if data.len() != SHAPE_RECORD_LEN {
            return Err(ShapeError::InvalidLength {
                context: "primitive shape",
                expected: SHAPE_RECORD_LEN,
                actual: data.len(),
            });
        }

        let mut map = [0u8; 16];
        map.copy_from_slice(&data[0..16]);

        Ok(Self {
            sculpt_map: Uuid::from_bytes(map),
            sculpt_type: data[16],
            sculpt_inverted: data[17],
            sculpt_mirrored: data[18],
            path_begin: u16::from_le_bytes([data[19], data[20]]),
            path_curve: data[21],
            path_end: u16::from_le_bytes([data[22], data[23]]),
            path_radius_offset: i8::from_le_bytes([data[24]]),
            path_revolutions: data[25],
            path_scale_x: data[26],
            path_scale_y: data[27],
            path_shear_x: data[28],
            path_shear_y: data[29],
            path_skew: i8::from_le_bytes([data[30]]),
            path_taper_x: i8::from_le_bytes([data[31]]),
            path_taper_y: i8::from_le_bytes([data[32]]),
            path_twist: i8::from_le_bytes([data[33]]),
            path_twist_begin: i8::from_le_bytes([data[34]]),
            profile_begin: u16::from_le_bytes([data[35], data[36]]),
            profile_curve: data[37],
            profile_end: u16::from_le_bytes([data[38], data[39]]),
            profile_hollow: u16::from_le_bytes([data[40], data[41]]),
            pcode: data[42],
            physics_shape_type: data[43],
            state: data[44],
        })
    }

    /// Encode the shape as a 45-byte record.
    #[must_use]
    pub fn serialization(&self) -> [u8; SHAPE_RECORD_LEN] {
        let mut out = [0u8; SHAPE_RECORD_LEN];
        out[0..16].copy_from_slice(self.sculpt_map.as_bytes());
        out[16] = self.sculpt_type;
        out[17] = self.sculpt_inverted;
        out[18] = self.sculpt_mirrored;
        out[19..21].copy_from_slice(&self.path_begin.to_le_bytes());
        out[21] = self.path_curve;
        out[22..24].copy_from_slice(&self.path_end.to_le_bytes());
        out[24] = self.path_radius_offset.to_le_bytes()[0];
        out[25] = self.path_revolutions;
        out[26] = self.path_scale_x;
        out[27] = self.path_scale_y;
        out[28] = self.path_shear_x;
        out[29] = self.path_shear_y;
        out[30] = self.path_skew.to_le_bytes()[0];
        out[31] = self.path_taper_x.to_le_bytes()[0];
        out[32] = self.path_taper_y.to_le_bytes()[0];
        out[33] = self.path_twist.to_le_bytes()[0];
        out[34] = self.path_twist_begin.to_le_bytes()[0];
        out[35..37].copy_from_slice(&self.profile_begin.to_le_bytes());
        out[37] = self.profile_curve;
        out[38..40].copy_from_slice(&self.profile_end.to_le_bytes());
        out[40..42].copy_from_slice(&self.profile_hollow.to_le_bytes());
        out[42] = self.pcode;
        out[43] = self.physics_shape_type;
        out[44] = self.state;
        out
    }

    /// Replace every field from a 45-byte record.
    ///
    /// The shape is left untouched when decoding fails.
    pub fn set_serialization(&mut self, data: &[u8]) -> ShapeResult<()> {
        *self = Self::from_bytes(data)?;
        Ok(())
    }

    /// Default-parameter shape of the given type.
    ///
    /// `Sculpt` and `Unknown` produce the default box.
    #[must_use]
    pub fn of_type(shape_type: PrimitiveShapeType) -> Self {
        let mut shape = Self::default();
        if let Some((profile, path)) = shape_type.profile_and_path() {
            shape.set_profile(profile, HoleShape::Same);
            shape.path_curve = path as u8;
        }
        shape
    }

    #[must_use]
    pub fn profile_shape(&self) -> Option<ProfileShape> {
        ProfileShape::from_u8(self.profile_curve & 0x0f)
    }

    #[must_use]
    pub fn hole_shape(&self) -> Option<HoleShape> {
        HoleShape::from_u8(self.profile_curve & 0xf0)
    }

    pub fn set_profile(&mut self, profile: ProfileShape, hole: HoleShape) {
        self.profile_curve = profile as u8 | hole as u8;
    }

    #[must_use]
    pub fn path(&self) -> Option<PathCurve> {
        PathCurve::from_u8(self.path_curve)
    }

    /// Sculpt kind from the low bits of the sculpt type byte.
    #[must_use]
    pub fn sculpt_kind(&self) -> Option<SculptType> {
        SculptType::from_u8(self.sculpt_type & 0x07)
    }

    pub fn set_sculpt_kind(&mut self, kind: SculptType) {
        self.sculpt_type = kind as u8;
    }

    #[must_use]
    pub fn is_sculpt_inverted(&self) -> bool {
        self.sculpt_inverted != 0
    }

    #[must_use]
    pub fn is_sculpt_mirrored(&self) -> bool {
        self.sculpt_mirrored != 0
    }

    pub fn set_sculpt_flags(&mut self, inverted: bool, mirrored: bool) {
        self.sculpt_inverted = u8::from(inverted);
        self.sculpt_mirrored = u8::from(mirrored);
    }

    #[must_use]
    pub fn physics_shape(&self) -> Option<PhysicsShapeType> {
        PhysicsShapeType::from_u8(self.physics_shape_type)
    }

    pub fn set_physics_shape(&mut self, shape: PhysicsShapeType) {
        self.physics_shape_type = shape as u8;
    }

    /// Whether the sculpt fields take over the geometry.
    #[must_use]
    pub fn is_sculpt(&self) -> bool {
        matches!(self.sculpt_kind(), Some(kind) if kind != SculptType::None)
            && !self.sculpt_map.is_nil()
    }

    /// Shape kind, with sculpted geometry taking precedence.
    #[must_use]
    pub fn shape_type(&self) -> PrimitiveShapeType {
        if self.is_sculpt() {
            PrimitiveShapeType::Sculpt
        } else {
            self.shape_type_no_sculpt()
        }
    }

    /// Shape kind from profile and path alone.
    #[must_use]
    pub fn shape_type_no_sculpt(&self) -> PrimitiveShapeType {
        let (Some(profile), Some(path)) = (self.profile_shape(), self.path()) else {
            return PrimitiveShapeType::Unknown;
        };

        // A flexible prim is a straight extrusion that bends.
        if matches!(path, PathCurve::Straight | PathCurve::Flexible) {
            match profile {
                ProfileShape::Square => PrimitiveShapeType::Box,
                ProfileShape::Circle => PrimitiveShapeType::Cylinder,
                p if p.is_triangle() => PrimitiveShapeType::Prism,
                _ => PrimitiveShapeType::Unknown,
            }
        } else if path == PathCurve::Circle {
            match profile {
                ProfileShape::HalfCircle => PrimitiveShapeType::Sphere,
                ProfileShape::Circle => PrimitiveShapeType::Torus,
                ProfileShape::Square => PrimitiveShapeType::Tube,
                _ => PrimitiveShapeType::Ring,
            }
        } else {
            PrimitiveShapeType::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_is_box() {
        let shape = PrimitiveShape::default();
        assert_eq!(shape.shape_type(), PrimitiveShapeType::Box);
        let bytes = shape.serialization();
        assert_eq!(bytes[21], 0x10);
        assert_eq!(bytes[37], 0x01);
        assert_eq!(bytes[42], PCODE_PRIMITIVE);
    }

    #[test]
    fn test_field_offsets() {
        let shape = PrimitiveShape {
            path_begin: 0x1234,
            path_end: 0xabcd,
            profile_hollow: 0x0102,
            path_taper_y: -2,
            state: 7,
            ..PrimitiveShape::default()
        };
        let bytes = shape.serialization();
        assert_eq!(&bytes[19..21], &[0x34, 0x12]);
        assert_eq!(&bytes[22..24], &[0xcd, 0xab]);
        assert_eq!(&bytes[40..42], &[0x02, 0x01]);
        assert_eq!(bytes[32], 0xfe);
        assert_eq!(bytes[44], 7);
    }

    #[test]
    fn test_set_serialization_wrong_length() {
        let mut shape = PrimitiveShape::default();
        let before = shape.clone();
        let result = shape.set_serialization(&[0u8; 44]);
        assert_eq!(
            result,
            Err(ShapeError::InvalidLength {
                context: "primitive shape",
                expected: 45,
                actual: 44,
            })
        );
        assert_eq!(shape, before);
    }

    #[test]
    fn test_shape_type_inference() {
        for ty in [
            PrimitiveShapeType::Box,
            PrimitiveShapeType::Cylinder,
            PrimitiveShapeType::Prism,
            PrimitiveShapeType::Sphere,
            PrimitiveShapeType::Torus,
            PrimitiveShapeType::Tube,
            PrimitiveShapeType::Ring,
        ] {
            assert_eq!(PrimitiveShape::of_type(ty).shape_type(), ty);
        }
    }

    #[test]
    fn test_sculpt_needs_map() {
        let mut shape = PrimitiveShape {
            sculpt_type: SculptType::Sphere as u8,
            ..PrimitiveShape::default()
        };
        // A nil sculpt map leaves the prim geometry in charge.
        assert_eq!(shape.shape_type(), PrimitiveShapeType::Box);
        shape.sculpt_map = Uuid::from_u128(1);
        assert_eq!(shape.shape_type(), PrimitiveShapeType::Sculpt);
    }

    #[test]
    fn test_odd_bytes_are_kept() {
        let mut bytes = PrimitiveShape::default().serialization();
        bytes[16] = 0x45;
        bytes[17] = 2;
        bytes[43] = 7;
        let shape = PrimitiveShape::from_bytes(&bytes).unwrap();
        // Low bits name the kind, flag bits ride along untouched.
        assert_eq!(shape.sculpt_kind(), Some(SculptType::Mesh));
        assert!(shape.is_sculpt_inverted());
        assert_eq!(shape.physics_shape(), None);
        assert!(!shape.is_sane());
        assert_eq!(shape.serialization(), bytes);
    }

    #[test]
    fn test_flexible_path_keeps_type() {
        let mut shape = PrimitiveShape::of_type(PrimitiveShapeType::Cylinder);
        shape.path_curve = PathCurve::Flexible as u8;
        assert_eq!(shape.shape_type(), PrimitiveShapeType::Cylinder);
    }

    proptest! {
        #[test]
        fn test_serialization_round_trip(bytes in proptest::collection::vec(any::<u8>(), 45)) {
            let shape = PrimitiveShape::from_bytes(&bytes).unwrap();
            prop_assert_eq!(shape.serialization().to_vec(), bytes);
        }
    }
}
