//! Decoded (float) shape parameters and the clamping rules between them.

use crate::quant;
use crate::shape::{
    HoleShape, PathCurve, PrimitiveShape, PrimitiveShapeType, ProfileShape, SculptType,
};
use glam::Vec2;

/// Smallest open arc a profile or path cut may leave.
pub const MIN_CUT_ARC: f32 = 0.05;
/// Hollow limit for a square hole in a non-square profile.
pub const MAX_SQUARE_HOLE_HOLLOW: f32 = 0.70;
/// Hollow limit for every other combination.
pub const MAX_HOLLOW: f32 = 0.95;
/// Largest skew magnitude.
pub const MAX_SKEW: f32 = 0.95;

const EPSILON: f32 = 1e-4;

/// Shape parameters as clamped floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedParams {
    pub shape_type: PrimitiveShapeType,
    pub profile_shape: ProfileShape,
    pub hole_shape: HoleShape,
    pub path_curve: PathCurve,
    pub profile_begin: f32,
    pub profile_end: f32,
    pub profile_hollow: f32,
    pub path_begin: f32,
    pub path_end: f32,
    /// Top size for straight paths, hole size for circular ones.
    pub path_scale: Vec2,
    pub top_shear: Vec2,
    pub taper: Vec2,
    pub twist_begin: f32,
    pub twist_end: f32,
    pub radius_offset: f32,
    pub revolutions: f32,
    pub skew: f32,
}

impl Default for DecodedParams {
    fn default() -> Self {
        PrimitiveShape::default().decoded_params()
    }
}

/// Clamp a begin/end cut pair to `0..1` keeping at least [`MIN_CUT_ARC`] open.
#[must_use]
pub fn clamp_cut(begin: f32, end: f32) -> (f32, f32) {
    let end = end.clamp(0.0, 1.0);
    let mut begin = begin.clamp(0.0, 1.0);
    if end - begin < MIN_CUT_ARC {
        begin = end - MIN_CUT_ARC;
        if begin < 0.0 {
            return (0.0, MIN_CUT_ARC);
        }
    }
    (begin, end)
}

/// Largest hollow the profile/hole combination allows.
#[must_use]
pub fn max_hollow(profile: ProfileShape, hole: HoleShape) -> f32 {
    if profile != ProfileShape::Square && hole.effective(profile) == HoleShape::Square {
        MAX_SQUARE_HOLE_HOLLOW
    } else {
        MAX_HOLLOW
    }
}

/// Smallest skew magnitude for the given revolutions and hole width.
///
/// Zero for a single revolution, otherwise `1 - 1/(revolutions * hole_x + 1)`.
#[must_use]
pub fn min_skew(revolutions: f32, hole_x: f32) -> f32 {
    if (revolutions - 1.0).abs() < 1e-3 {
        0.0
    } else {
        (1.0 - 1.0 / (revolutions * hole_x + 1.0)).clamp(0.0, MAX_SKEW)
    }
}

/// Clamp skew to `±0.95`, pushing small magnitudes up to [`min_skew`].
#[must_use]
pub fn clamp_skew(skew: f32, revolutions: f32, hole_x: f32) -> f32 {
    let skew = skew.clamp(-MAX_SKEW, MAX_SKEW);
    let min = min_skew(revolutions, hole_x);
    if skew.abs() < min {
        min.copysign(skew)
    } else {
        skew
    }
}

impl PrimitiveShape {
    /// Decode the packed fields into clamped floats.
    ///
    /// Unknown enumerations fall back to a square profile, same hole and
    /// straight path so the result is always usable.
    #[must_use]
    pub fn decoded_params(&self) -> DecodedParams {
        let profile_shape = self.profile_shape().unwrap_or(ProfileShape::Square);
        let hole_shape = self.hole_shape().unwrap_or_default();
        let path_curve = self.path().unwrap_or(PathCurve::Straight);

        let (profile_begin, profile_end) = clamp_cut(
            quant::unpack_begin_cut(self.profile_begin),
            quant::unpack_end_cut(self.profile_end),
        );
        let (path_begin, path_end) = clamp_cut(
            quant::unpack_begin_cut(self.path_begin),
            quant::unpack_end_cut(self.path_end),
        );
        let profile_hollow = quant::unpack_hollow(self.profile_hollow)
            .clamp(0.0, max_hollow(profile_shape, hole_shape));

        let path_scale = Vec2::new(
            quant::unpack_path_scale(self.path_scale_x),
            quant::unpack_path_scale(self.path_scale_y),
        )
        .clamp(Vec2::ZERO, Vec2::splat(2.0));
        let top_shear = Vec2::new(
            quant::unpack_path_shear(self.path_shear_x),
            quant::unpack_path_shear(self.path_shear_y),
        )
        .clamp(Vec2::splat(-0.5), Vec2::splat(0.5));
        let taper = Vec2::new(
            quant::unpack_signed(self.path_taper_x),
            quant::unpack_signed(self.path_taper_y),
        )
        .clamp(Vec2::splat(-1.0), Vec2::ONE);

        let revolutions = quant::unpack_revolutions(self.path_revolutions).clamp(1.0, 4.0);
        let skew = clamp_skew(
            quant::unpack_signed(self.path_skew),
            revolutions,
            path_scale.x,
        );

        DecodedParams {
            shape_type: self.shape_type(),
            profile_shape,
            hole_shape,
            path_curve,
            profile_begin,
            profile_end,
            profile_hollow,
            path_begin,
            path_end,
            path_scale,
            top_shear,
            taper,
            twist_begin: quant::unpack_signed(self.path_twist_begin).clamp(-1.0, 1.0),
            twist_end: quant::unpack_signed(self.path_twist).clamp(-1.0, 1.0),
            radius_offset: quant::unpack_signed(self.path_radius_offset).clamp(-1.0, 1.0),
            revolutions,
            skew,
        }
    }

    /// Pack decoded parameters into a new primitive shape.
    #[must_use]
    pub fn from_decoded_params(params: &DecodedParams) -> Self {
        let mut shape = Self::default();
        shape.apply_decoded_params(params);
        shape
    }

    /// Pack decoded parameters into this shape, re-applying every clamp.
    ///
    /// Sculpt fields, pcode, physics shape type and state are kept.
    pub fn apply_decoded_params(&mut self, params: &DecodedParams) {
        self.set_profile(params.profile_shape, params.hole_shape);
        self.path_curve = params.path_curve as u8;

        let (begin, end) = clamp_cut(params.profile_begin, params.profile_end);
        self.profile_begin = quant::pack_begin_cut(begin);
        self.profile_end = quant::pack_end_cut(end);
        let (begin, end) = clamp_cut(params.path_begin, params.path_end);
        self.path_begin = quant::pack_begin_cut(begin);
        self.path_end = quant::pack_end_cut(end);

        let hollow = params
            .profile_hollow
            .clamp(0.0, max_hollow(params.profile_shape, params.hole_shape));
        self.profile_hollow = quant::pack_hollow(hollow);

        let scale = params.path_scale.clamp(Vec2::ZERO, Vec2::splat(2.0));
        self.path_scale_x = quant::pack_path_scale(scale.x);
        self.path_scale_y = quant::pack_path_scale(scale.y);
        let shear = params.top_shear.clamp(Vec2::splat(-0.5), Vec2::splat(0.5));
        self.path_shear_x = quant::pack_path_shear(shear.x);
        self.path_shear_y = quant::pack_path_shear(shear.y);
        let taper = params.taper.clamp(Vec2::splat(-1.0), Vec2::ONE);
        self.path_taper_x = quant::pack_signed(taper.x);
        self.path_taper_y = quant::pack_signed(taper.y);

        self.path_twist_begin = quant::pack_signed(params.twist_begin.clamp(-1.0, 1.0));
        self.path_twist = quant::pack_signed(params.twist_end.clamp(-1.0, 1.0));
        self.path_radius_offset = quant::pack_signed(params.radius_offset.clamp(-1.0, 1.0));

        self.path_revolutions = quant::pack_revolutions(params.revolutions.clamp(1.0, 4.0));
        // The skew floor is computed from the packed values it will be checked against.
        let revolutions = quant::unpack_revolutions(self.path_revolutions);
        let hole_x = quant::unpack_path_scale(self.path_scale_x);
        self.path_skew = quant::pack_signed(clamp_skew(params.skew, revolutions, hole_x));
    }

    /// Whether every enumeration is known and every cross-field limit holds.
    ///
    /// Never modifies the shape.
    #[must_use]
    pub fn is_sane(&self) -> bool {
        let (Some(profile), Some(hole), Some(_)) =
            (self.profile_shape(), self.hole_shape(), self.path())
        else {
            return false;
        };

        let Some(sculpt) = SculptType::from_u8(self.sculpt_type) else {
            return false;
        };
        if sculpt != SculptType::None && self.sculpt_map.is_nil() {
            return false;
        }
        if self.physics_shape().is_none() || self.sculpt_inverted > 1 || self.sculpt_mirrored > 1 {
            return false;
        }

        let cut_ok = |begin: u16, end: u16| {
            let begin = quant::unpack_begin_cut(begin);
            let end = quant::unpack_end_cut(end);
            (0.0..=1.0).contains(&begin) && end - begin >= MIN_CUT_ARC - EPSILON
        };
        if !cut_ok(self.profile_begin, self.profile_end) || !cut_ok(self.path_begin, self.path_end)
        {
            return false;
        }

        if quant::unpack_hollow(self.profile_hollow) > max_hollow(profile, hole) + EPSILON {
            return false;
        }

        let unit = -1.0 - EPSILON..=1.0 + EPSILON;
        let signed_in_unit = |v: i8| unit.contains(&quant::unpack_signed(v));
        if ![
            self.path_twist,
            self.path_twist_begin,
            self.path_taper_x,
            self.path_taper_y,
            self.path_radius_offset,
        ]
        .into_iter()
        .all(signed_in_unit)
        {
            return false;
        }

        let scale_x = quant::unpack_path_scale(self.path_scale_x);
        let scale_y = quant::unpack_path_scale(self.path_scale_y);
        if !(0.0..=2.0).contains(&scale_x) || !(0.0..=2.0).contains(&scale_y) {
            return false;
        }
        let shear_ok = |v: u8| quant::unpack_path_shear(v).abs() <= 0.5 + EPSILON;
        if !shear_ok(self.path_shear_x) || !shear_ok(self.path_shear_y) {
            return false;
        }

        let revolutions = quant::unpack_revolutions(self.path_revolutions);
        if revolutions > 4.0 + EPSILON {
            return false;
        }
        let skew = quant::unpack_signed(self.path_skew).abs();
        skew <= MAX_SKEW + EPSILON && skew >= min_skew(revolutions, scale_x) - SKEW_SLACK
    }
}

/// Packed skew has hundredth precision, so the minimum is checked loosely.
const SKEW_SLACK: f32 = 0.005 + EPSILON;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_cut_min_arc() {
        // Begin is pulled back to keep the 0.05 gap.
        let (begin, end) = clamp_cut(0.9, 0.92);
        assert!((begin - 0.87).abs() < 1e-6);
        assert!((end - 0.92).abs() < 1e-6);

        // Pulling back past zero pins the arc at the start.
        assert_eq!(clamp_cut(0.0, 0.01), (0.0, MIN_CUT_ARC));
    }

    #[test]
    fn test_hollow_limit_square_hole() {
        assert!((max_hollow(ProfileShape::Circle, HoleShape::Square) - 0.70).abs() < 1e-6);
        assert!((max_hollow(ProfileShape::Square, HoleShape::Square) - 0.95).abs() < 1e-6);
        assert!((max_hollow(ProfileShape::Square, HoleShape::Same) - 0.95).abs() < 1e-6);
        assert!((max_hollow(ProfileShape::Circle, HoleShape::Circle) - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_decoded_hollow_is_clamped() {
        let mut shape = PrimitiveShape::of_type(PrimitiveShapeType::Cylinder);
        shape.set_profile(ProfileShape::Circle, HoleShape::Square);
        shape.profile_hollow = quant::pack_hollow(0.9);
        assert!(!shape.is_sane());
        let params = shape.decoded_params();
        assert!(params.profile_hollow <= MAX_SQUARE_HOLE_HOLLOW);
    }

    #[test]
    fn test_min_skew() {
        assert!(min_skew(1.0, 0.5).abs() < f32::EPSILON);
        // Two revolutions with a half-width hole: 1 - 1/2 = 0.5.
        assert!((min_skew(2.0, 0.5) - 0.5).abs() < 1e-6);
        assert!((clamp_skew(0.1, 2.0, 0.5) - 0.5).abs() < 1e-6);
        assert!((clamp_skew(-0.1, 2.0, 0.5) + 0.5).abs() < 1e-6);
        assert!((clamp_skew(2.0, 1.0, 0.5) - MAX_SKEW).abs() < 1e-6);
    }

    #[test]
    fn test_decoded_round_trip_default() {
        let shape = PrimitiveShape::of_type(PrimitiveShapeType::Torus);
        let params = shape.decoded_params();
        assert_eq!(PrimitiveShape::from_decoded_params(&params), shape);
    }

    #[test]
    fn test_is_sane_default_shapes() {
        for ty in [
            PrimitiveShapeType::Box,
            PrimitiveShapeType::Sphere,
            PrimitiveShapeType::Ring,
        ] {
            assert!(PrimitiveShape::of_type(ty).is_sane(), "{ty:?}");
        }
    }

    #[test]
    fn test_is_sane_rejects_bad_enums() {
        let shape = PrimitiveShape {
            profile_curve: 0x0f,
            ..PrimitiveShape::default()
        };
        assert!(!shape.is_sane());
        let shape = PrimitiveShape {
            path_curve: 0x11,
            ..PrimitiveShape::default()
        };
        assert!(!shape.is_sane());
    }

    proptest! {
        #[test]
        fn test_hollow_clamp_range(hollow in any::<u16>(), profile in 0u8..=5, hole in 0u8..=3) {
            let mut shape = PrimitiveShape::default();
            shape.profile_curve = profile | (hole << 4);
            shape.profile_hollow = hollow;
            let params = shape.decoded_params();
            prop_assert!(params.profile_hollow >= 0.0);
            prop_assert!(params.profile_hollow <= MAX_HOLLOW);
            let square_hole = params.hole_shape.effective(params.profile_shape) == HoleShape::Square;
            if square_hole && params.profile_shape != ProfileShape::Square {
                prop_assert!(params.profile_hollow <= MAX_SQUARE_HOLE_HOLLOW);
            }
        }

        #[test]
        fn test_packed_params_are_sane(
            begin in 0.0f32..1.0,
            end in 0.0f32..1.0,
            hollow in 0.0f32..1.0,
            revolutions in 1.0f32..4.0,
            skew in -1.0f32..1.0,
            hole_x in 0.05f32..1.0,
        ) {
            let mut params = PrimitiveShape::of_type(PrimitiveShapeType::Torus).decoded_params();
            params.profile_begin = begin;
            params.profile_end = end;
            params.profile_hollow = hollow;
            params.revolutions = revolutions;
            params.skew = skew;
            params.path_scale.x = hole_x;
            prop_assert!(PrimitiveShape::from_decoded_params(&params).is_sane());
        }
    }
}
