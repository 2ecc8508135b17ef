//! The `PRIM_TYPE` parameter list.
//!
//! Spheres and the circular-path shapes (torus, tube, ring) report their
//! `cut` against the path and their dimple/advanced cut against the profile,
//! the reverse of the straight-path shapes.

use crate::error::{ShapeError, ShapeResult};
use crate::list::{ParamReader, ParamValue};
use crate::params::{clamp_cut, DecodedParams};
use crate::shape::{HoleShape, PrimitiveShape, PrimitiveShapeType, SculptType};
use glam::{Vec2, Vec3};

pub const PRIM_TYPE_BOX: i32 = 0;
pub const PRIM_TYPE_CYLINDER: i32 = 1;
pub const PRIM_TYPE_PRISM: i32 = 2;
pub const PRIM_TYPE_SPHERE: i32 = 3;
pub const PRIM_TYPE_TORUS: i32 = 4;
pub const PRIM_TYPE_TUBE: i32 = 5;
pub const PRIM_TYPE_RING: i32 = 6;
pub const PRIM_TYPE_SCULPT: i32 = 7;

pub const PRIM_HOLE_DEFAULT: i32 = 0x00;
pub const PRIM_HOLE_CIRCLE: i32 = 0x10;
pub const PRIM_HOLE_SQUARE: i32 = 0x20;
pub const PRIM_HOLE_TRIANGLE: i32 = 0x30;

pub const PRIM_SCULPT_FLAG_INVERT: i32 = 0x40;
pub const PRIM_SCULPT_FLAG_MIRROR: i32 = 0x80;

fn hole_from_code(code: i32) -> HoleShape {
    match code {
        PRIM_HOLE_CIRCLE => HoleShape::Circle,
        PRIM_HOLE_SQUARE => HoleShape::Square,
        PRIM_HOLE_TRIANGLE => HoleShape::Triangle,
        _ => HoleShape::Same,
    }
}

fn pair(v: Vec2) -> ParamValue {
    ParamValue::Vector(Vec3::new(v.x, v.y, 0.0))
}

impl PrimitiveShape {
    /// The shape as a `PRIM_TYPE` list: the type code followed by its parameters.
    #[must_use]
    pub fn to_primitive_params(&self) -> Vec<ParamValue> {
        let d = self.decoded_params();
        let shape_type = d.shape_type;

        if shape_type == PrimitiveShapeType::Sculpt {
            let mut flags = i32::from(self.sculpt_type & 0x07);
            if self.is_sculpt_inverted() {
                flags |= PRIM_SCULPT_FLAG_INVERT;
            }
            if self.is_sculpt_mirrored() {
                flags |= PRIM_SCULPT_FLAG_MIRROR;
            }
            return vec![
                ParamValue::Integer(PRIM_TYPE_SCULPT),
                ParamValue::Key(self.sculpt_map),
                ParamValue::Integer(flags),
            ];
        }

        let code = shape_type.code().unwrap_or(PRIM_TYPE_BOX);
        let hole = ParamValue::Integer(i32::from(d.hole_shape as u8));
        let profile_cut = pair(Vec2::new(d.profile_begin, d.profile_end));
        let path_cut = pair(Vec2::new(d.path_begin, d.path_end));
        let hollow = ParamValue::Float(f64::from(d.profile_hollow));
        let twist = pair(Vec2::new(d.twist_begin, d.twist_end));

        match shape_type {
            PrimitiveShapeType::Sphere => vec![
                ParamValue::Integer(code),
                hole,
                path_cut,
                hollow,
                twist,
                profile_cut,
            ],
            PrimitiveShapeType::Torus | PrimitiveShapeType::Tube | PrimitiveShapeType::Ring => {
                vec![
                    ParamValue::Integer(code),
                    hole,
                    path_cut,
                    hollow,
                    twist,
                    pair(d.path_scale),
                    pair(d.top_shear),
                    profile_cut,
                    pair(d.taper),
                    ParamValue::Float(f64::from(d.revolutions)),
                    ParamValue::Float(f64::from(d.radius_offset)),
                    ParamValue::Float(f64::from(d.skew)),
                ]
            }
            _ => vec![
                ParamValue::Integer(code),
                hole,
                profile_cut,
                hollow,
                twist,
                pair(d.path_scale),
                pair(d.top_shear),
            ],
        }
    }

    /// Apply a `PRIM_TYPE` list (type code first), clamping every value.
    ///
    /// The shape is only modified when the whole list reads successfully.
    pub fn apply_primitive_params(&mut self, reader: &mut ParamReader<'_>) -> ShapeResult<()> {
        let code = reader.read_integer("PRIM_TYPE")?;
        let shape_type =
            PrimitiveShapeType::from_code(code).ok_or(ShapeError::OutOfRange {
                context: "PRIM_TYPE",
                value: i64::from(code),
            })?;

        if shape_type == PrimitiveShapeType::Sculpt {
            let map = reader.read_key("sculpt map")?;
            let flags = reader.read_integer("sculpt type")?;
            let sculpt_type = u8::try_from(flags & 0x07)
                .ok()
                .and_then(SculptType::from_u8)
                .unwrap_or(SculptType::Sphere);
            let mut next = Self {
                sculpt_map: map,
                ..Self::of_type(PrimitiveShapeType::Sphere)
            };
            next.set_sculpt_kind(sculpt_type);
            next.set_sculpt_flags(
                flags & PRIM_SCULPT_FLAG_INVERT != 0,
                flags & PRIM_SCULPT_FLAG_MIRROR != 0,
            );
            next.carry_state(self);
            *self = next;
            return Ok(());
        }

        let hole = hole_from_code(reader.read_integer("hole shape")?);
        let cut = reader.read_vector("cut")?;
        let hollow = reader.read_f32("hollow")?;
        let twist = reader.read_vector("twist")?;

        let mut next = Self::of_type(shape_type);
        next.carry_state(self);
        let mut d: DecodedParams = next.decoded_params();
        d.hole_shape = hole;
        d.profile_hollow = hollow;
        d.twist_begin = twist.x;
        d.twist_end = twist.y;

        match shape_type {
            PrimitiveShapeType::Sphere => {
                let dimple = reader.read_vector("dimple")?;
                (d.path_begin, d.path_end) = clamp_cut(cut.x, cut.y);
                (d.profile_begin, d.profile_end) = clamp_cut(dimple.x, dimple.y);
            }
            PrimitiveShapeType::Torus | PrimitiveShapeType::Tube | PrimitiveShapeType::Ring => {
                let hole_size = reader.read_vector("hole size")?;
                let top_shear = reader.read_vector("top shear")?;
                let advanced_cut = reader.read_vector("advanced cut")?;
                let taper = reader.read_vector("taper")?;
                let revolutions = reader.read_f32("revolutions")?;
                let radius_offset = reader.read_f32("radius offset")?;
                let skew = reader.read_f32("skew")?;
                (d.path_begin, d.path_end) = clamp_cut(cut.x, cut.y);
                (d.profile_begin, d.profile_end) = clamp_cut(advanced_cut.x, advanced_cut.y);
                d.path_scale = Vec2::new(hole_size.x.clamp(0.01, 1.0), hole_size.y.clamp(0.01, 0.5));
                d.top_shear = Vec2::new(top_shear.x, top_shear.y);
                d.taper = Vec2::new(taper.x, taper.y);
                d.revolutions = revolutions;
                d.radius_offset = radius_offset;
                d.skew = skew;
            }
            _ => {
                let top_size = reader.read_vector("top size")?;
                let top_shear = reader.read_vector("top shear")?;
                (d.profile_begin, d.profile_end) = clamp_cut(cut.x, cut.y);
                d.path_scale = Vec2::new(top_size.x, top_size.y);
                d.top_shear = Vec2::new(top_shear.x, top_shear.y);
            }
        }

        next.apply_decoded_params(&d);
        *self = next;
        Ok(())
    }

    /// Decode a standalone `PRIM_TYPE` list into a new shape.
    pub fn from_primitive_params(values: &[ParamValue]) -> ShapeResult<Self> {
        let mut shape = Self::default();
        shape.apply_primitive_params(&mut ParamReader::new(values))?;
        Ok(shape)
    }

    /// Keep the fields a type change never touches.
    fn carry_state(&mut self, from: &Self) {
        self.pcode = from.pcode;
        self.state = from.state;
        self.physics_shape_type = from.physics_shape_type;
    }
}
