//! Encode and decode primitive geometry for a region simulator.
//!
//! This crate provides pure synchronous codecs for the data a primitive
//! carries on the wire and in scripts: the 45-byte shape record, the
//! `PRIM_TYPE` parameter list, per-face texture entries, the extra-params
//! blob and texture animations. Nothing here locks or logs; callers own
//! concurrency.
//!
//! # Design principles
//!
//! - **Raw fields, decoded views**: [`PrimitiveShape`] stores wire integers,
//!   [`DecodedParams`] is the clamped float view
//! - **Fail fast**: wrong-length buffers and out-of-range codes are errors,
//!   never silently truncated

mod error;
mod extra_params;
mod faces;
mod list;
mod params;
mod prim_type;
pub mod quant;
mod shape;
mod texture_anim;
mod texture_entry;

pub use error::{ShapeError, ShapeResult};
pub use extra_params::{
    EXTRA_FLEXIBLE, EXTRA_LIGHT, EXTRA_PROJECTOR, EXTRA_SCULPT, ExtraParams, FlexibleParams,
    LightParams, ProjectorParams, SculptParams,
};
pub use list::{ParamReader, ParamValue};
pub use params::{
    DecodedParams, MAX_HOLLOW, MAX_SKEW, MAX_SQUARE_HOLE_HOLLOW, MIN_CUT_ARC, clamp_cut,
    clamp_skew, max_hollow, min_skew,
};
pub use prim_type::{
    PRIM_HOLE_CIRCLE, PRIM_HOLE_DEFAULT, PRIM_HOLE_SQUARE, PRIM_HOLE_TRIANGLE,
    PRIM_SCULPT_FLAG_INVERT, PRIM_SCULPT_FLAG_MIRROR, PRIM_TYPE_BOX, PRIM_TYPE_CYLINDER,
    PRIM_TYPE_PRISM, PRIM_TYPE_RING, PRIM_TYPE_SCULPT, PRIM_TYPE_SPHERE, PRIM_TYPE_TORUS,
    PRIM_TYPE_TUBE,
};
pub use shape::{
    HoleShape, PCODE_PRIMITIVE, PathCurve, PhysicsShapeType, PrimitiveShape, PrimitiveShapeType,
    ProfileShape, SHAPE_RECORD_LEN, SculptType,
};
pub use texture_anim::{
    ANIM_LOOP, ANIM_ON, ANIM_PING_PONG, ANIM_REVERSE, ANIM_ROTATE, ANIM_SCALE, ANIM_SMOOTH,
    TEXTURE_ANIMATION_LEN, TextureAnimation,
};
pub use texture_entry::{
    ALL_SIDES, DEFAULT_TEXTURE, MAX_FACES, TextureEntry, TextureEntryFace,
};
