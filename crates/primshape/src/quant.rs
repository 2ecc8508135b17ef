//! Quantisation between the float shape parameters and their packed integers.
//!
//! Every pack function rounds to the nearest quantum and saturates at the
//! limits of the storage type.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

/// Quantum of profile and path cuts.
pub const CUT_QUANTA: f32 = 0.000_02;
/// Quantum of path scale (top size and hole size).
pub const SCALE_QUANTA: f32 = 0.01;
/// Quantum of path shear.
pub const SHEAR_QUANTA: f32 = 0.01;
/// Quantum of taper, twist, skew and radius offset.
pub const SIGNED_QUANTA: f32 = 0.01;
/// Quantum of path revolutions above one.
pub const REV_QUANTA: f32 = 0.015;
/// Quantum of profile hollow.
pub const HOLLOW_QUANTA: f32 = 0.000_02;

/// Packed value of a full (unit) end cut complement.
const CUT_STEPS: u16 = 50_000;

#[must_use]
pub fn pack_begin_cut(v: f32) -> u16 {
    (v / CUT_QUANTA).round() as u16
}

#[must_use]
pub fn unpack_begin_cut(v: u16) -> f32 {
    f32::from(v) * CUT_QUANTA
}

/// End cuts are stored as the distance from the end, so 0 means "uncut".
#[must_use]
pub fn pack_end_cut(v: f32) -> u16 {
    CUT_STEPS.saturating_sub(pack_begin_cut(v))
}

#[must_use]
pub fn unpack_end_cut(v: u16) -> f32 {
    f32::from(CUT_STEPS.saturating_sub(v)) * CUT_QUANTA
}

#[must_use]
pub fn pack_path_scale(v: f32) -> u8 {
    (200.0 - (v / SCALE_QUANTA).round()).clamp(0.0, 255.0) as u8
}

#[must_use]
pub fn unpack_path_scale(v: u8) -> f32 {
    (200.0 - f32::from(v)) * SCALE_QUANTA
}

#[must_use]
pub fn pack_path_shear(v: f32) -> u8 {
    ((v / SHEAR_QUANTA).round() as i8).to_le_bytes()[0]
}

#[must_use]
pub fn unpack_path_shear(v: u8) -> f32 {
    f32::from(i8::from_le_bytes([v])) * SHEAR_QUANTA
}

/// Pack a value in hundredths into a signed byte.
#[must_use]
pub fn pack_signed(v: f32) -> i8 {
    (v / SIGNED_QUANTA).round() as i8
}

#[must_use]
pub fn unpack_signed(v: i8) -> f32 {
    f32::from(v) * SIGNED_QUANTA
}

#[must_use]
pub fn pack_revolutions(v: f32) -> u8 {
    ((v - 1.0) / REV_QUANTA).round() as u8
}

#[must_use]
pub fn unpack_revolutions(v: u8) -> f32 {
    1.0 + f32::from(v) * REV_QUANTA
}

#[must_use]
pub fn pack_hollow(v: f32) -> u16 {
    (v / HOLLOW_QUANTA).round() as u16
}

#[must_use]
pub fn unpack_hollow(v: u16) -> f32 {
    f32::from(v) * HOLLOW_QUANTA
}
