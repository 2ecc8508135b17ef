//! Deterministic 2D value noise for terrain synthesis.

use std::f32::consts::PI;

/// Pseudo-random value in `[-1, 1]` for an integer lattice point.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn noise_2d(x: i32, y: i32) -> f32 {
    let n = x.wrapping_add(y.wrapping_mul(57));
    let n = n.wrapping_shl(13) ^ n;
    let hashed = n
        .wrapping_mul(n.wrapping_mul(n).wrapping_mul(15731).wrapping_add(789_221))
        .wrapping_add(1_376_312_589)
        & 0x7fff_ffff;
    1.0 - hashed as f32 / 1_073_741_824.0
}

/// Lattice noise blurred with its eight neighbours.
#[must_use]
pub fn smoothed_noise_2d(x: i32, y: i32) -> f32 {
    let (west, east) = (x.wrapping_sub(1), x.wrapping_add(1));
    let (south, north) = (y.wrapping_sub(1), y.wrapping_add(1));
    let corners = (noise_2d(west, south)
        + noise_2d(east, south)
        + noise_2d(west, north)
        + noise_2d(east, north))
        / 16.0;
    let sides =
        (noise_2d(west, y) + noise_2d(east, y) + noise_2d(x, south) + noise_2d(x, north)) / 8.0;
    let center = noise_2d(x, y) / 4.0;
    corners + sides + center
}

#[must_use]
pub fn cosine_interpolate(a: f32, b: f32, t: f32) -> f32 {
    let f = (1.0 - (t * PI).cos()) * 0.5;
    a * (1.0 - f) + b * f
}

/// Smoothed noise at a fractional position.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn interpolated_noise_2d(x: f32, y: f32) -> f32 {
    let ix = x.floor();
    let iy = y.floor();
    let fx = x - ix;
    let fy = y - iy;
    let (ix, iy) = (ix as i32, iy as i32);

    let v1 = smoothed_noise_2d(ix, iy);
    let v2 = smoothed_noise_2d(ix.wrapping_add(1), iy);
    let v3 = smoothed_noise_2d(ix, iy.wrapping_add(1));
    let v4 = smoothed_noise_2d(ix.wrapping_add(1), iy.wrapping_add(1));

    let south = cosine_interpolate(v1, v2, fx);
    let north = cosine_interpolate(v3, v4, fx);
    cosine_interpolate(south, north, fy)
}

/// Sum of `octaves` layers of interpolated noise. Octave `i` samples at
/// frequency `2^i` with amplitude `persistence^i`.
#[must_use]
pub fn perlin_noise_2d(x: f32, y: f32, octaves: u32, persistence: f32) -> f32 {
    let mut total = 0.0;
    let mut frequency = 1.0;
    let mut amplitude = 1.0;
    for _ in 0..octaves {
        total += interpolated_noise_2d(x * frequency, y * frequency) * amplitude;
        frequency *= 2.0;
        amplitude *= persistence;
    }
    total
}
