//! The heightmap and the terraforming effects that edit it.

mod effects;
mod flood;
mod map;
mod noise;
mod paint;

pub use effects::{
    Brush, EffectContext, FLOOD_EFFECTS, FloodArea, FloodEffectFn, PAINT_EFFECTS, PaintArea,
    PaintEffectFn, TerraformSettings, TerrainEffect, Terraforming,
};
pub use map::{PatchChange, TERRAIN_PATCH_SIZE, TerrainListener, TerrainMap, TerrainPatch};
pub use noise::{
    cosine_interpolate, interpolated_noise_2d, noise_2d, perlin_noise_2d, smoothed_noise_2d,
};
pub use paint::falloff;
