//! Effect identifiers, parameters and the dispatch tables.

use serde::{Deserialize, Serialize};

use super::map::TerrainMap;
use super::{flood, paint};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TerrainEffect {
    Flatten = 0,
    Raise = 1,
    Lower = 2,
    Smooth = 3,
    Noise = 4,
    Revert = 5,
}

impl TerrainEffect {
    pub const ALL: [Self; 6] = [
        Self::Flatten,
        Self::Raise,
        Self::Lower,
        Self::Smooth,
        Self::Noise,
        Self::Revert,
    ];

    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Flatten => "flatten",
            Self::Raise => "raise",
            Self::Lower => "lower",
            Self::Smooth => "smooth",
            Self::Noise => "noise",
            Self::Revert => "revert",
        }
    }
}

impl std::str::FromStr for TerrainEffect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|effect| effect.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Terraform {
                detail: format!("unknown effect {s:?}"),
            })
    }
}

/// Tunables for the noise effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformSettings {
    pub noise_octaves: u32,
    pub noise_persistence: f32,
    /// Metres per noise lattice step.
    pub noise_scale: f32,
}

impl Default for TerraformSettings {
    fn default() -> Self {
        Self {
            noise_octaves: 4,
            noise_persistence: 0.5,
            noise_scale: 16.0,
        }
    }
}

impl TerraformSettings {
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.noise_octaves = self.noise_octaves.clamp(1, 16);
        if !self.noise_persistence.is_finite() {
            self.noise_persistence = defaults.noise_persistence;
        }
        self.noise_persistence = self.noise_persistence.clamp(0.0, 1.0);
        if !self.noise_scale.is_finite() || self.noise_scale <= 0.0 {
            self.noise_scale = defaults.noise_scale;
        }
        self
    }
}

/// How hard and how long the tool was applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub strength: f32,
    pub duration: f32,
}

impl Brush {
    #[must_use]
    pub fn amount(self) -> f32 {
        let amount = self.strength * self.duration;
        if amount.is_finite() { amount.max(0.0) } else { 0.0 }
    }
}

/// A round brush centred on a point, clipped to its bounding square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintArea {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// A rectangle in region metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloodArea {
    pub west: f32,
    pub south: f32,
    pub east: f32,
    pub north: f32,
}

/// Everything an effect may touch.
pub struct EffectContext<'a> {
    pub map: &'a TerrainMap,
    /// Whether the cell at `(x, y)` may be changed.
    pub allowed: &'a dyn Fn(usize, usize) -> bool,
    pub settings: &'a TerraformSettings,
    /// How far above its baked height a cell may be raised.
    pub raise_limit: f32,
    /// How far below its baked height a cell may be lowered.
    pub lower_limit: f32,
}

impl EffectContext<'_> {
    /// Gate, compute and clamp one cell. Returns whether it changed.
    pub fn modify(&self, x: usize, y: usize, f: impl FnOnce(f32, f32) -> f32) -> bool {
        if !(self.allowed)(x, y) {
            return false;
        }
        let raise = self.raise_limit.max(0.0);
        let lower = self.lower_limit.max(0.0);
        self.map.adjust_terrain(x, y, |height, baked| {
            f(height, baked).clamp(baked - lower, baked + raise)
        })
    }

    /// Integer cells covered by a rectangle, clipped to the map.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub(crate) fn cells(
        &self,
        west: f32,
        south: f32,
        east: f32,
        north: f32,
    ) -> impl Iterator<Item = (usize, usize)> + use<> {
        let clip = |v: f32, max: usize| {
            if v.is_finite() {
                v.max(0.0).min(max as f32) as usize
            } else {
                0
            }
        };
        let (size_x, size_y) = (self.map.size_x(), self.map.size_y());
        let (x0, x1) = (clip(west.floor(), size_x), clip(east.ceil(), size_x));
        let (y0, y1) = (clip(south.floor(), size_y), clip(north.ceil(), size_y));
        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
    }
}

/// Applies a brush; returns the number of cells changed.
pub type PaintEffectFn = fn(&EffectContext<'_>, &PaintArea, Brush) -> usize;
/// Applies a flood; returns the number of cells changed.
pub type FloodEffectFn = fn(&EffectContext<'_>, &FloodArea, Brush) -> usize;

pub const PAINT_EFFECTS: &[(TerrainEffect, PaintEffectFn)] = &[
    (TerrainEffect::Flatten, paint::flatten),
    (TerrainEffect::Raise, paint::raise),
    (TerrainEffect::Lower, paint::lower),
    (TerrainEffect::Smooth, paint::smooth),
    (TerrainEffect::Noise, paint::noise),
    (TerrainEffect::Revert, paint::revert),
];

pub const FLOOD_EFFECTS: &[(TerrainEffect, FloodEffectFn)] = &[
    (TerrainEffect::Flatten, flood::flatten),
    (TerrainEffect::Raise, flood::raise),
    (TerrainEffect::Lower, flood::lower),
    (TerrainEffect::Smooth, flood::smooth),
    (TerrainEffect::Noise, flood::noise),
    (TerrainEffect::Revert, flood::revert),
];

/// Index a registration table by effect, requiring exactly one handler for
/// every effect.
fn registry<F: Copy>(family: &str, table: &[(TerrainEffect, F)]) -> Result<[F; 6]> {
    let mut slots: [Option<F>; 6] = [None; 6];
    for &(effect, handler) in table {
        let slot = &mut slots[effect as usize];
        if slot.is_some() {
            return Err(Error::Terraform {
                detail: format!("{family} effect {} registered twice", effect.name()),
            });
        }
        *slot = Some(handler);
    }
    let mut handlers = Vec::with_capacity(slots.len());
    for (effect, slot) in TerrainEffect::ALL.into_iter().zip(slots) {
        handlers.push(slot.ok_or_else(|| Error::Terraform {
            detail: format!("{family} effect {} has no handler", effect.name()),
        })?);
    }
    handlers.try_into().map_err(|_| Error::Terraform {
        detail: format!("{family} effect table is malformed"),
    })
}

/// The validated paint and flood dispatch tables.
#[derive(Debug, Clone)]
pub struct Terraforming {
    paint: [PaintEffectFn; 6],
    flood: [FloodEffectFn; 6],
}

impl Terraforming {
    pub fn new() -> Result<Self> {
        Self::from_tables(PAINT_EFFECTS, FLOOD_EFFECTS)
    }

    pub(crate) fn from_tables(
        paint: &[(TerrainEffect, PaintEffectFn)],
        flood: &[(TerrainEffect, FloodEffectFn)],
    ) -> Result<Self> {
        let terraforming = Self {
            paint: registry("paint", paint)?,
            flood: registry("flood", flood)?,
        };
        tracing::debug!(
            paint = paint.len(),
            flood = flood.len(),
            "terraform effects registered"
        );
        Ok(terraforming)
    }

    pub fn paint(
        &self,
        effect: TerrainEffect,
        context: &EffectContext<'_>,
        area: &PaintArea,
        brush: Brush,
    ) -> usize {
        (self.paint[effect as usize])(context, area, brush)
    }

    pub fn flood(
        &self,
        effect: TerrainEffect,
        context: &EffectContext<'_>,
        area: &FloodArea,
        brush: Brush,
    ) -> usize {
        (self.flood[effect as usize])(context, area, brush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_cover_every_effect() {
        assert!(Terraforming::new().is_ok());
        assert_eq!(PAINT_EFFECTS.len(), TerrainEffect::ALL.len());
        assert_eq!(FLOOD_EFFECTS.len(), TerrainEffect::ALL.len());
    }

    #[test]
    fn test_missing_or_duplicate_handler_is_rejected() {
        let missing = Terraforming::from_tables(&PAINT_EFFECTS[1..], FLOOD_EFFECTS);
        assert!(matches!(missing, Err(Error::Terraform { .. })));

        let mut doubled = FLOOD_EFFECTS.to_vec();
        doubled.push((TerrainEffect::Raise, flood::lower));
        let duplicate = Terraforming::from_tables(PAINT_EFFECTS, &doubled);
        assert!(matches!(duplicate, Err(Error::Terraform { .. })));
    }

    #[test]
    fn test_effect_codes_and_names() {
        assert_eq!(TerrainEffect::from_u8(1), Some(TerrainEffect::Raise));
        assert_eq!(TerrainEffect::from_u8(6), None);
        assert_eq!("Smooth".parse::<TerrainEffect>().ok(), Some(TerrainEffect::Smooth));
        assert!("dig".parse::<TerrainEffect>().is_err());
    }

    #[test]
    fn test_modify_clamps_to_limits_and_honours_gate() {
        let map = TerrainMap::new(16, 16, 20.0);
        let settings = TerraformSettings::default();
        let allowed = |x: usize, _y: usize| x < 8;
        let context = EffectContext {
            map: &map,
            allowed: &allowed,
            settings: &settings,
            raise_limit: 4.0,
            lower_limit: 2.0,
        };
        assert!(context.modify(1, 1, |h, _| h + 10.0));
        assert_eq!(map.height(1, 1), 24.0);
        assert!(context.modify(2, 1, |h, _| h - 10.0));
        assert_eq!(map.height(2, 1), 18.0);
        assert!(!context.modify(9, 1, |h, _| h + 1.0));
        assert_eq!(map.height(9, 1), 20.0);
        assert_eq!(context.cells(-3.0, 14.5, 2.0, 40.0).count(), 4);
    }
}
