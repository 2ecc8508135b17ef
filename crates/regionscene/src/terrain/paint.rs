//! Brush effects around a point.
//!
//! Every effect walks the brush's bounding square and weights its change by
//! a cosine falloff from the centre; cells at or beyond the radius are left
//! alone. A zero radius paints just the cell under the centre.

use std::f32::consts::PI;

use super::effects::{Brush, EffectContext, PaintArea};
use super::noise::perlin_noise_2d;

/// Weight of a cell `distance` metres from the centre of a brush.
#[must_use]
pub fn falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return if distance < 0.5 { 1.0 } else { 0.0 };
    }
    if distance >= radius {
        0.0
    } else {
        0.5 * (1.0 + (PI * distance / radius).cos())
    }
}

/// Cells under the brush with their weights.
#[allow(clippy::cast_precision_loss)]
fn footprint(context: &EffectContext<'_>, area: &PaintArea) -> Vec<(usize, usize, f32)> {
    let radius = if area.radius.is_finite() { area.radius.max(0.0) } else { 0.0 };
    let reach = radius.max(0.5);
    context
        .cells(area.x - reach, area.y - reach, area.x + reach, area.y + reach)
        .filter_map(|(x, y)| {
            let dx = x as f32 - area.x;
            let dy = y as f32 - area.y;
            let weight = falloff(dx.hypot(dy), radius);
            (weight > 0.0).then_some((x, y, weight))
        })
        .collect()
}

fn apply(
    context: &EffectContext<'_>,
    area: &PaintArea,
    mut f: impl FnMut(usize, usize, f32, f32, f32) -> f32,
) -> usize {
    footprint(context, area)
        .into_iter()
        .filter(|&(x, y, weight)| {
            context.modify(x, y, |height, baked| f(x, y, weight, height, baked))
        })
        .count()
}

pub fn raise(context: &EffectContext<'_>, area: &PaintArea, brush: Brush) -> usize {
    let amount = brush.amount();
    apply(context, area, |_, _, weight, height, _| height + amount * weight)
}

pub fn lower(context: &EffectContext<'_>, area: &PaintArea, brush: Brush) -> usize {
    let amount = brush.amount();
    apply(context, area, |_, _, weight, height, _| height - amount * weight)
}

/// Pull cells toward the height under the brush centre.
pub fn flatten(context: &EffectContext<'_>, area: &PaintArea, brush: Brush) -> usize {
    let target = context.map.bilinear(area.x, area.y);
    let amount = brush.amount();
    apply(context, area, |_, _, weight, height, _| {
        let factor = (amount * weight).min(1.0);
        height + (target - height) * factor
    })
}

/// Pull cells toward the average of their neighbourhood. Averages are taken
/// before any cell changes.
#[allow(clippy::cast_precision_loss)]
pub fn smooth(context: &EffectContext<'_>, area: &PaintArea, brush: Brush) -> usize {
    let step = (area.radius / 4.0).max(1.0);
    let amount = brush.amount();
    let targets: Vec<(usize, usize, f32, f32)> = footprint(context, area)
        .into_iter()
        .map(|(x, y, weight)| {
            let average = neighbourhood_average(context, x as f32, y as f32, step);
            (x, y, weight, average)
        })
        .collect();
    targets
        .into_iter()
        .filter(|&(x, y, weight, average)| {
            context.modify(x, y, |height, _| {
                let factor = (amount * weight).min(1.0);
                height + (average - height) * factor
            })
        })
        .count()
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn neighbourhood_average(context: &EffectContext<'_>, x: f32, y: f32, step: f32) -> f32 {
    let mut total = 0.0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            total += context
                .map
                .bilinear(x + dx as f32 * step, y + dy as f32 * step);
        }
    }
    total / 9.0
}

/// Add octave noise scaled by the brush.
#[allow(clippy::cast_precision_loss)]
pub fn noise(context: &EffectContext<'_>, area: &PaintArea, brush: Brush) -> usize {
    let settings = context.settings.sanitized();
    let amount = brush.amount();
    apply(context, area, |x, y, weight, height, _| {
        let sample = perlin_noise_2d(
            x as f32 / settings.noise_scale,
            y as f32 / settings.noise_scale,
            settings.noise_octaves,
            settings.noise_persistence,
        );
        height + sample * amount * weight
    })
}

/// Pull cells back toward their baked heights.
pub fn revert(context: &EffectContext<'_>, area: &PaintArea, brush: Brush) -> usize {
    let amount = brush.amount();
    apply(context, area, |_, _, weight, height, baked| {
        let factor = (amount * weight).min(1.0);
        height + (baked - height) * factor
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{TerraformSettings, TerrainMap};

    fn context<'a>(
        map: &'a TerrainMap,
        allowed: &'a dyn Fn(usize, usize) -> bool,
        settings: &'a TerraformSettings,
    ) -> EffectContext<'a> {
        EffectContext {
            map,
            allowed,
            settings,
            raise_limit: 100.0,
            lower_limit: 100.0,
        }
    }

    #[test]
    fn test_falloff_shape() {
        assert_eq!(falloff(0.0, 4.0), 1.0);
        assert!((falloff(2.0, 4.0) - 0.5).abs() < 1e-6);
        assert_eq!(falloff(4.0, 4.0), 0.0);
        assert_eq!(falloff(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_raise_is_strongest_at_centre() {
        let map = TerrainMap::new(32, 32, 20.0);
        let settings = TerraformSettings::default();
        let allowed = |_: usize, _: usize| true;
        let ctx = context(&map, &allowed, &settings);
        let brush = Brush {
            strength: 2.0,
            duration: 1.0,
        };
        let changed = raise(&ctx, &PaintArea { x: 10.0, y: 10.0, radius: 4.0 }, brush);
        assert!(changed > 0);
        assert_eq!(map.height(10, 10), 22.0);
        assert!(map.height(12, 10) > 20.0 && map.height(12, 10) < 22.0);
        // Corners of the bounding square are outside the circle.
        assert_eq!(map.height(13, 13), 20.0);
        assert_eq!(map.height(14, 10), 20.0);

        lower(&ctx, &PaintArea { x: 10.0, y: 10.0, radius: 4.0 }, brush);
        assert!((map.height(10, 10) - 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_flatten_and_revert_converge() {
        let map = TerrainMap::new(32, 32, 20.0);
        map.set_height(5, 5, 30.0);
        map.set_height(6, 5, 26.0);
        let settings = TerraformSettings::default();
        let allowed = |_: usize, _: usize| true;
        let ctx = context(&map, &allowed, &settings);
        let full = Brush {
            strength: 10.0,
            duration: 1.0,
        };
        flatten(&ctx, &PaintArea { x: 5.0, y: 5.0, radius: 0.0 }, full);
        assert_eq!(map.height(5, 5), 30.0);

        revert(&ctx, &PaintArea { x: 6.0, y: 5.0, radius: 0.0 }, full);
        assert_eq!(map.height(6, 5), 20.0);
        assert_eq!(map.height(5, 5), 30.0);
    }

    #[test]
    fn test_smooth_reduces_spike() {
        let map = TerrainMap::new(32, 32, 20.0);
        map.set_height(8, 8, 40.0);
        let settings = TerraformSettings::default();
        let allowed = |_: usize, _: usize| true;
        let ctx = context(&map, &allowed, &settings);
        let changed = smooth(
            &ctx,
            &PaintArea { x: 8.0, y: 8.0, radius: 2.0 },
            Brush {
                strength: 1.0,
                duration: 1.0,
            },
        );
        assert!(changed > 0);
        assert!(map.height(8, 8) < 40.0);
        assert!(map.height(9, 8) > 20.0);
    }

    #[test]
    fn test_noise_changes_heights_deterministically() {
        let settings = TerraformSettings::default();
        let allowed = |_: usize, _: usize| true;
        let area = PaintArea { x: 16.0, y: 16.0, radius: 6.0 };
        let brush = Brush {
            strength: 3.0,
            duration: 1.0,
        };
        let first = TerrainMap::new(32, 32, 20.0);
        let second = TerrainMap::new(32, 32, 20.0);
        noise(&context(&first, &allowed, &settings), &area, brush);
        noise(&context(&second, &allowed, &settings), &area, brush);
        assert_eq!(first.snapshot(), second.snapshot());
        assert_ne!(first.snapshot(), TerrainMap::new(32, 32, 20.0).snapshot());
    }
}
