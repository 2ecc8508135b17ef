//! Effects applied uniformly over a rectangle.

use super::effects::{Brush, EffectContext, FloodArea};
use super::noise::perlin_noise_2d;
use super::paint::neighbourhood_average;

fn cells(context: &EffectContext<'_>, area: &FloodArea) -> Vec<(usize, usize)> {
    context
        .cells(area.west, area.south, area.east, area.north)
        .collect()
}

fn apply(
    context: &EffectContext<'_>,
    area: &FloodArea,
    mut f: impl FnMut(usize, usize, f32, f32) -> f32,
) -> usize {
    cells(context, area)
        .into_iter()
        .filter(|&(x, y)| context.modify(x, y, |height, baked| f(x, y, height, baked)))
        .count()
}

pub fn raise(context: &EffectContext<'_>, area: &FloodArea, brush: Brush) -> usize {
    let amount = brush.amount();
    apply(context, area, |_, _, height, _| height + amount)
}

pub fn lower(context: &EffectContext<'_>, area: &FloodArea, brush: Brush) -> usize {
    let amount = brush.amount();
    apply(context, area, |_, _, height, _| height - amount)
}

/// Pull the area toward its mean height.
#[allow(clippy::cast_precision_loss)]
pub fn flatten(context: &EffectContext<'_>, area: &FloodArea, brush: Brush) -> usize {
    let covered = cells(context, area);
    if covered.is_empty() {
        return 0;
    }
    let mean = covered
        .iter()
        .map(|&(x, y)| context.map.height(x, y))
        .sum::<f32>()
        / covered.len() as f32;
    let factor = brush.amount().min(1.0);
    covered
        .into_iter()
        .filter(|&(x, y)| context.modify(x, y, |height, _| height + (mean - height) * factor))
        .count()
}

#[allow(clippy::cast_precision_loss)]
pub fn smooth(context: &EffectContext<'_>, area: &FloodArea, brush: Brush) -> usize {
    let factor = brush.amount().min(1.0);
    let targets: Vec<(usize, usize, f32)> = cells(context, area)
        .into_iter()
        .map(|(x, y)| (x, y, neighbourhood_average(context, x as f32, y as f32, 1.0)))
        .collect();
    targets
        .into_iter()
        .filter(|&(x, y, average)| {
            context.modify(x, y, |height, _| height + (average - height) * factor)
        })
        .count()
}

#[allow(clippy::cast_precision_loss)]
pub fn noise(context: &EffectContext<'_>, area: &FloodArea, brush: Brush) -> usize {
    let settings = context.settings.sanitized();
    let amount = brush.amount();
    apply(context, area, |x, y, height, _| {
        let sample = perlin_noise_2d(
            x as f32 / settings.noise_scale,
            y as f32 / settings.noise_scale,
            settings.noise_octaves,
            settings.noise_persistence,
        );
        height + sample * amount
    })
}

pub fn revert(context: &EffectContext<'_>, area: &FloodArea, brush: Brush) -> usize {
    let factor = brush.amount().min(1.0);
    apply(context, area, |_, _, height, baked| {
        height + (baked - height) * factor
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{TerraformSettings, TerrainMap};

    const FULL: Brush = Brush {
        strength: 1.0,
        duration: 1.0,
    };

    #[test]
    fn test_raise_covers_rectangle_only() {
        let map = TerrainMap::new(32, 32, 20.0);
        let settings = TerraformSettings::default();
        let allowed = |_: usize, _: usize| true;
        let context = EffectContext {
            map: &map,
            allowed: &allowed,
            settings: &settings,
            raise_limit: 100.0,
            lower_limit: 100.0,
        };
        let area = FloodArea {
            west: 4.0,
            south: 4.0,
            east: 8.0,
            north: 6.0,
        };
        assert_eq!(raise(&context, &area, FULL), 8);
        assert_eq!(map.height(4, 4), 21.0);
        assert_eq!(map.height(7, 5), 21.0);
        assert_eq!(map.height(8, 5), 20.0);
        assert_eq!(map.height(4, 6), 20.0);
    }

    #[test]
    fn test_flatten_levels_to_mean_and_respects_limits() {
        let map = TerrainMap::new(16, 16, 20.0);
        map.set_height(0, 0, 24.0);
        map.bake();
        let settings = TerraformSettings::default();
        let allowed = |_: usize, _: usize| true;
        let context = EffectContext {
            map: &map,
            allowed: &allowed,
            settings: &settings,
            raise_limit: 1.0,
            lower_limit: 1.0,
        };
        let area = FloodArea {
            west: 0.0,
            south: 0.0,
            east: 2.0,
            north: 2.0,
        };
        assert_eq!(flatten(&context, &area, FULL), 4);
        // Mean is 21 but the spike may only sink one metre below its baked height.
        assert_eq!(map.height(0, 0), 23.0);
        assert_eq!(map.height(1, 1), 21.0);

        assert_eq!(revert(&context, &area, FULL), 4);
        assert_eq!(map.height(0, 0), 24.0);
        assert_eq!(map.height(1, 0), 20.0);
    }
}
