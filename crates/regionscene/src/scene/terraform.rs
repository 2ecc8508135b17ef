//! Land modification requests.

use std::panic::{AssertUnwindSafe, catch_unwind};

use glam::Vec3;
use uuid::Uuid;

use super::Scene;
use crate::terrain::{Brush, EffectContext, FloodArea, PaintArea, TerrainEffect, TerrainPatch};

/// Receives the patches changed by one land modification, in one batch.
pub trait TerrainClientSink: Send + Sync {
    fn send_patches(&self, patches: &[TerrainPatch]);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LandArea {
    Paint(PaintArea),
    Flood(FloodArea),
}

/// One terraform request from a viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandModification {
    pub agent: Uuid,
    pub effect: TerrainEffect,
    pub area: LandArea,
    pub brush: Brush,
}

impl Scene {
    /// Run a terraform effect for the requesting agent.
    ///
    /// Each cell is checked with [`Scene::can_terraform`] on its own, so a
    /// brush straddling parcels only changes the cells the agent may edit.
    /// Changed patches are flushed once and pushed to every sink in a single
    /// batch. Returns the number of cells changed.
    #[allow(clippy::cast_precision_loss)]
    pub fn modify_land(&self, request: &LandModification) -> usize {
        let agent = request.agent;
        let settings = self.settings();
        let allowed = |x: usize, y: usize| {
            let height = self.terrain.height(x, y);
            self.can_terraform(agent, Vec3::new(x as f32, y as f32, height))
        };
        let context = EffectContext {
            map: &self.terrain,
            allowed: &allowed,
            settings: &self.terraform_settings,
            raise_limit: settings.terrain_raise_limit,
            lower_limit: settings.terrain_lower_limit,
        };

        let changed = match &request.area {
            LandArea::Paint(area) => {
                self.terraforming
                    .paint(request.effect, &context, area, request.brush)
            }
            LandArea::Flood(area) => {
                self.terraforming
                    .flood(request.effect, &context, area, request.brush)
            }
        };

        let patches: Vec<TerrainPatch> = self
            .terrain
            .flush_dirty()
            .into_iter()
            .map(|change| self.terrain.patch(change.x, change.y))
            .collect();
        tracing::debug!(
            %agent,
            effect = ?request.effect,
            cells = changed,
            patches = patches.len(),
            "land modified"
        );
        if !patches.is_empty() {
            for sink in self.terrain_sinks.snapshot() {
                if catch_unwind(AssertUnwindSafe(|| sink.send_patches(&patches))).is_err() {
                    tracing::warn!(%agent, "terrain sink panicked");
                }
            }
        }
        changed
    }
}
