//! Region, estate and region-settings records consulted by the permission
//! checks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Ugui;

/// Identity and extent of the simulated region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionInfo {
    pub id: Uuid,
    pub name: String,
    pub owner: Ugui,
    /// Extent in metres along x.
    pub size_x: u32,
    /// Extent in metres along y.
    pub size_y: u32,
}

impl Default for RegionInfo {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: "Region".to_owned(),
            owner: Ugui::unknown(),
            size_x: 256,
            size_y: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstateInfo {
    pub id: u32,
    pub name: String,
    pub owner: Ugui,
    pub managers: Vec<Uuid>,
}

impl EstateInfo {
    #[must_use]
    pub fn is_owner(&self, agent: Uuid) -> bool {
        !agent.is_nil() && self.owner.id == agent
    }

    /// The estate owner counts as a manager.
    #[must_use]
    pub fn is_manager(&self, agent: Uuid) -> bool {
        self.is_owner(agent) || (!agent.is_nil() && self.managers.contains(&agent))
    }
}

/// Region-wide toggles and terraform limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSettings {
    pub block_terraform: bool,
    pub block_fly: bool,
    pub disable_scripts: bool,
    pub disable_physics: bool,
    /// Metres terrain may rise above the baked map.
    pub terrain_raise_limit: f32,
    /// Metres terrain may sink below the baked map.
    pub terrain_lower_limit: f32,
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            block_terraform: false,
            block_fly: false,
            disable_scripts: false,
            disable_physics: false,
            terrain_raise_limit: 100.0,
            terrain_lower_limit: 100.0,
        }
    }
}

impl RegionSettings {
    /// Clamp limits to non-negative values.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.terrain_raise_limit = self.terrain_raise_limit.max(0.0);
        self.terrain_lower_limit = self.terrain_lower_limit.max(0.0);
        self
    }
}
