//! Region configuration, loaded from JSON.
//!
//! Every section is optional; missing fields take their defaults and
//! out-of-range values are pulled back by [`RegionConfig::sanitized`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::parcel::ParcelFlags;
use crate::permissions::{EstateInfo, GroupPowers, RegionInfo, RegionSettings, ServerParamValues};
use crate::terrain::TerraformSettings;
use crate::types::Ugui;

const DEFAULT_TERRAIN_HEIGHT: f32 = 21.0;
const MAX_REGION_SIZE: u32 = 8192;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub region: RegionInfo,
    pub estate: EstateInfo,
    /// Network-wide values of the god toggles.
    pub server_params: ServerParamValues,
    /// Per-region overrides; a value set here shadows the global one.
    pub local_server_params: ServerParamValues,
    pub settings: RegionSettings,
    pub terraform: TerraformSettings,
    pub terrain_height: f32,
    /// Assets that may never be rezzed.
    pub rez_blacklist: Vec<Uuid>,
    /// Assets that may always be rezzed, whatever the parcel allows.
    pub rez_whitelist: Vec<Uuid>,
    pub parcels: Vec<ParcelConfig>,
    pub group_members: Vec<GroupMemberConfig>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            region: RegionInfo::default(),
            estate: EstateInfo::default(),
            server_params: ServerParamValues::default(),
            local_server_params: ServerParamValues::default(),
            settings: RegionSettings::default(),
            terraform: TerraformSettings::default(),
            terrain_height: DEFAULT_TERRAIN_HEIGHT,
            rez_blacklist: Vec::new(),
            rez_whitelist: Vec::new(),
            parcels: Vec::new(),
            group_members: Vec::new(),
        }
    }
}

/// A parcel carved out of the region's default parcel, in region metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelConfig {
    pub name: String,
    pub west: f32,
    pub south: f32,
    pub east: f32,
    pub north: f32,
    pub owner: Ugui,
    pub group: Uuid,
    pub group_owned: bool,
    /// Raw parcel flag bits; the default flag set when absent.
    pub flags: Option<u32>,
}

impl Default for ParcelConfig {
    fn default() -> Self {
        Self {
            name: "Parcel".to_owned(),
            west: 0.0,
            south: 0.0,
            east: 0.0,
            north: 0.0,
            owner: Ugui::unknown(),
            group: Uuid::nil(),
            group_owned: false,
            flags: None,
        }
    }
}

impl ParcelConfig {
    #[must_use]
    pub fn parcel_flags(&self) -> ParcelFlags {
        self.flags.map_or(ParcelFlags::DEFAULT, ParcelFlags::from_bits_retain)
    }
}

/// Seed entry for the in-memory groups service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMemberConfig {
    pub group: Uuid,
    pub agent: Uuid,
    /// Raw group power bits.
    pub powers: u64,
}

impl GroupMemberConfig {
    #[must_use]
    pub fn group_powers(&self) -> GroupPowers {
        GroupPowers::from_bits_retain(self.powers)
    }
}

impl RegionConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config.sanitized())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
            context: "region config file",
            message: format!("{}: {e}", path.display()),
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.display(),
            region = %config.region.name,
            "loaded region config"
        );
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.region.size_x = self.region.size_x.clamp(16, MAX_REGION_SIZE);
        self.region.size_y = self.region.size_y.clamp(16, MAX_REGION_SIZE);
        self.settings = self.settings.sanitized();
        self.terraform = self.terraform.sanitized();
        if !self.terrain_height.is_finite() {
            self.terrain_height = defaults.terrain_height;
        }
        self.parcels.retain(|parcel| {
            let usable = [parcel.west, parcel.south, parcel.east, parcel.north]
                .iter()
                .all(|v| v.is_finite())
                && parcel.east > parcel.west
                && parcel.north > parcel.south;
            if !usable {
                tracing::warn!(parcel = %parcel.name, "dropping parcel with an empty rectangle");
            }
            usable
        });
        self
    }
}
