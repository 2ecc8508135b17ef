//! The region scene: objects, parcels, terrain and the permission engine
//! that arbitrates between them.

mod permissions;
mod terraform;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::config::RegionConfig;
use crate::error::Result;
use crate::group::ObjectGroup;
use crate::observer::ObserverList;
use crate::parcel::{ParcelInfo, ParcelMap, ParcelUpdateListener, overlay_for};
use crate::permissions::{
    EstateInfo, GroupsService, InMemoryGroups, RegionInfo, RegionSettings, ServerParamValues,
    ServerParams,
};
use crate::terrain::{TerraformSettings, TerrainMap, Terraforming};
use crate::types::{Ugi, Ugui};
use crate::update::{UpdateQueue, UpdateScheduler};

pub use permissions::{ObjectOperation, RezDenied, RezDeniedEvent, RezDeniedListener};
pub use terraform::{LandArea, LandModification, TerrainClientSink};

/// First local id handed out to parts.
const FIRST_LOCAL_ID: u32 = 1;

pub struct Scene {
    region: RegionInfo,
    estate: RwLock<EstateInfo>,
    settings: RwLock<RegionSettings>,
    server_params: RwLock<ServerParams>,
    groups: Arc<dyn GroupsService>,
    parcels: RwLock<ParcelMap>,
    objects: RwLock<HashMap<Uuid, Arc<ObjectGroup>>>,
    next_local_id: AtomicU32,
    updates: Arc<UpdateQueue>,
    terrain: TerrainMap,
    terraforming: Terraforming,
    terraform_settings: TerraformSettings,
    rez_blacklist: RwLock<HashSet<Uuid>>,
    rez_whitelist: RwLock<HashSet<Uuid>>,
    rez_denied: ObserverList<RezDeniedListener>,
    parcel_listeners: ObserverList<dyn ParcelUpdateListener>,
    terrain_sinks: ObserverList<dyn TerrainClientSink>,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("region", &self.region.name)
            .field("objects", &self.objects.read().len())
            .field("parcels", &self.parcels.read().len())
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// Build a scene whose group memberships come from `groups`.
    pub fn new(config: &RegionConfig, groups: Arc<dyn GroupsService>) -> Result<Self> {
        let terraforming = Terraforming::new()?;
        let region = config.region.clone();

        let mut parcels = ParcelMap::new(region.size_x, region.size_y, region.owner.clone());
        for parcel in &config.parcels {
            let mut info = ParcelInfo::new(parcel.name.clone(), parcel.owner.clone());
            info.group = Ugi::from(parcel.group);
            info.is_group_owned = parcel.group_owned;
            info.flags = parcel.parcel_flags();
            if parcel.group_owned {
                info.owner = Ugui::from(parcel.group);
            }
            match parcels.add_parcel(info, parcel.west, parcel.south, parcel.east, parcel.north) {
                Some(local_id) => {
                    tracing::debug!(local_id, name = %parcel.name, "parcel configured");
                }
                None => tracing::warn!(name = %parcel.name, "parcel covers no land, skipped"),
            }
        }

        let terrain = TerrainMap::new(
            region.size_x as usize,
            region.size_y as usize,
            config.terrain_height,
        );

        tracing::info!(
            region = %region.name,
            size_x = region.size_x,
            size_y = region.size_y,
            parcels = parcels.len(),
            "scene created"
        );
        Ok(Self {
            estate: RwLock::new(config.estate.clone()),
            settings: RwLock::new(config.settings.clone().sanitized()),
            server_params: RwLock::new(ServerParams::from_values(
                &config.server_params,
                &config.local_server_params,
            )),
            groups,
            parcels: RwLock::new(parcels),
            objects: RwLock::new(HashMap::new()),
            next_local_id: AtomicU32::new(FIRST_LOCAL_ID),
            updates: Arc::new(UpdateQueue::new()),
            terrain,
            terraforming,
            terraform_settings: config.terraform.sanitized(),
            rez_blacklist: RwLock::new(config.rez_blacklist.iter().copied().collect()),
            rez_whitelist: RwLock::new(config.rez_whitelist.iter().copied().collect()),
            rez_denied: ObserverList::default(),
            parcel_listeners: ObserverList::default(),
            terrain_sinks: ObserverList::default(),
            region,
        })
    }

    /// Build a scene with an in-memory groups service seeded from the
    /// configuration.
    pub fn from_config(config: &RegionConfig) -> Result<Self> {
        let groups = InMemoryGroups::new();
        for member in &config.group_members {
            groups.set_member(member.group, member.agent, member.group_powers());
        }
        Self::new(config, Arc::new(groups))
    }

    #[must_use]
    pub fn region(&self) -> &RegionInfo {
        &self.region
    }

    #[must_use]
    pub fn estate(&self) -> EstateInfo {
        self.estate.read().clone()
    }

    pub fn set_estate(&self, estate: EstateInfo) {
        *self.estate.write() = estate;
    }

    #[must_use]
    pub fn settings(&self) -> RegionSettings {
        self.settings.read().clone()
    }

    pub fn set_settings(&self, settings: RegionSettings) {
        *self.settings.write() = settings.sanitized();
    }

    #[must_use]
    pub fn server_params(&self) -> ServerParams {
        self.server_params.read().clone()
    }

    /// Apply network-wide values. Parameters with a local override keep it.
    pub fn apply_global_server_params(&self, values: &ServerParamValues) {
        self.server_params.write().apply_global(values);
    }

    pub fn apply_local_server_params(&self, values: &ServerParamValues) {
        self.server_params.write().apply_local(values);
    }

    #[must_use]
    pub fn groups(&self) -> &Arc<dyn GroupsService> {
        &self.groups
    }

    #[must_use]
    pub fn parcels(&self) -> RwLockReadGuard<'_, ParcelMap> {
        self.parcels.read()
    }

    /// Direct parcel edits. Changes made here are not broadcast.
    pub fn parcels_mut(&self) -> RwLockWriteGuard<'_, ParcelMap> {
        self.parcels.write()
    }

    #[must_use]
    pub fn parcel_at(&self, position: Vec3) -> Option<ParcelInfo> {
        self.parcels.read().parcel_at(position).cloned()
    }

    /// The land overlay as seen by `agent`.
    #[must_use]
    pub fn parcel_overlay(&self, agent: Uuid) -> Vec<u8> {
        overlay_for(&self.parcels.read(), agent, self.groups.as_ref())
    }

    #[must_use]
    pub fn on_parcel_updated(&self) -> &ObserverList<dyn ParcelUpdateListener> {
        &self.parcel_listeners
    }

    #[must_use]
    pub fn on_rez_denied(&self) -> &ObserverList<RezDeniedListener> {
        &self.rez_denied
    }

    #[must_use]
    pub fn terrain_sinks(&self) -> &ObserverList<dyn TerrainClientSink> {
        &self.terrain_sinks
    }

    #[must_use]
    pub fn terrain(&self) -> &TerrainMap {
        &self.terrain
    }

    #[must_use]
    pub fn terraform_settings(&self) -> &TerraformSettings {
        &self.terraform_settings
    }

    #[must_use]
    pub fn update_queue(&self) -> &Arc<UpdateQueue> {
        &self.updates
    }

    pub fn blacklist_rez_asset(&self, asset: Uuid) {
        self.rez_blacklist.write().insert(asset);
    }

    pub fn whitelist_rez_asset(&self, asset: Uuid) {
        self.rez_whitelist.write().insert(asset);
    }

    /// Put a group into the scene: assign local ids to every part and route
    /// its updates through the scene's queue.
    pub fn add_object(&self, group: Arc<ObjectGroup>) {
        for part in group.parts() {
            let local_id = self.next_local_id.fetch_add(1, Ordering::Relaxed);
            part.update_info().set_local_id(local_id);
        }
        let scheduler: Arc<dyn UpdateScheduler> = self.updates.clone();
        group.set_scheduler(Some(scheduler));
        for part in group.parts() {
            group.schedule_update(part.update_info());
        }
        tracing::debug!(object = %group.id(), parts = group.part_count(), "object added");
        self.objects.write().insert(group.id(), group);
    }

    /// Take a group out of the scene, killing every part's update envelope
    /// and queueing the kills.
    pub fn remove_object(&self, id: Uuid) -> Option<Arc<ObjectGroup>> {
        let group = self.objects.write().remove(&id)?;
        for part in group.parts() {
            let info = part.update_info();
            info.kill_object();
            self.updates.schedule_update(info);
        }
        group.set_scheduler(None);
        tracing::debug!(object = %id, "object removed");
        Some(group)
    }

    #[must_use]
    pub fn object(&self, id: Uuid) -> Option<Arc<ObjectGroup>> {
        self.objects.read().get(&id).cloned()
    }

    #[must_use]
    pub fn objects(&self) -> Vec<Arc<ObjectGroup>> {
        self.objects.read().values().cloned().collect()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParcelConfig;
    use crate::part::ObjectPart;

    #[test]
    fn test_from_config_builds_parcels() {
        let config = RegionConfig {
            parcels: vec![ParcelConfig {
                name: "Corner".to_owned(),
                east: 64.0,
                north: 64.0,
                owner: Ugui::from(Uuid::from_u128(1)),
                ..ParcelConfig::default()
            }],
            ..RegionConfig::default()
        };
        let scene = Scene::from_config(&config).unwrap();
        assert_eq!(scene.parcels().len(), 2);
        let corner = scene.parcel_at(Vec3::new(10.0, 10.0, 0.0)).unwrap();
        assert_eq!(corner.name, "Corner");
        assert_eq!(corner.area, 64 * 64);
        assert_eq!(scene.terrain().size_x(), 256);
    }

    #[test]
    fn test_objects_get_local_ids_and_kills_on_removal() {
        let scene = Scene::from_config(&RegionConfig::default()).unwrap();
        let root = ObjectPart::new(Uuid::new_v4());
        let group = ObjectGroup::new(Arc::clone(&root));
        let child = ObjectPart::new(Uuid::new_v4());
        group.link(Arc::clone(&child));

        scene.add_object(Arc::clone(&group));
        assert_eq!(root.local_id(), 1);
        assert_eq!(child.local_id(), 2);
        assert_eq!(scene.update_queue().drain().len(), 2);

        // Changes now reach the scene's queue.
        root.set_velocity(Vec3::X);
        root.set_velocity(Vec3::Y);
        let pending = scene.update_queue().drain();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].serial, root.update_info().serial_number());

        assert!(scene.remove_object(group.id()).is_some());
        assert!(scene.object(group.id()).is_none());
        assert!(root.update_info().is_killed());
        let kills = scene.update_queue().drain();
        assert_eq!(kills.len(), 2);
        assert!(kills.iter().all(|entry| entry.kill));
    }
}
