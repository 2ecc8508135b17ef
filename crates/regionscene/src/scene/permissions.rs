//! Authorization checks.
//!
//! Every `can_*` check is a pure decision returning `bool`. Object checks
//! share one precedence order:
//!
//! 1. a possible god may act, unless the object belongs to another god;
//! 2. an object owned by a god is off limits to everyone else;
//! 3. a locked object cannot be acted on;
//! 4. an attachment can only be handled by its wearer;
//! 5. the owner may act;
//! 6. the object's everyone mask, or its group mask for group members;
//! 7. the object's group powers when the object is group owned;
//! 8. for move, delete and return, the owner of the parcel under the object.

use std::panic::{AssertUnwindSafe, catch_unwind};

use glam::Vec3;
use uuid::Uuid;

use super::Scene;
use crate::group::ObjectGroup;
use crate::parcel::{ParcelFlags, ParcelInfo, ParcelPropertiesUpdate};
use crate::permissions::GroupPowers;
use crate::types::InventoryPermissionsMask;

/// The object actions gated by the shared precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectOperation {
    Move,
    Edit,
    Delete,
    Take,
    TakeCopy,
    Return,
    ChangeGroup,
}

impl ObjectOperation {
    /// Permission bit that grants the action to non-owners, if any.
    fn mask_bit(self) -> Option<InventoryPermissionsMask> {
        match self {
            Self::Move => Some(InventoryPermissionsMask::MOVE),
            Self::Edit | Self::Delete => Some(InventoryPermissionsMask::MODIFY),
            Self::Take => Some(InventoryPermissionsMask::TRANSFER),
            Self::TakeCopy => Some(InventoryPermissionsMask::COPY),
            Self::Return | Self::ChangeGroup => None,
        }
    }

    fn parcel_owner_may(self) -> bool {
        matches!(self, Self::Move | Self::Delete | Self::Return)
    }
}

/// Why a rez was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RezDenied {
    Blacklisted,
    ParcelNotFound,
    ParcelNotAllowed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RezDeniedEvent {
    pub agent: Uuid,
    pub asset_id: Uuid,
    pub position: Vec3,
    pub reason: RezDenied,
}

pub type RezDeniedListener = dyn Fn(&RezDeniedEvent) + Send + Sync;

impl Scene {
    /// Whether `agent` is granted god powers by any of the enabled rules.
    #[must_use]
    pub fn is_possible_god(&self, agent: Uuid) -> bool {
        if agent.is_nil() {
            return false;
        }
        let params = self.server_params.read();
        if params.is_god_agent(agent) {
            return true;
        }
        let estate = self.estate.read();
        (params.estate_manager_is_god.enabled() && estate.is_manager(agent))
            || (params.estate_owner_is_god.enabled() && estate.is_owner(agent))
            || (params.region_owner_is_god.enabled() && self.is_region_owner(agent))
    }

    #[must_use]
    pub fn is_estate_manager(&self, agent: Uuid) -> bool {
        self.estate.read().is_manager(agent)
    }

    #[must_use]
    pub fn is_estate_owner(&self, agent: Uuid) -> bool {
        self.estate.read().is_owner(agent)
    }

    #[must_use]
    pub fn is_region_owner(&self, agent: Uuid) -> bool {
        !agent.is_nil() && self.region.owner.id == agent
    }

    /// Decide an object action for `agent`.
    #[must_use]
    pub fn can_operate(
        &self,
        agent: Uuid,
        object: &ObjectGroup,
        operation: ObjectOperation,
    ) -> bool {
        let owner = object.owner().id;
        let owner_is_god = !object.is_group_owned() && self.is_possible_god(owner);

        if self.is_possible_god(agent) {
            return !owner_is_god || owner == agent;
        }
        if owner_is_god {
            return false;
        }
        let root = object.root_part();
        if root.is_locked() {
            return false;
        }
        if object.is_attachment() {
            return owner == agent;
        }
        if !agent.is_nil() && owner == agent {
            return true;
        }

        let group = object.group().id;
        if let Some(bit) = operation.mask_bit() {
            let masks = root.permissions();
            if masks.everyone.contains(bit) {
                return true;
            }
            if masks.group.contains(bit) && self.groups.is_member(group, agent) {
                return true;
            }
        }

        if object.is_group_owned() {
            let power = match operation {
                ObjectOperation::Return => GroupPowers::RETURN_GROUP_OWNED,
                _ => GroupPowers::OBJECT_MANIPULATE,
            };
            if self.groups.has_group_power(agent, group, power) {
                return true;
            }
        }

        operation.parcel_owner_may() && self.parcel_owner_may_act(agent, object, operation)
    }

    fn parcel_owner_may_act(
        &self,
        agent: Uuid,
        object: &ObjectGroup,
        operation: ObjectOperation,
    ) -> bool {
        let Some(parcel) = self.parcel_at(object.global_position()) else {
            return false;
        };
        if parcel.is_owned_by(agent) {
            return true;
        }
        if operation != ObjectOperation::Return || !parcel.is_group_owned {
            return false;
        }
        // Group land: returning needs the power matching the object's group.
        let power = if object.group().id == parcel.group.id {
            GroupPowers::RETURN_GROUP_SET
        } else {
            GroupPowers::RETURN_NON_GROUP
        };
        self.groups.has_group_power(agent, parcel.group.id, power)
    }

    #[must_use]
    pub fn can_move(&self, agent: Uuid, object: &ObjectGroup) -> bool {
        self.can_operate(agent, object, ObjectOperation::Move)
    }

    #[must_use]
    pub fn can_edit(&self, agent: Uuid, object: &ObjectGroup) -> bool {
        self.can_operate(agent, object, ObjectOperation::Edit)
    }

    #[must_use]
    pub fn can_delete(&self, agent: Uuid, object: &ObjectGroup) -> bool {
        self.can_operate(agent, object, ObjectOperation::Delete)
    }

    #[must_use]
    pub fn can_take(&self, agent: Uuid, object: &ObjectGroup) -> bool {
        self.can_operate(agent, object, ObjectOperation::Take)
    }

    #[must_use]
    pub fn can_take_copy(&self, agent: Uuid, object: &ObjectGroup) -> bool {
        self.can_operate(agent, object, ObjectOperation::TakeCopy)
    }

    #[must_use]
    pub fn can_return(&self, agent: Uuid, object: &ObjectGroup) -> bool {
        self.can_operate(agent, object, ObjectOperation::Return)
    }

    #[must_use]
    pub fn can_change_group(&self, agent: Uuid, object: &ObjectGroup) -> bool {
        self.can_operate(agent, object, ObjectOperation::ChangeGroup)
    }

    /// Whether `agent` may rez `asset_id` at `position`. Refusals are
    /// reported to the rez-denied listeners.
    pub fn can_rez(&self, agent: Uuid, asset_id: Uuid, position: Vec3) -> bool {
        if self.rez_blacklist.read().contains(&asset_id) {
            self.rez_denied(agent, asset_id, position, RezDenied::Blacklisted);
            return false;
        }
        if self.rez_whitelist.read().contains(&asset_id) {
            return true;
        }
        if self.is_possible_god(agent) {
            return true;
        }
        let Some(parcel) = self.parcel_at(position) else {
            self.rez_denied(agent, asset_id, position, RezDenied::ParcelNotFound);
            return false;
        };
        let group = parcel.group.id;
        let allowed = parcel.is_owned_by(agent)
            || parcel.flags.contains(ParcelFlags::CREATE_OBJECTS)
            || (parcel.flags.contains(ParcelFlags::CREATE_GROUP_OBJECTS)
                && self.groups.is_member(group, agent))
            || (parcel.is_group_owned
                && self.groups.has_group_power(agent, group, GroupPowers::ALLOW_REZ))
            || self.is_estate_manager(agent);
        if !allowed {
            self.rez_denied(agent, asset_id, position, RezDenied::ParcelNotAllowed);
        }
        allowed
    }

    fn rez_denied(&self, agent: Uuid, asset_id: Uuid, position: Vec3, reason: RezDenied) {
        tracing::debug!(%agent, %asset_id, ?reason, "rez denied");
        let event = RezDeniedEvent {
            agent,
            asset_id,
            position,
            reason,
        };
        for listener in self.rez_denied.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                tracing::warn!(%agent, "rez denied listener panicked");
            }
        }
    }

    /// Whether `agent` may change the terrain cell at `position`.
    #[must_use]
    pub fn can_terraform(&self, agent: Uuid, position: Vec3) -> bool {
        if self.is_possible_god(agent) {
            return true;
        }
        if self.settings.read().block_terraform {
            return false;
        }
        let Some(parcel) = self.parcel_at(position) else {
            return false;
        };
        parcel.flags.contains(ParcelFlags::ALLOW_TERRAFORM)
            || parcel.is_owned_by(agent)
            || (parcel.is_group_owned
                && self
                    .groups
                    .has_group_power(agent, parcel.group.id, GroupPowers::ALLOW_EDIT_LAND))
            || self.is_estate_manager(agent)
    }

    /// Whether scripts in `object` may run at `position`.
    #[must_use]
    pub fn can_run_script(&self, object: &ObjectGroup, position: Vec3) -> bool {
        if self.settings.read().disable_scripts {
            return false;
        }
        let owner = object.owner().id;
        if self.is_possible_god(owner) || self.is_estate_manager(owner) {
            return true;
        }
        let Some(parcel) = self.parcel_at(position) else {
            return false;
        };
        if parcel.flags.contains(ParcelFlags::ALLOW_OTHER_SCRIPTS) || parcel.owner.id == owner {
            return true;
        }
        parcel.flags.contains(ParcelFlags::ALLOW_GROUP_SCRIPTS)
            && !parcel.group.is_unknown()
            && object.group().id == parcel.group.id
    }

    /// Whether `agent` may change parcel details guarded by `power`.
    #[must_use]
    pub fn can_edit_parcel_details(
        &self,
        agent: Uuid,
        parcel: &ParcelInfo,
        power: GroupPowers,
    ) -> bool {
        self.is_possible_god(agent)
            || self.is_estate_manager(agent)
            || parcel.is_owned_by(agent)
            || (parcel.is_group_owned && self.groups.has_group_power(agent, parcel.group.id, power))
    }

    /// Apply the fields of `update` that `agent` may change on parcel
    /// `local_id`, then broadcast the parcel if anything was applied.
    /// Returns the number of applied changes.
    pub fn handle_parcel_properties_update(
        &self,
        agent: Uuid,
        local_id: i32,
        update: &ParcelPropertiesUpdate,
    ) -> usize {
        let (applied, parcel) = {
            let mut parcels = self.parcels.write();
            let Some(parcel) = parcels.parcel_mut(local_id) else {
                tracing::debug!(%agent, local_id, "update for unknown parcel");
                return 0;
            };
            let before = parcel.clone();
            let applied = update.apply_to(parcel, |power| {
                self.can_edit_parcel_details(agent, &before, power)
            });
            (applied, parcel.clone())
        };
        if applied == 0 {
            return 0;
        }
        tracing::debug!(%agent, local_id, applied, "parcel properties updated");
        for listener in self.parcel_listeners.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| listener.parcel_updated(&parcel))).is_err() {
                tracing::warn!(local_id, "parcel listener panicked");
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::config::{GroupMemberConfig, ParcelConfig, RegionConfig};
    use crate::part::ObjectPart;
    use crate::permissions::{EstateInfo, ServerParamValues};
    use crate::types::{ChangedFlags, PermissionMasks, Ugi, Ugui};

    const OWNER: Uuid = Uuid::from_u128(1);
    const STRANGER: Uuid = Uuid::from_u128(2);
    const LAND_OWNER: Uuid = Uuid::from_u128(3);
    const MANAGER: Uuid = Uuid::from_u128(4);
    const GOD: Uuid = Uuid::from_u128(5);
    const GROUP: Uuid = Uuid::from_u128(50);

    fn scene() -> Scene {
        let config = RegionConfig {
            estate: EstateInfo {
                managers: vec![MANAGER],
                ..EstateInfo::default()
            },
            server_params: ServerParamValues {
                god_agents: Some(vec![GOD]),
                ..ServerParamValues::default()
            },
            parcels: vec![ParcelConfig {
                name: "Yard".to_owned(),
                east: 128.0,
                north: 256.0,
                owner: Ugui::from(LAND_OWNER),
                // No public rezzing or foreign scripts.
                flags: Some(ParcelFlags::ALLOW_FLY.bits()),
                ..ParcelConfig::default()
            }],
            group_members: vec![GroupMemberConfig {
                group: GROUP,
                agent: STRANGER,
                powers: GroupPowers::OBJECT_MANIPULATE.bits(),
            }],
            ..RegionConfig::default()
        };
        Scene::from_config(&config).unwrap()
    }

    fn object(owner: Uuid, position: Vec3) -> Arc<ObjectGroup> {
        let group = ObjectGroup::new(ObjectPart::new(Uuid::new_v4()));
        group.set_owner(Ugui::from(owner));
        group.set_global_position(position);
        group
    }

    #[test]
    fn test_owner_and_stranger() {
        let scene = scene();
        let thing = object(OWNER, Vec3::new(200.0, 10.0, 20.0));
        assert!(scene.can_edit(OWNER, &thing));
        assert!(scene.can_take(OWNER, &thing));
        assert!(!scene.can_edit(STRANGER, &thing));
        assert!(!scene.can_move(STRANGER, &thing));
        assert!(!scene.can_take_copy(STRANGER, &thing));
    }

    #[test]
    fn test_lock_denies_owner_but_not_god() {
        let scene = scene();
        let thing = object(OWNER, Vec3::new(200.0, 10.0, 20.0));
        thing.root_part().set_locked(true);
        assert!(!scene.can_move(OWNER, &thing));
        assert!(!scene.can_edit(OWNER, &thing));
        assert!(!scene.can_delete(OWNER, &thing));
        assert!(scene.can_edit(GOD, &thing));
    }

    #[test]
    fn test_god_owned_objects() {
        let scene = scene();
        let thing = object(GOD, Vec3::new(200.0, 10.0, 20.0));
        thing.root_part().set_permissions(PermissionMasks {
            everyone: InventoryPermissionsMask::ALL,
            ..PermissionMasks::default()
        });
        assert!(scene.can_edit(GOD, &thing));
        assert!(!scene.can_edit(STRANGER, &thing));

        // A second god may not touch the first god's things.
        scene.apply_local_server_params(&ServerParamValues {
            estate_manager_is_god: Some(true),
            ..ServerParamValues::default()
        });
        assert!(scene.is_possible_god(MANAGER));
        assert!(!scene.can_edit(MANAGER, &thing));
    }

    #[test]
    fn test_masks_and_group_powers() {
        let scene = scene();
        let thing = object(OWNER, Vec3::new(200.0, 10.0, 20.0));
        thing.root_part().set_permissions(PermissionMasks {
            everyone: InventoryPermissionsMask::MOVE,
            ..PermissionMasks::default()
        });
        assert!(scene.can_move(STRANGER, &thing));
        assert!(!scene.can_edit(STRANGER, &thing));

        thing.set_group(Ugi::from(GROUP));
        thing.set_owner(Ugui::from(GROUP));
        assert!(thing.is_group_owned());
        assert!(scene.can_edit(STRANGER, &thing));
        assert!(!scene.can_edit(LAND_OWNER, &thing));
    }

    #[test]
    fn test_attachment_only_for_wearer() {
        let scene = scene();
        let thing = object(OWNER, Vec3::new(200.0, 10.0, 20.0));
        thing.root_part().set_permissions(PermissionMasks {
            everyone: InventoryPermissionsMask::ALL,
            ..PermissionMasks::default()
        });
        thing.update_state(ChangedFlags::empty(), |state| state.is_attached = true);
        assert!(scene.can_edit(OWNER, &thing));
        assert!(!scene.can_edit(STRANGER, &thing));
    }

    #[test]
    fn test_parcel_owner_may_move_and_return_but_not_edit() {
        let scene = scene();
        let thing = object(OWNER, Vec3::new(10.0, 10.0, 20.0));
        assert!(scene.can_move(LAND_OWNER, &thing));
        assert!(scene.can_delete(LAND_OWNER, &thing));
        assert!(scene.can_return(LAND_OWNER, &thing));
        assert!(!scene.can_edit(LAND_OWNER, &thing));
        assert!(!scene.can_take(LAND_OWNER, &thing));
    }

    #[test]
    fn test_rez_lists_and_parcel_rules() {
        let scene = scene();
        let denials = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&denials);
        scene.on_rez_denied().add(Arc::new(move |event: &RezDeniedEvent| {
            seen.lock().push(event.reason);
        }));
        let asset = Uuid::from_u128(77);
        let yard = Vec3::new(10.0, 10.0, 20.0);

        assert!(scene.can_rez(LAND_OWNER, asset, yard));
        assert!(!scene.can_rez(STRANGER, asset, yard));
        assert!(!scene.can_rez(STRANGER, asset, Vec3::new(-5.0, 10.0, 20.0)));

        scene.whitelist_rez_asset(asset);
        assert!(scene.can_rez(STRANGER, asset, yard));

        // The blacklist wins over everything, gods included.
        scene.blacklist_rez_asset(asset);
        assert!(!scene.can_rez(LAND_OWNER, asset, yard));
        assert!(!scene.can_rez(GOD, asset, yard));

        assert_eq!(
            *denials.lock(),
            vec![
                RezDenied::ParcelNotAllowed,
                RezDenied::ParcelNotFound,
                RezDenied::Blacklisted,
                RezDenied::Blacklisted,
            ]
        );
    }

    #[test]
    fn test_create_objects_flag_opens_parcel() {
        let scene = scene();
        let yard = Vec3::new(10.0, 10.0, 20.0);
        if let Some(parcel) = scene.parcels_mut().parcel_mut(2) {
            parcel.flags.insert(ParcelFlags::CREATE_OBJECTS);
        }
        assert!(scene.can_rez(STRANGER, Uuid::nil(), yard));
    }

    #[test]
    fn test_terraform_rules() {
        let scene = scene();
        let yard = Vec3::new(10.0, 10.0, 20.0);
        let open = Vec3::new(200.0, 10.0, 20.0);
        assert!(scene.can_terraform(LAND_OWNER, yard));
        assert!(!scene.can_terraform(STRANGER, yard));
        assert!(scene.can_terraform(MANAGER, open));

        let mut settings = scene.settings();
        settings.block_terraform = true;
        scene.set_settings(settings);
        assert!(!scene.can_terraform(LAND_OWNER, yard));
        assert!(scene.can_terraform(GOD, yard));
    }

    #[test]
    fn test_scripts_follow_parcel_rules() {
        let scene = scene();
        let mine = object(LAND_OWNER, Vec3::new(10.0, 10.0, 20.0));
        let visitor = object(OWNER, Vec3::new(10.0, 10.0, 20.0));
        let yard = Vec3::new(10.0, 10.0, 20.0);
        assert!(scene.can_run_script(&mine, yard));
        assert!(!scene.can_run_script(&visitor, yard));
        if let Some(parcel) = scene.parcels_mut().parcel_mut(2) {
            parcel.flags.insert(ParcelFlags::ALLOW_OTHER_SCRIPTS);
        }
        assert!(scene.can_run_script(&visitor, yard));
    }

    struct Recorder(Mutex<Vec<String>>);

    impl crate::parcel::ParcelUpdateListener for Recorder {
        fn parcel_updated(&self, parcel: &ParcelInfo) {
            self.0.lock().push(parcel.name.clone());
        }
    }

    #[test]
    fn test_parcel_update_checks_powers_then_broadcasts() {
        let scene = scene();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        scene.on_parcel_updated().add(recorder.clone());
        let rename = ParcelPropertiesUpdate {
            name: Some("Garden".to_owned()),
            ..ParcelPropertiesUpdate::default()
        };

        assert_eq!(scene.handle_parcel_properties_update(STRANGER, 2, &rename), 0);
        assert!(recorder.0.lock().is_empty());

        assert_eq!(scene.handle_parcel_properties_update(LAND_OWNER, 2, &rename), 1);
        assert_eq!(*recorder.0.lock(), vec!["Garden".to_owned()]);
        assert_eq!(scene.handle_parcel_properties_update(LAND_OWNER, 99, &rename), 0);
    }
}
