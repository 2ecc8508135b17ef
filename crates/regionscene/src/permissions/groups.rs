//! Group membership and powers.

use std::collections::HashMap;

use bitflags::bitflags;
use parking_lot::RwLock;
use uuid::Uuid;

bitflags! {
    /// Abilities a group role grants its members.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GroupPowers: u64 {
        const INVITE = 1 << 1;
        const EJECT = 1 << 2;
        const CHANGE_OPTIONS = 1 << 3;
        const LAND_DEED = 1 << 12;
        const LAND_RELEASE = 1 << 13;
        const LAND_SET_SALE = 1 << 14;
        const LAND_DIVIDE_JOIN = 1 << 15;
        const FIND_PLACES = 1 << 17;
        const LAND_CHANGE_IDENTITY = 1 << 18;
        const SET_LANDING_POINT = 1 << 19;
        const CHANGE_MEDIA = 1 << 20;
        const LAND_EDIT = 1 << 21;
        const LAND_OPTIONS = 1 << 22;
        const ALLOW_EDIT_LAND = 1 << 23;
        const ALLOW_FLY = 1 << 24;
        const ALLOW_REZ = 1 << 25;
        const ALLOW_LANDMARK = 1 << 26;
        const ALLOW_SET_HOME = 1 << 28;
        const LAND_MANAGE_ALLOWED = 1 << 29;
        const LAND_MANAGE_BANNED = 1 << 30;
        const LAND_MANAGE_PASSES = 1 << 31;
        const LAND_EJECT_AND_FREEZE = 1 << 32;
        const RETURN_GROUP_SET = 1 << 33;
        const RETURN_NON_GROUP = 1 << 34;
        const LAND_GARDENING = 1 << 35;
        const DEED_OBJECT = 1 << 36;
        const OBJECT_MANIPULATE = 1 << 38;
        const OBJECT_SET_FOR_SALE = 1 << 39;
        const RETURN_GROUP_OWNED = 1 << 48;
    }
}

/// Membership lookups used by the permission checks.
pub trait GroupsService: Send + Sync {
    fn is_member(&self, group: Uuid, agent: Uuid) -> bool;

    /// Whether `agent` holds every bit of `power` in `group`.
    fn has_group_power(&self, agent: Uuid, group: Uuid, power: GroupPowers) -> bool;
}

/// A process-local membership table.
#[derive(Debug, Default)]
pub struct InMemoryGroups {
    members: RwLock<HashMap<(Uuid, Uuid), GroupPowers>>,
}

impl InMemoryGroups {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a member with the union of their role powers.
    pub fn set_member(&self, group: Uuid, agent: Uuid, powers: GroupPowers) {
        self.members.write().insert((group, agent), powers);
    }

    pub fn remove_member(&self, group: Uuid, agent: Uuid) -> bool {
        self.members.write().remove(&(group, agent)).is_some()
    }
}

impl GroupsService for InMemoryGroups {
    fn is_member(&self, group: Uuid, agent: Uuid) -> bool {
        !group.is_nil() && self.members.read().contains_key(&(group, agent))
    }

    fn has_group_power(&self, agent: Uuid, group: Uuid, power: GroupPowers) -> bool {
        if group.is_nil() {
            return false;
        }
        self.members
            .read()
            .get(&(group, agent))
            .is_some_and(|powers| powers.contains(power))
    }
}
