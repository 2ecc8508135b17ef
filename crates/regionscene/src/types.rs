//! Identities and flag sets shared across the object model.

use std::fmt;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An agent identity: id plus display name.
///
/// Two identities are the same agent when their ids match; names are
/// informational.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ugui {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
}

impl Ugui {
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The nil identity, used for "nobody".
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.id.is_nil()
    }
}

impl From<Uuid> for Ugui {
    fn from(id: Uuid) -> Self {
        Self {
            id,
            name: String::new(),
        }
    }
}

impl PartialEq for Ugui {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Ugui {}

impl Hash for Ugui {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Ugui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}

/// A group identity, compared by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ugi {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
}

impl Ugi {
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.id.is_nil()
    }
}

impl From<Uuid> for Ugi {
    fn from(id: Uuid) -> Self {
        Self {
            id,
            name: String::new(),
        }
    }
}

impl PartialEq for Ugi {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Ugi {}

impl Hash for Ugi {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

bitflags! {
    /// Permission bits of objects and inventory items.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InventoryPermissionsMask: u32 {
        const TRANSFER = 0x0000_2000;
        const MODIFY = 0x0000_4000;
        const COPY = 0x0000_8000;
        const MOVE = 0x0008_0000;
        const DAMAGE = 0x0010_0000;
        const EVERY = 0x0008_e000;
        const ALL = 0x7fff_ffff;
    }
}

bitflags! {
    /// Change notifications delivered to scripts and observers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangedFlags: u32 {
        const INVENTORY = 0x0001;
        const COLOR = 0x0002;
        const SHAPE = 0x0004;
        const SCALE = 0x0008;
        const TEXTURE = 0x0010;
        const LINK = 0x0020;
        const ALLOWED_DROP = 0x0040;
        const OWNER = 0x0080;
        const REGION = 0x0100;
        const TELEPORT = 0x0200;
        const REGION_START = 0x0400;
        const MEDIA = 0x0800;
    }
}

bitflags! {
    /// Per-part object flags as sent to viewers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PrimitiveFlags: u32 {
        const PHYSICS = 0x0000_0001;
        const CREATE_SELECTED = 0x0000_0002;
        const OBJECT_MODIFY = 0x0000_0004;
        const OBJECT_COPY = 0x0000_0008;
        const OBJECT_ANY_OWNER = 0x0000_0010;
        const OBJECT_YOU_OWNER = 0x0000_0020;
        const SCRIPTED = 0x0000_0040;
        const TOUCH = 0x0000_0080;
        const OBJECT_MOVE = 0x0000_0100;
        const MONEY = 0x0000_0200;
        const PHANTOM = 0x0000_0400;
        const INVENTORY_EMPTY = 0x0000_0800;
        const INCLUDE_IN_SEARCH = 0x0000_8000;
        const ALLOW_INVENTORY_DROP = 0x0001_0000;
        const OBJECT_TRANSFER = 0x0002_0000;
        const OBJECT_GROUP_OWNED = 0x0004_0000;
        const CAMERA_DECOUPLED = 0x0010_0000;
        const ANIM_SOURCE = 0x0020_0000;
        const CAMERA_SOURCE = 0x0040_0000;
        const OBJECT_OWNER_MODIFY = 0x1000_0000;
        const TEMPORARY_ON_REZ = 0x2000_0000;
        const TEMPORARY = 0x4000_0000;
    }
}

/// The five permission masks carried by parts and inventory items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionMasks {
    pub base: InventoryPermissionsMask,
    pub owner: InventoryPermissionsMask,
    pub group: InventoryPermissionsMask,
    pub everyone: InventoryPermissionsMask,
    pub next_owner: InventoryPermissionsMask,
}

impl Default for PermissionMasks {
    /// Full rights for the owner, nothing for anyone else.
    fn default() -> Self {
        Self {
            base: InventoryPermissionsMask::ALL,
            owner: InventoryPermissionsMask::ALL,
            group: InventoryPermissionsMask::empty(),
            everyone: InventoryPermissionsMask::empty(),
            next_owner: InventoryPermissionsMask::ALL,
        }
    }
}

impl PermissionMasks {
    /// Masks as they will be after a transfer to the next owner.
    #[must_use]
    pub fn adjusted_for_next_owner(&self) -> Self {
        let base = self.base & self.next_owner;
        Self {
            base,
            owner: self.owner & base,
            group: self.group & base,
            everyone: self.everyone & base,
            next_owner: self.next_owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality_ignores_name() {
        let id = Uuid::from_u128(3);
        assert_eq!(Ugui::new(id, "Alice"), Ugui::new(id, "alice resident"));
        assert_ne!(Ugui::new(id, "Alice"), Ugui::unknown());
        assert!(Ugi::unknown().is_unknown());
    }

    #[test]
    fn test_flag_operations() {
        let mut flags = ChangedFlags::SHAPE | ChangedFlags::SCALE;
        assert!(flags.contains(ChangedFlags::SHAPE));
        assert!(!flags.contains(ChangedFlags::SHAPE | ChangedFlags::COLOR));
        assert!(flags.intersects(ChangedFlags::SCALE | ChangedFlags::COLOR));
        flags.remove(ChangedFlags::SHAPE);
        assert_eq!(flags, ChangedFlags::SCALE);
        flags.set(ChangedFlags::LINK, true);
        assert_eq!(flags.bits(), 0x28);
    }

    #[test]
    fn test_next_owner_masks() {
        let masks = PermissionMasks {
            next_owner: InventoryPermissionsMask::MOVE | InventoryPermissionsMask::COPY,
            everyone: InventoryPermissionsMask::MOVE | InventoryPermissionsMask::MODIFY,
            ..PermissionMasks::default()
        };
        let adjusted = masks.adjusted_for_next_owner();
        assert_eq!(
            adjusted.owner,
            InventoryPermissionsMask::MOVE | InventoryPermissionsMask::COPY
        );
        assert_eq!(adjusted.everyone, InventoryPermissionsMask::MOVE);
    }
}
