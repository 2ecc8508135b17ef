//! Items stored inside a part.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{InventoryPermissionsMask, PermissionMasks, Ugi, Ugui};
use crate::xml::{XmlNode, XmlOut};

/// Inventory type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i8)]
pub enum InventoryType {
    Texture = 0,
    Sound = 1,
    CallingCard = 2,
    Landmark = 3,
    #[default]
    Object = 6,
    Notecard = 7,
    Script = 10,
    Snapshot = 15,
    Attachment = 17,
    Wearable = 18,
    Animation = 19,
    Gesture = 20,
    Mesh = 22,
    Unknown = -1,
}

impl InventoryType {
    #[must_use]
    pub fn from_i8(v: i8) -> Self {
        match v {
            0 => Self::Texture,
            1 => Self::Sound,
            2 => Self::CallingCard,
            3 => Self::Landmark,
            6 => Self::Object,
            7 => Self::Notecard,
            10 => Self::Script,
            15 => Self::Snapshot,
            17 => Self::Attachment,
            18 => Self::Wearable,
            19 => Self::Animation,
            20 => Self::Gesture,
            22 => Self::Mesh,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPartInventoryItem {
    pub item_id: Uuid,
    pub asset_id: Uuid,
    pub name: String,
    pub description: String,
    pub inventory_type: InventoryType,
    pub creator: Ugui,
    pub owner: Ugui,
    pub last_owner: Ugui,
    pub group: Ugi,
    pub permissions: PermissionMasks,
    pub flags: u32,
    pub creation_date: u32,
    /// Agent that granted runtime permissions to a script.
    pub perms_granter: Uuid,
    pub perms_mask: u32,
}

impl ObjectPartInventoryItem {
    #[must_use]
    pub fn new(item_id: Uuid, name: impl Into<String>, inventory_type: InventoryType) -> Self {
        Self {
            item_id,
            asset_id: Uuid::nil(),
            name: name.into(),
            description: String::new(),
            inventory_type,
            creator: Ugui::unknown(),
            owner: Ugui::unknown(),
            last_owner: Ugui::unknown(),
            group: Ugi::unknown(),
            permissions: PermissionMasks::default(),
            flags: 0,
            creation_date: 0,
            perms_granter: Uuid::nil(),
            perms_mask: 0,
        }
    }

    fn write_xml(&self, out: &mut XmlOut, part_id: Uuid) -> Result<()> {
        out.start("TaskInventoryItem")?;
        out.uuid("AssetID", self.asset_id)?;
        out.display("BasePermissions", self.permissions.base.bits())?;
        out.display("CreationDate", self.creation_date)?;
        out.uuid("CreatorID", self.creator.id)?;
        out.text("Description", &self.description)?;
        out.display("EveryonePermissions", self.permissions.everyone.bits())?;
        out.display("Flags", self.flags)?;
        out.uuid("GroupID", self.group.id)?;
        out.display("GroupPermissions", self.permissions.group.bits())?;
        out.display("InvType", self.inventory_type as i8)?;
        out.uuid("ItemID", self.item_id)?;
        out.uuid("LastOwnerID", self.last_owner.id)?;
        out.text("Name", &self.name)?;
        out.display("NextPermissions", self.permissions.next_owner.bits())?;
        out.uuid("OwnerID", self.owner.id)?;
        out.display("CurrentPermissions", self.permissions.owner.bits())?;
        out.uuid("ParentPartID", part_id)?;
        out.uuid("PermsGranter", self.perms_granter)?;
        out.display("PermsMask", self.perms_mask)?;
        out.end("TaskInventoryItem")
    }

    fn from_xml(node: &XmlNode) -> Result<Self> {
        let mut item = Self::new(Uuid::nil(), "", InventoryType::Unknown);
        let mask = |n: &XmlNode| n.text_as::<u32>("permission mask").map(InventoryPermissionsMask::from_bits_retain);
        for child in &node.children {
            match child.name.as_str() {
                "AssetID" => item.asset_id = child.as_uuid()?,
                "BasePermissions" => item.permissions.base = mask(child)?,
                "CreationDate" => item.creation_date = child.text_as("CreationDate")?,
                "CreatorID" => item.creator = Ugui::from(child.as_uuid()?),
                "Description" => item.description.clone_from(&child.text),
                "EveryonePermissions" => item.permissions.everyone = mask(child)?,
                "Flags" => item.flags = child.text_as("Flags")?,
                "GroupID" => item.group = Ugi::from(child.as_uuid()?),
                "GroupPermissions" => item.permissions.group = mask(child)?,
                "InvType" => item.inventory_type = InventoryType::from_i8(child.text_as("InvType")?),
                "ItemID" => item.item_id = child.as_uuid()?,
                "LastOwnerID" => item.last_owner = Ugui::from(child.as_uuid()?),
                "Name" => item.name.clone_from(&child.text),
                "NextPermissions" => item.permissions.next_owner = mask(child)?,
                "OwnerID" => item.owner = Ugui::from(child.as_uuid()?),
                "CurrentPermissions" => item.permissions.owner = mask(child)?,
                "PermsGranter" => item.perms_granter = child.as_uuid()?,
                "PermsMask" => item.perms_mask = child.text_as("PermsMask")?,
                // The owning part is implied by where the item is read.
                "ParentPartID" => {}
                other => tracing::debug!(element = other, "skipping unknown inventory element"),
            }
        }
        Ok(item)
    }
}

/// The items of one part, with a serial bumped on every change.
#[derive(Debug)]
pub struct ObjectPartInventory {
    part_id: Uuid,
    items: RwLock<BTreeMap<Uuid, ObjectPartInventoryItem>>,
    serial: AtomicU32,
}

impl ObjectPartInventory {
    #[must_use]
    pub fn new(part_id: Uuid) -> Self {
        Self {
            part_id,
            items: RwLock::new(BTreeMap::new()),
            serial: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn serial(&self) -> u32 {
        self.serial.load(Ordering::Acquire)
    }

    /// Insert or replace by item id.
    pub fn add(&self, item: ObjectPartInventoryItem) {
        self.items.write().insert(item.item_id, item);
        self.serial.fetch_add(1, Ordering::AcqRel);
    }

    pub fn remove(&self, item_id: Uuid) -> Option<ObjectPartInventoryItem> {
        let removed = self.items.write().remove(&item_id);
        if removed.is_some() {
            self.serial.fetch_add(1, Ordering::AcqRel);
        }
        removed
    }

    #[must_use]
    pub fn get(&self, item_id: Uuid) -> Option<ObjectPartInventoryItem> {
        self.items.read().get(&item_id).cloned()
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<ObjectPartInventoryItem> {
        self.items.read().values().find(|i| i.name == name).cloned()
    }

    #[must_use]
    pub fn items(&self) -> Vec<ObjectPartInventoryItem> {
        self.items.read().values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    #[must_use]
    pub fn script_count(&self) -> usize {
        self.items
            .read()
            .values()
            .filter(|i| i.inventory_type == InventoryType::Script)
            .count()
    }

    pub(crate) fn write_xml(&self, out: &mut XmlOut) -> Result<()> {
        out.start("TaskInventory")?;
        for item in self.items.read().values() {
            item.write_xml(out, self.part_id)?;
        }
        out.end("TaskInventory")
    }

    /// Replace the contents from a `<TaskInventory>` element.
    pub(crate) fn read_xml(&self, node: &XmlNode) -> Result<()> {
        let items = node
            .children
            .iter()
            .filter(|c| c.name == "TaskInventoryItem")
            .map(ObjectPartInventoryItem::from_xml)
            .collect::<Result<Vec<_>>>()?;
        let mut map = self.items.write();
        map.clear();
        map.extend(items.into_iter().map(|i| (i.item_id, i)));
        self.serial.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_tracks_changes() {
        let inventory = ObjectPartInventory::new(Uuid::from_u128(1));
        inventory.add(ObjectPartInventoryItem::new(
            Uuid::from_u128(2),
            "notes",
            InventoryType::Notecard,
        ));
        assert_eq!(inventory.serial(), 1);
        // Removing something absent is not a change.
        assert!(inventory.remove(Uuid::from_u128(99)).is_none());
        assert_eq!(inventory.serial(), 1);
        assert_eq!(inventory.find_by_name("notes").unwrap().item_id, Uuid::from_u128(2));
        assert_eq!(inventory.script_count(), 0);
    }

    #[test]
    fn test_xml_round_trip() {
        let inventory = ObjectPartInventory::new(Uuid::from_u128(1));
        let mut item = ObjectPartInventoryItem::new(Uuid::from_u128(3), "door", InventoryType::Script);
        item.asset_id = Uuid::from_u128(4);
        item.permissions.everyone = InventoryPermissionsMask::COPY;
        inventory.add(item.clone());

        let mut out = XmlOut::new();
        inventory.write_xml(&mut out).unwrap();
        let node = XmlNode::parse(&out.finish().unwrap()).unwrap();

        let restored = ObjectPartInventory::new(Uuid::from_u128(1));
        restored.read_xml(&node).unwrap();
        assert_eq!(restored.get(Uuid::from_u128(3)), Some(item));
        assert_eq!(restored.script_count(), 1);
    }
}
