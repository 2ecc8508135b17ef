//! Link sets: one root part plus child parts sharing ownership.

use std::sync::{Arc, Weak};

use glam::Vec3;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::part::{ObjectPart, XmlOwnerMode};
use crate::types::{ChangedFlags, Ugi, Ugui};
use crate::update::{ObjectUpdateInfo, UpdateScheduler};
use crate::xml::{XmlNode, XmlOut};

/// Sale modes of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SaleType {
    #[default]
    Not = 0,
    Original = 1,
    Copy = 2,
    Contents = 3,
}

impl SaleType {
    #[must_use]
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Original,
            2 => Self::Copy,
            3 => Self::Contents,
            _ => Self::Not,
        }
    }
}

/// Group-level state shared by every part of a link set.
#[derive(Debug, Clone, Default)]
pub struct GroupState {
    pub owner: Ugui,
    pub last_owner: Ugui,
    pub group: Ugi,
    /// Asset the object was rezzed from; reset whenever a part changes.
    pub original_asset_id: Uuid,
    pub from_item_id: Uuid,
    pub is_attached: bool,
    pub attach_point: u8,
    pub attached_pos: Vec3,
    pub category: u32,
    pub sale_type: SaleType,
    pub sale_price: i32,
}

/// A linked object. Owns its parts; parts refer back weakly.
pub struct ObjectGroup {
    root: Arc<ObjectPart>,
    children: RwLock<Vec<Arc<ObjectPart>>>,
    state: Mutex<GroupState>,
    scheduler: RwLock<Option<Arc<dyn UpdateScheduler>>>,
}

impl std::fmt::Debug for ObjectGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectGroup")
            .field("id", &self.id())
            .field("parts", &self.part_count())
            .finish_non_exhaustive()
    }
}

impl ObjectGroup {
    /// Create a group around `root` and link it.
    pub fn new(root: Arc<ObjectPart>) -> Arc<Self> {
        let group = Arc::new(Self {
            root: Arc::clone(&root),
            children: RwLock::new(Vec::new()),
            state: Mutex::new(GroupState::default()),
            scheduler: RwLock::new(None),
        });
        root.attach_to_group(Arc::downgrade(&group));
        root.trigger_on_update(ChangedFlags::LINK);
        group
    }

    /// The group id is the root part's id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.root.id()
    }

    #[must_use]
    pub fn root_part(&self) -> &Arc<ObjectPart> {
        &self.root
    }

    /// Every part, root first.
    #[must_use]
    pub fn parts(&self) -> Vec<Arc<ObjectPart>> {
        let children = self.children.read();
        let mut parts = Vec::with_capacity(children.len() + 1);
        parts.push(Arc::clone(&self.root));
        parts.extend(children.iter().cloned());
        parts
    }

    #[must_use]
    pub fn part_count(&self) -> usize {
        self.children.read().len() + 1
    }

    #[must_use]
    pub fn find_part(&self, id: Uuid) -> Option<Arc<ObjectPart>> {
        if self.root.id() == id {
            return Some(Arc::clone(&self.root));
        }
        self.children.read().iter().find(|p| p.id() == id).cloned()
    }

    /// Link `part` as a child. Its global transform is kept.
    pub fn link(self: &Arc<Self>, part: Arc<ObjectPart>) {
        part.attach_to_group(Arc::downgrade(self));
        self.children.write().push(Arc::clone(&part));
        part.trigger_on_update(ChangedFlags::LINK);
    }

    /// Detach a child part. The root cannot be unlinked.
    pub fn unlink(&self, id: Uuid) -> Option<Arc<ObjectPart>> {
        let part = {
            let mut children = self.children.write();
            let index = children.iter().position(|p| p.id() == id)?;
            children.remove(index)
        };
        part.attach_to_group(Weak::new());
        part.trigger_on_update(ChangedFlags::LINK);
        self.root.trigger_on_update(ChangedFlags::LINK);
        Some(part)
    }

    #[must_use]
    pub fn state(&self) -> GroupState {
        self.state.lock().clone()
    }

    /// Apply `f` to the group state, then notify every part with `flags`.
    pub fn update_state(&self, flags: ChangedFlags, f: impl FnOnce(&mut GroupState)) {
        f(&mut self.state.lock());
        for part in self.parts() {
            part.trigger_on_update(flags);
        }
    }

    #[must_use]
    pub fn owner(&self) -> Ugui {
        self.state.lock().owner.clone()
    }

    /// Transfer ownership; the previous owner becomes the last owner.
    pub fn set_owner(&self, owner: Ugui) {
        self.update_state(ChangedFlags::OWNER, |state| {
            state.last_owner = std::mem::replace(&mut state.owner, owner);
        });
    }

    #[must_use]
    pub fn group(&self) -> Ugi {
        self.state.lock().group.clone()
    }

    pub fn set_group(&self, group: Ugi) {
        self.update_state(ChangedFlags::empty(), |state| state.group = group);
    }

    /// Deeded objects are owned by their group.
    #[must_use]
    pub fn is_group_owned(&self) -> bool {
        let state = self.state.lock();
        !state.group.is_unknown() && state.owner.id == state.group.id
    }

    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.state.lock().is_attached
    }

    #[must_use]
    pub fn original_asset_id(&self) -> Uuid {
        self.state.lock().original_asset_id
    }

    pub fn set_original_asset_id(&self, id: Uuid) {
        self.state.lock().original_asset_id = id;
    }

    pub fn reset_original_asset_id(&self) {
        self.state.lock().original_asset_id = Uuid::nil();
    }

    pub fn set_scheduler(&self, scheduler: Option<Arc<dyn UpdateScheduler>>) {
        *self.scheduler.write() = scheduler;
    }

    pub fn schedule_update(&self, info: &Arc<ObjectUpdateInfo>) {
        let scheduler = self.scheduler.read().clone();
        match scheduler {
            Some(scheduler) => scheduler.schedule_update(info),
            None => tracing::trace!(group = %self.id(), "no scheduler, update dropped"),
        }
    }

    #[must_use]
    pub fn global_position(&self) -> Vec3 {
        self.root.global_position()
    }

    /// Move the whole link set, keeping child offsets.
    pub fn set_global_position(&self, position: Vec3) {
        let delta = position - self.root.global_position();
        self.root.set_global_position(position);
        for child in self.children.read().clone() {
            child.set_global_position(child.global_position() + delta);
        }
    }

    /// Serialize as `<SceneObjectGroup>`.
    pub fn to_xml(&self, mode: XmlOwnerMode) -> Result<String> {
        let mut out = XmlOut::new();
        out.start("SceneObjectGroup")?;
        out.start("RootPart")?;
        self.root.write_xml(&mut out, mode)?;
        out.end("RootPart")?;
        out.start("OtherParts")?;
        for child in self.children.read().iter() {
            out.start("Part")?;
            child.write_xml(&mut out, mode)?;
            out.end("Part")?;
        }
        out.end("OtherParts")?;
        out.end("SceneObjectGroup")?;
        out.finish()
    }

    /// Rebuild a group from `<SceneObjectGroup>` XML. Group-level fields are
    /// taken from the root part element.
    pub fn from_xml(xml: &str) -> Result<Arc<Self>> {
        let doc = XmlNode::parse(xml)?;
        if doc.name != "SceneObjectGroup" {
            return Err(Error::Xml {
                context: "SceneObjectGroup",
                message: format!("unexpected root element <{}>", doc.name),
            });
        }
        let root_node = doc
            .child("RootPart")
            .and_then(|n| n.child("SceneObjectPart"))
            .ok_or_else(|| Error::Xml {
                context: "SceneObjectGroup",
                message: "missing <RootPart>".to_owned(),
            })?;

        let root = ObjectPart::from_xml_node(root_node, None)?;
        let group = Self::new(root);
        crate::part::apply_group_fields(root_node, &group)?;

        if let Some(others) = doc.child("OtherParts") {
            for node in others.children.iter().filter_map(|p| p.child("SceneObjectPart")) {
                let part = ObjectPart::from_xml_node(node, None)?;
                group.link(Arc::clone(&part));
                crate::part::apply_link_transform(node, &part)?;
            }
        }
        Ok(group)
    }
}
