//! `<SceneObjectPart>` persistence.
//!
//! Default-localization values are written as the part's own elements; named
//! localizations go into `<Localizations>` and carry only their overrides.
//! Elements the reader does not know are logged and skipped.

use std::str::FromStr;
use std::sync::Arc;

use glam::Vec3;
use primshape::{ExtraParams, PrimitiveShape, TextureAnimation, TextureEntry};
use uuid::Uuid;

use super::{
    ClickAction, ObjectPart, PartState, PrimitiveMaterial, sculpt_type_byte, set_sculpt_type_byte,
};
use crate::error::{Error, Result};
use crate::group::{ObjectGroup, SaleType};
use crate::localization::{Localizations, ObjectPartLocalizedInfo, SoundParams, TextParams};
use crate::types::{ChangedFlags, InventoryPermissionsMask, PrimitiveFlags, Ugi, Ugui};
use crate::xml::{XmlNode, XmlOut};

/// How ownership data is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlOwnerMode {
    /// Masks and owner identities as stored.
    #[default]
    Full,
    /// Masks as the next owner will receive them.
    NextOwner,
    /// Next-owner masks, owner, last owner and group cleared.
    Redacted,
}

fn number<T: FromStr>(node: &XmlNode) -> Result<T> {
    node.text_as("SceneObjectPart")
}

fn mask(node: &XmlNode) -> Result<InventoryPermissionsMask> {
    number(node).map(InventoryPermissionsMask::from_bits_retain)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn color_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn write_color(out: &mut XmlOut, text: &TextParams) -> Result<()> {
    out.start("Color")?;
    out.display("R", color_byte(text.color.x))?;
    out.display("G", color_byte(text.color.y))?;
    out.display("B", color_byte(text.color.z))?;
    out.display("A", color_byte(text.alpha))?;
    out.end("Color")
}

fn read_color(node: &XmlNode, text: &mut TextParams) -> Result<()> {
    let channel = |name: &str| -> Result<f32> {
        node.child(name)
            .map_or(Ok(255), number::<u8>)
            .map(|v| f32::from(v) / 255.0)
    };
    text.color = Vec3::new(channel("R")?, channel("G")?, channel("B")?);
    text.alpha = channel("A")?;
    Ok(())
}

/// Write the overridden fields of one localization. The texture entry is
/// skipped when it travels inside `<Shape>`.
fn write_localized(
    out: &mut XmlOut,
    info: &ObjectPartLocalizedInfo,
    with_texture_entry: bool,
) -> Result<()> {
    if let Some(name) = &info.name {
        out.text("Name", name)?;
    }
    if let Some(description) = &info.description {
        out.text("Description", description)?;
    }
    if let Some(text) = &info.text {
        out.text("Text", &text.text)?;
        write_color(out, text)?;
    }
    if let Some(sit_text) = &info.sit_text {
        out.text("SitName", sit_text)?;
    }
    if let Some(touch_text) = &info.touch_text {
        out.text("TouchName", touch_text)?;
    }
    if let Some(sound) = &info.sound {
        out.uuid("SoundID", sound.sound_id)?;
        out.display("SoundGain", sound.gain)?;
        out.display("SoundRadius", sound.radius)?;
        out.display("SoundFlags", sound.flags)?;
    }
    if with_texture_entry {
        if let Some(entry) = &info.texture_entry {
            out.base64("TextureEntry", &entry.to_bytes())?;
        }
    }
    if let Some(animation) = &info.texture_animation {
        out.base64("TextureAnimation", &animation.to_bytes())?;
    }
    if let Some(url) = &info.media_url {
        out.text("MediaUrl", url)?;
    }
    if let Some(particles) = &info.particle_system {
        out.base64("ParticleSystem", particles)?;
    }
    Ok(())
}

/// Apply `node` to `info` if it is a localized element.
fn read_localized(node: &XmlNode, info: &mut ObjectPartLocalizedInfo) -> Result<bool> {
    match node.name.as_str() {
        "Name" => info.name = Some(node.text.clone()),
        "Description" => info.description = Some(node.text.clone()),
        "Text" => info.text.get_or_insert_with(TextParams::default).text.clone_from(&node.text),
        "Color" => read_color(node, info.text.get_or_insert_with(TextParams::default))?,
        "SitName" => info.sit_text = Some(node.text.clone()),
        "TouchName" => info.touch_text = Some(node.text.clone()),
        "SoundID" => info.sound.get_or_insert_with(SoundParams::default).sound_id = node.as_uuid()?,
        "SoundGain" => info.sound.get_or_insert_with(SoundParams::default).gain = number(node)?,
        "SoundRadius" => info.sound.get_or_insert_with(SoundParams::default).radius = number(node)?,
        "SoundFlags" => info.sound.get_or_insert_with(SoundParams::default).flags = number(node)?,
        "TextureEntry" => info.texture_entry = Some(TextureEntry::from_bytes(&node.as_base64()?)?),
        "TextureAnimation" => {
            let data = node.as_base64()?;
            info.texture_animation = Some(if data.is_empty() {
                TextureAnimation::default()
            } else {
                TextureAnimation::from_bytes(&data)?
            });
        }
        "MediaUrl" => info.media_url = Some(node.text.clone()),
        "ParticleSystem" => info.particle_system = Some(node.as_base64()?),
        _ => return Ok(false),
    }
    Ok(true)
}

fn write_shape(
    out: &mut XmlOut,
    shape: &PrimitiveShape,
    entry: Option<&TextureEntry>,
    extra: &ExtraParams,
) -> Result<()> {
    out.start("Shape")?;
    out.display("ProfileCurve", shape.profile_curve)?;
    if let Some(entry) = entry {
        out.base64("TextureEntry", &entry.to_bytes())?;
    }
    out.base64("ExtraParams", &extra.to_bytes())?;
    out.display("PathBegin", shape.path_begin)?;
    out.display("PathCurve", shape.path_curve)?;
    out.display("PathEnd", shape.path_end)?;
    out.display("PathRadiusOffset", shape.path_radius_offset)?;
    out.display("PathRevolutions", shape.path_revolutions)?;
    out.display("PathScaleX", shape.path_scale_x)?;
    out.display("PathScaleY", shape.path_scale_y)?;
    out.display("PathShearX", shape.path_shear_x)?;
    out.display("PathShearY", shape.path_shear_y)?;
    out.display("PathSkew", shape.path_skew)?;
    out.display("PathTaperX", shape.path_taper_x)?;
    out.display("PathTaperY", shape.path_taper_y)?;
    out.display("PathTwist", shape.path_twist)?;
    out.display("PathTwistBegin", shape.path_twist_begin)?;
    out.display("PCode", shape.pcode)?;
    out.display("ProfileBegin", shape.profile_begin)?;
    out.display("ProfileEnd", shape.profile_end)?;
    out.display("ProfileHollow", shape.profile_hollow)?;
    out.display("State", shape.state)?;
    out.uuid("SculptTexture", shape.sculpt_map)?;
    out.display("SculptType", sculpt_type_byte(shape))?;
    out.end("Shape")
}

fn read_shape(
    node: &XmlNode,
    shape: &mut PrimitiveShape,
    info: &mut ObjectPartLocalizedInfo,
) -> Result<Option<ExtraParams>> {
    let mut extra = None;
    for child in &node.children {
        match child.name.as_str() {
            "ProfileCurve" => shape.profile_curve = number(child)?,
            "TextureEntry" => {
                info.texture_entry = Some(TextureEntry::from_bytes(&child.as_base64()?)?);
            }
            "ExtraParams" => extra = Some(ExtraParams::from_bytes(&child.as_base64()?)?),
            "PathBegin" => shape.path_begin = number(child)?,
            "PathCurve" => shape.path_curve = number(child)?,
            "PathEnd" => shape.path_end = number(child)?,
            "PathRadiusOffset" => shape.path_radius_offset = number(child)?,
            "PathRevolutions" => shape.path_revolutions = number(child)?,
            "PathScaleX" => shape.path_scale_x = number(child)?,
            "PathScaleY" => shape.path_scale_y = number(child)?,
            "PathShearX" => shape.path_shear_x = number(child)?,
            "PathShearY" => shape.path_shear_y = number(child)?,
            "PathSkew" => shape.path_skew = number(child)?,
            "PathTaperX" => shape.path_taper_x = number(child)?,
            "PathTaperY" => shape.path_taper_y = number(child)?,
            "PathTwist" => shape.path_twist = number(child)?,
            "PathTwistBegin" => shape.path_twist_begin = number(child)?,
            "PCode" => shape.pcode = number(child)?,
            "ProfileBegin" => shape.profile_begin = number(child)?,
            "ProfileEnd" => shape.profile_end = number(child)?,
            "ProfileHollow" => shape.profile_hollow = number(child)?,
            "State" => shape.state = number(child)?,
            "SculptTexture" => shape.sculpt_map = child.as_uuid()?,
            "SculptType" => {
                let byte: u8 = number(child)?;
                set_sculpt_type_byte(shape, byte);
            }
            other => tracing::debug!(element = other, "skipping unknown shape element"),
        }
    }
    Ok(extra)
}

impl ObjectPart {
    /// Serialize as a standalone `<SceneObjectPart>` document.
    pub fn to_xml(&self, mode: XmlOwnerMode) -> Result<String> {
        let mut out = XmlOut::new();
        self.write_xml(&mut out, mode)?;
        out.finish()
    }

    /// Write the `<SceneObjectPart>` element.
    pub(crate) fn write_xml(&self, out: &mut XmlOut, mode: XmlOwnerMode) -> Result<()> {
        let group = self.group();
        let group_state = group.as_ref().map(|g| g.state()).unwrap_or_default();
        let root = self.root_if_child();
        let parent_id = root.as_ref().map_or(0, |root| root.local_id());
        let group_position = group
            .as_ref()
            .map_or_else(|| self.global_position(), |g| g.global_position());
        // Local ids are unassigned outside a scene, so the root decides.
        let offset_position = if root.is_some() { self.position() } else { Vec3::ZERO };
        let rotation = self.rotation();
        let shape = self.shape();
        let extra = self.extra_params();
        let state = self.read(PartState::clone);
        let localizations = self.localizations();

        let masks = match mode {
            XmlOwnerMode::Full => state.permissions,
            XmlOwnerMode::NextOwner | XmlOwnerMode::Redacted => {
                state.permissions.adjusted_for_next_owner()
            }
        };
        let (owner, last_owner, group_id) = match mode {
            XmlOwnerMode::Redacted => (Uuid::nil(), Uuid::nil(), Uuid::nil()),
            XmlOwnerMode::Full | XmlOwnerMode::NextOwner => (
                group_state.owner.id,
                group_state.last_owner.id,
                group_state.group.id,
            ),
        };

        out.start("SceneObjectPart")?;
        out.uuid("CreatorID", state.creator.id)?;
        out.display("InventorySerial", self.inventory.serial())?;
        self.inventory.write_xml(out)?;
        out.uuid("UUID", self.id)?;
        out.display("LocalId", self.local_id())?;
        out.display("Material", state.material as u8)?;
        out.vec3("GroupPosition", group_position)?;
        out.vec3("OffsetPosition", offset_position)?;
        out.quat("RotationOffset", rotation)?;
        out.vec3("Velocity", state.velocity)?;
        out.vec3("AngularVelocity", state.angular_velocity)?;
        out.vec3("Acceleration", state.acceleration)?;
        write_localized(out, localizations.default_info(), false)?;
        out.display("ClickAction", state.click_action as u8)?;
        write_shape(out, &shape, localizations.default_info().texture_entry.as_ref(), &extra)?;
        out.vec3("Scale", state.size)?;
        out.bool("SitTargetEnabled", state.sit_target.enabled)?;
        out.quat("SitTargetOrientation", state.sit_target.orientation)?;
        out.vec3("SitTargetPosition", state.sit_target.offset)?;
        out.display("ParentID", parent_id)?;
        out.display("CreationDate", state.creation_date)?;
        out.display("Category", group_state.category)?;
        out.display("SalePrice", group_state.sale_price)?;
        out.display("ObjectSaleType", group_state.sale_type as u8)?;
        out.uuid("GroupID", group_id)?;
        out.uuid("OwnerID", owner)?;
        out.uuid("LastOwnerID", last_owner)?;
        out.display("BaseMask", masks.base.bits())?;
        out.display("OwnerMask", masks.owner.bits())?;
        out.display("GroupMask", masks.group.bits())?;
        out.display("EveryoneMask", masks.everyone.bits())?;
        out.display("NextOwnerMask", masks.next_owner.bits())?;
        out.display("Flags", state.flags.bits())?;
        out.bool("Locked", state.is_locked)?;
        out.uuid("CollisionSound", state.collision_sound.sound_id)?;
        out.display("CollisionSoundVolume", state.collision_sound.volume)?;
        out.display("AttachPoint", group_state.attach_point)?;
        out.vec3("AttachedPos", group_state.attached_pos)?;
        out.display("PhysicsShapeType", shape.physics_shape_type)?;
        out.display("Density", state.physics.density)?;
        out.display("Friction", state.physics.friction)?;
        out.display("Bounce", state.physics.restitution)?;
        out.display("GravityModifier", state.physics.gravity_multiplier)?;
        out.vec3("OmegaAxis", state.omega.axis)?;
        out.display("OmegaSpinRate", state.omega.spin_rate)?;
        out.display("OmegaGain", state.omega.gain)?;
        out.bool("AllowUnsit", state.allow_unsit)?;
        out.bool("ScriptedSitOnly", state.scripted_sit_only)?;

        out.start("Localizations")?;
        for culture in localizations.cultures() {
            let Some(info) = localizations.get(culture) else {
                continue;
            };
            out.start("Localization")?;
            out.text("Culture", culture)?;
            write_localized(out, info, true)?;
            out.end("Localization")?;
        }
        out.end("Localizations")?;

        out.end("SceneObjectPart")
    }

    /// Parse a `<SceneObjectPart>` document.
    pub fn from_xml(xml: &str, group: Option<&ObjectGroup>) -> Result<Arc<ObjectPart>> {
        Self::from_xml_node(&XmlNode::parse(xml)?, group)
    }

    /// Build a detached part from a parsed element.
    ///
    /// The global position is `GroupPosition + OffsetPosition`; children are
    /// re-placed under their root by [`apply_link_transform`] once linked.
    /// Group-level fields are applied to `group` when one is supplied.
    pub fn from_xml_node(node: &XmlNode, group: Option<&ObjectGroup>) -> Result<Arc<ObjectPart>> {
        if node.name != "SceneObjectPart" {
            return Err(Error::Xml {
                context: "SceneObjectPart",
                message: format!("unexpected element <{}>", node.name),
            });
        }

        let mut id = Uuid::nil();
        let mut local_id = 0u32;
        let mut state = PartState::default();
        let mut shape = PrimitiveShape::default();
        let mut localizations = Localizations::default();
        let mut extra = None;
        let mut inventory = None;
        let mut group_position = Vec3::ZERO;
        let mut offset_position = Vec3::ZERO;

        for child in &node.children {
            if read_localized(child, localizations.default_info_mut())? {
                continue;
            }
            match child.name.as_str() {
                "CreatorID" => state.creator = Ugui::from(child.as_uuid()?),
                "TaskInventory" => inventory = Some(child),
                "UUID" => id = child.as_uuid()?,
                "LocalId" => local_id = number(child)?,
                "Material" => {
                    state.material = PrimitiveMaterial::from_i32(number(child)?).unwrap_or_default();
                }
                "GroupPosition" => group_position = child.as_vec3()?,
                "OffsetPosition" => offset_position = child.as_vec3()?,
                "RotationOffset" => state.global_rotation = child.as_quat()?.normalize(),
                "Velocity" => state.velocity = child.as_vec3()?,
                "AngularVelocity" => state.angular_velocity = child.as_vec3()?,
                "Acceleration" => state.acceleration = child.as_vec3()?,
                "ClickAction" => {
                    state.click_action = ClickAction::from_i32(number(child)?).unwrap_or_default();
                }
                "Shape" => {
                    extra = read_shape(child, &mut shape, localizations.default_info_mut())?;
                }
                "Scale" => state.size = child.as_vec3()?,
                "SitTargetEnabled" => state.sit_target.enabled = child.as_bool()?,
                "SitTargetOrientation" => state.sit_target.orientation = child.as_quat()?,
                "SitTargetPosition" => state.sit_target.offset = child.as_vec3()?,
                "CreationDate" => state.creation_date = number(child)?,
                "BaseMask" => state.permissions.base = mask(child)?,
                "OwnerMask" => state.permissions.owner = mask(child)?,
                "GroupMask" => state.permissions.group = mask(child)?,
                "EveryoneMask" => state.permissions.everyone = mask(child)?,
                "NextOwnerMask" => state.permissions.next_owner = mask(child)?,
                "Flags" => state.flags = PrimitiveFlags::from_bits_retain(number(child)?),
                "Locked" => state.is_locked = child.as_bool()?,
                "CollisionSound" => state.collision_sound.sound_id = child.as_uuid()?,
                "CollisionSoundVolume" => state.collision_sound.volume = number(child)?,
                "PhysicsShapeType" => shape.physics_shape_type = number(child)?,
                "Density" => state.physics.density = number(child)?,
                "Friction" => state.physics.friction = number(child)?,
                "Bounce" => state.physics.restitution = number(child)?,
                "GravityModifier" => state.physics.gravity_multiplier = number(child)?,
                "OmegaAxis" => state.omega.axis = child.as_vec3()?,
                "OmegaSpinRate" => state.omega.spin_rate = number(child)?,
                "OmegaGain" => state.omega.gain = number(child)?,
                "AllowUnsit" => state.allow_unsit = child.as_bool()?,
                "ScriptedSitOnly" => state.scripted_sit_only = child.as_bool()?,
                "Localizations" => read_localizations(child, &mut localizations)?,
                // Group-level and derived values.
                "InventorySerial" | "ParentID" | "Category" | "SalePrice" | "ObjectSaleType"
                | "GroupID" | "OwnerID" | "LastOwnerID" | "AttachPoint" | "AttachedPos" => {}
                other => tracing::debug!(element = other, part = %id, "skipping unknown part element"),
            }
        }

        if let Some(extra) = extra {
            state.flexible = extra.flexible;
            state.light = extra.light;
            state.projector = extra.projector;
            if let Some(sculpt) = extra.sculpt {
                shape.sculpt_map = sculpt.map;
                set_sculpt_type_byte(&mut shape, sculpt.sculpt_type);
            }
        }
        state.global_position = group_position + offset_position;

        let part = ObjectPart::with_shape(id, shape);
        *part.state.lock() = state;
        *part.localizations.write() = localizations;
        if let Some(inventory) = inventory {
            part.inventory.read_xml(inventory)?;
        }
        part.update_info.set_local_id(local_id);

        if let Some(group) = group {
            apply_group_fields(node, group)?;
        }
        Ok(part)
    }
}

fn read_localizations(node: &XmlNode, localizations: &mut Localizations) -> Result<()> {
    for entry in node.children.iter().filter(|c| c.name == "Localization") {
        let culture = entry
            .child("Culture")
            .map(|c| c.text.trim().to_owned())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Xml {
                context: "Localization",
                message: "missing <Culture>".to_owned(),
            })?;
        let info = localizations.get_or_insert(&culture);
        for child in entry.children.iter().filter(|c| c.name != "Culture") {
            if !read_localized(child, info)? {
                tracing::debug!(element = %child.name, culture = %culture, "skipping unknown localized element");
            }
        }
    }
    Ok(())
}

/// Copy the group-level fields stored on a part element onto `group`.
pub(crate) fn apply_group_fields(node: &XmlNode, group: &ObjectGroup) -> Result<()> {
    let mut owner = None;
    let mut last_owner = None;
    let mut group_id = None;
    let mut category = None;
    let mut sale_price = None;
    let mut sale_type = None;
    let mut attach_point = None;
    let mut attached_pos = None;
    for child in &node.children {
        match child.name.as_str() {
            "OwnerID" => owner = Some(Ugui::from(child.as_uuid()?)),
            "LastOwnerID" => last_owner = Some(Ugui::from(child.as_uuid()?)),
            "GroupID" => group_id = Some(Ugi::from(child.as_uuid()?)),
            "Category" => category = Some(number::<u32>(child)?),
            "SalePrice" => sale_price = Some(number::<i32>(child)?),
            "ObjectSaleType" => sale_type = Some(SaleType::from_u8(number(child)?)),
            "AttachPoint" => attach_point = Some(number::<u8>(child)?),
            "AttachedPos" => attached_pos = Some(child.as_vec3()?),
            _ => {}
        }
    }
    group.update_state(ChangedFlags::empty(), |state| {
        if let Some(owner) = owner {
            state.owner = owner;
        }
        if let Some(last_owner) = last_owner {
            state.last_owner = last_owner;
        }
        if let Some(group_id) = group_id {
            state.group = group_id;
        }
        if let Some(category) = category {
            state.category = category;
        }
        if let Some(price) = sale_price {
            state.sale_price = price;
        }
        if let Some(sale_type) = sale_type {
            state.sale_type = sale_type;
        }
        if let Some(point) = attach_point {
            state.attach_point = point;
            state.is_attached = point != 0;
        }
        if let Some(pos) = attached_pos {
            state.attached_pos = pos;
        }
    });
    Ok(())
}

/// Re-place a freshly linked child from its root-relative XML transform.
pub(crate) fn apply_link_transform(node: &XmlNode, part: &Arc<ObjectPart>) -> Result<()> {
    if let Some(offset) = node.child("OffsetPosition") {
        part.set_position(offset.as_vec3()?);
    }
    if let Some(rotation) = node.child("RotationOffset") {
        part.set_rotation(rotation.as_quat()?.normalize());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::part::{InventoryType, ObjectPartInventoryItem};

    fn sample_part() -> Arc<ObjectPart> {
        let part = ObjectPart::with_shape(
            Uuid::from_u128(0x100),
            PrimitiveShape::of_type(primshape::PrimitiveShapeType::Cylinder),
        );
        part.set_name(None, "Pillar");
        part.set_description(None, "holds the roof");
        part.set_name(Some("de"), "Säule");
        part.set_text(
            None,
            &TextParams {
                text: "hello".to_owned(),
                color: Vec3::new(1.0, 0.0, 0.0),
                alpha: 1.0,
            },
        );
        part.set_size(Vec3::new(0.5, 0.5, 4.0));
        part.set_global_position(Vec3::new(10.0, 20.0, 30.0));
        part.set_material(PrimitiveMaterial::Stone);
        part.add_inventory_item(ObjectPartInventoryItem::new(
            Uuid::from_u128(0x200),
            "readme",
            InventoryType::Notecard,
        ));
        part
    }

    #[test]
    fn test_part_round_trip() {
        let part = sample_part();
        let xml = part.to_xml(XmlOwnerMode::Full).unwrap();
        let restored = ObjectPart::from_xml(&xml, None).unwrap();

        assert_eq!(restored.id(), part.id());
        assert_eq!(restored.name(None), "Pillar");
        assert_eq!(restored.description(None), "holds the roof");
        assert_eq!(restored.name(Some("de")), "Säule");
        // Only the overridden property is stored for the named culture.
        assert!(restored.localizations().get("de").unwrap().description.is_none());
        assert_eq!(restored.text(None).text, "hello");
        assert_eq!(restored.text(None).color, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(restored.size(), Vec3::new(0.5, 0.5, 4.0));
        assert_eq!(restored.global_position(), Vec3::new(10.0, 20.0, 30.0));
        assert_eq!(restored.material(), PrimitiveMaterial::Stone);
        assert_eq!(restored.shape(), part.shape());
        assert_eq!(restored.texture_entry(None), part.texture_entry(None));
        assert_eq!(restored.inventory().len(), 1);
        assert!(!restored.flags().contains(PrimitiveFlags::INVENTORY_EMPTY));
    }

    #[test]
    fn test_unknown_elements_are_skipped() {
        let xml = format!(
            "<SceneObjectPart><UUID><UUID>{}</UUID></UUID><Name>box</Name>\
             <Sparkles>lots</Sparkles><Scale><X>1</X><Y>2</Y><Z>3</Z></Scale></SceneObjectPart>",
            Uuid::from_u128(7)
        );
        let part = ObjectPart::from_xml(&xml, None).unwrap();
        assert_eq!(part.id(), Uuid::from_u128(7));
        assert_eq!(part.name(None), "box");
        assert_eq!(part.size(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_wrong_root_element_fails() {
        let result = ObjectPart::from_xml("<Something/>", None);
        assert!(matches!(result, Err(Error::Xml { .. })));
    }

    #[test]
    fn test_owner_modes() {
        let part = sample_part();
        let group = ObjectGroup::new(Arc::clone(&part));
        group.set_owner(Ugui::from(Uuid::from_u128(0x300)));
        let mut masks = part.permissions();
        masks.next_owner = InventoryPermissionsMask::MOVE;
        part.set_permissions(masks);

        let full = XmlNode::parse(&part.to_xml(XmlOwnerMode::Full).unwrap()).unwrap();
        assert_eq!(full.child("OwnerID").unwrap().as_uuid().unwrap(), Uuid::from_u128(0x300));
        assert_eq!(
            mask(full.child("OwnerMask").unwrap()).unwrap(),
            InventoryPermissionsMask::ALL
        );

        let next = XmlNode::parse(&part.to_xml(XmlOwnerMode::NextOwner).unwrap()).unwrap();
        assert_eq!(next.child("OwnerID").unwrap().as_uuid().unwrap(), Uuid::from_u128(0x300));
        assert_eq!(
            mask(next.child("OwnerMask").unwrap()).unwrap(),
            InventoryPermissionsMask::MOVE
        );

        let redacted = XmlNode::parse(&part.to_xml(XmlOwnerMode::Redacted).unwrap()).unwrap();
        assert!(redacted.child("OwnerID").unwrap().as_uuid().unwrap().is_nil());
    }

    #[test]
    fn test_group_fields_need_a_group() {
        let xml = format!(
            "<SceneObjectPart><UUID><UUID>{}</UUID></UUID>\
             <OwnerID><UUID>{}</UUID></OwnerID><SalePrice>25</SalePrice>\
             <ObjectSaleType>2</ObjectSaleType></SceneObjectPart>",
            Uuid::from_u128(1),
            Uuid::from_u128(0x55)
        );
        let detached = ObjectPart::from_xml(&xml, None).unwrap();
        assert!(detached.owner().is_unknown());

        let group = ObjectGroup::new(ObjectPart::new(Uuid::from_u128(2)));
        ObjectPart::from_xml(&xml, Some(&*group)).unwrap();
        let state = group.state();
        assert_eq!(state.owner.id, Uuid::from_u128(0x55));
        assert_eq!(state.sale_price, 25);
        assert_eq!(state.sale_type, SaleType::Copy);
    }

    #[test]
    fn test_group_round_trip_keeps_child_offsets() {
        let root = sample_part();
        root.set_global_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let group = ObjectGroup::new(Arc::clone(&root));
        group.set_owner(Ugui::from(Uuid::from_u128(0x300)));
        let child = ObjectPart::new(Uuid::from_u128(0x101));
        group.link(Arc::clone(&child));
        child.set_position(Vec3::new(0.0, 0.0, 2.0));
        child.set_rotation(Quat::from_rotation_x(0.5));

        let xml = group.to_xml(XmlOwnerMode::Full).unwrap();
        let restored = ObjectGroup::from_xml(&xml).unwrap();

        assert_eq!(restored.part_count(), 2);
        assert_eq!(restored.owner().id, Uuid::from_u128(0x300));
        let restored_child = restored.find_part(Uuid::from_u128(0x101)).unwrap();
        assert!((restored_child.position() - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-4);
        assert!((restored_child.global_position() - child.global_position()).length() < 1e-4);
        let rotation = restored_child.rotation();
        assert!(rotation.dot(Quat::from_rotation_x(0.5)).abs() > 1.0 - 1e-6);
    }
}
