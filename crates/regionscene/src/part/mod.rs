//! The primitive entity of the object model.
//!
//! An [`ObjectPart`] owns its shape, transform, physics material, permission
//! masks, localized presentation and inventory, plus the one
//! [`ObjectUpdateInfo`] that versions it. Scalar state sits behind one mutex,
//! the shape behind another and the localizations behind a read-write lock.
//! Callers must not assume two reads are a consistent snapshot.
//!
//! Every mutating setter ends in [`ObjectPart::trigger_on_update`], which
//! bumps the update serial exactly once. Writes of an unchanged value still
//! notify.

mod inventory;
pub mod params;
mod wire;
mod xml;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use glam::{Quat, Vec3};
use parking_lot::{Mutex, RwLock};
use primshape::{
    ExtraParams, FlexibleParams, LightParams, PathCurve, PhysicsShapeType, PrimitiveShape,
    PrimitiveShapeType, ProjectorParams, SculptParams, TextureAnimation, TextureEntry,
};
use uuid::Uuid;

use crate::group::ObjectGroup;
use crate::localization::{
    CultureSelector, LocalizedProperty, LocalizedView, Localizations, ObjectPartLocalizedInfo,
    SoundParams, TextParams,
};
use crate::observer::ObserverList;
use crate::types::{ChangedFlags, PermissionMasks, PrimitiveFlags, Ugui};
use crate::update::ObjectUpdateInfo;

pub use inventory::{InventoryType, ObjectPartInventory, ObjectPartInventoryItem};
pub(crate) use xml::{apply_group_fields, apply_link_transform};
pub use xml::XmlOwnerMode;

pub const MIN_PART_SIZE: f32 = 0.01;
pub const MAX_PART_SIZE: f32 = 64.0;

/// Called after every change with the flags that describe it.
pub type UpdateObserver = dyn Fn(&ObjectPart, ChangedFlags) + Send + Sync;
/// Called with the new global position after a move.
pub type PositionObserver = dyn Fn(&ObjectPart, Vec3) + Send + Sync;

/// Material presets. Choosing one resets friction and restitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PrimitiveMaterial {
    Stone = 0,
    Metal = 1,
    Glass = 2,
    #[default]
    Wood = 3,
    Flesh = 4,
    Plastic = 5,
    Rubber = 6,
    Light = 7,
}

impl PrimitiveMaterial {
    #[must_use]
    pub fn from_i32(v: i32) -> Option<Self> {
        Some(match v {
            0 => Self::Stone,
            1 => Self::Metal,
            2 => Self::Glass,
            3 => Self::Wood,
            4 => Self::Flesh,
            5 => Self::Plastic,
            6 => Self::Rubber,
            7 => Self::Light,
            _ => return None,
        })
    }

    /// `(friction, restitution)` of the preset.
    #[must_use]
    pub fn coefficients(self) -> (f32, f32) {
        match self {
            Self::Stone => (0.8, 0.4),
            Self::Metal => (0.3, 0.4),
            Self::Glass | Self::Light => (0.2, 0.7),
            Self::Wood => (0.6, 0.5),
            Self::Flesh => (0.9, 0.3),
            Self::Plastic => (0.4, 0.7),
            Self::Rubber => (0.9, 0.9),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsMaterial {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub gravity_multiplier: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        let (friction, restitution) = PrimitiveMaterial::default().coefficients();
        Self {
            density: 1000.0,
            friction,
            restitution,
            gravity_multiplier: 1.0,
        }
    }
}

/// What a left click on the part does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ClickAction {
    #[default]
    Touch = 0,
    Sit = 1,
    Buy = 2,
    Pay = 3,
    Open = 4,
    Play = 5,
    OpenMedia = 6,
    Zoom = 7,
    Disabled = 8,
}

impl ClickAction {
    #[must_use]
    pub fn from_i32(v: i32) -> Option<Self> {
        Some(match v {
            0 => Self::Touch,
            1 => Self::Sit,
            2 => Self::Buy,
            3 => Self::Pay,
            4 => Self::Open,
            5 => Self::Play,
            6 => Self::OpenMedia,
            7 => Self::Zoom,
            8 => Self::Disabled,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SitTarget {
    pub enabled: bool,
    pub offset: Vec3,
    pub orientation: Quat,
}

impl Default for SitTarget {
    fn default() -> Self {
        Self {
            enabled: false,
            offset: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollisionSound {
    pub sound_id: Uuid,
    pub volume: f32,
}

/// Client-side spin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Omega {
    pub axis: Vec3,
    pub spin_rate: f32,
    pub gain: f32,
}

#[derive(Debug, Clone)]
struct PartState {
    global_position: Vec3,
    global_rotation: Quat,
    velocity: Vec3,
    acceleration: Vec3,
    angular_velocity: Vec3,
    size: Vec3,
    creator: Ugui,
    creation_date: u32,
    permissions: PermissionMasks,
    flags: PrimitiveFlags,
    is_locked: bool,
    material: PrimitiveMaterial,
    physics: PhysicsMaterial,
    click_action: ClickAction,
    sit_target: SitTarget,
    allow_unsit: bool,
    scripted_sit_only: bool,
    flexible: Option<FlexibleParams>,
    light: Option<LightParams>,
    projector: Option<ProjectorParams>,
    collision_sound: CollisionSound,
    omega: Omega,
    changed: ChangedFlags,
}

impl Default for PartState {
    fn default() -> Self {
        Self {
            global_position: Vec3::ZERO,
            global_rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            size: Vec3::splat(0.5),
            creator: Ugui::unknown(),
            creation_date: 0,
            permissions: PermissionMasks::default(),
            flags: PrimitiveFlags::INVENTORY_EMPTY,
            is_locked: false,
            material: PrimitiveMaterial::default(),
            physics: PhysicsMaterial::default(),
            click_action: ClickAction::default(),
            sit_target: SitTarget::default(),
            allow_unsit: true,
            scripted_sit_only: false,
            flexible: None,
            light: None,
            projector: None,
            collision_sound: CollisionSound::default(),
            omega: Omega::default(),
            changed: ChangedFlags::empty(),
        }
    }
}

/// A single primitive.
pub struct ObjectPart {
    id: Uuid,
    update_info: Arc<ObjectUpdateInfo>,
    group: RwLock<Weak<ObjectGroup>>,
    state: Mutex<PartState>,
    shape: Mutex<PrimitiveShape>,
    localizations: RwLock<Localizations>,
    inventory: ObjectPartInventory,
    on_update: ObserverList<UpdateObserver>,
    on_position_change: ObserverList<PositionObserver>,
}

impl std::fmt::Debug for ObjectPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPart")
            .field("id", &self.id)
            .field("local_id", &self.local_id())
            .finish_non_exhaustive()
    }
}

impl ObjectPart {
    /// A detached default box.
    pub fn new(id: Uuid) -> Arc<Self> {
        Self::with_shape(id, PrimitiveShape::default())
    }

    pub fn with_shape(id: Uuid, shape: PrimitiveShape) -> Arc<Self> {
        Arc::new_cyclic(|part| Self {
            id,
            update_info: Arc::new(ObjectUpdateInfo::new(part.clone())),
            group: RwLock::new(Weak::new()),
            state: Mutex::new(PartState::default()),
            shape: Mutex::new(shape),
            localizations: RwLock::new(Localizations::default()),
            inventory: ObjectPartInventory::new(id),
            on_update: ObserverList::default(),
            on_position_change: ObserverList::default(),
        })
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn update_info(&self) -> &Arc<ObjectUpdateInfo> {
        &self.update_info
    }

    #[must_use]
    pub fn local_id(&self) -> u32 {
        self.update_info.local_id()
    }

    /// The owning group, `None` while detached.
    #[must_use]
    pub fn group(&self) -> Option<Arc<ObjectGroup>> {
        self.group.read().upgrade()
    }

    pub(crate) fn attach_to_group(&self, group: Weak<ObjectGroup>) {
        *self.group.write() = group;
    }

    /// The group's root, or `None` when this part is the root or detached.
    fn root_if_child(&self) -> Option<Arc<ObjectPart>> {
        let group = self.group()?;
        let root = group.root_part();
        (root.id != self.id).then(|| Arc::clone(root))
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.root_if_child().is_none()
    }

    #[must_use]
    pub fn on_update(&self) -> &ObserverList<UpdateObserver> {
        &self.on_update
    }

    #[must_use]
    pub fn on_position_change(&self) -> &ObserverList<PositionObserver> {
        &self.on_position_change
    }

    /// Record a change and propagate it.
    ///
    /// The serial is incremented even while detached; observers and
    /// scheduling only run when the part belongs to a group.
    pub fn trigger_on_update(&self, flags: ChangedFlags) {
        self.state.lock().changed.insert(flags);
        let serial = self.update_info.increment_serial();

        let Some(group) = self.group() else {
            tracing::trace!(part = %self.id, serial, "detached part, update not propagated");
            return;
        };
        group.reset_original_asset_id();

        for observer in self.on_update.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| observer(self, flags))).is_err() {
                tracing::warn!(part = %self.id, flags = flags.bits(), "update observer panicked");
            }
        }
        group.schedule_update(&self.update_info);
    }

    /// Bump every child's serial when this part is a root. Child buffers
    /// embed the root's transform and local id.
    pub(crate) fn refresh_children(&self) {
        let Some(group) = self.group() else {
            return;
        };
        if group.root_part().id != self.id {
            return;
        }
        for child in group.parts().iter().skip(1) {
            child.trigger_on_update(ChangedFlags::empty());
        }
    }

    fn notify_position(&self, position: Vec3) {
        if self.group().is_none() {
            return;
        }
        for observer in self.on_position_change.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| observer(self, position))).is_err() {
                tracing::warn!(part = %self.id, "position observer panicked");
            }
        }
    }

    fn read<T>(&self, f: impl FnOnce(&PartState) -> T) -> T {
        f(&self.state.lock())
    }

    fn modify(&self, flags: ChangedFlags, f: impl FnOnce(&mut PartState)) {
        f(&mut self.state.lock());
        self.trigger_on_update(flags);
    }

    /// Flags accumulated since the last [`ObjectPart::take_changed_flags`].
    #[must_use]
    pub fn changed_flags(&self) -> ChangedFlags {
        self.read(|s| s.changed)
    }

    pub fn take_changed_flags(&self) -> ChangedFlags {
        std::mem::take(&mut self.state.lock().changed)
    }

    // Transform

    #[must_use]
    pub fn global_position(&self) -> Vec3 {
        self.read(|s| s.global_position)
    }

    pub fn set_global_position(&self, position: Vec3) {
        self.modify(ChangedFlags::empty(), |s| s.global_position = position);
        self.notify_position(position);
        self.refresh_children();
    }

    #[must_use]
    pub fn global_rotation(&self) -> Quat {
        self.read(|s| s.global_rotation)
    }

    pub fn set_global_rotation(&self, rotation: Quat) {
        self.modify(ChangedFlags::empty(), |s| s.global_rotation = rotation);
        self.refresh_children();
    }

    /// Position relative to the root part; global for a root or detached part.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        match self.root_if_child() {
            Some(root) => {
                let (root_position, root_rotation) =
                    root.read(|s| (s.global_position, s.global_rotation));
                root_rotation.inverse() * (self.global_position() - root_position)
            }
            None => self.global_position(),
        }
    }

    pub fn set_position(&self, position: Vec3) {
        let global = match self.root_if_child() {
            Some(root) => {
                let (root_position, root_rotation) =
                    root.read(|s| (s.global_position, s.global_rotation));
                root_position + root_rotation * position
            }
            None => position,
        };
        self.set_global_position(global);
    }

    #[must_use]
    pub fn local_position(&self) -> Vec3 {
        self.position()
    }

    pub fn set_local_position(&self, position: Vec3) {
        self.set_position(position);
    }

    /// Rotation relative to the root part; global for a root or detached part.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        match self.root_if_child() {
            Some(root) => root.global_rotation().inverse() * self.global_rotation(),
            None => self.global_rotation(),
        }
    }

    pub fn set_rotation(&self, rotation: Quat) {
        let global = match self.root_if_child() {
            Some(root) => root.global_rotation() * rotation,
            None => rotation,
        };
        self.set_global_rotation(global);
    }

    #[must_use]
    pub fn local_rotation(&self) -> Quat {
        self.rotation()
    }

    pub fn set_local_rotation(&self, rotation: Quat) {
        self.set_rotation(rotation);
    }

    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.read(|s| s.velocity)
    }

    pub fn set_velocity(&self, velocity: Vec3) {
        self.modify(ChangedFlags::empty(), |s| s.velocity = velocity);
    }

    #[must_use]
    pub fn acceleration(&self) -> Vec3 {
        self.read(|s| s.acceleration)
    }

    pub fn set_acceleration(&self, acceleration: Vec3) {
        self.modify(ChangedFlags::empty(), |s| s.acceleration = acceleration);
    }

    #[must_use]
    pub fn angular_velocity(&self) -> Vec3 {
        self.read(|s| s.angular_velocity)
    }

    pub fn set_angular_velocity(&self, angular_velocity: Vec3) {
        self.modify(ChangedFlags::empty(), |s| s.angular_velocity = angular_velocity);
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.read(|s| s.size)
    }

    /// Each axis is clamped to `MIN_PART_SIZE..=MAX_PART_SIZE`.
    pub fn set_size(&self, size: Vec3) {
        let size = size.clamp(Vec3::splat(MIN_PART_SIZE), Vec3::splat(MAX_PART_SIZE));
        self.modify(ChangedFlags::SCALE, |s| s.size = size);
    }

    // Identity and permissions

    #[must_use]
    pub fn creator(&self) -> Ugui {
        self.read(|s| s.creator.clone())
    }

    pub fn set_creator(&self, creator: Ugui) {
        self.modify(ChangedFlags::empty(), |s| s.creator = creator);
    }

    /// Unix seconds.
    #[must_use]
    pub fn creation_date(&self) -> u32 {
        self.read(|s| s.creation_date)
    }

    pub fn set_creation_date(&self, date: u32) {
        self.modify(ChangedFlags::empty(), |s| s.creation_date = date);
    }

    /// The group's owner; unknown while detached.
    #[must_use]
    pub fn owner(&self) -> Ugui {
        self.group().map(|g| g.owner()).unwrap_or_default()
    }

    #[must_use]
    pub fn permissions(&self) -> PermissionMasks {
        self.read(|s| s.permissions)
    }

    pub fn set_permissions(&self, permissions: PermissionMasks) {
        self.modify(ChangedFlags::empty(), |s| s.permissions = permissions);
    }

    #[must_use]
    pub fn flags(&self) -> PrimitiveFlags {
        self.read(|s| s.flags)
    }

    pub fn set_flags(&self, flags: PrimitiveFlags) {
        self.modify(ChangedFlags::empty(), |s| s.flags = flags);
    }

    pub fn set_flag(&self, flag: PrimitiveFlags, on: bool) {
        self.modify(ChangedFlags::empty(), |s| s.flags.set(flag, on));
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.read(|s| s.is_locked)
    }

    pub fn set_locked(&self, locked: bool) {
        self.modify(ChangedFlags::empty(), |s| s.is_locked = locked);
    }

    // Physics

    #[must_use]
    pub fn material(&self) -> PrimitiveMaterial {
        self.read(|s| s.material)
    }

    /// Also overwrites friction and restitution with the preset values,
    /// discarding any custom coefficients.
    pub fn set_material(&self, material: PrimitiveMaterial) {
        let (friction, restitution) = material.coefficients();
        self.modify(ChangedFlags::empty(), |s| {
            s.material = material;
            s.physics.friction = friction;
            s.physics.restitution = restitution;
        });
    }

    #[must_use]
    pub fn physics_material(&self) -> PhysicsMaterial {
        self.read(|s| s.physics)
    }

    pub fn set_physics_material(&self, physics: PhysicsMaterial) {
        self.modify(ChangedFlags::empty(), |s| s.physics = physics);
    }

    pub fn set_density(&self, density: f32) {
        self.modify(ChangedFlags::empty(), |s| s.physics.density = density);
    }

    pub fn set_friction(&self, friction: f32) {
        self.modify(ChangedFlags::empty(), |s| s.physics.friction = friction);
    }

    pub fn set_restitution(&self, restitution: f32) {
        self.modify(ChangedFlags::empty(), |s| s.physics.restitution = restitution);
    }

    pub fn set_gravity_multiplier(&self, multiplier: f32) {
        self.modify(ChangedFlags::empty(), |s| s.physics.gravity_multiplier = multiplier);
    }

    #[must_use]
    pub fn physics_shape_type(&self) -> PhysicsShapeType {
        self.shape.lock().physics_shape().unwrap_or_default()
    }

    pub fn set_physics_shape_type(&self, shape_type: PhysicsShapeType) {
        self.update_shape(ChangedFlags::SHAPE, |s| s.set_physics_shape(shape_type));
    }

    // Interaction

    #[must_use]
    pub fn click_action(&self) -> ClickAction {
        self.read(|s| s.click_action)
    }

    pub fn set_click_action(&self, action: ClickAction) {
        self.modify(ChangedFlags::empty(), |s| s.click_action = action);
    }

    #[must_use]
    pub fn sit_target(&self) -> SitTarget {
        self.read(|s| s.sit_target)
    }

    pub fn set_sit_target(&self, target: SitTarget) {
        self.modify(ChangedFlags::empty(), |s| s.sit_target = target);
    }

    #[must_use]
    pub fn allow_unsit(&self) -> bool {
        self.read(|s| s.allow_unsit)
    }

    pub fn set_allow_unsit(&self, allow: bool) {
        self.modify(ChangedFlags::empty(), |s| s.allow_unsit = allow);
    }

    #[must_use]
    pub fn scripted_sit_only(&self) -> bool {
        self.read(|s| s.scripted_sit_only)
    }

    pub fn set_scripted_sit_only(&self, only: bool) {
        self.modify(ChangedFlags::empty(), |s| s.scripted_sit_only = only);
    }

    #[must_use]
    pub fn collision_sound(&self) -> CollisionSound {
        self.read(|s| s.collision_sound)
    }

    pub fn set_collision_sound(&self, sound: CollisionSound) {
        self.modify(ChangedFlags::empty(), |s| s.collision_sound = sound);
    }

    #[must_use]
    pub fn omega(&self) -> Omega {
        self.read(|s| s.omega)
    }

    pub fn set_omega(&self, omega: Omega) {
        self.modify(ChangedFlags::empty(), |s| s.omega = omega);
    }

    // Extra parameters

    #[must_use]
    pub fn flexible(&self) -> Option<FlexibleParams> {
        self.read(|s| s.flexible)
    }

    /// Enabling flexibility on a straight path bends it into a flexible one.
    pub fn set_flexible(&self, flexible: Option<FlexibleParams>) {
        {
            let mut shape = self.shape.lock();
            match (flexible.is_some(), shape.path()) {
                (true, Some(PathCurve::Straight)) => shape.path_curve = PathCurve::Flexible as u8,
                (false, Some(PathCurve::Flexible)) => shape.path_curve = PathCurve::Straight as u8,
                _ => {}
            }
        }
        self.modify(ChangedFlags::SHAPE, |s| s.flexible = flexible);
    }

    #[must_use]
    pub fn light(&self) -> Option<LightParams> {
        self.read(|s| s.light)
    }

    pub fn set_light(&self, light: Option<LightParams>) {
        self.modify(ChangedFlags::empty(), |s| s.light = light);
    }

    #[must_use]
    pub fn projector(&self) -> Option<ProjectorParams> {
        self.read(|s| s.projector)
    }

    pub fn set_projector(&self, projector: Option<ProjectorParams>) {
        self.modify(ChangedFlags::empty(), |s| s.projector = projector);
    }

    /// The extra-params blob contents, sculpt entry taken from the shape.
    #[must_use]
    pub fn extra_params(&self) -> ExtraParams {
        let sculpt = {
            let shape = self.shape.lock();
            shape.is_sculpt().then(|| SculptParams {
                map: shape.sculpt_map,
                sculpt_type: sculpt_type_byte(&shape),
            })
        };
        self.read(|s| ExtraParams {
            flexible: s.flexible,
            light: s.light,
            sculpt,
            projector: s.projector,
        })
    }

    /// Apply a decoded extra-params blob.
    pub fn set_extra_params(&self, extra: ExtraParams) {
        if let Some(sculpt) = extra.sculpt {
            let mut shape = self.shape.lock();
            shape.sculpt_map = sculpt.map;
            set_sculpt_type_byte(&mut shape, sculpt.sculpt_type);
        }
        self.modify(ChangedFlags::SHAPE, |s| {
            s.flexible = extra.flexible;
            s.light = extra.light;
            s.projector = extra.projector;
        });
    }

    // Shape

    #[must_use]
    pub fn shape(&self) -> PrimitiveShape {
        self.shape.lock().clone()
    }

    pub fn set_shape(&self, shape: PrimitiveShape) {
        self.update_shape(ChangedFlags::SHAPE, |s| *s = shape);
    }

    /// Mutate the shape under its lock, then notify with `flags`.
    pub fn update_shape<T>(
        &self,
        flags: ChangedFlags,
        f: impl FnOnce(&mut PrimitiveShape) -> T,
    ) -> T {
        let result = f(&mut self.shape.lock());
        self.trigger_on_update(flags);
        result
    }

    #[must_use]
    pub fn shape_type(&self) -> PrimitiveShapeType {
        self.shape.lock().shape_type()
    }

    #[must_use]
    pub fn number_of_sides(&self) -> i32 {
        self.shape.lock().number_of_sides()
    }

    // Localization

    fn view<T>(&self, culture: Option<&str>, f: impl FnOnce(LocalizedView<'_>) -> T) -> T {
        f(self.localizations.read().view(culture))
    }

    fn update_localized(
        &self,
        culture: Option<&str>,
        property: LocalizedProperty,
        flags: ChangedFlags,
        f: impl FnMut(&mut ObjectPartLocalizedInfo),
    ) {
        self.localizations
            .write()
            .update(CultureSelector::parse(culture), property, f);
        self.trigger_on_update(flags);
    }

    /// A copy of every localization.
    #[must_use]
    pub fn localizations(&self) -> Localizations {
        self.localizations.read().clone()
    }

    pub fn set_localizations(&self, localizations: Localizations) {
        *self.localizations.write() = localizations;
        self.trigger_on_update(ChangedFlags::TEXTURE);
    }

    #[must_use]
    pub fn has_localization(&self, culture: &str) -> bool {
        self.localizations.read().get(culture).is_some()
    }

    /// Returns whether the culture existed.
    pub fn remove_localization(&self, culture: &str) -> bool {
        let removed = self.localizations.write().remove(culture);
        self.trigger_on_update(ChangedFlags::TEXTURE);
        removed
    }

    pub fn remove_all_localizations(&self) {
        self.localizations.write().remove_all();
        self.trigger_on_update(ChangedFlags::TEXTURE);
    }

    #[must_use]
    pub fn name(&self, culture: Option<&str>) -> String {
        self.view(culture, |v| v.name())
    }

    pub fn set_name(&self, culture: Option<&str>, name: &str) {
        self.update_localized(culture, LocalizedProperty::Name, ChangedFlags::empty(), |i| {
            i.name = Some(name.to_owned());
        });
    }

    #[must_use]
    pub fn description(&self, culture: Option<&str>) -> String {
        self.view(culture, |v| v.description())
    }

    pub fn set_description(&self, culture: Option<&str>, description: &str) {
        self.update_localized(
            culture,
            LocalizedProperty::Description,
            ChangedFlags::empty(),
            |i| i.description = Some(description.to_owned()),
        );
    }

    #[must_use]
    pub fn sit_text(&self, culture: Option<&str>) -> String {
        self.view(culture, |v| v.sit_text())
    }

    pub fn set_sit_text(&self, culture: Option<&str>, text: &str) {
        self.update_localized(culture, LocalizedProperty::SitText, ChangedFlags::empty(), |i| {
            i.sit_text = Some(text.to_owned());
        });
    }

    #[must_use]
    pub fn touch_text(&self, culture: Option<&str>) -> String {
        self.view(culture, |v| v.touch_text())
    }

    pub fn set_touch_text(&self, culture: Option<&str>, text: &str) {
        self.update_localized(culture, LocalizedProperty::TouchText, ChangedFlags::empty(), |i| {
            i.touch_text = Some(text.to_owned());
        });
    }

    #[must_use]
    pub fn text(&self, culture: Option<&str>) -> TextParams {
        self.view(culture, |v| v.text())
    }

    pub fn set_text(&self, culture: Option<&str>, text: &TextParams) {
        self.update_localized(culture, LocalizedProperty::Text, ChangedFlags::empty(), |i| {
            i.text = Some(text.clone());
        });
    }

    #[must_use]
    pub fn sound(&self, culture: Option<&str>) -> SoundParams {
        self.view(culture, |v| v.sound())
    }

    pub fn set_sound(&self, culture: Option<&str>, sound: SoundParams) {
        self.update_localized(culture, LocalizedProperty::Sound, ChangedFlags::empty(), |i| {
            i.sound = Some(sound);
        });
    }

    #[must_use]
    pub fn texture_entry(&self, culture: Option<&str>) -> TextureEntry {
        self.view(culture, |v| v.texture_entry())
    }

    pub fn set_texture_entry(&self, culture: Option<&str>, entry: &TextureEntry) {
        self.update_localized(
            culture,
            LocalizedProperty::TextureEntry,
            ChangedFlags::TEXTURE | ChangedFlags::COLOR,
            |i| i.texture_entry = Some(entry.clone()),
        );
    }

    #[must_use]
    pub fn texture_animation(&self, culture: Option<&str>) -> TextureAnimation {
        self.view(culture, |v| v.texture_animation())
    }

    pub fn set_texture_animation(&self, culture: Option<&str>, animation: TextureAnimation) {
        self.update_localized(
            culture,
            LocalizedProperty::TextureAnimation,
            ChangedFlags::empty(),
            |i| i.texture_animation = Some(animation),
        );
    }

    #[must_use]
    pub fn media_url(&self, culture: Option<&str>) -> String {
        self.view(culture, |v| v.media_url())
    }

    pub fn set_media_url(&self, culture: Option<&str>, url: &str) {
        self.update_localized(culture, LocalizedProperty::MediaUrl, ChangedFlags::MEDIA, |i| {
            i.media_url = Some(url.to_owned());
        });
    }

    #[must_use]
    pub fn particle_system(&self, culture: Option<&str>) -> Vec<u8> {
        self.view(culture, |v| v.particle_system())
    }

    pub fn set_particle_system(&self, culture: Option<&str>, data: &[u8]) {
        self.update_localized(
            culture,
            LocalizedProperty::ParticleSystem,
            ChangedFlags::empty(),
            |i| i.particle_system = Some(data.to_vec()),
        );
    }

    // Inventory

    #[must_use]
    pub fn inventory(&self) -> &ObjectPartInventory {
        &self.inventory
    }

    pub fn add_inventory_item(&self, item: ObjectPartInventoryItem) {
        self.inventory.add(item);
        self.refresh_inventory_flags();
    }

    pub fn remove_inventory_item(&self, item_id: Uuid) -> Option<ObjectPartInventoryItem> {
        let removed = self.inventory.remove(item_id);
        if removed.is_some() {
            self.refresh_inventory_flags();
        }
        removed
    }

    fn refresh_inventory_flags(&self) {
        let empty = self.inventory.is_empty();
        let scripted = self.inventory.script_count() > 0;
        self.modify(ChangedFlags::INVENTORY, |s| {
            s.flags.set(PrimitiveFlags::INVENTORY_EMPTY, empty);
            s.flags.set(PrimitiveFlags::SCRIPTED, scripted);
        });
    }
}

/// Sculpt type byte with the invert and mirror bits.
fn sculpt_type_byte(shape: &PrimitiveShape) -> u8 {
    let mut byte = shape.sculpt_type & 0x07;
    if shape.is_sculpt_inverted() {
        byte |= 0x40;
    }
    if shape.is_sculpt_mirrored() {
        byte |= 0x80;
    }
    byte
}

fn set_sculpt_type_byte(shape: &mut PrimitiveShape, byte: u8) {
    shape.sculpt_type = byte & 0x07;
    shape.set_sculpt_flags(byte & 0x40 != 0, byte & 0x80 != 0);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::types::Ugi;
    use crate::update::UpdateQueue;

    fn linked_pair() -> (Arc<ObjectGroup>, Arc<ObjectPart>, Arc<ObjectPart>) {
        let root = ObjectPart::new(Uuid::from_u128(1));
        root.set_global_position(Vec3::new(100.0, 50.0, 20.0));
        let group = ObjectGroup::new(Arc::clone(&root));
        let child = ObjectPart::new(Uuid::from_u128(2));
        child.set_global_position(Vec3::new(101.0, 50.0, 20.0));
        group.link(Arc::clone(&child));
        (group, root, child)
    }

    #[test]
    fn test_child_position_is_root_relative() {
        let (_group, root, child) = linked_pair();
        assert_eq!(child.position(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(child.local_position(), child.position());

        child.set_position(Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(
            child.global_position(),
            root.global_position() + Vec3::new(2.0, 0.0, 0.0)
        );
        // The root reports its global position.
        assert_eq!(root.position(), root.global_position());
    }

    #[test]
    fn test_child_position_follows_root_rotation() {
        let (_group, root, child) = linked_pair();
        root.set_global_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        child.set_position(Vec3::new(1.0, 0.0, 0.0));
        // A quarter turn about z maps +x onto +y.
        let offset = child.global_position() - root.global_position();
        assert!((offset - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        assert!((child.position() - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);

        child.set_rotation(Quat::IDENTITY);
        assert!(child.rotation().dot(Quat::IDENTITY).abs() > 1.0 - 1e-6);
        assert!(child.global_rotation().dot(root.global_rotation()).abs() > 1.0 - 1e-6);
    }

    #[test]
    fn test_detached_part_is_not_scheduled() {
        let part = ObjectPart::new(Uuid::from_u128(5));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        part.on_update().add(Arc::new(move |_: &ObjectPart, _: ChangedFlags| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let before = part.update_info().serial_number();
        part.set_size(Vec3::ONE);
        part.set_name(None, "loose");
        part.set_shape(PrimitiveShape::of_type(PrimitiveShapeType::Torus));

        // Serials move, nothing else happens.
        assert_eq!(part.update_info().serial_number(), before + 3);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(part.group().is_none());
    }

    #[test]
    fn test_every_write_notifies_once() {
        let (group, root, _child) = linked_pair();
        let queue = Arc::new(UpdateQueue::new());
        group.set_scheduler(Some(queue.clone()));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        root.on_update().add(Arc::new(move |_: &ObjectPart, _: ChangedFlags| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let before = root.update_info().serial_number();
        root.set_size(Vec3::ONE);
        // Same value again: still a full notification.
        root.set_size(Vec3::ONE);
        assert_eq!(root.update_info().serial_number(), before + 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(queue.len(), 1);
        assert!(root.changed_flags().contains(ChangedFlags::SCALE));
    }

    #[test]
    fn test_panicking_observer_is_isolated() {
        let (group, root, _child) = linked_pair();
        let queue = Arc::new(UpdateQueue::new());
        group.set_scheduler(Some(queue.clone()));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        root.on_update().add(Arc::new(|_: &ObjectPart, _: ChangedFlags| panic!("bad observer")));
        root.on_update().add(Arc::new(move |_: &ObjectPart, _: ChangedFlags| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        root.set_click_action(ClickAction::Sit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_size_is_clamped() {
        let part = ObjectPart::new(Uuid::from_u128(6));
        part.set_size(Vec3::new(0.0, 100.0, 3.0));
        assert_eq!(part.size(), Vec3::new(MIN_PART_SIZE, MAX_PART_SIZE, 3.0));
    }

    #[test]
    fn test_material_overwrites_coefficients() {
        let part = ObjectPart::new(Uuid::from_u128(7));
        part.set_friction(0.05);
        part.set_restitution(0.99);
        part.set_material(PrimitiveMaterial::Rubber);
        // Custom coefficients are lost on every material change.
        let physics = part.physics_material();
        assert_eq!((physics.friction, physics.restitution), (0.9, 0.9));
        assert_eq!(physics.density, 1000.0);
    }

    #[test]
    fn test_owner_comes_from_group() {
        let (group, _root, child) = linked_pair();
        let owner = Ugui::new(Uuid::from_u128(40), "Owner");
        group.set_owner(owner.clone());
        group.set_group(Ugi::new(Uuid::from_u128(41), "Builders"));
        assert_eq!(child.owner(), owner);
        assert!(ObjectPart::new(Uuid::from_u128(8)).owner().is_unknown());
    }

    #[test]
    fn test_localized_name_fallback() {
        let part = ObjectPart::new(Uuid::from_u128(9));
        part.set_name(None, "Lamp");
        part.set_name(Some("de"), "Lampe");
        assert_eq!(part.name(Some("de")), "Lampe");
        assert_eq!(part.name(Some("fr")), "Lamp");

        part.set_name(Some("*"), "Light");
        assert_eq!(part.name(None), "Light");
        assert_eq!(part.name(Some("de")), "Light");
        assert!(part.remove_localization("de"));
        assert!(!part.has_localization("de"));
    }

    #[test]
    fn test_cylinder_to_mesh_sculpt() {
        let part = ObjectPart::with_shape(
            Uuid::from_u128(10),
            PrimitiveShape::of_type(PrimitiveShapeType::Cylinder),
        );
        assert_eq!(part.shape_type(), PrimitiveShapeType::Cylinder);
        part.update_shape(ChangedFlags::SHAPE, |s| {
            s.set_sculpt_kind(primshape::SculptType::Mesh);
            s.sculpt_map = Uuid::from_u128(0xfeed);
        });
        assert_eq!(part.shape_type(), PrimitiveShapeType::Sculpt);
    }

    #[test]
    fn test_inventory_flags() {
        let part = ObjectPart::new(Uuid::from_u128(11));
        assert!(part.flags().contains(PrimitiveFlags::INVENTORY_EMPTY));
        let script = ObjectPartInventoryItem::new(Uuid::from_u128(12), "main", InventoryType::Script);
        part.add_inventory_item(script);
        assert!(!part.flags().contains(PrimitiveFlags::INVENTORY_EMPTY));
        assert!(part.flags().contains(PrimitiveFlags::SCRIPTED));
        assert!(part.changed_flags().contains(ChangedFlags::INVENTORY));

        part.remove_inventory_item(Uuid::from_u128(12));
        assert!(part.flags().contains(PrimitiveFlags::INVENTORY_EMPTY));
        assert!(!part.flags().contains(PrimitiveFlags::SCRIPTED));
    }

    #[test]
    fn test_flexible_bends_straight_path() {
        let part = ObjectPart::new(Uuid::from_u128(13));
        part.set_flexible(Some(FlexibleParams::default()));
        assert_eq!(part.shape().path(), Some(PathCurve::Flexible));
        assert!(part.extra_params().flexible.is_some());
        part.set_flexible(None);
        assert_eq!(part.shape().path(), Some(PathCurve::Straight));
    }

    #[test]
    fn test_flexible_box_keeps_its_faces() {
        let part = ObjectPart::with_shape(
            Uuid::from_u128(14),
            PrimitiveShape::of_type(PrimitiveShapeType::Box),
        );
        part.set_flexible(Some(FlexibleParams::default()));
        assert_eq!(part.shape().path(), Some(PathCurve::Flexible));
        assert_eq!(part.shape_type(), PrimitiveShapeType::Box);
        assert_eq!(part.number_of_sides(), 6);
    }
}
