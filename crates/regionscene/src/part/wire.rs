//! Viewer object update blocks.
//!
//! All multi-byte values are little-endian. Variable fields carry a one- or
//! two-byte length prefix; strings are NUL terminated inside that length.

use std::sync::Arc;

use glam::{Quat, Vec3};
use primshape::PrimitiveShape;
use uuid::Uuid;

use super::ObjectPart;
use crate::localization::{LocalizedView, UpdateKind};

/// Object code of a primitive.
const PCODE_PRIMITIVE: u8 = 9;

/// Length of the position/velocity/acceleration/rotation/spin block.
pub const OBJECT_DATA_LEN: usize = 60;
/// Length of the terse update data block.
pub const TERSE_DATA_LEN: usize = 44;

const COMPRESSED_HAS_TEXT: u32 = 0x04;
const COMPRESSED_HAS_PARTICLES: u32 = 0x08;
const COMPRESSED_HAS_SOUND: u32 = 0x10;
const COMPRESSED_HAS_PARENT: u32 = 0x20;
const COMPRESSED_TEXTURE_ANIM: u32 = 0x40;
const COMPRESSED_HAS_ANGULAR_VELOCITY: u32 = 0x80;
const COMPRESSED_MEDIA_URL: u32 = 0x200;

#[derive(Default)]
struct Packer(Vec<u8>);

impl Packer {
    fn u8(&mut self, v: u8) {
        self.0.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn vec3(&mut self, v: Vec3) {
        self.f32(v.x);
        self.f32(v.y);
        self.f32(v.z);
    }

    /// Rotations travel as the normalized x, y, z with w implied.
    fn quat(&mut self, q: Quat) {
        let q = normalized_positive_w(q);
        self.vec3(Vec3::new(q.x, q.y, q.z));
    }

    fn uuid(&mut self, id: Uuid) {
        self.0.extend_from_slice(id.as_bytes());
    }

    fn bytes(&mut self, data: &[u8]) {
        self.0.extend_from_slice(data);
    }

    fn var1(&mut self, data: &[u8]) {
        let len = data.len().min(usize::from(u8::MAX));
        self.u8(u8::try_from(len).unwrap_or(u8::MAX));
        self.bytes(&data[..len]);
    }

    fn var2(&mut self, data: &[u8]) {
        let len = data.len().min(usize::from(u16::MAX));
        self.u16(u16::try_from(len).unwrap_or(u16::MAX));
        self.bytes(&data[..len]);
    }

    /// NUL-terminated string in a one-byte length field. Empty strings are
    /// sent as a zero length.
    fn string1(&mut self, text: &str) {
        if text.is_empty() {
            self.u8(0);
            return;
        }
        let mut data = truncate_utf8(text, usize::from(u8::MAX) - 1).as_bytes().to_vec();
        data.push(0);
        self.var1(&data);
    }

    /// NUL-terminated string without a length prefix.
    fn cstring(&mut self, text: &str) {
        self.bytes(text.as_bytes());
        self.u8(0);
    }

    fn shape(&mut self, shape: &PrimitiveShape) {
        self.u8(shape.path_curve);
        self.u8(shape.profile_curve);
        self.u16(shape.path_begin);
        self.u16(shape.path_end);
        self.u8(shape.path_scale_x);
        self.u8(shape.path_scale_y);
        self.u8(shape.path_shear_x);
        self.u8(shape.path_shear_y);
        self.bytes(&shape.path_twist.to_le_bytes());
        self.bytes(&shape.path_twist_begin.to_le_bytes());
        self.bytes(&shape.path_radius_offset.to_le_bytes());
        self.bytes(&shape.path_taper_x.to_le_bytes());
        self.bytes(&shape.path_taper_y.to_le_bytes());
        self.u8(shape.path_revolutions);
        self.bytes(&shape.path_skew.to_le_bytes());
        self.u16(shape.profile_begin);
        self.u16(shape.profile_end);
        self.u16(shape.profile_hollow);
    }
}

fn truncate_utf8(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn normalized_positive_w(q: Quat) -> Quat {
    let q = q.normalize();
    if q.w < 0.0 { -q } else { q }
}

/// Quantize `value` from `lower..=upper` onto the full `u16` range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn float_to_u16(value: f32, lower: f32, upper: f32) -> u16 {
    let value = value.clamp(lower, upper);
    ((value - lower) / (upper - lower) * f32::from(u16::MAX)).round() as u16
}

#[must_use]
pub fn u16_to_float(value: u16, lower: f32, upper: f32) -> f32 {
    f32::from(value) / f32::from(u16::MAX) * (upper - lower) + lower
}

/// Text colour as four bytes, alpha inverted.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn text_color_bytes(color: Vec3, alpha: f32) -> [u8; 4] {
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [byte(color.x), byte(color.y), byte(color.z), 255 - byte(alpha)]
}

struct Snapshot {
    local_id: u32,
    parent_id: u32,
    owner_id: Uuid,
    shape: PrimitiveShape,
    position: Vec3,
    rotation: Quat,
    velocity: Vec3,
    acceleration: Vec3,
    angular_velocity: Vec3,
    size: Vec3,
    material: u8,
    click_action: u8,
    flags: u32,
    extra_params: Vec<u8>,
}

impl ObjectPart {
    /// The cached buffer of `kind` for `culture`, rebuilt when `serial` moved.
    pub(crate) fn cached_update(
        &self,
        kind: UpdateKind,
        culture: Option<&str>,
        serial: u32,
        local_id: u32,
    ) -> Arc<Vec<u8>> {
        let localizations = self.localizations.read();
        let view = localizations.view(culture);
        localizations
            .resolve(culture)
            .cache()
            .get_or_build(kind, serial, || {
                let snapshot = self.snapshot(local_id);
                match kind {
                    UpdateKind::Full => encode_full(self, &snapshot, view, serial),
                    UpdateKind::Terse => encode_terse(&snapshot, view),
                    UpdateKind::Compressed => encode_compressed(self, &snapshot, view, serial),
                    UpdateKind::Properties => encode_properties(self, &snapshot, view),
                }
            })
    }

    fn snapshot(&self, local_id: u32) -> Snapshot {
        let group = self.group();
        let parent_id = self
            .root_if_child()
            .map_or(0, |root| root.local_id());
        let owner_id = group.as_ref().map_or(Uuid::nil(), |g| g.owner().id);
        // Children travel with root-relative transforms.
        let position = self.position();
        let rotation = self.rotation();
        let extra_params = self.extra_params().to_bytes();
        let shape = self.shape();
        self.read(|s| Snapshot {
            local_id,
            parent_id,
            owner_id,
            shape,
            position,
            rotation,
            velocity: s.velocity,
            acceleration: s.acceleration,
            angular_velocity: s.angular_velocity,
            size: s.size,
            material: s.material as u8,
            click_action: s.click_action as u8,
            flags: s.flags.bits(),
            extra_params,
        })
    }
}

fn object_data(snapshot: &Snapshot) -> [u8; OBJECT_DATA_LEN] {
    let mut packer = Packer::default();
    packer.vec3(snapshot.position);
    packer.vec3(snapshot.velocity);
    packer.vec3(snapshot.acceleration);
    packer.quat(snapshot.rotation);
    packer.vec3(snapshot.angular_velocity);
    let mut out = [0u8; OBJECT_DATA_LEN];
    out.copy_from_slice(&packer.0);
    out
}

fn encode_full(part: &ObjectPart, s: &Snapshot, view: LocalizedView<'_>, serial: u32) -> Vec<u8> {
    let mut p = Packer::default();
    p.u32(s.local_id);
    p.u8(s.shape.state);
    p.uuid(part.id());
    p.u32(serial);
    p.u8(PCODE_PRIMITIVE);
    p.u8(s.material);
    p.u8(s.click_action);
    p.vec3(s.size);
    p.var1(&object_data(s));
    p.u32(s.parent_id);
    p.u32(s.flags);
    p.shape(&s.shape);
    p.var2(&view.texture_entry().to_bytes());
    let animation = view.texture_animation();
    if animation.is_running() {
        p.var1(&animation.to_bytes());
    } else {
        p.u8(0);
    }
    // Name values and generic data are not carried.
    p.var2(&[]);
    p.var2(&[]);
    let text = view.text();
    p.string1(&text.text);
    p.bytes(&text_color_bytes(text.color, text.alpha));
    p.string1(&view.media_url());
    p.var1(&view.particle_system());
    p.var1(&s.extra_params);
    let sound = view.sound();
    p.uuid(sound.sound_id);
    p.uuid(s.owner_id);
    p.f32(sound.gain);
    p.u8(sound.flags);
    p.f32(sound.radius);
    // Joint type, pivot and axis.
    p.u8(0);
    p.vec3(Vec3::ZERO);
    p.vec3(Vec3::ZERO);
    p.0
}

fn encode_terse(s: &Snapshot, view: LocalizedView<'_>) -> Vec<u8> {
    let mut data = Packer::default();
    data.u32(s.local_id);
    data.u8(s.shape.state);
    // Not an avatar, so no collision plane follows.
    data.u8(0);
    data.vec3(s.position);
    for v in s.velocity.to_array() {
        data.u16(float_to_u16(v, -128.0, 128.0));
    }
    for v in s.acceleration.to_array() {
        data.u16(float_to_u16(v, -64.0, 64.0));
    }
    for v in normalized_positive_w(s.rotation).to_array() {
        data.u16(float_to_u16(v, -1.0, 1.0));
    }
    for v in s.angular_velocity.to_array() {
        data.u16(float_to_u16(v, -64.0, 64.0));
    }

    let mut p = Packer::default();
    p.var1(&data.0);
    p.var2(&view.texture_entry().to_bytes());
    p.0
}

fn encode_compressed(
    part: &ObjectPart,
    s: &Snapshot,
    view: LocalizedView<'_>,
    serial: u32,
) -> Vec<u8> {
    let text = view.text();
    let media_url = view.media_url();
    let particles = view.particle_system();
    let sound = view.sound();
    let animation = view.texture_animation();

    let mut flags = 0;
    if !text.text.is_empty() {
        flags |= COMPRESSED_HAS_TEXT;
    }
    if !particles.is_empty() {
        flags |= COMPRESSED_HAS_PARTICLES;
    }
    if !sound.sound_id.is_nil() {
        flags |= COMPRESSED_HAS_SOUND;
    }
    if s.parent_id != 0 {
        flags |= COMPRESSED_HAS_PARENT;
    }
    if animation.is_running() {
        flags |= COMPRESSED_TEXTURE_ANIM;
    }
    if s.angular_velocity != Vec3::ZERO {
        flags |= COMPRESSED_HAS_ANGULAR_VELOCITY;
    }
    if !media_url.is_empty() {
        flags |= COMPRESSED_MEDIA_URL;
    }

    let mut p = Packer::default();
    p.uuid(part.id());
    p.u32(s.local_id);
    p.u8(PCODE_PRIMITIVE);
    p.u8(s.shape.state);
    p.u32(serial);
    p.u8(s.material);
    p.u8(s.click_action);
    p.vec3(s.size);
    p.vec3(s.position);
    p.quat(s.rotation);
    p.u32(flags);
    p.uuid(s.owner_id);
    if flags & COMPRESSED_HAS_ANGULAR_VELOCITY != 0 {
        p.vec3(s.angular_velocity);
    }
    if flags & COMPRESSED_HAS_PARENT != 0 {
        p.u32(s.parent_id);
    }
    if flags & COMPRESSED_HAS_TEXT != 0 {
        p.cstring(&text.text);
        p.bytes(&text_color_bytes(text.color, text.alpha));
    }
    if flags & COMPRESSED_MEDIA_URL != 0 {
        p.cstring(&media_url);
    }
    if flags & COMPRESSED_HAS_PARTICLES != 0 {
        p.bytes(&particles);
    }
    p.bytes(&s.extra_params);
    if flags & COMPRESSED_HAS_SOUND != 0 {
        p.uuid(sound.sound_id);
        p.f32(sound.gain);
        p.u8(sound.flags);
        p.f32(sound.radius);
    }
    p.shape(&s.shape);
    let entry = view.texture_entry().to_bytes();
    p.u32(u32::try_from(entry.len()).unwrap_or(u32::MAX));
    p.bytes(&entry);
    if flags & COMPRESSED_TEXTURE_ANIM != 0 {
        let bytes = animation.to_bytes();
        p.u32(u32::try_from(bytes.len()).unwrap_or(u32::MAX));
        p.bytes(&bytes);
    }
    p.0
}

fn encode_properties(part: &ObjectPart, s: &Snapshot, view: LocalizedView<'_>) -> Vec<u8> {
    let group_state = part.group().map(|g| g.state()).unwrap_or_default();
    let permissions = part.permissions();

    let mut p = Packer::default();
    p.uuid(part.id());
    p.uuid(part.creator().id);
    p.uuid(s.owner_id);
    p.uuid(group_state.group.id);
    p.0.extend_from_slice(&(u64::from(part.creation_date()) * 1_000_000).to_le_bytes());
    p.u32(permissions.base.bits());
    p.u32(permissions.owner.bits());
    p.u32(permissions.group.bits());
    p.u32(permissions.everyone.bits());
    p.u32(permissions.next_owner.bits());
    // Ownership cost.
    p.i32(0);
    p.u8(group_state.sale_type as u8);
    p.i32(group_state.sale_price);
    // Aggregate permission bytes.
    p.bytes(&[0, 0, 0]);
    p.u32(group_state.category);
    p.u16(u16::try_from(part.inventory().serial() & 0xffff).unwrap_or_default());
    p.uuid(group_state.from_item_id);
    // Folder id.
    p.uuid(Uuid::nil());
    // From task id.
    p.uuid(Uuid::nil());
    p.uuid(group_state.last_owner.id);
    p.string1(&view.name());
    p.string1(&view.description());
    p.string1(&view.touch_text());
    p.string1(&view.sit_text());
    // Texture id list.
    p.u8(0);
    p.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::ObjectGroup;

    #[test]
    fn test_quantize_range() {
        assert_eq!(float_to_u16(-1.0, -1.0, 1.0), 0);
        assert_eq!(float_to_u16(1.0, -1.0, 1.0), u16::MAX);
        // Out-of-range values clamp.
        assert_eq!(float_to_u16(500.0, -128.0, 128.0), u16::MAX);
        let back = u16_to_float(float_to_u16(0.25, -1.0, 1.0), -1.0, 1.0);
        assert!((back - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_terse_block_layout() {
        let part = ObjectPart::new(Uuid::from_u128(1));
        part.update_info().set_local_id(77);
        part.set_global_position(Vec3::new(1.0, 2.0, 3.0));
        let buffer = part.update_info().terse_update(None).unwrap();

        assert_eq!(usize::from(buffer[0]), TERSE_DATA_LEN);
        assert_eq!(&buffer[1..5], &77u32.to_le_bytes());
        assert_eq!(&buffer[7..11], &1.0f32.to_le_bytes());
        // The texture entry follows with a two-byte length.
        let te_len = u16::from_le_bytes([buffer[45], buffer[46]]);
        assert_eq!(buffer.len(), 47 + usize::from(te_len));
    }

    #[test]
    fn test_buffers_are_cached_per_serial() {
        let part = ObjectPart::new(Uuid::from_u128(1));
        let info = part.update_info();
        let a = info.full_update(None).unwrap();
        let b = info.full_update(None).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        part.set_name(None, "changed");
        let c = info.full_update(None).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_properties_are_localized() {
        let part = ObjectPart::new(Uuid::from_u128(1));
        part.set_name(None, "Chair");
        part.set_name(Some("de"), "Stuhl");
        let info = part.update_info();
        let english = info.properties_update(None).unwrap();
        let german = info.properties_update(Some("de")).unwrap();
        let contains = |haystack: &[u8], needle: &[u8]| {
            haystack.windows(needle.len()).any(|w| w == needle)
        };
        assert!(contains(&english, b"Chair\0"));
        assert!(contains(&german, b"Stuhl\0"));
        assert!(!contains(&german, b"Chair\0"));
    }

    #[test]
    fn test_child_buffers_follow_root() {
        let root = ObjectPart::new(Uuid::from_u128(1));
        let group = ObjectGroup::new(Arc::clone(&root));
        let child = ObjectPart::new(Uuid::from_u128(2));
        group.link(Arc::clone(&child));
        child.set_position(Vec3::new(1.0, 0.0, 0.0));
        let info = child.update_info();
        let before = info.terse_update(None).unwrap();

        // The child keeps its global position, so its root offset changes.
        root.set_global_position(Vec3::new(-4.0, 0.0, 0.0));
        let moved = info.terse_update(None).unwrap();
        assert_ne!(before, moved);
        assert_eq!(&moved[7..11], &5.0f32.to_le_bytes());

        root.set_global_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let turned = info.terse_update(None).unwrap();
        assert_ne!(moved, turned);

        let full = info.full_update(None).unwrap();
        root.update_info().set_local_id(42);
        let renumbered = info.full_update(None).unwrap();
        assert!(!Arc::ptr_eq(&full, &renumbered));
        assert!(renumbered.windows(4).any(|w| w == 42u32.to_le_bytes()));
    }

    #[test]
    fn test_compressed_parent_flag() {
        let root = ObjectPart::new(Uuid::from_u128(1));
        let group = ObjectGroup::new(Arc::clone(&root));
        root.update_info().set_local_id(10);
        let child = ObjectPart::new(Uuid::from_u128(2));
        group.link(Arc::clone(&child));
        child.update_info().set_local_id(11);

        let buffer = child.update_info().compressed_update(None).unwrap();
        // Flags sit after id, local id, pcode, state, crc, material, click
        // action, scale, position and rotation.
        let offset = 16 + 4 + 1 + 1 + 4 + 1 + 1 + 12 + 12 + 12;
        let flags = u32::from_le_bytes(buffer[offset..offset + 4].try_into().unwrap());
        assert_ne!(flags & COMPRESSED_HAS_PARENT, 0);
        let parent_offset = offset + 4 + 16;
        assert_eq!(&buffer[parent_offset..parent_offset + 4], &10u32.to_le_bytes());
    }
}
