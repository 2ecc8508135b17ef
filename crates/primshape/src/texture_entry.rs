//! Per-face texture parameters and their packed binary form.
//!
//! # Format
//!
//! The blob is a sequence of fields, each written as:
//!
//! - the default value for every face
//! - zero or more `(face bits, value)` overrides, where face bits is a
//!   bitfield of face indices written as big-endian 7-bit groups with the
//!   high bit marking continuation
//! - a single zero byte terminating the field
//!
//! Fields in order: texture id (16), colour (4, inverted bytes), repeat u
//! (f32), repeat v (f32), offset u (i16), offset v (i16), rotation (i16),
//! material (bump | fullbright | shiny), media (media flag | texgen),
//! glow (u8), material id (16, optional).

use crate::error::{ShapeError, ShapeResult};
use glam::Vec4;
use std::f32::consts::TAU;
use uuid::Uuid;

/// Number of faces a texture entry can address.
pub const MAX_FACES: usize = 32;

/// Side index meaning "every face".
pub const ALL_SIDES: i32 = -1;

/// Plywood, the texture new prims start with.
pub const DEFAULT_TEXTURE: Uuid = Uuid::from_u128(0x8955_6747_24cb_43ed_920b_47ca_ed15_465f);

const BUMP_MASK: u8 = 0x1f;
const FULLBRIGHT_MASK: u8 = 0x20;
const SHINY_SHIFT: u8 = 6;
const MEDIA_MASK: u8 = 0x01;
const TEXGEN_SHIFT: u8 = 1;
const TEXGEN_MASK: u8 = 0x06;

/// Texture parameters of one face.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureEntryFace {
    pub texture_id: Uuid,
    /// RGBA, each component in `0..=1`.
    pub color: Vec4,
    pub repeat_u: f32,
    pub repeat_v: f32,
    pub offset_u: f32,
    pub offset_v: f32,
    /// Radians.
    pub rotation: f32,
    pub bump: u8,
    pub shiny: u8,
    pub fullbright: bool,
    pub media: bool,
    /// 0 for default mapping, 1 for planar.
    pub texgen: u8,
    pub glow: f32,
    pub material_id: Uuid,
}

impl TextureEntryFace {
    #[must_use]
    pub fn new(texture_id: Uuid) -> Self {
        Self {
            texture_id,
            color: Vec4::ONE,
            repeat_u: 1.0,
            repeat_v: 1.0,
            offset_u: 0.0,
            offset_v: 0.0,
            rotation: 0.0,
            bump: 0,
            shiny: 0,
            fullbright: false,
            media: false,
            texgen: 0,
            glow: 0.0,
            material_id: Uuid::nil(),
        }
    }

    fn material_byte(&self) -> u8 {
        (self.bump & BUMP_MASK)
            | if self.fullbright { FULLBRIGHT_MASK } else { 0 }
            | ((self.shiny & 0x03) << SHINY_SHIFT)
    }

    fn set_material_byte(&mut self, v: u8) {
        self.bump = v & BUMP_MASK;
        self.fullbright = v & FULLBRIGHT_MASK != 0;
        self.shiny = v >> SHINY_SHIFT;
    }

    fn media_byte(&self) -> u8 {
        u8::from(self.media) | ((self.texgen << TEXGEN_SHIFT) & TEXGEN_MASK)
    }

    fn set_media_byte(&mut self, v: u8) {
        self.media = v & MEDIA_MASK != 0;
        self.texgen = (v & TEXGEN_MASK) >> TEXGEN_SHIFT;
    }
}

impl Default for TextureEntryFace {
    fn default() -> Self {
        Self::new(DEFAULT_TEXTURE)
    }
}

/// Default face plus sparse per-face overrides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextureEntry {
    default_face: TextureEntryFace,
    faces: [Option<TextureEntryFace>; MAX_FACES],
}

impl TextureEntry {
    #[must_use]
    pub fn new(default_texture: Uuid) -> Self {
        Self {
            default_face: TextureEntryFace::new(default_texture),
            faces: Default::default(),
        }
    }

    #[must_use]
    pub fn default_face(&self) -> &TextureEntryFace {
        &self.default_face
    }

    pub fn default_face_mut(&mut self) -> &mut TextureEntryFace {
        &mut self.default_face
    }

    /// Effective parameters of a face, falling back to the default face.
    #[must_use]
    pub fn face(&self, index: usize) -> &TextureEntryFace {
        self.faces
            .get(index)
            .and_then(Option::as_ref)
            .unwrap_or(&self.default_face)
    }

    /// Mutable access to a face, creating an override from the default.
    pub fn face_mut(&mut self, index: usize) -> ShapeResult<&mut TextureEntryFace> {
        let default = &self.default_face;
        let slot = self.faces.get_mut(index).ok_or(ShapeError::OutOfRange {
            context: "texture entry face",
            value: index as i64,
        })?;
        Ok(slot.get_or_insert_with(|| default.clone()))
    }

    /// Apply `f` to one side, or to the default and every override for
    /// [`ALL_SIDES`].
    pub fn update_side(
        &mut self,
        side: i32,
        mut f: impl FnMut(&mut TextureEntryFace),
    ) -> ShapeResult<()> {
        if side == ALL_SIDES {
            f(&mut self.default_face);
            for face in self.faces.iter_mut().flatten() {
                f(face);
            }
            return Ok(());
        }
        let index = usize::try_from(side).map_err(|_| ShapeError::OutOfRange {
            context: "texture entry face",
            value: i64::from(side),
        })?;
        f(self.face_mut(index)?);
        Ok(())
    }

    /// Encode to the packed binary form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_field(&mut out, |f, o| o.extend_from_slice(f.texture_id.as_bytes()));
        self.write_field(&mut out, |f, o| {
            for c in f.color.to_array() {
                o.push(255 - float_to_byte(c));
            }
        });
        self.write_field(&mut out, |f, o| o.extend_from_slice(&f.repeat_u.to_le_bytes()));
        self.write_field(&mut out, |f, o| o.extend_from_slice(&f.repeat_v.to_le_bytes()));
        self.write_field(&mut out, |f, o| {
            o.extend_from_slice(&offset_to_i16(f.offset_u).to_le_bytes());
        });
        self.write_field(&mut out, |f, o| {
            o.extend_from_slice(&offset_to_i16(f.offset_v).to_le_bytes());
        });
        self.write_field(&mut out, |f, o| {
            o.extend_from_slice(&rotation_to_i16(f.rotation).to_le_bytes());
        });
        self.write_field(&mut out, |f, o| o.push(f.material_byte()));
        self.write_field(&mut out, |f, o| o.push(f.media_byte()));
        self.write_field(&mut out, |f, o| o.push(float_to_byte(f.glow)));
        self.write_field(&mut out, |f, o| o.extend_from_slice(f.material_id.as_bytes()));
        out
    }

    fn write_field(&self, out: &mut Vec<u8>, encode: impl Fn(&TextureEntryFace, &mut Vec<u8>)) {
        let mut default = Vec::new();
        encode(&self.default_face, &mut default);
        out.extend_from_slice(&default);

        // Overrides sharing a value share one bitfield.
        let mut groups: Vec<(u32, Vec<u8>)> = Vec::new();
        for (index, face) in self.faces.iter().enumerate() {
            let Some(face) = face else { continue };
            let mut value = Vec::new();
            encode(face, &mut value);
            if value == default {
                continue;
            }
            match groups.iter_mut().find(|(_, v)| *v == value) {
                Some((bits, _)) => *bits |= 1 << index,
                None => groups.push((1 << index, value)),
            }
        }
        for (bits, value) in groups {
            write_face_bits(out, bits);
            out.extend_from_slice(&value);
        }
        out.push(0);
    }

    /// Decode the packed binary form. An empty blob is the default entry.
    ///
    /// The trailing material id field may be absent.
    pub fn from_bytes(data: &[u8]) -> ShapeResult<Self> {
        if data.is_empty() {
            return Ok(Self::default());
        }
        let mut decoder = Decoder {
            data,
            offset: 0,
            default_face: TextureEntryFace::default(),
            slots: std::array::from_fn(|_| TextureEntryFace::default()),
            present: 0,
        };

        decoder.field(16, |f, b| f.texture_id = uuid_from(b))?;
        decoder.field(4, |f, b| {
            f.color = Vec4::new(
                byte_to_float(255 - b[0]),
                byte_to_float(255 - b[1]),
                byte_to_float(255 - b[2]),
                byte_to_float(255 - b[3]),
            );
        })?;
        decoder.field(4, |f, b| f.repeat_u = f32::from_le_bytes([b[0], b[1], b[2], b[3]]))?;
        decoder.field(4, |f, b| f.repeat_v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]))?;
        decoder.field(2, |f, b| {
            f.offset_u = f32::from(i16::from_le_bytes([b[0], b[1]])) / 32767.0;
        })?;
        decoder.field(2, |f, b| {
            f.offset_v = f32::from(i16::from_le_bytes([b[0], b[1]])) / 32767.0;
        })?;
        decoder.field(2, |f, b| {
            f.rotation = f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0 * TAU;
        })?;
        decoder.field(1, |f, b| f.set_material_byte(b[0]))?;
        decoder.field(1, |f, b| f.set_media_byte(b[0]))?;
        decoder.field(1, |f, b| f.glow = byte_to_float(b[0]))?;
        if decoder.offset < data.len() {
            decoder.field(16, |f, b| f.material_id = uuid_from(b))?;
        }

        let Decoder {
            default_face,
            slots,
            present,
            ..
        } = decoder;
        let mut faces: [Option<TextureEntryFace>; MAX_FACES] = Default::default();
        for (index, slot) in slots.into_iter().enumerate() {
            if present & (1 << index) != 0 {
                faces[index] = Some(slot);
            }
        }
        Ok(Self {
            default_face,
            faces,
        })
    }
}

struct Decoder<'a> {
    data: &'a [u8],
    offset: usize,
    default_face: TextureEntryFace,
    slots: [TextureEntryFace; MAX_FACES],
    present: u32,
}

impl Decoder<'_> {
    fn take(&mut self, len: usize) -> ShapeResult<&[u8]> {
        let end = self.offset + len;
        let bytes = self
            .data
            .get(self.offset..end)
            .ok_or_else(|| ShapeError::InvalidFormat {
                context: "texture entry",
                detail: format!("truncated at byte {}", self.offset),
            })?;
        self.offset = end;
        Ok(bytes)
    }

    fn read_face_bits(&mut self) -> ShapeResult<u32> {
        let mut bits = 0u32;
        loop {
            let b = self.take(1)?[0];
            bits = (bits << 7) | u32::from(b & 0x7f);
            if b & 0x80 == 0 {
                return Ok(bits);
            }
        }
    }

    /// Decode one field: the default applies to every slot, then overrides
    /// apply to the faces in their bitfield.
    fn field(&mut self, len: usize, set: impl Fn(&mut TextureEntryFace, &[u8])) -> ShapeResult<()> {
        let value = self.take(len)?.to_vec();
        set(&mut self.default_face, &value);
        for slot in &mut self.slots {
            set(slot, &value);
        }

        loop {
            let bits = self.read_face_bits()?;
            if bits == 0 {
                return Ok(());
            }
            let value = self.take(len)?.to_vec();
            for (index, slot) in self.slots.iter_mut().enumerate() {
                if bits & (1 << index) != 0 {
                    set(slot, &value);
                }
            }
            self.present |= bits;
        }
    }
}

fn write_face_bits(out: &mut Vec<u8>, bits: u32) {
    let mut groups = Vec::new();
    let mut rest = bits;
    loop {
        groups.push((rest & 0x7f) as u8);
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    let last = groups.len() - 1;
    for (i, group) in groups.into_iter().rev().enumerate() {
        out.push(if i == last { group } else { group | 0x80 });
    }
}

fn uuid_from(bytes: &[u8]) -> Uuid {
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&bytes[..16]);
    Uuid::from_bytes(raw)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn byte_to_float(v: u8) -> f32 {
    f32::from(v) / 255.0
}

#[allow(clippy::cast_possible_truncation)]
fn offset_to_i16(v: f32) -> i16 {
    (v.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

#[allow(clippy::cast_possible_truncation)]
fn rotation_to_i16(v: f32) -> i16 {
    ((v.rem_euclid(TAU) / TAU * 32768.0).round() as i32 % 32768) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_entry_layout() {
        let te = TextureEntry::default();
        let bytes = te.to_bytes();
        // 16+4+4+4+2+2+2+1+1+1+16 value bytes plus one terminator per field.
        assert_eq!(bytes.len(), 53 + 11);
        assert_eq!(&bytes[0..16], DEFAULT_TEXTURE.as_bytes());
        assert_eq!(bytes[16], 0);
        // White is stored inverted as zeros.
        assert_eq!(&bytes[17..21], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_face_bits_encoding() {
        let mut out = Vec::new();
        write_face_bits(&mut out, 1 << 3);
        assert_eq!(out, vec![0x08]);

        out.clear();
        write_face_bits(&mut out, 1 << 8);
        // 256 = 0b10_0000000: high group 2 with continuation, then 0.
        assert_eq!(out, vec![0x82, 0x00]);
    }

    #[test]
    fn test_override_round_trip() {
        let mut te = TextureEntry::new(Uuid::from_u128(1));
        te.face_mut(2).unwrap().texture_id = Uuid::from_u128(2);
        te.face_mut(5).unwrap().texture_id = Uuid::from_u128(2);
        te.face_mut(5).unwrap().glow = 1.0;
        te.face_mut(9).unwrap().fullbright = true;

        let decoded = TextureEntry::from_bytes(&te.to_bytes()).unwrap();
        assert_eq!(decoded.face(2).texture_id, Uuid::from_u128(2));
        assert_eq!(decoded.face(5).texture_id, Uuid::from_u128(2));
        assert!((decoded.face(5).glow - 1.0).abs() < 1e-6);
        assert!(decoded.face(9).fullbright);
        assert_eq!(decoded.face(9).texture_id, Uuid::from_u128(1));
        assert_eq!(decoded.face(0), decoded.default_face());
    }

    #[test]
    fn test_all_sides_updates_overrides() {
        let mut te = TextureEntry::default();
        te.face_mut(1).unwrap().shiny = 2;
        te.update_side(ALL_SIDES, |f| f.color = Vec4::new(1.0, 0.0, 0.0, 1.0))
            .unwrap();
        assert_eq!(te.face(1).color, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(te.face(1).shiny, 2);
        assert_eq!(te.face(7).color, Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_face_index_out_of_range() {
        let mut te = TextureEntry::default();
        assert!(te.face_mut(MAX_FACES).is_err());
        assert!(te.update_side(-2, |_| {}).is_err());
    }

    #[test]
    fn test_truncated_entry() {
        let bytes = TextureEntry::default().to_bytes();
        let result = TextureEntry::from_bytes(&bytes[..20]);
        assert!(matches!(result, Err(ShapeError::InvalidFormat { .. })));
    }

    fn face_strategy() -> impl Strategy<Value = (usize, u128, f32, f32, u8, bool)> {
        (
            0usize..MAX_FACES,
            any::<u128>(),
            0.0f32..1.0,
            -1.0f32..1.0,
            0u8..32,
            any::<bool>(),
        )
    }

    proptest! {
        #[test]
        fn test_texture_entry_round_trip(faces in proptest::collection::vec(face_strategy(), 0..8)) {
            let mut te = TextureEntry::default();
            for (index, texture, glow, offset, bump, fullbright) in faces {
                let face = te.face_mut(index).unwrap();
                face.texture_id = Uuid::from_u128(texture);
                face.glow = glow;
                face.offset_u = offset;
                face.bump = bump;
                face.fullbright = fullbright;
            }
            let bytes = te.to_bytes();
            let decoded = TextureEntry::from_bytes(&bytes).unwrap();
            prop_assert_eq!(decoded.to_bytes(), bytes);
        }
    }
}
