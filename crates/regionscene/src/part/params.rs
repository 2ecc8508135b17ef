//! Script parameter lists applied to and read from a part.
//!
//! Each entry starts with an integer code followed by a fixed sequence of
//! typed values. `PRIM_LANGUAGE` switches the culture used by the localized
//! entries that follow it in the same list.

use glam::{Quat, Vec3, Vec4};
use primshape::{
    ALL_SIDES, FlexibleParams, LightParams, ParamReader, ParamValue, PhysicsShapeType,
    ProjectorParams, TextureAnimation, TextureEntryFace, clamp_cut,
};
use uuid::Uuid;

use super::{ClickAction, ObjectPart, Omega, PrimitiveMaterial, SitTarget};
use crate::error::{Error, Result};
use crate::localization::{CultureSelector, LocalizedProperty, SoundParams, TextParams};
use crate::types::{ChangedFlags, PrimitiveFlags};

pub const PRIM_MATERIAL: i32 = 2;
pub const PRIM_PHYSICS: i32 = 3;
pub const PRIM_TEMP_ON_REZ: i32 = 4;
pub const PRIM_PHANTOM: i32 = 5;
pub const PRIM_POSITION: i32 = 6;
pub const PRIM_SIZE: i32 = 7;
pub const PRIM_ROTATION: i32 = 8;
pub const PRIM_TYPE: i32 = 9;
pub const PRIM_TEXTURE: i32 = 17;
pub const PRIM_COLOR: i32 = 18;
pub const PRIM_BUMP_SHINY: i32 = 19;
pub const PRIM_FULLBRIGHT: i32 = 20;
pub const PRIM_FLEXIBLE: i32 = 21;
pub const PRIM_TEXGEN: i32 = 22;
pub const PRIM_POINT_LIGHT: i32 = 23;
pub const PRIM_GLOW: i32 = 25;
pub const PRIM_TEXT: i32 = 26;
pub const PRIM_NAME: i32 = 27;
pub const PRIM_DESC: i32 = 28;
pub const PRIM_ROT_LOCAL: i32 = 29;
pub const PRIM_PHYSICS_SHAPE_TYPE: i32 = 30;
pub const PRIM_OMEGA: i32 = 32;
pub const PRIM_POS_LOCAL: i32 = 33;
pub const PRIM_SLICE: i32 = 35;
pub const PRIM_ALLOW_UNSIT: i32 = 39;
pub const PRIM_SCRIPTED_SIT_ONLY: i32 = 40;
pub const PRIM_SIT_TARGET: i32 = 41;
pub const PRIM_PROJECTOR: i32 = 42;
pub const PRIM_CLICK_ACTION: i32 = 43;

// Region-local extensions.
pub const PRIM_SOUND: i32 = 10_001;
pub const PRIM_TEXTURE_ANIM: i32 = 10_002;
pub const PRIM_LANGUAGE: i32 = 10_004;
pub const PRIM_REMOVE_LANGUAGE: i32 = 10_005;
pub const PRIM_REMOVE_ALL_LANGUAGES: i32 = 10_006;
pub const PRIM_SIT_TEXT: i32 = 10_007;
pub const PRIM_TOUCH_TEXT: i32 = 10_008;
pub const PRIM_PHYSICS_MATERIAL: i32 = 10_009;

pub const DENSITY: i32 = 1;
pub const FRICTION: i32 = 2;
pub const RESTITUTION: i32 = 4;
pub const GRAVITY_MULTIPLIER: i32 = 8;

/// Faces a face-addressed entry touches. Out-of-range faces touch nothing.
fn target_faces(side: i32, sides: i32) -> Vec<usize> {
    if side == ALL_SIDES {
        (0..usize::try_from(sides).unwrap_or(0)).collect()
    } else if (0..sides).contains(&side) {
        usize::try_from(side).into_iter().collect()
    } else {
        Vec::new()
    }
}

fn flag_value(part: &ObjectPart, flag: PrimitiveFlags) -> ParamValue {
    ParamValue::from(part.flags().contains(flag))
}

fn invalid(context: &'static str, detail: impl Into<String>) -> Error {
    Error::InvalidParameterValue {
        context,
        detail: detail.into(),
    }
}

impl ObjectPart {
    /// Append the values the entries in `reader` ask for to `out`.
    pub fn get_primitive_params(
        &self,
        reader: &mut ParamReader<'_>,
        out: &mut Vec<ParamValue>,
        culture: Option<&str>,
    ) -> Result<()> {
        let mut culture = culture.map(str::to_owned);
        while !reader.is_empty() {
            let code = reader.read_integer("parameter type")?;
            let culture_ref = culture.as_deref();
            match code {
                PRIM_NAME => out.push(self.name(culture_ref).into()),
                PRIM_DESC => out.push(self.description(culture_ref).into()),
                PRIM_SIT_TEXT => out.push(self.sit_text(culture_ref).into()),
                PRIM_TOUCH_TEXT => out.push(self.touch_text(culture_ref).into()),
                PRIM_TEXT => {
                    let text = self.text(culture_ref);
                    out.extend([
                        ParamValue::from(text.text),
                        text.color.into(),
                        text.alpha.into(),
                    ]);
                }
                PRIM_SOUND => {
                    let sound = self.sound(culture_ref);
                    out.extend([
                        ParamValue::from(sound.sound_id),
                        sound.gain.into(),
                        sound.radius.into(),
                        i32::from(sound.flags).into(),
                    ]);
                }
                PRIM_TYPE => out.extend(self.shape().to_primitive_params()),
                PRIM_MATERIAL => out.push(i32::from(self.material() as u8).into()),
                PRIM_PHYSICS => out.push(flag_value(self, PrimitiveFlags::PHYSICS)),
                PRIM_TEMP_ON_REZ => out.push(flag_value(self, PrimitiveFlags::TEMPORARY_ON_REZ)),
                PRIM_PHANTOM => out.push(flag_value(self, PrimitiveFlags::PHANTOM)),
                PRIM_POSITION => out.push(self.global_position().into()),
                PRIM_POS_LOCAL => out.push(self.local_position().into()),
                PRIM_SIZE => out.push(self.size().into()),
                PRIM_ROTATION => out.push(self.global_rotation().into()),
                PRIM_ROT_LOCAL => out.push(self.local_rotation().into()),
                PRIM_TEXTURE
                | PRIM_COLOR
                | PRIM_BUMP_SHINY
                | PRIM_FULLBRIGHT
                | PRIM_TEXGEN
                | PRIM_GLOW => {
                    let side = reader.read_integer("face")?;
                    let entry = self.texture_entry(culture_ref);
                    for index in target_faces(side, self.number_of_sides()) {
                        get_face_param(code, entry.face(index), out);
                    }
                }
                PRIM_FLEXIBLE => {
                    let flexible = self.flexible();
                    let f = flexible.unwrap_or_default();
                    out.extend([
                        ParamValue::from(flexible.is_some()),
                        i32::from(f.softness).into(),
                        f.gravity.into(),
                        f.friction.into(),
                        f.wind.into(),
                        f.tension.into(),
                        f.force.into(),
                    ]);
                }
                PRIM_POINT_LIGHT => {
                    let light = self.light();
                    let l = light.unwrap_or_default();
                    out.extend([
                        ParamValue::from(light.is_some()),
                        l.color.into(),
                        l.intensity.into(),
                        l.radius.into(),
                        l.falloff.into(),
                    ]);
                }
                PRIM_PROJECTOR => {
                    let p = self.projector().unwrap_or_default();
                    out.extend([
                        ParamValue::from(p.texture),
                        p.fov.into(),
                        p.focus.into(),
                        p.ambience.into(),
                    ]);
                }
                PRIM_TEXTURE_ANIM => {
                    let a = self.texture_animation(culture_ref);
                    out.extend([
                        ParamValue::from(i32::from(a.mode)),
                        i32::from(a.face).into(),
                        i32::from(a.size_x).into(),
                        i32::from(a.size_y).into(),
                        a.start.into(),
                        a.length.into(),
                        a.rate.into(),
                    ]);
                }
                PRIM_PHYSICS_SHAPE_TYPE => {
                    out.push(i32::from(self.physics_shape_type() as u8).into());
                }
                PRIM_OMEGA => {
                    let omega = self.omega();
                    out.extend([
                        ParamValue::from(omega.axis),
                        omega.spin_rate.into(),
                        omega.gain.into(),
                    ]);
                }
                PRIM_SLICE => {
                    let d = self.shape().decoded_params();
                    out.push(Vec3::new(d.path_begin, d.path_end, 0.0).into());
                }
                PRIM_ALLOW_UNSIT => out.push(self.allow_unsit().into()),
                PRIM_SCRIPTED_SIT_ONLY => out.push(self.scripted_sit_only().into()),
                PRIM_SIT_TARGET => {
                    let target = self.sit_target();
                    out.extend([
                        ParamValue::from(target.enabled),
                        target.offset.into(),
                        target.orientation.into(),
                    ]);
                }
                PRIM_CLICK_ACTION => out.push(i32::from(self.click_action() as u8).into()),
                PRIM_PHYSICS_MATERIAL => {
                    let physics = self.physics_material();
                    out.extend([
                        ParamValue::from(physics.gravity_multiplier),
                        physics.restitution.into(),
                        physics.friction.into(),
                        physics.density.into(),
                    ]);
                }
                PRIM_LANGUAGE => {
                    culture = Some(reader.read_string("language")?).filter(|c| !c.is_empty());
                }
                _ => return Err(Error::InvalidParameterType { code }),
            }
        }
        Ok(())
    }

    /// Apply every entry in `reader`, in order.
    ///
    /// Entries before a failing one stay applied.
    pub fn set_primitive_params(
        &self,
        reader: &mut ParamReader<'_>,
        culture: Option<&str>,
    ) -> Result<()> {
        let mut culture = culture.map(str::to_owned);
        while !reader.is_empty() {
            let code = reader.read_integer("parameter type")?;
            let culture_ref = culture.as_deref();
            match code {
                PRIM_NAME => self.set_name(culture_ref, &reader.read_string("name")?),
                PRIM_DESC => self.set_description(culture_ref, &reader.read_string("description")?),
                PRIM_SIT_TEXT => self.set_sit_text(culture_ref, &reader.read_string("sit text")?),
                PRIM_TOUCH_TEXT => {
                    self.set_touch_text(culture_ref, &reader.read_string("touch text")?);
                }
                PRIM_TEXT => {
                    let text = TextParams {
                        text: reader.read_string("text")?,
                        color: reader.read_vector("text color")?.clamp(Vec3::ZERO, Vec3::ONE),
                        alpha: reader.read_f32("text alpha")?.clamp(0.0, 1.0),
                    };
                    self.set_text(culture_ref, &text);
                }
                PRIM_SOUND => {
                    let sound = SoundParams {
                        sound_id: reader.read_key("sound")?,
                        gain: reader.read_f32("sound gain")?.clamp(0.0, 1.0),
                        radius: reader.read_f32("sound radius")?.max(0.0),
                        flags: u8::try_from(reader.read_integer("sound flags")?)
                            .map_err(|_| invalid("PRIM_SOUND", "flags out of range"))?,
                    };
                    self.set_sound(culture_ref, sound);
                }
                PRIM_TYPE => {
                    let mut shape = self.shape();
                    shape.apply_primitive_params(reader)?;
                    self.set_shape(shape);
                    // The new path is never flexible.
                    if self.flexible().is_some() {
                        self.set_flexible(None);
                    }
                }
                PRIM_MATERIAL => {
                    let value = reader.read_integer("material")?;
                    let material = PrimitiveMaterial::from_i32(value)
                        .ok_or_else(|| invalid("PRIM_MATERIAL", format!("unknown material {value}")))?;
                    self.set_material(material);
                }
                PRIM_PHYSICS => self.set_flag(PrimitiveFlags::PHYSICS, reader.read_bool("physics")?),
                PRIM_TEMP_ON_REZ => {
                    self.set_flag(PrimitiveFlags::TEMPORARY_ON_REZ, reader.read_bool("temp on rez")?);
                }
                PRIM_PHANTOM => self.set_flag(PrimitiveFlags::PHANTOM, reader.read_bool("phantom")?),
                PRIM_POSITION => {
                    let position = reader.read_vector("position")?;
                    match self.group().filter(|_| self.is_root()) {
                        Some(group) => group.set_global_position(position),
                        None => self.set_position(position),
                    }
                }
                PRIM_POS_LOCAL => self.set_local_position(reader.read_vector("local position")?),
                PRIM_SIZE => self.set_size(reader.read_vector("size")?),
                PRIM_ROTATION => self.set_global_rotation(reader.read_rotation("rotation")?),
                PRIM_ROT_LOCAL => self.set_local_rotation(reader.read_rotation("local rotation")?),
                PRIM_TEXTURE => {
                    let side = reader.read_integer("face")?;
                    let texture = reader.read_key("texture")?;
                    let repeats = reader.read_vector("repeats")?;
                    let offsets = reader.read_vector("offsets")?;
                    let rotation = reader.read_f32("rotation")?;
                    self.update_faces(culture_ref, side, ChangedFlags::TEXTURE, |face| {
                        face.texture_id = texture;
                        face.repeat_u = repeats.x;
                        face.repeat_v = repeats.y;
                        face.offset_u = offsets.x;
                        face.offset_v = offsets.y;
                        face.rotation = rotation;
                    })?;
                }
                PRIM_COLOR => {
                    let side = reader.read_integer("face")?;
                    let color = reader.read_vector("color")?.clamp(Vec3::ZERO, Vec3::ONE);
                    let alpha = reader.read_f32("alpha")?.clamp(0.0, 1.0);
                    self.update_faces(culture_ref, side, ChangedFlags::COLOR, |face| {
                        face.color = Vec4::from((color, alpha));
                    })?;
                }
                PRIM_BUMP_SHINY => {
                    let side = reader.read_integer("face")?;
                    let shiny = reader.read_integer("shiny")?;
                    let bump = reader.read_integer("bump")?;
                    let shiny = u8::try_from(shiny.clamp(0, 3)).unwrap_or_default();
                    let bump = u8::try_from(bump.clamp(0, 0x1f)).unwrap_or_default();
                    self.update_faces(culture_ref, side, ChangedFlags::TEXTURE, |face| {
                        face.shiny = shiny;
                        face.bump = bump;
                    })?;
                }
                PRIM_FULLBRIGHT => {
                    let side = reader.read_integer("face")?;
                    let on = reader.read_bool("fullbright")?;
                    self.update_faces(culture_ref, side, ChangedFlags::TEXTURE, |face| {
                        face.fullbright = on;
                    })?;
                }
                PRIM_TEXGEN => {
                    let side = reader.read_integer("face")?;
                    let texgen = u8::try_from(reader.read_integer("texgen")?.clamp(0, 1))
                        .unwrap_or_default();
                    self.update_faces(culture_ref, side, ChangedFlags::TEXTURE, |face| {
                        face.texgen = texgen;
                    })?;
                }
                PRIM_GLOW => {
                    let side = reader.read_integer("face")?;
                    let glow = reader.read_f32("glow")?.clamp(0.0, 1.0);
                    self.update_faces(culture_ref, side, ChangedFlags::TEXTURE, |face| {
                        face.glow = glow;
                    })?;
                }
                PRIM_FLEXIBLE => {
                    let on = reader.read_bool("flexible")?;
                    let softness = reader.read_integer("softness")?;
                    let flexible = FlexibleParams {
                        softness: u8::try_from(softness.clamp(0, 3)).unwrap_or_default(),
                        gravity: reader.read_f32("gravity")?.clamp(-10.0, 10.0),
                        friction: reader.read_f32("friction")?.clamp(0.0, 10.0),
                        wind: reader.read_f32("wind")?.clamp(0.0, 10.0),
                        tension: reader.read_f32("tension")?.clamp(0.0, 10.0),
                        force: reader.read_vector("force")?,
                    };
                    self.set_flexible(on.then_some(flexible));
                }
                PRIM_POINT_LIGHT => {
                    let on = reader.read_bool("light")?;
                    let light = LightParams {
                        color: reader.read_vector("light color")?.clamp(Vec3::ZERO, Vec3::ONE),
                        intensity: reader.read_f32("intensity")?.clamp(0.0, 1.0),
                        radius: reader.read_f32("radius")?.clamp(0.1, 20.0),
                        falloff: reader.read_f32("falloff")?.clamp(0.01, 2.0),
                        ..LightParams::default()
                    };
                    self.set_light(on.then_some(light));
                }
                PRIM_PROJECTOR => {
                    let projector = ProjectorParams {
                        texture: reader.read_key("projector texture")?,
                        fov: reader.read_f32("fov")?.clamp(0.0, 3.0),
                        focus: reader.read_f32("focus")?.clamp(-20.0, 20.0),
                        ambience: reader.read_f32("ambience")?.clamp(0.0, 1.0),
                    };
                    self.set_projector((!projector.texture.is_nil()).then_some(projector));
                }
                PRIM_TEXTURE_ANIM => {
                    let mode = reader.read_integer("animation mode")?;
                    let face = reader.read_integer("animation face")?;
                    let size_x = reader.read_integer("animation size x")?;
                    let size_y = reader.read_integer("animation size y")?;
                    let animation = TextureAnimation {
                        mode: u8::try_from(mode & 0x7f).unwrap_or_default(),
                        face: i8::try_from(face).unwrap_or(-1),
                        size_x: u8::try_from(size_x.clamp(0, 255)).unwrap_or_default(),
                        size_y: u8::try_from(size_y.clamp(0, 255)).unwrap_or_default(),
                        start: reader.read_f32("animation start")?,
                        length: reader.read_f32("animation length")?,
                        rate: reader.read_f32("animation rate")?,
                    };
                    self.set_texture_animation(culture_ref, animation);
                }
                PRIM_PHYSICS_SHAPE_TYPE => {
                    let value = reader.read_integer("physics shape type")?;
                    let shape_type = u8::try_from(value)
                        .ok()
                        .and_then(PhysicsShapeType::from_u8)
                        .ok_or_else(|| {
                            invalid("PRIM_PHYSICS_SHAPE_TYPE", format!("unknown type {value}"))
                        })?;
                    self.set_physics_shape_type(shape_type);
                }
                PRIM_OMEGA => {
                    let omega = Omega {
                        axis: reader.read_vector("omega axis")?,
                        spin_rate: reader.read_f32("spin rate")?,
                        gain: reader.read_f32("omega gain")?,
                    };
                    self.set_omega(omega);
                }
                PRIM_SLICE => {
                    let slice = reader.read_vector("slice")?;
                    self.update_shape(ChangedFlags::SHAPE, |shape| {
                        let mut d = shape.decoded_params();
                        (d.path_begin, d.path_end) = clamp_cut(slice.x, slice.y);
                        shape.apply_decoded_params(&d);
                    });
                }
                PRIM_ALLOW_UNSIT => self.set_allow_unsit(reader.read_bool("allow unsit")?),
                PRIM_SCRIPTED_SIT_ONLY => {
                    self.set_scripted_sit_only(reader.read_bool("scripted sit only")?);
                }
                PRIM_SIT_TARGET => {
                    let target = SitTarget {
                        enabled: reader.read_bool("sit target")?,
                        offset: reader.read_vector("sit offset")?,
                        orientation: reader.read_rotation("sit rotation")?,
                    };
                    self.set_sit_target(target);
                }
                PRIM_CLICK_ACTION => {
                    let value = reader.read_integer("click action")?;
                    let action = ClickAction::from_i32(value)
                        .ok_or_else(|| invalid("PRIM_CLICK_ACTION", format!("unknown action {value}")))?;
                    self.set_click_action(action);
                }
                PRIM_PHYSICS_MATERIAL => {
                    let mask = reader.read_integer("material flags")?;
                    let gravity = reader.read_f32("gravity multiplier")?;
                    let restitution = reader.read_f32("restitution")?;
                    let friction = reader.read_f32("friction")?;
                    let density = reader.read_f32("density")?;
                    let mut physics = self.physics_material();
                    if mask & GRAVITY_MULTIPLIER != 0 {
                        physics.gravity_multiplier = gravity.clamp(-1.0, 28.0);
                    }
                    if mask & RESTITUTION != 0 {
                        physics.restitution = restitution.clamp(0.0, 1.0);
                    }
                    if mask & FRICTION != 0 {
                        physics.friction = friction.clamp(0.0, 255.0);
                    }
                    if mask & DENSITY != 0 {
                        physics.density = density.clamp(1.0, 22_587.0);
                    }
                    self.set_physics_material(physics);
                }
                PRIM_LANGUAGE => {
                    culture = Some(reader.read_string("language")?).filter(|c| !c.is_empty());
                }
                PRIM_REMOVE_LANGUAGE => {
                    let name = reader.read_string("language")?;
                    if !self.remove_localization(&name) {
                        tracing::debug!(part = %self.id(), culture = %name, "no localization to remove");
                    }
                }
                PRIM_REMOVE_ALL_LANGUAGES => self.remove_all_localizations(),
                _ => return Err(Error::InvalidParameterType { code }),
            }
        }
        Ok(())
    }

    /// Edit one side (or every side) of the texture entries the culture
    /// selects. Localizations without their own entry start from the
    /// default one.
    fn update_faces(
        &self,
        culture: Option<&str>,
        side: i32,
        flags: ChangedFlags,
        mut f: impl FnMut(&mut TextureEntryFace),
    ) -> Result<()> {
        if side != ALL_SIDES && !(0..self.number_of_sides()).contains(&side) {
            tracing::debug!(part = %self.id(), side, "face out of range, ignored");
            return Ok(());
        }
        let mut outcome = Ok(());
        {
            let mut localizations = self.localizations.write();
            let fallback = localizations
                .default_info()
                .texture_entry
                .clone()
                .unwrap_or_default();
            localizations.update(
                CultureSelector::parse(culture),
                LocalizedProperty::TextureEntry,
                |info| {
                    let entry = info.texture_entry.get_or_insert_with(|| fallback.clone());
                    if let Err(e) = entry.update_side(side, &mut f) {
                        outcome = Err(e);
                    }
                },
            );
        }
        self.trigger_on_update(flags);
        outcome.map_err(Error::from)
    }
}

fn get_face_param(code: i32, face: &TextureEntryFace, out: &mut Vec<ParamValue>) {
    match code {
        PRIM_TEXTURE => out.extend([
            ParamValue::from(face.texture_id),
            Vec3::new(face.repeat_u, face.repeat_v, 0.0).into(),
            Vec3::new(face.offset_u, face.offset_v, 0.0).into(),
            face.rotation.into(),
        ]),
        PRIM_COLOR => out.extend([
            ParamValue::from(face.color.truncate()),
            face.color.w.into(),
        ]),
        PRIM_BUMP_SHINY => out.extend([
            ParamValue::from(i32::from(face.shiny)),
            i32::from(face.bump).into(),
        ]),
        PRIM_FULLBRIGHT => out.push(face.fullbright.into()),
        PRIM_TEXGEN => out.push(i32::from(face.texgen).into()),
        PRIM_GLOW => out.push(face.glow.into()),
        _ => {}
    }
}
