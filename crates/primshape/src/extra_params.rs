//! The extra-params blob carrying flexible, light, sculpt and projector data.
//!
//! # Format
//!
//! - Byte 0: entry count
//! - Per entry: type (u16), payload size (u32), payload
//!
//! Entries of unknown type are skipped.

use crate::error::{ShapeError, ShapeResult};
use glam::Vec3;
use uuid::Uuid;

pub const EXTRA_FLEXIBLE: u16 = 0x10;
pub const EXTRA_LIGHT: u16 = 0x20;
pub const EXTRA_SCULPT: u16 = 0x30;
pub const EXTRA_PROJECTOR: u16 = 0x40;

/// Flexible-path simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlexibleParams {
    /// 0 to 3.
    pub softness: u8,
    pub tension: f32,
    pub friction: f32,
    pub gravity: f32,
    pub wind: f32,
    pub force: Vec3,
}

impl Default for FlexibleParams {
    fn default() -> Self {
        Self {
            softness: 2,
            tension: 1.0,
            friction: 2.0,
            gravity: 0.3,
            wind: 0.0,
            force: Vec3::ZERO,
        }
    }
}

impl FlexibleParams {
    const LEN: usize = 16;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn write(&self, out: &mut Vec<u8>) {
        let packed = |v: f32| ((v * 10.01).clamp(0.0, 127.0)) as u8;
        out.push(((self.softness & 0x02) << 6) | packed(self.tension));
        out.push(((self.softness & 0x01) << 7) | packed(self.friction));
        out.push(((self.gravity + 10.0) * 10.01).clamp(0.0, 255.0) as u8);
        out.push((self.wind * 10.01).clamp(0.0, 255.0) as u8);
        write_vec3(out, self.force);
    }

    fn read(data: &[u8]) -> ShapeResult<Self> {
        expect_len("flexible params", data, Self::LEN)?;
        Ok(Self {
            softness: ((data[0] & 0x80) >> 6) | ((data[1] & 0x80) >> 7),
            tension: f32::from(data[0] & 0x7f) / 10.0,
            friction: f32::from(data[1] & 0x7f) / 10.0,
            gravity: f32::from(data[2]) / 10.0 - 10.0,
            wind: f32::from(data[3]) / 10.0,
            force: read_vec3(&data[4..16]),
        })
    }
}

/// Point light parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightParams {
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
    pub cutoff: f32,
    pub falloff: f32,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
            radius: 10.0,
            cutoff: 0.0,
            falloff: 0.75,
        }
    }
}

impl LightParams {
    const LEN: usize = 16;

    fn write(&self, out: &mut Vec<u8>) {
        for c in [self.color.x, self.color.y, self.color.z, self.intensity] {
            out.push(unit_to_byte(c));
        }
        out.extend_from_slice(&self.radius.to_le_bytes());
        out.extend_from_slice(&self.cutoff.to_le_bytes());
        out.extend_from_slice(&self.falloff.to_le_bytes());
    }

    fn read(data: &[u8]) -> ShapeResult<Self> {
        expect_len("light params", data, Self::LEN)?;
        Ok(Self {
            color: Vec3::new(
                f32::from(data[0]) / 255.0,
                f32::from(data[1]) / 255.0,
                f32::from(data[2]) / 255.0,
            ),
            intensity: f32::from(data[3]) / 255.0,
            radius: read_f32(&data[4..8]),
            cutoff: read_f32(&data[8..12]),
            falloff: read_f32(&data[12..16]),
        })
    }
}

/// Sculpt map reference as carried in extra params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SculptParams {
    pub map: Uuid,
    /// Sculpt type with the invert/mirror flag bits.
    pub sculpt_type: u8,
}

/// Projected texture parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectorParams {
    pub texture: Uuid,
    pub fov: f32,
    pub focus: f32,
    pub ambience: f32,
}

impl Default for ProjectorParams {
    fn default() -> Self {
        Self {
            texture: Uuid::nil(),
            fov: 1.5,
            focus: 10.0,
            ambience: 0.0,
        }
    }
}

/// The optional parameter blocks of a part.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExtraParams {
    pub flexible: Option<FlexibleParams>,
    pub light: Option<LightParams>,
    pub sculpt: Option<SculptParams>,
    pub projector: Option<ProjectorParams>,
}

impl ExtraParams {
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut entries: Vec<(u16, Vec<u8>)> = Vec::new();
        if let Some(flexible) = &self.flexible {
            let mut data = Vec::with_capacity(FlexibleParams::LEN);
            flexible.write(&mut data);
            entries.push((EXTRA_FLEXIBLE, data));
        }
        if let Some(light) = &self.light {
            let mut data = Vec::with_capacity(LightParams::LEN);
            light.write(&mut data);
            entries.push((EXTRA_LIGHT, data));
        }
        if let Some(sculpt) = &self.sculpt {
            let mut data = sculpt.map.as_bytes().to_vec();
            data.push(sculpt.sculpt_type);
            entries.push((EXTRA_SCULPT, data));
        }
        if let Some(projector) = &self.projector {
            let mut data = projector.texture.as_bytes().to_vec();
            data.extend_from_slice(&projector.fov.to_le_bytes());
            data.extend_from_slice(&projector.focus.to_le_bytes());
            data.extend_from_slice(&projector.ambience.to_le_bytes());
            entries.push((EXTRA_PROJECTOR, data));
        }

        let mut out = vec![entries.len() as u8];
        for (kind, data) in entries {
            out.extend_from_slice(&kind.to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&data);
        }
        out
    }

    /// Decode an extra-params blob. An empty blob has no entries.
    pub fn from_bytes(data: &[u8]) -> ShapeResult<Self> {
        let mut params = Self::default();
        let Some((&count, mut rest)) = data.split_first() else {
            return Ok(params);
        };

        for _ in 0..count {
            if rest.len() < 6 {
                return Err(truncated(data.len() - rest.len()));
            }
            let kind = u16::from_le_bytes([rest[0], rest[1]]);
            let size = u32::from_le_bytes([rest[2], rest[3], rest[4], rest[5]]) as usize;
            let payload = rest
                .get(6..6 + size)
                .ok_or_else(|| truncated(data.len() - rest.len()))?;
            rest = &rest[6 + size..];

            match kind {
                EXTRA_FLEXIBLE => params.flexible = Some(FlexibleParams::read(payload)?),
                EXTRA_LIGHT => params.light = Some(LightParams::read(payload)?),
                EXTRA_SCULPT => {
                    expect_len("sculpt params", payload, 17)?;
                    params.sculpt = Some(SculptParams {
                        map: read_uuid(&payload[0..16]),
                        sculpt_type: payload[16],
                    });
                }
                EXTRA_PROJECTOR => {
                    expect_len("projector params", payload, 28)?;
                    params.projector = Some(ProjectorParams {
                        texture: read_uuid(&payload[0..16]),
                        fov: read_f32(&payload[16..20]),
                        focus: read_f32(&payload[20..24]),
                        ambience: read_f32(&payload[24..28]),
                    });
                }
                _ => {}
            }
        }
        Ok(params)
    }
}

fn truncated(offset: usize) -> ShapeError {
    ShapeError::InvalidFormat {
        context: "extra params",
        detail: format!("truncated entry at byte {offset}"),
    }
}

fn expect_len(context: &'static str, data: &[u8], expected: usize) -> ShapeResult<()> {
    if data.len() == expected {
        Ok(())
    } else {
        Err(ShapeError::InvalidLength {
            context,
            expected,
            actual: data.len(),
        })
    }
}

fn read_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn read_vec3(b: &[u8]) -> Vec3 {
    Vec3::new(read_f32(&b[0..4]), read_f32(&b[4..8]), read_f32(&b[8..12]))
}

fn write_vec3(out: &mut Vec<u8>, v: Vec3) {
    for c in v.to_array() {
        out.extend_from_slice(&c.to_le_bytes());
    }
}

fn read_uuid(b: &[u8]) -> Uuid {
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&b[..16]);
    Uuid::from_bytes(raw)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_blob() {
        assert_eq!(ExtraParams::default().to_bytes(), vec![0]);
        assert_eq!(ExtraParams::from_bytes(&[]).unwrap(), ExtraParams::default());
    }

    #[test]
    fn test_light_and_projector_round_trip() {
        let params = ExtraParams {
            light: Some(LightParams {
                color: Vec3::new(1.0, 0.0, 0.0),
                intensity: 1.0,
                radius: 5.0,
                cutoff: 0.0,
                falloff: 0.5,
            }),
            projector: Some(ProjectorParams {
                texture: Uuid::from_u128(9),
                ..ProjectorParams::default()
            }),
            ..ExtraParams::default()
        };
        let bytes = params.to_bytes();
        // Count, then (2 + 4 + 16) for the light and (2 + 4 + 28) for the projector.
        assert_eq!(bytes.len(), 1 + 22 + 34);
        assert_eq!(ExtraParams::from_bytes(&bytes).unwrap(), params);
    }

    #[test]
    fn test_flexible_quantised() {
        let params = ExtraParams {
            flexible: Some(FlexibleParams {
                softness: 3,
                tension: 1.5,
                friction: 2.0,
                gravity: -1.0,
                wind: 0.5,
                force: Vec3::new(0.0, 0.0, -1.0),
            }),
            ..ExtraParams::default()
        };
        let decoded = ExtraParams::from_bytes(&params.to_bytes()).unwrap();
        let flexible = decoded.flexible.unwrap();
        assert_eq!(flexible.softness, 3);
        assert!((flexible.tension - 1.5).abs() < 0.11);
        assert!((flexible.gravity + 1.0).abs() < 0.11);
        assert_eq!(flexible.force, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_unknown_entry_skipped() {
        let mut bytes = vec![2];
        bytes.extend_from_slice(&0x70u16.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);
        bytes.extend_from_slice(&EXTRA_SCULPT.to_le_bytes());
        bytes.extend_from_slice(&17u32.to_le_bytes());
        bytes.extend_from_slice(Uuid::from_u128(5).as_bytes());
        bytes.push(1);

        let params = ExtraParams::from_bytes(&bytes).unwrap();
        assert_eq!(
            params.sculpt,
            Some(SculptParams {
                map: Uuid::from_u128(5),
                sculpt_type: 1
            })
        );
    }

    #[test]
    fn test_truncated_entry() {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&EXTRA_LIGHT.to_le_bytes());
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&[0; 4]);
        assert!(matches!(
            ExtraParams::from_bytes(&bytes),
            Err(ShapeError::InvalidFormat { .. })
        ));
    }
}
