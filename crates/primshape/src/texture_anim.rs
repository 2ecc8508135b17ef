//! Texture animation parameters and their 16-byte packed form.

use crate::error::{ShapeError, ShapeResult};

pub const ANIM_ON: u8 = 0x01;
pub const ANIM_LOOP: u8 = 0x02;
pub const ANIM_REVERSE: u8 = 0x04;
pub const ANIM_PING_PONG: u8 = 0x08;
pub const ANIM_SMOOTH: u8 = 0x10;
pub const ANIM_ROTATE: u8 = 0x20;
pub const ANIM_SCALE: u8 = 0x40;

pub const TEXTURE_ANIMATION_LEN: usize = 16;

/// A texture animation as set by a script.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextureAnimation {
    pub mode: u8,
    /// Face index, or -1 for every face.
    pub face: i8,
    pub size_x: u8,
    pub size_y: u8,
    pub start: f32,
    pub length: f32,
    pub rate: f32,
}

impl TextureAnimation {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.mode & ANIM_ON != 0
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; TEXTURE_ANIMATION_LEN] {
        let mut out = [0u8; TEXTURE_ANIMATION_LEN];
        out[0] = self.mode;
        out[1] = self.face.to_le_bytes()[0];
        out[2] = self.size_x;
        out[3] = self.size_y;
        out[4..8].copy_from_slice(&self.start.to_le_bytes());
        out[8..12].copy_from_slice(&self.length.to_le_bytes());
        out[12..16].copy_from_slice(&self.rate.to_le_bytes());
        out
    }

    pub fn from_bytes(data: &[u8]) -> ShapeResult<Self> {
        if data.len() != TEXTURE_ANIMATION_LEN {
            return Err(ShapeError::InvalidLength {
                context: "texture animation",
                expected: TEXTURE_ANIMATION_LEN,
                actual: data.len(),
            });
        }
        Ok(Self {
            mode: data[0],
            face: i8::from_le_bytes([data[1]]),
            size_x: data[2],
            size_y: data[3],
            start: f32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            length: f32::from_le_bytes([data[8], data[9], data[10], data[11]]),
            rate: f32::from_le_bytes([data[12], data[13], data[14], data[15]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let anim = TextureAnimation {
            mode: ANIM_ON | ANIM_LOOP,
            face: -1,
            size_x: 4,
            size_y: 2,
            start: 0.0,
            length: 8.0,
            rate: 10.0,
        };
        let bytes = anim.to_bytes();
        assert_eq!(&bytes[0..4], &[0x03, 0xff, 4, 2]);
        assert_eq!(TextureAnimation::from_bytes(&bytes).unwrap(), anim);
        assert!(anim.is_running());
    }

    #[test]
    fn test_wrong_length() {
        assert!(matches!(
            TextureAnimation::from_bytes(&[0; 15]),
            Err(ShapeError::InvalidLength { actual: 15, .. })
        ));
    }
}
