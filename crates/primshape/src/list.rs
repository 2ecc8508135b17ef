//! Script parameter list values and a typed reader over them.
//!
//! Parameter lists are flat sequences of loosely typed values. A reader pulls
//! values in order and converts them to the type each position requires,
//! applying the same promotions a script runtime applies (integers read as
//! floats, strings read as keys).

use crate::error::{ShapeError, ShapeResult};
use glam::{Quat, Vec3};
use uuid::Uuid;

/// A single value in a parameter list.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Integer(i32),
    Float(f64),
    String(String),
    Key(Uuid),
    Vector(Vec3),
    Rotation(Quat),
}

impl ParamValue {
    /// Name of the value's type, as used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Key(_) => "key",
            Self::Vector(_) => "vector",
            Self::Rotation(_) => "rotation",
        }
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Integer(i32::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Uuid> for ParamValue {
    fn from(v: Uuid) -> Self {
        Self::Key(v)
    }
}

impl From<Vec3> for ParamValue {
    fn from(v: Vec3) -> Self {
        Self::Vector(v)
    }
}

impl From<Quat> for ParamValue {
    fn from(v: Quat) -> Self {
        Self::Rotation(v)
    }
}

/// Sequential typed reader over a parameter list.
#[derive(Debug, Clone)]
pub struct ParamReader<'a> {
    values: &'a [ParamValue],
    position: usize,
}

impl<'a> ParamReader<'a> {
    #[must_use]
    pub fn new(values: &'a [ParamValue]) -> Self {
        Self {
            values,
            position: 0,
        }
    }

    /// Whether every value has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position >= self.values.len()
    }

    /// Number of values not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len().saturating_sub(self.position)
    }

    /// Index of the next value to be read.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Take the next value without converting it.
    pub fn read_value(&mut self, name: &'static str) -> ShapeResult<&'a ParamValue> {
        let value = self
            .values
            .get(self.position)
            .ok_or(ShapeError::MissingParameter { name })?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_integer(&mut self, name: &'static str) -> ShapeResult<i32> {
        match self.read_value(name)? {
            ParamValue::Integer(v) => Ok(*v),
            _ => Err(ShapeError::TypeMismatch {
                name,
                expected: "integer",
            }),
        }
    }

    pub fn read_bool(&mut self, name: &'static str) -> ShapeResult<bool> {
        Ok(self.read_integer(name)? != 0)
    }

    /// Reads a float, promoting integers.
    pub fn read_float(&mut self, name: &'static str) -> ShapeResult<f64> {
        match self.read_value(name)? {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Integer(v) => Ok(f64::from(*v)),
            _ => Err(ShapeError::TypeMismatch {
                name,
                expected: "float",
            }),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn read_f32(&mut self, name: &'static str) -> ShapeResult<f32> {
        Ok(self.read_float(name)? as f32)
    }

    pub fn read_vector(&mut self, name: &'static str) -> ShapeResult<Vec3> {
        match self.read_value(name)? {
            ParamValue::Vector(v) => Ok(*v),
            _ => Err(ShapeError::TypeMismatch {
                name,
                expected: "vector",
            }),
        }
    }

    pub fn read_rotation(&mut self, name: &'static str) -> ShapeResult<Quat> {
        match self.read_value(name)? {
            ParamValue::Rotation(v) => Ok(*v),
            _ => Err(ShapeError::TypeMismatch {
                name,
                expected: "rotation",
            }),
        }
    }

    /// Reads a string, accepting keys in their hyphenated form.
    pub fn read_string(&mut self, name: &'static str) -> ShapeResult<String> {
        match self.read_value(name)? {
            ParamValue::String(v) => Ok(v.clone()),
            ParamValue::Key(v) => Ok(v.to_string()),
            _ => Err(ShapeError::TypeMismatch {
                name,
                expected: "string",
            }),
        }
    }

    /// Reads a key, parsing strings. Unparseable strings read as the nil key.
    pub fn read_key(&mut self, name: &'static str) -> ShapeResult<Uuid> {
        match self.read_value(name)? {
            ParamValue::Key(v) => Ok(*v),
            ParamValue::String(v) => Ok(Uuid::parse_str(v).unwrap_or_default()),
            _ => Err(ShapeError::TypeMismatch {
                name,
                expected: "key",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_promotes_integer_to_float() {
        let values = [ParamValue::Integer(3), ParamValue::Float(0.5)];
        let mut reader = ParamReader::new(&values);
        assert!((reader.read_float("a").unwrap() - 3.0).abs() < f64::EPSILON);
        assert!((reader.read_float("b").unwrap() - 0.5).abs() < f64::EPSILON);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_reader_missing_parameter() {
        let values = [ParamValue::Integer(1)];
        let mut reader = ParamReader::new(&values);
        reader.read_integer("first").unwrap();
        let result = reader.read_vector("second");
        assert_eq!(
            result,
            Err(ShapeError::MissingParameter { name: "second" })
        );
    }

    #[test]
    fn test_reader_type_mismatch() {
        let values = [ParamValue::String("box".into())];
        let mut reader = ParamReader::new(&values);
        assert!(matches!(
            reader.read_integer("type"),
            Err(ShapeError::TypeMismatch {
                expected: "integer",
                ..
            })
        ));
    }

    #[test]
    fn test_reader_key_from_string() {
        let id = Uuid::from_u128(0x1234);
        let values = [ParamValue::String(id.to_string()), "not a key".into()];
        let mut reader = ParamReader::new(&values);
        assert_eq!(reader.read_key("map").unwrap(), id);
        // Garbage strings become the nil key, matching script semantics.
        assert_eq!(reader.read_key("map").unwrap(), Uuid::nil());
    }
}
