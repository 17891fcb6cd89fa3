//! Runtime values.
//!
//! A `Datum` is the only value representation the engine knows. Equality is
//! per kind: NULL equals NULL, integers compare numerically, strings compare
//! by exact bytes, and values of different kinds are never equal.

use std::fmt;

use bytes::Bytes;

use super::ScalarType;

/// A typed runtime value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Datum {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// Byte string.
    String(Bytes),
}

impl Datum {
    /// Creates an integer datum.
    pub fn int(v: i64) -> Self {
        Datum::Int64(v)
    }

    /// Creates a string datum.
    pub fn string(v: impl Into<Vec<u8>>) -> Self {
        Datum::String(Bytes::from(v.into()))
    }

    /// Returns true if this datum is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Returns the scalar type of a non-NULL datum.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Datum::Null => None,
            Datum::Int64(_) => Some(ScalarType::Int64),
            Datum::String(_) => Some(ScalarType::String),
        }
    }

    /// Returns true if the datum may be stored in a column of type `ty`.
    /// NULL fits every type; nullability is checked separately.
    pub fn fits(&self, ty: ScalarType) -> bool {
        self.scalar_type().map_or(true, |t| t == ty)
    }

    /// Returns the integer value, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Datum::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string bytes, if any.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Datum::String(b) => Some(b),
            _ => None,
        }
    }

    /// Name of the datum's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Datum::Null => "NULL",
            Datum::Int64(_) => "INT64",
            Datum::String(_) => "STRING",
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Int64(v) => write!(f, "{}", v),
            Datum::String(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int64(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::String(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::String(Bytes::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_per_kind() {
        assert_eq!(Datum::Null, Datum::Null);
        assert_eq!(Datum::int(5), Datum::int(5));
        assert_ne!(Datum::int(5), Datum::int(6));
        assert_eq!(Datum::from("a"), Datum::string("a"));
        assert_ne!(Datum::from("5"), Datum::int(5));
        assert_ne!(Datum::Null, Datum::int(0));
        assert_ne!(Datum::Null, Datum::from(""));
    }

    #[test]
    fn test_fits() {
        assert!(Datum::int(1).fits(ScalarType::Int64));
        assert!(!Datum::int(1).fits(ScalarType::String));
        assert!(Datum::Null.fits(ScalarType::String));
    }

    #[test]
    fn test_display() {
        assert_eq!(Datum::Null.to_string(), "NULL");
        assert_eq!(Datum::int(-3).to_string(), "-3");
        assert_eq!(Datum::from("abc").to_string(), "abc");
    }
}
