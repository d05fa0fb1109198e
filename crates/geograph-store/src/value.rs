use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar node property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl PropertyValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Exact lookup key; floats compare by bit pattern.
    pub(crate) fn index_key(&self) -> IndexKey {
        match self {
            Self::Int(v) => IndexKey::Int(*v),
            Self::Float(v) => IndexKey::Float(v.to_bits()),
            Self::Str(v) => IndexKey::Str(v.clone()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&String> for PropertyValue {
    fn from(v: &String) -> Self {
        Self::Str(v.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum IndexKey {
    Int(i64),
    Float(u64),
    Str(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_string_keys_never_collide() {
        // "01067" must stay distinct from 1067
        let code = PropertyValue::from("01067");
        let number = PropertyValue::from(1067i64);
        assert_ne!(code.index_key(), number.index_key());
    }

    #[test]
    fn float_keys_are_exact() {
        let a = PropertyValue::from(53.554423);
        let b = PropertyValue::from(53.554423);
        assert_eq!(a.index_key(), b.index_key());
        assert_ne!(a.index_key(), PropertyValue::from(53.5544231).index_key());
    }
}
