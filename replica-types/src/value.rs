//! Replicated values.
//!
//! Every value that crosses the wire is a [`Value`]. Built-in variants cover
//! the common scalar and container shapes; application types travel as
//! [`Value::Custom`] and must be registered in a
//! [`TypeRegistry`](crate::TypeRegistry) on both ends.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ReplicaError;

/// An application type that can be carried inside a [`Value::Custom`].
///
/// `TYPE_NAME` is the identity used on the wire. It must be identical on the
/// server and on every client that registers the type.
pub trait Transmissible: Serialize + DeserializeOwned {
    /// Stable wire name of the type.
    const TYPE_NAME: &'static str;
}

/// A replicated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Ordered list of values
    List(Vec<Value>),
    /// String-keyed map of values
    Map(BTreeMap<String, Value>),
    /// Registered application type (MessagePack payload)
    Custom {
        /// Wire name of the application type.
        type_name: String,
        /// MessagePack encoding of the application value.
        payload: Vec<u8>,
    },
}

impl Value {
    /// Wrap raw bytes.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(data.into())
    }

    /// Encode an application value as a [`Value::Custom`].
    pub fn custom<T: Transmissible>(value: &T) -> Result<Self, ReplicaError> {
        let payload = rmp_serde::to_vec(value).map_err(ReplicaError::Serialization)?;
        Ok(Value::Custom {
            type_name: T::TYPE_NAME.to_string(),
            payload,
        })
    }

    /// Decode a [`Value::Custom`] back into its application type.
    pub fn decode<T: Transmissible>(&self) -> Result<T, ReplicaError> {
        match self {
            Value::Custom { type_name, payload } if type_name == T::TYPE_NAME => {
                rmp_serde::from_slice(payload).map_err(ReplicaError::Deserialization)
            }
            other => Err(ReplicaError::TypeMismatch {
                expected: T::TYPE_NAME.to_string(),
                actual: other.kind().to_string(),
            }),
        }
    }

    /// Short name of the variant, or the type name for custom values.
    pub fn kind(&self) -> &str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Custom { type_name, .. } => type_name,
        }
    }

    /// Check for [`Value::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Get the boolean, if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer, if this is an int.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float, if this is a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the byte slice, if this is bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get the list, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the map, if this is a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Map(value)
    }
}
