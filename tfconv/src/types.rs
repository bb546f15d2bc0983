//! Wire values
//!
//! [`Dynamic`] is the untyped payload tree, [`DynamicValue`] pairs a payload
//! with its [`AttributeType`] so it can be encoded, decoded and checked without
//! any external schema lookup.

use crate::attribute_type::AttributeType;
use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;

/// Dynamic represents a Terraform value of any type
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    /// Value not yet known (during planning)
    Unknown,
    /// Boolean value
    Bool(bool),
    /// Number value, exact for 64-bit integers
    Number(Number),
    /// String value
    String(String),
    /// List of values (ordered, allows duplicates)
    List(Vec<Dynamic>),
    /// Map of string keys to values (objects are represented as Maps)
    Map(BTreeMap<String, Dynamic>),
}

impl Dynamic {
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Unknown => "unknown",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Dynamic)>,
        K: Into<String>,
    {
        Dynamic::Map(
            attributes
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Whether any part of the tree is still unknown
    pub fn contains_unknown(&self) -> bool {
        match self {
            Dynamic::Unknown => true,
            Dynamic::List(items) => items.iter().any(Dynamic::contains_unknown),
            Dynamic::Map(entries) => entries.values().any(Dynamic::contains_unknown),
            _ => false,
        }
    }

    /// Attribute of an object payload
    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        match self {
            Dynamic::Map(map) => map.get(name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Result<&str, ConversionError> {
        match self {
            Dynamic::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_number(&self) -> Result<&Number, ConversionError> {
        match self {
            Dynamic::Number(n) => Ok(n),
            other => Err(other.mismatch("number")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ConversionError> {
        match self {
            Dynamic::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_list(&self) -> Result<&[Dynamic], ConversionError> {
        match self {
            Dynamic::List(l) => Ok(l),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn as_map(&self) -> Result<&BTreeMap<String, Dynamic>, ConversionError> {
        match self {
            Dynamic::Map(m) => Ok(m),
            other => Err(other.mismatch("map")),
        }
    }

    fn mismatch(&self, expected: &str) -> ConversionError {
        match self {
            Dynamic::Unknown => ConversionError::UnknownValue,
            other => ConversionError::mismatch(expected, other.type_name()),
        }
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Dynamic::String(value.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Dynamic::String(value)
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Dynamic::Bool(value)
    }
}

impl From<i64> for Dynamic {
    fn from(value: i64) -> Self {
        Dynamic::Number(value.into())
    }
}

impl From<u64> for Dynamic {
    fn from(value: u64) -> Self {
        Dynamic::Number(value.into())
    }
}

impl From<Vec<Dynamic>> for Dynamic {
    fn from(value: Vec<Dynamic>) -> Self {
        Dynamic::List(value)
    }
}

/// Msgpack extension code Terraform uses for unknown values
const UNKNOWN_EXTENSION: i8 = 0;

/// Extension body written for unknown values, a single zero byte
struct UnknownPayload;

impl Serialize for UnknownPayload {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&[0])
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Unknown => serializer.serialize_newtype_struct(
                rmp_serde::MSGPACK_EXT_STRUCT_NAME,
                &(UNKNOWN_EXTENSION, UnknownPayload),
            ),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => n.serialize(serializer),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid Dynamic value")
            }

            fn visit_unit<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Dynamic, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Dynamic::deserialize(deserializer)
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value.into()))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value.into()))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Number::from_f64(value)
                    .map(Dynamic::Number)
                    .ok_or_else(|| E::custom("non-finite number"))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::String(value))
            }

            // rmp-serde hands msgpack extensions over as a newtype of (code, body)
            fn visit_newtype_struct<D>(
                self,
                deserializer: D,
            ) -> std::result::Result<Dynamic, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let (code, _body) = <(i8, de::IgnoredAny)>::deserialize(deserializer)?;
                if code == UNKNOWN_EXTENSION {
                    Ok(Dynamic::Unknown)
                } else {
                    Err(de::Error::custom(format!(
                        "unsupported msgpack extension {}",
                        code
                    )))
                }
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut entries = BTreeMap::new();
                while let Some((key, value)) = map.next_entry::<String, Dynamic>()? {
                    entries.insert(key, value);
                }
                Ok(Dynamic::Map(entries))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// DynamicValue is a payload tagged with its own type.
/// This is what gets exchanged with Terraform.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub ty: AttributeType,
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(ty: AttributeType, value: Dynamic) -> Self {
        Self { ty, value }
    }

    pub fn null(ty: AttributeType) -> Self {
        Self {
            ty,
            value: Dynamic::Null,
        }
    }

    pub fn unknown(ty: AttributeType) -> Self {
        Self {
            ty,
            value: Dynamic::Unknown,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.value, Dynamic::Unknown)
    }

    /// Typed attribute of an object value. A null object yields typed nulls.
    pub fn attribute(&self, name: &str) -> Option<DynamicValue> {
        let AttributeType::Object(attrs) = &self.ty else {
            return None;
        };
        let ty = attrs.get(name)?.clone();
        let value = match &self.value {
            Dynamic::Map(map) => map.get(name).cloned().unwrap_or(Dynamic::Null),
            Dynamic::Unknown => Dynamic::Unknown,
            _ => Dynamic::Null,
        };
        Some(DynamicValue { ty, value })
    }

    /// Encoding/decoding for wire protocol - Terraform uses msgpack by default
    pub fn encode_msgpack(&self) -> Result<Vec<u8>, ConversionError> {
        rmp_serde::encode::to_vec(&self.value)
            .map_err(|e| ConversionError::Encoding(format!("msgpack encoding failed: {}", e)))
    }

    pub fn decode_msgpack(ty: AttributeType, data: &[u8]) -> Result<Self, ConversionError> {
        if data.is_empty() {
            return Ok(Self::null(ty));
        }

        let value = rmp_serde::decode::from_slice::<Dynamic>(data)
            .map_err(|e| ConversionError::Decoding(format!("msgpack decoding failed: {}", e)))?;
        Self::checked(ty, value)
    }

    /// JSON has no representation for unknown values, so a tree holding one
    /// fails to encode.
    pub fn encode_json(&self) -> Result<Vec<u8>, ConversionError> {
        if self.value.contains_unknown() {
            return Err(ConversionError::Encoding(
                "json encoding failed: unknown values have no JSON form".to_string(),
            ));
        }
        serde_json::to_vec(&self.value)
            .map_err(|e| ConversionError::Encoding(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(ty: AttributeType, data: &[u8]) -> Result<Self, ConversionError> {
        let value = serde_json::from_slice::<Dynamic>(data)
            .map_err(|e| ConversionError::Decoding(format!("json decoding failed: {}", e)))?;
        Self::checked(ty, value)
    }

    fn checked(ty: AttributeType, value: Dynamic) -> Result<Self, ConversionError> {
        if !ty.accepts(&value) {
            return Err(ConversionError::mismatch(&ty, value.type_name()));
        }
        Ok(Self { ty, value })
    }
}
