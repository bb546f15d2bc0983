//! Value kinds
//!
//! A field's concrete Rust type is resolved to a [`ValueKind`] once, when the
//! field is declared. Types outside the table resolve to
//! [`ValueKind::Unsupported`], which no codec accepts.

use crate::nomad::{GatewayBindAddress, JobType, VolumeRequest};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    OptionalString,
    Duration,
    OptionalDuration,
    JobType,
    I8,
    OptionalI8,
    I16,
    OptionalI16,
    I32,
    OptionalI32,
    I64,
    OptionalI64,
    U8,
    OptionalU8,
    U16,
    OptionalU16,
    U32,
    OptionalU32,
    U64,
    OptionalU64,
    Bool,
    OptionalBool,
    StringList,
    OptionalStringList,
    StringMap,
    StringListMap,
    JsonMap,
    VolumeRequestMap,
    GatewayBindAddressMap,
    /// Any other type, by name
    Unsupported(&'static str),
}

macro_rules! kind_table {
    ($($kind:ident => $ty:ty),* $(,)?) => {
        fn table() -> &'static HashMap<TypeId, ValueKind> {
            static KINDS: OnceLock<HashMap<TypeId, ValueKind>> = OnceLock::new();
            KINDS.get_or_init(|| {
                HashMap::from([$((TypeId::of::<$ty>(), ValueKind::$kind)),*])
            })
        }
    };
}

kind_table! {
    String => String,
    OptionalString => Option<String>,
    Duration => Duration,
    OptionalDuration => Option<Duration>,
    JobType => JobType,
    I8 => i8,
    OptionalI8 => Option<i8>,
    I16 => i16,
    OptionalI16 => Option<i16>,
    I32 => i32,
    OptionalI32 => Option<i32>,
    I64 => i64,
    OptionalI64 => Option<i64>,
    U8 => u8,
    OptionalU8 => Option<u8>,
    U16 => u16,
    OptionalU16 => Option<u16>,
    U32 => u32,
    OptionalU32 => Option<u32>,
    U64 => u64,
    OptionalU64 => Option<u64>,
    Bool => bool,
    OptionalBool => Option<bool>,
    StringList => Vec<String>,
    OptionalStringList => Option<Vec<String>>,
    StringMap => HashMap<String, String>,
    StringListMap => HashMap<String, Vec<String>>,
    JsonMap => HashMap<String, serde_json::Value>,
    VolumeRequestMap => HashMap<String, VolumeRequest>,
    GatewayBindAddressMap => HashMap<String, GatewayBindAddress>,
}

impl ValueKind {
    pub fn of<T: Any>() -> Self {
        table()
            .get(&TypeId::of::<T>())
            .copied()
            .unwrap_or(ValueKind::Unsupported(type_name::<T>()))
    }

    /// Kinds a label field may have
    pub fn is_string(&self) -> bool {
        matches!(self, ValueKind::String | ValueKind::OptionalString)
    }

    /// Unordered key/value kinds, which are never nested as blocks
    pub fn is_mapping(&self) -> bool {
        matches!(
            self,
            ValueKind::StringMap
                | ValueKind::StringListMap
                | ValueKind::JsonMap
                | ValueKind::VolumeRequestMap
                | ValueKind::GatewayBindAddressMap
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_resolve_to_their_kind() {
        assert_eq!(ValueKind::of::<String>(), ValueKind::String);
        assert_eq!(ValueKind::of::<Option<Duration>>(), ValueKind::OptionalDuration);
        assert_eq!(ValueKind::of::<Option<u16>>(), ValueKind::OptionalU16);
        assert_eq!(
            ValueKind::of::<HashMap<String, VolumeRequest>>(),
            ValueKind::VolumeRequestMap
        );
    }

    #[test]
    fn other_types_are_unsupported_by_name() {
        assert_eq!(ValueKind::of::<f64>(), ValueKind::Unsupported("f64"));
        assert!(matches!(
            ValueKind::of::<Vec<i64>>(),
            ValueKind::Unsupported(name) if name.contains("Vec<i64>")
        ));
    }

    #[test]
    fn kind_groups() {
        assert!(ValueKind::OptionalString.is_string());
        assert!(!ValueKind::JobType.is_string());
        assert!(ValueKind::JsonMap.is_mapping());
        assert!(!ValueKind::StringList.is_mapping());
    }
}
