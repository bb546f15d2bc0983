//! Attribute codec registry
//!
//! Maps a [`ValueKind`] to a constructor for the codec that moves a field of
//! that kind to and from the wire. The table is fixed and built once; a kind
//! that is not in it cannot be converted.

use crate::attribute_type::AttributeType;
use crate::duration;
use crate::error::{ConversionError, SchemaError};
use crate::kind::ValueKind;
use crate::nomad::{GatewayBindAddress, JobType, LabeledObject, VolumeRequest};
use crate::record::FieldDescriptor;
use crate::types::Dynamic;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

/// A field value with a wire representation
pub(crate) trait AttributeValue: Any {
    fn wire_type() -> AttributeType;

    fn to_dynamic(&self) -> Result<Dynamic, ConversionError>;

    /// Overwrite from a non-null wire value
    fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError>;

    /// Apply a null wire value; most kinds keep their current value
    fn read_null(&mut self) {}
}

/// A value that is never absent on the wire when set
pub(crate) trait Scalar: Sized {
    fn wire_type() -> AttributeType;

    fn encode(&self) -> Dynamic;

    fn decode(value: &Dynamic) -> Result<Self, ConversionError>;
}

impl Scalar for String {
    fn wire_type() -> AttributeType {
        AttributeType::String
    }

    fn encode(&self) -> Dynamic {
        Dynamic::String(self.clone())
    }

    fn decode(value: &Dynamic) -> Result<Self, ConversionError> {
        value.as_str().map(str::to_string)
    }
}

impl Scalar for bool {
    fn wire_type() -> AttributeType {
        AttributeType::Bool
    }

    fn encode(&self) -> Dynamic {
        Dynamic::Bool(*self)
    }

    fn decode(value: &Dynamic) -> Result<Self, ConversionError> {
        value.as_bool()
    }
}

impl Scalar for JobType {
    fn wire_type() -> AttributeType {
        AttributeType::String
    }

    fn encode(&self) -> Dynamic {
        Dynamic::String(self.as_str().to_string())
    }

    fn decode(value: &Dynamic) -> Result<Self, ConversionError> {
        value.as_str()?.parse()
    }
}

// Narrowing follows `as` casts: out-of-range integers wrap, while fractional
// and out-of-range floats truncate and saturate.
macro_rules! integer_scalars {
    ($($int:ty),* $(,)?) => {
        $(
            impl Scalar for $int {
                fn wire_type() -> AttributeType {
                    AttributeType::Number
                }

                fn encode(&self) -> Dynamic {
                    Dynamic::Number((*self).into())
                }

                fn decode(value: &Dynamic) -> Result<Self, ConversionError> {
                    let number = value.as_number()?;
                    Ok(if let Some(n) = number.as_i64() {
                        n as $int
                    } else if let Some(n) = number.as_u64() {
                        n as $int
                    } else {
                        number.as_f64().unwrap_or_default() as $int
                    })
                }
            }
        )*
    };
}

integer_scalars!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! scalar_values {
    ($($scalar:ty),* $(,)?) => {
        $(
            impl AttributeValue for $scalar {
                fn wire_type() -> AttributeType {
                    <$scalar as Scalar>::wire_type()
                }

                fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
                    Ok(self.encode())
                }

                fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
                    *self = <$scalar as Scalar>::decode(value)?;
                    Ok(())
                }
            }

            impl AttributeValue for Option<$scalar> {
                fn wire_type() -> AttributeType {
                    <$scalar as Scalar>::wire_type()
                }

                fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
                    Ok(self.as_ref().map_or(Dynamic::Null, Scalar::encode))
                }

                fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
                    *self = Some(<$scalar as Scalar>::decode(value)?);
                    Ok(())
                }
            }
        )*
    };
}

scalar_values!(String, bool, i8, i16, i32, i64, u8, u16, u32, u64);

// Not a Scalar: writing fails for durations the text form cannot carry.
impl AttributeValue for Duration {
    fn wire_type() -> AttributeType {
        AttributeType::String
    }

    fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
        duration::to_text(*self).map(Dynamic::String)
    }

    fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
        *self = duration::parse(value.as_str()?)?;
        Ok(())
    }
}

impl AttributeValue for Option<Duration> {
    fn wire_type() -> AttributeType {
        AttributeType::String
    }

    fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
        self.as_ref()
            .map_or(Ok(Dynamic::Null), <Duration as AttributeValue>::to_dynamic)
    }

    fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
        *self = Some(duration::parse(value.as_str()?)?);
        Ok(())
    }
}

impl AttributeValue for JobType {
    fn wire_type() -> AttributeType {
        <JobType as Scalar>::wire_type()
    }

    fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
        Ok(self.encode())
    }

    fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
        *self = <JobType as Scalar>::decode(value)?;
        Ok(())
    }
}

fn encode_strings(values: &[String]) -> Dynamic {
    Dynamic::List(values.iter().map(Scalar::encode).collect())
}

fn decode_strings(value: &Dynamic) -> Result<Vec<String>, ConversionError> {
    value.as_list()?.iter().map(String::decode).collect()
}

impl AttributeValue for Vec<String> {
    fn wire_type() -> AttributeType {
        AttributeType::list(AttributeType::String)
    }

    fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
        Ok(encode_strings(self))
    }

    fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
        *self = decode_strings(value)?;
        Ok(())
    }

    fn read_null(&mut self) {
        self.clear();
    }
}

impl AttributeValue for Option<Vec<String>> {
    fn wire_type() -> AttributeType {
        AttributeType::list(AttributeType::String)
    }

    fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
        Ok(self.as_deref().map_or(Dynamic::Null, encode_strings))
    }

    fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
        *self = Some(decode_strings(value)?);
        Ok(())
    }

    fn read_null(&mut self) {
        *self = None;
    }
}

/// Map kinds write an empty map as null
fn encode_entries<V>(
    map: &HashMap<String, V>,
    encode: impl Fn(&V) -> Dynamic,
) -> Dynamic {
    if map.is_empty() {
        return Dynamic::Null;
    }
    Dynamic::Map(
        map.iter()
            .map(|(key, value)| (key.clone(), encode(value)))
            .collect(),
    )
}

fn decode_entries<V>(
    value: &Dynamic,
    decode: impl Fn(&str, &Dynamic) -> Result<V, ConversionError>,
) -> Result<HashMap<String, V>, ConversionError> {
    value
        .as_map()?
        .iter()
        .map(|(key, entry)| {
            decode(key, entry)
                .map(|decoded| (key.clone(), decoded))
                .map_err(|e| e.at(key))
        })
        .collect()
}

impl AttributeValue for HashMap<String, String> {
    fn wire_type() -> AttributeType {
        AttributeType::map(AttributeType::String)
    }

    fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
        Ok(encode_entries(self, Scalar::encode))
    }

    fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
        *self = decode_entries(value, |_, entry| String::decode(entry))?;
        Ok(())
    }
}

impl AttributeValue for HashMap<String, Vec<String>> {
    fn wire_type() -> AttributeType {
        AttributeType::map(AttributeType::list(AttributeType::String))
    }

    fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
        Ok(encode_entries(self, |values| encode_strings(values)))
    }

    fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
        *self = decode_entries(value, |_, entry| decode_strings(entry))?;
        Ok(())
    }
}

/// Free-form document carried as JSON text in a string attribute
impl AttributeValue for HashMap<String, serde_json::Value> {
    fn wire_type() -> AttributeType {
        AttributeType::String
    }

    fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
        if self.is_empty() {
            return Ok(Dynamic::Null);
        }
        serde_json::to_string(self)
            .map(Dynamic::String)
            .map_err(ConversionError::JsonEncoding)
    }

    fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
        let document: Option<HashMap<String, serde_json::Value>> =
            serde_json::from_str(value.as_str()?).map_err(ConversionError::InvalidJson)?;
        *self = document.unwrap_or_default();
        Ok(())
    }
}

macro_rules! labeled_maps {
    ($($record:ty),* $(,)?) => {
        $(
            impl AttributeValue for HashMap<String, $record> {
                fn wire_type() -> AttributeType {
                    AttributeType::map(<$record as LabeledObject>::object_type())
                }

                fn to_dynamic(&self) -> Result<Dynamic, ConversionError> {
                    Ok(encode_entries(self, LabeledObject::to_object))
                }

                fn read_dynamic(&mut self, value: &Dynamic) -> Result<(), ConversionError> {
                    *self = decode_entries(value, |key, entry| {
                        let mut record = <$record>::default();
                        if !entry.is_null() {
                            record.read_object(entry)?;
                        }
                        record.set_name(key);
                        Ok(record)
                    })?;
                    Ok(())
                }
            }
        )*
    };
}

labeled_maps!(VolumeRequest, GatewayBindAddress);

/// Type-erased codec for one attribute field
#[derive(Clone)]
pub(crate) struct AttributeCodec {
    wire_type: AttributeType,
    encode: fn(&dyn Any) -> Result<Dynamic, ConversionError>,
    decode: fn(&Dynamic, &mut dyn Any) -> Result<(), ConversionError>,
}

impl AttributeCodec {
    fn of<T: AttributeValue>() -> Self {
        Self {
            wire_type: T::wire_type(),
            encode: encode_field::<T>,
            decode: decode_field::<T>,
        }
    }

    pub(crate) fn wire_type(&self) -> &AttributeType {
        &self.wire_type
    }

    pub(crate) fn encode(&self, field: &dyn Any) -> Result<Dynamic, ConversionError> {
        (self.encode)(field)
    }

    pub(crate) fn decode(
        &self,
        value: &Dynamic,
        field: &mut dyn Any,
    ) -> Result<(), ConversionError> {
        (self.decode)(value, field)
    }
}

fn encode_field<T: AttributeValue>(field: &dyn Any) -> Result<Dynamic, ConversionError> {
    field
        .downcast_ref::<T>()
        .ok_or_else(|| ConversionError::mismatch(type_name::<T>(), "field of another type"))?
        .to_dynamic()
}

fn decode_field<T: AttributeValue>(
    value: &Dynamic,
    field: &mut dyn Any,
) -> Result<(), ConversionError> {
    let field = field
        .downcast_mut::<T>()
        .ok_or_else(|| ConversionError::mismatch(type_name::<T>(), "field of another type"))?;
    match value {
        Dynamic::Null => {
            field.read_null();
            Ok(())
        }
        value => field.read_dynamic(value),
    }
}

pub(crate) type CodecConstructor = fn() -> AttributeCodec;

macro_rules! codec_table {
    ($($kind:ident => $ty:ty),* $(,)?) => {
        fn table() -> &'static HashMap<ValueKind, CodecConstructor> {
            static CODECS: OnceLock<HashMap<ValueKind, CodecConstructor>> = OnceLock::new();
            CODECS.get_or_init(|| {
                HashMap::from([
                    $((ValueKind::$kind, AttributeCodec::of::<$ty> as CodecConstructor)),*
                ])
            })
        }
    };
}

codec_table! {
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

pub(crate) fn lookup(kind: ValueKind) -> Option<CodecConstructor> {
    table().get(&kind).copied()
}

/// Codec for a field, or the reason the field cannot have one
pub(crate) fn resolve<R>(field: &FieldDescriptor<R>) -> Result<AttributeCodec, SchemaError> {
    let constructor = lookup(field.kind).ok_or(SchemaError::UnknownType {
        record: type_name::<R>(),
        field: field.name,
        type_name: field.type_name,
    })?;
    Ok(constructor())
}
