//! Record converter
//!
//! A [`Converter`] is built once per record type. Building classifies the
//! record's fields, resolves a codec for each of them and derives the schema;
//! afterwards the converter is immutable and can be shared between threads.
//!
//! ```rust,ignore
//! let converter = Converter::<Job>::build()?;
//! let wire = converter.to_wire(&job)?;
//! let job: Job = converter.decode(&wire)?;
//! ```
//!
//! Decoding stops at the first error. The destination may then be partly
//! overwritten.

use crate::attribute_type::AttributeType;
use crate::block::BlockCodec;
use crate::classify::{self, ClassifiedField};
use crate::error::{ConversionError, SchemaError};
use crate::options::ConverterOptions;
use crate::record::{Record, Role, Slot};
use crate::registry::{self, AttributeCodec};
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::types::{Dynamic, DynamicValue};
use std::any::{type_name, TypeId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// State carried through one recursive build
pub(crate) struct BuildContext {
    options: ConverterOptions,
    ancestors: Vec<TypeId>,
}

impl BuildContext {
    pub(crate) fn new(options: ConverterOptions) -> Self {
        Self {
            options,
            ancestors: Vec::new(),
        }
    }

    fn enter<R: Record>(&mut self) -> Result<(), SchemaError> {
        let record = type_name::<R>();
        if self.ancestors.contains(&TypeId::of::<R>()) {
            return Err(SchemaError::RecursiveRecord { record });
        }
        if self.ancestors.len() >= self.options.max_depth {
            return Err(SchemaError::DepthExceeded {
                record,
                limit: self.options.max_depth,
            });
        }
        self.ancestors.push(TypeId::of::<R>());
        Ok(())
    }

    fn leave(&mut self) {
        self.ancestors.pop();
    }
}

enum Codec {
    Attribute(AttributeCodec),
    Block(Box<dyn BlockCodec>),
}

struct FieldCodec<R> {
    field_name: &'static str,
    wire_name: &'static str,
    slot: Arc<dyn Slot<R>>,
    codec: Codec,
}

struct LabelSlot<R> {
    wire_name: &'static str,
    slot: Arc<dyn Slot<R>>,
}

/// Converts between a record type and its wire values
pub struct Converter<R: Record> {
    schema: Schema,
    object_type: AttributeType,
    codecs: Vec<FieldCodec<R>>,
    label: Option<LabelSlot<R>>,
    options: ConverterOptions,
}

impl<R: Record> Converter<R> {
    /// Build with default options
    pub fn build() -> Result<Self, SchemaError> {
        Self::build_with(ConverterOptions::default())
    }

    pub fn build_with(options: ConverterOptions) -> Result<Self, SchemaError> {
        Self::build_in(&mut BuildContext::new(options))
    }

    pub(crate) fn build_in(ctx: &mut BuildContext) -> Result<Self, SchemaError> {
        ctx.enter::<R>()?;
        let converter = Self::assemble(ctx);
        ctx.leave();
        converter
    }

    fn assemble(ctx: &mut BuildContext) -> Result<Self, SchemaError> {
        let fields = R::fields();
        let fields = fields.as_slice();
        let record = type_name::<R>();

        let label = classify::label_field(fields)?.map(|field| LabelSlot {
            wire_name: field.wire_name,
            slot: Arc::clone(&field.descriptor.slot),
        });

        let mut builder = Block::builder().version(ctx.options.schema_version);
        let mut codecs = Vec::new();

        for field in classify::classify(Role::Attribute, fields)? {
            let codec = registry::resolve(field.descriptor)?;
            tracing::trace!(
                "{}.{} -> {} ({})",
                record,
                field.descriptor.name,
                field.wire_name,
                codec.wire_type()
            );
            builder = builder.attribute(Attribute::optional(
                field.wire_name,
                codec.wire_type().clone(),
            ));
            codecs.push(Self::field_codec(&field, Codec::Attribute(codec)));
        }

        for field in classify::classify(Role::Block, fields)? {
            let codec = match field.descriptor.nested {
                Some(factory) => Codec::Block(factory(ctx)?),
                // Maps have no block form; they stay attributes.
                None if field.descriptor.kind.is_mapping() => {
                    Codec::Attribute(registry::resolve(field.descriptor)?)
                }
                None => {
                    return Err(SchemaError::UnknownType {
                        record,
                        field: field.descriptor.name,
                        type_name: field.descriptor.type_name,
                    })
                }
            };
            builder = match &codec {
                Codec::Attribute(attribute) => builder.attribute(Attribute::optional(
                    field.wire_name,
                    attribute.wire_type().clone(),
                )),
                Codec::Block(block) => builder.block(NestedBlock {
                    type_name: field.wire_name.to_string(),
                    nesting: block.nesting(),
                    block: block.block().clone(),
                }),
            };
            codecs.push(Self::field_codec(&field, codec));
        }

        let schema = builder.build_schema();
        let object_type = schema.block.implied_type();
        tracing::debug!(
            "built converter for {}: {} attributes, {} blocks",
            record,
            schema.block.attributes.len(),
            schema.block.block_types.len()
        );

        Ok(Self {
            schema,
            object_type,
            codecs,
            label,
            options: ctx.options,
        })
    }

    fn field_codec(field: &ClassifiedField<'_, R>, codec: Codec) -> FieldCodec<R> {
        FieldCodec {
            field_name: field.descriptor.name,
            wire_name: field.wire_name,
            slot: Arc::clone(&field.descriptor.slot),
            codec,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Type of every value produced by [`Converter::to_wire`]
    pub fn object_type(&self) -> &AttributeType {
        &self.object_type
    }

    /// Wire name of the label field
    pub fn label(&self) -> Option<&str> {
        self.label.as_ref().map(|label| label.wire_name)
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Encode `record` as a self-typed object value.
    ///
    /// A `None` single block is written as an object of nulls, so it reads
    /// back as `Some` with every field at its default.
    pub fn to_wire(&self, record: &R) -> Result<DynamicValue, ConversionError> {
        let value = self.encode_record(record)?;
        Ok(DynamicValue::new(self.object_type.clone(), value))
    }

    /// Overwrite `record` from a wire value; a null value changes nothing
    pub fn from_wire(&self, value: &DynamicValue, record: &mut R) -> Result<(), ConversionError> {
        self.decode_record(&value.value, record)
    }

    /// Decode into a default record
    pub fn decode(&self, value: &DynamicValue) -> Result<R, ConversionError> {
        let mut record = R::default();
        self.from_wire(value, &mut record)?;
        Ok(record)
    }

    pub(crate) fn encode_record(&self, record: &R) -> Result<Dynamic, ConversionError> {
        let mut object = BTreeMap::new();
        for field in &self.codecs {
            let value = field.slot.get(record);
            let encoded = match &field.codec {
                Codec::Attribute(codec) => codec.encode(value),
                Codec::Block(codec) => codec.encode(value),
            }
            .map_err(|e| e.at(field.wire_name))?;
            object.insert(field.wire_name.to_string(), encoded);
        }
        Ok(Dynamic::Map(object))
    }

    pub(crate) fn decode_record(
        &self,
        value: &Dynamic,
        record: &mut R,
    ) -> Result<(), ConversionError> {
        if value.is_null() {
            return Ok(());
        }

        let object = value.as_map()?;
        for field in &self.codecs {
            let encoded = object
                .get(field.wire_name)
                .ok_or_else(|| ConversionError::MissingAttribute(field.wire_name.to_string()))?;
            let target = field.slot.get_mut(record);
            match &field.codec {
                Codec::Attribute(codec) => codec.decode(encoded, target),
                Codec::Block(codec) => codec.decode(encoded, target),
            }
            .map_err(|e| {
                tracing::trace!("decoding {} failed: {}", field.field_name, e);
                e.at(field.wire_name)
            })?;
        }
        Ok(())
    }

    /// Object of this record's shape with every value null
    pub(crate) fn null_object(&self) -> Dynamic {
        Dynamic::object(
            self.codecs
                .iter()
                .map(|field| (field.wire_name, Dynamic::Null)),
        )
    }

    pub(crate) fn label_of(&self, record: &R) -> Result<String, ConversionError> {
        let label = self.label.as_ref().ok_or(ConversionError::MissingLabel)?;
        let value = label.slot.get(record);
        if let Some(text) = value.downcast_ref::<String>() {
            return Ok(text.clone());
        }
        match value.downcast_ref::<Option<String>>() {
            Some(Some(text)) => Ok(text.clone()),
            _ => Err(ConversionError::MissingLabel),
        }
    }

    pub(crate) fn set_label(&self, record: &mut R, text: &str) {
        let Some(label) = &self.label else {
            return;
        };
        let value = label.slot.get_mut(record);
        if let Some(target) = value.downcast_mut::<String>() {
            *target = text.to_string();
        } else if let Some(target) = value.downcast_mut::<Option<String>>() {
            *target = Some(text.to_string());
        }
    }
}
