//! Nested blocks
//!
//! A block field holds nested records in an `Option<E>` or a `Vec<E>`. The
//! element type picks the nesting mode: an element with a label becomes a map
//! block keyed by that label, otherwise a `Vec` is a list block and an
//! `Option` a single block. Each block owns a converter for its element type.

use crate::converter::{BuildContext, Converter};
use crate::error::{ConversionError, SchemaError};
use crate::record::Nested;
use crate::schema::{Block, NestingMode};
use crate::types::Dynamic;
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// Builds the codec for one block field, recursing into the element type
pub(crate) type BlockFactory = fn(&mut BuildContext) -> Result<Box<dyn BlockCodec>, SchemaError>;

/// Type-erased codec for one block field
pub(crate) trait BlockCodec: Send + Sync {
    fn nesting(&self) -> NestingMode;

    /// Schema of one element
    fn block(&self) -> &Block;

    fn encode(&self, field: &dyn Any) -> Result<Dynamic, ConversionError>;

    /// Null leaves the field as it is; anything else replaces it
    fn decode(&self, value: &Dynamic, field: &mut dyn Any) -> Result<(), ConversionError>;
}

pub(crate) fn build_block<C: Nested>(
    ctx: &mut BuildContext,
) -> Result<Box<dyn BlockCodec>, SchemaError> {
    let converter = Converter::<C::Element>::build_in(ctx)?;

    let codec: Box<dyn BlockCodec> = if converter.label().is_some() {
        Box::new(MapBlock::<C>::new(converter))
    } else if C::REPEATED {
        Box::new(ListBlock::<C>::new(converter))
    } else {
        Box::new(SingleBlock::<C>::new(converter))
    };
    tracing::trace!(
        "{} nested as {} block",
        type_name::<C::Element>(),
        codec.nesting().as_str()
    );
    Ok(codec)
}

fn container<C: Nested>(field: &dyn Any) -> Result<&C, ConversionError> {
    field
        .downcast_ref::<C>()
        .ok_or_else(|| ConversionError::mismatch(type_name::<C>(), "field of another type"))
}

fn container_mut<C: Nested>(field: &mut dyn Any) -> Result<&mut C, ConversionError> {
    field
        .downcast_mut::<C>()
        .ok_or_else(|| ConversionError::mismatch(type_name::<C>(), "field of another type"))
}

/// Elements keyed by their label
struct MapBlock<C: Nested> {
    converter: Converter<C::Element>,
    _container: PhantomData<fn() -> C>,
}

impl<C: Nested> MapBlock<C> {
    fn new(converter: Converter<C::Element>) -> Self {
        Self {
            converter,
            _container: PhantomData,
        }
    }
}

impl<C: Nested> BlockCodec for MapBlock<C> {
    fn nesting(&self) -> NestingMode {
        NestingMode::Map
    }

    fn block(&self) -> &Block {
        &self.converter.schema().block
    }

    fn encode(&self, field: &dyn Any) -> Result<Dynamic, ConversionError> {
        let mut entries = BTreeMap::new();
        for element in container::<C>(field)?.elements() {
            let label = self.converter.label_of(element)?;
            let object = self
                .converter
                .encode_record(element)
                .map_err(|e| e.at(&label))?;
            if entries.insert(label.clone(), object).is_some() {
                tracing::warn!(
                    "duplicate label {:?} in {} block, keeping the last element",
                    label,
                    type_name::<C::Element>()
                );
            }
        }
        Ok(Dynamic::Map(entries))
    }

    // Elements come out sorted by label, the iteration order of wire maps.
    fn decode(&self, value: &Dynamic, field: &mut dyn Any) -> Result<(), ConversionError> {
        let field = container_mut::<C>(field)?;
        if value.is_null() {
            return Ok(());
        }

        let entries = value.as_map()?;
        if !C::REPEATED && entries.len() > 1 {
            tracing::warn!(
                "{} labeled blocks for a single {}, keeping the last label",
                entries.len(),
                type_name::<C::Element>()
            );
        }

        let mut decoded = C::default();
        for (label, object) in entries {
            let mut element = C::Element::default();
            self.converter
                .decode_record(object, &mut element)
                .map_err(|e| e.at(label))?;
            self.converter.set_label(&mut element, label);
            Nested::insert(&mut decoded, element);
        }
        *field = decoded;
        Ok(())
    }
}

/// Ordered elements
struct ListBlock<C: Nested> {
    converter: Converter<C::Element>,
    _container: PhantomData<fn() -> C>,
}

impl<C: Nested> ListBlock<C> {
    fn new(converter: Converter<C::Element>) -> Self {
        Self {
            converter,
            _container: PhantomData,
        }
    }
}

impl<C: Nested> BlockCodec for ListBlock<C> {
    fn nesting(&self) -> NestingMode {
        NestingMode::List
    }

    fn block(&self) -> &Block {
        &self.converter.schema().block
    }

    fn encode(&self, field: &dyn Any) -> Result<Dynamic, ConversionError> {
        let objects = container::<C>(field)?
            .elements()
            .into_iter()
            .enumerate()
            .map(|(idx, element)| {
                self.converter
                    .encode_record(element)
                    .map_err(|e| e.at(&idx.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Dynamic::List(objects))
    }

    fn decode(&self, value: &Dynamic, field: &mut dyn Any) -> Result<(), ConversionError> {
        let field = container_mut::<C>(field)?;
        if value.is_null() {
            return Ok(());
        }

        let mut decoded = C::default();
        for (idx, object) in value.as_list()?.iter().enumerate() {
            let mut element = C::Element::default();
            self.converter
                .decode_record(object, &mut element)
                .map_err(|e| e.at(&idx.to_string()))?;
            Nested::insert(&mut decoded, element);
        }
        *field = decoded;
        Ok(())
    }
}

/// At most one element
struct SingleBlock<C: Nested> {
    converter: Converter<C::Element>,
    _container: PhantomData<fn() -> C>,
}

impl<C: Nested> SingleBlock<C> {
    fn new(converter: Converter<C::Element>) -> Self {
        Self {
            converter,
            _container: PhantomData,
        }
    }
}

impl<C: Nested> BlockCodec for SingleBlock<C> {
    fn nesting(&self) -> NestingMode {
        NestingMode::Single
    }

    fn block(&self) -> &Block {
        &self.converter.schema().block
    }

    // An absent element is still written as an object, with every value null.
    fn encode(&self, field: &dyn Any) -> Result<Dynamic, ConversionError> {
        match container::<C>(field)?.elements().first() {
            Some(element) => self.converter.encode_record(element),
            None => Ok(self.converter.null_object()),
        }
    }

    fn decode(&self, value: &Dynamic, field: &mut dyn Any) -> Result<(), ConversionError> {
        let field = container_mut::<C>(field)?;
        if value.is_null() {
            return Ok(());
        }

        let mut element = C::Element::default();
        self.converter.decode_record(value, &mut element)?;
        let mut decoded = C::default();
        Nested::insert(&mut decoded, element);
        *field = decoded;
        Ok(())
    }
}
