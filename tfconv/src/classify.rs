//! Field classification
//!
//! Sorts a record's declared fields into labels, attributes and blocks by their
//! tags. Untagged fields are ignored. Every entry point validates the label
//! first, so a record with a bad label is rejected however it is queried.

use crate::error::SchemaError;
use crate::record::{FieldDescriptor, FieldTag, Record, Role};
use std::any::type_name;
use std::collections::HashSet;

/// A tagged field together with its wire name
pub(crate) struct ClassifiedField<'a, R> {
    pub(crate) wire_name: &'static str,
    pub(crate) descriptor: &'a FieldDescriptor<R>,
}

/// Fields with the given role, in declaration order
pub(crate) fn classify<R: Record>(
    role: Role,
    fields: &[FieldDescriptor<R>],
) -> Result<Vec<ClassifiedField<'_, R>>, SchemaError> {
    label_field(fields)?;
    Ok(tagged(fields)?
        .into_iter()
        .filter(|(tag, _)| tag.role == role)
        .map(|(tag, descriptor)| ClassifiedField {
            wire_name: tag.wire_name,
            descriptor,
        })
        .collect())
}

/// The record's label field, if it has one
pub(crate) fn label_field<R: Record>(
    fields: &[FieldDescriptor<R>],
) -> Result<Option<ClassifiedField<'_, R>>, SchemaError> {
    let mut labels = tagged(fields)?
        .into_iter()
        .filter(|(tag, _)| tag.role == Role::Label);

    let Some((tag, descriptor)) = labels.next() else {
        return Ok(None);
    };
    if labels.next().is_some() {
        return Err(SchemaError::MultipleLabels {
            record: type_name::<R>(),
        });
    }
    if !descriptor.kind.is_string() {
        return Err(SchemaError::WrongLabelType {
            record: type_name::<R>(),
            field: descriptor.name,
            type_name: descriptor.type_name,
        });
    }

    Ok(Some(ClassifiedField {
        wire_name: tag.wire_name,
        descriptor,
    }))
}

fn tagged<R: Record>(
    fields: &[FieldDescriptor<R>],
) -> Result<Vec<(FieldTag, &FieldDescriptor<R>)>, SchemaError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(tag) = field.tag else {
            continue;
        };
        let tag = FieldTag::parse::<R>(field.name, tag)?;
        if !seen.insert(tag.wire_name) {
            return Err(SchemaError::DuplicateName {
                record: type_name::<R>(),
                name: tag.wire_name,
            });
        }
        out.push((tag, field));
    }
    Ok(out)
}
