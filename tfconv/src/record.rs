//! Record descriptions
//!
//! A record type lists its fields once through [`Record::fields`]. Each field
//! carries a tag of the form `"<wire_name>,<role>"` and a pair of plain
//! accessor functions; the converter captures those accessors when it is built
//! and never looks a field up by name afterwards.
//!
//! ```rust,ignore
//! impl Record for Port {
//!     fn fields() -> Fields<Self> {
//!         Fields::<Self>::new()
//!             .field("Label", "label,label", |p| &p.label, |p| &mut p.label)
//!             .field("To", "to,attr", |p| &p.to, |p| &mut p.to)
//!     }
//! }
//! ```

use crate::block::{self, BlockFactory};
use crate::error::SchemaError;
use crate::kind::ValueKind;
use std::any::{type_name, Any};
use std::str::FromStr;
use std::sync::Arc;

/// A configuration struct that can be described to the converter
pub trait Record: Default + Send + Sync + 'static {
    fn fields() -> Fields<Self>;
}

/// Container of nested records stored in a block field
pub trait Nested: Any + Default + Send + Sync {
    type Element: Record;

    /// Whether the container holds any number of elements
    const REPEATED: bool;

    fn elements(&self) -> Vec<&Self::Element>;

    fn insert(&mut self, element: Self::Element);
}

impl<E: Record> Nested for Vec<E> {
    type Element = E;
    const REPEATED: bool = true;

    fn elements(&self) -> Vec<&E> {
        self.iter().collect()
    }

    fn insert(&mut self, element: E) {
        self.push(element);
    }
}

impl<E: Record> Nested for Option<E> {
    type Element = E;
    const REPEATED: bool = false;

    fn elements(&self) -> Vec<&E> {
        self.iter().collect()
    }

    fn insert(&mut self, element: E) {
        *self = Some(element);
    }
}

/// Role a field plays in the derived schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Key of the record when it is nested as a map block
    Label,
    /// Leaf value
    Attribute,
    /// Nested record(s)
    Block,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "label" => Ok(Role::Label),
            "attr" => Ok(Role::Attribute),
            "block" => Ok(Role::Block),
            _ => Err(()),
        }
    }
}

/// Parsed field metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTag {
    pub wire_name: &'static str,
    pub role: Role,
}

impl FieldTag {
    pub(crate) fn parse<R: Record>(
        field: &'static str,
        tag: &'static str,
    ) -> Result<Self, SchemaError> {
        let malformed = || SchemaError::MalformedTag {
            record: type_name::<R>(),
            field,
            tag: tag.to_string(),
        };

        let parts: Vec<&'static str> = tag.split(',').collect();
        let &[wire_name, role] = parts.as_slice() else {
            return Err(malformed());
        };
        let wire_name = wire_name.trim();
        if wire_name.is_empty() {
            return Err(malformed());
        }
        let role = role.trim().parse().map_err(|_| malformed())?;

        Ok(FieldTag { wire_name, role })
    }
}

/// Type-erased access to one field of a record
pub(crate) trait Slot<R>: Send + Sync {
    fn get<'a>(&self, record: &'a R) -> &'a dyn Any;

    fn get_mut<'a>(&self, record: &'a mut R) -> &'a mut dyn Any;
}

struct Lens<R, T> {
    get: fn(&R) -> &T,
    get_mut: fn(&mut R) -> &mut T,
}

impl<R: 'static, T: Any> Slot<R> for Lens<R, T> {
    fn get<'a>(&self, record: &'a R) -> &'a dyn Any {
        (self.get)(record)
    }

    fn get_mut<'a>(&self, record: &'a mut R) -> &'a mut dyn Any {
        (self.get_mut)(record)
    }
}

/// Declaration of one record field
pub struct FieldDescriptor<R> {
    pub(crate) name: &'static str,
    pub(crate) tag: Option<&'static str>,
    pub(crate) kind: ValueKind,
    pub(crate) type_name: &'static str,
    pub(crate) slot: Arc<dyn Slot<R>>,
    pub(crate) nested: Option<BlockFactory>,
}

impl<R> FieldDescriptor<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tag(&self) -> Option<&'static str> {
        self.tag
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Ordered field declarations of a record type
pub struct Fields<R> {
    fields: Vec<FieldDescriptor<R>>,
}

impl<R: Record> Fields<R> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declare a value field
    pub fn field<T: Any>(
        self,
        name: &'static str,
        tag: &'static str,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> Self {
        self.push::<T>(name, Some(tag), Lens { get, get_mut }, None)
    }

    /// Declare a field holding nested records
    pub fn block<C: Nested>(
        self,
        name: &'static str,
        tag: &'static str,
        get: fn(&R) -> &C,
        get_mut: fn(&mut R) -> &mut C,
    ) -> Self {
        let factory: BlockFactory = block::build_block::<C>;
        self.push::<C>(name, Some(tag), Lens { get, get_mut }, Some(factory))
    }

    /// Declare a field that carries no metadata; the converter skips it
    pub fn untagged<T: Any>(
        self,
        name: &'static str,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> Self {
        self.push::<T>(name, None, Lens { get, get_mut }, None)
    }

    fn push<T: Any>(
        mut self,
        name: &'static str,
        tag: Option<&'static str>,
        lens: Lens<R, T>,
        nested: Option<BlockFactory>,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            tag,
            kind: ValueKind::of::<T>(),
            type_name: type_name::<T>(),
            slot: Arc::new(lens),
            nested,
        });
        self
    }

    pub fn as_slice(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<R: Record> Default for Fields<R> {
    fn default() -> Self {
        Self::new()
    }
}
