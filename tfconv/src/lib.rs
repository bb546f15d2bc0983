//! tfconv - Terraform schema and value conversion for Rust records
//!
//! Derives a Terraform schema from a record type's field declarations and
//! converts record instances to and from Terraform's self-typed wire values.

// Core modules
pub mod attribute_type;
pub mod error;
pub mod schema;
pub mod types;

// Record description
pub mod kind;
pub mod record;

// Conversion
mod block;
mod classify;
pub mod converter;
pub mod options;
mod registry;

// Value formats
pub mod duration;
pub mod nomad;

// Helper modules
pub mod builders;

// Re-exports for convenience
pub use attribute_type::AttributeType;
pub use builders::ObjectBuilder;
pub use converter::Converter;
pub use error::{ConversionError, Result, SchemaError, TfconvError};
pub use kind::ValueKind;
pub use nomad::{GatewayBindAddress, JobType, VolumeRequest};
pub use options::ConverterOptions;
pub use record::{FieldDescriptor, FieldTag, Fields, Nested, Record, Role};
pub use schema::{Attribute, Block, BlockBuilder, NestedBlock, NestingMode, Schema};
pub use types::{Dynamic, DynamicValue};
