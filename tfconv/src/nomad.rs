//! Nomad API shapes with a fixed wire representation
//!
//! Maps of [`VolumeRequest`] and [`GatewayBindAddress`] are attributes, not
//! blocks: each entry travels as an object keyed by the record's name, and the
//! name itself is not part of the object.

use crate::attribute_type::AttributeType;
use crate::error::ConversionError;
use crate::registry::Scalar;
use crate::types::Dynamic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of scheduler a job runs under
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    #[default]
    Service,
    Batch,
    System,
    Sysbatch,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Service => "service",
            JobType::Batch => "batch",
            JobType::System => "system",
            JobType::Sysbatch => "sysbatch",
        }
    }
}

impl FromStr for JobType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service" => Ok(JobType::Service),
            "batch" => Ok(JobType::Batch),
            "system" => Ok(JobType::System),
            "sysbatch" => Ok(JobType::Sysbatch),
            other => Err(ConversionError::InvalidEnum {
                kind: "job type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Volume a task group asks for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeRequest {
    pub name: String,
    #[serde(rename = "Type")]
    pub type_: String,
    pub source: String,
    pub read_only: bool,
    pub access_mode: String,
    pub attachment_mode: String,
    pub per_alloc: bool,
}

/// Listener address of an ingress gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GatewayBindAddress {
    pub name: String,
    pub address: String,
    pub port: i32,
}

/// Record stored as the value of a string-keyed map, named by its key
pub(crate) trait LabeledObject: Default {
    fn object_type() -> AttributeType;

    fn set_name(&mut self, name: &str);

    fn to_object(&self) -> Dynamic;

    /// Overwrite the fields present and non-null in `object`
    fn read_object(&mut self, object: &Dynamic) -> Result<(), ConversionError>;
}

impl LabeledObject for VolumeRequest {
    fn object_type() -> AttributeType {
        AttributeType::object([
            ("type", AttributeType::String),
            ("source", AttributeType::String),
            ("read_only", AttributeType::Bool),
            ("access_mode", AttributeType::String),
            ("attachment_mode", AttributeType::String),
            ("per_alloc", AttributeType::Bool),
        ])
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn to_object(&self) -> Dynamic {
        Dynamic::object([
            ("type", self.type_.encode()),
            ("source", self.source.encode()),
            ("read_only", self.read_only.encode()),
            ("access_mode", self.access_mode.encode()),
            ("attachment_mode", self.attachment_mode.encode()),
            ("per_alloc", self.per_alloc.encode()),
        ])
    }

    fn read_object(&mut self, object: &Dynamic) -> Result<(), ConversionError> {
        object.as_map()?;
        read_field(object, "type", &mut self.type_)?;
        read_field(object, "source", &mut self.source)?;
        read_field(object, "read_only", &mut self.read_only)?;
        read_field(object, "access_mode", &mut self.access_mode)?;
        read_field(object, "attachment_mode", &mut self.attachment_mode)?;
        read_field(object, "per_alloc", &mut self.per_alloc)
    }
}

impl LabeledObject for GatewayBindAddress {
    fn object_type() -> AttributeType {
        AttributeType::object([
            ("address", AttributeType::String),
            ("port", AttributeType::Number),
        ])
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn to_object(&self) -> Dynamic {
        Dynamic::object([
            ("address", self.address.encode()),
            ("port", self.port.encode()),
        ])
    }

    fn read_object(&mut self, object: &Dynamic) -> Result<(), ConversionError> {
        object.as_map()?;
        read_field(object, "address", &mut self.address)?;
        read_field(object, "port", &mut self.port)
    }
}

fn read_field<T: Scalar>(
    object: &Dynamic,
    name: &str,
    target: &mut T,
) -> Result<(), ConversionError> {
    match object.get(name) {
        None | Some(Dynamic::Null) => Ok(()),
        Some(value) => {
            *target = T::decode(value).map_err(|e| e.at(name))?;
            Ok(())
        }
    }
}
