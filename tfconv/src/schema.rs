//! Schema types for tfconv
//!
//! A [`Schema`] is what a provider advertises for one resource kind: a root
//! [`Block`] of attributes and nested blocks. Schemas produced by a
//! [`Converter`](crate::Converter) list attributes sorted by name so the
//! document is deterministic; nested blocks keep their declaration order.

use crate::attribute_type::AttributeType;
use serde_json::{json, Value};

/// Schema is returned for each resource kind.
/// Version is used for state migration.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

impl Schema {
    /// Render in the shape of `terraform providers schema -json`
    pub fn to_json(&self) -> Value {
        json!({
            "version": self.version,
            "block": self.block.to_json(),
        })
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
}

impl Block {
    pub fn builder() -> BlockBuilder {
        BlockBuilder::new()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn block_type(&self, name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|block| block.type_name == name)
    }

    /// Type of a value conforming to this block
    pub fn implied_type(&self) -> AttributeType {
        let attributes = self
            .attributes
            .iter()
            .map(|attr| (attr.name.clone(), attr.r#type.clone()));
        let blocks = self
            .block_types
            .iter()
            .map(|block| (block.type_name.clone(), block.implied_type()));
        AttributeType::object(attributes.chain(blocks))
    }

    fn to_json(&self) -> Value {
        let mut out = serde_json::Map::new();
        if !self.attributes.is_empty() {
            let attributes: serde_json::Map<String, Value> = self
                .attributes
                .iter()
                .map(|attr| (attr.name.clone(), attr.to_json()))
                .collect();
            out.insert("attributes".to_string(), Value::Object(attributes));
        }
        if !self.block_types.is_empty() {
            let blocks: serde_json::Map<String, Value> = self
                .block_types
                .iter()
                .map(|block| (block.type_name.clone(), block.to_json()))
                .collect();
            out.insert("block_types".to_string(), Value::Object(blocks));
        }
        Value::Object(out)
    }
}

/// Attribute represents a single configuration attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub optional: bool,
}

impl Attribute {
    pub fn optional(name: impl Into<String>, r#type: AttributeType) -> Self {
        Self {
            name: name.into(),
            r#type,
            optional: true,
        }
    }

    fn to_json(&self) -> Value {
        let mut out = serde_json::Map::new();
        out.insert("type".to_string(), self.r#type.to_json());
        if self.optional {
            out.insert("optional".to_string(), Value::Bool(true));
        }
        Value::Object(out)
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone, PartialEq)]
pub struct NestedBlock {
    pub type_name: String,
    pub nesting: NestingMode,
    pub block: Block,
}

impl NestedBlock {
    pub fn implied_type(&self) -> AttributeType {
        let object = self.block.implied_type();
        match self.nesting {
            NestingMode::Single => object,
            NestingMode::List => AttributeType::list(object),
            NestingMode::Map => AttributeType::map(object),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "nesting_mode": self.nesting.as_str(),
            "block": self.block.to_json(),
        })
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    /// Zero or one occurrence
    Single,
    /// Ordered occurrences
    List,
    /// Occurrences keyed by their label
    Map,
}

impl NestingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NestingMode::Single => "single",
            NestingMode::List => "list",
            NestingMode::Map => "map",
        }
    }
}

/// BlockBuilder assembles a block; attributes come out sorted by name
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self {
            block: Block {
                version: 0,
                attributes: Vec::new(),
                block_types: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.block.block_types.push(block);
        self
    }

    pub fn build(mut self) -> Block {
        self.block.attributes.sort_by(|a, b| a.name.cmp(&b.name));
        self.block
    }

    pub fn build_schema(self) -> Schema {
        let block = self.build();
        Schema {
            version: block.version,
            block,
        }
    }
}

impl std::default::Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}
