//! Error types for tfconv
//!
//! Two families: [`SchemaError`] is raised while a [`Converter`](crate::Converter)
//! is being built and is fatal for that record type, [`ConversionError`] is raised
//! by a single `to_wire`/`from_wire` call and aborts only that call.

/// Construction-time failure while deriving a schema from a record type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("malformed tag {tag:?} on field {field} of {record}: expected \"<name>,<role>\"")]
    MalformedTag {
        record: &'static str,
        field: &'static str,
        tag: String,
    },

    #[error("multiple labels found on {record}")]
    MultipleLabels { record: &'static str },

    #[error("wrong type for label {field} on {record}: {type_name} (expected a string)")]
    WrongLabelType {
        record: &'static str,
        field: &'static str,
        type_name: &'static str,
    },

    #[error("unknown type {type_name} for field {field} of {record}")]
    UnknownType {
        record: &'static str,
        field: &'static str,
        type_name: &'static str,
    },

    #[error("duplicate wire name {name:?} on {record}")]
    DuplicateName {
        record: &'static str,
        name: &'static str,
    },

    #[error("record type {record} contains itself")]
    RecursiveRecord { record: &'static str },

    #[error("nesting deeper than {limit} levels at {record}")]
    DepthExceeded { record: &'static str, limit: usize },
}

/// Per-call failure while translating between a record and a wire value
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("attribute {0:?} is missing from the object")]
    MissingAttribute(String),

    #[error("value is not yet known")]
    UnknownValue,

    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("invalid {kind} {value:?}")]
    InvalidEnum { kind: &'static str, value: String },

    #[error("invalid JSON document: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("JSON encoding failed: {0}")]
    JsonEncoding(#[source] serde_json::Error),

    #[error("block label is not set")]
    MissingLabel,

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("{path}: {source}")]
    Attribute {
        path: String,
        #[source]
        source: Box<ConversionError>,
    },
}

impl ConversionError {
    pub(crate) fn mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        ConversionError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Prefix the error with one more path segment, outermost last
    pub(crate) fn at(self, segment: &str) -> Self {
        match self {
            ConversionError::Attribute { path, source } => ConversionError::Attribute {
                path: format!("{}.{}", segment, path),
                source,
            },
            other => ConversionError::Attribute {
                path: segment.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The error with all path prefixes removed
    pub fn root_cause(&self) -> &ConversionError {
        match self {
            ConversionError::Attribute { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Dotted wire path of the failing value, if the error carries one
    pub fn path(&self) -> Option<&str> {
        match self {
            ConversionError::Attribute { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Error type for tfconv operations
#[derive(Debug, thiserror::Error)]
pub enum TfconvError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Result type alias for tfconv operations
pub type Result<T> = std::result::Result<T, TfconvError>;
