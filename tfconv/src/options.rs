/// Converter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterOptions {
    /// Version tag written into every derived schema and block
    pub schema_version: i64,
    /// Deepest chain of nested record types accepted
    pub max_depth: usize,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            schema_version: 0,
            max_depth: 32,
        }
    }
}

impl ConverterOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema version
    pub fn with_schema_version(mut self, version: i64) -> Self {
        self.schema_version = version;
        self
    }

    /// Set the nesting limit
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}
