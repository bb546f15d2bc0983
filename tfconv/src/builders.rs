use crate::types::Dynamic;
use std::collections::BTreeMap;

/// Fluent construction of object payloads
pub struct ObjectBuilder {
    values: BTreeMap<String, Dynamic>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Start from an existing object payload; anything else starts empty
    pub fn from_object(object: &Dynamic) -> Self {
        match object {
            Dynamic::Map(values) => Self {
                values: values.clone(),
            },
            _ => Self::new(),
        }
    }

    pub fn string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), Dynamic::String(value.into()));
        self
    }

    pub fn bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.values.insert(key.into(), Dynamic::Bool(value));
        self
    }

    pub fn number(mut self, key: impl Into<String>, value: i64) -> Self {
        self.values.insert(key.into(), Dynamic::from(value));
        self
    }

    pub fn strings<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = values
            .into_iter()
            .map(|s| Dynamic::String(s.into()))
            .collect();
        self.values.insert(key.into(), Dynamic::List(list));
        self
    }

    pub fn list(mut self, key: impl Into<String>, value: Vec<Dynamic>) -> Self {
        self.values.insert(key.into(), Dynamic::List(value));
        self
    }

    pub fn map(mut self, key: impl Into<String>, value: BTreeMap<String, Dynamic>) -> Self {
        self.values.insert(key.into(), Dynamic::Map(value));
        self
    }

    pub fn null(mut self, key: impl Into<String>) -> Self {
        self.values.insert(key.into(), Dynamic::Null);
        self
    }

    pub fn value(mut self, key: impl Into<String>, value: Dynamic) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Dynamic {
        Dynamic::Map(self.values)
    }
}

impl Default for ObjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn object_builder_from_scratch() {
        let object = ObjectBuilder::new()
            .string("name", "web")
            .bool("enabled", true)
            .number("count", 3)
            .strings("tags", ["a", "b"])
            .null("port")
            .build();

        let map = object.as_map().unwrap();
        assert_eq!(map.len(), 5);
        assert_eq!(object.get("name").unwrap().as_str().unwrap(), "web");
        assert!(object.get("enabled").unwrap().as_bool().unwrap());
        assert_eq!(
            object.get("count").unwrap().as_number().unwrap().as_i64(),
            Some(3)
        );
        assert_eq!(object.get("tags").unwrap().as_list().unwrap().len(), 2);
        assert!(object.get("port").unwrap().is_null());
    }

    #[test]
    fn object_builder_from_existing_object() {
        let base = ObjectBuilder::new().string("name", "web").build();

        let object = ObjectBuilder::from_object(&base)
            .string("driver", "docker")
            .build();

        assert_eq!(object.as_map().unwrap().len(), 2);
        assert_eq!(object.get("name").unwrap().as_str().unwrap(), "web");
    }
}
