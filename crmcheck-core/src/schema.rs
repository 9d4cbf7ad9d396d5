//! Object schema types returned by the record store's describe capability.

use serde::{Deserialize, Serialize};

/// A single field on an object type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Custom (org-defined) as opposed to standard.
    pub custom: bool,
}

impl FieldDescriptor {
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            custom: false,
        }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            custom: true,
        }
    }
}

/// Field schema for one object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSchema {
    pub object_type: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ObjectSchema {
    pub fn new(object_type: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            object_type: object_type.into(),
            fields,
        }
    }

    /// All field names, in describe order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Names of standard (non-custom) fields.
    pub fn standard_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| !f.custom)
            .map(|f| f.name.as_str())
    }

    /// Names of custom fields.
    pub fn custom_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.custom)
            .map(|f| f.name.as_str())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_standard_and_custom() {
        let schema = ObjectSchema::new(
            "Lead",
            vec![
                FieldDescriptor::standard("Id"),
                FieldDescriptor::custom("Score__c"),
                FieldDescriptor::standard("Email"),
            ],
        );

        assert_eq!(schema.standard_fields().collect::<Vec<_>>(), vec!["Id", "Email"]);
        assert_eq!(schema.custom_fields().collect::<Vec<_>>(), vec!["Score__c"]);
        assert_eq!(schema.field_names().count(), 3);
        assert!(schema.has_field("Score__c"));
        assert!(!schema.has_field("Phone"));
    }
}
