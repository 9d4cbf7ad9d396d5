//! crmcheck Core - Data Types
//!
//! Records, filters, schemas, errors and configuration shared by every other
//! crate. This crate performs no I/O.

pub mod config;
pub mod error;
pub mod record;
pub mod schema;

pub use config::{CacheSettings, DEFAULT_ENTRY_TTL, DEFAULT_MAX_QUERY_LENGTH, DEFAULT_PROVIDER_TAG};
pub use error::{
    AssertionError, CacheError, CacheResult, ConfigError, CrmError, CrmResult, SchemaError,
    StoreError,
};
pub use record::{record_id, CreateResult, FieldProjection, MutationResult, Record, RecordFilter};
pub use schema::{FieldDescriptor, ObjectSchema};

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ENTITY KINDS
// ============================================================================

/// Object type discriminator for records in the store.
///
/// The well-known kinds carry per-entity helpers on the record client; any
/// other object is addressed through `Object` by its API name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Account,
    Contact,
    Lead,
    Opportunity,
    Case,
    Campaign,
    CampaignMember,
    /// Any other object type, by API name.
    Object(String),
}

impl EntityKind {
    /// API name as understood by the record store.
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Account => "Account",
            EntityKind::Contact => "Contact",
            EntityKind::Lead => "Lead",
            EntityKind::Opportunity => "Opportunity",
            EntityKind::Case => "Case",
            EntityKind::Campaign => "Campaign",
            EntityKind::CampaignMember => "CampaignMember",
            EntityKind::Object(name) => name,
        }
    }

    /// Resolve an API name, mapping well-known names onto their variants.
    pub fn from_api_name(name: &str) -> Self {
        match name {
            "Account" => EntityKind::Account,
            "Contact" => EntityKind::Contact,
            "Lead" => EntityKind::Lead,
            "Opportunity" => EntityKind::Opportunity,
            "Case" => EntityKind::Case,
            "Campaign" => EntityKind::Campaign,
            "CampaignMember" => EntityKind::CampaignMember,
            other => EntityKind::Object(other.to_string()),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EntityKind {
    fn from(name: &str) -> Self {
        EntityKind::from_api_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_round_trips_api_name() {
        for kind in [
            EntityKind::Account,
            EntityKind::Contact,
            EntityKind::Lead,
            EntityKind::Opportunity,
            EntityKind::Case,
            EntityKind::Campaign,
            EntityKind::CampaignMember,
        ] {
            assert_eq!(EntityKind::from_api_name(kind.as_str()), kind);
        }
    }

    #[test]
    fn test_custom_object_kind() {
        let kind = EntityKind::from("Invoice__c");
        assert_eq!(kind, EntityKind::Object("Invoice__c".to_string()));
        assert_eq!(kind.to_string(), "Invoice__c");
    }
}
