//! Scenario-scoped cache keys.
//!
//! Every key produced during one scenario execution carries the
//! [`ScenarioScope`] as its last segment, so bulk invalidation of one
//! scenario never touches another scenario's entries.

use std::fmt;

use crmcheck_core::EntityKind;

/// Separator between key segments.
const SEPARATOR: char = '|';

/// Fixed first segment of the key registry entry.
const REGISTRY_PREFIX: &str = "cachekeys";

/// The cache namespace for one scenario execution.
///
/// The private inner struct ensures a scope can only be built from both a
/// scenario id and a requestor id. The scope is never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScenarioScope {
    inner: ScopeInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScopeInner {
    scenario_id: String,
    requestor_id: String,
}

impl ScenarioScope {
    pub fn new(scenario_id: impl Into<String>, requestor_id: impl Into<String>) -> Self {
        Self {
            inner: ScopeInner {
                scenario_id: scenario_id.into(),
                requestor_id: requestor_id.into(),
            },
        }
    }

    pub fn scenario_id(&self) -> &str {
        &self.inner.scenario_id
    }

    pub fn requestor_id(&self) -> &str {
        &self.inner.requestor_id
    }
}

/// `<scenarioId><requestorId>`, concatenated with no separator.
impl fmt::Display for ScenarioScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.inner.scenario_id, self.inner.requestor_id)
    }
}

/// The value identifying which record a cache entry represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Discriminator {
    /// Raw email address (contact and lead lookups).
    Email(String),
    /// `<idField><identifierValue>` (account and opportunity lookups).
    Identifier { id_field: String, value: String },
    /// Bare record identifier.
    Id(String),
    /// `<field><value>` for generic single-field lookups.
    Field { field: String, value: String },
}

impl Discriminator {
    pub fn email(email: impl Into<String>) -> Self {
        Discriminator::Email(email.into())
    }

    pub fn identifier(id_field: impl Into<String>, value: impl Into<String>) -> Self {
        Discriminator::Identifier {
            id_field: id_field.into(),
            value: value.into(),
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Discriminator::Id(id.into())
    }

    pub fn field(field: impl Into<String>, value: impl Into<String>) -> Self {
        Discriminator::Field {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discriminator::Email(email) => f.write_str(email),
            Discriminator::Identifier { id_field, value } => write!(f, "{}{}", id_field, value),
            Discriminator::Id(id) => f.write_str(id),
            Discriminator::Field { field, value } => write!(f, "{}{}", field, value),
        }
    }
}

/// A fully rendered cache key.
///
/// Record keys have the form `<ProviderTag>|<EntityType>|<Discriminator>|<Scope>`;
/// the registry key is `cachekeys|<Scope>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a cached lookup result.
    pub fn record(
        provider_tag: &str,
        entity: &EntityKind,
        discriminator: &Discriminator,
        scope: &ScenarioScope,
    ) -> Self {
        Self(format!(
            "{tag}{sep}{entity}{sep}{disc}{sep}{scope}",
            tag = provider_tag,
            entity = entity,
            disc = discriminator,
            scope = scope,
            sep = SEPARATOR,
        ))
    }

    /// Key of the registry entry tracking every key written in `scope`.
    pub fn registry(scope: &ScenarioScope) -> Self {
        Self(format!("{}{}{}", REGISTRY_PREFIX, SEPARATOR, scope))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scope_concatenates_without_separator() {
        let scope = ScenarioScope::new("scn-1", "req-9");
        assert_eq!(scope.to_string(), "scn-1req-9");
        assert_eq!(scope.scenario_id(), "scn-1");
        assert_eq!(scope.requestor_id(), "req-9");
    }

    #[test]
    fn test_account_key_format() {
        let scope = ScenarioScope::new("s1", "r1");
        let key = CacheKey::record(
            "Salesforce",
            &EntityKind::Account,
            &Discriminator::identifier("Name", "Acme"),
            &scope,
        );
        assert_eq!(key.as_str(), "Salesforce|Account|NameAcme|s1r1");
    }

    #[test]
    fn test_contact_key_uses_raw_email() {
        let scope = ScenarioScope::new("s1", "r1");
        let key = CacheKey::record(
            "Salesforce",
            &EntityKind::Contact,
            &Discriminator::email("jane@example.com"),
            &scope,
        );
        assert_eq!(key.as_str(), "Salesforce|Contact|jane@example.com|s1r1");
    }

    #[test]
    fn test_bare_id_key() {
        let scope = ScenarioScope::new("s", "r");
        let key = CacheKey::record(
            "Salesforce",
            &EntityKind::Case,
            &Discriminator::id("500xx"),
            &scope,
        );
        assert_eq!(key.as_str(), "Salesforce|Case|500xx|sr");
    }

    #[test]
    fn test_registry_key_format() {
        let scope = ScenarioScope::new("abc", "def");
        assert_eq!(CacheKey::registry(&scope).as_str(), "cachekeys|abcdef");
    }

    proptest! {
        #[test]
        fn prop_distinct_emails_give_distinct_keys(
            a in "[a-z]{1,12}@[a-z]{1,8}\\.com",
            b in "[a-z]{1,12}@[a-z]{1,8}\\.com",
        ) {
            let scope = ScenarioScope::new("s", "r");
            let ka = CacheKey::record("Salesforce", &EntityKind::Contact, &Discriminator::email(a.clone()), &scope);
            let kb = CacheKey::record("Salesforce", &EntityKind::Contact, &Discriminator::email(b.clone()), &scope);
            prop_assert_eq!(a == b, ka == kb);
        }

        #[test]
        fn prop_key_is_deterministic(id in "[0-9A-Za-z]{15,18}") {
            let scope = ScenarioScope::new("scenario", "requestor");
            let first = CacheKey::record("Salesforce", &EntityKind::Case, &Discriminator::id(id.clone()), &scope);
            let second = CacheKey::record("Salesforce", &EntityKind::Case, &Discriminator::id(id), &scope);
            prop_assert_eq!(first, second);
        }
    }
}
