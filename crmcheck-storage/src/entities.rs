//! Per-entity helpers on [`CachedRecordClient`].
//!
//! Thin wrappers that fix the object type, filter and cache discriminator
//! for the lookups steps perform most often. All of them go through the
//! generic operations in `cached_client`.

use crmcheck_core::{
    CreateResult, CrmResult, EntityKind, FieldProjection, MutationResult, Record, RecordFilter,
};
use serde_json::Value;

use crate::cache::{Discriminator, KeyValueStore};
use crate::cached_client::CachedRecordClient;
use crate::store::RecordStore;

/// Caller-requested fields plus the field the lookup filters on.
fn with_lookup_field(include: &[&str], lookup_field: &str) -> Vec<String> {
    let mut fields: Vec<String> = include.iter().map(|f| f.to_string()).collect();
    if !include.iter().any(|f| *f == lookup_field) {
        fields.push(lookup_field.to_string());
    }
    fields
}

/// Lead ids carry the `00Q` key prefix; anything else is treated as a contact.
fn campaign_member_field(member_id: &str) -> &'static str {
    if member_id.starts_with("00Q") {
        "LeadId"
    } else {
        "ContactId"
    }
}

impl<S: RecordStore, K: KeyValueStore> CachedRecordClient<S, K> {
    // ========================================================================
    // ACCOUNT
    // ========================================================================

    /// Find an account whose `id_field` equals `identifier`.
    pub async fn account_find_by_identifier(
        &self,
        id_field: &str,
        identifier: &str,
        include: &[&str],
    ) -> CrmResult<Option<Record>> {
        self.find_one_cached(
            &EntityKind::Account,
            RecordFilter::by(id_field, identifier),
            Discriminator::identifier(id_field, identifier),
            &with_lookup_field(include, id_field),
        )
        .await
    }

    pub async fn account_create(&self, fields: Record) -> CrmResult<CreateResult> {
        self.create(&EntityKind::Account, fields).await
    }

    pub async fn account_update(&self, fields: Record) -> CrmResult<MutationResult> {
        self.update(&EntityKind::Account, fields).await
    }

    pub async fn account_delete(&self, id: &str) -> CrmResult<MutationResult> {
        self.delete(&EntityKind::Account, id).await
    }

    // ========================================================================
    // CONTACT
    // ========================================================================

    pub async fn contact_find_by_email(
        &self,
        email: &str,
        include: &[&str],
    ) -> CrmResult<Option<Record>> {
        self.find_one_cached(
            &EntityKind::Contact,
            RecordFilter::by("Email", email),
            Discriminator::email(email),
            &with_lookup_field(include, "Email"),
        )
        .await
    }

    pub async fn contact_create(&self, fields: Record) -> CrmResult<CreateResult> {
        self.create(&EntityKind::Contact, fields).await
    }

    pub async fn contact_update(&self, fields: Record) -> CrmResult<MutationResult> {
        self.update(&EntityKind::Contact, fields).await
    }

    pub async fn contact_delete(&self, id: &str) -> CrmResult<MutationResult> {
        self.delete(&EntityKind::Contact, id).await
    }

    // ========================================================================
    // LEAD
    // ========================================================================

    pub async fn lead_find_by_email(
        &self,
        email: &str,
        include: &[&str],
    ) -> CrmResult<Option<Record>> {
        self.find_one_cached(
            &EntityKind::Lead,
            RecordFilter::by("Email", email),
            Discriminator::email(email),
            &with_lookup_field(include, "Email"),
        )
        .await
    }

    pub async fn lead_create(&self, fields: Record) -> CrmResult<CreateResult> {
        self.create(&EntityKind::Lead, fields).await
    }

    pub async fn lead_bulk_create(&self, records: Vec<Record>) -> CrmResult<Vec<CreateResult>> {
        self.bulk_create(&EntityKind::Lead, records).await
    }

    pub async fn lead_update(&self, fields: Record) -> CrmResult<MutationResult> {
        self.update(&EntityKind::Lead, fields).await
    }

    pub async fn lead_delete(&self, id: &str) -> CrmResult<MutationResult> {
        self.delete(&EntityKind::Lead, id).await
    }

    // ========================================================================
    // OPPORTUNITY
    // ========================================================================

    pub async fn opportunity_find_by_identifier(
        &self,
        id_field: &str,
        identifier: &str,
        include: &[&str],
    ) -> CrmResult<Option<Record>> {
        self.find_one_cached(
            &EntityKind::Opportunity,
            RecordFilter::by(id_field, identifier),
            Discriminator::identifier(id_field, identifier),
            &with_lookup_field(include, id_field),
        )
        .await
    }

    pub async fn opportunity_create(&self, fields: Record) -> CrmResult<CreateResult> {
        self.create(&EntityKind::Opportunity, fields).await
    }

    pub async fn opportunity_update(&self, fields: Record) -> CrmResult<MutationResult> {
        self.update(&EntityKind::Opportunity, fields).await
    }

    pub async fn opportunity_delete(&self, id: &str) -> CrmResult<MutationResult> {
        self.delete(&EntityKind::Opportunity, id).await
    }

    // ========================================================================
    // CASE / CAMPAIGN / ANY OBJECT BY ID
    // ========================================================================

    pub async fn case_find_by_id(&self, id: &str, include: &[&str]) -> CrmResult<Option<Record>> {
        self.object_find_by_id(&EntityKind::Case, id, include).await
    }

    pub async fn case_create(&self, fields: Record) -> CrmResult<CreateResult> {
        self.create(&EntityKind::Case, fields).await
    }

    pub async fn case_update(&self, fields: Record) -> CrmResult<MutationResult> {
        self.update(&EntityKind::Case, fields).await
    }

    pub async fn case_delete(&self, id: &str) -> CrmResult<MutationResult> {
        self.delete(&EntityKind::Case, id).await
    }

    pub async fn campaign_find_by_id(
        &self,
        id: &str,
        include: &[&str],
    ) -> CrmResult<Option<Record>> {
        self.object_find_by_id(&EntityKind::Campaign, id, include)
            .await
    }

    /// Find any object by its record id.
    pub async fn object_find_by_id(
        &self,
        entity: &EntityKind,
        id: &str,
        include: &[&str],
    ) -> CrmResult<Option<Record>> {
        self.find_one_cached(
            entity,
            RecordFilter::by("Id", id),
            Discriminator::id(id),
            &with_lookup_field(include, "Id"),
        )
        .await
    }

    /// Find every record of `entity` whose `field` equals `value`.
    pub async fn object_find_by_field(
        &self,
        entity: &EntityKind,
        field: &str,
        value: &str,
        include: &[&str],
    ) -> CrmResult<Vec<Record>> {
        self.find_cached(
            entity,
            RecordFilter::by(field, value),
            Discriminator::field(field, value),
            &with_lookup_field(include, field),
        )
        .await
    }

    // ========================================================================
    // CAMPAIGN MEMBER (uncached)
    // ========================================================================

    /// Find the membership linking `member_id` (a contact or lead) to a campaign.
    ///
    /// Keyed by two ids, so not cached.
    pub async fn campaign_member_find(
        &self,
        campaign_id: &str,
        member_id: &str,
    ) -> CrmResult<Option<Record>> {
        let member_field = campaign_member_field(member_id);
        let filter = RecordFilter::by("CampaignId", campaign_id).eq(member_field, member_id);
        self.find_one_by_fields(&EntityKind::CampaignMember, &filter, &FieldProjection::All)
            .await
    }

    /// Add a contact or lead to a campaign.
    pub async fn campaign_member_create(
        &self,
        campaign_id: &str,
        member_id: &str,
        status: Option<&str>,
    ) -> CrmResult<CreateResult> {
        let member_field = campaign_member_field(member_id);
        let mut fields = Record::new();
        fields.insert("CampaignId".to_string(), Value::from(campaign_id));
        fields.insert(member_field.to_string(), Value::from(member_id));
        if let Some(status) = status {
            fields.insert("Status".to_string(), Value::from(status));
        }
        self.create(&EntityKind::CampaignMember, fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_lookup_field_appends_once() {
        assert_eq!(with_lookup_field(&["Name"], "Email"), vec!["Name", "Email"]);
        assert_eq!(with_lookup_field(&["Email", "Name"], "Email"), vec!["Email", "Name"]);
        assert_eq!(with_lookup_field(&[], "Id"), vec!["Id"]);
    }

    #[test]
    fn test_campaign_member_field_by_id_prefix() {
        assert_eq!(campaign_member_field("00Q5e000001abcd"), "LeadId");
        assert_eq!(campaign_member_field("0035e000001abcd"), "ContactId");
    }
}
