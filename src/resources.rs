use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::errors::{PipedriveError, Result};
use crate::models::*;
use crate::transport::Session;
use crate::wire_models::{SearchData, SearchOutcome};

/// Typed access to the Pipedrive resources this crate manages.
///
/// Owns its [`Session`]; dropping the client closes it. Methods take `&self`
/// so independent calls may run concurrently against one client.
#[derive(Debug)]
pub struct PipedriveClient {
    session: Session,
    lead_title_prefix: String,
}

impl PipedriveClient {
    pub fn new(config: &Config) -> Result<Self> {
        let session = Session::open_with_timeout(
            config.api_token.clone(),
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::with_session(session, config.lead_title_prefix.clone()))
    }

    pub fn with_session(session: Session, lead_title_prefix: impl Into<String>) -> Self {
        Self {
            session,
            lead_title_prefix: lead_title_prefix.into(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn lead_title_prefix(&self) -> &str {
        &self.lead_title_prefix
    }

    // ============ Lead labels ============

    pub async fn create_lead_label(&self, label: &LeadLabel) -> Result<LeadLabel> {
        tracing::info!("Creating lead label '{}' ({})", label.name, label.color);
        let created: LeadLabel = self
            .session
            .post("/v1/leadLabels", &record_payload(label, None)?)
            .await?;
        tracing::info!("✓ Lead label created: {:?}", created.id);
        Ok(created)
    }

    pub async fn get_lead_labels(&self) -> Result<Vec<LeadLabel>> {
        let labels: Option<Vec<LeadLabel>> = self.session.get("/v1/leadLabels", &[]).await?;
        Ok(labels.unwrap_or_default())
    }

    // ============ Persons ============

    /// Creates a person. `custom_fields` are merged into the payload.
    pub async fn create_person(
        &self,
        person: &Person,
        custom_fields: &CustomFieldValues,
    ) -> Result<Person> {
        tracing::info!("Creating person '{}'", person.name);
        let created: Person = self
            .session
            .post("/v1/persons", &record_payload(person, Some(custom_fields))?)
            .await?;
        tracing::info!("✓ Person created: {:?}", created.id);
        Ok(created)
    }

    pub async fn get_person(&self, id: &RemoteId) -> Result<Person> {
        self.session.get(&format!("/v1/persons/{}", id), &[]).await
    }

    /// First page of persons, as returned by one call.
    pub async fn get_persons(&self) -> Result<Vec<Person>> {
        let persons: Option<Vec<Person>> = self.session.get("/v1/persons", &[]).await?;
        Ok(persons.unwrap_or_default())
    }

    pub async fn update_person(
        &self,
        id: &RemoteId,
        person: &Person,
        custom_fields: &CustomFieldValues,
    ) -> Result<Person> {
        tracing::info!("Updating person {}", id);
        self.session
            .put(
                &format!("/v1/persons/{}", id),
                &record_payload(person, Some(custom_fields))?,
            )
            .await
    }

    /// Exact-match lookup of a person by email address.
    pub async fn search_person_by_email(&self, email: &str) -> SearchOutcome<RemoteId> {
        self.exact_search("/v1/persons/search", email, "email")
            .await
            .into()
    }

    // ============ Leads ============

    /// Creates a lead. `custom_fields` are merged into the payload.
    pub async fn create_lead(&self, lead: &Lead, custom_fields: &CustomFieldValues) -> Result<Lead> {
        tracing::info!("Creating lead '{}'", lead.title());
        let created: Lead = self
            .session
            .post("/v1/leads", &record_payload(lead, Some(custom_fields))?)
            .await?;
        tracing::info!("✓ Lead created: {:?}", created.id());
        Ok(created)
    }

    pub async fn get_lead(&self, id: &RemoteId) -> Result<Lead> {
        self.session.get(&format!("/v1/leads/{}", id), &[]).await
    }

    /// First page of leads, as returned by one call.
    pub async fn get_leads(&self) -> Result<Vec<Lead>> {
        let leads: Option<Vec<Lead>> = self.session.get("/v1/leads", &[]).await?;
        Ok(leads.unwrap_or_default())
    }

    /// Partial update: only the fields set on `patch` are sent.
    pub async fn update_lead(&self, id: &RemoteId, patch: &LeadPatch) -> Result<Lead> {
        tracing::info!("Updating lead {}", id);
        self.session
            .patch(&format!("/v1/leads/{}", id), patch)
            .await
    }

    /// Writes the fields `lead` carries (plus custom fields) onto the lead
    /// `id`. Unset references and an empty label list are not sent.
    pub async fn merge_lead_fields(
        &self,
        id: &RemoteId,
        lead: &Lead,
        custom_fields: &CustomFieldValues,
    ) -> Result<Lead> {
        tracing::info!("Merging '{}' into lead {}", lead.title(), id);
        let patch = LeadPatch::from(lead);
        self.session
            .patch(
                &format!("/v1/leads/{}", id),
                &record_payload(&patch, Some(custom_fields))?,
            )
            .await
    }

    /// Exact-match lookup of a lead by title.
    pub async fn search_lead_by_title(&self, title: &str) -> SearchOutcome<RemoteId> {
        self.exact_search("/v1/leads/search", title, "title")
            .await
            .into()
    }

    /// Fuzzy search over lead titles through the generic item search.
    pub async fn search_leads_fuzzy(&self, term: &str) -> Result<SearchData> {
        let data: Option<SearchData> = self
            .session
            .get(
                "/v1/itemSearch",
                &[
                    ("term", term),
                    ("item_types", "lead"),
                    ("fields", "title"),
                    ("exact_match", "false"),
                ],
            )
            .await?;
        Ok(data.unwrap_or_default())
    }

    async fn exact_search(&self, path: &str, term: &str, field: &str) -> Result<Option<RemoteId>> {
        let data: Option<SearchData> = self
            .session
            .get(
                path,
                &[("term", term), ("fields", field), ("exact_match", "true")],
            )
            .await?;
        Ok(data.and_then(|d| d.first_id()))
    }

    // ============ Custom fields ============

    pub async fn create_custom_field(
        &self,
        field: &CustomField,
        source: CustomFieldSource,
    ) -> Result<CustomField> {
        tracing::info!("Creating {} custom field '{}'", source, field.name);
        self.session
            .post(
                &format!("/v1/{}", source.collection()),
                &record_payload(field, None)?,
            )
            .await
    }

    pub async fn update_custom_field(
        &self,
        id: &RemoteId,
        source: CustomFieldSource,
        patch: &CustomFieldPatch,
    ) -> Result<CustomField> {
        tracing::info!("Updating {} custom field {}", source, id);
        self.session
            .put(&format!("/v1/{}/{}", source.collection(), id), patch)
            .await
    }

    pub async fn get_custom_fields(&self, source: CustomFieldSource) -> Result<Vec<CustomField>> {
        let fields: Option<Vec<CustomField>> = self
            .session
            .get(&format!("/v1/{}", source.collection()), &[])
            .await?;
        Ok(fields.unwrap_or_default())
    }

    pub async fn get_custom_person_fields(&self) -> Result<Vec<CustomField>> {
        self.get_custom_fields(CustomFieldSource::Person).await
    }

    pub async fn get_custom_deal_fields(&self) -> Result<Vec<CustomField>> {
        self.get_custom_fields(CustomFieldSource::Deal).await
    }

    // ============ Notes ============

    pub async fn create_note(&self, note: &Note) -> Result<Note> {
        tracing::info!("Creating note ({} chars)", note.content.len());
        self.session
            .post("/v1/notes", &record_payload(note, None)?)
            .await
    }

    pub async fn get_note(&self, id: &RemoteId) -> Result<Note> {
        self.session.get(&format!("/v1/notes/{}", id), &[]).await
    }
}

/// Serializes a record for a create/replace call: the client-side `id` is
/// dropped and custom field values are merged at the top level.
pub fn record_payload<T: Serialize>(
    record: &T,
    custom_fields: Option<&CustomFieldValues>,
) -> Result<Value> {
    let mut payload = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        _ => {
            return Err(PipedriveError::Validation(
                "Record must serialize to a JSON object".to_string(),
            ))
        }
    };
    payload.remove("id");
    if let Some(fields) = custom_fields {
        for (key, value) in fields {
            payload.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_payload_drops_id_and_merges_fields() {
        let mut label = LeadLabel::new("hot", LeadColor::Red);
        label.id = Some(RemoteId::from("abc"));
        assert_eq!(
            record_payload(&label, None).unwrap(),
            json!({"name": "hot", "color": "red"})
        );

        let mut custom = CustomFieldValues::new();
        custom.insert("a1b2c3".to_string(), json!("Pro"));
        let person = Person::new("Jane");
        assert_eq!(
            record_payload(&person, Some(&custom)).unwrap(),
            json!({"name": "Jane", "a1b2c3": "Pro"})
        );
    }

    #[test]
    fn test_record_payload_rejects_non_objects() {
        assert!(record_payload(&vec![1, 2], None).is_err());
    }

    #[tokio::test]
    async fn test_client_from_config() {
        let config = Config::new("token", "https://acme.pipedrive.com").with_lead_title_prefix("Web");
        let client = PipedriveClient::new(&config).unwrap();
        assert_eq!(client.lead_title_prefix(), "Web");
        assert_eq!(client.session().base_url(), "https://acme.pipedrive.com");
    }
}
