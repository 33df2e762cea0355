//! Find-or-create workflows built on the resource operations.
//!
//! Each workflow awaits its calls one after another; later calls need ids
//! from earlier ones. Nothing is rolled back when a later step fails, and
//! nothing guards against two callers creating the same label at once.
use crate::errors::{PipedriveError, Result, ResultExt};
use crate::models::*;
use crate::resources::PipedriveClient;
use crate::wire_models::SearchOutcome;

impl PipedriveClient {
    /// Title of the minimal lead for `email`: `"<prefix>: <email>"`.
    pub fn minimal_lead_title(&self, email: &str) -> String {
        minimal_lead_title(self.lead_title_prefix(), email)
    }

    /// Returns the label named like `label`, creating it if none exists.
    ///
    /// An existing label is returned unchanged, whatever color `label` asks
    /// for.
    pub async fn create_or_get_lead_label(&self, label: &LeadLabel) -> Result<LeadLabel> {
        let labels = self.get_lead_labels().await?;

        if let Some(existing) = labels.into_iter().find(|l| l.name == label.name) {
            tracing::debug!("Lead label '{}' already exists: {:?}", label.name, existing.id);
            return Ok(existing);
        }

        self.create_lead_label(label).await
    }

    /// Updates the person whose email matches the first email of `person`,
    /// or creates a new one.
    ///
    /// A failed search is logged and treated like "no match"; errors from the
    /// create or update call itself are returned.
    pub async fn create_or_update_person(
        &self,
        person: &Person,
        custom_fields: &CustomFieldValues,
    ) -> Result<Person> {
        let outcome = match person.lookup_email() {
            Some(email) => self.search_person_by_email(email).await,
            None => SearchOutcome::NotFound,
        };

        match outcome {
            SearchOutcome::Found(id) => {
                tracing::info!("Person {} matches '{}', updating", id, person.name);
                self.update_person(&id, person, custom_fields)
                    .await
                    .with_context(|| format!("Failed to update existing person {}", id))
            }
            SearchOutcome::NotFound => {
                tracing::debug!("No person matches '{}', creating", person.name);
                self.create_person(person, custom_fields).await
            }
            SearchOutcome::Failed(err) => {
                tracing::warn!(
                    "Person search failed, creating '{}' instead: {}",
                    person.name,
                    err
                );
                self.create_person(person, custom_fields).await
            }
        }
    }

    /// Updates the lead whose title matches `lead`, or creates a new one.
    ///
    /// The matched lead receives the fields `lead` carries, so its person
    /// reference follows the candidate while labels it already has are kept
    /// unless `lead` names some. A failed search is logged and
    /// treated like "no match".
    pub async fn create_or_update_lead(
        &self,
        lead: &Lead,
        custom_fields: &CustomFieldValues,
    ) -> Result<Lead> {
        match self.search_lead_by_title(lead.title()).await {
            SearchOutcome::Found(id) => {
                tracing::info!("Lead {} matches '{}', updating", id, lead.title());
                self.merge_lead_fields(&id, lead, custom_fields)
                    .await
                    .with_context(|| format!("Failed to update existing lead {}", id))
            }
            SearchOutcome::NotFound => {
                tracing::debug!("No lead titled '{}', creating", lead.title());
                self.create_lead(lead, custom_fields).await
            }
            SearchOutcome::Failed(err) => {
                tracing::warn!(
                    "Lead search failed, creating '{}' instead: {}",
                    lead.title(),
                    err
                );
                self.create_lead(lead, custom_fields).await
            }
        }
    }

    /// Creates a person for `email` and a minimal lead attached to it,
    /// optionally tagged with `label`.
    ///
    /// `name` defaults to `"<email>"`. If the lead step fails, the person
    /// and label created before it stay in place.
    pub async fn create_minimal_lead(
        &self,
        email: &str,
        name: Option<&str>,
        label: Option<&LeadLabel>,
    ) -> Result<Lead> {
        let contact = Email::new(email)?;
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("<{}>", email));

        let person = self
            .create_or_update_person(&Person::new(name).with_email(contact), &CustomFieldValues::new())
            .await
            .context("Failed to create person for minimal lead")?;
        let person_id = person.id.ok_or_else(|| {
            PipedriveError::Protocol("Person returned by Pipedrive has no id".to_string())
        })?;

        let mut builder = Lead::builder(self.minimal_lead_title(email)).person_id(person_id);
        if let Some(label) = label {
            let label = self
                .create_or_get_lead_label(label)
                .await
                .context("Failed to resolve minimal lead label")?;
            builder = builder.label_id(require_label_id(label)?);
        }
        let lead = builder.build()?;

        self.create_or_update_lead(&lead, &CustomFieldValues::new())
            .await
            .context("Failed to create minimal lead")
    }

    /// Finds the minimal lead for `email` and returns its canonical record.
    ///
    /// Search results omit label ids, so the top match is re-fetched by id.
    pub async fn find_minimal_lead(&self, email: &str) -> Result<Lead> {
        let title = self.minimal_lead_title(email);
        let results = self.search_leads_fuzzy(&title).await?;

        let id = results.first_id().ok_or_else(|| {
            PipedriveError::NotFound(format!("No lead found for email: {}", email))
        })?;
        tracing::debug!("Minimal lead for {} is {}", email, id);

        self.get_lead(&id).await
    }

    /// Tags the minimal lead for `email` with `label`.
    ///
    /// No update is sent if the label is already attached. With `quiet`, a
    /// missing lead yields `Ok(None)` instead of a `NotFound` error.
    pub async fn add_label_to_minimal_lead(
        &self,
        email: &str,
        label: &LeadLabel,
        quiet: bool,
    ) -> Result<Option<Lead>> {
        let mut lead = match self.find_minimal_lead(email).await {
            Ok(lead) => lead,
            Err(e) if quiet && e.is_not_found() => {
                tracing::warn!("No minimal lead for {}, skipping label '{}'", email, label.name);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let label = self.create_or_get_lead_label(label).await?;
        let label_name = label.name.clone();
        if !lead.add_label_id(require_label_id(label)?) {
            tracing::debug!("Lead for {} already has label '{}'", email, label_name);
            return Ok(Some(lead));
        }

        let lead_id = lead.id().cloned().ok_or_else(|| {
            PipedriveError::Protocol("Lead returned by Pipedrive has no id".to_string())
        })?;
        let patch = LeadPatch::default().label_ids(lead.label_ids().to_vec());

        tracing::info!("Adding label '{}' to lead {}", label_name, lead_id);
        self.update_lead(&lead_id, &patch).await.map(Some)
    }
}

/// `"<prefix>: <email>"`
pub fn minimal_lead_title(prefix: &str, email: &str) -> String {
    format!("{}: {}", prefix, email)
}

fn require_label_id(label: LeadLabel) -> Result<RemoteId> {
    label.id.ok_or_else(|| {
        PipedriveError::Protocol(format!(
            "Lead label '{}' returned by Pipedrive has no id",
            label.name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_lead_title() {
        assert_eq!(minimal_lead_title("App", "x@example.com"), "App: x@example.com");
        assert_eq!(minimal_lead_title("", "x@example.com"), ": x@example.com");
    }

    #[test]
    fn test_require_label_id() {
        let label = LeadLabel::new("new", LeadColor::Blue);
        assert!(matches!(
            require_label_id(label),
            Err(PipedriveError::Protocol(_))
        ));

        let mut label = LeadLabel::new("new", LeadColor::Blue);
        label.id = Some(RemoteId::from("f08b42a0"));
        assert_eq!(require_label_id(label).unwrap(), RemoteId::from("f08b42a0"));
    }

    #[tokio::test]
    async fn test_minimal_lead_rejects_bad_email_before_network() {
        // Nothing listens on port 9; any request would fail with Request, not Validation
        let config = crate::config::Config::new("token", "http://127.0.0.1:9");
        let client = PipedriveClient::new(&config).unwrap();

        let err = client
            .create_minimal_lead("not-an-email", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipedriveError::Validation(_)));
    }
}
