use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::errors::{PipedriveError, Result};
use crate::validation::is_valid_email;

// ============ Identifiers ============

/// Identifier assigned by Pipedrive.
///
/// Persons and organizations use integers, leads and lead labels use UUID
/// strings. The wire form is kept so the id is sent back exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Int(u64),
    Str(String),
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteId::Int(id) => write!(f, "{}", id),
            RemoteId::Str(id) => f.write_str(id),
        }
    }
}

impl From<u64> for RemoteId {
    fn from(id: u64) -> Self {
        RemoteId::Int(id)
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        RemoteId::Str(id.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(id: String) -> Self {
        RemoteId::Str(id)
    }
}

/// Reference fields such as `org_id` come back either as a bare id or, on
/// expanded reads, as an object carrying the id under `value`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Reference {
    Id(RemoteId),
    Expanded { value: RemoteId },
}

fn deserialize_reference<'de, D>(deserializer: D) -> std::result::Result<Option<RemoteId>, D::Error>
where
    D: Deserializer<'de>,
{
    let reference = Option::<Reference>::deserialize(deserializer)?;
    Ok(reference.map(|r| match r {
        Reference::Id(id) | Reference::Expanded { value: id } => id,
    }))
}

// ============ Lead labels ============

/// Fixed palette accepted for lead labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadColor {
    Green,
    Blue,
    Red,
    Yellow,
    Purple,
    Gray,
}

impl LeadColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadColor::Green => "green",
            LeadColor::Blue => "blue",
            LeadColor::Red => "red",
            LeadColor::Yellow => "yellow",
            LeadColor::Purple => "purple",
            LeadColor::Gray => "gray",
        }
    }
}

impl fmt::Display for LeadColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadColor {
    type Err = PipedriveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "green" => Ok(LeadColor::Green),
            "blue" => Ok(LeadColor::Blue),
            "red" => Ok(LeadColor::Red),
            "yellow" => Ok(LeadColor::Yellow),
            "purple" => Ok(LeadColor::Purple),
            "gray" | "grey" => Ok(LeadColor::Gray),
            other => Err(PipedriveError::Validation(format!(
                "Unknown lead label color: {}",
                other
            ))),
        }
    }
}

/// A named, colored tag attachable to a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadLabel {
    /// Assigned by Pipedrive on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    pub name: String,
    pub color: LeadColor,
}

impl LeadLabel {
    pub fn new(name: impl Into<String>, color: LeadColor) -> Self {
        Self {
            id: None,
            name: name.into(),
            color,
        }
    }
}

// ============ Leads ============

/// A sales opportunity tied to a person and/or an organization.
///
/// Fields are private so the person-or-organization invariant holds for
/// every value of this type, including ones decoded from responses. Value and
/// expected close date are not modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LeadRecord")]
pub struct Lead {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<RemoteId>,
    title: String,
    /// Pipedrive rejects an explicit `null` owner, so unset means absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_id: Option<RemoteId>,
    label_ids: Vec<RemoteId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    person_id: Option<RemoteId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization_id: Option<RemoteId>,
}

#[derive(Deserialize)]
struct LeadRecord {
    #[serde(default)]
    id: Option<RemoteId>,
    title: String,
    #[serde(default, deserialize_with = "deserialize_reference")]
    owner_id: Option<RemoteId>,
    #[serde(default)]
    label_ids: Option<Vec<RemoteId>>,
    #[serde(default, deserialize_with = "deserialize_reference")]
    person_id: Option<RemoteId>,
    #[serde(default, deserialize_with = "deserialize_reference")]
    organization_id: Option<RemoteId>,
}

impl TryFrom<LeadRecord> for Lead {
    type Error = PipedriveError;

    fn try_from(record: LeadRecord) -> Result<Self> {
        let mut lead = LeadBuilder {
            title: record.title,
            owner_id: record.owner_id,
            label_ids: Vec::new(),
            person_id: record.person_id,
            organization_id: record.organization_id,
        }
        .build()?;
        lead.id = record.id;
        for id in record.label_ids.unwrap_or_default() {
            lead.add_label_id(id);
        }
        Ok(lead)
    }
}

impl Lead {
    /// Starts building a lead with the given title.
    pub fn builder(title: impl Into<String>) -> LeadBuilder {
        LeadBuilder {
            title: title.into(),
            owner_id: None,
            label_ids: Vec::new(),
            person_id: None,
            organization_id: None,
        }
    }

    pub fn id(&self) -> Option<&RemoteId> {
        self.id.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn owner_id(&self) -> Option<&RemoteId> {
        self.owner_id.as_ref()
    }

    pub fn label_ids(&self) -> &[RemoteId] {
        &self.label_ids
    }

    pub fn person_id(&self) -> Option<&RemoteId> {
        self.person_id.as_ref()
    }

    pub fn organization_id(&self) -> Option<&RemoteId> {
        self.organization_id.as_ref()
    }

    pub fn has_label(&self, id: &RemoteId) -> bool {
        self.label_ids.contains(id)
    }

    /// Attaches a label id. Returns `false` if it was already attached.
    pub fn add_label_id(&mut self, id: RemoteId) -> bool {
        if self.has_label(&id) {
            return false;
        }
        self.label_ids.push(id);
        true
    }
}

/// Builder for [`Lead`]; `build` enforces the person-or-organization rule.
#[derive(Debug, Clone)]
pub struct LeadBuilder {
    title: String,
    owner_id: Option<RemoteId>,
    label_ids: Vec<RemoteId>,
    person_id: Option<RemoteId>,
    organization_id: Option<RemoteId>,
}

impl LeadBuilder {
    pub fn owner_id(mut self, id: impl Into<RemoteId>) -> Self {
        self.owner_id = Some(id.into());
        self
    }

    pub fn person_id(mut self, id: impl Into<RemoteId>) -> Self {
        self.person_id = Some(id.into());
        self
    }

    pub fn organization_id(mut self, id: impl Into<RemoteId>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    pub fn label_id(mut self, id: impl Into<RemoteId>) -> Self {
        self.label_ids.push(id.into());
        self
    }

    pub fn label_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = RemoteId>,
    {
        self.label_ids.extend(ids);
        self
    }

    pub fn build(self) -> Result<Lead> {
        if self.person_id.is_none() && self.organization_id.is_none() {
            return Err(PipedriveError::Validation(format!(
                "Lead '{}' needs a person or an organization",
                self.title
            )));
        }

        let mut lead = Lead {
            id: None,
            title: self.title,
            owner_id: self.owner_id,
            label_ids: Vec::with_capacity(self.label_ids.len()),
            person_id: self.person_id,
            organization_id: self.organization_id,
        };
        for id in self.label_ids {
            lead.add_label_id(id);
        }
        Ok(lead)
    }
}

/// Partial lead update. Only fields set to `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<RemoteId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<Vec<RemoteId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<RemoteId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<RemoteId>,
}

/// Copies the fields a candidate lead carries. Absent references and an
/// empty label list are left out so they do not overwrite remote values.
impl From<&Lead> for LeadPatch {
    fn from(lead: &Lead) -> Self {
        LeadPatch {
            title: Some(lead.title.clone()),
            owner_id: lead.owner_id.clone(),
            label_ids: (!lead.label_ids.is_empty()).then(|| lead.label_ids.clone()),
            person_id: lead.person_id.clone(),
            organization_id: lead.organization_id.clone(),
        }
    }
}

impl LeadPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn owner_id(mut self, id: impl Into<RemoteId>) -> Self {
        self.owner_id = Some(id.into());
        self
    }

    pub fn label_ids(mut self, ids: Vec<RemoteId>) -> Self {
        self.label_ids = Some(ids);
        self
    }

    pub fn person_id(mut self, id: impl Into<RemoteId>) -> Self {
        self.person_id = Some(id.into());
        self
    }

    pub fn organization_id(mut self, id: impl Into<RemoteId>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &LeadPatch::default()
    }
}

// ============ Contact info ============

/// Shared surface of the contact entries embedded in a person.
pub trait ContactInfo {
    fn value(&self) -> &str;
    fn is_primary(&self) -> bool;
    fn label(&self) -> &str;
}

/// Returns the entry flagged primary, falling back to the first one.
pub fn primary_contact<C: ContactInfo>(contacts: &[C]) -> Option<&C> {
    contacts
        .iter()
        .find(|c| c.is_primary())
        .or_else(|| contacts.first())
}

const DEFAULT_CONTACT_LABEL: &str = "other";

#[derive(Deserialize)]
struct ContactRecord {
    value: String,
    #[serde(default)]
    primary: Option<bool>,
    #[serde(default)]
    label: Option<String>,
}

/// Email contact. `Email::new` validates the address; decoded values are
/// taken as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ContactRecord")]
pub struct Email {
    value: String,
    primary: bool,
    label: String,
}

impl Email {
    /// Creates a primary email labelled "other".
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !is_valid_email(&value) {
            return Err(PipedriveError::Validation(format!(
                "Invalid email address: {}",
                value
            )));
        }
        Ok(Self {
            value,
            primary: true,
            label: DEFAULT_CONTACT_LABEL.to_string(),
        })
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl From<ContactRecord> for Email {
    fn from(record: ContactRecord) -> Self {
        Email {
            value: record.value,
            primary: record.primary.unwrap_or(true),
            label: record
                .label
                .unwrap_or_else(|| DEFAULT_CONTACT_LABEL.to_string()),
        }
    }
}

impl ContactInfo for Email {
    fn value(&self) -> &str {
        &self.value
    }

    fn is_primary(&self) -> bool {
        self.primary
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Phone contact. The number is free-form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ContactRecord")]
pub struct Phone {
    value: String,
    primary: bool,
    label: String,
}

impl Phone {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            primary: true,
            label: DEFAULT_CONTACT_LABEL.to_string(),
        }
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl From<ContactRecord> for Phone {
    fn from(record: ContactRecord) -> Self {
        Phone {
            value: record.value,
            primary: record.primary.unwrap_or(true),
            label: record
                .label
                .unwrap_or_else(|| DEFAULT_CONTACT_LABEL.to_string()),
        }
    }
}

impl ContactInfo for Phone {
    fn value(&self) -> &str {
        &self.value
    }

    fn is_primary(&self) -> bool {
        self.primary
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Pipedrive returns `[{"value": "", "primary": true}]` for a person with no
/// email or phone; blank entries are dropped before decoding.
fn deserialize_contacts<'de, D, C>(deserializer: D) -> std::result::Result<Vec<C>, D::Error>
where
    D: Deserializer<'de>,
    C: serde::de::DeserializeOwned,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .filter(|entry| {
            entry
                .get("value")
                .and_then(|v| v.as_str())
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false)
        })
        .map(|entry| serde_json::from_value(entry).map_err(serde::de::Error::custom))
        .collect()
}

// ============ Persons ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    pub name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_reference"
    )]
    pub org_id: Option<RemoteId>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_contacts"
    )]
    pub email: Vec<Email>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_contacts"
    )]
    pub phone: Vec<Phone>,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            org_id: None,
            email: Vec::new(),
            phone: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: Email) -> Self {
        self.email.push(email);
        self
    }

    pub fn with_phone(mut self, phone: Phone) -> Self {
        self.phone.push(phone);
        self
    }

    /// The email used to look this person up: the first one listed.
    pub fn lookup_email(&self) -> Option<&str> {
        self.email.first().map(|e| e.value())
    }

    pub fn primary_email(&self) -> Option<&Email> {
        primary_contact(&self.email)
    }

    pub fn primary_phone(&self) -> Option<&Phone> {
        primary_contact(&self.phone)
    }
}

// ============ Custom fields ============

/// Which record type a custom field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldSource {
    Person,
    Deal,
}

impl CustomFieldSource {
    /// Collection path segment, e.g. `personFields`.
    pub fn collection(&self) -> &'static str {
        match self {
            CustomFieldSource::Person => "personFields",
            CustomFieldSource::Deal => "dealFields",
        }
    }
}

impl fmt::Display for CustomFieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomFieldSource::Person => f.write_str("person"),
            CustomFieldSource::Deal => f.write_str("deal"),
        }
    }
}

impl FromStr for CustomFieldSource {
    type Err = PipedriveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "person" => Ok(CustomFieldSource::Person),
            "deal" => Ok(CustomFieldSource::Deal),
            other => Err(PipedriveError::Validation(format!(
                "Unknown custom field source: {}",
                other
            ))),
        }
    }
}

/// Choice for set/enum custom fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    pub label: String,
    /// Any extra attributes the remote attaches (color, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: None,
            label: label.into(),
            extra: Map::new(),
        }
    }
}

fn default_visible() -> bool {
    true
}

/// Custom field definition on persons or deals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    pub key: String,
    pub name: String,
    /// Kept as an open string: Pipedrive does not publish a closed list.
    pub field_type: String,
    /// Required for set/enum type fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default = "default_visible")]
    pub add_visible_flag: bool,
}

impl CustomField {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            key: key.into(),
            name: name.into(),
            field_type: field_type.into(),
            options: None,
            add_visible_flag: true,
        }
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = Some(options);
        self
    }
}

/// Partial custom field update. Only fields set to `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomFieldPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_visible_flag: Option<bool>,
}

impl CustomFieldPatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn add_visible_flag(mut self, visible: bool) -> Self {
        self.add_visible_flag = Some(visible);
        self
    }
}

impl From<&CustomField> for CustomFieldPatch {
    /// Full sync of a local definition onto the remote one.
    fn from(field: &CustomField) -> Self {
        Self {
            name: Some(field.name.clone()),
            field_type: Some(field.field_type.clone()),
            options: field.options.clone(),
            add_visible_flag: Some(field.add_visible_flag),
        }
    }
}

/// Values for custom fields, keyed by the field's `key`.
pub type CustomFieldValues = Map<String, Value>;

// ============ Notes ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<RemoteId>,
}

impl Note {
    pub fn new(content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(PipedriveError::Validation(
                "Note content cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id: None,
            content,
            lead_id: None,
            deal_id: None,
            person_id: None,
            org_id: None,
            user_id: None,
        })
    }

    pub fn for_lead(mut self, lead_id: RemoteId) -> Self {
        self.lead_id = Some(lead_id);
        self
    }

    pub fn for_person(mut self, person_id: RemoteId) -> Self {
        self.person_id = Some(person_id);
        self
    }
}
