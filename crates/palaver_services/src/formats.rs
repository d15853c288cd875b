use palaver_domain::OutputFormat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An event extracted from free text.
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct CalendarEvent {
    pub name: String,
    pub date: String,
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct ContactInfo {
    /// Name of the person
    pub name: String,
    /// Email address of the person
    pub email: String,
    /// Phone number of the person
    pub phone: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct ContactList {
    /// Contacts found in the text
    pub contacts: Vec<ContactInfo>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactReasonKind {
    Billing,
    Collection,
    TechnicalSupport,
    Cancellation,
    Retention,
    Purchase,
    GeneralInformation,
    Complaint,
    Other,
}

/// Main reason of a call center contact.
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct ContactReason {
    /// The customer's words, unchanged
    pub utterance: String,
    pub reason: ContactReasonKind,
    /// Between 0 and 1
    pub confidence: f32,
    /// One sentence
    pub justification: String,
}

/// Output formats that can be selected by name.
#[derive(Default)]
pub struct FormatRegistry;

impl FormatRegistry {
    pub fn formats(&self) -> Vec<OutputFormat> {
        vec![
            OutputFormat::of::<CalendarEvent>("calendar_event"),
            OutputFormat::of::<ContactList>("contact_list"),
            OutputFormat::of::<ContactReason>("contact_reason"),
        ]
    }

    pub fn names(&self) -> Vec<String> {
        self.formats().into_iter().map(|format| format.name).collect()
    }

    pub fn find(&self, name: &str) -> Option<OutputFormat> {
        self.formats()
            .into_iter()
            .find(|format| format.name == name.trim())
    }
}
