#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::{validate_text, validate_token};
use crate::{
    AccountId, ContractViolation, SchemaVersion, SubmissionId, SubmitterId, UnixTimeMs, Validate,
};

pub const SUBMISSION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Signature,
    Initials,
    Date,
    Number,
    Image,
    File,
    Checkbox,
    Select,
    Radio,
    Multiple,
    Cells,
    Phone,
    Payment,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Signature => "signature",
            FieldType::Initials => "initials",
            FieldType::Date => "date",
            FieldType::Number => "number",
            FieldType::Image => "image",
            FieldType::File => "file",
            FieldType::Checkbox => "checkbox",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Multiple => "multiple",
            FieldType::Cells => "cells",
            FieldType::Phone => "phone",
            FieldType::Payment => "payment",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ContractViolation> {
        let out = match raw {
            "text" => FieldType::Text,
            "signature" => FieldType::Signature,
            "initials" => FieldType::Initials,
            "date" => FieldType::Date,
            "number" => FieldType::Number,
            "image" => FieldType::Image,
            "file" => FieldType::File,
            "checkbox" => FieldType::Checkbox,
            "select" => FieldType::Select,
            "radio" => FieldType::Radio,
            "multiple" => FieldType::Multiple,
            "cells" => FieldType::Cells,
            "phone" => FieldType::Phone,
            "payment" => FieldType::Payment,
            _ => {
                return Err(ContractViolation::InvalidValue {
                    field: "template_field.field_type",
                    reason: "unknown field type",
                })
            }
        };
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldPreferences {
    pub currency: Option<String>,
    pub price: Option<Decimal>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    pub uuid: String,
    pub field_type: FieldType,
    pub submitter_uuid: String,
    pub name: Option<String>,
    #[serde(default)]
    pub preferences: FieldPreferences,
}

impl TemplateField {
    pub fn v1(
        uuid: String,
        field_type: FieldType,
        submitter_uuid: String,
        name: Option<String>,
        preferences: FieldPreferences,
    ) -> Result<Self, ContractViolation> {
        let field = Self {
            uuid,
            field_type,
            submitter_uuid,
            name,
            preferences,
        };
        field.validate()?;
        Ok(field)
    }
}

impl Validate for TemplateField {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token("template_field.uuid", &self.uuid, 64)?;
        validate_token("template_field.submitter_uuid", &self.submitter_uuid, 64)?;
        if let Some(currency) = &self.preferences.currency {
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(ContractViolation::InvalidValue {
                    field: "template_field.preferences.currency",
                    reason: "must be a 3-letter upper-case currency code",
                });
            }
        }
        if let Some(price) = self.preferences.price {
            if price.is_sign_negative() {
                return Err(ContractViolation::InvalidValue {
                    field: "template_field.preferences.price",
                    reason: "must be >= 0",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSubmitter {
    pub uuid: String,
    pub name: String,
}

/// Visual schema entry linking an uploaded page image into the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaItem {
    pub attachment_uuid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub uuid: String,
    pub filename: String,
    pub url: Option<String>,
    pub is_image: bool,
    #[serde(default)]
    pub bytes: Vec<u8>,
    /// Digest recorded by the blob store at upload time, if any.
    pub sha256: Option<String>,
    pub created_at: UnixTimeMs,
}

impl Validate for Document {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token("document.uuid", &self.uuid, 64)?;
        validate_text("document.filename", &self.filename, 512)?;
        if self.created_at.0 <= 0 {
            return Err(ContractViolation::InvalidValue {
                field: "document.created_at",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub submitters: Vec<TemplateSubmitter>,
    pub fields: Vec<TemplateField>,
    pub documents: Vec<Document>,
    #[serde(default)]
    pub schema: Vec<SchemaItem>,
}

impl Validate for Template {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("template.name", &self.name, 256)?;
        let mut submitter_uuids = BTreeSet::new();
        for item in &self.submitters {
            validate_token("template.submitters.uuid", &item.uuid, 64)?;
            if !submitter_uuids.insert(item.uuid.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "template.submitters",
                    reason: "submitter uuids must be unique",
                });
            }
        }
        let mut field_uuids = BTreeSet::new();
        for field in &self.fields {
            field.validate()?;
            if !field_uuids.insert(field.uuid.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "template.fields",
                    reason: "field uuids must be unique",
                });
            }
        }
        for doc in &self.documents {
            doc.validate()?;
        }
        Ok(())
    }
}

/// A submitted field value as persisted: scalar, boolean, number, or list
/// (multi-select, file uuids).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedValue {
    Bool(bool),
    Text(String),
    Number(serde_json::Number),
    List(Vec<String>),
}

impl SubmittedValue {
    /// `false`, whitespace-only text and lists of blank entries count as blank.
    /// Numbers, zero included, never do.
    pub fn is_blank(&self) -> bool {
        match self {
            SubmittedValue::Bool(b) => !*b,
            SubmittedValue::Text(s) => s.trim().is_empty(),
            SubmittedValue::Number(_) => false,
            SubmittedValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }

    /// Non-blank entries, in order. Scalars produce a single entry.
    pub fn entries(&self) -> Vec<String> {
        match self {
            SubmittedValue::Bool(b) => vec![b.to_string()],
            SubmittedValue::Text(s) if s.trim().is_empty() => Vec::new(),
            SubmittedValue::Text(s) => vec![s.clone()],
            SubmittedValue::Number(n) => vec![n.to_string()],
            SubmittedValue::List(items) => items
                .iter()
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitterAttachment {
    pub uuid: String,
    pub filename: String,
    pub url: Option<String>,
    #[serde(default)]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    pub id: SubmitterId,
    pub uuid: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub completed_at: Option<UnixTimeMs>,
    #[serde(default)]
    pub attachments: Vec<SubmitterAttachment>,
    #[serde(default)]
    pub values: BTreeMap<String, SubmittedValue>,
    /// Result documents produced when this submitter completed.
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl Submitter {
    pub fn attachment(&self, uuid: &str) -> Option<&SubmitterAttachment> {
        self.attachments.iter().find(|a| a.uuid == uuid)
    }

    pub fn value(&self, field_uuid: &str) -> Option<&SubmittedValue> {
        self.values.get(field_uuid)
    }
}

impl Validate for Submitter {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token("submitter.uuid", &self.uuid, 64)?;
        let mut attachment_uuids = BTreeSet::new();
        for attachment in &self.attachments {
            validate_token("submitter.attachments.uuid", &attachment.uuid, 64)?;
            if !attachment_uuids.insert(attachment.uuid.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "submitter.attachments",
                    reason: "attachment uuids must be unique",
                });
            }
        }
        for doc in &self.documents {
            doc.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionEventType {
    SendEmail,
    BounceEmail,
    ComplaintEmail,
    SendReminderEmail,
    SendSms,
    #[serde(rename = "send_2fa_sms")]
    Send2faSms,
    OpenEmail,
    ClickEmail,
    ClickSms,
    PhoneVerified,
    StartForm,
    ViewForm,
    InviteParty,
    CompleteForm,
    DeclineForm,
    ApiCompleteForm,
}

impl SubmissionEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionEventType::SendEmail => "send_email",
            SubmissionEventType::BounceEmail => "bounce_email",
            SubmissionEventType::ComplaintEmail => "complaint_email",
            SubmissionEventType::SendReminderEmail => "send_reminder_email",
            SubmissionEventType::SendSms => "send_sms",
            SubmissionEventType::Send2faSms => "send_2fa_sms",
            SubmissionEventType::OpenEmail => "open_email",
            SubmissionEventType::ClickEmail => "click_email",
            SubmissionEventType::ClickSms => "click_sms",
            SubmissionEventType::PhoneVerified => "phone_verified",
            SubmissionEventType::StartForm => "start_form",
            SubmissionEventType::ViewForm => "view_form",
            SubmissionEventType::InviteParty => "invite_party",
            SubmissionEventType::CompleteForm => "complete_form",
            SubmissionEventType::DeclineForm => "decline_form",
            SubmissionEventType::ApiCompleteForm => "api_complete_form",
        }
    }

    pub fn human_name(self) -> &'static str {
        match self {
            SubmissionEventType::SendEmail => "Email sent",
            SubmissionEventType::BounceEmail => "Email bounced",
            SubmissionEventType::ComplaintEmail => "Email marked as spam",
            SubmissionEventType::SendReminderEmail => "Reminder email sent",
            SubmissionEventType::SendSms => "SMS sent",
            SubmissionEventType::Send2faSms => "Verification SMS sent",
            SubmissionEventType::OpenEmail => "Email opened",
            SubmissionEventType::ClickEmail => "Email link clicked",
            SubmissionEventType::ClickSms => "SMS link clicked",
            SubmissionEventType::PhoneVerified => "Phone verified",
            SubmissionEventType::StartForm => "Submission started",
            SubmissionEventType::ViewForm => "Form viewed",
            SubmissionEventType::InviteParty => "Invited",
            SubmissionEventType::CompleteForm => "Submission completed",
            SubmissionEventType::DeclineForm => "Submission declined",
            SubmissionEventType::ApiCompleteForm => "Submission completed via API",
        }
    }

    /// Outbound deliveries read "<event> to <target>".
    pub fn is_send(self) -> bool {
        self.as_str().contains("send_")
    }

    /// Events whose target is the submitter's phone number.
    pub fn targets_phone(self) -> bool {
        let s = self.as_str();
        s.contains("sms") || s.contains("phone")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventData {
    pub ip: Option<String>,
    pub sid: Option<String>,
    pub ua: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionEvent {
    pub submitter_uuid: String,
    pub event_type: SubmissionEventType,
    pub timestamp: UnixTimeMs,
    #[serde(default)]
    pub data: EventData,
}

impl SubmissionEvent {
    pub fn v1(
        submitter_uuid: String,
        event_type: SubmissionEventType,
        timestamp: UnixTimeMs,
        data: EventData,
    ) -> Result<Self, ContractViolation> {
        let event = Self {
            submitter_uuid,
            event_type,
            timestamp,
            data,
        };
        event.validate()?;
        Ok(event)
    }
}

impl Validate for SubmissionEvent {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token("submission_event.submitter_uuid", &self.submitter_uuid, 64)?;
        if self.timestamp.0 <= 0 {
            return Err(ContractViolation::InvalidValue {
                field: "submission_event.timestamp",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTimezone {
    pub utc_offset_minutes: i32,
    pub abbreviation: String,
}

impl AccountTimezone {
    pub fn utc() -> Self {
        Self {
            utc_offset_minutes: 0,
            abbreviation: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSettings {
    pub account_id: AccountId,
    pub timezone: AccountTimezone,
    pub locale: String,
    pub timestamp_authority_url: Option<String>,
}

impl AccountSettings {
    pub fn v1(
        account_id: AccountId,
        timezone: AccountTimezone,
        locale: String,
        timestamp_authority_url: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let settings = Self {
            account_id,
            timezone,
            locale,
            timestamp_authority_url,
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for AccountSettings {
    fn validate(&self) -> Result<(), ContractViolation> {
        let offset = self.timezone.utc_offset_minutes;
        if !(-14 * 60..=14 * 60).contains(&offset) {
            return Err(ContractViolation::InvalidRange {
                field: "account_settings.timezone.utc_offset_minutes",
                min: -840.0,
                max: 840.0,
                got: f64::from(offset),
            });
        }
        // Zones without a lettered abbreviation print their offset, e.g. "+04".
        validate_text(
            "account_settings.timezone.abbreviation",
            &self.timezone.abbreviation,
            16,
        )?;
        validate_token("account_settings.locale", &self.locale, 16)?;
        if let Some(url) = &self.timestamp_authority_url {
            validate_text("account_settings.timestamp_authority_url", url, 2048)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub schema_version: SchemaVersion,
    pub id: SubmissionId,
    pub account_id: AccountId,
    pub template: Template,
    pub submitters: Vec<Submitter>,
    pub events: Vec<SubmissionEvent>,
    /// Embedded (white-label) submissions carry no verification link.
    pub source_embed: bool,
}

impl Submission {
    pub fn v1(
        id: SubmissionId,
        account_id: AccountId,
        template: Template,
        submitters: Vec<Submitter>,
        events: Vec<SubmissionEvent>,
        source_embed: bool,
    ) -> Result<Self, ContractViolation> {
        let submission = Self {
            schema_version: SUBMISSION_CONTRACT_VERSION,
            id,
            account_id,
            template,
            submitters,
            events,
            source_embed,
        };
        submission.validate()?;
        Ok(submission)
    }

    pub fn submitter_by_uuid(&self, uuid: &str) -> Option<&Submitter> {
        self.submitters.iter().find(|s| s.uuid == uuid)
    }

    /// The submitter with the latest completion time; on ties the later entry wins.
    pub fn last_completed_submitter(&self) -> Option<&Submitter> {
        self.submitters
            .iter()
            .filter_map(|s| s.completed_at.map(|t| (t, s)))
            .max_by_key(|(t, _)| *t)
            .map(|(_, s)| s)
    }
}

impl Validate for Submission {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != SUBMISSION_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "submission.schema_version",
                reason: "must match SUBMISSION_CONTRACT_VERSION",
            });
        }
        if self.id.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "submission.id",
                reason: "must be > 0",
            });
        }
        self.template.validate()?;
        let mut uuids = BTreeSet::new();
        for submitter in &self.submitters {
            submitter.validate()?;
            if !uuids.insert(submitter.uuid.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "submission.submitters",
                    reason: "submitter uuids must be unique",
                });
            }
        }
        for event in &self.events {
            event.validate()?;
        }
        Ok(())
    }
}
