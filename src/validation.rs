//! Request payload validation for member writes.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::types::{dedup_preserving_order, normalize_email, Member};

/// Minimum length of a modification key accepted by the modify endpoint.
pub const MIN_KEY_LENGTH: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Field-level validation failure. Keys are the JSON field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub fields: HashMap<String, String>,
}

impl ValidationErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<&String> = self.fields.keys().collect();
        fields.sort();
        let joined = fields.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ");
        write!(f, "Invalid fields: {}", joined)
    }
}

impl std::error::Error for ValidationErrors {}

/// Raw member payload as sent by the admin panel or the modify form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPayload {
    pub name: Option<String>,
    pub law_firm: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub groups: Option<Vec<String>>,
}

/// Body of the modify endpoint: the key plus a full member payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModifyPayload {
    pub key: Option<String>,
    #[serde(flatten)]
    pub member: MemberPayload,
}

impl MemberPayload {
    /// Validate and normalize into a `Member`.
    pub fn validate(&self) -> Result<Member, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = required(&mut errors, "name", &self.name);
        let law_firm = required(&mut errors, "lawFirm", &self.law_firm);
        let country = required(&mut errors, "country", &self.country);

        let email = normalize_email(self.email.as_deref().unwrap_or_default());
        if email.is_empty() {
            errors.add("email", "This field is required");
        } else if !is_valid_email(&email) {
            errors.add("email", "Invalid email address");
        }

        let phone = self
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let mut groups = Vec::new();
        match &self.groups {
            None => errors.add("groups", "At least one group is required"),
            Some(raw) => {
                if raw.iter().any(|g| g.trim().is_empty()) {
                    errors.add("groups", "Group names cannot be empty");
                }
                groups = raw.iter().map(|g| g.trim().to_string()).filter(|g| !g.is_empty()).collect();
                dedup_preserving_order(&mut groups);
                if groups.is_empty() {
                    errors.add("groups", "At least one group is required");
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Member {
            name,
            law_firm,
            email,
            phone,
            country,
            groups,
        })
    }
}

impl ModifyPayload {
    /// Validate the key and the member fields together.
    pub fn validate(&self) -> Result<(String, Member), ValidationErrors> {
        let key = self.key.as_deref().map(str::trim).unwrap_or_default().to_string();
        let member = self.member.validate();

        let mut errors = match &member {
            Ok(_) => ValidationErrors::default(),
            Err(e) => e.clone(),
        };
        if key.chars().count() < MIN_KEY_LENGTH {
            errors.add("key", format!("Key must be at least {} characters", MIN_KEY_LENGTH));
        }

        match member {
            Ok(member) if errors.is_empty() => Ok((key, member)),
            _ => Err(errors),
        }
    }
}

fn required(errors: &mut ValidationErrors, field: &str, value: &Option<String>) -> String {
    let trimmed = value.as_deref().map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.add(field, "This field is required");
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> MemberPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn valid_payload_is_normalized() {
        let member = payload(json!({
            "name": " Ann Nowak ",
            "lawFirm": "Nowak & Co",
            "email": " Ann@Nowak.PL ",
            "phone": "  ",
            "country": "Poland",
            "groups": ["Tax", " Tax ", "IP"]
        }))
        .validate()
        .unwrap();

        assert_eq!(member.name, "Ann Nowak");
        assert_eq!(member.email, "ann@nowak.pl");
        assert_eq!(member.phone, None);
        assert_eq!(member.groups, vec!["Tax", "IP"]);
    }

    #[test]
    fn missing_fields_are_reported_individually() {
        let errors = payload(json!({ "email": "not-an-email", "groups": [] }))
            .validate()
            .unwrap_err();

        for field in ["name", "lawFirm", "country", "email", "groups"] {
            assert!(errors.fields.contains_key(field), "missing error for {}", field);
        }
        assert_eq!(errors.fields["email"], "Invalid email address");
    }

    #[test]
    fn blank_group_names_are_rejected() {
        let errors = payload(json!({
            "name": "A", "lawFirm": "B", "email": "a@b.co", "country": "PL",
            "groups": ["Tax", ""]
        }))
        .validate()
        .unwrap_err();
        assert!(errors.fields.contains_key("groups"));
    }

    #[test]
    fn modify_payload_requires_key() {
        let body: ModifyPayload = serde_json::from_value(json!({
            "key": "abc",
            "name": "A", "lawFirm": "B", "email": "a@b.co", "country": "PL", "groups": ["Tax"]
        }))
        .unwrap();
        let errors = body.validate().unwrap_err();
        assert_eq!(errors.fields.len(), 1);
        assert!(errors.fields.contains_key("key"));
    }

    #[test]
    fn modify_payload_flattens_member_fields() {
        let body: ModifyPayload = serde_json::from_value(json!({
            "key": "abcdef123456",
            "name": "A", "lawFirm": "B", "email": "A@B.co", "country": "PL", "groups": ["Tax"]
        }))
        .unwrap();
        let (key, member) = body.validate().unwrap();
        assert_eq!(key, "abcdef123456");
        assert_eq!(member.email, "a@b.co");
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("jan@kancelaria.pl"));
        assert!(!is_valid_email("jan@kancelaria"));
        assert!(!is_valid_email("jan kowalski@x.pl"));
    }
}
