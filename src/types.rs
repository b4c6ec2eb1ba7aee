/// Shared domain types used across the store adapters, services and handlers

use serde::{Deserialize, Serialize};

/// Trim and lowercase an email so it can be used as an identity.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A directory member. `email` is the identity and is always stored normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub name: String,
    pub law_firm: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub country: String,
    pub groups: Vec<String>,
}

impl Member {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Replace `old` with `new` in the group list. Returns true when anything changed.
    pub fn rename_group(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        for g in self.groups.iter_mut().filter(|g| g.as_str() == old) {
            *g = new.to_string();
            changed = true;
        }
        if changed {
            // A member may already have held `new`
            dedup_preserving_order(&mut self.groups);
        }
        changed
    }
}

/// A practice group. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Result of an insert-or-update keyed by normalized email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

pub(crate) fn dedup_preserving_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(groups: &[&str]) -> Member {
        Member {
            name: "Ann".into(),
            law_firm: "Firm".into(),
            email: "ann@firm.com".into(),
            phone: None,
            country: "PL".into(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Ann@Firm.COM \n"), "ann@firm.com");
    }

    #[test]
    fn rename_group_replaces_and_collapses_duplicates() {
        let mut m = member(&["Tax", "M&A"]);
        assert!(m.rename_group("Tax", "M&A"));
        assert_eq!(m.groups, vec!["M&A".to_string()]);

        let mut untouched = member(&["IP"]);
        assert!(!untouched.rename_group("Tax", "Corporate"));
        assert_eq!(untouched.groups, vec!["IP".to_string()]);
    }

    #[test]
    fn member_serializes_camel_case_without_missing_phone() {
        let json = serde_json::to_value(member(&["Tax"])).unwrap();
        assert_eq!(json["lawFirm"], "Firm");
        assert!(json.get("phone").is_none());
    }
}
