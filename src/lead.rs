//! The lead record collected over one conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript line. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
}

/// A required lead attribute, declared in the order it is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    LastName,
    FirstName,
    Email,
    Phone,
    Age,
    MaritalStatus,
    Profession,
    Income,
    Wealth,
    Goals,
}

impl Field {
    /// All required fields in asking priority.
    pub const REQUIRED: [Self; 10] = [
        Self::LastName,
        Self::FirstName,
        Self::Email,
        Self::Phone,
        Self::Age,
        Self::MaritalStatus,
        Self::Profession,
        Self::Income,
        Self::Wealth,
        Self::Goals,
    ];

    /// Key used in the extraction schema and as the storage column name.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::LastName => "last_name",
            Self::FirstName => "first_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Age => "age",
            Self::MaritalStatus => "marital_status",
            Self::Profession => "profession",
            Self::Income => "income",
            Self::Wealth => "wealth",
            Self::Goals => "goals",
        }
    }

    #[must_use]
    pub const fn is_name(self) -> bool {
        matches!(self, Self::LastName | Self::FirstName)
    }
}

/// A validated value ready to be merged into a [`Lead`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    LastName(String),
    FirstName(String),
    Email(String),
    Phone(String),
    Age(u8),
    MaritalStatus(String),
    Profession(String),
    Income(String),
    Wealth(String),
    Goals(Vec<String>),
    Comment(String),
}

/// Everything known about one prospect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub conversation_id: String,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<u8>,
    pub marital_status: Option<String>,
    pub profession: Option<String>,
    pub income: Option<String>,
    pub wealth: Option<String>,
    pub goals: Option<Vec<String>>,
    pub comment: Option<String>,
    pub conversation_history: Vec<HistoryEntry>,
    pub message_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Create an empty lead for the given conversation.
    #[must_use]
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            last_name: None,
            first_name: None,
            email: None,
            phone: None,
            age: None,
            marital_status: None,
            profession: None,
            income: None,
            wealth: None,
            goals: None,
            comment: None,
            conversation_history: Vec::new(),
            message_count: 0,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn is_set(&self, field: Field) -> bool {
        match field {
            Field::LastName => self.last_name.is_some(),
            Field::FirstName => self.first_name.is_some(),
            Field::Email => self.email.is_some(),
            Field::Phone => self.phone.is_some(),
            Field::Age => self.age.is_some(),
            Field::MaritalStatus => self.marital_status.is_some(),
            Field::Profession => self.profession.is_some(),
            Field::Income => self.income.is_some(),
            Field::Wealth => self.wealth.is_some(),
            Field::Goals => self.goals.is_some(),
        }
    }

    /// Required fields not yet set, in asking priority.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::REQUIRED
            .into_iter()
            .filter(|field| !self.is_set(*field))
            .collect()
    }

    /// The field currently being asked about.
    #[must_use]
    pub fn current_field(&self) -> Option<Field> {
        Field::REQUIRED
            .into_iter()
            .find(|field| !self.is_set(*field))
    }

    /// All required fields are set. The comment is not required.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current_field().is_none()
    }

    /// Merge a validated value. Returns whether the stored value changed.
    pub fn apply(&mut self, update: FieldUpdate) -> bool {
        match update {
            FieldUpdate::LastName(v) => replace(&mut self.last_name, v),
            FieldUpdate::FirstName(v) => replace(&mut self.first_name, v),
            FieldUpdate::Email(v) => replace(&mut self.email, v),
            FieldUpdate::Phone(v) => replace(&mut self.phone, v),
            FieldUpdate::Age(v) => replace(&mut self.age, v),
            FieldUpdate::MaritalStatus(v) => replace(&mut self.marital_status, v),
            FieldUpdate::Profession(v) => replace(&mut self.profession, v),
            FieldUpdate::Income(v) => replace(&mut self.income, v),
            FieldUpdate::Wealth(v) => replace(&mut self.wealth, v),
            FieldUpdate::Goals(v) => replace(&mut self.goals, v),
            FieldUpdate::Comment(v) => replace(&mut self.comment, v),
        }
    }

    /// Append a transcript entry stamped with the current time.
    pub fn record(&mut self, role: Role, content: impl Into<String>) {
        self.conversation_history.push(HistoryEntry {
            timestamp: Utc::now(),
            role,
            content: content.into(),
        });
    }

    /// The most recent assistant message, if any.
    #[must_use]
    pub fn last_assistant_message(&self) -> Option<&str> {
        self.conversation_history
            .iter()
            .rev()
            .find(|entry| entry.role == Role::Assistant)
            .map(|entry| entry.content.as_str())
    }
}

fn replace<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        return false;
    }
    *slot = Some(value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Lead {
        let mut lead = Lead::new("conv-1");
        lead.apply(FieldUpdate::LastName("Dupont".into()));
        lead.apply(FieldUpdate::FirstName("Marie".into()));
        lead.apply(FieldUpdate::Email("marie@example.fr".into()));
        lead.apply(FieldUpdate::Phone("0612345678".into()));
        lead.apply(FieldUpdate::Age(42));
        lead.apply(FieldUpdate::MaritalStatus("Marié(e)".into()));
        lead.apply(FieldUpdate::Profession("Fonctionnaire".into()));
        lead.apply(FieldUpdate::Income("40 000€ - 60 000€".into()));
        lead.apply(FieldUpdate::Wealth("50 000€ - 100 000€".into()));
        lead.apply(FieldUpdate::Goals(vec!["Préparer ma retraite".into()]));
        lead
    }

    #[test]
    fn fresh_lead_misses_everything_in_order() {
        let lead = Lead::new("conv-1");
        assert_eq!(lead.missing_fields(), Field::REQUIRED.to_vec());
        assert_eq!(lead.current_field(), Some(Field::LastName));
        assert_eq!(lead.message_count, 0);
        assert!(!lead.is_complete());
    }

    #[test]
    fn missing_fields_keep_relative_order() {
        let mut lead = Lead::new("conv-1");
        lead.apply(FieldUpdate::LastName("Dupont".into()));
        lead.apply(FieldUpdate::FirstName("Marie".into()));
        lead.apply(FieldUpdate::Email("marie@example.fr".into()));

        assert_eq!(lead.missing_fields(), Field::REQUIRED[3..].to_vec());
        assert_eq!(lead.current_field(), Some(Field::Phone));
    }

    #[test]
    fn complete_without_comment() {
        let lead = filled();
        assert!(lead.is_complete());
        assert!(lead.missing_fields().is_empty());
        assert!(lead.comment.is_none());
    }

    #[test]
    fn apply_reports_changes_only() {
        let mut lead = Lead::new("conv-1");
        assert!(lead.apply(FieldUpdate::Age(30)));
        assert!(!lead.apply(FieldUpdate::Age(30)));
        assert!(lead.apply(FieldUpdate::Age(31)));
        assert_eq!(lead.age, Some(31));
    }

    #[test]
    fn field_keys_are_distinct() {
        let mut keys: Vec<&str> = Field::REQUIRED.into_iter().map(Field::key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), Field::REQUIRED.len());
        assert!(!keys.contains(&"comment"));
    }

    #[test]
    fn last_assistant_message_skips_user_entries() {
        let mut lead = Lead::new("conv-1");
        assert_eq!(lead.last_assistant_message(), None);
        lead.record(Role::Assistant, "Quel âge avez-vous ?");
        lead.record(Role::User, "42");
        assert_eq!(lead.last_assistant_message(), Some("Quel âge avez-vous ?"));
    }
}
