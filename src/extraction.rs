//! Turning one visitor message into validated field updates.
//!
//! Candidates come from one of three places: the message itself when it answers
//! the comment prompt, the message itself when it is a bare name, or the
//! language model. Every candidate then goes through the validator; rejected
//! ones are dropped and the visitor is simply asked again.

use serde_json::{Value, json};

use crate::catalog;
use crate::lead::{Field, FieldUpdate, Lead};
use crate::llm::{ExtractionSchema, LanguageModel, Message};
use crate::validator;

/// What the current turn is trying to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Field(Field),
    Comment,
}

impl Target {
    /// First missing field, or the comment once every required field is set.
    #[must_use]
    pub fn for_lead(lead: &Lead) -> Self {
        lead.current_field().map_or(Self::Comment, Self::Field)
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Field(field) => field.key(),
            Self::Comment => "comment",
        }
    }
}

/// Where a turn's candidates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// The message answered the comment prompt and was taken verbatim.
    Comment,
    /// A single alphabetic word while a name was being asked.
    NameShortcut,
    Model,
    /// The message was blank. Nothing was extracted.
    Blank,
    /// The model call failed. Nothing was extracted.
    Failed,
}

/// Validated output of one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub updates: Vec<FieldUpdate>,
    pub source: ExtractionSource,
}

/// Extract and validate candidates from `message`.
///
/// `lead` must already contain `message` as its latest transcript entry.
/// A blank message extracts nothing, so it can never become the comment.
/// Never fails: a collaborator error yields an empty [`ExtractionSource::Failed`] result.
pub fn extract(
    model: &dyn LanguageModel,
    lead: &Lead,
    message: &str,
    context_window: usize,
) -> Extraction {
    let target = Target::for_lead(lead);

    if message.trim().is_empty() {
        return Extraction {
            updates: Vec::new(),
            source: ExtractionSource::Blank,
        };
    }

    if target == Target::Comment
        && lead.comment.is_none()
        && lead.last_assistant_message() == Some(catalog::COMMENT_PROMPT)
    {
        return Extraction {
            updates: vec![FieldUpdate::Comment(message.to_string())],
            source: ExtractionSource::Comment,
        };
    }

    if let Target::Field(field) = target
        && field.is_name()
        && is_single_word(message)
    {
        let candidates = json!({ field.key(): message.trim() });
        return Extraction {
            updates: validate_candidates(&candidates),
            source: ExtractionSource::NameShortcut,
        };
    }

    let messages = vec![
        Message::system(system_prompt(&recent_context(lead, context_window), target)),
        Message::user(message),
    ];

    match model.extract(&messages, &schema()) {
        Ok(candidates) => Extraction {
            updates: validate_candidates(&candidates),
            source: ExtractionSource::Model,
        },
        Err(e) => {
            tracing::warn!(
                "Extraction failed for {} (target {}): {e:#}",
                lead.conversation_id,
                target.key()
            );
            Extraction {
                updates: Vec::new(),
                source: ExtractionSource::Failed,
            }
        }
    }
}

/// Schema handed to the model. Every required field is optional in the reply.
#[must_use]
pub fn schema() -> ExtractionSchema {
    ExtractionSchema {
        name: "extract_lead_info",
        description: "Extrait et valide les informations du prospect",
        parameters: json!({
            "type": "object",
            "properties": {
                "last_name": { "type": "string" },
                "first_name": { "type": "string" },
                "email": { "type": "string" },
                "phone": { "type": "string" },
                "age": { "type": "integer" },
                "marital_status": { "type": "string" },
                "profession": { "type": "string", "enum": catalog::PROFESSIONS },
                "income": { "type": "string", "enum": catalog::INCOME_BRACKETS },
                "wealth": {
                    "type": "object",
                    "properties": {
                        "amount": { "type": "string", "enum": catalog::WEALTH_BRACKETS },
                        "details": { "type": "string" }
                    }
                },
                "goals": {
                    "type": "array",
                    "items": { "type": "string", "enum": catalog::GOALS }
                }
            }
        }),
    }
}

/// Validate every recognised key of a candidate object, in asking order.
#[must_use]
pub fn validate_candidates(candidates: &Value) -> Vec<FieldUpdate> {
    let Some(object) = candidates.as_object() else {
        return Vec::new();
    };

    Field::REQUIRED
        .into_iter()
        .filter_map(|field| {
            let value = object.get(field.key()).filter(|v| !v.is_null())?;
            match validate_field(field, value) {
                Ok(update) => Some(update),
                Err(reason) => {
                    tracing::debug!("Dropped {} candidate {value}: {reason}", field.key());
                    None
                }
            }
        })
        .collect()
}

fn validate_field(field: Field, value: &Value) -> Result<FieldUpdate, String> {
    let text = || scalar_text(value).ok_or_else(|| "expected a string".to_string());

    let update = match field {
        Field::LastName => FieldUpdate::LastName(validator::check_name(&text()?).map_err(reject)?),
        Field::FirstName => {
            FieldUpdate::FirstName(validator::check_name(&text()?).map_err(reject)?)
        }
        Field::Email => FieldUpdate::Email(validator::check_email(&text()?).map_err(reject)?),
        Field::Phone => FieldUpdate::Phone(validator::check_phone(&text()?).map_err(reject)?),
        Field::Age => {
            let age = whole_number(value).ok_or_else(|| "expected an integer".to_string())?;
            FieldUpdate::Age(validator::check_age(age).map_err(reject)?)
        }
        Field::MaritalStatus => FieldUpdate::MaritalStatus(
            validator::check_marital_status(&text()?)
                .map_err(reject)?
                .to_string(),
        ),
        Field::Profession => FieldUpdate::Profession(
            validator::check_profession(&text()?)
                .map_err(reject)?
                .to_string(),
        ),
        Field::Income => FieldUpdate::Income(
            validator::check_income(&text()?)
                .map_err(reject)?
                .to_string(),
        ),
        Field::Wealth => {
            let amount = unwrap_amount(value);
            let raw = scalar_text(amount).ok_or_else(|| "expected an amount".to_string())?;
            FieldUpdate::Wealth(validator::check_wealth(&raw).map_err(reject)?.to_string())
        }
        Field::Goals => {
            let goals = string_list(value).ok_or_else(|| "expected a list of strings".to_string())?;
            FieldUpdate::Goals(validator::check_goals(&goals).map_err(reject)?)
        }
    };

    Ok(update)
}

fn reject(rejection: validator::Rejection) -> String {
    rejection.to_string()
}

/// `{amount, details}` objects are reduced to their amount.
fn unwrap_amount(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|o| o.get("amount").or_else(|| o.get("montant")))
        .unwrap_or(value)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn whole_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::String(s) => Some(vec![s.clone()]),
        _ => None,
    }
}

fn is_single_word(message: &str) -> bool {
    let word = message.trim();
    !word.is_empty() && word.chars().all(char::is_alphabetic)
}

fn recent_context(lead: &Lead, window: usize) -> String {
    let history = &lead.conversation_history;
    history[history.len().saturating_sub(window)..]
        .iter()
        .map(|entry| entry.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn system_prompt(context: &str, target: Target) -> String {
    format!(
        "Vous êtes un expert en extraction d'informations précises.\n\
         Votre tâche est d'extraire spécifiquement les informations demandées du message de l'utilisateur.\n\n\
         Contexte de la conversation:\n{context}\n\n\
         Champ actuellement demandé: {}",
        target.key()
    )
}
