//! Per-field validation and normalization.
//!
//! Every check is pure: it either returns the normalized value to store or a
//! [`Rejection`] carrying the reason that would be shown to the visitor.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::catalog;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-zÀ-ÿ][A-Za-zÀ-ÿ' -]*$").expect("valid name regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("valid email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+33|0)[1-9][0-9]{8}$").expect("valid phone regex"));

/// Synonyms (already accent-folded) mapped to their marital status catalog entry.
const MARITAL_SYNONYMS: &[(&str, &str)] = &[
    ("celibataire", "Célibataire"),
    ("mariee", "Marié(e)"),
    ("marie", "Marié(e)"),
    ("pacsee", "Pacsé(e)"),
    ("pacse", "Pacsé(e)"),
    ("divorcee", "Divorcé(e)"),
    ("divorce", "Divorcé(e)"),
    ("veuve", "Veuf/Veuve"),
    ("veuf", "Veuf/Veuve"),
];

const MIN_NAME_LEN: usize = 2;
const MAX_NAME_LEN: usize = 50;
const MIN_AGE: i64 = 18;
const MAX_AGE: i64 = 120;

/// Why a candidate value was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    reason: String,
}

impl Rejection {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for Rejection {}

pub type Check<T> = Result<T, Rejection>;

/// Validate a last or first name and return it capitalized.
pub fn check_name(raw: &str) -> Check<String> {
    let name = raw.trim();
    let len = name.chars().count();

    if len < MIN_NAME_LEN {
        return Err(Rejection::new(
            "Le nom semble trop court. Pourriez-vous le vérifier ?",
        ));
    }
    if len > MAX_NAME_LEN {
        return Err(Rejection::new(
            "Le nom semble trop long. Pourriez-vous le vérifier ?",
        ));
    }
    if !NAME_RE.is_match(name) {
        return Err(Rejection::new(
            "Le nom contient des caractères non autorisés. Pourriez-vous le vérifier ?",
        ));
    }

    Ok(capitalize(name))
}

/// Validate an email address and return it lower-cased.
pub fn check_email(raw: &str) -> Check<String> {
    let email = raw.trim();
    if EMAIL_RE.is_match(email) {
        Ok(email.to_lowercase())
    } else {
        Err(Rejection::new(
            "L'adresse email n'est pas valide. Pourriez-vous la vérifier ?",
        ))
    }
}

/// Validate a French phone number and return it without separators.
pub fn check_phone(raw: &str) -> Check<String> {
    let cleaned = clean_phone(raw);
    if PHONE_RE.is_match(&cleaned) {
        Ok(cleaned)
    } else {
        Err(Rejection::new(
            "Le numéro de téléphone n'est pas valide. Pourriez-vous le vérifier ?",
        ))
    }
}

/// Validate an age in whole years.
pub fn check_age(age: i64) -> Check<u8> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        u8::try_from(age).map_err(|_| age_rejection())
    } else {
        Err(age_rejection())
    }
}

fn age_rejection() -> Rejection {
    Rejection::new("L'âge doit être compris entre 18 et 120 ans.")
}

/// Map free text such as "mariée" onto a marital status catalog entry.
pub fn check_marital_status(raw: &str) -> Check<&'static str> {
    let input = normalize(raw);

    if !input.is_empty() {
        for (synonym, canonical) in MARITAL_SYNONYMS {
            if input.contains(synonym) {
                return Ok(*canonical);
            }
        }
    }

    Err(Rejection::new(format!(
        "Veuillez choisir parmi : {}",
        catalog::MARITAL_STATUSES.join(", ")
    )))
}

/// Accept a profession only if it is spelled exactly as in [`catalog::PROFESSIONS`].
pub fn check_profession(raw: &str) -> Check<&'static str> {
    check_choice(
        raw,
        catalog::PROFESSIONS,
        "Veuillez choisir parmi les professions suivantes",
    )
}

/// Accept an annual income bracket from [`catalog::INCOME_BRACKETS`], exact match.
pub fn check_income(raw: &str) -> Check<&'static str> {
    check_choice(
        raw,
        catalog::INCOME_BRACKETS,
        "Veuillez choisir parmi les tranches suivantes",
    )
}

/// Accept a wealth bracket from [`catalog::WEALTH_BRACKETS`], exact match.
///
/// Callers unwrap `{amount, details}` objects before getting here.
pub fn check_wealth(raw: &str) -> Check<&'static str> {
    check_choice(
        raw,
        catalog::WEALTH_BRACKETS,
        "Veuillez choisir parmi les tranches suivantes",
    )
}

/// Shared exact-match lookup. The rejection lists every option.
fn check_choice(raw: &str, options: &[&'static str], prompt: &str) -> Check<&'static str> {
    options
        .iter()
        .find(|option| **option == raw)
        .copied()
        .ok_or_else(|| Rejection::new(format!("{prompt} :\n{}", options.join(", "))))
}

/// Validate a goal selection. Duplicates are collapsed, first occurrence wins.
pub fn check_goals(goals: &[String]) -> Check<Vec<String>> {
    if goals.is_empty() {
        return Err(Rejection::new(
            "Veuillez sélectionner au moins un objectif.",
        ));
    }

    let invalid: Vec<&str> = goals
        .iter()
        .map(String::as_str)
        .filter(|goal| !catalog::GOALS.contains(goal))
        .collect();

    if !invalid.is_empty() {
        return Err(Rejection::new(format!(
            "Les objectifs suivants ne sont pas valides : {}\nVeuillez choisir parmi : {}",
            invalid.join(", "),
            catalog::GOALS.join(", ")
        )));
    }

    let mut accepted: Vec<String> = Vec::with_capacity(goals.len());
    for goal in goals {
        if !accepted.contains(goal) {
            accepted.push(goal.clone());
        }
    }
    Ok(accepted)
}

/// Render a stored phone number as national digit pairs (`06 12 34 56 78`).
#[must_use]
pub fn format_phone(phone: &str) -> String {
    let cleaned = clean_phone(phone);
    let national = cleaned
        .strip_prefix("+33")
        .map_or_else(|| cleaned.clone(), |rest| format!("0{rest}"));

    national
        .chars()
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lower-case, trim, and strip diacritics.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn clean_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != '-')
        .collect()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_and_capitalized() {
        assert_eq!(check_name("  dupont ").unwrap(), "Dupont");
        assert_eq!(check_name("éLODIE").unwrap(), "Élodie");
        assert_eq!(check_name("jean-pierre").unwrap(), "Jean-pierre");
        assert_eq!(check_name("d'arc").unwrap(), "D'arc");
    }

    #[test]
    fn name_length_bounds() {
        assert!(check_name("A").is_err());
        assert!(check_name("Al").is_ok());
        assert!(check_name(&"a".repeat(50)).is_ok());
        assert!(check_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn name_rejects_foreign_characters() {
        assert!(check_name("R2D2").is_err());
        assert!(check_name("-Martin").is_err());
        assert!(check_name("Martin!").is_err());
        assert!(check_name("O'Neil-Smith Jr").is_ok());
    }

    #[test]
    fn name_rejection_explains_reason() {
        let err = check_name("x").unwrap_err();
        assert!(err.to_string().contains("trop court"));
    }

    #[test]
    fn email_is_lowercased() {
        assert_eq!(
            check_email("Jean.Dupont@Example.FR").unwrap(),
            "jean.dupont@example.fr"
        );
    }

    #[test]
    fn email_rejects_malformed() {
        assert!(check_email("jean.dupont").is_err());
        assert!(check_email("jean@example").is_err());
        assert!(check_email("jean @example.fr").is_err());
    }

    #[test]
    fn phone_accepts_national_and_international() {
        let national = check_phone("06 12 34 56 78").unwrap();
        let international = check_phone("+33612345678").unwrap();
        assert_eq!(national, "0612345678");
        assert_eq!(international, "+33612345678");
        assert_eq!(format_phone(&national), format_phone(&international));
    }

    #[test]
    fn phone_accepts_dots_and_hyphens() {
        assert_eq!(check_phone("01.23.45.67.89").unwrap(), "0123456789");
        assert_eq!(check_phone("05-12-34-56-78").unwrap(), "0512345678");
    }

    #[test]
    fn phone_rejects_zero_after_prefix() {
        assert!(check_phone("0012345678").is_err());
        assert!(check_phone("+330612345678").is_err());
        assert!(check_phone("061234567").is_err());
    }

    #[test]
    fn format_phone_renders_pairs() {
        assert_eq!(format_phone("0612345678"), "06 12 34 56 78");
        assert_eq!(format_phone("+33612345678"), "06 12 34 56 78");
    }

    #[test]
    fn age_bounds() {
        assert!(check_age(17).is_err());
        assert_eq!(check_age(18).unwrap(), 18);
        assert_eq!(check_age(120).unwrap(), 120);
        assert!(check_age(121).is_err());
        assert!(check_age(-4).is_err());
    }

    #[test]
    fn marital_status_folds_accents() {
        assert_eq!(check_marital_status("mariée").unwrap(), "Marié(e)");
        assert_eq!(check_marital_status("MARIE").unwrap(), "Marié(e)");
        assert_eq!(check_marital_status("Je suis divorcée").unwrap(), "Divorcé(e)");
        assert_eq!(check_marital_status("veuve").unwrap(), "Veuf/Veuve");
        assert_eq!(check_marital_status("Célibataire").unwrap(), "Célibataire");
    }

    #[test]
    fn marital_status_rejection_lists_options() {
        let err = check_marital_status("bachelor").unwrap_err();
        for option in catalog::MARITAL_STATUSES {
            assert!(err.to_string().contains(option), "missing {option}");
        }
        assert!(check_marital_status("   ").is_err());
    }

    #[test]
    fn categorical_requires_exact_match() {
        assert_eq!(check_profession("Retraité").unwrap(), "Retraité");
        assert!(check_profession("retraité").is_err());
        assert_eq!(
            check_income("40 000€ - 60 000€").unwrap(),
            "40 000€ - 60 000€"
        );
        assert!(check_income("50000").is_err());
        assert_eq!(
            check_wealth("Plus de 2 500 000€").unwrap(),
            "Plus de 2 500 000€"
        );
    }

    #[test]
    fn goals_must_all_be_known() {
        let goals = vec![
            "Réduire mes impôts".to_string(),
            "Devenir astronaute".to_string(),
        ];
        let err = check_goals(&goals).unwrap_err();
        assert!(err.to_string().contains("Devenir astronaute"));
        assert!(err.to_string().contains("Préparer ma retraite"));
        assert!(check_goals(&[]).is_err());
    }

    #[test]
    fn goals_keep_order_and_drop_duplicates() {
        let goals = vec![
            "Préparer ma retraite".to_string(),
            "Réduire mes impôts".to_string(),
            "Préparer ma retraite".to_string(),
        ];
        assert_eq!(
            check_goals(&goals).unwrap(),
            vec!["Préparer ma retraite", "Réduire mes impôts"]
        );
    }

    #[test]
    fn normalize_strips_diacritics() {
        assert_eq!(normalize("  Pacsée "), "pacsee");
        assert_eq!(normalize("Célibataire"), "celibataire");
    }
}
