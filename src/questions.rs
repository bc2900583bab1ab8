//! Question phrasing for each field.

use crate::catalog;
use crate::extraction::Target;
use crate::lead::Field;

/// The question asking for `target`.
#[must_use]
pub fn question_for(target: Target) -> String {
    let Target::Field(field) = target else {
        return catalog::COMMENT_PROMPT.to_string();
    };

    match field {
        Field::LastName => {
            "Pour commencer notre échange, puis-je avoir votre nom de famille ?".to_string()
        }
        Field::FirstName => "Merci. Et votre prénom ?".to_string(),
        Field::Email => {
            "À quelle adresse email puis-je vous envoyer nos recommandations ?".to_string()
        }
        Field::Phone => "Quel est votre numéro de téléphone pour vous recontacter ?".to_string(),
        Field::Age => "Quel âge avez-vous ?".to_string(),
        Field::MaritalStatus => with_options(
            "Quelle est votre situation familiale ?",
            catalog::MARITAL_STATUSES,
        ),
        Field::Profession => with_options(
            "Quelle est votre situation professionnelle actuelle ?",
            catalog::PROFESSIONS,
        ),
        Field::Income => with_options(
            "Dans quelle tranche se situe votre revenu annuel ?",
            catalog::INCOME_BRACKETS,
        ),
        Field::Wealth => with_options(
            "Dans quelle tranche se situe votre patrimoine global ?",
            catalog::WEALTH_BRACKETS,
        ),
        Field::Goals => with_options(
            "Quels sont vos principaux objectifs patrimoniaux ? (plusieurs choix possibles)",
            catalog::GOALS,
        ),
    }
}

fn with_options(question: &str, options: &[&str]) -> String {
    format!("{question}\n{}", format_options(options))
}

/// Render options as a 1-based numbered list, one per line.
#[must_use]
pub fn format_options(options: &[&str]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{}. {option}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_numbered_from_one() {
        assert_eq!(format_options(&["A", "B", "C"]), "1. A\n2. B\n3. C");
        assert_eq!(format_options(&[]), "");
    }

    #[test]
    fn categorical_questions_list_catalog() {
        let question = question_for(Target::Field(Field::Income));
        assert!(question.starts_with("Dans quelle tranche se situe votre revenu annuel ?\n"));
        assert!(question.contains("1. Moins de 30 000€"));
        assert!(question.ends_with("7. Plus de 250 000€"));
    }

    #[test]
    fn marital_question_lists_five_options() {
        let question = question_for(Target::Field(Field::MaritalStatus));
        assert!(question.contains("5. Veuf/Veuve"));
        assert!(!question.contains("6."));
    }

    #[test]
    fn free_text_questions_have_no_list() {
        assert_eq!(question_for(Target::Field(Field::Age)), "Quel âge avez-vous ?");
        assert!(!question_for(Target::Field(Field::Email)).contains("1."));
    }

    #[test]
    fn comment_target_asks_for_expectations() {
        assert_eq!(question_for(Target::Comment), catalog::COMMENT_PROMPT);
    }
}
