//! Fixed option catalogs and user-facing messages.
//!
//! Catalog entries are compared byte-for-byte during validation and rendered
//! in source order when asking the question, so do not reorder or reword them.

pub const PROFESSIONS: &[&str] = &[
    "Salarié du secteur privé",
    "Fonctionnaire",
    "Chef d'entreprise",
    "Profession libérale",
    "Indépendant / Auto-entrepreneur",
    "Retraité",
    "Autre",
];

pub const INCOME_BRACKETS: &[&str] = &[
    "Moins de 30 000€",
    "30 000€ - 40 000€",
    "40 000€ - 60 000€",
    "60 000€ - 80 000€",
    "80 000€ - 100 000€",
    "100 000€ - 250 000€",
    "Plus de 250 000€",
];

pub const WEALTH_BRACKETS: &[&str] = &[
    "Moins de 20 000€",
    "20 000€ - 50 000€",
    "50 000€ - 100 000€",
    "100 000€ - 250 000€",
    "250 000€ - 500 000€",
    "500 000€ - 1 000 000€",
    "1 000 000€ - 2 500 000€",
    "Plus de 2 500 000€",
];

pub const MARITAL_STATUSES: &[&str] = &[
    "Célibataire",
    "Marié(e)",
    "Pacsé(e)",
    "Divorcé(e)",
    "Veuf/Veuve",
];

pub const GOALS: &[&str] = &[
    "Obtenir des revenus complémentaires",
    "Investir en immobilier",
    "Développer mon patrimoine",
    "Réduire mes impôts",
    "Préparer ma retraite",
    "Protéger ma famille",
    "Transmettre mon patrimoine",
    "Placer ma trésorerie excédentaire",
    "Autre",
];

/// Greeting shown when a conversation is opened.
pub const WELCOME_MESSAGE: &str = "Bonjour ! 👋 Je suis Patty, votre assistante en gestion de patrimoine. \
Je suis là pour répondre à vos questions et vous accompagner dans vos projets patrimoniaux. \
Comment puis-je vous aider aujourd'hui ?";

/// Asked once every required field is set. The next user message is taken as the comment.
pub const COMMENT_PROMPT: &str = "Merci pour toutes ces informations. Avant de faire un bilan complet, \
pourriez-vous me décrire brièvement vos attentes ou questions particulières ?";

pub const ANALYSIS_FALLBACK: &str = "Une erreur est survenue lors de l'analyse.";

pub const ANALYST_ROLE: &str = "Vous êtes un expert en gestion de patrimoine.";

/// Message returned once a conversation has ended, for any reason.
#[must_use]
pub fn closing_message(contact_phone: &str) -> String {
    format!(
        "La conversation est terminée. Pour toute question supplémentaire, veuillez nous contacter au {contact_phone}."
    )
}
