//! Final profile analysis and resource recommendations.

use anyhow::{Context, Result};

use crate::catalog;
use crate::index::{Document, DocumentSearch};
use crate::lead::Lead;
use crate::llm::{Embedder, LanguageModel, Message};
use crate::validator::{format_phone, normalize};

/// Resource category, inferred from its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Simulator,
    Guide,
    Article,
}

impl ResourceKind {
    #[must_use]
    pub fn from_title(title: &str) -> Self {
        let title = normalize(title);
        if title.contains("simulateur") {
            Self::Simulator
        } else if title.contains("guide") {
            Self::Guide
        } else {
            Self::Article
        }
    }

    #[must_use]
    pub const fn badge(self) -> &'static str {
        match self {
            Self::Simulator => "📈 Simulateur",
            Self::Guide => "📗 Guide",
            Self::Article => "📄 Article",
        }
    }
}

/// Outcome of the recommendation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub analysis: String,
    pub resources: Vec<Document>,
    /// A collaborator failed and the fixed fallback analysis was used.
    pub degraded: bool,
}

impl Recommendation {
    fn fallback() -> Self {
        Self {
            analysis: catalog::ANALYSIS_FALLBACK.to_string(),
            resources: Vec::new(),
            degraded: true,
        }
    }
}

/// Analyse a complete lead and look up the `k` closest resources.
///
/// Never fails: any collaborator error yields the degraded fallback.
pub fn recommend(
    model: &dyn LanguageModel,
    embedder: &dyn Embedder,
    search: &dyn DocumentSearch,
    lead: &Lead,
    k: usize,
) -> Recommendation {
    match analyse(model, embedder, search, lead, k) {
        Ok((analysis, resources)) => Recommendation {
            analysis,
            resources,
            degraded: false,
        },
        Err(e) => {
            tracing::warn!("Profile analysis failed for {}: {e:#}", lead.conversation_id);
            Recommendation::fallback()
        }
    }
}

fn analyse(
    model: &dyn LanguageModel,
    embedder: &dyn Embedder,
    search: &dyn DocumentSearch,
    lead: &Lead,
    k: usize,
) -> Result<(String, Vec<Document>)> {
    let messages = [
        Message::system(catalog::ANALYST_ROLE),
        Message::user(profile_summary(lead)),
    ];
    let analysis = model.complete(&messages).context("Analysis call failed")?;
    let query = embedder.embed(&analysis).context("Embedding call failed")?;
    let resources = search.search(&query, k).context("Resource search failed")?;
    Ok((analysis, resources))
}

/// Natural-language profile handed to the analyst model.
#[must_use]
pub fn profile_summary(lead: &Lead) -> String {
    let show = |value: Option<&str>| value.unwrap_or("non renseigné").to_string();
    let age = lead
        .age
        .map_or_else(|| "non renseigné".to_string(), |a| format!("{a} ans"));
    let goals = lead
        .goals
        .as_ref()
        .map_or_else(|| "non renseigné".to_string(), |g| g.join(", "));

    format!(
        "Analysez ce profil :\n\
         - Âge: {age}\n\
         - Situation: {}\n\
         - Profession: {}\n\
         - Revenu: {}\n\
         - Patrimoine: {}\n\
         - Objectifs: {goals}\n\
         - Commentaire: {}\n\n\
         Fournissez une analyse concise avec des recommandations personnalisées.",
        show(lead.marital_status.as_deref()),
        show(lead.profession.as_deref()),
        show(lead.income.as_deref()),
        show(lead.wealth.as_deref()),
        show(lead.comment.as_deref()),
    )
}

/// Final message: analysis, resources, and the advisor call-back sentence.
#[must_use]
pub fn render(recommendation: &Recommendation, lead: &Lead) -> String {
    let mut message = format!(
        "Synthèse de votre situation :\n\n{}\n",
        recommendation.analysis.trim()
    );

    if !recommendation.resources.is_empty() {
        message.push_str("\nRessources recommandées :");
        for doc in &recommendation.resources {
            let kind = ResourceKind::from_title(&doc.title);
            message.push_str(&format!("\n{} : {}\n→ {}", kind.badge(), doc.title, doc.url));
        }
        message.push('\n');
    }

    let phone = lead.phone.as_deref().map_or_else(String::new, format_phone);
    message.push_str(&format!(
        "\nUn conseiller vous contactera prochainement au {phone} pour approfondir ces recommandations."
    ));
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::FieldUpdate;
    use crate::testing::{FixedEmbedder, Library, ScriptedModel};

    fn doc(title: &str, url: &str) -> Document {
        Document {
            title: title.to_string(),
            url: url.to_string(),
        }
    }

    fn lead() -> Lead {
        let mut lead = Lead::new("conv-r");
        lead.apply(FieldUpdate::Phone("+33612345678".into()));
        lead.apply(FieldUpdate::Age(45));
        lead.apply(FieldUpdate::Goals(vec![
            "Réduire mes impôts".into(),
            "Préparer ma retraite".into(),
        ]));
        lead.apply(FieldUpdate::Comment("Je paie trop d'impôts".into()));
        lead
    }

    fn library() -> Library {
        Library(vec![
            doc("Simulateur d'impôt sur le revenu", "https://ex.fr/sim"),
            doc("Le guide du PER", "https://ex.fr/per"),
            doc("Investir en SCPI", "https://ex.fr/scpi"),
            doc("Quatrième", "https://ex.fr/4"),
        ])
    }

    #[test]
    fn kind_precedence() {
        assert_eq!(ResourceKind::from_title("Guide du simulateur"), ResourceKind::Simulator);
        assert_eq!(ResourceKind::from_title("GUIDE fiscal"), ResourceKind::Guide);
        assert_eq!(ResourceKind::from_title("Actualités"), ResourceKind::Article);
    }

    #[test]
    fn successful_recommendation_renders_resources() {
        let model = ScriptedModel::new();
        model.set_analysis(Some("Pensez au PER."));

        let rec = recommend(&model, &FixedEmbedder, &library(), &lead(), 3);
        assert!(!rec.degraded);
        assert_eq!(rec.resources.len(), 3);

        let prompts = model.completions.lock().unwrap();
        assert_eq!(prompts[0][0].content, catalog::ANALYST_ROLE);
        assert!(prompts[0][1].content.contains("Objectifs: Réduire mes impôts, Préparer ma retraite"));

        let text = render(&rec, &lead());
        assert!(text.starts_with("Synthèse de votre situation :\n\nPensez au PER."));
        assert!(text.contains("📈 Simulateur : Simulateur d'impôt sur le revenu\n→ https://ex.fr/sim"));
        assert!(text.contains("📗 Guide : Le guide du PER"));
        assert!(text.contains("📄 Article : Investir en SCPI"));
        assert!(!text.contains("Quatrième"));
        assert!(text.ends_with("au 06 12 34 56 78 pour approfondir ces recommandations."));
    }

    #[test]
    fn failure_falls_back() {
        let model = ScriptedModel::new();
        model.set_analysis(None);

        let rec = recommend(&model, &FixedEmbedder, &library(), &lead(), 3);
        assert!(rec.degraded);
        assert!(rec.resources.is_empty());
        assert_eq!(rec.analysis, catalog::ANALYSIS_FALLBACK);

        let text = render(&rec, &lead());
        assert!(text.contains(catalog::ANALYSIS_FALLBACK));
        assert!(!text.contains("Ressources recommandées"));
    }

    #[test]
    fn summary_lists_profile() {
        let summary = profile_summary(&lead());
        assert!(summary.contains("- Âge: 45 ans"));
        assert!(summary.contains("- Commentaire: Je paie trop d'impôts"));
        assert!(summary.contains("- Profession: non renseigné"));
    }
}
