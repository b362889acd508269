use serde::{Deserialize, Serialize};
use crate::utils::fuzzy::levenshtein_distance;

/// Pipeline stage
///
/// Variants are declared in pipeline order, so the derived `Ord` walks the
/// board from left to right. `Ganho` and `Perdido` are the two closed stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    NovoLead,
    PrimeiroContato,
    Qualificado,
    VisitaAgendada,
    PropostaEnviada,
    Fechamento,
    Ganho,
    Perdido,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 8] = [
        Stage::NovoLead,
        Stage::PrimeiroContato,
        Stage::Qualificado,
        Stage::VisitaAgendada,
        Stage::PropostaEnviada,
        Stage::Fechamento,
        Stage::Ganho,
        Stage::Perdido,
    ];

    /// Wire code, as stored by the directory
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NovoLead => "NOVO_LEAD",
            Stage::PrimeiroContato => "PRIMEIRO_CONTATO",
            Stage::Qualificado => "QUALIFICADO",
            Stage::VisitaAgendada => "VISITA_AGENDADA",
            Stage::PropostaEnviada => "PROPOSTA_ENVIADA",
            Stage::Fechamento => "FECHAMENTO",
            Stage::Ganho => "GANHO",
            Stage::Perdido => "PERDIDO",
        }
    }

    /// Column header shown on the board
    pub fn label(&self) -> &'static str {
        match self {
            Stage::NovoLead => "Novo Lead",
            Stage::PrimeiroContato => "Primeiro Contato",
            Stage::Qualificado => "Qualificado",
            Stage::VisitaAgendada => "Visita Agendada",
            Stage::PropostaEnviada => "Proposta Enviada",
            Stage::Fechamento => "Fechamento",
            Stage::Ganho => "Ganho",
            Stage::Perdido => "Perdido",
        }
    }

    /// Exact wire code lookup
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|stage| stage.as_str() == s)
    }

    /// Lenient lookup for user input.
    /// Accepts the wire code or the label in any case, with spaces, hyphens
    /// or underscores as separators.
    pub fn parse(input: &str) -> Option<Self> {
        let wanted = normalize(input);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL.iter().copied().find(|stage| {
            normalize(stage.as_str()) == wanted || normalize(stage.label()) == wanted
        })
    }

    /// Closest stage name for a typo, if any is within reach
    pub fn suggest(input: &str) -> Option<Self> {
        let wanted = normalize(input);
        Self::ALL
            .iter()
            .copied()
            .map(|stage| (stage, levenshtein_distance(&wanted, &normalize(stage.as_str()))))
            .filter(|(_, distance)| *distance <= 3)
            .min_by_key(|(_, distance)| *distance)
            .map(|(stage, _)| stage)
    }

    /// Won and lost deals
    pub fn is_closed(&self) -> bool {
        matches!(self, Stage::Ganho | Stage::Perdido)
    }

    /// Position of the stage in the pipeline (0-based)
    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}
