//! Email intention labels
//!
//! A closed set of business categories an inbound email is classified into,
//! and a lenient parser for the label a language model replies with.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};

use crate::RagError;

const LINKING_WORDS: [&str; 4] = ["de", "d", "du", "des"];

static WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z_]+").expect("valid regex"));

/// Single-label classification of an inbound email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intention {
    Question,
    Reclamation,
    DemandeInfo,
    DemandeDevis,
    Commande,
    Remerciement,
    Autre,
}

impl Intention {
    pub const ALL: [Self; 7] = [
        Self::Question,
        Self::Reclamation,
        Self::DemandeInfo,
        Self::DemandeDevis,
        Self::Commande,
        Self::Remerciement,
        Self::Autre,
    ];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Reclamation => "reclamation",
            Self::DemandeInfo => "demande_info",
            Self::DemandeDevis => "demande_devis",
            Self::Commande => "commande",
            Self::Remerciement => "remerciement",
            Self::Autre => "autre",
        }
    }

    /// Interpret a model reply as a label.
    ///
    /// Case, accents, quotes and punctuation are ignored and the first word
    /// naming a label wins, so `"Réclamation."` and `"Intention : commande"`
    /// both parse. Anything else maps to [`Intention::Autre`].
    #[inline]
    pub fn from_reply(reply: &str) -> Self {
        let folded: String = reply
            .to_lowercase()
            .chars()
            .map(fold_accent)
            .map(|c| if c == '-' { '_' } else { c })
            .collect();

        // "demande d'information" reads as "demande info"
        let words: Vec<&str> = WORD_REGEX
            .find_iter(&folded)
            .flatten()
            .map(|m| m.as_str())
            .filter(|word| !LINKING_WORDS.contains(word))
            .map(|word| match word {
                "information" | "informations" => "info",
                _ => word,
            })
            .collect();

        for (i, word) in words.iter().enumerate() {
            if let Ok(intention) = word.parse() {
                return intention;
            }
            // "demande info" written with a space
            if let Some(next) = words.get(i + 1) {
                if let Ok(intention) = format!("{word}_{next}").parse() {
                    return intention;
                }
            }
        }

        Self::Autre
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' => 'i',
        'ô' | 'ö' => 'o',
        'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        _ => c,
    }
}

impl fmt::Display for Intention {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intention {
    type Err = RagError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|intention| intention.as_str() == s)
            .ok_or_else(|| RagError::Validation(format!("Unknown intention: {s}")))
    }
}
