//! Prompt templates sent to the language model
//!
//! Replies are drafted in French; the templates are fixed text with the email
//! fields and numbered context passages substituted in.

use itertools::Itertools;

use super::intention::Intention;
use super::{EmailRequest, RetrievedDocument};

/// Instructions given as the system prompt when drafting a reply
pub const EMAIL_SYSTEM_PROMPT: &str = "Tu es un assistant IA professionnel qui aide à rédiger des réponses aux emails.
Tu dois générer des réponses claires, professionnelles et pertinentes basées sur le contexte fourni.

RÈGLES IMPORTANTES:
- Utilise un ton professionnel et courtois
- Base ta réponse uniquement sur le contexte fourni
- Si le contexte ne contient pas d'information pertinente, indique-le poliment
- Sois concis mais complet
- Utilise le français correct
- Ne mentionne jamais que tu utilises un contexte ou une base de connaissances";

/// Number the context passages as `[1] text`, separated by blank lines
#[inline]
pub fn format_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("[{}] {}", i + 1, doc.text))
        .join("\n\n")
}

/// User prompt asking for a reply to `request` grounded in `documents`
#[inline]
pub fn email_reply_prompt(request: &EmailRequest, documents: &[RetrievedDocument]) -> String {
    format!(
        "EMAIL REÇU:
De: {from}
Sujet: {subject}
Corps: {body}

CONTEXTE DE LA BASE DE CONNAISSANCES:
{context}

TÂCHE:
Génère une réponse professionnelle à cet email en utilisant les informations du contexte fourni.
La réponse doit être directement utilisable et commencer par une formule de politesse appropriée.",
        from = request.from,
        subject = request.subject,
        body = request.body,
        context = format_context(documents),
    )
}

/// Prompt asking for the single intention label of an email
#[inline]
pub fn intention_prompt(subject: &str, body: &str) -> String {
    let labels = Intention::ALL
        .iter()
        .map(|intention| format!("- {intention}"))
        .join("\n");

    format!(
        "Analyse cet email et identifie son intention principale en UN SEUL MOT parmi:
{labels}

Email:
Sujet: {subject}
Corps: {body}

Réponds uniquement par le mot de l'intention, sans explication."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ChunkMetadata, DocumentMetadata};
    use crate::database::RecordMetadata;
    use chrono::Utc;

    fn document(text: &str) -> RetrievedDocument {
        RetrievedDocument {
            id: "id".to_string(),
            text: text.to_string(),
            score: 0.5,
            metadata: RecordMetadata {
                chunk: ChunkMetadata {
                    document: DocumentMetadata::default(),
                    chunk_index: 0,
                    chunk_size: text.chars().count(),
                },
                ingested_at: Utc::now(),
            },
        }
    }

    #[test]
    fn context_blocks_are_numbered_from_one() {
        let context = format_context(&[document("First passage."), document("Second passage.")]);
        assert_eq!(context, "[1] First passage.\n\n[2] Second passage.");
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn reply_prompt_embeds_email_and_context() {
        let request = EmailRequest {
            from: "a@b.com".to_string(),
            subject: "Return request".to_string(),
            body: "I want to return my order.".to_string(),
        };
        let prompt = email_reply_prompt(&request, &[document("Returns within 30 days.")]);

        assert!(prompt.starts_with("EMAIL REÇU:\nDe: a@b.com\nSujet: Return request\n"));
        assert!(prompt.contains("Corps: I want to return my order."));
        assert!(prompt.contains("CONTEXTE DE LA BASE DE CONNAISSANCES:\n[1] Returns within 30 days."));
        assert!(prompt.contains("TÂCHE:"));
    }

    #[test]
    fn intention_prompt_lists_every_label() {
        let prompt = intention_prompt("Devis", "Combien pour 10 unités ?");
        for intention in Intention::ALL {
            assert!(prompt.contains(&format!("- {intention}\n")));
        }
        assert!(prompt.contains("Sujet: Devis\nCorps: Combien pour 10 unités ?"));
    }
}
