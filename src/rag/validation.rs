//! Input validation applied before any pipeline work is attempted

use super::EmailRequest;
use crate::{RagError, Result};

/// Minimum length of an ingested document, in characters
pub const MIN_DOCUMENT_CHARS: usize = 50;
/// Minimum length of an email body, in characters
pub const MIN_BODY_CHARS: usize = 10;

#[inline]
pub fn validate_document(content: &str) -> Result<()> {
    let content = content.trim();
    if content.is_empty() {
        return Err(RagError::Validation("Document content is required".to_string()));
    }

    if content.chars().count() < MIN_DOCUMENT_CHARS {
        return Err(RagError::Validation(format!(
            "Document content is too short (minimum {MIN_DOCUMENT_CHARS} characters)"
        )));
    }

    Ok(())
}

#[inline]
pub fn validate_email(request: &EmailRequest) -> Result<()> {
    if [&request.from, &request.subject, &request.body]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(RagError::Validation(
            "The from, subject and body fields are required".to_string(),
        ));
    }

    if request.body.trim().chars().count() < MIN_BODY_CHARS {
        return Err(RagError::Validation(format!(
            "Email body is too short (minimum {MIN_BODY_CHARS} characters)"
        )));
    }

    Ok(())
}

#[inline]
pub fn validate_query(query: &str, top_k: usize) -> Result<()> {
    if query.trim().is_empty() {
        return Err(RagError::Validation("Search query is required".to_string()));
    }

    if top_k == 0 {
        return Err(RagError::Validation(
            "top_k must be at least 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(from: &str, subject: &str, body: &str) -> EmailRequest {
        EmailRequest {
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn document_length_is_checked() {
        assert!(validate_document("").is_err());
        assert!(validate_document("   \n ").is_err());
        assert!(validate_document(&"x".repeat(49)).is_err());
        assert!(validate_document(&"x".repeat(50)).is_ok());
        // padding does not count
        assert!(validate_document(&format!("  {}  ", "x".repeat(49))).is_err());
    }

    #[test]
    fn email_fields_are_required() {
        assert!(validate_email(&email("a@b.com", "Hi", "Hello there!")).is_ok());
        assert!(validate_email(&email("", "Hi", "Hello there!")).is_err());
        assert!(validate_email(&email("a@b.com", " ", "Hello there!")).is_err());
        assert!(validate_email(&email("a@b.com", "Hi", "")).is_err());
    }

    #[test]
    fn email_body_length_is_checked() {
        let err = validate_email(&email("a@b.com", "Hi", "Too short"))
            .expect_err("nine characters should be rejected");
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
        assert!(validate_email(&email("a@b.com", "Hi", "Ten chars!")).is_ok());
    }

    #[test]
    fn query_is_checked() {
        assert!(validate_query("return policy", 3).is_ok());
        assert!(validate_query("  ", 3).is_err());
        assert!(validate_query("return policy", 0).is_err());
    }
}
