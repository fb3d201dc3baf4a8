//! The extraction prompt sent alongside every document image.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the JSON keys requested here must match
//!    [`crate::fields::DocumentFields`] and the CSV header exactly; keeping
//!    the prompt next to nothing else makes that contract easy to audit.
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without
//!    spinning up a real model, making prompt regressions easy to catch.
//!
//! Callers can override the default via
//! [`crate::config::ExtractionConfig::prompt`]; the constant here is used
//! only when no override is provided.

/// Default prompt for extracting identity-document fields as JSON.
///
/// Used when `ExtractionConfig::prompt` is `None`.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"Extract the following fields from this ID or passport image and return them in JSON format:
{
  "documentType": "Type of document (e.g., Passport, ID card)",
  "country": "Issuing country",
  "passportNumber": "Document number",
  "surname": "Last name",
  "givenName": "First name",
  "dateOfBirth": "Date of birth (DD/MM/YYYY)",
  "gender": "Gender (M/F)",
  "placeOfBirth": "Place of birth",
  "placeOfIssue": "Place where the document was issued",
  "dateOfIssue": "Date when the document was issued (DD/MM/YYYY)",
  "dateOfExpiry": "Expiration date of the document (DD/MM/YYYY)"
}
If a field is not present in the image, use null for its value.
Just return the JSON, no other text or characters."#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::CSV_COLUMNS;

    #[test]
    fn prompt_requests_every_csv_column() {
        // filename is ours, not the model's.
        for col in CSV_COLUMNS.iter().filter(|c| **c != "filename") {
            assert!(
                DEFAULT_EXTRACTION_PROMPT.contains(&format!("\"{col}\"")),
                "prompt is missing key {col}"
            );
        }
    }

    #[test]
    fn prompt_demands_bare_json() {
        assert!(DEFAULT_EXTRACTION_PROMPT.contains("Just return the JSON"));
        assert!(DEFAULT_EXTRACTION_PROMPT.contains("use null"));
    }
}
