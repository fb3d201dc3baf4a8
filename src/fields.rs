//! The identity-document field record and its CSV schema.
//!
//! The field set is a fixed contract shared by three places: the extraction
//! prompt (which asks the model for exactly these JSON keys), the salvage
//! stage (which maps the recovered JSON onto [`DocumentFields`]), and the CSV
//! writer (which emits [`CSV_COLUMNS`] as the header). Keeping all three
//! anchored to this module means adding a field is a one-file change plus a
//! prompt edit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed CSV header, in output order.
///
/// `filename` is first so rows are greppable by document; the remaining
/// columns match the JSON keys requested from the model.
pub const CSV_COLUMNS: [&str; 12] = [
    "filename",
    "documentType",
    "country",
    "passportNumber",
    "surname",
    "givenName",
    "dateOfBirth",
    "gender",
    "placeOfBirth",
    "placeOfIssue",
    "dateOfIssue",
    "dateOfExpiry",
];

/// Fields extracted from one identity document.
///
/// Every field is optional: the model returns `null` for anything not
/// visible on the document (an ID card has no place of issue, a damaged
/// scan may hide the expiry date). `None` serialises to an empty CSV cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentFields {
    /// Type of document, e.g. "Passport", "ID card".
    pub document_type: Option<String>,
    /// Issuing country.
    pub country: Option<String>,
    /// Document number.
    pub passport_number: Option<String>,
    /// Last name.
    pub surname: Option<String>,
    /// First name(s).
    pub given_name: Option<String>,
    /// Date of birth, DD/MM/YYYY.
    pub date_of_birth: Option<String>,
    /// Gender, M/F.
    pub gender: Option<String>,
    pub place_of_birth: Option<String>,
    pub place_of_issue: Option<String>,
    /// Date of issue, DD/MM/YYYY.
    pub date_of_issue: Option<String>,
    /// Expiry date, DD/MM/YYYY.
    pub date_of_expiry: Option<String>,
}

impl DocumentFields {
    /// Build a record from a salvaged JSON object.
    ///
    /// Tolerant by design: unknown keys are ignored, missing keys and JSON
    /// `null` become `None`, and non-string scalars (a model occasionally
    /// returns a bare number for the document number) are stringified.
    pub fn from_json(value: &Value) -> Self {
        let get = |key: &str| -> Option<String> {
            match value.get(key)? {
                Value::Null => None,
                Value::String(s) => {
                    let s = s.trim();
                    if s.is_empty() || s.eq_ignore_ascii_case("null") {
                        None
                    } else {
                        Some(s.to_string())
                    }
                }
                other => Some(other.to_string()),
            }
        };

        Self {
            document_type: get("documentType"),
            country: get("country"),
            passport_number: get("passportNumber"),
            surname: get("surname"),
            given_name: get("givenName"),
            date_of_birth: get("dateOfBirth"),
            gender: get("gender"),
            place_of_birth: get("placeOfBirth"),
            place_of_issue: get("placeOfIssue"),
            date_of_issue: get("dateOfIssue"),
            date_of_expiry: get("dateOfExpiry"),
        }
    }

    /// The field values in [`CSV_COLUMNS`] order, excluding `filename`.
    ///
    /// `None` maps to an empty string, which the CSV writer emits as an
    /// empty cell.
    pub fn csv_values(&self) -> [&str; 11] {
        fn cell(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("")
        }
        [
            cell(&self.document_type),
            cell(&self.country),
            cell(&self.passport_number),
            cell(&self.surname),
            cell(&self.given_name),
            cell(&self.date_of_birth),
            cell(&self.gender),
            cell(&self.place_of_birth),
            cell(&self.place_of_issue),
            cell(&self.date_of_issue),
            cell(&self.date_of_expiry),
        ]
    }

    /// True when no field was extracted at all.
    pub fn is_empty(&self) -> bool {
        self.csv_values().iter().all(|v| v.is_empty())
    }

    /// Number of fields that carry a value.
    pub fn populated_count(&self) -> usize {
        self.csv_values().iter().filter(|v| !v.is_empty()).count()
    }
}
