//! Strict parsing of the model's reply
//!
//! The reply must be a bare JSON document matching [`AuditResult`]. There is
//! no repair step: markdown fences, missing fields, a blocker with other than
//! three suggestions, or an out-of-range score all fail the parse.

use thiserror::Error;

use crate::model::AuditResult;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Model returned an empty response")]
    Empty,

    #[error("Response is not valid audit JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Score out of range for {field}: {value}")]
    ScoreOutOfRange { field: String, value: f64 },
}

/// Parse the completion text into an [`AuditResult`]
pub fn parse_audit_response(text: &str) -> Result<AuditResult, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let result: AuditResult = serde_json::from_str(text)?;

    check_score("overallScore", result.overall_score)?;
    for (category, score) in result.category_scores.iter() {
        check_score(category.key(), score)?;
    }

    Ok(result)
}

fn check_score(field: &str, value: f64) -> Result<(), ParseError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ParseError::ScoreOutOfRange {
            field: field.to_string(),
            value,
        })
    }
}
