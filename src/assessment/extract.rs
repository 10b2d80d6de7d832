use thiserror::Error;

/// Why one generation attempt could not be used
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssessmentError {
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("no JSON object in response: {0}")]
    Extraction(String),

    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// Pull the JSON object out of free-form model output.
///
/// Takes everything from the first `{` to the last `}` and parses it. This is
/// a lenient heuristic, not a parser: prose containing braces before or after
/// the intended object corrupts the slice, and the attempt is then retried.
pub fn extract_json(text: &str) -> Result<serde_json::Value, AssessmentError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(AssessmentError::Extraction("no braces found".to_string()));
    };
    if end < start {
        return Err(AssessmentError::Extraction(
            "closing brace precedes opening brace".to_string(),
        ));
    }

    serde_json::from_str(&text[start..=end])
        .map_err(|e| AssessmentError::Extraction(format!("invalid JSON: {}", e)))
}

/// Strip a leading `{{` and a trailing `}}` left over from the prompt's
/// placeholder syntax
pub fn clean_comment(comment: &str) -> String {
    let comment = comment.strip_prefix("{{").unwrap_or(comment);
    comment.strip_suffix("}}").unwrap_or(comment).to_string()
}
