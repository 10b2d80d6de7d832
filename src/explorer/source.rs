use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::types::AuditError;

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)//.*$").expect("valid line comment pattern")
});
static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment pattern")
});

/// Flatten the explorer's `SourceCode` field into one text blob.
///
/// Multi-file contracts arrive as a JSON bundle, either Solidity standard
/// input wrapped in an extra pair of braces (`{{ "language": .., "sources": .. }}`)
/// or a bare `{ "File.sol": { "content": .. } }` map. Each file is emitted
/// behind a `// File: <name>` marker. Anything else is single-file source and
/// is returned untouched.
pub fn normalize_source(raw: &str) -> Result<String, AuditError> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        debug!("Detected single-file contract ({} bytes)", raw.len());
        return Ok(raw.to_string());
    }

    let json = if trimmed.starts_with("{{") && trimmed.ends_with("}}") {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    let bundle: serde_json::Value = serde_json::from_str(json).map_err(|e| {
        AuditError::SourceUnavailable(format!("Malformed multi-file source bundle: {}", e))
    })?;

    let files = bundle
        .get("sources")
        .unwrap_or(&bundle)
        .as_object()
        .ok_or_else(|| {
            AuditError::SourceUnavailable("Multi-file source bundle has no sources".to_string())
        })?;

    let mut combined = String::new();
    for (file_name, entry) in files {
        if let Some(content) = entry.get("content").and_then(|c| c.as_str()) {
            combined.push_str(&format!("\n// File: {}\n\n{}\n", file_name, content));
        }
    }

    if combined.is_empty() {
        return Err(AuditError::SourceUnavailable(
            "Multi-file source bundle contains no file contents".to_string(),
        ));
    }

    debug!(
        "Detected multi-file contract: {} files, {} bytes combined",
        files.len(),
        combined.len()
    );

    Ok(combined)
}

/// Remove `//` and `/* */` comments from Solidity source.
///
/// Purely textual: comment markers inside string literals are stripped too.
pub fn strip_comments(code: &str) -> String {
    let without_lines = LINE_COMMENT.replace_all(code, "");
    BLOCK_COMMENT.replace_all(&without_lines, "").into_owned()
}
