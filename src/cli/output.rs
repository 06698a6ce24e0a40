//! Output formatting for CLI results.

use serde::Serialize;

use crate::error::CommandError;

/// How command results are rendered on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text for humans.
    #[default]
    Text,
    /// Pretty-printed JSON for scripts.
    Json,
}

impl OutputFormat {
    /// Parses a format name. Unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::OutputFormat`] if serialization fails.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> Result<String, CommandError> {
        let mut out = serde_json::to_string_pretty(value)
            .map_err(|e| CommandError::OutputFormat(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }
}

/// Ensures text output ends with exactly one newline.
pub(crate) fn text_line(text: &str) -> String {
    let mut out = text.trim_end().to_string();
    out.push('\n');
    out
}
