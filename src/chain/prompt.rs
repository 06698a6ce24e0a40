//! Prompt templates and the default prompts shipped with the chains.
//!
//! Templates use `{variable}` placeholders; `{{` and `}}` produce literal braces.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ChainError;

/// System prompt for retrieval QA. Takes `{context}`.
pub const QA_SYSTEM_TEMPLATE: &str = "Используй следующие фрагменты контекста, чтобы ответить на вопрос пользователя.
Если ты не знаешь ответа или ответа на вопрос нет в контексте ниже, просто скажи, что не знаешь, не пытайся придумывать ответ.
----------------
{context}";

/// Prompt for the stuff summarizer. Takes `{text}`.
pub const SUMMARY_STUFF_TEMPLATE: &str = "Напиши краткое (не более 100 слов) содержимое следующего текста: \"{text}\". Теперь перескажи тот текст очень кратко.";

/// First self-check step: answer the question directly. Takes `{question}`.
pub const CREATE_DRAFT_ANSWER_TEMPLATE: &str = "{question}\n\n";

/// Second self-check step. Takes `{statement}`.
pub const LIST_ASSERTIONS_TEMPLATE: &str = "Прочти утверждение:
{statement}
Составь список аргументов, которые подтверждают приведенное выше утверждение.\n\n";

/// Third self-check step. Takes `{assertions}`.
pub const CHECK_ASSERTIONS_TEMPLATE: &str = "Вот список предположений:
{assertions}
Для каждого аргумента определи верен он или нет. Если нет - объясни почему.\n\n";

/// Final self-check step. Takes `{checked_assertions}` and `{question}`.
pub const REVISED_ANSWER_TEMPLATE: &str = "{checked_assertions}

В свете приведенных выше утверждений и проверок, как бы Вы ответили на вопрос {question}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
    input_variables: Vec<String>,
}

impl PromptTemplate {
    /// Parses a template string.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Template`] for an unclosed `{`, a stray `}`, or
    /// a placeholder that is not a valid identifier.
    pub fn new(template: &str) -> Result<Self, ChainError> {
        let mut segments = Vec::new();
        let mut input_variables: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(ChainError::Template {
                                    message: format!("unclosed placeholder '{{{name}'"),
                                });
                            }
                        }
                    }
                    let name = name.trim().to_string();
                    if !is_identifier(&name) {
                        return Err(ChainError::Template {
                            message: format!("invalid placeholder '{{{name}}}'"),
                        });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    if !input_variables.contains(&name) {
                        input_variables.push(name.clone());
                    }
                    segments.push(Segment::Variable(name));
                }
                '}' => {
                    return Err(ChainError::Template {
                        message: "unmatched '}'".to_string(),
                    });
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            segments,
            input_variables,
        })
    }

    /// Loads and parses a template file.
    ///
    /// `.yaml`/`.yml` and `.json` files hold a serialized prompt with a
    /// `template` field and optional `input_variables`; any other file is
    /// the template text itself.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Io`] if the file cannot be read, and
    /// [`ChainError::Template`] if it cannot be parsed or its declared
    /// variables differ from those the template uses.
    pub fn from_file(path: &Path) -> Result<Self, ChainError> {
        let text = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parsed: PromptFile = match extension.as_deref() {
            Some("yaml" | "yml") => serde_yaml::from_str(&text).map_err(|e| ChainError::Template {
                message: format!("failed to parse {}: {e}", path.display()),
            })?,
            Some("json") => serde_json::from_str(&text).map_err(|e| ChainError::Template {
                message: format!("failed to parse {}: {e}", path.display()),
            })?,
            _ => return Self::new(&text),
        };
        parsed.into_template()
    }

    /// Variables referenced by the template, in first-use order.
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Renders the template with the given values.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::MissingVariable`] for the first variable with no value.
    pub fn format(&self, values: &HashMap<&str, &str>) -> Result<String, ChainError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value =
                        values
                            .get(name.as_str())
                            .ok_or_else(|| ChainError::MissingVariable {
                                name: name.clone(),
                            })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Renders the template from `(name, value)` pairs.
    ///
    /// # Errors
    ///
    /// Same as [`PromptTemplate::format`].
    pub fn format_with(&self, values: &[(&str, &str)]) -> Result<String, ChainError> {
        let map: HashMap<&str, &str> = values.iter().copied().collect();
        self.format(&map)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// A prompt serialized as YAML or JSON.
#[derive(Debug, Deserialize)]
struct PromptFile {
    template: String,
    #[serde(default)]
    input_variables: Option<Vec<String>>,
    #[serde(default)]
    template_format: Option<String>,
    #[serde(rename = "_type", default)]
    kind: Option<String>,
}

impl PromptFile {
    fn into_template(self) -> Result<PromptTemplate, ChainError> {
        if let Some(kind) = self.kind.as_deref().filter(|k| *k != "prompt") {
            return Err(ChainError::Template {
                message: format!("unsupported prompt type '{kind}'"),
            });
        }
        if let Some(format) = self.template_format.as_deref().filter(|f| *f != "f-string") {
            return Err(ChainError::Template {
                message: format!("unsupported template format '{format}'"),
            });
        }

        let template = PromptTemplate::new(&self.template)?;
        if let Some(mut declared) = self.input_variables {
            let mut used = template.input_variables.clone();
            declared.sort_unstable();
            declared.dedup();
            used.sort_unstable();
            if declared != used {
                return Err(ChainError::Template {
                    message: format!(
                        "declared input variables {declared:?} do not match template variables {used:?}"
                    ),
                });
            }
        }
        Ok(template)
    }
}
