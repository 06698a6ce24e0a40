//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::chain::retriever::DEFAULT_TOP_K;
use crate::chain::splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::ModelError;
use crate::model::{GigaChatConfig, GigaChatConfigBuilder};

/// gigachain: chains and chat on top of the GigaChat API.
///
/// Credentials come from `GIGA_USER` and `GIGA_PASSWORD`, or a
/// pre-obtained token from `GIGA_TOKEN`.
#[derive(Parser, Debug)]
#[command(name = "gigachain")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Service base URL (overrides `GIGA_API_URL`).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Model identifier (overrides `GIGA_MODEL`).
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Disable the service-side profanity filter.
    #[arg(long, global = true)]
    pub no_profanity_check: bool,

    /// Sampling temperature.
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Log and print request payloads and replies.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat interactively; one line of stdin per turn.
    #[command(after_help = r#"Examples:
  gigachain chat
  gigachain chat --system "Ты эмпатичный бот-психолог"
"#)]
    Chat {
        /// System message that opens the conversation.
        #[arg(short, long)]
        system: Option<String>,
    },

    /// Send one message, optionally rendered from a prompt template file.
    #[command(after_help = r#"Examples:
  gigachain ask "Привет!"
  gigachain ask --prompt-file hello.txt --var name=ГигаЧат
  echo "Привет!" | gigachain ask
"#)]
    Ask {
        /// Message text. Read from stdin when neither this nor a template is given.
        #[arg(conflicts_with = "prompt_file")]
        text: Option<String>,

        /// Template file with `{variable}` placeholders.
        #[arg(short, long)]
        prompt_file: Option<PathBuf>,

        /// Template value as KEY=VALUE (repeatable).
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },

    /// Summarize a text file in a single model call.
    #[command(after_help = r#"Examples:
  gigachain summarize article.txt
  cat article.txt | gigachain summarize -
"#)]
    Summarize {
        /// Path to the document, or `-` for stdin.
        path: PathBuf,
    },

    /// Answer questions about a text file.
    #[command(after_help = r#"Examples:
  gigachain qa bicameral.txt --question "Кто придумал идею бикамерального сознания?"
  gigachain qa bicameral.txt                 # interactive: one question per line
  gigachain --format json qa notes.txt -q "..." | jq '.sources[].index'
"#)]
    Qa {
        /// Path to the document.
        path: PathBuf,

        /// Question to answer. Reads questions from stdin when omitted.
        #[arg(short, long)]
        question: Option<String>,

        /// Chunk size in characters.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Overlap between chunks in characters.
        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        chunk_overlap: usize,

        /// Number of chunks placed into the context.
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },

    /// Draft, verify and revise an answer.
    Check {
        /// Question to answer.
        question: String,
    },

    /// Play a Dungeons & Dragons scene between three agents.
    #[command(after_help = r#"Examples:
  gigachain roleplay --rounds 6
  gigachain roleplay --protagonist "Илья Муромец" --quest "Победить Змея Горыныча"
"#)]
    Roleplay {
        /// Number of dialogue turns after the opening line.
        #[arg(short, long, default_value = "9")]
        rounds: usize,

        /// Main player name.
        #[arg(long)]
        protagonist: Option<String>,

        /// Narrator name.
        #[arg(long)]
        storyteller: Option<String>,

        /// Commentator name.
        #[arg(long)]
        commentator: Option<String>,

        /// Quest for the protagonist.
        #[arg(long)]
        quest: Option<String>,

        /// Word budget for descriptions and lines.
        #[arg(long)]
        word_limit: Option<usize>,
    },
}

impl Cli {
    /// Applies command-line overrides on top of `builder`.
    #[must_use]
    pub fn apply_overrides(&self, mut builder: GigaChatConfigBuilder) -> GigaChatConfigBuilder {
        if let Some(url) = &self.api_url {
            builder = builder.api_url(url.clone());
        }
        if let Some(model) = &self.model {
            builder = builder.model(model.clone());
        }
        if self.no_profanity_check {
            builder = builder.profanity_check(false);
        }
        if let Some(t) = self.temperature {
            builder = builder.temperature(t);
        }
        if self.verbose {
            builder = builder.verbose(true);
        }
        builder
    }

    /// Resolves the backend configuration: flags, then environment, then defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if a resolved value is rejected.
    pub fn model_config(&self) -> Result<GigaChatConfig, ModelError> {
        self.apply_overrides(GigaChatConfig::builder()).from_env().build()
    }
}

/// Splits `KEY=VALUE`. The key must be non-empty; the value may be.
pub(crate) fn parse_var(raw: &str) -> Option<(&str, &str)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gigachain",
            "check",
            "Сколько будет 2+2?",
            "--no-profanity-check",
            "--temperature",
            "0.4",
            "--format",
            "json",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert!(cli.no_profanity_check);
        assert_eq!(cli.temperature, Some(0.4));
        assert_eq!(cli.format, "json");
        assert!(matches!(cli.command, Commands::Check { ref question } if question == "Сколько будет 2+2?"));
    }

    #[test]
    fn test_qa_defaults() {
        let cli = Cli::try_parse_from(["gigachain", "qa", "doc.txt"]).unwrap_or_else(|_| unreachable!());
        match cli.command {
            Commands::Qa {
                question,
                chunk_size,
                chunk_overlap,
                top_k,
                ..
            } => {
                assert!(question.is_none());
                assert_eq!(chunk_size, DEFAULT_CHUNK_SIZE);
                assert_eq!(chunk_overlap, DEFAULT_CHUNK_OVERLAP);
                assert_eq!(top_k, DEFAULT_TOP_K);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_ask_collects_vars() {
        let cli = Cli::try_parse_from([
            "gigachain", "ask", "-p", "t.txt", "--var", "a=1", "--var", "b=2",
        ])
        .unwrap_or_else(|_| unreachable!());
        match cli.command {
            Commands::Ask { vars, prompt_file, text } => {
                assert_eq!(vars, vec!["a=1", "b=2"]);
                assert_eq!(prompt_file, Some(PathBuf::from("t.txt")));
                assert!(text.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_overrides_win_over_lookup() {
        let cli = Cli::try_parse_from([
            "gigachain",
            "--model",
            "GigaChat:latest",
            "--no-profanity-check",
            "chat",
        ])
        .unwrap_or_else(|_| unreachable!());
        let config = cli
            .apply_overrides(GigaChatConfig::builder())
            .from_lookup(|key| match key {
                "GIGA_MODEL" => Some("from-env".to_string()),
                "GIGA_PROFANITY" => Some("true".to_string()),
                "GIGA_USER" => Some("alice".to_string()),
                _ => None,
            })
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.model, "GigaChat:latest");
        assert!(!config.profanity_check);
        assert_eq!(config.user.as_deref(), Some("alice"));
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(parse_var("name=ГигаЧат"), Some(("name", "ГигаЧат")));
        assert_eq!(parse_var("empty="), Some(("empty", "")));
        assert_eq!(parse_var("a=b=c"), Some(("a", "b=c")));
        assert_eq!(parse_var("=x"), None);
        assert_eq!(parse_var("novalue"), None);
    }
}
