//! CLI command implementations.
//!
//! One-shot commands return their output as a string for `main` to print.
//! Interactive commands (`chat`, `qa` without `--question`, `roleplay`)
//! write each turn to the output as soon as it is available.

#![allow(clippy::uninlined_format_args)]

use std::fmt::Write as FmtWrite;
use std::io::{self, BufRead, Write as IoWrite};
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::chain::{
    CharacterTextSplitter, DndScenario, PromptTemplate, RetrievalQa, SelfCheckChain,
    StuffSummarizer, predict,
};
use crate::cli::output::{OutputFormat, text_line};
use crate::cli::parser::{Cli, Commands, parse_var};
use crate::error::{CommandError, Result};
use crate::model::{ChatModel, GigaChatModel, Message, system_message, user_message};

/// Executes the CLI command.
///
/// Builds the GigaChat backend from flags and environment, then drives the
/// command on a Tokio runtime.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the command fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let config = cli.model_config()?;
    debug!(api_url = %config.api_url, model = %config.model, "resolved configuration");
    let model: Arc<dyn ChatModel> = Arc::new(GigaChatModel::new(config)?);

    // Sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout().lock();
    rt.block_on(run(&cli.command, &model, format, &mut input, &mut output))
}

/// Runs `command` against `model`, reading from `input` and streaming
/// interactive turns to `output`.
///
/// # Errors
///
/// Returns the first chain, model, or I/O error.
pub async fn run<R: BufRead, W: IoWrite>(
    command: &Commands,
    model: &Arc<dyn ChatModel>,
    format: OutputFormat,
    input: &mut R,
    output: &mut W,
) -> Result<String> {
    match command {
        Commands::Chat { system } => {
            cmd_chat(model.as_ref(), system.as_deref(), format, input, output).await
        }
        Commands::Ask {
            text,
            prompt_file,
            vars,
        } => {
            cmd_ask(
                model.as_ref(),
                text.as_deref(),
                prompt_file.as_deref(),
                vars,
                format,
                input,
            )
            .await
        }
        Commands::Summarize { path } => cmd_summarize(model.as_ref(), path, format, input).await,
        Commands::Qa {
            path,
            question,
            chunk_size,
            chunk_overlap,
            top_k,
        } => {
            let splitter = CharacterTextSplitter::new("\n\n", *chunk_size, *chunk_overlap)?;
            let text = read_source(path, input)?;
            let qa = RetrievalQa::from_text(&text, &splitter)?.with_top_k(*top_k)?;
            info!(chunks = qa.chunk_count(), path = %path.display(), "document indexed");
            match question {
                Some(q) => cmd_qa_once(model.as_ref(), &qa, q, format).await,
                None => cmd_qa_loop(model.as_ref(), &qa, format, input, output).await,
            }
        }
        Commands::Check { question } => cmd_check(model.as_ref(), question, format).await,
        Commands::Roleplay {
            rounds,
            protagonist,
            storyteller,
            commentator,
            quest,
            word_limit,
        } => {
            let mut scenario = DndScenario::default();
            if let Some(name) = protagonist {
                scenario.protagonist.clone_from(name);
            }
            if let Some(name) = storyteller {
                scenario.storyteller.clone_from(name);
            }
            if let Some(name) = commentator {
                scenario.commentator.clone_from(name);
            }
            if let Some(q) = quest {
                scenario.quest.clone_from(q);
            }
            if let Some(limit) = word_limit {
                scenario.word_limit = *limit;
            }
            cmd_roleplay(model, &scenario, *rounds, format, output).await
        }
    }
}

async fn cmd_chat<R: BufRead, W: IoWrite>(
    model: &dyn ChatModel,
    system: Option<&str>,
    format: OutputFormat,
    input: &mut R,
    output: &mut W,
) -> Result<String> {
    let mut history: Vec<Message> = system.map(system_message).into_iter().collect();

    loop {
        if format == OutputFormat::Text {
            emit(output, "User: ")?;
        }
        let mut line = String::new();
        if input.read_line(&mut line).map_err(CommandError::from)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        history.push(user_message(line));
        let reply = model.invoke(&history).await?;
        let rendered = match format {
            OutputFormat::Text => format!("Bot: {}\n", reply.content.trim_end()),
            OutputFormat::Json => format!(
                "{}\n",
                serde_json::to_string(&reply).map_err(|e| CommandError::OutputFormat(e.to_string()))?
            ),
        };
        emit(output, &rendered)?;
        history.push(reply);
    }

    debug!(turns = history.len(), "chat session ended");
    Ok(String::new())
}

async fn cmd_ask<R: BufRead>(
    model: &dyn ChatModel,
    text: Option<&str>,
    prompt_file: Option<&Path>,
    vars: &[String],
    format: OutputFormat,
    input: &mut R,
) -> Result<String> {
    let prompt = match (text, prompt_file) {
        (_, Some(path)) => {
            let template = PromptTemplate::from_file(path)?;
            let mut values = Vec::with_capacity(vars.len());
            for raw in vars {
                let pair = parse_var(raw).ok_or_else(|| {
                    CommandError::InvalidArgument(format!("expected KEY=VALUE, got '{raw}'"))
                })?;
                values.push(pair);
            }
            template.format_with(&values)?
        }
        (Some(text), None) => {
            reject_vars(vars)?;
            text.to_string()
        }
        (None, None) => {
            reject_vars(vars)?;
            let mut buf = String::new();
            input.read_to_string(&mut buf).map_err(|e| {
                CommandError::ExecutionFailed(format!("Failed to read from stdin: {e}"))
            })?;
            buf
        }
    };

    if prompt.trim().is_empty() {
        return Err(CommandError::InvalidArgument("nothing to send".to_string()).into());
    }

    let reply = predict(model, &prompt).await?;
    match format {
        OutputFormat::Text => Ok(text_line(&reply)),
        OutputFormat::Json => format.to_json(&json!({ "prompt": prompt, "reply": reply })).map_err(Into::into),
    }
}

async fn cmd_summarize<R: BufRead>(
    model: &dyn ChatModel,
    path: &Path,
    format: OutputFormat,
    input: &mut R,
) -> Result<String> {
    let text = read_source(path, input)?;
    let summary = StuffSummarizer::new()?.summarize(model, &[text]).await?;
    match format {
        OutputFormat::Text => Ok(text_line(&summary)),
        OutputFormat::Json => format.to_json(&json!({ "summary": summary })).map_err(Into::into),
    }
}

async fn cmd_qa_once(
    model: &dyn ChatModel,
    qa: &RetrievalQa,
    question: &str,
    format: OutputFormat,
) -> Result<String> {
    let answer = qa.ask(model, question).await?;
    match format {
        OutputFormat::Text => Ok(text_line(&answer.answer)),
        OutputFormat::Json => format.to_json(&answer).map_err(Into::into),
    }
}

async fn cmd_qa_loop<R: BufRead, W: IoWrite>(
    model: &dyn ChatModel,
    qa: &RetrievalQa,
    format: OutputFormat,
    input: &mut R,
    output: &mut W,
) -> Result<String> {
    loop {
        if format == OutputFormat::Text {
            emit(output, "Ваш вопрос: ")?;
        }
        let mut line = String::new();
        if input.read_line(&mut line).map_err(CommandError::from)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let answer = qa.ask(model, &line).await?;
        let rendered = match format {
            OutputFormat::Text => format!("{}\n\n", answer.answer.trim_end()),
            OutputFormat::Json => format!(
                "{}\n",
                serde_json::to_string(&answer)
                    .map_err(|e| CommandError::OutputFormat(e.to_string()))?
            ),
        };
        emit(output, &rendered)?;
    }
    Ok(String::new())
}

async fn cmd_check(model: &dyn ChatModel, question: &str, format: OutputFormat) -> Result<String> {
    let result = SelfCheckChain::new()?.run(model, question).await?;
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(out, "Draft:\n{}\n", result.draft.trim_end());
            let _ = writeln!(out, "Assertions:\n{}\n", result.assertions.trim_end());
            let _ = writeln!(out, "Checks:\n{}\n", result.checked_assertions.trim_end());
            let _ = writeln!(out, "Answer:\n{}", result.answer.trim_end());
            Ok(out)
        }
        OutputFormat::Json => format.to_json(&result).map_err(Into::into),
    }
}

async fn cmd_roleplay<W: IoWrite>(
    model: &Arc<dyn ChatModel>,
    scenario: &DndScenario,
    rounds: usize,
    format: OutputFormat,
    output: &mut W,
) -> Result<String> {
    let mut setup = scenario.setup(Arc::clone(model)).await?;

    match format {
        OutputFormat::Text => {
            let mut intro = String::new();
            let _ = writeln!(intro, "Ведущий:\n{}\n", setup.descriptions.storyteller.trim_end());
            let _ = writeln!(intro, "Главный игрок:\n{}\n", setup.descriptions.protagonist.trim_end());
            let _ = writeln!(intro, "Комментатор:\n{}\n", setup.descriptions.commentator.trim_end());
            let _ = writeln!(intro, "Задание:\n{}\n", scenario.quest);
            let _ = writeln!(intro, "({}): {}\n", scenario.storyteller, setup.opening.trim_end());
            emit(output, &intro)?;
        }
        OutputFormat::Json => {
            let line = json!({
                "descriptions": setup.descriptions,
                "quest": scenario.quest,
                "opening": setup.opening,
            });
            emit(output, &format!("{line}\n"))?;
        }
    }

    for _ in 0..rounds {
        let (speaker, message) = setup.simulator.step().await?;
        let rendered = match format {
            OutputFormat::Text => format!("({speaker}): {}\n\n", message.trim_end()),
            OutputFormat::Json => format!("{}\n", json!({ "speaker": speaker, "message": message })),
        };
        emit(output, &rendered)?;
    }
    Ok(String::new())
}

/// Reads a document from `path`, or from `input` when `path` is `-`.
fn read_source<R: BufRead>(path: &Path, input: &mut R) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        input.read_to_string(&mut buf).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to read from stdin: {e}"))
        })?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to read {}: {e}", path.display())).into()
    })
}

fn reject_vars(vars: &[String]) -> Result<()> {
    if vars.is_empty() {
        Ok(())
    } else {
        Err(CommandError::InvalidArgument("--var requires --prompt-file".to_string()).into())
    }
}

fn emit<W: IoWrite>(output: &mut W, text: &str) -> Result<()> {
    output
        .write_all(text.as_bytes())
        .and_then(|()| output.flush())
        .map_err(|e| CommandError::from(e).into())
}
