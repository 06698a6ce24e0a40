//! Self-checking chain.
//!
//! Drafts an answer, lists the assertions behind it, checks each one, and
//! asks for a revised answer in light of the checks.

use serde::Serialize;
use tracing::debug;

use super::predict;
use super::prompt::{
    CHECK_ASSERTIONS_TEMPLATE, CREATE_DRAFT_ANSWER_TEMPLATE, LIST_ASSERTIONS_TEMPLATE,
    PromptTemplate, REVISED_ANSWER_TEMPLATE,
};
use crate::error::ChainError;
use crate::model::ChatModel;

/// Every intermediate text produced by [`SelfCheckChain::run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// First answer to the question.
    pub draft: String,
    /// Assertions supporting the draft.
    pub assertions: String,
    /// Verdict on each assertion.
    pub checked_assertions: String,
    /// Final answer.
    pub answer: String,
}

/// Four-step draft, list, check, revise chain.
#[derive(Debug, Clone)]
pub struct SelfCheckChain {
    draft: PromptTemplate,
    list_assertions: PromptTemplate,
    check_assertions: PromptTemplate,
    revise: PromptTemplate,
}

impl SelfCheckChain {
    /// Builds the chain from the shipped prompts.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Template`] if a built-in prompt fails to parse.
    pub fn new() -> Result<Self, ChainError> {
        Ok(Self {
            draft: PromptTemplate::new(CREATE_DRAFT_ANSWER_TEMPLATE)?,
            list_assertions: PromptTemplate::new(LIST_ASSERTIONS_TEMPLATE)?,
            check_assertions: PromptTemplate::new(CHECK_ASSERTIONS_TEMPLATE)?,
            revise: PromptTemplate::new(REVISED_ANSWER_TEMPLATE)?,
        })
    }

    /// Runs the chain for `question`. Makes exactly four model calls.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::EmptyInput`] for a blank question, or the first
    /// model error.
    pub async fn run(&self, model: &dyn ChatModel, question: &str) -> Result<CheckResult, ChainError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChainError::EmptyInput {
                what: "question".to_string(),
            });
        }

        let draft = predict(model, &self.draft.format_with(&[("question", question)])?).await?;
        debug!(chars = draft.len(), "drafted answer");

        let assertions = predict(
            model,
            &self.list_assertions.format_with(&[("statement", draft.as_str())])?,
        )
        .await?;
        debug!(chars = assertions.len(), "listed assertions");

        let checked_assertions = predict(
            model,
            &self
                .check_assertions
                .format_with(&[("assertions", assertions.as_str())])?,
        )
        .await?;
        debug!(chars = checked_assertions.len(), "checked assertions");

        let answer = predict(
            model,
            &self.revise.format_with(&[
                ("checked_assertions", checked_assertions.as_str()),
                ("question", question),
            ])?,
        )
        .await?;

        Ok(CheckResult {
            draft,
            assertions,
            checked_assertions,
            answer,
        })
    }
}
