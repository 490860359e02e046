//! Recommendation pipeline. Each turn is a single prompt, model call and parse.
//!
//! Flow: compose prompt → `CompletionClient::complete` → `extractor::extract` →
//!       `DialogueCursor` transition.
//!
//! Nothing here owns session state. Dialogue functions take the current cursor by
//! reference and return the next one, leaving the commit to the caller.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::CompletionClient;
use crate::noa::dialogue::{DialogueCursor, Turn};
use crate::noa::extractor::{extract, Extraction};
use crate::noa::models::ChatMessage;
use crate::noa::prompts::{build_first_pass_prompt, build_follow_up_prompt};

/// A parsed model reply together with the text it came from.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub raw: String,
    pub extraction: Extraction,
}

/// First pass: scenario only.
pub async fn recommend(
    client: &dyn CompletionClient,
    scenario: &str,
) -> Result<ModelReply, AppError> {
    let prompt = build_first_pass_prompt(scenario);
    invoke(client, &prompt).await
}

/// Follow-up: original scenario plus the full turn history.
pub async fn refine(
    client: &dyn CompletionClient,
    scenario: &str,
    history: &[ChatMessage],
) -> Result<ModelReply, AppError> {
    let prompt = build_follow_up_prompt(scenario, history);
    invoke(client, &prompt).await
}

/// Runs the first pass and opens a dialogue on its clarifications.
pub async fn start_dialogue(
    client: &dyn CompletionClient,
    scenario: &str,
) -> Result<(DialogueCursor, Turn, ModelReply), AppError> {
    let reply = recommend(client, scenario).await?;
    let (cursor, turn) = DialogueCursor::begin(scenario, reply.extraction.recommendation.clone());

    info!(
        "Dialogue started: noa_code={:?}, original_questions={}",
        turn.recommendation.noa_code,
        cursor.original_questions().len()
    );

    Ok((cursor, turn, reply))
}

/// Answers the pending question and computes the next cursor.
///
/// `cursor` is only read; on any error the caller keeps its current cursor.
pub async fn answer_dialogue(
    client: &dyn CompletionClient,
    cursor: &DialogueCursor,
    answer: &str,
) -> Result<(DialogueCursor, Turn, ModelReply), AppError> {
    let history = cursor.history_with_answer(answer);
    let reply = refine(client, cursor.scenario(), &history).await?;

    if !reply.extraction.recommendation.clarifications.is_empty() {
        // Follow-up prompts do not ask for clarifications; note when the model adds them anyway.
        info!(
            "Follow-up reply carried {} clarification(s)",
            reply.extraction.recommendation.clarifications.len()
        );
    }

    let (next, turn) = cursor.advance(answer, reply.extraction.recommendation.clone());
    info!("Dialogue advanced: state={:?}", next.state());

    Ok((next, turn, reply))
}

async fn invoke(client: &dyn CompletionClient, prompt: &str) -> Result<ModelReply, AppError> {
    let raw = client.complete(prompt).await?;
    if raw.trim().is_empty() {
        return Err(AppError::EmptyModelOutput);
    }

    let extraction = extract(&raw);
    if !extraction.recommendation.has_code() {
        warn!(report = ?extraction.report, "Model reply did not contain a recognisable NOA code");
    }

    Ok(ModelReply { raw, extraction })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
