//! Request validation that runs before the recommendation pipeline.
//! Limits keep prompts bounded; failures become `AppError::Validation`.

use crate::errors::AppError;
use crate::noa::models::ChatMessage;

pub const MAX_SCENARIO_LENGTH: usize = 5000;
pub const MAX_CHAT_MESSAGE_LENGTH: usize = 2000;
pub const MAX_CONVERSATION_HISTORY_LENGTH: usize = 50;

/// Trims and bounds a scenario description.
pub fn validate_scenario(field: &str, scenario: &str) -> Result<String, AppError> {
    bounded_text(field, scenario, MAX_SCENARIO_LENGTH)
}

/// Trims and bounds a single chat message.
pub fn validate_message(field: &str, content: &str) -> Result<String, AppError> {
    bounded_text(field, content, MAX_CHAT_MESSAGE_LENGTH)
}

/// Checks history length and every message, returning trimmed copies.
pub fn validate_history(history: &[ChatMessage]) -> Result<Vec<ChatMessage>, AppError> {
    if history.is_empty() {
        return Err(AppError::Validation(
            "conversation_history: must contain at least one message".to_string(),
        ));
    }
    if history.len() > MAX_CONVERSATION_HISTORY_LENGTH {
        return Err(AppError::Validation(format!(
            "conversation_history: cannot exceed {MAX_CONVERSATION_HISTORY_LENGTH} messages"
        )));
    }

    history
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            let content = validate_message(&format!("conversation_history.{i}.content"), &msg.content)?;
            Ok(ChatMessage {
                role: msg.role,
                content,
            })
        })
        .collect()
}

fn bounded_text(field: &str, text: &str, max: usize) -> Result<String, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field}: cannot be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field}: cannot exceed {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}
