use serde::{Deserialize, Serialize};

/// Structured output of parsing one model reply.
///
/// `noa_code` and `label` are either both empty (the code pattern was not found)
/// or both filled. A new value replaces the previous one on every turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub noa_code: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_authority_code: Option<String>,
    #[serde(default)]
    pub clarifications: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark_codes: Option<Vec<String>>,
}

impl Recommendation {
    /// True when the reply named an action code.
    pub fn has_code(&self) -> bool {
        !self.noa_code.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the append-only conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
