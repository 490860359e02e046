//! Sequences clarification questions across turns.
//!
//! The cursor is a value: every transition takes `&self` and returns a new cursor,
//! so a turn that fails or is abandoned leaves the previous one untouched.
//!
//! Question order is fixed by the first parse. Once that list is used up, only the
//! first clarification of the latest parse (if any) is offered.

use serde::Serialize;

use crate::noa::models::{ChatMessage, Recommendation, Role};

/// Where a conversation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "question_index", rename_all = "snake_case")]
pub enum DialogueState {
    /// No scenario submitted yet, or the session was reset.
    NoSession,
    /// A scenario was submitted and its first parse is still pending.
    AwaitingFirstQuestion,
    /// The question at this index of the original list is the one being answered.
    Asking(usize),
    /// Every original question has been asked.
    Exhausted,
}

/// What one turn hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub recommendation: Recommendation,
    pub next_question: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogueCursor {
    scenario: String,
    original_questions: Vec<String>,
    /// Index into `original_questions` of the last question asked.
    /// Equal to `original_questions.len()` once exhausted.
    asked: usize,
    history: Vec<ChatMessage>,
    recommendation: Recommendation,
}

impl DialogueCursor {
    /// Starts a conversation from the first parse of `scenario`.
    pub fn begin(scenario: impl Into<String>, recommendation: Recommendation) -> (Self, Turn) {
        let original_questions = recommendation.clarifications.clone();
        let next_question = original_questions.first().cloned();

        let history = next_question
            .iter()
            .map(|q| ChatMessage::assistant(q.clone()))
            .collect();

        let cursor = Self {
            scenario: scenario.into(),
            asked: if next_question.is_some() {
                0
            } else {
                original_questions.len()
            },
            original_questions,
            history,
            recommendation: recommendation.clone(),
        };

        (
            cursor,
            Turn {
                recommendation,
                next_question,
            },
        )
    }

    /// History to send with the follow-up prompt for `answer`.
    pub fn history_with_answer(&self, answer: &str) -> Vec<ChatMessage> {
        let mut history = self.history.clone();
        history.push(ChatMessage::user(answer));
        history
    }

    /// Applies a user answer and the recommendation parsed from the follow-up reply.
    ///
    /// The new recommendation replaces the old one in full.
    pub fn advance(&self, answer: &str, recommendation: Recommendation) -> (Self, Turn) {
        let mut history = self.history_with_answer(answer);
        let next_index = self.asked + 1;

        let (asked, next_question) = if next_index < self.original_questions.len() {
            (next_index, Some(self.original_questions[next_index].clone()))
        } else {
            (
                self.original_questions.len(),
                recommendation.clarifications.first().cloned(),
            )
        };

        if let Some(question) = &next_question {
            history.push(ChatMessage::assistant(question.clone()));
        }

        let cursor = Self {
            scenario: self.scenario.clone(),
            original_questions: self.original_questions.clone(),
            asked,
            history,
            recommendation: recommendation.clone(),
        };

        (
            cursor,
            Turn {
                recommendation,
                next_question,
            },
        )
    }

    pub fn state(&self) -> DialogueState {
        if self.asked < self.original_questions.len() {
            DialogueState::Asking(self.asked)
        } else {
            DialogueState::Exhausted
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn original_questions(&self) -> &[String] {
        &self.original_questions
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn recommendation(&self) -> &Recommendation {
        &self.recommendation
    }

    /// The question currently waiting for an answer, if any.
    pub fn pending_question(&self) -> Option<&str> {
        match self.history.last() {
            Some(msg) if msg.role == Role::Assistant => Some(&msg.content),
            _ => None,
        }
    }
}
