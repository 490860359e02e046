// NOA recommendation: prompt composition, reply extraction, clarification dialogue.
// All model calls go through llm_client::CompletionClient.

pub mod dialogue;
pub mod extractor;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod recommender;
pub mod sessions;
pub mod validation;
