// Interview preparation generation.
// Implements: skillset validation, interview + certification streams, session orchestration.
// All LLM calls go through llm_client — no direct Gemini HTTP calls here.

pub mod certification;
pub mod handlers;
pub mod interview;
pub mod orchestrator;
pub mod prompts;
pub mod stream;
pub mod validator;

#[cfg(test)]
pub mod test_support;
