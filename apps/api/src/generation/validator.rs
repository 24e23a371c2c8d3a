//! Skillset Validator — asks the classifier whether a skillset is a real skill.
//!
//! Fail-open: if the classifier itself fails, the skillset is treated as valid.
//! Validator outages must never block a generation attempt.

use tracing::{debug, warn};

use crate::generation::prompts::{
    fill_template, VALIDATION_PROMPT_TEMPLATE, VALIDATION_TEMPERATURE, VALID_TOKEN,
};
use crate::llm_client::TextGenerator;

/// Returns `true` if the classifier answers exactly `VALID` (trimmed, any case),
/// or if the classifier call fails. Never errors.
///
/// `skillset` must already be trimmed and non-empty; the orchestrator enforces that.
pub async fn validate_skillset(llm: &dyn TextGenerator, skillset: &str) -> bool {
    let prompt = fill_template(VALIDATION_PROMPT_TEMPLATE, &[("skillset", skillset)]);

    match llm.classify(&prompt, VALIDATION_TEMPERATURE).await {
        Ok(reply) => {
            let valid = reply.trim().to_uppercase() == VALID_TOKEN;
            debug!(skillset, reply = reply.trim(), valid, "Skillset classified");
            valid
        }
        Err(e) => {
            warn!(skillset, error = %e, "Skillset validation failed; treating as valid");
            true
        }
    }
}
