//! Certification Guide Generator — streams a five-section study guide.

use std::sync::Arc;

use crate::generation::prompts::{
    fill_template, CERTIFICATION_PROMPT_TEMPLATE, CERTIFICATION_SYSTEM_TEMPLATE,
    CERTIFICATION_TEMPERATURE,
};
use crate::generation::stream::lazy_fragments;
use crate::llm_client::prompts::CONTENT_POLICY_INSTRUCTION;
use crate::llm_client::{FragmentStream, TextGenerator};

/// The sector value that turns on the certification guide.
pub const CERTIFICATIONS_SECTOR: &str = "Certifications";

/// Starts a lazy certification-guide stream for `certification`.
pub fn certification_guide(
    llm: Arc<dyn TextGenerator>,
    certification: String,
) -> FragmentStream {
    let (prompt, system) = build_certification_prompts(&certification);
    lazy_fragments(llm, prompt, system, CERTIFICATION_TEMPERATURE)
}

/// Returns `(prompt, system_instruction)`.
pub fn build_certification_prompts(certification: &str) -> (String, String) {
    let system = fill_template(
        CERTIFICATION_SYSTEM_TEMPLATE,
        &[
            ("certification", certification),
            ("content_policy", CONTENT_POLICY_INSTRUCTION),
        ],
    );
    let prompt = fill_template(
        CERTIFICATION_PROMPT_TEMPLATE,
        &[("certification", certification)],
    );
    (prompt, system)
}
