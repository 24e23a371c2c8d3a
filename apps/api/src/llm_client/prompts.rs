// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Appended to every generation system instruction.
pub const CONTENT_POLICY_INSTRUCTION: &str =
    "- Do NOT mention specific websites or copy proprietary content.";

/// Appended to every generation system instruction.
pub const PLAIN_LANGUAGE_INSTRUCTION: &str = "- Keep language simple and professional.";
