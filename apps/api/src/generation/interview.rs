//! Interview Question Generator — streams a sectioned question (and answer) document.
//!
//! Structure (sections, numbering, bold markers, answer placement) is enforced by
//! the prompt contract only. Output is not re-validated or repaired locally.

use std::sync::Arc;

use crate::generation::prompts::{
    fill_template, ANSWERS_INSTRUCTION, GENERAL_ROLE_CONTEXT, INTERVIEW_PROMPT_TEMPLATE,
    INTERVIEW_SYSTEM_TEMPLATE, INTERVIEW_TEMPERATURE, QUESTIONS_ONLY_INSTRUCTION,
};
use crate::generation::stream::lazy_fragments;
use crate::llm_client::prompts::{CONTENT_POLICY_INSTRUCTION, PLAIN_LANGUAGE_INSTRUCTION};
use crate::llm_client::{FragmentStream, TextGenerator};

/// Inputs to one interview generation.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewParams {
    pub sector: Option<String>,
    pub skillset: String,
    pub role: Option<String>,
    pub include_answers: bool,
    pub num_questions: u32,
}

/// Starts a lazy interview stream. Nothing is sent until the stream is polled.
pub fn interview_questions(
    llm: Arc<dyn TextGenerator>,
    params: InterviewParams,
) -> FragmentStream {
    let (prompt, system) = build_interview_prompts(&params);
    lazy_fragments(llm, prompt, system, INTERVIEW_TEMPERATURE)
}

/// Returns `(prompt, system_instruction)`.
pub fn build_interview_prompts(params: &InterviewParams) -> (String, String) {
    let num_questions = params.num_questions.to_string();

    let role_clause = params
        .role
        .as_deref()
        .map(|role| format!(" and role: {role}"))
        .unwrap_or_default();
    let sector_clause = params
        .sector
        .as_deref()
        .map(|sector| format!(" in the {sector} sector"))
        .unwrap_or_default();
    let answer_instruction = if params.include_answers {
        ANSWERS_INSTRUCTION
    } else {
        QUESTIONS_ONLY_INSTRUCTION
    };

    let system = fill_template(
        INTERVIEW_SYSTEM_TEMPLATE,
        &[
            ("skillset", params.skillset.as_str()),
            ("role_clause", role_clause.as_str()),
            ("sector_clause", sector_clause.as_str()),
            ("num_questions", num_questions.as_str()),
            ("answer_instruction", answer_instruction),
            ("plain_language", PLAIN_LANGUAGE_INSTRUCTION),
            ("content_policy", CONTENT_POLICY_INSTRUCTION),
        ],
    );

    let output_type = if params.include_answers {
        "Questions & Answers"
    } else {
        "Questions Only"
    };
    let role_context = params
        .role
        .as_deref()
        .map(|role| format!("for the role of {role}"))
        .unwrap_or_else(|| GENERAL_ROLE_CONTEXT.to_string());

    let prompt = fill_template(
        INTERVIEW_PROMPT_TEMPLATE,
        &[
            ("num_questions", num_questions.as_str()),
            ("output_type", output_type),
            ("skillset", params.skillset.as_str()),
            ("role_context", role_context.as_str()),
        ],
    );

    (prompt, system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::test_support::{Script, ScriptedGenerator};
    use futures_util::StreamExt;

    fn params() -> InterviewParams {
        InterviewParams {
            sector: None,
            skillset: "Python".to_string(),
            role: None,
            include_answers: true,
            num_questions: 10,
        }
    }

    const PLACEHOLDERS: [&str; 10] = [
        "{skillset}",
        "{role_clause}",
        "{sector_clause}",
        "{num_questions}",
        "{answer_instruction}",
        "{plain_language}",
        "{content_policy}",
        "{output_type}",
        "{role_context}",
        "{certification}",
    ];

    #[test]
    fn test_prompts_fill_every_placeholder() {
        let (prompt, system) = build_interview_prompts(&params());
        for placeholder in PLACEHOLDERS {
            assert!(!prompt.contains(placeholder), "unfilled {placeholder} in prompt: {prompt}");
            assert!(!system.contains(placeholder), "unfilled {placeholder} in system: {system}");
        }
    }

    #[test]
    fn test_braces_in_user_input_are_kept_verbatim() {
        let p = InterviewParams {
            skillset: "Jinja {num_questions} templating".to_string(),
            role: Some("Engineer {sector_clause}".to_string()),
            sector: Some("Web {skillset}".to_string()),
            ..params()
        };
        let (prompt, system) = build_interview_prompts(&p);

        assert!(system.contains(
            "Based on the skillset: Jinja {num_questions} templating and role: Engineer {sector_clause} in the Web {skillset} sector,"
        ));
        assert!(prompt.contains("for Jinja {num_questions} templating for the role of Engineer {sector_clause}"));
        assert!(system.contains("numbered sequentially from 1 to 10"));
    }

    #[test]
    fn test_general_role_context_without_role() {
        let (prompt, system) = build_interview_prompts(&params());
        assert!(prompt.contains(
            "Generate exactly 10 Questions & Answers for Python general + intermediate level."
        ));
        assert!(system.contains("Based on the skillset: Python,"));
        assert!(system.contains("numbered sequentially from 1 to 10"));
    }

    #[test]
    fn test_role_and_sector_are_mentioned() {
        let p = InterviewParams {
            sector: Some("Banking".to_string()),
            role: Some("Data Engineer".to_string()),
            ..params()
        };
        let (prompt, system) = build_interview_prompts(&p);
        assert!(prompt.contains("for the role of Data Engineer"));
        assert!(system.contains("Python and role: Data Engineer in the Banking sector"));
    }

    #[test]
    fn test_questions_only_drops_answer_rule() {
        let p = InterviewParams {
            include_answers: false,
            ..params()
        };
        let (prompt, system) = build_interview_prompts(&p);
        assert!(prompt.contains("Questions Only"));
        assert!(system.contains(QUESTIONS_ONLY_INSTRUCTION));
        assert!(!system.contains("directly below the question"));
    }

    #[test]
    fn test_sections_are_fixed_and_ordered() {
        let (_, system) = build_interview_prompts(&params());
        let basic = system.find("**A. Basic**").unwrap();
        let intermediate = system.find("**B. Intermediate**").unwrap();
        let advanced = system.find("**C. Advanced**").unwrap();
        assert!(basic < intermediate && intermediate < advanced);
        assert!(system.contains("use-case oriented"));
    }

    #[tokio::test]
    async fn test_stream_uses_interview_temperature() {
        let llm =
            Arc::new(ScriptedGenerator::new().with_interview(Script::fragments(["**1. Q?**"])));
        let fragments: Vec<_> = interview_questions(llm.clone(), params()).collect().await;
        assert_eq!(fragments.len(), 1);

        let (_, system, temperature) = llm.last_stream().unwrap();
        assert!(system.contains("expert technical interviewer"));
        assert_eq!(temperature, INTERVIEW_TEMPERATURE);
    }
}
