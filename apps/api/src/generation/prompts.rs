// All LLM prompt constants for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Deterministic: the verdict must not vary between identical submissions.
pub const VALIDATION_TEMPERATURE: f32 = 0.0;
/// Moderate: variety in questions, structure enforced by the prompt contract.
pub const INTERVIEW_TEMPERATURE: f32 = 0.7;
/// Lower: certification facts should be stable.
pub const CERTIFICATION_TEMPERATURE: f32 = 0.5;

/// The only classifier reply (after trim + case normalisation) that means "valid".
pub const VALID_TOKEN: &str = "VALID";

/// Skillset classification prompt. Replace `{skillset}` before sending.
pub const VALIDATION_PROMPT_TEMPLATE: &str = r#"Is "{skillset}" a recognized professional technology, academic subject, professional certification, or established job skill? Answer only with "VALID" or "INVALID"."#;

/// Interview system instruction.
/// Replace: {skillset}, {role_clause}, {sector_clause}, {num_questions},
///          {answer_instruction}, {plain_language}, {content_policy}
pub const INTERVIEW_SYSTEM_TEMPLATE: &str = r#"You are an expert technical interviewer.
Based on the skillset: {skillset}{role_clause}{sector_clause},
generate exactly {num_questions} interview questions that are relevant, progressive in difficulty, and suitable for professional interviews.

Output Requirements:
- Divide the questions into 3 distinct sections: **A. Basic**, **B. Intermediate**, and **C. Advanced**.
- These section headers must be in **bold**.
- **MANDATORY**: Leave exactly one empty line (a gap) after each section header before the first question of that section.
- **MANDATORY**: Leave exactly one empty line (a gap) after the last question of a section before the next section header starts.
- **Progression**:
    - **A. Basic**: Fundamental concepts and definitions.
    - **B. Intermediate**: Practical application, mechanisms, and deeper technical details. Significantly more difficult than Basic.
    - **C. Advanced**: Highly complex, **use-case oriented**, and scenario-based questions. Focus on architecture, optimization, troubleshooting, and real-world problem-solving rather than theory.
- The questions must be numbered sequentially from 1 to {num_questions} across the entire document.
- Each question text MUST be in **bold** (e.g., **1. What is...?**).
- {answer_instruction}
- Do not include bullet points, explanations, or extra commentary outside of the questions and answers.
- Do not skip or repeat any numbers.
{plain_language}
{content_policy}"#;

/// Answer rule when answers are requested.
pub const ANSWERS_INSTRUCTION: &str = "The answer MUST start on a NEW LINE (use a double newline for clear separation) directly below the question. The answer should NOT be bold. Example:\n**1. Question?**\n\nAnswer text here.";

/// Answer rule when only questions are requested.
pub const QUESTIONS_ONLY_INSTRUCTION: &str = "Provide only the questions.";

/// Interview user prompt.
/// Replace: {num_questions}, {output_type}, {skillset}, {role_context}
pub const INTERVIEW_PROMPT_TEMPLATE: &str = r#"Generate exactly {num_questions} {output_type} for {skillset} {role_context}.
Follow the output requirements strictly:
1. 3 sections (**A. Basic**, **B. Intermediate**, **C. Advanced**) in bold.
2. Leave a 1-line gap after each section header and between sections.
3. Advanced section MUST be use-case and scenario oriented.
4. Complexity must increase significantly in Intermediate and Advanced sections.
5. Answers MUST start on a new line.
6. Sequential numbering 1 to {num_questions}, questions in **bold**."#;

/// Role context used when no role was given.
pub const GENERAL_ROLE_CONTEXT: &str = "general + intermediate level";

/// Certification guide system instruction.
/// Replace: {certification}, {content_policy}
pub const CERTIFICATION_SYSTEM_TEMPLATE: &str = r#"You are an expert Certification Consultant.
Generate a comprehensive guide for the certification: {certification}.

Structure the output exactly with these headings:
1. About this Certification
2. Exam Details (Duration, Number of questions, Passing score, Cost, Format)
3. Pre-Requisites (If any)
4. Skills Required (In bullet points only)
5. Recommended Training and References (In bullet points only)

Formatting Rules:
- Use clear Markdown headings.
- Use bullet points for lists.
- Keep language professional and factual.
{content_policy}"#;

/// Certification guide user prompt. Replace `{certification}`.
pub const CERTIFICATION_PROMPT_TEMPLATE: &str = "Provide all the details for the {certification} certification including about, exam details, prerequisites, skills required, and training recommendations.";

/// Fills `{name}` placeholders in a single pass. Substituted values are never
/// rescanned, so user text containing `{...}` reaches the model verbatim.
/// Unknown placeholders are left as written.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let filled = tail.find('}').and_then(|close| {
            let name = &tail[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });
        match filled {
            Some((close, value)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
