//! Generation instruction for the six-step analysis.
//!
//! The output is a pure function of the issue text and the corpus. No
//! timestamps, ids or other per-call values go into it.

use crate::corpus::ReferenceCorpus;
use serde::Serialize;
use shield_shared::contract::STEP_TITLES;

pub const SOURCE_START: &str = "--- START OF SOURCE MATERIALS ---";
pub const SOURCE_END: &str = "--- END OF SOURCE MATERIALS ---";

pub const ROLE_PREAMBLE: &str = r#"Role: You are an expert K-12 risk assessment analyst and legal advisor. Your function is to analyze a scenario and populate a JSON object based on provided source materials. Your tone is professional, clear, and authoritative.

Task: Read the User-Provided Scenario and the Source Materials. Populate a JSON object that strictly follows the provided schema."#;

pub const FORMATTING_RULES: &str = r#"Formatting & Content Rules:
1.  Your entire response MUST be only the populated JSON object with keys "step1" through "step6". No other text and no code fences.
2.  The 'title' property for each step should be the plain title (e.g., "Classify the Issue").
3.  Derive answers, especially for Step 2 & 4, directly from the Source Materials.
4.  For legal references, cite plausible, specific-sounding case law relevant to education.
5.  **For Steps 1, 2, 3:** The 'content' MUST be a non-empty array of objects, each with a 'header' key (e.g., "Issue Type:") and a 'text' key (e.g., "Parent Complaint").
6.  **For Step 4 & 5:** The 'content' must be an object with keys "optionA", "optionB", "optionC". Step 4 options carry 'title', 'suggestedLanguage', 'policyMatch', 'riskScore', 'legalReference' and 'recommendation'. Step 5 options carry 'title', 'likelyResponse', 'schoolRisk' and 'legalReference'.
7.  **For Step 6:** The 'recommendationSummary' MUST be a string formatted with bolded headers using **text**. The 'implementationSteps' MUST be a non-empty array of strings, with each string being a complete sentence for a single step, prefixed with its number (e.g., "1. Do this first.").
8.  No field may be empty."#;

/// Instruction text handed to the generation client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub text: String,
}

impl Instruction {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the instruction for `issue_text` grounded in `corpus`
    pub fn build(issue_text: &str, corpus: &ReferenceCorpus) -> Instruction {
        let materials = corpus
            .sections()
            .iter()
            .map(|s| format!("--- Section: {} ---\n{}", s.title, s.text.trim_end()))
            .collect::<Vec<_>>()
            .join("\n\n");

        let step_titles = STEP_TITLES
            .iter()
            .enumerate()
            .map(|(i, t)| format!("step{}: {}", i + 1, t))
            .collect::<Vec<_>>()
            .join("\n");

        let text = format!(
            "{preamble}\n\n{rules}\n\nStep titles:\n{titles}\n\n{start}\n{materials}\n{end}\n\nUser-Provided Scenario: \"{issue}\"",
            preamble = ROLE_PREAMBLE,
            rules = FORMATTING_RULES,
            titles = step_titles,
            start = SOURCE_START,
            materials = materials,
            end = SOURCE_END,
            issue = issue_text.trim(),
        );
        Instruction { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> ReferenceCorpus {
        ReferenceCorpus::from_sections([
            ("4. Compensation Policies", "Pay is monthly."),
            ("5. Employee Benefit Programs", "Sick leave is for illness."),
        ])
        .unwrap()
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = PromptBuilder::build("Parent complaint", &corpus());
        let b = PromptBuilder::build("Parent complaint", &corpus());
        assert_eq!(a, b);
    }

    #[test]
    fn test_sections_in_corpus_order_between_markers() {
        let text = PromptBuilder::build("x", &corpus()).text;
        let start = text.find(SOURCE_START).unwrap();
        let first = text.find("--- Section: 4. Compensation Policies ---").unwrap();
        let second = text.find("--- Section: 5. Employee Benefit Programs ---").unwrap();
        let end = text.find(SOURCE_END).unwrap();
        assert!(start < first && first < second && second < end);
    }

    #[test]
    fn test_issue_is_quoted_last() {
        let text = PromptBuilder::build("  Bus driver left a student behind.  ", &corpus()).text;
        assert!(text.ends_with("User-Provided Scenario: \"Bus driver left a student behind.\""));
    }

    #[test]
    fn test_empty_corpus_still_has_markers() {
        let text = PromptBuilder::build("x", &ReferenceCorpus::empty()).text;
        assert!(text.contains(SOURCE_START));
        assert!(text.contains(SOURCE_END));
    }
}
