//! Prompts sent to the chat-completion model.
//!
//! Every piece of prompt text lives here so that wording changes are made in
//! one place and can be inspected by unit tests without calling a model.
//! Callers can override the system message via
//! [`crate::config::ServiceConfig::system_prompt`].

use std::borrow::Cow;

/// Default system message framing the conversation.
pub const SYSTEM_PROMPT: &str = "Specification Deviation Report";

/// A fully assembled user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

/// Build the comparison prompt.
///
/// The output format comes first so the model reads the shape of the answer
/// before the data. Each input is capped at `max_chars` characters by
/// [`cap_chars`]; input within the cap appears verbatim.
///
/// ```
/// use spec_deviation::prompts::build_prompt;
///
/// let p = build_prompt("Valve A: 150 PSI", "Valve A: 200 PSI max", "Deviation: <text>", 10_000);
/// assert!(p.as_str().contains("Valve A: 150 PSI"));
/// assert!(p.as_str().contains("Deviation: <text>"));
/// ```
pub fn build_prompt(
    requirement_text: &str,
    standard_text: &str,
    format_template: &str,
    max_chars: usize,
) -> Prompt {
    let format_template = cap_chars(format_template, max_chars);
    let requirement_text = cap_chars(requirement_text, max_chars);
    let standard_text = cap_chars(standard_text, max_chars);

    Prompt(format!(
        "I want output exactly in the reference format:{format_template}. \
Task is about the Gate Valve specifications comparison between the customer's request \
and the STD availability in the company. For this task compare the TWO Data Sets, \
Requirements_dataSet and Standards_dataSet. \
Requirements_dataSet is:{requirement_text}. \
Standards_dataSet is:{standard_text}."
    ))
}

/// Limit `text` to `max_chars` characters.
///
/// Text over the limit is cut on a character boundary and followed by a
/// line `[... truncated N characters ...]` so the model (and anyone reading
/// the prompt) can tell the document was shortened.
pub fn cap_chars(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        None => Cow::Borrowed(text),
        Some((cut, _)) => {
            let omitted = text[cut..].chars().count();
            Cow::Owned(format!(
                "{}\n[... truncated {} characters ...]",
                &text[..cut],
                omitted
            ))
        }
    }
}
