//! Prompt assembly for Athena SQL generation.
//!
//! [`assemble`] is a pure function of the question, the retrieved chunks,
//! and the conversation history. Sections always appear in this order:
//!
//! 1. Instructions (role, dialect, output-format rules)
//! 2. Conversation history, oldest first, bounded by [`PromptLimits`]
//! 3. Schema context, chunk texts in ranking order
//! 4. The new question
//!
//! The prompt is built by concatenation, never by re-scanning a template,
//! so placeholder-looking text such as `{question}` inside user content
//! stays literal. User-supplied lines that mimic a section header are
//! escaped so they cannot open a section of their own.

use crate::models::{ConversationTurn, RetrievalResult};

/// Section headers the model is told to rely on.
const SECTION_HEADERS: [&str; 5] = [
    "**RULES:**",
    "**CONVERSATION HISTORY:**",
    "**SCHEMA CONTEXT:**",
    "**NEW QUESTION:**",
    "**SQL QUERY:**",
];

const INSTRUCTIONS: &str = "You are an expert Amazon Athena (Presto SQL) writer. \
Write a correct and efficient SQL query that answers the new question, using the \
schema context and the conversation so far.";

const RULES: &str = "\
1.  Use the conversation history to resolve references to earlier messages (e.g. \"it\" or \"that\").
2.  Output ONLY the Amazon Athena (Presto SQL) query that answers the NEW QUESTION.
3.  Do not add explanations, greetings, or any other prose.
4.  Wrap the query in a fenced markdown block: ```sql\\n[YOUR QUERY HERE]\\n```.
5.  When creating table aliases, you MUST NOT use the letter 'e' as an alias.";

const CONTEXT_PREAMBLE: &str = "Relevant schema information retrieved from the user's document. \
Use it to identify the tables and columns available.";

const NO_HISTORY: &str = "No conversation history.";
const NO_CONTEXT: &str = "(no schema context retrieved)";

/// Upper bounds on how much conversation history enters a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    /// Most recent turns kept.
    pub max_history_turns: usize,
    /// Maximum characters of formatted history; oldest turns drop first.
    pub max_history_chars: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            max_history_turns: 20,
            max_history_chars: 8000,
        }
    }
}

/// Build the model-ready prompt.
pub fn assemble(
    question: &str,
    retrieved: &RetrievalResult,
    history: &[ConversationTurn],
    limits: &PromptLimits,
) -> String {
    let mut out = String::new();

    out.push_str(INSTRUCTIONS);
    out.push_str("\n\n**RULES:**\n");
    out.push_str(RULES);

    out.push_str("\n\n**CONVERSATION HISTORY:**\n");
    out.push_str(&format_history(bounded_history(history, limits)));

    out.push_str("\n\n**SCHEMA CONTEXT:**\n");
    out.push_str(CONTEXT_PREAMBLE);
    out.push('\n');
    if retrieved.is_empty() {
        out.push_str(NO_CONTEXT);
    } else {
        let context: Vec<String> = retrieved.texts().map(neutralize).collect();
        out.push_str(&context.join("\n\n"));
    }

    out.push_str("\n\n**NEW QUESTION:**\n");
    out.push_str(&neutralize(question));
    out.push_str("\n\n**SQL QUERY:**\n");

    out
}

/// The newest suffix of `history` that fits within `limits`.
pub fn bounded_history<'a>(
    history: &'a [ConversationTurn],
    limits: &PromptLimits,
) -> &'a [ConversationTurn] {
    let mut start = history.len().saturating_sub(limits.max_history_turns);
    let mut total: usize = history[start..].iter().map(formatted_len).sum();

    while start < history.len() && total > limits.max_history_chars {
        total -= formatted_len(&history[start]);
        start += 1;
    }

    &history[start..]
}

/// `Role: content` per turn, one per line.
pub fn format_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return NO_HISTORY.to_string();
    }
    history
        .iter()
        .map(|t| format!("{}: {}", t.role, neutralize(&t.content)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Characters a turn occupies in the formatted history, newline included.
fn formatted_len(turn: &ConversationTurn) -> usize {
    turn.role.to_string().len() + 2 + turn.content.chars().count() + 1
}

/// Escape lines of user content that look like one of our section headers.
fn neutralize(text: &str) -> String {
    if !text.contains("**") {
        return text.to_string();
    }
    text.split('\n')
        .map(|line| {
            let trimmed = line.trim();
            let spoofs_header = SECTION_HEADERS
                .iter()
                .any(|h| trimmed.eq_ignore_ascii_case(h));
            if spoofs_header {
                line.replace("**", "\\*\\*")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
