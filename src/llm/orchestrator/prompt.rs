//! Prompt text and fixed user-facing messages

/// System prompt used when the caller supplies none
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Guidance appended to the system prompt whenever tools are offered
pub const TOOL_INSTRUCTIONS: &str = "You have access to tools that can look up information \
and perform actions on the user's behalf. When answering requires information you do not \
already have, call the most relevant tool with precise arguments, then answer using its \
results. If a tool fails or returns nothing useful, say so rather than guessing. When no \
tool is needed, answer directly.";

/// Returned when the model keeps requesting tools past the iteration cap
pub const MAX_ITERATIONS_MESSAGE: &str = "I apologize, but I reached the maximum number of \
tool calls while processing your request. Please try rephrasing your question or breaking \
it into smaller parts.";

/// Returned when both the tool loop and the plain fallback fail
pub const GENERIC_ERROR_MESSAGE: &str = "I apologize, but I encountered an error while \
processing your request. Please try again.";

/// Initial prompt for a run with tools
pub fn tool_prompt(system_prompt: &str, message: &str) -> String {
    format!(
        "{}\n\n{}\n\nUser: {}",
        system_prompt, TOOL_INSTRUCTIONS, message
    )
}

/// Prompt for tool-free generation
pub fn plain_prompt(system_prompt: &str, message: &str) -> String {
    format!("{}\n\nUser: {}", system_prompt, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_prompt_layout() {
        let prompt = tool_prompt("Be brief.", "Search for X");
        assert!(prompt.starts_with("Be brief.\n\n"));
        assert!(prompt.contains(TOOL_INSTRUCTIONS));
        assert!(prompt.ends_with("\n\nUser: Search for X"));
    }

    #[test]
    fn test_plain_prompt_has_no_tool_instructions() {
        let prompt = plain_prompt("Be brief.", "Hi");
        assert_eq!(prompt, "Be brief.\n\nUser: Hi");
    }

    #[test]
    fn test_fixed_messages() {
        assert!(MAX_ITERATIONS_MESSAGE.contains("maximum number of tool calls"));
        assert!(GENERIC_ERROR_MESSAGE.starts_with("I apologize"));
    }
}
