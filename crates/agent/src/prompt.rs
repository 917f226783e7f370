//! System prompt assembly.

/// Base prompt used when neither the configuration nor an agent profile
/// supplies one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an advanced AI coding assistant.";

/// Teaches the model the `<tool_code>` protocol. Always appended to the base.
pub const TOOL_INSTRUCTIONS: &str = r#"

When a task needs an action (creating, editing or reading files, listing directories, or running commands) you MUST request it with a tool block.
Available tools:
1. create_file(path, content)
2. edit_file(path, content) - replaces the whole file
3. read_file(path)
4. list_files(path)
5. run_command(command)

To use a tool, output a block like this:
<tool_code>
{"tool": "create_file", "params": {"path": "src/main.rs", "content": "fn main() {}"}}
</tool_code>

Paths are relative to the workspace root. You may use several tools in sequence; each one waits for the user's confirmation and its result arrives in a later message. Double-check file paths before writing."#;

/// `base` + tool instructions + ambient context + retrieved files.
pub fn build_system_prompt(base: &str, ambient: &str, retrieved: &str) -> String {
    let mut prompt = String::with_capacity(
        base.len() + TOOL_INSTRUCTIONS.len() + ambient.len() + retrieved.len() + 1,
    );
    prompt.push_str(base);
    prompt.push_str(TOOL_INSTRUCTIONS);
    prompt.push('\n');
    prompt.push_str(ambient);
    prompt.push_str(retrieved);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_appear_in_order() {
        let prompt = build_system_prompt("BASE", "\n\nWorkspace Root: /w", "\n\nRelevant Workspace Files");
        let base = prompt.find("BASE").unwrap();
        let tools = prompt.find("<tool_code>").unwrap();
        let root = prompt.find("Workspace Root").unwrap();
        let files = prompt.find("Relevant Workspace Files").unwrap();
        assert!(base < tools && tools < root && root < files);
    }

    #[test]
    fn every_tool_is_described() {
        for tool in ["create_file", "edit_file", "read_file", "list_files", "run_command"] {
            assert!(TOOL_INSTRUCTIONS.contains(tool), "missing {tool}");
        }
    }

    #[test]
    fn empty_context_leaves_base_and_instructions() {
        let prompt = build_system_prompt(DEFAULT_SYSTEM_PROMPT, "", "");
        assert_eq!(prompt, format!("{DEFAULT_SYSTEM_PROMPT}{TOOL_INSTRUCTIONS}\n"));
    }
}
