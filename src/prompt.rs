//! System prompt rendering.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::tool::ToolRegistry;

pub const DEFAULT_TEMPLATE: &str = r#"You are solving a task by breaking it into steps. For each step, first think about what to do inside <thought>, then choose exactly one of the available tools and call it inside <action>. You will then receive the tool result inside <observation>. Repeat thinking and acting until you have enough information to give a <final_answer>.

Use these XML tags for every step:
- <question> the user's task
- <thought> your reasoning
- <action> the tool call you make
- <observation> the result returned by the tool or environment
- <final_answer> the final answer

----

Example 1:

<question>How tall is the Eiffel Tower?</question>
<thought>I need the height of the Eiffel Tower. A search tool can find it.</thought>
<action>get_height("Eiffel Tower")</action>
<observation>The Eiffel Tower is about 330 meters tall including antennas.</observation>
<thought>The observation gives the height. I can answer now.</thought>
<final_answer>The Eiffel Tower is about 330 meters tall.</final_answer>

----

Example 2:

<question>Create a simple snake game in the snake directory of the project.</question>
<thought>I should learn the project layout first. Start with the project path.</thought>
<action>get_project_path()</action>
<observation>/home/me/my-react</observation>
<thought>Now check what the snake directory contains.</thought>
<action>list_directory_structure("snake")</action>
<observation>snake/
└── __init__.py</observation>
<thought>Only __init__.py exists. I will write the game file.</thought>
<action>write_to_file("/home/me/my-react/snake/game.py", "import random\n\nclass SnakeGame:\n    def run(self):\n        print('snake!')\n")</action>
<observation>write succeeded</observation>
<thought>The game file is written. The task is complete.</thought>
<final_answer>Created snake/game.py with a minimal snake game skeleton.</final_answer>

----

Rules:
- Every reply must contain two tags: first <thought>, then either <action> or <final_answer>.
- Stop generating right after </action> and wait for the real <observation>. Never write an <observation> yourself.
- Write multi-line tool arguments on one line using \n, for example: <action>write_to_file("/tmp/test.txt", "line one\nline two")</action>
- Use absolute file paths in tool arguments, not bare file names.
- If a tool fails, analyse the failure in the next <thought> and try another approach or corrected arguments.
- Before programming tasks, use get_project_path() and list_directory_structure() to learn the project layout.

----

Tools available for this task:
${tool_list}

----

Environment:

Operating system: ${operating_system}
Files in the project directory: ${file_list}
"#;

/// Values substituted into a prompt template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    pub tool_list: String,
    pub operating_system: String,
    pub file_list: String,
}

impl PromptContext {
    /// Context with no file list, for runs not tied to a directory.
    pub fn for_tools(tools: &ToolRegistry) -> Self {
        Self {
            tool_list: tool_list(tools),
            operating_system: operating_system_name().to_string(),
            file_list: String::new(),
        }
    }

    pub fn for_project(tools: &ToolRegistry, project_directory: &Path) -> Result<Self> {
        Ok(Self {
            file_list: project_file_list(project_directory)?,
            ..Self::for_tools(tools)
        })
    }
}

pub fn render(template: &str, context: &PromptContext) -> String {
    template
        .replace("${tool_list}", &context.tool_list)
        .replace("${operating_system}", &context.operating_system)
        .replace("${file_list}", &context.file_list)
}

pub fn tool_list(tools: &ToolRegistry) -> String {
    tools
        .describe()
        .iter()
        .map(|descriptor| format!("- {descriptor}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn operating_system_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "macOS",
        "windows" => "Windows",
        "linux" => "Linux",
        _ => "Unknown",
    }
}

/// Absolute paths of the directory's direct entries, sorted, comma separated.
pub fn project_file_list(directory: &Path) -> Result<String> {
    let base = directory.canonicalize()?;
    let mut entries: Vec<String> = fs::read_dir(&base)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().display().to_string())
        .collect();
    entries.sort();
    Ok(entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::project_toolkit;
    use crate::ToolsConfig;

    #[test]
    fn renders_all_placeholders() {
        let context = PromptContext {
            tool_list: "- a(): b".into(),
            operating_system: "Linux".into(),
            file_list: "/p/x".into(),
        };
        let prompt = render(DEFAULT_TEMPLATE, &context);
        assert!(prompt.contains("- a(): b"));
        assert!(prompt.contains("Operating system: Linux"));
        assert!(prompt.contains("project directory: /p/x"));
        assert!(!prompt.contains("${"));
    }

    #[test]
    fn context_lists_tools_and_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        let tools = project_toolkit(dir.path(), &ToolsConfig::default()).unwrap();

        let context = PromptContext::for_project(&tools, dir.path()).unwrap();

        assert!(context
            .tool_list
            .contains("- list_directory_structure(directory_path=None, max_depth=3): "));
        let files: Vec<&str> = context.file_list.split(", ").collect();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.txt"));
        assert!(Path::new(files[1]).is_absolute());
    }
}
