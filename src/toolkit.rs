use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;

use crate::config::ToolsConfig;
use crate::error::{AgentError, Result};
use crate::tool::{Parameter, Tool, ToolRegistry};
use crate::tools::{ListDirectoryTool, RunTerminalCommandTool};
use crate::value::Value;

/// The tools a coding run gets, scoped to `project_directory`.
pub fn project_toolkit(project_directory: &Path, config: &ToolsConfig) -> Result<ToolRegistry> {
    let root = project_directory.canonicalize()?;
    let timeout = config.command_timeout_secs.map(Duration::from_secs);

    Ok(ToolRegistry::from_tools([
        Arc::new(ReadFileTool { root: root.clone() }) as Arc<dyn Tool>,
        Arc::new(WriteFileTool { root: root.clone() }),
        Arc::new(RunTerminalCommandTool::new(root.clone(), timeout)),
        Arc::new(ListDirectoryTool::new(root.clone())),
        Arc::new(ProjectPathTool { root }),
    ]))
}

/// Absolute paths are used as given, relative ones are joined onto `root`.
pub(crate) fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}

pub(crate) fn str_arg<'a>(tool: &str, args: &'a [Value], index: usize, param: &str) -> Result<&'a str> {
    args.get(index).and_then(Value::as_str).ok_or_else(|| {
        let got = args.get(index).map(Value::type_name).unwrap_or("nothing");
        AgentError::invalid_arguments(tool, format!("`{param}` must be a string, got {got}"))
    })
}

struct ReadFileTool {
    root: PathBuf,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a UTF-8 text file."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::required("file_path")]
    }

    async fn call(&self, args: Vec<Value>) -> Result<Value> {
        let path = resolve_path(&self.root, str_arg(self.name(), &args, 0, "file_path")?);
        let contents = fs::read_to_string(&path).await?;
        Ok(Value::Str(contents))
    }
}

struct WriteFileTool {
    root: PathBuf,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_to_file"
    }

    fn description(&self) -> &str {
        "Write text content to a file, creating parent directories as needed."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::required("file_path"), Parameter::required("content")]
    }

    async fn call(&self, args: Vec<Value>) -> Result<Value> {
        let path = resolve_path(&self.root, str_arg(self.name(), &args, 0, "file_path")?);
        let content = str_arg(self.name(), &args, 1, "content")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        // literal `\n` sequences become real newlines
        fs::write(&path, content.replace("\\n", "\n")).await?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "file written");
        Ok(Value::Str("write succeeded".into()))
    }
}

struct ProjectPathTool {
    root: PathBuf,
}

#[async_trait]
impl Tool for ProjectPathTool {
    fn name(&self) -> &str {
        "get_project_path"
    }

    fn description(&self) -> &str {
        "Return the absolute path of the project directory."
    }

    async fn call(&self, _args: Vec<Value>) -> Result<Value> {
        Ok(Value::Str(self.root.display().to_string()))
    }
}
