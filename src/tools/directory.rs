//! Directory tree listing.

use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::tool::{Parameter, Tool};
use crate::toolkit::resolve_path;
use crate::value::Value;

const DEFAULT_MAX_DEPTH: i64 = 3;

pub struct ListDirectoryTool {
    root: PathBuf,
}

impl ListDirectoryTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory_structure"
    }

    fn description(&self) -> &str {
        "Show the directory tree under directory_path (the project root when None), directories first, up to max_depth levels."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::optional("directory_path", Value::None),
            Parameter::optional("max_depth", DEFAULT_MAX_DEPTH),
        ]
    }

    async fn call(&self, args: Vec<Value>) -> Result<Value> {
        let target = match args.first() {
            None | Some(Value::None) => self.root.clone(),
            Some(Value::Str(path)) => resolve_path(&self.root, path),
            Some(other) => {
                return Err(AgentError::invalid_arguments(
                    self.name(),
                    format!("`directory_path` must be a string or None, got {}", other.type_name()),
                ))
            }
        };
        let max_depth = match args.get(1) {
            None => DEFAULT_MAX_DEPTH,
            Some(value) => value.as_int().ok_or_else(|| {
                AgentError::invalid_arguments(
                    self.name(),
                    format!("`max_depth` must be an integer, got {}", value.type_name()),
                )
            })?,
        };
        let max_depth = usize::try_from(max_depth).unwrap_or(0);

        let tree = tokio::task::spawn_blocking(move || render_tree(&target, max_depth))
            .await
            .map_err(|err| AgentError::ToolInvocation {
                name: "list_directory_structure".into(),
                source: Box::new(err),
            })??;
        Ok(Value::Str(tree))
    }
}

/// Render `target` as an indented tree. A missing directory is reported in
/// the returned text rather than as an error.
pub fn render_tree(target: &Path, max_depth: usize) -> Result<String> {
    if !target.exists() {
        return Ok(format!("directory does not exist: {}", target.display()));
    }
    if !target.is_dir() {
        return Err(AgentError::Io(std::io::Error::other(format!(
            "not a directory: {}",
            target.display()
        ))));
    }

    let label = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.display().to_string());
    let mut out = format!("{label}/\n");
    build_tree(target, "", 0, max_depth, &mut out);
    Ok(out)
}

fn build_tree(path: &Path, prefix: &str, depth: usize, max_depth: usize, out: &mut String) {
    if depth >= max_depth {
        return;
    }

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            let _ = writeln!(out, "{prefix}[permission denied]");
            return;
        }
        Err(err) => {
            let _ = writeln!(out, "{prefix}[unreadable: {err}]");
            return;
        }
    };

    let mut names: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
        .collect();
    names.sort_by(|a, b| a.0.cmp(&b.0));

    let (dirs, files): (Vec<_>, Vec<_>) = names.into_iter().partition(|(_, p)| p.is_dir());
    let files: Vec<_> = files.into_iter().filter(|(_, p)| p.is_file()).collect();

    for (i, (name, dir)) in dirs.iter().enumerate() {
        let is_last = i == dirs.len() - 1 && files.is_empty();
        let connector = if is_last { "└── " } else { "├── " };
        let _ = writeln!(out, "{prefix}{connector}{name}/");
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        build_tree(dir, &child_prefix, depth + 1, max_depth, out);
    }

    for (i, (name, _)) in files.iter().enumerate() {
        let connector = if i == files.len() - 1 { "└── " } else { "├── " };
        let _ = writeln!(out, "{prefix}{connector}{name}");
    }
}
