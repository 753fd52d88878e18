//! Terminal command tool.
//!
//! Commands run through the platform shell inside the project directory.
//! There is no sandbox: every call goes through operator confirmation.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AgentError, Result};
use crate::tool::{Parameter, Tool};
use crate::toolkit::str_arg;
use crate::value::Value;

pub struct RunTerminalCommandTool {
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl RunTerminalCommandTool {
    pub fn new(working_dir: PathBuf, timeout: Option<Duration>) -> Self {
        Self {
            working_dir,
            timeout,
        }
    }

    fn command(&self, line: &str) -> Command {
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", line]);
            cmd
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", line]);
            cmd
        };
        cmd.current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Tool for RunTerminalCommandTool {
    fn name(&self) -> &str {
        "run_terminal_command"
    }

    fn description(&self) -> &str {
        "Run a shell command in the project directory. Returns a success notice or the captured error output."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::required("command")]
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    async fn call(&self, args: Vec<Value>) -> Result<Value> {
        let line = str_arg(self.name(), &args, 0, "command")?;
        tracing::info!(command = line, dir = %self.working_dir.display(), "running terminal command");

        let mut cmd = self.command(line);
        let output = cmd.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, output).await.map_err(|_| {
                AgentError::ToolInvocation {
                    name: self.name().into(),
                    source: format!("command timed out after {limit:?}").into(),
                }
            })??,
            None => output.await?,
        };

        if output.status.success() {
            return Ok(Value::Str("command succeeded".into()));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if stderr.trim().is_empty() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none".into());
            return Ok(Value::Str(format!("command failed with exit code {code}")));
        }
        Ok(Value::Str(stderr))
    }
}
