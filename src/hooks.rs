use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::action::ParsedAction;
use crate::error::Result;
use crate::message::Message;

/// Observer for the events of one run. Every method defaults to a no-op.
#[async_trait]
pub trait AgentHook: Send + Sync {
    async fn before_model(&self, _messages: &[Message]) -> Result<()> {
        Ok(())
    }

    async fn after_model(&self, _raw_response: &str) -> Result<()> {
        Ok(())
    }

    async fn on_thought(&self, _thought: &str) -> Result<()> {
        Ok(())
    }

    async fn before_tool_call(&self, _action: &ParsedAction) -> Result<()> {
        Ok(())
    }

    async fn after_tool_result(&self, _action: &ParsedAction, _observation: &str) -> Result<()> {
        Ok(())
    }

    async fn on_final_answer(&self, _answer: &str) -> Result<()> {
        Ok(())
    }
}

/// Operator approval for tools that can cause irreversible side effects.
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    async fn confirm_tool_call(&self, action: &ParsedAction) -> Result<bool>;
}

/// Approves every call. Used for unattended runs.
pub struct AutoApprove;

#[async_trait]
impl ConfirmationHandler for AutoApprove {
    async fn confirm_tool_call(&self, _action: &ParsedAction) -> Result<bool> {
        Ok(true)
    }
}

/// Line source shared between everything that reads operator input, so a
/// line buffered by one reader is never lost to another.
pub type SharedLines<R> = Arc<Mutex<Lines<R>>>;

pub fn stdin_lines() -> SharedLines<BufReader<Stdin>> {
    Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()))
}

/// Next input line, or `None` at end of input.
pub async fn next_input_line<R>(lines: &SharedLines<R>) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    Ok(lines.lock().await.next_line().await?)
}

/// Asks on the terminal and reads the answer from a shared line source.
/// End of input counts as a refusal.
pub struct LineConfirmation<R> {
    lines: SharedLines<R>,
}

pub type StdinConfirmation = LineConfirmation<BufReader<Stdin>>;

impl<R> LineConfirmation<R> {
    pub fn new(lines: SharedLines<R>) -> Self {
        Self { lines }
    }
}

impl StdinConfirmation {
    pub fn stdin() -> Self {
        Self::new(stdin_lines())
    }
}

#[async_trait]
impl<R> ConfirmationHandler for LineConfirmation<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn confirm_tool_call(&self, action: &ParsedAction) -> Result<bool> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("\n\nRun `{action}`? (Y/N) ").as_bytes())
            .await?;
        stdout.flush().await?;

        let answer = next_input_line(&self.lines).await?;
        Ok(answer.is_some_and(|line| is_affirmative(&line)))
    }
}

/// Only a lone `y` or `Y` counts as approval.
pub fn is_affirmative(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("y")
}
