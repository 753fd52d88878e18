use crate::error::{AgentError, Result};
use crate::message::{Message, Role};

/// Append-only transcript for a single run.
///
/// A transcript always opens with one system message followed by one user
/// message carrying the task. Later entries are assistant replies and
/// observation messages; no entry may have empty content.
#[derive(Clone, Debug)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn start(system_prompt: impl Into<String>, task: impl Into<String>) -> Result<Self> {
        let mut transcript = Self {
            messages: Vec::with_capacity(8),
        };
        transcript.append(Message::system(system_prompt))?;
        transcript.append(Message::user(task))?;
        Ok(transcript)
    }

    pub fn push(&mut self, message: Message) -> Result<()> {
        if message.role == Role::System {
            return Err(AgentError::Protocol(
                "system message is only allowed at the start of a transcript".into(),
            ));
        }
        self.append(message)
    }

    fn append(&mut self, message: Message) -> Result<()> {
        if message.content.is_empty() {
            return Err(AgentError::Protocol(format!(
                "refusing to record an empty {} message",
                message.role.as_str()
            )));
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
