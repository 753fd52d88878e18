//! A reason-then-act agent for working inside a project directory.
//!
//! The crate provides:
//! - A language model abstraction (`LanguageModel`) with an OpenAI-compatible client.
//! - A tool interface (`Tool` and `ToolRegistry`) and a project toolkit.
//! - A parser for the model's `name(arg, ...)` action language.
//! - An `Agent` that loops between the model and tools using tagged replies
//!   (`<thought>`, `<action>`, `<observation>`, `<final_answer>`).

mod action;
mod agent;
mod config;
mod error;
mod hooks;
mod llm;
mod memory;
mod message;
pub mod prompt;
pub mod protocol;
mod tool;
mod toolkit;
pub mod tools;
mod value;

pub use action::{parse_action, resolve_argument, split_arguments, ParsedAction};
pub use agent::{Agent, LoopOutcome, CANCELLED_MESSAGE};
pub use config::{AgentConfig, LoopConfig, ModelConfig, ToolsConfig};
pub use error::{AgentError, Result};
pub use hooks::{
    is_affirmative, next_input_line, stdin_lines, AgentHook, AutoApprove, ConfirmationHandler,
    LineConfirmation, SharedLines, StdinConfirmation,
};
pub use llm::{LanguageModel, OpenAiClient, StubModel};
pub use memory::Transcript;
pub use message::{Message, Role};
pub use prompt::{PromptContext, DEFAULT_TEMPLATE};
pub use tool::{Parameter, Tool, ToolDescriptor, ToolRegistry};
pub use toolkit::project_toolkit;
pub use value::Value;
