//! Tools with enough behaviour to warrant their own module:
//! - Shell: terminal command execution (confirmation gated)
//! - Directory: tree listing

pub mod directory;
pub mod shell;

pub use directory::{render_tree, ListDirectoryTool};
pub use shell::RunTerminalCommandTool;
