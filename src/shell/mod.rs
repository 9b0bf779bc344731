//! External command execution and process environment.

pub mod command;
pub mod env;
pub mod platform;
pub mod signal;

pub use command::{
    CommandOutput, CommandSpec, Commander, DisplayMode, RecordingCommander, SystemCommander,
};
pub use env::{is_executable, resolve_tool_path, MemoryPath, PathEnv, ProcessPath};
pub use platform::{is_ci, is_elevated, Escalation};
