//! SceneTree: a scriptable shell over the scene editing core.

/// Line-oriented command shell.
pub mod shell;

pub use scenetree_core::{Config, SceneError, Session};
pub use shell::{CommandShell, ShellCommand};
