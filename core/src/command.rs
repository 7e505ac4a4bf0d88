//! Command-executor contract
//!
//! User actions (mouse actions, on-update/on-change/on-refresh actions) and
//! bangs carrying commands for other components are plain strings. The engine
//! only constructs the strings and hands them to a [`CommandExecutor`]; the
//! hosting application owns the interpreter.

use std::sync::Mutex;

/// Executes a command string on behalf of a skin.
///
/// Implementations must be callable from the UI thread during an update tick;
/// they must not call back into the skin synchronously.
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, command: &str, skin_key: &str);
}

/// Discards every command. Useful when a host has no interpreter.
#[derive(Debug, Default)]
pub struct NullExecutor;

impl CommandExecutor for NullExecutor {
    fn execute(&self, _command: &str, _skin_key: &str) {}
}

/// Records executed commands in order. The reference executor for tests and
/// diagnostics.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    commands: Mutex<Vec<(String, String)>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(command, skin_key)` pairs executed so far.
    pub fn commands(&self) -> Vec<(String, String)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, command: &str, skin_key: &str) {
        self.commands
            .lock()
            .unwrap()
            .push((command.to_owned(), skin_key.to_owned()));
    }
}
