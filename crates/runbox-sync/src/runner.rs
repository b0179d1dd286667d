//! Seam to the code execution engine.

use runbox_types::FileSet;
use serde::{Deserialize, Serialize};

/// Executes a file set out of process and reports back through [`RunEvent`]s.
pub trait CodeRunner: Send + Sync {
    /// Start a run. `warmup` prepares the runtime without user-visible output.
    fn run(&self, files: &FileSet, warmup: bool);
}

/// Messages emitted by a run, tagged by `kind` on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RunEvent {
    Status { message: String },
    /// Raw stdout/stderr chunks.
    Print { data: Vec<Vec<u8>> },
    Error { message: String },
    /// Space-separated list of installed dependencies, possibly empty.
    Installed { message: String },
    Versions { python: String, pyodide: String },
    End,
}

/// What a run has shown so far.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutput {
    pub status: String,
    pub installed: String,
    pub terminal: String,
    pub versions: String,
    pub finished: bool,
}

impl Default for RunOutput {
    fn default() -> Self {
        Self {
            status: "Launching Python...".into(),
            installed: String::new(),
            terminal: String::new(),
            versions: String::new(),
            finished: false,
        }
    }
}

impl RunOutput {
    /// A new run is starting. Installed packages and versions carry over.
    pub fn begin(&mut self) {
        let fresh = Self::default();
        self.status = fresh.status;
        self.terminal = fresh.terminal;
        self.finished = fresh.finished;
    }

    /// Fold one event in. Returns `true` if terminal output changed.
    pub fn apply(&mut self, event: RunEvent) -> bool {
        match event {
            RunEvent::Status { message } => self.status = message,
            RunEvent::Print { data } => {
                for chunk in data {
                    self.terminal.push_str(&String::from_utf8_lossy(&chunk));
                }
                return true;
            }
            RunEvent::Error { message } => {
                self.terminal.push_str(&message);
                return true;
            }
            RunEvent::Installed { message } => {
                self.installed = if message.is_empty() {
                    String::new()
                } else {
                    format!("Installed dependencies: {message}")
                };
            }
            RunEvent::Versions { python, pyodide } => {
                self.versions = format!("Python {python}, Pyodide {pyodide}");
            }
            RunEvent::End => self.finished = true,
        }
        false
    }
}
