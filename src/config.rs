use std::io::IsTerminal;

/// Default prompt shown in interactive mode.
pub const DEFAULT_PROMPT: &str = "vtsh> ";

/// Name under which a command line re-runs the interpreter itself.
pub const DEFAULT_SELF_NAME: &str = "./shell";

/// Shell-global knobs of one interpreter session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Batch mode: no prompt, no per-command reports.
    pub quiet: bool,
    pub prompt: String,
    /// Program name that re-executes the running binary instead of searching `PATH`.
    pub self_name: String,
}

impl Settings {
    /// Settings for a session driven by the process's standard input:
    /// quiet unless standard input is a terminal.
    pub fn detect() -> Self {
        Self {
            quiet: !std::io::stdin().is_terminal(),
            ..Self::default()
        }
    }

    /// Settings with reports switched off, as used for scripted input.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quiet: false,
            prompt: DEFAULT_PROMPT.to_string(),
            self_name: DEFAULT_SELF_NAME.to_string(),
        }
    }
}
