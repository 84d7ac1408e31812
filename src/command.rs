use std::fmt;
use std::process::ExitStatus;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Reserved status for a program that could not be found or started.
pub const NOT_RUNNABLE: ExitCode = 127;

/// How one unit of execution finished.
///
/// The distinction between a normal exit and a signal is kept until the
/// status is reported; [`Outcome::code`] folds it into the shell convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The program exited on its own with this code.
    Exited(ExitCode),
    /// The program was terminated by this signal number.
    Signaled(i32),
}

impl Outcome {
    pub const SUCCESS: Outcome = Outcome::Exited(0);

    /// Numeric status as a shell reports it: `128 + signal` for signals.
    pub fn code(self) -> ExitCode {
        match self {
            Outcome::Exited(code) => code,
            Outcome::Signaled(signal) => 128 + signal,
        }
    }

    pub fn success(self) -> bool {
        self == Outcome::SUCCESS
    }
}

impl From<ExitStatus> for Outcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Outcome::Exited(code);
        }
        terminated_by_signal(status)
    }
}

#[cfg(unix)]
fn terminated_by_signal(status: ExitStatus) -> Outcome {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => Outcome::Signaled(signal),
        None => Outcome::Exited(1),
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_status: ExitStatus) -> Outcome {
    Outcome::Exited(1)
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
