//! The parsing-and-execution engine of a small command-line interpreter.
//!
//! One line of input goes through four stages:
//! text → [`lexer`] tokens → [`parser`] command segments → OS processes wired
//! by [`pipeline`] → exit status. The [`Interpreter`] drives the stages for
//! each line, runs the `cd` and `exit` built-ins in-process and keeps the
//! session state in an [`env::Environment`].
//!
//! Supported syntax: `;` `&` `|` `<` `>` `>>` `2>&1`, one level of `'`/`"`
//! quoting, and whole-word `$NAME` expansion. There are no control
//! structures, globbing or job control.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
mod external;
mod interpreter;
mod io_adapters;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod pipeline;

pub use command::{ExitCode, Outcome};
pub use config::Settings;
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
