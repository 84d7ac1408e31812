use crate::command::Outcome;
use crate::config::Settings;
use crate::env::Environment;
use crate::lexer;
use crate::parser::{self, CommandSegment};
use crate::pipeline::run_pipeline;
use anyhow::Context;
use log::debug;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use rustyline::history::History;
use std::io::BufRead;

/// What the interactive loop does with one `readline` result.
#[derive(Debug, PartialEq, Eq)]
enum Prompted {
    Line(String),
    Stop,
}

/// Ctrl-C and end of input both end the loop; any other editor error is fatal.
fn interpret_read(read: Result<String, ReadlineError>) -> anyhow::Result<Prompted> {
    match read {
        Ok(line) => Ok(Prompted::Line(line)),
        Err(ReadlineError::Interrupted) => Ok(Prompted::Stop),
        Err(ReadlineError::Eof) => {
            println!();
            Ok(Prompted::Stop)
        }
        Err(err) => Err(err).context("reading input"),
    }
}

/// Blank lines are not kept in history.
fn remember<H: History>(history: &mut H, line: &str) -> rustyline::Result<()> {
    if !line.trim().is_empty() {
        history.add(line)?;
    }
    Ok(())
}

/// Drop the line terminator (`\n` or `\r\n`) left by `read_until`.
fn trim_line_end(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
    }
    line
}

/// A line-oriented shell interpreter.
///
/// The interpreter owns the session [`Environment`] and the [`Settings`];
/// nothing it does depends on process-wide state, so tests can start it in
/// any directory with any variables.
///
/// Example
/// ```no_run
/// use vtsh::{Interpreter, Settings};
/// let mut sh = Interpreter::new(Settings::quiet());
/// let status = sh.execute_line("false ; echo ok");
/// assert_eq!(status.map(|s| s.code()), Some(0));
/// ```
pub struct Interpreter {
    env: Environment,
    settings: Settings,
}

impl Interpreter {
    /// Create an interpreter over a snapshot of the current process environment.
    pub fn new(settings: Settings) -> Self {
        Self::with_environment(Environment::new(), settings)
    }

    pub fn with_environment(env: Environment, settings: Settings) -> Self {
        Self { env, settings }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether `exit` has been run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Tokenize, expand, build and run one line of input.
    ///
    /// Returns the outcome of the last run that was started, or `None` when
    /// the line holds no command.
    pub fn execute_line(&mut self, line: &str) -> Option<Outcome> {
        let tokens = lexer::split_into_tokens(line);
        if tokens.is_empty() {
            return None;
        }
        let tokens = self.env.expand_variables(tokens);
        let parsed = parser::construct_segments(tokens);
        debug!("segments: {:?}", parsed.segments);
        self.run_segments(&parsed.segments, &parsed.command_text)
    }

    /// Run each pipe-connected partition of `segments` in order.
    ///
    /// A foreground partition is waited for before the next one starts; a
    /// background partition is only launched. `exit` stops the remaining
    /// partitions of the line.
    pub fn run_segments(&mut self, segments: &[CommandSegment], label: &str) -> Option<Outcome> {
        let mut last = None;
        for run in parser::split_runs(segments) {
            let outcome = match run_pipeline(run, label, &mut self.env, &self.settings) {
                Ok(outcome) => outcome,
                Err(e) => {
                    debug!("`{label}` aborted: {e:?}");
                    eprintln!("vtsh: {e}");
                    Outcome::Exited(1)
                }
            };
            last = Some(outcome);
            if self.env.should_exit {
                debug!("exit requested, skipping the rest of `{label}`");
                break;
            }
        }
        last
    }

    /// Interactive loop with line editing, until EOF, Ctrl-C or `exit`.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new().context("cannot initialise line editor")?;

        while !self.should_exit() {
            match interpret_read(rl.readline(&self.settings.prompt))? {
                Prompted::Line(line) => {
                    remember(rl.history_mut(), &line)?;
                    self.execute_line(&line);
                }
                Prompted::Stop => break,
            }
        }

        Ok(())
    }

    /// Non-interactive loop: one command line per input line, until EOF or `exit`.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than ending the loop.
    pub fn run_batch(&mut self, mut input: impl BufRead) -> anyhow::Result<()> {
        let mut buf = Vec::new();
        while !self.should_exit() {
            buf.clear();
            if input.read_until(b'\n', &mut buf).context("reading input")? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(trim_line_end(&buf));
            self.execute_line(&line);
        }
        Ok(())
    }
}

impl Default for Interpreter {
    /// Interpreter over the current process environment, quiet unless stdin is a terminal.
    fn default() -> Self {
        Self::new(Settings::detect())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rustyline::history::MemHistory;
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, Instant};

    fn interpreter_in(dir: &Path) -> Interpreter {
        let mut env = Environment::new();
        env.current_dir = dir.to_path_buf();
        Interpreter::with_environment(env, Settings::quiet())
    }

    fn read(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn earlier_failure_does_not_leak_into_later_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());

        let outcome = sh.execute_line("false ; echo ok > out.txt");
        assert_eq!(outcome, Some(Outcome::Exited(0)));
        assert_eq!(read(dir.path(), "out.txt"), "ok\n");
    }

    #[test]
    fn sequential_runs_share_redirect_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());

        sh.execute_line("echo one > log.txt ; echo two >> log.txt ; echo three >> log.txt");
        assert_eq!(read(dir.path(), "log.txt"), "one\ntwo\nthree\n");
    }

    #[test]
    fn background_does_not_block_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());

        let started = Instant::now();
        let outcome = sh.execute_line("sleep 5 & echo after > after.txt");
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(outcome, Some(Outcome::Exited(0)));
        assert_eq!(read(dir.path(), "after.txt"), "after\n");
    }

    #[test]
    fn exit_skips_rest_of_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());

        sh.execute_line("echo before > a.txt ; exit ; echo after > b.txt");
        assert!(sh.should_exit());
        assert!(dir.path().join("a.txt").exists());
        assert!(!dir.path().join("b.txt").exists());
    }

    #[test]
    fn batch_stops_after_exit() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());

        let script = "echo 1 > one.txt\n\nexit\necho 2 > two.txt\n";
        sh.run_batch(script.as_bytes()).unwrap();
        assert!(dir.path().join("one.txt").exists());
        assert!(!dir.path().join("two.txt").exists());
    }

    #[test]
    fn cd_affects_following_segments() {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir(root.join("inner")).unwrap();
        let mut sh = interpreter_in(&root);

        sh.execute_line("cd inner ; echo here > marker.txt");
        assert_eq!(sh.env().current_dir, root.join("inner"));
        assert_eq!(read(&root.join("inner"), "marker.txt"), "here\n");
    }

    #[test]
    fn variables_expand_before_building() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Environment::new();
        env.current_dir = dir.path().to_path_buf();
        env.set_var("TARGET", "expanded.txt");
        let mut sh = Interpreter::with_environment(env, Settings::quiet());

        sh.execute_line("echo \"a b\" $UNSET_VAR_FOR_TEST > $TARGET");
        assert_eq!(read(dir.path(), "expanded.txt"), "a b \n");
    }

    #[test]
    fn blank_and_separator_only_lines_do_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());

        assert_eq!(sh.execute_line("   "), None);
        assert_eq!(sh.execute_line(" ; & | "), None);
    }

    #[test]
    fn batch_survives_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());

        sh.run_batch(&b"echo \xff > bad.txt\r\necho ok > after.txt\n"[..]).unwrap();
        assert_eq!(read(dir.path(), "bad.txt"), "\u{fffd}\n");
        assert_eq!(read(dir.path(), "after.txt"), "ok\n");
    }

    #[test]
    fn batch_runs_last_line_without_newline() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());

        sh.run_batch("echo tail > tail.txt".as_bytes()).unwrap();
        assert_eq!(read(dir.path(), "tail.txt"), "tail\n");
    }

    #[test]
    fn interrupt_and_eof_stop_the_prompt() {
        assert_eq!(interpret_read(Err(ReadlineError::Interrupted)).unwrap(), Prompted::Stop);
        assert_eq!(interpret_read(Err(ReadlineError::Eof)).unwrap(), Prompted::Stop);
        assert_eq!(
            interpret_read(Ok("ls".to_string())).unwrap(),
            Prompted::Line("ls".to_string())
        );
        let broken = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(interpret_read(Err(ReadlineError::Io(broken))).is_err());
    }

    #[test]
    fn history_skips_blank_lines() {
        let mut history = MemHistory::new();
        remember(&mut history, "ls -l").unwrap();
        remember(&mut history, "   ").unwrap();
        remember(&mut history, "").unwrap();
        remember(&mut history, "pwd").unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn line_end_trimming() {
        assert_eq!(trim_line_end(b"ls\r\n"), b"ls");
        assert_eq!(trim_line_end(b"ls\n"), b"ls");
        assert_eq!(trim_line_end(b"ls"), b"ls");
        assert_eq!(trim_line_end(b"a\rb"), b"a\rb");
    }

    #[test]
    fn status_of_last_partition_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());

        assert_eq!(sh.execute_line("true ; sh -c 'exit 4'"), Some(Outcome::Exited(4)));
        assert_eq!(sh.execute_line("sh -c 'exit 4' ; true"), Some(Outcome::Exited(0)));
    }
}
