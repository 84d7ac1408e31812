use crate::command::{NOT_RUNNABLE, Outcome};
use crate::env::Environment;
use crate::io_adapters::{InputSource, OutputSink};
use log::debug;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Search path used when the session has no `PATH`.
const DEFAULT_SEARCH_PATH: &str = "/bin:/usr/bin";

/// Written to the segment's standard output when its program cannot be found.
const NOT_FOUND_MESSAGE: &[u8] = b"Command not found\n";

/// One launched segment.
#[derive(Debug)]
pub enum Unit {
    /// A child process that still has to be collected.
    Running(Child),
    /// The segment finished without a process (no-op, or failed to start).
    Finished(Outcome),
}

/// Standard streams prepared for one segment.
#[derive(Debug)]
pub struct Streams {
    pub stdin: InputSource,
    pub stdout: OutputSink,
    /// Point stderr at whatever `stdout` is.
    pub merge_stderr: bool,
}

/// Start the program named by `arguments[0]` with the given streams.
///
/// Start-up failures of this one segment (unknown program, exec refused,
/// stderr duplication failed) become `Unit::Finished(Exited(127))` with a
/// diagnostic. Only resource exhaustion while creating the process is
/// returned as an error, since it concerns the whole run.
///
/// When the program name equals `self_name`, the running interpreter binary
/// is executed instead of searching `PATH`; the argument vector is kept as is.
pub fn launch(
    arguments: &[String],
    streams: Streams,
    env: &Environment,
    self_name: &str,
) -> io::Result<Unit> {
    let Some((name, args)) = arguments.split_first() else {
        return Ok(Unit::Finished(Outcome::SUCCESS));
    };
    let Streams {
        stdin,
        mut stdout,
        merge_stderr,
    } = streams;

    let stderr = if merge_stderr {
        match stdout.duplicate() {
            Ok(stdio) => stdio,
            Err(e) => {
                eprintln!("vtsh: 2>&1: {e}");
                return Ok(Unit::Finished(Outcome::Exited(NOT_RUNNABLE)));
            }
        }
    } else {
        Stdio::inherit()
    };

    let Some(program) = resolve_program(name, env, self_name) else {
        debug!("{name}: not found");
        let _ = stdout.write_all(NOT_FOUND_MESSAGE).and_then(|()| stdout.flush());
        return Ok(Unit::Finished(Outcome::Exited(NOT_RUNNABLE)));
    };

    let mut cmd = Command::new(&program);
    set_arg0(&mut cmd, name);
    cmd.args(args)
        .env_clear()
        .envs(&env.vars)
        .current_dir(&env.current_dir)
        .stdin(stdin.into_stdio())
        .stdout(stdout.into_stdio())
        .stderr(stderr);

    match cmd.spawn() {
        Ok(child) => {
            debug!("started {} as pid {}", program.display(), child.id());
            Ok(Unit::Running(child))
        }
        Err(e) if is_resource_exhaustion(&e) => Err(e),
        Err(e) => {
            eprintln!("vtsh: {name}: {e}");
            Ok(Unit::Finished(Outcome::Exited(NOT_RUNNABLE)))
        }
    }
}

fn resolve_program(name: &str, env: &Environment, self_name: &str) -> Option<PathBuf> {
    if name == self_name {
        match std::env::current_exe() {
            Ok(exe) => return Some(exe),
            Err(e) => debug!("cannot resolve own executable: {e}"),
        }
    }
    let search_paths = env.get_var("PATH").unwrap_or(DEFAULT_SEARCH_PATH);
    find_command_path(OsStr::new(search_paths), Path::new(name), &env.current_dir)
        .map(Cow::into_owned)
}

fn is_resource_exhaustion(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory
    )
}

#[cfg(unix)]
fn set_arg0(cmd: &mut Command, name: &str) {
    use std::os::unix::process::CommandExt;
    cmd.arg0(name);
}

#[cfg(not(unix))]
fn set_arg0(_cmd: &mut Command, _name: &str) {}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it is an executable file.
/// - Relative with a separator (e.g., `bin/sh`, `./foo`): resolved against `current_dir`.
/// - Single path component: search each directory in `search_paths` (PATH)
///   and return the first executable match.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    path: &'a Path,
    current_dir: &Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(x), None) if !path.starts_with(".") => {
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => {
            let joined = current_dir.join(path);
            find_by_path(&joined)?;
            Some(Cow::Owned(joined))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| find_by_path(candidate).is_some())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if is_executable(path) { Some(path) } else { None }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
