use crate::command::ExitCode;
use crate::env::Environment;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are executed directly in-process without spawning a child
/// process. They only act on the session state, never on the interpreter
/// process itself. Their arguments are plain words: nothing is treated as an
/// option, so `cd -` or `cd help` name directories.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "cd".
    fn name() -> &'static str;

    /// Build the command from the words that follow its name.
    fn from_words(args: &[String]) -> Self;

    /// Return value follows shell conventions: 0 for success, non-zero for error.
    fn execute(self, env: &mut Environment) -> Result<ExitCode>;
}

/// Run `arguments` as a built-in if its program name is one.
///
/// Returns `None` for anything that has to be spawned.
pub fn run_builtin(arguments: &[String], env: &mut Environment) -> Option<ExitCode> {
    let (name, args) = arguments.split_first()?;
    if name == Cd::name() {
        Some(invoke::<Cd>(args, env))
    } else if name == Exit::name() {
        Some(invoke::<Exit>(args, env))
    } else {
        None
    }
}

fn invoke<T: BuiltinCommand>(args: &[String], env: &mut Environment) -> ExitCode {
    match T::from_words(args).execute(env) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e:#}");
            1
        }
    }
}

/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    /// Absolute or relative to the current directory. Anything after it is ignored.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn from_words(args: &[String]) -> Self {
        Cd {
            target: args.first().cloned(),
        }
    }

    fn execute(self, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => PathBuf::from(env.get_var("HOME").unwrap_or("/")),
        };

        let new_dir = env.resolve_path(target);
        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: {}", new_dir.display()))?;
        if !canonical.is_dir() {
            bail!("cd: {}: not a directory", canonical.display());
        }

        env.current_dir = canonical;
        Ok(0)
    }
}

/// Exit the shell with status 0. Arguments are ignored.
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_words(_args: &[String]) -> Self {
        Exit
    }

    fn execute(self, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn env_at(dir: &std::path::Path) -> Environment {
        Environment::with_vars(HashMap::new(), dir.to_path_buf())
    }

    #[test]
    fn cd_relative_and_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        let mut env = env_at(&root);

        assert_eq!(run_builtin(&argv(&["cd", "sub"]), &mut env), Some(0));
        assert_eq!(env.current_dir, root.join("sub"));

        assert_eq!(run_builtin(&argv(&["cd", ".."]), &mut env), Some(0));
        assert_eq!(env.current_dir, root);

        assert_eq!(
            run_builtin(&argv(&["cd", root.join("sub").to_str().unwrap()]), &mut env),
            Some(0)
        );
        assert_eq!(env.current_dir, root.join("sub"));
    }

    #[test]
    fn cd_without_target_goes_home() {
        let dir = tempfile::tempdir().unwrap();
        let home = fs::canonicalize(dir.path()).unwrap();
        let mut env = env_at(Path::new("/"));
        env.set_var("HOME", home.to_str().unwrap());

        assert_eq!(run_builtin(&argv(&["cd"]), &mut env), Some(0));
        assert_eq!(env.current_dir, home);
    }

    #[test]
    fn cd_without_home_goes_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = env_at(dir.path());
        assert_eq!(run_builtin(&argv(&["cd"]), &mut env), Some(0));
        assert_eq!(env.current_dir, PathBuf::from("/"));
    }

    #[test]
    fn cd_failure_keeps_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("file"), "x").unwrap();
        let mut env = env_at(dir.path());

        assert_eq!(run_builtin(&argv(&["cd", "missing"]), &mut env), Some(1));
        assert_eq!(run_builtin(&argv(&["cd", "file"]), &mut env), Some(1));
        assert_eq!(env.current_dir, dir.path());
    }

    #[test]
    fn exit_sets_flag() {
        let mut env = env_at(Path::new("/"));
        assert_eq!(run_builtin(&argv(&["exit", "3"]), &mut env), Some(0));
        assert!(env.should_exit);
    }

    #[test]
    fn exit_ignores_option_like_arguments() {
        for args in [
            ["exit", "-1"],
            ["exit", "--now"],
            ["exit", "--help"],
            ["exit", "help"],
        ] {
            let mut env = env_at(Path::new("/"));
            assert_eq!(run_builtin(&argv(&args), &mut env), Some(0), "{args:?}");
            assert!(env.should_exit, "{args:?}");
        }
    }

    #[test]
    fn cd_takes_first_word_literally() {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        for name in ["help", "-", "-x", "--help"] {
            fs::create_dir(root.join(name)).unwrap();
        }
        let mut env = env_at(&root);

        for name in ["help", "-", "-x", "--help"] {
            env.current_dir = root.clone();
            assert_eq!(run_builtin(&argv(&["cd", name, "extra"]), &mut env), Some(0), "{name}");
            assert_eq!(env.current_dir, root.join(name));
        }
    }

    #[test]
    fn other_programs_are_not_builtins() {
        let mut env = env_at(Path::new("/"));
        assert_eq!(run_builtin(&argv(&["ls", "-l"]), &mut env), None);
        assert_eq!(run_builtin(&[], &mut env), None);
        assert!(!env.should_exit);
    }
}
