use crate::lexer::Token;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Session state of the interpreter.
///
/// The environment contains:
/// - `vars`: variables used for `$NAME` expansion and passed to every spawned program.
/// - `current_dir`: the working directory for command execution, changed only by `cd`.
/// - `should_exit`: set by the `exit` built-in; the sequencer and the REPL stop when it is set.
///
/// Nothing here is read back from the process after construction, so a test can
/// build an `Environment` with whatever starting conditions it needs.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, indicates that the interpreter should stop.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        Self::with_vars(vars, current_dir)
    }

    /// Build an environment from explicit variables and working directory.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: PathBuf) -> Self {
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    /// Get the value of a session variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override a session variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Resolve `path` against the session working directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.current_dir.join(path)
    }

    /// Replace every word of the form `$NAME` with the variable's value.
    ///
    /// The whole word must be the reference; unset variables become an
    /// empty word and a lone `$` is left untouched. Operators pass through.
    pub fn expand_variables(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .map(|token| match token {
                Token::Word(word) if word.len() > 1 && word.starts_with('$') => {
                    let value = self.get_var(&word[1..]).unwrap_or_default();
                    Token::Word(value.to_string())
                }
                other => other,
            })
            .collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use crate::lexer::{Operator, Token, split_into_tokens};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn empty_env() -> Environment {
        Environment::with_vars(HashMap::new(), PathBuf::from("/"))
    }

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = empty_env();

        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE"));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert!(!env.should_exit);
    }

    #[test]
    fn expands_set_and_unset_variables() {
        let mut env = empty_env();
        env.set_var("GREETING", "hello there");

        let tokens = env.expand_variables(split_into_tokens("echo $GREETING $MISSING | cat"));
        assert_eq!(
            tokens,
            vec![
                Token::Word("echo".into()),
                Token::Word("hello there".into()),
                Token::Word(String::new()),
                Token::Op(Operator::Pipe),
                Token::Word("cat".into()),
            ]
        );
    }

    #[test]
    fn lone_dollar_and_embedded_dollar_are_kept() {
        let mut env = empty_env();
        env.set_var("X", "1");

        let tokens = env.expand_variables(split_into_tokens("echo $ a$X"));
        assert_eq!(
            tokens,
            vec![
                Token::Word("echo".into()),
                Token::Word("$".into()),
                Token::Word("a$X".into()),
            ]
        );
    }

    #[test]
    fn resolve_path_keeps_absolute_paths() {
        let env = Environment::with_vars(HashMap::new(), PathBuf::from("/srv"));
        assert_eq!(env.resolve_path("data"), PathBuf::from("/srv/data"));
        assert_eq!(env.resolve_path("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
