use anyhow::Result;
use argh::FromArgs;
use std::path::PathBuf;
use vtsh::config::{DEFAULT_PROMPT, DEFAULT_SELF_NAME};
use vtsh::{Interpreter, Settings, logging};

#[derive(FromArgs)]
/// A small interactive shell: pipes, sequencing, background runs and redirections.
struct Args {
    #[argh(switch, short = 'q')]
    /// batch mode: no prompt and no per-command reports (default when stdin is not a terminal)
    quiet: bool,

    #[argh(switch, short = 'i')]
    /// interactive mode even when stdin is not a terminal
    interactive: bool,

    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// prompt shown in interactive mode
    prompt: String,

    #[argh(option, default = "DEFAULT_SELF_NAME.to_string()")]
    /// command name that re-runs this shell binary
    self_name: String,

    #[argh(switch, short = 'v')]
    /// more log output on stderr; repeat for trace level
    verbose: u8,

    #[argh(option)]
    /// also append log output to this file
    log_file: Option<PathBuf>,
}

impl Args {
    fn settings(&self) -> Settings {
        let detected = Settings::detect();
        Settings {
            quiet: if self.quiet {
                true
            } else if self.interactive {
                false
            } else {
                detected.quiet
            },
            prompt: self.prompt.clone(),
            self_name: self.self_name.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    logging::init(logging::level_for(args.verbose), args.log_file.as_deref())?;

    let settings = args.settings();
    let quiet = settings.quiet;
    let mut shell = Interpreter::new(settings);

    if quiet {
        shell.run_batch(std::io::stdin().lock())
    } else {
        shell.repl()
    }
}
