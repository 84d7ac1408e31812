use crate::env::Environment;
use crate::parser::OutputRedirect;
use std::fs::{File, OpenOptions};
use std::io::{self, PipeReader, PipeWriter, Write};
use std::process::Stdio;

/// Where a segment's standard input comes from.
#[derive(Debug)]
pub enum InputSource {
    /// The interpreter's own standard input.
    Inherit,
    /// A `<` redirect target, opened read-only.
    File(File),
    /// Read end of the pipe from the previous segment.
    Pipe(PipeReader),
}

impl InputSource {
    /// Open an input redirect target relative to the session directory.
    pub fn open(path: &str, env: &Environment) -> io::Result<Self> {
        File::open(env.resolve_path(path)).map(InputSource::File)
    }

    pub fn into_stdio(self) -> Stdio {
        match self {
            InputSource::Inherit => Stdio::inherit(),
            InputSource::File(file) => file.into(),
            InputSource::Pipe(reader) => reader.into(),
        }
    }
}

/// Where a segment's standard output goes.
#[derive(Debug)]
pub enum OutputSink {
    /// The interpreter's own standard output.
    Inherit,
    /// A `>` or `>>` redirect target.
    File(File),
    /// Write end of the pipe to the next segment.
    Pipe(PipeWriter),
}

impl OutputSink {
    /// Open an output redirect target: create, then truncate or append.
    pub fn open(redirect: &OutputRedirect, env: &Environment) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.create(true);
        if redirect.append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        options
            .open(env.resolve_path(&redirect.path))
            .map(OutputSink::File)
    }

    /// A second handle on the same destination, used for `2>&1`.
    pub fn duplicate(&self) -> io::Result<Stdio> {
        match self {
            OutputSink::Inherit => inherited_stdout(),
            OutputSink::File(file) => file.try_clone().map(Stdio::from),
            OutputSink::Pipe(writer) => writer.try_clone().map(Stdio::from),
        }
    }

    pub fn into_stdio(self) -> Stdio {
        match self {
            OutputSink::Inherit => Stdio::inherit(),
            OutputSink::File(file) => file.into(),
            OutputSink::Pipe(writer) => writer.into(),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Inherit => io::stdout().write(buf),
            OutputSink::File(file) => file.write(buf),
            OutputSink::Pipe(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Inherit => io::stdout().flush(),
            OutputSink::File(file) => file.flush(),
            OutputSink::Pipe(writer) => writer.flush(),
        }
    }
}

#[cfg(unix)]
fn inherited_stdout() -> io::Result<Stdio> {
    use std::os::fd::AsFd;
    io::stdout()
        .as_fd()
        .try_clone_to_owned()
        .map(Stdio::from)
}

#[cfg(not(unix))]
fn inherited_stdout() -> io::Result<Stdio> {
    Ok(Stdio::inherit())
}
