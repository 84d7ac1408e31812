//! Execution of one pipe-connected run of segments.

use crate::builtin::run_builtin;
use crate::command::{NOT_RUNNABLE, Outcome};
use crate::config::Settings;
use crate::env::Environment;
use crate::external::{Streams, Unit, launch};
use crate::io_adapters::{InputSource, OutputSink};
use crate::parser::CommandSegment;
use log::debug;
use std::io::{self, PipeReader, PipeWriter};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failures that abort a whole run. The interpreter itself keeps going.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipe: {0}")]
    Pipe(#[source] io::Error),
    #[error("{program}: cannot create process: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// The `n - 1` pipes between `n` segments. Pipe `i` connects segment `i` to `i + 1`.
///
/// Each end is handed out at most once; whatever is left when the struct is
/// dropped gets closed, which is what lets readers see end-of-file.
struct Pipes {
    readers: Vec<Option<PipeReader>>,
    writers: Vec<Option<PipeWriter>>,
}

impl Pipes {
    fn allocate(count: usize) -> Result<Self, PipelineError> {
        let mut readers = Vec::with_capacity(count);
        let mut writers = Vec::with_capacity(count);
        for _ in 0..count {
            let (reader, writer) = io::pipe().map_err(PipelineError::Pipe)?;
            readers.push(Some(reader));
            writers.push(Some(writer));
        }
        Ok(Self { readers, writers })
    }

    fn take_reader(&mut self, pipe: usize) -> Option<PipeReader> {
        self.readers.get_mut(pipe)?.take()
    }

    fn take_writer(&mut self, pipe: usize) -> Option<PipeWriter> {
        self.writers.get_mut(pipe)?.take()
    }

    /// Standard streams of segment `index` out of `count`.
    ///
    /// Explicit redirections win over pipes. A redirect target that cannot be
    /// opened finishes the segment with status 127 instead.
    fn wire(
        &mut self,
        segment: &CommandSegment,
        index: usize,
        count: usize,
        env: &Environment,
    ) -> Result<Streams, Unit> {
        let stdin = match &segment.input_redirect {
            Some(path) => InputSource::open(path, env).map_err(|e| not_runnable(path, e))?,
            None if index > 0 => self
                .take_reader(index - 1)
                .map_or(InputSource::Inherit, InputSource::Pipe),
            None => InputSource::Inherit,
        };

        let stdout = match &segment.output_redirect {
            Some(redirect) => {
                OutputSink::open(redirect, env).map_err(|e| not_runnable(&redirect.path, e))?
            }
            None if index + 1 < count => self
                .take_writer(index)
                .map_or(OutputSink::Inherit, OutputSink::Pipe),
            None => OutputSink::Inherit,
        };

        Ok(Streams {
            stdin,
            stdout,
            merge_stderr: segment.merge_stderr,
        })
    }
}

fn not_runnable(path: &str, err: io::Error) -> Unit {
    eprintln!("vtsh: {path}: {err}");
    Unit::Finished(Outcome::Exited(NOT_RUNNABLE))
}

/// Execute one run of pipe-connected segments and return the outcome of its last segment.
///
/// A single `cd` or `exit` segment is handled in-process. Otherwise every
/// segment is launched concurrently, the parent's copies of the pipes are
/// closed, and, unless the last segment is a background one, every unit is
/// waited for. Background runs are left running and report success at once.
///
/// `label` is the command text shown in interactive reports.
pub fn run_pipeline(
    run: &[CommandSegment],
    label: &str,
    env: &mut Environment,
    settings: &Settings,
) -> Result<Outcome, PipelineError> {
    let Some(last) = run.last() else {
        return Ok(Outcome::SUCCESS);
    };

    if let [segment] = run {
        if let Some(code) = run_builtin(&segment.arguments, env) {
            return Ok(Outcome::Exited(code));
        }
    }

    let started = Instant::now();
    let mut pipes = Pipes::allocate(run.len() - 1)?;
    let mut units = Vec::with_capacity(run.len());

    for (index, segment) in run.iter().enumerate() {
        let streams = match pipes.wire(segment, index, run.len(), env) {
            Ok(streams) => streams,
            Err(finished) => {
                units.push(finished);
                continue;
            }
        };
        match launch(&segment.arguments, streams, env, &settings.self_name) {
            Ok(unit) => units.push(unit),
            Err(source) => {
                drop(pipes);
                debug!("aborting `{label}`: {source}");
                collect(units);
                return Err(PipelineError::Spawn {
                    program: segment.program().unwrap_or_default().to_string(),
                    source,
                });
            }
        }
    }
    drop(pipes);

    if last.background {
        if let (false, Some(Unit::Running(child))) = (settings.quiet, units.last()) {
            println!("{}", background_line(child.id(), label));
        }
        return Ok(Outcome::SUCCESS);
    }

    let outcome = collect(units);
    if !settings.quiet {
        println!("{}", report_line(outcome, started.elapsed(), label));
    }
    Ok(outcome)
}

/// Report printed after a foreground run in interactive mode.
fn report_line(outcome: Outcome, elapsed: Duration, label: &str) -> String {
    format!(
        "exit={}, time={:.6} s — {}",
        outcome.code(),
        elapsed.as_secs_f64(),
        label
    )
}

/// Report printed when a background run has been started.
fn background_line(pid: u32, label: &str) -> String {
    format!("[bg pid={pid}] {label}")
}

/// Wait for every unit; only the last one's outcome is returned.
fn collect(units: Vec<Unit>) -> Outcome {
    let last = units.len().saturating_sub(1);
    let mut outcome = Outcome::SUCCESS;

    for (index, unit) in units.into_iter().enumerate() {
        let finished = match unit {
            Unit::Finished(finished) => finished,
            Unit::Running(mut child) => match child.wait() {
                Ok(status) => Outcome::from(status),
                Err(e) => {
                    debug!("waiting for pid {}: {e:?}", child.id());
                    eprintln!("vtsh: wait: {e}");
                    continue;
                }
            },
        };
        if index == last {
            outcome = finished;
        } else {
            debug!("pipeline stage {index} finished with {finished:?}");
        }
    }

    outcome
}
