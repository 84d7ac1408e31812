use crate::lexer::{Operator, Token, join_tokens};
use log::debug;

/// Output redirection target of a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRedirect {
    /// File that replaces standard output.
    pub path: String,
    /// `>>` appends; `>` truncates.
    pub append: bool,
}

/// One runnable unit extracted from an input line.
///
/// `background` and `continues_pipe` describe the operator that closed the
/// segment, so at most one of them is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSegment {
    /// Program name followed by its arguments. Empty means "do nothing".
    pub arguments: Vec<String>,
    /// File replacing standard input; wins over an incoming pipe.
    pub input_redirect: Option<String>,
    /// File replacing standard output; wins over an outgoing pipe.
    pub output_redirect: Option<OutputRedirect>,
    /// `2>&1`: stderr follows stdout after all other wiring is resolved.
    pub merge_stderr: bool,
    /// The segment was terminated by `&`.
    pub background: bool,
    /// The segment was terminated by `|`.
    pub continues_pipe: bool,
}

impl CommandSegment {
    /// A segment with only an argument vector, convenient for building runs by hand.
    pub fn new<S: Into<String>>(arguments: impl IntoIterator<Item = S>) -> Self {
        Self {
            arguments: arguments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Program name, if any.
    pub fn program(&self) -> Option<&str> {
        self.arguments.first().map(String::as_str)
    }
}

/// All segments of one input line plus its reconstructed text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    pub segments: Vec<CommandSegment>,
    /// Tokens joined with single spaces; used in reports and logs.
    pub command_text: String,
}

/// Accumulates the pending segment while tokens are scanned.
#[derive(Default)]
struct SegmentBuilder {
    arguments: Vec<String>,
    input_redirect: Option<String>,
    output_redirect: Option<OutputRedirect>,
    merge_stderr: bool,
    segments: Vec<CommandSegment>,
}

impl SegmentBuilder {
    fn build(mut self, tokens: Vec<Token>) -> Vec<CommandSegment> {
        let mut tokens = tokens.into_iter();

        while let Some(token) = tokens.next() {
            match token {
                Token::Op(Operator::MergeStderr) => self.merge_stderr = true,
                Token::Op(Operator::RedirectIn) => match tokens.next() {
                    Some(target) => self.input_redirect = Some(target.as_str().to_string()),
                    None => debug!("dropping `<` without a target"),
                },
                Token::Op(op @ (Operator::RedirectOut | Operator::Append)) => {
                    match tokens.next() {
                        Some(target) => {
                            self.output_redirect = Some(OutputRedirect {
                                path: target.as_str().to_string(),
                                append: op == Operator::Append,
                            })
                        }
                        None => debug!("dropping `{}` without a target", op.as_str()),
                    }
                }
                Token::Op(op @ (Operator::Semi | Operator::Background | Operator::Pipe)) => {
                    self.close_segment(op == Operator::Background, op == Operator::Pipe);
                }
                Token::Word(word) => self.arguments.push(word),
            }
        }

        self.close_segment(false, false);
        self.segments
    }

    /// A separator with nothing accumulated is ignored and keeps pending redirections.
    fn close_segment(&mut self, background: bool, continues_pipe: bool) {
        if self.arguments.is_empty() {
            return;
        }
        let segment = CommandSegment {
            arguments: std::mem::take(&mut self.arguments),
            input_redirect: self.input_redirect.take(),
            output_redirect: self.output_redirect.take(),
            merge_stderr: std::mem::take(&mut self.merge_stderr),
            background,
            continues_pipe,
        };
        self.segments.push(segment);
    }
}

/// Group a token sequence into command segments.
///
/// This never fails: stray or doubled separators are ignored, and a
/// redirection operator with no following token is dropped. A redirection
/// operator consumes the next token whatever it is, so `cat < |` reads from
/// a file named `|`.
pub fn construct_segments(tokens: Vec<Token>) -> ParsedLine {
    let command_text = join_tokens(&tokens);
    let segments = SegmentBuilder::default().build(tokens);
    debug!("parsed {} segment(s) from `{}`", segments.len(), command_text);
    ParsedLine {
        segments,
        command_text,
    }
}

/// Partition segments into maximal pipe-connected runs, in order.
///
/// A run ends at the first segment that does not continue a pipe, or at
/// the last segment of the line even if it ends with a dangling `|`.
pub fn split_runs(segments: &[CommandSegment]) -> Vec<&[CommandSegment]> {
    let mut runs = Vec::new();
    let mut start = 0;
    while start < segments.len() {
        let mut end = start;
        while end + 1 < segments.len() && segments[end].continues_pipe {
            end += 1;
        }
        runs.push(&segments[start..=end]);
        start = end + 1;
    }
    runs
}
