//! Lexical analysis (tokenization) of one input line.

use std::fmt;

/// Shell operators recognised by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `;`: run the next segment after this one.
    Semi,
    /// `&`: run the preceding segment in the background.
    Background,
    /// `|`: feed stdout into the next segment.
    Pipe,
    /// `<`: read stdin from a file.
    RedirectIn,
    /// `>`: write stdout to a file, truncating it.
    RedirectOut,
    /// `>>`: write stdout to a file, appending.
    Append,
    /// `2>&1`: send stderr wherever stdout goes.
    MergeStderr,
}

impl Operator {
    /// The operator's shell syntax.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Semi => ";",
            Operator::Background => "&",
            Operator::Pipe => "|",
            Operator::RedirectIn => "<",
            Operator::RedirectOut => ">",
            Operator::Append => ">>",
            Operator::MergeStderr => "2>&1",
        }
    }

    fn from_char(ch: char) -> Option<Self> {
        match ch {
            ';' => Some(Operator::Semi),
            '&' => Some(Operator::Background),
            '|' => Some(Operator::Pipe),
            '<' => Some(Operator::RedirectIn),
            '>' => Some(Operator::RedirectOut),
            _ => None,
        }
    }
}

/// A token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A plain or quoted word, quotes already stripped.
    Word(String),
    /// One of the shell operators.
    Op(Operator),
}

impl Token {
    /// Textual form of the token as it would be written on a command line.
    pub fn as_str(&self) -> &str {
        match self {
            Token::Word(word) => word,
            Token::Op(op) => op.as_str(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(line: &str) -> Self {
        Lexer {
            input: line.chars().collect(),
            pos: 0,
        }
    }

    fn make_tokens(mut self) -> Vec<Token> {
        let mut out = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek_char() else {
                break;
            };

            if let Some(op) = self.match_multi_char_operator() {
                self.pos += op.as_str().len();
                out.push(Token::Op(op));
                continue;
            }

            if let Some(op) = Operator::from_char(ch) {
                self.pos += 1;
                out.push(Token::Op(op));
                continue;
            }

            if ch == '\'' || ch == '"' {
                self.pos += 1;
                out.push(Token::Word(self.read_quoted(ch)));
                continue;
            }

            out.push(Token::Word(self.read_word()));
        }

        out
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        let mut idx = self.pos;
        for expected in pattern.chars() {
            if self.input.get(idx) != Some(&expected) {
                return false;
            }
            idx += 1;
        }
        true
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// `2>&1` is tried before `>>` so that neither is split into single-char operators.
    fn match_multi_char_operator(&self) -> Option<Operator> {
        if self.starts_with("2>&1") {
            Some(Operator::MergeStderr)
        } else if self.starts_with(">>") {
            Some(Operator::Append)
        } else {
            None
        }
    }

    /// Everything up to the matching quote, verbatim. An unterminated quote runs to end of line.
    fn read_quoted(&mut self, quote: char) -> String {
        let mut buffer = String::new();
        while let Some(ch) = self.peek_char() {
            self.pos += 1;
            if ch == quote {
                return buffer;
            }
            buffer.push(ch);
        }
        buffer
    }

    fn read_word(&mut self) -> String {
        let mut buffer = String::new();
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace()
                || Operator::from_char(ch).is_some()
                || self.match_multi_char_operator().is_some()
            {
                break;
            }
            buffer.push(ch);
            self.pos += 1;
        }
        buffer
    }
}

/// Split one line of input into word and operator tokens.
///
/// Operators need no surrounding whitespace: `a>>b` yields `a`, `>>`, `b`.
/// A `'` or `"` opens a literal span that becomes one word with the quotes
/// removed; there is no escaping and no nesting. The end of the returned
/// vector marks the end of the sequence.
pub fn split_into_tokens(line: &str) -> Vec<Token> {
    Lexer::new(line).make_tokens()
}

/// Rebuild command text from tokens by joining them with single spaces.
///
/// Quoting is not restored, so this is only an inverse of
/// [`split_into_tokens`] for lines without quotes.
pub fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
