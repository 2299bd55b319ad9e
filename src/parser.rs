//! Line parsing and redirection classification.
//!
//! The grammar is intentionally tiny: a line is split on whitespace, and at most one
//! operator is honoured per line. Operators are searched as substrings of the raw line
//! in a fixed priority order, so `ls >>& out` is an append-both redirection even though
//! it also contains `>`, `>>` and `>&`.

use std::fmt;
use std::path::PathBuf;

/// Operators in the order they are looked for. First hit wins.
pub const OPERATORS: [Operator; 7] = [
    Operator::AppendBoth,
    Operator::Append,
    Operator::OutputBoth,
    Operator::Output,
    Operator::Input,
    Operator::PipeBoth,
    Operator::Pipe,
];

/// The single operator a line was classified by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `>>&`: append stdout and stderr.
    AppendBoth,
    /// `>>`: append stdout.
    Append,
    /// `>&`: write stdout and stderr.
    OutputBoth,
    /// `>`: write stdout.
    Output,
    /// `<`: read stdin from a file.
    Input,
    /// `|&`: pipe stdout and stderr.
    PipeBoth,
    /// `|`: pipe stdout.
    Pipe,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::AppendBoth => ">>&",
            Operator::Append => ">>",
            Operator::OutputBoth => ">&",
            Operator::Output => ">",
            Operator::Input => "<",
            Operator::PipeBoth => "|&",
            Operator::Pipe => "|",
        }
    }

    pub fn is_pipe(self) -> bool {
        matches!(self, Operator::Pipe | Operator::PipeBoth)
    }

    /// Classify a raw line. Returns the highest priority operator it contains.
    pub fn classify(line: &str) -> Option<Operator> {
        OPERATORS.into_iter().find(|op| line.contains(op.as_str()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a file redirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Standard output (and maybe standard error) goes to the target.
    Out,
    /// Standard input is read from the target.
    In,
}

/// A redirection attached to a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub direction: Direction,
    /// Append instead of truncate. Only meaningful for [`Direction::Out`].
    pub append: bool,
    /// Redirect standard error together with standard output.
    pub both_streams: bool,
    /// The file named after the operator.
    pub target: PathBuf,
}

impl Redirect {
    fn from_operator(op: Operator, target: &str) -> Self {
        let (direction, append, both_streams) = match op {
            Operator::AppendBoth => (Direction::Out, true, true),
            Operator::Append => (Direction::Out, true, false),
            Operator::OutputBoth => (Direction::Out, false, true),
            Operator::Output => (Direction::Out, false, false),
            Operator::Input => (Direction::In, false, false),
            Operator::Pipe | Operator::PipeBoth => {
                unreachable!("pipes are not file redirections")
            }
        };
        Self {
            direction,
            append,
            both_streams,
            target: PathBuf::from(target),
        }
    }
}

/// Two commands joined by a pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeSpec {
    /// Left-hand command, writing into the pipe.
    pub left: Vec<String>,
    /// Right-hand command, reading from the pipe.
    pub right: Vec<String>,
    /// `|&`: stage 1's standard error is piped too.
    pub both_streams: bool,
}

/// What to do with the parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A single command, possibly with one redirection.
    Simple(Option<Redirect>),
    /// A two-stage pipeline.
    Pipe(PipeSpec),
}

/// The result of parsing one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Command name and arguments with operator tokens and the background marker removed.
    pub argv: Vec<String>,
    /// A trailing `&` was present.
    pub background: bool,
    /// Copy of the arguments that preceded `&`, used when launching in the background.
    pub background_argv: Option<Vec<String>>,
    pub action: Action,
}

impl ParsedLine {
    pub fn name(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match &self.action {
            Action::Simple(r) => r.as_ref(),
            Action::Pipe(_) => None,
        }
    }
}

/// Errors that can occur while turning a line into a [`ParsedLine`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A redirection operator without a file name, or glued to a word.
    #[error("Missing name for redirect.")]
    MissingRedirectTarget,
    /// A pipe with an empty side, or glued to a word.
    #[error("Invalid null command.")]
    NullCommand,
}

/// Limits applied while parsing.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum characters per line, including the terminator slot.
    pub max_line: usize,
    /// Maximum number of whitespace separated tokens. Extra tokens are dropped.
    pub max_args: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line: 128,
            max_args: 16,
        }
    }
}

/// Truncate a line to what fits into the input buffer.
pub fn clamp_line(line: &str, limits: Limits) -> &str {
    let max_chars = limits.max_line.saturating_sub(1);
    match line.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            log::warn!("input line longer than {max_chars} characters, truncating");
            &line[..cut]
        }
        None => line,
    }
}

/// Split a line on whitespace, keeping at most `max_args` tokens.
pub fn tokenize(line: &str, max_args: usize) -> Vec<String> {
    let mut words = line.split_whitespace();
    let tokens: Vec<String> = words.by_ref().take(max_args).map(str::to_owned).collect();
    let dropped = words.count();
    if dropped > 0 {
        log::debug!("dropped {dropped} tokens beyond the limit of {max_args}");
    }
    tokens
}

/// Parse one input line.
///
/// Returns `Ok(None)` for blank lines.
pub fn parse_line(line: &str, limits: Limits) -> Result<Option<ParsedLine>, ParseError> {
    let line = clamp_line(line.trim_end_matches(['\n', '\r']), limits);
    let operator = Operator::classify(line);
    let mut tokens = tokenize(line, limits.max_args);
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut background = false;
    let mut background_argv = None;
    if tokens.last().map(String::as_str) == Some("&") {
        tokens.pop();
        background = true;
    }
    if tokens.is_empty() {
        return Err(ParseError::NullCommand);
    }

    let Some(op) = operator else {
        if background {
            background_argv = Some(tokens.clone());
        }
        return Ok(Some(ParsedLine {
            argv: tokens,
            background,
            background_argv,
            action: Action::Simple(None),
        }));
    };

    let position = tokens.iter().position(|t| t == op.as_str());
    if op.is_pipe() {
        let pos = position.ok_or(ParseError::NullCommand)?;
        let left = tokens[..pos].to_vec();
        let right = tokens[pos + 1..].to_vec();
        if left.is_empty() || right.is_empty() {
            return Err(ParseError::NullCommand);
        }
        if background {
            background_argv = Some(tokens.clone());
        }
        return Ok(Some(ParsedLine {
            argv: left.clone(),
            background,
            background_argv,
            action: Action::Pipe(PipeSpec {
                left,
                right,
                both_streams: op == Operator::PipeBoth,
            }),
        }));
    }

    let pos = position.ok_or(ParseError::MissingRedirectTarget)?;
    let target = tokens
        .get(pos + 1)
        .ok_or(ParseError::MissingRedirectTarget)?
        .clone();
    let mut argv = tokens[..pos].to_vec();
    argv.extend(tokens[pos + 2..].iter().cloned());
    if argv.is_empty() {
        return Err(ParseError::NullCommand);
    }
    if background {
        background_argv = Some(argv.clone());
    }
    Ok(Some(ParsedLine {
        argv,
        background,
        background_argv,
        action: Action::Simple(Some(Redirect::from_operator(op, &target))),
    }))
}
