use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures the shell reports to the user.
///
/// None of these end the session. The `Display` text is what gets printed, so the
/// wording follows the classic csh-style messages.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}: Command not found")]
    CommandNotFound(String),

    #[error("{}: File exists.", .0.display())]
    FileExists(PathBuf),

    #[error("{}: No such file or directory.", .0.display())]
    NoSuchFile(PathBuf),

    #[error("{}: {source}", path.display())]
    OpenTarget {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{name}: could not start process: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to create pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("{0}: Too few arguments.")]
    TooFewArguments(&'static str),

    #[error("{0}: Too many arguments.")]
    TooManyArguments(&'static str),

    #[error("User {0} is already present in the watchlist...")]
    WatchListDuplicate(String),

    #[error("Watchuser List is empty...")]
    WatchListEmpty,

    #[error("{0}")]
    Parse(#[from] crate::parser::ParseError),

    #[error("environment is full ({0} variables)")]
    EnvFull(usize),

    #[error("{0}: Not a directory")]
    BadDirectory(String),
}
