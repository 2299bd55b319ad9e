//! A small interactive Unix shell with a login watcher.
//!
//! Lines are split on whitespace and may carry one redirection (`>`, `>>`, `>&`,
//! `>>&`, `<`) or one pipe (`|`, `|&`) between two commands, plus a trailing `&`
//! to run in the background. Built-ins run in-process; anything else is looked up
//! on `PATH` and launched. The `watchuser` built-in starts a thread that reports
//! when watched users log in.
//!
//! The main entry point is [`Interpreter`], which owns a [`Session`] and runs lines
//! or whole interactive sessions. The public modules [`command`] and [`env`] expose
//! traits and types for implementing your own commands and for working with the
//! shell's environment store.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
mod interpreter;
pub mod jobs;
pub mod logging;
pub mod parser;
pub mod path;
mod pipeline;
pub mod redirect;
mod session;
pub mod watch;

pub use config::Config;
pub use error::ShellError;
pub use external::ExternalCommand;
pub use interpreter::Interpreter;
pub use session::Session;
