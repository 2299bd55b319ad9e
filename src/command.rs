use crate::error::ShellError;
use crate::redirect::OutputTarget;
use crate::session::Session;
use anyhow::Result;
use std::fs::File;
use std::io::{Read, Write};
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Abstraction over a readable input stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Read` and `Into<Stdio>`
/// (e.g. `std::io::Stdin` or a `File` opened for `<`).
pub trait Stdin: Read {
    /// Convert this input into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Read + Into<Stdio>> Stdin for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// Abstraction over a writable output stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Write` and `Into<Stdio>`.
pub trait Stdout: Write {
    /// Convert this output into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// The shell's own standard input; children inherit the descriptor itself.
struct InheritedStdin(std::io::Stdin);

impl Read for InheritedStdin {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl Stdin for InheritedStdin {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// The three standard streams of one command after redirection.
pub struct Streams {
    pub stdin: Box<dyn Stdin>,
    pub stdout: Box<dyn Stdout>,
    pub stderr: Box<dyn Stdout>,
}

impl Streams {
    /// Streams connected to the shell's own terminal.
    pub fn inherit() -> Self {
        Self {
            stdin: Box::new(InheritedStdin(std::io::stdin())),
            stdout: Box::new(std::io::stdout()),
            stderr: Box::new(std::io::stderr()),
        }
    }

    /// Apply an already opened output target and optional input file.
    pub fn redirected(output: OutputTarget, input: Option<File>) -> Result<Self, ShellError> {
        let mut streams = Self::inherit();
        if let Some(file) = input {
            streams.stdin = Box::new(file);
        }
        match output {
            OutputTarget::Inherit => {}
            OutputTarget::Stdout(file) => streams.stdout = Box::new(file),
            OutputTarget::Both(file) => {
                let err = file.try_clone().map_err(|source| ShellError::OpenTarget {
                    path: "<stderr>".into(),
                    source,
                })?;
                streams.stdout = Box::new(file);
                streams.stderr = Box::new(err);
            }
        }
        Ok(streams)
    }
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command.
    fn execute(self: Box<Self>, streams: Streams, session: &mut Session) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
