use crate::command::{ExecutableCommand, ExitCode, Streams};
use crate::error::ShellError;
use crate::path::resolve_command;
use crate::session::Session;
use anyhow::Result;
use std::os::unix::process::CommandExt;
use std::process::ExitStatus;

/// Command that is not a builtin.
pub struct ExternalCommand {
    argv: Vec<String>,
    background: bool,
}

impl ExternalCommand {
    /// `argv[0]` is the command name, the rest its arguments.
    pub fn new(argv: Vec<String>, background: bool) -> Self {
        Self { argv, background }
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, streams: Streams, session: &mut Session) -> Result<ExitCode> {
        let Some((name, args)) = self.argv.split_first() else {
            return Ok(0);
        };
        let search_path = session.env.search_path();
        let executable = resolve_command(name, &search_path)
            .ok_or_else(|| ShellError::CommandNotFound(name.clone()))?
            .into_owned();
        let args = expand_wildcards(args);

        log::info!("Executing [{}]", executable.display());
        let mut child = {
            let mut cmd = std::process::Command::new(&executable);
            cmd.arg0(name)
                .args(&args)
                .env_clear()
                .envs(session.child_env())
                .current_dir(session.current_dir())
                .stdin(streams.stdin.stdio())
                .stdout(streams.stdout.stdio())
                .stderr(streams.stderr.stdio());
            cmd.spawn().map_err(|source| ShellError::Spawn {
                name: name.clone(),
                source,
            })?
        };

        if self.background {
            let number = session.jobs.next_number();
            println!(
                "Background process number [{}] with pid [{}]",
                number,
                child.id()
            );
            return Ok(0);
        }

        match child.wait() {
            Ok(status) => Ok(exit_code(status)),
            Err(e) => {
                log::error!("waiting for {name} failed: {e}");
                println!("non-bg waitpid error");
                Ok(1)
            }
        }
    }
}

/// Expand arguments that contain `*`, `?` or `[` against the filesystem.
///
/// A pattern that matches nothing, or is not a valid pattern, is left out.
pub fn expand_wildcards(args: &[String]) -> Vec<String> {
    let mut expanded = Vec::with_capacity(args.len());
    for arg in args {
        if !arg.contains(['*', '?', '[']) {
            expanded.push(arg.clone());
            continue;
        }
        match glob::glob(arg) {
            Ok(paths) => {
                let before = expanded.len();
                expanded.extend(
                    paths
                        .filter_map(|p| p.ok())
                        .map(|p| p.to_string_lossy().into_owned()),
                );
                if expanded.len() == before {
                    log::debug!("pattern {arg} matched nothing");
                }
            }
            Err(e) => log::warn!("ignoring bad pattern {arg}: {e}"),
        }
    }
    expanded
}

/// Map a finished child's status to a shell exit code.
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}
