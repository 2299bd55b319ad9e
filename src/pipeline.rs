//! Two-stage pipelines: `left | right` and `left |& right`.

use crate::command::ExitCode;
use crate::error::ShellError;
use crate::external::exit_code;
use crate::parser::PipeSpec;
use crate::path::{SearchPath, first_match, resolve_command};
use crate::session::Session;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

/// Run both stages connected by one pipe and wait for every stage that started.
///
/// The right-hand stage is resolved through the search path only. If it cannot be
/// found nothing is spawned for it, and the left-hand stage writes into a pipe with
/// no reader. The exit code is the right-hand stage's, or 1 when it never ran.
pub fn run_pipeline(spec: &PipeSpec, session: &Session) -> Result<ExitCode, ShellError> {
    let search_path = session.env.search_path();
    let (reader, writer) = std::io::pipe().map_err(ShellError::Pipe)?;

    let right = match first_match(&spec.right[0], &search_path) {
        Some(path) => {
            match spawn_stage(&path, &spec.right, session, |cmd| {
                cmd.stdin(reader);
            }) {
                Ok(child) => Some(child),
                Err(e) => {
                    println!("{e}");
                    None
                }
            }
        }
        None => {
            drop(reader);
            println!("{}", ShellError::CommandNotFound(spec.right[0].clone()));
            None
        }
    };

    let left = match resolve_left(&spec.left, &search_path) {
        Some(path) => {
            let outputs = if spec.both_streams {
                writer.try_clone().map(|err| (writer, Some(err)))
            } else {
                Ok((writer, None))
            };
            match outputs {
                Ok((out, err)) => {
                    let spawned = spawn_stage(&path, &spec.left, session, |cmd| {
                        cmd.stdout(out);
                        if let Some(err) = err {
                            cmd.stderr(err);
                        }
                    });
                    match spawned {
                        Ok(child) => Some(child),
                        Err(e) => {
                            println!("{e}");
                            None
                        }
                    }
                }
                Err(e) => {
                    println!("{}", ShellError::Pipe(e));
                    None
                }
            }
        }
        None => {
            drop(writer);
            println!("{}", ShellError::CommandNotFound(spec.left[0].clone()));
            None
        }
    };
    // every pipe end now lives in a child or has been dropped

    if let Some(child) = left {
        wait_stage(child, &spec.left[0]);
    }
    Ok(right.map_or(1, |child| wait_stage(child, &spec.right[0])))
}

fn resolve_left(argv: &[String], search_path: &SearchPath) -> Option<PathBuf> {
    resolve_command(&argv[0], search_path).map(|p| p.into_owned())
}

/// Spawn one stage with the session's environment and directory; `attach` wires
/// its end of the pipe.
fn spawn_stage(
    executable: &Path,
    argv: &[String],
    session: &Session,
    attach: impl FnOnce(&mut Command),
) -> Result<Child, ShellError> {
    let mut cmd = Command::new(executable);
    cmd.arg0(&argv[0])
        .args(&argv[1..])
        .env_clear()
        .envs(session.child_env())
        .current_dir(session.current_dir());
    attach(&mut cmd);
    log::info!("Executing [{}]", executable.display());
    // `cmd` is dropped on return, closing the parent's copies of the pipe ends
    cmd.spawn().map_err(|source| ShellError::Spawn {
        name: argv[0].clone(),
        source,
    })
}

fn wait_stage(mut child: Child, name: &str) -> ExitCode {
    match child.wait() {
        Ok(status) => exit_code(status),
        Err(e) => {
            log::error!("waiting for pipeline stage {name} failed: {e}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::env::Environment;
    use std::fs;

    fn session_in(dir: &Path) -> Session {
        let mut env = Environment::empty(16);
        env.set_var("PATH", "/usr/bin:/bin").unwrap();
        env.current_dir = dir.to_path_buf();
        Session::with_env(Config::default_config(), env)
    }

    fn spec(left: &[&str], right: &[&str], both_streams: bool) -> PipeSpec {
        PipeSpec {
            left: left.iter().map(|s| s.to_string()).collect(),
            right: right.iter().map(|s| s.to_string()).collect(),
            both_streams,
        }
    }

    #[test]
    fn stage_two_counts_bytes_from_stage_one() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        let out = dir.path().join("count");
        let script = format!("wc -c > {}", out.display());

        let code = run_pipeline(
            &spec(&["printf", "X\\n"], &["sh", "-c", &script], false),
            &session,
        )
        .unwrap();
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "2");
    }

    #[test]
    fn pipe_both_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        let out = dir.path().join("caught");
        let script = format!("cat > {}", out.display());

        run_pipeline(
            &spec(&["sh", "-c", "echo visible 1>&2"], &["sh", "-c", &script], true),
            &session,
        )
        .unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "visible\n");
    }

    #[test]
    fn plain_pipe_leaves_stderr_alone() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        let out = dir.path().join("caught");
        let script = format!("cat > {}", out.display());

        run_pipeline(
            &spec(&["sh", "-c", "echo hidden 1>&2"], &["sh", "-c", &script], false),
            &session,
        )
        .unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    fn missing_right_stage_does_not_hang() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());

        let code = run_pipeline(
            &spec(&["echo", "hi"], &["no-such-command-xyz"], false),
            &session,
        )
        .unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn missing_left_stage_gives_right_eof() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        let out = dir.path().join("count");
        let script = format!("wc -c > {}", out.display());

        let code = run_pipeline(
            &spec(&["no-such-command-xyz"], &["sh", "-c", &script], false),
            &session,
        )
        .unwrap();
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "0");
    }
}
