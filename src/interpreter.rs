use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::config::Config;
use crate::external::ExternalCommand;
use crate::parser::{self, Action, Direction, ParsedLine, Redirect};
use crate::pipeline;
use crate::redirect::{OutputTarget, resolve_input};
use crate::session::Session;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs::File;
use std::io::IsTerminal;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports built-in commands defined in this crate; anything else falls
/// through to [`ExternalCommand`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// An interactive shell with built-ins, redirections, two-stage pipes and
/// background jobs.
///
/// The interpreter owns the [`Session`] and a list of [`CommandFactory`] objects
/// that are queried to create built-ins by name. A name no factory recognizes is
/// launched as an external program.
///
/// Example
/// ```
/// use watch_shell::{Config, Interpreter};
/// let mut sh = Interpreter::with_config(Config::default_config());
/// let code = sh.run("noclobber", &[]).unwrap();
/// assert_eq!(code, 0);
/// assert!(sh.session().noclobber);
/// ```
pub struct Interpreter {
    session: Session,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(session: Session, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { session, commands }
    }

    /// Create an interpreter with every built-in, seeded from the process environment.
    pub fn with_config(config: Config) -> Self {
        Self::new(Session::new(config), builtin_factories())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run a single command invocation by name with arguments, on the shell's own
    /// streams.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        let cmd = self.create(name, args, false);
        cmd.execute(Streams::inherit(), &mut self.session)
    }

    fn create(&self, name: &str, args: &[&str], background: bool) -> Box<dyn ExecutableCommand> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.session, name, args) {
                return cmd;
            }
        }
        let argv = std::iter::once(name)
            .chain(args.iter().copied())
            .map(str::to_owned)
            .collect();
        Box::new(ExternalCommand::new(argv, background))
    }

    /// Parse and run one line of input. Every failure is reported on stdout and
    /// turned into a non-zero exit code; none of them ends the session.
    pub fn execute_line(&mut self, line: &str) -> ExitCode {
        let code = match parser::parse_line(line, self.session.config.parse_limits()) {
            Ok(Some(parsed)) => self.execute_parsed(&parsed).unwrap_or_else(|e| {
                log::debug!("command failed: {e:?}");
                println!("{e}");
                1
            }),
            Ok(None) => 0,
            Err(e) => {
                println!("{e}");
                1
            }
        };
        let reaped = self.session.jobs.reap_if_needed();
        if reaped > 0 {
            log::debug!("reaped {reaped} background children");
        }
        code
    }

    fn execute_parsed(&mut self, parsed: &ParsedLine) -> anyhow::Result<ExitCode> {
        let redirect = match &parsed.action {
            Action::Pipe(spec) => return Ok(pipeline::run_pipeline(spec, &self.session)?),
            Action::Simple(redirect) => redirect.as_ref(),
        };
        let streams = self.open_streams(redirect)?;
        let argv = match &parsed.background_argv {
            Some(argv) if parsed.background => argv,
            _ => &parsed.argv,
        };
        let Some((name, args)) = argv.split_first() else {
            return Ok(0);
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let cmd = self.create(name, &args, parsed.background);
        cmd.execute(streams, &mut self.session)
    }

    fn open_streams(&self, redirect: Option<&Redirect>) -> anyhow::Result<Streams> {
        let output = OutputTarget::resolve(redirect, self.session.noclobber)?;
        let input: Option<File> = match redirect {
            Some(r) if r.direction == Direction::In => Some(resolve_input(&r.target)?),
            _ => None,
        };
        Ok(Streams::redirected(output, input)?)
    }

    /// Read-Eval-Print Loop on top of rustyline.
    ///
    /// Ctrl-C abandons the current line. Ctrl-D on a terminal only reminds the user
    /// to type `exit`; on any other input it ends the loop.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;
        let interactive = std::io::stdin().is_terminal();

        while !self.session.env.should_exit {
            match rl.readline(&self.session.prompt()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    let code = self.execute_line(&line);
                    log::debug!("exit code {code}");
                }
                Err(ReadlineError::Interrupted) => {
                    self.session.jobs.reap_if_needed();
                }
                Err(ReadlineError::Eof) if interactive => {
                    println!();
                    println!("Use \"exit\" to leave shell.");
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    log::error!("reading input failed: {err}");
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Stop the login monitor and reclaim any finished background children.
    pub fn shutdown(&mut self) {
        self.session.shutdown();
        self.session.jobs.reap_now();
    }
}

/// Factories for every built-in the shell knows.
fn builtin_factories() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    vec![
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Printenv>::default()),
        Box::new(Factory::<Setenv>::default()),
        Box::new(Factory::<List>::default()),
        Box::new(Factory::<Which>::default()),
        Box::new(Factory::<Where>::default()),
        Box::new(Factory::<ShellPid>::default()),
        Box::new(Factory::<Kill>::default()),
        Box::new(Factory::<Watchuser>::default()),
        Box::new(Factory::<Noclobber>::default()),
        Box::new(Factory::<Prompt>::default()),
        Box::new(Factory::<Exit>::default()),
    ]
}

impl Default for Interpreter {
    /// Create an interpreter with the default configuration and every built-in.
    fn default() -> Self {
        Self::with_config(Config::default_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use std::fs;
    use std::path::Path;

    fn interpreter_in(dir: &Path) -> Interpreter {
        let mut env = Environment::empty(32);
        env.set_var("PATH", "/usr/bin:/bin").unwrap();
        env.current_dir = dir.to_path_buf();
        let session = Session::with_env(Config::default_config(), env);
        Interpreter::new(session, builtin_factories())
    }

    #[test]
    fn builtin_output_is_redirected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        let out = dir.path().join("env.txt");

        sh.execute_line("setenv GREETING hello");
        let code = sh.execute_line(&format!("printenv GREETING > {}", out.display()));
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");

        sh.execute_line(&format!("printenv GREETING >> {}", out.display()));
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\nhello\n");
    }

    #[test]
    fn builtin_errors_follow_both_streams_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        let out = dir.path().join("err.txt");

        let code = sh.execute_line(&format!("which >& {}", out.display()));
        assert_eq!(code, 1);
        assert_eq!(fs::read_to_string(&out).unwrap(), "which: Too few arguments.\n");
    }

    #[test]
    fn noclobber_protects_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        let out = dir.path().join("keep.txt");
        fs::write(&out, "precious\n").unwrap();

        sh.run("noclobber", &[]).unwrap();
        assert_eq!(sh.execute_line(&format!("pwd > {}", out.display())), 1);
        assert_eq!(fs::read_to_string(&out).unwrap(), "precious\n");

        let missing = dir.path().join("missing.txt");
        assert_eq!(sh.execute_line(&format!("pwd >> {}", missing.display())), 1);
        assert!(!missing.exists());

        sh.run("noclobber", &[]).unwrap();
        assert_eq!(sh.execute_line(&format!("pwd > {}", out.display())), 0);
        assert_ne!(fs::read_to_string(&out).unwrap(), "precious\n");
    }

    #[test]
    fn external_reads_redirected_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        let input = dir.path().join("in.txt");
        let out = dir.path().join("out.txt");
        fs::write(&input, "a\nb\nc\n").unwrap();

        let script = format!("wc -l > {}", out.display());
        fs::write(dir.path().join("count.sh"), script).unwrap();
        let code = sh.execute_line(&format!(
            "sh {} < {}",
            dir.path().join("count.sh").display(),
            input.display()
        ));
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "3");
    }

    #[test]
    fn missing_input_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        let code = sh.execute_line(&format!("cat < {}", dir.path().join("nope").display()));
        assert_eq!(code, 1);
    }

    #[test]
    fn parse_errors_and_unknown_commands_do_not_end_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        assert_eq!(sh.execute_line("ls >"), 1);
        assert_eq!(sh.execute_line("| wc"), 1);
        assert_eq!(sh.execute_line("no-such-command-xyz"), 1);
        assert_eq!(sh.execute_line("   "), 0);
        assert!(!sh.session().env.should_exit);
    }

    #[test]
    fn pipeline_runs_through_execute_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        let out = dir.path().join("count");
        fs::write(
            dir.path().join("count.sh"),
            format!("wc -c > {}", out.display()),
        )
        .unwrap();

        let code = sh.execute_line(&format!(
            "printf abc | sh {}",
            dir.path().join("count.sh").display()
        ));
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "3");
    }

    #[test]
    fn background_launch_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        let started = std::time::Instant::now();
        assert_eq!(sh.execute_line("sleep 2 &"), 0);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
        assert_eq!(sh.session().jobs.outstanding(), 1);
    }

    #[test]
    fn exit_stops_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        sh.execute_line("watchuser nobody-in-particular");
        assert!(sh.session().monitor.is_running());
        sh.execute_line("exit");
        assert!(sh.session().env.should_exit);
        assert!(!sh.session().monitor.is_running());
    }

    #[test]
    fn unknown_names_become_external_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        assert_eq!(sh.run("true", &[]).unwrap(), 0);
        assert_eq!(sh.run("false", &[]).unwrap(), 1);
    }
}
