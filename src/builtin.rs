use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::error::ShellError;
use crate::interpreter::Factory;
use crate::path::{all_matches, first_match};
use crate::session::Session;
use crate::watch::Utmpx;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use regex::Regex;
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "pwd" or "cd".
    fn name() -> &'static str;

    /// Executes the command using provided IO streams and session.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, mut streams: Streams, session: &mut Session) -> Result<ExitCode> {
        log::info!("Executing built-in [{}]", T::name());
        let result = T::execute(*self, &mut streams.stdin, &mut streams.stdout, session);
        streams.stdout.flush()?;
        match result {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(streams.stderr, "{e}")?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, mut streams: Streams, _session: &mut Session) -> Result<ExitCode> {
        writeln!(streams.stderr, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        // builtins take no flags, so `-` and `-9` must reach them as positionals
        let mut positional = Vec::with_capacity(args.len() + 1);
        positional.push("--");
        positional.extend_from_slice(args);
        Some(match T::from_args(&[name], &positional) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", session.current_dir().display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// Without a target, changes to $HOME; `-` switches back to the previous directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to, or `-`.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let (target, announce) = match self.args.as_slice() {
            [] => match session.env.get_var("HOME") {
                Some(home) if !home.trim().is_empty() => (home.to_owned(), false),
                _ => return Err(anyhow!("cd: Bad Directory.")),
            },
            [dash] if dash == "-" => match session.env.get_var("OLDPWD") {
                Some(old) => (old.to_owned(), true),
                None => return Err(anyhow!("cd: OLDPWD not set")),
            },
            [dir] => (dir.clone(), false),
            _ => return Err(ShellError::TooManyArguments("cd").into()),
        };

        let canonical = fs::canonicalize(session.current_dir().join(&target))
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| ShellError::BadDirectory(target.clone()))?;
        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;

        let pwd = canonical.to_string_lossy().into_owned();
        let old = std::mem::replace(&mut session.env.current_dir, canonical);
        session.env.set_var("OLDPWD", old.to_string_lossy())?;
        session.env.set_var("PWD", pwd.as_str())?;
        if announce {
            writeln!(stdout, "{pwd}")?;
        }
        Ok(0)
    }
}

fn print_all(stdout: &mut dyn Write, session: &Session) -> Result<()> {
    for (name, value) in session.env.iter() {
        writeln!(stdout, "{name}={value}")?;
    }
    Ok(())
}

#[derive(FromArgs)]
/// Print the whole environment, or the value of one variable.
pub struct Printenv {
    #[argh(positional)]
    /// variable to print.
    pub args: Vec<String>,
}

impl BuiltinCommand for Printenv {
    fn name() -> &'static str {
        "printenv"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        match self.args.as_slice() {
            [] => print_all(stdout, session)?,
            [name] => writeln!(stdout, "{}", session.env.get_var(name).unwrap_or_default())?,
            _ => return Err(ShellError::TooManyArguments("printenv").into()),
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Set an environment variable; with no arguments, print the environment.
pub struct Setenv {
    #[argh(positional)]
    /// variable name followed by an optional value.
    pub args: Vec<String>,
}

impl BuiltinCommand for Setenv {
    fn name() -> &'static str {
        "setenv"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        match self.args.as_slice() {
            [] => print_all(stdout, session)?,
            [name] => session.env.set_var(name, "")?,
            [name, value] => session.env.set_var(name, value.as_str())?,
            _ => return Err(ShellError::TooManyArguments("setenv").into()),
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the entries of the current directory or of each given directory.
pub struct List {
    #[argh(positional)]
    /// directories to list.
    pub dirs: Vec<String>,
}

fn write_entries(stdout: &mut dyn Write, dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("list: cannot read {}: {e}", dir.display());
            return Ok(());
        }
    };
    let mut names: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name())
        .collect();
    names.sort();
    for name in names {
        writeln!(stdout, "{}", name.to_string_lossy())?;
    }
    Ok(())
}

impl BuiltinCommand for List {
    fn name() -> &'static str {
        "list"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        if self.dirs.is_empty() {
            write_entries(stdout, session.current_dir())?;
            return Ok(0);
        }
        for dir in &self.dirs {
            writeln!(stdout, "{dir}:")?;
            write_entries(stdout, &session.current_dir().join(dir))?;
            writeln!(stdout)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the first executable on PATH for each command.
pub struct Which {
    #[argh(positional)]
    /// commands to look up.
    pub commands: Vec<String>,
}

impl BuiltinCommand for Which {
    fn name() -> &'static str {
        "which"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        if self.commands.is_empty() {
            return Err(ShellError::TooFewArguments("which").into());
        }
        let search_path = session.env.search_path();
        let mut code = 0;
        for command in &self.commands {
            match first_match(command, &search_path) {
                Some(path) => writeln!(stdout, "{}", path.display())?,
                None => {
                    writeln!(stdout, "{}", ShellError::CommandNotFound(command.clone()))?;
                    code = 1;
                }
            }
        }
        Ok(code)
    }
}

#[derive(FromArgs)]
/// Print every executable on PATH for each command.
pub struct Where {
    #[argh(positional)]
    /// commands to look up.
    pub commands: Vec<String>,
}

impl BuiltinCommand for Where {
    fn name() -> &'static str {
        "where"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        if self.commands.is_empty() {
            return Err(ShellError::TooFewArguments("where").into());
        }
        let search_path = session.env.search_path();
        let mut code = 0;
        for command in &self.commands {
            let matches = all_matches(command, &search_path);
            if matches.is_empty() {
                writeln!(stdout, "{}", ShellError::CommandNotFound(command.clone()))?;
                code = 1;
            }
            for path in matches {
                writeln!(stdout, "{}", path.display())?;
            }
        }
        Ok(code)
    }
}

#[derive(FromArgs)]
/// Print the process id of the shell.
pub struct ShellPid {}

impl BuiltinCommand for ShellPid {
    fn name() -> &'static str {
        "pid"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<ExitCode> {
        writeln!(stdout, "PID of the shell: {}", std::process::id())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Send a signal to a process; SIGTERM unless `-<signal>` comes first.
pub struct Kill {
    #[argh(positional)]
    /// optional `-<signal>` (number or name) followed by the pid.
    pub args: Vec<String>,
}

/// `-9`, `-KILL` or `-SIGKILL`.
const SIGNAL_SPEC: &str = r"^(?i)-(?:(\d+)|(?:SIG)?([A-Z]+[0-9]*))$";

/// Parse a `-<signal>` argument. Signal 0 is `None`: only check that the pid exists.
fn parse_signal(spec: &str) -> Result<Option<Signal>> {
    let re = Regex::new(SIGNAL_SPEC)?;
    let caps = re
        .captures(spec)
        .ok_or_else(|| anyhow!("kill: {spec}: invalid signal specification"))?;
    if let Some(number) = caps.get(1) {
        let number: i32 = number.as_str().parse()?;
        if number == 0 {
            return Ok(None);
        }
        return Signal::try_from(number)
            .map(Some)
            .map_err(|_| anyhow!("kill: {spec}: invalid signal specification"));
    }
    let name = format!("SIG{}", caps[2].to_ascii_uppercase());
    name.parse::<Signal>()
        .map(Some)
        .map_err(|_| anyhow!("kill: {spec}: invalid signal specification"))
}

fn parse_pid(pid: &str) -> Result<Pid> {
    pid.parse::<i32>()
        .map(Pid::from_raw)
        .map_err(|_| anyhow!("kill: {pid}: arguments must be process ids"))
}

impl BuiltinCommand for Kill {
    fn name() -> &'static str {
        "kill"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<ExitCode> {
        let (sig, pid) = match self.args.as_slice() {
            [] => return Err(ShellError::TooFewArguments("kill").into()),
            [spec] if Regex::new(SIGNAL_SPEC)?.is_match(spec) => {
                return Err(anyhow!("kill: {spec}: missing process id"));
            }
            [pid] => (Some(Signal::SIGTERM), parse_pid(pid)?),
            [spec, pid] => (parse_signal(spec)?, parse_pid(pid)?),
            _ => return Err(ShellError::TooManyArguments("kill").into()),
        };
        log::debug!("kill {pid} with {sig:?}");
        signal::kill(pid, sig).with_context(|| format!("kill: ({pid})"))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Report logins of a user; `<user> off` stops watching them.
pub struct Watchuser {
    #[argh(positional)]
    /// user name, optionally followed by `off`.
    pub args: Vec<String>,
}

impl BuiltinCommand for Watchuser {
    fn name() -> &'static str {
        "watchuser"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        // the monitor is started by the first invocation, whatever its arguments
        if !session.monitor.is_running() {
            session
                .monitor
                .start(Utmpx, std::io::stdout())
                .context("watchuser: could not start the monitor thread")?;
        }
        match self.args.as_slice() {
            [] => Err(ShellError::TooFewArguments("watchuser").into()),
            [user] => {
                session.watch_list.add(user)?;
                Ok(0)
            }
            [user, off] if off == "off" => {
                let removed = session.watch_list.remove(user)?;
                log::debug!("watchuser: removed {removed} entries for {user}");
                Ok(0)
            }
            _ => Err(ShellError::TooManyArguments("watchuser").into()),
        }
    }
}

#[derive(FromArgs)]
/// Toggle clobber protection for output redirections and print the new value.
pub struct Noclobber {}

impl BuiltinCommand for Noclobber {
    fn name() -> &'static str {
        "noclobber"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        session.noclobber = !session.noclobber;
        writeln!(stdout, "{}", u8::from(session.noclobber))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Set the text shown before the directory in the prompt; asks for it when omitted.
pub struct Prompt {
    #[argh(positional)]
    /// new prompt prefix.
    pub args: Vec<String>,
}

/// Read one line without buffering past its end, so nothing is stolen from the
/// next prompt.
fn read_line(stdin: &mut dyn Read) -> Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while stdin.read(&mut byte)? == 1 && byte[0] != b'\n' {
        line.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

impl BuiltinCommand for Prompt {
    fn name() -> &'static str {
        "prompt"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let prefix = match self.args.as_slice() {
            [] => {
                write!(stdout, "input prompt prefix: ")?;
                stdout.flush()?;
                read_line(stdin)?
            }
            [text] => text.clone(),
            _ => return Err(ShellError::TooManyArguments("prompt").into()),
        };
        session.prompt_prefix = Some(prefix).filter(|p| !p.is_empty());
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Stop the login monitor and leave the shell.
pub struct Exit {
    #[argh(positional)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        session.shutdown();
        session.env.should_exit = true;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::env::Environment;
    use std::os::unix::fs::PermissionsExt;

    fn session() -> Session {
        let mut env = Environment::empty(32);
        env.current_dir = env::temp_dir();
        Session::with_env(Config::default_config(), env)
    }

    fn args(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn run<T: BuiltinCommand>(cmd: T, session: &mut Session) -> (Result<ExitCode>, String) {
        let mut out = Vec::new();
        let code = cmd.execute(&mut std::io::empty(), &mut out, session);
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn factory_matches_only_its_name() {
        let s = session();
        let factory = Factory::<Pwd>::default();
        assert!(factory.try_create(&s, "pwd", &[]).is_some());
        assert!(factory.try_create(&s, "cwd", &[]).is_none());
    }

    #[test]
    fn factory_passes_dashes_as_positionals() {
        let parsed = Kill::from_args(&["kill"], &["--", "-9", "123"]).unwrap();
        assert_eq!(parsed.args, args(&["-9", "123"]));
        let parsed = Cd::from_args(&["cd"], &["--", "-"]).unwrap();
        assert_eq!(parsed.args, args(&["-"]));
    }

    #[test]
    fn pwd_prints_session_dir() {
        let mut s = session();
        s.env.current_dir = "/some/where".into();
        let (code, out) = run(Pwd {}, &mut s);
        assert_eq!(code.unwrap(), 0);
        assert_eq!(out, "/some/where\n");
    }

    #[test]
    fn cd_rejects_extra_arguments_and_files() {
        let mut s = session();
        let (code, _) = run(Cd { args: args(&["a", "b"]) }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), "cd: Too many arguments.");

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "").unwrap();
        let target = file.display().to_string();
        let (code, _) = run(Cd { args: vec![target.clone()] }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), format!("{target}: Not a directory"));
    }

    #[test]
    fn cd_updates_pwd_and_dash_toggles() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let first_path = fs::canonicalize(first.path()).unwrap();
        let second_path = fs::canonicalize(second.path()).unwrap();
        let mut s = session();

        let to = |p: &Path| Cd { args: vec![p.display().to_string()] };
        run(to(&first_path), &mut s).0.unwrap();
        run(to(&second_path), &mut s).0.unwrap();
        assert_eq!(s.current_dir(), second_path);
        assert_eq!(s.env.get_var("PWD"), Some(second_path.to_str().unwrap()));
        assert_eq!(s.env.get_var("OLDPWD"), Some(first_path.to_str().unwrap()));

        let (code, out) = run(Cd { args: args(&["-"]) }, &mut s);
        assert_eq!(code.unwrap(), 0);
        assert_eq!(out.trim(), first_path.to_str().unwrap());
        assert_eq!(s.current_dir(), first_path);

        run(Cd { args: args(&["-"]) }, &mut s).0.unwrap();
        assert_eq!(s.current_dir(), second_path);
    }

    #[test]
    fn cd_without_args_goes_home() {
        let home = tempfile::tempdir().unwrap();
        let home_path = fs::canonicalize(home.path()).unwrap();
        let mut s = session();
        s.env.set_var("HOME", home_path.to_string_lossy()).unwrap();
        run(Cd { args: vec![] }, &mut s).0.unwrap();
        assert_eq!(s.current_dir(), home_path);
    }

    #[test]
    fn setenv_and_printenv() {
        let mut s = session();
        run(Setenv { args: args(&["GREETING", "hi"]) }, &mut s).0.unwrap();
        run(Setenv { args: args(&["EMPTY"]) }, &mut s).0.unwrap();

        let (_, out) = run(Printenv { args: args(&["GREETING"]) }, &mut s);
        assert_eq!(out, "hi\n");
        let (_, out) = run(Printenv { args: args(&["MISSING"]) }, &mut s);
        assert_eq!(out, "\n");
        let (_, out) = run(Printenv { args: vec![] }, &mut s);
        assert_eq!(out, "GREETING=hi\nEMPTY=\n");

        let (code, _) = run(Printenv { args: args(&["A", "B"]) }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), "printenv: Too many arguments.");
        let (code, _) = run(Setenv { args: args(&["A", "B", "C"]) }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), "setenv: Too many arguments.");
    }

    #[test]
    fn list_prints_headers_for_named_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b"), "").unwrap();
        fs::write(dir.path().join("a"), "").unwrap();
        let mut s = session();
        s.env.current_dir = dir.path().to_path_buf();

        let (_, out) = run(List { dirs: vec![] }, &mut s);
        assert_eq!(out, "a\nb\n");

        let name = dir.path().display().to_string();
        let (_, out) = run(List { dirs: vec![name.clone()] }, &mut s);
        assert_eq!(out, format!("{name}:\na\nb\n\n"));
    }

    #[test]
    fn which_and_where_search_path() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        for dir in [first.path(), second.path()] {
            let tool = dir.join("tool");
            fs::write(&tool, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let mut s = session();
        let path = format!("{}:{}", first.path().display(), second.path().display());
        s.env.set_var("PATH", path).unwrap();

        let (code, out) = run(Which { commands: args(&["tool"]) }, &mut s);
        assert_eq!(code.unwrap(), 0);
        assert_eq!(out, format!("{}\n", first.path().join("tool").display()));

        let (_, out) = run(Where { commands: args(&["tool", "nope"]) }, &mut s);
        assert_eq!(
            out,
            format!(
                "{}\n{}\nnope: Command not found\n",
                first.path().join("tool").display(),
                second.path().join("tool").display()
            )
        );

        let (code, _) = run(Which { commands: vec![] }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), "which: Too few arguments.");
        let (code, _) = run(Where { commands: vec![] }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), "where: Too few arguments.");
    }

    #[test]
    fn pid_reports_own_process() {
        let mut s = session();
        let (_, out) = run(ShellPid {}, &mut s);
        assert_eq!(out, format!("PID of the shell: {}\n", std::process::id()));
    }

    #[test]
    fn kill_argument_handling() {
        let mut s = session();
        let (code, _) = run(Kill { args: vec![] }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), "kill: Too few arguments.");
        assert!(run(Kill { args: args(&["abc"]) }, &mut s).0.is_err());
        assert!(run(Kill { args: args(&["-NOPE", "1"]) }, &mut s).0.is_err());
    }

    #[test]
    fn lone_signal_is_not_a_pid() {
        let mut s = session();
        for spec in ["-1", "-9", "-KILL", "-sigterm"] {
            let (code, _) = run(Kill { args: args(&[spec]) }, &mut s);
            assert_eq!(
                code.unwrap_err().to_string(),
                format!("kill: {spec}: missing process id")
            );
        }
    }

    #[test]
    fn signal_specs() {
        assert_eq!(parse_signal("-9").unwrap(), Some(Signal::SIGKILL));
        assert_eq!(parse_signal("-KILL").unwrap(), Some(Signal::SIGKILL));
        assert_eq!(parse_signal("-sigterm").unwrap(), Some(Signal::SIGTERM));
        assert_eq!(parse_signal("-0").unwrap(), None);
        assert!(parse_signal("9").is_err());
        assert!(parse_signal("-999").is_err());
    }

    #[test]
    fn kill_terminates_a_child() {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let mut s = session();
        let pid = child.id().to_string();
        run(Kill { args: vec!["-9".into(), pid] }, &mut s).0.unwrap();
        let status = child.wait().unwrap();
        assert_eq!(crate::external::exit_code(status), 128 + 9);
    }

    #[test]
    fn watchuser_add_duplicate_and_remove() {
        let mut s = session();
        run(Watchuser { args: args(&["bob"]) }, &mut s).0.unwrap();
        assert!(s.monitor.is_running());
        let (code, _) = run(Watchuser { args: args(&["bob"]) }, &mut s);
        assert_eq!(
            code.unwrap_err().to_string(),
            "User bob is already present in the watchlist..."
        );
        assert_eq!(s.watch_list.snapshot(), args(&["bob"]));

        run(Watchuser { args: args(&["bob", "off"]) }, &mut s).0.unwrap();
        assert!(s.watch_list.snapshot().is_empty());
        let (code, _) = run(Watchuser { args: args(&["bob", "off"]) }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), "Watchuser List is empty...");

        let (code, _) = run(Watchuser { args: args(&["bob", "on"]) }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), "watchuser: Too many arguments.");
        let (code, _) = run(Watchuser { args: vec![] }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), "watchuser: Too few arguments.");
        s.shutdown();
        assert!(!s.monitor.is_running());
    }

    #[test]
    fn noclobber_toggles() {
        let mut s = session();
        let (_, out) = run(Noclobber {}, &mut s);
        assert_eq!(out, "1\n");
        assert!(s.noclobber);
        let (_, out) = run(Noclobber {}, &mut s);
        assert_eq!(out, "0\n");
    }

    #[test]
    fn prompt_from_argument_or_input() {
        let mut s = session();
        run(Prompt { args: args(&["dev"]) }, &mut s).0.unwrap();
        assert_eq!(s.prompt_prefix.as_deref(), Some("dev"));

        let mut input: &[u8] = b"typed\nleft over\n";
        let mut out = Vec::new();
        Prompt { args: vec![] }.execute(&mut input, &mut out, &mut s).unwrap();
        assert_eq!(out, b"input prompt prefix: ");
        assert_eq!(s.prompt_prefix.as_deref(), Some("typed"));
        assert_eq!(input, b"left over\n");

        let (code, _) = run(Prompt { args: args(&["a", "b"]) }, &mut s);
        assert_eq!(code.unwrap_err().to_string(), "prompt: Too many arguments.");
    }

    #[test]
    fn exit_marks_the_session() {
        let mut s = session();
        run(Exit { _args: vec![] }, &mut s).0.unwrap();
        assert!(s.env.should_exit);
    }
}
