use crate::config::Config;
use crate::env::Environment;
use crate::jobs::Jobs;
use crate::watch::{WatchList, WatchMonitor};
use std::path::Path;

/// Everything a command may read or change during one shell session.
///
/// Built once at startup and handed to every command by `&mut`, instead of living
/// in globals. Only the watch list is shared with another thread.
pub struct Session {
    pub env: Environment,
    pub config: Config,
    /// Clobber protection for `>`-style redirections.
    pub noclobber: bool,
    /// Text shown before the working directory in the prompt.
    pub prompt_prefix: Option<String>,
    pub watch_list: WatchList,
    pub monitor: WatchMonitor,
    pub jobs: Jobs,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let env = Environment::from_process(config.limits.max_env_vars);
        Self::with_env(config, env)
    }

    pub fn with_env(config: Config, env: Environment) -> Self {
        let watch_list = WatchList::default();
        let monitor = WatchMonitor::new(watch_list.clone(), config.watch_interval());
        let prompt_prefix = Some(config.shell.prompt.clone()).filter(|p| !p.is_empty());
        Self {
            env,
            noclobber: config.shell.noclobber,
            prompt_prefix,
            watch_list,
            monitor,
            jobs: Jobs::default(),
            config,
        }
    }

    /// The prompt shown before reading a line: `<prefix> [<cwd>]> `.
    pub fn prompt(&self) -> String {
        let cwd = self.env.current_dir.display();
        match &self.prompt_prefix {
            Some(prefix) => format!("{prefix} [{cwd}]> "),
            None => format!(" [{cwd}]> "),
        }
    }

    /// Environment handed to launched programs.
    pub fn child_env(&self) -> Vec<(String, String)> {
        if self.config.shell.inherit_environment {
            self.env
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect()
        } else {
            Vec::new()
        }
    }

    pub fn current_dir(&self) -> &Path {
        &self.env.current_dir
    }

    /// Stop the monitor thread, if it was ever started.
    pub fn shutdown(&mut self) {
        self.monitor.stop();
    }
}
