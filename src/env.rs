use crate::error::ShellError;
use crate::path::SearchPath;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Capacity used when no explicit bound is configured.
pub const DEFAULT_MAX_VARS: usize = 128;

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// Variables keep their insertion order so that `printenv` lists them the same way
/// every time, while lookups go through a name index. Writing an existing name
/// replaces its value in place; writing a new name appends it at the end.
///
/// The environment also tracks the working directory for launched commands and
/// the `should_exit` flag that the REPL loop checks.
#[derive(Debug, Clone)]
pub struct Environment {
    vars: Vec<(String, String)>,
    index: HashMap<String, usize>,
    capacity: usize,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, indicates that an interactive loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Create an empty environment holding at most `capacity` variables.
    pub fn empty(capacity: usize) -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: Vec::new(),
            index: HashMap::new(),
            capacity,
            current_dir,
            should_exit: false,
        }
    }

    /// Capture the current process state into a new `Environment` instance.
    pub fn from_process(capacity: usize) -> Self {
        Self::from_vars(capacity, stdenv::vars())
    }

    /// Seed an environment from inherited variables.
    ///
    /// Every inherited variable is kept: the store grows to hold them all when
    /// there are more than `capacity`, and the bound then applies to names added
    /// later.
    pub fn from_vars(capacity: usize, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let vars: Vec<_> = vars.into_iter().collect();
        if vars.len() > capacity {
            log::debug!(
                "inherited {} variables, raising the limit from {capacity}",
                vars.len()
            );
        }
        let mut env = Self::empty(capacity.max(vars.len()));
        for (k, v) in vars {
            if let Some(&i) = env.index.get(&k) {
                env.vars[i].1 = v;
            } else {
                env.index.insert(k.clone(), env.vars.len());
                env.vars.push((k, v));
            }
        }
        env
    }

    /// Get the value of a variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&i| self.vars[i].1.as_str())
    }

    /// Replace the value of `key` if present, otherwise append a new entry.
    pub fn set_var(&mut self, key: &str, val: impl Into<String>) -> Result<(), ShellError> {
        if let Some(&i) = self.index.get(key) {
            self.vars[i].1 = val.into();
            return Ok(());
        }
        if self.vars.len() >= self.capacity {
            return Err(ShellError::EnvFull(self.capacity));
        }
        self.index.insert(key.to_owned(), self.vars.len());
        self.vars.push((key.to_owned(), val.into()));
        Ok(())
    }

    /// Variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Build a fresh search path from the current `PATH` value.
    ///
    /// Nothing is cached, so a `setenv PATH ...` is visible to the very next lookup.
    pub fn search_path(&self) -> SearchPath {
        self.get_var("PATH")
            .map(SearchPath::parse)
            .unwrap_or_default()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::from_process(DEFAULT_MAX_VARS)
    }
}
