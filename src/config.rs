use crate::parser::Limits;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub noclobber: bool,
    /// When false, launched programs get an empty environment.
    #[serde(default = "default_true")]
    pub inherit_environment: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LimitsConfig {
    pub max_line: usize,
    pub max_args: usize,
    pub max_env_vars: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            noclobber: false,
            inherit_environment: true,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_line: 128,
            max_args: 16,
            max_env_vars: crate::env::DEFAULT_MAX_VARS,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_secs: 20 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    shell: ShellOverlay,
    #[serde(default)]
    limits: LimitsOverlay,
    #[serde(default)]
    watch: WatchOverlay,
    #[serde(default)]
    log: LogOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct ShellOverlay {
    prompt: Option<String>,
    noclobber: Option<bool>,
    inherit_environment: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct LimitsOverlay {
    max_line: Option<usize>,
    max_args: Option<usize>,
    max_env_vars: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct WatchOverlay {
    interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LogOverlay {
    level: Option<String>,
    file: Option<PathBuf>,
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        match toml::from_str(DEFAULT_CONFIG) {
            Ok(config) => config,
            Err(e) => {
                log::error!("embedded default config does not parse: {e}");
                Self {
                    shell: ShellConfig::default(),
                    limits: LimitsConfig::default(),
                    watch: WatchConfig::default(),
                    log: LogConfig::default(),
                }
            }
        }
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the overlay from `path`, or from ~/.config/wsh/config.toml when
    ///    no path is given (if it exists)
    ///
    /// A file that fails to parse is reported on stderr and ignored, as is an
    /// explicit `path` that cannot be read. A missing user config is not an error.
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = Self::default_config();
        let (path, explicit) = match path {
            Some(p) => (Some(p.to_path_buf()), true),
            None => (Self::user_config_path(), false),
        };
        let Some(path) = path else {
            return config;
        };
        match Self::load_overlay(&path, explicit) {
            Ok(Some(overlay)) => config.apply_overlay(overlay),
            Ok(None) => {}
            Err(msg) => eprintln!("{msg}"),
        }
        config
    }

    fn user_config_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(Path::new(&home).join(".config/wsh/config.toml"))
    }

    /// Read and parse an overlay; the error is the warning to show the user.
    fn load_overlay(path: &Path, explicit: bool) -> Result<Option<ConfigOverlay>, String> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("wsh: cannot read config {}: {e}", path.display())),
        };
        Self::parse_overlay(&content)
            .map(Some)
            .map_err(|e| format!("wsh: config parse error in {}: {e}", path.display()))
    }

    fn parse_overlay(content: &str) -> Result<ConfigOverlay, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply an overlay on top of this config: every set key overrides.
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.shell;
        if let Some(v) = s.prompt {
            self.shell.prompt = v;
        }
        if let Some(v) = s.noclobber {
            self.shell.noclobber = v;
        }
        if let Some(v) = s.inherit_environment {
            self.shell.inherit_environment = v;
        }

        let l = overlay.limits;
        if let Some(v) = l.max_line {
            self.limits.max_line = v.max(2);
        }
        if let Some(v) = l.max_args {
            self.limits.max_args = v.max(1);
        }
        if let Some(v) = l.max_env_vars {
            self.limits.max_env_vars = v;
        }

        if let Some(v) = overlay.watch.interval_secs {
            self.watch.interval_secs = v.max(1);
        }

        if let Some(v) = overlay.log.level {
            self.log.level = v;
        }
        if let Some(v) = overlay.log.file {
            self.log.file = Some(v);
        }
    }

    pub fn parse_limits(&self) -> Limits {
        Limits {
            max_line: self.limits.max_line,
            max_args: self.limits.max_args,
        }
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch.interval_secs)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log.level.parse().unwrap_or_else(|_| {
            eprintln!("wsh: unknown log level {:?}, using warn", self.log.level);
            log::LevelFilter::Warn
        })
    }
}
