use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use std::fs::OpenOptions;
use std::path::Path;

/// Install the global logger.
///
/// Records go to stderr unless `file` is given, in which case they are appended to
/// it so they don't interleave with command output.
pub fn init(level: LevelFilter, file: Option<&Path>) -> anyhow::Result<()> {
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    match file {
        Some(path) => {
            let log_file = OpenOptions::new().create(true).append(true).open(path)?;
            WriteLogger::init(level, config, log_file)?;
        }
        None => {
            TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto)?;
        }
    }
    Ok(())
}
