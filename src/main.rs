use argh::FromArgs;
use std::path::PathBuf;
use watch_shell::{Config, Interpreter, jobs, logging};

#[derive(FromArgs)]
/// Interactive shell with built-ins, redirections, pipes and a login watcher.
struct Args {
    #[argh(option, short = 'c')]
    /// configuration file to use instead of ~/.config/wsh/config.toml.
    config: Option<PathBuf>,

    #[argh(switch, short = 'v')]
    /// log at debug level.
    verbose: bool,
}

fn main() {
    let args: Args = argh::from_env();
    let config = Config::load(args.config.as_deref());

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        config.log_level()
    };
    if let Err(e) = logging::init(level, config.log.file.as_deref()) {
        eprintln!("wsh: logging disabled: {e:#}");
    }

    if let Err(e) = jobs::install_sigchld_handler() {
        log::error!("background children will not be reaped: {e}");
    }
    if let Err(e) = jobs::install_interactive_handlers() {
        log::error!("could not install interrupt handlers: {e}");
    }

    let mut sh = Interpreter::with_config(config);
    if let Err(e) = sh.repl() {
        log::error!("input loop ended: {e}");
    }
    sh.shutdown();
}
