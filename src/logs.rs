use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::{
    Config,
    append::console::{ConsoleAppender, Target},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};

const LOG_PATTERN: &str = "{d(%H:%M:%S)} {l:<5} {t} - {m}{n}";

/// Installs a stderr logger. Stdout stays free for command output.
pub fn init_logger(level: LevelFilter) -> Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .context("invalid logger config")?;

    log4rs::init_config(config).context("failed to initialize logger")?;
    Ok(())
}
