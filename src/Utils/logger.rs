use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;

/// Initialises the global logger: terminal output at `level` and, if `log_file` is given,
/// a debug-level copy written to that file.
///
/// Calling it a second time is harmless, the error from `log` is turned into a message.
pub fn init_logger(level: LevelFilter, log_file: Option<&str>) -> Result<(), String> {
    let term_config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        term_config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        let file = File::create(path)
            .map_err(|e| format!("Failed to create log file '{}': {}", path, e))?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), file));
    }
    CombinedLogger::init(loggers).map_err(|e| format!("Logger already initialised: {}", e))
}
