use colored::Colorize;
use middleware::logger::LoggerMiddleware;

pub mod middleware {
    pub mod logger;
}

const LOG_FILE: &str = "paytrack.log";

/// Debug output in development, info and above in production.
pub fn setup(production: bool) -> Result<(), fern::InitError> {
    let level = if production {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Debug
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            let color = match record.level() {
                log::Level::Info => "green",
                log::Level::Warn => "yellow",
                log::Level::Error => "red",
                log::Level::Debug => "magenta",
                log::Level::Trace => "bright black",
            };
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                record.target(),
                record.level().to_string().color(color),
                message
            ))
        })
        .level(level)
        .level_for("hyper", log::LevelFilter::Off)
        .level_for("sqlx", log::LevelFilter::Warn)
        .level_for("rustls", log::LevelFilter::Off)
        .level_for("reqwest", log::LevelFilter::Info)
        .level_for("lettre", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .chain(fern::log_file(LOG_FILE)?)
        .apply()?;
    Ok(())
}

pub fn middleware(enabled: bool) -> LoggerMiddleware {
    LoggerMiddleware::new(enabled)
}
