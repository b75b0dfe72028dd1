use crate::config::Config;
use log::LevelFilter;
use simplelog::{self, ConfigBuilder, SharedLogger, TermLogger};

/// Dependency targets that drown out our own SSE lifecycle logs at normal levels.
/// Matching is by prefix, so `tower` also covers `tower_http`.
const FILTERED_MODULES: &[&str] = &["tower", "tracing", "hyper", "h2", "axum"];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger described by `config`.
    ///
    /// Dependency output is only let through at `TRACE`, where every connection
    /// write is worth seeing anyway.
    pub fn init_logger(config: &Config) -> Result<(), log::SetLoggerError> {
        simplelog::CombinedLogger::init(vec![Self::term_logger(config.log_level_filter)])
    }

    fn term_logger(level: LevelFilter) -> Box<dyn SharedLogger> {
        TermLogger::new(
            Self::convert_level_filter(level),
            Self::build_log_config(level != LevelFilter::Trace),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
    }

    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    fn build_log_config(filter_dependencies: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder
            .set_time_format_rfc3339()
            .set_target_level(simplelog::LevelFilter::Error)
            .set_thread_level(simplelog::LevelFilter::Off);

        if filter_dependencies {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
