//! Tracing setup for the CLI.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "tyn_chatbot_eval=info";

/// Logging options.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Lower the default filter to debug.
    pub verbose: bool,
    /// Also write logs to this file.
    pub log_file: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            log_file: Some(PathBuf::from("logs/chatbot-eval.log")),
        }
    }
}

impl LogOptions {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if self.verbose {
                "tyn_chatbot_eval=debug".into()
            } else {
                DEFAULT_FILTER.into()
            }
        })
    }
}

/// Install the global subscriber: console on stderr plus an optional file.
///
/// The returned guard flushes the file writer on drop and must be held
/// for the lifetime of the program.
pub fn init(options: &LogOptions) -> Option<WorkerGuard> {
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &options.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "chatbot-eval.log".into());

            std::fs::create_dir_all(&dir).ok();
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(options.filter())
        .with(console)
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_log_to_file() {
        let options = LogOptions::default();
        assert!(!options.verbose);
        assert_eq!(
            options.log_file.as_deref(),
            Some(std::path::Path::new("logs/chatbot-eval.log"))
        );
    }
}
