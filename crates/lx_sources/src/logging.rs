use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Once;
use tracing::Level;

static INIT: Once = Once::new();

/// Prefixed logger for per-source lines, e.g. `[newsapi] attempt 1 failed`.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    prefixes: VecDeque<String>,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            prefixes: VecDeque::new(),
        }
    }

    pub fn for_source(source_id: &str) -> Self {
        Self::new().with_prefix(format!("[{}]", source_id))
    }

    pub fn with_prefix(mut self, prefix: String) -> Self {
        self.prefixes.push_back(prefix);
        self
    }

    fn line(&self, message: &str) -> String {
        let prefix = self.prefixes.iter().map(|p| format!("{} ", p)).collect::<String>();
        format!("{}{}", prefix, message)
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{}", self.line(message));
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{}", self.line(message));
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!("{}", self.line(message));
    }
}

/// Installs the fmt subscriber once. `LUXORA_LOG` picks the level (default `info`).
pub fn init_logging() -> Logger {
    if !tracing::dispatcher::has_been_set() {
        INIT.call_once(|| {
            let level = std::env::var("LUXORA_LOG")
                .ok()
                .and_then(|l| Level::from_str(&l).ok())
                .unwrap_or(Level::INFO);
            // A subscriber installed elsewhere wins; ignore the error.
            let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
        });
    }
    Logger::new()
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}
