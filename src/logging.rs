use std::io;
use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default console directives; `RUST_LOG` takes precedence when set.
const CONSOLE_DIRECTIVES: &str = "info,dedup=info,similarity=info,clustering=info,vector=info";
const FILE_DIRECTIVES: &str = "info,dedup=debug,clustering=debug";

pub fn configure_logging() {
    // Tokenizer internals are noisy at warn level
    let custom_filter = FilterFn::new(|metadata| {
        !(metadata.level() == &Level::WARN && metadata.target().starts_with("tokenizers"))
    });

    // Console log configuration
    let console_log = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(CONSOLE_DIRECTIVES)),
        )
        .with_filter(custom_filter);

    // File log configuration
    let file_appender = rolling::daily("logs", "dedup.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(EnvFilter::new(FILE_DIRECTIVES));

    tracing_subscriber::Registry::default()
        .with(console_log)
        .with(file_log)
        .init();
}
