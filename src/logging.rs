use crate::config::{LogFormat, Settings};

/// Install the global subscriber, writing to stderr. Safe to call more than once; later calls
/// leave the first subscriber in place.
pub fn init_logging(settings: &Settings) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(settings.log_level)
        .with_target(false);

    let result = match settings.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if result.is_err() {
        tracing::debug!("logging already initialised");
    }
}
