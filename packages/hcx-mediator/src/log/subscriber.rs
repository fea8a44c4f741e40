use crate::config::{LogConfig, LogLevel, LogOutput};
use crate::log::{CONFIG, CRYPTO, FHIR, LISTENER, NOTIFY, PROTOCOL, REGISTRY};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::FmtSubscriber;

fn log_targets() -> Vec<&'static str> {
    vec![CONFIG, CRYPTO, FHIR, LISTENER, NOTIFY, PROTOCOL, REGISTRY]
}

fn log_level_for(config: &LogConfig, target: &str) -> LogLevel {
    match target {
        CONFIG => config.config_level,
        CRYPTO => config.crypto_level,
        FHIR => config.fhir_level,
        LISTENER => config.listener_level,
        NOTIFY => config.notify_level,
        PROTOCOL => config.protocol_level,
        REGISTRY => config.registry_level,
        _ => config.level,
    }
}

pub fn builder(
    config: &LogConfig,
) -> SubscriberBuilder<DefaultFields, Format, EnvFilter, BoxMakeWriter> {
    let mut env_filter: EnvFilter = EnvFilter::builder().parse_lossy(config.level.to_string());

    let mut debug = is_debug(config.level);

    for &target in log_targets().iter() {
        let level = log_level_for(config, target);

        // If any level is debug, enable debug mode
        if is_debug(level) {
            debug = true;
        }

        env_filter = env_filter.add_directive(format!("{target}={level}").parse().unwrap());
    }

    let writer = match config.output {
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
    };

    let mut builder = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_ansi(config.ansi_enabled)
        .with_writer(writer);

    if debug {
        builder = builder
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
    };

    builder
}

fn is_debug(level: LogLevel) -> bool {
    matches!(level, LogLevel::Debug | LogLevel::Trace)
}
