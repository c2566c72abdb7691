use configuration::Logging;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Crates whose `debug!` output carries analyzer and decision reasoning.
const REASONING_TARGETS: [&str; 2] = ["analyzers=debug", "engine=debug"];

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Console output is routed through
/// the indicatif layer so progress bars are not torn by log lines. When a log
/// directory is configured a daily-rolling file is written as well; the
/// returned guard must live until exit for it to be flushed.
pub fn init(logging: &Logging, show_reasoning: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let mut filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?;
    if show_reasoning {
        for directive in REASONING_TARGETS {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    let indicatif_layer = IndicatifLayer::new();
    let console_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(indicatif_layer.get_stderr_writer());

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "quorum.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .with(indicatif_layer)
        .try_init()?;
    Ok(guard)
}
